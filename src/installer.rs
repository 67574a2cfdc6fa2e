/*============================================================
  Project: GlobalSDK
  Module: globalsdk_core::installer
  ------------------------------------------------------------
  Purpose:
    Drive a native-installer SDK install on Windows and macOS:
    conflict check, download, execute, clean up.

  Security / Safety Notes:
    Conflicts are detected before any download. The installer
    artifact lives only in the caller's scratch directory, which
    is wiped before the download and after the install. Windows
    silent flags are passed only when the session is already
    elevated; otherwise the OS prompts.

  Dependencies:
    reqwest (via download), tokio for async I/O.

  Operational Scope:
    Selected by the orchestrator on Windows and macOS hosts.

  Revision History:
    2026-10-19 COD  Authored Windows/macOS installer pipeline.
============================================================*/

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::download::{artifact_path, download_to_file, wipe_directory};
use crate::error::{GlobalSdkError, Result};
use crate::events::{EventSink, InstallEvent};
use crate::executor::{CommandExecutionResult, CommandExecutor, CommandSpec};
use crate::platform::{
    expected_global_sdk_path, HostOs, InstallAction, InstallContext, InstallOutcome,
};
use crate::registry::enumerate_installed_sdks;
use crate::version::find_conflict;

/// Flags for an unattended install from an already elevated session.
pub const WINDOWS_SILENT_FLAGS: [&str; 3] = ["/quiet", "/install", "/norestart"];

/// Progress of one installer run.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum InstallStage {
    Idle,
    ConflictCheck,
    Downloading,
    Installing,
    Cleanup,
    Done,
    Rejected,
    Failed,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Installs an SDK globally from a native installer artifact.
pub struct WinMacGlobalInstaller {
    context: InstallContext,
    os: HostOs,
    scratch_dir: PathBuf,
    client: reqwest::Client,
    executor: Arc<dyn CommandExecutor>,
    sink: Arc<dyn EventSink>,
    stage: Mutex<InstallStage>,
}

impl WinMacGlobalInstaller {
    pub fn new(
        context: InstallContext,
        os: HostOs,
        scratch_dir: PathBuf,
        client: reqwest::Client,
        executor: Arc<dyn CommandExecutor>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        if !matches!(os, HostOs::Windows | HostOs::MacOs) {
            sink.post(InstallEvent::UnsupportedPlatform {
                platform: os.to_string(),
            });
            return Err(GlobalSdkError::UnsupportedPlatform(format!(
                "native installers are only used on Windows and macOS, not {os}"
            )));
        }
        if context.installer_url().is_none() {
            return Err(GlobalSdkError::Config(
                "Windows/macOS installs need an installer URL".into(),
            ));
        }
        Ok(Self {
            context,
            os,
            scratch_dir,
            client,
            executor,
            sink,
            stage: Mutex::new(InstallStage::Idle),
        })
    }

    pub fn stage(&self) -> InstallStage {
        self.stage
            .lock()
            .map(|guard| *guard)
            .unwrap_or(InstallStage::Idle)
    }

    fn enter(&self, stage: InstallStage) {
        if let Ok(mut guard) = self.stage.lock() {
            *guard = stage;
        }
        self.sink.post(InstallEvent::StageEntered {
            stage: stage.to_string(),
        });
    }

    pub fn expected_global_sdk_path(&self) -> Result<PathBuf> {
        expected_global_sdk_path(
            self.os,
            &self.context.version().to_string(),
            self.context.architecture(),
        )
    }

    /// Globally installed SDK versions; only enumerated on Windows.
    pub fn installed_global_sdks(&self) -> Result<Vec<String>> {
        match self.os {
            HostOs::Windows => enumerate_installed_sdks(self.executor.as_ref()),
            _ => Ok(Vec::new()),
        }
    }

    /// Fail with `ConflictingInstall` if an installed SDK blocks the request.
    pub fn check_conflicts(&self) -> Result<()> {
        let requested = self.context.version();
        let installed = self.installed_global_sdks()?;
        match find_conflict(requested, &installed) {
            Some(conflict) => {
                self.sink.post(InstallEvent::ConflictDetected {
                    installed: conflict.clone(),
                    requested: requested.to_string(),
                });
                Err(GlobalSdkError::ConflictingInstall {
                    installed: conflict,
                    requested: requested.to_string(),
                })
            }
            None => Ok(()),
        }
    }

    /// Run the whole pipeline. Once the installer starts it runs to completion.
    pub async fn install_sdk(&self) -> Result<InstallOutcome> {
        let version = self.context.version().to_string();
        self.sink.post(InstallEvent::Started {
            version: version.clone(),
            platform: format!("{} {}", self.os, self.context.architecture()),
        });

        self.enter(InstallStage::ConflictCheck);
        if let Err(err) = self.check_conflicts() {
            self.enter(InstallStage::Rejected);
            return Err(err);
        }

        let output = match self.download_and_execute().await {
            Ok(output) => output,
            Err(err) => {
                self.enter(InstallStage::Failed);
                return Err(err);
            }
        };

        self.enter(InstallStage::Done);
        self.sink.post(InstallEvent::Completed {
            version: version.clone(),
            action: InstallAction::Installed.to_string(),
        });
        Ok(InstallOutcome {
            version,
            action: InstallAction::Installed,
            verified: self.os == HostOs::Windows,
            output: Some(output),
        })
    }

    /// Download, run and clean up; scratch is wiped on every path.
    async fn download_and_execute(&self) -> Result<CommandExecutionResult> {
        self.enter(InstallStage::Downloading);
        let artifact = match self.download_installer().await {
            Ok(artifact) => artifact,
            Err(err) => {
                if !matches!(err, GlobalSdkError::Download(_)) {
                    self.sink.post(InstallEvent::from_error(&err));
                }
                self.cleanup().await?;
                return Err(err);
            }
        };

        self.enter(InstallStage::Installing);
        let executed = self.execute_install(&artifact).await;
        let cleaned = self.cleanup().await;
        let output = executed?;
        cleaned?;
        Ok(output)
    }

    async fn download_installer(&self) -> Result<PathBuf> {
        let url = self.context.installer_url().ok_or_else(|| {
            GlobalSdkError::Config("Windows/macOS installs need an installer URL".into())
        })?;
        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|err| {
                GlobalSdkError::Filesystem(format!(
                    "Failed to create scratch directory {}: {err}",
                    self.scratch_dir.display()
                ))
            })?;
        wipe_directory(&self.scratch_dir).await?;

        let artifact = artifact_path(&self.scratch_dir, url)?;
        self.sink.post(InstallEvent::DownloadStarted {
            url: url.to_string(),
        });
        match download_to_file(&self.client, url, &artifact).await {
            Ok(bytes) => {
                self.sink.post(InstallEvent::DownloadCompleted {
                    url: url.to_string(),
                    bytes,
                });
                Ok(artifact)
            }
            Err(err) => {
                self.sink.post(InstallEvent::DownloadFailed {
                    url: url.to_string(),
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn cleanup(&self) -> Result<()> {
        self.enter(InstallStage::Cleanup);
        let removed = wipe_directory(&self.scratch_dir).await.map_err(|err| {
            self.sink.post(InstallEvent::from_error(&err));
            err
        })?;
        self.sink.post(InstallEvent::ScratchWiped {
            path: self.scratch_dir.display().to_string(),
            removed,
        });
        Ok(())
    }

    /// Command that runs the installer artifact on this platform.
    pub fn installer_command(&self, artifact: &Path) -> CommandSpec {
        let artifact = artifact.display().to_string();
        match self.os {
            HostOs::MacOs => CommandSpec::new("open", ["-W".to_string(), artifact]),
            _ if self.executor.is_elevated() => CommandSpec::new(artifact, WINDOWS_SILENT_FLAGS),
            _ => CommandSpec::new(artifact, Vec::<String>::new()),
        }
    }

    async fn execute_install(&self, artifact: &Path) -> Result<CommandExecutionResult> {
        let spec = self.installer_command(artifact);
        let mut result = self.executor.execute(&spec).await?;
        if self.os == HostOs::MacOs {
            // `open -W` reports on itself, not on the package installer.
            result.status = None;
        }
        self.sink.post(InstallEvent::InstallerExecuted {
            command: spec.to_string(),
            status: result.status,
        });
        Ok(result)
    }
}
