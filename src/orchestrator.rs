/*============================================================
  Project: GlobalSDK
  Module: globalsdk_core::orchestrator
  ------------------------------------------------------------
  Purpose:
    Pick the installation model for the host OS and drive one
    install, upgrade or removal request end to end.

  Security / Safety Notes:
    Support status, repository availability and conflicts are
    all decided before any mutating command runs. Privileged
    steps reach the system only through the command executor.

  Dependencies:
    tokio::time for the request deadline.

  Operational Scope:
    Entry point for library callers and the CLI.

  Revision History:
    2026-10-19 COD  Authored global install orchestrator.
============================================================*/

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::GlobalSdkConfig;
use crate::distro::{resolve_provider, DistroSdkProvider, LinuxSdkProvider, OsRelease};
use crate::download::build_client;
use crate::error::{GlobalSdkError, Result};
use crate::events::{EventSink, InstallEvent};
use crate::executor::{CommandExecutionResult, CommandExecutor};
use crate::installer::WinMacGlobalInstaller;
use crate::platform::{
    expected_global_sdk_path, Architecture, HostOs, InstallAction, InstallContext, InstallOutcome,
};
use crate::registry::enumerate_installed_sdks;
use crate::version::FullySpecifiedVersion;

/// Façade over the Windows/macOS installer and the Linux providers.
pub struct GlobalInstallOrchestrator {
    os: HostOs,
    config: GlobalSdkConfig,
    client: reqwest::Client,
    executor: Arc<dyn CommandExecutor>,
    sink: Arc<dyn EventSink>,
}

impl GlobalInstallOrchestrator {
    pub fn new(
        config: GlobalSdkConfig,
        executor: Arc<dyn CommandExecutor>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let client = build_client(&config.download)?;
        Ok(Self {
            os: HostOs::current(),
            config,
            client,
            executor,
            sink,
        })
    }

    /// Override the detected host OS.
    pub fn with_os(mut self, os: HostOs) -> Self {
        self.os = os;
        self
    }

    pub fn os(&self) -> HostOs {
        self.os
    }

    /// Install the SDK described by `context`. Linux package operations are
    /// bounded by the configured deadline; native installs run to completion
    /// and their download is bounded by the HTTP client timeout.
    pub async fn install(&self, context: InstallContext) -> Result<InstallOutcome> {
        match self.os {
            HostOs::Windows | HostOs::MacOs => self.install_native(context).await,
            HostOs::Linux => {
                self.with_deadline(async {
                    let provider = self.linux_provider()?;
                    self.install_with_provider(&provider, &context).await
                })
                .await
            }
            HostOs::Other => Err(self.unsupported_platform()),
        }
    }

    /// Upgrade a Linux distro install within its feature band.
    pub async fn upgrade(&self, version: &FullySpecifiedVersion) -> Result<InstallOutcome> {
        let provider = self.require_linux_provider("upgrade")?;
        self.with_deadline(async {
            let result = provider.upgrade_dotnet(version).await;
            let result = self.report(result.and_then(|output| require_success(output, "upgrade")))?;
            self.settle(&provider, version, InstallAction::Upgraded, result)
                .await
        })
        .await
    }

    /// Remove exactly `version` from a Linux distro install.
    pub async fn uninstall(&self, version: &FullySpecifiedVersion) -> Result<CommandExecutionResult> {
        let provider = self.require_linux_provider("uninstall")?;
        self.with_deadline(async {
            let result = provider.uninstall_dotnet(version).await;
            self.report(result.and_then(|output| require_success(output, "uninstall")))
        })
        .await
    }

    /// Globally installed SDK versions as the host reports them.
    pub async fn installed_global_sdks(&self) -> Result<Vec<String>> {
        match self.os {
            HostOs::Windows => enumerate_installed_sdks(self.executor.as_ref()),
            HostOs::MacOs => list_macos_sdks().await,
            HostOs::Linux => {
                let provider = self.linux_provider()?;
                Ok(provider
                    .installed_dotnet_versions()
                    .await?
                    .iter()
                    .map(ToString::to_string)
                    .collect())
            }
            HostOs::Other => Err(self.unsupported_platform()),
        }
    }

    /// Where a global SDK of `version` lives (or would live) on this host.
    pub fn expected_sdk_location(&self, version: &str, arch: Architecture) -> Result<PathBuf> {
        match self.os {
            HostOs::Linux => Ok(self
                .linux_provider()?
                .expected_installation_directory()
                .join("sdk")
                .join(version)),
            os => expected_global_sdk_path(os, version, arch),
        }
    }

    /// Provider for the running Linux system.
    pub fn linux_provider(&self) -> Result<LinuxSdkProvider> {
        let release = OsRelease::from_system();
        self.report(release.and_then(|release| resolve_provider(&release, self.executor.clone())))
    }

    fn require_linux_provider(&self, operation: &str) -> Result<LinuxSdkProvider> {
        if self.os != HostOs::Linux {
            self.sink.post(InstallEvent::UnsupportedPlatform {
                platform: self.os.to_string(),
            });
            return Err(GlobalSdkError::UnsupportedPlatform(format!(
                "{operation} is only managed through distro packages on Linux"
            )));
        }
        self.linux_provider()
    }

    async fn install_native(&self, context: InstallContext) -> Result<InstallOutcome> {
        let installer = WinMacGlobalInstaller::new(
            context,
            self.os,
            self.config.scratch_dir(),
            self.client.clone(),
            self.executor.clone(),
            self.sink.clone(),
        )?;
        installer.install_sdk().await
    }

    /// Linux flow: gate on support, availability and installed bands, then
    /// install, upgrade or do nothing.
    pub async fn install_with_provider(
        &self,
        provider: &dyn DistroSdkProvider,
        context: &InstallContext,
    ) -> Result<InstallOutcome> {
        let version = context.version();
        self.sink.post(InstallEvent::Started {
            version: version.to_string(),
            platform: provider.distro().to_string(),
        });

        let status = provider.version_support_status(version);
        if !status.permits_install() {
            if !self.config.allow_unsupported {
                return self.report(Err(GlobalSdkError::UnsupportedVersion {
                    version: version.to_string(),
                    status: status.to_string(),
                }));
            }
            self.sink.post(InstallEvent::SupportOverride {
                version: version.to_string(),
                status: status.to_string(),
            });
        }

        if !provider.dotnet_package_exists(version).await? {
            return self.report(Err(GlobalSdkError::UnsupportedVersion {
                version: version.to_string(),
                status: format!("no package on {}", provider.distro()),
            }));
        }

        self.warn_on_foreign_install(provider).await?;

        let installed = provider.installed_dotnet_versions().await?;
        if installed.contains(version) {
            self.sink.post(InstallEvent::AlreadyInstalled {
                version: version.to_string(),
            });
            return self.completed(version, InstallAction::AlreadyInstalled, None);
        }

        let same_band = installed.iter().filter(|candidate| candidate.same_band(version)).max();
        if let Some(existing) = same_band {
            if version.conflicts_with(existing) {
                self.sink.post(InstallEvent::ConflictDetected {
                    installed: existing.to_string(),
                    requested: version.to_string(),
                });
                return Err(GlobalSdkError::ConflictingInstall {
                    installed: existing.to_string(),
                    requested: version.to_string(),
                });
            }
            let output = provider.upgrade_dotnet(version).await;
            let output = self.report(output.and_then(|output| require_success(output, "upgrade")))?;
            return self
                .settle(provider, version, InstallAction::Upgraded, output)
                .await;
        }

        let output = provider.install_dotnet(context).await;
        let output = self.report(output.and_then(|output| require_success(output, "install")))?;
        self.settle(provider, version, InstallAction::Installed, output)
            .await
    }

    /// Re-read the installed SDKs after a package operation. The outcome is
    /// verified only when the requested version is now present; otherwise it
    /// names the newest same-band SDK the package manager actually left.
    async fn settle(
        &self,
        provider: &dyn DistroSdkProvider,
        version: &FullySpecifiedVersion,
        action: InstallAction,
        output: CommandExecutionResult,
    ) -> Result<InstallOutcome> {
        let installed = provider.installed_dotnet_versions().await?;
        if installed.contains(version) {
            return self.completed(version, action, Some(output));
        }
        let landed = installed
            .iter()
            .filter(|candidate| candidate.same_band(version))
            .max()
            .unwrap_or(version);
        self.sink.post(InstallEvent::VersionMismatch {
            requested: version.to_string(),
            installed: landed.to_string(),
        });
        self.sink.post(InstallEvent::Completed {
            version: landed.to_string(),
            action: action.to_string(),
        });
        Ok(InstallOutcome {
            version: landed.to_string(),
            action,
            verified: false,
            output: Some(output),
        })
    }

    async fn warn_on_foreign_install(&self, provider: &dyn DistroSdkProvider) -> Result<()> {
        let expected = provider.expected_installation_directory();
        if let Some(path) = provider.installed_global_dotnet_path().await? {
            if path != expected {
                self.sink.post(InstallEvent::ForeignGlobalInstall {
                    path: path.display().to_string(),
                    expected: expected.display().to_string(),
                });
            }
        }
        Ok(())
    }

    fn completed(
        &self,
        version: &FullySpecifiedVersion,
        action: InstallAction,
        output: Option<CommandExecutionResult>,
    ) -> Result<InstallOutcome> {
        self.sink.post(InstallEvent::Completed {
            version: version.to_string(),
            action: action.to_string(),
        });
        Ok(InstallOutcome {
            version: version.to_string(),
            action,
            verified: true,
            output,
        })
    }

    fn unsupported_platform(&self) -> GlobalSdkError {
        self.sink.post(InstallEvent::UnsupportedPlatform {
            platform: self.os.to_string(),
        });
        GlobalSdkError::UnsupportedPlatform(format!(
            "global SDK installs are not supported on {}",
            self.os
        ))
    }

    /// Post a failure before handing it back.
    fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.sink.post(InstallEvent::from_error(err));
        }
        result
    }

    async fn with_deadline<T, F>(&self, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.config.install_timeout() {
            Some(limit) => tokio::time::timeout(limit, work).await.map_err(|_| {
                let err = GlobalSdkError::Timeout(limit.as_secs());
                self.sink.post(InstallEvent::from_error(&err));
                err
            })?,
            None => work.await,
        }
    }
}

/// Package manager exit codes are reliable, unlike native installers'.
fn require_success(output: CommandExecutionResult, operation: &str) -> Result<CommandExecutionResult> {
    if output.success() {
        Ok(output)
    } else {
        Err(GlobalSdkError::CommandFailure {
            command: format!("package {operation}"),
            status: output.status.unwrap_or(-1),
            stderr: output.stderr.trim().to_string(),
        })
    }
}

async fn list_macos_sdks() -> Result<Vec<String>> {
    let mut versions = Vec::new();
    for root in ["/usr/local/share/dotnet/sdk", "/usr/local/share/dotnet/x64/dotnet/sdk"] {
        let mut entries = match tokio::fs::read_dir(root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => {
                return Err(GlobalSdkError::Filesystem(format!(
                    "Failed to list {root}: {err}"
                )))
            }
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if FullySpecifiedVersion::parse(&name).is_ok() {
                versions.push(name);
            }
        }
    }
    Ok(versions)
}
