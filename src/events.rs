/*============================================================
  Project: GlobalSDK
  Module: globalsdk_core::events
  ------------------------------------------------------------
  Purpose:
    Describe the structured events the installer core posts
    before it propagates failures or completes a stage.

  Security / Safety Notes:
    Events carry versions, URLs and paths only.

  Dependencies:
    None beyond std.

  Operational Scope:
    Implemented by the logger; tests install recording sinks.

  Revision History:
    2026-10-19 COD  Introduced event sink contract.
============================================================*/

use std::fmt;

use crate::error::GlobalSdkError;

/// Severity attached to an event when it is rendered.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EventSeverity {
    Info,
    Warn,
    Error,
    Debug,
}

/// Structured events emitted by installers, providers and the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum InstallEvent {
    Started { version: String, platform: String },
    StageEntered { stage: String },
    ConflictDetected { installed: String, requested: String },
    DownloadStarted { url: String },
    DownloadCompleted { url: String, bytes: u64 },
    DownloadFailed { url: String, reason: String },
    InstallerExecuted { command: String, status: Option<i32> },
    ScratchWiped { path: String, removed: usize },
    UnsupportedPlatform { platform: String },
    AlreadyInstalled { version: String },
    SupportOverride { version: String, status: String },
    ForeignGlobalInstall { path: String, expected: String },
    VersionMismatch { requested: String, installed: String },
    Completed { version: String, action: String },
    Failed { code: &'static str, message: String },
}

impl InstallEvent {
    pub fn code(&self) -> &'static str {
        match self {
            InstallEvent::Started { .. } => "START",
            InstallEvent::StageEntered { .. } => "STAGE",
            InstallEvent::ConflictDetected { .. } => "CONFLICT",
            InstallEvent::DownloadStarted { .. }
            | InstallEvent::DownloadCompleted { .. }
            | InstallEvent::DownloadFailed { .. } => "DOWNLOAD",
            InstallEvent::InstallerExecuted { .. } => "EXEC",
            InstallEvent::ScratchWiped { .. } => "CLEANUP",
            InstallEvent::UnsupportedPlatform { .. } => "PLATFORM",
            InstallEvent::AlreadyInstalled { .. } => "PRESENT",
            InstallEvent::SupportOverride { .. } => "SUPPORT",
            InstallEvent::ForeignGlobalInstall { .. } => "FOREIGN",
            InstallEvent::VersionMismatch { .. } => "MISMATCH",
            InstallEvent::Completed { .. } => "COMPLETE",
            InstallEvent::Failed { code, .. } => *code,
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            InstallEvent::ConflictDetected { .. }
            | InstallEvent::DownloadFailed { .. }
            | InstallEvent::UnsupportedPlatform { .. }
            | InstallEvent::Failed { .. } => EventSeverity::Error,
            InstallEvent::StageEntered { .. } | InstallEvent::ScratchWiped { .. } => {
                EventSeverity::Debug
            }
            InstallEvent::SupportOverride { .. }
            | InstallEvent::ForeignGlobalInstall { .. }
            | InstallEvent::VersionMismatch { .. } => EventSeverity::Warn,
            InstallEvent::InstallerExecuted { status, .. } => match status {
                Some(0) | None => EventSeverity::Info,
                Some(_) => EventSeverity::Warn,
            },
            _ => EventSeverity::Info,
        }
    }

    /// Wrap an error that is about to propagate.
    pub fn from_error(err: &GlobalSdkError) -> Self {
        InstallEvent::Failed {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for InstallEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallEvent::Started { version, platform } => {
                write!(f, "Installing SDK {version} on {platform}")
            }
            InstallEvent::StageEntered { stage } => write!(f, "Entered stage {stage}"),
            InstallEvent::ConflictDetected {
                installed,
                requested,
            } => write!(
                f,
                "Installed SDK {installed} conflicts with requested {requested}"
            ),
            InstallEvent::DownloadStarted { url } => write!(f, "Downloading {url}"),
            InstallEvent::DownloadCompleted { url, bytes } => {
                write!(f, "Downloaded {bytes} bytes from {url}")
            }
            InstallEvent::DownloadFailed { url, reason } => {
                write!(f, "Download of {url} failed: {reason}")
            }
            InstallEvent::InstallerExecuted { command, status } => match status {
                Some(code) => write!(f, "`{command}` exited with {code}"),
                None => write!(f, "`{command}` completed without an observable exit code"),
            },
            InstallEvent::ScratchWiped { path, removed } => {
                write!(f, "Removed {removed} entries from {path}")
            }
            InstallEvent::UnsupportedPlatform { platform } => {
                write!(f, "Global SDK install is not supported on {platform}")
            }
            InstallEvent::AlreadyInstalled { version } => {
                write!(f, "SDK {version} is already installed")
            }
            InstallEvent::SupportOverride { version, status } => {
                write!(f, "Proceeding with {version} despite support status {status}")
            }
            InstallEvent::ForeignGlobalInstall { path, expected } => write!(
                f,
                "Global dotnet at {path} is outside the distro location {expected}"
            ),
            InstallEvent::VersionMismatch {
                requested,
                installed,
            } => write!(
                f,
                "Requested SDK {requested} but the package manager left {installed}"
            ),
            InstallEvent::Completed { version, action } => {
                write!(f, "SDK {version} {action}")
            }
            InstallEvent::Failed { message, .. } => f.write_str(message),
        }
    }
}

/// Receives structured events; transport is up to the implementor.
pub trait EventSink: Send + Sync {
    fn post(&self, event: InstallEvent);
}

