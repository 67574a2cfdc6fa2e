/*============================================================
  Project: GlobalSDK
  Module: globalsdk_core::error
  ------------------------------------------------------------
  Purpose:
    Centralise installer error types to provide consistent
    diagnostics and exit semantics.

  Security / Safety Notes:
    Error contexts carry versions, paths and command lines only;
    downloaded payloads and environment values are never echoed.

  Dependencies:
    thiserror for ergonomic error definitions.

  Operational Scope:
    Used across modules to propagate recoverable failures and
    consolidate exit codes for the binary entry point.

  Revision History:
    2026-10-19 COD  Established shared error definitions.
============================================================*/

use std::io;
use std::process::ExitCode;

use thiserror::Error;

/// Result alias for GlobalSDK operations.
pub type Result<T> = std::result::Result<T, GlobalSdkError>;

/// Enumerates high-level error domains surfaced by the installer core.
#[derive(Debug, Error)]
pub enum GlobalSdkError {
    #[error("SDK {installed} is already installed and conflicts with requested {requested}")]
    ConflictingInstall { installed: String, requested: String },
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),
    #[error("Version {version} is not eligible for automatic install (support status: {status})")]
    UnsupportedVersion { version: String, status: String },
    #[error("Download: {0}")]
    Download(String),
    #[error("Cleanup: {0}")]
    Cleanup(String),
    #[error("Malformed version `{0}`: expected major.minor.patch")]
    MalformedVersion(String),
    #[error("No SDK provider for distro `{distro}` version `{version}`")]
    UnknownDistro { distro: String, version: String },
    #[error("Privilege denied: {0}")]
    PrivilegeDenied(String),
    #[error("Required command `{command}` not found in PATH")]
    CommandMissing { command: String },
    #[error("Command `{command}` failed with status {status}: {stderr}")]
    CommandFailure {
        command: String,
        status: i32,
        stderr: String,
    },
    #[error("Operation exceeded the {0}s deadline")]
    Timeout(u64),
    #[error("Configuration: {0}")]
    Config(String),
    #[error("Network: {0}")]
    Network(String),
    #[error("Serialization: {0}")]
    Serialization(String),
    #[error("Filesystem: {0}")]
    Filesystem(String),
    #[error("Runtime: {0}")]
    Runtime(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl GlobalSdkError {
    /// Map error category to a deterministic exit code.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            GlobalSdkError::ConflictingInstall { .. } => ExitCode::from(60),
            GlobalSdkError::UnsupportedPlatform(_) => ExitCode::from(61),
            GlobalSdkError::UnsupportedVersion { .. } => ExitCode::from(62),
            GlobalSdkError::UnknownDistro { .. } => ExitCode::from(63),
            GlobalSdkError::MalformedVersion(_) => ExitCode::from(64),
            GlobalSdkError::PrivilegeDenied(_) => ExitCode::from(65),
            GlobalSdkError::CommandMissing { .. } => ExitCode::from(10),
            GlobalSdkError::CommandFailure { .. } => ExitCode::from(11),
            GlobalSdkError::Timeout(_) => ExitCode::from(12),
            GlobalSdkError::Config(_) => ExitCode::from(20),
            GlobalSdkError::Download(_) => ExitCode::from(30),
            GlobalSdkError::Network(_) => ExitCode::from(31),
            GlobalSdkError::Serialization(_) => ExitCode::from(32),
            GlobalSdkError::Filesystem(_) => ExitCode::from(40),
            GlobalSdkError::Io(_) => ExitCode::from(41),
            GlobalSdkError::Cleanup(_) => ExitCode::from(42),
            GlobalSdkError::Runtime(_) => ExitCode::from(50),
        }
    }

    /// Stable event code used when the error is posted to an event sink.
    pub fn code(&self) -> &'static str {
        match self {
            GlobalSdkError::ConflictingInstall { .. } => "CONFLICT",
            GlobalSdkError::UnsupportedPlatform(_) => "PLATFORM",
            GlobalSdkError::UnsupportedVersion { .. } => "SUPPORT",
            GlobalSdkError::UnknownDistro { .. } => "DISTRO",
            GlobalSdkError::MalformedVersion(_) => "VERSION",
            GlobalSdkError::PrivilegeDenied(_) => "PRIVILEGE",
            GlobalSdkError::CommandMissing { .. } | GlobalSdkError::CommandFailure { .. } => {
                "COMMAND"
            }
            GlobalSdkError::Timeout(_) => "TIMEOUT",
            GlobalSdkError::Config(_) => "CONFIG",
            GlobalSdkError::Download(_) | GlobalSdkError::Network(_) => "DOWNLOAD",
            GlobalSdkError::Cleanup(_) => "CLEANUP",
            GlobalSdkError::Serialization(_) => "SERDE",
            GlobalSdkError::Filesystem(_) | GlobalSdkError::Io(_) => "FS",
            GlobalSdkError::Runtime(_) => "RUNTIME",
        }
    }
}

pub(crate) fn map_spawn_error(err: io::Error, command: &str) -> GlobalSdkError {
    if err.kind() == io::ErrorKind::NotFound {
        GlobalSdkError::CommandMissing {
            command: command.into(),
        }
    } else {
        GlobalSdkError::Runtime(format!("Failed to spawn {command}: {err}"))
    }
}
