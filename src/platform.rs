/*============================================================
  Project: GlobalSDK
  Module: globalsdk_core::platform
  ------------------------------------------------------------
  Purpose:
    Shared data contracts: host OS, architecture, the per-request
    install context, support status, and well-known SDK roots.

  Security / Safety Notes:
    Pure data and path computation; no I/O performed here.

  Dependencies:
    serde for status serialization.

  Operational Scope:
    Used by every installer path and by the CLI.

  Revision History:
    2026-10-19 COD  Introduced platform and context types.
============================================================*/

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{GlobalSdkError, Result};
use crate::executor::CommandExecutionResult;
use crate::version::FullySpecifiedVersion;

/// Operating system family the core dispatches on.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOs {
    Windows,
    MacOs,
    Linux,
    Other,
}

impl HostOs {
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    pub fn from_os_name(name: &str) -> Self {
        match name {
            "windows" => HostOs::Windows,
            "macos" => HostOs::MacOs,
            "linux" => HostOs::Linux,
            _ => HostOs::Other,
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostOs::Windows => f.write_str("windows"),
            HostOs::MacOs => f.write_str("macos"),
            HostOs::Linux => f.write_str("linux"),
            HostOs::Other => write!(f, "{}", std::env::consts::OS),
        }
    }
}

/// Target architecture of an SDK build.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    X86,
    X64,
    Arm64,
}

impl Architecture {
    pub fn current() -> Option<Self> {
        std::env::consts::ARCH.parse().ok()
    }
}

impl FromStr for Architecture {
    type Err = GlobalSdkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x86" | "i686" | "i386" => Ok(Architecture::X86),
            "x64" | "amd64" | "x86_64" => Ok(Architecture::X64),
            "arm64" | "aarch64" => Ok(Architecture::Arm64),
            other => Err(GlobalSdkError::UnsupportedPlatform(format!(
                "unknown architecture `{other}`"
            ))),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Architecture::X86 => "x86",
            Architecture::X64 => "x64",
            Architecture::Arm64 => "arm64",
        })
    }
}

/// Where the bits for an install come from.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum InstallSource {
    /// Native installer artifact (Windows `.exe`, macOS `.pkg`).
    InstallerUrl(String),
    /// Distro package identifier.
    Package(String),
}

/// Immutable description of one install request.
#[derive(Debug, Clone)]
pub struct InstallContext {
    version: FullySpecifiedVersion,
    source: InstallSource,
    architecture: Architecture,
    requires_elevation: bool,
}

impl InstallContext {
    pub fn new(
        version: FullySpecifiedVersion,
        source: InstallSource,
        architecture: Architecture,
        requires_elevation: bool,
    ) -> Self {
        Self {
            version,
            source,
            architecture,
            requires_elevation,
        }
    }

    pub fn version(&self) -> &FullySpecifiedVersion {
        &self.version
    }

    pub fn source(&self) -> &InstallSource {
        &self.source
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn requires_elevation(&self) -> bool {
        self.requires_elevation
    }

    pub fn installer_url(&self) -> Option<&str> {
        match &self.source {
            InstallSource::InstallerUrl(url) => Some(url),
            InstallSource::Package(_) => None,
        }
    }
}

/// Lifecycle classification of an SDK version on a given distro.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SupportStatus {
    LongTermSupport,
    StandardTermSupport,
    Unsupported,
    Unknown,
}

impl SupportStatus {
    /// Whether an automatic install may proceed without an override.
    pub fn permits_install(self) -> bool {
        matches!(
            self,
            SupportStatus::LongTermSupport | SupportStatus::StandardTermSupport
        )
    }
}

impl fmt::Display for SupportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SupportStatus::LongTermSupport => "long-term-support",
            SupportStatus::StandardTermSupport => "standard-term-support",
            SupportStatus::Unsupported => "unsupported",
            SupportStatus::Unknown => "unknown",
        })
    }
}

/// What an install request ended up doing.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallAction {
    Installed,
    Upgraded,
    AlreadyInstalled,
}

impl fmt::Display for InstallAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InstallAction::Installed => "installed",
            InstallAction::Upgraded => "upgraded",
            InstallAction::AlreadyInstalled => "already installed",
        })
    }
}

/// Result of one end-to-end install request.
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub version: String,
    pub action: InstallAction,
    /// False when no exit code could be observed (macOS package UI), so the
    /// install was attempted rather than verified.
    pub verified: bool,
    /// Raw output of the installer or package manager, uninterpreted.
    pub output: Option<CommandExecutionResult>,
}

/// Well-known global install location for a Windows or macOS SDK.
pub fn expected_global_sdk_path(
    os: HostOs,
    version: &str,
    arch: Architecture,
) -> Result<PathBuf> {
    match (os, arch) {
        (HostOs::Windows, Architecture::X86) => Ok(PathBuf::from(format!(
            "C:\\Program Files (x86)\\dotnet\\sdk\\{version}\\dotnet.dll"
        ))),
        (HostOs::Windows, _) => Ok(PathBuf::from(format!(
            "C:\\Program Files\\dotnet\\sdk\\{version}\\dotnet.dll"
        ))),
        (HostOs::MacOs, Architecture::X64) => Ok(PathBuf::from(format!(
            "/usr/local/share/dotnet/x64/dotnet/sdk/{version}"
        ))),
        (HostOs::MacOs, _) => Ok(PathBuf::from(format!(
            "/usr/local/share/dotnet/sdk/{version}"
        ))),
        (other, _) => Err(GlobalSdkError::UnsupportedPlatform(format!(
            "no well-known global SDK path on {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_paths_follow_program_files_layout() {
        assert_eq!(
            expected_global_sdk_path(HostOs::Windows, "7.0.103", Architecture::X64).unwrap(),
            PathBuf::from("C:\\Program Files\\dotnet\\sdk\\7.0.103\\dotnet.dll")
        );
        assert_eq!(
            expected_global_sdk_path(HostOs::Windows, "7.0.103", Architecture::X86).unwrap(),
            PathBuf::from("C:\\Program Files (x86)\\dotnet\\sdk\\7.0.103\\dotnet.dll")
        );
    }

    #[test]
    fn macos_paths_split_on_x64() {
        assert_eq!(
            expected_global_sdk_path(HostOs::MacOs, "8.0.100", Architecture::X64).unwrap(),
            PathBuf::from("/usr/local/share/dotnet/x64/dotnet/sdk/8.0.100")
        );
        assert_eq!(
            expected_global_sdk_path(HostOs::MacOs, "8.0.100", Architecture::Arm64).unwrap(),
            PathBuf::from("/usr/local/share/dotnet/sdk/8.0.100")
        );
    }

    #[test]
    fn other_platforms_have_no_global_path() {
        for os in [HostOs::Linux, HostOs::Other] {
            assert!(matches!(
                expected_global_sdk_path(os, "7.0.103", Architecture::X64),
                Err(GlobalSdkError::UnsupportedPlatform(_))
            ));
        }
    }

    #[test]
    fn architecture_aliases() {
        assert_eq!("amd64".parse::<Architecture>().unwrap(), Architecture::X64);
        assert_eq!("aarch64".parse::<Architecture>().unwrap(), Architecture::Arm64);
        assert_eq!("x86".parse::<Architecture>().unwrap(), Architecture::X86);
        assert!("sparc".parse::<Architecture>().is_err());
    }

    #[test]
    fn only_supported_lifecycles_permit_install() {
        assert!(SupportStatus::LongTermSupport.permits_install());
        assert!(SupportStatus::StandardTermSupport.permits_install());
        assert!(!SupportStatus::Unsupported.permits_install());
        assert!(!SupportStatus::Unknown.permits_install());
        assert_eq!(
            serde_json::to_string(&SupportStatus::LongTermSupport).unwrap(),
            "\"long-term-support\""
        );
    }
}
