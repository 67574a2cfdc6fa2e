/*============================================================
  Project: GlobalSDK
  Module: globalsdk_core::distro
  ------------------------------------------------------------
  Purpose:
    Linux distro abstraction: the provider capability contract,
    the fixed set of supported distro variants, and the resolver
    that picks one for the running system.

  Security / Safety Notes:
    Unknown distros are refused outright; no generic package
    manager syntax is ever guessed.

  Dependencies:
    async-trait for the provider seam.

  Operational Scope:
    Selected by the orchestrator on Linux hosts.

  Revision History:
    2026-10-19 COD  Introduced distro variants and resolver.
============================================================*/

pub mod package_manager;
pub mod provider;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{GlobalSdkError, Result};
use crate::executor::{CommandExecutionResult, CommandExecutor};
use crate::platform::{InstallContext, SupportStatus};
use crate::version::FullySpecifiedVersion;

pub use package_manager::PackageManager;
pub use provider::LinuxSdkProvider;

/// Capabilities every Linux distro provider offers.
#[async_trait]
pub trait DistroSdkProvider: Send + Sync {
    fn distro(&self) -> SupportedDistro;

    /// Install via the native package manager. The raw result of the last
    /// command run is returned; privileged steps go through the executor.
    async fn install_dotnet(&self, context: &InstallContext) -> Result<CommandExecutionResult>;

    /// SDK versions the global `dotnet` host reports.
    async fn installed_dotnet_versions(&self) -> Result<Vec<FullySpecifiedVersion>>;

    /// Directory of the `dotnet` on PATH, if any.
    async fn installed_global_dotnet_path(&self) -> Result<Option<PathBuf>>;

    /// Version the global `dotnet` reports, if any.
    async fn installed_global_dotnet_version(&self) -> Result<Option<FullySpecifiedVersion>>;

    fn expected_installation_directory(&self) -> PathBuf;

    /// Whether the repositories offer a package for `version`'s major.minor.
    async fn dotnet_package_exists(&self, version: &FullySpecifiedVersion) -> Result<bool>;

    fn version_support_status(&self, version: &FullySpecifiedVersion) -> SupportStatus;

    fn is_version_supported(&self, version: &FullySpecifiedVersion) -> bool {
        self.version_support_status(version).permits_install()
    }

    /// Upgrade within the same major.minor and feature band only.
    async fn upgrade_dotnet(&self, version: &FullySpecifiedVersion)
        -> Result<CommandExecutionResult>;

    /// Remove exactly `version`.
    async fn uninstall_dotnet(
        &self,
        version: &FullySpecifiedVersion,
    ) -> Result<CommandExecutionResult>;
}

/// One supported (distro, release) pair.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SupportedDistro {
    Ubuntu2004,
    Ubuntu2204,
    Ubuntu2404,
    Debian12,
    Rhel8,
    Rhel9,
    Fedora39,
    Fedora40,
    Arch,
}

impl SupportedDistro {
    pub const ALL: [SupportedDistro; 9] = [
        SupportedDistro::Ubuntu2004,
        SupportedDistro::Ubuntu2204,
        SupportedDistro::Ubuntu2404,
        SupportedDistro::Debian12,
        SupportedDistro::Rhel8,
        SupportedDistro::Rhel9,
        SupportedDistro::Fedora39,
        SupportedDistro::Fedora40,
        SupportedDistro::Arch,
    ];

    pub fn id(self) -> &'static str {
        match self {
            SupportedDistro::Ubuntu2004
            | SupportedDistro::Ubuntu2204
            | SupportedDistro::Ubuntu2404 => "ubuntu",
            SupportedDistro::Debian12 => "debian",
            SupportedDistro::Rhel8 | SupportedDistro::Rhel9 => "rhel",
            SupportedDistro::Fedora39 | SupportedDistro::Fedora40 => "fedora",
            SupportedDistro::Arch => "arch",
        }
    }

    /// Release this variant answers for; `None` for rolling releases.
    pub fn release(self) -> Option<&'static str> {
        match self {
            SupportedDistro::Ubuntu2004 => Some("20.04"),
            SupportedDistro::Ubuntu2204 => Some("22.04"),
            SupportedDistro::Ubuntu2404 => Some("24.04"),
            SupportedDistro::Debian12 => Some("12"),
            SupportedDistro::Rhel8 => Some("8"),
            SupportedDistro::Rhel9 => Some("9"),
            SupportedDistro::Fedora39 => Some("39"),
            SupportedDistro::Fedora40 => Some("40"),
            SupportedDistro::Arch => None,
        }
    }

    pub fn package_manager(self) -> PackageManager {
        match self {
            SupportedDistro::Ubuntu2004
            | SupportedDistro::Ubuntu2204
            | SupportedDistro::Ubuntu2404
            | SupportedDistro::Debian12 => PackageManager::Apt,
            SupportedDistro::Rhel8
            | SupportedDistro::Rhel9
            | SupportedDistro::Fedora39
            | SupportedDistro::Fedora40 => PackageManager::Dnf,
            SupportedDistro::Arch => PackageManager::Pacman,
        }
    }

    /// Where this distro's SDK packages land.
    pub fn install_dir(self) -> &'static Path {
        Path::new(match self {
            // Ubuntu 20.04 and Debian 12 get SDKs from the Microsoft feed.
            SupportedDistro::Ubuntu2004 | SupportedDistro::Debian12 => "/usr/share/dotnet",
            SupportedDistro::Ubuntu2204 | SupportedDistro::Ubuntu2404 => "/usr/lib/dotnet",
            SupportedDistro::Rhel8
            | SupportedDistro::Rhel9
            | SupportedDistro::Fedora39
            | SupportedDistro::Fedora40 => "/usr/lib64/dotnet",
            SupportedDistro::Arch => "/usr/share/dotnet",
        })
    }

    /// major.minor lines this release packages.
    pub fn packaged_versions(self) -> &'static [&'static str] {
        match self {
            SupportedDistro::Ubuntu2004 => &["6.0", "7.0", "8.0"],
            SupportedDistro::Ubuntu2204 => &["6.0", "7.0", "8.0", "9.0"],
            SupportedDistro::Ubuntu2404 => &["8.0", "9.0", "10.0"],
            SupportedDistro::Debian12 => &["6.0", "7.0", "8.0", "9.0", "10.0"],
            SupportedDistro::Rhel8 | SupportedDistro::Rhel9 => &["6.0", "7.0", "8.0", "9.0"],
            SupportedDistro::Fedora39 => &["6.0", "7.0", "8.0"],
            SupportedDistro::Fedora40 => &["8.0", "9.0"],
            SupportedDistro::Arch => &["8.0", "9.0", "10.0"],
        }
    }

    pub fn package_name(self, version: &FullySpecifiedVersion) -> String {
        format!("dotnet-sdk-{}", version.major_minor())
    }

    fn matches(self, release: &OsRelease) -> bool {
        if release.id != self.id() {
            return false;
        }
        match (self, self.release()) {
            (_, None) => true,
            (SupportedDistro::Rhel8 | SupportedDistro::Rhel9, Some(major)) => {
                release.version_id.split('.').next() == Some(major)
            }
            (_, Some(exact)) => release.version_id == exact,
        }
    }
}

impl fmt::Display for SupportedDistro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.release() {
            Some(release) => write!(f, "{} {}", self.id(), release),
            None => f.write_str(self.id()),
        }
    }
}

/// Lifecycle of a major.minor line, independent of distro.
pub fn lifecycle(major_minor: &str) -> SupportStatus {
    match major_minor {
        "8.0" | "10.0" => SupportStatus::LongTermSupport,
        "9.0" => SupportStatus::StandardTermSupport,
        "3.1" | "5.0" | "6.0" | "7.0" => SupportStatus::Unsupported,
        _ => SupportStatus::Unknown,
    }
}

/// Identity fields from `/etc/os-release`.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct OsRelease {
    pub id: String,
    pub version_id: String,
    pub pretty_name: Option<String>,
}

impl OsRelease {
    pub fn parse(contents: &str) -> Self {
        let fields: HashMap<&str, String> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.trim(), value.trim().trim_matches(['"', '\'']).to_string()))
            .collect();
        Self {
            id: fields.get("ID").cloned().unwrap_or_default().to_ascii_lowercase(),
            version_id: fields.get("VERSION_ID").cloned().unwrap_or_default(),
            pretty_name: fields.get("PRETTY_NAME").cloned(),
        }
    }

    /// Read the running system's identity.
    pub fn from_system() -> Result<Self> {
        for candidate in ["/etc/os-release", "/usr/lib/os-release"] {
            match std::fs::read_to_string(candidate) {
                Ok(contents) => return Ok(Self::parse(&contents)),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => {
                    return Err(GlobalSdkError::Filesystem(format!(
                        "Failed to read {candidate}: {err}"
                    )))
                }
            }
        }
        Err(GlobalSdkError::UnknownDistro {
            distro: "unknown".into(),
            version: "unknown".into(),
        })
    }
}

/// Pick the supported variant for `release`, or fail.
pub fn resolve_distro(release: &OsRelease) -> Result<SupportedDistro> {
    SupportedDistro::ALL
        .into_iter()
        .find(|distro| distro.matches(release))
        .ok_or_else(|| GlobalSdkError::UnknownDistro {
            distro: release.id.clone(),
            version: release.version_id.clone(),
        })
}

/// Build the provider for `release`.
pub fn resolve_provider(
    release: &OsRelease,
    executor: Arc<dyn CommandExecutor>,
) -> Result<LinuxSdkProvider> {
    resolve_distro(release).map(|distro| LinuxSdkProvider::new(distro, executor))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(id: &str, version_id: &str) -> OsRelease {
        OsRelease {
            id: id.into(),
            version_id: version_id.into(),
            pretty_name: None,
        }
    }

    #[test]
    fn parses_os_release_fields() {
        let parsed = OsRelease::parse(
            "# comment\nNAME=\"Ubuntu\"\nVERSION_ID=\"22.04\"\nID=ubuntu\nID_LIKE=debian\nPRETTY_NAME='Ubuntu 22.04.4 LTS'\n",
        );
        assert_eq!(parsed.id, "ubuntu");
        assert_eq!(parsed.version_id, "22.04");
        assert_eq!(parsed.pretty_name.as_deref(), Some("Ubuntu 22.04.4 LTS"));
    }

    #[test]
    fn resolves_known_releases() {
        assert_eq!(
            resolve_distro(&release("ubuntu", "22.04")).unwrap(),
            SupportedDistro::Ubuntu2204
        );
        assert_eq!(
            resolve_distro(&release("rhel", "9.3")).unwrap(),
            SupportedDistro::Rhel9
        );
        assert_eq!(
            resolve_distro(&release("rhel", "8")).unwrap(),
            SupportedDistro::Rhel8
        );
        assert_eq!(
            resolve_distro(&release("arch", "")).unwrap(),
            SupportedDistro::Arch
        );
    }

    #[test]
    fn unknown_releases_are_refused() {
        for (id, version) in [("ubuntu", "18.04"), ("gentoo", "2.14"), ("fedora", "41"), ("", "")] {
            match resolve_distro(&release(id, version)) {
                Err(GlobalSdkError::UnknownDistro { distro, version: v }) => {
                    assert_eq!(distro, id);
                    assert_eq!(v, version);
                }
                other => panic!("{id} {version}: {other:?}"),
            }
        }
    }

    #[test]
    fn variant_data_is_consistent() {
        for distro in SupportedDistro::ALL {
            assert!(distro.install_dir().is_absolute());
            assert!(!distro.packaged_versions().is_empty());
        }
        assert_eq!(SupportedDistro::Rhel9.to_string(), "rhel 9");
        assert_eq!(SupportedDistro::Arch.to_string(), "arch");
        assert_eq!(
            SupportedDistro::Fedora40.package_manager(),
            PackageManager::Dnf
        );
    }

    #[test]
    fn lifecycle_table() {
        assert_eq!(lifecycle("8.0"), SupportStatus::LongTermSupport);
        assert_eq!(lifecycle("9.0"), SupportStatus::StandardTermSupport);
        assert_eq!(lifecycle("6.0"), SupportStatus::Unsupported);
        assert_eq!(lifecycle("11.0"), SupportStatus::Unknown);
    }
}
