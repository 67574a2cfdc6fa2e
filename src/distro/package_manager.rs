/*============================================================
  Project: GlobalSDK
  Module: globalsdk_core::distro::package_manager
  ------------------------------------------------------------
  Purpose:
    Command vocabulary and output parsing for the package
    managers the Linux providers drive (apt, dnf, pacman).

  Security / Safety Notes:
    Mutating commands are built as elevation requests; the
    executor decides how elevation is applied.

  Dependencies:
    None beyond std and the executor's CommandSpec.

  Operational Scope:
    Used by LinuxSdkProvider to install, upgrade, remove and
    query SDK packages.

  Revision History:
    2026-10-19 COD  Generalised pacman parsing to apt and dnf.
============================================================*/

use std::fmt;

use crate::executor::CommandSpec;
use crate::version::FullySpecifiedVersion;

/// Native package manager of a supported distro.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Pacman,
}

impl PackageManager {
    /// Commands that install `package`, run in order.
    pub fn install_commands(self, package: &str) -> Vec<CommandSpec> {
        match self {
            PackageManager::Apt => vec![
                CommandSpec::new("apt-get", ["update"]).elevated(),
                CommandSpec::new("apt-get", ["install", "-y", package]).elevated(),
            ],
            PackageManager::Dnf => {
                vec![CommandSpec::new("dnf", ["install", "-y", package]).elevated()]
            }
            PackageManager::Pacman => vec![CommandSpec::new(
                "pacman",
                ["-S", "--needed", "--noconfirm", package],
            )
            .elevated()],
        }
    }

    pub fn upgrade_command(self, package: &str) -> CommandSpec {
        match self {
            PackageManager::Apt => {
                CommandSpec::new("apt-get", ["install", "--only-upgrade", "-y", package])
            }
            PackageManager::Dnf => CommandSpec::new("dnf", ["upgrade", "-y", package]),
            PackageManager::Pacman => CommandSpec::new("pacman", ["-S", "--noconfirm", package]),
        }
        .elevated()
    }

    pub fn remove_command(self, package: &str) -> CommandSpec {
        match self {
            PackageManager::Apt => CommandSpec::new("apt-get", ["remove", "-y", package]),
            PackageManager::Dnf => CommandSpec::new("dnf", ["remove", "-y", package]),
            PackageManager::Pacman => CommandSpec::new("pacman", ["-R", "--noconfirm", package]),
        }
        .elevated()
    }

    /// Read-only query describing the repository candidate for `package`.
    pub fn candidate_query(self, package: &str) -> CommandSpec {
        match self {
            PackageManager::Apt => CommandSpec::new("apt-cache", ["policy", package]),
            PackageManager::Dnf => CommandSpec::new("dnf", ["info", "--quiet", package]),
            PackageManager::Pacman => CommandSpec::new("pacman", ["-Si", package]),
        }
    }

    /// Newest version the repositories offer, parsed from `candidate_query` output.
    pub fn parse_candidate(self, stdout: &str) -> Option<FullySpecifiedVersion> {
        let key = match self {
            PackageManager::Apt => "Candidate",
            PackageManager::Dnf | PackageManager::Pacman => "Version",
        };
        key_values(stdout)
            .filter(|(k, _)| *k == key)
            .filter_map(|(_, value)| FullySpecifiedVersion::from_package_version(value).ok())
            .max()
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PackageManager::Apt => "apt",
            PackageManager::Dnf => "dnf",
            PackageManager::Pacman => "pacman",
        })
    }
}

/// `Key : Value` pairs from package manager output, trimmed.
fn key_values(stdout: &str) -> impl Iterator<Item = (&str, &str)> {
    stdout.lines().filter_map(|line| {
        line.split_once(':')
            .map(|(raw_key, raw_value)| (raw_key.trim(), raw_value.trim()))
    })
}

/// Versions listed by `dotnet --list-sdks` (`7.0.203 [/usr/lib/dotnet/sdk]`).
pub fn parse_list_sdks(stdout: &str) -> Vec<FullySpecifiedVersion> {
    let mut versions: Vec<FullySpecifiedVersion> = stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter_map(|token| FullySpecifiedVersion::parse(token).ok())
        .collect();
    versions.sort();
    versions
}
