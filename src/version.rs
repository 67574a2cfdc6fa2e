/*============================================================
  Project: GlobalSDK
  Module: globalsdk_core::version
  ------------------------------------------------------------
  Purpose:
    Parse fully-specified SDK versions and decide whether a
    requested version conflicts with an installed one.

  Security / Safety Notes:
    Pure computation; no I/O performed in this module.

  Dependencies:
    semver for strict major.minor.patch[-pre] parsing.

  Operational Scope:
    Consulted by the Windows/macOS installer and by the Linux
    providers before any mutating action.

  Revision History:
    2026-10-19 COD  Implemented feature band comparator.
============================================================*/

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::Version;

use crate::error::{GlobalSdkError, Result};

/// A concrete `major.minor.patch[-suffix]` SDK version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FullySpecifiedVersion {
    inner: Version,
}

impl FullySpecifiedVersion {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        Version::parse(trimmed)
            .map(|inner| Self { inner })
            .map_err(|_| GlobalSdkError::MalformedVersion(trimmed.to_string()))
    }

    /// Parse the leading `x.y.z` of a distro package version such as
    /// `7.0.118-0ubuntu1~22.04.1`, discarding packaging suffixes.
    pub fn from_package_version(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let without_epoch = trimmed.split_once(':').map_or(trimmed, |(_, rest)| rest);
        let numeric: String = without_epoch
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        let numeric = numeric.trim_end_matches('.');
        if numeric.split('.').count() < 3 {
            return Err(GlobalSdkError::MalformedVersion(trimmed.to_string()));
        }
        let triple: Vec<&str> = numeric.split('.').take(3).collect();
        Self::parse(&triple.join("."))
            .map_err(|_| GlobalSdkError::MalformedVersion(trimmed.to_string()))
    }

    pub fn major(&self) -> u64 {
        self.inner.major
    }

    pub fn minor(&self) -> u64 {
        self.inner.minor
    }

    pub fn patch(&self) -> u64 {
        self.inner.patch
    }

    /// `major.minor` as used in package names (`dotnet-sdk-7.0`).
    pub fn major_minor(&self) -> String {
        format!("{}.{}", self.inner.major, self.inner.minor)
    }

    /// Hundreds group of the patch component: 203 -> 2.
    pub fn feature_band(&self) -> u64 {
        self.inner.patch / 100
    }

    /// Patch within the feature band: 203 -> 3.
    pub fn band_patch(&self) -> u64 {
        self.inner.patch % 100
    }

    pub fn is_prerelease(&self) -> bool {
        !self.inner.pre.is_empty()
    }

    pub fn same_band(&self, other: &Self) -> bool {
        self.major() == other.major()
            && self.minor() == other.minor()
            && self.feature_band() == other.feature_band()
    }

    /// True when installing `self` next to `installed` would be rejected:
    /// same major.minor, same feature band and not a strictly newer patch.
    pub fn conflicts_with(&self, installed: &Self) -> bool {
        self.same_band(installed) && self.band_patch() <= installed.band_patch()
    }
}

impl fmt::Display for FullySpecifiedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl FromStr for FullySpecifiedVersion {
    type Err = GlobalSdkError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl PartialOrd for FullySpecifiedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FullySpecifiedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}

/// String-level comparator: does installing `requested` conflict with `installed`?
pub fn conflicts(requested: &str, installed: &str) -> Result<bool> {
    let requested = FullySpecifiedVersion::parse(requested)?;
    let installed = FullySpecifiedVersion::parse(installed)?;
    Ok(requested.conflicts_with(&installed))
}

/// First installed version that conflicts with `requested`, in enumeration order.
/// Installed entries that do not parse are skipped.
pub fn find_conflict<'a, I>(requested: &FullySpecifiedVersion, installed: I) -> Option<String>
where
    I: IntoIterator<Item = &'a String>,
{
    installed.into_iter().find_map(|candidate| {
        FullySpecifiedVersion::parse(candidate)
            .ok()
            .filter(|parsed| requested.conflicts_with(parsed))
            .map(|_| candidate.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(raw: &str) -> FullySpecifiedVersion {
        FullySpecifiedVersion::parse(raw).unwrap()
    }

    #[test]
    fn band_components() {
        let version = v("7.0.203");
        assert_eq!(version.major_minor(), "7.0");
        assert_eq!(version.feature_band(), 2);
        assert_eq!(version.band_patch(), 3);
        assert_eq!(v("8.0.100-preview.7.23376.3").feature_band(), 1);
        assert!(v("8.0.100-rc.1").is_prerelease());
    }

    #[test]
    fn equal_versions_conflict() {
        assert!(conflicts("7.0.203", "7.0.203").unwrap());
    }

    #[test]
    fn same_band_patch_direction() {
        assert!(conflicts("7.0.201", "7.0.203").unwrap());
        assert!(!conflicts("7.0.204", "7.0.203").unwrap());
    }

    #[test]
    fn different_band_never_conflicts() {
        assert!(!conflicts("7.0.301", "7.0.203").unwrap());
        assert!(!conflicts("7.0.100", "7.0.203").unwrap());
    }

    #[test]
    fn different_major_minor_never_conflicts() {
        assert!(!conflicts("8.0.203", "7.0.203").unwrap());
        assert!(!conflicts("7.1.201", "7.0.203").unwrap());
        assert!(!conflicts("6.0.100", "7.0.100").unwrap());
    }

    #[test]
    fn same_band_rule_holds_over_grid() {
        for requested in 0..10u64 {
            for installed in 0..10u64 {
                let a = format!("7.0.4{requested:02}");
                let b = format!("7.0.4{installed:02}");
                assert_eq!(conflicts(&a, &b).unwrap(), requested <= installed, "{a} vs {b}");
            }
        }
    }

    #[test]
    fn malformed_versions_are_rejected() {
        for raw in ["7.0", "seven", "", "7.0.x"] {
            assert!(matches!(
                FullySpecifiedVersion::parse(raw),
                Err(GlobalSdkError::MalformedVersion(_))
            ));
        }
        assert!(conflicts("7.0", "7.0.100").is_err());
    }

    #[test]
    fn package_versions_strip_distro_suffixes() {
        assert_eq!(
            FullySpecifiedVersion::from_package_version("7.0.118-0ubuntu1~22.04.1")
                .unwrap()
                .to_string(),
            "7.0.118"
        );
        assert_eq!(
            FullySpecifiedVersion::from_package_version("1:8.0.104-1")
                .unwrap()
                .to_string(),
            "8.0.104"
        );
        assert!(FullySpecifiedVersion::from_package_version("8.0").is_err());
    }

    #[test]
    fn find_conflict_reports_offending_install() {
        let installed = vec!["6.0.400".to_string(), "7.0.203".to_string()];
        assert_eq!(
            find_conflict(&v("7.0.201"), &installed).as_deref(),
            Some("7.0.203")
        );
        assert_eq!(find_conflict(&v("7.0.301"), &installed), None);
    }
}
