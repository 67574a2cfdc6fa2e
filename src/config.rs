/*============================================================
  Project: GlobalSDK
  Module: globalsdk_core::config
  ------------------------------------------------------------
  Purpose:
    Load operator configuration (scratch location, deadlines,
    download and elevation settings) from TOML.

  Security / Safety Notes:
    Only the elevation program name is configurable; the way it
    is applied stays inside the command executor.

  Dependencies:
    serde + toml for parsing, dirs for platform directories.

  Operational Scope:
    Read once by the binary; library callers may construct the
    structure directly.

  Revision History:
    2026-10-19 COD  Authored configuration loader.
============================================================*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{GlobalSdkError, Result};

const APP_DIR: &str = "globalsdk";

/// Top-level configuration document.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalSdkConfig {
    pub scratch_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    /// Whole-request deadline in seconds; 0 disables it.
    pub install_timeout_secs: u64,
    pub allow_unsupported: bool,
    pub download: DownloadConfig,
    pub elevation: ElevationConfig,
}

/// HTTP settings for installer downloads.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// Program used to gain root for package-manager commands.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ElevationConfig {
    pub program: String,
}

impl Default for GlobalSdkConfig {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            log_dir: None,
            install_timeout_secs: 600,
            allow_unsupported: false,
            download: DownloadConfig::default(),
            elevation: ElevationConfig::default(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 900,
            user_agent: format!("GlobalSDK/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            program: "pkexec".into(),
        }
    }
}

impl GlobalSdkConfig {
    /// Load from an explicit path, or from the default location when present.
    pub fn load_from_optional_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match default_config_path() {
                Some(candidate) if candidate.exists() => Self::load(&candidate),
                _ => Ok(Self::default()),
            },
        }
    }

    fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            GlobalSdkError::Config(format!("Failed to read {}: {err}", path.display()))
        })?;
        Self::parse(&raw)
            .map_err(|err| GlobalSdkError::Config(format!("{}: {err}", path.display())))
    }

    fn parse(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Directory the Windows/macOS installer downloads into.
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
                .join("installers")
        })
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR)
                .join("logs")
        })
    }

    pub fn install_timeout(&self) -> Option<Duration> {
        (self.install_timeout_secs > 0).then(|| Duration::from_secs(self.install_timeout_secs))
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}
