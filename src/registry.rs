/*============================================================
  Project: GlobalSDK
  Module: globalsdk_core::registry
  ------------------------------------------------------------
  Purpose:
    Enumerate globally installed SDKs on Windows from the SDK
    install records kept in the registry.

  Security / Safety Notes:
    Read-only `reg query`; nothing is written to the registry.

  Dependencies:
    The command executor (blocking variant).

  Operational Scope:
    Consulted by the Windows installer before downloading.

  Revision History:
    2026-10-19 COD  Implemented registry enumeration.
============================================================*/

use crate::error::{GlobalSdkError, Result};
use crate::executor::{CommandExecutor, CommandSpec};

/// Install-record keys for 64-bit and 32-bit SDKs, queried in this order.
pub const SDK_REGISTRY_KEYS: [&str; 2] = [
    "HKEY_LOCAL_MACHINE\\SOFTWARE\\WOW6432Node\\dotnet\\Setup\\InstalledVersions\\x64\\sdk",
    "HKEY_LOCAL_MACHINE\\SOFTWARE\\WOW6432Node\\dotnet\\Setup\\InstalledVersions\\x86\\sdk",
];

/// `reg.exe` exits 1 when the key is absent.
const REG_KEY_MISSING: i32 = 1;

/// Pull value names (SDK versions) out of tokenised `reg query` output.
///
/// The first token echoes the queried key. Each following record is a value
/// name, a `REG_*` type and optional data; only the names are kept.
pub fn extract_versions<S: AsRef<str>>(tokens: &[S]) -> Vec<String> {
    let meaningful: Vec<&str> = tokens
        .iter()
        .skip(1)
        .map(|token| token.as_ref().trim())
        .filter(|token| !token.is_empty())
        .collect();
    meaningful
        .windows(2)
        .filter(|pair| pair[1].starts_with("REG_"))
        .map(|pair| pair[0].to_string())
        .collect()
}

pub fn parse_query_output(stdout: &str) -> Vec<String> {
    let tokens: Vec<&str> = stdout.split_whitespace().collect();
    extract_versions(&tokens)
}

pub(crate) fn reg_program() -> String {
    match std::env::var("SystemRoot") {
        Ok(root) if !root.is_empty() => format!("{root}\\System32\\reg.exe"),
        _ => "reg".to_string(),
    }
}

/// Query one key; an absent key yields an empty list.
pub fn query_key(executor: &dyn CommandExecutor, key: &str) -> Result<Vec<String>> {
    let spec = CommandSpec::new(reg_program(), ["query", key]);
    let result = executor.execute_sync(&spec)?;
    match result.status {
        Some(0) => Ok(parse_query_output(&result.stdout)),
        Some(REG_KEY_MISSING) => Ok(Vec::new()),
        status => Err(GlobalSdkError::CommandFailure {
            command: spec.to_string(),
            status: status.unwrap_or(-1),
            stderr: result.stderr.trim().to_string(),
        }),
    }
}

/// Ordered union of both bitness enumerations. Duplicates are kept: each
/// hive holds a distinct install record.
pub fn enumerate_installed_sdks(executor: &dyn CommandExecutor) -> Result<Vec<String>> {
    let mut versions = Vec::new();
    for key in SDK_REGISTRY_KEYS {
        versions.extend(query_key(executor, key)?);
    }
    Ok(versions)
}
