/*============================================================
  Project: GlobalSDK
  Module: globalsdk_core
  ------------------------------------------------------------
  Purpose:
    Library surface for installing a fully specified .NET SDK
    globally on Windows, macOS and supported Linux distros.

  Security / Safety Notes:
    Privileged commands flow only through the executor module.

  Dependencies:
    See Cargo.toml; modules document their own.

  Operational Scope:
    Consumed by the globalsdk_core binary and embedding tools.

  Revision History:
    2026-10-19 COD  Split runtime into library and CLI.
============================================================*/

pub mod config;
pub mod distro;
pub mod download;
pub mod error;
pub mod events;
pub mod executor;
pub mod installer;
pub mod logger;
pub mod orchestrator;
pub mod platform;
pub mod registry;
pub mod version;

#[cfg(test)]
mod testing;

pub use error::{GlobalSdkError, Result};
pub use orchestrator::GlobalInstallOrchestrator;
pub use platform::{Architecture, HostOs, InstallContext, InstallOutcome, InstallSource};
pub use version::FullySpecifiedVersion;
