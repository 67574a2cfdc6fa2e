/*============================================================
  Project: GlobalSDK
  Module: globalsdk_core::main
  ------------------------------------------------------------
  Purpose:
    Command-line front end for the global SDK installer. Parses
    the request, wires the executor and logger into the
    orchestrator and maps failures to exit codes.

  Security / Safety Notes:
    Never elevates by itself. Privileged package commands are
    prefixed by the configured elevation program inside the
    executor.

  Dependencies:
    clap for CLI parsing, chrono for session stamps, serde_json
    for machine-readable output.

  Operational Scope:
    Invoked by operators and provisioning scripts.

  Revision History:
    2026-10-19 COD  Rebuilt entry point around the orchestrator.
============================================================*/

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};
use serde_json::json;

use globalsdk_core::config::GlobalSdkConfig;
use globalsdk_core::distro::{DistroSdkProvider, OsRelease};
use globalsdk_core::error::{GlobalSdkError, Result};
use globalsdk_core::executor::SystemCommandExecutor;
use globalsdk_core::logger::Logger;
use globalsdk_core::version::conflicts;
use globalsdk_core::{
    Architecture, FullySpecifiedVersion, GlobalInstallOrchestrator, HostOs, InstallContext,
    InstallOutcome, InstallSource,
};

/// Command-line arguments for GlobalSDK.
#[derive(Debug, Parser)]
#[command(
    name = "globalsdk",
    version,
    about = "Install a fully specified .NET SDK globally"
)]
struct Cli {
    /// Override configuration file path.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Explicit log file path.
    #[arg(long, value_name = "PATH", global = true)]
    log: Option<PathBuf>,
    /// Enable verbose logging to stderr.
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Install an SDK version globally.
    Install {
        version: String,
        /// Installer URL (Windows and macOS).
        #[arg(long, value_name = "URL")]
        url: Option<String>,
        /// Distro package to install instead of the default name (Linux).
        #[arg(long, value_name = "NAME")]
        package: Option<String>,
        /// Target architecture; defaults to the host's.
        #[arg(long, value_name = "ARCH")]
        arch: Option<String>,
        /// Proceed even if the version is out of support.
        #[arg(long, action = ArgAction::SetTrue)]
        allow_unsupported: bool,
    },
    /// Upgrade a distro-packaged SDK within its feature band (Linux).
    Upgrade { version: String },
    /// Remove a distro-packaged SDK (Linux).
    Uninstall { version: String },
    /// List globally installed SDKs.
    List {
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Print where a global SDK of this version lives.
    Path {
        version: String,
        #[arg(long, value_name = "ARCH")]
        arch: Option<String>,
    },
    /// Report support and availability for a version on this host.
    Status { version: String },
    /// Decide whether installing REQUESTED over INSTALLED would conflict.
    Check { requested: String, installed: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[GlobalSDK] {}", err);
            err.exit_code()
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    if let Command::Check {
        requested,
        installed,
    } = &cli.command
    {
        let conflict = conflicts(requested, installed)?;
        println!("{}", if conflict { "conflict" } else { "compatible" });
        return Ok(if conflict {
            ExitCode::from(1)
        } else {
            ExitCode::SUCCESS
        });
    }

    let mut config = GlobalSdkConfig::load_from_optional_path(cli.config.as_deref())?;
    if let Command::Install {
        allow_unsupported: true,
        ..
    } = &cli.command
    {
        config.allow_unsupported = true;
    }

    let session_stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let log_path = cli
        .log
        .clone()
        .or_else(|| Some(config.log_dir().join(format!("globalsdk_{session_stamp}.log"))));
    let logger = Arc::new(Logger::new(log_path, cli.verbose)?);
    logger.info("INIT", format!("GlobalSDK starting on {}", HostOs::current()));

    let executor = Arc::new(SystemCommandExecutor::new(config.elevation.program.clone()));
    let orchestrator = GlobalInstallOrchestrator::new(config, executor, logger.clone())?;

    let result = dispatch(&orchestrator, cli.command).await;
    if let Err(err) = &result {
        logger.error(err.code(), err.to_string());
    }
    logger.finalize()?;
    result
}

async fn dispatch(
    orchestrator: &GlobalInstallOrchestrator,
    command: Command,
) -> Result<ExitCode> {
    match command {
        Command::Install {
            version,
            url,
            package,
            arch,
            ..
        } => {
            let version = FullySpecifiedVersion::parse(&version)?;
            let arch = resolve_arch(arch.as_deref())?;
            let source = match (orchestrator.os(), url, package) {
                (HostOs::Linux, _, Some(package)) => InstallSource::Package(package),
                (HostOs::Linux, _, None) => {
                    let provider = orchestrator.linux_provider()?;
                    InstallSource::Package(provider.distro().package_name(&version))
                }
                (_, Some(url), _) => InstallSource::InstallerUrl(url),
                (_, None, _) => {
                    return Err(GlobalSdkError::Config(
                        "--url is required for Windows and macOS installs".into(),
                    ))
                }
            };
            let context = InstallContext::new(version, source, arch, true);
            let outcome = orchestrator.install(context).await?;
            print_outcome(&outcome);
            Ok(ExitCode::SUCCESS)
        }
        Command::Upgrade { version } => {
            let outcome = orchestrator
                .upgrade(&FullySpecifiedVersion::parse(&version)?)
                .await?;
            print_outcome(&outcome);
            Ok(ExitCode::SUCCESS)
        }
        Command::Uninstall { version } => {
            let version = FullySpecifiedVersion::parse(&version)?;
            orchestrator.uninstall(&version).await?;
            println!("→ SDK {version} removed");
            Ok(ExitCode::SUCCESS)
        }
        Command::List { json } => {
            let versions = orchestrator.installed_global_sdks().await?;
            if json {
                let rendered = serde_json::to_string_pretty(&versions)
                    .map_err(|err| GlobalSdkError::Serialization(err.to_string()))?;
                println!("{rendered}");
            } else {
                for version in versions {
                    println!("{version}");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Path { version, arch } => {
            FullySpecifiedVersion::parse(&version)?;
            let arch = resolve_arch(arch.as_deref())?;
            let path = orchestrator.expected_sdk_location(&version, arch)?;
            println!("{}", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Status { version } => {
            let version = FullySpecifiedVersion::parse(&version)?;
            let report = if orchestrator.os() == HostOs::Linux {
                let release = OsRelease::from_system()?;
                let provider = orchestrator.linux_provider()?;
                json!({
                    "os": orchestrator.os().to_string(),
                    "distro": provider.distro().to_string(),
                    "release": release.pretty_name,
                    "version": version.to_string(),
                    "support": provider.version_support_status(&version),
                    "package_available": provider.dotnet_package_exists(&version).await?,
                    "expected_directory": provider.expected_installation_directory(),
                    "global_path": provider.installed_global_dotnet_path().await?,
                    "global_version": provider
                        .installed_global_dotnet_version()
                        .await?
                        .map(|found| found.to_string()),
                })
            } else {
                let arch = resolve_arch(None)?;
                json!({
                    "os": orchestrator.os().to_string(),
                    "version": version.to_string(),
                    "expected_path": orchestrator.expected_sdk_location(&version.to_string(), arch)?,
                    "installed": orchestrator.installed_global_sdks().await?,
                })
            };
            let rendered = serde_json::to_string_pretty(&report)
                .map_err(|err| GlobalSdkError::Serialization(err.to_string()))?;
            println!("{rendered}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { .. } => Ok(ExitCode::SUCCESS),
    }
}

fn resolve_arch(raw: Option<&str>) -> Result<Architecture> {
    match raw {
        Some(raw) => raw.parse(),
        None => Architecture::current().ok_or_else(|| {
            GlobalSdkError::UnsupportedPlatform(format!(
                "unrecognised host architecture {}",
                std::env::consts::ARCH
            ))
        }),
    }
}

fn print_outcome(outcome: &InstallOutcome) {
    let note = if outcome.verified {
        ""
    } else {
        " (attempted; no exit code observable)"
    };
    println!("→ SDK {} {}{}", outcome.version, outcome.action, note);
}
