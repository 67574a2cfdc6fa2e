/*============================================================
  Project: GlobalSDK
  Module: globalsdk_core::distro::provider
  ------------------------------------------------------------
  Purpose:
    Implement the distro provider contract for every supported
    variant on top of its package manager.

  Security / Safety Notes:
    Every privileged step is a CommandSpec elevation request run
    through the executor; this module never builds sudo lines.

  Dependencies:
    async-trait, the command executor.

  Operational Scope:
    Returned by the distro resolver and driven by the
    orchestrator and the CLI.

  Revision History:
    2026-10-19 COD  Authored Linux SDK provider.
============================================================*/

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use super::package_manager::parse_list_sdks;
use super::{lifecycle, DistroSdkProvider, SupportedDistro};
use crate::error::{GlobalSdkError, Result};
use crate::executor::{CommandExecutionResult, CommandExecutor, CommandSpec};
use crate::platform::{InstallContext, InstallSource, SupportStatus};
use crate::version::FullySpecifiedVersion;

/// Provider for one supported distro release.
#[derive(Clone)]
pub struct LinuxSdkProvider {
    distro: SupportedDistro,
    executor: Arc<dyn CommandExecutor>,
}

impl LinuxSdkProvider {
    pub fn new(distro: SupportedDistro, executor: Arc<dyn CommandExecutor>) -> Self {
        Self { distro, executor }
    }

    /// Run a read-only probe; a missing binary reads as "nothing there".
    async fn probe(&self, spec: &CommandSpec) -> Result<Option<CommandExecutionResult>> {
        match self.executor.execute(spec).await {
            Ok(result) if result.success() => Ok(Some(result)),
            Ok(_) | Err(GlobalSdkError::CommandMissing { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn repository_candidate(
        &self,
        version: &FullySpecifiedVersion,
    ) -> Result<Option<FullySpecifiedVersion>> {
        let manager = self.distro.package_manager();
        let query = manager.candidate_query(&self.distro.package_name(version));
        Ok(self
            .probe(&query)
            .await?
            .and_then(|result| manager.parse_candidate(&result.stdout)))
    }
}

#[async_trait]
impl DistroSdkProvider for LinuxSdkProvider {
    fn distro(&self) -> SupportedDistro {
        self.distro
    }

    async fn install_dotnet(&self, context: &InstallContext) -> Result<CommandExecutionResult> {
        let package = match context.source() {
            InstallSource::Package(name) => name.clone(),
            InstallSource::InstallerUrl(_) => self.distro.package_name(context.version()),
        };
        let mut last = CommandExecutionResult::default();
        for spec in self.distro.package_manager().install_commands(&package) {
            last = self.executor.execute(&spec).await?;
            if !last.success() {
                break;
            }
        }
        Ok(last)
    }

    async fn installed_dotnet_versions(&self) -> Result<Vec<FullySpecifiedVersion>> {
        let spec = CommandSpec::new("dotnet", ["--list-sdks"]);
        Ok(self
            .probe(&spec)
            .await?
            .map(|result| parse_list_sdks(&result.stdout))
            .unwrap_or_default())
    }

    async fn installed_global_dotnet_path(&self) -> Result<Option<PathBuf>> {
        let Some(which) = self.probe(&CommandSpec::new("which", ["dotnet"])).await? else {
            return Ok(None);
        };
        let on_path = which.stdout.trim().to_string();
        if on_path.is_empty() {
            return Ok(None);
        }
        let resolved = self
            .probe(&CommandSpec::new("readlink", ["-f", on_path.as_str()]))
            .await?
            .map(|result| result.stdout.trim().to_string())
            .filter(|path| !path.is_empty())
            .unwrap_or(on_path);
        Ok(PathBuf::from(resolved).parent().map(PathBuf::from))
    }

    async fn installed_global_dotnet_version(&self) -> Result<Option<FullySpecifiedVersion>> {
        if self.installed_global_dotnet_path().await?.is_none() {
            return Ok(None);
        }
        match self.probe(&CommandSpec::new("dotnet", ["--version"])).await? {
            Some(result) => FullySpecifiedVersion::parse(result.stdout.trim()).map(Some),
            None => Ok(None),
        }
    }

    fn expected_installation_directory(&self) -> PathBuf {
        self.distro.install_dir().to_path_buf()
    }

    async fn dotnet_package_exists(&self, version: &FullySpecifiedVersion) -> Result<bool> {
        Ok(self.repository_candidate(version).await?.is_some())
    }

    fn version_support_status(&self, version: &FullySpecifiedVersion) -> SupportStatus {
        let major_minor = version.major_minor();
        if !self
            .distro
            .packaged_versions()
            .contains(&major_minor.as_str())
        {
            return SupportStatus::Unsupported;
        }
        lifecycle(&major_minor)
    }

    async fn upgrade_dotnet(
        &self,
        version: &FullySpecifiedVersion,
    ) -> Result<CommandExecutionResult> {
        let installed = self.installed_dotnet_versions().await?;
        let current = installed
            .iter()
            .filter(|candidate| candidate.same_band(version))
            .max()
            .cloned()
            .ok_or_else(|| {
                GlobalSdkError::Runtime(format!(
                    "No SDK in the {}.{}xx band is installed to upgrade",
                    version.major_minor(),
                    version.feature_band()
                ))
            })?;

        let status = self.version_support_status(version);
        if !status.permits_install() {
            return Err(GlobalSdkError::UnsupportedVersion {
                version: version.to_string(),
                status: status.to_string(),
            });
        }

        let candidate = self.repository_candidate(version).await?.ok_or_else(|| {
            GlobalSdkError::Runtime(format!(
                "{} offers no {} package",
                self.distro,
                self.distro.package_name(version)
            ))
        })?;
        if !candidate.same_band(&current) {
            return Err(GlobalSdkError::ConflictingInstall {
                installed: current.to_string(),
                requested: candidate.to_string(),
            });
        }
        if candidate < *version {
            return Err(GlobalSdkError::UnsupportedVersion {
                version: version.to_string(),
                status: format!("unavailable, {} offers {candidate}", self.distro),
            });
        }

        let package = self.distro.package_name(version);
        self.executor
            .execute(&self.distro.package_manager().upgrade_command(&package))
            .await
    }

    async fn uninstall_dotnet(
        &self,
        version: &FullySpecifiedVersion,
    ) -> Result<CommandExecutionResult> {
        let installed = self.installed_dotnet_versions().await?;
        if !installed.contains(version) {
            return Err(GlobalSdkError::Runtime(format!(
                "SDK {version} is not installed"
            )));
        }
        let package = self.distro.package_name(version);
        self.executor
            .execute(&self.distro.package_manager().remove_command(&package))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Architecture;
    use crate::testing::ScriptedExecutor;

    fn v(raw: &str) -> FullySpecifiedVersion {
        FullySpecifiedVersion::parse(raw).unwrap()
    }

    fn provider(distro: SupportedDistro, executor: ScriptedExecutor) -> (LinuxSdkProvider, Arc<ScriptedExecutor>) {
        let executor = Arc::new(executor);
        (LinuxSdkProvider::new(distro, executor.clone()), executor)
    }

    const UBUNTU_POLICY_8: &str =
        "dotnet-sdk-8.0:\n  Installed: 8.0.104-0ubuntu1~22.04.1\n  Candidate: 8.0.110-0ubuntu1~22.04.1\n";

    #[tokio::test]
    async fn install_runs_elevated_package_commands_in_order() {
        let (provider, executor) = provider(
            SupportedDistro::Ubuntu2204,
            ScriptedExecutor::new()
                .ok("apt-get update", "")
                .ok("apt-get install -y dotnet-sdk-8.0", ""),
        );
        let context = InstallContext::new(
            v("8.0.104"),
            InstallSource::Package("dotnet-sdk-8.0".into()),
            Architecture::X64,
            true,
        );

        let result = provider.install_dotnet(&context).await.unwrap();
        assert!(result.success());
        assert!(result.elevated);
        assert_eq!(
            executor.call_lines(),
            [
                "[elevated] apt-get update",
                "[elevated] apt-get install -y dotnet-sdk-8.0"
            ]
        );
    }

    #[tokio::test]
    async fn install_stops_at_first_failure() {
        let (provider, executor) = provider(
            SupportedDistro::Ubuntu2204,
            ScriptedExecutor::new().respond("apt-get update", Some(100), ""),
        );
        let context = InstallContext::new(
            v("8.0.104"),
            InstallSource::InstallerUrl("ignored".into()),
            Architecture::X64,
            true,
        );
        let result = provider.install_dotnet(&context).await.unwrap();
        assert_eq!(result.status, Some(100));
        assert_eq!(executor.calls().len(), 1);
    }

    #[tokio::test]
    async fn global_path_follows_symlink() {
        let (provider, _) = provider(
            SupportedDistro::Ubuntu2204,
            ScriptedExecutor::new()
                .ok("which dotnet", "/usr/bin/dotnet\n")
                .ok("readlink -f /usr/bin/dotnet", "/usr/lib/dotnet/dotnet\n")
                .ok("dotnet --version", "8.0.104\n"),
        );
        assert_eq!(
            provider.installed_global_dotnet_path().await.unwrap(),
            Some(PathBuf::from("/usr/lib/dotnet"))
        );
        assert_eq!(
            provider.installed_global_dotnet_version().await.unwrap(),
            Some(v("8.0.104"))
        );
    }

    #[tokio::test]
    async fn absent_dotnet_yields_empty_results() {
        let (provider, _) = provider(SupportedDistro::Rhel9, ScriptedExecutor::new());
        assert_eq!(provider.installed_global_dotnet_path().await.unwrap(), None);
        assert_eq!(provider.installed_global_dotnet_version().await.unwrap(), None);
        assert!(provider.installed_dotnet_versions().await.unwrap().is_empty());
        assert_eq!(
            provider.expected_installation_directory(),
            PathBuf::from("/usr/lib64/dotnet")
        );
    }

    #[tokio::test]
    async fn package_existence_reads_repository_candidate() {
        let (provider, _) = provider(
            SupportedDistro::Ubuntu2204,
            ScriptedExecutor::new()
                .ok("apt-cache policy dotnet-sdk-8.0", UBUNTU_POLICY_8)
                .ok(
                    "apt-cache policy dotnet-sdk-10.0",
                    "dotnet-sdk-10.0:\n  Installed: (none)\n  Candidate: (none)\n",
                ),
        );
        assert!(provider.dotnet_package_exists(&v("8.0.100")).await.unwrap());
        assert!(!provider.dotnet_package_exists(&v("10.0.100")).await.unwrap());
        assert!(!provider.dotnet_package_exists(&v("9.0.100")).await.unwrap());
    }

    #[test]
    fn support_status_combines_packaging_and_lifecycle() {
        let (provider, _) = provider(SupportedDistro::Ubuntu2204, ScriptedExecutor::new());
        assert_eq!(
            provider.version_support_status(&v("8.0.100")),
            SupportStatus::LongTermSupport
        );
        assert_eq!(
            provider.version_support_status(&v("9.0.100")),
            SupportStatus::StandardTermSupport
        );
        assert_eq!(
            provider.version_support_status(&v("6.0.100")),
            SupportStatus::Unsupported
        );
        assert_eq!(
            provider.version_support_status(&v("10.0.100")),
            SupportStatus::Unsupported
        );
        assert!(provider.is_version_supported(&v("8.0.300")));
        assert!(!provider.is_version_supported(&v("7.0.100")));
    }

    #[tokio::test]
    async fn upgrade_stays_within_band() {
        let (provider, executor) = provider(
            SupportedDistro::Ubuntu2204,
            ScriptedExecutor::new()
                .ok("dotnet --list-sdks", "8.0.104 [/usr/lib/dotnet/sdk]\n")
                .ok("apt-cache policy dotnet-sdk-8.0", UBUNTU_POLICY_8)
                .ok("apt-get install --only-upgrade -y dotnet-sdk-8.0", ""),
        );
        let result = provider.upgrade_dotnet(&v("8.0.110")).await.unwrap();
        assert!(result.success());
        assert_eq!(
            executor.call_lines().last().unwrap(),
            "[elevated] apt-get install --only-upgrade -y dotnet-sdk-8.0"
        );
    }

    #[tokio::test]
    async fn upgrade_refuses_band_crossing_candidate() {
        let (provider, executor) = provider(
            SupportedDistro::Rhel9,
            ScriptedExecutor::new()
                .ok("dotnet --list-sdks", "8.0.104 [/usr/lib64/dotnet/sdk]\n")
                .ok(
                    "dnf info --quiet dotnet-sdk-8.0",
                    "Name : dotnet-sdk-8.0\nVersion : 8.0.204\n",
                ),
        );
        let err = provider.upgrade_dotnet(&v("8.0.110")).await.unwrap_err();
        match err {
            GlobalSdkError::ConflictingInstall {
                installed,
                requested,
            } => {
                assert_eq!(installed, "8.0.104");
                assert_eq!(requested, "8.0.204");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(executor.calls().iter().all(|spec| !spec.is_elevated()));
    }

    #[tokio::test]
    async fn upgrade_refuses_candidate_older_than_request() {
        let (provider, executor) = provider(
            SupportedDistro::Ubuntu2204,
            ScriptedExecutor::new()
                .ok("dotnet --list-sdks", "8.0.104 [/usr/lib/dotnet/sdk]\n")
                .ok(
                    "apt-cache policy dotnet-sdk-8.0",
                    "dotnet-sdk-8.0:\n  Installed: 8.0.104-0ubuntu1\n  Candidate: 8.0.106-0ubuntu1\n",
                ),
        );
        let err = provider.upgrade_dotnet(&v("8.0.110")).await.unwrap_err();
        assert!(matches!(err, GlobalSdkError::UnsupportedVersion { ref version, .. } if version == "8.0.110"));
        assert!(executor.calls().iter().all(|spec| !spec.is_elevated()));
    }

    #[tokio::test]
    async fn upgrade_without_install_in_band_fails() {
        let (provider, _) = provider(
            SupportedDistro::Ubuntu2204,
            ScriptedExecutor::new().ok("dotnet --list-sdks", "8.0.104 [/usr/lib/dotnet/sdk]\n"),
        );
        assert!(matches!(
            provider.upgrade_dotnet(&v("8.0.201")).await,
            Err(GlobalSdkError::Runtime(_))
        ));
    }

    #[tokio::test]
    async fn uninstall_removes_exact_version_only() {
        let (provider, executor) = provider(
            SupportedDistro::Arch,
            ScriptedExecutor::new()
                .ok("dotnet --list-sdks", "9.0.101 [/usr/share/dotnet/sdk]\n")
                .ok("pacman -R --noconfirm dotnet-sdk-9.0", ""),
        );
        assert!(provider.uninstall_dotnet(&v("9.0.100")).await.is_err());
        let result = provider.uninstall_dotnet(&v("9.0.101")).await.unwrap();
        assert!(result.success());
        assert_eq!(
            executor.call_lines().last().unwrap(),
            "[elevated] pacman -R --noconfirm dotnet-sdk-9.0"
        );
    }
}
