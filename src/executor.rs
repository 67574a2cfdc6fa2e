/*============================================================
  Project: GlobalSDK
  Module: globalsdk_core::executor
  ------------------------------------------------------------
  Purpose:
    Run external commands and own the only code path allowed to
    add elevation to a command.

  Security / Safety Notes:
    Command specs are vetted for elevation markers before they
    run. A leading `sudo` is re-routed into an elevation request;
    any other marker is rejected. Elevation is applied here and
    nowhere else.

  Dependencies:
    tokio::process for async execution, async-trait for the
    executor seam, libc for the effective uid probe.

  Operational Scope:
    Used by the installers, the registry enumeration and every
    Linux distro provider.

  Revision History:
    2026-10-19 COD  Centralised command execution and elevation.
============================================================*/

use std::fmt;
use std::path::Path;
use std::process::{Output, Stdio};

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{map_spawn_error, GlobalSdkError, Result};

/// Tokens that would gain privilege if they reached a plain subprocess.
const ELEVATION_MARKERS: &[&str] = &["sudo", "pkexec", "doas", "su", "runas"];

/// A single command invocation, optionally requesting elevation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    elevated: bool,
}

impl CommandSpec {
    pub fn new<P, I, S>(program: P, args: I) -> Self
    where
        P: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            elevated: false,
        }
    }

    /// Request that the executor run this command with root/admin rights.
    pub fn elevated(mut self) -> Self {
        self.elevated = true;
        self
    }

    /// Split a command line on whitespace. A leading `sudo` is turned into an
    /// elevation request instead of being passed through.
    pub fn parse(line: &str) -> Result<Self> {
        let mut tokens = line.split_whitespace();
        let first = tokens
            .next()
            .ok_or_else(|| GlobalSdkError::Runtime("Empty command line".into()))?;
        if first == "sudo" {
            let program = tokens.next().ok_or_else(|| {
                GlobalSdkError::PrivilegeDenied("`sudo` without a command".into())
            })?;
            let spec = CommandSpec::new(program, tokens).elevated();
            vet(&spec)?;
            Ok(spec)
        } else {
            let spec = CommandSpec::new(first, tokens);
            vet(&spec)?;
            Ok(spec)
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn is_elevated(&self) -> bool {
        self.elevated
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elevated {
            f.write_str("[elevated] ")?;
        }
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Reject specs that try to smuggle in their own elevation. The program and
/// every shell word inside every argument are checked by command name, so
/// `sh -c "sudo ..."` and `env /usr/bin/sudo ...` are caught too.
pub fn vet(spec: &CommandSpec) -> Result<()> {
    let offending = std::iter::once(spec.program.as_str())
        .chain(spec.args.iter().flat_map(|arg| shell_words(arg)))
        .find(|token| {
            let name = command_name(token);
            ELEVATION_MARKERS
                .iter()
                .any(|marker| name.eq_ignore_ascii_case(marker))
        });
    match offending {
        Some(marker) => Err(GlobalSdkError::PrivilegeDenied(format!(
            "`{spec}` contains elevation marker `{marker}`; request elevation through the executor"
        ))),
        None => Ok(()),
    }
}

/// Words a shell would see in `arg`, split on whitespace and operators.
fn shell_words(arg: &str) -> impl Iterator<Item = &str> {
    arg.split(|c: char| {
        c.is_whitespace()
            || matches!(
                c,
                ';' | '&' | '|' | '(' | ')' | '{' | '}' | '`' | '\'' | '"' | '$' | '<' | '>' | '='
            )
    })
    .filter(|word| !word.is_empty())
}

/// Final path component without its extension, for either separator.
fn command_name(token: &str) -> &str {
    let base = token.rsplit(['/', '\\']).next().unwrap_or(token);
    Path::new(base)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(base)
}

/// Captured outcome of one executor call.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CommandExecutionResult {
    /// Exit code, if the OS reported one.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Whether elevation was actually applied.
    pub elevated: bool,
}

impl CommandExecutionResult {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Turn a non-zero exit into `CommandFailure`.
    pub fn ensure_success(self, spec: &CommandSpec) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(GlobalSdkError::CommandFailure {
                command: spec.to_string(),
                status: self.status.unwrap_or(-1),
                stderr: self.stderr.trim().to_string(),
            })
        }
    }

    fn from_output(output: Output, elevated: bool) -> Self {
        Self {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            elevated,
        }
    }
}

/// The sanctioned way to run anything outside the process.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a command to completion, capturing output. Non-zero exits are
    /// returned as results, not errors.
    async fn execute(&self, spec: &CommandSpec) -> Result<CommandExecutionResult>;

    /// Blocking variant for quick read-only probes.
    fn execute_sync(&self, spec: &CommandSpec) -> Result<CommandExecutionResult>;

    /// Whether the current process already holds elevated privileges.
    fn is_elevated(&self) -> bool;
}

/// Executor backed by real subprocesses.
#[derive(Debug, Clone)]
pub struct SystemCommandExecutor {
    elevation_program: String,
    elevated: bool,
}

impl SystemCommandExecutor {
    pub fn new(elevation_program: impl Into<String>) -> Self {
        Self {
            elevation_program: elevation_program.into(),
            elevated: has_elevated_privileges(),
        }
    }

    /// Resolve the program and argv to spawn, applying elevation if needed.
    fn plan(&self, spec: &CommandSpec) -> Result<(String, Vec<String>, bool)> {
        vet(spec)?;
        if !spec.elevated || self.elevated {
            return Ok((spec.program.clone(), spec.args.clone(), self.elevated));
        }
        if cfg!(windows) {
            return Err(GlobalSdkError::PrivilegeDenied(format!(
                "`{spec}` needs an elevated session"
            )));
        }
        let mut args = Vec::with_capacity(spec.args.len() + 1);
        args.push(spec.program.clone());
        args.extend(spec.args.iter().cloned());
        Ok((self.elevation_program.clone(), args, true))
    }

    fn spawn_error(&self, err: std::io::Error, program: &str, elevated: bool) -> GlobalSdkError {
        if elevated && program == self.elevation_program && err.kind() == std::io::ErrorKind::NotFound
        {
            GlobalSdkError::PrivilegeDenied(format!(
                "elevation program `{program}` is not available"
            ))
        } else {
            map_spawn_error(err, program)
        }
    }
}

impl Default for SystemCommandExecutor {
    fn default() -> Self {
        Self::new("pkexec")
    }
}

#[async_trait]
impl CommandExecutor for SystemCommandExecutor {
    async fn execute(&self, spec: &CommandSpec) -> Result<CommandExecutionResult> {
        let (program, args, elevated) = self.plan(spec)?;
        let output = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|err| self.spawn_error(err, &program, elevated))?;
        Ok(CommandExecutionResult::from_output(output, elevated))
    }

    fn execute_sync(&self, spec: &CommandSpec) -> Result<CommandExecutionResult> {
        let (program, args, elevated) = self.plan(spec)?;
        let output = std::process::Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|err| self.spawn_error(err, &program, elevated))?;
        Ok(CommandExecutionResult::from_output(output, elevated))
    }

    fn is_elevated(&self) -> bool {
        self.elevated
    }
}

/// `net session` only succeeds in an elevated session; anything else,
/// including the command being absent, counts as not elevated.
#[cfg(windows)]
pub fn has_elevated_privileges() -> bool {
    std::process::Command::new("net")
        .arg("session")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(not(windows))]
pub fn has_elevated_privileges() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_sudo_is_rerouted() {
        let spec = CommandSpec::parse("sudo apt-get install -y dotnet-sdk-8.0").unwrap();
        assert!(spec.is_elevated());
        assert_eq!(spec.program(), "apt-get");
        assert_eq!(spec.args(), ["install", "-y", "dotnet-sdk-8.0"]);
    }

    #[test]
    fn embedded_markers_are_rejected() {
        for line in [
            "sh -c sudo rm -rf /",
            "pkexec dnf install dotnet-sdk-8.0",
            "sudo doas apt-get update",
            "/usr/bin/sudo.exe apt-get update",
        ] {
            assert!(
                matches!(
                    CommandSpec::parse(line),
                    Err(GlobalSdkError::PrivilegeDenied(_))
                ),
                "{line}"
            );
        }
        let spec = CommandSpec::new("env", ["RUNAS", "x"]);
        assert!(vet(&spec).is_err());
    }

    #[test]
    fn markers_inside_arguments_are_rejected() {
        let specs = [
            CommandSpec::new("sh", ["-c", "sudo apt-get install -y dotnet-sdk-8.0"]),
            CommandSpec::new("env", ["/usr/bin/sudo", "apt-get", "update"]),
            CommandSpec::new("bash", ["-c", "apt-get update&&pkexec dnf upgrade"]),
            CommandSpec::new("cmd", ["/c", "C:\\Windows\\System32\\runas.exe /user:admin x"]),
            CommandSpec::new("sh", ["-c", "echo $(doas id)"]),
        ];
        for spec in specs {
            assert!(
                matches!(vet(&spec), Err(GlobalSdkError::PrivilegeDenied(_))),
                "{spec}"
            );
        }
    }

    #[test]
    fn ordinary_arguments_pass_vetting() {
        for spec in [
            CommandSpec::new("apt-get", ["install", "-y", "dotnet-sdk-8.0"]),
            CommandSpec::new("readlink", ["-f", "/usr/bin/dotnet"]),
            CommandSpec::new("sh", ["-c", "echo out; echo err >&2; exit 3"]),
            CommandSpec::new("open", ["-W", "/tmp/scratch/dotnet-sdk-8.0.100-osx-x64.pkg"]),
        ] {
            assert!(vet(&spec).is_ok(), "{spec}");
        }
    }

    #[test]
    fn plain_commands_pass_vetting() {
        let spec = CommandSpec::parse("dotnet --list-sdks").unwrap();
        assert!(!spec.is_elevated());
        assert_eq!(spec.to_string(), "dotnet --list-sdks");
        assert!(CommandSpec::parse("   ").is_err());
    }

    #[test]
    fn elevation_program_is_only_added_by_executor() {
        let executor = SystemCommandExecutor {
            elevation_program: "pkexec".into(),
            elevated: false,
        };
        let spec = CommandSpec::new("apt-get", ["update"]).elevated();
        if cfg!(windows) {
            assert!(executor.plan(&spec).is_err());
        } else {
            let (program, args, elevated) = executor.plan(&spec).unwrap();
            assert_eq!(program, "pkexec");
            assert_eq!(args, ["apt-get", "update"]);
            assert!(elevated);
        }

        let root = SystemCommandExecutor {
            elevation_program: "pkexec".into(),
            elevated: true,
        };
        let (program, _, elevated) = root.plan(&spec).unwrap();
        assert_eq!(program, "apt-get");
        assert!(elevated);
    }

    #[test]
    fn missing_elevation_program_is_privilege_denied() {
        let executor = SystemCommandExecutor {
            elevation_program: "globalsdk-missing-elevator".into(),
            elevated: false,
        };
        let spec = CommandSpec::new("true", Vec::<String>::new()).elevated();
        if !cfg!(windows) {
            assert!(matches!(
                executor.execute_sync(&spec),
                Err(GlobalSdkError::PrivilegeDenied(_))
            ));
        }
    }

    #[tokio::test]
    async fn captures_output_and_status() {
        if cfg!(windows) {
            return;
        }
        let executor = SystemCommandExecutor {
            elevation_program: "pkexec".into(),
            elevated: false,
        };
        let spec = CommandSpec::new("sh", ["-c", "echo out; echo err >&2; exit 3"]);
        let result = executor.execute(&spec).await.unwrap();
        assert_eq!(result.status, Some(3));
        assert_eq!(result.stdout.trim(), "out");
        assert_eq!(result.stderr.trim(), "err");
        assert!(matches!(
            result.ensure_success(&spec),
            Err(GlobalSdkError::CommandFailure { status: 3, .. })
        ));
    }

    #[test]
    fn missing_program_maps_to_command_missing() {
        let executor = SystemCommandExecutor::default();
        let spec = CommandSpec::new("globalsdk-no-such-binary", ["--version"]);
        assert!(matches!(
            executor.execute_sync(&spec),
            Err(GlobalSdkError::CommandMissing { .. })
        ));
    }
}
