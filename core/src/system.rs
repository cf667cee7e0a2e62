//! External command execution for the service and firewall controllers

use crate::{Error, Result};
use std::process::{Command, Output};

/// Output from a command execution
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Best available diagnostic: stderr if present, stdout otherwise
    pub fn diagnostic(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }
}

/// Runs external programs and captures their output
pub trait CommandRunner {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Whether `cmd` resolves on PATH
    fn exists(&self, cmd: &str) -> bool;
}

/// Runs commands on the local host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    fn parse_output(output: Output) -> CommandOutput {
        CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput> {
        log::debug!("Running: {} {}", cmd, args.join(" "));
        let output = Command::new(cmd).args(args).output().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::MissingRequirement(cmd.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                Error::NoPermission(format!("cannot execute {}: {}", cmd, e))
            }
            _ => Error::Command {
                cmd: format!("{} {}", cmd, args.join(" ")),
                message: e.to_string(),
            },
        })?;

        let output = Self::parse_output(output);
        if !output.success() {
            log::debug!("{} exited with {}: {}", cmd, output.exit_code, output.diagnostic());
        }
        Ok(output)
    }

    fn exists(&self, cmd: &str) -> bool {
        Command::new("which")
            .arg(cmd)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

/// Check that the host can run the manager at all
pub fn check_platform() -> Result<()> {
    if !cfg!(target_os = "linux") {
        return Err(Error::UnsupportedPlatform(format!(
            "{} (systemd hosts only)",
            std::env::consts::OS
        )));
    }
    Ok(())
}

/// Check that every command in `required` is available
pub fn check_prerequisites(runner: &dyn CommandRunner, required: &[&str]) -> Result<()> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|cmd| !runner.exists(cmd))
        .collect();

    if !missing.is_empty() {
        return Err(Error::MissingRequirement(format!(
            "Required commands not found: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;
    use crate::ErrorKind;

    #[test]
    fn test_diagnostic_prefers_stderr() {
        let output = CommandOutput {
            exit_code: 1,
            stdout: "out".to_string(),
            stderr: " err \n".to_string(),
        };
        assert_eq!(output.diagnostic(), "err");

        let output = CommandOutput {
            exit_code: 1,
            stdout: "only out\n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(output.diagnostic(), "only out");
    }

    #[test]
    fn test_missing_prerequisites() {
        let runner = ScriptedRunner::with_tools(&["systemctl"]);
        assert!(check_prerequisites(&runner, &["systemctl"]).is_ok());

        let err = check_prerequisites(&runner, &["systemctl", "ss-server"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequirement);
        assert!(err.to_string().contains("ss-server"));
    }

    #[test]
    fn test_system_runner_missing_binary() {
        let err = SystemRunner::new()
            .run("definitely-not-a-real-binary-ssm", &[])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequirement);
    }
}
