//! Service unit control through systemd

use crate::{CommandRunner, Error, Result, SystemRunner};

/// Starts, stops and enumerates the per-config service units
pub trait ServiceController {
    /// Enable the unit for `name` at boot and start it now
    fn enable(&self, name: &str) -> Result<()>;

    /// Disable the unit for `name` and stop it now
    fn disable(&self, name: &str) -> Result<()>;

    /// Config names of every loaded instance of the unit template,
    /// whether or not a config document still exists for them
    fn instances(&self) -> Result<Vec<String>>;

    /// Verify the controller's tooling is present
    fn check(&self) -> Result<()> {
        Ok(())
    }
}

/// systemd template-unit controller (`<prefix><name>.service`)
#[derive(Debug, Clone)]
pub struct Systemd<R: CommandRunner = SystemRunner> {
    runner: R,
    unit_prefix: String,
}

impl Systemd<SystemRunner> {
    pub fn new(unit_prefix: impl Into<String>) -> Self {
        Self::with_runner(SystemRunner::new(), unit_prefix)
    }
}

impl<R: CommandRunner> Systemd<R> {
    pub fn with_runner(runner: R, unit_prefix: impl Into<String>) -> Self {
        Self {
            runner,
            unit_prefix: unit_prefix.into(),
        }
    }

    /// Full unit name for a config
    pub fn unit_name(&self, name: &str) -> String {
        format!("{}{}.service", self.unit_prefix, name)
    }

    /// Extract the config name from a `list-units` line
    fn parse_instance(&self, line: &str) -> Option<String> {
        let unit = line.split_whitespace().find(|token| *token != "●")?;
        let instance = unit
            .strip_prefix(self.unit_prefix.as_str())?
            .strip_suffix(".service")?;
        if instance.is_empty() {
            None
        } else {
            Some(instance.to_string())
        }
    }

    fn systemctl(&self, args: &[&str]) -> Result<()> {
        let output = self.runner.run("systemctl", args)?;
        if !output.success() {
            return Err(Error::service(format!(
                "systemctl {} failed: {}",
                args.join(" "),
                output.diagnostic()
            )));
        }
        Ok(())
    }
}

impl<R: CommandRunner> ServiceController for Systemd<R> {
    fn enable(&self, name: &str) -> Result<()> {
        let unit = self.unit_name(name);
        log::info!("Enabling and starting {}", unit);
        self.systemctl(&["enable", "--now", &unit])
    }

    fn disable(&self, name: &str) -> Result<()> {
        let unit = self.unit_name(name);
        log::info!("Disabling and stopping {}", unit);
        self.systemctl(&["disable", "--now", &unit])
    }

    fn instances(&self) -> Result<Vec<String>> {
        let pattern = format!("{}*", self.unit_prefix);
        let output = self.runner.run(
            "systemctl",
            &[
                "list-units",
                "--type=service",
                "--all",
                "--no-legend",
                "--plain",
                &pattern,
            ],
        )?;
        if !output.success() {
            return Err(Error::service(format!(
                "Failed to list {} units: {}",
                pattern,
                output.diagnostic()
            )));
        }

        let mut names: Vec<String> = output
            .stdout
            .lines()
            .filter_map(|line| self.parse_instance(line))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn check(&self) -> Result<()> {
        crate::system::check_prerequisites(&self.runner, &["systemctl"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    const PREFIX: &str = "shadowsocks-libev-server@";

    #[test]
    fn test_unit_name() {
        let systemd = Systemd::with_runner(ScriptedRunner::with_tools(&[]), PREFIX);
        assert_eq!(
            systemd.unit_name("work"),
            "shadowsocks-libev-server@work.service"
        );
    }

    #[test]
    fn test_enable_runs_enable_now() {
        let runner = ScriptedRunner::with_tools(&["systemctl"]);
        let systemd = Systemd::with_runner(runner.clone(), PREFIX);

        systemd.enable("work").unwrap();
        systemd.disable("work").unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                "systemctl enable --now shadowsocks-libev-server@work.service",
                "systemctl disable --now shadowsocks-libev-server@work.service",
            ]
        );
    }

    #[test]
    fn test_enable_failure_carries_diagnostic() {
        let runner = ScriptedRunner::with_tools(&["systemctl"]);
        runner.respond("systemctl", 1, "", "Failed to enable unit: Access denied");
        let systemd = Systemd::with_runner(runner, PREFIX);

        let err = systemd.enable("work").unwrap_err();
        assert!(err.to_string().contains("Access denied"));
    }

    #[test]
    fn test_instances_parses_list_units() {
        let runner = ScriptedRunner::with_tools(&["systemctl"]);
        runner.respond(
            "systemctl",
            0,
            "shadowsocks-libev-server@work.service loaded active running Shadowsocks-Libev Custom Server Service for work\n\
             ● shadowsocks-libev-server@orphan.service loaded failed failed Shadowsocks-Libev Custom Server Service for orphan\n\
             shadowsocks-libev.service loaded active running Shadowsocks-libev Default Server Service\n",
            "",
        );
        let systemd = Systemd::with_runner(runner.clone(), PREFIX);

        assert_eq!(systemd.instances().unwrap(), vec!["orphan", "work"]);
        assert!(runner.calls()[0].ends_with("shadowsocks-libev-server@*"));
    }
}
