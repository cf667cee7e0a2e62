//! Firewall port management

use crate::{CommandRunner, Error, FirewallType, Result, SystemRunner};

/// Opens and closes the TCP+UDP pair for a server port
pub trait FirewallController {
    fn open(&self, port: u16) -> Result<()>;

    fn close(&self, port: u16) -> Result<()>;

    /// Verify the controller's tooling is present
    fn check(&self) -> Result<()> {
        Ok(())
    }
}

/// Build the controller matching the configured firewall flavor
pub fn for_type(firewall_type: FirewallType) -> Box<dyn FirewallController> {
    match firewall_type {
        FirewallType::Firewalld => Box::new(Firewalld::new()),
        FirewallType::None => Box::new(NoFirewall),
    }
}

/// Used when the host has no managed firewall
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFirewall;

impl FirewallController for NoFirewall {
    fn open(&self, port: u16) -> Result<()> {
        log::debug!("firewall_type=none, not opening port {}", port);
        Ok(())
    }

    fn close(&self, port: u16) -> Result<()> {
        log::debug!("firewall_type=none, not closing port {}", port);
        Ok(())
    }
}

/// firewalld controller via `firewall-cmd`; changes go to the permanent
/// configuration and are applied with a reload
#[derive(Debug, Clone)]
pub struct Firewalld<R: CommandRunner = SystemRunner> {
    runner: R,
}

impl Firewalld<SystemRunner> {
    pub fn new() -> Self {
        Self::with_runner(SystemRunner::new())
    }
}

impl Default for Firewalld<SystemRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CommandRunner> Firewalld<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    /// `firewall-cmd` arguments adding or removing both protocols for `port`
    pub fn port_args(action: &str, port: u16) -> Vec<String> {
        vec![
            "--permanent".to_string(),
            format!("--{}-port={}/tcp", action, port),
            format!("--{}-port={}/udp", action, port),
        ]
    }

    fn apply(&self, action: &str, port: u16) -> Result<()> {
        let args = Self::port_args(action, port);
        let args_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();

        let output = self.runner.run("firewall-cmd", &args_refs)?;
        if !output.success() {
            return Err(Error::firewall(format!(
                "Failed to {} port {}: {}",
                action,
                port,
                output.diagnostic()
            )));
        }

        let reload = self.runner.run("firewall-cmd", &["--reload"])?;
        if !reload.success() {
            return Err(Error::firewall(format!(
                "Failed to reload firewalld: {}",
                reload.diagnostic()
            )));
        }
        Ok(())
    }
}

impl<R: CommandRunner> FirewallController for Firewalld<R> {
    fn open(&self, port: u16) -> Result<()> {
        log::info!("Opening port {} (tcp+udp) in firewalld", port);
        self.apply("add", port)
    }

    fn close(&self, port: u16) -> Result<()> {
        log::info!("Closing port {} (tcp+udp) in firewalld", port);
        self.apply("remove", port)
    }

    fn check(&self) -> Result<()> {
        crate::system::check_prerequisites(&self.runner, &["firewall-cmd"])
    }
}
