//! In-memory stand-ins for the host used by unit tests

use crate::{
    CommandOutput, CommandRunner, Error, FirewallController, Manager, ManagerConfig, Result,
    ServiceController, Settings,
};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::rc::Rc;
use tempfile::TempDir;

#[derive(Debug, Default)]
struct HostState {
    units: BTreeSet<String>,
    open_ports: BTreeSet<u16>,
    calls: Vec<String>,
    fail_firewall: bool,
}

/// Records the service units and firewall ports a real host would end up with
#[derive(Debug, Clone, Default)]
pub struct FakeHost {
    state: Rc<RefCell<HostState>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service(&self) -> Box<dyn ServiceController> {
        Box::new(FakeService(self.clone()))
    }

    pub fn firewall(&self) -> Box<dyn FirewallController> {
        Box::new(FakeFirewall(self.clone()))
    }

    pub fn enable_unit(&self, name: &str) {
        self.state.borrow_mut().units.insert(name.to_string());
    }

    pub fn unit_enabled(&self, name: &str) -> bool {
        self.state.borrow().units.contains(name)
    }

    pub fn enabled_units(&self) -> Vec<String> {
        self.state.borrow().units.iter().cloned().collect()
    }

    pub fn open_port(&self, port: u16) {
        self.state.borrow_mut().open_ports.insert(port);
    }

    pub fn port_open(&self, port: u16) -> bool {
        self.state.borrow().open_ports.contains(&port)
    }

    pub fn open_ports(&self) -> BTreeSet<u16> {
        self.state.borrow().open_ports.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn fail_firewall(&self, fail: bool) {
        self.state.borrow_mut().fail_firewall = fail;
    }

    fn record(&self, call: String) {
        self.state.borrow_mut().calls.push(call);
    }
}

struct FakeService(FakeHost);

impl ServiceController for FakeService {
    fn enable(&self, name: &str) -> Result<()> {
        self.0.record(format!("enable {}", name));
        self.0.enable_unit(name);
        Ok(())
    }

    fn disable(&self, name: &str) -> Result<()> {
        self.0.record(format!("disable {}", name));
        self.0.state.borrow_mut().units.remove(name);
        Ok(())
    }

    fn instances(&self) -> Result<Vec<String>> {
        Ok(self.0.enabled_units())
    }
}

struct FakeFirewall(FakeHost);

impl FirewallController for FakeFirewall {
    fn open(&self, port: u16) -> Result<()> {
        self.0.record(format!("open {}", port));
        if self.0.state.borrow().fail_firewall {
            return Err(Error::firewall("firewalld is not running"));
        }
        self.0.open_port(port);
        Ok(())
    }

    fn close(&self, port: u16) -> Result<()> {
        self.0.record(format!("close {}", port));
        if self.0.state.borrow().fail_firewall {
            return Err(Error::firewall("firewalld is not running"));
        }
        self.0.state.borrow_mut().open_ports.remove(&port);
        Ok(())
    }
}

/// Temporary manager root backed by a [`FakeHost`]
pub struct TestEnv {
    pub dir: TempDir,
    pub host: FakeHost,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            host: FakeHost::new(),
        }
    }

    pub fn config(&self) -> ManagerConfig {
        ManagerConfig::rooted_at(self.dir.path())
    }

    pub fn manager(&self) -> Manager {
        Manager::new(
            self.config(),
            Settings::default(),
            self.host.service(),
            self.host.firewall(),
        )
        .unwrap()
    }

    /// Registry holds exactly the ports of the stored (enabled) configs and
    /// the fake host has exactly those units running
    pub fn assert_registry_agrees(&self, manager: &Manager) {
        let names = manager.list().unwrap();
        let expected: BTreeSet<u16> = names
            .iter()
            .map(|n| manager.read(n).unwrap().server_port)
            .collect();

        let registered = manager.ports().ports().unwrap();
        let registered_set: BTreeSet<u16> = registered.iter().copied().collect();
        assert_eq!(registered.len(), registered_set.len(), "duplicate registry entries");
        assert_eq!(registered_set, expected);
        assert_eq!(self.host.enabled_units(), names);
    }
}

#[derive(Debug, Default)]
struct RunnerState {
    tools: BTreeSet<String>,
    responses: HashMap<String, VecDeque<CommandOutput>>,
    calls: Vec<String>,
}

/// [`CommandRunner`] returning queued outputs and recording every call.
/// Commands with nothing queued succeed with empty output.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    state: Rc<RefCell<RunnerState>>,
}

impl ScriptedRunner {
    pub fn with_tools(tools: &[&str]) -> Self {
        let runner = Self::default();
        runner.state.borrow_mut().tools = tools.iter().map(|t| t.to_string()).collect();
        runner
    }

    pub fn respond(&self, cmd: &str, exit_code: i32, stdout: &str, stderr: &str) {
        self.state
            .borrow_mut()
            .responses
            .entry(cmd.to_string())
            .or_default()
            .push_back(CommandOutput {
                exit_code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            });
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput> {
        let mut state = self.state.borrow_mut();
        let line = if args.is_empty() {
            cmd.to_string()
        } else {
            format!("{} {}", cmd, args.join(" "))
        };
        state.calls.push(line);
        Ok(state
            .responses
            .get_mut(cmd)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_default())
    }

    fn exists(&self, cmd: &str) -> bool {
        self.state.borrow().tools.contains(cmd)
    }
}
