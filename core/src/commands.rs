//! Command registry: maps action names to typed handlers
//!
//! Every action the tool accepts is listed in [`COMMANDS`]. Resolution and
//! argument-count checks happen before a handler runs, so an unknown action
//! or a missing argument never reaches the config store or the host.

use crate::model::{validate_config_name, ConfigRecord};
use crate::{Error, ErrorKind, Manager, OperationLock, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Asks the operator a yes/no question
pub trait Prompt {
    fn confirm(&self, question: &str) -> bool;
}

/// Answers every question the same way; for non-interactive use
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Prompt for FixedAnswer {
    fn confirm(&self, _question: &str) -> bool {
        self.0
    }
}

/// When a command changes persisted state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Never,
    Always,
    /// Only when given arguments (`address <addr>`, `settings <key> <value>`)
    WithArgs,
}

type Handler = fn(&mut Manager, &dyn Prompt, &[String]) -> Result<Vec<String>>;

pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub summary: &'static str,
    pub min_args: usize,
    pub max_args: Option<usize>,
    pub mutation: Mutation,
    /// Drives the service or firewall controller
    pub touches_host: bool,
    handler: Handler,
}

impl CommandSpec {
    pub fn mutates(&self, args: &[String]) -> bool {
        match self.mutation {
            Mutation::Never => false,
            Mutation::Always => true,
            Mutation::WithArgs => !args.is_empty(),
        }
    }

    fn check_arity(&self, args: &[String]) -> Result<()> {
        if args.len() < self.min_args {
            return Err(Error::missing_argument(format!("usage: {}", self.usage)));
        }
        if let Some(max) = self.max_args {
            if args.len() > max {
                return Err(Error::validation(format!(
                    "Too many arguments for '{}' (usage: {})",
                    self.name, self.usage
                )));
            }
        }
        Ok(())
    }
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "new",
        usage: "new <names...>",
        summary: "Create configs with a random port and password and start them",
        min_args: 1,
        max_args: None,
        mutation: Mutation::Always,
        touches_host: true,
        handler: cmd_new,
    },
    CommandSpec {
        name: "del",
        usage: "del <names...>",
        summary: "Stop configs and delete them",
        min_args: 1,
        max_args: None,
        mutation: Mutation::Always,
        touches_host: true,
        handler: cmd_del,
    },
    CommandSpec {
        name: "ls",
        usage: "ls [<names...>]",
        summary: "List config names",
        min_args: 0,
        max_args: None,
        mutation: Mutation::Never,
        touches_host: false,
        handler: cmd_ls,
    },
    CommandSpec {
        name: "ll",
        usage: "ll [<names...>]",
        summary: "List configs with port, cipher and details",
        min_args: 0,
        max_args: None,
        mutation: Mutation::Never,
        touches_host: false,
        handler: cmd_ll,
    },
    CommandSpec {
        name: "uri",
        usage: "uri [<names...>]",
        summary: "Print ss:// URIs",
        min_args: 0,
        max_args: None,
        mutation: Mutation::Never,
        touches_host: false,
        handler: cmd_uri,
    },
    CommandSpec {
        name: "address",
        usage: "address [<addr>]",
        summary: "Show or set the address advertised in URIs",
        min_args: 0,
        max_args: Some(1),
        mutation: Mutation::WithArgs,
        touches_host: false,
        handler: cmd_address,
    },
    CommandSpec {
        name: "refresh",
        usage: "refresh",
        summary: "Rebuild service, port and firewall state from the configs",
        min_args: 0,
        max_args: Some(0),
        mutation: Mutation::Always,
        touches_host: true,
        handler: cmd_refresh,
    },
    CommandSpec {
        name: "rename",
        usage: "rename <old> <new>",
        summary: "Rename a config, keeping its port and password",
        min_args: 2,
        max_args: Some(2),
        mutation: Mutation::Always,
        touches_host: true,
        handler: cmd_rename,
    },
    CommandSpec {
        name: "settings",
        usage: "settings [<key> <value>]",
        summary: "Show settings, or set server_address / firewall_type",
        min_args: 0,
        max_args: Some(2),
        mutation: Mutation::WithArgs,
        touches_host: false,
        handler: cmd_settings,
    },
    CommandSpec {
        name: "backup",
        usage: "backup",
        summary: "Archive all configs",
        min_args: 0,
        max_args: Some(0),
        mutation: Mutation::Always,
        touches_host: false,
        handler: cmd_backup,
    },
    CommandSpec {
        name: "restore",
        usage: "restore <file>",
        summary: "Restore configs from an archive and refresh",
        min_args: 1,
        max_args: Some(1),
        mutation: Mutation::Always,
        touches_host: true,
        handler: cmd_restore,
    },
];

/// Lookup table over [`COMMANDS`]
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, &'static CommandSpec>,
}

impl CommandRegistry {
    /// Build the registry, rejecting duplicate action names
    pub fn new() -> Result<Self> {
        Self::from_specs(COMMANDS)
    }

    fn from_specs(specs: &'static [CommandSpec]) -> Result<Self> {
        let mut commands = BTreeMap::new();
        for spec in specs {
            if commands.insert(spec.name, spec).is_some() {
                return Err(Error::validation(format!(
                    "Action '{}' is registered twice",
                    spec.name
                )));
            }
        }
        Ok(Self { commands })
    }

    pub fn resolve(&self, name: &str) -> Result<&'static CommandSpec> {
        self.commands
            .get(name)
            .copied()
            .ok_or_else(|| Error::ActionNotFound(name.to_string()))
    }

    pub fn specs(&self) -> impl Iterator<Item = &'static CommandSpec> + '_ {
        self.commands.values().copied()
    }

    /// Resolve, validate and run one action, returning lines to print.
    ///
    /// Mutating actions run under the operation lock; actions that drive the
    /// host first check that the service and firewall tools are present.
    pub fn dispatch(
        &self,
        manager: &mut Manager,
        prompt: &dyn Prompt,
        name: &str,
        args: &[String],
    ) -> Result<Vec<String>> {
        let spec = self.resolve(name)?;
        spec.check_arity(args)?;

        if spec.touches_host {
            manager.check_prerequisites()?;
        }
        let _lock = if spec.mutates(args) {
            Some(OperationLock::acquire(&manager.config().lock_path())?)
        } else {
            None
        };

        log::debug!("Dispatching '{}' with {} argument(s)", spec.name, args.len());
        (spec.handler)(manager, prompt, args)
    }
}

/// Names to act on: the given ones, or every stored config
fn selected_names(manager: &Manager, args: &[String]) -> Result<Vec<String>> {
    if args.is_empty() {
        return manager.list();
    }
    for name in args {
        validate_config_name(name)?;
        if !manager.store().exists(name) {
            return Err(Error::not_found(format!("Config '{}' does not exist", name)));
        }
    }
    Ok(args.to_vec())
}

fn cmd_new(manager: &mut Manager, _prompt: &dyn Prompt, args: &[String]) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for name in args {
        let record = manager.create_config(name)?;
        lines.push(format!("Created {} on port {}", record.name, record.server_port));
    }
    Ok(lines)
}

fn cmd_del(manager: &mut Manager, _prompt: &dyn Prompt, args: &[String]) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for name in args {
        manager.delete_config(name)?;
        lines.push(format!("Deleted {}", name));
    }
    Ok(lines)
}

fn cmd_ls(manager: &mut Manager, _prompt: &dyn Prompt, args: &[String]) -> Result<Vec<String>> {
    selected_names(manager, args)
}

fn detail_line(record: &ConfigRecord, modified: &str) -> String {
    format!(
        "{:<20} {:>5}  {:<24} {:>4}s  {:<20} {}",
        record.name,
        record.server_port,
        record.method,
        record.timeout,
        record.bind_addresses.join(","),
        modified
    )
}

fn cmd_ll(manager: &mut Manager, _prompt: &dyn Prompt, args: &[String]) -> Result<Vec<String>> {
    let mut lines = vec![format!(
        "{:<20} {:>5}  {:<24} {:>5}  {:<20} {}",
        "NAME", "PORT", "METHOD", "TIME", "BIND", "MODIFIED"
    )];
    for name in selected_names(manager, args)? {
        let summary = manager.summary(&name)?;
        let modified = summary
            .modified
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        lines.push(detail_line(&summary.record, &modified));
    }
    Ok(lines)
}

fn cmd_uri(manager: &mut Manager, _prompt: &dyn Prompt, args: &[String]) -> Result<Vec<String>> {
    let names = selected_names(manager, args)?;
    let mut lines = Vec::new();
    for name in &names {
        let uri = manager.uri(name)?;
        if names.len() == 1 {
            lines.push(uri);
        } else {
            lines.push(format!("{:<20} {}", name, uri));
        }
    }
    Ok(lines)
}

fn cmd_address(
    manager: &mut Manager,
    _prompt: &dyn Prompt,
    args: &[String],
) -> Result<Vec<String>> {
    if let Some(address) = args.first() {
        manager.set_address(address)?;
    }
    let settings = manager.settings();
    Ok(vec![if settings.has_address() {
        settings.server_address.clone()
    } else {
        "(unset)".to_string()
    }])
}

fn cmd_refresh(
    manager: &mut Manager,
    _prompt: &dyn Prompt,
    _args: &[String],
) -> Result<Vec<String>> {
    manager.refresh()?;
    Ok(vec![format!("Refreshed {} config(s)", manager.list()?.len())])
}

fn cmd_rename(
    manager: &mut Manager,
    _prompt: &dyn Prompt,
    args: &[String],
) -> Result<Vec<String>> {
    let record = manager.rename_config(&args[0], &args[1])?;
    Ok(vec![format!("Renamed {} to {}", args[0], record.name)])
}

fn cmd_settings(
    manager: &mut Manager,
    _prompt: &dyn Prompt,
    args: &[String],
) -> Result<Vec<String>> {
    match args {
        [] => {}
        [key] => {
            return Err(Error::missing_argument(format!("value for setting '{}'", key)));
        }
        [key, value, ..] => {
            manager.update_setting(key, value)?;
        }
    }
    Ok(manager
        .settings()
        .render()
        .lines()
        .filter(|line| !line.starts_with('#'))
        .map(|line| line.to_string())
        .collect())
}

fn cmd_backup(manager: &mut Manager, prompt: &dyn Prompt, _args: &[String]) -> Result<Vec<String>> {
    let path = match manager.backup(false) {
        Ok(path) => path,
        Err(e) if e.kind() == ErrorKind::FileConflict => {
            let question = format!("Overwrite existing backup {}?", manager.backup_path().display());
            if !prompt.confirm(&question) {
                return Err(e);
            }
            manager.backup(true)?
        }
        Err(e) => return Err(e),
    };
    Ok(vec![format!("Backup written to {}", path.display())])
}

fn cmd_restore(
    manager: &mut Manager,
    _prompt: &dyn Prompt,
    args: &[String],
) -> Result<Vec<String>> {
    let restored = manager.restore(Path::new(&args[0]))?;
    Ok(vec![format!(
        "Restored {} config(s) from {}",
        restored.len(),
        args[0]
    )])
}
