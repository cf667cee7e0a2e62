//! SS Manager - command-line front end
//!
//! Manages multiple shadowsocks-libev server configurations on one host.
//! Every action goes through the core command registry; errors exit with the
//! status of their kind.

mod prompt;

use clap::{ArgAction, Parser};
use prompt::TerminalPrompt;
use ss_manager_core::config::CONFIG_ENV;
use ss_manager_core::{
    firewall, CommandRegistry, Error, Manager, ManagerConfig, Result, Settings, SystemRunner,
    Systemd,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Manage shadowsocks-libev server configs, their ports, units and firewall rules
#[derive(Parser)]
#[command(name = "ss-manager")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Manager config file
    #[arg(long, env = CONFIG_ENV, default_value_os_t = ManagerConfig::default_path())]
    config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Answer yes to confirmation prompts
    #[arg(short = 'y', long)]
    yes: bool,

    /// Action to run (new, del, ls, ll, uri, address, refresh, rename, settings, backup, restore)
    action: Option<String>,

    /// Arguments for the action
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn usage(registry: &CommandRegistry) -> String {
    let mut lines = vec!["Actions:".to_string()];
    for spec in registry.specs() {
        lines.push(format!("  {:<26} {}", spec.usage, spec.summary));
    }
    lines.join("\n")
}

fn run(cli: Cli) -> Result<Vec<String>> {
    let registry = CommandRegistry::new()?;

    let Some(action) = cli.action.as_deref() else {
        eprintln!("{}", usage(&registry));
        return Err(Error::missing_argument("action"));
    };
    // Reject unknown actions before anything is created on disk
    registry.resolve(action)?;

    let config = ManagerConfig::load_or_default(&cli.config)?;
    let runner = SystemRunner::new();
    let settings = Settings::load_or_init(&config.settings_path(), &runner)?;
    log::debug!(
        "Loaded settings: server_address={:?} firewall_type={}",
        settings.server_address,
        settings.firewall_type
    );

    let service = Box::new(Systemd::new(config.service.unit_prefix.clone()));
    let firewall = firewall::for_type(settings.firewall_type);
    let mut manager = Manager::new(config, settings, service, firewall)?;

    let prompt = TerminalPrompt {
        assume_yes: cli.yes,
    };
    registry.dispatch(&mut manager, &prompt, action, &cli.args)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(lines) => {
            for line in lines {
                println!("{}", line);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("ss-manager: {}", e);
            log::debug!("Exiting with {:?}", e.kind());
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
