//! SS Manager Core Library
//!
//! This crate manages multiple shadowsocks-libev server configurations on a
//! single host, keeping config documents, the allocated port list, systemd
//! units and firewall rules in agreement.

pub mod backup;
pub mod commands;
pub mod config;
pub mod error;
pub mod firewall;
pub mod lock;
pub mod manager;
pub mod model;
pub mod ports;
pub mod service;
pub mod settings;
pub mod store;
pub mod system;
pub mod uri;

#[cfg(test)]
mod testing;

pub use commands::{CommandRegistry, FixedAnswer, Prompt};
pub use config::ManagerConfig;
pub use error::{Error, ErrorKind, Result};
pub use firewall::{FirewallController, Firewalld, NoFirewall};
pub use lock::OperationLock;
pub use manager::Manager;
pub use model::*;
pub use ports::{PortAllocator, PortRegistry};
pub use service::{ServiceController, Systemd};
pub use settings::{FirewallType, Settings};
pub use store::{ConfigStore, ConfigSummary};
pub use system::{CommandOutput, CommandRunner, SystemRunner};
