//! Manager configuration: where configs, state files and backups live

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Current config version for migration support
pub const CONFIG_VERSION: u32 = 1;

/// Environment variable that overrides the manager config location
pub const CONFIG_ENV: &str = "SS_MANAGER_CONFIG";

/// Name of the port registry file inside the state directory
pub const PORTS_FILE: &str = "ports";

/// Name of the settings file inside the state directory
pub const SETTINGS_FILE: &str = "settings";

/// Name of the advisory lock file inside the state directory
pub const LOCK_FILE: &str = ".lock";

/// File name of the backup archive under the home directory
pub const BACKUP_FILE: &str = "ss-manager-backup.tar.gz";

/// Top-level configuration for the manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    pub version: u32,
    pub paths: PathsSection,
    pub service: ServiceSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsSection {
    /// Directory holding one `<name>.json` document per server config
    pub config_dir: PathBuf,
    /// Directory holding the port registry, settings and lock files
    pub state_dir: PathBuf,
    /// Where `backup` writes and where `restore` looks by default
    pub backup_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSection {
    /// Systemd template unit prefix; the config name is the instance
    pub unit_prefix: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/root"));
        Self {
            version: CONFIG_VERSION,
            paths: PathsSection {
                config_dir: PathBuf::from("/etc/shadowsocks-libev"),
                state_dir: PathBuf::from("/etc/ss-manager"),
                backup_path: home.join(BACKUP_FILE),
            },
            service: ServiceSection {
                unit_prefix: "shadowsocks-libev-server@".to_string(),
            },
        }
    }
}

impl ManagerConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("/etc/ss-manager/manager.toml")
    }

    /// Config with every path rooted under `root`; used for sandboxes and tests
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            paths: PathsSection {
                config_dir: root.join("configs"),
                state_dir: root.join("state"),
                backup_path: root.join(BACKUP_FILE),
            },
            ..Self::default()
        }
    }

    /// Load config from `path`, or create the default there if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            log::info!("Wrote default manager config to {}", path.display());
            Ok(config)
        }
    }

    /// Load config from a specific path
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;

        if config.version != CONFIG_VERSION {
            log::warn!(
                "Manager config {} has version {}, expected {}",
                path.display(),
                config.version,
                CONFIG_VERSION
            );
        }

        config.validate()?;
        Ok(config)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.paths.config_dir.as_os_str().is_empty() {
            return Err(Error::validation("Config directory cannot be empty"));
        }
        if self.paths.state_dir.as_os_str().is_empty() {
            return Err(Error::validation("State directory cannot be empty"));
        }
        if self.paths.backup_path.as_os_str().is_empty() {
            return Err(Error::validation("Backup path cannot be empty"));
        }
        if self.service.unit_prefix.is_empty() || !self.service.unit_prefix.ends_with('@') {
            return Err(Error::validation(
                "Unit prefix must name a template unit and end with '@'",
            ));
        }
        Ok(())
    }

    pub fn ports_path(&self) -> PathBuf {
        self.paths.state_dir.join(PORTS_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.paths.state_dir.join(SETTINGS_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.paths.state_dir.join(LOCK_FILE)
    }
}
