//! Lifecycle orchestration: keeps config documents, the port registry and
//! the external service/firewall state in agreement

use crate::backup;
use crate::model::{generate_password, validate_config_name, ConfigRecord, Direction};
use crate::ports::{PortAllocator, PortRegistry};
use crate::store::{ConfigStore, ConfigSummary};
use crate::{Error, FirewallController, ManagerConfig, Result, ServiceController, Settings};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Owns every resource a command touches.
///
/// Settings are loaded once by the caller and handed in; nothing here reads
/// process-wide state. Operations assume a single writer; callers serialize
/// mutating commands with [`crate::OperationLock`].
pub struct Manager {
    config: ManagerConfig,
    settings: Settings,
    store: ConfigStore,
    ports: PortRegistry,
    allocator: PortAllocator,
    service: Box<dyn ServiceController>,
    firewall: Box<dyn FirewallController>,
}

impl Manager {
    pub fn new(
        config: ManagerConfig,
        settings: Settings,
        service: Box<dyn ServiceController>,
        firewall: Box<dyn FirewallController>,
    ) -> Result<Self> {
        let store = ConfigStore::open(&config.paths.config_dir)?;
        let ports = PortRegistry::new(config.ports_path());
        Ok(Self {
            config,
            settings,
            store,
            ports,
            allocator: PortAllocator::new(),
            service,
            firewall,
        })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn ports(&self) -> &PortRegistry {
        &self.ports
    }

    /// Verify the external controllers can run
    pub fn check_prerequisites(&self) -> Result<()> {
        crate::system::check_platform()?;
        self.service.check()?;
        self.firewall.check()
    }

    // ==================== Settings ====================

    /// Update one setting and persist the settings file.
    ///
    /// A firewall type change applies to controllers built on the next run.
    pub fn update_setting(&mut self, key: &str, value: &str) -> Result<&Settings> {
        let mut updated = self.settings.clone();
        updated.set(key, value)?;
        updated.save(&self.config.settings_path())?;
        log::info!("Updated setting {}={}", key, value);
        self.settings = updated;
        Ok(&self.settings)
    }

    pub fn set_address(&mut self, address: &str) -> Result<&Settings> {
        if address.trim().is_empty() {
            return Err(Error::missing_argument("server address"));
        }
        self.update_setting(Settings::KEY_SERVER_ADDRESS, address)
    }

    // ==================== Lifecycle ====================

    /// Bring the service unit, the port registry and the firewall in line
    /// with `direction` for one config.
    ///
    /// Steps run in a fixed order (unit, registry, firewall) and are not
    /// rolled back when a later one fails; `refresh` repairs any drift.
    pub fn set_config(&self, direction: Direction, name: &str) -> Result<()> {
        validate_config_name(name)?;
        let record = self.store.read(name)?;
        log::debug!("{} config '{}' (port {})", direction.as_str(), name, record.server_port);

        match direction {
            Direction::Enable => {
                self.service.enable(name)?;
                self.ports.add(record.server_port)?;
                self.firewall.open(record.server_port)?;
            }
            Direction::Disable => {
                self.service.disable(name)?;
                self.ports.del(record.server_port)?;
                self.firewall.close(record.server_port)?;
            }
        }
        Ok(())
    }

    /// Ports unavailable to the allocator: the registry plus every stored
    /// document, so hand-copied configs are not handed out twice
    fn taken_ports(&self) -> Result<BTreeSet<u16>> {
        let mut taken: BTreeSet<u16> = self.ports.ports()?.into_iter().collect();
        for name in self.store.list()? {
            match self.store.read(&name) {
                Ok(record) => {
                    taken.insert(record.server_port);
                }
                Err(e) => log::warn!("Skipping unreadable config '{}': {}", name, e),
            }
        }
        Ok(taken)
    }

    /// Create a config with a fresh port and password, then enable it
    pub fn create_config(&self, name: &str) -> Result<ConfigRecord> {
        validate_config_name(name)?;
        if self.store.exists(name) {
            return Err(Error::conflict(format!("Config '{}' already exists", name)));
        }

        let port = self.allocator.allocate(&self.taken_ports()?)?;
        let record = ConfigRecord::new(name, port, generate_password());
        let record = self.store.create(name, &record)?;
        log::info!("Created config '{}' on port {}", name, port);

        self.set_config(Direction::Enable, name)?;
        Ok(record)
    }

    /// Disable a config and remove its document
    pub fn delete_config(&self, name: &str) -> Result<()> {
        validate_config_name(name)?;
        if !self.store.exists(name) {
            return Err(Error::not_found(format!("Config '{}' does not exist", name)));
        }
        self.set_config(Direction::Disable, name)?;
        self.store.delete(name)?;
        log::info!("Deleted config '{}'", name);
        Ok(())
    }

    /// Give a config a new name.
    ///
    /// The unit instance is keyed by name, so the old instance is disabled
    /// and the new one enabled; port, password and cipher are unchanged.
    pub fn rename_config(&self, old: &str, new: &str) -> Result<ConfigRecord> {
        validate_config_name(old)?;
        validate_config_name(new)?;
        if !self.store.exists(old) {
            return Err(Error::not_found(format!("Config '{}' does not exist", old)));
        }
        if self.store.exists(new) {
            return Err(Error::conflict(format!("Config '{}' already exists", new)));
        }

        self.set_config(Direction::Disable, old)?;
        let record = self.store.rename(old, new)?;
        self.set_config(Direction::Enable, new)?;
        log::info!("Renamed config '{}' to '{}'", old, new);
        Ok(record)
    }

    // ==================== Reconciliation ====================

    /// Rebuild service, registry and firewall state from the stored configs.
    ///
    /// Every loaded unit instance is stopped (including ones whose config
    /// is gone), every registered port is closed, the registry is emptied,
    /// and each stored config is enabled again. Configs that fail to enable
    /// do not stop the others; the failures are reported together at the end.
    pub fn refresh(&self) -> Result<()> {
        let instances = self.service.instances()?;
        log::info!("Refresh: stopping {} service instance(s)", instances.len());
        for name in &instances {
            self.service.disable(name)?;
        }

        let registered: BTreeSet<u16> = self.ports.ports()?.into_iter().collect();
        for port in &registered {
            self.firewall.close(*port)?;
        }
        self.ports.clear()?;

        let names = self.store.list()?;
        log::info!("Refresh: enabling {} config(s)", names.len());
        let mut failed = Vec::new();
        let mut claimed: BTreeMap<u16, &str> = BTreeMap::new();
        for name in &names {
            let port = match self.read(name) {
                Ok(record) => record.server_port,
                Err(e) => {
                    log::error!("Failed to enable config '{}': {}", name, e);
                    failed.push(name.clone());
                    continue;
                }
            };
            if let Some(owner) = claimed.get(&port) {
                log::warn!(
                    "Config '{}' uses port {} already held by '{}'; not enabling it",
                    name,
                    port,
                    owner
                );
                failed.push(name.clone());
                continue;
            }
            match self.set_config(Direction::Enable, name) {
                Ok(()) => {
                    claimed.insert(port, name);
                }
                Err(e) => {
                    log::error!("Failed to enable config '{}': {}", name, e);
                    failed.push(name.clone());
                }
            }
        }

        if !failed.is_empty() {
            return Err(Error::service(format!(
                "Refresh could not enable {} config(s): {}",
                failed.len(),
                failed.join(", ")
            )));
        }
        Ok(())
    }

    // ==================== Backup / Restore ====================

    pub fn backup_path(&self) -> &Path {
        &self.config.paths.backup_path
    }

    /// Archive every config document to the configured backup path
    pub fn backup(&self, overwrite: bool) -> Result<PathBuf> {
        let dest = self.config.paths.backup_path.clone();
        backup::write_archive(&self.store, &dest, overwrite)?;
        Ok(dest)
    }

    /// Merge the archive's documents into the store, then refresh
    pub fn restore(&self, archive: &Path) -> Result<Vec<String>> {
        let restored = backup::extract_archive(archive, &self.store)?;
        self.refresh()?;
        Ok(restored)
    }

    // ==================== Queries ====================

    pub fn list(&self) -> Result<Vec<String>> {
        self.store.list()
    }

    pub fn read(&self, name: &str) -> Result<ConfigRecord> {
        validate_config_name(name)?;
        self.store.read(name)
    }

    pub fn summary(&self, name: &str) -> Result<ConfigSummary> {
        validate_config_name(name)?;
        self.store.summary(name)
    }

    /// Connection URI for a config using the advertised address
    pub fn uri(&self, name: &str) -> Result<String> {
        let record = self.read(name)?;
        if !self.settings.has_address() {
            log::warn!("server_address is not set; URI for '{}' has an empty host", name);
        }
        Ok(crate::uri::format_uri(&record, &self.settings.server_address))
    }
}
