//! Port registry and port allocation

use crate::{Error, Result};
use rand::Rng;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Lowest port handed out by the allocator
pub const PORT_BASE: u16 = 2000;

/// Number of candidate ports above [`PORT_BASE`] (2000..=34767)
pub const PORT_SPAN: u16 = 32768;

/// Random draws attempted before falling back to a linear scan
pub const MAX_RANDOM_ATTEMPTS: usize = 1024;

/// Flat file of allocated ports, one per line
#[derive(Debug, Clone)]
pub struct PortRegistry {
    path: PathBuf,
}

impl PortRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every registered port in file order; a missing file is an empty registry
    pub fn ports(&self) -> Result<Vec<u16>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;

        let mut ports = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let port = line.parse::<u16>().map_err(|e| {
                Error::Parse(format!(
                    "Invalid port '{}' in {}: {}",
                    line,
                    self.path.display(),
                    e
                ))
            })?;
            ports.push(port);
        }
        Ok(ports)
    }

    pub fn has(&self, port: u16) -> Result<bool> {
        Ok(self.ports()?.contains(&port))
    }

    /// Append a port
    pub fn add(&self, port: u16) -> Result<()> {
        let mut ports = self.ports()?;
        if ports.contains(&port) {
            log::warn!("Port {} is already registered", port);
        }
        ports.push(port);
        self.write(&ports)
    }

    /// Remove every entry equal to `port`
    pub fn del(&self, port: u16) -> Result<()> {
        let mut ports = self.ports()?;
        ports.retain(|p| *p != port);
        self.write(&ports)
    }

    pub fn clear(&self) -> Result<()> {
        self.write(&[])
    }

    fn write(&self, ports: &[u16]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut content = String::new();
        for port in ports {
            content.push_str(&port.to_string());
            content.push('\n');
        }
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Chooses a free port for a new config.
///
/// Candidates are drawn uniformly from `PORT_BASE..PORT_BASE + PORT_SPAN`
/// and rejected while taken. After [`MAX_RANDOM_ATTEMPTS`] rejections the
/// range is scanned in order, so allocation only fails once every port in
/// the range is taken.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortAllocator;

impl PortAllocator {
    pub fn new() -> Self {
        Self
    }

    pub fn allocate(&self, taken: &BTreeSet<u16>) -> Result<u16> {
        self.allocate_with(taken, &mut rand::thread_rng())
    }

    pub fn allocate_with<R: Rng>(&self, taken: &BTreeSet<u16>, rng: &mut R) -> Result<u16> {
        for _ in 0..MAX_RANDOM_ATTEMPTS {
            let candidate = PORT_BASE + rng.gen_range(0..PORT_SPAN);
            if !taken.contains(&candidate) {
                return Ok(candidate);
            }
        }

        log::debug!(
            "No free port after {} random draws, scanning range",
            MAX_RANDOM_ATTEMPTS
        );
        (PORT_BASE..PORT_BASE + PORT_SPAN)
            .find(|port| !taken.contains(port))
            .ok_or_else(|| {
                Error::InstallFailed(format!(
                    "No free port left in {}-{}",
                    PORT_BASE,
                    PORT_BASE + PORT_SPAN - 1
                ))
            })
    }
}
