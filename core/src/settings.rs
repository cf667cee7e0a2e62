//! Host-wide settings: advertised address and firewall flavor

use crate::{CommandRunner, Error, Result};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Firewall management backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirewallType {
    Firewalld,
    #[default]
    None,
}

impl FirewallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FirewallType::Firewalld => "firewalld",
            FirewallType::None => "none",
        }
    }

    /// Pick `firewalld` when `firewall-cmd` is available, `none` otherwise
    pub fn detect(runner: &dyn CommandRunner) -> Self {
        if runner.exists("firewall-cmd") {
            FirewallType::Firewalld
        } else {
            FirewallType::None
        }
    }
}

impl fmt::Display for FirewallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FirewallType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "firewalld" => Ok(FirewallType::Firewalld),
            "none" => Ok(FirewallType::None),
            other => Err(Error::Parse(format!(
                "Unknown firewall type '{}' (expected firewalld or none)",
                other
            ))),
        }
    }
}

/// Singleton settings record, persisted as `key=value` lines
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Settings {
    /// Address advertised in URIs; empty means unset
    pub server_address: String,
    pub firewall_type: FirewallType,
}

impl Settings {
    pub const KEY_SERVER_ADDRESS: &'static str = "server_address";
    pub const KEY_FIREWALL_TYPE: &'static str = "firewall_type";

    /// Load settings from `path`, creating them on first run.
    ///
    /// A fresh settings file gets an empty address and a firewall type
    /// inferred from which tools are installed.
    pub fn load_or_init(path: &Path, runner: &dyn CommandRunner) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        let settings = Self {
            server_address: String::new(),
            firewall_type: FirewallType::detect(runner),
        };
        settings.save(path)?;
        log::info!(
            "Initialized settings at {} (firewall_type={})",
            path.display(),
            settings.firewall_type
        );
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut settings = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.splitn(2, '=').collect();
            if parts.len() != 2 {
                log::warn!("Ignoring malformed settings line: {}", line);
                continue;
            }
            let key = parts[0].trim();
            let value = parts[1].trim();

            match key {
                Self::KEY_SERVER_ADDRESS => settings.server_address = value.to_string(),
                Self::KEY_FIREWALL_TYPE => settings.firewall_type = value.parse()?,
                _ => log::debug!("Ignoring unknown settings key '{}'", key),
            }
        }

        Ok(settings)
    }

    /// Render the settings file content
    pub fn render(&self) -> String {
        let lines = [
            "# SS Manager settings".to_string(),
            format!("{}={}", Self::KEY_SERVER_ADDRESS, self.server_address),
            format!("{}={}", Self::KEY_FIREWALL_TYPE, self.firewall_type),
        ];
        let mut content = lines.join("\n");
        content.push('\n');
        content
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.render())?;
        Ok(())
    }

    /// Update one setting by key name
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        // Each setting is one `key=value` line
        if value.contains(['\n', '\r', '=']) {
            return Err(Error::validation(format!(
                "Value for '{}' must not contain line breaks or '='",
                key
            )));
        }
        match key {
            Self::KEY_SERVER_ADDRESS => {
                self.server_address = value.trim().to_string();
                Ok(())
            }
            Self::KEY_FIREWALL_TYPE => {
                self.firewall_type = value.parse()?;
                Ok(())
            }
            other => Err(Error::validation(format!(
                "Unknown setting '{}' (expected {} or {})",
                other,
                Self::KEY_SERVER_ADDRESS,
                Self::KEY_FIREWALL_TYPE
            ))),
        }
    }

    pub fn has_address(&self) -> bool {
        !self.server_address.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;
    use tempfile::tempdir;

    #[test]
    fn test_parse_settings() {
        let settings = Settings::parse(
            "# comment\nserver_address=203.0.113.7\nfirewall_type=firewalld\nother=1\n",
        )
        .unwrap();
        assert_eq!(settings.server_address, "203.0.113.7");
        assert_eq!(settings.firewall_type, FirewallType::Firewalld);
    }

    #[test]
    fn test_empty_address_is_unset() {
        let settings = Settings::parse("server_address=\nfirewall_type=none\n").unwrap();
        assert!(!settings.has_address());
        assert_eq!(settings.firewall_type, FirewallType::None);
    }

    #[test]
    fn test_bad_firewall_type() {
        assert!(Settings::parse("firewall_type=ufw\n").is_err());
    }

    #[test]
    fn test_set_rejects_values_that_break_the_file() {
        let mut settings = Settings::default();
        for value in ["1.2.3.4\nfirewall_type=ufw", "1.2.3.4\r", "a=b"] {
            let err = settings.set(Settings::KEY_SERVER_ADDRESS, value).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{:?}", value);
        }
        assert!(!settings.has_address());

        settings.set(Settings::KEY_SERVER_ADDRESS, " example.net ").unwrap();
        assert_eq!(Settings::parse(&settings.render()).unwrap(), settings);
    }

    #[test]
    fn test_render_parse_stable() {
        let settings = Settings {
            server_address: "example.net".to_string(),
            firewall_type: FirewallType::Firewalld,
        };
        assert_eq!(Settings::parse(&settings.render()).unwrap(), settings);
    }

    #[test]
    fn test_first_run_detects_firewall() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings");

        let runner = ScriptedRunner::with_tools(&["firewall-cmd"]);
        let settings = Settings::load_or_init(&path, &runner).unwrap();
        assert_eq!(settings.firewall_type, FirewallType::Firewalld);
        assert!(path.exists());

        // Existing file wins over detection
        let runner = ScriptedRunner::with_tools(&[]);
        let again = Settings::load_or_init(&path, &runner).unwrap();
        assert_eq!(again.firewall_type, FirewallType::Firewalld);
    }

    #[test]
    fn test_set_by_key() {
        let mut settings = Settings::default();
        settings.set("server_address", " 198.51.100.1 ").unwrap();
        settings.set("firewall_type", "firewalld").unwrap();
        assert_eq!(settings.server_address, "198.51.100.1");
        assert_eq!(settings.firewall_type, FirewallType::Firewalld);
        assert!(settings.set("color", "blue").is_err());
    }
}
