//! Domain model types for SS Manager

use crate::{Error, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Cipher written into freshly created configs
pub const DEFAULT_METHOD: &str = "chacha20-ietf-poly1305";

/// Connection timeout written into freshly created configs, in seconds
pub const DEFAULT_TIMEOUT: u32 = 60;

/// Length of generated passwords
pub const PASSWORD_LEN: usize = 16;

/// Maximum length of a config name
pub const MAX_NAME_LEN: usize = 32;

/// Bind addresses written into freshly created configs (IPv4 and IPv6 wildcard)
pub fn default_bind_addresses() -> Vec<String> {
    vec!["0.0.0.0".to_string(), "::".to_string()]
}

/// One named shadowsocks-libev server configuration.
///
/// The name is the record's identity and is not stored inside the document;
/// it comes from the document's file name. Keys this tool does not manage
/// (`fast_open`, `mode`, `plugin`, ...) are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigRecord {
    #[serde(skip)]
    pub name: String,
    #[serde(rename = "server")]
    pub bind_addresses: Vec<String>,
    pub server_port: u16,
    pub password: String,
    pub timeout: u32,
    pub method: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ConfigRecord {
    /// Create a record with default bind addresses, timeout and cipher
    pub fn new(name: impl Into<String>, server_port: u16, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bind_addresses: default_bind_addresses(),
            server_port,
            password: password.into(),
            timeout: DEFAULT_TIMEOUT,
            method: DEFAULT_METHOD.to_string(),
            extra: serde_json::Map::new(),
        }
    }

    /// Parse a config document, attaching the given name as identity
    pub fn from_json(name: &str, content: &str) -> Result<Self> {
        let mut record: Self = serde_json::from_str(content)?;
        record.name = name.to_string();
        record.validate()?;
        Ok(record)
    }

    /// Render the on-disk document
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate the record
    pub fn validate(&self) -> Result<()> {
        if self.server_port == 0 {
            return Err(Error::validation(format!(
                "Config '{}' has server_port 0",
                self.name
            )));
        }
        if self.password.is_empty() {
            return Err(Error::validation(format!(
                "Config '{}' has an empty password",
                self.name
            )));
        }
        if self.method.is_empty() {
            return Err(Error::validation(format!(
                "Config '{}' has an empty method",
                self.name
            )));
        }
        Ok(())
    }
}

/// Direction of a lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Enable,
    Disable,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Enable => "enable",
            Direction::Disable => "disable",
        }
    }
}

/// Validates a config name; names become file names and systemd instance names
pub fn validate_config_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation("Config name cannot be empty"));
    }

    let re = regex::Regex::new(r"^[A-Za-z0-9_-]+$").map_err(|e| Error::validation(e.to_string()))?;
    if !re.is_match(name) {
        return Err(Error::validation(format!(
            "Config name '{}' must contain only letters, numbers, underscores, and hyphens",
            name
        )));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(Error::validation(format!(
            "Config name '{}' must be {} characters or less",
            name, MAX_NAME_LEN
        )));
    }

    Ok(())
}

/// Generate a random alphanumeric password
pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_defaults() {
        let record = ConfigRecord::new("work", 8388, "secret");
        assert_eq!(record.bind_addresses, vec!["0.0.0.0", "::"]);
        assert_eq!(record.timeout, 60);
        assert_eq!(record.method, "chacha20-ietf-poly1305");
    }

    #[test]
    fn test_document_uses_server_key() {
        let record = ConfigRecord::new("work", 8388, "secret");
        let json: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();
        assert_eq!(json["server"][0], "0.0.0.0");
        assert_eq!(json["server_port"], 8388);
        assert!(json.get("name").is_none());
    }

    #[test]
    fn test_unknown_keys_survive() {
        let doc = r#"{
            "server": ["0.0.0.0"],
            "server_port": 4000,
            "password": "pw",
            "timeout": 300,
            "method": "aes-256-gcm",
            "fast_open": true
        }"#;
        let record = ConfigRecord::from_json("edited", doc).unwrap();
        assert_eq!(record.name, "edited");
        assert_eq!(record.extra["fast_open"], serde_json::Value::Bool(true));
        assert!(record.to_json().unwrap().contains("fast_open"));
    }

    #[test]
    fn test_invalid_document_rejected() {
        let doc = r#"{"server": [], "server_port": 0, "password": "pw", "timeout": 1, "method": "m"}"#;
        assert!(ConfigRecord::from_json("bad", doc).is_err());
    }

    #[test]
    fn test_config_name_validation() {
        assert!(validate_config_name("work").is_ok());
        assert!(validate_config_name("Home_2-b").is_ok());
        assert!(validate_config_name("").is_err());
        assert!(validate_config_name("../etc").is_err());
        assert!(validate_config_name("has space").is_err());
        assert!(validate_config_name(&"a".repeat(33)).is_err());
    }

    #[test]
    fn test_generated_password() {
        let a = generate_password();
        let b = generate_password();
        assert_eq!(a.len(), PASSWORD_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
