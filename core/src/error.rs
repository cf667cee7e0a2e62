//! Error types for the ss-manager-core crate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown action: {0}")]
    ActionNotFound(String),

    #[error("Missing requirement: {0}")]
    MissingRequirement(String),

    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File conflict: {0}")]
    FileConflict(String),

    #[error("Permission denied: {0}")]
    NoPermission(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Install failed: {0}")]
    InstallFailed(String),

    #[error("Cannot enter work directory {path}: {reason}")]
    CannotEnterWorkDirectory { path: String, reason: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Command execution failed: {cmd} - {message}")]
    Command { cmd: String, message: String },

    #[error("Service error: {0}")]
    Service(String),

    #[error("Firewall error: {0}")]
    Firewall(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Process-level classification of an [`Error`].
///
/// Each kind maps to its own exit status so callers scripting the tool can
/// tell a missing file from a missing tool without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ActionNotFound,
    MissingRequirement,
    MissingArgument,
    FileNotFound,
    FileConflict,
    NoPermission,
    UnsupportedPlatform,
    InstallFailed,
    CannotEnterWorkDirectory,
    Other,
}

impl ErrorKind {
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::Other => 1,
            ErrorKind::ActionNotFound => 10,
            ErrorKind::MissingRequirement => 11,
            ErrorKind::MissingArgument => 12,
            ErrorKind::FileNotFound => 13,
            ErrorKind::FileConflict => 14,
            ErrorKind::NoPermission => 15,
            ErrorKind::UnsupportedPlatform => 16,
            ErrorKind::InstallFailed => 17,
            ErrorKind::CannotEnterWorkDirectory => 18,
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ActionNotFound(_) => ErrorKind::ActionNotFound,
            Error::MissingRequirement(_) => ErrorKind::MissingRequirement,
            Error::MissingArgument(_) => ErrorKind::MissingArgument,
            Error::FileNotFound(_) => ErrorKind::FileNotFound,
            Error::FileConflict(_) => ErrorKind::FileConflict,
            Error::NoPermission(_) => ErrorKind::NoPermission,
            Error::UnsupportedPlatform(_) => ErrorKind::UnsupportedPlatform,
            Error::InstallFailed(_) => ErrorKind::InstallFailed,
            Error::CannotEnterWorkDirectory { .. } => ErrorKind::CannotEnterWorkDirectory,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::PermissionDenied => ErrorKind::NoPermission,
                std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
                _ => ErrorKind::Other,
            },
            _ => ErrorKind::Other,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn service(msg: impl Into<String>) -> Self {
        Error::Service(msg.into())
    }

    pub fn firewall(msg: impl Into<String>) -> Self {
        Error::Firewall(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::FileNotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Error::FileConflict(msg.into())
    }

    pub fn missing_argument(msg: impl Into<String>) -> Self {
        Error::MissingArgument(msg.into())
    }

    pub fn work_dir(path: &std::path::Path, reason: impl ToString) -> Self {
        Error::CannotEnterWorkDirectory {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}
