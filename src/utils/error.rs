use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Remote store unreachable: {message}")]
    Connectivity { message: String },

    #[error("Remote store rejected credentials (status {status})")]
    Auth { status: u16 },

    #[error("Key not found: {key}")]
    NotFound { key: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid configuration value for '{field}': '{value}' ({reason})")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Missing required configuration: {field}")]
    MissingConfig { field: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 呼叫端看到的錯誤分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connectivity,
    Auth,
    NotFound,
    Configuration,
    Local,
}

impl StorageError {
    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::Connectivity {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connectivity { .. } => ErrorKind::Connectivity,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Configuration { .. }
            | Self::InvalidConfigValue { .. }
            | Self::MissingConfig { .. }
            | Self::InvalidKey { .. } => ErrorKind::Configuration,
            Self::Io(_) | Self::Serialization(_) => ErrorKind::Local,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Connectivity { .. } => {
                "Could not reach the remote store. Check the network or switch failover_mode to 'local'.".to_string()
            }
            Self::Auth { .. } => "The remote store rejected the API key.".to_string(),
            Self::NotFound { key } => format!("No value stored under '{}'.", key),
            Self::InvalidKey { key, reason } => format!("Key '{}' is not usable: {}.", key, reason),
            Self::Configuration { .. }
            | Self::InvalidConfigValue { .. }
            | Self::MissingConfig { .. } => format!("Invalid configuration: {}", self),
            Self::Io(_) | Self::Serialization(_) => format!("Local storage failure: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            StorageError::connectivity("timeout").kind(),
            ErrorKind::Connectivity
        );
        assert_eq!(StorageError::Auth { status: 401 }.kind(), ErrorKind::Auth);
        assert_eq!(StorageError::not_found("a").kind(), ErrorKind::NotFound);
        assert_eq!(
            StorageError::MissingConfig {
                field: "api_base_url".to_string()
            }
            .kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            StorageError::InvalidKey {
                key: "..".to_string(),
                reason: "dot-only".to_string()
            }
            .kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn test_user_friendly_message_mentions_key() {
        let err = StorageError::not_found("profile");
        assert!(err.user_friendly_message().contains("profile"));
        assert!(err.is_not_found());
    }
}
