//! Error types and utilities for dotenv loading and layered configuration.

use std::path::{Path, PathBuf};

/// Result type alias for dotspice operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Error types for loading, resolving and reloading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The dotenv file is absent and `dotenv.fail-on-missing` is set
    #[error("[Dotenv] Required .env file is missing at: {}", path.display())]
    MissingFile { path: PathBuf },

    /// An existing dotenv file could not be read
    #[error("Failed to read .env file from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A host settings file could not be parsed
    #[error("Parse error in {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// Type conversion failed
    #[error("Type conversion error: cannot convert {from} to {to}")]
    TypeConversion { from: String, to: String },

    /// Unsupported settings file format
    #[error("Unsupported configuration format")]
    UnsupportedFormat,

    /// File watching operation failed
    #[error("File watching error: {0}")]
    FileWatch(String),

    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl ConfigError {
    /// Creates a missing-file error for the given path.
    pub fn missing_file(path: impl AsRef<Path>) -> Self {
        Self::MissingFile {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Creates a read error, keeping the underlying IO error as the source.
    pub fn read(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates a new parse error with context.
    pub fn parse_error(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Creates a new type conversion error.
    pub fn type_conversion(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::TypeConversion {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Creates a new file watch error.
    pub fn file_watch(message: impl Into<String>) -> Self {
        Self::FileWatch(message.into())
    }

    /// Creates a new invalid value error.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }

    /// Returns true if a required dotenv file was not found.
    pub fn is_missing_file(&self) -> bool {
        matches!(self, ConfigError::MissingFile { .. })
    }

    /// Returns true if an existing file failed to read.
    pub fn is_read_error(&self) -> bool {
        matches!(self, ConfigError::Read { .. })
    }

    /// Returns true if this error is related to parsing.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, ConfigError::Parse { .. })
    }

    /// Returns true if this error is related to type conversion.
    pub fn is_type_conversion(&self) -> bool {
        matches!(self, ConfigError::TypeConversion { .. })
    }

    /// Returns the file path this error refers to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::MissingFile { path } | ConfigError::Read { path, .. } => Some(path),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn test_missing_file_names_path() {
        let error = ConfigError::missing_file("/srv/app/.env");
        assert!(error.is_missing_file());
        assert_eq!(
            error.to_string(),
            "[Dotenv] Required .env file is missing at: /srv/app/.env"
        );
        assert_eq!(error.path(), Some(Path::new("/srv/app/.env")));
    }

    #[test]
    fn test_read_error_keeps_source() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
        let error = ConfigError::read(".env", io_error);

        assert!(error.is_read_error());
        assert!(!error.is_missing_file());
        assert!(error.to_string().contains("Failed to read .env file from .env"));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_error_display() {
        let error = ConfigError::type_conversion("string", "boolean");
        assert_eq!(
            error.to_string(),
            "Type conversion error: cannot convert string to boolean"
        );

        let error = ConfigError::parse_error("settings.yaml", "invalid YAML syntax");
        assert_eq!(
            error.to_string(),
            "Parse error in settings.yaml: invalid YAML syntax"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let config_error: ConfigError = io_error.into();
        assert!(matches!(config_error, ConfigError::Io(_)));
        assert!(config_error.path().is_none());
    }

    #[test]
    fn test_error_type_checking() {
        let parse_error = ConfigError::parse_error("settings.json", "syntax error");
        assert!(parse_error.is_parse_error());
        assert!(!parse_error.is_type_conversion());
        assert!(!parse_error.is_missing_file());

        let watch_error = ConfigError::file_watch("watcher disconnected");
        assert!(matches!(watch_error, ConfigError::FileWatch(_)));

        let invalid = ConfigError::invalid_value("empty path");
        assert!(matches!(invalid, ConfigError::InvalidValue(_)));
    }
}
