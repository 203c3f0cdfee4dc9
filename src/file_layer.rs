//! Host settings file configuration layer.

use crate::error::{ConfigError, ConfigResult};
use crate::layer::ConfigLayer;
use crate::parser::{detect_parser_by_extension, ConfigParser, Settings};
use crate::value::ConfigValue;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Configuration layer loaded from a JSON, YAML, TOML or INI settings file.
///
/// Nested tables are flattened to dotted keys, so a YAML file with
///
/// ```yaml
/// dotenv:
///   priority: high
/// ```
///
/// answers `get("dotenv.priority")`.
pub struct SettingsFileLayer {
    /// Flattened settings
    data: Settings,
    /// Path to the settings file
    file_path: PathBuf,
    /// Parser for the file format
    parser: Box<dyn ConfigParser>,
    /// Last modification time for change detection
    last_modified: Option<SystemTime>,
    /// Layer name, the file path unless overridden
    name: String,
}

impl std::fmt::Debug for SettingsFileLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsFileLayer")
            .field("name", &self.name)
            .field("file_path", &self.file_path)
            .field("parser", &self.parser.name())
            .field("keys", &self.data.len())
            .finish()
    }
}

impl SettingsFileLayer {
    /// Loads a settings file, choosing the parser from its extension.
    ///
    /// # Errors
    /// * `ConfigError::UnsupportedFormat` - If the file extension is not supported
    /// * `ConfigError::Io` - If the file cannot be read
    /// * `ConfigError::Parse` - If the file content cannot be parsed
    ///
    /// # Example
    /// ```
    /// use dotspice::{ConfigLayer, ConfigValue, SettingsFileLayer};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let path = dir.path().join("application.toml");
    /// std::fs::write(&path, "[dotenv]\npriority = \"high\"\n").unwrap();
    ///
    /// let layer = SettingsFileLayer::new(&path).unwrap();
    /// assert_eq!(layer.get("dotenv.priority"), Some(ConfigValue::from("high")));
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let parser = Self::detect_parser(path.as_ref())?;
        Self::with_parser(path, parser)
    }

    /// Loads a settings file with an explicit parser.
    pub fn with_parser<P: AsRef<Path>>(
        path: P,
        parser: Box<dyn ConfigParser>,
    ) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let name = path.display().to_string();

        let mut layer = Self {
            data: Settings::new(),
            file_path: path,
            parser,
            last_modified: None,
            name,
        };

        layer.load_file()?;
        Ok(layer)
    }

    /// Registers the layer under a different name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn detect_parser(path: &Path) -> ConfigResult<Box<dyn ConfigParser>> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or(ConfigError::UnsupportedFormat)?;

        detect_parser_by_extension(extension)
    }

    fn load_file(&mut self) -> ConfigResult<()> {
        let content = fs::read_to_string(&self.file_path)?;

        self.data = self.parser.parse(&content).map_err(|e| match e {
            ConfigError::Parse { message, .. } => {
                ConfigError::parse_error(self.file_path.display().to_string(), message)
            }
            other => other,
        })?;

        self.last_modified = fs::metadata(&self.file_path)
            .and_then(|metadata| metadata.modified())
            .ok();

        debug!(
            path = %self.file_path.display(),
            format = self.parser.name(),
            keys = self.data.len(),
            "Loaded settings file"
        );
        Ok(())
    }

    /// Re-reads and re-parses the file.
    ///
    /// On error the previously loaded settings are kept.
    pub fn reload(&mut self) -> ConfigResult<()> {
        self.load_file()
    }

    /// Returns true if the file changed on disk since it was loaded.
    ///
    /// # Errors
    /// * `ConfigError::Io` - If file metadata cannot be accessed
    pub fn is_modified(&self) -> ConfigResult<bool> {
        match self.last_modified {
            Some(last_modified) => {
                let current_modified = fs::metadata(&self.file_path)?.modified()?;
                Ok(current_modified > last_modified)
            }
            None => Ok(true),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn parser(&self) -> &dyn ConfigParser {
        self.parser.as_ref()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ConfigLayer for SettingsFileLayer {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.data.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
