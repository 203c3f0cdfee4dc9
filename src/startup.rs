//! Startup integration: the initial load and the one-shot summary.

use crate::config::LayeredConfig;
use crate::dotenv_layer::DotenvLayer;
use crate::dotenv_parser::Variables;
use crate::error::ConfigResult;
use crate::loader::{DefaultEnvLoader, EnvLoader};
use crate::options::{keys, DotenvOptions};
use crate::priority::{install_layer, Priority};
use std::sync::Arc;
use tracing::info;

/// Loads the dotenv file and installs it as the `"dotenv"` layer.
///
/// Returns `Ok(None)` when `dotenv.enabled` is false; the layer list is
/// then left alone.
///
/// # Errors
/// * `ConfigError::MissingFile` - If the file is absent and
///   `dotenv.fail-on-missing` is set; the host should abort startup
/// * `ConfigError::Read` - If the file exists but cannot be read
/// * `ConfigError::InvalidValue` - If a `dotenv.*` option is malformed
///
/// # Example
/// ```
/// use dotspice::{load_initial, LayeredConfig, MapLayer};
/// use std::sync::Arc;
///
/// let dir = tempfile::tempdir().unwrap();
/// let env = dir.path().join(".env");
/// std::fs::write(&env, "PORT=8080\n").unwrap();
///
/// let config = LayeredConfig::new();
/// config.add_last(Arc::new(
///     MapLayer::new("application").with_value("dotenv.path", env.display().to_string()),
/// ));
///
/// let loaded = load_initial(&config).unwrap().unwrap();
/// assert_eq!(loaded["PORT"], "8080");
/// assert_eq!(config.get_string("PORT").as_deref(), Some("8080"));
/// ```
pub fn load_initial(config: &LayeredConfig) -> ConfigResult<Option<Variables>> {
    load_initial_with(config, &DefaultEnvLoader::new())
}

/// Like [`load_initial`] with a custom loader.
pub fn load_initial_with(
    config: &LayeredConfig,
    loader: &dyn EnvLoader,
) -> ConfigResult<Option<Variables>> {
    let options = DotenvOptions::from_config(config)?;
    if !options.enabled {
        info!("[Dotenv] Loading is disabled via '{}'", keys::ENABLED);
        return Ok(None);
    }

    let variables = loader.load(config)?;
    let layer = DotenvLayer::standard(Arc::new(variables.clone()));
    install_layer(config, Arc::new(layer), options.priority);

    info!(
        path = %options.path.display(),
        variables = variables.len(),
        priority = %options.priority,
        "[Dotenv] .env file loaded"
    );
    Ok(Some(variables))
}

/// Logs a one-time summary of the dotenv state once the host is ready.
pub fn log_summary(config: &LayeredConfig) {
    let Some(summary) = Summary::collect(config) else {
        info!("[Dotenv] Status: DISABLED");
        return;
    };

    info!("[Dotenv] Status: ENABLED");
    info!("[Dotenv] Path: {}", summary.path);
    info!("[Dotenv] Fail on missing: {}", summary.fail_on_missing);
    info!("[Dotenv] Priority: {}", summary.priority);
    info!("[Dotenv] Loaded variables: {}", summary.loaded);
}

/// Values reported by [`log_summary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub path: String,
    pub fail_on_missing: bool,
    pub priority: String,
    pub loaded: usize,
}

impl Summary {
    /// Gathers the summary, or `None` when dotenv loading is disabled.
    ///
    /// Flags that fail to parse are reported with their defaults; the
    /// priority is reported as resolved.
    pub fn collect(config: &LayeredConfig) -> Option<Self> {
        let enabled = config
            .get_bool(keys::ENABLED)
            .ok()
            .flatten()
            .unwrap_or(keys::DEFAULT_ENABLED);
        if !enabled {
            return None;
        }

        let loaded = config
            .layer(keys::PROPERTY_SOURCE_NAME)
            .and_then(|layer| layer.as_any().downcast_ref::<DotenvLayer>().map(DotenvLayer::len))
            .unwrap_or(0);

        Some(Self {
            path: config
                .get_string(keys::PATH)
                .unwrap_or_else(|| keys::DEFAULT_PATH.to_string()),
            fail_on_missing: config
                .get_bool(keys::FAIL_ON_MISSING)
                .ok()
                .flatten()
                .unwrap_or(keys::DEFAULT_FAIL_ON_MISSING),
            priority: config
                .get_string(keys::PRIORITY)
                .map(|value| Priority::from_setting(&value))
                .unwrap_or_default()
                .to_string(),
            loaded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_layer::MapLayer;
    use std::fs;
    use tempfile::TempDir;

    fn host_with_env(dir: &TempDir, content: &str) -> LayeredConfig {
        let path = dir.path().join(".env");
        fs::write(&path, content).unwrap();

        let config = LayeredConfig::new();
        config.add_last(Arc::new(
            MapLayer::new("application")
                .with_value(keys::PATH, path.display().to_string())
                .with_value("APP_NAME", "from-application"),
        ));
        config
    }

    #[test]
    fn test_load_initial_installs_low_priority_layer() {
        let dir = TempDir::new().unwrap();
        let config = host_with_env(&dir, "APP_NAME=from-dotenv\nEXTRA=1\n");

        let vars = load_initial(&config).unwrap().unwrap();
        assert_eq!(vars.len(), 2);
        assert_eq!(config.layer_names(), vec!["application", "dotenv"]);
        assert_eq!(config.get_string("APP_NAME").as_deref(), Some("from-application"));
        assert_eq!(config.get_string("EXTRA").as_deref(), Some("1"));
    }

    #[test]
    fn test_load_initial_high_priority() {
        let dir = TempDir::new().unwrap();
        let config = host_with_env(&dir, "APP_NAME=from-dotenv\n");
        config.add_first(Arc::new(
            MapLayer::new("args").with_value(keys::PRIORITY, Priority::High.as_str()),
        ));

        load_initial(&config).unwrap();
        assert_eq!(config.position("dotenv"), Some(0));
        assert_eq!(config.get_string("APP_NAME").as_deref(), Some("from-dotenv"));
    }

    #[test]
    fn test_load_initial_disabled() {
        let dir = TempDir::new().unwrap();
        let config = host_with_env(&dir, "A=1\n");
        config.add_first(Arc::new(MapLayer::new("args").with_value(keys::ENABLED, false)));

        assert_eq!(load_initial(&config).unwrap(), None);
        assert!(!config.contains("dotenv"));
        assert_eq!(Summary::collect(&config), None);
    }

    #[test]
    fn test_load_initial_missing_file_policy() {
        let dir = TempDir::new().unwrap();
        let config = LayeredConfig::new();
        config.add_last(Arc::new(
            MapLayer::new("application")
                .with_value(keys::PATH, dir.path().join("absent.env").display().to_string()),
        ));

        let vars = load_initial(&config).unwrap().unwrap();
        assert!(vars.is_empty());
        assert!(config.contains("dotenv"));

        config.add_first(Arc::new(
            MapLayer::new("args").with_value(keys::FAIL_ON_MISSING, true),
        ));
        config.remove("dotenv");
        let err = load_initial(&config).unwrap_err();
        assert!(err.is_missing_file());
        assert!(!config.contains("dotenv"));
    }

    #[test]
    fn test_load_initial_with_custom_loader() {
        let config = LayeredConfig::new();
        let loader = |_: &LayeredConfig| -> ConfigResult<Variables> {
            Ok(Variables::from([("FAKE".to_string(), "1".to_string())]))
        };

        load_initial_with(&config, &loader).unwrap();
        assert_eq!(config.get_string("FAKE").as_deref(), Some("1"));
    }

    #[test]
    fn test_summary_reports_loaded_count() {
        let dir = TempDir::new().unwrap();
        let config = host_with_env(&dir, "A=1\nB=2\nC=3\n");
        load_initial(&config).unwrap();

        let summary = Summary::collect(&config).unwrap();
        assert_eq!(summary.loaded, 3);
        assert_eq!(summary.priority, "low");
        assert!(!summary.fail_on_missing);
        assert!(summary.path.ends_with(".env"));

        log_summary(&config);
    }

    #[test]
    fn test_summary_reports_resolved_priority() {
        let dir = TempDir::new().unwrap();
        let config = host_with_env(&dir, "A=1\n");
        config.add_first(Arc::new(MapLayer::new("args").with_value(keys::PRIORITY, "urgent")));
        load_initial(&config).unwrap();

        let summary = Summary::collect(&config).unwrap();
        assert_eq!(summary.priority, "low");
        assert_eq!(config.layer_names().last().map(String::as_str), Some("dotenv"));

        config.add_first(Arc::new(MapLayer::new("overrides").with_value(keys::PRIORITY, "HIGH")));
        assert_eq!(Summary::collect(&config).unwrap().priority, "high");
    }

    #[test]
    fn test_summary_without_layer() {
        let summary = Summary::collect(&LayeredConfig::new()).unwrap();
        assert_eq!(summary.loaded, 0);
        assert_eq!(summary.path, ".env");
    }
}
