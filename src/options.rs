//! Dotenv options and the keys they are read from.
//!
//! Options live in the host's own layered configuration under the `dotenv.`
//! prefix, so they can come from a settings file, the process environment
//! (`DOTENV_PRIORITY=high`), command line flags, or code.

use crate::config::LayeredConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::priority::Priority;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Option key names and their defaults.
pub mod keys {
    /// Name of the layer holding dotenv variables.
    pub const PROPERTY_SOURCE_NAME: &str = "dotenv";

    /// Whether dotenv loading is enabled.
    pub const ENABLED: &str = "dotenv.enabled";
    /// Location of the dotenv file.
    pub const PATH: &str = "dotenv.path";
    /// `high` or `low`.
    pub const PRIORITY: &str = "dotenv.priority";
    /// Whether a missing file aborts startup.
    pub const FAIL_ON_MISSING: &str = "dotenv.fail-on-missing";
    /// Whether runtime reload is permitted.
    pub const RELOAD_ENABLED: &str = "dotenv.reload.enabled";

    pub const DEFAULT_ENABLED: bool = true;
    pub const DEFAULT_PATH: &str = ".env";
    pub const DEFAULT_FAIL_ON_MISSING: bool = false;
    pub const DEFAULT_RELOAD_ENABLED: bool = false;
}

/// Resolved dotenv options.
///
/// Usually built with [`DotenvOptions::from_config`]; hosts that keep their
/// own typed settings can deserialize it directly:
///
/// ```
/// use dotspice::{DotenvOptions, Priority};
///
/// let options: DotenvOptions = toml::from_str(r#"
///     priority = "high"
///     fail-on-missing = true
///
///     [reload]
///     enabled = true
/// "#).unwrap();
///
/// assert_eq!(options.priority, Priority::High);
/// assert!(options.fail_on_missing);
/// assert!(options.reload.enabled);
/// assert_eq!(options.path.to_str(), Some(".env"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DotenvOptions {
    pub enabled: bool,
    pub path: PathBuf,
    pub priority: Priority,
    pub fail_on_missing: bool,
    pub reload: ReloadOptions,
}

/// Runtime reload settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReloadOptions {
    pub enabled: bool,
}

impl Default for DotenvOptions {
    fn default() -> Self {
        Self {
            enabled: keys::DEFAULT_ENABLED,
            path: PathBuf::from(keys::DEFAULT_PATH),
            priority: Priority::default(),
            fail_on_missing: keys::DEFAULT_FAIL_ON_MISSING,
            reload: ReloadOptions {
                enabled: keys::DEFAULT_RELOAD_ENABLED,
            },
        }
    }
}

impl DotenvOptions {
    /// Reads the `dotenv.*` options from the layered configuration.
    ///
    /// `dotenv.path` may reference other settings with `${key}` or
    /// `${key:default}`, and may start with `~/`.
    ///
    /// # Errors
    /// * `ConfigError::InvalidValue` - If a flag is not a boolean or a
    ///   path placeholder cannot be resolved
    pub fn from_config(config: &LayeredConfig) -> ConfigResult<Self> {
        let raw_path = config
            .get_string(keys::PATH)
            .unwrap_or_else(|| keys::DEFAULT_PATH.to_string());
        let path = expand_home(&resolve_placeholders(config, &raw_path)?);

        let priority = config
            .get_string(keys::PRIORITY)
            .map(|value| Priority::from_setting(&value))
            .unwrap_or_default();

        Ok(Self {
            enabled: bool_option(config, keys::ENABLED, keys::DEFAULT_ENABLED)?,
            path,
            priority,
            fail_on_missing: bool_option(
                config,
                keys::FAIL_ON_MISSING,
                keys::DEFAULT_FAIL_ON_MISSING,
            )?,
            reload: ReloadOptions {
                enabled: bool_option(
                    config,
                    keys::RELOAD_ENABLED,
                    keys::DEFAULT_RELOAD_ENABLED,
                )?,
            },
        })
    }

    /// Sets the dotenv file path.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets whether a missing file is an error.
    pub fn with_fail_on_missing(mut self, fail_on_missing: bool) -> Self {
        self.fail_on_missing = fail_on_missing;
        self
    }

    /// Sets whether runtime reload is permitted.
    pub fn with_reload_enabled(mut self, enabled: bool) -> Self {
        self.reload.enabled = enabled;
        self
    }
}

fn bool_option(config: &LayeredConfig, key: &str, default: bool) -> ConfigResult<bool> {
    config
        .get_bool(key)
        .map(|value| value.unwrap_or(default))
        .map_err(|_| {
            ConfigError::invalid_value(format!(
                "'{key}' must be a boolean, got '{}'",
                config.get_string(key).unwrap_or_default()
            ))
        })
}

/// Replaces `${key}` and `${key:default}` references with values from the
/// layered configuration.
///
/// An unterminated `${` is kept as written.
///
/// # Errors
/// * `ConfigError::InvalidValue` - If a key is unset and has no default
///
/// # Example
/// ```
/// use dotspice::{options::resolve_placeholders, LayeredConfig, MapLayer};
/// use std::sync::Arc;
///
/// let config = LayeredConfig::new();
/// config.add_last(Arc::new(MapLayer::new("application").with_value("app.profile", "dev")));
///
/// assert_eq!(resolve_placeholders(&config, ".env.${app.profile}").unwrap(), ".env.dev");
/// assert_eq!(resolve_placeholders(&config, "${region:eu}/.env").unwrap(), "eu/.env");
/// assert!(resolve_placeholders(&config, "${missing}").is_err());
/// ```
pub fn resolve_placeholders(config: &LayeredConfig, raw: &str) -> ConfigResult<String> {
    let mut resolved = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        resolved.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            resolved.push_str(&rest[start..]);
            return Ok(resolved);
        };

        let expression = &after[..end];
        let (key, default) = match expression.split_once(':') {
            Some((key, default)) => (key.trim(), Some(default)),
            None => (expression.trim(), None),
        };

        match (config.get_string(key), default) {
            (Some(value), _) => resolved.push_str(&value),
            (None, Some(default)) => resolved.push_str(default),
            (None, None) => {
                return Err(ConfigError::invalid_value(format!(
                    "Could not resolve placeholder '{key}' in value \"{raw}\""
                )))
            }
        }
        rest = &after[end + 1..];
    }

    resolved.push_str(rest);
    Ok(resolved)
}

/// Expands a leading `~` to the current user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let home_relative = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/")
    };

    match (home_relative, dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => Path::new(path).to_path_buf(),
    }
}
