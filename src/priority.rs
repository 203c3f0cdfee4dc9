//! Precedence of the dotenv layer relative to the host's other layers.

use crate::config::{LayeredConfig, Placement};
use crate::error::{ConfigError, ConfigResult};
use crate::layer::ConfigLayer;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Whether dotenv values win over, or yield to, every other layer.
///
/// Parsing ignores case and surrounding whitespace, whether the value comes
/// from the layered store or from a deserialized settings structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Priority {
    /// Inserted before all other layers; dotenv values win.
    High,
    /// Inserted after all other layers; dotenv values are a fallback.
    #[default]
    Low,
}

impl Priority {
    /// Returns where a layer with this priority goes in the layer list.
    pub fn placement(self) -> Placement {
        match self {
            Priority::High => Placement::First,
            Priority::Low => Placement::Last,
        }
    }

    /// Reads a priority from a configuration value.
    ///
    /// Anything other than `high` (case-insensitive) means [`Priority::Low`];
    /// unrecognized values are logged.
    pub fn from_setting(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| {
            warn!(
                value = %value,
                "[Dotenv] Unknown priority, falling back to '{}'",
                Priority::Low
            );
            Priority::Low
        })
    }

    /// Returns the configuration spelling of this priority.
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Low => "low",
        }
    }
}

impl FromStr for Priority {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "low" => Ok(Priority::Low),
            other => Err(ConfigError::invalid_value(format!(
                "priority must be 'high' or 'low', got '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for Priority {
    type Error = ConfigError;

    fn try_from(value: String) -> ConfigResult<Self> {
        value.parse()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Puts `layer` into `config` at the position dictated by `priority`,
/// replacing any layer registered under the same name.
///
/// # Example
/// ```
/// use dotspice::{install_layer, ConfigValue, LayeredConfig, MapLayer, Priority};
/// use std::sync::Arc;
///
/// let config = LayeredConfig::new();
/// config.add_last(Arc::new(MapLayer::new("application").with_value("PORT", "80")));
///
/// install_layer(&config, Arc::new(MapLayer::new("dotenv").with_value("PORT", "8080")), Priority::High);
/// assert_eq!(config.get("PORT"), Some(ConfigValue::from("8080")));
///
/// install_layer(&config, Arc::new(MapLayer::new("dotenv").with_value("PORT", "8080")), Priority::Low);
/// assert_eq!(config.get("PORT"), Some(ConfigValue::from("80")));
/// ```
pub fn install_layer(config: &LayeredConfig, layer: Arc<dyn ConfigLayer>, priority: Priority) {
    let name = layer.name().to_string();
    let replaced = config.replace(layer, priority.placement()).is_some();
    debug!(layer = %name, priority = %priority, replaced = replaced, "[Dotenv] Installed layer");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_layer::MapLayer;
    use crate::value::ConfigValue;

    fn host() -> LayeredConfig {
        let config = LayeredConfig::new();
        config.add_last(Arc::new(MapLayer::new("args").with_value("SHARED", "args")));
        config.add_last(Arc::new(
            MapLayer::new("application").with_value("SHARED", "application"),
        ));
        config
    }

    fn dotenv_layer() -> Arc<dyn ConfigLayer> {
        Arc::new(
            MapLayer::new("dotenv")
                .with_value("SHARED", "dotenv")
                .with_value("ONLY_DOTENV", "yes"),
        )
    }

    #[test]
    fn test_default_is_low() {
        assert_eq!(Priority::default(), Priority::Low);
    }

    #[test]
    fn test_parse() {
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" HIGH ".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("low".parse::<Priority>().unwrap(), Priority::Low);
        assert!("medium".parse::<Priority>().is_err());
    }

    #[test]
    fn test_from_setting_is_lenient() {
        assert_eq!(Priority::from_setting("High"), Priority::High);
        assert_eq!(Priority::from_setting("urgent"), Priority::Low);
        assert_eq!(Priority::from_setting(""), Priority::Low);
    }

    #[test]
    fn test_display() {
        assert_eq!(Priority::High.to_string(), "high");
        assert_eq!(Priority::Low.to_string(), "low");
    }

    #[test]
    fn test_high_priority_wins_over_every_layer() {
        let config = host();
        install_layer(&config, dotenv_layer(), Priority::High);

        assert_eq!(config.layer_names(), vec!["dotenv", "args", "application"]);
        assert_eq!(config.get("SHARED"), Some(ConfigValue::from("dotenv")));
    }

    #[test]
    fn test_low_priority_is_a_fallback() {
        let config = host();
        install_layer(&config, dotenv_layer(), Priority::Low);

        assert_eq!(config.layer_names(), vec!["args", "application", "dotenv"]);
        assert_eq!(config.get("SHARED"), Some(ConfigValue::from("args")));
        assert_eq!(config.get("ONLY_DOTENV"), Some(ConfigValue::from("yes")));
    }

    #[test]
    fn test_reinstall_keeps_single_layer() {
        let config = host();
        install_layer(&config, dotenv_layer(), Priority::Low);
        install_layer(&config, dotenv_layer(), Priority::High);

        assert_eq!(config.layer_count(), 3);
        assert_eq!(config.position("dotenv"), Some(0));
    }

    #[test]
    fn test_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            priority: Priority,
        }

        let wrapper: Wrapper = serde_json::from_str(r#"{"priority": "high"}"#).unwrap();
        assert_eq!(wrapper.priority, Priority::High);
        assert!(serde_json::from_str::<Wrapper>(r#"{"priority": "top"}"#).is_err());
    }

    #[test]
    fn test_deserialize_ignores_case_like_from_str() {
        #[derive(Deserialize)]
        struct Wrapper {
            priority: Priority,
        }

        for raw in ["HIGH", "High", " high "] {
            let wrapper: Wrapper = toml::from_str(&format!("priority = \"{raw}\"")).unwrap();
            assert_eq!(wrapper.priority, raw.parse::<Priority>().unwrap());
            assert_eq!(wrapper.priority, Priority::High);
        }

        let wrapper: Wrapper = serde_json::from_str(r#"{"priority": "LOW"}"#).unwrap();
        assert_eq!(wrapper.priority, Priority::Low);
    }
}
