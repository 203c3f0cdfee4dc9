//! Parsers for host settings files.
//!
//! Settings files are the host's own configuration (where `dotenv.path`,
//! `dotenv.priority` and friends usually live). Every parser produces a flat
//! map: nested tables become dotted keys and array elements are indexed.
//!
//! ```yaml
//! dotenv:
//!   path: config/.env
//!   reload:
//!     enabled: true
//! hosts: [a, b]
//! ```
//!
//! becomes `dotenv.path`, `dotenv.reload.enabled`, `hosts[0]` and
//! `hosts[1]`.
//!
//! ## Parser Detection
//!
//! ```rust
//! use dotspice::parser::detect_parser_by_extension;
//!
//! assert_eq!(detect_parser_by_extension("yml").unwrap().name(), "YAML");
//! assert!(detect_parser_by_extension("xml").is_err());
//! ```

use crate::error::{ConfigError, ConfigResult};
use crate::value::ConfigValue;
use std::collections::HashMap;

/// Flat settings as produced by a [`ConfigParser`].
pub type Settings = HashMap<String, ConfigValue>;

/// Parses one settings file format into flat dotted keys.
///
/// # Example Implementation
///
/// ```rust
/// use dotspice::parser::{ConfigParser, Settings};
/// use dotspice::{ConfigResult, ConfigValue};
///
/// struct PropertiesParser;
///
/// impl ConfigParser for PropertiesParser {
///     fn parse(&self, content: &str) -> ConfigResult<Settings> {
///         Ok(content
///             .lines()
///             .filter_map(|line| line.split_once('='))
///             .map(|(k, v)| (k.trim().to_string(), ConfigValue::from(v.trim())))
///             .collect())
///     }
///
///     fn supported_extensions(&self) -> &[&str] {
///         &["properties"]
///     }
///
///     fn name(&self) -> &str {
///         "Properties"
///     }
/// }
///
/// let settings = PropertiesParser.parse("dotenv.priority = high").unwrap();
/// assert_eq!(settings["dotenv.priority"], ConfigValue::from("high"));
/// ```
pub trait ConfigParser: Send + Sync {
    /// Parses configuration content into a flat key-value map.
    ///
    /// # Errors
    /// * `ConfigError::Parse` - If the content cannot be parsed due to syntax errors
    fn parse(&self, content: &str) -> ConfigResult<Settings>;

    /// Returns the file extensions (without the dot) handled by this parser.
    fn supported_extensions(&self) -> &[&str];

    /// Returns a human-readable name for this parser.
    fn name(&self) -> &str;
}

/// Determines the appropriate parser based on file extension.
///
/// Matching is case-insensitive.
///
/// # Errors
/// * `ConfigError::UnsupportedFormat` - If the extension is not supported
///
/// # Supported Extensions
/// - `json` - JSON parser
/// - `yaml`, `yml` - YAML parser
/// - `toml` - TOML parser
/// - `ini` - INI parser
pub fn detect_parser_by_extension(extension: &str) -> ConfigResult<Box<dyn ConfigParser>> {
    match extension.to_lowercase().as_str() {
        "json" => Ok(Box::new(JsonParser)),
        "yaml" | "yml" => Ok(Box::new(YamlParser)),
        "toml" => Ok(Box::new(TomlParser)),
        "ini" => Ok(Box::new(IniParser)),
        _ => Err(ConfigError::UnsupportedFormat),
    }
}

/// JSON settings parser. The root must be an object.
///
/// # Example
/// ```rust
/// use dotspice::parser::{ConfigParser, JsonParser};
/// use dotspice::ConfigValue;
///
/// let parsed = JsonParser
///     .parse(r#"{"dotenv": {"path": ".env.local", "fail-on-missing": true}}"#)
///     .unwrap();
/// assert_eq!(parsed["dotenv.path"], ConfigValue::from(".env.local"));
/// assert_eq!(parsed["dotenv.fail-on-missing"], ConfigValue::Boolean(true));
/// ```
pub struct JsonParser;

impl ConfigParser for JsonParser {
    fn parse(&self, content: &str) -> ConfigResult<Settings> {
        let value: serde_json::Value = serde_json::from_str(content)
            .map_err(|e| ConfigError::parse_error("JSON", e.to_string()))?;

        match value {
            serde_json::Value::Object(map) => {
                let mut result = Settings::new();
                for (k, v) in map {
                    flatten_json(&k, v, &mut result);
                }
                Ok(result)
            }
            _ => Err(ConfigError::parse_error("JSON", "Root must be an object")),
        }
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }

    fn name(&self) -> &str {
        "JSON"
    }
}

/// YAML settings parser. The root must be a mapping; non-string keys are
/// converted to strings.
pub struct YamlParser;

impl ConfigParser for YamlParser {
    fn parse(&self, content: &str) -> ConfigResult<Settings> {
        let value: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::parse_error("YAML", e.to_string()))?;

        match value {
            serde_yaml::Value::Mapping(map) => {
                let mut result = Settings::new();
                for (k, v) in map {
                    flatten_yaml(&yaml_key_to_string(&k), v, &mut result);
                }
                Ok(result)
            }
            // An empty document
            serde_yaml::Value::Null => Ok(Settings::new()),
            _ => Err(ConfigError::parse_error(
                "YAML",
                "Root must be a mapping/object",
            )),
        }
    }

    fn supported_extensions(&self) -> &[&str] {
        &["yaml", "yml"]
    }

    fn name(&self) -> &str {
        "YAML"
    }
}

/// TOML settings parser. Datetimes are kept as their string form.
pub struct TomlParser;

impl ConfigParser for TomlParser {
    fn parse(&self, content: &str) -> ConfigResult<Settings> {
        let table: toml::Table = content
            .parse()
            .map_err(|e: toml::de::Error| ConfigError::parse_error("TOML", e.to_string()))?;

        let mut result = Settings::new();
        for (k, v) in table {
            flatten_toml(&k, v, &mut result);
        }
        Ok(result)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["toml"]
    }

    fn name(&self) -> &str {
        "TOML"
    }
}

/// INI settings parser.
///
/// Keys before the first section are global; keys inside `[section]` become
/// `section.key`. Lines starting with `#` or `;` are comments.
pub struct IniParser;

impl ConfigParser for IniParser {
    fn parse(&self, content: &str) -> ConfigResult<Settings> {
        parse_ini_content(content)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["ini"]
    }

    fn name(&self) -> &str {
        "INI"
    }
}

fn parse_ini_content(content: &str) -> ConfigResult<Settings> {
    let mut result = Settings::new();
    let mut current_section: Option<String> = None;

    for (number, line) in content.lines().enumerate() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            let section_name = line[1..line.len() - 1].trim();
            if section_name.is_empty() {
                return Err(ConfigError::parse_error(
                    "INI",
                    format!("Empty section name on line {}", number + 1),
                ));
            }
            current_section = Some(section_name.to_string());
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::parse_error(
                "INI",
                format!("Invalid line format on line {}: {line}", number + 1),
            ));
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::parse_error(
                "INI",
                format!("Empty key name on line {}", number + 1),
            ));
        }

        let full_key = match current_section {
            Some(ref section) => format!("{section}.{key}"),
            None => key.to_string(),
        };
        result.insert(full_key, parse_ini_value(value.trim()));
    }

    Ok(result)
}

fn parse_ini_value(value: &str) -> ConfigValue {
    // Integer before boolean so "0" and "1" stay numeric
    if let Ok(i) = value.parse::<i64>() {
        return ConfigValue::Integer(i);
    }

    if let Ok(f) = value.parse::<f64>() {
        return ConfigValue::Float(f);
    }

    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" => return ConfigValue::Boolean(true),
        "false" | "no" | "off" => return ConfigValue::Boolean(false),
        _ => {}
    }

    ConfigValue::String(value.to_string())
}

fn child_key(prefix: &str, key: &str) -> String {
    format!("{prefix}.{key}")
}

fn index_key(prefix: &str, index: usize) -> String {
    format!("{prefix}[{index}]")
}

fn flatten_json(prefix: &str, value: serde_json::Value, out: &mut Settings) {
    match value {
        serde_json::Value::Object(map) => {
            for (k, v) in map {
                flatten_json(&child_key(prefix, &k), v, out);
            }
        }
        serde_json::Value::Array(items) => {
            for (i, v) in items.into_iter().enumerate() {
                flatten_json(&index_key(prefix, i), v, out);
            }
        }
        serde_json::Value::String(s) => {
            out.insert(prefix.to_string(), ConfigValue::String(s));
        }
        serde_json::Value::Number(n) => {
            let value = if let Some(i) = n.as_i64() {
                ConfigValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                ConfigValue::Float(f)
            } else {
                ConfigValue::String(n.to_string())
            };
            out.insert(prefix.to_string(), value);
        }
        serde_json::Value::Bool(b) => {
            out.insert(prefix.to_string(), ConfigValue::Boolean(b));
        }
        serde_json::Value::Null => {
            out.insert(prefix.to_string(), ConfigValue::Null);
        }
    }
}

fn flatten_yaml(prefix: &str, value: serde_yaml::Value, out: &mut Settings) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                flatten_yaml(&child_key(prefix, &yaml_key_to_string(&k)), v, out);
            }
        }
        serde_yaml::Value::Sequence(items) => {
            for (i, v) in items.into_iter().enumerate() {
                flatten_yaml(&index_key(prefix, i), v, out);
            }
        }
        serde_yaml::Value::String(s) => {
            out.insert(prefix.to_string(), ConfigValue::String(s));
        }
        serde_yaml::Value::Number(n) => {
            let value = if let Some(i) = n.as_i64() {
                ConfigValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                ConfigValue::Float(f)
            } else {
                ConfigValue::String(n.to_string())
            };
            out.insert(prefix.to_string(), value);
        }
        serde_yaml::Value::Bool(b) => {
            out.insert(prefix.to_string(), ConfigValue::Boolean(b));
        }
        serde_yaml::Value::Null => {
            out.insert(prefix.to_string(), ConfigValue::Null);
        }
        serde_yaml::Value::Tagged(tagged) => flatten_yaml(prefix, tagged.value, out),
    }
}

fn yaml_key_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        _ => format!("{value:?}"),
    }
}

fn flatten_toml(prefix: &str, value: toml::Value, out: &mut Settings) {
    let scalar = match value {
        toml::Value::Table(table) => {
            for (k, v) in table {
                flatten_toml(&child_key(prefix, &k), v, out);
            }
            return;
        }
        toml::Value::Array(items) => {
            for (i, v) in items.into_iter().enumerate() {
                flatten_toml(&index_key(prefix, i), v, out);
            }
            return;
        }
        toml::Value::String(s) => ConfigValue::String(s),
        toml::Value::Integer(i) => ConfigValue::Integer(i),
        toml::Value::Float(f) => ConfigValue::Float(f),
        toml::Value::Boolean(b) => ConfigValue::Boolean(b),
        toml::Value::Datetime(dt) => ConfigValue::String(dt.to_string()),
    };
    out.insert(prefix.to_string(), scalar);
}
