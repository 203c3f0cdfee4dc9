//! Process environment configuration layer.

use crate::layer::ConfigLayer;
use crate::value::ConfigValue;
use std::collections::HashMap;
use std::env;

/// Name the environment layer is registered under by default.
pub const SYSTEM_ENVIRONMENT: &str = "systemEnvironment";

/// Configuration layer over a snapshot of the process environment.
///
/// Keys use relaxed binding: a lookup for `dotenv.fail-on-missing` first
/// tries the literal name, then `DOTENV_FAIL_ON_MISSING` (uppercased, with
/// `.` and `-` turned into `_`, and the prefix prepended when one is set).
/// Values are always strings.
pub struct EnvConfigLayer {
    name: String,

    /// Optional prefix for environment variable names
    prefix: Option<String>,

    /// Custom key transformation function
    key_replacer: Option<Box<dyn Fn(&str) -> String + Send + Sync>>,

    /// Variables captured at construction or the last refresh
    vars: HashMap<String, String>,
}

impl EnvConfigLayer {
    /// Creates a layer over the current process environment.
    ///
    /// # Arguments
    /// * `prefix` - Optional prefix; when set only `PREFIX_*` variables are visible
    ///
    /// # Example
    /// ```
    /// use dotspice::env_layer::EnvConfigLayer;
    ///
    /// let env_layer = EnvConfigLayer::new(Some("APP".to_string()));
    /// assert_eq!(env_layer.transform_key("dotenv.path"), "APP_DOTENV_PATH");
    /// ```
    pub fn new(prefix: Option<String>) -> Self {
        Self::from_vars(prefix, env::vars())
    }

    /// Creates a layer over an explicit set of variables.
    pub fn from_vars<I, K, V>(prefix: Option<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut layer = Self {
            name: SYSTEM_ENVIRONMENT.to_string(),
            prefix,
            key_replacer: None,
            vars: HashMap::new(),
        };
        layer.capture(vars);
        layer
    }

    /// Registers the layer under a different name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets a custom key replacement function, applied after the default
    /// transformation and before the prefix is added.
    ///
    /// # Example
    /// ```
    /// use dotspice::env_layer::EnvConfigLayer;
    ///
    /// let mut env_layer = EnvConfigLayer::from_vars(None, [("DOTENV__PATH", "/srv/.env")]);
    /// env_layer.set_key_replacer(Box::new(|key: &str| key.replace('_', "__")));
    /// assert_eq!(env_layer.transform_key("dotenv.path"), "DOTENV__PATH");
    /// ```
    pub fn set_key_replacer<F>(&mut self, replacer: Box<F>)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.key_replacer = Some(replacer);
    }

    /// Re-reads the process environment.
    pub fn refresh(&mut self) {
        self.capture(env::vars());
    }

    fn capture<I, K, V>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let prefix = self.prefix.as_ref().map(|prefix| format!("{prefix}_"));
        self.vars = vars
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .filter(|(key, _)| prefix.as_ref().map_or(true, |p| key.starts_with(p.as_str())))
            .collect();
    }

    /// Transforms a configuration key to an environment variable name.
    ///
    /// 1. Convert to uppercase
    /// 2. Replace `.` and `-` with `_`
    /// 3. Apply the custom key replacer if set
    /// 4. Add the prefix if configured
    pub fn transform_key(&self, key: &str) -> String {
        let mut env_key = key.to_uppercase().replace(['.', '-'], "_");

        if let Some(ref replacer) = self.key_replacer {
            env_key = replacer(&env_key);
        }

        if let Some(ref prefix) = self.prefix {
            format!("{prefix}_{env_key}")
        } else {
            env_key
        }
    }

    /// Returns the number of captured variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl ConfigLayer for EnvConfigLayer {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        let literal = match self.prefix {
            Some(ref prefix) => format!("{prefix}_{key}"),
            None => key.to_string(),
        };

        self.vars
            .get(&literal)
            .or_else(|| self.vars.get(&self.transform_key(key)))
            .map(|value| ConfigValue::String(value.clone()))
    }

    fn keys(&self) -> Vec<String> {
        match self.prefix {
            Some(ref prefix) => {
                let prefix = format!("{prefix}_");
                self.vars
                    .keys()
                    .filter_map(|key| key.strip_prefix(prefix.as_str()))
                    .map(str::to_string)
                    .collect()
            }
            None => self.vars.keys().cloned().collect(),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl std::fmt::Debug for EnvConfigLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvConfigLayer")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field("vars", &self.vars.len())
            .finish()
    }
}
