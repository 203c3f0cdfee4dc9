//! In-memory configuration layer.

use crate::layer::ConfigLayer;
use crate::value::ConfigValue;
use std::collections::HashMap;

/// A named layer backed by a plain map.
///
/// Hosts use this for their own properties (application defaults, test
/// overrides) next to the dotenv layer.
#[derive(Debug, Clone)]
pub struct MapLayer {
    name: String,
    data: HashMap<String, ConfigValue>,
}

impl MapLayer {
    /// Creates a new empty layer.
    ///
    /// # Example
    /// ```
    /// use dotspice::{ConfigLayer, MapLayer};
    ///
    /// let layer = MapLayer::new("defaults");
    /// assert_eq!(layer.name(), "defaults");
    /// assert!(layer.is_empty());
    /// ```
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: HashMap::new(),
        }
    }

    /// Creates a layer with initial values.
    pub fn with_values(name: impl Into<String>, data: HashMap<String, ConfigValue>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Adds a value, builder style.
    ///
    /// # Example
    /// ```
    /// use dotspice::{ConfigLayer, ConfigValue, MapLayer};
    ///
    /// let layer = MapLayer::new("application")
    ///     .with_value("dotenv.priority", "high")
    ///     .with_value("server.port", 8080i64);
    /// assert_eq!(layer.get("server.port"), Some(ConfigValue::Integer(8080)));
    /// ```
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Returns the number of values stored in this layer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the layer contains no values.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ConfigLayer for MapLayer {
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
