//! The host's layered configuration store.

use crate::error::{ConfigError, ConfigResult};
use crate::layer::{utils, ConfigLayer};
use crate::value::ConfigValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Where a layer is inserted in the ordered layer list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Before every other layer (consulted first)
    First,
    /// After every other layer (consulted last)
    Last,
}

/// An ordered list of named configuration layers.
///
/// Lookups scan the list front to back and return the first value found.
/// The list can be shared across threads: readers take a read lock for the
/// duration of one lookup, while [`replace`](Self::replace) removes and
/// re-inserts a layer under a single write lock so no lookup observes the
/// list without it.
#[derive(Default)]
pub struct LayeredConfig {
    /// Configuration layers ordered by precedence (highest first)
    layers: RwLock<Vec<Arc<dyn ConfigLayer>>>,
}

impl LayeredConfig {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Arc<dyn ConfigLayer>>> {
        self.layers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Arc<dyn ConfigLayer>>> {
        self.layers.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a layer before all existing layers.
    pub fn add_first(&self, layer: Arc<dyn ConfigLayer>) {
        self.insert(layer, Placement::First);
    }

    /// Inserts a layer after all existing layers.
    pub fn add_last(&self, layer: Arc<dyn ConfigLayer>) {
        self.insert(layer, Placement::Last);
    }

    /// Inserts a layer at the given placement.
    pub fn insert(&self, layer: Arc<dyn ConfigLayer>, placement: Placement) {
        let mut layers = self.write();
        Self::insert_locked(&mut layers, layer, placement);
    }

    fn insert_locked(
        layers: &mut Vec<Arc<dyn ConfigLayer>>,
        layer: Arc<dyn ConfigLayer>,
        placement: Placement,
    ) {
        match placement {
            Placement::First => layers.insert(0, layer),
            Placement::Last => layers.push(layer),
        }
    }

    /// Removes the layer registered under `name`, returning it.
    pub fn remove(&self, name: &str) -> Option<Arc<dyn ConfigLayer>> {
        let mut layers = self.write();
        let index = layers.iter().position(|layer| layer.name() == name)?;
        Some(layers.remove(index))
    }

    /// Removes any layer with the same name as `layer` and inserts `layer`
    /// at `placement`, atomically with respect to readers.
    ///
    /// Returns the layer that was replaced, if any.
    pub fn replace(
        &self,
        layer: Arc<dyn ConfigLayer>,
        placement: Placement,
    ) -> Option<Arc<dyn ConfigLayer>> {
        let mut layers = self.write();
        let previous = layers
            .iter()
            .position(|existing| existing.name() == layer.name())
            .map(|index| layers.remove(index));
        Self::insert_locked(&mut layers, layer, placement);
        previous
    }

    /// Returns true if a layer is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.read().iter().any(|layer| layer.name() == name)
    }

    /// Returns the layer registered under `name`.
    pub fn layer(&self, name: &str) -> Option<Arc<dyn ConfigLayer>> {
        self.read()
            .iter()
            .find(|layer| layer.name() == name)
            .cloned()
    }

    /// Returns the position of the named layer in lookup order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.read().iter().position(|layer| layer.name() == name)
    }

    /// Returns layer names in lookup order.
    pub fn layer_names(&self) -> Vec<String> {
        self.read()
            .iter()
            .map(|layer| layer.name().to_string())
            .collect()
    }

    /// Returns the number of registered layers.
    pub fn layer_count(&self) -> usize {
        self.read().len()
    }

    /// Gets a value using first-match-wins across the layers.
    ///
    /// # Example
    /// ```
    /// use dotspice::{ConfigValue, LayeredConfig, MapLayer};
    /// use std::sync::Arc;
    ///
    /// let config = LayeredConfig::new();
    /// config.add_last(Arc::new(MapLayer::new("application").with_value("port", 8080i64)));
    /// config.add_first(Arc::new(MapLayer::new("overrides").with_value("port", 9090i64)));
    ///
    /// assert_eq!(config.get("port"), Some(ConfigValue::Integer(9090)));
    /// ```
    pub fn get(&self, key: &str) -> Option<ConfigValue> {
        utils::first_match(&self.read(), key)
    }

    /// Gets a value coerced to a string.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).map(|value| value.coerce_to_string())
    }

    /// Gets a value coerced to a boolean.
    ///
    /// # Errors
    /// * `ConfigError::TypeConversion` - If the value does not read as a boolean
    pub fn get_bool(&self, key: &str) -> ConfigResult<Option<bool>> {
        match self.get(key) {
            Some(value) => value
                .coerce_to_bool()
                .map(Some)
                .ok_or_else(|| ConfigError::type_conversion(value.type_name(), "bool")),
            None => Ok(None),
        }
    }

    /// Returns true if any layer defines `key`.
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns every key known to any layer, sorted.
    pub fn all_keys(&self) -> Vec<String> {
        utils::collect_all_keys(&self.read())
    }

    /// Resolves every known key into one flat map.
    pub fn all_settings(&self) -> HashMap<String, ConfigValue> {
        utils::merge_all_layers(&self.read())
    }
}

impl fmt::Debug for LayeredConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayeredConfig")
            .field("layers", &self.layer_names())
            .finish()
    }
}
