//! Configuration layer abstraction and first-match lookup helpers.

use crate::value::ConfigValue;
use std::any::Any;

/// A named, read-only source of key-value configuration.
///
/// Layers are consulted in list order by [`LayeredConfig`](crate::LayeredConfig);
/// the first layer that knows a key wins.
pub trait ConfigLayer: Send + Sync {
    /// Gets a configuration value by key.
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// Returns all keys this layer can enumerate.
    fn keys(&self) -> Vec<String>;

    /// Returns the name this layer is registered under.
    fn name(&self) -> &str;

    /// Returns a reference to the layer as Any for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Lookup helpers over an ordered slice of layers.
pub mod utils {
    use super::*;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Arc;

    /// Returns the value from the first layer that defines `key`.
    ///
    /// # Example
    /// ```
    /// use dotspice::layer::{utils::first_match, ConfigLayer};
    /// use dotspice::{ConfigValue, MapLayer};
    /// use std::sync::Arc;
    ///
    /// let layers: Vec<Arc<dyn ConfigLayer>> = vec![
    ///     Arc::new(MapLayer::new("front").with_value("port", 80i64)),
    ///     Arc::new(MapLayer::new("back").with_value("port", 8080i64)),
    /// ];
    /// assert_eq!(first_match(&layers, "port"), Some(ConfigValue::Integer(80)));
    /// ```
    pub fn first_match(layers: &[Arc<dyn ConfigLayer>], key: &str) -> Option<ConfigValue> {
        layers.iter().find_map(|layer| layer.get(key))
    }

    /// Collects all unique keys across layers, sorted.
    pub fn collect_all_keys(layers: &[Arc<dyn ConfigLayer>]) -> Vec<String> {
        let keys: BTreeSet<String> = layers.iter().flat_map(|layer| layer.keys()).collect();
        keys.into_iter().collect()
    }

    /// Resolves every known key with first-match-wins semantics.
    pub fn merge_all_layers(layers: &[Arc<dyn ConfigLayer>]) -> HashMap<String, ConfigValue> {
        collect_all_keys(layers)
            .into_iter()
            .filter_map(|key| first_match(layers, &key).map(|value| (key, value)))
            .collect()
    }
}
