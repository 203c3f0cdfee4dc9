//! Configuration layer backed by a snapshot of dotenv variables.

use crate::dotenv_parser::Variables;
use crate::layer::ConfigLayer;
use crate::options::keys;
use crate::value::ConfigValue;
use std::any::Any;
use std::sync::Arc;

/// A named, read-only view over a shared variable snapshot.
///
/// The snapshot is never mutated; a reload builds a new layer around a new
/// snapshot and swaps it into the layered configuration.
#[derive(Debug, Clone)]
pub struct DotenvLayer {
    name: String,
    variables: Arc<Variables>,
}

impl DotenvLayer {
    /// Creates a layer named `name` over `variables`.
    pub fn new(name: impl Into<String>, variables: Arc<Variables>) -> Self {
        Self {
            name: name.into(),
            variables,
        }
    }

    /// Creates a layer under the standard name `"dotenv"`.
    pub fn standard(variables: Arc<Variables>) -> Self {
        Self::new(keys::PROPERTY_SOURCE_NAME, variables)
    }

    /// Returns the snapshot this layer serves.
    pub fn variables(&self) -> &Arc<Variables> {
        &self.variables
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

impl ConfigLayer for DotenvLayer {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.variables
            .get(key)
            .map(|value| ConfigValue::String(value.clone()))
    }

    fn keys(&self) -> Vec<String> {
        self.variables.keys().cloned().collect()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Arc<Variables> {
        Arc::new(Variables::from([
            ("DB_HOST".to_string(), "localhost".to_string()),
            ("DB_PORT".to_string(), "5432".to_string()),
        ]))
    }

    #[test]
    fn test_lookup_returns_strings() {
        let layer = DotenvLayer::standard(snapshot());
        assert_eq!(layer.name(), "dotenv");
        assert_eq!(layer.get("DB_HOST"), Some(ConfigValue::from("localhost")));
        assert_eq!(layer.get("DB_PORT"), Some(ConfigValue::from("5432")));
        assert_eq!(layer.get("MISSING"), None);
    }

    #[test]
    fn test_keys_and_len() {
        let layer = DotenvLayer::new("custom", snapshot());
        let mut keys = layer.keys();
        keys.sort();
        assert_eq!(keys, vec!["DB_HOST", "DB_PORT"]);
        assert_eq!(layer.len(), 2);
        assert!(!layer.is_empty());
        assert!(DotenvLayer::standard(Arc::new(Variables::new())).is_empty());
    }

    #[test]
    fn test_shares_snapshot() {
        let vars = snapshot();
        let layer = DotenvLayer::standard(Arc::clone(&vars));
        assert!(Arc::ptr_eq(layer.variables(), &vars));
    }

    #[test]
    fn test_downcast_through_trait_object() {
        let layer: Arc<dyn ConfigLayer> = Arc::new(DotenvLayer::standard(snapshot()));
        let concrete = layer.as_any().downcast_ref::<DotenvLayer>();
        assert_eq!(concrete.map(DotenvLayer::len), Some(2));
    }
}
