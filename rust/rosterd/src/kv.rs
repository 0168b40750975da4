//! Namespaced JSON key-value store.
//!
//! Every operation fails soft: storage and serde errors are logged and turned
//! into a no-op (writes) or the caller's default (reads).

use serde::de::DeserializeOwned;
use serde::Serialize;

pub const DEFAULT_NAMESPACE: &str = "shiwalik_";

/// Raw string storage with the shape of the browser's `localStorage`.
pub trait Storage {
    fn get_item(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove_item(&self, key: &str) -> anyhow::Result<()>;
    fn keys(&self) -> anyhow::Result<Vec<String>>;
}

pub struct KeyValueStore {
    backend: Box<dyn Storage>,
    namespace: String,
}

impl KeyValueStore {
    pub fn new(backend: Box<dyn Storage>, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    /// Serialize and store `value`. Returns whether the write landed.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        let text = match serde_json::to_string(value) {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(key, error = %e, "failed to serialize value");
                return false;
            }
        };
        match self.backend.set_item(&self.full_key(key), &text) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(key, error = %e, "failed to save value");
                false
            }
        }
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let text = match self.backend.get_item(&self.full_key(key)) {
            Ok(Some(t)) => t,
            Ok(None) => return default,
            Err(e) => {
                tracing::error!(key, error = %e, "failed to read value");
                return default;
            }
        };
        match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key, error = %e, "stored value did not parse; using default");
                default
            }
        }
    }

    pub fn clear(&self, key: &str) {
        if let Err(e) = self.backend.remove_item(&self.full_key(key)) {
            tracing::error!(key, error = %e, "failed to clear value");
        }
    }

    /// Un-prefixed keys currently stored in this namespace.
    pub fn keys(&self) -> Vec<String> {
        self.namespaced_keys()
            .into_iter()
            .filter_map(|k| k.strip_prefix(&self.namespace).map(|s| s.to_string()))
            .collect()
    }

    /// Every `(prefixed key, value)` pair in the namespace. Unparseable entries are skipped.
    pub fn entries(&self) -> Vec<(String, serde_json::Value)> {
        let mut out = Vec::new();
        for key in self.namespaced_keys() {
            let text = match self.backend.get_item(&key) {
                Ok(Some(t)) => t,
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!(key = %key, error = %e, "failed to read value");
                    continue;
                }
            };
            match serde_json::from_str(&text) {
                Ok(v) => out.push((key, v)),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "skipping unparseable entry");
                }
            }
        }
        out
    }

    fn namespaced_keys(&self) -> Vec<String> {
        match self.backend.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter(|k| k.starts_with(&self.namespace))
                .collect(),
            Err(e) => {
                tracing::error!(error = %e, "failed to list keys");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{open_in_memory, SqliteStorage};
    use serde_json::json;

    fn store() -> KeyValueStore {
        let conn = open_in_memory().expect("in-memory db");
        KeyValueStore::new(Box::new(SqliteStorage::new(conn)), DEFAULT_NAMESPACE)
    }

    #[test]
    fn save_load_clear() {
        let kv = store();
        assert!(kv.save("sectionVisibility", &json!({ "gallery": false })));
        let v: serde_json::Value = kv.load("sectionVisibility", json!(null));
        assert_eq!(v, json!({ "gallery": false }));
        assert_eq!(kv.keys(), vec!["sectionVisibility".to_string()]);

        kv.clear("sectionVisibility");
        let v: serde_json::Value = kv.load("sectionVisibility", json!("fallback"));
        assert_eq!(v, json!("fallback"));
    }

    #[test]
    fn load_falls_back_on_shape_mismatch() {
        let kv = store();
        kv.save("students", &json!({ "not": "a list" }));
        let v: Vec<String> = kv.load("students", vec!["default".to_string()]);
        assert_eq!(v, vec!["default".to_string()]);
    }
}
