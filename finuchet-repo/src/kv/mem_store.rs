use crate::kv::{KeyValueStore, StoreError, TierKind};
use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Process-wide map. Lost on restart.
#[derive(Default)]
pub struct MemStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemStore {
    pub fn new() -> MemStore {
        MemStore::default()
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<HashMap<String, Value>>, anyhow::Error> {
        self.entries
            .read()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<HashMap<String, Value>>, anyhow::Error> {
        self.entries
            .write()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }
}

#[async_trait]
impl KeyValueStore for MemStore {
    fn kind(&self) -> TierKind {
        TierKind::Memory
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.read_lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.write_lock()?.insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.write_lock()?.remove(key);
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self
            .read_lock()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[actix_rt::test]
    async fn set_get_delete() {
        let store = MemStore::new();
        store.set("user:a", json!({"n": 1})).await.unwrap();
        store.set("user:b", json!(2)).await.unwrap();
        store.set("csv:a", json!([])).await.unwrap();

        assert_eq!(store.get("user:a").await.unwrap(), Some(json!({"n": 1})));
        assert_eq!(store.keys("user:").await.unwrap(), vec!["user:a", "user:b"]);

        store.delete("user:a").await.unwrap();
        assert_eq!(store.get("user:a").await.unwrap(), None);
    }

    #[actix_rt::test]
    async fn probe_leaves_nothing_behind() {
        let store = MemStore::new();
        store.probe().await.unwrap();
        assert!(store.keys("").await.unwrap().is_empty());
    }
}
