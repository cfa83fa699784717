use std::collections::HashMap;
use std::sync::RwLock;

use super::KeyValueStore;
use crate::error::{PipelineError, Result};

/// In-memory store for tests and one-shot runs.
///
/// Thread-safe via `RwLock`. Not durable, data is lost on drop.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys. A poisoned lock is a `Storage` error, as in
    /// every other accessor.
    pub fn len(&self) -> Result<usize> {
        Ok(self.entries.read().map_err(poisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> PipelineError {
    PipelineError::Storage(e.to_string())
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_put_get_remove() {
        let store = InMemoryStore::new();
        assert!(store.get("k").unwrap().is_none());
        store.put("k", "v1").unwrap();
        store.put("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(store.len().unwrap(), 1);
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_poisoned_lock_is_storage_error() {
        let store = Arc::new(InMemoryStore::new());
        store.put("k", "v").unwrap();

        let writer = Arc::clone(&store);
        let joined = std::thread::spawn(move || {
            let _guard = writer.entries.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(joined.is_err());

        assert!(matches!(store.len(), Err(PipelineError::Storage(_))));
        assert!(matches!(store.is_empty(), Err(PipelineError::Storage(_))));
        assert!(matches!(store.get("k"), Err(PipelineError::Storage(_))));
        assert!(matches!(store.put("k", "w"), Err(PipelineError::Storage(_))));
    }
}
