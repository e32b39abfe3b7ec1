use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::Store;
use crate::errors::StoreError;

/// Keeps records in memory. Clones share the same records, so one clone can
/// be handed to the engine while another is inspected.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<String, String>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    /// How many saves have happened, successful or not.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Store for MemoryStore {
    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        *self.saves.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get(key))
    }
}
