use tracing::warn;

use super::Store;
use crate::errors::StoreError;

/// A store that fails every call.
///
/// Useful for checking that the engine keeps working when persistence is
/// unavailable.
pub struct FailingStore;

impl Store for FailingStore {
    fn save(&mut self, key: &str, _value: &str) -> Result<(), StoreError> {
        warn!(key, "FailingStore intentionally returning error");
        Err(StoreError::Io(std::io::Error::other("store unavailable")))
    }

    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        warn!(key, "FailingStore intentionally returning error");
        Err(StoreError::Io(std::io::Error::other("store unavailable")))
    }
}
