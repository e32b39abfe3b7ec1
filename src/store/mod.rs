//! # Persistence port
//!
//! The engine persists four records under fixed string keys and doesn't
//! care where they end up. A [`Store`] only moves opaque strings; the typed
//! JSON encoding lives here in [`save_json`] and [`load_json`] so every
//! backend stores the same format.
mod directory;
mod failing;
mod memory;

pub use directory::DirectoryStore;
pub use failing::FailingStore;
pub use memory::MemoryStore;

use std::fmt;

use serde::{Serialize, de::DeserializeOwned};

use crate::errors::StoreError;

/// A key-value store over opaque string keys.
pub trait Store: Send {
    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// `Ok(None)` when nothing was ever saved under `key`.
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// The records the engine keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Users and access requests
    Auth,
    /// Players, buy-ins and the buy-in unit
    Ledger,
    /// Session status plus the last accepted settlement
    Session,
    /// Archived sessions
    History,
}

impl StoreKey {
    pub const ALL: [StoreKey; 4] = [
        StoreKey::Auth,
        StoreKey::Ledger,
        StoreKey::Session,
        StoreKey::History,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::Auth => "poker_auth",
            StoreKey::Ledger => "poker_ledger",
            StoreKey::Session => "poker_session",
            StoreKey::History => "poker_history",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn save_json<T: Serialize + ?Sized>(
    store: &mut dyn Store,
    key: StoreKey,
    value: &T,
) -> Result<(), StoreError> {
    let encoded = serde_json::to_string(value)?;
    store.save(key.as_str(), &encoded)
}

pub fn load_json<T: DeserializeOwned>(
    store: &dyn Store,
    key: StoreKey,
) -> Result<Option<T>, StoreError> {
    match store.load(key.as_str())? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}
