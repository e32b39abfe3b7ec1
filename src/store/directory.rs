use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use super::Store;
use crate::errors::StoreError;

/// Stores each record as `<key>.json` inside a directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    base_path: PathBuf,
}

impl DirectoryStore {
    /// Creates a new `DirectoryStore`. The directory is created on the
    /// first save if it doesn't exist yet.
    pub fn new(base_path: PathBuf) -> Self {
        debug!(?base_path, "Creating DirectoryStore");
        DirectoryStore { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_path.join(key).with_extension("json")
    }
}

impl Store for DirectoryStore {
    #[instrument(level = "trace", skip(self, value), fields(base_path = ?self.base_path))]
    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if !self.base_path.exists() {
            debug!(base_path = ?self.base_path, "Creating directory for stored records");
            fs::create_dir_all(&self.base_path)?;
        }

        // Write the whole record to a sibling file then swap it in, so a
        // crash mid-write leaves the previous record readable.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;

        debug!(?path, bytes = value.len(), "Record written");
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }
}
