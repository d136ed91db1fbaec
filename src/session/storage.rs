//! Durable Credential Slots
//!
//! Client-side storage holding the two named session slots. The file
//! backend keeps one file per slot; the memory backend is shared between
//! clones so a fresh `SessionStore` over a clone behaves like a reload.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Slot holding the bearer token
pub const TOKEN_SLOT: &str = "token";

/// Slot holding the serialized user profile
pub const USER_SLOT: &str = "user";

/// Errors raised by a slot backend
#[derive(Error, Debug)]
pub enum SessionStorageError {
    #[error("failed to access slot '{slot}': {source}")]
    Io {
        slot: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode profile: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Named string slots that survive a restart
pub trait SlotStorage: Send + Sync {
    fn read(&self, slot: &str) -> Result<Option<String>, SessionStorageError>;

    fn write(&self, slot: &str, value: &str) -> Result<(), SessionStorageError>;

    /// Removing a missing slot is not an error
    fn remove(&self, slot: &str) -> Result<(), SessionStorageError>;
}

/// Slots stored as files inside a directory
#[derive(Debug, Clone)]
pub struct FileSlotStorage {
    dir: PathBuf,
}

impl FileSlotStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, slot: &str) -> PathBuf {
        self.dir.join(slot)
    }
}

fn io_err(slot: &str) -> impl FnOnce(io::Error) -> SessionStorageError + '_ {
    move |source| SessionStorageError::Io {
        slot: slot.to_string(),
        source,
    }
}

impl SlotStorage for FileSlotStorage {
    fn read(&self, slot: &str) -> Result<Option<String>, SessionStorageError> {
        match std::fs::read_to_string(self.slot_path(slot)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(slot)(e)),
        }
    }

    fn write(&self, slot: &str, value: &str) -> Result<(), SessionStorageError> {
        std::fs::create_dir_all(&self.dir).map_err(io_err(slot))?;

        // Write-then-rename so a reader never sees a half-written slot
        let tmp = self.dir.join(format!(".{}.tmp", slot));
        std::fs::write(&tmp, value).map_err(io_err(slot))?;
        std::fs::rename(&tmp, self.slot_path(slot)).map_err(io_err(slot))
    }

    fn remove(&self, slot: &str) -> Result<(), SessionStorageError> {
        match std::fs::remove_file(self.slot_path(slot)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(slot)(e)),
        }
    }
}

/// In-memory slots for tests and throwaway runs
#[derive(Debug, Clone, Default)]
pub struct MemorySlotStorage {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySlotStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

impl SlotStorage for MemorySlotStorage {
    fn read(&self, slot: &str) -> Result<Option<String>, SessionStorageError> {
        Ok(self.slots.lock().get(slot).cloned())
    }

    fn write(&self, slot: &str, value: &str) -> Result<(), SessionStorageError> {
        self.slots.lock().insert(slot.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<(), SessionStorageError> {
        self.slots.lock().remove(slot);
        Ok(())
    }
}
