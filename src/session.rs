// Session Persistence
// A single durable slot bridging booking capture and checkout across a navigation boundary.

use crate::booking::PendingBooking;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

// Minimal key-value contract of a browser-style local storage
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    // Replaces any existing value for the key
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    // Removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// Process-lifetime storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: DashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

// One file per key under a directory. Survives process restarts.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "file storage opened");

        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // Write-then-rename: readers see the whole new value or the previous one
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let tmp_path = self
            .dir
            .join(format!(".{}.{:08x}.tmp", key, rand::random::<u32>()));

        let _guard = self.write_lock.lock();
        let written = fs::File::create(&tmp_path).and_then(|mut file| {
            file.write_all(value.as_bytes())?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|_| fs::rename(&tmp_path, &path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let _guard = self.write_lock.lock();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// Holds at most one pending booking. Injected into both capture and checkout.
pub trait PendingBookingSlot: Send + Sync + 'static {
    // Overwrites unconditionally
    fn put(&self, booking: &PendingBooking) -> Result<(), StorageError>;

    fn get(&self) -> Option<PendingBooking>;

    fn clear(&self) -> Result<(), StorageError>;
}

// Slot stored as JSON under one well-known key
pub struct StorageSlot<S: KeyValueStore> {
    store: Arc<S>,
    key: String,
}

impl<S: KeyValueStore> StorageSlot<S> {
    pub fn new(store: Arc<S>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

impl StorageSlot<MemoryStorage> {
    pub fn in_memory(key: impl Into<String>) -> Self {
        Self::new(Arc::new(MemoryStorage::new()), key)
    }
}

impl<S: KeyValueStore> PendingBookingSlot for StorageSlot<S> {
    fn put(&self, booking: &PendingBooking) -> Result<(), StorageError> {
        let json = serde_json::to_string(booking)?;
        self.store.set(&self.key, &json)?;
        tracing::debug!(key = %self.key, tour_id = %booking.tour_id, "pending booking stored");
        Ok(())
    }

    fn get(&self) -> Option<PendingBooking> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "pending booking unreadable");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(booking) => Some(booking),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "pending booking is corrupt, ignoring");
                None
            }
        }
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(&self.key)?;
        tracing::debug!(key = %self.key, "pending booking cleared");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::PackageType;
    use crate::config::DEFAULT_STORAGE_KEY;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn pending(full_name: &str, persons: u32) -> PendingBooking {
        PendingBooking {
            full_name: full_name.to_string(),
            email: "guest@example.com".to_string(),
            phone: "0300-1234567".to_string(),
            tour_id: "kumrat-3d".to_string(),
            travel_date: NaiveDate::from_ymd_opt(2025, 8, 14).unwrap(),
            persons,
            package_type: PackageType::Standard,
            message: None,
            tour_name: "3 Days Kumrat Tour".to_string(),
            total_price: 18000 * persons as u64,
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_slot_holds_only_the_latest_booking() {
        let slot = StorageSlot::in_memory(DEFAULT_STORAGE_KEY);
        assert!(slot.get().is_none());

        slot.put(&pending("Sara Ahmed", 2)).unwrap();
        slot.put(&pending("Bilal Raza", 4)).unwrap();

        let stored = slot.get().unwrap();
        assert_eq!(stored.full_name, "Bilal Raza");
        assert_eq!(stored.total_price, 72000);
        assert_eq!(slot.store().len(), 1);
    }

    #[test]
    fn test_clear_empties_the_slot_and_is_idempotent() {
        let slot = StorageSlot::in_memory(DEFAULT_STORAGE_KEY);
        slot.put(&pending("Sara Ahmed", 1)).unwrap();

        slot.clear().unwrap();
        assert!(slot.get().is_none());

        assert!(slot.clear().is_ok());
    }

    #[test]
    fn test_corrupt_value_reads_as_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(DEFAULT_STORAGE_KEY, "{\"fullName\": ").unwrap();

        let slot = StorageSlot::new(storage, DEFAULT_STORAGE_KEY);

        assert!(slot.get().is_none());
    }

    #[test]
    fn test_stored_json_uses_camel_case_keys() {
        let storage = Arc::new(MemoryStorage::new());
        let slot = StorageSlot::new(Arc::clone(&storage), DEFAULT_STORAGE_KEY);
        slot.put(&pending("Sara Ahmed", 2)).unwrap();

        let raw = storage.get(DEFAULT_STORAGE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert_eq!(value["fullName"], "Sara Ahmed");
        assert_eq!(value["tourName"], "3 Days Kumrat Tour");
        assert_eq!(value["totalPrice"], 36000);
        assert_eq!(value["travelDate"], "2025-08-14");
        assert_eq!(value["packageType"], "Standard");
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        {
            let slot = StorageSlot::new(
                Arc::new(FileStorage::open(dir.path()).unwrap()),
                DEFAULT_STORAGE_KEY,
            );
            slot.put(&pending("Sara Ahmed", 3)).unwrap();
        }

        let reopened = StorageSlot::new(
            Arc::new(FileStorage::open(dir.path()).unwrap()),
            DEFAULT_STORAGE_KEY,
        );
        let stored = reopened.get().unwrap();
        assert_eq!(stored, pending("Sara Ahmed", 3));

        reopened.clear().unwrap();
        assert!(reopened.get().is_none());
    }

    #[test]
    fn test_file_storage_overwrite_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        storage.set("lastBooking", "first").unwrap();
        storage.set("lastBooking", "second").unwrap();

        assert_eq!(storage.get("lastBooking").unwrap().as_deref(), Some("second"));
        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_file_storage_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        assert!(matches!(
            storage.set("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(storage.get(""), Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn test_file_storage_remove_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        assert!(storage.remove("lastBooking").is_ok());
        assert_eq!(storage.get("lastBooking").unwrap(), None);
    }
}
