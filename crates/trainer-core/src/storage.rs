//! Key/value storage area shared by every tab of one origin.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
pub enum StorageError {
    Unavailable(String),
    QuotaExceeded { requested: usize, quota: usize },
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl StorageError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "storage unavailable: {reason}"),
            Self::QuotaExceeded { requested, quota } => {
                write!(f, "storage quota exceeded: requested={requested} quota={quota}")
            }
            Self::Backend(err) => write!(f, "storage backend error: {err}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Backend(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// String-keyed storage with whole-value reads and writes. Each call is atomic
/// on its own; nothing composes calls into a transaction.
pub trait StorageArea: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: StorageArea + ?Sized> StorageArea for Arc<S> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }
}

/// In-process storage area. Quota and availability can be dialled in to
/// exercise the failure paths.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
    unavailable: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the summed length of all keys and values.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn items(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("storage disabled".to_string()));
        }
        self.items
            .lock()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned".to_string()))
    }
}

impl StorageArea for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items()?;

        if let Some(quota) = self.quota_bytes {
            let others: usize = items
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let requested = others + key.len() + value.len();
            if requested > quota {
                return Err(StorageError::QuotaExceeded { requested, quota });
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let storage = MemoryStorage::new();
        storage.set_item("k", "v").expect("set");
        assert_eq!(storage.get_item("k").expect("get").as_deref(), Some("v"));
        storage.remove_item("k").expect("remove");
        assert_eq!(storage.get_item("k").expect("get"), None);
    }

    #[test]
    fn quota_counts_replaced_value_once() {
        let storage = MemoryStorage::with_quota(6);
        storage.set_item("k", "abcde").expect("fits exactly");
        storage.set_item("k", "vwxyz").expect("overwrite still fits");
        let err = storage.set_item("k", "abcdef").expect_err("one byte over");
        assert!(matches!(err, StorageError::QuotaExceeded { requested: 7, quota: 6 }));
        assert_eq!(storage.get_item("k").expect("get").as_deref(), Some("vwxyz"));
    }

    #[test]
    fn disabled_storage_rejects_every_call() {
        let storage = MemoryStorage::new();
        storage.set_available(false);
        assert!(storage.get_item("k").is_err());
        assert!(storage.set_item("k", "v").is_err());
        assert!(storage.remove_item("k").is_err());
        storage.set_available(true);
        assert!(storage.get_item("k").is_ok());
    }
}
