use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage substrates.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StoreError {
    #[must_use]
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded)
    }
}

/// Minimal key-value capability the progress store persists through.
///
/// Every call may fail; callers decide how to degrade.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the substrate cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::QuotaExceeded` when the value does not fit, or
    /// other errors if the substrate rejects the write.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the substrate rejects the removal.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Injected failure behaviour for `InMemoryStore`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureMode {
    #[default]
    None,
    Quota,
    Unavailable,
}

impl FailureMode {
    fn check(self) -> Result<(), StoreError> {
        match self {
            FailureMode::None => Ok(()),
            FailureMode::Quota => Err(StoreError::QuotaExceeded),
            FailureMode::Unavailable => Err(StoreError::Unavailable("injected failure".into())),
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    reads: FailureMode,
    writes: FailureMode,
}

/// In-memory substrate for tests and prototyping.
///
/// Clones share the same entries, so a test can keep a handle after passing
/// one to the code under test. Usage is accounted as key length plus value
/// length in bytes.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    faults: Arc<Mutex<Faults>>,
    quota_bytes: Option<usize>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes that would grow total usage past `bytes`.
    #[must_use]
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }

    /// Make every subsequent `set`/`remove` fail with the given mode.
    pub fn fail_writes(&self, mode: FailureMode) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.writes = mode;
        }
    }

    /// Make every subsequent `get` fail with the given mode.
    pub fn fail_reads(&self, mode: FailureMode) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.reads = mode;
        }
    }

    /// Bytes currently in use.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.entries
            .lock()
            .map(|guard| guard.iter().map(|(k, v)| k.len() + v.len()).sum())
            .unwrap_or(0)
    }

    fn read_faults(&self) -> Result<(FailureMode, FailureMode), StoreError> {
        let guard = self
            .faults
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok((guard.reads, guard.writes))
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let (reads, _) = self.read_faults()?;
        reads.check()?;
        let guard = self
            .entries
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let (_, writes) = self.read_faults()?;
        writes.check()?;
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        if let Some(quota) = self.quota_bytes {
            let others: usize = guard
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if others + key.len() + value.len() > quota {
                return Err(StoreError::QuotaExceeded);
            }
        }
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let (_, writes) = self.read_faults()?;
        if writes == FailureMode::Unavailable {
            writes.check()?;
        }
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Substrate that is never available, for environments without storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl KeyValueStore for NullStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("no storage backend".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("no storage backend".into()))
    }

    fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("no storage backend".into()))
    }
}
