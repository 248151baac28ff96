use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use glossary_core::model::{
    MigrationStatus, Preferences, PreferencesUpdate, ProgressUpdate, QuizAttempt, StoredUserData,
    UserProgress,
};
use storage::{KeyValueStore, StoreError};

/// Storage key holding the JSON-encoded progress record.
pub const PROGRESS_KEY: &str = "ai-glossary-user-data";
/// Attempts kept when a write is retried after hitting the quota.
pub const DEFAULT_QUOTA_RETENTION: usize = 20;

const PROBE_KEY: &str = "__glossary_storage_probe__";
const PROBE_VALUE: &str = "probe";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressStoreConfig {
    pub key: String,
    pub quota_retention: usize,
}

impl Default for ProgressStoreConfig {
    fn default() -> Self {
        Self {
            key: PROGRESS_KEY.to_string(),
            quota_retention: DEFAULT_QUOTA_RETENTION,
        }
    }
}

/// Whether the substrate passed the construction-time probe. Never re-probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Available,
    Unavailable,
}

#[derive(Debug, Default)]
struct Fallback {
    data: StoredUserData,
    /// Set when the substrate missed the latest change; reads then prefer `data`.
    diverged: bool,
}

/// Versioned progress persistence over an unreliable key-value substrate.
///
/// No method returns an error: storage faults are logged and absorbed, and
/// the latest state is kept in an in-memory fallback so the app keeps
/// working with degraded persistence.
pub struct ProgressStore {
    substrate: Arc<dyn KeyValueStore>,
    config: ProgressStoreConfig,
    mode: StorageMode,
    fallback: Mutex<Fallback>,
}

impl ProgressStore {
    /// Probe the substrate and migrate any existing record.
    #[must_use]
    pub fn new(substrate: Arc<dyn KeyValueStore>) -> Self {
        Self::with_config(substrate, ProgressStoreConfig::default())
    }

    #[must_use]
    pub fn with_config(substrate: Arc<dyn KeyValueStore>, config: ProgressStoreConfig) -> Self {
        let mode = probe(substrate.as_ref());
        if mode == StorageMode::Unavailable {
            log::warn!("persistent storage unavailable; progress will only be kept in memory");
        }

        let store = Self {
            substrate,
            config,
            mode,
            fallback: Mutex::new(Fallback::default()),
        };
        if store.mode == StorageMode::Available {
            store.migrate();
        }
        store
    }

    #[must_use]
    pub fn storage_mode(&self) -> StorageMode {
        self.mode
    }

    #[must_use]
    pub fn is_local_storage_available(&self) -> bool {
        self.mode == StorageMode::Available
    }

    /// Fresh snapshot of the current progress. Corrupt data yields defaults.
    #[must_use]
    pub fn get_progress(&self) -> UserProgress {
        let fallback = self.fallback();
        self.load(&fallback).to_progress()
    }

    /// Merge `update` into the stored record and persist it.
    ///
    /// An update carrying any invalid attempt is logged and dropped whole.
    pub fn update_progress(&self, update: ProgressUpdate) {
        if let Some(attempts) = &update.quiz_attempts {
            for (index, attempt) in attempts.iter().enumerate() {
                if let Err(err) = attempt.validate() {
                    log::error!("rejecting progress update, attempt {index} is invalid: {err}");
                    return;
                }
            }
        }
        self.with_record(|data| data.apply(update));
    }

    /// Bump the visit counter and return the new value. Call once per session start.
    pub fn increment_visit_count(&self) -> u32 {
        self.with_record(|data| {
            data.visit_count = data.visit_count.saturating_add(1);
            data.visit_count
        })
    }

    /// Append a completed quiz run. Invalid attempts are logged and dropped.
    pub fn record_quiz_attempt(&self, attempt: QuizAttempt) {
        if let Err(err) = attempt.validate() {
            log::error!("rejecting quiz attempt: {err}");
            return;
        }
        self.with_record(|data| data.record_attempt(attempt));
    }

    #[must_use]
    pub fn get_preferences(&self) -> Preferences {
        let fallback = self.fallback();
        self.load(&fallback).preferences
    }

    pub fn update_preferences(&self, update: PreferencesUpdate) {
        self.with_record(|data| data.apply_preferences(update));
    }

    /// Remove the persisted record entirely and reset the fallback. Idempotent.
    pub fn clear_all_data(&self) {
        let mut fallback = self.fallback();
        let diverged = match self.mode {
            StorageMode::Unavailable => true,
            StorageMode::Available => match self.substrate.remove(&self.config.key) {
                Ok(()) => false,
                Err(err) => {
                    // The substrate still holds the old record; reads must ignore it.
                    log::error!("failed to remove stored progress: {err}");
                    true
                }
            },
        };
        fallback.data = StoredUserData::default();
        fallback.diverged = diverged;
    }

    fn fallback(&self) -> MutexGuard<'_, Fallback> {
        self.fallback.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load, mutate and persist under a single lock so concurrent callers
    /// never interleave between read and write.
    fn with_record<T>(&self, mutate: impl FnOnce(&mut StoredUserData) -> T) -> T {
        let mut fallback = self.fallback();
        let mut data = self.load(&fallback);
        let out = mutate(&mut data);
        self.persist(&mut fallback, data);
        out
    }

    fn migrate(&self) {
        let raw = match self.substrate.get(&self.config.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(err) => {
                log::warn!("failed to read stored progress for migration: {err}");
                return;
            }
        };

        let mut fallback = self.fallback();
        match StoredUserData::decode(&raw) {
            Ok((data, MigrationStatus::Migrated { from })) => {
                log::info!(
                    "migrating stored progress from version {} to {}",
                    from.as_deref().unwrap_or("<none>"),
                    data.version
                );
                // Never trimmed; a failed migration write stays in memory.
                let diverged = match self.write(&data) {
                    Ok(()) => false,
                    Err(err) => {
                        log::error!(
                            "failed to persist migrated progress, keeping it in memory: {err}"
                        );
                        true
                    }
                };
                fallback.data = data;
                fallback.diverged = diverged;
            }
            Ok((data, MigrationStatus::Current)) => fallback.data = data,
            Err(err) => log::warn!("discarding corrupted stored progress: {err}"),
        }
    }

    fn load(&self, fallback: &Fallback) -> StoredUserData {
        if self.mode == StorageMode::Unavailable || fallback.diverged {
            return fallback.data.clone();
        }

        match self.substrate.get(&self.config.key) {
            Ok(None) => StoredUserData::default(),
            Ok(Some(raw)) => match StoredUserData::decode(&raw) {
                Ok((data, _)) => data,
                Err(err) => {
                    log::warn!("discarding corrupted stored progress: {err}");
                    StoredUserData::default()
                }
            },
            Err(err) => {
                log::warn!("failed to read stored progress, using in-memory copy: {err}");
                fallback.data.clone()
            }
        }
    }

    fn persist(&self, fallback: &mut Fallback, data: StoredUserData) {
        if self.mode == StorageMode::Unavailable {
            fallback.data = data;
            fallback.diverged = true;
            return;
        }

        let (stored, diverged) = match self.write(&data) {
            Ok(()) => (data, false),
            Err(StoreError::QuotaExceeded) => self.retry_trimmed(data),
            Err(err) => {
                log::error!("failed to persist progress, keeping it in memory: {err}");
                (data, true)
            }
        };
        fallback.data = stored;
        fallback.diverged = diverged;
    }

    /// One recovery write with only the most recent attempts kept.
    fn retry_trimmed(&self, data: StoredUserData) -> (StoredUserData, bool) {
        let mut trimmed = data.clone();
        let dropped = trimmed.trim_history(self.config.quota_retention);
        log::warn!(
            "storage quota exceeded; retrying with {dropped} oldest quiz attempts dropped"
        );
        match self.write(&trimmed) {
            Ok(()) => (trimmed, false),
            Err(err) => {
                log::error!("retry after trimming failed, keeping progress in memory: {err}");
                (data, true)
            }
        }
    }

    fn write(&self, data: &StoredUserData) -> Result<(), StoreError> {
        let encoded = data
            .encode()
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        self.substrate.set(&self.config.key, &encoded)
    }
}

fn probe(substrate: &dyn KeyValueStore) -> StorageMode {
    let roundtrip = substrate
        .set(PROBE_KEY, PROBE_VALUE)
        .and_then(|()| substrate.get(PROBE_KEY))
        .and_then(|value| {
            substrate.remove(PROBE_KEY)?;
            Ok(value)
        });
    match roundtrip {
        Ok(Some(value)) if value == PROBE_VALUE => StorageMode::Available,
        Ok(_) => {
            log::debug!("storage probe read back an unexpected value");
            StorageMode::Unavailable
        }
        Err(err) => {
            log::debug!("storage probe failed: {err}");
            StorageMode::Unavailable
        }
    }
}
