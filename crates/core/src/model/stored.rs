use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

use crate::model::preferences::{Preferences, PreferencesUpdate};
use crate::model::progress::{ProgressUpdate, UserProgress};
use crate::model::quiz::{QuizAttempt, QuizAttemptError};

/// Current schema version written into every persisted record.
pub const SCHEMA_VERSION: &str = "1.0.0";

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Reasons a persisted progress record cannot be trusted.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoredDataError {
    #[error("stored progress is not valid JSON: {0}")]
    Syntax(#[source] serde_json::Error),
    #[error("stored progress is not a JSON object")]
    NotAnObject,
    #[error("stored progress has an invalid shape: {0}")]
    Shape(#[source] serde_json::Error),
    #[error("quiz history entry {index} is invalid: {source}")]
    InvalidAttempt {
        index: usize,
        #[source]
        source: QuizAttemptError,
    },
    #[error("failed to encode progress: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Outcome of decoding a persisted record against the current schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStatus {
    Current,
    /// The record carried another (or no) version and was upgraded in memory.
    Migrated { from: Option<String> },
}

//
// ─── RECORD ───────────────────────────────────────────────────────────────────
//

/// Lenient wire shape: every field may be missing, none may have the wrong type.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStoredUserData {
    version: Option<String>,
    visit_count: Option<u32>,
    quiz_history: Option<Vec<QuizAttempt>>,
    answered_terms: Option<Vec<String>>,
    best_score: Option<u32>,
    preferences: Option<Preferences>,
}

/// Versioned, persisted representation of a learner's progress.
///
/// `best_score` is stored alongside the history so that trimming old
/// attempts never lowers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUserData {
    pub version: String,
    pub visit_count: u32,
    pub quiz_history: Vec<QuizAttempt>,
    pub answered_terms: Vec<String>,
    pub best_score: u32,
    pub preferences: Preferences,
}

impl Default for StoredUserData {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            visit_count: 0,
            quiz_history: Vec::new(),
            answered_terms: Vec::new(),
            best_score: 0,
            preferences: Preferences::default(),
        }
    }
}

impl StoredUserData {
    /// Parse and validate a persisted record, upgrading older shapes.
    ///
    /// Missing fields are filled with defaults (`best_score` and
    /// `answered_terms` are rebuilt from the history); existing history is
    /// kept as-is.
    ///
    /// # Errors
    ///
    /// Returns `StoredDataError` for malformed JSON, a non-object root,
    /// wrongly typed fields, or an invalid history entry.
    pub fn decode(raw: &str) -> Result<(Self, MigrationStatus), StoredDataError> {
        let value: Value = serde_json::from_str(raw).map_err(StoredDataError::Syntax)?;
        if !value.is_object() {
            return Err(StoredDataError::NotAnObject);
        }
        let raw: RawStoredUserData =
            serde_json::from_value(value).map_err(StoredDataError::Shape)?;

        let quiz_history = raw.quiz_history.unwrap_or_default();
        for (index, attempt) in quiz_history.iter().enumerate() {
            attempt
                .validate()
                .map_err(|source| StoredDataError::InvalidAttempt { index, source })?;
        }

        let status = match raw.version.as_deref() {
            Some(SCHEMA_VERSION) => MigrationStatus::Current,
            other => MigrationStatus::Migrated {
                from: other.map(str::to_owned),
            },
        };

        let answered_terms = match raw.answered_terms {
            Some(terms) => dedup_preserving_order(terms),
            None => dedup_preserving_order(
                quiz_history
                    .iter()
                    .flat_map(|a| a.questions_answered.iter().cloned())
                    .collect(),
            ),
        };
        let best_score = raw
            .best_score
            .unwrap_or_else(|| max_score(&quiz_history));

        let data = Self {
            version: SCHEMA_VERSION.to_string(),
            visit_count: raw.visit_count.unwrap_or(0),
            quiz_history,
            answered_terms,
            best_score,
            preferences: raw.preferences.unwrap_or_default(),
        };
        Ok((data, status))
    }

    /// Serialize for the storage substrate.
    ///
    /// # Errors
    ///
    /// Returns `StoredDataError::Encode` if serialization fails.
    pub fn encode(&self) -> Result<String, StoredDataError> {
        serde_json::to_string(self).map_err(StoredDataError::Encode)
    }

    #[must_use]
    pub fn to_progress(&self) -> UserProgress {
        UserProgress {
            quiz_attempts: self.quiz_history.clone(),
            answered_terms: self.answered_terms.iter().cloned().collect(),
            best_score: self.best_score,
            visit_count: self.visit_count,
        }
    }

    /// Merge the provided fields, leaving the rest untouched.
    pub fn apply(&mut self, update: ProgressUpdate) {
        if let Some(attempts) = update.quiz_attempts {
            self.quiz_history = attempts;
        }
        if let Some(terms) = update.answered_terms {
            let mut terms: Vec<String> = terms.into_iter().collect();
            terms.sort();
            self.answered_terms = terms;
        }
        if let Some(best) = update.best_score {
            self.best_score = best;
        }
        if let Some(count) = update.visit_count {
            self.visit_count = count;
        }
    }

    pub fn apply_preferences(&mut self, update: PreferencesUpdate) {
        self.preferences.apply(update);
    }

    /// Append a (validated) attempt and fold it into best score and terms.
    pub fn record_attempt(&mut self, attempt: QuizAttempt) {
        self.best_score = self.best_score.max(attempt.score);
        let mut known: HashSet<&str> = self.answered_terms.iter().map(String::as_str).collect();
        let fresh: Vec<String> = attempt
            .questions_answered
            .iter()
            .filter(|term| known.insert(term.as_str()))
            .cloned()
            .collect();
        self.answered_terms.extend(fresh);
        self.quiz_history.push(attempt);
    }

    /// Drop all but the `keep` most recent attempts. Returns how many were dropped.
    pub fn trim_history(&mut self, keep: usize) -> usize {
        let excess = self.quiz_history.len().saturating_sub(keep);
        self.quiz_history.drain(..excess);
        excess
    }
}

fn max_score(history: &[QuizAttempt]) -> u32 {
    history.iter().map(|a| a.score).max().unwrap_or(0)
}

fn dedup_preserving_order(terms: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(terms.len());
    terms
        .into_iter()
        .filter(|term| seen.insert(term.clone()))
        .collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
