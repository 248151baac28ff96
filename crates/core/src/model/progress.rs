use std::collections::HashSet;

use crate::model::quiz::QuizAttempt;

/// Read-only snapshot of a learner's progress.
///
/// `answered_terms` is a real set in memory; it only becomes a list at the
/// persistence boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProgress {
    pub quiz_attempts: Vec<QuizAttempt>,
    pub answered_terms: HashSet<String>,
    pub best_score: u32,
    pub visit_count: u32,
}

impl UserProgress {
    /// Number of completed quiz runs.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.quiz_attempts.len()
    }

    #[must_use]
    pub fn has_answered(&self, term: &str) -> bool {
        self.answered_terms.contains(term)
    }
}

/// Partial progress; `None` fields are left untouched on merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub quiz_attempts: Option<Vec<QuizAttempt>>,
    pub answered_terms: Option<HashSet<String>>,
    pub best_score: Option<u32>,
    pub visit_count: Option<u32>,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_quiz_attempts(mut self, attempts: Vec<QuizAttempt>) -> Self {
        self.quiz_attempts = Some(attempts);
        self
    }

    #[must_use]
    pub fn with_answered_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.answered_terms = Some(terms.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_best_score(mut self, score: u32) -> Self {
        self.best_score = Some(score);
        self
    }

    #[must_use]
    pub fn with_visit_count(mut self, count: u32) -> Self {
        self.visit_count = Some(count);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quiz_attempts.is_none()
            && self.answered_terms.is_none()
            && self.best_score.is_none()
            && self.visit_count.is_none()
    }
}
