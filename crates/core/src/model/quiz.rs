use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Reasons a quiz question record is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizQuestionError {
    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),
    #[error("question needs at least 2 options, got {0}")]
    TooFewOptions(usize),
    #[error("duplicate option: {0}")]
    DuplicateOption(String),
    #[error("correct answer {0:?} is not one of the options")]
    AnswerNotInOptions(String),
}

/// Reasons a caller-supplied quiz attempt is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizAttemptError {
    #[error("attempt timestamp must be positive, got {0}")]
    InvalidTimestamp(i64),
    #[error("attempt must cover at least one question")]
    NoQuestions,
}

//
// ─── QUIZ QUESTION ────────────────────────────────────────────────────────────
//

/// Raw wire shape of a quiz question before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizQuestionRecord {
    id: QuestionId,
    term: String,
    question: String,
    options: Vec<String>,
    correct_answer: String,
    glossary_link: String,
}

/// A multiple-choice question about one glossary term.
///
/// Construction (and deserialization) guarantees at least two distinct
/// options and that `correct_answer` is one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuizQuestionRecord", rename_all = "camelCase")]
pub struct QuizQuestion {
    id: QuestionId,
    term: String,
    question: String,
    options: Vec<String>,
    correct_answer: String,
    glossary_link: String,
}

impl QuizQuestion {
    /// Builds a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuizQuestionError` if a required field is blank, fewer than two
    /// options are given, options repeat, or the answer is not an option.
    pub fn new(
        id: QuestionId,
        term: impl Into<String>,
        question: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
        glossary_link: impl Into<String>,
    ) -> Result<Self, QuizQuestionError> {
        let term = term.into();
        let question = question.into();
        let correct_answer = correct_answer.into();

        if id.is_blank() {
            return Err(QuizQuestionError::EmptyField("id"));
        }
        if term.trim().is_empty() {
            return Err(QuizQuestionError::EmptyField("term"));
        }
        if question.trim().is_empty() {
            return Err(QuizQuestionError::EmptyField("question"));
        }
        if options.len() < 2 {
            return Err(QuizQuestionError::TooFewOptions(options.len()));
        }
        let mut seen = HashSet::with_capacity(options.len());
        for option in &options {
            if !seen.insert(option.as_str()) {
                return Err(QuizQuestionError::DuplicateOption(option.clone()));
            }
        }
        if !seen.contains(correct_answer.as_str()) {
            return Err(QuizQuestionError::AnswerNotInOptions(correct_answer));
        }

        Ok(Self {
            id,
            term,
            question,
            options,
            correct_answer,
            glossary_link: glossary_link.into(),
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn glossary_link(&self) -> &str {
        &self.glossary_link
    }

    /// Exact string comparison against the correct answer.
    #[must_use]
    pub fn is_correct(&self, answer: &str) -> bool {
        self.correct_answer == answer
    }
}

impl TryFrom<QuizQuestionRecord> for QuizQuestion {
    type Error = QuizQuestionError;

    fn try_from(record: QuizQuestionRecord) -> Result<Self, Self::Error> {
        QuizQuestion::new(
            record.id,
            record.term,
            record.question,
            record.options,
            record.correct_answer,
            record.glossary_link,
        )
    }
}

//
// ─── QUIZ ATTEMPT ─────────────────────────────────────────────────────────────
//

/// One completed quiz run. Appended to history, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAttempt {
    /// Completion time in epoch milliseconds.
    pub timestamp: i64,
    pub score: u32,
    pub total_questions: u32,
    /// Terms covered by the run, in the order they were asked.
    pub questions_answered: Vec<String>,
}

impl QuizAttempt {
    #[must_use]
    pub fn new(
        timestamp: i64,
        score: u32,
        total_questions: u32,
        questions_answered: Vec<String>,
    ) -> Self {
        Self {
            timestamp,
            score,
            total_questions,
            questions_answered,
        }
    }

    /// Checks the attempt before it may enter the history.
    ///
    /// # Errors
    ///
    /// Returns `QuizAttemptError` for a non-positive timestamp or zero questions.
    pub fn validate(&self) -> Result<(), QuizAttemptError> {
        if self.timestamp <= 0 {
            return Err(QuizAttemptError::InvalidTimestamp(self.timestamp));
        }
        if self.total_questions == 0 {
            return Err(QuizAttemptError::NoQuestions);
        }
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
