use glossary_core::Clock;
use glossary_core::model::{QuizAttempt, QuizQuestion};

use crate::error::SessionError;
use crate::progress_store::ProgressStore;
use crate::quiz_selector::QuizSelector;

/// Result of answering a single question in a quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub correct_answer: String,
    pub is_complete: bool,
    /// The attempt recorded to progress, once the last question is answered.
    pub attempt: Option<QuizAttempt>,
}

/// One quiz run: a fixed list of questions answered in order.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<QuizQuestion>,
    position: usize,
    score: u32,
    answered_terms: Vec<String>,
}

impl QuizSession {
    /// Start a quiz of up to `count` questions, skipping terms already answered.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Quiz` if the selector is not loaded, or
    /// `SessionError::Empty` if nothing could be selected.
    pub fn start(
        selector: &QuizSelector,
        progress: &ProgressStore,
        count: usize,
    ) -> Result<Self, SessionError> {
        let answered = progress.get_progress().answered_terms;
        let questions = selector.select_random_questions(count, &answered)?;
        Self::from_questions(questions)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Empty` for an empty question list.
    pub fn from_questions(questions: Vec<QuizQuestion>) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }
        Ok(Self {
            answered_terms: Vec::with_capacity(questions.len()),
            questions,
            position: 0,
            score: 0,
        })
    }

    #[must_use]
    pub fn current(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.position)
    }

    #[must_use]
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    /// Zero-based index of the current question.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.position >= self.questions.len()
    }

    /// Check `answer` for the current question and advance.
    ///
    /// Answering the last question records the attempt to `progress`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once every question is answered, or
    /// `SessionError::Quiz` if the selector no longer knows the question.
    pub fn answer_current(
        &mut self,
        selector: &QuizSelector,
        progress: &ProgressStore,
        clock: Clock,
        answer: &str,
    ) -> Result<AnswerOutcome, SessionError> {
        let question = self.current().ok_or(SessionError::Completed)?;
        let correct = selector.validate_answer(question.id().as_str(), answer)?;
        let correct_answer = question.correct_answer().to_string();
        let term = question.term().to_string();

        if correct {
            self.score += 1;
        }
        self.answered_terms.push(term);
        self.position += 1;

        let attempt = if self.is_complete() {
            let attempt = QuizAttempt::new(
                clock.now_millis(),
                self.score,
                u32::try_from(self.questions.len()).unwrap_or(u32::MAX),
                self.answered_terms.clone(),
            );
            progress.record_quiz_attempt(attempt.clone());
            Some(attempt)
        } else {
            None
        };

        Ok(AnswerOutcome {
            correct,
            correct_answer,
            is_complete: attempt.is_some(),
            attempt,
        })
    }
}
