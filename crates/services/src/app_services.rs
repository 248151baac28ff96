use std::path::Path;
use std::sync::Arc;

use storage::{FileStore, KeyValueStore, NullStore};

use crate::Clock;
use crate::error::SessionError;
use crate::progress_store::ProgressStore;
use crate::quiz_selector::QuizSelector;
use crate::quiz_session::{AnswerOutcome, QuizSession};
use crate::source::QuestionSource;

/// Assembles the app-facing services for one session owner.
pub struct AppServices {
    clock: Clock,
    progress: Arc<ProgressStore>,
    quiz: QuizSelector,
}

impl AppServices {
    #[must_use]
    pub fn new(
        clock: Clock,
        substrate: Arc<dyn KeyValueStore>,
        questions: Arc<dyn QuestionSource>,
    ) -> Self {
        Self {
            clock,
            progress: Arc::new(ProgressStore::new(substrate)),
            quiz: QuizSelector::new(questions),
        }
    }

    /// Build services persisting into `data_dir`.
    ///
    /// If the directory cannot be opened, progress is kept in memory only.
    #[must_use]
    pub fn file_backed(
        clock: Clock,
        data_dir: &Path,
        quota_bytes: Option<u64>,
        questions: Arc<dyn QuestionSource>,
    ) -> Self {
        let substrate: Arc<dyn KeyValueStore> = match FileStore::open(data_dir) {
            Ok(store) => match quota_bytes {
                Some(bytes) => Arc::new(store.with_quota(bytes)),
                None => Arc::new(store),
            },
            Err(err) => {
                log::warn!("cannot open data dir {}: {err}", data_dir.display());
                Arc::new(NullStore)
            }
        };
        Self::new(clock, substrate, questions)
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressStore> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn quiz(&self) -> &QuizSelector {
        &self.quiz
    }

    pub fn quiz_mut(&mut self) -> &mut QuizSelector {
        &mut self.quiz
    }

    /// Load questions if needed and start a quiz.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if questions cannot be loaded or selected.
    pub async fn start_quiz(&mut self, count: usize) -> Result<QuizSession, SessionError> {
        self.quiz.load_questions().await?;
        QuizSession::start(&self.quiz, &self.progress, count)
    }

    /// Answer the current question of `session`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the session is complete or the question is unknown.
    pub fn answer(
        &self,
        session: &mut QuizSession,
        answer: &str,
    ) -> Result<AnswerOutcome, SessionError> {
        session.answer_current(&self.quiz, &self.progress, self.clock, answer)
    }
}
