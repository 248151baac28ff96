#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod progress_store;
pub mod quiz_selector;
pub mod quiz_session;
pub mod source;

pub use glossary_core::Clock;

pub use app_services::AppServices;
pub use error::{QuizError, SessionError, SourceError};
pub use progress_store::{
    DEFAULT_QUOTA_RETENTION, PROGRESS_KEY, ProgressStore, ProgressStoreConfig, StorageMode,
};
pub use quiz_selector::QuizSelector;
pub use quiz_session::{AnswerOutcome, QuizSession};
pub use source::{HttpSource, JsonFileSource, QuestionSource, StaticSource};
