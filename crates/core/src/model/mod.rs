mod ids;
mod preferences;
mod progress;
mod quiz;
mod stored;

pub use ids::{ParseIdError, QuestionId};
pub use preferences::{ParsePreferenceError, Preferences, PreferencesUpdate, Role, Theme};
pub use progress::{ProgressUpdate, UserProgress};
pub use quiz::{QuizAttempt, QuizAttemptError, QuizQuestion, QuizQuestionError};
pub use stored::{MigrationStatus, SCHEMA_VERSION, StoredDataError, StoredUserData};
