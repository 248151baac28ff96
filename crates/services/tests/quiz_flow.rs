use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use glossary_core::time::fixed_clock;
use serde_json::Value;
use services::{
    AppServices, JsonFileSource, QuestionSource, QuizError, QuizSelector, SessionError,
    SourceError,
};

const QUESTIONS: &str = r#"[
    {"id": "q1", "term": "AI", "question": "AI stands for?", "options": ["Artificial Intelligence", "Automated Input"],
     "correctAnswer": "Artificial Intelligence", "glossaryLink": "/glossary#ai"},
    {"id": "q2", "term": "ML", "question": "ML learns from?", "options": ["Data", "Magic"],
     "correctAnswer": "Data", "glossaryLink": "/glossary#ml"},
    {"id": "q3", "term": "LLM", "question": "An LLM is a?", "options": ["Language model", "Linear list"],
     "correctAnswer": "Language model", "glossaryLink": "/glossary#llm"},
    {"id": "broken", "term": "RAG", "question": "?", "options": ["only one"],
     "correctAnswer": "only one", "glossaryLink": "/glossary#rag"}
]"#;

struct FailingSource;

#[async_trait]
impl QuestionSource for FailingSource {
    async fn load(&self) -> Result<Vec<Value>, SourceError> {
        Err(SourceError::NotAnArray)
    }
}

#[tokio::test]
async fn quiz_progress_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let questions_path = dir.path().join("quiz-questions.json");
    tokio::fs::write(&questions_path, QUESTIONS).await.unwrap();
    let data_dir = dir.path().join("data");

    {
        let source = Arc::new(JsonFileSource::new(&questions_path));
        let mut services = AppServices::file_backed(fixed_clock(), &data_dir, None, source);
        assert!(services.progress().is_local_storage_available());
        assert_eq!(services.progress().increment_visit_count(), 1);

        let mut session = services.start_quiz(2).await.unwrap();
        assert_eq!(session.len(), 2);
        while let Some(question) = session.current() {
            let answer = question.correct_answer().to_string();
            services.answer(&mut session, &answer).unwrap();
        }
        assert_eq!(session.score(), 2);
    }

    let source = Arc::new(JsonFileSource::new(&questions_path));
    let mut services = AppServices::file_backed(fixed_clock(), &data_dir, None, source);
    assert_eq!(services.progress().increment_visit_count(), 2);

    let progress = services.progress().get_progress();
    assert_eq!(progress.best_score, 2);
    assert_eq!(progress.answered_terms.len(), 2);

    // Only one unanswered valid term is left.
    let session = services.start_quiz(3).await.unwrap();
    assert_eq!(session.len(), 1);
    assert!(!progress.has_answered(session.current().unwrap().term()));

    services.progress().clear_all_data();
    assert_eq!(services.progress().get_progress().visit_count, 0);
}

#[tokio::test]
async fn invalid_records_never_reach_the_pool() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("q.json");
    tokio::fs::write(&path, QUESTIONS).await.unwrap();

    let mut selector = QuizSelector::new(Arc::new(JsonFileSource::new(&path)));
    let pool = selector.load_questions().await.unwrap();
    assert_eq!(pool.len(), 3);
    assert!(selector.get_question_by_id("broken").unwrap().is_none());

    let everything: HashSet<String> = ["AI", "ML", "LLM"].iter().map(|t| (*t).to_string()).collect();
    assert_eq!(
        selector.select_random_questions(10, &everything).unwrap().len(),
        3
    );
}

#[tokio::test]
async fn source_failures_surface_to_the_caller() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut services =
        AppServices::file_backed(fixed_clock(), dir.path(), None, Arc::new(FailingSource));

    let err = services.start_quiz(3).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Quiz(QuizError::Source(SourceError::NotAnArray))
    ));
    assert!(!services.quiz().is_loaded());
}

#[tokio::test]
async fn unopenable_data_dir_degrades_to_memory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();

    let services = AppServices::file_backed(
        fixed_clock(),
        &blocker.join("data"),
        None,
        Arc::new(FailingSource),
    );
    assert!(!services.progress().is_local_storage_available());
    assert_eq!(services.progress().increment_visit_count(), 1);
    assert_eq!(services.progress().get_progress().visit_count, 1);
}
