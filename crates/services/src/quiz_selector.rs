use std::collections::HashSet;
use std::sync::Arc;

use glossary_core::model::QuizQuestion;
use rand::Rng;
use rand::rng;
use rand::seq::SliceRandom;
use serde_json::Value;

use crate::error::QuizError;
use crate::source::QuestionSource;

/// Holds the validated question pool and picks questions for a quiz.
///
/// The pool is fetched once and cached; `reload` replaces it wholesale.
pub struct QuizSelector {
    source: Arc<dyn QuestionSource>,
    questions: Option<Vec<QuizQuestion>>,
}

impl QuizSelector {
    #[must_use]
    pub fn new(source: Arc<dyn QuestionSource>) -> Self {
        Self {
            source,
            questions: None,
        }
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.questions.is_some()
    }

    /// Fetch and validate questions, or return the cached pool.
    ///
    /// Malformed records are dropped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Source` if fetching fails, or
    /// `QuizError::DataFormat` if no valid question remains.
    pub async fn load_questions(&mut self) -> Result<&[QuizQuestion], QuizError> {
        if self.questions.is_none() {
            let records = self.source.load().await?;
            let questions = validate_records(records)?;
            log::debug!("loaded {} quiz questions", questions.len());
            self.questions = Some(questions);
        }
        self.pool()
    }

    /// Discard the cached pool and fetch again.
    ///
    /// The previous pool is kept if the new fetch fails.
    ///
    /// # Errors
    ///
    /// Same as [`QuizSelector::load_questions`].
    pub async fn reload(&mut self) -> Result<&[QuizQuestion], QuizError> {
        let records = self.source.load().await?;
        let questions = validate_records(records)?;
        self.questions = Some(questions);
        self.pool()
    }

    /// Pick up to `count` questions whose term is not in `exclude_terms`.
    ///
    /// When every term is excluded the whole pool is used instead, so a quiz
    /// is always playable.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotLoaded` before a successful load.
    pub fn select_random_questions(
        &self,
        count: usize,
        exclude_terms: &HashSet<String>,
    ) -> Result<Vec<QuizQuestion>, QuizError> {
        self.select_random_questions_with(&mut rng(), count, exclude_terms)
    }

    /// Same as [`QuizSelector::select_random_questions`] with a caller-supplied RNG.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotLoaded` before a successful load.
    pub fn select_random_questions_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        count: usize,
        exclude_terms: &HashSet<String>,
    ) -> Result<Vec<QuizQuestion>, QuizError> {
        let pool = self.pool()?;
        let mut available: Vec<&QuizQuestion> = pool
            .iter()
            .filter(|q| !exclude_terms.contains(q.term()))
            .collect();
        if available.is_empty() {
            log::debug!("all quiz terms answered; selecting from the full pool");
            available = pool.iter().collect();
        }

        available.shuffle(rng);
        available.truncate(count);
        Ok(available.into_iter().cloned().collect())
    }

    /// Check an answer against the stored correct answer (exact match).
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotLoaded` before a load, or
    /// `QuizError::NotFound` for an unknown question id.
    pub fn validate_answer(&self, question_id: &str, answer: &str) -> Result<bool, QuizError> {
        let question = self
            .get_question_by_id(question_id)?
            .ok_or_else(|| QuizError::NotFound(question_id.to_string()))?;
        Ok(question.is_correct(answer))
    }

    /// # Errors
    ///
    /// Returns `QuizError::NotLoaded` before a successful load.
    pub fn get_question_by_id(&self, question_id: &str) -> Result<Option<&QuizQuestion>, QuizError> {
        Ok(self.pool()?.iter().find(|q| q.id() == question_id))
    }

    /// Copy of the whole pool.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotLoaded` before a successful load.
    pub fn get_all_questions(&self) -> Result<Vec<QuizQuestion>, QuizError> {
        Ok(self.pool()?.to_vec())
    }

    /// # Errors
    ///
    /// Returns `QuizError::NotLoaded` before a successful load.
    pub fn get_questions_by_term(&self, term: &str) -> Result<Vec<QuizQuestion>, QuizError> {
        Ok(self
            .pool()?
            .iter()
            .filter(|q| q.term() == term)
            .cloned()
            .collect())
    }

    fn pool(&self) -> Result<&[QuizQuestion], QuizError> {
        self.questions.as_deref().ok_or(QuizError::NotLoaded)
    }
}

fn validate_records(records: Vec<Value>) -> Result<Vec<QuizQuestion>, QuizError> {
    let total = records.len();
    let questions: Vec<QuizQuestion> = records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value(record) {
            Ok(question) => Some(question),
            Err(err) => {
                log::warn!("dropping invalid quiz question at index {index}: {err}");
                None
            }
        })
        .collect();

    if questions.is_empty() {
        return Err(QuizError::DataFormat(format!(
            "none of {total} quiz question records are valid"
        )));
    }
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::SourceError;
    use crate::source::StaticSource;
    use async_trait::async_trait;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    fn question(id: &str, term: &str, options: &[&str], correct: &str) -> Value {
        json!({
            "id": id,
            "term": term,
            "question": format!("What is {term}?"),
            "options": options,
            "correctAnswer": correct,
            "glossaryLink": format!("/glossary#{}", term.to_lowercase()),
        })
    }

    fn example_pool() -> Vec<Value> {
        vec![
            question("q1", "AI", &["A", "B"], "A"),
            question("q2", "ML", &["X", "Y"], "Y"),
        ]
    }

    async fn loaded(records: Vec<Value>) -> QuizSelector {
        let mut selector = QuizSelector::new(Arc::new(StaticSource::new(records)));
        selector.load_questions().await.unwrap();
        selector
    }

    fn terms(values: &[&str]) -> HashSet<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[tokio::test]
    async fn invalid_records_are_dropped() {
        let mut records = example_pool();
        records.push(question("q3", "RAG", &["only"], "only"));
        records.push(question("q4", "LLM", &["A", "B"], "C"));
        records.push(json!({"id": "q5"}));
        records.push(json!("not an object"));

        let selector = loaded(records).await;
        let ids: Vec<String> = selector
            .get_all_questions()
            .unwrap()
            .iter()
            .map(|q| q.id().to_string())
            .collect();
        assert_eq!(ids, vec!["q1", "q2"]);
    }

    #[tokio::test]
    async fn zero_valid_questions_is_a_data_format_error() {
        let mut selector = QuizSelector::new(Arc::new(StaticSource::new(vec![json!({})])));
        let err = selector.load_questions().await.unwrap_err();
        assert!(matches!(err, QuizError::DataFormat(_)));
        assert!(!selector.is_loaded());
    }

    #[test]
    fn methods_before_load_fail_with_not_loaded() {
        let selector = QuizSelector::new(Arc::new(StaticSource::new(example_pool())));
        assert!(matches!(
            selector.select_random_questions(1, &HashSet::new()),
            Err(QuizError::NotLoaded)
        ));
        assert!(matches!(
            selector.validate_answer("q1", "A"),
            Err(QuizError::NotLoaded)
        ));
        assert!(matches!(selector.get_all_questions(), Err(QuizError::NotLoaded)));
    }

    #[tokio::test]
    async fn example_scenario() {
        let selector = loaded(example_pool()).await;

        let picked = selector.select_random_questions(2, &HashSet::new()).unwrap();
        let mut ids: Vec<String> = picked.iter().map(|q| q.id().to_string()).collect();
        ids.sort();
        assert_eq!(ids, vec!["q1", "q2"]);

        assert!(selector.validate_answer("q1", "A").unwrap());
        assert!(!selector.validate_answer("q1", "B").unwrap());
        assert!(matches!(
            selector.validate_answer("q9", "A"),
            Err(QuizError::NotFound(id)) if id == "q9"
        ));
    }

    #[tokio::test]
    async fn excluded_terms_are_skipped() {
        let selector = loaded(example_pool()).await;
        for _ in 0..20 {
            let picked = selector
                .select_random_questions(2, &terms(&["AI"]))
                .unwrap();
            assert_eq!(picked.len(), 1);
            assert_eq!(picked[0].term(), "ML");
        }
    }

    #[tokio::test]
    async fn exhausted_terms_fall_back_to_full_pool() {
        let selector = loaded(example_pool()).await;
        let picked = selector
            .select_random_questions(5, &terms(&["AI", "ML"]))
            .unwrap();
        assert_eq!(picked.len(), 2);

        let one = selector
            .select_random_questions(1, &terms(&["AI", "ML"]))
            .unwrap();
        assert_eq!(one.len(), 1);
    }

    #[tokio::test]
    async fn oversized_count_returns_each_question_once() {
        let records: Vec<Value> = (0..6)
            .map(|i| question(&format!("q{i}"), &format!("T{i}"), &["A", "B"], "A"))
            .collect();
        let selector = loaded(records).await;
        let mut rng = StdRng::seed_from_u64(7);

        let picked = selector
            .select_random_questions_with(&mut rng, 50, &HashSet::new())
            .unwrap();
        let ids: HashSet<String> = picked.iter().map(|q| q.id().to_string()).collect();
        assert_eq!(picked.len(), 6);
        assert_eq!(ids.len(), 6);
    }

    #[tokio::test]
    async fn selection_order_varies() {
        let records: Vec<Value> = (0..8)
            .map(|i| question(&format!("q{i}"), &format!("T{i}"), &["A", "B"], "A"))
            .collect();
        let selector = loaded(records).await;
        let mut rng = StdRng::seed_from_u64(42);

        let orders: HashSet<Vec<String>> = (0..10)
            .map(|_| {
                selector
                    .select_random_questions_with(&mut rng, 8, &HashSet::new())
                    .unwrap()
                    .iter()
                    .map(|q| q.id().to_string())
                    .collect()
            })
            .collect();
        assert!(orders.len() > 1);
    }

    #[tokio::test]
    async fn accessors_return_copies() {
        let selector = loaded(example_pool()).await;
        let mut all = selector.get_all_questions().unwrap();
        all.clear();
        assert_eq!(selector.get_all_questions().unwrap().len(), 2);

        assert_eq!(selector.get_questions_by_term("ML").unwrap().len(), 1);
        assert!(selector.get_questions_by_term("RAG").unwrap().is_empty());
        assert!(selector.get_question_by_id("q2").unwrap().is_some());
        assert!(selector.get_question_by_id("nope").unwrap().is_none());
    }

    /// Replays queued fetch results in order and counts calls.
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<Vec<Value>, SourceError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Vec<Value>, SourceError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QuestionSource for ScriptedSource {
        async fn load(&self) -> Result<Vec<Value>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(SourceError::NotAnArray))
        }
    }

    fn ids(questions: &[QuizQuestion]) -> Vec<String> {
        questions.iter().map(|q| q.id().to_string()).collect()
    }

    #[tokio::test]
    async fn second_load_uses_the_cache() {
        let source = ScriptedSource::new(vec![Ok(example_pool())]);
        let mut selector = QuizSelector::new(source.clone());

        selector.load_questions().await.unwrap();
        let again = ids(selector.load_questions().await.unwrap());

        assert_eq!(source.calls(), 1);
        assert_eq!(again, vec!["q1", "q2"]);
    }

    #[tokio::test]
    async fn reload_replaces_the_pool() {
        let replacement = vec![
            question("q7", "RAG", &["A", "B"], "B"),
            question("q8", "LLM", &["A", "B"], "A"),
            question("q9", "Agent", &["A", "B"], "A"),
        ];
        let source = ScriptedSource::new(vec![Ok(example_pool()), Ok(replacement)]);
        let mut selector = QuizSelector::new(source.clone());
        selector.load_questions().await.unwrap();

        let reloaded = ids(selector.reload().await.unwrap());

        assert_eq!(source.calls(), 2);
        assert_eq!(reloaded, vec!["q7", "q8", "q9"]);
        assert!(selector.get_question_by_id("q1").unwrap().is_none());
        assert!(selector.validate_answer("q7", "B").unwrap());
    }

    #[tokio::test]
    async fn failed_reload_keeps_the_previous_pool() {
        let source = ScriptedSource::new(vec![
            Ok(example_pool()),
            Err(SourceError::NotAnArray),
            Ok(vec![json!({"id": "broken"})]),
        ]);
        let mut selector = QuizSelector::new(source.clone());
        selector.load_questions().await.unwrap();

        assert!(matches!(
            selector.reload().await,
            Err(QuizError::Source(SourceError::NotAnArray))
        ));
        assert_eq!(ids(&selector.get_all_questions().unwrap()), vec!["q1", "q2"]);

        assert!(matches!(
            selector.reload().await,
            Err(QuizError::DataFormat(_))
        ));
        assert!(selector.is_loaded());
        assert_eq!(ids(&selector.get_all_questions().unwrap()), vec!["q1", "q2"]);
        assert_eq!(source.calls(), 3);
    }
}
