use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SourceError;

/// Supplies raw, unvalidated quiz question records.
///
/// Validation happens in `QuizSelector`; sources only fetch and parse JSON.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Fetch every candidate record.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if the data cannot be fetched or is not a JSON array.
    async fn load(&self) -> Result<Vec<Value>, SourceError>;
}

/// Records held in memory, e.g. embedded data or test fixtures.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    records: Vec<Value>,
}

impl StaticSource {
    #[must_use]
    pub fn new(records: Vec<Value>) -> Self {
        Self { records }
    }

    /// Parse a JSON array document.
    ///
    /// # Errors
    ///
    /// Returns `SourceError` if `json` is malformed or not an array.
    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        let value: Value = serde_json::from_str(json)?;
        Ok(Self::new(into_records(value)?))
    }
}

#[async_trait]
impl QuestionSource for StaticSource {
    async fn load(&self) -> Result<Vec<Value>, SourceError> {
        Ok(self.records.clone())
    }
}

/// Reads a JSON array of questions from a file.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl QuestionSource for JsonFileSource {
    async fn load(&self) -> Result<Vec<Value>, SourceError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let value: Value = serde_json::from_str(&raw)?;
        into_records(value)
    }
}

/// Fetches a JSON array of questions over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl QuestionSource for HttpSource {
    async fn load(&self) -> Result<Vec<Value>, SourceError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus(status));
        }
        let value: Value = response.json().await?;
        into_records(value)
    }
}

fn into_records(value: Value) -> Result<Vec<Value>, SourceError> {
    match value {
        Value::Array(records) => Ok(records),
        _ => Err(SourceError::NotAnArray),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_source_requires_an_array() {
        assert!(matches!(
            StaticSource::from_json(r#"{"questions": []}"#),
            Err(SourceError::NotAnArray)
        ));
        let source = StaticSource::from_json(r#"[{"id": "q1"}, 3]"#).unwrap();
        assert_eq!(source.load().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn json_file_source_reads_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questions.json");
        tokio::fs::write(&path, r#"[{"id": "q1"}]"#).await.unwrap();

        let records = JsonFileSource::new(&path).load().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["id"], "q1");
    }

    #[tokio::test]
    async fn json_file_source_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonFileSource::new(dir.path().join("missing.json"))
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }
}
