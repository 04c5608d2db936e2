//! Shared types used by the search client and its callers.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Largest number of documents submitted in one indexing call.
pub const MAX_BATCH_SIZE: usize = 50;

/// Errors returned while interacting with the search service.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Endpoint failed to parse or normalize.
    #[error("Invalid search endpoint: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Search service responded with an unexpected status code.
    #[error("Unexpected search service response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Caller attempted to submit more documents than one call accepts.
    #[error("Batch of {size} documents exceeds the limit of {limit}")]
    BatchTooLarge {
        /// Number of documents in the rejected batch.
        size: usize,
        /// Configured per-call limit.
        limit: usize,
    },
    /// A returned hit lacked a field every indexed record carries.
    #[error("Malformed search hit: missing {0}")]
    MalformedHit(&'static str),
}

/// One record stored in the search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDocument {
    /// Document key derived from the blob name.
    pub id: String,
    /// Extracted paragraph text.
    pub content: String,
    /// Display title (the blob name).
    pub title: String,
    /// Detected locale, `"en"` when nothing was detected.
    pub language: String,
    /// Entity contents in detection order.
    pub entities: Vec<String>,
    /// Mean-pooled content embedding.
    pub content_vector: Vec<f32>,
}

/// Normalized search result returned to HTTP clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Document key.
    pub id: String,
    /// Extracted text, `""` when not retrievable.
    pub content: String,
    /// Title, `""` when not retrievable.
    pub title: String,
    /// Relevance score assigned by the service.
    pub score: f64,
    /// Entity list, empty when not retrievable.
    pub entities: Vec<String>,
    /// Locale, `""` when not retrievable.
    pub language: String,
}

impl SearchHit {
    /// Project a raw service hit onto the normalized shape.
    pub fn from_raw(raw: &Map<String, Value>) -> Result<Self, SearchError> {
        let id = match raw.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(other) if !other.is_null() => other.to_string(),
            _ => return Err(SearchError::MalformedHit("id")),
        };
        let score = raw
            .get("@search.score")
            .and_then(Value::as_f64)
            .ok_or(SearchError::MalformedHit("@search.score"))?;

        Ok(Self {
            id,
            content: string_field(raw, "content"),
            title: string_field(raw, "title"),
            score,
            entities: raw
                .get("entities")
                .and_then(Value::as_array)
                .map(|values| {
                    values
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            language: string_field(raw, "language"),
        })
    }
}

fn string_field(raw: &Map<String, Value>, key: &str) -> String {
    raw.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Remote query flavors supported by the search service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Plain full-text query.
    Text,
    /// Semantic re-ranked query using the `default` configuration.
    Semantic,
}

/// Outcome of one indexing call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
    /// Documents the service accepted.
    pub succeeded: usize,
    /// Keys the service reported as failed in a multi-status response.
    pub failed_keys: Vec<String>,
}

#[derive(Serialize)]
pub(crate) struct IndexAction<'a> {
    #[serde(rename = "@search.action")]
    pub(crate) action: &'static str,
    #[serde(flatten)]
    pub(crate) document: &'a IndexDocument,
}

#[derive(Deserialize)]
pub(crate) struct IndexBatchResponse {
    #[serde(default)]
    pub(crate) value: Vec<IndexingResult>,
}

#[derive(Deserialize)]
pub(crate) struct IndexingResult {
    pub(crate) key: String,
    pub(crate) status: bool,
    #[serde(rename = "errorMessage", default)]
    pub(crate) error_message: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub(crate) value: Vec<Map<String, Value>>,
    #[serde(rename = "@search.nextPageParameters", default)]
    pub(crate) next_page_parameters: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hit_defaults_missing_optional_fields() {
        let raw = json!({ "id": "doc-1", "@search.score": 2.5 });
        let hit = SearchHit::from_raw(raw.as_object().unwrap()).expect("hit");
        assert_eq!(hit.id, "doc-1");
        assert_eq!(hit.score, 2.5);
        assert!(hit.content.is_empty());
        assert!(hit.entities.is_empty());
        assert!(hit.language.is_empty());
    }

    #[test]
    fn hit_without_score_is_rejected() {
        let raw = json!({ "id": "doc-1" });
        let err = SearchHit::from_raw(raw.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, SearchError::MalformedHit("@search.score")));
    }

    #[test]
    fn upload_action_flattens_document_fields() {
        let document = IndexDocument {
            id: "a".into(),
            content: "body".into(),
            title: "a.pdf".into(),
            language: "en".into(),
            entities: vec!["Contoso".into()],
            content_vector: vec![0.5, 0.25],
        };
        let value = serde_json::to_value(IndexAction {
            action: "upload",
            document: &document,
        })
        .unwrap();
        assert_eq!(value["@search.action"], "upload");
        assert_eq!(value["contentVector"], json!([0.5, 0.25]));
        assert_eq!(value["entities"], json!(["Contoso"]));
    }
}
