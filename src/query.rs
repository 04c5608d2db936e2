//! Query dispatch: semantic, vector, or plain text, plus the development-mode short circuit.

use crate::config::Config;
use crate::search::{QueryKind, SearchError, SearchHit, SearchService};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by the query service.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Remote search failed.
    #[error(transparent)]
    Search(#[from] SearchError),
    /// No backend is configured outside development mode.
    #[error("Search backend is not configured")]
    BackendUnavailable,
}

/// Parsed body of a search request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    /// Query text, `""` when absent or not a string.
    pub query: String,
    /// Request semantic re-ranking.
    pub semantic: bool,
    /// Request a vector query.
    pub vector: bool,
}

/// Which path a request takes, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Semantic query; wins over `vector`.
    Semantic,
    /// Vector query; currently answers with no results.
    Vector,
    /// Plain full-text query.
    Text,
}

impl SearchRequest {
    /// Read a request leniently: wrong or missing fields fall back to defaults.
    pub fn from_json(value: &Value) -> Self {
        Self {
            query: value
                .get("query")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            semantic: value
                .get("semantic")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            vector: value.get("vector").and_then(Value::as_bool).unwrap_or(false),
        }
    }

    /// Dispatch decision for this request.
    pub fn mode(&self) -> QueryMode {
        if self.semantic {
            QueryMode::Semantic
        } else if self.vector {
            QueryMode::Vector
        } else {
            QueryMode::Text
        }
    }
}

/// Remote search capability used by the query service.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run `text` as a query of `kind` and return every normalized hit.
    async fn search(&self, text: &str, kind: QueryKind) -> Result<Vec<SearchHit>, SearchError>;
}

#[async_trait]
impl SearchBackend for SearchService {
    async fn search(&self, text: &str, kind: QueryKind) -> Result<Vec<SearchHit>, SearchError> {
        self.search_all(text, kind).await
    }
}

/// Single canned hit returned in development mode.
pub fn canned_result(query: &str) -> SearchHit {
    SearchHit {
        id: "1".into(),
        content: format!("This is a sample document that matches your search query: {query}"),
        title: "Sample Document".into(),
        score: 1.0,
        entities: vec!["sample".into(), "test".into()],
        language: "en".into(),
    }
}

/// Immutable query dispatcher shared by all HTTP requests.
pub struct QueryService {
    backend: Option<Box<dyn SearchBackend>>,
    dev_mode: bool,
}

impl QueryService {
    /// Dispatcher forwarding to `backend`.
    pub fn new(backend: Box<dyn SearchBackend>) -> Self {
        Self {
            backend: Some(backend),
            dev_mode: false,
        }
    }

    /// Dispatcher that never leaves the process.
    pub fn development() -> Self {
        Self {
            backend: None,
            dev_mode: true,
        }
    }

    /// Build the dispatcher described by configuration.
    pub fn from_config(config: &Config) -> Result<Self, QueryError> {
        if config.server.dev_mode {
            tracing::warn!("Development mode enabled; search requests return canned results");
            return Ok(Self::development());
        }
        let search = config
            .search
            .as_ref()
            .ok_or(QueryError::BackendUnavailable)?;
        Ok(Self::new(Box::new(SearchService::new(search)?)))
    }

    /// Whether canned results are served.
    pub fn is_dev_mode(&self) -> bool {
        self.dev_mode
    }

    /// Answer one request.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, QueryError> {
        if self.dev_mode {
            return Ok(vec![canned_result(&request.query)]);
        }
        let backend = self
            .backend
            .as_ref()
            .ok_or(QueryError::BackendUnavailable)?;

        match request.mode() {
            QueryMode::Semantic => Ok(backend.search(&request.query, QueryKind::Semantic).await?),
            QueryMode::Vector => {
                // TODO: embed the query and send a vector query against `contentVector`.
                tracing::debug!("Vector queries are not supported yet; returning no results");
                Ok(Vec::new())
            }
            QueryMode::Text => Ok(backend.search(&request.query, QueryKind::Text).await?),
        }
    }
}
