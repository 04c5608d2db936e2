//! Streaming helpers for paging through query results.

use async_stream::try_stream;
use futures_core::Stream;
use reqwest::Method;
use serde_json::{Value, json};

use super::client::SearchService;
use super::schema::DEFAULT_CONFIGURATION_NAME;
use super::types::{QueryKind, SearchError, SearchHit, SearchResponse};

/// Query language sent with semantic queries.
pub const SEMANTIC_QUERY_LANGUAGE: &str = "en-us";

/// Build the first request body for a query against `api_version`.
///
/// `queryLanguage` only exists in preview API versions; GA versions reject unknown properties,
/// so it is sent only when the version ends in `-preview`.
pub fn query_body(text: &str, kind: QueryKind, api_version: &str) -> Value {
    match kind {
        QueryKind::Text => json!({ "search": text }),
        QueryKind::Semantic => {
            let mut body = json!({
                "search": text,
                "queryType": "semantic",
                "semanticConfiguration": DEFAULT_CONFIGURATION_NAME,
            });
            if accepts_query_language(api_version) {
                body["queryLanguage"] = json!(SEMANTIC_QUERY_LANGUAGE);
            }
            body
        }
    }
}

fn accepts_query_language(api_version: &str) -> bool {
    api_version.trim().to_ascii_lowercase().ends_with("-preview")
}

/// Stream normalized hits, following `@search.nextPageParameters` until the service stops
/// returning them.
pub fn stream_hits<'a>(
    service: &'a SearchService,
    text: &'a str,
    kind: QueryKind,
) -> impl Stream<Item = Result<SearchHit, SearchError>> + 'a {
    try_stream! {
        let mut body = query_body(text, kind, &service.api_version);
        let path = format!("indexes/{}/docs/search", service.index_name);

        loop {
            let response = service
                .request(Method::POST, &path)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            let page: SearchResponse = if status.is_success() {
                response.json().await?
            } else {
                let body = response.text().await.unwrap_or_default();
                tracing::error!(
                    index = %service.index_name,
                    status = %status,
                    "Search query failed"
                );
                Err(SearchError::UnexpectedStatus { status, body })?
            };
            for raw in &page.value {
                yield SearchHit::from_raw(raw)?;
            }

            match page.next_page_parameters {
                Some(next) if next.is_object() => body = next,
                _ => break,
            }
        }
    }
}

impl SearchService {
    /// Run a query and collect every hit across all result pages.
    pub async fn search_all(
        &self,
        text: &str,
        kind: QueryKind,
    ) -> Result<Vec<SearchHit>, SearchError> {
        use futures_util::{pin_mut, stream::StreamExt};

        let stream = stream_hits(self, text, kind);
        pin_mut!(stream);
        let mut hits = Vec::new();
        while let Some(hit) = stream.next().await {
            hits.push(hit?);
        }
        tracing::debug!(index = %self.index_name, ?kind, hits = hits.len(), "Search completed");
        Ok(hits)
    }
}
