//! HTTP client wrapper for the managed search service REST API.

use crate::config::SearchConfig;
use crate::search::schema::IndexSchema;
use crate::search::types::{
    IndexAction, IndexBatchResponse, IndexDocument, MAX_BATCH_SIZE, SearchError, UploadSummary,
};
use crate::endpoint::{format_endpoint, normalize_base_url};
use reqwest::{Client, Method, StatusCode};
use uuid::Uuid;

/// Lightweight HTTP client for index management, document upload, and queries.
pub struct SearchService {
    pub(crate) client: Client,
    pub(crate) endpoint: String,
    pub(crate) api_key: String,
    pub(crate) index_name: String,
    pub(crate) api_version: String,
}

impl SearchService {
    /// Construct a client from the search section of the configuration.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let client = Client::builder().user_agent("docsearch/0.1").build()?;
        let endpoint = normalize_base_url(&config.endpoint).map_err(SearchError::InvalidUrl)?;
        tracing::debug!(
            endpoint = %endpoint,
            index = %config.index_name,
            api_version = %config.api_version,
            "Initialized search HTTP client"
        );

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            index_name: config.index_name.clone(),
            api_version: config.api_version.clone(),
        })
    }

    /// Name of the index this client targets.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Create the index or update it in place to match `schema`.
    pub async fn create_or_update_index(&self, schema: &IndexSchema) -> Result<(), SearchError> {
        let response = self
            .request(Method::PUT, &format!("indexes/{}", schema.name))
            .json(schema)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(index = %schema.name, "Index created or updated");
        })
        .await
    }

    /// Upload (insert or overwrite) a batch of documents.
    ///
    /// Batches above [`MAX_BATCH_SIZE`] are rejected before any request is sent. A multi-status
    /// response is not an error; the keys the service refused are returned in the summary.
    pub async fn upload_documents(
        &self,
        documents: &[IndexDocument],
    ) -> Result<UploadSummary, SearchError> {
        if documents.len() > MAX_BATCH_SIZE {
            return Err(SearchError::BatchTooLarge {
                size: documents.len(),
                limit: MAX_BATCH_SIZE,
            });
        }
        if documents.is_empty() {
            return Ok(UploadSummary::default());
        }

        let actions: Vec<_> = documents
            .iter()
            .map(|document| IndexAction {
                action: "upload",
                document,
            })
            .collect();

        let response = self
            .request(
                Method::POST,
                &format!("indexes/{}/docs/index", self.index_name),
            )
            .json(&serde_json::json!({ "value": actions }))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::MULTI_STATUS {
            let body = response.text().await.unwrap_or_default();
            let error = SearchError::UnexpectedStatus { status, body };
            tracing::error!(index = %self.index_name, error = %error, "Document upload failed");
            return Err(error);
        }

        let payload: IndexBatchResponse = response.json().await?;
        let mut summary = UploadSummary::default();
        for result in payload.value {
            if result.status {
                summary.succeeded += 1;
            } else {
                tracing::debug!(
                    key = %result.key,
                    error = result.error_message.as_deref().unwrap_or_default(),
                    "Document rejected by search service"
                );
                summary.failed_keys.push(result.key);
            }
        }
        tracing::debug!(
            index = %self.index_name,
            succeeded = summary.succeeded,
            failed = summary.failed_keys.len(),
            "Documents uploaded"
        );
        Ok(summary)
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.endpoint, path);
        self.client
            .request(method, url)
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
            .header("x-ms-client-request-id", Uuid::new_v4().to_string())
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), SearchError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = SearchError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Search service request failed");
            Err(error)
        }
    }
}

#[cfg(test)]
pub(crate) fn test_service(base_url: String) -> SearchService {
    SearchService {
        client: Client::builder()
            .user_agent("docsearch-test")
            .build()
            .expect("client"),
        endpoint: base_url,
        api_key: "test-key".into(),
        index_name: "docs".into(),
        api_version: "2023-11-01".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, Method::PUT, MockServer};
    use serde_json::json;

    fn document(id: &str) -> IndexDocument {
        IndexDocument {
            id: id.into(),
            content: format!("content of {id}"),
            title: id.into(),
            language: "en".into(),
            entities: vec![],
            content_vector: vec![0.0, 1.0],
        }
    }

    #[tokio::test]
    async fn create_or_update_index_puts_schema() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/indexes/docs")
                    .query_param("api-version", "2023-11-01")
                    .header("api-key", "test-key")
                    .body_contains("\"efConstruction\":400");
                then.status(201).json_body(json!({ "name": "docs" }));
            })
            .await;

        let service = test_service(server.base_url());
        service
            .create_or_update_index(&IndexSchema::new("docs", 4))
            .await
            .expect("index provisioned");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upload_documents_reports_multi_status_failures() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/indexes/docs/docs/index")
                    .body_contains("\"@search.action\":\"upload\"");
                then.status(207).json_body(json!({
                    "value": [
                        { "key": "a", "status": true, "statusCode": 201 },
                        { "key": "b", "status": false, "statusCode": 400, "errorMessage": "bad" }
                    ]
                }));
            })
            .await;

        let service = test_service(server.base_url());
        let summary = service
            .upload_documents(&[document("a"), document("b")])
            .await
            .expect("upload");
        mock.assert_async().await;
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed_keys, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn upload_documents_rejects_oversized_batches_locally() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/indexes/docs/docs/index");
                then.status(200).json_body(json!({ "value": [] }));
            })
            .await;

        let service = test_service(server.base_url());
        let batch: Vec<_> = (0..=MAX_BATCH_SIZE)
            .map(|idx| document(&idx.to_string()))
            .collect();
        let err = service.upload_documents(&batch).await.unwrap_err();
        assert!(matches!(err, SearchError::BatchTooLarge { size: 51, limit: 50 }));
        assert_eq!(mock.hits_async().await, 0);
    }

    #[tokio::test]
    async fn upload_documents_surfaces_server_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/indexes/docs/docs/index");
                then.status(503).body("unavailable");
            })
            .await;

        let service = test_service(server.base_url());
        let err = service.upload_documents(&[document("a")]).await.unwrap_err();
        match err {
            SearchError::UnexpectedStatus { status, body } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
