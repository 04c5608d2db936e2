//! Document-analysis service integration (`prebuilt-document` model).
//!
//! Analysis is a long-running operation: the document is submitted, the service answers with an
//! `Operation-Location`, and the client polls that location until the job settles.

pub mod types;

pub use types::{AnalyzedDocument, DEFAULT_LANGUAGE};

use crate::config::AnalysisConfig;
use crate::endpoint::{format_endpoint, normalize_base_url};
use bytes::Bytes;
use reqwest::{Client, StatusCode, header};
use std::time::Duration;
use thiserror::Error;
use types::{AnalyzeOperation, OperationStatus};

/// Prebuilt model extracting paragraphs, languages and entities.
pub const DOCUMENT_MODEL_ID: &str = "prebuilt-document";

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Errors raised while analyzing a document.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Endpoint failed to parse or normalize.
    #[error("Invalid analysis endpoint: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Service responded with an unexpected status code.
    #[error("Unexpected analysis response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Submission was accepted without an operation to poll.
    #[error("Analysis accepted without an Operation-Location header")]
    MissingOperationLocation,
    /// The service reported the job as failed or canceled.
    #[error("Analysis failed: {0}")]
    Failed(String),
    /// The job did not settle within the configured number of polls.
    #[error("Analysis did not complete after {0} polls")]
    TimedOut(u32),
}

/// HTTP client for the document-analysis service.
pub struct AnalysisClient {
    http: Client,
    endpoint: String,
    api_key: String,
    api_version: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl AnalysisClient {
    /// Construct a client from the analysis section of the configuration.
    pub fn new(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let http = Client::builder().user_agent("docsearch/analysis").build()?;
        let endpoint = normalize_base_url(&config.endpoint)
            .map_err(AnalysisError::InvalidUrl)?;
        tracing::debug!(
            endpoint = %endpoint,
            api_version = %config.api_version,
            "Initialized document analysis client"
        );
        Ok(Self {
            http,
            endpoint,
            api_key: config.api_key.clone(),
            api_version: config.api_version.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_polls: config.max_polls,
        })
    }

    /// Submit `content` and wait until the analysis settles.
    pub async fn analyze(&self, content: Bytes) -> Result<AnalyzedDocument, AnalysisError> {
        let operation = self.begin_analyze(content).await?;
        self.poll_until_complete(&operation).await
    }

    async fn begin_analyze(&self, content: Bytes) -> Result<String, AnalysisError> {
        let url = format_endpoint(
            &self.endpoint,
            &format!("formrecognizer/documentModels/{DOCUMENT_MODEL_ID}:analyze"),
        );
        let response = self
            .http
            .post(url)
            .query(&[("api-version", self.api_version.as_str())])
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(content)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            let body = response.text().await.unwrap_or_default();
            let error = AnalysisError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Failed to submit document for analysis");
            return Err(error);
        }

        response
            .headers()
            .get("operation-location")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or(AnalysisError::MissingOperationLocation)
    }

    async fn poll_until_complete(
        &self,
        operation: &str,
    ) -> Result<AnalyzedDocument, AnalysisError> {
        for attempt in 1..=self.max_polls {
            let response = self
                .http
                .get(operation)
                .header(SUBSCRIPTION_KEY_HEADER, &self.api_key)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AnalysisError::UnexpectedStatus { status, body });
            }

            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs);

            let payload: AnalyzeOperation = response.json().await?;
            match payload.status {
                OperationStatus::Succeeded => {
                    tracing::debug!(attempt, "Analysis completed");
                    return Ok(payload.analyze_result.unwrap_or_default().into());
                }
                OperationStatus::Failed | OperationStatus::Canceled => {
                    let message = payload
                        .error
                        .map(|error| format!("{}: {}", error.code, error.message))
                        .unwrap_or_else(|| format!("{:?}", payload.status));
                    return Err(AnalysisError::Failed(message));
                }
                OperationStatus::NotStarted | OperationStatus::Running => {
                    tracing::trace!(attempt, status = ?payload.status, "Analysis pending");
                    if attempt < self.max_polls {
                        tokio::time::sleep(retry_after.unwrap_or(self.poll_interval)).await;
                    }
                }
            }
        }

        Err(AnalysisError::TimedOut(self.max_polls))
    }
}
