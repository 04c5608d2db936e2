use docsearch::{
    analysis::AnalysisClient,
    config::{AnalysisConfig, SearchConfig},
    embedding::HashEmbeddingClient,
    ingest::{IngestionPipeline, document_key},
    metrics::IngestReport,
    search::SearchService,
    storage::BlobContainer,
};
use httpmock::{Method::GET, Method::POST, MockServer};
use object_store::{ObjectStore, PutPayload, memory::InMemory, path::Path};
use serde_json::json;
use std::sync::Arc;

fn search_config(server: &MockServer) -> SearchConfig {
    SearchConfig {
        endpoint: server.base_url(),
        api_key: "search-key".into(),
        index_name: "documents".into(),
        api_version: "2023-11-01".into(),
    }
}

fn analysis_config(server: &MockServer) -> AnalysisConfig {
    AnalysisConfig {
        endpoint: server.base_url(),
        api_key: "fr-key".into(),
        api_version: "2022-08-31".into(),
        poll_interval_ms: 1,
        max_polls: 5,
    }
}

async fn container(names: &[&str]) -> BlobContainer {
    let store = Arc::new(InMemory::new());
    for name in names {
        store
            .put(&Path::from(*name), PutPayload::from_static(b"%PDF-1.7"))
            .await
            .expect("seed blob");
    }
    BlobContainer::new(store, "incoming")
}

async fn mock_analysis(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/formrecognizer/documentModels/prebuilt-document:analyze");
            then.status(202)
                .header("Operation-Location", server.url("/operations/abc"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/operations/abc");
            then.status(200).json_body(json!({
                "status": "succeeded",
                "analyzeResult": {
                    "paragraphs": [{ "content": "Quarterly" }, { "content": "report" }],
                    "languages": [{ "locale": "en" }],
                    "entities": [{ "content": "Contoso" }]
                }
            }));
        })
        .await;
}

#[tokio::test]
async fn ingests_container_into_index() {
    let server = MockServer::start_async().await;
    mock_analysis(&server).await;
    let encoded = document_key("reports/q1.pdf");
    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/indexes/documents/docs/index")
                .query_param("api-version", "2023-11-01")
                .header("api-key", "search-key")
                .body_contains("\"@search.action\":\"upload\"")
                .body_contains(format!("\"id\":\"{encoded}\""))
                .body_contains("\"id\":\"plain-key\"")
                .body_contains("\"title\":\"reports/q1.pdf\"")
                .body_contains("\"content\":\"Quarterly report\"");
            then.status(200).json_body(json!({
                "value": [
                    { "key": encoded, "status": true, "statusCode": 201 },
                    { "key": "plain-key", "status": true, "statusCode": 201 }
                ]
            }));
        })
        .await;

    let pipeline = IngestionPipeline::new(
        container(&["reports/q1.pdf", "plain-key"]).await,
        Box::new(AnalysisClient::new(&analysis_config(&server)).expect("analysis client")),
        Box::new(HashEmbeddingClient::new(16)),
        Box::new(SearchService::new(&search_config(&server)).expect("search client")),
    );
    let report = pipeline.run().await;

    upload.assert_async().await;
    assert_eq!(
        report,
        IngestReport {
            blobs_seen: 2,
            blobs_skipped: 0,
            documents_indexed: 2,
            documents_failed: 0,
            batches_submitted: 1,
            batches_failed: 0,
        }
    );
}

#[tokio::test]
async fn partial_rejection_is_counted_not_fatal() {
    let server = MockServer::start_async().await;
    mock_analysis(&server).await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/indexes/documents/docs/index");
            then.status(207).json_body(json!({
                "value": [
                    { "key": "a", "status": true, "statusCode": 200 },
                    { "key": "b", "status": false, "statusCode": 400,
                      "errorMessage": "Document is too large" }
                ]
            }));
        })
        .await;

    let pipeline = IngestionPipeline::new(
        container(&["a", "b"]).await,
        Box::new(AnalysisClient::new(&analysis_config(&server)).expect("analysis client")),
        Box::new(HashEmbeddingClient::new(16)),
        Box::new(SearchService::new(&search_config(&server)).expect("search client")),
    );
    let report = pipeline.run().await;

    assert_eq!(report.documents_indexed, 1);
    assert_eq!(report.documents_failed, 1);
    assert_eq!(report.batches_failed, 0);
}

#[tokio::test]
async fn rejected_batch_is_dropped_and_run_completes() {
    let server = MockServer::start_async().await;
    mock_analysis(&server).await;
    let upload = server
        .mock_async(|when, then| {
            when.method(POST).path("/indexes/documents/docs/index");
            then.status(503).body("Service Unavailable");
        })
        .await;

    let pipeline = IngestionPipeline::new(
        container(&["one", "two", "three"]).await,
        Box::new(AnalysisClient::new(&analysis_config(&server)).expect("analysis client")),
        Box::new(HashEmbeddingClient::new(16)),
        Box::new(SearchService::new(&search_config(&server)).expect("search client")),
    )
    .with_batch_capacity(2);
    let report = pipeline.run().await;

    assert_eq!(upload.hits_async().await, 2);
    assert_eq!(report.batches_submitted, 2);
    assert_eq!(report.batches_failed, 2);
    assert_eq!(report.documents_failed, 3);
    assert_eq!(report.documents_indexed, 0);
}
