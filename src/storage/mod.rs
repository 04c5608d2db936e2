//! Source blob container access.
//!
//! Listing and downloads go through `object_store`, so the pipeline can be pointed at the Azure
//! backend in production and at an in-memory store in tests.

pub mod connection;

pub use connection::ConnectionString;

use crate::config::StorageConfig;
use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while reading from the blob container.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Connection string was malformed or lacked credentials.
    #[error("Invalid storage connection string: {0}")]
    InvalidConnectionString(String),
    /// Backend request failed.
    #[error("Blob storage request failed: {0}")]
    ObjectStore(#[from] object_store::Error),
}

/// One listed blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    /// Blob name as listed by the container.
    pub name: String,
    /// Size in bytes.
    pub size: usize,
    location: Path,
}

impl From<ObjectMeta> for BlobItem {
    fn from(meta: ObjectMeta) -> Self {
        Self {
            name: meta.location.to_string(),
            size: meta.size,
            location: meta.location,
        }
    }
}

/// Read access to one container.
#[derive(Clone)]
pub struct BlobContainer {
    store: Arc<dyn ObjectStore>,
    name: String,
}

impl BlobContainer {
    /// Wrap an existing store (any backend) under a display name.
    pub fn new(store: Arc<dyn ObjectStore>, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
        }
    }

    /// Open the container described by the storage configuration.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let connection: ConnectionString = config.connection_string.parse()?;
        let store = build_azure_store(&connection, &config.container_name)?;
        tracing::debug!(
            container = %config.container_name,
            account = connection.account_name.as_deref().unwrap_or("devstoreaccount1"),
            emulator = connection.use_development_storage,
            "Initialized blob container client"
        );
        Ok(Self::new(store, config.container_name.clone()))
    }

    /// Container name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stream every blob in the container, following listing pages.
    pub fn list_blobs(&self) -> impl Stream<Item = Result<BlobItem, StorageError>> + '_ {
        self.store
            .list(None)
            .map(|item| item.map(BlobItem::from).map_err(StorageError::from))
    }

    /// Download the full content of `blob`.
    pub async fn download(&self, blob: &BlobItem) -> Result<Bytes, StorageError> {
        let content = self.store.get(&blob.location).await?.bytes().await?;
        tracing::debug!(
            container = %self.name,
            blob = %blob.name,
            bytes = content.len(),
            "Blob downloaded"
        );
        Ok(content)
    }
}

fn build_azure_store(
    connection: &ConnectionString,
    container: &str,
) -> Result<Arc<dyn ObjectStore>, StorageError> {
    let mut builder = MicrosoftAzureBuilder::new().with_container_name(container);

    if connection.use_development_storage {
        builder = builder.with_use_emulator(true);
    } else {
        if let Some(account) = &connection.account_name {
            builder = builder.with_account(account);
        }
        if let Some(key) = &connection.account_key {
            builder = builder.with_access_key(key);
        } else if let Some(pairs) = connection.sas_pairs()? {
            builder = builder.with_sas_authorization(pairs);
        }
        if let Some(endpoint) = connection.endpoint() {
            builder = builder
                .with_allow_http(endpoint.starts_with("http://"))
                .with_endpoint(endpoint);
        }
    }

    Ok(Arc::new(builder.build()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;
    use object_store::{PutPayload, memory::InMemory};

    #[tokio::test]
    async fn lists_and_downloads_blobs() {
        let store = Arc::new(InMemory::new());
        store
            .put(&Path::from("reports/q1.pdf"), PutPayload::from_static(b"q1"))
            .await
            .unwrap();
        store
            .put(&Path::from("q2.pdf"), PutPayload::from_static(b"q2"))
            .await
            .unwrap();

        let container = BlobContainer::new(store, "docs");
        let mut blobs: Vec<BlobItem> = container.list_blobs().try_collect().await.unwrap();
        blobs.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].name, "q2.pdf");
        assert_eq!(blobs[1].name, "reports/q1.pdf");
        assert_eq!(blobs[1].size, 2);
        assert_eq!(container.download(&blobs[1]).await.unwrap().as_ref(), b"q1");
    }

    #[test]
    fn builds_azure_store_from_account_key() {
        let connection: ConnectionString =
            "AccountName=docs;AccountKey=ZmFrZWtleQ==".parse().unwrap();
        assert!(build_azure_store(&connection, "container").is_ok());
    }

    #[test]
    fn builds_azure_store_from_sas_connection_string() {
        let container = BlobContainer::from_config(&StorageConfig {
            connection_string: concat!(
                "BlobEndpoint=https://docs.blob.core.windows.net/;",
                "SharedAccessSignature=sv=2022-11-02&sp=rl&sig=abc%3D"
            )
            .into(),
            container_name: "incoming".into(),
        })
        .expect("SAS connection string");
        assert_eq!(container.name(), "incoming");
    }
}
