//! Index provisioning: apply the document index schema to the search service.

use crate::search::{IndexSchema, SearchError, SearchService};

/// Create or update the index targeted by `service` with vectors of length `dimensions`.
///
/// Reapplying the same schema is a no-op on the service side. Errors are logged here and
/// returned so the caller can decide the exit status; nothing is retried.
pub async fn provision_index(
    service: &SearchService,
    dimensions: usize,
) -> Result<IndexSchema, SearchError> {
    let schema = IndexSchema::new(service.index_name(), dimensions);
    match service.create_or_update_index(&schema).await {
        Ok(()) => {
            tracing::info!(
                index = %schema.name,
                dimensions,
                "Index {} created successfully.",
                schema.name
            );
            Ok(schema)
        }
        Err(error) => {
            tracing::error!(index = %schema.name, error = %error, "Error creating index");
            Err(error)
        }
    }
}
