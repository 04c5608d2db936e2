//! Parsing of storage account connection strings.

use super::StorageError;
use reqwest::Url;
use std::str::FromStr;

const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Fields recognized in a `Key=Value;Key=Value` storage connection string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionString {
    /// `AccountName`.
    pub account_name: Option<String>,
    /// `AccountKey` (base64 shared key).
    pub account_key: Option<String>,
    /// `BlobEndpoint` override.
    pub blob_endpoint: Option<String>,
    /// `EndpointSuffix`, `core.windows.net` when absent.
    pub endpoint_suffix: Option<String>,
    /// `DefaultEndpointsProtocol`, `https` when absent.
    pub protocol: Option<String>,
    /// `SharedAccessSignature` query string.
    pub shared_access_signature: Option<String>,
    /// `UseDevelopmentStorage=true`.
    pub use_development_storage: bool,
}

impl FromStr for ConnectionString {
    type Err = StorageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parsed = Self::default();
        for segment in value.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            // Values such as AccountKey and SAS tokens legitimately contain '='.
            let (key, val) = segment.split_once('=').ok_or_else(|| {
                StorageError::InvalidConnectionString(format!("segment without '=': {segment}"))
            })?;
            let val = val.trim().to_string();
            match key.trim().to_ascii_lowercase().as_str() {
                "accountname" => parsed.account_name = Some(val),
                "accountkey" => parsed.account_key = Some(val),
                "blobendpoint" => parsed.blob_endpoint = Some(val),
                "endpointsuffix" => parsed.endpoint_suffix = Some(val),
                "defaultendpointsprotocol" => parsed.protocol = Some(val),
                "sharedaccesssignature" => parsed.shared_access_signature = Some(val),
                "usedevelopmentstorage" => {
                    parsed.use_development_storage = val.eq_ignore_ascii_case("true")
                }
                other => tracing::debug!(key = other, "Ignoring connection string key"),
            }
        }

        if parsed.account_name.is_none() {
            parsed.account_name = parsed
                .blob_endpoint
                .as_deref()
                .and_then(account_from_endpoint);
        }
        if !parsed.use_development_storage && parsed.account_name.is_none() {
            return Err(StorageError::InvalidConnectionString(
                "AccountName or a BlobEndpoint naming the account is required".into(),
            ));
        }
        if !parsed.use_development_storage
            && parsed.account_key.is_none()
            && parsed.shared_access_signature.is_none()
        {
            return Err(StorageError::InvalidConnectionString(
                "either AccountKey or SharedAccessSignature is required".into(),
            ));
        }
        Ok(parsed)
    }
}

impl ConnectionString {
    /// Explicit blob endpoint, or one derived from a non-default protocol or suffix.
    pub fn endpoint(&self) -> Option<String> {
        if let Some(endpoint) = &self.blob_endpoint {
            return Some(endpoint.trim_end_matches('/').to_string());
        }
        let protocol = self.protocol.as_deref().unwrap_or("https");
        let suffix = self
            .endpoint_suffix
            .as_deref()
            .unwrap_or(DEFAULT_ENDPOINT_SUFFIX);
        if protocol.eq_ignore_ascii_case("https") && suffix == DEFAULT_ENDPOINT_SUFFIX {
            return None;
        }
        let account = self.account_name.as_deref()?;
        Some(format!("{protocol}://{account}.blob.{suffix}"))
    }

    /// Decoded `(name, value)` pairs of the shared access signature.
    pub fn sas_pairs(&self) -> Result<Option<Vec<(String, String)>>, StorageError> {
        let Some(sas) = self.shared_access_signature.as_deref() else {
            return Ok(None);
        };
        let url = Url::parse(&format!("https://sas.invalid/?{}", sas.trim_start_matches('?')))
            .map_err(|err| StorageError::InvalidConnectionString(err.to_string()))?;
        Ok(Some(
            url.query_pairs()
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect(),
        ))
    }
}

/// First host label of `https://{account}.blob.{suffix}`.
fn account_from_endpoint(endpoint: &str) -> Option<String> {
    let url = Url::parse(endpoint).ok()?;
    let account = url.host_str()?.split('.').next()?;
    (!account.is_empty()).then(|| account.to_string())
}
