use std::env;
use thiserror::Error;

/// Default REST API version for the search service.
pub const DEFAULT_SEARCH_API_VERSION: &str = "2023-11-01";
/// Default REST API version for the document-analysis service.
pub const DEFAULT_ANALYSIS_API_VERSION: &str = "2022-08-31";
/// Default embedding model identifier.
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
/// Default dimensionality of the embedding model output.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;
/// Default token budget applied before embedding.
pub const DEFAULT_EMBEDDING_MAX_TOKENS: usize = 512;
/// Default port used by the query service.
pub const DEFAULT_SERVER_PORT: u16 = 5000;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Process that is loading configuration; decides which sections are mandatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// Index schema provisioner.
    Provisioner,
    /// Blob ingestion pipeline.
    Ingestion,
    /// HTTP query service. `force_dev_mode` ORs with the `DEV_MODE` variable.
    QueryService {
        /// Enable development mode regardless of the environment.
        force_dev_mode: bool,
    },
}

/// Runtime configuration shared by the three binaries.
#[derive(Debug, Clone)]
pub struct Config {
    /// Search service connection; absent only when the query service runs in dev mode.
    pub search: Option<SearchConfig>,
    /// Blob storage connection; loaded for ingestion only.
    pub storage: Option<StorageConfig>,
    /// Document-analysis connection; loaded for ingestion only.
    pub analysis: Option<AnalysisConfig>,
    /// Embedding settings; loaded for ingestion and provisioning.
    pub embedding: EmbeddingConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
}

/// Connection settings for the managed search service.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Service endpoint, e.g. `https://my-search.search.windows.net`.
    pub endpoint: String,
    /// Admin or query key sent in the `api-key` header.
    pub api_key: String,
    /// Name of the index holding document records.
    pub index_name: String,
    /// REST API version passed as `api-version`.
    pub api_version: String,
}

/// Connection settings for the source blob container.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage account connection string.
    pub connection_string: String,
    /// Container listed by the ingestion pipeline.
    pub container_name: String,
}

/// Connection settings for the document-analysis service.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Service endpoint, e.g. `https://my-fr.cognitiveservices.azure.com`.
    pub endpoint: String,
    /// Subscription key sent in `Ocp-Apim-Subscription-Key`.
    pub api_key: String,
    /// REST API version passed as `api-version`.
    pub api_version: String,
    /// Delay between polls of a running analysis when the service gives no `Retry-After`.
    pub poll_interval_ms: u64,
    /// Upper bound on polls before an analysis is abandoned.
    pub max_polls: u32,
}

/// Embedding backend selection and model parameters.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Backend producing vectors.
    pub provider: EmbeddingProvider,
    /// Feature-extraction endpoint (required for [`EmbeddingProvider::FeatureExtraction`]).
    pub url: Option<String>,
    /// Optional bearer token for the feature-extraction endpoint.
    pub api_key: Option<String>,
    /// Model identifier, also used to pick the tokenizer.
    pub model: String,
    /// Length of every produced vector; also the index schema dimension.
    pub dimension: usize,
    /// Token budget applied before the text is embedded.
    pub max_tokens: usize,
}

/// HTTP server settings for the query service.
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    /// Port bound on all interfaces.
    pub port: u16,
    /// Serve canned results without touching remote services.
    pub dev_mode: bool,
}

/// Supported embedding backends for the ingestion pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Remote model returning per-token hidden states, mean-pooled locally.
    FeatureExtraction,
    /// Deterministic byte-hashing embedder for local runs without a model.
    Hash,
}

impl Config {
    /// Load configuration from environment variables, requiring only what `component` uses.
    pub fn from_env(component: Component) -> Result<Self, ConfigError> {
        let server = ServerConfig::from_env()?;
        let server = match component {
            Component::QueryService { force_dev_mode } => ServerConfig {
                dev_mode: server.dev_mode || force_dev_mode,
                ..server
            },
            _ => server,
        };

        let search = match component {
            Component::QueryService { .. } if server.dev_mode => None,
            _ => Some(SearchConfig::from_env()?),
        };

        let (storage, analysis) = match component {
            Component::Ingestion => (
                Some(StorageConfig::from_env()?),
                Some(AnalysisConfig::from_env()?),
            ),
            _ => (None, None),
        };

        let embedding = EmbeddingConfig::from_env()?;
        if component == Component::Ingestion
            && embedding.provider == EmbeddingProvider::FeatureExtraction
            && embedding.url.is_none()
        {
            return Err(ConfigError::MissingVariable("EMBEDDING_URL".into()));
        }

        Ok(Self {
            search,
            storage,
            analysis,
            embedding,
            server,
        })
    }
}

impl SearchConfig {
    /// Load the search service section.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: load_env("SEARCH_SERVICE_ENDPOINT")?,
            api_key: load_env("SEARCH_SERVICE_KEY")?,
            index_name: load_env("SEARCH_INDEX_NAME")?,
            api_version: load_env_optional("SEARCH_API_VERSION")
                .unwrap_or_else(|| DEFAULT_SEARCH_API_VERSION.to_string()),
        })
    }
}

impl StorageConfig {
    /// Load the blob storage section.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            connection_string: load_env("STORAGE_CONNECTION_STRING")?,
            container_name: load_env("CONTAINER_NAME")?,
        })
    }
}

impl AnalysisConfig {
    /// Load the document-analysis section.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: load_env("FORM_RECOGNIZER_ENDPOINT")?,
            api_key: load_env("FORM_RECOGNIZER_KEY")?,
            api_version: load_env_optional("FORM_RECOGNIZER_API_VERSION")
                .unwrap_or_else(|| DEFAULT_ANALYSIS_API_VERSION.to_string()),
            poll_interval_ms: load_parsed("ANALYSIS_POLL_INTERVAL_MS")?.unwrap_or(1000),
            max_polls: load_parsed("ANALYSIS_MAX_POLLS")?.unwrap_or(300),
        })
    }
}

impl EmbeddingConfig {
    /// Load the embedding section; every value has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider = match load_env_optional("EMBEDDING_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".into()))?,
            None => EmbeddingProvider::FeatureExtraction,
        };
        let dimension = load_parsed("EMBEDDING_DIMENSION")?.unwrap_or(DEFAULT_EMBEDDING_DIMENSION);
        if dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }
        let max_tokens =
            load_parsed("EMBEDDING_MAX_TOKENS")?.unwrap_or(DEFAULT_EMBEDDING_MAX_TOKENS);
        if max_tokens == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_MAX_TOKENS".into()));
        }

        Ok(Self {
            provider,
            url: load_env_optional("EMBEDDING_URL"),
            api_key: load_env_optional("EMBEDDING_API_KEY"),
            model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            dimension,
            max_tokens,
        })
    }
}

impl ServerConfig {
    /// Load the server section; every value has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let dev_mode = match load_env_optional("DEV_MODE") {
            Some(value) => {
                parse_flag(&value).ok_or_else(|| ConfigError::InvalidValue("DEV_MODE".into()))?
            }
            None => false,
        };
        Ok(Self {
            port: load_parsed("SERVER_PORT")?.unwrap_or(DEFAULT_SERVER_PORT),
            dev_mode,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "feature-extraction" | "feature_extraction" => Ok(Self::FeatureExtraction),
            "hash" => Ok(Self::Hash),
            _ => Err(()),
        }
    }
}

/// Load `.env` (when present) and the configuration sections `component` needs.
pub fn init_config(component: Component) -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env(component)?;
    tracing::debug!(
        ?component,
        index = config.search.as_ref().map(|search| search.index_name.as_str()),
        container = config.storage.as_ref().map(|storage| storage.container_name.as_str()),
        embedding_provider = ?config.embedding.provider,
        dimension = config.embedding.dimension,
        dev_mode = config.server.dev_mode,
        "Loaded configuration"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flag_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 1 "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn parses_embedding_provider_names() {
        assert_eq!(
            "feature-extraction".parse::<EmbeddingProvider>(),
            Ok(EmbeddingProvider::FeatureExtraction)
        );
        assert_eq!("Hash".parse::<EmbeddingProvider>(), Ok(EmbeddingProvider::Hash));
        assert!("ollama".parse::<EmbeddingProvider>().is_err());
    }
}
