use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub llm: LlmConfig,
    pub cache: CacheConfig,
    pub limiter: LimiterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_request_body_size: usize,
}

/// Upstream recipe provider (complexSearch / information endpoints)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_seconds: u64,
    pub default_results: u32,
    pub max_results: u32,
}

/// Language model vendor (chat completions + embeddings)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    pub window_seconds: u64,
    pub max_requests: i64,
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:./data/mealplan.db".to_string());

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid PORT value".to_string()))?;

        let max_request_body_size = std::env::var("MAX_REQUEST_BODY_SIZE")
            .unwrap_or_else(|_| "1048576".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid MAX_REQUEST_BODY_SIZE value".to_string()))?;

        let provider_api_key = std::env::var("PROVIDER_API_KEY").unwrap_or_default();
        let provider_base_url = std::env::var("PROVIDER_BASE_URL")
            .unwrap_or_else(|_| "https://api.spoonacular.com".to_string());
        let provider_timeout = std::env::var("PROVIDER_TIMEOUT")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid PROVIDER_TIMEOUT value".to_string()))?;
        let default_results = std::env::var("PROVIDER_DEFAULT_RESULTS")
            .unwrap_or_else(|_| "6".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid PROVIDER_DEFAULT_RESULTS value".to_string()))?;
        let max_results = std::env::var("PROVIDER_MAX_RESULTS")
            .unwrap_or_else(|_| "25".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid PROVIDER_MAX_RESULTS value".to_string()))?;

        let llm_api_key = std::env::var("LLM_API_KEY").unwrap_or_default();
        let llm_base_url = std::env::var("LLM_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let chat_model =
            std::env::var("LLM_CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let embedding_model = std::env::var("LLM_EMBEDDING_MODEL")
            .unwrap_or_else(|_| "text-embedding-3-small".to_string());
        let embedding_dimensions = std::env::var("LLM_EMBEDDING_DIMENSIONS")
            .unwrap_or_else(|_| "1536".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid LLM_EMBEDDING_DIMENSIONS value".to_string()))?;
        let llm_timeout = std::env::var("LLM_TIMEOUT")
            .unwrap_or_else(|_| "20".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid LLM_TIMEOUT value".to_string()))?;

        let cache_ttl = std::env::var("CACHE_TTL")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid CACHE_TTL value".to_string()))?;

        let window_seconds = std::env::var("RATE_LIMIT_WINDOW")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid RATE_LIMIT_WINDOW value".to_string()))?;
        let max_requests = std::env::var("RATE_LIMIT_MAX_REQUESTS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid RATE_LIMIT_MAX_REQUESTS value".to_string()))?;

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "25".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid DATABASE_MAX_CONNECTIONS value".to_string()))?;

        let min_connections = std::env::var("DATABASE_MIN_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid DATABASE_MIN_CONNECTIONS value".to_string()))?;

        let connection_timeout_seconds = std::env::var("DATABASE_CONNECTION_TIMEOUT")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid DATABASE_CONNECTION_TIMEOUT value".to_string()))?;

        let idle_timeout_seconds = std::env::var("DATABASE_IDLE_TIMEOUT")
            .unwrap_or_else(|_| "600".to_string())
            .parse()
            .map_err(|_| Error::Config("Invalid DATABASE_IDLE_TIMEOUT value".to_string()))?;

        Ok(Settings {
            database: DatabaseConfig {
                url: database_url,
                max_connections,
                min_connections,
                connection_timeout_seconds,
                idle_timeout_seconds,
            },
            server: ServerConfig {
                host,
                port,
                max_request_body_size,
            },
            provider: ProviderConfig {
                api_key: provider_api_key,
                base_url: provider_base_url,
                timeout_seconds: provider_timeout,
                default_results,
                max_results,
            },
            llm: LlmConfig {
                api_key: llm_api_key,
                base_url: llm_base_url,
                chat_model,
                embedding_model,
                embedding_dimensions,
                timeout_seconds: llm_timeout,
            },
            cache: CacheConfig {
                ttl_seconds: cache_ttl,
            },
            limiter: LimiterConfig {
                window_seconds,
                max_requests,
            },
        })
    }

    /// Validate configuration. Missing credentials are fatal at startup,
    /// not discovered one failed request at a time.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("Port must be non-zero".to_string()));
        }

        if self.provider.api_key.is_empty() {
            return Err(Error::Config(
                "PROVIDER_API_KEY is not set - the recipe provider requires a credential"
                    .to_string(),
            ));
        }

        if self.llm.api_key.is_empty() {
            return Err(Error::Config(
                "LLM_API_KEY is not set - translation and embeddings require a credential"
                    .to_string(),
            ));
        }

        if self.limiter.window_seconds == 0 || self.limiter.max_requests == 0 {
            return Err(Error::Config(
                "Rate limit window and request count must be non-zero".to_string(),
            ));
        }

        if self.llm.embedding_dimensions == 0 {
            return Err(Error::Config(
                "Embedding dimensions must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}
