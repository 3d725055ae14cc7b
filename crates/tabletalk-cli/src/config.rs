//! Environment-driven configuration.
//!
//! All settings come from environment variables (a `.env` file is honored via
//! dotenvy in `main`). The resulting `Config` is constructed once and handed
//! to the service clients explicitly; nothing reads the environment after
//! startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Settings for the OpenAI-compatible model service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL of the service, e.g. Ollama's `http://127.0.0.1:11434/v1`.
    pub base_url: String,
    pub api_key: String,
    /// Chat model used for SQL generation and answer synthesis.
    pub model: String,
    /// Model used for schema and question embeddings.
    pub embedding_model: String,
    /// Per-request timeout applied to every service round trip.
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// How many tables the retriever hands to the query engine. Too low risks
    /// dropping a table a join needs; too high buries the model in noise.
    pub top_k: usize,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    pub store: StoreConfig,
    pub retrieval: RetrievalConfig,
}

impl Config {
    /// Environment variables:
    /// - `TABLETALK_MODEL` (required): chat model identifier
    /// - `TABLETALK_BASE_URL`: service base URL (default Ollama's /v1 endpoint)
    /// - `TABLETALK_API_KEY`: bearer token, if the service wants one
    /// - `TABLETALK_EMBEDDING_MODEL`: embedding model identifier
    /// - `TABLETALK_TIMEOUT_SECS`: per-request timeout in seconds
    /// - `TABLETALK_DB_PATH`, `TABLETALK_DATA_DIR`: store file and CSV directory
    /// - `TABLETALK_TOP_K`: candidate table count per question
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            service: ServiceConfig {
                base_url: var_or("TABLETALK_BASE_URL", "http://127.0.0.1:11434/v1"),
                api_key: var_or("TABLETALK_API_KEY", "local"),
                model: require("TABLETALK_MODEL")?,
                embedding_model: var_or("TABLETALK_EMBEDDING_MODEL", "bge-small-en-v1.5"),
                timeout: Duration::from_secs(parse_var("TABLETALK_TIMEOUT_SECS", 360)?),
            },
            store: StoreConfig {
                db_path: PathBuf::from(var_or("TABLETALK_DB_PATH", "data/tabletalk.db")),
                data_dir: PathBuf::from(var_or("TABLETALK_DATA_DIR", "data")),
            },
            retrieval: RetrievalConfig {
                top_k: parse_var("TABLETALK_TOP_K", 3)?,
            },
        })
    }
}

fn require(var: &str) -> Result<String, ConfigError> {
    std::env::var(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
}

fn var_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(var: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var: var.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment variables are process-global, so defaults, overrides and
    // error paths are exercised in one sequential test.
    #[test]
    fn from_env_defaults_overrides_and_errors() {
        std::env::remove_var("TABLETALK_MODEL");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(var) if var == "TABLETALK_MODEL"));

        std::env::set_var("TABLETALK_MODEL", "qwen2.5-coder");
        let config = Config::from_env().unwrap();
        assert_eq!(config.service.model, "qwen2.5-coder");
        assert_eq!(config.service.base_url, "http://127.0.0.1:11434/v1");
        assert_eq!(config.service.timeout, Duration::from_secs(360));
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.store.data_dir, PathBuf::from("data"));

        std::env::set_var("TABLETALK_TOP_K", "5");
        std::env::set_var("TABLETALK_TIMEOUT_SECS", "30");
        let config = Config::from_env().unwrap();
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.service.timeout, Duration::from_secs(30));

        std::env::set_var("TABLETALK_TOP_K", "not-a-number");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var, .. } if var == "TABLETALK_TOP_K"));

        std::env::remove_var("TABLETALK_TOP_K");
        std::env::remove_var("TABLETALK_TIMEOUT_SECS");
        std::env::remove_var("TABLETALK_MODEL");
    }
}
