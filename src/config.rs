use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Combination of values is not usable by the splitter.
    #[error("Inconsistent configuration: {0}")]
    Inconsistent(String),
}

/// Runtime configuration for the ingestion and retrieval service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Target overlap in characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Search limit applied when the caller does not provide one.
    pub search_default_limit: usize,
    /// Upper bound applied to caller supplied search limits.
    pub search_max_limit: usize,
    /// Default number of chunks retrieved to answer a question.
    pub answer_default_max_chunks: usize,
    /// Soft cap, in characters, on the context handed to the answering provider.
    pub answer_context_char_cap: usize,
    /// Length of the content excerpt attached to answer sources.
    pub source_excerpt_chars: usize,
    /// Length of the content excerpt attached to document previews.
    pub preview_excerpt_chars: usize,
    /// Memory budget for the full-text index writer.
    pub index_heap_bytes: usize,
    /// Provider that turns retrieved context into an answer.
    pub answering_provider: AnsweringProvider,
    /// Model identifier passed to the answering provider.
    pub answering_model: String,
    /// Optional base URL for a local Ollama runtime.
    pub ollama_url: Option<String>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported answering backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnsweringProvider {
    /// Deterministic templated answer built from the retrieved context.
    #[default]
    Template,
    /// Local Ollama runtime.
    Ollama,
}

/// Smallest writer budget the index accepts for a single indexing thread.
pub const MIN_INDEX_HEAP_BYTES: usize = 15_000_000;

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            search_default_limit: 10,
            search_max_limit: 100,
            answer_default_max_chunks: 5,
            answer_context_char_cap: 4000,
            source_excerpt_chars: 200,
            preview_excerpt_chars: 300,
            index_heap_bytes: 50_000_000,
            answering_provider: AnsweringProvider::Template,
            answering_model: "llama3.2".into(),
            ollama_url: None,
            server_port: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    ///
    /// Every variable is optional; unset or blank values keep the defaults from [`Config::default`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            chunk_size: parse_optional("RAG_CHUNK_SIZE")?.unwrap_or(defaults.chunk_size),
            chunk_overlap: parse_optional("RAG_CHUNK_OVERLAP")?.unwrap_or(defaults.chunk_overlap),
            search_default_limit: parse_optional("RAG_SEARCH_DEFAULT_LIMIT")?
                .unwrap_or(defaults.search_default_limit),
            search_max_limit: parse_optional("RAG_SEARCH_MAX_LIMIT")?
                .unwrap_or(defaults.search_max_limit),
            answer_default_max_chunks: parse_optional("RAG_ANSWER_MAX_CHUNKS")?
                .unwrap_or(defaults.answer_default_max_chunks),
            answer_context_char_cap: parse_optional("RAG_ANSWER_CONTEXT_CHARS")?
                .unwrap_or(defaults.answer_context_char_cap),
            source_excerpt_chars: parse_optional("RAG_SOURCE_EXCERPT_CHARS")?
                .unwrap_or(defaults.source_excerpt_chars),
            preview_excerpt_chars: parse_optional("RAG_PREVIEW_EXCERPT_CHARS")?
                .unwrap_or(defaults.preview_excerpt_chars),
            index_heap_bytes: parse_optional::<usize>("RAG_INDEX_HEAP_BYTES")?
                .unwrap_or(defaults.index_heap_bytes)
                .max(MIN_INDEX_HEAP_BYTES),
            answering_provider: parse_optional("ANSWERING_PROVIDER")?
                .unwrap_or(defaults.answering_provider),
            answering_model: load_env_optional("ANSWERING_MODEL")
                .unwrap_or(defaults.answering_model),
            ollama_url: load_env_optional("OLLAMA_URL"),
            server_port: parse_optional("SERVER_PORT")?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations the splitter cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue("RAG_CHUNK_SIZE".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::Inconsistent(format!(
                "RAG_CHUNK_OVERLAP ({}) must be smaller than RAG_CHUNK_SIZE ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.search_max_limit == 0 {
            return Err(ConfigError::InvalidValue("RAG_SEARCH_MAX_LIMIT".into()));
        }
        Ok(())
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl FromStr for AnsweringProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "template" | "none" => Ok(Self::Template),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        answering_provider = ?config.answering_provider,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let config = Config {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Inconsistent(_))
        ));
    }

    #[test]
    fn answering_provider_parses_case_insensitively() {
        assert_eq!("Ollama".parse(), Ok(AnsweringProvider::Ollama));
        assert_eq!("template".parse(), Ok(AnsweringProvider::Template));
        assert!("openai".parse::<AnsweringProvider>().is_err());
    }
}
