//! Answering providers that turn a question plus retrieved context into answer text.
//!
//! Retrieval never depends on the provider: the composer hands over the question and the ranked,
//! already-bounded context and takes back plain text. The template provider is deterministic and
//! needs no runtime; the Ollama provider issues HTTP requests directly to a local runtime.

mod ollama;
mod template;

pub use ollama::OllamaAnsweringClient;
pub use template::TemplateAnsweringClient;

use crate::config::{AnsweringProvider, Config};
use async_trait::async_trait;
use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Errors surfaced while generating an answer.
#[derive(Debug, Error)]
pub enum AnsweringClientError {
    /// Provider was misconfigured or unreachable.
    #[error("Answering provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate answer: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Input handed to an answering provider.
#[derive(Debug, Clone)]
pub struct AnswerRequest {
    /// Normalized question text.
    pub question: String,
    /// Rank-labelled context entries, best first.
    pub context: Vec<String>,
    /// Model identifier understood by the provider.
    pub model: String,
}

/// Interface implemented by answering providers.
#[async_trait]
pub trait AnsweringClient: Send + Sync {
    /// Produce answer text for the request.
    async fn generate_answer(&self, request: AnswerRequest) -> Result<String, AnsweringClientError>;
}

/// Build the answering client selected by configuration.
pub fn get_answering_client(
    config: &Config,
) -> Result<Box<dyn AnsweringClient>, AnsweringClientError> {
    match config.answering_provider {
        AnsweringProvider::Template => Ok(Box::new(TemplateAnsweringClient::new())),
        AnsweringProvider::Ollama => {
            let base_url = config
                .ollama_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
            tracing::info!(base_url = %base_url, model = %config.answering_model, "Using Ollama answering provider");
            Ok(Box::new(OllamaAnsweringClient::new(base_url)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_configuration_selects_template_provider() {
        let client = get_answering_client(&Config::default()).expect("client");
        let answer = client
            .generate_answer(AnswerRequest {
                question: "What is the refund window?".into(),
                context: vec!["[Document 1] Refunds within 30 days.".into()],
                model: "unused".into(),
            })
            .await
            .expect("answer");
        assert!(answer.contains("What is the refund window?"));
    }

    #[test]
    fn ollama_provider_builds_without_contacting_runtime() {
        let config = Config {
            answering_provider: AnsweringProvider::Ollama,
            ollama_url: Some("http://127.0.0.1:9".into()),
            ..Config::default()
        };
        assert!(get_answering_client(&config).is_ok());
    }
}
