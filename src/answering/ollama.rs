use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{AnswerRequest, AnsweringClient, AnsweringClientError};

/// Answering provider backed by a local Ollama runtime.
pub struct OllamaAnsweringClient {
    http: Client,
    base_url: String,
}

impl OllamaAnsweringClient {
    /// Build a client for the runtime at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, AnsweringClientError> {
        let http = Client::builder()
            .user_agent("docrag/answer")
            .build()
            .map_err(|error| {
                AnsweringClientError::ProviderUnavailable(format!(
                    "failed to construct HTTP client: {error}"
                ))
            })?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

fn build_prompt(request: &AnswerRequest) -> String {
    format!(
        "Answer the question using only the documents below. \
         If they do not contain the answer, say that the information is not available.\n\n\
         Documents:\n{}\n\nQuestion: {}\nAnswer:",
        request.context.join("\n\n"),
        request.question
    )
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl AnsweringClient for OllamaAnsweringClient {
    async fn generate_answer(&self, request: AnswerRequest) -> Result<String, AnsweringClientError> {
        let payload = json!({
            "model": request.model,
            "prompt": build_prompt(&request),
            "stream": false,
            "options": {
                "temperature": 0.1,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                AnsweringClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AnsweringClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AnsweringClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            AnsweringClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(AnsweringClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        let answer = body.response.trim();
        if answer.is_empty() {
            return Err(AnsweringClientError::InvalidResponse(
                "Ollama returned an empty answer".into(),
            ));
        }
        Ok(answer.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn request() -> AnswerRequest {
        AnswerRequest {
            question: "What is the refund window?".into(),
            context: vec!["[Document 1] Refunds are accepted within 30 days.".into()],
            model: "llama3.2".into(),
        }
    }

    #[tokio::test]
    async fn posts_grounded_prompt_and_trims_answer() {
        let server = MockServer::start_async().await;
        let client = OllamaAnsweringClient::new(server.base_url()).expect("client");

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .body_contains("[Document 1] Refunds are accepted within 30 days.")
                    .body_contains("\"stream\":false");
                then.status(200).json_body(json!({
                    "response": "  Thirty days.\n",
                    "done": true
                }));
            })
            .await;

        let answer = client.generate_answer(request()).await.expect("answer");

        mock.assert();
        assert_eq!(answer, "Thirty days.");
    }

    #[tokio::test]
    async fn error_status_maps_to_generation_failure() {
        let server = MockServer::start_async().await;
        let client = OllamaAnsweringClient::new(server.base_url()).expect("client");

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = client
            .generate_answer(request())
            .await
            .expect_err("error response");
        assert!(
            matches!(error, AnsweringClientError::GenerationFailed(message) if message.contains("500"))
        );
    }

    #[tokio::test]
    async fn missing_endpoint_is_reported_as_unavailable() {
        let server = MockServer::start_async().await;
        let client = OllamaAnsweringClient::new(format!("{}/", server.base_url())).expect("client");

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(404);
            })
            .await;

        let error = client.generate_answer(request()).await.unwrap_err();
        assert!(matches!(error, AnsweringClientError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn incomplete_response_is_rejected() {
        let server = MockServer::start_async().await;
        let client = OllamaAnsweringClient::new(server.base_url()).expect("client");

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({ "response": "partial", "done": false }));
            })
            .await;

        let error = client.generate_answer(request()).await.unwrap_err();
        assert!(matches!(error, AnsweringClientError::InvalidResponse(_)));
    }
}
