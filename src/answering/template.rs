use async_trait::async_trait;

use super::{AnswerRequest, AnsweringClient, AnsweringClientError};

const CONTEXT_PREVIEW_CHARS: usize = 500;

/// Deterministic answer that restates the question and quotes the leading context.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateAnsweringClient;

impl TemplateAnsweringClient {
    /// Create a template provider.
    pub const fn new() -> Self {
        Self
    }

    fn render(request: &AnswerRequest) -> String {
        let joined = request.context.join("\n\n");
        let preview = match joined.char_indices().nth(CONTEXT_PREVIEW_CHARS) {
            Some((offset, _)) => format!("{}...", &joined[..offset]),
            None => joined,
        };
        let passages = request.context.len();
        let noun = if passages == 1 { "passage" } else { "passages" };
        format!(
            "Answer to \"{}\": found {passages} relevant {noun} in the uploaded documents.\n\n{preview}",
            request.question
        )
    }
}

#[async_trait]
impl AnsweringClient for TemplateAnsweringClient {
    async fn generate_answer(&self, request: AnswerRequest) -> Result<String, AnsweringClientError> {
        Ok(Self::render(&request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(context: Vec<String>) -> AnswerRequest {
        AnswerRequest {
            question: "How long do refunds take?".into(),
            context,
            model: "template".into(),
        }
    }

    #[test]
    fn mentions_question_and_passage_count() {
        let answer = TemplateAnsweringClient::render(&request(vec![
            "[Document 1] Refunds take 5 days.".into(),
            "[Document 2] Contact support.".into(),
        ]));
        assert!(answer.starts_with("Answer to \"How long do refunds take?\""));
        assert!(answer.contains("found 2 relevant passages"));
        assert!(answer.ends_with("[Document 1] Refunds take 5 days.\n\n[Document 2] Contact support."));
    }

    #[test]
    fn quotes_at_most_the_leading_context() {
        let answer = TemplateAnsweringClient::render(&request(vec!["x".repeat(900)]));
        assert!(answer.contains("found 1 relevant passage "));
        assert!(answer.ends_with(&format!("{}...", "x".repeat(CONTEXT_PREVIEW_CHARS))));
        assert!(!answer.contains(&"x".repeat(CONTEXT_PREVIEW_CHARS + 1)));
    }
}
