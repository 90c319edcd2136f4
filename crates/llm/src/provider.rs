use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

/// A single message in a prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    #[default]
    EndTurn,
    MaxTokens,
}

/// LLM completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    /// Single user-turn request, optionally preceded by a system message.
    pub fn prompt(system: Option<&str>, prompt: impl Into<String>, max_tokens: u32, temperature: f32) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(prompt));
        Self { messages, max_tokens, temperature }
    }

    /// Concatenated user-turn text, mostly useful for mocks and logging.
    pub fn user_text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// LLM completion response.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub stop_reason: StopReason,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Error type for model operations (generation and embedding).
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("rate limited")]
    RateLimited,
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Worth retrying. `RequestFailed` means the backend rejected the
    /// request itself, so sending it again gives the same answer.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::RequestFailed(_))
    }
}

/// Trait for text-generation backends (hosted APIs, local Ollama, mocks).
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    fn complete(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + '_>>;
}

/// Mock provider for testing — returns a fixed response and records prompts.
#[derive(Debug, Default)]
pub struct MockProvider {
    pub response: String,
    pub stop_reason: StopReason,
    prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            stop_reason: StopReason::EndTurn,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// User-turn text of every request seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn complete(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + '_>> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.user_text());
        }
        let content = self.response.clone();
        let stop = self.stop_reason;
        Box::pin(async move {
            Ok(CompletionResponse {
                content,
                stop_reason: stop,
                input_tokens: 10,
                output_tokens: 20,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_requests_are_not_transient() {
        assert!(LlmError::Unavailable("down".into()).is_transient());
        assert!(LlmError::RateLimited.is_transient());
        assert!(LlmError::InvalidResponse("empty".into()).is_transient());
        assert!(!LlmError::RequestFailed("400 Bad Request".into()).is_transient());
    }

    #[tokio::test]
    async fn mock_provider_returns_response() {
        let mock = MockProvider::new("✅ covered");
        let req = CompletionRequest::prompt(None, "hi", 100, 0.0);
        let resp = mock.complete(req).await.unwrap();
        assert_eq!(resp.content, "✅ covered");
        assert_eq!(resp.stop_reason, StopReason::EndTurn);
    }

    #[tokio::test]
    async fn mock_provider_records_user_prompts() {
        let mock = MockProvider::new("ok");
        let req = CompletionRequest::prompt(Some("be terse"), "first", 10, 0.0);
        mock.complete(req).await.unwrap();
        mock.complete(CompletionRequest::prompt(None, "second", 10, 0.0)).await.unwrap();
        assert_eq!(mock.prompts(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn prompt_builder_places_system_first() {
        let req = CompletionRequest::prompt(Some("sys"), "user text", 64, 0.2);
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, Role::System);
        assert_eq!(req.messages[1].role, Role::User);
        assert_eq!(req.user_text(), "user text");
    }
}
