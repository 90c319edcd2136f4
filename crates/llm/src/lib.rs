//! Model plumbing for stlc: text generation and embedding providers.

pub mod embedding;
pub mod http;
pub mod provider;

pub use embedding::{EmbeddingProvider, HashingEmbedder, HttpEmbedder};
pub use http::{HttpProvider, ProviderKind};
pub use provider::{CompletionRequest, CompletionResponse, LlmError, LlmProvider, MockProvider};
