//! Text embedding providers.
//!
//! `HashingEmbedder` is a local, deterministic feature-hashing embedder that
//! needs no network or model weights. `HttpEmbedder` calls an
//! OpenAI-compatible `/embeddings` endpoint (OpenAI or a local Ollama server).

use crate::http::check_error;
use crate::provider::LlmError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Default dimension for the hashing embedder.
pub const DEFAULT_HASH_DIM: usize = 512;

/// Trait for embedding backends. One call embeds a whole batch; the output
/// has one vector per input, in input order, all of the same length.
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    fn embed(
        &self,
        inputs: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send + '_>>;
}

/// Bag-of-words embedder using FNV-1a feature hashing.
///
/// Tokens are lower-cased alphanumeric runs (any script) with a trailing
/// plural `s` stripped. Each token adds 1.0 to bucket `fnv1a(token) % dim`. FNV is used
/// instead of `DefaultHasher` so vectors are stable across toolchains.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dim: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIM)
    }
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embed a single text. Same input always yields the same output.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        for token in tokenize(text) {
            let bucket = (fnv1a(token.as_bytes()) % self.dim as u64) as usize;
            v[bucket] += 1.0;
        }
        v
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn name(&self) -> &str {
        "hashing"
    }

    fn embed(
        &self,
        inputs: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send + '_>> {
        let out: Vec<Vec<f32>> = inputs.iter().map(|t| self.embed_one(t)).collect();
        Box::pin(async move { Ok(out) })
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let w = w.to_lowercase();
            if w.len() > 3 && w.ends_with('s') && !w.ends_with("ss") {
                w[..w.len() - 1].to_owned()
            } else {
                w
            }
        })
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

// ── OpenAI-compatible /embeddings ──

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

/// Embedding provider backed by an OpenAI-compatible HTTP endpoint.
pub struct HttpEmbedder {
    label: String,
    model: String,
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpEmbedder {
    pub fn new(label: impl Into<String>, model: String, api_key: Option<String>, base_url: String) -> Self {
        Self {
            label: label.into(),
            model,
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }

    async fn embed_batch(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, LlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let body = EmbeddingRequest { model: &self.model, input: &inputs };
        let mut builder = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            builder = builder.bearer_auth(key);
        }
        let resp = builder
            .send()
            .await
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(check_error(status, text));
        }

        tracing::debug!(embedder = %self.label, inputs = inputs.len(), "embeddings received");
        let api: EmbeddingResponse = resp.json().await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        order_embeddings(api.data, inputs.len())
    }
}

/// Reorder response vectors by their `index` and check the batch is complete.
fn order_embeddings(mut data: Vec<EmbeddingDatum>, expected: usize) -> Result<Vec<Vec<f32>>, LlmError> {
    if data.len() != expected {
        return Err(LlmError::InvalidResponse(format!(
            "expected {expected} embeddings, got {}",
            data.len()
        )));
    }
    data.sort_by_key(|d| d.index);
    if data.iter().enumerate().any(|(i, d)| d.index != i) {
        return Err(LlmError::InvalidResponse("embedding indices are not contiguous".into()));
    }
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

impl EmbeddingProvider for HttpEmbedder {
    fn name(&self) -> &str {
        &self.label
    }

    fn embed(
        &self,
        inputs: Vec<String>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send + '_>> {
        Box::pin(self.embed_batch(inputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let e = HashingEmbedder::default();
        assert_eq!(e.embed_one("hello world"), e.embed_one("hello world"));
    }

    #[test]
    fn correct_dimension() {
        let e = HashingEmbedder::new(64);
        assert_eq!(e.embed_one("test input").len(), 64);
        assert_eq!(HashingEmbedder::new(0).dim(), 1);
    }

    #[test]
    fn empty_input_is_zero_vector() {
        let v = HashingEmbedder::default().embed_one("  --  ");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn case_and_plural_insensitive() {
        let e = HashingEmbedder::default();
        assert_eq!(e.embed_one("User logs in"), e.embed_one("user LOG in"));
        // double-s words keep their ending
        assert_ne!(e.embed_one("pass"), e.embed_one("pas"));
    }

    #[test]
    fn non_ascii_words_are_tokens() {
        let e = HashingEmbedder::default();
        assert!(e.embed_one("用户登录").iter().any(|x| *x > 0.0));
        assert_eq!(e.embed_one("Größe"), e.embed_one("größe"));
        assert_ne!(e.embed_one("größe"), e.embed_one("gr e"));
    }

    #[test]
    fn fnv_matches_reference_vector() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[tokio::test]
    async fn batch_embed_preserves_order() {
        let e = HashingEmbedder::default();
        let out = e.embed(vec!["alpha".into(), "beta".into()]).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], e.embed_one("alpha"));
        assert_eq!(out[1], e.embed_one("beta"));
    }

    #[test]
    fn http_embedder_endpoint() {
        let e = HttpEmbedder::new("ollama", "nomic-embed-text".into(), None, "http://localhost:11434/v1/".into());
        assert_eq!(e.endpoint(), "http://localhost:11434/v1/embeddings");
        assert_eq!(e.name(), "ollama");
    }

    #[test]
    fn response_vectors_are_reordered_by_index() {
        let data = vec![
            EmbeddingDatum { index: 1, embedding: vec![2.0] },
            EmbeddingDatum { index: 0, embedding: vec![1.0] },
        ];
        assert_eq!(order_embeddings(data, 2).unwrap(), vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn short_response_is_rejected() {
        let data = vec![EmbeddingDatum { index: 0, embedding: vec![1.0] }];
        assert!(matches!(order_embeddings(data, 2), Err(LlmError::InvalidResponse(_))));
    }
}
