//! Requirement → test-case matching by embedding cosine similarity.
//!
//! Ties resolve to the lowest candidate index. Scores are clamped to [0, 1]
//! and rounded to 3 decimals.

use std::sync::Arc;

use stlc_llm::EmbeddingProvider;

use crate::error::ValidationError;
use crate::types::{MatchResult, TestCase};

/// Matches requirements against a candidate set through a shared embedder.
#[derive(Clone)]
pub struct SimilarityMatcher {
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SimilarityMatcher {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder }
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    /// Embed every candidate once so many requirements can reuse them.
    pub async fn index(&self, candidates: &[TestCase]) -> Result<CandidateIndex, ValidationError> {
        if candidates.is_empty() {
            return Err(ValidationError::EmptyCandidateSet);
        }
        let texts: Vec<String> = candidates.iter().map(|c| c.description.clone()).collect();
        let vectors = self
            .embedder
            .embed(texts.clone())
            .await
            .map_err(|e| ValidationError::MatchUnavailable(e.to_string()))?;
        if vectors.len() != texts.len() {
            return Err(ValidationError::MatchUnavailable(format!(
                "embedder returned {} vectors for {} candidates",
                vectors.len(),
                texts.len()
            )));
        }
        tracing::debug!(
            embedder = self.embedder.name(),
            candidates = texts.len(),
            "candidate set embedded"
        );
        Ok(CandidateIndex {
            embedder: Arc::clone(&self.embedder),
            texts,
            vectors,
        })
    }

    /// One-shot match of a single requirement against `candidates`.
    pub async fn match_requirement(
        &self,
        requirement: &str,
        candidates: &[TestCase],
    ) -> Result<MatchResult, ValidationError> {
        self.index(candidates).await?.best_match(requirement).await
    }
}

/// Candidate texts with their precomputed embeddings.
pub struct CandidateIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    texts: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

impl std::fmt::Debug for CandidateIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateIndex")
            .field("embedder", &self.embedder.name())
            .field("candidates", &self.texts.len())
            .finish()
    }
}

impl CandidateIndex {
    /// Best candidate for `requirement`. Only the requirement is embedded.
    pub async fn best_match(&self, requirement: &str) -> Result<MatchResult, ValidationError> {
        let query = self
            .embedder
            .embed(vec![requirement.to_owned()])
            .await
            .map_err(|e| ValidationError::MatchUnavailable(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| ValidationError::MatchUnavailable("embedder returned no vector".into()))?;

        let scores: Vec<f64> = self.vectors.iter().map(|v| cosine(&query, v)).collect();
        let index = argmax_first(&scores).ok_or(ValidationError::EmptyCandidateSet)?;
        Ok(MatchResult {
            index,
            matched_description: self.texts[index].clone(),
            score: round3(scores[index].clamp(0.0, 1.0)),
        })
    }
}

/// Cosine similarity; 0.0 when either vector is zero or lengths differ.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

/// Index of the maximum; the first one wins on exact ties. NaN never wins.
fn argmax_first(scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &s) in scores.iter().enumerate() {
        let s = if s.is_nan() { f64::NEG_INFINITY } else { s };
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
