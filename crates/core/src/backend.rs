//! Startup selection of generation and embedding backends from config.
//!
//! Backends are chosen by name only; nothing probes the machine for
//! installed tools.

use std::sync::Arc;

use stlc_llm::{EmbeddingProvider, HashingEmbedder, HttpEmbedder, HttpProvider, LlmProvider, ProviderKind};

use crate::config::StlcCfg;
use crate::error::ConfigError;

pub const ENV_LLM_API_KEY: &str = "STLC_LLM_API_KEY";
pub const ENV_EMBED_API_KEY: &str = "STLC_EMBED_API_KEY";

/// Build the text-generation provider named by `cfg.llm_provider`.
pub fn build_llm(cfg: &StlcCfg, api_key: Option<String>) -> Result<Arc<dyn LlmProvider>, ConfigError> {
    let kind = ProviderKind::parse(&cfg.llm_provider, &cfg.llm_model).ok_or_else(|| {
        ConfigError::UnknownBackend { kind: "llm", name: cfg.llm_provider.clone() }
    })?;
    let base_url = Some(cfg.llm_base_url.clone()).filter(|u| !u.trim().is_empty());
    let provider = HttpProvider::new(kind, cfg.llm_model.clone(), api_key, base_url)?;
    tracing::info!(provider = provider.name(), model = provider.model(), "generation backend initialized");
    Ok(Arc::new(provider))
}

/// Build the embedding provider named by `cfg.embed_backend`.
pub fn build_embedder(cfg: &StlcCfg, api_key: Option<String>) -> Result<Arc<dyn EmbeddingProvider>, ConfigError> {
    let name = cfg.embed_backend.trim().to_lowercase();
    let embedder: Arc<dyn EmbeddingProvider> = match name.as_str() {
        "hashing" => Arc::new(HashingEmbedder::new(cfg.embed_dim)),
        "openai" | "ollama" => {
            let kind = if name == "openai" { ProviderKind::OpenAi } else { ProviderKind::Ollama };
            let base_url = Some(cfg.embed_base_url.clone())
                .filter(|u| !u.trim().is_empty())
                .or_else(|| kind.default_base_url().map(str::to_owned))
                .unwrap_or_default();
            if kind.requires_api_key() && api_key.as_deref().is_none_or(str::is_empty) {
                return Err(stlc_llm::LlmError::Unavailable(format!("{name} embeddings need an API key")).into());
            }
            Arc::new(HttpEmbedder::new(name.clone(), cfg.embed_model.clone(), api_key, base_url))
        }
        _ => {
            return Err(ConfigError::UnknownBackend { kind: "embedding", name: cfg.embed_backend.clone() });
        }
    };
    tracing::info!(embedder = embedder.name(), "embedding backend initialized");
    Ok(embedder)
}

/// Both backends, with API keys from `STLC_LLM_API_KEY` / `STLC_EMBED_API_KEY`.
/// The embedding key falls back to the LLM key.
pub fn from_env(cfg: &StlcCfg) -> Result<(Arc<dyn LlmProvider>, Arc<dyn EmbeddingProvider>), ConfigError> {
    let llm_key = std::env::var(ENV_LLM_API_KEY).ok();
    let embed_key = std::env::var(ENV_EMBED_API_KEY).ok().or_else(|| llm_key.clone());
    Ok((build_llm(cfg, llm_key)?, build_embedder(cfg, embed_key)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_local_backends() {
        let cfg = StlcCfg::default();
        let llm = build_llm(&cfg, None).unwrap();
        assert_eq!(llm.name(), "ollama");
        let embedder = build_embedder(&cfg, None).unwrap();
        assert_eq!(embedder.name(), "hashing");
    }

    #[test]
    fn unknown_llm_provider_is_rejected() {
        let cfg = StlcCfg { llm_provider: "huggingface".into(), ..StlcCfg::default() };
        assert!(matches!(
            build_llm(&cfg, None),
            Err(ConfigError::UnknownBackend { kind: "llm", .. })
        ));
    }

    #[test]
    fn hosted_llm_without_key_is_rejected() {
        let cfg = StlcCfg { llm_provider: "openai".into(), llm_model: "gpt-4o-mini".into(), ..StlcCfg::default() };
        assert!(matches!(build_llm(&cfg, None), Err(ConfigError::Backend(_))));
        assert!(build_llm(&cfg, Some("sk-test".into())).is_ok());
    }

    #[test]
    fn empty_provider_infers_from_model() {
        let cfg = StlcCfg { llm_provider: String::new(), llm_model: "claude-sonnet-4-6".into(), ..StlcCfg::default() };
        assert_eq!(build_llm(&cfg, Some("k".into())).unwrap().name(), "anthropic");
    }

    #[test]
    fn http_embedders_by_name() {
        let cfg = StlcCfg { embed_backend: "Ollama".into(), ..StlcCfg::default() };
        assert_eq!(build_embedder(&cfg, None).unwrap().name(), "ollama");

        let cfg = StlcCfg { embed_backend: "openai".into(), ..StlcCfg::default() };
        assert!(build_embedder(&cfg, None).is_err());
        assert_eq!(build_embedder(&cfg, Some("sk".into())).unwrap().name(), "openai");

        let cfg = StlcCfg { embed_backend: "sentence-transformers".into(), ..StlcCfg::default() };
        assert!(matches!(
            build_embedder(&cfg, None),
            Err(ConfigError::UnknownBackend { kind: "embedding", .. })
        ));
    }
}
