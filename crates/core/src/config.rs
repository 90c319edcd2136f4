use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Environment prefix for overrides, e.g. `STLC_MAX_CONCURRENT_ROWS=8`.
pub const ENV_PREFIX: &str = "STLC_";

/// All stlc parameters. Built once at startup and passed down explicitly.
/// Defaults, then an optional JSON file, then `STLC_*` environment overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StlcCfg {
    // output locations
    pub report_path: PathBuf,
    pub outputs_dir: PathBuf,

    // pipeline
    pub max_concurrent_rows: usize,
    pub row_timeout_secs: u64,

    // judgment
    pub judge_max_tokens: u32,
    pub judge_temperature: f32,
    pub judge_retry_delay_ms: u64,

    // generation agents
    pub generation_max_tokens: u32,
    pub generation_temperature: f32,

    // text-generation backend
    pub llm_provider: String,
    pub llm_model: String,
    pub llm_base_url: String,

    // embedding backend
    pub embed_backend: String,
    pub embed_model: String,
    pub embed_base_url: String,
    pub embed_dim: usize,
}

impl Default for StlcCfg {
    fn default() -> Self {
        Self {
            report_path: PathBuf::from("reports/validation_report.xlsx"),
            outputs_dir: PathBuf::from("outputs"),
            max_concurrent_rows: 4,
            row_timeout_secs: 120,
            judge_max_tokens: 256,
            judge_temperature: 0.0,
            judge_retry_delay_ms: 500,
            generation_max_tokens: 1024,
            generation_temperature: 0.2,
            llm_provider: "ollama".into(),
            llm_model: "llama3".into(),
            llm_base_url: String::new(),
            embed_backend: "hashing".into(),
            embed_model: "nomic-embed-text".into(),
            embed_base_url: String::new(),
            embed_dim: 512,
        }
    }
}

impl StlcCfg {
    /// Load config: defaults, then `path` (JSON) if given, then environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let env: HashMap<String, String> = std::env::vars()
            .filter_map(|(k, v)| {
                k.strip_prefix(ENV_PREFIX).map(|key| (key.to_lowercase(), v))
            })
            .collect();
        Ok(base.overlay(&env))
    }

    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply key/value overrides. Unknown keys are ignored; unparseable
    /// values keep the current value.
    pub fn overlay(self, m: &HashMap<String, String>) -> Self {
        let d = self;
        Self {
            report_path: get_or(m, "report_path", d.report_path),
            outputs_dir: get_or(m, "outputs_dir", d.outputs_dir),
            max_concurrent_rows: get_or(m, "max_concurrent_rows", d.max_concurrent_rows).max(1),
            row_timeout_secs: get_or(m, "row_timeout_secs", d.row_timeout_secs),
            judge_max_tokens: get_or(m, "judge_max_tokens", d.judge_max_tokens),
            judge_temperature: get_or(m, "judge_temperature", d.judge_temperature),
            judge_retry_delay_ms: get_or(m, "judge_retry_delay_ms", d.judge_retry_delay_ms),
            generation_max_tokens: get_or(m, "generation_max_tokens", d.generation_max_tokens),
            generation_temperature: get_or(m, "generation_temperature", d.generation_temperature),
            llm_provider: get_or(m, "llm_provider", d.llm_provider),
            llm_model: get_or(m, "llm_model", d.llm_model),
            llm_base_url: get_or(m, "llm_base_url", d.llm_base_url),
            embed_backend: get_or(m, "embed_backend", d.embed_backend),
            embed_model: get_or(m, "embed_model", d.embed_model),
            embed_base_url: get_or(m, "embed_base_url", d.embed_base_url),
            embed_dim: get_or(m, "embed_dim", d.embed_dim),
        }
    }

    pub fn row_timeout(&self) -> Duration {
        Duration::from_secs(self.row_timeout_secs)
    }

    pub fn judge_retry_delay(&self) -> Duration {
        Duration::from_millis(self.judge_retry_delay_ms)
    }

    /// `(key, value, description)` for every parameter, for display.
    pub fn entries(&self) -> Vec<(&'static str, String, &'static str)> {
        vec![
            ("report_path", self.report_path.display().to_string(), "Validation report output file"),
            ("outputs_dir", self.outputs_dir.display().to_string(), "Directory for generated test cases / SQL"),
            ("max_concurrent_rows", self.max_concurrent_rows.to_string(), "Requirement rows processed in parallel"),
            ("row_timeout_secs", self.row_timeout_secs.to_string(), "Per-row match+judge timeout seconds"),
            ("judge_max_tokens", self.judge_max_tokens.to_string(), "Max tokens for a verdict"),
            ("judge_temperature", self.judge_temperature.to_string(), "Sampling temperature for verdicts"),
            ("judge_retry_delay_ms", self.judge_retry_delay_ms.to_string(), "Delay before the single judgment retry"),
            ("generation_max_tokens", self.generation_max_tokens.to_string(), "Max tokens for generated documents"),
            ("generation_temperature", self.generation_temperature.to_string(), "Sampling temperature for generation"),
            ("llm_provider", self.llm_provider.clone(), "Generation backend (openai, anthropic, google, deepseek, ollama, compatible; empty = infer)"),
            ("llm_model", self.llm_model.clone(), "Generation model name"),
            ("llm_base_url", self.llm_base_url.clone(), "Generation endpoint override"),
            ("embed_backend", self.embed_backend.clone(), "Embedding backend (hashing, openai, ollama)"),
            ("embed_model", self.embed_model.clone(), "Embedding model name (http backends)"),
            ("embed_base_url", self.embed_base_url.clone(), "Embedding endpoint override"),
            ("embed_dim", self.embed_dim.to_string(), "Hashing embedder dimension"),
        ]
    }
}

fn get_or<T: std::str::FromStr>(map: &HashMap<String, String>, key: &str, default: T) -> T {
    map.get(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
