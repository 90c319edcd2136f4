//! Document-driven generation agents: test cases from a requirements
//! document, SQL scripts from a source→target mapping document.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use stlc_llm::{CompletionRequest, LlmError, LlmProvider};

use crate::config::StlcCfg;
use crate::error::TableError;
use crate::prompt::{build_sql_prompt, build_test_case_prompt};
use crate::table::{self, TableFormat};

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("document is empty")]
    EmptyDocument,
    #[error(transparent)]
    Document(#[from] TableError),
    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),
    #[error("model returned no text")]
    EmptyOutput,
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    TestCases,
    SqlScripts,
}

impl AgentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TestCases => "test_case_agent",
            Self::SqlScripts => "sql_agent",
        }
    }

    /// File written under the outputs directory.
    pub fn output_file_name(self) -> &'static str {
        match self {
            Self::TestCases => "test_cases.txt",
            Self::SqlScripts => "sql_scripts.sql",
        }
    }

    fn build_prompt(self, document: &str) -> String {
        match self {
            Self::TestCases => build_test_case_prompt(document),
            Self::SqlScripts => build_sql_prompt(document),
        }
    }
}

/// Extract text from an uploaded document: `.txt` as-is (lossy UTF-8),
/// `.csv` and spreadsheets rendered as an aligned text table.
pub fn read_document(path: &Path) -> Result<String, TableError> {
    let is_txt = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
    if is_txt {
        let bytes = std::fs::read(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        return Ok(String::from_utf8_lossy(&bytes).into_owned());
    }
    match TableFormat::from_path(path) {
        Some(_) => Ok(table::load_table(path)?.to_text()),
        None => Err(TableError::UnsupportedFormat(path.to_path_buf())),
    }
}

pub struct GenerationAgent {
    kind: AgentKind,
    llm: Arc<dyn LlmProvider>,
    max_tokens: u32,
    temperature: f32,
}

impl GenerationAgent {
    pub fn new(kind: AgentKind, llm: Arc<dyn LlmProvider>, max_tokens: u32, temperature: f32) -> Self {
        Self { kind, llm, max_tokens, temperature }
    }

    pub fn from_cfg(kind: AgentKind, llm: Arc<dyn LlmProvider>, cfg: &StlcCfg) -> Self {
        Self::new(kind, llm, cfg.generation_max_tokens, cfg.generation_temperature)
    }

    /// Generate the agent's output for `document`.
    pub async fn generate(&self, document: &str) -> Result<String, AgentError> {
        let agent = self.kind.as_str();
        if document.trim().is_empty() {
            tracing::warn!(target: "stlc::agent", agent, "received empty document");
            return Err(AgentError::EmptyDocument);
        }
        tracing::info!(target: "stlc::agent", agent, chars = document.len(), "received document for generation");

        let start = Instant::now();
        let request = CompletionRequest::prompt(
            None,
            self.kind.build_prompt(document),
            self.max_tokens,
            self.temperature,
        );
        let response = match self.llm.complete(request).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(target: "stlc::agent", agent, provider = self.llm.name(), error = %e, "generation failed");
                return Err(e.into());
            }
        };
        let text = response.content.trim().to_owned();
        if text.is_empty() {
            tracing::error!(target: "stlc::agent", agent, "model returned no text");
            return Err(AgentError::EmptyOutput);
        }
        tracing::info!(
            target: "stlc::agent",
            agent,
            provider = self.llm.name(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            output_tokens = response.output_tokens,
            "generation succeeded"
        );
        Ok(text)
    }

    /// Generate and write to `<outputs_dir>/<output_file_name>`, overwriting.
    pub async fn generate_to_file(&self, document: &str, outputs_dir: &Path) -> Result<(String, PathBuf), AgentError> {
        let text = self.generate(document).await?;
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| AgentError::Io { path, source }
        };
        std::fs::create_dir_all(outputs_dir).map_err(io_err(outputs_dir))?;
        let path = outputs_dir.join(self.kind.output_file_name());
        std::fs::write(&path, text.as_bytes()).map_err(io_err(&path))?;
        tracing::info!(target: "stlc::agent", agent = self.kind.as_str(), path = %path.display(), "output written");
        Ok((text, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use stlc_llm::{CompletionResponse, MockProvider};

    struct Offline;

    impl LlmProvider for Offline {
        fn name(&self) -> &str {
            "offline"
        }

        fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + '_>> {
            Box::pin(async { Err(LlmError::Unavailable("ollama not running".into())) })
        }
    }

    #[tokio::test]
    async fn test_case_agent_uses_qa_prompt() {
        let mock = Arc::new(MockProvider::new("TC-1 | Login | open page | dashboard shown"));
        let agent = GenerationAgent::new(AgentKind::TestCases, mock.clone(), 512, 0.2);
        let out = agent.generate("The system shall allow login.").await.unwrap();
        assert!(out.starts_with("TC-1"));
        let prompts = mock.prompts();
        assert!(prompts[0].contains("QA test engineer"));
        assert!(prompts[0].contains("The system shall allow login."));
    }

    #[tokio::test]
    async fn sql_agent_writes_output_file() {
        let mock = Arc::new(MockProvider::new("CREATE TABLE dim_customer (customer_id INT);"));
        let agent = GenerationAgent::new(AgentKind::SqlScripts, mock.clone(), 512, 0.2);
        let dir = tempfile::tempdir().unwrap();
        let outputs = dir.path().join("outputs");
        let (text, path) = agent.generate_to_file("customers.id -> dim_customer.customer_id", &outputs).await.unwrap();
        assert_eq!(path, outputs.join("sql_scripts.sql"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
        assert!(mock.prompts()[0].contains("senior data engineer"));
    }

    #[tokio::test]
    async fn empty_document_is_rejected_without_calling_model() {
        let mock = Arc::new(MockProvider::new("unused"));
        let agent = GenerationAgent::new(AgentKind::TestCases, mock.clone(), 512, 0.2);
        assert!(matches!(agent.generate(" \n ").await, Err(AgentError::EmptyDocument)));
        assert!(mock.prompts().is_empty());
    }

    #[tokio::test]
    async fn backend_failure_is_an_error_not_output() {
        let agent = GenerationAgent::new(AgentKind::SqlScripts, Arc::new(Offline), 512, 0.2);
        let dir = tempfile::tempdir().unwrap();
        let err = agent.generate_to_file("a -> b", dir.path()).await.unwrap_err();
        assert!(matches!(err, AgentError::Generation(LlmError::Unavailable(_))));
        assert!(!dir.path().join("sql_scripts.sql").exists());
    }

    #[test]
    fn reads_txt_and_csv_documents() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("reqs.TXT");
        std::fs::write(&txt, b"The system shall \xffexport reports.").unwrap();
        let text = read_document(&txt).unwrap();
        assert!(text.starts_with("The system shall"));
        assert!(text.contains("export reports."));

        let csv = dir.path().join("mapping.csv");
        std::fs::write(&csv, "Source,Target\ncustomers.id,dim_customer.customer_id\n").unwrap();
        let text = read_document(&csv).unwrap();
        assert!(text.contains("customers.id"));
        assert!(text.lines().next().unwrap().starts_with("Source"));
    }

    #[test]
    fn unsupported_document_format() {
        let err = read_document(Path::new("requirements.pdf")).unwrap_err();
        assert!(matches!(err, TableError::UnsupportedFormat(_)));
    }

    #[test]
    fn output_names() {
        assert_eq!(AgentKind::TestCases.output_file_name(), "test_cases.txt");
        assert_eq!(AgentKind::SqlScripts.output_file_name(), "sql_scripts.sql");
    }
}
