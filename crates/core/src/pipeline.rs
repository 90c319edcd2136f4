//! Validation pipeline: match every requirement, judge the match, collect
//! one record per requirement in input order.
//!
//! Rows run on a bounded worker pool. A row that fails matching, judgment or
//! its timeout is recorded as failed; it never aborts the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use stlc_llm::{EmbeddingProvider, LlmProvider};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::StlcCfg;
use crate::error::{TableError, ValidationError};
use crate::judge::JudgmentService;
use crate::matcher::{CandidateIndex, SimilarityMatcher};
use crate::prompt::FAIL_MARKER;
use crate::report::ReportBuilder;
use crate::table;
use crate::types::{MatchResult, Report, Requirement, RowState, RowStatus, TestCase, VerdictRecord};

/// Error from `validate_files`.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Report(#[from] crate::error::ReportError),
}

pub struct ValidationPipeline {
    matcher: SimilarityMatcher,
    judge: Arc<JudgmentService>,
    max_concurrent_rows: usize,
    row_timeout: Duration,
}

impl ValidationPipeline {
    pub fn new(
        matcher: SimilarityMatcher,
        judge: JudgmentService,
        max_concurrent_rows: usize,
        row_timeout: Duration,
    ) -> Self {
        Self {
            matcher,
            judge: Arc::new(judge),
            max_concurrent_rows: max_concurrent_rows.max(1),
            row_timeout,
        }
    }

    pub fn from_cfg(
        cfg: &StlcCfg,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        Self::new(
            SimilarityMatcher::new(embedder),
            JudgmentService::from_cfg(llm, cfg),
            cfg.max_concurrent_rows,
            cfg.row_timeout(),
        )
    }

    /// Validate every requirement against the candidate set.
    ///
    /// Only an empty candidate set fails the run; every other failure is
    /// recorded on its row. The report has exactly one record per
    /// requirement, in input order.
    pub async fn run(
        &self,
        requirements: &[Requirement],
        candidates: &[TestCase],
    ) -> Result<Report, ValidationError> {
        if candidates.is_empty() {
            return Err(ValidationError::EmptyCandidateSet);
        }
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("validation_run", %run_id);

        async {
            tracing::info!(
                requirements = requirements.len(),
                candidates = candidates.len(),
                embedder = self.matcher.embedder_name(),
                workers = self.max_concurrent_rows,
                "validation run started"
            );

            let records = match self.matcher.index(candidates).await {
                Ok(index) => self.process_rows(requirements, Arc::new(index)).await,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    // Without candidate vectors no row can be matched.
                    tracing::error!(error = %e, "candidate embedding failed");
                    requirements
                        .iter()
                        .map(|req| failed_record(req, None, &e))
                        .collect()
                }
            };

            let report = Report::new(run_id, records);
            let s = report.summary();
            tracing::info!(
                rows = s.total,
                pass = s.pass,
                warn = s.warn,
                fail = s.fail,
                failed_rows = s.failed_rows,
                "validation run finished"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    async fn process_rows(&self, requirements: &[Requirement], index: Arc<CandidateIndex>) -> Vec<VerdictRecord> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_rows));
        let mut tasks = JoinSet::new();

        for (row, req) in requirements.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let index = Arc::clone(&index);
            let judge = Arc::clone(&self.judge);
            let timeout = self.row_timeout;
            let span = tracing::info_span!("row", row, requirement_id = %req.id);
            tasks.spawn(
                async move {
                    let record = match semaphore.acquire_owned().await {
                        Ok(_permit) => process_row(&req, &index, &judge, timeout).await,
                        Err(_) => failed_record(
                            &req,
                            None,
                            &ValidationError::MatchUnavailable("worker pool closed".into()),
                        ),
                    };
                    (row, record)
                }
                .instrument(span),
            );
        }

        let mut slots: Vec<Option<VerdictRecord>> = vec![None; requirements.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((row, record)) => slots[row] = Some(record),
                Err(e) => tracing::error!(error = %e, "row task aborted"),
            }
        }

        // A panicked task leaves its slot empty; record it as failed.
        slots
            .into_iter()
            .zip(requirements)
            .map(|(slot, req)| {
                slot.unwrap_or_else(|| {
                    failed_record(req, None, &ValidationError::JudgmentUnavailable("row task aborted".into()))
                })
            })
            .collect()
    }

    /// Load both tables, run, and write the report to `report_path`.
    pub async fn validate_files(
        &self,
        mapping_path: &Path,
        testcase_path: &Path,
        report_path: &Path,
    ) -> Result<(Report, PathBuf), RunError> {
        let requirements = table::load_requirements(mapping_path)?;
        let candidates = table::load_test_cases(testcase_path)?;
        let report = self.run(&requirements, &candidates).await?;
        let path = ReportBuilder::new(report_path).build(&report)?;
        Ok((report, path))
    }
}

async fn process_row(
    req: &Requirement,
    index: &CandidateIndex,
    judge: &JudgmentService,
    timeout: Duration,
) -> VerdictRecord {
    tracing::debug!(state = RowState::Pending.as_str(), "row queued");
    let mut matched: Option<MatchResult> = None;

    let outcome = tokio::time::timeout(timeout, async {
        let m = index.best_match(&req.description).await?;
        tracing::debug!(
            state = RowState::Matched.as_str(),
            candidate = m.index,
            score = m.score,
            "requirement matched"
        );
        matched = Some(m.clone());
        let verdict = judge.judge(&req.description, &m.matched_description).await?;
        tracing::debug!(state = RowState::Judged.as_str(), "requirement judged");
        Ok::<_, ValidationError>((m, verdict))
    })
    .await
    .unwrap_or_else(|_| Err(ValidationError::RowTimeout(timeout)));

    match outcome {
        Ok((m, verdict)) => {
            tracing::debug!(state = RowState::Recorded.as_str(), "row recorded");
            VerdictRecord {
                requirement_id: req.id.clone(),
                requirement_description: req.description.clone(),
                matched_description: m.matched_description,
                score: m.score,
                verdict_text: verdict,
                status: RowStatus::Judged,
            }
        }
        Err(e) => failed_record(req, matched.as_ref(), &e),
    }
}

/// Failed row: keeps any match found before the failure, and carries an
/// error verdict that classifies as fail.
fn failed_record(req: &Requirement, matched: Option<&MatchResult>, error: &ValidationError) -> VerdictRecord {
    tracing::warn!(
        state = RowState::Failed.as_str(),
        requirement_id = %req.id,
        error = %error,
        "row failed"
    );
    VerdictRecord {
        requirement_id: req.id.clone(),
        requirement_description: req.description.clone(),
        matched_description: matched.map(|m| m.matched_description.clone()).unwrap_or_default(),
        score: matched.map(|m| m.score).unwrap_or(0.0),
        verdict_text: format!("{FAIL_MARKER} Validation failed: {error}"),
        status: RowStatus::Failed,
    }
}
