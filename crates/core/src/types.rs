use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Input rows ──────────────────────────────────────────────────

/// One row of the requirements mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub id: String,
    pub description: String,
}

impl Requirement {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self { id: id.into(), description: description.into() }
    }
}

/// One row of the test-case table. Duplicates are legal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub description: String,
}

impl TestCase {
    pub fn new(description: impl Into<String>) -> Self {
        Self { description: description.into() }
    }
}

// ── Matching ────────────────────────────────────────────────────

/// Best candidate for one requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Position of the winning candidate in the candidate set.
    pub index: usize,
    /// Candidate text, verbatim.
    pub matched_description: String,
    /// Cosine similarity in [0, 1], rounded to 3 decimals.
    pub score: f64,
}

// ── Verdicts & report ───────────────────────────────────────────

/// Per-row lifecycle. Terminal states are `Recorded` and `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowState {
    Pending,
    Matched,
    Judged,
    Recorded,
    Failed,
}

impl RowState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Matched => "matched",
            Self::Judged => "judged",
            Self::Recorded => "recorded",
            Self::Failed => "failed",
        }
    }
}

/// How a finished row ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Judged,
    Failed,
}

/// Report row for one requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictRecord {
    pub requirement_id: String,
    pub requirement_description: String,
    /// Empty when matching itself failed.
    pub matched_description: String,
    pub score: f64,
    pub verdict_text: String,
    pub status: RowStatus,
}

/// Pass/warn/fail bucket of a row, derived from its verdict text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Pass,
    Warn,
    Fail,
}

impl Classification {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Warn => "warn",
            Self::Fail => "fail",
        }
    }

    /// Row fill colour in the spreadsheet (RGB).
    pub fn fill_rgb(self) -> u32 {
        match self {
            Self::Pass => 0xC6EFCE,
            Self::Warn => 0xFFF2CC,
            Self::Fail => 0xF8CBAD,
        }
    }
}

/// Result of one validation run, in input requirement order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub records: Vec<VerdictRecord>,
}

/// Row counts per classification, plus how many rows failed outright.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub pass: usize,
    pub warn: usize,
    pub fail: usize,
    pub failed_rows: usize,
}

impl Report {
    pub fn new(run_id: Uuid, records: Vec<VerdictRecord>) -> Self {
        Self { run_id, generated_at: Utc::now(), records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summary(&self) -> ReportSummary {
        let mut s = ReportSummary { total: self.records.len(), ..Default::default() };
        for r in &self.records {
            match crate::report::classify(&r.verdict_text) {
                Classification::Pass => s.pass += 1,
                Classification::Warn => s.warn += 1,
                Classification::Fail => s.fail += 1,
            }
            if r.status == RowStatus::Failed {
                s.failed_rows += 1;
            }
        }
        s
    }
}
