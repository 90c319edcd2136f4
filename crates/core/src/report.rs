//! Spreadsheet report: five columns, header styled, whole rows filled by
//! pass/warn/fail classification of the verdict text.

use std::path::PathBuf;

use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook};

use crate::error::ReportError;
use crate::types::{Classification, Report, VerdictRecord};

pub const PASS_MARKER: &str = "✅";
pub const WARN_MARKER: &str = "⚠️";

pub const SHEET_NAME: &str = "Validation Report";
pub const COLUMNS: [&str; 5] = [
    "Requirement_ID",
    "Requirement",
    "Matched_TestCase",
    "Similarity_Score",
    "AI_Validation",
];

const HEADER_FILL: u32 = 0x4F81BD;
const COLUMN_WIDTHS: [f64; 5] = [16.0, 48.0, 48.0, 16.0, 80.0];

/// Classify verdict text by literal markers. Pass is checked first; text with
/// neither marker is a failure.
///
/// Matching is exact: the warn marker is U+26A0 followed by U+FE0F, so a bare
/// `⚠` (U+26A0 alone) is not a warn marker and classifies as fail.
pub fn classify(verdict_text: &str) -> Classification {
    if verdict_text.contains(PASS_MARKER) {
        Classification::Pass
    } else if verdict_text.contains(WARN_MARKER) {
        Classification::Warn
    } else {
        Classification::Fail
    }
}

/// One spreadsheet data row before styling.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow<'a> {
    pub classification: Classification,
    pub record: &'a VerdictRecord,
}

/// Writes reports to a fixed path, overwriting any previous run.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    path: PathBuf,
}

impl ReportBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Classified rows in record order.
    pub fn layout(records: &[VerdictRecord]) -> Vec<ReportRow<'_>> {
        records
            .iter()
            .map(|record| ReportRow { classification: classify(&record.verdict_text), record })
            .collect()
    }

    /// Serialize `report` to the configured path and return that path.
    pub fn build(&self, report: &Report) -> Result<PathBuf, ReportError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ReportError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut workbook = self.render(&report.records)?;
        workbook.save(&self.path)?;

        let summary = report.summary();
        tracing::info!(
            path = %self.path.display(),
            run_id = %report.run_id,
            rows = summary.total,
            pass = summary.pass,
            warn = summary.warn,
            fail = summary.fail,
            "validation report written"
        );
        Ok(self.path.clone())
    }

    fn render(&self, records: &[VerdictRecord]) -> Result<Workbook, ReportError> {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        let header = Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(HEADER_FILL))
            .set_border(FormatBorder::Thin);
        for (col, title) in COLUMNS.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *title, &header)?;
            sheet.set_column_width(col as u16, COLUMN_WIDTHS[col])?;
        }
        sheet.set_freeze_panes(1, 0)?;

        for (i, row) in Self::layout(records).iter().enumerate() {
            let r = (i + 1) as u32;
            // One format for the whole row; the number format only affects the score cell.
            let fill = Format::new()
                .set_background_color(Color::RGB(row.classification.fill_rgb()))
                .set_num_format("0.000")
                .set_text_wrap();
            let rec = row.record;
            sheet.write_string_with_format(r, 0, rec.requirement_id.as_str(), &fill)?;
            sheet.write_string_with_format(r, 1, rec.requirement_description.as_str(), &fill)?;
            sheet.write_string_with_format(r, 2, rec.matched_description.as_str(), &fill)?;
            sheet.write_number_with_format(r, 3, rec.score, &fill)?;
            sheet.write_string_with_format(r, 4, rec.verdict_text.as_str(), &fill)?;
        }
        Ok(workbook)
    }
}
