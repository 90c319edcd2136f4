//! Tabular input loader: spreadsheets (via calamine) and CSV files.
//!
//! The first row is the header row. Fully blank rows are skipped and every
//! cell is rendered as a string.

use std::path::Path;

use calamine::{Reader, open_workbook_auto};

use crate::error::{TableError, ValidationError};
use crate::types::{Requirement, TestCase};

pub const MAPPING_TABLE: &str = "mapping";
pub const TESTCASE_TABLE: &str = "testcase";

pub const COL_REQUIREMENT_ID: &str = "Requirement_ID";
pub const COL_REQUIREMENT_DESCRIPTION: &str = "Requirement_Description";
pub const COL_TESTCASE_DESCRIPTION: &str = "TestCase_Description";

/// Input file kinds recognised by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Spreadsheet,
    Csv,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "ods" => Some(Self::Spreadsheet),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// A header row plus data rows, all as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Build from raw rows. Returns `None` when there is no non-blank row
    /// to use as the header.
    pub fn from_rows<I>(rows: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let mut rows = rows
            .into_iter()
            .filter(|r| r.iter().any(|c| !c.trim().is_empty()));
        let headers = rows.next()?.into_iter().map(|h| h.trim().to_owned()).collect();
        Some(Self { headers, rows: rows.collect() })
    }

    /// Index of a required column, or `MissingColumn` naming the table.
    pub fn column(&self, table: &str, name: &str) -> Result<usize, ValidationError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ValidationError::MissingColumn {
                table: table.to_owned(),
                column: name.to_owned(),
            })
    }

    /// Cell text; short rows read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Render as a column-aligned text block (header first).
    pub fn to_text(&self) -> String {
        let cols = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0);
        let mut widths = vec![0usize; cols];
        for row in std::iter::once(&self.headers).chain(&self.rows) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let mut out = String::new();
        for row in std::iter::once(&self.headers).chain(&self.rows) {
            let line: Vec<String> = (0..cols)
                .map(|i| {
                    let cell = row.get(i).map(String::as_str).unwrap_or("");
                    format!("{cell:<width$}", width = widths[i])
                })
                .collect();
            out.push_str(line.join("  ").trim_end());
            out.push('\n');
        }
        out
    }
}

/// Load the first worksheet of a spreadsheet, or a CSV file.
pub fn load_table(path: &Path) -> Result<Table, TableError> {
    let rows = match TableFormat::from_path(path) {
        Some(TableFormat::Spreadsheet) => read_spreadsheet(path)?,
        Some(TableFormat::Csv) => read_csv(path)?,
        None => return Err(TableError::UnsupportedFormat(path.to_path_buf())),
    };
    Table::from_rows(rows).ok_or_else(|| TableError::EmptyTable(path.to_path_buf()))
}

fn read_spreadsheet(path: &Path) -> Result<Vec<Vec<String>>, TableError> {
    let spreadsheet_err = |message: String| TableError::Spreadsheet {
        path: path.to_path_buf(),
        message,
    };
    let mut workbook = open_workbook_auto(path).map_err(|e| spreadsheet_err(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| spreadsheet_err("workbook has no worksheets".into()))?
        .map_err(|e| spreadsheet_err(e.to_string()))?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect())
}

fn read_csv(path: &Path) -> Result<Vec<Vec<String>>, TableError> {
    let csv_err = |source: csv::Error| TableError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        rows.push(record.iter().map(str::to_owned).collect());
    }
    Ok(rows)
}

/// Extract requirements from a mapping table.
pub fn requirements_from(table: &Table) -> Result<Vec<Requirement>, ValidationError> {
    let id_col = table.column(MAPPING_TABLE, COL_REQUIREMENT_ID)?;
    let desc_col = table.column(MAPPING_TABLE, COL_REQUIREMENT_DESCRIPTION)?;
    Ok((0..table.rows.len())
        .map(|r| Requirement::new(table.cell(r, id_col).trim(), table.cell(r, desc_col)))
        .collect())
}

/// Extract the candidate set from a test-case table.
pub fn test_cases_from(table: &Table) -> Result<Vec<TestCase>, ValidationError> {
    let col = table.column(TESTCASE_TABLE, COL_TESTCASE_DESCRIPTION)?;
    Ok((0..table.rows.len())
        .map(|r| TestCase::new(table.cell(r, col)))
        .collect())
}

pub fn load_requirements(path: &Path) -> Result<Vec<Requirement>, TableError> {
    let table = load_table(path)?;
    let reqs = requirements_from(&table)?;
    tracing::debug!(path = %path.display(), rows = reqs.len(), "mapping table loaded");
    Ok(reqs)
}

pub fn load_test_cases(path: &Path) -> Result<Vec<TestCase>, TableError> {
    let table = load_table(path)?;
    let cases = test_cases_from(&table)?;
    tracing::debug!(path = %path.display(), rows = cases.len(), "test-case table loaded");
    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn write_csv(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn header_is_first_non_blank_row() {
        let t = Table::from_rows(vec![
            strings(&["", ""]),
            strings(&[" Requirement_ID ", "Requirement_Description"]),
            strings(&["REQ-1", "User can log in"]),
            strings(&["", "  "]),
            strings(&["REQ-2", "User can log out"]),
        ])
        .unwrap();
        assert_eq!(t.headers, strings(&["Requirement_ID", "Requirement_Description"]));
        assert_eq!(t.rows.len(), 2);
    }

    #[test]
    fn no_rows_means_no_table() {
        assert!(Table::from_rows(Vec::<Vec<String>>::new()).is_none());
    }

    #[test]
    fn missing_column_names_table() {
        let t = Table::from_rows(vec![strings(&["Requirement_ID"]), strings(&["REQ-1"])]).unwrap();
        let err = requirements_from(&t).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingColumn {
                table: MAPPING_TABLE.into(),
                column: COL_REQUIREMENT_DESCRIPTION.into(),
            }
        );
    }

    #[test]
    fn short_rows_read_as_empty_cells() {
        let t = Table::from_rows(vec![
            strings(&["Requirement_ID", "Requirement_Description"]),
            strings(&["REQ-1"]),
        ])
        .unwrap();
        let reqs = requirements_from(&t).unwrap();
        assert_eq!(reqs, vec![Requirement::new("REQ-1", "")]);
    }

    #[test]
    fn csv_test_cases_keep_duplicates_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "cases.csv",
            "TestCase_ID,TestCase_Description\nTC-1,Login works\nTC-2,Login works\nTC-3,\"Reset, then login\"\n",
        );
        let cases = load_test_cases(&path).unwrap();
        assert_eq!(
            cases,
            vec![
                TestCase::new("Login works"),
                TestCase::new("Login works"),
                TestCase::new("Reset, then login"),
            ]
        );
    }

    #[test]
    fn csv_missing_column_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "cases.csv", "Description\nLogin works\n");
        let err = load_test_cases(&path).unwrap_err();
        assert!(matches!(
            err,
            TableError::Validation(ValidationError::MissingColumn { ref table, .. }) if table == TESTCASE_TABLE
        ));
    }

    #[test]
    fn xlsx_round_trips_through_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.xlsx");
        let mut wb = rust_xlsxwriter::Workbook::new();
        let ws = wb.add_worksheet();
        ws.write_string(0, 0, "Requirement_ID").unwrap();
        ws.write_string(0, 1, "Requirement_Description").unwrap();
        ws.write_number(1, 0, 1.0).unwrap();
        ws.write_string(1, 1, "User can log in").unwrap();
        wb.save(&path).unwrap();

        let reqs = load_requirements(&path).unwrap();
        assert_eq!(reqs, vec![Requirement::new("1", "User can log in")]);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_table(Path::new("notes.docx")).unwrap_err();
        assert!(matches!(err, TableError::UnsupportedFormat(_)));
    }

    #[test]
    fn empty_csv_is_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "empty.csv", "\n\n");
        assert!(matches!(load_table(&path), Err(TableError::EmptyTable(_))));
    }

    #[test]
    fn text_rendering_aligns_columns() {
        let t = Table::from_rows(vec![
            strings(&["Source", "Target"]),
            strings(&["customers.id", "dim_customer.customer_id"]),
        ])
        .unwrap();
        let text = t.to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Source        Target");
        assert_eq!(lines[1], "customers.id  dim_customer.customer_id");
    }
}
