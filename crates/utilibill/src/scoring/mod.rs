//! Accuracy scoring: compare an extracted CSV against a ground-truth CSV.
//!
//! Both tables go through identical normalization, then every
//! (filename, field) pair is compared as a multiset: duplicate correct values
//! each count, and over- or under-extraction is penalized by the multiset
//! difference rather than silently ignored. Only filenames present in both
//! tables are scored; files present in one table only are excluded and
//! listed in the report, never scored as 0%.

use crate::error::{Result, UtilibillError};
use crate::text;
use crate::types::{DATE_COLUMNS, EXTRACT_COLUMNS, FILENAME_COLUMN};
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use std::path::Path;

/// One CSV row: the source filename plus whatever extraction columns the
/// table carries. Absent columns simply contribute empty multisets.
#[derive(Debug, Clone)]
pub struct BillRow {
    pub filename: String,
    pub fields: HashMap<String, String>,
}

/// Correct/total counters for one field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldAccuracy {
    pub correct: usize,
    pub total: usize,
}

impl FieldAccuracy {
    /// Accuracy as a fraction, or `None` when the field had nothing to score.
    pub fn accuracy(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.correct as f64 / self.total as f64)
        }
    }
}

/// One (filename, field) pair whose value multisets differ, with the literal
/// normalized values from both sides for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub filename: String,
    pub field: String,
    pub ground_truth: Vec<String>,
    pub extracted: Vec<String>,
}

/// Result of one comparison run. Built fresh per run, never persisted.
#[derive(Debug, Clone, Default)]
pub struct AccuracyReport {
    pub total_correct: usize,
    pub total_fields: usize,
    pub field_accuracies: IndexMap<String, FieldAccuracy>,
    pub mismatches: Vec<Mismatch>,
    /// Filenames present only in the ground-truth table, excluded from scoring.
    pub skipped_ground_truth: Vec<String>,
    /// Filenames present only in the extracted table, excluded from scoring.
    pub skipped_extracted: Vec<String>,
}

impl AccuracyReport {
    /// Overall accuracy as a fraction, or `None` when nothing was scored.
    pub fn overall_accuracy(&self) -> Option<f64> {
        if self.total_fields == 0 {
            None
        } else {
            Some(self.total_correct as f64 / self.total_fields as f64)
        }
    }
}

/// Load a CSV table. The `Filename` column is required; extraction columns
/// are picked up by header name when present.
pub fn load_table(path: impl AsRef<Path>) -> Result<Vec<BillRow>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        UtilibillError::validation(format!("failed to open CSV {}: {}", path.display(), e))
    })?;

    let headers = reader.headers()?.clone();
    let filename_index = headers
        .iter()
        .position(|h| h == FILENAME_COLUMN)
        .ok_or_else(|| {
            UtilibillError::validation(format!(
                "CSV {} has no '{}' column",
                path.display(),
                FILENAME_COLUMN
            ))
        })?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let filename = record.get(filename_index).unwrap_or_default().to_string();

        let mut fields = HashMap::new();
        for column in EXTRACT_COLUMNS {
            if let Some(index) = headers.iter().position(|h| h == column) {
                fields.insert(
                    column.to_string(),
                    record.get(index).unwrap_or_default().to_string(),
                );
            }
        }
        rows.push(BillRow { filename, fields });
    }
    Ok(rows)
}

/// Load both tables and score them.
pub fn compare_files(
    ground_truth_path: impl AsRef<Path>,
    extracted_path: impl AsRef<Path>,
) -> Result<AccuracyReport> {
    let ground_truth = load_table(ground_truth_path)?;
    let extracted = load_table(extracted_path)?;
    Ok(score(&ground_truth, &extracted))
}

/// Score an extracted table against ground truth.
pub fn score(ground_truth: &[BillRow], extracted: &[BillRow]) -> AccuracyReport {
    let mut report = AccuracyReport::default();
    for column in EXTRACT_COLUMNS {
        report
            .field_accuracies
            .insert(column.to_string(), FieldAccuracy::default());
    }

    let gt_names: BTreeSet<String> = ground_truth
        .iter()
        .map(|row| text::normalize_value(&row.filename))
        .collect();
    let ex_names: BTreeSet<String> = extracted
        .iter()
        .map(|row| text::normalize_value(&row.filename))
        .collect();

    report.skipped_ground_truth = gt_names.difference(&ex_names).cloned().collect();
    report.skipped_extracted = ex_names.difference(&gt_names).cloned().collect();

    for filename in gt_names.intersection(&ex_names) {
        let gt_rows: Vec<&BillRow> = ground_truth
            .iter()
            .filter(|row| text::normalize_value(&row.filename) == *filename)
            .collect();
        let ex_rows: Vec<&BillRow> = extracted
            .iter()
            .filter(|row| text::normalize_value(&row.filename) == *filename)
            .collect();

        for column in EXTRACT_COLUMNS {
            let gt_values = column_values(&gt_rows, column);
            let ex_values = column_values(&ex_rows, column);

            let gt_counts = count_values(&gt_values);
            let ex_counts = count_values(&ex_values);

            let correct: usize = gt_counts
                .iter()
                .map(|(value, count)| count.min(ex_counts.get(value).unwrap_or(&0)))
                .sum();
            let total = gt_rows.len();

            let entry = report
                .field_accuracies
                .entry(column.to_string())
                .or_default();
            entry.correct += correct;
            entry.total += total;
            report.total_correct += correct;
            report.total_fields += total;

            if gt_counts != ex_counts {
                report.mismatches.push(Mismatch {
                    filename: filename.clone(),
                    field: column.to_string(),
                    ground_truth: gt_values,
                    extracted: ex_values,
                });
            }
        }
    }

    report
}

/// Normalized values of one column across a file's rows. Rows without the
/// column contribute nothing.
fn column_values(rows: &[&BillRow], column: &str) -> Vec<String> {
    let is_date = DATE_COLUMNS.contains(&column);
    rows.iter()
        .filter_map(|row| row.fields.get(column))
        .map(|value| {
            if is_date {
                text::normalize_date(value)
            } else {
                text::normalize_value(value)
            }
        })
        .collect()
}

fn count_values(values: &[String]) -> HashMap<&str, usize> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(value.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Render the human-readable accuracy report.
pub fn render(report: &AccuracyReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "-- Extraction Accuracy Report --");
    match report.overall_accuracy() {
        Some(accuracy) => {
            let _ = writeln!(out, "Overall Field Accuracy: {:.2}%", accuracy * 100.0);
            let _ = writeln!(
                out,
                "({} / {} correct fields)",
                report.total_correct, report.total_fields
            );
        }
        None => {
            let _ = writeln!(out, "Overall Field Accuracy: N/A (nothing scored)");
        }
    }

    let _ = writeln!(out, "\nAccuracy per Field:");
    for (field, counts) in &report.field_accuracies {
        match counts.accuracy() {
            Some(accuracy) => {
                let _ = writeln!(
                    out,
                    "- {:<15}: {:.2}% ({}/{})",
                    field,
                    accuracy * 100.0,
                    counts.correct,
                    counts.total
                );
            }
            None => {
                let _ = writeln!(out, "- {:<15}: N/A", field);
            }
        }
    }

    if !report.mismatches.is_empty() {
        let _ = writeln!(out, "\n--- Mismatches Detected ---");
        for mismatch in &report.mismatches {
            let _ = writeln!(out, "\nFile  : {}", mismatch.filename);
            let _ = writeln!(out, "Field : {}", mismatch.field);
            let _ = writeln!(out, "  - Ground Truth: {:?}", mismatch.ground_truth);
            let _ = writeln!(out, "  - Extracted   : {:?}", mismatch.extracted);
        }
    }

    if !report.skipped_ground_truth.is_empty() || !report.skipped_extracted.is_empty() {
        let _ = writeln!(out, "\n--- Files Skipped (present in one table only) ---");
        for filename in &report.skipped_ground_truth {
            let _ = writeln!(out, "- {} (ground truth only)", filename);
        }
        for filename in &report.skipped_extracted {
            let _ = writeln!(out, "- {} (extracted only)", filename);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(filename: &str, pairs: &[(&str, &str)]) -> BillRow {
        BillRow {
            filename: filename.to_string(),
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn usage_row(filename: &str, usage: &str) -> BillRow {
        row(filename, &[("Usage", usage)])
    }

    #[test]
    fn test_perfect_match_no_mismatch() {
        let gt = vec![row(
            "doc1",
            &[("Account Number", "ACC-1"), ("Usage", "1,234.50")],
        )];
        let ex = vec![row(
            "doc1",
            &[("Account Number", "acc-1"), ("Usage", "1234.50")],
        )];
        let report = score(&gt, &ex);

        let account = report.field_accuracies["Account Number"];
        assert_eq!((account.correct, account.total), (1, 1));
        let usage = report.field_accuracies["Usage"];
        assert_eq!((usage.correct, usage.total), (1, 1));
        assert!(report
            .mismatches
            .iter()
            .all(|m| m.field != "Account Number" && m.field != "Usage"));
    }

    #[test]
    fn test_duplicate_extraction_scores_full_but_logs_mismatch() {
        // Ground truth has the value once; extraction produced it twice.
        let gt = vec![usage_row("doc1", "1,234.50")];
        let ex = vec![usage_row("doc1", "1234.50"), usage_row("doc1", "1234.50")];
        let report = score(&gt, &ex);

        let usage = report.field_accuracies["Usage"];
        assert_eq!((usage.correct, usage.total), (1, 1));
        assert_eq!(usage.accuracy(), Some(1.0));

        let mismatch = report
            .mismatches
            .iter()
            .find(|m| m.field == "Usage")
            .expect("cardinality difference must be logged");
        assert_eq!(mismatch.ground_truth, vec!["1234.50"]);
        assert_eq!(mismatch.extracted, vec!["1234.50", "1234.50"]);
    }

    #[test]
    fn test_over_extraction_penalized_by_multiset() {
        // Two ground-truth rows, one matching extraction: 1/2, not 1/1.
        let gt = vec![usage_row("doc1", "100"), usage_row("doc1", "200")];
        let ex = vec![usage_row("doc1", "100"), usage_row("doc1", "999")];
        let report = score(&gt, &ex);

        let usage = report.field_accuracies["Usage"];
        assert_eq!((usage.correct, usage.total), (1, 2));
    }

    #[test]
    fn test_date_normalization_bridges_formats() {
        let gt = vec![row("doc1", &[("From Date", "2023-02-21")])];
        let ex = vec![row("doc1", &[("From Date", "02/21/2023")])];
        let report = score(&gt, &ex);

        let from_date = report.field_accuracies["From Date"];
        assert_eq!((from_date.correct, from_date.total), (1, 1));
    }

    #[test]
    fn test_zero_total_field_is_not_applicable() {
        let gt = vec![usage_row("doc1", "100")];
        let ex = vec![usage_row("doc1", "100")];
        let report = score(&gt, &ex);

        // Neither table carries a Cost column.
        let cost = report.field_accuracies["Cost"];
        assert_eq!(cost.total, 1);
        // Meter Number column absent from both: total still counts ground
        // truth rows, values are empty on both sides.
        assert!(report.overall_accuracy().is_some());

        let empty_report = score(&[], &[]);
        assert_eq!(empty_report.overall_accuracy(), None);
        assert_eq!(
            empty_report.field_accuracies["Usage"].accuracy(),
            None,
            "zero comparisons must report N/A, not 0%"
        );
    }

    #[test]
    fn test_files_in_one_table_skipped_and_listed() {
        let gt = vec![usage_row("doc1", "100"), usage_row("only-gt", "1")];
        let ex = vec![usage_row("doc1", "100"), usage_row("only-ex", "2")];
        let report = score(&gt, &ex);

        assert_eq!(report.skipped_ground_truth, vec!["only-gt"]);
        assert_eq!(report.skipped_extracted, vec!["only-ex"]);
        // Skipped files contribute nothing to totals.
        let usage = report.field_accuracies["Usage"];
        assert_eq!((usage.correct, usage.total), (1, 1));
    }

    #[test]
    fn test_missing_column_in_extracted_counts_as_wrong() {
        let gt = vec![row("doc1", &[("Usage", "100"), ("Cost", "50")])];
        let ex = vec![row("doc1", &[("Usage", "100")])];
        let report = score(&gt, &ex);

        let cost = report.field_accuracies["Cost"];
        assert_eq!((cost.correct, cost.total), (0, 1));
        assert!(report
            .mismatches
            .iter()
            .any(|m| m.field == "Cost" && m.extracted.is_empty()));
    }

    #[test]
    fn test_sentinel_values_compare_equal() {
        let gt = vec![row("doc1", &[("Meter Number", "-")])];
        let ex = vec![row("doc1", &[("Meter Number", "-")])];
        let report = score(&gt, &ex);

        let meter = report.field_accuracies["Meter Number"];
        assert_eq!((meter.correct, meter.total), (1, 1));
    }

    #[test]
    fn test_render_reports_na_and_skips() {
        let report = score(&[usage_row("only-gt", "1")], &[usage_row("only-ex", "2")]);
        let rendered = render(&report);
        assert!(rendered.contains("N/A"));
        assert!(rendered.contains("only-gt (ground truth only)"));
        assert!(rendered.contains("only-ex (extracted only)"));
    }

    #[test]
    fn test_load_table_requires_filename_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "Usage,Cost\n1,2\n").unwrap();
        assert!(matches!(
            load_table(&path),
            Err(UtilibillError::Validation { .. })
        ));
    }

    #[test]
    fn test_load_table_reads_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        std::fs::write(
            &path,
            "Filename,Account Number,Meter Number,From Date,To Date,Usage,Cost\n\
             doc1,ACC-1,MTR-9,2023-01-01,2023-01-31,\"1,204.00\",410.22\n",
        )
        .unwrap();

        let rows = load_table(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].filename, "doc1");
        assert_eq!(rows[0].fields["Usage"], "1,204.00");
    }
}
