//! CSV-to-report scoring scenarios.

use std::path::PathBuf;
use tempfile::tempdir;
use utilibill::{compare_files, render};

fn write_csv(dir: &std::path::Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_compare_files_end_to_end() {
    let dir = tempdir().unwrap();
    let ground_truth = write_csv(
        dir.path(),
        "ground_truth.csv",
        "Filename,Account Number,Meter Number,From Date,To Date,Usage,Cost\n\
         doc1,7851218574918,MTR-001,2023-01-01,2023-01-31,\"1,234.50\",410.22\n\
         doc2,555,MTR-002,2023-02-01,2023-02-28,99.00,-\n",
    );
    // doc1 matches after normalization (comma stripped, date reformatted);
    // doc2's usage is wrong.
    let extracted = write_csv(
        dir.path(),
        "extracted.csv",
        "Filename,Account Number,Meter Number,From Date,To Date,Usage,Cost\n\
         doc1,7851218574918,MTR-001,01/01/2023,2023-01-31,1234.50,$410.22\n\
         doc2,555,MTR-002,2023-02-01,2023-02-28,17.00,-\n",
    );

    let report = compare_files(&ground_truth, &extracted).unwrap();

    let usage = report.field_accuracies["Usage"];
    assert_eq!((usage.correct, usage.total), (1, 2));

    let from_date = report.field_accuracies["From Date"];
    assert_eq!((from_date.correct, from_date.total), (2, 2));

    let cost = report.field_accuracies["Cost"];
    assert_eq!((cost.correct, cost.total), (2, 2), "sentinel matches sentinel");

    assert_eq!(report.total_fields, 12);
    assert_eq!(report.total_correct, 11);

    let mismatches: Vec<&str> = report.mismatches.iter().map(|m| m.field.as_str()).collect();
    assert_eq!(mismatches, vec!["Usage"]);
}

#[test]
fn test_duplicate_value_scenario_from_report() {
    let dir = tempdir().unwrap();
    let ground_truth = write_csv(
        dir.path(),
        "ground_truth.csv",
        "Filename,Usage\ndoc1,\"1,234.50\"\n",
    );
    let extracted = write_csv(
        dir.path(),
        "extracted.csv",
        "Filename,Usage\ndoc1,1234.50\ndoc1,1234.50\n",
    );

    let report = compare_files(&ground_truth, &extracted).unwrap();

    // Multiset intersection is 1 of 1 despite the duplicate, but the
    // cardinality difference is still recorded.
    let usage = report.field_accuracies["Usage"];
    assert_eq!((usage.correct, usage.total), (1, 1));
    assert_eq!(usage.accuracy(), Some(1.0));
    assert!(report
        .mismatches
        .iter()
        .any(|m| m.field == "Usage" && m.extracted.len() == 2));
}

#[test]
fn test_disjoint_tables_score_nothing() {
    let dir = tempdir().unwrap();
    let ground_truth = write_csv(dir.path(), "gt.csv", "Filename,Usage\nalpha,1\n");
    let extracted = write_csv(dir.path(), "ex.csv", "Filename,Usage\nbeta,1\n");

    let report = compare_files(&ground_truth, &extracted).unwrap();
    assert_eq!(report.overall_accuracy(), None);
    assert_eq!(report.skipped_ground_truth, vec!["alpha"]);
    assert_eq!(report.skipped_extracted, vec!["beta"]);

    let rendered = render(&report);
    assert!(rendered.contains("N/A"));
    assert!(rendered.contains("alpha"));
    assert!(rendered.contains("beta"));
}
