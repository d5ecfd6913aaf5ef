//! Integration tests over the SQL files in `tests/fixtures/`.

use sqlsim::{Filters, Options, compare_directory, compare_files};
use std::path::{Path, PathBuf};

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn fixture(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

#[test]
fn fixture_against_itself_is_identical() {
    let path = fixture("orders_by_user.sql");
    let cmp = compare_files(&path, &path, &Options::default()).unwrap();
    assert_eq!(cmp.result.distance, 0.0);
    assert_eq!(cmp.result.similarity, 1.0);
    let ops = cmp.result.ops.as_ref().unwrap();
    assert_eq!(ops.len(), cmp.result.size_a);
    assert!(ops.iter().all(|op| op.is_match()));
}

#[test]
fn changed_literal_is_one_rename() {
    let cmp = compare_files(
        &fixture("orders_by_user.sql"),
        &fixture("orders_by_user_pending.sql"),
        &Options::default(),
    )
    .unwrap();
    assert_eq!(cmp.result.distance, 1.0);

    let report = cmp.report();
    let ops = report.operations.unwrap();
    let renamed: Vec<_> = ops.iter().filter(|op| op.kind == "rename").collect();
    assert_eq!(renamed.len(), 1);
    assert!(renamed[0].source.as_deref().unwrap_or_default().contains("completed"));
    assert!(renamed[0].target.as_deref().unwrap_or_default().contains("pending"));
}

#[test]
fn unrelated_queries_score_low() {
    let cmp = compare_files(
        &fixture("orders_by_user.sql"),
        &fixture("select_one.sql"),
        &Options::default(),
    )
    .unwrap();
    assert!(cmp.result.distance > 10.0);
    assert!(cmp.result.similarity < 0.5);
    assert!(cmp.result.similarity >= 0.0);
}

#[test]
fn batch_over_fixtures() {
    let report = compare_directory(&fixtures_dir(), &Options::default(), &Filters::default()).unwrap();
    assert_eq!(report.total_files, 4);
    assert_eq!(report.total_comparisons, 6);
    assert_eq!(report.comparisons.len(), 6);
    assert!(report.errors.is_empty());

    let best = &report.comparisons[0];
    assert_eq!(best.file1, "orders_by_user.sql");
    assert_eq!(best.file2, "orders_by_user_pending.sql");
    assert!(
        report
            .comparisons
            .windows(2)
            .all(|w| w[0].score >= w[1].score)
    );
}

#[test]
fn batch_top_one() {
    let filters = Filters {
        top_k: Some(1),
        ..Filters::default()
    };
    let report = compare_directory(&fixtures_dir(), &Options::default(), &filters).unwrap();
    assert_eq!(report.comparisons.len(), 1);
    assert_eq!(report.shown_comparisons, Some(1));
    assert!(report.to_table().contains("Showing: 1 of 6 comparisons"));
}
