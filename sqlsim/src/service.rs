//! Pairwise comparison of SQL text and SQL files.

use std::io::ErrorKind;
use std::path::Path;

use treedist::{CompareOptions, ComparisonResult, Tree, WeightedCost, compare};

use crate::debug;
use crate::error::Error;
use crate::parser::{Dialect, parse_sql};
use crate::report::PairReport;

/// Settings shared by pair and directory comparisons.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Dialect used to parse every input.
    pub dialect: Dialect,
    /// Node edit costs. The default charges 1 for every edit.
    pub costs: WeightedCost,
    /// Engine settings for each comparison.
    pub compare: CompareOptions,
}

/// Two parsed inputs and the result of comparing them.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub tree_a: Tree,
    pub tree_b: Tree,
    pub result: ComparisonResult,
}

impl Comparison {
    /// Report with operations resolved against both trees.
    pub fn report(&self) -> PairReport {
        PairReport::new(&self.tree_a, &self.tree_b, &self.result)
    }
}

/// Compare two SQL strings.
pub fn compare_sql(sql_a: &str, sql_b: &str, options: &Options) -> Result<Comparison, Error> {
    let tree_a = parse_sql(sql_a, options.dialect)?;
    let tree_b = parse_sql(sql_b, options.dialect)?;
    compare_trees(tree_a, tree_b, options)
}

/// Compare two SQL files.
///
/// Both files are read before either is parsed, so a missing second file is reported
/// even when the first one does not parse.
pub fn compare_files(path_a: &Path, path_b: &Path, options: &Options) -> Result<Comparison, Error> {
    let sql_a = read_sql(path_a)?;
    let sql_b = read_sql(path_b)?;
    let tree_a = parse_sql(&sql_a, options.dialect).map_err(|e| e.in_file(&display(path_a)))?;
    let tree_b = parse_sql(&sql_b, options.dialect).map_err(|e| e.in_file(&display(path_b)))?;
    compare_trees(tree_a, tree_b, options)
}

fn compare_trees(tree_a: Tree, tree_b: Tree, options: &Options) -> Result<Comparison, Error> {
    debug!(nodes_a = tree_a.len(), nodes_b = tree_b.len(), "comparing pair");
    let result = compare(&tree_a, &tree_b, &options.costs, &options.compare)?;
    Ok(Comparison {
        tree_a,
        tree_b,
        result,
    })
}

/// Read a SQL file, telling a missing file apart from other I/O failures.
pub(crate) fn read_sql(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => Error::FileNotFound {
            path: display(path),
        },
        _ => Error::Io {
            path: display(path),
            message: err.to_string(),
        },
    })
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use facet_testhelpers::test;
    use treedist::EditOp;

    #[test]
    fn test_single_table_rename() {
        let cmp = compare_sql("SELECT * FROM t", "SELECT * FROM t2", &Options::default()).unwrap();
        let result = &cmp.result;
        assert_eq!(result.distance, 1.0);
        assert_eq!(result.size_a, result.size_b);
        let expected = 1.0 - 1.0 / (result.size_a + result.size_b) as f64;
        assert!((result.similarity - expected).abs() < 1e-12);

        let ops = result.ops.as_ref().unwrap();
        let renames: Vec<&EditOp> = ops.iter().filter(|op| !op.is_match()).collect();
        assert_eq!(renames.len(), 1);
        assert!(matches!(renames[0], EditOp::Rename { .. }));
    }

    #[test]
    fn test_missing_file_is_distinct_from_parse_error() {
        let dir = assert_fs::TempDir::new().unwrap();
        let good = dir.child("good.sql");
        good.write_str("SELECT 1").unwrap();
        let bad = dir.child("bad.sql");
        bad.write_str("SELECT * FROM t WHERE AND").unwrap();

        let missing = compare_files(good.path(), &dir.path().join("nope.sql"), &Options::default());
        assert!(matches!(missing, Err(Error::FileNotFound { .. })));

        let parse = compare_files(good.path(), bad.path(), &Options::default());
        match parse {
            Err(Error::Parse { origin, .. }) => assert!(origin.ends_with("bad.sql")),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_cheap_value_renames_lower_the_distance() {
        let options = Options {
            costs: WeightedCost {
                revalue: 0.25,
                ..WeightedCost::default()
            },
            ..Options::default()
        };
        let cmp = compare_sql("SELECT * FROM t", "SELECT * FROM t2", &options).unwrap();
        assert_eq!(cmp.result.distance, 0.25);
    }

    #[test]
    fn test_report_from_comparison() {
        let cmp = compare_sql("SELECT a FROM t", "SELECT a FROM t", &Options::default()).unwrap();
        let report = cmp.report();
        assert_eq!(report.distance, 0.0);
        assert_eq!(report.score, 1.0);
        assert!(report.operations.unwrap().iter().all(|op| op.kind == "match"));
    }
}
