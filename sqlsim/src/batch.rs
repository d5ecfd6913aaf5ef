//! Directory-wide comparison of SQL files.

use std::io;
use std::path::{Path, PathBuf};

use rapidhash::RapidHashMap as HashMap;
use rayon::prelude::*;
use treedist::{BatchOptions, NamedTree, Tree, compare_all};

use crate::error::Error;
use crate::parser::parse_sql;
use crate::report::{BatchReport, ComparisonReport, FileError, SkippedReport, describe_operations};
use crate::service::{Options, read_sql};
use crate::{debug, trace};

/// Which pairs a batch report keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Filters {
    /// Keep pairs with distance at most this value (inclusive).
    pub max_distance: Option<f64>,
    /// Keep the K most similar pairs.
    pub top_k: Option<usize>,
}

/// The `.sql` files of a directory, plus the entries that could not be inspected.
#[derive(Debug, Default)]
pub struct Listing {
    /// File names, sorted.
    pub files: Vec<String>,
    /// Directory entries whose metadata could not be read.
    pub unreadable: Vec<FileError>,
}

/// List the `.sql` files directly inside `dir`, sorted by name.
///
/// The extension match is case-insensitive; subdirectories are not searched.
pub fn scan_directory(dir: &Path) -> Result<Listing, Error> {
    if !dir.is_dir() {
        return Err(Error::DirectoryNotFound {
            path: dir.display().to_string(),
        });
    }
    let entries = std::fs::read_dir(dir).map_err(|err| Error::Io {
        path: dir.display().to_string(),
        message: err.to_string(),
    })?;
    Ok(listing(dir, entries.map(|entry| entry.map(|entry| entry.path()))))
}

fn listing(dir: &Path, entries: impl IntoIterator<Item = io::Result<PathBuf>>) -> Listing {
    let mut out = Listing::default();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                debug!(directory = %dir.display(), %err, "unreadable directory entry");
                out.unreadable.push(FileError {
                    file: dir.display().to_string(),
                    error: format!("unreadable directory entry: {err}"),
                });
                continue;
            }
        };
        let is_sql = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("sql"));
        if is_sql
            && path.is_file()
            && let Some(name) = path.file_name().and_then(|n| n.to_str())
        {
            out.files.push(name.to_owned());
        }
    }
    out.files.sort();
    out
}

/// Parse every `.sql` file in `dir` and compare all pairs of the ones that parse.
///
/// Filters are validated before the directory is touched. Files that cannot be read
/// or parsed are listed in [`BatchReport::errors`] and left out of pairing.
pub fn compare_directory(dir: &Path, options: &Options, filters: &Filters) -> Result<BatchReport, Error> {
    let batch_options = BatchOptions {
        max_distance: filters.max_distance,
        top_k: filters.top_k,
        compare: options.compare.clone(),
        parallel: true,
    };
    batch_options.validate()?;

    let Listing { files, unreadable } = scan_directory(dir)?;
    if files.is_empty() && unreadable.is_empty() {
        return Err(Error::NoSqlFiles {
            path: dir.display().to_string(),
        });
    }
    debug!(directory = %dir.display(), files = files.len(), "scanned directory");

    let parsed: Vec<(&String, Result<Tree, Error>)> = files
        .par_iter()
        .map(|name| {
            trace!(%name, "parsing");
            let tree = read_sql(&dir.join(name))
                .and_then(|sql| parse_sql(&sql, options.dialect))
                .map_err(|err| err.in_file(name));
            (name, tree)
        })
        .collect();

    let mut trees = Vec::with_capacity(parsed.len());
    let mut errors = unreadable;
    for (name, tree) in parsed {
        match tree {
            Ok(tree) => trees.push(NamedTree::new(name.as_str(), tree)),
            Err(err) => errors.push(FileError {
                file: name.clone(),
                error: err.to_string(),
            }),
        }
    }

    let outcome = compare_all(&trees, &options.costs, &batch_options)?;
    let by_name: HashMap<&str, &Tree> = trees
        .iter()
        .map(|named| (named.name.as_str(), &named.tree))
        .collect();

    let comparisons: Vec<ComparisonReport> = outcome
        .records
        .iter()
        .map(|record| {
            let operations = match (
                record.result.ops.as_deref(),
                by_name.get(record.left.as_str()),
                by_name.get(record.right.as_str()),
            ) {
                (Some(ops), Some(a), Some(b)) => Some(describe_operations(a, b, ops)),
                _ => None,
            };
            ComparisonReport {
                file1: record.left.clone(),
                file2: record.right.clone(),
                score: record.result.similarity,
                distance: record.result.distance,
                operations,
            }
        })
        .collect();

    let skipped = outcome
        .skipped
        .iter()
        .map(|pair| SkippedReport {
            file1: pair.left.clone(),
            file2: pair.right.clone(),
            reason: pair.reason.to_string(),
        })
        .collect();

    let filtered = filters.max_distance.is_some() || filters.top_k.is_some();
    Ok(BatchReport {
        directory: dir.display().to_string(),
        total_files: files.len(),
        total_comparisons: outcome.total_pairs,
        shown_comparisons: filtered.then_some(comparisons.len()),
        files,
        comparisons,
        errors,
        skipped,
        max_distance_filter: filters.max_distance,
        top_filter: filters.top_k,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use facet_testhelpers::test;

    fn corpus() -> TempDir {
        let dir = TempDir::new().unwrap();
        dir.child("orders.sql")
            .write_str("SELECT id, total FROM orders WHERE status = 'open'")
            .unwrap();
        dir.child("orders_closed.SQL")
            .write_str("SELECT id, total FROM orders WHERE status = 'closed'")
            .unwrap();
        dir.child("users.sql")
            .write_str("SELECT u.name, COUNT(*) FROM users u GROUP BY u.name")
            .unwrap();
        dir.child("notes.txt").write_str("not sql").unwrap();
        dir.child("nested").create_dir_all().unwrap();
        dir.child("nested/deep.sql").write_str("SELECT 1").unwrap();
        dir
    }

    #[test]
    fn test_scan_is_sorted_case_insensitive_and_flat() {
        let dir = corpus();
        let listing = scan_directory(dir.path()).unwrap();
        assert_eq!(listing.files, vec!["orders.sql", "orders_closed.SQL", "users.sql"]);
        assert!(listing.unreadable.is_empty());
    }

    #[test]
    fn test_unreadable_entries_are_recorded() {
        let dir = corpus();
        let entries = vec![
            Ok(dir.path().join("orders.sql")),
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "stat failed")),
            Ok(dir.path().join("users.sql")),
        ];
        let found = listing(dir.path(), entries);
        assert_eq!(found.files, vec!["orders.sql", "users.sql"]);
        assert_eq!(found.unreadable.len(), 1);
        assert!(found.unreadable[0].error.contains("stat failed"));
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let err = scan_directory(&dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, Error::DirectoryNotFound { .. }));
    }

    #[test]
    fn test_all_pairs_ranked() {
        let dir = corpus();
        let report = compare_directory(dir.path(), &Options::default(), &Filters::default()).unwrap();
        assert_eq!(report.total_files, 3);
        assert_eq!(report.total_comparisons, 3);
        assert_eq!(report.comparisons.len(), 3);
        assert!(report.errors.is_empty());
        assert!(!report.is_partial());
        assert_eq!(report.shown_comparisons, None);

        let best = &report.comparisons[0];
        assert_eq!((best.file1.as_str(), best.file2.as_str()), ("orders.sql", "orders_closed.SQL"));
        assert_eq!(best.distance, 1.0);
        assert!(best.operations.as_ref().is_some_and(|ops| !ops.is_empty()));
    }

    #[test]
    fn test_parse_failures_are_reported_not_fatal() {
        let dir = corpus();
        dir.child("broken.sql").write_str("SELECT * FROM WHERE AND").unwrap();
        let report = compare_directory(dir.path(), &Options::default(), &Filters::default()).unwrap();
        assert_eq!(report.total_files, 4);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].file, "broken.sql");
        assert_eq!(report.total_comparisons, 3);
        assert!(report.comparisons.iter().all(|c| c.file1 != "broken.sql" && c.file2 != "broken.sql"));
        assert!(report.is_partial());
    }

    #[test]
    fn test_filters_applied_and_recorded() {
        let dir = corpus();
        let filters = Filters {
            max_distance: Some(1.0),
            top_k: Some(5),
        };
        let report = compare_directory(dir.path(), &Options::default(), &filters).unwrap();
        assert_eq!(report.comparisons.len(), 1);
        assert_eq!(report.shown_comparisons, Some(1));
        assert_eq!(report.total_comparisons, 3);
        assert_eq!(report.max_distance_filter, Some(1.0));
        assert_eq!(report.top_filter, Some(5));
    }

    #[test]
    fn test_invalid_filters_checked_before_scanning() {
        let dir = TempDir::new().unwrap();
        let filters = Filters {
            top_k: Some(0),
            ..Filters::default()
        };
        // The directory does not exist, yet the filter error wins.
        let err = compare_directory(&dir.path().join("absent"), &Options::default(), &filters).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_broken_cost_model_fails_once() {
        let dir = corpus();
        let options = Options {
            costs: treedist::WeightedCost {
                delete: -1.0,
                ..treedist::WeightedCost::default()
            },
            ..Options::default()
        };
        let err = compare_directory(dir.path(), &options, &Filters::default()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }), "{err:?}");
    }

    #[test]
    fn test_directory_without_sql_files() {
        let dir = TempDir::new().unwrap();
        dir.child("readme.md").write_str("# queries").unwrap();
        let err = compare_directory(dir.path(), &Options::default(), &Filters::default()).unwrap_err();
        assert!(matches!(err, Error::NoSqlFiles { .. }));
    }
}
