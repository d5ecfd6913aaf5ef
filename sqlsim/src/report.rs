//! Report types and their text, JSON and CSV renderings.

use core::fmt::Write as _;

use facet::Facet;
use treedist::{ComparisonResult, EditOp, Tree};

use crate::error::Error;

/// One edit operation, described with the labels of the nodes it touches.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct OperationReport {
    /// `match`, `rename`, `insert` or `delete`.
    #[facet(rename = "type")]
    pub kind: String,
    /// Node in the first tree, rendered as `label(value)`.
    pub source: Option<String>,
    /// Node in the second tree, rendered as `label(value)`.
    pub target: Option<String>,
    /// Label of the node the operation is reported against.
    pub node_type: Option<String>,
    /// Ancestor labels from the root, e.g. `Script > Query > body`.
    pub tree_path: Option<String>,
}

/// Describe a script against the trees it was computed from.
///
/// Insertions are located in the second tree, everything else in the first.
pub fn describe_operations(tree_a: &Tree, tree_b: &Tree, ops: &[EditOp]) -> Vec<OperationReport> {
    ops.iter()
        .map(|op| {
            let source = op.node_a().map(|i| tree_a.data_at(i).to_string());
            let target = op.node_b().map(|j| tree_b.data_at(j).to_string());
            let (kind, tree, index) = match *op {
                EditOp::Match { node_a, .. } => ("match", tree_a, node_a),
                EditOp::Rename { node_a, .. } => ("rename", tree_a, node_a),
                EditOp::Delete { node_a } => ("delete", tree_a, node_a),
                EditOp::Insert { node_b } => ("insert", tree_b, node_b),
            };
            OperationReport {
                kind: kind.to_owned(),
                source,
                target,
                node_type: Some(tree.data_at(index).label.clone()),
                tree_path: ancestor_labels(tree, index),
            }
        })
        .collect()
}

fn ancestor_labels(tree: &Tree, index: usize) -> Option<String> {
    let mut labels = Vec::new();
    let mut current = tree.parent(tree.node_at(index));
    while let Some(id) = current {
        labels.push(tree.get(id).label.as_str());
        current = tree.parent(id);
    }
    if labels.is_empty() {
        return None;
    }
    labels.reverse();
    Some(labels.join(" > "))
}

/// Result of comparing two SQL inputs.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct PairReport {
    /// Minimum edit cost.
    pub distance: f64,
    /// Similarity in `[0, 1]`.
    pub score: f64,
    /// Normalization bound used for `score`.
    pub max_distance: f64,
    /// Node count of the first tree.
    pub nodes_a: usize,
    /// Node count of the second tree.
    pub nodes_b: usize,
    /// Edit script, unless it was not requested.
    pub operations: Option<Vec<OperationReport>>,
}

impl PairReport {
    /// Build the report for a finished comparison.
    pub fn new(tree_a: &Tree, tree_b: &Tree, result: &ComparisonResult) -> Self {
        Self {
            distance: result.distance,
            score: result.similarity,
            max_distance: result.max_distance,
            nodes_a: result.size_a,
            nodes_b: result.size_b,
            operations: result
                .ops
                .as_deref()
                .map(|ops| describe_operations(tree_a, tree_b, ops)),
        }
    }

    /// Human-readable rendering.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Tree Edit Distance: {}", self.distance);
        let _ = write!(out, "Similarity: {:.3}", self.score);
        if let Some(operations) = &self.operations {
            out.push_str("\n\nOperations:");
            for op in operations {
                out.push('\n');
                out.push_str(&operation_line(op));
            }
        }
        out
    }

    /// JSON rendering.
    pub fn to_json(&self) -> Result<String, Error> {
        facet_json::to_string_pretty(self).map_err(|err| Error::Render {
            message: err.to_string(),
        })
    }
}

fn operation_line(op: &OperationReport) -> String {
    let none = String::new();
    let source = op.source.as_ref().unwrap_or(&none);
    let target = op.target.as_ref().unwrap_or(&none);
    let mut line = match op.kind.as_str() {
        "match" => format!("  MATCH:  {source}"),
        "rename" => format!("  RENAME: {source} -> {target}"),
        "insert" => format!("  INSERT: {target}"),
        "delete" => format!("  DELETE: {source}"),
        other => format!("  {}: {}", other.to_uppercase(), op.source.as_ref().unwrap_or(target)),
    };

    let mut details = Vec::new();
    if let Some(node_type) = &op.node_type {
        details.push(format!("[{node_type}]"));
    }
    if let Some(path) = &op.tree_path {
        details.push(format!("at {path}"));
    }
    if !details.is_empty() {
        line.push(' ');
        line.push_str(&details.join(" "));
    }
    line
}

/// A file that could not be read or parsed.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct FileError {
    /// File name relative to the scanned directory.
    pub file: String,
    /// Error message.
    pub error: String,
}

/// A pair whose comparison was abandoned.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct SkippedReport {
    pub file1: String,
    pub file2: String,
    pub reason: String,
}

/// One row of a batch report.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct ComparisonReport {
    pub file1: String,
    pub file2: String,
    pub score: f64,
    pub distance: f64,
    pub operations: Option<Vec<OperationReport>>,
}

/// Result of comparing every pair of SQL files in a directory.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// Directory as given by the caller.
    pub directory: String,
    /// Number of `.sql` files found.
    pub total_files: usize,
    /// File names, sorted.
    pub files: Vec<String>,
    /// Pairs among the parsed files, before filtering.
    pub total_comparisons: usize,
    /// Surviving pairs, most similar first.
    pub comparisons: Vec<ComparisonReport>,
    /// Files excluded from pairing.
    pub errors: Vec<FileError>,
    /// Pairs that did not finish.
    pub skipped: Vec<SkippedReport>,
    /// Distance threshold, when one was applied.
    pub max_distance_filter: Option<f64>,
    /// Top-K limit, when one was applied.
    pub top_filter: Option<usize>,
    /// Number of rows shown, when a filter was applied.
    pub shown_comparisons: Option<usize>,
}

const FILE_WIDTH: usize = 20;
const SCORE_WIDTH: usize = 8;
const DISTANCE_WIDTH: usize = 10;

impl BatchReport {
    /// Whether any file failed or any pair was skipped.
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty() || !self.skipped.is_empty()
    }

    fn is_filtered(&self) -> bool {
        self.max_distance_filter.is_some() || self.top_filter.is_some()
    }

    /// Table rendering for terminals.
    pub fn to_table(&self) -> String {
        let mut lines = Vec::new();

        let mut filters = Vec::new();
        if let Some(max) = self.max_distance_filter {
            filters.push(format!("max distance: {max}"));
        }
        if let Some(top) = self.top_filter {
            filters.push(format!("top {top}"));
        }
        let mut header = format!("Batch Comparison: {}", self.directory);
        if !filters.is_empty() {
            let _ = write!(header, " ({})", filters.join(", "));
        }
        lines.push(header);

        if self.is_filtered() {
            lines.push(format!(
                "Files: {} | Showing: {} of {} comparisons | Errors: {}",
                self.total_files,
                self.comparisons.len(),
                self.total_comparisons,
                self.errors.len()
            ));
        } else {
            lines.push(format!(
                "Files: {} | Comparisons: {} | Errors: {}",
                self.total_files,
                self.comparisons.len(),
                self.errors.len()
            ));
        }
        lines.push(String::new());

        lines.push(format!(
            "{:<fw$}{:<fw$}{:>sw$}{:>dw$}",
            "File 1",
            "File 2",
            "Score",
            "Distance",
            fw = FILE_WIDTH,
            sw = SCORE_WIDTH,
            dw = DISTANCE_WIDTH
        ));
        lines.push("─".repeat(2 * FILE_WIDTH + SCORE_WIDTH + DISTANCE_WIDTH));

        for row in &self.comparisons {
            lines.push(format!(
                "{:<fw$}{:<fw$}{:>sw$.3}{:>dw$}",
                truncate(&row.file1),
                truncate(&row.file2),
                row.score,
                row.distance,
                fw = FILE_WIDTH,
                sw = SCORE_WIDTH,
                dw = DISTANCE_WIDTH
            ));
        }

        if !self.skipped.is_empty() {
            lines.push(String::new());
            lines.push("Skipped:".to_owned());
            for skipped in &self.skipped {
                lines.push(format!(
                    "  - {} / {}: {}",
                    skipped.file1, skipped.file2, skipped.reason
                ));
            }
        }

        if !self.errors.is_empty() {
            lines.push(String::new());
            lines.push("Errors:".to_owned());
            for error in &self.errors {
                lines.push(format!("  - {}: {}", error.file, error.error));
            }
        }

        lines.join("\n")
    }

    /// JSON rendering, including every operation of every surviving pair.
    pub fn to_json(&self) -> Result<String, Error> {
        facet_json::to_string_pretty(self).map_err(|err| Error::Render {
            message: err.to_string(),
        })
    }

    /// CSV rendering with one row per surviving pair.
    pub fn to_csv(&self) -> String {
        let mut lines = vec!["file1,file2,score,distance".to_owned()];
        for row in &self.comparisons {
            lines.push(format!(
                "{},{},{},{}",
                csv_field(&row.file1),
                csv_field(&row.file2),
                row.score,
                row.distance
            ));
        }
        lines.join("\n")
    }
}

/// Names that would fill the column are cut so columns stay separated.
fn truncate(name: &str) -> String {
    if name.chars().count() >= FILE_WIDTH {
        name.chars().take(FILE_WIDTH - 1).collect()
    } else {
        name.to_owned()
    }
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;
    use treedist::{CompareOptions, NodeData, UnitCost, compare};

    fn select(table: &str) -> Tree {
        let mut tree = Tree::new(NodeData::new("Query"));
        let root = tree.root().unwrap();
        let from = tree.add_child(root, NodeData::new("from"));
        tree.add_child(from, NodeData::with_value("Identifier", table));
        tree
    }

    fn pair_report() -> PairReport {
        let a = select("t");
        let b = select("t2");
        let result = compare(&a, &b, &UnitCost, &CompareOptions::default()).unwrap();
        PairReport::new(&a, &b, &result)
    }

    fn batch_report() -> BatchReport {
        BatchReport {
            directory: "queries".to_owned(),
            total_files: 3,
            files: vec!["a.sql".into(), "b.sql".into(), "broken.sql".into()],
            total_comparisons: 1,
            comparisons: vec![ComparisonReport {
                file1: "a.sql".into(),
                file2: "a_very_long_file_name_for_tables.sql".into(),
                score: 0.875,
                distance: 1.0,
                operations: Some(vec![]),
            }],
            errors: vec![FileError {
                file: "broken.sql".into(),
                error: "failed to parse broken.sql: Expected: an expression".into(),
            }],
            skipped: vec![],
            max_distance_filter: None,
            top_filter: None,
            shown_comparisons: None,
        }
    }

    #[test]
    fn test_operations_carry_labels_and_paths() {
        let report = pair_report();
        let ops = report.operations.unwrap();
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].kind, "match");
        assert_eq!(ops[0].tree_path, None);
        assert_eq!(ops[2].kind, "rename");
        assert_eq!(ops[2].source.as_deref(), Some("Identifier(t)"));
        assert_eq!(ops[2].target.as_deref(), Some("Identifier(t2)"));
        assert_eq!(ops[2].node_type.as_deref(), Some("Identifier"));
        assert_eq!(ops[2].tree_path.as_deref(), Some("Query > from"));
    }

    #[test]
    fn test_insert_is_located_in_second_tree() {
        let a = select("t");
        let mut b = select("t");
        let root = b.root().unwrap();
        b.add_child(root, NodeData::with_value("limit", "10"));
        let result = compare(&a, &b, &UnitCost, &CompareOptions::default()).unwrap();
        let ops = describe_operations(&a, &b, result.ops.as_deref().unwrap());
        let insert = ops.iter().find(|op| op.kind == "insert").unwrap();
        assert_eq!(insert.source, None);
        assert_eq!(insert.target.as_deref(), Some("limit(10)"));
        assert_eq!(insert.tree_path.as_deref(), Some("Query"));
    }

    #[test]
    fn test_pair_text_format() {
        let text = pair_report().to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Tree Edit Distance: 1");
        assert_eq!(lines[1], "Similarity: 0.833");
        assert_eq!(lines[3], "Operations:");
        assert_eq!(lines[4], "  MATCH:  Query [Query]");
        assert_eq!(
            lines[6],
            "  RENAME: Identifier(t) -> Identifier(t2) [Identifier] at Query > from"
        );
    }

    #[test]
    fn test_pair_text_without_operations() {
        let mut report = pair_report();
        report.operations = None;
        assert!(!report.to_text().contains("Operations:"));
    }

    #[test]
    fn test_pair_json_round_trips() {
        let report = pair_report();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"type\""));
        assert!(json.starts_with("{\n"), "expected indented JSON: {json}");
        let back: PairReport = facet_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_batch_table_layout() {
        let table = batch_report().to_table();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "Batch Comparison: queries");
        assert_eq!(lines[1], "Files: 3 | Comparisons: 1 | Errors: 1");
        assert!(lines[3].starts_with("File 1"));
        assert_eq!(lines[4].chars().count(), 58);
        assert!(lines[5].starts_with("a.sql"));
        // 19 characters of the long name, then the score column.
        assert!(lines[5].contains("a_very_long_file_na "));
        assert!(lines[5].contains("0.875"));
        assert!(table.contains("Errors:\n  - broken.sql: failed to parse"));
    }

    #[test]
    fn test_batch_table_shows_filters() {
        let mut report = batch_report();
        report.max_distance_filter = Some(2.0);
        report.top_filter = Some(5);
        report.shown_comparisons = Some(1);
        let table = report.to_table();
        assert!(table.starts_with("Batch Comparison: queries (max distance: 2, top 5)"));
        assert!(table.contains("Showing: 1 of 1 comparisons"));
    }

    #[test]
    fn test_batch_csv() {
        let mut report = batch_report();
        report.comparisons[0].file2 = "with,comma.sql".into();
        let csv = report.to_csv();
        assert_eq!(csv, "file1,file2,score,distance\na.sql,\"with,comma.sql\",0.875,1");
    }

    #[test]
    fn test_batch_json_round_trips() {
        let report = batch_report();
        let back: BatchReport = facet_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(back, report);
        assert!(report.is_partial());
    }
}
