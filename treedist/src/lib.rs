//! # treedist
//!
//! Optimal ordered tree edit distance, with edit scripts, normalized similarity and
//! all-pairs batch ranking.
//!
//! ## Algorithm Overview
//!
//! The distance between two labeled ordered trees is the minimum total cost of node
//! deletions, insertions and renames turning one into the other while preserving
//! ancestor and sibling order among the nodes that are kept. treedist computes it
//! with the keyroot decomposition of Zhang & Shasha (1989), choosing per pair between
//! leftmost and rightmost root-to-leaf paths:
//!
//! 1. **Fast paths**: empty trees and structurally identical trees (Merkle hash match)
//!    are answered without dynamic programming
//! 2. **Forward pass**: forest tables per keyroot pair, tree distances memoized by
//!    pre-order indices
//! 3. **Reconstruction**: a backward pass over the tables yields one optimal mapping,
//!    emitted as a deterministic Match / Rename / Insert / Delete script
//!
//! ## Usage
//!
//! ```
//! use treedist::{CompareOptions, NodeData, Tree, UnitCost, compare};
//!
//! let mut tree_a = Tree::new(NodeData::new("Query"));
//! let root = tree_a.root().unwrap();
//! tree_a.add_child(root, NodeData::with_value("Column", "id"));
//!
//! let mut tree_b = Tree::new(NodeData::new("Query"));
//! let root = tree_b.root().unwrap();
//! tree_b.add_child(root, NodeData::with_value("Column", "id"));
//! tree_b.add_child(root, NodeData::with_value("Column", "name"));
//!
//! let result = compare(&tree_a, &tree_b, &UnitCost, &CompareOptions::default()).unwrap();
//! assert_eq!(result.distance, 1.0);
//! for op in result.ops.unwrap() {
//!     println!("{op}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]

pub use indextree;

mod tracing_macros;
pub(crate) use tracing_macros::{debug, trace};

/// All-pairs comparison with filtering and ranking
pub mod batch;
/// Pluggable node edit costs
pub mod cost;
/// The edit distance engine
pub mod distance;
mod error;
/// Distance normalization
pub mod similarity;
/// Labeled ordered trees
pub mod tree;

pub use batch::{BatchOptions, BatchOutcome, NamedTree, PairRecord, SkippedPair, compare_all};
pub use cost::{CostKind, CostModel, FnCost, UnitCost, WeightedCost};
pub use distance::{Budget, CompareOptions, ComparisonResult, EditOp, PathStrategy, compare};
pub use error::{ConfigError, TedError};
pub use similarity::{normalize, similarity};
pub use tree::{NodeData, NodeHash, NodePath, Preorder, SyntaxNode, Tree};
