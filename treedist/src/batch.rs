//! All-pairs comparison over a collection of named trees.
//!
//! [`compare_all`] compares every unordered pair exactly once, optionally on the rayon
//! pool, then filters and ranks the records. The output order depends only on the
//! inputs, never on scheduling.

use core::cmp::Ordering;

use rapidhash::RapidHashSet as HashSet;
use rayon::prelude::*;

use crate::cost::CostModel;
use crate::distance::{CompareOptions, ComparisonResult, check_node_costs, compare};
use crate::error::{ConfigError, TedError};
use crate::tree::Tree;
use crate::{debug, trace};

/// A tree with the name it is reported under.
#[derive(Debug, Clone)]
pub struct NamedTree {
    /// Unique name, e.g. a file name.
    pub name: String,
    /// The tree itself.
    pub tree: Tree,
}

impl NamedTree {
    /// Pair a name with a tree.
    pub fn new(name: impl Into<String>, tree: Tree) -> Self {
        Self {
            name: name.into(),
            tree,
        }
    }
}

/// Filtering, ranking and per-pair settings for [`compare_all`].
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Keep only pairs whose distance is at most this value (inclusive).
    pub max_distance: Option<f64>,
    /// Keep only the first K pairs after ordering.
    pub top_k: Option<usize>,
    /// Options forwarded to every pairwise comparison.
    pub compare: CompareOptions,
    /// Run comparisons on the rayon thread pool.
    pub parallel: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_distance: None,
            top_k: None,
            compare: CompareOptions::default(),
            parallel: true,
        }
    }
}

impl BatchOptions {
    /// Reject configurations that can never produce meaningful output.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(value) = self.max_distance
            && (value.is_nan() || value < 0.0)
        {
            return Err(ConfigError::InvalidMaxDistance { value });
        }
        if self.top_k == Some(0) {
            return Err(ConfigError::InvalidTopK);
        }
        Ok(())
    }
}

/// Comparison of one unordered pair. `left` precedes `right` in the input.
#[derive(Debug, Clone)]
pub struct PairRecord {
    /// Name of the earlier input.
    pub left: String,
    /// Name of the later input.
    pub right: String,
    /// Distance, similarity and optional script.
    pub result: ComparisonResult,
}

/// A pair whose comparison did not finish.
#[derive(Debug)]
pub struct SkippedPair {
    /// Name of the earlier input.
    pub left: String,
    /// Name of the later input.
    pub right: String,
    /// Why the pair was skipped.
    pub reason: TedError,
}

/// Everything [`compare_all`] produced.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Surviving records in presentation order.
    pub records: Vec<PairRecord>,
    /// Pairs that failed, in enumeration order.
    pub skipped: Vec<SkippedPair>,
    /// Number of unordered pairs, `n * (n - 1) / 2`, before any filtering.
    pub total_pairs: usize,
}

/// Compare every unordered pair of `trees`.
///
/// Records are ordered by similarity (descending), then distance (ascending), then
/// left name, then right name. `max_distance` is applied before `top_k`.
///
/// A pair that runs out of budget or is cancelled is reported in
/// [`BatchOutcome::skipped`] and never aborts the rest of the batch. A cost model that
/// breaks its contract fails the whole batch with [`ConfigError::CostModel`]: per-node
/// costs are checked before any comparison, pairwise renames as they are met.
pub fn compare_all<C: CostModel + ?Sized>(
    trees: &[NamedTree],
    costs: &C,
    options: &BatchOptions,
) -> Result<BatchOutcome, ConfigError> {
    options.validate()?;

    let mut seen = HashSet::default();
    for named in trees {
        if !seen.insert(named.name.as_str()) {
            return Err(ConfigError::DuplicateName {
                name: named.name.clone(),
            });
        }
    }
    for named in trees {
        if let Err(TedError::CostFunctionViolation {
            operation,
            node,
            cost,
        }) = check_node_costs(&named.tree, costs)
        {
            return Err(ConfigError::CostModel {
                operation,
                node,
                cost,
            });
        }
    }

    let pairs: Vec<(usize, usize)> = (0..trees.len())
        .flat_map(|i| (i + 1..trees.len()).map(move |j| (i, j)))
        .collect();
    let total_pairs = pairs.len();
    debug!(trees = trees.len(), pairs = total_pairs, parallel = options.parallel, "batch start");

    let run = |&(i, j): &(usize, usize)| {
        trace!(left = %trees[i].name, right = %trees[j].name, "comparing pair");
        (i, j, compare(&trees[i].tree, &trees[j].tree, costs, &options.compare))
    };
    let outcomes: Vec<_> = if options.parallel {
        pairs.par_iter().map(run).collect()
    } else {
        pairs.iter().map(run).collect()
    };

    let mut records = Vec::with_capacity(total_pairs);
    let mut skipped = Vec::new();
    for (i, j, outcome) in outcomes {
        let left = trees[i].name.clone();
        let right = trees[j].name.clone();
        match outcome {
            Ok(result) => records.push(PairRecord {
                left,
                right,
                result,
            }),
            Err(TedError::CostFunctionViolation {
                operation,
                node,
                cost,
            }) => {
                return Err(ConfigError::CostModel {
                    operation,
                    node,
                    cost,
                });
            }
            Err(reason) => {
                debug!(%left, %right, %reason, "pair skipped");
                skipped.push(SkippedPair {
                    left,
                    right,
                    reason,
                })
            }
        }
    }

    if let Some(threshold) = options.max_distance {
        records.retain(|record| record.result.distance <= threshold);
    }
    records.sort_by(presentation_order);
    if let Some(k) = options.top_k {
        records.truncate(k);
    }

    debug!(kept = records.len(), skipped = skipped.len(), "batch done");
    Ok(BatchOutcome {
        records,
        skipped,
        total_pairs,
    })
}

fn presentation_order(a: &PairRecord, b: &PairRecord) -> Ordering {
    b.result
        .similarity
        .total_cmp(&a.result.similarity)
        .then_with(|| a.result.distance.total_cmp(&b.result.distance))
        .then_with(|| a.left.cmp(&b.left))
        .then_with(|| a.right.cmp(&b.right))
}
