//! Optimal ordered tree edit distance with edit script reconstruction.
//!
//! Two decompositions fill the same memo of tree distances, keyed by
//! `(pre-order in A, pre-order in B)` and alive for one comparison only:
//!
//! - **Keyroots** (Zhang & Shasha, "Simple fast algorithms for the editing distance
//!   between trees and related problems", 1989): both trees are decomposed along
//!   leftmost paths or along rightmost paths, and one forest table is filled per pair
//!   of keyroots with the three-way recurrence (delete, insert, match/rename + child
//!   forests).
//! - **Heavy paths** (Demaine et al., 2007): each subtree pair is split along the
//!   heavy path of its larger side; see the `heavy` module.
//!
//! [`PathStrategy::Auto`] counts the cells each plan would fill from subtree sizes
//! alone and runs the cheapest. Reconstruction (optional) recomputes forest tables
//! from the memo and walks them backwards to recover one optimal mapping, which is
//! then emitted as an edit script in pre-order.
//!
//! ## Complexity
//!
//! Memory is O(|A|·|B|) for the memo. Keyroots cost the product of the two trees'
//! decomposition costs (the sum of subtree sizes over keyroots), which is
//! O(|A|·|B|·min(depth, leaves)²) and reaches O(|A|²·|B|²) on trees whose heavy
//! children alternate sides. Heavy paths cap that at O(n²·m·(1 + log(m/n))) for
//! n ≥ m, holding one (m+1)² table per removal of the current path block. The
//! optional [`Budget`] bounds either plan.
//!
//! ## Determinism
//!
//! Equal-cost choices are resolved in a fixed order: match/rename, then delete, then
//! insert. The emitted script merges both pre-orders left to right, deletes before
//! inserts, so the same inputs always produce the same script.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;
use std::time::Instant;

use crate::cost::{CostKind, CostModel};
use crate::error::TedError;
use crate::similarity::similarity;
use crate::tree::{Layout, NodeData, Tree};
use crate::{debug, trace};

mod heavy;

use heavy::Shape;

/// Which family of root-to-leaf paths decomposes the trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathStrategy {
    /// Pick the plan with the fewest cells for this pair of trees.
    #[default]
    Auto,
    /// Decompose along leftmost paths (classic Zhang & Shasha).
    Leftmost,
    /// Decompose along rightmost paths.
    Rightmost,
    /// Decompose along the heavy path of the larger subtree in every pair.
    HeavyPath,
}

/// Limits on the work a single comparison may do.
///
/// Checked once per forest table, in both the forward pass and reconstruction. Tripping any limit aborts that comparison
/// only; nothing is shared between comparisons.
#[derive(Debug, Clone, Default)]
pub struct Budget {
    /// Maximum number of dynamic-programming cells to evaluate.
    pub max_cells: Option<u64>,
    /// Wall-clock limit, measured from the start of the comparison.
    pub time_limit: Option<Duration>,
    /// Cooperative cancellation flag, may be set from any thread.
    pub cancel: Option<Arc<AtomicBool>>,
}

/// Options for [`compare`].
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Reconstruct the edit script. Score-only callers can skip it.
    pub compute_script: bool,
    /// Path family used for the decomposition.
    pub strategy: PathStrategy,
    /// Optional work limit.
    pub budget: Option<Budget>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            compute_script: true,
            strategy: PathStrategy::Auto,
            budget: None,
        }
    }
}

/// One step of an edit script. Nodes are referenced by pre-order index.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditOp {
    /// Equivalent nodes kept as they are.
    Match {
        /// Node in tree A
        node_a: usize,
        /// Node in tree B
        node_b: usize,
    },

    /// Node kept in place with a different label or value.
    Rename {
        /// Node in tree A
        node_a: usize,
        /// Node in tree B
        node_b: usize,
    },

    /// Node present only in tree B.
    Insert {
        /// Node in tree B
        node_b: usize,
    },

    /// Node present only in tree A.
    Delete {
        /// Node in tree A
        node_a: usize,
    },
}

impl EditOp {
    /// Pre-order index in tree A, if the operation touches tree A.
    pub fn node_a(&self) -> Option<usize> {
        match *self {
            EditOp::Match { node_a, .. }
            | EditOp::Rename { node_a, .. }
            | EditOp::Delete { node_a } => Some(node_a),
            EditOp::Insert { .. } => None,
        }
    }

    /// Pre-order index in tree B, if the operation touches tree B.
    pub fn node_b(&self) -> Option<usize> {
        match *self {
            EditOp::Match { node_b, .. }
            | EditOp::Rename { node_b, .. }
            | EditOp::Insert { node_b } => Some(node_b),
            EditOp::Delete { .. } => None,
        }
    }

    /// Whether this step leaves the node unchanged.
    pub fn is_match(&self) -> bool {
        matches!(self, EditOp::Match { .. })
    }
}

impl fmt::Display for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditOp::Match { node_a, node_b } => write!(f, "Match(a:{} = b:{})", node_a, node_b),
            EditOp::Rename { node_a, node_b } => {
                write!(f, "Rename(a:{} → b:{})", node_a, node_b)
            }
            EditOp::Insert { node_b } => write!(f, "Insert(b:{})", node_b),
            EditOp::Delete { node_a } => write!(f, "Delete(a:{})", node_a),
        }
    }
}

impl fmt::Debug for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Outcome of comparing tree A against tree B.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    /// Minimum total edit cost.
    pub distance: f64,
    /// Normalized similarity in `[0, 1]`.
    pub similarity: f64,
    /// Cost of deleting all of A and inserting all of B; the normalization bound.
    pub max_distance: f64,
    /// Node count of tree A.
    pub size_a: usize,
    /// Node count of tree B.
    pub size_b: usize,
    /// Edit script, when requested.
    pub ops: Option<Vec<EditOp>>,
}

impl ComparisonResult {
    /// Number of non-`Match` operations in the script, if one was computed.
    pub fn edit_count(&self) -> Option<usize> {
        self.ops
            .as_ref()
            .map(|ops| ops.iter().filter(|op| !op.is_match()).count())
    }
}

/// Compute the edit distance from `tree_a` to `tree_b` and, optionally, the script.
///
/// # Example
///
/// ```
/// use treedist::{CompareOptions, NodeData, Tree, UnitCost, compare};
///
/// let mut tree_a = Tree::new(NodeData::new("Select"));
/// let root_a = tree_a.root().unwrap();
/// tree_a.add_child(root_a, NodeData::with_value("Table", "t"));
///
/// let mut tree_b = Tree::new(NodeData::new("Select"));
/// let root_b = tree_b.root().unwrap();
/// tree_b.add_child(root_b, NodeData::with_value("Table", "t2"));
///
/// let result = compare(&tree_a, &tree_b, &UnitCost, &CompareOptions::default()).unwrap();
/// assert_eq!(result.distance, 1.0);
/// assert_eq!(result.similarity, 0.75);
/// ```
pub fn compare<C: CostModel + ?Sized>(
    tree_a: &Tree,
    tree_b: &Tree,
    costs: &C,
    options: &CompareOptions,
) -> Result<ComparisonResult, TedError> {
    let layout_a = tree_a.layout();
    let layout_b = tree_b.layout();
    let (n, m) = (layout_a.len(), layout_b.len());
    debug!(nodes_a = n, nodes_b = m, "compare start");

    let del = node_costs(tree_a, CostKind::Delete, |node| costs.delete(node))?;
    let ins = node_costs(tree_b, CostKind::Insert, |node| costs.insert(node))?;
    let max_distance = del.iter().sum::<f64>() + ins.iter().sum::<f64>();

    let finish = |distance: f64, ops: Option<Vec<EditOp>>| ComparisonResult {
        distance,
        similarity: similarity(distance, max_distance),
        max_distance,
        size_a: n,
        size_b: m,
        ops,
    };

    // Empty trees: everything on the other side is inserted or deleted.
    if n == 0 || m == 0 {
        let ops = options.compute_script.then(|| {
            (0..n)
                .map(|node_a| EditOp::Delete { node_a })
                .chain((0..m).map(|node_b| EditOp::Insert { node_b }))
                .collect()
        });
        return Ok(finish(max_distance, ops));
    }

    // Identical trees: distance 0, one Match per node.
    if tree_a.is_identical(tree_b) {
        for i in 0..n {
            let data = tree_a.data_at(i);
            checked(CostKind::Rename, data, costs.rename(data, data), true)?;
        }
        trace!("identical trees, skipping decomposition");
        let ops = options.compute_script.then(|| {
            (0..n)
                .map(|i| EditOp::Match {
                    node_a: i,
                    node_b: i,
                })
                .collect()
        });
        return Ok(finish(0.0, ops));
    }

    let mut meter = Meter::new(options.budget.as_ref());
    meter.charge((n * m) as u64)?;

    let mut ren = Vec::with_capacity(n * m);
    for i in 0..n {
        let data_a = tree_a.data_at(i);
        for j in 0..m {
            let data_b = tree_b.data_at(j);
            let cost = costs.rename(data_a, data_b);
            checked(CostKind::Rename, data_a, cost, data_a == data_b)?;
            ren.push(cost);
        }
    }

    let shape_a = Shape::new(layout_a);
    let shape_b = Shape::new(layout_b);
    let plan = choose_plan(&shape_a, &shape_b, options.strategy);
    // Reconstruction walks leftmost forest tables after a heavy-path pass.
    let orientation = match plan {
        Plan::Keyroots(orientation) => orientation,
        Plan::HeavyPaths => Orientation::Left,
    };
    let view_a = PostorderView::new(layout_a, orientation);
    let view_b = PostorderView::new(layout_b, orientation);
    debug!(
        ?plan,
        keyroots_a = view_a.keyroots.len(),
        keyroots_b = view_b.keyroots.len(),
        "decomposition chosen"
    );

    let mut engine = Engine {
        view_a: &view_a,
        view_b: &view_b,
        del: &del,
        ins: &ins,
        ren: &ren,
        m,
        memo: vec![0.0; n * m],
        forest: Vec::new(),
        cols: 0,
    };

    match plan {
        Plan::Keyroots(_) => {
            for &k1 in &view_a.keyroots {
                for &k2 in &view_b.keyroots {
                    let (rows, cols) = engine.forest_shape(k1, k2);
                    meter.charge((rows * cols) as u64)?;
                    engine.fill(k1, k2);
                }
            }
        }
        Plan::HeavyPaths => engine.heavy_pass(&shape_a, &shape_b, &mut meter)?,
    }

    let distance = engine.memo[0];
    debug!(distance, cells = meter.cells, "forward pass done");

    let ops = if options.compute_script {
        let mapping = engine.mapping(&mut meter)?;
        debug!(cells = meter.cells, "reconstruction done");
        Some(emit_script(tree_a, tree_b, &mapping))
    } else {
        None
    };

    Ok(finish(distance, ops))
}

fn node_costs(
    tree: &Tree,
    kind: CostKind,
    cost_of: impl Fn(&NodeData) -> f64,
) -> Result<Vec<f64>, TedError> {
    (0..tree.len())
        .map(|i| {
            let data = tree.data_at(i);
            checked(kind, data, cost_of(data), false)
        })
        .collect()
}

/// Check the per-node costs of `tree`: delete, insert, and renaming a node to itself.
///
/// Pairwise renames between different nodes are only checked inside [`compare`].
pub(crate) fn check_node_costs<C: CostModel + ?Sized>(tree: &Tree, costs: &C) -> Result<(), TedError> {
    for i in 0..tree.len() {
        let data = tree.data_at(i);
        checked(CostKind::Delete, data, costs.delete(data), false)?;
        checked(CostKind::Insert, data, costs.insert(data), false)?;
        checked(CostKind::Rename, data, costs.rename(data, data), true)?;
    }
    Ok(())
}

/// Reject negative or non-finite costs, and non-zero renames between equal nodes.
fn checked(kind: CostKind, node: &NodeData, cost: f64, must_be_zero: bool) -> Result<f64, TedError> {
    if !cost.is_finite() || cost < 0.0 || (must_be_zero && cost != 0.0) {
        return Err(TedError::CostFunctionViolation {
            operation: kind.to_string(),
            node: node.to_string(),
            cost,
        });
    }
    Ok(cost)
}

/// Direction in which children are visited when building the postorder view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    Left,
    Right,
}

/// How the forward pass fills the memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plan {
    Keyroots(Orientation),
    HeavyPaths,
}

fn choose_plan(a: &Shape<'_>, b: &Shape<'_>, strategy: PathStrategy) -> Plan {
    match strategy {
        PathStrategy::Leftmost => Plan::Keyroots(Orientation::Left),
        PathStrategy::Rightmost => Plan::Keyroots(Orientation::Right),
        PathStrategy::HeavyPath => Plan::HeavyPaths,
        PathStrategy::Auto => {
            let left = decomposition_cost(a.layout, Orientation::Left) as u128
                * decomposition_cost(b.layout, Orientation::Left) as u128;
            let right = decomposition_cost(a.layout, Orientation::Right) as u128
                * decomposition_cost(b.layout, Orientation::Right) as u128;
            let keyroots = left.min(right);
            let heavy = heavy::estimated_cells(a, b, keyroots);
            trace!(left, right, heavy, "relevant subproblem counts");
            if heavy < keyroots {
                Plan::HeavyPaths
            } else if right < left {
                Plan::Keyroots(Orientation::Right)
            } else {
                Plan::Keyroots(Orientation::Left)
            }
        }
    }
}

/// Sum of subtree sizes over the keyroots of one path family.
///
/// A node is a keyroot when it is the root or is not the first child (in
/// `orientation`) of its parent, i.e. when a new path starts at it.
fn decomposition_cost(layout: &Layout, orientation: Orientation) -> u64 {
    (0..layout.len())
        .filter(|&v| match layout.parent[v] {
            None => true,
            Some(p) => {
                let siblings = &layout.children[p];
                let first = match orientation {
                    Orientation::Left => siblings.first(),
                    Orientation::Right => siblings.last(),
                };
                first != Some(&v)
            }
        })
        .map(|v| layout.size[v] as u64)
        .sum()
}

/// Postorder numbering of a tree for one orientation.
struct PostorderView {
    /// Postorder position to pre-order index.
    node: Vec<usize>,
    /// Postorder position of the first leaf reached along the path family.
    lld: Vec<usize>,
    /// Keyroots in increasing postorder.
    keyroots: Vec<usize>,
}

impl PostorderView {
    fn new(layout: &Layout, orientation: Orientation) -> Self {
        let n = layout.len();
        let mut node = Vec::with_capacity(n);
        let mut lld = Vec::with_capacity(n);
        let mut post_of = vec![0usize; n];

        // (pre-order index, next child to visit)
        let mut stack: Vec<(usize, usize)> = Vec::new();
        if n > 0 {
            stack.push((0, 0));
        }
        while let Some(top) = stack.last_mut() {
            let (v, next) = *top;
            let kids = &layout.children[v];
            if next < kids.len() {
                top.1 += 1;
                let child = match orientation {
                    Orientation::Left => kids[next],
                    Orientation::Right => kids[kids.len() - 1 - next],
                };
                stack.push((child, 0));
            } else {
                stack.pop();
                let pos = node.len();
                post_of[v] = pos;
                node.push(v);
                let first = match orientation {
                    Orientation::Left => kids.first(),
                    Orientation::Right => kids.last(),
                };
                lld.push(first.map_or(pos, |&c| lld[post_of[c]]));
            }
        }

        // The keyroot of a path is its highest node, i.e. the last postorder
        // position sharing that leaf.
        let mut highest = vec![None; n];
        for (pos, &leaf) in lld.iter().enumerate() {
            highest[leaf] = Some(pos);
        }
        let mut keyroots: Vec<usize> = highest.into_iter().flatten().collect();
        keyroots.sort_unstable();

        Self {
            node,
            lld,
            keyroots,
        }
    }
}

/// Work counter for the optional [`Budget`].
struct Meter<'b> {
    budget: Option<&'b Budget>,
    cells: u64,
    started: Instant,
}

impl<'b> Meter<'b> {
    fn new(budget: Option<&'b Budget>) -> Self {
        Self {
            budget,
            cells: 0,
            started: Instant::now(),
        }
    }

    fn charge(&mut self, cells: u64) -> Result<(), TedError> {
        self.cells = self.cells.saturating_add(cells);
        let Some(budget) = self.budget else {
            return Ok(());
        };

        if let Some(flag) = &budget.cancel
            && flag.load(Ordering::Relaxed)
        {
            return Err(TedError::Cancelled { cells: self.cells });
        }

        let elapsed = self.started.elapsed();
        let over_cells = budget.max_cells.is_some_and(|max| self.cells > max);
        let over_time = budget.time_limit.is_some_and(|limit| elapsed > limit);
        if over_cells || over_time {
            debug!(cells = self.cells, ?elapsed, "budget exhausted");
            return Err(TedError::BudgetExceeded {
                cells: self.cells,
                elapsed_ms: elapsed.as_millis() as u64,
            });
        }
        Ok(())
    }
}

/// Dynamic-programming state for one comparison.
struct Engine<'a> {
    view_a: &'a PostorderView,
    view_b: &'a PostorderView,
    del: &'a [f64],
    ins: &'a [f64],
    ren: &'a [f64],
    /// Node count of tree B (row stride of `ren` and `memo`).
    m: usize,
    /// Tree distance per node pair, keyed by pre-order indices.
    memo: Vec<f64>,
    /// Scratch forest table for the subproblem being filled.
    forest: Vec<f64>,
    cols: usize,
}

impl Engine<'_> {
    fn forest_shape(&self, i: usize, j: usize) -> (usize, usize) {
        let rows = i - self.view_a.lld[i] + 2;
        let cols = j - self.view_b.lld[j] + 2;
        (rows, cols)
    }

    #[inline(always)]
    fn fd(&self, x: usize, y: usize) -> f64 {
        self.forest[x * self.cols + y]
    }

    /// Fill the forest table for the subtrees rooted at postorder positions `i`, `j`,
    /// memoizing every tree-to-tree distance along the way.
    fn fill(&mut self, i: usize, j: usize) {
        let (rows, cols) = self.forest_shape(i, j);
        let l1 = self.view_a.lld[i];
        let l2 = self.view_b.lld[j];
        self.cols = cols;
        self.forest.clear();
        self.forest.resize(rows * cols, 0.0);

        for x in 1..rows {
            let a = self.view_a.node[l1 + x - 1];
            self.forest[x * cols] = self.forest[(x - 1) * cols] + self.del[a];
        }
        for y in 1..cols {
            let b = self.view_b.node[l2 + y - 1];
            self.forest[y] = self.forest[y - 1] + self.ins[b];
        }

        for x in 1..rows {
            let ii = l1 + x - 1;
            let a = self.view_a.node[ii];
            let la = self.view_a.lld[ii];
            for y in 1..cols {
                let jj = l2 + y - 1;
                let b = self.view_b.node[jj];
                let lb = self.view_b.lld[jj];

                let delete = self.fd(x - 1, y) + self.del[a];
                let insert = self.fd(x, y - 1) + self.ins[b];
                let best = if la == l1 && lb == l2 {
                    let rename = self.fd(x - 1, y - 1) + self.ren[a * self.m + b];
                    let best = cheapest(rename, delete, insert);
                    self.memo[a * self.m + b] = best;
                    best
                } else {
                    let subtree = self.fd(la - l1, lb - l2) + self.memo[a * self.m + b];
                    cheapest(subtree, delete, insert)
                };
                self.forest[x * cols + y] = best;
            }
        }
    }

    /// Walk the tables backwards to recover an optimal mapping (pre-order indices).
    ///
    /// Every forest table is refilled from the memo, so it is charged like the
    /// forward pass.
    fn mapping(&mut self, meter: &mut Meter<'_>) -> Result<Vec<Option<usize>>, TedError> {
        let n = self.view_a.node.len();
        let mut a_to_b = vec![None; n];
        let mut pending = vec![(n - 1, self.view_b.node.len() - 1)];

        while let Some((i, j)) = pending.pop() {
            let (rows, cols) = self.forest_shape(i, j);
            meter.charge((rows * cols) as u64)?;
            self.fill(i, j);
            let l1 = self.view_a.lld[i];
            let l2 = self.view_b.lld[j];
            let (mut x, mut y) = self.forest_shape(i, j);
            x -= 1;
            y -= 1;

            while x > 0 || y > 0 {
                let ii = (l1 + x).wrapping_sub(1);
                let jj = (l2 + y).wrapping_sub(1);

                if x > 0 && y > 0 {
                    let a = self.view_a.node[ii];
                    let b = self.view_b.node[jj];
                    let la = self.view_a.lld[ii];
                    let lb = self.view_b.lld[jj];
                    if la == l1 && lb == l2 {
                        if self.fd(x, y) == self.fd(x - 1, y - 1) + self.ren[a * self.m + b] {
                            a_to_b[a] = Some(b);
                            x -= 1;
                            y -= 1;
                            continue;
                        }
                    } else if self.fd(x, y)
                        == self.fd(la - l1, lb - l2) + self.memo[a * self.m + b]
                    {
                        pending.push((ii, jj));
                        x = la - l1;
                        y = lb - l2;
                        continue;
                    }
                }

                if x > 0 {
                    let a = self.view_a.node[ii];
                    if y == 0 || self.fd(x, y) == self.fd(x - 1, y) + self.del[a] {
                        x -= 1;
                        continue;
                    }
                }
                y -= 1;
            }
        }
        Ok(a_to_b)
    }
}

/// Minimum of three candidates, preferring earlier arguments on ties.
#[inline(always)]
fn cheapest(first: f64, second: f64, third: f64) -> f64 {
    let mut best = first;
    if second < best {
        best = second;
    }
    if third < best {
        best = third;
    }
    best
}

/// Merge both pre-orders into a script; deletes come before inserts at the same point.
fn emit_script(tree_a: &Tree, tree_b: &Tree, a_to_b: &[Option<usize>]) -> Vec<EditOp> {
    let (n, m) = (tree_a.len(), tree_b.len());
    let mut b_mapped = vec![false; m];
    for &b in a_to_b.iter().flatten() {
        b_mapped[b] = true;
    }

    let mut ops = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        if i < n && a_to_b[i].is_none() {
            ops.push(EditOp::Delete { node_a: i });
            i += 1;
        } else if j < m && !b_mapped[j] {
            ops.push(EditOp::Insert { node_b: j });
            j += 1;
        } else if i < n && j < m {
            // Mappings preserve pre-order, so the next mapped pair lines up.
            debug_assert_eq!(a_to_b[i], Some(j));
            let op = if tree_a.data_at(i) == tree_b.data_at(j) {
                EditOp::Match { node_a: i, node_b: j }
            } else {
                EditOp::Rename { node_a: i, node_b: j }
            };
            ops.push(op);
            i += 1;
            j += 1;
        } else {
            break;
        }
    }
    ops
}
