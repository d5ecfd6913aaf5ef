//! Heavy-path decomposition after Demaine, Mozes, Rossman & Weimann ("An optimal
//! decomposition algorithm for tree edit distance", 2007).
//!
//! Each subtree pair is split along the heavy path of the larger subtree, while the
//! smaller subtree is broken into every subforest reachable by removing leftmost or
//! rightmost roots. Such a subforest is named by a pair of ranks `(a, b)`: it holds
//! the nodes whose pre-order rank is at least `a` and whose mirrored pre-order rank
//! (children visited right to left) is at least `b`. Removing the leftmost root bumps
//! `a`, removing the rightmost root bumps `b`, and removing a whole tree skips its
//! size in one of the two ranks.
//!
//! The cell count is O(n²·m·(1 + log(m/n))) for n ≥ m whatever the shape of the
//! trees, so it wins over keyroots when heavy children alternate sides.

use super::{Engine, Meter, cheapest};
use crate::error::TedError;
use crate::trace;
use crate::tree::Layout;

/// Heavy children and mirrored pre-order ranks of one tree.
pub(super) struct Shape<'a> {
    pub(super) layout: &'a Layout,
    /// Child with the largest subtree, the first one on ties.
    heavy: Vec<Option<usize>>,
    /// Pre-order rank when children are visited right to left.
    rpre: Vec<usize>,
    /// Inverse of `rpre`.
    by_rpre: Vec<usize>,
}

impl<'a> Shape<'a> {
    pub(super) fn new(layout: &'a Layout) -> Self {
        let n = layout.len();
        let heavy = (0..n)
            .map(|v| {
                layout.children[v]
                    .iter()
                    .copied()
                    .reduce(|best, c| if layout.size[c] > layout.size[best] { c } else { best })
            })
            .collect();

        let mut rpre = vec![0; n];
        let mut by_rpre = Vec::with_capacity(n);
        let mut stack = Vec::new();
        if n > 0 {
            stack.push(0);
        }
        while let Some(v) = stack.pop() {
            rpre[v] = by_rpre.len();
            by_rpre.push(v);
            stack.extend(layout.children[v].iter().copied());
        }

        Self {
            layout,
            heavy,
            rpre,
            by_rpre,
        }
    }

    fn size(&self, v: usize) -> usize {
        self.layout.size[v]
    }

    /// Roots of the subtrees hanging off the heavy path that starts at `v`.
    fn light_subtrees(&self, v: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut next = Some(v);
        while let Some(p) = next {
            next = self.heavy[p];
            out.extend(
                self.layout.children[p]
                    .iter()
                    .copied()
                    .filter(|&c| Some(c) != next),
            );
        }
        out
    }
}

/// Cells the decomposition fills for the whole pair. Counting stops once the
/// running total passes `cap`.
pub(super) fn estimated_cells(a: &Shape<'_>, b: &Shape<'_>, cap: u128) -> u128 {
    let mut total = 0;
    tally(a, b, 0, 0, cap, &mut total);
    total
}

fn tally(a: &Shape<'_>, b: &Shape<'_>, v: usize, w: usize, cap: u128, total: &mut u128) {
    if *total > cap {
        return;
    }
    let (size_v, size_w) = (a.size(v) as u128, b.size(w) as u128);
    if size_v >= size_w {
        *total += (size_v + 1) * (size_w + 1) * (size_w + 1);
        for light in a.light_subtrees(v) {
            tally(a, b, light, w, cap, total);
        }
    } else {
        *total += (size_w + 1) * (size_v + 1) * (size_v + 1);
        for light in b.light_subtrees(w) {
            tally(a, b, v, light, cap, total);
        }
    }
}

/// Tree that carries the heavy path in a single-path pass.
#[derive(Debug, Clone, Copy)]
enum Side {
    A,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// The forest is a single tree rooted on the path.
    Root,
    /// Leftmost root, left of the path.
    Left,
    /// Rightmost root, right of the path.
    Right,
}

#[derive(Debug, Clone, Copy)]
struct Removal {
    step: Step,
    node: usize,
}

/// Order in which the nodes of the subtree at `v` leave the forest: a path node,
/// then the trees on its left in pre-order, then the trees on its right in mirrored
/// pre-order, then the next path node.
///
/// Any node's subtree leaves in one contiguous run, so removing the whole tree of
/// the node removed at step `k` lands on step `k + size`.
fn removal_order(shape: &Shape<'_>, v: usize) -> Vec<Removal> {
    let mut steps = Vec::with_capacity(shape.size(v));
    let mut next = Some(v);
    while let Some(p) = next {
        steps.push(Removal {
            step: Step::Root,
            node: p,
        });
        next = shape.heavy[p];
        let kids = &shape.layout.children[p];
        let split = kids
            .iter()
            .position(|&c| Some(c) == next)
            .unwrap_or(kids.len());
        for &c in &kids[..split] {
            steps.extend((c..c + shape.size(c)).map(|node| Removal {
                step: Step::Left,
                node,
            }));
        }
        for &c in kids.iter().skip(split + 1).rev() {
            let first = shape.rpre[c];
            steps.extend(
                shape.by_rpre[first..first + shape.size(c)]
                    .iter()
                    .map(|&node| Removal {
                        step: Step::Right,
                        node,
                    }),
            );
        }
    }
    steps
}

/// Subforests of the subtree at `w`, laid out by (pre-order rank, mirrored rank).
struct Grid {
    a0: usize,
    b0: usize,
    end_a: usize,
    end_b: usize,
    width: usize,
}

impl Grid {
    fn new(shape: &Shape<'_>, w: usize) -> Self {
        let size = shape.size(w);
        let b0 = shape.rpre[w];
        Self {
            a0: w,
            b0,
            end_a: w + size,
            end_b: b0 + size,
            width: size + 1,
        }
    }

    #[inline(always)]
    fn at(&self, a: usize, b: usize) -> usize {
        (a - self.a0) * self.width + (b - self.b0)
    }
}

/// Read-only inputs of one single-path pass.
struct Pass<'p, 's> {
    side: Side,
    path: &'p Shape<'s>,
    other: &'p Shape<'s>,
    grid: Grid,
    steps: Vec<Removal>,
    /// Cost of removing every path-side node from step `k` on.
    rest: Vec<f64>,
}

impl Engine<'_> {
    /// Fill the memo for every node pair by heavy-path decomposition.
    pub(super) fn heavy_pass(
        &mut self,
        a: &Shape<'_>,
        b: &Shape<'_>,
        meter: &mut Meter<'_>,
    ) -> Result<(), TedError> {
        self.decompose(a, b, 0, 0, meter)
    }

    /// Memoize the distance of every subtree of `v` (in A) to every subtree of `w`
    /// (in B).
    fn decompose(
        &mut self,
        a: &Shape<'_>,
        b: &Shape<'_>,
        v: usize,
        w: usize,
        meter: &mut Meter<'_>,
    ) -> Result<(), TedError> {
        if a.size(v) >= b.size(w) {
            for light in a.light_subtrees(v) {
                self.decompose(a, b, light, w, meter)?;
            }
            self.single_path(Side::A, a, b, v, w, meter)
        } else {
            for light in b.light_subtrees(w) {
                self.decompose(a, b, v, light, meter)?;
            }
            self.single_path(Side::B, b, a, w, v, meter)
        }
    }

    /// Memo and rename index of a pair given as (path-side node, other node).
    #[inline(always)]
    fn pair(&self, side: Side, p: usize, o: usize) -> usize {
        match side {
            Side::A => p * self.m + o,
            Side::B => o * self.m + p,
        }
    }

    #[inline(always)]
    fn path_cost(&self, side: Side, p: usize) -> f64 {
        match side {
            Side::A => self.del[p],
            Side::B => self.ins[p],
        }
    }

    #[inline(always)]
    fn other_cost(&self, side: Side, o: usize) -> f64 {
        match side {
            Side::A => self.ins[o],
            Side::B => self.del[o],
        }
    }

    /// Distances from every subtree rooted on the heavy path of `v` to every subtree
    /// of `w`. Subtrees hanging off the path must already be memoized against every
    /// subtree of `w`.
    fn single_path<'s>(
        &mut self,
        side: Side,
        path: &Shape<'s>,
        other: &Shape<'s>,
        v: usize,
        w: usize,
        meter: &mut Meter<'_>,
    ) -> Result<(), TedError> {
        let steps = removal_order(path, v);
        let total = steps.len();
        let mut rest = vec![0.0; total + 1];
        for k in (0..total).rev() {
            rest[k] = rest[k + 1] + self.path_cost(side, steps[k].node);
        }
        let pass = Pass {
            side,
            path,
            other,
            grid: Grid::new(other, w),
            steps,
            rest,
        };
        let cells = (pass.grid.width * pass.grid.width) as u64;

        // Rows of one path node's block only reach forward to the next path node,
        // so everything past it is dropped once a path node is done.
        let mut rows: Vec<Vec<f64>> = vec![Vec::new(); total + 1];
        let mut live_end = total;
        for k in (0..=total).rev() {
            meter.charge(cells)?;
            rows[k] = self.forest_row(&pass, k, &rows);

            let Some(&Removal {
                step: Step::Root,
                node: p,
            }) = pass.steps.get(k)
            else {
                continue;
            };
            for y in w..w + other.size(w) {
                let slot = self.pair(side, p, y);
                self.memo[slot] = rows[k][pass.grid.at(y, other.rpre[y])];
            }
            for row in &mut rows[k + 1..live_end] {
                *row = Vec::new();
            }
            live_end = k + 1;
        }
        trace!(path_root = v, other_root = w, rows = total + 1, "single path pass");
        Ok(())
    }

    /// Distances from the path-side forest left after `k` removals to every
    /// subforest of the grid.
    fn forest_row(&self, pass: &Pass<'_, '_>, k: usize, rows: &[Vec<f64>]) -> Vec<f64> {
        let Pass {
            side,
            path,
            other,
            ref grid,
            ref steps,
            ref rest,
        } = *pass;
        let empty = &rows[steps.len()];
        let mut cur = vec![0.0; grid.width * grid.width];

        for a in (grid.a0..=grid.end_a).rev() {
            for b in (grid.b0..=grid.end_b).rev() {
                let here = grid.at(a, b);
                if a == grid.end_a || b == grid.end_b {
                    cur[here] = rest[k];
                    continue;
                }

                cur[here] = match steps.get(k) {
                    // Nothing left on the path side: insert the subforest.
                    None => {
                        let skip = cur[grid.at(a + 1, b)];
                        if other.rpre[a] < b {
                            skip
                        } else {
                            skip + self.other_cost(side, a)
                        }
                    }
                    Some(&Removal {
                        step: Step::Right,
                        node: x,
                    }) => {
                        let z = other.by_rpre[b];
                        let skip = cur[grid.at(a, b + 1)];
                        if z < a {
                            // `z` is outside this subforest; same set as (a, b + 1).
                            skip
                        } else {
                            let delete = rows[k + 1][here] + self.path_cost(side, x);
                            let insert = skip + self.other_cost(side, z);
                            let subtree = self.memo[self.pair(side, x, z)]
                                + rows[k + path.size(x)][grid.at(a, b + other.size(z))];
                            cheapest(subtree, delete, insert)
                        }
                    }
                    Some(&Removal { step, node: x }) => {
                        let skip = cur[grid.at(a + 1, b)];
                        if other.rpre[a] < b {
                            skip
                        } else {
                            let delete = rows[k + 1][here] + self.path_cost(side, x);
                            let insert = skip + self.other_cost(side, a);
                            let after = grid.at(a + other.size(a), b);
                            let subtree = if step == Step::Root {
                                rows[k + 1][grid.at(a + 1, other.rpre[a] + 1)]
                                    + self.ren[self.pair(side, x, a)]
                                    + empty[after]
                            } else {
                                self.memo[self.pair(side, x, a)] + rows[k + path.size(x)][after]
                            };
                            cheapest(subtree, delete, insert)
                        }
                    }
                };
            }
        }
        cur
    }
}
