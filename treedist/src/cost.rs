//! Cost models for the three node edit operations.
//!
//! Costs are plain strategy values handed to [`compare`](crate::compare), so the
//! weighting can change without touching the algorithm.
//!
//! Every model must return non-negative finite costs and a zero rename cost for
//! equivalent nodes; [`compare`](crate::compare) checks both before doing any work.
//! It additionally assumes `rename(a, b) <= delete(a) + insert(b)`, which is trusted
//! rather than checked.

use core::fmt;

use crate::tree::NodeData;

/// Costs of deleting, inserting and renaming nodes.
pub trait CostModel: Sync {
    /// Cost of removing `node` from the source tree.
    fn delete(&self, node: &NodeData) -> f64;

    /// Cost of adding `node` to the target tree.
    fn insert(&self, node: &NodeData) -> f64;

    /// Cost of turning `a` into `b` in place. Must be 0 when `a == b`.
    fn rename(&self, a: &NodeData, b: &NodeData) -> f64;
}

impl<C: CostModel + ?Sized> CostModel for &C {
    fn delete(&self, node: &NodeData) -> f64 {
        (**self).delete(node)
    }

    fn insert(&self, node: &NodeData) -> f64 {
        (**self).insert(node)
    }

    fn rename(&self, a: &NodeData, b: &NodeData) -> f64 {
        (**self).rename(a, b)
    }
}

/// Every operation costs 1; equivalent nodes rename for free.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitCost;

impl CostModel for UnitCost {
    fn delete(&self, _node: &NodeData) -> f64 {
        1.0
    }

    fn insert(&self, _node: &NodeData) -> f64 {
        1.0
    }

    fn rename(&self, a: &NodeData, b: &NodeData) -> f64 {
        if a == b { 0.0 } else { 1.0 }
    }
}

/// Constant costs with separate weights for label and value changes.
///
/// A rename that keeps the label but changes the value (a different table name, a
/// different literal) costs `revalue`; a rename that changes the label costs
/// `relabel`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedCost {
    /// Cost of every delete.
    pub delete: f64,
    /// Cost of every insert.
    pub insert: f64,
    /// Cost of a rename between different labels.
    pub relabel: f64,
    /// Cost of a rename between equal labels with different values.
    pub revalue: f64,
}

impl Default for WeightedCost {
    fn default() -> Self {
        Self {
            delete: 1.0,
            insert: 1.0,
            relabel: 1.0,
            revalue: 1.0,
        }
    }
}

impl CostModel for WeightedCost {
    fn delete(&self, _node: &NodeData) -> f64 {
        self.delete
    }

    fn insert(&self, _node: &NodeData) -> f64 {
        self.insert
    }

    fn rename(&self, a: &NodeData, b: &NodeData) -> f64 {
        if a == b {
            0.0
        } else if a.label == b.label {
            self.revalue
        } else {
            self.relabel
        }
    }
}

/// Cost model built from three closures.
pub struct FnCost<D, I, R> {
    /// Delete cost.
    pub delete: D,
    /// Insert cost.
    pub insert: I,
    /// Rename cost.
    pub rename: R,
}

impl<D, I, R> CostModel for FnCost<D, I, R>
where
    D: Fn(&NodeData) -> f64 + Sync,
    I: Fn(&NodeData) -> f64 + Sync,
    R: Fn(&NodeData, &NodeData) -> f64 + Sync,
{
    fn delete(&self, node: &NodeData) -> f64 {
        (self.delete)(node)
    }

    fn insert(&self, node: &NodeData) -> f64 {
        (self.insert)(node)
    }

    fn rename(&self, a: &NodeData, b: &NodeData) -> f64 {
        (self.rename)(a, b)
    }
}

/// Which cost function produced a value; used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostKind {
    /// [`CostModel::delete`]
    Delete,
    /// [`CostModel::insert`]
    Insert,
    /// [`CostModel::rename`]
    Rename,
}

impl fmt::Display for CostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostKind::Delete => write!(f, "delete"),
            CostKind::Insert => write!(f, "insert"),
            CostKind::Rename => write!(f, "rename"),
        }
    }
}
