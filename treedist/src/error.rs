//! Error types.

use facet::Facet;

/// Errors that can occur while comparing two trees.
#[derive(Facet, Debug)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum TedError {
    /// {operation} cost {cost} for node {node} breaks the cost model contract
    CostFunctionViolation {
        operation: String,
        node: String,
        cost: f64,
    },

    /// comparison budget exhausted after {cells} subproblem cells and {elapsed_ms} ms
    BudgetExceeded { cells: u64, elapsed_ms: u64 },

    /// comparison cancelled after {cells} subproblem cells
    Cancelled { cells: u64 },
}

/// Invalid batch configuration, reported before any comparison runs.
#[derive(Facet, Debug)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum ConfigError {
    /// max distance must be a non-negative number, got {value}
    InvalidMaxDistance { value: f64 },

    /// top-k must be at least 1
    InvalidTopK,

    /// input name {name} appears more than once
    DuplicateName { name: String },

    /// {operation} cost {cost} for node {node} breaks the cost model contract
    CostModel {
        operation: String,
        node: String,
        cost: f64,
    },
}
