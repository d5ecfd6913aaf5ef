use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use sqlsim::Dialect;
use sqlsim::treedist::{Budget, CompareOptions, WeightedCost};

#[derive(Parser, Debug)]
#[command(
    name = "sql-similarity",
    about = "Compare SQL files using tree edit distance",
    long_about = "Compare two SQL files, or every pair of .sql files in a directory, by the \
tree edit distance between their syntax trees. Scores range from 0 (unrelated) to 1 (identical).",
    disable_version_flag = true
)]
pub(crate) struct Cli {
    /// Path to first SQL file or directory
    #[arg(required_unless_present = "version")]
    pub(crate) path1: Option<PathBuf>,

    /// Path to second SQL file (required for pair mode)
    pub(crate) path2: Option<PathBuf>,

    /// Output in JSON format
    #[arg(short = 'j', long, conflicts_with = "csv")]
    pub(crate) json: bool,

    /// Output in CSV format (batch mode only)
    #[arg(short = 'c', long)]
    pub(crate) csv: bool,

    /// Only show pairs with distance <= value (batch mode)
    #[arg(
        short = 'm',
        long = "max-distance",
        visible_alias = "max-edits",
        value_name = "DISTANCE",
        allow_negative_numbers = true
    )]
    pub(crate) max_distance: Option<f64>,

    /// Only show the N most similar pairs (batch mode)
    #[arg(short = 't', long, value_name = "N", allow_negative_numbers = true)]
    pub(crate) top: Option<i64>,

    /// SQL dialect used to parse the inputs
    #[arg(long, default_value_t = Dialect::Generic)]
    pub(crate) dialect: Dialect,

    /// Skip computing the edit script (faster, score only)
    #[arg(long)]
    pub(crate) no_operations: bool,

    /// Cost of changing a literal or identifier while keeping its kind
    #[arg(long, value_name = "COST", allow_negative_numbers = true)]
    pub(crate) value_rename_cost: Option<f64>,

    /// Abandon any single comparison that runs longer than this
    #[arg(long, value_name = "MS")]
    pub(crate) timeout_ms: Option<u64>,

    /// Print version and exit
    #[arg(short = 'v', long)]
    pub(crate) version: bool,
}

impl Cli {
    /// Engine and parser settings shared by both modes.
    pub(crate) fn options(&self) -> Result<sqlsim::Options, String> {
        let mut costs = WeightedCost::default();
        if let Some(cost) = self.value_rename_cost {
            if !cost.is_finite() || cost < 0.0 {
                return Err("--value-rename-cost must be a non-negative number".to_owned());
            }
            costs.revalue = cost;
        }

        let budget = self.timeout_ms.map(|ms| Budget {
            time_limit: Some(Duration::from_millis(ms)),
            ..Budget::default()
        });

        Ok(sqlsim::Options {
            dialect: self.dialect,
            costs,
            compare: CompareOptions {
                compute_script: !self.no_operations,
                budget,
                ..CompareOptions::default()
            },
        })
    }

    /// Batch filters, checked the same way the batch orchestrator checks them.
    pub(crate) fn filters(&self) -> Result<sqlsim::Filters, String> {
        if let Some(max) = self.max_distance
            && (max.is_nan() || max < 0.0)
        {
            return Err("--max-distance must be a non-negative number".to_owned());
        }
        let top_k = match self.top {
            Some(top) if top < 1 => {
                return Err("--top must be a positive integer (>= 1)".to_owned());
            }
            Some(top) => Some(usize::try_from(top).map_err(|_| "--top is too large".to_owned())?),
            None => None,
        };
        Ok(sqlsim::Filters {
            max_distance: self.max_distance,
            top_k,
        })
    }
}
