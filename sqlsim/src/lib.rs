//! Structural similarity between SQL statements, based on treedist.
//!
//! sqlsim provides:
//! - **Parsing**: SQL text to a labeled ordered tree via `sqlparser`, for a choice of
//!   dialects
//! - **Pair comparison**: edit distance, similarity score and an annotated edit script
//!   for two statements or two files
//! - **Batch comparison**: every pair of `.sql` files in a directory, filtered and ranked
//! - **Reports**: text, JSON and CSV renderings of both
//!
//! # Example
//!
//! ```rust
//! use sqlsim::{Options, compare_sql};
//!
//! let cmp = compare_sql("SELECT * FROM t", "SELECT * FROM t2", &Options::default()).unwrap();
//! assert_eq!(cmp.result.distance, 1.0);
//!
//! let report = cmp.report();
//! println!("{}", report.to_text());
//! ```

mod tracing_macros;
pub(crate) use tracing_macros::{debug, trace};

pub mod batch;
mod error;
pub mod parser;
pub mod report;
pub mod service;

pub use batch::{Filters, Listing, compare_directory, scan_directory};
pub use error::Error;
pub use parser::{Dialect, SqlNode, parse_sql, parse_syntax};
pub use report::{BatchReport, ComparisonReport, FileError, OperationReport, PairReport, SkippedReport};
pub use service::{Comparison, Options, compare_files, compare_sql};

// Re-export the engine so callers need a single dependency.
pub use treedist;
