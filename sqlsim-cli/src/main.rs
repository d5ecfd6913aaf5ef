//! `sql-similarity`: compare SQL files by tree edit distance.
//!
//! Pair mode compares two files. Batch mode compares every pair of `.sql` files
//! in a directory and ranks them by similarity.

mod args;

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use sqlsim::{Error, compare_directory, compare_files};
use tracing_subscriber::EnvFilter;

use crate::args::Cli;

/// Exit codes in pair mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum PairExit {
    Success = 0,
    FileNotFound = 1,
    ParseError = 2,
    InvalidArgs = 3,
}

/// Exit codes in batch mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum BatchExit {
    Success = 0,
    Partial = 1,
    NoFiles = 2,
    DirectoryNotFound = 3,
    InvalidArgs = 4,
}

impl From<PairExit> for ExitCode {
    fn from(code: PairExit) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<BatchExit> for ExitCode {
    fn from(code: BatchExit) -> Self {
        ExitCode::from(code as u8)
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // Only fails if a subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    if cli.version {
        println!("sql-similarity {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let Some(path1) = cli.path1.as_deref() else {
        eprintln!("Error: a file or directory path is required");
        return PairExit::InvalidArgs.into();
    };

    // A missing path on its own can only have been meant as a directory.
    match cli.path2.as_deref() {
        None if path1.is_dir() || !path1.exists() => run_batch(&cli, path1),
        path2 => run_pair(&cli, path1, path2),
    }
}

fn run_pair(cli: &Cli, path1: &Path, path2: Option<&Path>) -> ExitCode {
    let Some(path2) = path2 else {
        eprintln!("Error: Two files required for pair comparison");
        return PairExit::InvalidArgs.into();
    };
    if cli.csv {
        eprintln!("Error: --csv is only supported in batch mode");
        return PairExit::InvalidArgs.into();
    }
    let options = match cli.options() {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Error: {message}");
            return PairExit::InvalidArgs.into();
        }
    };

    tracing::debug!(a = %path1.display(), b = %path2.display(), "comparing pair");
    let comparison = match compare_files(path1, path2, &options) {
        Ok(comparison) => comparison,
        Err(err) => {
            eprintln!("Error: {err}");
            return pair_exit_for(&err).into();
        }
    };

    let report = comparison.report();
    if cli.json {
        match report.to_json() {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("Error: {err}");
                return pair_exit_for(&err).into();
            }
        }
    } else {
        println!("{}", report.to_text());
    }
    PairExit::Success.into()
}

/// Failures that are not about the inputs themselves share the invalid-arguments code.
fn pair_exit_for(err: &Error) -> PairExit {
    match err {
        Error::FileNotFound { .. } | Error::Io { .. } => PairExit::FileNotFound,
        Error::Parse { .. } | Error::Lowering { .. } => PairExit::ParseError,
        Error::Config { .. }
        | Error::Compare { .. }
        | Error::Render { .. }
        | Error::DirectoryNotFound { .. }
        | Error::NoSqlFiles { .. } => PairExit::InvalidArgs,
    }
}

fn run_batch(cli: &Cli, dir: &Path) -> ExitCode {
    let checked = cli.filters().and_then(|filters| Ok((filters, cli.options()?)));
    let (filters, options) = match checked {
        Ok(checked) => checked,
        Err(message) => {
            eprintln!("Error: {message}");
            return BatchExit::InvalidArgs.into();
        }
    };

    tracing::debug!(dir = %dir.display(), "comparing directory");
    let report = match compare_directory(dir, &options, &filters) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("Error: {err}");
            return batch_exit_for(&err).into();
        }
    };

    let rendered = if cli.json {
        report.to_json()
    } else if cli.csv {
        Ok(report.to_csv())
    } else {
        Ok(report.to_table())
    };
    match rendered {
        Ok(text) => println!("{text}"),
        Err(err) => {
            eprintln!("Error: {err}");
            return batch_exit_for(&err).into();
        }
    }

    if report.is_partial() {
        BatchExit::Partial.into()
    } else {
        BatchExit::Success.into()
    }
}

fn batch_exit_for(err: &Error) -> BatchExit {
    match err {
        Error::DirectoryNotFound { .. } | Error::Io { .. } => BatchExit::DirectoryNotFound,
        Error::NoSqlFiles { .. } => BatchExit::NoFiles,
        Error::Config { .. } => BatchExit::InvalidArgs,
        // The report exists but could not be written out.
        Error::Render { .. } => BatchExit::Partial,
        Error::FileNotFound { .. }
        | Error::Parse { .. }
        | Error::Compare { .. }
        | Error::Lowering { .. } => BatchExit::Partial,
    }
}
