//! Error types.

use facet::Facet;

/// Errors that can occur while loading, parsing or comparing SQL.
#[derive(Facet, Debug)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum Error {
    /// failed to parse {origin}: {message}
    Parse {
        /// File name, or `input` for in-memory text.
        origin: String,
        message: String,
        line: Option<u64>,
        column: Option<u64>,
    },

    /// file not found: {path}
    FileNotFound { path: String },

    /// failed to read {path}: {message}
    Io { path: String, message: String },

    /// directory not found: {path}
    DirectoryNotFound { path: String },

    /// no .sql files found in {path}
    NoSqlFiles { path: String },

    /// invalid batch configuration: {message}
    Config { message: String },

    /// comparison failed: {message}
    Compare { message: String },

    /// failed to convert syntax tree: {message}
    Lowering { message: String },

    /// failed to render report: {message}
    Render { message: String },
}

impl Error {
    /// Attribute a parse error to a file.
    pub(crate) fn in_file(self, file: &str) -> Self {
        match self {
            Error::Parse {
                message,
                line,
                column,
                ..
            } => Error::Parse {
                origin: file.to_owned(),
                message,
                line,
                column,
            },
            other => other,
        }
    }
}

impl From<treedist::TedError> for Error {
    fn from(err: treedist::TedError) -> Self {
        Error::Compare {
            message: err.to_string(),
        }
    }
}

impl From<treedist::ConfigError> for Error {
    fn from(err: treedist::ConfigError) -> Self {
        Error::Config {
            message: err.to_string(),
        }
    }
}
