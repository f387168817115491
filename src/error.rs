//! Error taxonomy for the chunked analysis pipeline.
//!
//! Every variant is fatal to a run. The command layer wraps these in
//! `anyhow` for context and the binary exits non-zero.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    /// Transport failure while retrieving the source.
    #[error("failed to fetch data from `{url}`: {reason}")]
    DataFetch { url: String, reason: String },

    /// The fetched bytes are not a loadable CSV.
    #[error("failed to load fetched data as CSV: {0}")]
    DataLoading(String),

    /// The CSV header lacks columns the tasks need.
    #[error("source does not contain the expected columns; missing: {missing:?}, found: {found:?}")]
    DataValidation {
        missing: Vec<String>,
        found: Vec<String>,
    },

    /// A cell in a typed column could not be coerced.
    #[error("unsupported value `{value}` in column `{column}`")]
    UnsupportedDataType { column: String, value: String },

    /// Intermediate state is not in the expected shape.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("failed to write `{path}`: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{0}` is not a directory")]
    NotADirectory(PathBuf),

    /// Calendar arithmetic left the representable range.
    #[error("date out of range when projecting `{0}`")]
    DateOutOfRange(String),
}

pub type Result<T> = std::result::Result<T, WeatherError>;

impl WeatherError {
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WeatherError::FileWrite {
            path: path.into(),
            source,
        }
    }
}
