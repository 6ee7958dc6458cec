use std::path::PathBuf;

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Everything the discover → load → join → write pipeline can fail with.
///
/// `origin` fields name the table being read, e.g. `wave 2 (b)`, so a
/// failure points at both the wave and the file.
#[derive(Debug, thiserror::Error)]
pub enum WaveError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed delimited data in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("arrow: {0}")]
    Arrow(#[from] ArrowError),

    #[error("parquet: {0}")]
    Parquet(#[from] ParquetError),

    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("no files matching `{pattern}` under {root}")]
    NoFiles { root: PathBuf, pattern: String },

    #[error("no file found for wave {index} ({letter})")]
    MissingWave { index: usize, letter: char },

    #[error("wave {letter} is claimed by both {first} and {second}")]
    AmbiguousWave {
        letter: char,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("{origin}: column `{column}` not found in {path}")]
    MissingColumn {
        origin: String,
        path: PathBuf,
        column: String,
    },

    #[error("{origin}: invalid id `{value}` on line {line} of {path}")]
    InvalidId {
        origin: String,
        path: PathBuf,
        line: usize,
        value: String,
    },

    #[error("{origin}: id {id} appears {count} times in {path}")]
    DuplicateId {
        origin: String,
        path: PathBuf,
        id: i64,
        count: usize,
    },

    #[error("column `{column}` exists on both sides of the join")]
    ColumnCollision { column: String },

    #[error("table has no `{0}` key column")]
    MissingKey(String),

    #[error("nothing to accumulate: wave list is empty")]
    NoWaves,

    #[error("config: {0}")]
    Config(String),
}

impl WaveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WaveError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        WaveError::Csv {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = WaveError> = std::result::Result<T, E>;
