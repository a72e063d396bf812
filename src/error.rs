use std::path::PathBuf;

use thiserror::Error;

use crate::parse::ParseError;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a line could not be split into a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Malformation {
    MissingDelimiter,
    EmptyKey,
}

impl std::fmt::Display for Malformation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Malformation::MissingDelimiter => f.write_str("missing ';' delimiter"),
            Malformation::EmptyKey => f.write_str("empty key"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("could not open input file {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not stat input file {}", .path.display())]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not mmap input file {}", .path.display())]
    Map {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid line at byte {offset} ({reason}): {line:?}")]
    Malformed {
        offset: usize,
        reason: Malformation,
        line: String,
    },

    #[error("invalid measurement at byte {offset}: {text:?}")]
    InvalidNumber {
        offset: usize,
        text: String,
        #[source]
        source: ParseError,
    },

    #[error("could not build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("a worker disconnected before finishing its range")]
    WorkerLost,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("could not write report: {0}")]
    Report(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(offset: usize, reason: Malformation, line: &[u8]) -> Self {
        Error::Malformed {
            offset,
            reason,
            line: String::from_utf8_lossy(line).into_owned(),
        }
    }

    pub(crate) fn invalid_number(offset: usize, text: &[u8], source: ParseError) -> Self {
        Error::InvalidNumber {
            offset,
            text: String::from_utf8_lossy(text).into_owned(),
            source,
        }
    }

    /// True for per-record errors that a skip policy may drop.
    pub fn is_record_error(&self) -> bool {
        matches!(self, Error::Malformed { .. } | Error::InvalidNumber { .. })
    }
}
