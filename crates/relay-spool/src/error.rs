//! Spool error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from spool operations
#[derive(Debug, Error)]
pub enum SpoolError {
    /// Disk I/O failed
    #[error("spool I/O failed on '{path}': {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl SpoolError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
