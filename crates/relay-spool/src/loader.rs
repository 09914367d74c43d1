//! Spool loader - pop the oldest valid file for re-sending
//!
//! Pops the oldest entry from the index, reads and decodes it, and hands
//! the raw payload plus tenant to the caller. Files with invalid tenant
//! keys or undecodable headers are deleted and counted as corrupt; the
//! loader then moves on to the next oldest file.

use std::fs;
use std::sync::Arc;

use bytes::Bytes;
use relay_protocol::TenantKey;

use crate::index::SpoolIndex;
use crate::metrics::SpoolMetrics;

/// A spool file handed to a sender
#[derive(Debug, Clone)]
pub struct PersistedFile {
    /// Filename within the spool directory
    pub filename: String,

    /// Tenant the payload is routed by
    pub tenant: TenantKey,

    /// Creation timestamp from the record header
    pub created_at_ms: u64,

    /// Raw gzipped payload (header stripped)
    pub payload: Bytes,
}

/// Reads pending spool files in FIFO order
pub struct SpoolLoader {
    index: Arc<SpoolIndex>,
    metrics: Arc<SpoolMetrics>,
}

impl SpoolLoader {
    /// Create a loader over the given index
    pub fn new(index: Arc<SpoolIndex>) -> Self {
        let metrics = index.metrics();
        Self { index, metrics }
    }

    /// Pop the oldest valid file, deleting invalid ones along the way
    ///
    /// Returns `None` when the spool is drained. A returned file stays
    /// checked out (invisible to concurrent loads) until the caller reports
    /// the outcome via [`update_processed_file_status`].
    ///
    /// [`update_processed_file_status`]: SpoolLoader::update_processed_file_status
    pub fn load_oldest(&self) -> Option<PersistedFile> {
        while let Some(filename) = self.index.dequeue_oldest() {
            let path = self.index.dir().join(&filename);

            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(file = %filename, error = %e, "failed to read spool file, discarding");
                    self.discard(&filename);
                    continue;
                }
            };

            match relay_protocol::decode(&bytes) {
                Ok(envelope) => {
                    self.metrics.record_loaded();
                    return Some(PersistedFile {
                        filename,
                        tenant: envelope.tenant,
                        created_at_ms: envelope.created_at_ms,
                        payload: envelope.payload,
                    });
                }
                Err(e) => {
                    tracing::warn!(file = %filename, error = %e, "corrupt spool file, deleting");
                    self.discard(&filename);
                }
            }
        }
        None
    }

    /// Report the outcome of processing a loaded file
    ///
    /// On success the file is deleted permanently (idempotent: a repeat
    /// call is not an error). On failure the file is reinstated with its
    /// original creation time, preserving FIFO order.
    pub fn update_processed_file_status(&self, filename: &str, success: bool) {
        if success {
            let path = self.index.dir().join(filename);
            self.index.remove(filename);
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!(file = %filename, "spool file delivered and deleted");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(file = %filename, error = %e, "failed to delete delivered spool file");
                }
            }
        } else {
            self.index.reinstate(filename);
        }
    }

    /// Delete an invalid file and count it as corrupt
    fn discard(&self, filename: &str) {
        let path = self.index.dir().join(filename);
        self.index.remove(filename);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(file = %filename, error = %e, "failed to delete corrupt spool file");
            }
        }
        self.metrics.record_corrupt();
    }
}

#[cfg(test)]
#[path = "loader_test.rs"]
mod loader_test;
