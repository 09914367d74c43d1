//! Spool writer - durable append of a payload batch
//!
//! Writes each batch as a new file: header + payload into `<uuid>.tmp`,
//! fsync, then an atomic rename to `<uuid>.trn`. Only after the rename is
//! the file published to the index, so a crash at any point leaves either
//! a sweepable `.tmp` or a complete `.trn`, never a partial record.

use std::fs::{self, File};
use std::io::Write;
use std::sync::Arc;

use relay_protocol::TenantKey;
use uuid::Uuid;

use crate::error::SpoolError;
use crate::index::{SpoolIndex, TMP_EXTENSION, TRN_EXTENSION};
use crate::metrics::SpoolMetrics;
use crate::now_ms;

/// Writes payload batches to the spool directory
pub struct SpoolWriter {
    index: Arc<SpoolIndex>,
    metrics: Arc<SpoolMetrics>,
}

impl SpoolWriter {
    /// Create a writer over the given index
    pub fn new(index: Arc<SpoolIndex>) -> Self {
        let metrics = index.metrics();
        Self { index, metrics }
    }

    /// Durably write a batch and publish it to the index
    ///
    /// Returns the published `.trn` filename.
    pub fn write_to_disk(&self, payload: &[u8], tenant: &TenantKey) -> Result<String, SpoolError> {
        let created_at_ms = now_ms();
        let record = relay_protocol::encode(tenant, created_at_ms, payload);

        let stem = Uuid::new_v4();
        let tmp_name = format!("{stem}.{TMP_EXTENSION}");
        let trn_name = format!("{stem}.{TRN_EXTENSION}");
        let tmp_path = self.index.dir().join(&tmp_name);
        let trn_path = self.index.dir().join(&trn_name);

        let result = (|| {
            let mut file = File::create(&tmp_path).map_err(|e| SpoolError::io(&tmp_path, e))?;
            file.write_all(&record)
                .map_err(|e| SpoolError::io(&tmp_path, e))?;
            file.sync_all().map_err(|e| SpoolError::io(&tmp_path, e))?;
            drop(file);
            fs::rename(&tmp_path, &trn_path).map_err(|e| SpoolError::io(&trn_path, e))?;
            Ok(())
        })();

        if let Err(e) = result {
            self.metrics.record_write_error();
            // Best-effort cleanup; startup scan sweeps anything left behind
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        self.index
            .enqueue(&trn_name, created_at_ms, record.len() as u64);
        self.metrics.record_written(record.len() as u64);

        tracing::debug!(
            file = %trn_name,
            tenant = %tenant,
            bytes = record.len(),
            "payload spooled"
        );
        Ok(trn_name)
    }
}

#[cfg(test)]
#[path = "writer_test.rs"]
mod writer_test;
