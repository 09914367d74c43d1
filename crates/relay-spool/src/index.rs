//! Spool index - in-memory catalog of pending spool files
//!
//! The index is the source of truth for "what is waiting on disk". It
//! orders `.trn` files by creation time (filename lexicographic order as
//! tiebreak), enforces the retention cap by evicting the oldest files, and
//! keeps a file invisible to concurrent loads once it has been handed to a
//! sender, until it is reinstated or deleted.
//!
//! Critical sections under the lock are map updates only; eviction deletes
//! files from disk after the lock is released.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::SpoolError;
use crate::metrics::SpoolMetrics;

/// Default retention cap: 50 MiB
pub const DEFAULT_RETENTION_CAP_BYTES: u64 = 50 * 1024 * 1024;

/// Extension of durably written spool files
pub const TRN_EXTENSION: &str = "trn";

/// Extension of in-flight spool files
pub const TMP_EXTENSION: &str = "tmp";

/// An indexed spool entry
#[derive(Debug, Clone, Copy)]
struct EntryMeta {
    created_at_ms: u64,
    size: u64,
}

#[derive(Debug, Default)]
struct Inner {
    /// FIFO ordering: (created_at_ms, filename)
    queue: BTreeSet<(u64, String)>,

    /// Metadata for queued entries
    queued: HashMap<String, EntryMeta>,

    /// Entries handed to a sender, awaiting delete or reinstate
    checked_out: HashMap<String, EntryMeta>,

    /// Total bytes across queued and checked-out entries
    total_bytes: u64,
}

/// In-memory catalog of spool files, and the sole mutator of the directory
pub struct SpoolIndex {
    dir: PathBuf,
    cap_bytes: u64,
    metrics: Arc<SpoolMetrics>,
    inner: Mutex<Inner>,
}

impl SpoolIndex {
    /// Create an index over a spool directory, creating it if missing
    pub fn new(dir: impl Into<PathBuf>, cap_bytes: u64) -> Result<Self, SpoolError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| SpoolError::io(&dir, e))?;

        Ok(Self {
            dir,
            cap_bytes: cap_bytes.max(1),
            metrics: Arc::new(SpoolMetrics::new()),
            inner: Mutex::new(Inner::default()),
        })
    }

    /// The spool directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Shared metrics handle
    pub fn metrics(&self) -> Arc<SpoolMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Number of queued files (checked-out files excluded)
    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Whether nothing is queued or checked out
    pub fn is_empty(&self) -> bool {
        let inner = self.inner.lock();
        inner.queue.is_empty() && inner.checked_out.is_empty()
    }

    /// Total accounted bytes (queued plus checked out)
    pub fn total_bytes(&self) -> u64 {
        self.inner.lock().total_bytes
    }

    /// Insert a durably written file, evicting the oldest files if the
    /// retention cap would be exceeded
    ///
    /// The just-inserted file is never evicted, so the on-disk total is
    /// bounded by cap + one file's size.
    pub fn enqueue(&self, filename: &str, created_at_ms: u64, size: u64) {
        let evicted = {
            let mut inner = self.inner.lock();
            inner.insert(filename, created_at_ms, size);
            inner.evict_over_cap(self.cap_bytes, filename)
        };

        if !evicted.is_empty() {
            self.metrics.record_retention_drop(evicted.len() as u64);
            for name in &evicted {
                let path = self.dir.join(name);
                if let Err(e) = fs::remove_file(&path) {
                    tracing::warn!(file = %name, error = %e, "failed to delete evicted spool file");
                }
            }
            tracing::debug!(
                evicted = evicted.len(),
                cap_bytes = self.cap_bytes,
                "retention cap reached, dropped oldest spool files"
            );
        }
    }

    /// Remove and return the oldest queued filename
    ///
    /// The caller must either delete the file (`remove`) or put it back
    /// (`reinstate`). Until then the file is invisible to other callers.
    pub fn dequeue_oldest(&self) -> Option<String> {
        let mut inner = self.inner.lock();
        let (created_at_ms, filename) = inner.queue.iter().next().cloned()?;
        inner.queue.remove(&(created_at_ms, filename.clone()));
        let meta = inner
            .queued
            .remove(&filename)
            .unwrap_or(EntryMeta { created_at_ms, size: 0 });
        inner.checked_out.insert(filename.clone(), meta);
        Some(filename)
    }

    /// Put a checked-out file back with its original creation time
    pub fn reinstate(&self, filename: &str) {
        let mut inner = self.inner.lock();
        if let Some(meta) = inner.checked_out.remove(filename) {
            inner.queue.insert((meta.created_at_ms, filename.to_owned()));
            inner.queued.insert(filename.to_owned(), meta);
        }
    }

    /// Drop a file from the index accounting
    ///
    /// Idempotent: unknown filenames are ignored.
    pub fn remove(&self, filename: &str) {
        let mut inner = self.inner.lock();
        let meta = if let Some(meta) = inner.checked_out.remove(filename) {
            Some(meta)
        } else if let Some(meta) = inner.queued.remove(filename) {
            inner.queue.remove(&(meta.created_at_ms, filename.to_owned()));
            Some(meta)
        } else {
            None
        };
        if let Some(meta) = meta {
            inner.total_bytes = inner.total_bytes.saturating_sub(meta.size);
        }
    }

    /// Rebuild the index from the directory contents
    ///
    /// Lists `.trn` files (ordering by the header timestamp, mtime as
    /// fallback for unreadable headers) and deletes `.tmp` stragglers left
    /// by a crash mid-write.
    pub fn startup_scan(&self) -> Result<usize, SpoolError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| SpoolError::io(&self.dir, e))?;

        let mut recovered = 0usize;
        for entry in entries {
            let entry = entry.map_err(|e| SpoolError::io(&self.dir, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            match path.extension().and_then(|e| e.to_str()) {
                Some(TMP_EXTENSION) => {
                    tracing::debug!(file = %path.display(), "sweeping incomplete spool file");
                    if let Err(e) = fs::remove_file(&path) {
                        tracing::warn!(file = %path.display(), error = %e, "failed to sweep .tmp file");
                    }
                }
                Some(TRN_EXTENSION) => {
                    let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
                        continue;
                    };
                    let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                    let created_at_ms = read_created_at(&path, &entry);
                    self.enqueue(filename, created_at_ms, size);
                    recovered += 1;
                }
                _ => {}
            }
        }

        tracing::info!(
            dir = %self.dir.display(),
            recovered,
            total_bytes = self.total_bytes(),
            "spool startup scan complete"
        );
        Ok(recovered)
    }
}

/// Creation time from the record header, falling back to file mtime
fn read_created_at(path: &Path, entry: &fs::DirEntry) -> u64 {
    let mut header = [0u8; relay_protocol::HEADER_LEN];
    let from_header = fs::File::open(path)
        .and_then(|mut f| {
            use std::io::Read;
            f.read_exact(&mut header)
        })
        .ok()
        .and_then(|_| relay_protocol::peek_created_at(&header));

    from_header.unwrap_or_else(|| {
        entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    })
}

impl Inner {
    fn insert(&mut self, filename: &str, created_at_ms: u64, size: u64) {
        if self.queued.contains_key(filename) || self.checked_out.contains_key(filename) {
            return;
        }
        self.queue.insert((created_at_ms, filename.to_owned()));
        self.queued
            .insert(filename.to_owned(), EntryMeta { created_at_ms, size });
        self.total_bytes += size;
    }

    /// Evict oldest queued entries until under the cap; never evicts
    /// `protect` (the just-inserted file) or checked-out entries.
    fn evict_over_cap(&mut self, cap_bytes: u64, protect: &str) -> Vec<String> {
        let mut evicted = Vec::new();
        while self.total_bytes > cap_bytes {
            let victim = self
                .queue
                .iter()
                .find(|(_, name)| name.as_str() != protect)
                .cloned();
            let Some((created_at_ms, filename)) = victim else {
                break;
            };
            self.queue.remove(&(created_at_ms, filename.clone()));
            if let Some(meta) = self.queued.remove(&filename) {
                self.total_bytes = self.total_bytes.saturating_sub(meta.size);
            }
            evicted.push(filename);
        }
        evicted
    }
}

#[cfg(test)]
#[path = "index_test.rs"]
mod index_test;
