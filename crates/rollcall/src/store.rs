//! Record store for rollcall.
//!
//! This module provides the flat-file persistence layer: a single JSON array
//! of registration records, read in full and rewritten in full on every
//! append. There is no indexing, no querying, and no update or delete.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::record::Record;

/// Policy for handling a backing file that exists but cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeErrorPolicy {
    /// Treat undecodable content as an empty collection.
    ///
    /// This favors availability over correctness: a corrupt file is
    /// indistinguishable from an empty one, and the next append will
    /// overwrite it. The degraded read is logged at warn level.
    #[default]
    DegradeToEmpty,
    /// Surface the decode failure to the caller.
    Surface,
}

/// File-backed store for the registration collection.
///
/// The store is stateless between calls: every read hits the file and every
/// append rewrites it whole. It holds only the configured path and the
/// decode-error policy, so cloning or sharing it across threads is cheap.
///
/// Concurrent appends are a lost-update hazard (last rewrite wins). The
/// store does no locking; callers that need atomicity must serialize their
/// own writes.
#[derive(Debug, Clone)]
pub struct RecordStore {
    /// Path to the backing file.
    path: PathBuf,
    /// What to do when the backing file cannot be decoded.
    decode_policy: DecodeErrorPolicy,
}

impl RecordStore {
    /// Open a record store at the given path.
    ///
    /// Creates the parent directories if they don't exist. The backing file
    /// itself is not created until the first append; an absent file reads as
    /// an empty collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directories cannot be created.
    pub fn open(path: impl AsRef<Path>, decode_policy: DecodeErrorPolicy) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opened record store at {}", path.display());
        Ok(Self {
            path,
            decode_policy,
        })
    }

    /// Get the path to the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the configured decode-error policy.
    #[must_use]
    pub fn decode_policy(&self) -> DecodeErrorPolicy {
        self.decode_policy
    }

    /// Load the full collection from the backing file.
    ///
    /// An absent file yields an empty collection. Undecodable content yields
    /// an empty collection or an error depending on the configured
    /// [`DecodeErrorPolicy`]. Records are returned in insertion order and
    /// are not re-validated on read.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, or (under
    /// [`DecodeErrorPolicy::Surface`]) cannot be decoded.
    pub fn load_all(&self) -> Result<Vec<Record>> {
        if !self.path.exists() {
            debug!("No backing file at {}, empty collection", self.path.display());
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(&self.path).map_err(|source| Error::StoreRead {
            path: self.path.clone(),
            source,
        })?;

        match serde_json::from_str(&raw) {
            Ok(records) => Ok(records),
            Err(source) => match self.decode_policy {
                DecodeErrorPolicy::DegradeToEmpty => {
                    warn!(
                        "Record store at {} is not valid JSON ({source}), reading as empty",
                        self.path.display()
                    );
                    Ok(Vec::new())
                }
                DecodeErrorPolicy::Surface => Err(Error::StoreDecode {
                    path: self.path.clone(),
                    source,
                }),
            },
        }
    }

    /// Append one record to the collection.
    ///
    /// Loads the full collection, pushes the record, and rewrites the whole
    /// backing file as pretty-printed (2-space indented) JSON. The store
    /// performs no validation; callers enforce the required-field rule
    /// before appending.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be loaded or the rewrite
    /// fails. A rewrite that fails midway may leave the file truncated.
    pub fn append_one(&self, record: &Record) -> Result<()> {
        let mut records = self.load_all()?;
        records.push(record.clone());
        self.write_all(&records)
    }

    /// Rewrite the backing file with the given collection.
    fn write_all(&self, records: &[Record]) -> Result<()> {
        let encoded = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, encoded).map_err(|source| Error::StoreWrite {
            path: self.path.clone(),
            source,
        })?;
        debug!(
            "Wrote {} record(s) to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}
