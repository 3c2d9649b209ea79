//! Registration boundary for rollcall.
//!
//! The registry is the validation boundary in front of the record store: it
//! rejects submissions with a missing required field before the store is
//! ever invoked, and hands the read path straight through.

use tracing::info;

use crate::error::Result;
use crate::record::{Record, Submission};
use crate::store::RecordStore;

/// The registration service.
///
/// Owns a [`RecordStore`] handle and exposes the two operations the system
/// needs: register a submission and list everything. Validation happens
/// here, not in the store.
#[derive(Debug, Clone)]
pub struct Registry {
    store: RecordStore,
}

impl Registry {
    /// Create a registry over the given store.
    #[must_use]
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    /// Get the underlying record store.
    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Validate a submission and append it to the collection.
    ///
    /// Returns the record as stored.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingField`] if `name` or `email` is empty
    /// after trimming (the store is not touched), or a store error if the
    /// append fails.
    pub fn register(&self, submission: Submission) -> Result<Record> {
        let record = submission.into_record()?;
        self.store.append_one(&record)?;
        info!(name = %record.name, email = %record.email, "registered student");
        Ok(record)
    }

    /// List all registered records in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be loaded.
    pub fn list(&self) -> Result<Vec<Record>> {
        self.store.load_all()
    }
}
