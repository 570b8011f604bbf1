//! Document store boundary.
//!
//! Image records live in an external store; the engine only reads them.
//! [`DocumentStore`] is that read surface. [`MemoryStore`] is the in-process
//! implementation used when no persistent store is configured.

use crate::{Result, Vector};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

pub type RecordId = String;

/// A reviewed (or pending) image record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedRecord {
    pub id: RecordId,
    pub embedding: Vec<f32>,
    /// `false` once a human has reviewed the labels
    pub requires_verification: bool,
    #[serde(default)]
    pub verified_labels: Vec<String>,
    #[serde(default)]
    pub incorrect_labels: Vec<String>,
}

impl VerifiedRecord {
    /// A reviewed record with no labels yet
    pub fn new(id: impl Into<RecordId>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            embedding,
            requires_verification: false,
            verified_labels: Vec::new(),
            incorrect_labels: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_verified<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.verified_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_incorrect<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.incorrect_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Mark as still awaiting review
    #[must_use]
    pub fn pending(mut self) -> Self {
        self.requires_verification = true;
        self
    }

    #[inline]
    pub fn is_verified(&self) -> bool {
        !self.requires_verification
    }
}

/// Read access to image records
pub trait DocumentStore: Send + Sync {
    /// Every record that no longer requires verification, in scan order
    fn verified_records(&self) -> Result<Vec<VerifiedRecord>>;

    fn find_by_id(&self, id: &str) -> Result<Option<VerifiedRecord>>;

    /// Verified records whose embedding is bitwise equal to `embedding`
    fn find_by_embedding(&self, embedding: &[f32]) -> Result<Vec<VerifiedRecord>> {
        Ok(self
            .verified_records()?
            .into_iter()
            .filter(|r| Vector::bit_eq(&r.embedding, embedding))
            .collect())
    }
}

/// Insertion-ordered records behind a lock
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<VerifiedRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<VerifiedRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.upsert(record);
        }
        store
    }

    /// Insert, or replace in place when the id exists
    pub fn upsert(&self, record: VerifiedRecord) {
        let mut records = self.records.write();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    pub fn remove(&self, id: &str) -> bool {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.id != id);
        records.len() != before
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl DocumentStore for MemoryStore {
    fn verified_records(&self) -> Result<Vec<VerifiedRecord>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| r.is_verified())
            .cloned()
            .collect())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<VerifiedRecord>> {
        Ok(self.records.read().iter().find(|r| r.id == id).cloned())
    }

    fn find_by_embedding(&self, embedding: &[f32]) -> Result<Vec<VerifiedRecord>> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| r.is_verified() && Vector::bit_eq(&r.embedding, embedding))
            .cloned()
            .collect())
    }
}
