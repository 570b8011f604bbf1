//! Verified-Vector Index
//!
//! An [`IndexSnapshot`] is the immutable triple built by one rebuild: the
//! record ids, their embeddings in scan order, and a [`FlatL2Index`] over the
//! same sequence. Position `i` means the same record in all three.
//!
//! [`VerifiedIndex`] publishes the current snapshot through an `ArcSwap`.
//! Readers take one `Arc` per resolution and keep using it even if a rebuild
//! lands meanwhile, so they never pair old embeddings with a new index.

use crate::flat::{FlatL2Index, Neighbor};
use crate::store::{DocumentStore, RecordId, VerifiedRecord};
use crate::{Error, Result, Vector};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    ids: Vec<RecordId>,
    embeddings: Vec<Vector>,
    flat: FlatL2Index,
}

impl IndexSnapshot {
    pub fn empty(dim: usize) -> Self {
        Self {
            ids: Vec::new(),
            embeddings: Vec::new(),
            flat: FlatL2Index::new(dim),
        }
    }

    /// Build from scanned records, keeping only reviewed ones.
    ///
    /// A record with the wrong embedding length fails the whole build.
    pub fn build(dim: usize, records: Vec<VerifiedRecord>) -> Result<Self> {
        let mut ids = Vec::with_capacity(records.len());
        let mut embeddings = Vec::with_capacity(records.len());
        let mut flat = FlatL2Index::with_capacity(dim, records.len());

        for record in records.into_iter().filter(VerifiedRecord::is_verified) {
            flat.add(&record.embedding).map_err(|e| match e {
                Error::InvalidDimension { expected, actual } => Error::Store(format!(
                    "record {} has embedding dimension {}, expected {}",
                    record.id, actual, expected
                )),
                other => other,
            })?;
            ids.push(record.id);
            embeddings.push(Vector::new(record.embedding));
        }

        if embeddings.len() != flat.len() || ids.len() != flat.len() {
            return Err(Error::IndexDesync {
                embeddings: embeddings.len(),
                index: flat.len(),
            });
        }

        Ok(Self {
            ids,
            embeddings,
            flat,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.flat.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.flat.dim()
    }

    #[inline]
    pub fn ids(&self) -> &[RecordId] {
        &self.ids
    }

    #[inline]
    pub fn embeddings(&self) -> &[Vector] {
        &self.embeddings
    }

    pub fn id(&self, position: usize) -> Option<&str> {
        self.ids.get(position).map(String::as_str)
    }

    pub fn embedding(&self, position: usize) -> Option<&Vector> {
        self.embeddings.get(position)
    }

    /// `k` nearest verified embeddings by squared L2, ascending
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.flat.search(query, k)
    }
}

/// Process-wide holder of the current snapshot
pub struct VerifiedIndex {
    current: ArcSwap<IndexSnapshot>,
    rebuild_lock: Mutex<()>,
    dim: usize,
}

impl VerifiedIndex {
    /// Starts empty
    pub fn new(dim: usize) -> Self {
        Self {
            current: ArcSwap::from_pointee(IndexSnapshot::empty(dim)),
            rebuild_lock: Mutex::new(()),
            dim,
        }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The snapshot readers should use for one whole operation
    #[inline]
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.current.load_full()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    /// Scan the store and publish a new snapshot.
    ///
    /// On failure the previous snapshot stays published and the error is
    /// returned, so "rebuild failed" never looks like "no verified images".
    pub fn rebuild(&self, store: &dyn DocumentStore) -> Result<Arc<IndexSnapshot>> {
        let _guard = self.rebuild_lock.lock();
        let started = Instant::now();
        tracing::info!("Rebuilding verified index");

        let records = store.verified_records().map_err(|e| {
            tracing::error!(error = %e, "Verified index rebuild failed reading the store");
            e
        })?;
        let snapshot = Arc::new(IndexSnapshot::build(self.dim, records).map_err(|e| {
            tracing::error!(error = %e, "Verified index rebuild failed");
            e
        })?);

        self.current.store(snapshot.clone());
        tracing::info!(
            ntotal = snapshot.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Verified index rebuilt"
        );
        Ok(snapshot)
    }

    /// Publish a prebuilt snapshot
    pub fn replace(&self, snapshot: IndexSnapshot) -> Result<()> {
        if snapshot.dim() != self.dim {
            return Err(Error::InvalidDimension {
                expected: self.dim,
                actual: snapshot.dim(),
            });
        }
        let _guard = self.rebuild_lock.lock();
        self.current.store(Arc::new(snapshot));
        Ok(())
    }
}
