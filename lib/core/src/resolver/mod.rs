//! Label resolution strategies.
//!
//! Each [`Strategy`] has one [`Resolver`] implementation. A resolver gets the
//! query embedding plus a [`ResolveContext`] pinning the index snapshot, the
//! document store and the lookup deadline for that one call.

pub mod exclusion;
pub mod quorum;
pub mod zero_shot;

pub use exclusion::{ExclusionResolver, NeighborEvidence, DEFAULT_EXCLUSION_NEIGHBORS};
pub use quorum::{quorum_threshold, QuorumResolver};
pub use zero_shot::{SentenceResolver, ZeroShotResolver};

use crate::index::IndexSnapshot;
use crate::store::{DocumentStore, VerifiedRecord};
use crate::vocabulary::{LabelSet, NO_LABEL};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Which resolver answers a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Top-1 against bare label embeddings
    ZeroShot,
    /// Best prompt sentence, labels read back from its text
    Sentences,
    /// Zero-shot ranking minus labels neighbours were marked wrong on
    Exclusion,
    /// Vote among verified neighbours, zero-shot while the index is empty
    #[default]
    Quorum,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::ZeroShot,
        Strategy::Sentences,
        Strategy::Exclusion,
        Strategy::Quorum,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::ZeroShot => "zero_shot",
            Strategy::Sentences => "sentences",
            Strategy::Exclusion => "exclusion",
            Strategy::Quorum => "quorum",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    /// Names, plus the legacy method numbers 1-4
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero_shot" | "zeroshot" | "zero-shot" | "1" => Ok(Strategy::ZeroShot),
            "exclusion" | "2" => Ok(Strategy::Exclusion),
            "quorum" | "knn" | "3" => Ok(Strategy::Quorum),
            "sentences" | "sentence" | "4" => Ok(Strategy::Sentences),
            other => Err(Error::InvalidConfig(format!("unknown strategy '{}'", other))),
        }
    }
}

/// How a neighbour found in the index is looked up in the document store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborLookup {
    /// By the record id captured at rebuild time
    #[default]
    ById,
    /// By exact embedding value, for stores without stable ids
    ByEmbedding,
}

/// Result for one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryOutcome {
    Resolved(String),
    /// No label met the strategy's bar; reported as [`NO_LABEL`]
    NoCandidate,
}

impl CategoryOutcome {
    pub fn into_label(self) -> String {
        match self {
            CategoryOutcome::Resolved(label) => label,
            CategoryOutcome::NoCandidate => NO_LABEL.to_string(),
        }
    }
}

/// Time allowed for document-store round trips within one resolution.
///
/// Checked before each round trip. A store call already in flight is not
/// interrupted, so a single slow call can overrun the budget by its own
/// duration; stores bound individual calls themselves.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn new(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn check(&self) -> Result<()> {
        let elapsed = self.elapsed();
        if elapsed > self.budget {
            return Err(Error::LookupTimeout {
                elapsed_ms: elapsed.as_millis(),
            });
        }
        Ok(())
    }
}

/// Everything one resolution reads, fixed for its duration
pub struct ResolveContext<'a> {
    pub snapshot: &'a IndexSnapshot,
    pub store: &'a dyn DocumentStore,
    pub lookup: NeighborLookup,
    pub deadline: Deadline,
}

impl<'a> ResolveContext<'a> {
    pub fn new(
        snapshot: &'a IndexSnapshot,
        store: &'a dyn DocumentStore,
        lookup: NeighborLookup,
        budget: Duration,
    ) -> Self {
        Self {
            snapshot,
            store,
            lookup,
            deadline: Deadline::new(budget),
        }
    }

    /// Reviewed store records behind the snapshot entry at `position`.
    ///
    /// Empty when the record was deleted or sent back for review since the
    /// last rebuild.
    pub fn neighbor_records(&self, position: usize) -> Result<Vec<VerifiedRecord>> {
        self.deadline.check()?;
        let desync = || Error::IndexDesync {
            embeddings: self.snapshot.embeddings().len(),
            index: self.snapshot.len(),
        };

        match self.lookup {
            NeighborLookup::ById => {
                let id = self.snapshot.id(position).ok_or_else(desync)?;
                Ok(self
                    .store
                    .find_by_id(id)?
                    .into_iter()
                    .filter(VerifiedRecord::is_verified)
                    .collect())
            }
            NeighborLookup::ByEmbedding => {
                let embedding = self.snapshot.embedding(position).ok_or_else(desync)?;
                self.store.find_by_embedding(embedding.as_slice())
            }
        }
    }
}

/// One label-resolution strategy
pub trait Resolver: Send + Sync {
    fn strategy(&self) -> Strategy;

    /// Labels for `embedding`. Per-category failures come back as
    /// [`NO_LABEL`]; an `Err` means the whole call failed.
    fn resolve(&self, embedding: &[f32], ctx: &ResolveContext<'_>) -> Result<LabelSet>;
}
