//! Quorum-Vote Resolver
//!
//! Once the index holds verified images, zero-shot scores are ignored. Each
//! category walks the neighbours nearest-first and counts, per vocabulary
//! label, how many neighbours carry it as a verified label. The first label
//! to reach `round(sqrt(index size))` votes wins.

use super::zero_shot::ZeroShotResolver;
use super::{CategoryOutcome, ResolveContext, Resolver, Strategy};
use crate::classifier::ZeroShotClassifier;
use crate::flat::Neighbor;
use crate::vocabulary::{Category, LabelSet};
use crate::{Error, Result, Vector};
use std::sync::Arc;

/// Votes a label needs: `round(sqrt(len))`, never below one
pub fn quorum_threshold(index_len: usize) -> usize {
    ((index_len as f64).sqrt().round() as usize).max(1)
}

/// Neighbour verified labels, fetched on first use and shared by the three
/// category walks
struct NeighborLabels<'c, 'a> {
    ctx: &'c ResolveContext<'a>,
    neighbors: Vec<Neighbor>,
    fetched: Vec<Option<Vec<String>>>,
}

impl<'c, 'a> NeighborLabels<'c, 'a> {
    fn new(ctx: &'c ResolveContext<'a>, neighbors: Vec<Neighbor>) -> Self {
        let fetched = vec![None; neighbors.len()];
        Self {
            ctx,
            neighbors,
            fetched,
        }
    }

    fn len(&self) -> usize {
        self.neighbors.len()
    }

    fn labels_at(&mut self, rank: usize) -> Result<&[String]> {
        if self.fetched[rank].is_none() {
            let labels = self
                .ctx
                .neighbor_records(self.neighbors[rank].position)?
                .into_iter()
                .flat_map(|r| r.verified_labels)
                .collect();
            self.fetched[rank] = Some(labels);
        }
        Ok(self.fetched[rank].as_deref().unwrap_or_default())
    }
}

#[derive(Debug, Clone)]
pub struct QuorumResolver {
    fallback: ZeroShotResolver,
    max_neighbors: Option<usize>,
}

impl QuorumResolver {
    /// `max_neighbors` caps the walk; `None` walks the whole index
    pub fn new(classifier: Arc<ZeroShotClassifier>, max_neighbors: Option<usize>) -> Self {
        Self {
            fallback: ZeroShotResolver::new(classifier),
            max_neighbors,
        }
    }

    fn vote(
        &self,
        category: Category,
        neighbors: &mut NeighborLabels<'_, '_>,
        quorum: usize,
    ) -> Result<CategoryOutcome> {
        let vocabulary = category.labels();
        let mut votes = vec![0usize; vocabulary.len()];

        for rank in 0..neighbors.len() {
            let labels = neighbors.labels_at(rank)?;
            for (slot, label) in vocabulary.iter().enumerate() {
                if labels.iter().any(|l| l == label) {
                    votes[slot] += 1;
                    if votes[slot] >= quorum {
                        return Ok(CategoryOutcome::Resolved(label.to_string()));
                    }
                }
            }
        }
        Ok(CategoryOutcome::NoCandidate)
    }
}

impl Resolver for QuorumResolver {
    fn strategy(&self) -> Strategy {
        Strategy::Quorum
    }

    fn resolve(&self, embedding: &[f32], ctx: &ResolveContext<'_>) -> Result<LabelSet> {
        let len = ctx.snapshot.len();
        if len == 0 {
            return Ok(self.fallback.labels(embedding));
        }

        if let Err(e) = Vector::validate(embedding, ctx.snapshot.dim()) {
            tracing::warn!(error = %e, "Quorum vote skipped for malformed embedding");
            return Ok(LabelSet::unidentified());
        }

        let quorum = quorum_threshold(len);
        let k = self.max_neighbors.map_or(len, |max| max.min(len));
        let hits = match ctx.snapshot.search(embedding, k) {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(error = %e, "Quorum neighbour search failed");
                return Ok(LabelSet::unidentified());
            }
        };
        let mut neighbors = NeighborLabels::new(ctx, hits);
        tracing::debug!(ntotal = len, quorum, walk = k, "Quorum vote");

        let mut labels = LabelSet::unidentified();
        for category in Category::ALL {
            let outcome = match self.vote(category, &mut neighbors, quorum) {
                Ok(outcome) => outcome,
                Err(e @ Error::LookupTimeout { .. }) => {
                    tracing::warn!(%category, error = %e, "Quorum walk stopped at lookup budget");
                    CategoryOutcome::NoCandidate
                }
                Err(e) => {
                    tracing::warn!(%category, error = %e, "Quorum vote failed");
                    CategoryOutcome::NoCandidate
                }
            };
            labels.set(category, outcome.into_label());
        }
        Ok(labels)
    }
}
