//! Exclusion-Aware Resolver
//!
//! Walks the zero-shot ranking of each category and skips any label a
//! reviewer marked incorrect on one of the nearest verified images.

use super::{CategoryOutcome, ResolveContext, Resolver, Strategy};
use crate::classifier::ZeroShotClassifier;
use crate::vocabulary::{Category, LabelSet};
use crate::{Result, Vector};
use ahash::AHashSet;
use std::sync::Arc;

pub const DEFAULT_EXCLUSION_NEIGHBORS: usize = 3;

/// Label annotations pooled from the nearest verified neighbours
#[derive(Debug, Clone, Default)]
pub struct NeighborEvidence {
    /// Labels reviewers confirmed
    pub verified: AHashSet<String>,
    /// Labels reviewers rejected
    pub incorrect: AHashSet<String>,
    /// Neighbours examined
    pub neighbors: usize,
}

impl NeighborEvidence {
    /// Union the annotations of the `k` nearest neighbours (clamped to the
    /// snapshot size).
    pub fn gather(ctx: &ResolveContext<'_>, embedding: &[f32], k: usize) -> Result<Self> {
        let k = k.min(ctx.snapshot.len());
        let mut evidence = Self::default();

        for hit in ctx.snapshot.search(embedding, k)? {
            for record in ctx.neighbor_records(hit.position)? {
                evidence.incorrect.extend(record.incorrect_labels);
                evidence.verified.extend(record.verified_labels);
            }
            evidence.neighbors += 1;
        }
        Ok(evidence)
    }
}

#[derive(Debug, Clone)]
pub struct ExclusionResolver {
    classifier: Arc<ZeroShotClassifier>,
    neighbors: usize,
}

impl ExclusionResolver {
    pub fn new(classifier: Arc<ZeroShotClassifier>, neighbors: usize) -> Self {
        Self {
            classifier,
            neighbors,
        }
    }

    #[inline]
    pub fn neighbors(&self) -> usize {
        self.neighbors
    }

    /// Highest-ranked label of `category` not in `excluded`
    pub fn pick(
        &self,
        category: Category,
        embedding: &[f32],
        excluded: &AHashSet<String>,
    ) -> Result<CategoryOutcome> {
        let outcome = self
            .classifier
            .rank(category, embedding)?
            .into_iter()
            .find(|scored| !excluded.contains(scored.label))
            .map_or(CategoryOutcome::NoCandidate, |scored| {
                CategoryOutcome::Resolved(scored.label.to_string())
            });
        Ok(outcome)
    }
}

impl Resolver for ExclusionResolver {
    fn strategy(&self) -> Strategy {
        Strategy::Exclusion
    }

    /// A malformed embedding fails the whole call
    fn resolve(&self, embedding: &[f32], ctx: &ResolveContext<'_>) -> Result<LabelSet> {
        Vector::validate(embedding, self.classifier.dim())?;
        let evidence = if ctx.snapshot.is_empty() {
            NeighborEvidence::default()
        } else {
            NeighborEvidence::gather(ctx, embedding, self.neighbors)?
        };
        tracing::debug!(
            neighbors = evidence.neighbors,
            verified = evidence.verified.len(),
            incorrect = evidence.incorrect.len(),
            "Exclusion evidence gathered"
        );

        let mut labels = LabelSet::unidentified();
        for category in Category::ALL {
            let outcome = self
                .pick(category, embedding, &evidence.incorrect)
                .unwrap_or_else(|e| {
                    tracing::warn!(%category, error = %e, "Exclusion ranking failed");
                    CategoryOutcome::NoCandidate
                });
            labels.set(category, outcome.into_label());
        }
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::DEFAULT_TEMPERATURE;
    use crate::index::IndexSnapshot;
    use crate::resolver::{NeighborLookup, ZeroShotResolver};
    use crate::store::{DocumentStore, MemoryStore, VerifiedRecord};
    use crate::testing::{axis_reference, embedding_for, nudge, TEST_DIM};
    use crate::vocabulary::{AGE_LABELS, NO_LABEL};
    use std::time::Duration;

    fn classifier() -> Arc<ZeroShotClassifier> {
        Arc::new(ZeroShotClassifier::new(Arc::new(axis_reference()), DEFAULT_TEMPERATURE))
    }

    fn resolve(store: &MemoryStore, embedding: &[f32]) -> LabelSet {
        let snapshot = IndexSnapshot::build(TEST_DIM, store.verified_records().unwrap()).unwrap();
        let ctx = ResolveContext::new(&snapshot, store, NeighborLookup::ById, Duration::from_secs(5));
        ExclusionResolver::new(classifier(), DEFAULT_EXCLUSION_NEIGHBORS)
            .resolve(embedding, &ctx)
            .unwrap()
    }

    /// Query leaning towards White first, Black second
    fn white_then_black() -> Vec<f32> {
        let mut e = embedding_for("20-29", "Male", "White");
        let black = embedding_for("20-29", "Male", "Black");
        for (x, b) in e.iter_mut().zip(black) {
            *x += 0.5 * b;
        }
        e
    }

    #[test]
    fn test_skips_label_marked_incorrect_by_neighbours() {
        let query = white_then_black();
        let store = MemoryStore::with_records(
            (0..3)
                .map(|i| {
                    VerifiedRecord::new(format!("n{}", i), nudge(&query, i + 1))
                        .with_incorrect(["White"])
                })
                .collect(),
        );

        let labels = resolve(&store, &query);
        assert_eq!(labels.race, "Black");
        assert_eq!(labels.age, "20-29");
        assert_eq!(labels.gender, "Male");
    }

    #[test]
    fn test_only_nearest_three_count() {
        let query = white_then_black();
        let mut records: Vec<VerifiedRecord> = (0..3)
            .map(|i| VerifiedRecord::new(format!("near{}", i), nudge(&query, i + 1)))
            .collect();
        records.push(VerifiedRecord::new("far", nudge(&query, 40)).with_incorrect(["White"]));
        let store = MemoryStore::with_records(records);

        assert_eq!(resolve(&store, &query).race, "White");
    }

    #[test]
    fn test_fully_excluded_category_is_sentinel_alone() {
        let query = embedding_for("40-49", "Female", "Latino");
        let store = MemoryStore::with_records(vec![
            VerifiedRecord::new("a", nudge(&query, 1)).with_incorrect(AGE_LABELS),
            VerifiedRecord::new("b", nudge(&query, 2)).with_incorrect(["Male"]),
        ]);

        let labels = resolve(&store, &query);
        assert_eq!(labels.age, NO_LABEL);
        assert_eq!(labels.gender, "Female");
        assert_eq!(labels.race, "Latino");
    }

    #[test]
    fn test_empty_index_matches_zero_shot() {
        let query = white_then_black();
        let labels = resolve(&MemoryStore::new(), &query);
        assert_eq!(labels, ZeroShotResolver::new(classifier()).labels(&query));
    }

    #[test]
    fn test_gather_unions_and_dedups() {
        let query = embedding_for("3-9", "Male", "Indian");
        let store = MemoryStore::with_records(vec![
            VerifiedRecord::new("a", nudge(&query, 1))
                .with_verified(["3-9", "Male"])
                .with_incorrect(["White"]),
            VerifiedRecord::new("b", nudge(&query, 2))
                .with_verified(["3-9", "Indian"])
                .with_incorrect(["White", "10-19"]),
        ]);
        let snapshot = IndexSnapshot::build(TEST_DIM, store.verified_records().unwrap()).unwrap();
        let ctx = ResolveContext::new(&snapshot, &store, NeighborLookup::ById, Duration::from_secs(5));

        let evidence = NeighborEvidence::gather(&ctx, &query, 3).unwrap();
        assert_eq!(evidence.neighbors, 2);
        assert_eq!(evidence.verified.len(), 3);
        assert_eq!(evidence.incorrect.len(), 2);
        assert!(evidence.incorrect.contains("10-19"));
    }

    #[test]
    fn test_lookup_by_embedding_value() {
        let query = white_then_black();
        let store = MemoryStore::with_records(vec![
            VerifiedRecord::new("a", nudge(&query, 1)).with_incorrect(["White"]),
        ]);
        let snapshot = IndexSnapshot::build(TEST_DIM, store.verified_records().unwrap()).unwrap();
        let ctx = ResolveContext::new(&snapshot, &store, NeighborLookup::ByEmbedding, Duration::from_secs(5));

        let labels = ExclusionResolver::new(classifier(), 3).resolve(&query, &ctx).unwrap();
        assert_eq!(labels.race, "Black");
    }
}
