use super::{ResolveContext, Resolver, Strategy};
use crate::classifier::ZeroShotClassifier;
use crate::vocabulary::LabelSet;
use crate::Result;
use std::sync::Arc;

/// Top-1 per category against the label embeddings. A malformed embedding
/// yields three sentinels, never a partial answer.
#[derive(Debug, Clone)]
pub struct ZeroShotResolver {
    classifier: Arc<ZeroShotClassifier>,
}

impl ZeroShotResolver {
    pub fn new(classifier: Arc<ZeroShotClassifier>) -> Self {
        Self { classifier }
    }

    pub fn labels(&self, embedding: &[f32]) -> LabelSet {
        self.classifier.classify(embedding).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Zero-shot classification failed");
            LabelSet::unidentified()
        })
    }
}

impl Resolver for ZeroShotResolver {
    fn strategy(&self) -> Strategy {
        Strategy::ZeroShot
    }

    fn resolve(&self, embedding: &[f32], _ctx: &ResolveContext<'_>) -> Result<LabelSet> {
        Ok(self.labels(embedding))
    }
}

/// Labels read back from the best-matching prompt sentence
#[derive(Debug, Clone)]
pub struct SentenceResolver {
    classifier: Arc<ZeroShotClassifier>,
}

impl SentenceResolver {
    pub fn new(classifier: Arc<ZeroShotClassifier>) -> Self {
        Self { classifier }
    }
}

impl Resolver for SentenceResolver {
    fn strategy(&self) -> Strategy {
        Strategy::Sentences
    }

    fn resolve(&self, embedding: &[f32], _ctx: &ResolveContext<'_>) -> Result<LabelSet> {
        Ok(self
            .classifier
            .classify_sentences(embedding)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Sentence classification failed");
                LabelSet::unidentified()
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::DEFAULT_TEMPERATURE;
    use crate::index::IndexSnapshot;
    use crate::resolver::NeighborLookup;
    use crate::store::MemoryStore;
    use crate::testing::{axis_reference, embedding_for, TEST_DIM};
    use std::time::Duration;

    fn classifier() -> Arc<ZeroShotClassifier> {
        Arc::new(ZeroShotClassifier::new(Arc::new(axis_reference()), DEFAULT_TEMPERATURE))
    }

    #[test]
    fn test_both_prompt_variants_agree_on_clean_input() {
        let store = MemoryStore::new();
        let snapshot = IndexSnapshot::empty(TEST_DIM);
        let ctx = ResolveContext::new(&snapshot, &store, NeighborLookup::ById, Duration::from_secs(1));
        let e = embedding_for("50-59", "Male", "Middle Eastern");

        let labels = ZeroShotResolver::new(classifier()).resolve(&e, &ctx).unwrap();
        let sentences = SentenceResolver::new(classifier()).resolve(&e, &ctx).unwrap();
        assert_eq!(labels, sentences);
        assert_eq!(labels.race, "Middle Eastern");
    }

    #[test]
    fn test_malformed_input_gives_sentinels() {
        let store = MemoryStore::new();
        let snapshot = IndexSnapshot::empty(TEST_DIM);
        let ctx = ResolveContext::new(&snapshot, &store, NeighborLookup::ById, Duration::from_secs(1));

        let labels = ZeroShotResolver::new(classifier()).resolve(&[0.5; 3], &ctx).unwrap();
        assert_eq!(labels, LabelSet::unidentified());
        let labels = SentenceResolver::new(classifier()).resolve(&[0.5; 3], &ctx).unwrap();
        assert_eq!(labels, LabelSet::unidentified());
    }
}
