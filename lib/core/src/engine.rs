//! Label Decision Facade
//!
//! [`LabelEngine`] owns the verified index, the document store handle and one
//! resolver per [`Strategy`]. It is the only place resolver errors turn into
//! a failure response.

use crate::classifier::{ZeroShotClassifier, DEFAULT_TEMPERATURE};
use crate::index::VerifiedIndex;
use crate::reference::ReferenceEmbeddings;
use crate::resolver::{
    ExclusionResolver, NeighborLookup, QuorumResolver, ResolveContext, Resolver,
    SentenceResolver, Strategy, ZeroShotResolver, DEFAULT_EXCLUSION_NEIGHBORS,
};
use crate::store::DocumentStore;
use crate::vocabulary::LabelSet;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// CLIP ViT-L/14 embedding width
pub const DEFAULT_DIM: usize = 768;

pub const DEFAULT_LOOKUP_BUDGET: Duration = Duration::from_secs(2);

/// Message returned with a failed resolution
pub const FAIL_MESSAGE: &str = "There was an error processing your request";

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub dim: usize,
    /// Logit scale applied to cosine similarity before softmax
    pub temperature: f32,
    /// Neighbours the exclusion resolver reads incorrect labels from
    pub exclusion_neighbors: usize,
    /// Cap on the quorum walk; `None` walks the whole index
    pub quorum_max_neighbors: Option<usize>,
    pub lookup: NeighborLookup,
    /// Store round-trip budget per resolution
    pub lookup_budget: Duration,
    pub default_strategy: Strategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dim: DEFAULT_DIM,
            temperature: DEFAULT_TEMPERATURE,
            exclusion_neighbors: DEFAULT_EXCLUSION_NEIGHBORS,
            quorum_max_neighbors: None,
            lookup: NeighborLookup::ById,
            lookup_budget: DEFAULT_LOOKUP_BUDGET,
            default_strategy: Strategy::Quorum,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.dim == 0 {
            return Err(Error::InvalidConfig("dim must be > 0".into()));
        }
        if !self.temperature.is_finite() || self.temperature <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "temperature must be positive, got {}",
                self.temperature
            )));
        }
        if self.quorum_max_neighbors == Some(0) {
            return Err(Error::InvalidConfig("quorum_max_neighbors must be > 0".into()));
        }
        Ok(())
    }
}

/// Outcome of one resolution request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LabelResponse {
    /// `[age, gender, race]`
    Success { labels: [String; 3] },
    Fail { message: String },
}

impl LabelResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, LabelResponse::Success { .. })
    }

    pub fn labels(&self) -> Option<&[String; 3]> {
        match self {
            LabelResponse::Success { labels } => Some(labels),
            LabelResponse::Fail { .. } => None,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            LabelResponse::Success { .. } => "success",
            LabelResponse::Fail { .. } => "fail",
        }
    }
}

/// Result of a successful rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildReport {
    /// Verified embeddings now indexed; zero is a valid outcome
    pub size: usize,
    pub elapsed: Duration,
}

pub struct LabelEngine {
    config: EngineConfig,
    store: Arc<dyn DocumentStore>,
    index: VerifiedIndex,
    classifier: Arc<ZeroShotClassifier>,
    zero_shot: ZeroShotResolver,
    sentences: SentenceResolver,
    exclusion: ExclusionResolver,
    quorum: QuorumResolver,
}

impl LabelEngine {
    /// The index starts empty; call [`LabelEngine::rebuild_index`] to fill it
    pub fn new(
        config: EngineConfig,
        reference: Arc<ReferenceEmbeddings>,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self> {
        config.validate()?;
        if reference.dim() != config.dim {
            return Err(Error::InvalidDimension {
                expected: config.dim,
                actual: reference.dim(),
            });
        }

        let classifier = Arc::new(ZeroShotClassifier::new(reference, config.temperature));
        Ok(Self {
            index: VerifiedIndex::new(config.dim),
            zero_shot: ZeroShotResolver::new(classifier.clone()),
            sentences: SentenceResolver::new(classifier.clone()),
            exclusion: ExclusionResolver::new(classifier.clone(), config.exclusion_neighbors),
            quorum: QuorumResolver::new(classifier.clone(), config.quorum_max_neighbors),
            classifier,
            store,
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    #[inline]
    pub fn index(&self) -> &VerifiedIndex {
        &self.index
    }

    #[inline]
    pub fn classifier(&self) -> &ZeroShotClassifier {
        &self.classifier
    }

    #[inline]
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    pub fn resolver(&self, strategy: Strategy) -> &dyn Resolver {
        match strategy {
            Strategy::ZeroShot => &self.zero_shot,
            Strategy::Sentences => &self.sentences,
            Strategy::Exclusion => &self.exclusion,
            Strategy::Quorum => &self.quorum,
        }
    }

    /// Resolve with `strategy`, errors left for the caller.
    ///
    /// A malformed embedding is a classification failure: zero-shot,
    /// sentences and quorum answer with three sentinels, exclusion fails.
    pub fn try_resolve(&self, embedding: &[f32], strategy: Strategy) -> Result<LabelSet> {
        let snapshot = self.index.snapshot();
        let ctx = ResolveContext::new(
            &snapshot,
            self.store.as_ref(),
            self.config.lookup,
            self.config.lookup_budget,
        );
        let labels = self.resolver(strategy).resolve(embedding, &ctx)?;
        tracing::debug!(
            %strategy,
            ntotal = snapshot.len(),
            elapsed_us = ctx.deadline.elapsed().as_micros() as u64,
            age = %labels.age,
            gender = %labels.gender,
            race = %labels.race,
            "Labels resolved"
        );
        Ok(labels)
    }

    /// Resolve with `strategy`, normalized to success/fail
    pub fn resolve_labels(&self, embedding: &[f32], strategy: Strategy) -> LabelResponse {
        match self.try_resolve(embedding, strategy) {
            Ok(labels) => LabelResponse::Success {
                labels: labels.into_array(),
            },
            Err(e) => {
                tracing::warn!(%strategy, error = %e, "Label resolution failed");
                LabelResponse::Fail {
                    message: format!("{}: {}", FAIL_MESSAGE, e),
                }
            }
        }
    }

    /// Resolve with the configured default strategy
    pub fn resolve(&self, embedding: &[f32]) -> LabelResponse {
        self.resolve_labels(embedding, self.config.default_strategy)
    }

    /// Replace the verified index from a full store scan
    pub fn rebuild_index(&self) -> Result<RebuildReport> {
        let started = Instant::now();
        let snapshot = self.index.rebuild(self.store.as_ref())?;
        Ok(RebuildReport {
            size: snapshot.len(),
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, VerifiedRecord};
    use crate::testing::{axis_reference, embedding_for, nudge, TEST_DIM};
    use crate::vocabulary::NO_LABEL;

    fn engine(store: Arc<MemoryStore>) -> LabelEngine {
        let config = EngineConfig {
            dim: TEST_DIM,
            ..EngineConfig::default()
        };
        LabelEngine::new(config, Arc::new(axis_reference()), store).unwrap()
    }

    #[test]
    fn test_config_validation() {
        assert!(EngineConfig::default().validate().is_ok());
        let bad = EngineConfig {
            temperature: 0.0,
            ..EngineConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = EngineConfig {
            quorum_max_neighbors: Some(0),
            ..EngineConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_reference_dim_must_match() {
        let result = LabelEngine::new(
            EngineConfig::default(),
            Arc::new(axis_reference()),
            Arc::new(MemoryStore::new()),
        );
        assert!(matches!(result, Err(Error::InvalidDimension { expected: 768, actual: 32 })));
    }

    #[test]
    fn test_success_shape() {
        let engine = engine(Arc::new(MemoryStore::new()));
        let response = engine.resolve_labels(&embedding_for("10-19", "Female", "Black"), Strategy::ZeroShot);
        assert_eq!(
            response,
            LabelResponse::Success {
                labels: ["10-19".into(), "Female".into(), "Black".into()]
            }
        );

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["labels"][2], "Black");
    }

    #[test]
    fn test_malformed_input_gives_sentinels_except_exclusion() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(store.clone());
        let mut non_finite = embedding_for("0-2", "Male", "White");
        non_finite[3] = f32::NAN;
        let malformed = [vec![1.0, 2.0, 3.0], non_finite];
        let sentinels = [NO_LABEL.to_string(), NO_LABEL.into(), NO_LABEL.into()];

        let check = |engine: &LabelEngine| {
            for embedding in &malformed {
                for strategy in [Strategy::ZeroShot, Strategy::Sentences, Strategy::Quorum] {
                    let response = engine.resolve_labels(embedding, strategy);
                    assert_eq!(response.labels(), Some(&sentinels), "strategy {}", strategy);
                }

                match engine.resolve_labels(embedding, Strategy::Exclusion) {
                    LabelResponse::Fail { message } => assert!(message.starts_with(FAIL_MESSAGE)),
                    other => panic!("unexpected {:?}", other),
                }
            }
        };

        // empty index: quorum falls back to zero-shot
        check(&engine);

        let e = embedding_for("20-29", "Male", "White");
        for i in 0..4 {
            store.upsert(VerifiedRecord::new(format!("r{}", i), nudge(&e, i + 1)).with_verified(["20-29"]));
        }
        engine.rebuild_index().unwrap();
        check(&engine);
    }

    #[test]
    fn test_quorum_on_empty_index_equals_zero_shot() {
        let engine = engine(Arc::new(MemoryStore::new()));
        let e = embedding_for("more than 70", "Male", "Latino");
        assert_eq!(
            engine.resolve_labels(&e, Strategy::Quorum),
            engine.resolve_labels(&e, Strategy::ZeroShot)
        );
    }

    #[test]
    fn test_rebuild_switches_quorum_to_votes() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(store.clone());
        let e = embedding_for("20-29", "Male", "White");
        for i in 0..4 {
            store.upsert(
                VerifiedRecord::new(format!("r{}", i), nudge(&e, i + 1))
                    .with_verified(["30-39", "Male", "Black"]),
            );
        }

        assert_eq!(engine.resolve(&e).labels().unwrap()[2], "White");
        let report = engine.rebuild_index().unwrap();
        assert_eq!(report.size, 4);
        assert_eq!(engine.index_len(), 4);
        let labels = engine.resolve(&e);
        assert_eq!(labels.labels().unwrap(), &["30-39".to_string(), "Male".into(), "Black".into()]);
    }

    #[test]
    fn test_rebuild_with_zero_verified_is_success() {
        let store = Arc::new(MemoryStore::with_records(vec![
            VerifiedRecord::new("p", embedding_for("0-2", "Male", "White")).pending(),
        ]));
        let engine = engine(store);
        let report = engine.rebuild_index().unwrap();
        assert_eq!(report.size, 0);
    }

    #[test]
    fn test_sentinel_is_success_not_fail() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(store.clone());
        let e = embedding_for("20-29", "Male", "White");
        store.upsert(VerifiedRecord::new("r0", nudge(&e, 1)));
        engine.rebuild_index().unwrap();

        let response = engine.resolve_labels(&e, Strategy::Quorum);
        assert!(response.is_success());
        assert!(response.labels().unwrap().iter().all(|l| l == NO_LABEL));
    }
}
