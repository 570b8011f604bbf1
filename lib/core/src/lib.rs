//! # facelabel Core
//!
//! Demographic label resolution for face embeddings.
//!
//! This crate provides the data structures and resolution strategies:
//!
//! - [`Vector`] - Dense embedding with SIMD distance operations
//! - [`ReferenceEmbeddings`] - Text-side label and prompt-sentence banks
//! - [`ZeroShotClassifier`] - Softmax over scaled cosine similarity
//! - [`VerifiedIndex`] - Atomically rebuilt flat L2 index over reviewed images
//! - [`LabelEngine`] - Facade running one of four [`Strategy`] resolvers
//!
//! ## Example
//!
//! ```rust
//! use facelabel_core::{
//!     EngineConfig, HashingTextEncoder, LabelEngine, MemoryStore, ReferenceEmbeddings,
//!     Strategy,
//! };
//! use std::sync::Arc;
//!
//! let reference = ReferenceEmbeddings::build(&HashingTextEncoder::new(64)).unwrap();
//! let config = EngineConfig { dim: 64, ..EngineConfig::default() };
//! let engine = LabelEngine::new(config, Arc::new(reference), Arc::new(MemoryStore::new())).unwrap();
//!
//! engine.rebuild_index().unwrap();
//! let response = engine.resolve_labels(&vec![0.1; 64], Strategy::Quorum);
//! assert!(response.is_success());
//! ```

pub mod classifier;
pub mod engine;
pub mod error;
pub mod flat;
pub mod index;
pub mod reference;
pub mod resolver;
pub mod store;
pub mod vector;
pub mod vocabulary;

/// SIMD-optimized vector operations
///
/// Provides hardware-accelerated distance calculations:
/// - AVX2/FMA on x86_64
/// - NEON on ARM64/Apple Silicon
pub mod simd;

#[cfg(test)]
mod testing;

pub use classifier::{ScoredLabel, ZeroShotClassifier, DEFAULT_TEMPERATURE};
pub use engine::{EngineConfig, LabelEngine, LabelResponse, RebuildReport, FAIL_MESSAGE};
pub use error::{Error, Result};
pub use flat::{FlatL2Index, Neighbor};
pub use index::{IndexSnapshot, VerifiedIndex};
pub use reference::{HashingTextEncoder, LabelBank, ReferenceEmbeddings, ReferenceFile, TextEncoder};
pub use resolver::{CategoryOutcome, NeighborLookup, Resolver, Strategy};
pub use store::{DocumentStore, MemoryStore, RecordId, VerifiedRecord};
pub use vector::Vector;
pub use vocabulary::{Category, LabelSet, NO_LABEL};
