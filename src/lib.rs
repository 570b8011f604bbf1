//! # facelabel
//!
//! Demographic label resolution for face embeddings.
//!
//! Given a CLIP image embedding, facelabel returns one age range, one gender
//! and one race label. Four strategies are available:
//!
//! - **zero_shot**: top-1 cosine softmax against per-label text embeddings
//! - **sentences**: best-matching prompt sentence, labels read back from it
//! - **exclusion**: zero-shot ranking minus labels reviewers rejected on the
//!   three nearest verified images
//! - **quorum**: first label to reach `round(sqrt(n))` votes among verified
//!   neighbours, zero-shot while nothing is verified yet
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! facelabel --data-dir ./data --reference reference.json --http-port 5001
//! curl -X POST localhost:5001/labels -H 'content-type: application/json' \
//!      -d '{"embedding": [...], "strategy": "quorum"}'
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use facelabel::prelude::*;
//! use std::sync::Arc;
//!
//! let reference = ReferenceEmbeddings::from_file("reference.json", 768).unwrap();
//! let store = Arc::new(LmdbDocumentStore::open("./data/lmdb").unwrap());
//! let engine = LabelEngine::new(EngineConfig::default(), Arc::new(reference), store).unwrap();
//!
//! engine.rebuild_index().unwrap();
//! let response = engine.resolve_labels(&vec![0.0; 768], Strategy::Quorum);
//! println!("{:?}", response.labels());
//! ```
//!
//! ## Crate Structure
//!
//! - `facelabel-core` - Vocabulary, reference embeddings, flat index, resolvers, engine
//! - `facelabel-storage` - LMDB document store and JSONL import
//! - `facelabel-api` - REST API

// Re-export core types
pub use facelabel_core::{
    Category, DocumentStore, EngineConfig, Error, HashingTextEncoder, IndexSnapshot,
    LabelEngine, LabelResponse, LabelSet, MemoryStore, NeighborLookup, RebuildReport,
    ReferenceEmbeddings, Result, Strategy, Vector, VerifiedRecord, NO_LABEL,
};

// Re-export storage
pub use facelabel_storage::{import_jsonl, LmdbDocumentStore, RecordWriter};

// Re-export API
pub use facelabel_api::RestApi;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        DocumentStore, EngineConfig, Error, LabelEngine, LabelResponse, LabelSet,
        LmdbDocumentStore, MemoryStore, RecordWriter, ReferenceEmbeddings, RestApi, Result,
        Strategy, VerifiedRecord, NO_LABEL,
    };
}

/// SIMD-optimized vector operations
pub mod simd {
    pub use facelabel_core::simd::{dot_product, l2_squared, norm};
}
