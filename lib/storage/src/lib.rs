pub mod import;
pub mod lmdb_store;
pub mod writer;

pub use import::{import_jsonl, import_reader, ImportError, ImportSummary};
pub use lmdb_store::LmdbDocumentStore;
pub use writer::RecordWriter;
