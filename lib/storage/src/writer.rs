use crate::lmdb_store::LmdbDocumentStore;
use facelabel_core::{Error, MemoryStore, Result, VerifiedRecord};

/// Write side of a document store, used by ingestion and the HTTP record
/// endpoints. The engine itself never writes.
pub trait RecordWriter: Send + Sync {
    fn put(&self, record: VerifiedRecord) -> Result<()>;

    /// Returns whether the id existed
    fn delete(&self, id: &str) -> Result<bool>;
}

impl RecordWriter for MemoryStore {
    fn put(&self, record: VerifiedRecord) -> Result<()> {
        self.upsert(record);
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.remove(id))
    }
}

impl RecordWriter for LmdbDocumentStore {
    fn put(&self, record: VerifiedRecord) -> Result<()> {
        self.put_record(&record)
            .map_err(|e| Error::Store(e.to_string()))
    }

    fn delete(&self, id: &str) -> Result<bool> {
        self.delete_record(id)
            .map_err(|e| Error::Store(e.to_string()))
    }
}
