// LMDB-backed document store for image records
use anyhow::Result;
use facelabel_core::{DocumentStore, Error, VerifiedRecord};
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};
use std::path::Path;
use std::sync::Arc;

const DB_RECORDS: &str = "records";

/// 16GB default map size
pub const DEFAULT_MAP_SIZE: usize = 16 * 1024 * 1024 * 1024;

/// Image records keyed by id, bincode-encoded. Scans run in key order.
pub struct LmdbDocumentStore {
    env: Arc<Env>,
    records_db: Database<Str, Bytes>,
}

impl LmdbDocumentStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_map_size(path, DEFAULT_MAP_SIZE)
    }

    pub fn open_with_map_size<P: AsRef<Path>>(path: P, map_size: usize) -> Result<Self> {
        std::fs::create_dir_all(&path)?;

        let env = Arc::new(unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(4)
                .open(path.as_ref())?
        });

        let mut wtxn = env.write_txn()?;
        let records_db = env.create_database(&mut wtxn, Some(DB_RECORDS))?;
        wtxn.commit()?;

        tracing::info!(path = %path.as_ref().display(), "Opened LMDB record store");
        Ok(Self { env, records_db })
    }

    pub fn put_record(&self, record: &VerifiedRecord) -> Result<()> {
        let data = bincode::serialize(record)?;
        let mut wtxn = self.env.write_txn()?;
        self.records_db.put(&mut wtxn, &record.id, &data)?;
        wtxn.commit()?;
        Ok(())
    }

    /// Write a batch in one transaction
    pub fn put_records(&self, records: &[VerifiedRecord]) -> Result<()> {
        let mut wtxn = self.env.write_txn()?;
        for record in records {
            let data = bincode::serialize(record)?;
            self.records_db.put(&mut wtxn, &record.id, &data)?;
        }
        wtxn.commit()?;
        Ok(())
    }

    pub fn get_record(&self, id: &str) -> Result<Option<VerifiedRecord>> {
        let rtxn = self.env.read_txn()?;
        match self.records_db.get(&rtxn, id)? {
            Some(data) => Ok(Some(bincode::deserialize(data)?)),
            None => Ok(None),
        }
    }

    pub fn delete_record(&self, id: &str) -> Result<bool> {
        let mut wtxn = self.env.write_txn()?;
        let existed = self.records_db.delete(&mut wtxn, id)?;
        wtxn.commit()?;
        Ok(existed)
    }

    pub fn count(&self) -> Result<u64> {
        let rtxn = self.env.read_txn()?;
        Ok(self.records_db.len(&rtxn)?)
    }

    fn scan(&self) -> Result<Vec<VerifiedRecord>> {
        let rtxn = self.env.read_txn()?;
        let mut records = Vec::new();
        for result in self.records_db.iter(&rtxn)? {
            let (_, data) = result?;
            let record: VerifiedRecord = bincode::deserialize(data)?;
            if record.is_verified() {
                records.push(record);
            }
        }
        Ok(records)
    }
}

fn store_error(e: anyhow::Error) -> Error {
    Error::Store(e.to_string())
}

impl DocumentStore for LmdbDocumentStore {
    fn verified_records(&self) -> facelabel_core::Result<Vec<VerifiedRecord>> {
        self.scan().map_err(store_error)
    }

    fn find_by_id(&self, id: &str) -> facelabel_core::Result<Option<VerifiedRecord>> {
        self.get_record(id).map_err(store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open() -> (TempDir, LmdbDocumentStore) {
        let dir = TempDir::new().unwrap();
        let store = LmdbDocumentStore::open_with_map_size(dir.path(), 16 * 1024 * 1024).unwrap();
        (dir, store)
    }

    #[test]
    fn test_put_get_delete() {
        let (_dir, store) = open();
        let record = VerifiedRecord::new("img-1", vec![0.25, -1.0, 3.5])
            .with_verified(["20-29", "Female"])
            .with_incorrect(["Male"]);

        store.put_record(&record).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.get_record("img-1").unwrap(), Some(record));

        assert!(store.delete_record("img-1").unwrap());
        assert!(!store.delete_record("img-1").unwrap());
        assert_eq!(store.get_record("img-1").unwrap(), None);
    }

    #[test]
    fn test_scan_skips_pending_in_key_order() {
        let (_dir, store) = open();
        store
            .put_records(&[
                VerifiedRecord::new("c", vec![3.0]),
                VerifiedRecord::new("a", vec![1.0]),
                VerifiedRecord::new("b", vec![2.0]).pending(),
            ])
            .unwrap();

        let ids: Vec<_> = store
            .verified_records()
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_find_by_embedding_default() {
        let (_dir, store) = open();
        store.put_record(&VerifiedRecord::new("a", vec![0.1, 0.2])).unwrap();
        store.put_record(&VerifiedRecord::new("b", vec![0.1, 0.3])).unwrap();

        let hits = store.find_by_embedding(&[0.1, 0.2]).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
    }

    #[test]
    fn test_reopen_keeps_records() {
        let dir = TempDir::new().unwrap();
        {
            let store = LmdbDocumentStore::open_with_map_size(dir.path(), 16 * 1024 * 1024).unwrap();
            store.put_record(&VerifiedRecord::new("kept", vec![1.0, 2.0])).unwrap();
        }
        let store = LmdbDocumentStore::open_with_map_size(dir.path(), 16 * 1024 * 1024).unwrap();
        assert!(store.find_by_id("kept").unwrap().is_some());
    }
}
