//! Persistence seams: the checkpoint blob store and the reporting sink.

use std::collections::HashMap;

use thiserror::Error;

use crate::record::WorkDayRecord;

/// Errors surfaced by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store failed.
    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// A value could not be encoded for storage.
    #[error("failed to encode {key}: {source}")]
    Encode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// A key to opaque blob map with overwrite semantics.
pub trait CheckpointStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError>;
    fn delete(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Accepts finalized work-day records.
pub trait ReportSink {
    fn submit(&mut self, record: &WorkDayRecord) -> Result<(), StoreError>;
}

/// A checkpoint store that also files records.
///
/// `submit_clearing` stores the record and deletes checkpoint `key` as one
/// unit: either both happen or neither does.
pub trait ArchivingStore: CheckpointStore + ReportSink {
    fn submit_clearing(&mut self, record: &WorkDayRecord, key: &str) -> Result<(), StoreError>;
}

/// In-memory checkpoint store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CheckpointStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// In-memory report sink that keeps every submitted record.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub records: Vec<WorkDayRecord>,
}

impl ReportSink for MemorySink {
    fn submit(&mut self, record: &WorkDayRecord) -> Result<(), StoreError> {
        self.records.push(record.clone());
        Ok(())
    }
}

impl<T: CheckpointStore + ?Sized> CheckpointStore for &mut T {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }
}

impl<T: ReportSink + ?Sized> ReportSink for &mut T {
    fn submit(&mut self, record: &WorkDayRecord) -> Result<(), StoreError> {
        (**self).submit(record)
    }
}

impl<T: ArchivingStore + ?Sized> ArchivingStore for &mut T {
    fn submit_clearing(&mut self, record: &WorkDayRecord, key: &str) -> Result<(), StoreError> {
        (**self).submit_clearing(record, key)
    }
}
