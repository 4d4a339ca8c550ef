use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::AppError;
use crate::models::{NormalizedPosting, StoredPosting};
use crate::traits::{CorpusReader, PostingStore};

#[derive(Default)]
struct Inner {
    links: HashSet<String>,
    postings: Vec<StoredPosting>,
}

/// Process-local posting store.
///
/// Used when no database is configured, and wherever a store is needed
/// without I/O. Clones share the same contents.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, AppError> {
        self.inner
            .lock()
            .map_err(|_| AppError::StorageUnavailable("memory store lock poisoned".into()))
    }

    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.postings.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the stored postings in insertion order.
    pub fn postings(&self) -> Vec<StoredPosting> {
        self.lock()
            .map(|inner| inner.postings.clone())
            .unwrap_or_default()
    }
}

impl PostingStore for MemoryStore {
    async fn exists(&self, link: &str) -> Result<bool, AppError> {
        Ok(self.lock()?.links.contains(link))
    }

    async fn insert_batch(&self, postings: &[NormalizedPosting]) -> Result<u64, AppError> {
        let mut inner = self.lock()?;
        let mut inserted = 0;
        for posting in postings {
            if inner.links.insert(posting.link.clone()) {
                inner
                    .postings
                    .push(StoredPosting::from_normalized(posting.clone()));
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

impl CorpusReader for MemoryStore {
    async fn find_all(&self) -> Result<Vec<StoredPosting>, AppError> {
        Ok(self.lock()?.postings.clone())
    }
}
