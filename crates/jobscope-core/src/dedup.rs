//! Link-keyed uniqueness gate in front of the posting store.
//!
//! A posting is accepted only if its canonical link was not accepted earlier
//! in this run and the store does not already hold it. The store check runs
//! before every acceptance, one link at a time, so a check-then-insert never
//! interleaves with another acceptance of the same link.

use std::collections::HashSet;

use crate::error::AppError;
use crate::models::NormalizedPosting;
use crate::traits::PostingStore;

/// Why a posting was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateReason {
    /// Accepted earlier in this run (same or previous batch).
    SeenInRun,
    /// Already present in storage.
    AlreadyStored,
}

impl DuplicateReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateReason::SeenInRun => "seen in this run",
            DuplicateReason::AlreadyStored => "already stored",
        }
    }
}

/// A rejected posting's link and why it was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPosting {
    pub link: String,
    pub reason: DuplicateReason,
}

/// Outcome of filtering one batch.
#[derive(Debug, Default)]
pub struct BatchVerdict {
    /// Postings to persist, in input order.
    pub accepted: Vec<NormalizedPosting>,
    /// Rejected postings, in input order.
    pub skipped: Vec<SkippedPosting>,
    /// Set when the store became unreachable while checking this batch.
    /// Postings from that point on were judged against this run only.
    pub storage_failure: Option<AppError>,
}

impl BatchVerdict {
    pub fn duplicates(&self) -> usize {
        self.skipped.len()
    }
}

pub struct Deduplicator<S: PostingStore> {
    store: S,
    seen: HashSet<String>,
    store_attached: bool,
}

impl<S: PostingStore> Deduplicator<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            seen: HashSet::new(),
            store_attached: true,
        }
    }

    /// Accept or reject one posting.
    ///
    /// Rejections are not errors. The only error is a failing store lookup,
    /// in which case nothing is recorded.
    pub async fn accept(&mut self, posting: &NormalizedPosting) -> Result<bool, AppError> {
        Ok(self.judge(&posting.link).await?.is_none())
    }

    /// `None` accepts the link and records it; `Some` carries the rejection.
    async fn judge(&mut self, link: &str) -> Result<Option<DuplicateReason>, AppError> {
        let reason = self.check(link).await?;
        if reason.is_none() {
            self.seen.insert(link.to_string());
        }
        Ok(reason)
    }

    async fn check(&mut self, link: &str) -> Result<Option<DuplicateReason>, AppError> {
        if self.seen.contains(link) {
            return Ok(Some(DuplicateReason::SeenInRun));
        }
        if self.store_attached && self.store.exists(link).await? {
            // Remember it so later pages do not query the store again.
            self.seen.insert(link.to_string());
            return Ok(Some(DuplicateReason::AlreadyStored));
        }
        Ok(None)
    }

    /// Filter a batch, keeping the first posting per link in iteration order.
    ///
    /// If the store becomes unavailable mid-batch, the store is detached and
    /// the rest of the batch is deduplicated against this run only; the
    /// failure is returned in the verdict. Other store errors propagate.
    pub async fn filter_batch(
        &mut self,
        postings: Vec<NormalizedPosting>,
    ) -> Result<BatchVerdict, AppError> {
        let mut verdict = BatchVerdict::default();

        for posting in postings {
            let rejected = match self.judge(&posting.link).await {
                Ok(rejected) => rejected,
                Err(e) if e.halts_persistence() => {
                    tracing::warn!(error = %e, "Store unreachable, deduplicating in memory only");
                    self.detach_store();
                    verdict.storage_failure = Some(e);
                    self.judge(&posting.link).await?
                }
                Err(e) => return Err(e),
            };

            match rejected {
                None => verdict.accepted.push(posting),
                Some(reason) => verdict.skipped.push(SkippedPosting {
                    link: posting.link,
                    reason,
                }),
            }
        }

        Ok(verdict)
    }

    /// Stop consulting the store; later decisions use this run's links only.
    pub fn detach_store(&mut self) {
        self.store_attached = false;
    }

    pub fn is_store_attached(&self) -> bool {
        self.store_attached
    }

    /// Number of distinct links decided on so far.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;

    #[tokio::test]
    async fn accepts_new_link_once() {
        let mut dedup = Deduplicator::new(MockStore::empty());
        let posting = make_posting("https://x/1");

        assert!(dedup.accept(&posting).await.unwrap());
        assert!(!dedup.accept(&posting).await.unwrap());
        assert_eq!(dedup.seen_count(), 1);
    }

    #[tokio::test]
    async fn rejects_link_already_in_store() {
        let store = MockStore::with_links(&["https://x/1"]);
        let mut dedup = Deduplicator::new(store.clone());

        assert!(!dedup.accept(&make_posting("https://x/1")).await.unwrap());
        assert!(dedup.accept(&make_posting("https://x/2")).await.unwrap());
        assert_eq!(store.exists_calls(), 2);
    }

    #[tokio::test]
    async fn stored_duplicate_is_not_queried_twice() {
        let store = MockStore::with_links(&["https://x/1"]);
        let mut dedup = Deduplicator::new(store.clone());

        dedup.accept(&make_posting("https://x/1")).await.unwrap();
        dedup.accept(&make_posting("https://x/1")).await.unwrap();

        assert_eq!(store.exists_calls(), 1);
    }

    #[tokio::test]
    async fn batch_keeps_first_of_each_link() {
        let mut dedup = Deduplicator::new(MockStore::empty());
        let mut first = make_posting("https://x/1");
        first.title = "first".into();
        let mut second = make_posting("https://x/1");
        second.title = "second".into();

        let verdict = dedup
            .filter_batch(vec![first, make_posting("https://x/2"), second])
            .await
            .unwrap();

        assert_eq!(verdict.accepted.len(), 2);
        assert_eq!(verdict.accepted[0].title, "first");
        assert_eq!(verdict.duplicates(), 1);
        assert!(verdict.storage_failure.is_none());
    }

    #[tokio::test]
    async fn batch_reports_each_skipped_link_with_reason() {
        let store = MockStore::with_links(&["https://x/old"]);
        let mut dedup = Deduplicator::new(store);

        let verdict = dedup
            .filter_batch(vec![
                make_posting("https://x/1"),
                make_posting("https://x/old"),
                make_posting("https://x/1"),
            ])
            .await
            .unwrap();

        assert_eq!(verdict.accepted.len(), 1);
        assert_eq!(
            verdict.skipped,
            vec![
                SkippedPosting {
                    link: "https://x/old".into(),
                    reason: DuplicateReason::AlreadyStored,
                },
                SkippedPosting {
                    link: "https://x/1".into(),
                    reason: DuplicateReason::SeenInRun,
                },
            ]
        );
    }

    #[tokio::test]
    async fn storage_outage_falls_back_to_in_run_dedup() {
        let store =
            MockStore::with_exists_error(AppError::StorageUnavailable("connection refused".into()));
        let mut dedup = Deduplicator::new(store);

        let verdict = dedup
            .filter_batch(vec![
                make_posting("https://x/1"),
                make_posting("https://x/1"),
                make_posting("https://x/2"),
            ])
            .await
            .unwrap();

        assert_eq!(verdict.accepted.len(), 2);
        assert_eq!(verdict.duplicates(), 1);
        assert!(matches!(
            verdict.storage_failure,
            Some(AppError::StorageUnavailable(_))
        ));
        assert!(!dedup.is_store_attached());
    }

    #[tokio::test]
    async fn other_store_errors_propagate() {
        let store = MockStore::with_exists_error(AppError::DatabaseError("bad query".into()));
        let mut dedup = Deduplicator::new(store);

        let err = dedup
            .filter_batch(vec![make_posting("https://x/1")])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::DatabaseError(_)));
        assert_eq!(dedup.seen_count(), 0);
    }
}
