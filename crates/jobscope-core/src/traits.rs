use std::future::Future;

use crate::error::AppError;
use crate::models::{ListingPage, NormalizedPosting, SkillCount, StoredPosting};

/// Fetches raw HTML content from a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Produces listing pages, one per call.
///
/// A returned page whose `next_page` is `None` is the last one.
pub trait PageSource: Send + Sync + Clone {
    fn fetch_page(&self, url: &str) -> impl Future<Output = Result<ListingPage, AppError>> + Send;
}

/// A single text transform. Must be total and idempotent.
pub trait TextCleaner: Send + Sync {
    fn clean(&self, text: &str) -> String;

    /// Absent input is treated as the empty string.
    fn clean_opt(&self, text: Option<&str>) -> String {
        self.clean(text.unwrap_or_default())
    }
}

/// Write side of posting storage.
///
/// Implementations must be read-after-write consistent: once `insert_batch`
/// returns, `exists` observes every inserted link.
pub trait PostingStore: Send + Sync + Clone {
    fn exists(&self, link: &str) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Insert all postings or none of them. Links already stored are skipped;
    /// returns how many rows were actually inserted.
    fn insert_batch(
        &self,
        postings: &[NormalizedPosting],
    ) -> impl Future<Output = Result<u64, AppError>> + Send;
}

/// Read side of posting storage, the analyzer's corpus.
pub trait CorpusReader: Send + Sync + Clone {
    fn find_all(&self) -> impl Future<Output = Result<Vec<StoredPosting>, AppError>> + Send;
}

/// Receives a finished skill analysis for display or export.
pub trait ReportSink {
    fn report(&mut self, counts: &SkillCount) -> Result<(), AppError>;
}

/// A ReportSink that discards results.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReport;

impl ReportSink for NullReport {
    fn report(&mut self, _counts: &SkillCount) -> Result<(), AppError> {
        Ok(())
    }
}
