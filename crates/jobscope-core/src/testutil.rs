//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::models::{ListingPage, NormalizedPosting, RawPosting, StoredPosting};
use crate::pipeline::{PipelineEvent, PipelineReporter};
use crate::traits::{CorpusReader, Fetcher, PageSource, PostingStore};

/// A normalized posting with fixed text and the given link.
pub fn make_posting(link: &str) -> NormalizedPosting {
    NormalizedPosting {
        title: "Rust Developer".to_string(),
        company: "Acme".to_string(),
        description: "rust sql docker".to_string(),
        link: link.to_string(),
    }
}

/// A listing page at `url` with one raw posting per link.
pub fn make_page(url: &str, links: &[&str], next_page: Option<&str>) -> ListingPage {
    ListingPage {
        url: url.to_string(),
        postings: links
            .iter()
            .map(|link| RawPosting::new("Backend Developer", "Acme", "python and sql", *link))
            .collect(),
        next_page: next_page.map(str::to_string),
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that serves queued responses and records requested URLs.
#[derive(Clone)]
pub struct MockFetcher {
    /// Each call pops the first element. If empty, returns an empty page.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    urls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self::with_responses(vec![Ok(html.to_string())])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            urls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requested(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.urls.lock().unwrap().push(url.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("<html><body></body></html>".to_string())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockPageSource
// ---------------------------------------------------------------------------

/// Serves pre-built listing pages keyed by their URL.
#[derive(Clone)]
pub struct MockPageSource {
    pages: Arc<HashMap<String, ListingPage>>,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl MockPageSource {
    pub fn with_pages(pages: Vec<ListingPage>) -> Self {
        Self {
            pages: Arc::new(pages.into_iter().map(|p| (p.url.clone(), p)).collect()),
            fetched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl PageSource for MockPageSource {
    async fn fetch_page(&self, url: &str) -> Result<ListingPage, AppError> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::HttpError(format!("HTTP 404 for {url}")))
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

/// In-memory store with call recording and one-shot error injection.
#[derive(Clone, Default)]
pub struct MockStore {
    links: Arc<Mutex<HashSet<String>>>,
    postings: Arc<Mutex<Vec<StoredPosting>>>,
    batches: Arc<Mutex<Vec<Vec<NormalizedPosting>>>>,
    exists_calls: Arc<Mutex<usize>>,
    exists_error: Arc<Mutex<Option<AppError>>>,
    insert_error: Arc<Mutex<Option<AppError>>>,
}

impl MockStore {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_links(links: &[&str]) -> Self {
        let store = Self::default();
        store
            .links
            .lock()
            .unwrap()
            .extend(links.iter().map(|l| l.to_string()));
        store
    }

    /// The next `exists` call fails with `error`.
    pub fn with_exists_error(error: AppError) -> Self {
        let store = Self::default();
        *store.exists_error.lock().unwrap() = Some(error);
        store
    }

    /// The next `insert_batch` call fails with `error`.
    pub fn with_insert_error(error: AppError) -> Self {
        let store = Self::default();
        *store.insert_error.lock().unwrap() = Some(error);
        store
    }

    pub fn exists_calls(&self) -> usize {
        *self.exists_calls.lock().unwrap()
    }

    /// Batches that were successfully inserted, in call order.
    pub fn batches(&self) -> Vec<Vec<NormalizedPosting>> {
        self.batches.lock().unwrap().clone()
    }
}

impl PostingStore for MockStore {
    async fn exists(&self, link: &str) -> Result<bool, AppError> {
        *self.exists_calls.lock().unwrap() += 1;
        if let Some(error) = self.exists_error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self.links.lock().unwrap().contains(link))
    }

    async fn insert_batch(&self, postings: &[NormalizedPosting]) -> Result<u64, AppError> {
        if let Some(error) = self.insert_error.lock().unwrap().take() {
            return Err(error);
        }
        let mut links = self.links.lock().unwrap();
        let mut stored = self.postings.lock().unwrap();
        let mut inserted = 0;
        for posting in postings {
            if links.insert(posting.link.clone()) {
                stored.push(StoredPosting::from_normalized(posting.clone()));
                inserted += 1;
            }
        }
        self.batches.lock().unwrap().push(postings.to_vec());
        Ok(inserted)
    }
}

impl CorpusReader for MockStore {
    async fn find_all(&self) -> Result<Vec<StoredPosting>, AppError> {
        Ok(self.postings.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// MockPipelineReporter
// ---------------------------------------------------------------------------

/// Records the variant name of every event it receives, and the link of
/// every skipped duplicate.
#[derive(Clone, Default)]
pub struct MockPipelineReporter {
    pub events: Arc<Mutex<Vec<&'static str>>>,
    pub skipped: Arc<Mutex<Vec<String>>>,
}

impl MockPipelineReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PipelineReporter for MockPipelineReporter {
    fn report(&self, event: PipelineEvent<'_>) {
        let name = match event {
            PipelineEvent::CrawlStarted { .. } => "CrawlStarted",
            PipelineEvent::PageFetched { .. } => "PageFetched",
            PipelineEvent::RecordDropped { .. } => "RecordDropped",
            PipelineEvent::DuplicateSkipped { link, .. } => {
                self.skipped.lock().unwrap().push(link.to_string());
                "DuplicateSkipped"
            }
            PipelineEvent::BatchStored { .. } => "BatchStored",
            PipelineEvent::PersistenceHalted { .. } => "PersistenceHalted",
            PipelineEvent::PageLimitReached { .. } => "PageLimitReached",
            PipelineEvent::PageRevisited { .. } => "PageRevisited",
            PipelineEvent::Cancelled { .. } => "Cancelled",
            PipelineEvent::CrawlFinished { .. } => "CrawlFinished",
        };
        self.events.lock().unwrap().push(name);
    }
}
