//! Crawl orchestration: page source → normalizer → deduplicator → store.

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::analyzer::SkillAnalyzer;
use crate::config::{CrawlConfig, PipelineConfig};
use crate::dedup::{Deduplicator, DuplicateReason};
use crate::error::AppError;
use crate::models::{ListingPage, NormalizedPosting, SkillCount};
use crate::normalizer::Normalizer;
use crate::traits::{CorpusReader, PageSource, PostingStore, ReportSink};

/// Events emitted while crawling, for monitoring/logging.
#[derive(Debug)]
pub enum PipelineEvent<'a> {
    CrawlStarted {
        start_url: &'a str,
    },
    PageFetched {
        page: usize,
        url: &'a str,
        postings: usize,
    },
    RecordDropped {
        page: usize,
        error: &'a AppError,
    },
    DuplicateSkipped {
        page: usize,
        link: &'a str,
        reason: DuplicateReason,
    },
    BatchStored {
        page: usize,
        accepted: usize,
        inserted: u64,
        duplicates: usize,
    },
    PersistenceHalted {
        page: usize,
        error: &'a AppError,
        unpersisted: usize,
    },
    PageLimitReached {
        max_pages: usize,
    },
    PageRevisited {
        url: &'a str,
    },
    Cancelled {
        pages: usize,
    },
    CrawlFinished {
        summary: &'a CrawlSummary,
    },
}

/// Trait for receiving pipeline events (decoupled logging).
pub trait PipelineReporter: Send + Sync {
    fn report(&self, event: PipelineEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPipelineReporter;

impl PipelineReporter for TracingPipelineReporter {
    fn report(&self, event: PipelineEvent<'_>) {
        match event {
            PipelineEvent::CrawlStarted { start_url } => {
                tracing::info!(%start_url, "Crawl started");
            }
            PipelineEvent::PageFetched {
                page,
                url,
                postings,
            } => {
                tracing::info!(page, %url, postings, "Page fetched");
            }
            PipelineEvent::RecordDropped { page, error } => {
                tracing::warn!(page, %error, "Record dropped");
            }
            PipelineEvent::DuplicateSkipped { page, link, reason } => {
                tracing::info!(page, %link, reason = reason.as_str(), "Duplicate skipped");
            }
            PipelineEvent::BatchStored {
                page,
                accepted,
                inserted,
                duplicates,
            } => {
                tracing::info!(page, accepted, inserted, duplicates, "Batch stored");
            }
            PipelineEvent::PersistenceHalted {
                page,
                error,
                unpersisted,
            } => {
                tracing::error!(page, %error, unpersisted, "Persistence halted");
            }
            PipelineEvent::PageLimitReached { max_pages } => {
                tracing::info!(max_pages, "Page limit reached");
            }
            PipelineEvent::PageRevisited { url } => {
                tracing::warn!(%url, "Next page already visited, stopping");
            }
            PipelineEvent::Cancelled { pages } => {
                tracing::info!(pages, "Crawl cancelled");
            }
            PipelineEvent::CrawlFinished { summary } => {
                tracing::info!(
                    pages = summary.pages,
                    inserted = summary.inserted,
                    duplicates = summary.duplicates,
                    malformed = summary.malformed,
                    "Crawl finished"
                );
            }
        }
    }
}

/// Totals for one crawl.
#[derive(Debug, Default)]
pub struct CrawlSummary {
    pub pages: usize,
    pub raw_postings: usize,
    pub malformed: usize,
    pub duplicates: usize,
    pub accepted: usize,
    pub inserted: u64,
    /// Accepted postings that could not be written because storage went away.
    pub unpersisted: Vec<NormalizedPosting>,
    pub storage_failure: Option<String>,
    pub cancelled: bool,
}

impl CrawlSummary {
    pub fn persistence_halted(&self) -> bool {
        self.storage_failure.is_some()
    }
}

/// Drives a [`PageSource`] through normalization and deduplication into a
/// [`PostingStore`], one batch per page.
pub struct CrawlPipeline<P, S, R = TracingPipelineReporter>
where
    P: PageSource,
    S: PostingStore,
    R: PipelineReporter,
{
    source: P,
    store: S,
    normalizer: Normalizer,
    dedup: Deduplicator<S>,
    crawl: CrawlConfig,
    reporter: R,
    cancel: CancellationToken,
}

impl<P, S> CrawlPipeline<P, S, TracingPipelineReporter>
where
    P: PageSource,
    S: PostingStore,
{
    pub fn new(source: P, store: S, config: &PipelineConfig) -> Self {
        Self {
            source,
            dedup: Deduplicator::new(store.clone()),
            store,
            normalizer: Normalizer::new(config.cleaning.build_chain()),
            crawl: config.crawl.clone(),
            reporter: TracingPipelineReporter,
            cancel: CancellationToken::new(),
        }
    }
}

impl<P, S, R> CrawlPipeline<P, S, R>
where
    P: PageSource,
    S: PostingStore,
    R: PipelineReporter,
{
    pub fn with_reporter<R2: PipelineReporter>(self, reporter: R2) -> CrawlPipeline<P, S, R2> {
        CrawlPipeline {
            source: self.source,
            store: self.store,
            normalizer: self.normalizer,
            dedup: self.dedup,
            crawl: self.crawl,
            reporter,
            cancel: self.cancel,
        }
    }

    /// Stop between pages once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Crawl from `start_url` until a page has no next reference.
    ///
    /// Also stops on the page limit, on a next reference that was already
    /// visited, on cancellation, and once storage becomes unavailable. A
    /// fetch error or a non-outage store error ends the crawl with `Err`.
    pub async fn run(&mut self, start_url: &str) -> Result<CrawlSummary, AppError> {
        self.reporter.report(PipelineEvent::CrawlStarted { start_url });

        let mut summary = CrawlSummary::default();
        let mut visited = HashSet::new();
        let mut next = Some(page_key(start_url));

        while let Some(url) = next.take() {
            if summary.pages > 0 && !self.crawl.page_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.crawl.page_delay) => {}
                    _ = self.cancel.cancelled() => {}
                }
            }
            if self.cancel.is_cancelled() {
                summary.cancelled = true;
                self.reporter.report(PipelineEvent::Cancelled {
                    pages: summary.pages,
                });
                break;
            }
            if let Some(max_pages) = self.crawl.max_pages {
                if summary.pages >= max_pages {
                    self.reporter
                        .report(PipelineEvent::PageLimitReached { max_pages });
                    break;
                }
            }
            if !visited.insert(url.clone()) {
                self.reporter.report(PipelineEvent::PageRevisited { url: &url });
                break;
            }

            let page = self.source.fetch_page(&url).await?;
            summary.pages += 1;
            self.reporter.report(PipelineEvent::PageFetched {
                page: summary.pages,
                url: &url,
                postings: page.postings.len(),
            });

            next = next_page_url(&page, &url);
            self.process_page(page, &url, &mut summary).await?;

            if summary.persistence_halted() {
                break;
            }
        }

        self.reporter
            .report(PipelineEvent::CrawlFinished { summary: &summary });
        Ok(summary)
    }

    async fn process_page(
        &mut self,
        page: ListingPage,
        fetched_from: &str,
        summary: &mut CrawlSummary,
    ) -> Result<(), AppError> {
        let page_no = summary.pages;
        let base = Url::parse(&page.url)
            .or_else(|_| Url::parse(fetched_from))
            .ok();

        summary.raw_postings += page.postings.len();
        let mut normalized = Vec::with_capacity(page.postings.len());
        for raw in &page.postings {
            match self.normalizer.normalize(raw, base.as_ref()) {
                Ok(posting) => normalized.push(posting),
                Err(error) => {
                    summary.malformed += 1;
                    self.reporter.report(PipelineEvent::RecordDropped {
                        page: page_no,
                        error: &error,
                    });
                }
            }
        }

        let verdict = self.dedup.filter_batch(normalized).await?;
        for skipped in &verdict.skipped {
            self.reporter.report(PipelineEvent::DuplicateSkipped {
                page: page_no,
                link: &skipped.link,
                reason: skipped.reason,
            });
        }
        summary.duplicates += verdict.duplicates();
        summary.accepted += verdict.accepted.len();

        if let Some(error) = verdict.storage_failure {
            self.halt(page_no, error, verdict.accepted, summary);
            return Ok(());
        }

        let inserted = if verdict.accepted.is_empty() {
            0
        } else {
            let result = self.store.insert_batch(&verdict.accepted).await;
            match result {
                Ok(inserted) => inserted,
                Err(error) if error.halts_persistence() => {
                    self.dedup.detach_store();
                    self.halt(page_no, error, verdict.accepted, summary);
                    return Ok(());
                }
                Err(error) => return Err(error),
            }
        };

        summary.inserted += inserted;
        self.reporter.report(PipelineEvent::BatchStored {
            page: page_no,
            accepted: verdict.accepted.len(),
            inserted,
            duplicates: verdict.duplicates(),
        });
        Ok(())
    }

    fn halt(
        &self,
        page: usize,
        error: AppError,
        accepted: Vec<NormalizedPosting>,
        summary: &mut CrawlSummary,
    ) {
        self.reporter.report(PipelineEvent::PersistenceHalted {
            page,
            error: &error,
            unpersisted: accepted.len(),
        });
        summary.storage_failure = Some(error.to_string());
        summary.unpersisted.extend(accepted);
    }
}

/// Form under which a page URL is fetched and remembered as visited: parsed,
/// without fragment. Unparseable input is kept as given for the source to
/// reject.
fn page_key(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.into()
        }
        Err(_) => url.to_string(),
    }
}

/// Resolve a page's next reference against the page URL.
fn next_page_url(page: &ListingPage, fetched_from: &str) -> Option<String> {
    let reference = page.next_page.as_deref()?.trim();
    if reference.is_empty() {
        return None;
    }
    let base = Url::parse(&page.url).or_else(|_| Url::parse(fetched_from));
    match base.and_then(|base| base.join(reference)) {
        Ok(mut url) => {
            url.set_fragment(None);
            Some(url.into())
        }
        Err(e) => {
            tracing::warn!(next = %reference, error = %e, "Unusable next page reference");
            None
        }
    }
}

/// Analyze the full stored corpus and hand the result to `sink`.
pub async fn analyze_corpus<C, K>(
    reader: &C,
    analyzer: &SkillAnalyzer,
    sink: &mut K,
) -> Result<SkillCount, AppError>
where
    C: CorpusReader,
    K: ReportSink + ?Sized,
{
    let corpus = reader.find_all().await?;
    tracing::info!(postings = corpus.len(), "Analyzing stored corpus");
    let counts = analyzer.count_skills(&corpus);
    sink.report(&counts)?;
    Ok(counts)
}
