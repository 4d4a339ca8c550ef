pub mod analyzer;
pub mod cleaner;
pub mod config;
pub mod dedup;
pub mod error;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod store;
pub mod traits;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use analyzer::SkillAnalyzer;
pub use cleaner::{CleanerChain, StageKind};
pub use config::{CleaningConfig, CrawlConfig, PipelineConfig};
pub use dedup::Deduplicator;
pub use error::AppError;
pub use models::{
    ListingPage, NormalizedPosting, RawPosting, SkillCategory, SkillCount, SkillKeyword,
    StoredPosting,
};
pub use normalizer::Normalizer;
pub use pipeline::{CrawlPipeline, CrawlSummary, PipelineReporter, TracingPipelineReporter};
pub use store::MemoryStore;
pub use traits::{CorpusReader, Fetcher, PageSource, PostingStore, ReportSink, TextCleaner};
