use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::cleaner::{CleanerChain, DEFAULT_STOPWORDS, StageKind};
use crate::error::AppError;
use crate::models::{SkillCategory, SkillKeyword};

/// Built-in skill set used when no keyword file is given.
pub fn default_keywords() -> Vec<SkillKeyword> {
    vec![
        SkillKeyword::new("python", &["python3", "py"], SkillCategory::Technical),
        SkillKeyword::new("sql", &["postgres", "mysql"], SkillCategory::Technical),
        SkillKeyword::new("javascript", &["js", "node"], SkillCategory::Technical),
        SkillKeyword::new("docker", &["containers"], SkillCategory::Technical),
        SkillKeyword::new("communication", &["teamwork", "iletişim"], SkillCategory::Soft),
        SkillKeyword::new("problem solving", &["critical thinking"], SkillCategory::Soft),
    ]
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeywordFile {
    List(Vec<SkillKeyword>),
    Wrapped { keywords: Vec<SkillKeyword> },
}

/// Load a keyword file: either a JSON array of keywords or `{"keywords": [...]}`.
///
/// ```json
/// [{"name": "rust", "synonyms": ["cargo"], "category": "technical"}]
/// ```
pub fn load_keywords(path: &Path) -> Result<Vec<SkillKeyword>, AppError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AppError::ConfigError(format!("cannot read keyword file {}: {e}", path.display()))
    })?;
    let keywords = match serde_json::from_str::<KeywordFile>(&raw)? {
        KeywordFile::List(keywords) | KeywordFile::Wrapped { keywords } => keywords,
    };
    if keywords.is_empty() {
        return Err(AppError::ConfigError(format!(
            "keyword file {} defines no skills",
            path.display()
        )));
    }
    Ok(keywords)
}

/// Which cleaning stages run, in order, and the stopword set they use.
#[derive(Debug, Clone)]
pub struct CleaningConfig {
    pub stages: Vec<StageKind>,
    pub stopwords: Vec<String>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            stages: StageKind::storage_default(),
            stopwords: DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CleaningConfig {
    pub fn with_stages(mut self, stages: Vec<StageKind>) -> Self {
        self.stages = stages;
        self
    }

    pub fn with_stopwords<I, S>(mut self, stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stopwords = stopwords.into_iter().map(Into::into).collect();
        self
    }

    pub fn build_chain(&self) -> CleanerChain {
        CleanerChain::from_kinds(&self.stages, &self.stopwords)
    }
}

/// Limits and pacing for one crawl.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Stop after this many pages even if more are referenced.
    pub max_pages: Option<usize>,
    /// Pause between consecutive page fetches.
    pub page_delay: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: None,
            page_delay: Duration::ZERO,
        }
    }
}

impl CrawlConfig {
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }
}

/// Everything the pipeline needs, built once at startup and passed in.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub cleaning: CleaningConfig,
    pub crawl: CrawlConfig,
    pub keywords: Vec<SkillKeyword>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cleaning: CleaningConfig::default(),
            crawl: CrawlConfig::default(),
            keywords: default_keywords(),
        }
    }
}

impl PipelineConfig {
    pub fn with_cleaning(mut self, cleaning: CleaningConfig) -> Self {
        self.cleaning = cleaning;
        self
    }

    pub fn with_crawl(mut self, crawl: CrawlConfig) -> Self {
        self.crawl = crawl;
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<SkillKeyword>) -> Self {
        self.keywords = keywords;
        self
    }

    /// Replace the built-in keywords with those in `path`, if given.
    pub fn with_keyword_file(self, path: Option<&Path>) -> Result<Self, AppError> {
        match path {
            Some(path) => Ok(self.with_keywords(load_keywords(path)?)),
            None => Ok(self),
        }
    }
}
