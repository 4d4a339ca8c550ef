mod report;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use url::Url;

use jobscope_client::{HtmlListingSource, ReqwestFetcher};
use jobscope_core::analyzer::SkillAnalyzer;
use jobscope_core::cleaner::StageKind;
use jobscope_core::config::{CleaningConfig, CrawlConfig, PipelineConfig};
use jobscope_core::models::RawPosting;
use jobscope_core::normalizer::Normalizer;
use jobscope_core::pipeline::{CrawlPipeline, CrawlSummary, analyze_corpus};
use jobscope_core::store::MemoryStore;
use jobscope_core::traits::{CorpusReader, PostingStore};
use jobscope_db::{Database, DatabaseConfig, PostingRepository};

use crate::report::{ReportFormat, open_sink};

#[derive(Parser)]
#[command(
    name = "jobscope",
    version,
    about = "Job posting crawler and skill keyword analyzer"
)]
struct Cli {
    #[command(flatten)]
    pipeline: PipelineArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PipelineArgs {
    /// JSON keyword file (built-in skill set if omitted)
    #[arg(long, global = true, env = "JOBSCOPE_KEYWORDS")]
    keywords: Option<PathBuf>,

    /// Comma-separated cleaning stages, e.g. "markup,emoji,symbol,stopword"
    #[arg(long, global = true, env = "JOBSCOPE_STAGES")]
    stages: Option<String>,

    /// Comma-separated stopwords replacing the built-in list
    #[arg(long, global = true, env = "JOBSCOPE_STOPWORDS")]
    stopwords: Option<String>,
}

#[derive(Args)]
struct ReportArgs {
    /// Output format for the skill analysis
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Table)]
    format: ReportFormat,

    /// Write the analysis to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl listing pages starting at a URL
    Crawl {
        /// First listing page
        #[arg(short, long)]
        url: String,

        /// Persist postings to PostgreSQL (requires DATABASE_URL)
        #[arg(long, default_value_t = false)]
        save: bool,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<usize>,

        /// Pause between page fetches, in milliseconds
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,

        /// Run the skill analysis over the store after crawling
        #[arg(long, default_value_t = false)]
        analyze: bool,

        #[command(flatten)]
        report: ReportArgs,
    },

    /// Count skill keywords over all stored postings
    Analyze {
        #[command(flatten)]
        report: ReportArgs,
    },

    /// Show stored postings, newest first
    List {
        /// Number of postings to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Normalize a JSON array of raw postings without storing anything
    Clean {
        /// Input file (JSON array of postings)
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli.pipeline)?;

    match cli.command {
        Commands::Crawl {
            url,
            save,
            max_pages,
            delay_ms,
            analyze,
            report,
        } => {
            let mut crawl = CrawlConfig::default().with_page_delay(Duration::from_millis(delay_ms));
            if let Some(max_pages) = max_pages {
                crawl = crawl.with_max_pages(max_pages);
            }
            let config = config.with_crawl(crawl);
            let report = analyze.then_some(report);

            let summary = if save {
                let repo = connect_db().await?;
                cmd_crawl(&url, repo, &config, report.as_ref()).await?
            } else {
                cmd_crawl(&url, MemoryStore::new(), &config, report.as_ref()).await?
            };

            if let Some(reason) = &summary.storage_failure {
                bail!(
                    "storage became unavailable ({reason}); {} postings were not saved",
                    summary.unpersisted.len()
                );
            }
        }
        Commands::Analyze { report } => {
            let repo = connect_db().await?;
            cmd_analyze(&repo, &config, &report).await?;
        }
        Commands::List { limit } => {
            let repo = connect_db().await?;
            cmd_list(&repo, limit).await?;
        }
        Commands::Clean { input } => {
            cmd_clean(&input, &config)?;
        }
    }

    Ok(())
}

fn build_config(args: &PipelineArgs) -> Result<PipelineConfig> {
    let mut cleaning = CleaningConfig::default();
    if let Some(stages) = &args.stages {
        let stages = StageKind::parse_list(stages)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Invalid --stages")?;
        cleaning = cleaning.with_stages(stages);
    }
    if let Some(stopwords) = &args.stopwords {
        cleaning = cleaning.with_stopwords(
            stopwords
                .split(',')
                .map(str::trim)
                .filter(|w| !w.is_empty()),
        );
    }

    let config = PipelineConfig::default()
        .with_cleaning(cleaning)
        .with_keyword_file(args.keywords.as_deref())
        .context("Failed to load keyword file")?;

    // Fail on a bad keyword set before any page is fetched.
    SkillAnalyzer::new(&config.keywords).context("Invalid keyword configuration")?;

    Ok(config)
}

/// Connect to PostgreSQL using DATABASE_URL and apply migrations.
async fn connect_db() -> Result<PostingRepository> {
    let config = DatabaseConfig::from_env()?;
    let db = Database::connect(&config)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await?;
    Ok(db.posting_repo())
}

async fn cmd_crawl<S>(
    url: &str,
    store: S,
    config: &PipelineConfig,
    report: Option<&ReportArgs>,
) -> Result<CrawlSummary>
where
    S: PostingStore + CorpusReader,
{
    Url::parse(url).with_context(|| format!("Invalid start URL: {url}"))?;

    let fetcher = ReqwestFetcher::new().context("Failed to create HTTP client")?;
    let source = HtmlListingSource::new(fetcher);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping after the current page");
            ctrl_c.cancel();
        }
    });

    let summary = CrawlPipeline::new(source, store.clone(), config)
        .with_cancellation(cancel)
        .run(url)
        .await?;

    println!(
        "Crawled {} pages: {} postings, {} new, {} duplicates, {} malformed",
        summary.pages,
        summary.raw_postings,
        summary.inserted,
        summary.duplicates,
        summary.malformed
    );

    if let Some(report) = report {
        if summary.persistence_halted() {
            tracing::warn!("Skipping analysis, storage is unavailable");
        } else {
            cmd_analyze(&store, config, report).await?;
        }
    }

    Ok(summary)
}

async fn cmd_analyze<C: CorpusReader>(
    reader: &C,
    config: &PipelineConfig,
    report: &ReportArgs,
) -> Result<()> {
    let analyzer = SkillAnalyzer::new(&config.keywords)?;
    let mut sink = open_sink(report.format, report.output.as_deref())
        .context("Failed to open report output")?;
    analyze_corpus(reader, &analyzer, sink.as_mut()).await?;
    Ok(())
}

async fn cmd_list(repo: &PostingRepository, limit: usize) -> Result<()> {
    let postings = repo.list_recent(limit).await?;

    if postings.is_empty() {
        println!("No postings stored yet");
        return Ok(());
    }

    for posting in &postings {
        println!(
            "[{}] {} | {}",
            posting.scraped_at.format("%Y-%m-%d %H:%M"),
            posting.title,
            posting.company
        );
        println!("    {}", truncate(&posting.description, 100));
        println!("    {}", posting.link);
    }

    println!("\nShowing {} of {} postings", postings.len(), repo.count().await?);

    Ok(())
}

fn cmd_clean(input: &Path, config: &PipelineConfig) -> Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let postings: Vec<RawPosting> =
        serde_json::from_str(&raw).context("Input must be a JSON array of postings")?;

    let normalizer = Normalizer::new(config.cleaning.build_chain());
    let mut cleaned = Vec::with_capacity(postings.len());
    for posting in &postings {
        match normalizer.normalize(posting, None) {
            Ok(posting) => cleaned.push(posting),
            Err(e) => tracing::warn!(error = %e, "Skipping posting"),
        }
    }

    tracing::info!(
        input = postings.len(),
        cleaned = cleaned.len(),
        "Normalization complete"
    );
    println!("{}", serde_json::to_string_pretty(&cleaned)?);

    Ok(())
}

/// Cut `text` to at most `max` characters, marking the cut with `...`.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
