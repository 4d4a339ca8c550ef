use jobscope_core::AppError;
use jobscope_core::analyzer::SkillAnalyzer;
use jobscope_core::config::{PipelineConfig, default_keywords};
use jobscope_core::models::{NormalizedPosting, SkillCategory};
use jobscope_core::pipeline::{CrawlPipeline, analyze_corpus};
use jobscope_core::testutil::{MockPageSource, make_page, make_posting};
use jobscope_core::traits::{CorpusReader, NullReport, PostingStore};
use jobscope_db::{Database, PostingRepository};

use crate::integration::common::setup_test_db;

#[tokio::test]
async fn insert_then_exists() {
    let (pool, _container) = setup_test_db().await;
    let repo = PostingRepository::new(pool);

    assert!(!repo.exists("https://x/1").await.unwrap());

    let inserted = repo.insert_batch(&[make_posting("https://x/1")]).await.unwrap();

    assert_eq!(inserted, 1);
    assert!(repo.exists("https://x/1").await.unwrap());
    assert!(!repo.exists("https://x/2").await.unwrap());
}

#[tokio::test]
async fn conflicting_links_are_skipped() {
    let (pool, _container) = setup_test_db().await;
    let repo = PostingRepository::new(pool);

    repo.insert_batch(&[make_posting("https://x/1")]).await.unwrap();
    let inserted = repo
        .insert_batch(&[
            make_posting("https://x/1"),
            make_posting("https://x/2"),
            make_posting("https://x/2"),
        ])
        .await
        .unwrap();

    assert_eq!(inserted, 1);
    assert_eq!(repo.count().await.unwrap(), 2);
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
    let (pool, _container) = setup_test_db().await;
    let repo = PostingRepository::new(pool);

    assert_eq!(repo.insert_batch(&[]).await.unwrap(), 0);
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn find_all_returns_stored_fields() {
    let (pool, _container) = setup_test_db().await;
    let repo = PostingRepository::new(pool);

    let posting = NormalizedPosting {
        title: "Python Developer".into(),
        company: "Tech Corp Co.".into(),
        description: "python sql needed".into(),
        link: "https://x/1".into(),
    };
    repo.insert_batch(std::slice::from_ref(&posting)).await.unwrap();

    let all = repo.find_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, posting.title);
    assert_eq!(all[0].company, posting.company);
    assert_eq!(all[0].description, posting.description);
    assert_eq!(all[0].link, posting.link);
    assert!(!all[0].id.is_nil());
}

#[tokio::test]
async fn list_recent_respects_limit() {
    let (pool, _container) = setup_test_db().await;
    let repo = PostingRepository::new(pool);

    for i in 0..5 {
        repo.insert_batch(&[make_posting(&format!("https://x/{i}"))])
            .await
            .unwrap();
    }

    let recent = repo.list_recent(3).await.unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].link, "https://x/4");
}

#[tokio::test]
async fn closed_pool_reports_storage_unavailable() {
    let (pool, _container) = setup_test_db().await;
    let repo = PostingRepository::new(pool.clone());
    pool.close().await;

    let err = repo.exists("https://x/1").await.unwrap_err();
    assert!(matches!(err, AppError::StorageUnavailable(_)));
    assert!(repo.health_check().await.is_err());
}

#[tokio::test]
async fn crawl_and_analyze_against_postgres() {
    let (pool, _container) = setup_test_db().await;
    let db = Database::from_pool(pool);
    let repo = db.posting_repo();
    repo.health_check().await.unwrap();

    let source = MockPageSource::with_pages(vec![
        make_page("https://jobs.test/p1", &["/job/1", "/job/2"], Some("/p2")),
        make_page("https://jobs.test/p2", &["/job/2", "/job/3"], None),
    ]);

    let summary = CrawlPipeline::new(source.clone(), repo.clone(), &PipelineConfig::default())
        .run("https://jobs.test/p1")
        .await
        .unwrap();
    assert_eq!(summary.inserted, 3);
    assert_eq!(summary.duplicates, 1);

    // A second run over the same pages finds everything already stored.
    let rerun = CrawlPipeline::new(source, repo.clone(), &PipelineConfig::default())
        .run("https://jobs.test/p1")
        .await
        .unwrap();
    assert_eq!(rerun.inserted, 0);
    assert_eq!(repo.count().await.unwrap(), 3);

    let analyzer = SkillAnalyzer::new(&default_keywords()).unwrap();
    let counts = analyze_corpus(&repo, &analyzer, &mut NullReport).await.unwrap();
    assert_eq!(counts.skill("python"), 3);
    assert_eq!(counts.skill("sql"), 3);
    assert_eq!(counts.category(SkillCategory::Technical), 6);
    assert_eq!(counts.category(SkillCategory::Soft), 0);
}
