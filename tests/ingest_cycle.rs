//! End-to-end ingestion cycles: real HTTP fetches against wiremock, real
//! parsing and normalization, and an in-memory store double behind the
//! public `IngestStore` trait. No Postgres instance is required.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use newswire::domain::{Article, ArticleFilters, Category, Feed, FeedFilters, Provider};
use newswire::feed::{Crawler, HttpFetcher};
use newswire::service::IngestService;
use newswire::storage::{ArticleRecord, FeedRecord, IngestSession, IngestStore, StoreError, TxWork};

// ============================================================================
// In-memory store double
// ============================================================================

#[derive(Debug, Clone)]
struct FeedMeta {
    id: Uuid,
    category: Category,
    provider: Provider,
}

#[derive(Debug, Clone, Default)]
struct MemState {
    feeds: HashMap<String, FeedMeta>,        // feed_link -> meta
    articles: HashMap<String, (Uuid, Uuid)>, // guid -> (id, feed_id)
}

/// Upsert-by-natural-key store with snapshot/commit transaction semantics.
#[derive(Default)]
struct MemoryStore {
    committed: Mutex<MemState>,
    transactions: AtomicUsize,
}

impl MemoryStore {
    fn state(&self) -> MemState {
        self.committed.lock().unwrap().clone()
    }
}

struct MemorySession {
    staged: MemState,
}

#[async_trait]
impl IngestSession for MemorySession {
    async fn upsert_feed(&mut self, feed: &Feed) -> Result<Uuid, StoreError> {
        let meta = self
            .staged
            .feeds
            .entry(feed.feed_link.clone())
            .or_insert_with(|| FeedMeta {
                id: Uuid::new_v4(),
                category: feed.category,
                provider: feed.provider,
            });
        Ok(meta.id)
    }

    async fn upsert_article(&mut self, article: &Article, feed_id: Uuid) -> Result<Uuid, StoreError> {
        let entry = self
            .staged
            .articles
            .entry(article.guid.clone())
            .or_insert_with(|| (Uuid::new_v4(), feed_id));
        Ok(entry.0)
    }
}

#[async_trait]
impl IngestStore for MemoryStore {
    async fn run_in_transaction(&self, work: &TxWork) -> Result<(), StoreError> {
        self.transactions.fetch_add(1, Ordering::SeqCst);
        let mut session = MemorySession {
            staged: self.state(),
        };
        work(&mut session as &mut dyn IngestSession).await?;
        *self.committed.lock().unwrap() = session.staged;
        Ok(())
    }

    async fn select_feeds(&self, _: &FeedFilters) -> Result<Vec<FeedRecord>, StoreError> {
        Ok(Vec::new())
    }

    async fn select_articles(&self, _: &ArticleFilters) -> Result<Vec<ArticleRecord>, StoreError> {
        Ok(Vec::new())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn rss_body(title: &str, guids: &[&str]) -> String {
    let items: String = guids
        .iter()
        .map(|guid| {
            format!(
                "<item><guid>{guid}</guid><title>Story {guid}</title>\
                 <link>https://example.com/{guid}</link></item>"
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>{title}</title>{items}</channel></rss>"#
    )
}

async fn mount_feed(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("Content-Type", "application/xml"),
        )
        .mount(server)
        .await;
}

fn service_for(store: Arc<MemoryStore>, sources: Vec<String>) -> IngestService {
    let fetcher = Arc::new(HttpFetcher::new(reqwest::Client::new()));
    IngestService::new(store, Crawler::new(fetcher, sources))
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_cycle_ingests_all_sources_and_is_idempotent() {
    let server = MockServer::start().await;
    mount_feed(&server, "/bbc/uk/rss.xml", rss_body("BBC UK", &["u1", "u2"])).await;
    mount_feed(&server, "/sky/technology/rss.xml", rss_body("Sky Tech", &["t1"])).await;

    let store = Arc::new(MemoryStore::default());
    let service = service_for(
        Arc::clone(&store),
        vec![
            format!("{}/bbc/uk/rss.xml", server.uri()),
            format!("{}/sky/technology/rss.xml", server.uri()),
        ],
    );

    let summary = service.run_crawl_cycle().await.unwrap();
    assert_eq!(summary.feeds, 2);
    assert_eq!(summary.articles, 3);

    let first = store.state();
    assert_eq!(first.feeds.len(), 2);
    assert_eq!(first.articles.len(), 3);

    // Unchanged remote content: the second cycle converges on the same rows.
    service.run_crawl_cycle().await.unwrap();
    let second = store.state();
    assert_eq!(second.feeds.len(), first.feeds.len());
    assert_eq!(second.articles.len(), first.articles.len());
    assert_eq!(store.transactions.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_category_and_provider_inferred_from_source_urls() {
    let server = MockServer::start().await;
    mount_feed(&server, "/bbc/uk/rss.xml", rss_body("BBC UK", &["u1"])).await;
    mount_feed(&server, "/plain/rss.xml", rss_body("Plain", &["p1"])).await;

    let store = Arc::new(MemoryStore::default());
    let bbc_url = format!("{}/bbc/uk/rss.xml", server.uri());
    let plain_url = format!("{}/plain/rss.xml", server.uri());
    let service = service_for(Arc::clone(&store), vec![bbc_url.clone(), plain_url.clone()]);

    service.run_crawl_cycle().await.unwrap();

    let state = store.state();
    let bbc = &state.feeds[&bbc_url];
    assert_eq!(bbc.category, Category::Uk);
    assert_eq!(bbc.provider, Provider::Bbc);

    let plain = &state.feeds[&plain_url];
    assert_eq!(plain.category, Category::Unknown);
    assert_eq!(plain.provider, Provider::Unknown);
}

#[tokio::test]
async fn test_failing_source_aborts_cycle_without_persisting() {
    let server = MockServer::start().await;
    mount_feed(&server, "/good-a/rss.xml", rss_body("A", &["a1"])).await;
    mount_feed(&server, "/good-c/rss.xml", rss_body("C", &["c1"])).await;
    // /missing/rss.xml is not mounted and returns 404.

    let store = Arc::new(MemoryStore::default());
    let missing_url = format!("{}/missing/rss.xml", server.uri());
    let service = service_for(
        Arc::clone(&store),
        vec![
            format!("{}/good-a/rss.xml", server.uri()),
            missing_url.clone(),
            format!("{}/good-c/rss.xml", server.uri()),
        ],
    );

    let err = service.run_crawl_cycle().await.unwrap_err();

    assert!(err.to_string().contains(&missing_url), "error should name the bad source");
    let state = store.state();
    assert!(state.feeds.is_empty(), "nothing from the healthy sources may land");
    assert!(state.articles.is_empty());
    assert_eq!(store.transactions.load(Ordering::SeqCst), 0);
}
