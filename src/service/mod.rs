//! Ingestion coordination: one crawl cycle = fetch everything, then
//! persist the whole batch in a single transaction.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::{ArticleFilters, FeedFilters};
use crate::feed::{CrawlError, Crawler};
use crate::storage::{self, ArticleRecord, FeedRecord, IngestSession, IngestStore, StoreError};

/// Errors surfaced by one crawl cycle or a listing call.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Crawl(#[from] CrawlError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What one successful cycle covered.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleSummary {
    pub feeds: usize,
    pub articles: usize,
}

/// Drives crawl cycles and exposes read accessors over the persisted data.
pub struct IngestService {
    store: Arc<dyn IngestStore>,
    crawler: Crawler,
}

impl IngestService {
    pub fn new(store: Arc<dyn IngestStore>, crawler: Crawler) -> Self {
        Self { store, crawler }
    }

    /// Runs one full crawl cycle: fetch all sources, then upsert the batch
    /// under one serializable transaction.
    ///
    /// The cycle is atomic end to end. A fetch failure returns before
    /// anything touches the store; a persistence failure rolls the whole
    /// batch back. Re-running against unchanged sources converges on the
    /// same rows because both upserts key on natural identifiers.
    pub async fn run_crawl_cycle(&self) -> Result<CycleSummary, ServiceError> {
        let batch = self.crawler.crawl().await?;

        let summary = CycleSummary {
            feeds: batch.len(),
            articles: batch.iter().map(|f| f.articles.len()).sum(),
        };
        tracing::info!(feeds = summary.feeds, articles = summary.articles, "crawl complete");

        if batch.is_empty() {
            return Ok(summary);
        }

        // The work unit owns the batch through an Arc so the conflict-retry
        // loop can re-invoke it with a fresh session.
        let batch = Arc::new(batch);
        let work = storage::tx_work(move |session: &mut dyn IngestSession| {
            let batch = Arc::clone(&batch);
            Box::pin(async move {
                for feed in batch.iter() {
                    let feed_id = session.upsert_feed(feed).await?;
                    for article in &feed.articles {
                        session.upsert_article(article, feed_id).await?;
                    }
                }
                Ok(())
            })
        });
        self.store.run_in_transaction(&work).await?;

        Ok(summary)
    }

    /// Persisted feeds, newest first.
    pub async fn list_feeds(&self, filters: &FeedFilters) -> Result<Vec<FeedRecord>, ServiceError> {
        Ok(self.store.select_feeds(filters).await?)
    }

    /// Persisted articles, newest first by publish then creation time.
    pub async fn list_articles(&self, filters: &ArticleFilters) -> Result<Vec<ArticleRecord>, ServiceError> {
        Ok(self.store.select_articles(filters).await?)
    }
}
