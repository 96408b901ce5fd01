use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::retry::{on_serialization_conflict, RetryPolicy};
use super::types::{ArticleRecord, FeedRecord, StoreError};
use super::{articles, feeds, IngestSession, IngestStore, TxWork};
use crate::domain::{Article, ArticleFilters, Feed, FeedFilters};

/// Postgres-backed store.
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
    retry: RetryPolicy,
}

impl Store {
    /// Opens a connection pool against `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(StoreError::from_sqlx)?;

        Ok(Self {
            pool,
            retry: RetryPolicy::default(),
        })
    }

    /// Replaces the conflict retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Creates the schema if it does not exist yet. Idempotent, runs at
    /// startup.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS feed (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                link TEXT NOT NULL DEFAULT '',
                feed_link TEXT NOT NULL UNIQUE,
                category TEXT NOT NULL DEFAULT 'Unknown',
                provider TEXT NOT NULL DEFAULT 'Unknown',
                language TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS article (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                feed_id UUID NOT NULL REFERENCES feed(id) ON DELETE CASCADE,
                guid TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                link TEXT NOT NULL DEFAULT '',
                thumbnail_url TEXT NOT NULL DEFAULT '',
                published_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_article_feed ON article(feed_id)",
            "CREATE INDEX IF NOT EXISTS idx_article_published ON article(published_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_feed_category ON feed(category)",
            "CREATE INDEX IF NOT EXISTS idx_feed_provider ON feed(provider)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Migration(e.to_string()))?;
        }

        Ok(())
    }
}

#[async_trait]
impl IngestSession for PgConnection {
    async fn upsert_feed(&mut self, feed: &Feed) -> Result<Uuid, StoreError> {
        feeds::upsert_feed(self, feed).await
    }

    async fn upsert_article(&mut self, article: &Article, feed_id: Uuid) -> Result<Uuid, StoreError> {
        articles::upsert_article(self, article, feed_id).await
    }
}

#[async_trait]
impl IngestStore for Store {
    /// Serializable isolation is the level that rules out write skew
    /// between concurrent cycles; the price is SQLSTATE 40001 failures,
    /// which the retry policy absorbs by re-running the whole work unit.
    /// A work-unit error drops the transaction, which rolls it back.
    async fn run_in_transaction(&self, work: &TxWork) -> Result<(), StoreError> {
        on_serialization_conflict(&self.retry, || async {
            let mut tx = self.pool.begin().await.map_err(StoreError::from_sqlx)?;
            sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
                .execute(&mut *tx)
                .await
                .map_err(StoreError::from_sqlx)?;

            let session: &mut dyn IngestSession = &mut *tx;
            work(session).await?;

            tx.commit().await.map_err(StoreError::from_sqlx)?;
            Ok(())
        })
        .await
    }

    async fn select_feeds(&self, filters: &FeedFilters) -> Result<Vec<FeedRecord>, StoreError> {
        feeds::select_feeds(&self.pool, filters).await
    }

    async fn select_articles(&self, filters: &ArticleFilters) -> Result<Vec<ArticleRecord>, StoreError> {
        articles::select_articles(&self.pool, filters).await
    }
}
