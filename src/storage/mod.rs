//! Persistence gateway: Postgres-backed, transactional, idempotent.
//!
//! The ingestion side of the store is expressed as two capability traits:
//!
//! - [`IngestStore`] opens one serializable transaction per call, retries
//!   the whole work unit on serialization conflicts, and exposes the read
//!   accessors.
//! - [`IngestSession`] is the transaction-scoped handle a work unit writes
//!   through. It is passed explicitly — composition means handing the
//!   session to helpers, never opening a nested transaction.
//!
//! [`Store`] is the production implementation; tests substitute in-memory
//! doubles behind the same traits.

mod articles;
mod feeds;
mod retry;
mod store;
mod types;

use async_trait::async_trait;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::domain::{Article, ArticleFilters, Feed, FeedFilters};

pub use retry::{on_serialization_conflict, retry, RetryPolicy};
pub use store::Store;
pub use types::{ArticleRecord, FeedRecord, StoreError};

/// Transaction-scoped write handle.
///
/// Both upserts return the row's identity whether the insert or the
/// conflict path ran, so callers can wire foreign keys within the same
/// transaction.
#[async_trait]
pub trait IngestSession: Send {
    /// Insert-or-reuse keyed on `feed_link`.
    async fn upsert_feed(&mut self, feed: &Feed) -> Result<Uuid, StoreError>;

    /// Insert-or-reuse keyed on `guid`, owned by `feed_id`.
    async fn upsert_article(&mut self, article: &Article, feed_id: Uuid) -> Result<Uuid, StoreError>;
}

/// One transactional unit of ingestion work.
///
/// Invoked with a fresh session per attempt; the retry loop may call it
/// several times, so implementations own their inputs (clone an `Arc`
/// into the returned future) rather than borrowing per-attempt state.
pub type TxWork =
    dyn for<'s> Fn(&'s mut dyn IngestSession) -> BoxFuture<'s, Result<(), StoreError>> + Send + Sync;

/// Identity helper that pins a closure to the [`TxWork`] signature, which
/// type inference cannot reach on its own for higher-ranked closures.
pub fn tx_work<F>(work: F) -> F
where
    F: for<'s> Fn(&'s mut dyn IngestSession) -> BoxFuture<'s, Result<(), StoreError>> + Send + Sync,
{
    work
}

/// Store surface consumed by the ingestion service.
#[async_trait]
pub trait IngestStore: Send + Sync {
    /// Runs `work` inside one serializable transaction: commit on `Ok`,
    /// roll back on `Err`, retry the whole unit on serialization conflict
    /// per the store's [`RetryPolicy`].
    async fn run_in_transaction(&self, work: &TxWork) -> Result<(), StoreError>;

    /// Persisted feeds, newest first, optionally filtered.
    async fn select_feeds(&self, filters: &FeedFilters) -> Result<Vec<FeedRecord>, StoreError>;

    /// Persisted articles, newest first by publish then creation time.
    async fn select_articles(&self, filters: &ArticleFilters) -> Result<Vec<ArticleRecord>, StoreError>;
}
