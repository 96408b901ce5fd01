use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Category, Provider};

// ============================================================================
// Error Types
// ============================================================================

/// Postgres SQLSTATE for a serialization failure under SERIALIZABLE.
const PG_SERIALIZATION_FAILURE: &str = "40001";
/// Postgres SQLSTATE for a unique constraint violation.
const PG_UNIQUE_VIOLATION: &str = "23505";

/// Persistence errors, classified so the retry loop can tell transient
/// serialization conflicts apart from everything else.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique-key violation reached outside the upsert path.
    #[error("row already exists (constraint {0})")]
    AlreadyExists(String),

    /// Concurrent serializable transactions could not be ordered.
    /// Retryable; callers only see it once the retry budget is spent.
    #[error("serialization conflict: {0}")]
    SerializationConflict(String),

    /// Any other driver failure. Never retried.
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Schema migration failed at startup.
    #[error("migration failed: {0}")]
    Migration(String),
}

impl StoreError {
    /// Classifies a sqlx error by its Postgres SQLSTATE.
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            match db.code().as_deref() {
                Some(PG_SERIALIZATION_FAILURE) => {
                    return StoreError::SerializationConflict(db.message().to_string());
                }
                Some(PG_UNIQUE_VIOLATION) => {
                    let constraint = db.constraint().unwrap_or("unknown").to_string();
                    return StoreError::AlreadyExists(constraint);
                }
                _ => {}
            }
        }
        StoreError::Database(err)
    }

    pub fn is_serialization_conflict(&self) -> bool {
        matches!(self, StoreError::SerializationConflict(_))
    }
}

// ============================================================================
// Persisted records
// ============================================================================

/// A feed row as stored, with its server-assigned identity.
#[derive(Debug, Clone, Serialize)]
pub struct FeedRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub link: String,
    pub feed_link: String,
    pub category: Category,
    pub provider: Provider,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// An article row as stored.
///
/// The GUID is a dedup key, not content; it stays out of API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleRecord {
    pub id: Uuid,
    pub feed_id: Uuid,
    #[serde(skip_serializing)]
    pub guid: String,
    pub title: String,
    pub description: String,
    pub link: String,
    pub thumbnail_url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Row types (sqlx FromRow, converted via into_record)
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct FeedRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub link: String,
    pub feed_link: String,
    pub category: String,
    pub provider: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl FeedRow {
    pub(crate) fn into_record(self) -> FeedRecord {
        FeedRecord {
            id: self.id,
            title: self.title,
            description: self.description,
            link: self.link,
            feed_link: self.feed_link,
            category: Category::from_name(&self.category).unwrap_or(Category::Unknown),
            provider: Provider::from_name(&self.provider).unwrap_or(Provider::Unknown),
            language: self.language,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ArticleRow {
    pub id: Uuid,
    pub feed_id: Uuid,
    pub guid: String,
    pub title: String,
    pub description: String,
    pub link: String,
    pub thumbnail_url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ArticleRow {
    pub(crate) fn into_record(self) -> ArticleRecord {
        ArticleRecord {
            id: self.id,
            feed_id: self.feed_id,
            guid: self.guid,
            title: self.title,
            description: self.description,
            link: self.link,
            thumbnail_url: self.thumbnail_url,
            published_at: self.published_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
