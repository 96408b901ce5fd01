use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::types::{FeedRecord, FeedRow, StoreError};
use crate::domain::{Feed, FeedFilters};

/// Upserts a feed keyed on `feed_link` and returns its identity.
///
/// The conflict arm updates a no-op column so `RETURNING id` yields the
/// existing row's identity instead of nothing.
pub(crate) async fn upsert_feed(conn: &mut PgConnection, feed: &Feed) -> Result<Uuid, StoreError> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO feed (title, description, link, feed_link, category, provider, language, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (feed_link) DO UPDATE SET feed_link = EXCLUDED.feed_link
        RETURNING id
        "#,
    )
    .bind(&feed.title)
    .bind(&feed.description)
    .bind(&feed.link)
    .bind(&feed.feed_link)
    .bind(feed.category.as_str())
    .bind(feed.provider.as_str())
    .bind(&feed.language)
    .bind(feed.updated_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(StoreError::from_sqlx)?;

    Ok(id)
}

pub(crate) async fn select_feeds(pool: &PgPool, filters: &FeedFilters) -> Result<Vec<FeedRecord>, StoreError> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT id, title, description, link, feed_link, category, provider, language, created_at, updated_at \
         FROM feed",
    );

    let mut prefix = " WHERE ";
    if !filters.categories.is_empty() {
        let names: Vec<String> = filters.categories.iter().map(|c| c.as_str().to_string()).collect();
        query.push(prefix).push("category = ANY(").push_bind(names).push(")");
        prefix = " AND ";
    }
    if !filters.providers.is_empty() {
        let names: Vec<String> = filters.providers.iter().map(|p| p.as_str().to_string()).collect();
        query.push(prefix).push("provider = ANY(").push_bind(names).push(")");
    }

    query.push(" ORDER BY created_at DESC");
    if let Some(limit) = filters.limit {
        query.push(" LIMIT ").push_bind(limit as i64);
    }
    if let Some(offset) = filters.offset {
        query.push(" OFFSET ").push_bind(offset as i64);
    }

    let rows: Vec<FeedRow> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(StoreError::from_sqlx)?;

    Ok(rows.into_iter().map(FeedRow::into_record).collect())
}
