use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::types::{ArticleRecord, ArticleRow, StoreError};
use crate::domain::{Article, ArticleFilters};

/// Upserts an article keyed on `guid` and returns its identity.
pub(crate) async fn upsert_article(
    conn: &mut PgConnection,
    article: &Article,
    feed_id: Uuid,
) -> Result<Uuid, StoreError> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO article (feed_id, guid, title, description, link, thumbnail_url, published_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (guid) DO UPDATE SET guid = EXCLUDED.guid
        RETURNING id
        "#,
    )
    .bind(feed_id)
    .bind(&article.guid)
    .bind(&article.title)
    .bind(&article.description)
    .bind(&article.link)
    .bind(&article.thumbnail_url)
    .bind(article.published_at)
    .bind(article.updated_at)
    .fetch_one(&mut *conn)
    .await
    .map_err(StoreError::from_sqlx)?;

    Ok(id)
}

pub(crate) async fn select_articles(
    pool: &PgPool,
    filters: &ArticleFilters,
) -> Result<Vec<ArticleRecord>, StoreError> {
    // Category/provider filters apply through the owning feed, so the join
    // only appears when one of them is present.
    let filtered_by_feed = !filters.categories.is_empty() || !filters.providers.is_empty();

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT a.id, a.feed_id, a.guid, a.title, a.description, a.link, a.thumbnail_url, \
         a.published_at, a.created_at, a.updated_at \
         FROM article a",
    );
    if filtered_by_feed {
        query.push(" JOIN feed f ON f.id = a.feed_id");
    }

    let mut prefix = " WHERE ";
    if !filters.categories.is_empty() {
        let names: Vec<String> = filters.categories.iter().map(|c| c.as_str().to_string()).collect();
        query.push(prefix).push("f.category = ANY(").push_bind(names).push(")");
        prefix = " AND ";
    }
    if !filters.providers.is_empty() {
        let names: Vec<String> = filters.providers.iter().map(|p| p.as_str().to_string()).collect();
        query.push(prefix).push("f.provider = ANY(").push_bind(names).push(")");
    }

    query.push(" ORDER BY a.published_at DESC NULLS LAST, a.created_at DESC");
    if let Some(limit) = filters.limit {
        query.push(" LIMIT ").push_bind(limit as i64);
    }
    if let Some(offset) = filters.offset {
        query.push(" OFFSET ").push_bind(offset as i64);
    }

    let rows: Vec<ArticleRow> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(StoreError::from_sqlx)?;

    Ok(rows.into_iter().map(ArticleRow::into_record).collect())
}
