//! HTTP listing API over the persisted feeds and articles, plus the share
//! endpoint. Thin by design: parse filters, delegate, shape JSON.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::domain::{ArticleFilters, Category, FeedFilters, Provider};
use crate::service::{IngestService, ServiceError};
use crate::social::{Medium, SocialService};

/// Shared handler state.
pub struct AppState {
    pub ingest: Arc<IngestService>,
    /// Absent when no social credentials are configured.
    pub social: Option<Arc<SocialService>>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/feeds", get(list_feeds))
        .route("/articles", get(list_articles))
        .route("/share", post(share))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Error envelope
// ============================================================================

/// JSON error response: status code plus a `message` body.
#[derive(Debug)]
pub struct ApiError {
    code: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code, Json(json!({ "message": self.message }))).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        tracing::error!(error = %err, "request failed");
        Self {
            code: StatusCode::INTERNAL_SERVER_ERROR,
            message: "internal error".to_string(),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Comma-separated list filters, e.g. `?categories=UK,Technology&limit=20`.
#[derive(Debug, Default, Deserialize)]
struct ListParams {
    categories: Option<String>,
    providers: Option<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl ListParams {
    fn categories(&self) -> Result<Vec<Category>, ApiError> {
        parse_names(self.categories.as_deref(), Category::from_name, "category")
    }

    fn providers(&self) -> Result<Vec<Provider>, ApiError> {
        parse_names(self.providers.as_deref(), Provider::from_name, "provider")
    }
}

fn parse_names<T>(
    raw: Option<&str>,
    parse: fn(&str) -> Option<T>,
    kind: &str,
) -> Result<Vec<T>, ApiError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| parse(name).ok_or_else(|| ApiError::bad_request(format!("unknown {kind}: {name}"))))
        .collect()
}

async fn list_feeds(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let filters = FeedFilters {
        categories: params.categories()?,
        providers: params.providers()?,
        limit: params.limit,
        offset: params.offset,
    };

    let feeds = state.ingest.list_feeds(&filters).await?;
    Ok(Json(json!({ "feeds": feeds })))
}

async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let filters = ArticleFilters {
        categories: params.categories()?,
        providers: params.providers()?,
        limit: params.limit,
        offset: params.offset,
    };

    let articles = state.ingest.list_articles(&filters).await?;
    Ok(Json(json!({ "articles": articles })))
}

#[derive(Debug, Deserialize)]
struct ShareRequest {
    article_link: String,
    medium: String,
}

async fn share(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ShareRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(social) = state.social.as_ref() else {
        return Err(ApiError {
            code: StatusCode::SERVICE_UNAVAILABLE,
            message: "social sharing is not configured".to_string(),
        });
    };

    let medium = Medium::from_str(&request.medium)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    social.share(&request.article_link, medium).await.map_err(|e| {
        tracing::error!(error = %e, "share failed");
        ApiError {
            code: StatusCode::BAD_GATEWAY,
            message: "share failed".to_string(),
        }
    })?;

    Ok(StatusCode::ACCEPTED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_splits_and_trims() {
        let categories = parse_names(Some("UK, Technology"), Category::from_name, "category").unwrap();
        assert_eq!(categories, vec![Category::Uk, Category::Technology]);
    }

    #[test]
    fn test_parse_names_empty_segments_ignored() {
        let categories = parse_names(Some("UK,,"), Category::from_name, "category").unwrap();
        assert_eq!(categories, vec![Category::Uk]);
    }

    #[test]
    fn test_parse_names_absent_means_no_filter() {
        let providers = parse_names(None, Provider::from_name, "provider").unwrap();
        assert!(providers.is_empty());
    }

    #[test]
    fn test_parse_names_rejects_unknown() {
        let err = parse_names(Some("BBC,Reuters"), Provider::from_name, "provider").unwrap_err();
        assert_eq!(err.code, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("Reuters"));
    }
}
