//! Canonical domain model shared by the crawler, the store, and the API.
//!
//! `Feed` and `Article` here are the normalizer's output: no identity yet,
//! no server-assigned timestamps. The persisted counterparts with ids live
//! in [`crate::storage`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A syndication source and the articles it carried on one crawl.
///
/// `feed_link` is the natural key: it is the URL the feed was crawled
/// from, and the store enforces its uniqueness so repeated crawls of the
/// same source reuse one row.
#[derive(Debug, Clone)]
pub struct Feed {
    pub title: String,
    pub description: String,
    pub link: String,
    pub feed_link: String,
    pub category: Category,
    pub provider: Provider,
    pub language: String,
    pub updated_at: Option<DateTime<Utc>>,
    /// Articles in the source feed's item order.
    pub articles: Vec<Article>,
}

/// One item within a feed.
///
/// `guid` is the natural dedup key; `published_at` is absent when the
/// source omits a publish date, never a zero value standing in for one.
#[derive(Debug, Clone)]
pub struct Article {
    pub guid: String,
    pub title: String,
    pub description: String,
    pub link: String,
    pub thumbnail_url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Category / Provider
// ============================================================================

/// Editorial category inferred from a feed's URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "UK")]
    Uk,
    Technology,
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Uk => "UK",
            Category::Technology => "Technology",
            Category::Unknown => "Unknown",
        }
    }

    /// Exact-name lookup, for filter parsing and row decoding.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "UK" => Some(Category::Uk),
            "Technology" => Some(Category::Technology),
            "Unknown" => Some(Category::Unknown),
            _ => None,
        }
    }

    /// Infers a category from a feed link by substring match.
    ///
    /// Checks run in a fixed priority order; the first match wins.
    pub fn infer(feed_link: &str) -> Self {
        let link = feed_link.to_lowercase();
        if link.contains("uk") {
            Category::Uk
        } else if link.contains("technology") {
            Category::Technology
        } else {
            Category::Unknown
        }
    }
}

/// News outlet inferred from a feed's URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provider {
    #[serde(rename = "BBC")]
    Bbc,
    Sky,
    Unknown,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Bbc => "BBC",
            Provider::Sky => "Sky",
            Provider::Unknown => "Unknown",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "BBC" => Some(Provider::Bbc),
            "Sky" => Some(Provider::Sky),
            "Unknown" => Some(Provider::Unknown),
            _ => None,
        }
    }

    pub fn infer(feed_link: &str) -> Self {
        let link = feed_link.to_lowercase();
        if link.contains("bbc") {
            Provider::Bbc
        } else if link.contains("sky") {
            Provider::Sky
        } else {
            Provider::Unknown
        }
    }
}

// ============================================================================
// Listing filters
// ============================================================================

/// Optional filters for the feed listing accessor.
#[derive(Debug, Clone, Default)]
pub struct FeedFilters {
    pub categories: Vec<Category>,
    pub providers: Vec<Provider>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Optional filters for the article listing accessor.
///
/// Category/provider filters apply through the owning feed.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilters {
    pub categories: Vec<Category>,
    pub providers: Vec<Provider>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_inference_known_tokens() {
        assert_eq!(Category::infer("https://feeds.bbci.co.uk/news/uk/rss.xml"), Category::Uk);
        assert_eq!(
            Category::infer("https://feeds.bbci.co.uk/news/technology/rss.xml"),
            Category::Uk,
            "uk outranks technology when both tokens appear"
        );
        assert_eq!(
            Category::infer("https://feeds.example.com/news/technology/rss.xml"),
            Category::Technology
        );
    }

    #[test]
    fn test_category_inference_is_case_insensitive() {
        assert_eq!(Category::infer("https://example.com/news/TECHNOLOGY"), Category::Technology);
    }

    #[test]
    fn test_category_inference_unknown() {
        assert_eq!(Category::infer("https://example.com/news/world"), Category::Unknown);
    }

    #[test]
    fn test_provider_inference() {
        assert_eq!(Provider::infer("https://feeds.bbci.co.uk/news/rss.xml"), Provider::Bbc);
        assert_eq!(Provider::infer("https://feeds.skynews.com/feeds/rss/home.xml"), Provider::Sky);
        assert_eq!(Provider::infer("https://example.com/rss"), Provider::Unknown);
    }

    #[test]
    fn test_from_name_round_trip() {
        for c in [Category::Uk, Category::Technology, Category::Unknown] {
            assert_eq!(Category::from_name(c.as_str()), Some(c));
        }
        for p in [Provider::Bbc, Provider::Sky, Provider::Unknown] {
            assert_eq!(Provider::from_name(p.as_str()), Some(p));
        }
        assert_eq!(Category::from_name("bogus"), None);
        assert_eq!(Provider::from_name("bbc"), None, "names are case sensitive");
    }
}
