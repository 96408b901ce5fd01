//! Pure normalization from a parsed syndication document into the domain
//! model. Everything here is deterministic: the same document and source
//! URL always produce the same `domain::Feed`.

use sha2::{Digest, Sha256};

use crate::domain::{Article, Category, Feed, Provider};

/// Enclosure media type accepted for article thumbnails.
const IMAGE_ENCLOSURE_TYPE: &str = "image/jpeg";

/// Shapes a parsed feed document into the canonical model.
///
/// `source_url` is the URL the document was fetched from; it becomes the
/// feed's natural key (`feed_link`) and drives category/provider
/// inference. Articles keep the source feed's item order.
pub fn normalize(source_url: &str, raw: feed_rs::model::Feed) -> Feed {
    let articles = raw.entries.into_iter().map(normalize_entry).collect();

    Feed {
        title: raw.title.map(|t| t.content).unwrap_or_default(),
        description: raw.description.map(|t| t.content).unwrap_or_default(),
        link: raw.links.first().map(|l| l.href.clone()).unwrap_or_default(),
        feed_link: source_url.to_string(),
        category: Category::infer(source_url),
        provider: Provider::infer(source_url),
        language: raw.language.unwrap_or_default(),
        updated_at: raw.updated,
        articles,
    }
}

fn normalize_entry(entry: feed_rs::model::Entry) -> Article {
    let thumbnail_url = thumbnail(&entry);
    let link = entry.links.first().map(|l| l.href.clone()).unwrap_or_default();
    let title = entry.title.map(|t| t.content).unwrap_or_default();
    let description = entry.summary.map(|t| t.content).unwrap_or_default();
    // The publish time is carried only when the source supplies one; a
    // missing date stays absent rather than borrowing the updated time.
    let published_at = entry.published;
    let guid = stable_guid(&entry.id, &link, &title, published_at);

    Article {
        guid,
        title,
        description,
        link,
        thumbnail_url,
        published_at,
        updated_at: entry.updated,
    }
}

/// URL of the first enclosure whose media type is exactly `image/jpeg`,
/// or empty when the item carries no such enclosure.
fn thumbnail(entry: &feed_rs::model::Entry) -> String {
    entry
        .media
        .iter()
        .flat_map(|media| media.content.iter())
        .find(|content| {
            content
                .content_type
                .as_ref()
                .is_some_and(|mime| mime.essence().to_string() == IMAGE_ENCLOSURE_TYPE)
        })
        .and_then(|content| content.url.as_ref())
        .map(|url| url.to_string())
        .unwrap_or_default()
}

/// Carries the source GUID through verbatim when present.
///
/// A source that omits the GUID would otherwise make every such article
/// collide on the empty string under the store's unique key, so a stable
/// SHA-256 of link, title, and publish time stands in for it.
fn stable_guid(
    existing: &str,
    link: &str,
    title: &str,
    published_at: Option<chrono::DateTime<chrono::Utc>>,
) -> String {
    let trimmed = existing.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    let input = format!(
        "{}|{}|{}",
        link,
        title,
        published_at.map(|p| p.timestamp().to_string()).unwrap_or_default()
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(xml: &str) -> feed_rs::model::Feed {
        feed_rs::parser::parse(xml.as_bytes()).unwrap()
    }

    const CHANNEL_HEADER: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>BBC News - UK</title>
    <description>UK news</description>
    <link>https://www.bbc.co.uk/news/uk</link>
    <language>en-gb</language>"#;

    #[test]
    fn test_feed_metadata_and_inference() {
        let xml = format!("{CHANNEL_HEADER}</channel></rss>");
        let feed = normalize("https://feeds.bbci.co.uk/news/uk/rss.xml", parse(&xml));

        assert_eq!(feed.title, "BBC News - UK");
        assert_eq!(feed.description, "UK news");
        assert_eq!(feed.link, "https://www.bbc.co.uk/news/uk");
        assert_eq!(feed.feed_link, "https://feeds.bbci.co.uk/news/uk/rss.xml");
        assert_eq!(feed.category, Category::Uk);
        assert_eq!(feed.provider, Provider::Bbc);
        assert_eq!(feed.language, "en-gb");
        assert!(feed.articles.is_empty());
    }

    #[test]
    fn test_unrecognized_source_maps_to_unknown() {
        let xml = format!("{CHANNEL_HEADER}</channel></rss>");
        let feed = normalize("https://example.com/news/rss.xml", parse(&xml));

        assert_eq!(feed.category, Category::Unknown);
        assert_eq!(feed.provider, Provider::Unknown);
    }

    #[test]
    fn test_thumbnail_takes_first_image_enclosure() {
        let xml = format!(
            r#"{CHANNEL_HEADER}
    <item>
        <guid>item-1</guid>
        <title>Story</title>
        <link>https://example.com/story</link>
        <enclosure url="https://example.com/report.pdf" type="application/pdf" length="1"/>
        <enclosure url="https://example.com/a.jpg" type="image/jpeg" length="1"/>
        <enclosure url="https://example.com/b.jpg" type="image/jpeg" length="1"/>
    </item>
</channel></rss>"#
        );
        let feed = normalize("https://example.com/rss.xml", parse(&xml));

        assert_eq!(feed.articles.len(), 1);
        assert_eq!(feed.articles[0].thumbnail_url, "https://example.com/a.jpg");
    }

    #[test]
    fn test_thumbnail_empty_without_image_enclosure() {
        let xml = format!(
            r#"{CHANNEL_HEADER}
    <item>
        <guid>item-1</guid>
        <title>Story</title>
        <enclosure url="https://example.com/report.pdf" type="application/pdf" length="1"/>
    </item>
</channel></rss>"#
        );
        let feed = normalize("https://example.com/rss.xml", parse(&xml));

        assert_eq!(feed.articles[0].thumbnail_url, "");
    }

    #[test]
    fn test_published_time_absent_when_source_omits_it() {
        let xml = format!(
            r#"{CHANNEL_HEADER}
    <item><guid>dated</guid><title>Dated</title>
        <pubDate>Tue, 05 Aug 2025 09:30:00 GMT</pubDate></item>
    <item><guid>undated</guid><title>Undated</title></item>
</channel></rss>"#
        );
        let feed = normalize("https://example.com/rss.xml", parse(&xml));

        let dated = feed.articles.iter().find(|a| a.guid == "dated").unwrap();
        let undated = feed.articles.iter().find(|a| a.guid == "undated").unwrap();
        assert!(dated.published_at.is_some());
        assert!(undated.published_at.is_none());
    }

    #[test]
    fn test_guid_carried_verbatim() {
        let xml = format!(
            r#"{CHANNEL_HEADER}
    <item><guid>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a</guid><title>Story</title></item>
</channel></rss>"#
        );
        let feed = normalize("https://example.com/rss.xml", parse(&xml));

        assert_eq!(feed.articles[0].guid, "urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a");
    }

    #[test]
    fn test_missing_guid_synthesized_and_stable() {
        let a = stable_guid("", "https://example.com/story", "Story", None);
        let b = stable_guid("", "https://example.com/story", "Story", None);
        let c = stable_guid("", "https://example.com/other", "Story", None);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_whitespace_guid_treated_as_missing() {
        let guid = stable_guid("   ", "https://example.com/story", "Story", None);
        assert_eq!(guid.len(), 64);
    }

    #[test]
    fn test_item_order_preserved() {
        let xml = format!(
            r#"{CHANNEL_HEADER}
    <item><guid>first</guid><title>First</title></item>
    <item><guid>second</guid><title>Second</title></item>
    <item><guid>third</guid><title>Third</title></item>
</channel></rss>"#
        );
        let feed = normalize("https://example.com/rss.xml", parse(&xml));

        let guids: Vec<&str> = feed.articles.iter().map(|a| a.guid.as_str()).collect();
        assert_eq!(guids, vec!["first", "second", "third"]);
    }
}
