//! Feed document parsing on top of `feed-rs`.
//!
//! Converts raw RSS/Atom bytes into the channel title plus an ordered list
//! of entries. Dates flow through [`datetime::parse_pub_date`] via the
//! parser's custom timestamp hook, so every entry either carries a canonical
//! UTC timestamp or none at all.

use feed_rs::model::Entry;
use feed_rs::parser::Builder;
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::datetime;

#[derive(Debug, Error)]
#[error("malformed feed document: {0}")]
pub struct ParseError(#[from] feed_rs::parser::ParseFeedError);

/// An image candidate taken from an entry's media fields.
///
/// Candidates are ordered full-size-first: media content and enclosure
/// links before thumbnails. A missing or non-numeric declared width is 0.
#[derive(Debug, Clone)]
pub struct MediaCandidate {
    pub url: String,
    pub media_type: Option<String>,
    pub declared_width: u32,
}

/// One entry of a parsed feed, reduced to the fields ingestion consumes.
#[derive(Debug, Clone, Default)]
pub struct ParsedEntry {
    pub guid: String,
    pub link: Option<String>,
    pub title: Option<String>,
    /// Raw (possibly HTML-bearing) description text, falling back from the
    /// summary element to the content body.
    pub summary: Option<String>,
    pub published: Option<chrono::DateTime<chrono::Utc>>,
    /// Media-declared image candidates in priority order.
    pub media: Vec<MediaCandidate>,
    /// HTML blocks scanned as a fallback when no media candidate qualifies:
    /// content body first, then summary.
    pub html_blocks: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub channel_title: Option<String>,
    pub entries: Vec<ParsedEntry>,
}

/// Parse a feed document.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, ParseError> {
    let parser = Builder::new()
        .timestamp_parser(|raw: &str| datetime::parse_pub_date(raw))
        .build();
    let feed = parser.parse(bytes)?;

    let channel_title = feed.title.map(|t| t.content);
    let entries = feed.entries.into_iter().map(convert_entry).collect();

    Ok(ParsedFeed {
        channel_title,
        entries,
    })
}

fn convert_entry(entry: Entry) -> ParsedEntry {
    let link = entry.links.first().map(|l| l.href.clone());
    let published = entry.published.or(entry.updated);
    let title = entry.title.map(|t| t.content);

    let content_body = entry.content.and_then(|c| c.body);
    let summary_text = entry.summary.map(|s| s.content);

    let mut media = Vec::new();
    // Full-size representations first: media content and RSS enclosures,
    // both normalized into `media` by feed-rs.
    for object in &entry.media {
        for content in &object.content {
            if let Some(url) = &content.url {
                media.push(MediaCandidate {
                    url: url.to_string(),
                    media_type: content.content_type.as_ref().map(|m| m.to_string()),
                    declared_width: content.width.unwrap_or(0),
                });
            }
        }
    }
    // Atom enclosure links and links that declare an image media type.
    for l in &entry.links {
        let is_enclosure = l.rel.as_deref() == Some("enclosure");
        let is_image = l
            .media_type
            .as_deref()
            .is_some_and(|t| t.starts_with("image"));
        if is_enclosure || is_image {
            media.push(MediaCandidate {
                url: l.href.clone(),
                media_type: l.media_type.clone(),
                declared_width: 0,
            });
        }
    }
    // Thumbnails last.
    for object in &entry.media {
        for thumbnail in &object.thumbnails {
            media.push(MediaCandidate {
                url: thumbnail.image.uri.clone(),
                media_type: None,
                declared_width: thumbnail.image.width.unwrap_or(0),
            });
        }
    }

    let html_blocks = [content_body.clone(), summary_text.clone()]
        .into_iter()
        .flatten()
        .filter(|block| !block.is_empty())
        .collect();

    let summary = summary_text.or(content_body);
    let guid = resolve_guid(
        &entry.id,
        link.as_deref(),
        title.as_deref().unwrap_or_default(),
        published.map(|dt| dt.timestamp()),
    );

    ParsedEntry {
        guid,
        link,
        title,
        summary,
        published,
        media,
        html_blocks,
    }
}

/// Use the feed-declared id when present, otherwise derive a stable guid
/// from the entry's identifying fields.
fn resolve_guid(
    declared: &str,
    link: Option<&str>,
    title: &str,
    published: Option<i64>,
) -> String {
    let trimmed = declared.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    let input = format!(
        "{}|{}|{}",
        link.unwrap_or(""),
        title,
        published.map(|p| p.to_string()).unwrap_or_default()
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}
