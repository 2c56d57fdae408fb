//! Best-image selection for feed entries.
//!
//! Media-declared candidates are tried in priority order (full-size
//! representations before thumbnails), then HTML content is scanned as a
//! fallback. Candidates are validated by fetching the URL and sniffing the
//! actual pixel width from the image header — the dominant network cost of
//! ingestion, so a validated width past the short-circuit threshold ends the
//! scan immediately.

use std::time::Duration;

use futures::StreamExt;
use scraper::{Html, Selector};
use thiserror::Error;
use url::Url;

use crate::config::Config;
use crate::feed::ParsedEntry;

/// URL substrings that mark icons, chrome, and tracking pixels rather than
/// content images (case-insensitive).
const SKIP_PATTERNS: &[&str] = &["icon", "logo", "badge", "button", "tracking", "1x1"];

/// HTML `<img>` candidates examined per content block.
const MAX_HTML_CANDIDATES: usize = 3;

/// A single candidate probe failure. Discards the candidate only; the scan
/// continues.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("probe timed out")]
    Timeout,
    #[error("not a decodable image")]
    Undecodable,
}

pub struct ImageResolver<'a> {
    client: &'a reqwest::Client,
    config: &'a Config,
}

impl<'a> ImageResolver<'a> {
    pub fn new(client: &'a reqwest::Client, config: &'a Config) -> Self {
        Self { client, config }
    }

    /// Find the best image URL for an entry, or `None` when nothing
    /// qualifies.
    pub async fn resolve(&self, entry: &ParsedEntry) -> Option<String> {
        let mut best_url: Option<String> = None;
        let mut best_width: u32 = 0;

        for candidate in &entry.media {
            if let Some(media_type) = &candidate.media_type {
                if !media_type.starts_with("image") {
                    continue;
                }
            }

            let declared = candidate.declared_width;
            // Probe when the declared width improves on the best so far, or
            // when there is no best yet and the width is undeclared.
            if declared > best_width || (best_url.is_none() && declared == 0) {
                let Some(actual) = self.validate(&candidate.url).await else {
                    continue;
                };
                let width = if declared == 0 { actual } else { declared };
                if width > best_width {
                    best_width = width;
                    best_url = Some(candidate.url.clone());
                }
                if best_width >= self.config.short_circuit_width {
                    return best_url;
                }
            }
        }

        // Fall back to scanning HTML content when no media field qualified.
        if best_url.is_none() {
            for block in &entry.html_blocks {
                for url in extract_image_urls(block)
                    .into_iter()
                    .take(MAX_HTML_CANDIDATES)
                {
                    if is_filtered(&url) {
                        continue;
                    }
                    let Some(width) = self.validate(&url).await else {
                        continue;
                    };
                    if width > best_width {
                        best_width = width;
                        best_url = Some(url);
                    }
                    if best_width >= self.config.short_circuit_width {
                        return best_url;
                    }
                }
            }
        }

        best_url
    }

    /// Probe a candidate URL. Returns the actual pixel width when the image
    /// fetches, decodes, and clears the minimum; `None` otherwise.
    async fn validate(&self, url: &str) -> Option<u32> {
        match self.probe_width(url).await {
            Ok(width) if width >= self.config.min_image_width => Some(width),
            Ok(width) => {
                tracing::debug!(url = %url, width = width, "Image below minimum width, discarding");
                None
            }
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "Image probe failed, discarding");
                None
            }
        }
    }

    async fn probe_width(&self, url: &str) -> Result<u32, ProbeError> {
        let timeout = Duration::from_secs(self.config.image_probe_timeout_secs);
        let response = tokio::time::timeout(timeout, self.client.get(url).send())
            .await
            .map_err(|_| ProbeError::Timeout)?
            .map_err(ProbeError::Network)?;

        if !response.status().is_success() {
            return Err(ProbeError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_probe_bytes(response, self.config.max_probe_bytes).await?;
        // Header-only sniffing: dimensions come from the image header, so an
        // oversized or decompression-hostile body is never decoded.
        let size = imagesize::blob_size(&bytes).map_err(|_| ProbeError::Undecodable)?;
        Ok(size.width as u32)
    }
}

/// Read at most `limit` bytes of the body. Truncation is fine here — header
/// sniffing only needs the first few hundred bytes.
async fn read_probe_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ProbeError> {
    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ProbeError::Network)?;
        let remaining = limit.saturating_sub(bytes.len());
        if remaining == 0 {
            break;
        }
        if chunk.len() > remaining {
            bytes.extend_from_slice(&chunk[..remaining]);
            break;
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

/// Extract absolute http(s) `<img src>` URLs from an HTML block, in document
/// order.
fn extract_image_urls(html: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse("img[src]") else {
        return Vec::new();
    };
    let document = Html::parse_fragment(html);

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .filter(|src| {
            Url::parse(src)
                .map(|u| matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false)
        })
        .map(str::to_string)
        .collect()
}

/// Heuristic filter for non-content images (icons, logos, tracking pixels).
fn is_filtered(url: &str) -> bool {
    let lowered = url.to_lowercase();
    SKIP_PATTERNS.iter().any(|skip| lowered.contains(skip))
}
