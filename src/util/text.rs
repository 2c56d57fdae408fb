use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches a single HTML tag. Deliberately a simple non-recursive pattern
/// rather than a full HTML parser; malformed markup may be mishandled.
static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Remove HTML tags from text.
///
/// Returns `Cow::Borrowed` when the input contains no tags (common case).
pub fn strip_tags(raw: &str) -> Cow<'_, str> {
    TAG_PATTERN.replace_all(raw, "")
}

/// Normalize feed-supplied text for storage: strip tags, then decode
/// HTML entities.
///
/// Tags are removed before entity decoding, matching how feeds typically
/// double-encode markup inside description elements. Decoding can therefore
/// surface literal angle brackets from `&lt;`/`&gt;` — those are content,
/// not markup, and are preserved.
pub fn clean_html(raw: &str) -> String {
    let stripped = strip_tags(raw);
    html_escape::decode_html_entities(stripped.as_ref()).into_owned()
}
