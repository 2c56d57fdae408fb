//! Publication date normalization.
//!
//! Feed dates arrive in RFC 3339, RFC 2822, and a long tail of almost-valid
//! variants. US Pacific zone abbreviations show up often enough in the wild
//! to warrant explicit offsets; RFC 2822 parsers disagree on them.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Timezone abbreviations substituted with numeric offsets before parsing.
const TZ_ABBREVIATIONS: &[(&str, &str)] = &[("PDT", "-0700"), ("PST", "-0800")];

/// Parse a feed-supplied date string into a UTC timestamp.
///
/// Returns `None` for empty or unparseable input — callers treat that as an
/// entry-fatal condition rather than storing a placeholder date.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    for (abbr, offset) in TZ_ABBREVIATIONS {
        if let Some(stripped) = trimmed.strip_suffix(abbr) {
            let candidate = format!("{}{}", stripped, offset);
            if let Ok(dt) = DateTime::parse_from_rfc2822(&candidate) {
                return Some(dt.with_timezone(&Utc));
            }
        }
    }

    // Bare datetimes are treated as UTC.
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    None
}
