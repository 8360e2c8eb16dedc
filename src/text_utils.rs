use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use unidecode::unidecode;

const WORDS_PER_MINUTE: u32 = 200;

/// Normalizes a title or label into a URL-safe identifier: transliterate,
/// lowercase, drop punctuation, collapse whitespace/underscores to hyphens.
/// May return an empty string; callers pick their own placeholder.
pub fn slugify(text: &str) -> String {
    let ascii = unidecode(text);

    let mut slug = String::new();
    let mut prev_hyphen = false;
    for c in ascii.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            prev_hyphen = false;
        } else if c.is_whitespace() || c == '-' || c == '_' {
            if !prev_hyphen && !slug.is_empty() {
                slug.push('-');
                prev_hyphen = true;
            }
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Reading minutes for a body, 200 words per minute rounded up, never 0.
/// Derived on every decode; the stored value is not trusted.
pub fn estimate_read_time(body: &str) -> u32 {
    let words = body.split_whitespace().count() as u32;
    let minutes = (words + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE;
    minutes.max(1)
}

/// Parses a publication instant. RFC 3339 is the written form; the two
/// bare fallbacks keep hand-edited files loadable.
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Some(date_time.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    None
}

/// Written form of an instant: RFC 3339, milliseconds, `Z` suffix.
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}
