//! Entry normalization and deduplication.
//!
//! Raw entries become [`NewsItem`]s here: titles are cleaned, links resolved,
//! timestamps parsed, sources named and summaries reduced to plain text.
//! Entries that cannot be normalized are skipped, never fatal.

use crate::types::{NewsItem, RawEntry, RawTimestamp};
use crate::utils::{text, url as url_utils};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info};
use url::Url;

pub const SUMMARY_MAX_CHARS: usize = 280;

const TRACKING_PARAMS: &[&str] = &[
    "fbclid", "gclid", "mc_cid", "mc_eid", "ocid", "cmpid", "ref", "ref_src", "oc",
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeStats {
    pub skipped: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    base: Option<Url>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self { base: None }
    }

    /// Base used to resolve relative links.
    pub fn with_base(mut self, base: Option<Url>) -> Self {
        self.base = base;
        self
    }

    /// Normalize every entry, then drop duplicates. First-seen order is kept.
    pub fn normalize_entries(&self, raw: Vec<RawEntry>) -> (Vec<NewsItem>, NormalizeStats) {
        let total = raw.len();
        let items: Vec<NewsItem> = raw
            .into_iter()
            .filter_map(|entry| self.normalize_entry(entry))
            .collect();

        let skipped = total - items.len();
        let (unique, duplicates) = deduplicate(items);

        if skipped > 0 || duplicates > 0 {
            info!(
                "Normalized {} entries: {} kept, {} skipped, {} duplicates",
                total,
                unique.len(),
                skipped,
                duplicates
            );
        }

        (unique, NormalizeStats { skipped, duplicates })
    }

    /// `None` means the entry is skipped.
    pub fn normalize_entry(&self, entry: RawEntry) -> Option<NewsItem> {
        let link = match self.resolve_link(&entry.link) {
            Some(link) => link,
            None => {
                debug!("Skipping entry with unusable link: {:?}", entry.link);
                return None;
            }
        };

        let published_at = match entry.published_at.as_ref().and_then(resolve_timestamp) {
            Some(ts) => ts,
            None => {
                debug!("Skipping entry without parseable timestamp: {}", entry.title);
                return None;
            }
        };

        let source = resolve_source(entry.source_label.as_deref(), &link);
        let title = clean_title(&entry.title, &source);
        if title.is_empty() {
            debug!("Skipping entry with empty title: {}", link);
            return None;
        }

        let summary = entry
            .summary
            .as_deref()
            .map(|s| text::truncate_chars(&text::strip_markup(s), SUMMARY_MAX_CHARS))
            .unwrap_or_default();

        Some(NewsItem {
            title,
            link: link.to_string(),
            published_at,
            source,
            summary,
        })
    }

    fn resolve_link(&self, link: &str) -> Option<Url> {
        let link = link.trim();
        if link.is_empty() {
            return None;
        }

        let resolved = match Url::parse(link) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => self.base.as_ref()?.join(link).ok()?,
            Err(_) => return None,
        };

        url_utils::is_http_url(&resolved).then_some(resolved)
    }
}

/// Drop later entries whose link key or (title, source) key was already seen.
pub fn deduplicate(items: Vec<NewsItem>) -> (Vec<NewsItem>, usize) {
    let mut seen_links = HashSet::new();
    let mut seen_titles = HashSet::new();
    let mut unique = Vec::with_capacity(items.len());
    let mut removed = 0;

    for item in items {
        let link = link_key(&item.link);
        let title = title_key(&item.title, &item.source);

        if seen_links.contains(&link) || seen_titles.contains(&title) {
            debug!("Removing duplicate entry: {} ({})", item.title, item.link);
            removed += 1;
            continue;
        }

        seen_links.insert(link);
        seen_titles.insert(title);
        unique.push(item);
    }

    (unique, removed)
}

/// Comparison form of a link: no scheme, fragment, `www.`, trailing slash
/// or tracking parameters.
pub fn link_key(link: &str) -> String {
    let Ok(url) = Url::parse(link.trim()) else {
        return link.trim().to_lowercase();
    };

    let host = url_utils::host_without_www(&url).unwrap_or_default();
    let port = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
    let path = url.path().trim_end_matches('/');

    let kept: Vec<String> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(key, value)| format!("{}={}", key, value))
        .collect();

    if kept.is_empty() {
        format!("{}{}{}", host, port, path)
    } else {
        format!("{}{}{}?{}", host, port, path, kept.join("&"))
    }
}

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

pub fn title_key(title: &str, source: &str) -> (String, String) {
    (
        text::collapse_whitespace(&title.to_lowercase()),
        source.trim().to_lowercase(),
    )
}

fn resolve_timestamp(raw: &RawTimestamp) -> Option<DateTime<Utc>> {
    match raw {
        RawTimestamp::Parsed(ts) => Some(*ts),
        RawTimestamp::Text(text) => parse_timestamp(text),
    }
}

/// RFC 2822, RFC 3339, then a few naive forms read as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Stated source when present (a URL collapses to its host), else the
/// link's host.
pub fn resolve_source(label: Option<&str>, link: &Url) -> String {
    let label = label.map(str::trim).filter(|l| !l.is_empty());

    if let Some(label) = label {
        if let Ok(url) = Url::parse(label) {
            if let Some(host) = url_utils::host_without_www(&url) {
                return host;
            }
        }
        return text::collapse_whitespace(label);
    }

    url_utils::host_without_www(link).unwrap_or_else(|| "Unknown".to_string())
}

/// Trim the title and drop a trailing ` - <source>` that repeats the source.
pub fn clean_title(title: &str, source: &str) -> String {
    let title = text::collapse_whitespace(&html_escape::decode_html_entities(title));

    if let Some((head, suffix)) = title.rsplit_once(" - ") {
        let head = head.trim();
        if !head.is_empty() && same_publisher(suffix, source) {
            return head.to_string();
        }
    }

    title
}

fn same_publisher(suffix: &str, source: &str) -> bool {
    let suffix = alnum_lower(suffix);
    if suffix.is_empty() {
        return false;
    }

    if suffix == alnum_lower(source) {
        return true;
    }

    // "Reuters" vs "reuters.com", "The Verge" vs "theverge.com"
    source.contains('.')
        && source
            .split('.')
            .next()
            .map(|label| alnum_lower(label) == suffix)
            .unwrap_or(false)
}

fn alnum_lower(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_key_ignores_tracking_and_cosmetics() {
        assert_eq!(
            link_key("https://www.example.com/a/b/?utm_source=x&id=7&fbclid=z#top"),
            link_key("http://example.com/a/b?id=7")
        );
        assert_ne!(
            link_key("https://example.com/a?id=7"),
            link_key("https://example.com/a?id=8")
        );
    }

    #[test]
    fn title_suffix_stripped_only_when_it_names_the_source() {
        assert_eq!(clean_title("Acme raises $5M - Reuters", "Reuters"), "Acme raises $5M");
        assert_eq!(clean_title("Acme raises $5M - Reuters", "reuters.com"), "Acme raises $5M");
        assert_eq!(clean_title("  Acme - the road ahead  ", "Reuters"), "Acme - the road ahead");
    }

    #[test]
    fn parses_common_timestamp_shapes() {
        assert!(parse_timestamp("Tue, 14 Oct 2025 09:30:00 GMT").is_some());
        assert!(parse_timestamp("2025-10-14T09:30:00Z").is_some());
        assert!(parse_timestamp("2025-10-14 09:30:00").is_some());
        assert!(parse_timestamp("last tuesday").is_none());
    }

    #[test]
    fn relative_links_resolve_against_base() {
        let base = Url::parse("https://news.example.com/rss/search").unwrap();
        let normalizer = Normalizer::new().with_base(Some(base));
        let item = normalizer
            .normalize_entry(RawEntry {
                title: "Acme ships".into(),
                link: "./articles/42".into(),
                published_at: Some(RawTimestamp::Text("2025-10-14T09:30:00Z".into())),
                source_label: None,
                summary: None,
            })
            .unwrap();
        assert_eq!(item.link, "https://news.example.com/rss/articles/42");
        assert_eq!(item.source, "news.example.com");
    }
}
