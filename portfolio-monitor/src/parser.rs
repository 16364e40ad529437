use crate::types::{MonitorError, RawEntry, RawTimestamp, Result};
use feed_rs::parser;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

static RE_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<item\b[^>]*>(.*?)</item>").unwrap());
static RE_TITLE: Lazy<Regex> = Lazy::new(|| tag_regex("title"));
static RE_LINK: Lazy<Regex> = Lazy::new(|| tag_regex("link"));
static RE_PUB_DATE: Lazy<Regex> = Lazy::new(|| tag_regex("pubDate"));
static RE_DESCRIPTION: Lazy<Regex> = Lazy::new(|| tag_regex("description"));
static RE_SOURCE: Lazy<Regex> = Lazy::new(|| tag_regex("source"));
static RE_SOURCE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<source\b[^>]*\burl\s*=\s*["']([^"']+)["']"#).unwrap());
static RE_CDATA: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap());

fn tag_regex(tag: &str) -> Regex {
    Regex::new(&format!(r"(?is)<{tag}\b[^>]*>(.*?)</{tag}\s*>")).unwrap()
}

/// How a payload is read. Chosen by [`FeedParser::probe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserVariant {
    /// Well-formed RSS/Atom handled by feed-rs.
    Structured,
    /// Regex extraction of `<item>` blocks from loosely formed markup.
    Fallback,
}

#[derive(Debug)]
pub struct ParsedFeed {
    pub variant: ParserVariant,
    pub entries: Vec<RawEntry>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    /// Inspect the payload for feed markers without parsing it.
    pub fn probe(content: &str) -> Option<ParserVariant> {
        let content_lower = content.to_lowercase();

        let has_feed_root = content_lower.contains("<rss")
            || content_lower.contains("<feed")
            || content_lower.contains("<rdf:rdf")
            || content_lower.contains("<channel");

        if has_feed_root {
            Some(ParserVariant::Structured)
        } else if content_lower.contains("<item") {
            Some(ParserVariant::Fallback)
        } else {
            None
        }
    }

    pub fn parse(&self, content: &str) -> Result<ParsedFeed> {
        let content = Self::normalize_encoding(content)?;
        debug!("Parsing feed content ({} bytes)", content.len());

        let parsed = match Self::probe(&content) {
            Some(ParserVariant::Structured) => match self.parse_structured(&content) {
                Ok(entries) => ParsedFeed {
                    variant: ParserVariant::Structured,
                    entries,
                },
                Err(e) => {
                    warn!("Structured parse failed ({}), falling back to item extraction", e);
                    ParsedFeed {
                        variant: ParserVariant::Fallback,
                        entries: self.parse_fallback(&content)?,
                    }
                }
            },
            Some(ParserVariant::Fallback) => ParsedFeed {
                variant: ParserVariant::Fallback,
                entries: self.parse_fallback(&content)?,
            },
            None => {
                return Err(MonitorError::Parse(
                    "payload does not look like a syndication feed".to_string(),
                ))
            }
        };

        info!("Parsed feed with {} entries ({:?})", parsed.entries.len(), parsed.variant);
        Ok(parsed)
    }

    fn parse_structured(&self, content: &str) -> Result<Vec<RawEntry>> {
        let feed = parser::parse(content.as_bytes())
            .map_err(|e| MonitorError::Parse(format!("Failed to parse feed: {}", e)))?;

        let mut entries: Vec<RawEntry> = feed.entries.into_iter().map(Self::convert_entry).collect();

        // feed-rs drops the RSS <source> publisher name; recover it positionally.
        let sources: Vec<Option<String>> = RE_ITEM
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .map(|block| capture_text(&RE_SOURCE, block.as_str()))
            .collect();
        if sources.len() == entries.len() {
            for (entry, source) in entries.iter_mut().zip(sources) {
                entry.source_label = source;
            }
        }

        Ok(entries)
    }

    fn convert_entry(entry: feed_rs::model::Entry) -> RawEntry {
        let title = entry.title.map(|t| t.content).unwrap_or_default();
        let link = entry
            .links
            .first()
            .map(|l| l.href.clone())
            .unwrap_or_default();

        let published_at = entry
            .published
            .or(entry.updated)
            .map(|dt| RawTimestamp::Parsed(dt.with_timezone(&chrono::Utc)));

        let summary = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body));

        RawEntry {
            title,
            link,
            published_at,
            source_label: None,
            summary,
        }
    }

    fn parse_fallback(&self, content: &str) -> Result<Vec<RawEntry>> {
        let entries: Vec<RawEntry> = RE_ITEM
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .map(|block| Self::extract_item(block.as_str()))
            .collect();

        if entries.is_empty() {
            return Err(MonitorError::Parse(
                "no <item> elements could be extracted".to_string(),
            ));
        }

        Ok(entries)
    }

    fn extract_item(block: &str) -> RawEntry {
        let source_label = capture_text(&RE_SOURCE, block)
            .or_else(|| capture_text(&RE_SOURCE_URL, block));

        RawEntry {
            title: capture_text(&RE_TITLE, block).unwrap_or_default(),
            link: capture_text(&RE_LINK, block).unwrap_or_default(),
            published_at: capture_text(&RE_PUB_DATE, block).map(RawTimestamp::Text),
            source_label,
            summary: capture_text(&RE_DESCRIPTION, block),
        }
    }

    pub fn normalize_encoding(content: &str) -> Result<String> {
        let normalized = content
            .trim_start_matches('\u{feff}')
            .replace("\r\n", "\n")
            .replace('\r', "\n")
            .trim()
            .to_string();

        if normalized.is_empty() {
            return Err(MonitorError::Parse("Empty content after normalization".to_string()));
        }

        Ok(normalized)
    }
}

fn capture_text(re: &Regex, block: &str) -> Option<String> {
    let raw = re.captures(block)?.get(1)?.as_str();
    let unwrapped = RE_CDATA.replace_all(raw, "$1");
    let decoded = html_escape::decode_html_entities(unwrapped.trim()).trim().to_string();
    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}
