/// URL helpers shared by the source client and the normalizer
pub mod url {
    use url::Url;

    /// Host of the URL without a leading `www.`
    pub fn host_without_www(url: &Url) -> Option<String> {
        let host = url.host_str()?.to_lowercase();
        let host = host.strip_prefix("www.").map(str::to_string).unwrap_or(host);
        if host.is_empty() {
            None
        } else {
            Some(host)
        }
    }

    pub fn is_http_url(url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https") && url.host_str().is_some()
    }
}

/// Text cleanup for titles, summaries and scraped documents
pub mod text {
    use once_cell::sync::Lazy;
    use regex::Regex;

    static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[a-z!?][^>]*>").unwrap());
    static RE_SCRIPT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)>").unwrap());

    pub fn collapse_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Decode entities, drop tags and fold whitespace. Entities are decoded
    /// again after tag removal because feeds often double-escape markup.
    pub fn strip_markup(html: &str) -> String {
        let decoded = html_escape::decode_html_entities(html);
        let without_scripts = RE_SCRIPT.replace_all(&decoded, " ");
        let without_tags = RE_TAGS.replace_all(&without_scripts, " ");
        let decoded = html_escape::decode_html_entities(&without_tags);
        collapse_whitespace(&decoded)
    }

    /// Cut to at most `max_chars` characters, ending with `...` when cut.
    pub fn truncate_chars(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }

        let keep = max_chars.saturating_sub(3);
        let truncated: String = text.chars().take(keep).collect();
        format!("{}...", truncated.trim_end())
    }

    /// Largest char boundary at or below `index`.
    pub fn floor_boundary(text: &str, index: usize) -> usize {
        let mut i = index.min(text.len());
        while !text.is_char_boundary(i) {
            i -= 1;
        }
        i
    }

    /// Smallest char boundary at or above `index`.
    pub fn ceil_boundary(text: &str, index: usize) -> usize {
        let mut i = index.min(text.len());
        while !text.is_char_boundary(i) {
            i += 1;
        }
        i
    }
}
