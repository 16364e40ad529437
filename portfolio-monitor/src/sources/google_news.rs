use crate::fetcher::Fetcher;
use crate::parser::FeedParser;
use crate::traits::NewsSource;
use crate::types::{CompanyQuery, MonitorError, RawEntry, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_NEWS_ENDPOINT: &str = "https://news.google.com/rss/search";

/// Google News RSS search, one exact-phrase query per company
pub struct GoogleNewsSource {
    endpoint: Url,
    fetcher: Arc<Fetcher>,
    parser: FeedParser,
}

impl GoogleNewsSource {
    pub fn new(endpoint: Url, fetcher: Arc<Fetcher>) -> Self {
        Self {
            endpoint,
            fetcher,
            parser: FeedParser::new(),
        }
    }

    pub fn from_endpoint(endpoint: &str, fetcher: Arc<Fetcher>) -> Result<Self> {
        Ok(Self::new(Url::parse(endpoint)?, fetcher))
    }

    /// `"<term>" when:<days>d` with US English locale parameters.
    pub fn search_url(&self, company: &CompanyQuery, days_back: u32) -> Url {
        let term = company.search_term().replace('"', "");
        let query = format!("\"{}\" when:{}d", term.trim(), days_back);

        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("q", &query)
            .append_pair("hl", "en-US")
            .append_pair("gl", "US")
            .append_pair("ceid", "US:en");
        url
    }
}

#[async_trait]
impl NewsSource for GoogleNewsSource {
    fn source_name(&self) -> String {
        match self.endpoint.domain() {
            Some(domain) => format!("News RSS ({})", domain),
            None => "News RSS".to_string(),
        }
    }

    fn base_url(&self) -> Option<Url> {
        Some(self.endpoint.clone())
    }

    async fn search(&self, company: &CompanyQuery, days_back: u32) -> Result<Vec<RawEntry>> {
        let url = self.search_url(company, days_back);
        info!("Fetching news for: {} (query: {})", company.name, company.search_term());

        let unavailable = |reason: String| MonitorError::SourceUnavailable {
            company: company.name.clone(),
            reason,
        };

        let fetched = self
            .fetcher
            .fetch_text(&url)
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        debug!(
            "News feed for {} answered in {} ms after {} attempt(s)",
            company.name, fetched.response_time_ms, fetched.attempts
        );

        let parsed = self.parser.parse(&fetched.content).map_err(|e| {
            warn!("Malformed feed body for {}: {}", company.name, e);
            unavailable(e.to_string())
        })?;

        if parsed.entries.is_empty() {
            info!("No news found for {}", company.name);
        } else {
            info!("Found {} raw entries for {}", parsed.entries.len(), company.name);
        }

        Ok(parsed.entries)
    }
}
