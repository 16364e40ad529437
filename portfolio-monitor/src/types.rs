use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enrichment::DEFAULT_FUNDING_ENDPOINT;
use crate::sources::DEFAULT_NEWS_ENDPOINT;

/// A configured portfolio company. The display name is the search term
/// unless `search` overrides it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "CompanyEntry")]
pub struct CompanyQuery {
    pub name: String,
    pub search: Option<String>,
}

impl CompanyQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            search: None,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn search_term(&self) -> &str {
        self.search
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

impl From<&str> for CompanyQuery {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for CompanyQuery {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Either `"Acme"` or `{ name = "Acme", search = "Acme Robotics" }` in config.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CompanyEntry {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        search: Option<String>,
    },
}

impl From<CompanyEntry> for CompanyQuery {
    fn from(entry: CompanyEntry) -> Self {
        match entry {
            CompanyEntry::Name(name) => Self::new(name),
            CompanyEntry::Detailed { name, search } => Self { name, search },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawTimestamp {
    /// Already resolved by the feed parser.
    Parsed(DateTime<Utc>),
    /// Verbatim text from the payload, parsed during normalization.
    Text(String),
}

/// One unprocessed search result as it came off the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub title: String,
    pub link: String,
    pub published_at: Option<RawTimestamp>,
    pub source_label: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub source: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingFact {
    pub amount_or_valuation: String,
    pub as_of: Option<NaiveDate>,
    pub source_note: String,
}

/// Result of a best-effort lookup. Only `Found` ever reaches the digest.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome<T> {
    Found(T),
    NotFound,
    TransientError(String),
}

impl<T> LookupOutcome<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            LookupOutcome::Found(value) => Some(value),
            LookupOutcome::NotFound | LookupOutcome::TransientError(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyDigestSection {
    pub company: CompanyQuery,
    pub items: Vec<NewsItem>,
    pub funding: Option<FundingFact>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestTotals {
    pub companies_checked: usize,
    pub companies_with_news: usize,
    pub total_items: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub company: String,
    pub reason: String,
}

/// Per-run counters. Recorded for operators, never used for classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub source_failures: Vec<SourceFailure>,
    pub entries_skipped: usize,
    pub duplicates_removed: usize,
    pub outside_window: usize,
    pub future_dated: usize,
    pub funding_found: usize,
    pub funding_not_found: usize,
    pub funding_errors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub window_days: u32,
    pub active_sections: Vec<CompanyDigestSection>,
    pub quiet_companies: Vec<CompanyQuery>,
    pub totals: DigestTotals,
    pub diagnostics: RunDiagnostics,
}

impl DigestReport {
    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: RunDiagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn section(&self, company: &str) -> Option<&CompanyDigestSection> {
        self.active_sections.iter().find(|s| s.company.name == company)
    }

    pub fn is_quiet(&self, company: &str) -> bool {
        self.quiet_companies.iter().any(|c| c.name == company)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub max_redirects: usize,
    pub news_endpoint: String,
    pub funding_endpoint: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (compatible; PortfolioMonitor/0.1)".to_string(),
            timeout_seconds: 10,
            max_retries: 1,
            retry_delay_ms: 500,
            max_redirects: 5,
            news_endpoint: DEFAULT_NEWS_ENDPOINT.to_string(),
            funding_endpoint: DEFAULT_FUNDING_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned HTTP {status}")]
    UpstreamStatus { status: u16 },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Source unavailable for {company}: {reason}")]
    SourceUnavailable { company: String, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Config format error: {0}")]
    ConfigFormat(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MonitorError {
    /// Failures worth the single retry: transport trouble, 5xx and 429.
    pub fn is_transient(&self) -> bool {
        match self {
            MonitorError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            MonitorError::UpstreamStatus { status } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, MonitorError>;
