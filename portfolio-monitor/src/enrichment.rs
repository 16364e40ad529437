use crate::fetcher::Fetcher;
use crate::traits::FundingLookup;
use crate::types::{CompanyQuery, FundingFact, LookupOutcome, Result};
use crate::utils::{text, url as url_utils};
use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_FUNDING_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Characters on either side of a funding match searched for a date.
const DATE_CONTEXT_CHARS: usize = 120;

static RE_RAISED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:raised|raises|raising|secured|secures|closed|closes|lands|landed)\b[^.$€£]{0,40}?[$€£]\s?\d[\d,.]*\s*(?:million|billion|bn|mm|m|k|b)?\b",
    )
    .unwrap()
});
static RE_VALUATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bvalu(?:ed|ation)\b[^.$€£]{0,30}?[$€£]\s?\d[\d,.]*\s*(?:trillion|billion|million|bn|mm|m|k|b)?\b",
    )
    .unwrap()
});
static RE_ROUND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:pre-seed|seed|series\s+[a-h])\s+(?:round|funding|financing)\b").unwrap()
});
static RE_ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());
static RE_MONTH_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(?:(\d{1,2}),?\s+)?(\d{4})\b",
    )
    .unwrap()
});

/// Scrapes a search-results page for a funding or valuation phrase.
pub struct SearchFundingLookup {
    endpoint: Url,
    fetcher: Arc<Fetcher>,
}

impl SearchFundingLookup {
    pub fn new(endpoint: Url, fetcher: Arc<Fetcher>) -> Self {
        Self { endpoint, fetcher }
    }

    pub fn from_endpoint(endpoint: &str, fetcher: Arc<Fetcher>) -> Result<Self> {
        Ok(Self::new(Url::parse(endpoint)?, fetcher))
    }

    pub fn query_url(&self, company: &CompanyQuery) -> Url {
        let query = format!("\"{}\" funding round valuation", company.name.replace('"', ""));
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().clear().append_pair("q", &query);
        url
    }
}

#[async_trait]
impl FundingLookup for SearchFundingLookup {
    async fn lookup(&self, company: &CompanyQuery) -> LookupOutcome<FundingFact> {
        let url = self.query_url(company);
        debug!("Checking funding info for: {}", company.name);

        let document = match self.fetcher.fetch_text(&url).await {
            Ok(fetched) => fetched.content,
            Err(e) => {
                debug!("Funding lookup unreachable for {}: {}", company.name, e);
                return LookupOutcome::TransientError(e.to_string());
            }
        };

        let source_note = format!(
            "search results ({})",
            url_utils::host_without_www(&url).unwrap_or_else(|| "unknown host".to_string())
        );

        match extract_funding_fact(&document, &source_note) {
            Some(fact) => {
                info!("Funding info for {}: {}", company.name, fact.amount_or_valuation);
                LookupOutcome::Found(fact)
            }
            None => LookupOutcome::NotFound,
        }
    }
}

/// First raised-amount phrase, else valuation, else a named round.
pub fn extract_funding_fact(document: &str, source_note: &str) -> Option<FundingFact> {
    let plain = text::strip_markup(document);

    let found = [&*RE_RAISED, &*RE_VALUATION, &*RE_ROUND]
        .iter()
        .find_map(|re| re.find(&plain))?;

    let from = text::floor_boundary(&plain, found.start().saturating_sub(DATE_CONTEXT_CHARS));
    let to = text::ceil_boundary(&plain, found.end() + DATE_CONTEXT_CHARS);

    Some(FundingFact {
        amount_or_valuation: text::collapse_whitespace(found.as_str()),
        as_of: extract_date(&plain[from..to]),
        source_note: source_note.to_string(),
    })
}

fn extract_date(context: &str) -> Option<NaiveDate> {
    if let Some(caps) = RE_ISO_DATE.captures(context) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    let caps = RE_MONTH_DATE.captures(context)?;
    let month = month_number(&caps[1])?;
    let day = caps.get(2).and_then(|d| d.as_str().parse().ok()).unwrap_or(1);
    let year = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_number(prefix: &str) -> Option<u32> {
    let month = match prefix.to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}
