#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portfolio_monitor::types::*;
use portfolio_monitor::{FundingLookup, NewsSource, Throttle};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use std::time::Duration;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn raw(title: &str, link: &str, published_at: DateTime<Utc>) -> RawEntry {
    RawEntry {
        title: title.to_string(),
        link: link.to_string(),
        published_at: Some(RawTimestamp::Parsed(published_at)),
        source_label: None,
        summary: None,
    }
}

pub fn raw_from(source: &str, title: &str, link: &str, published_at: DateTime<Utc>) -> RawEntry {
    RawEntry {
        source_label: Some(source.to_string()),
        ..raw(title, link, published_at)
    }
}

/// Canned per-company answers. Companies not listed get an empty feed.
#[derive(Default)]
pub struct FakeNewsSource {
    responses: HashMap<String, std::result::Result<Vec<RawEntry>, String>>,
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
    queried: Mutex<Vec<String>>,
}

impl FakeNewsSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(mut self, company: &str, entries: Vec<RawEntry>) -> Self {
        self.responses.insert(company.to_string(), Ok(entries));
        self
    }

    pub fn with_failure(mut self, company: &str, reason: &str) -> Self {
        self.responses.insert(company.to_string(), Err(reason.to_string()));
        self
    }

    pub fn with_delay(mut self, company: &str, delay: Duration) -> Self {
        self.delays.insert(company.to_string(), delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queried(&self) -> Vec<String> {
        self.queried.lock().unwrap().clone()
    }
}

#[async_trait]
impl NewsSource for FakeNewsSource {
    fn source_name(&self) -> String {
        "fake".to_string()
    }

    async fn search(&self, company: &CompanyQuery, _days_back: u32) -> Result<Vec<RawEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queried.lock().unwrap().push(company.search_term().to_string());

        if let Some(delay) = self.delays.get(&company.name) {
            tokio::time::sleep(*delay).await;
        }

        match self.responses.get(&company.name) {
            Some(Ok(entries)) => Ok(entries.clone()),
            Some(Err(reason)) => Err(MonitorError::SourceUnavailable {
                company: company.name.clone(),
                reason: reason.clone(),
            }),
            None => Ok(Vec::new()),
        }
    }
}

/// Funding answers keyed by company; everything else is `NotFound`.
#[derive(Default)]
pub struct FakeFundingLookup {
    outcomes: HashMap<String, LookupOutcome<FundingFact>>,
    calls: AtomicUsize,
}

impl FakeFundingLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fact(mut self, company: &str, amount: &str) -> Self {
        self.outcomes.insert(
            company.to_string(),
            LookupOutcome::Found(FundingFact {
                amount_or_valuation: amount.to_string(),
                as_of: None,
                source_note: "fake".to_string(),
            }),
        );
        self
    }

    pub fn with_error(mut self, company: &str) -> Self {
        self.outcomes.insert(
            company.to_string(),
            LookupOutcome::TransientError("connection reset".to_string()),
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FundingLookup for FakeFundingLookup {
    async fn lookup(&self, company: &CompanyQuery) -> LookupOutcome<FundingFact> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .get(&company.name)
            .cloned()
            .unwrap_or(LookupOutcome::NotFound)
    }
}

#[derive(Default)]
pub struct CountingThrottle {
    calls: AtomicUsize,
}

impl CountingThrottle {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Throttle for CountingThrottle {
    async fn acquire(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Google News style RSS item.
pub fn rss_item(title: &str, link: &str, published_at: DateTime<Utc>, source: &str) -> String {
    format!(
        "<item><title>{title} - {source}</title><link>{link}</link>\
         <guid isPermaLink=\"false\">{link}</guid><pubDate>{pub_date}</pubDate>\
         <description>&lt;a href=\"{link}\"&gt;{title}&lt;/a&gt;&amp;nbsp;&amp;nbsp;&lt;font&gt;{source}&lt;/font&gt;</description>\
         <source url=\"https://www.{host}.com\">{source}</source></item>",
        title = title,
        source = source,
        link = link,
        pub_date = published_at.to_rfc2822(),
        host = source.to_lowercase().replace(' ', ""),
    )
}

pub fn rss_feed(items: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <rss version=\"2.0\"><channel><title>search - Google News</title>\
         <link>https://news.google.com/search</link><description>Google News</description>\
         {}</channel></rss>",
        items.join("")
    )
}
