use crate::config::{DigestSettings, MonitorConfig};
use crate::digest::{CompanyResult, DigestCompiler};
use crate::enrichment::SearchFundingLookup;
use crate::fetcher::Fetcher;
use crate::normalize::{NormalizeStats, Normalizer};
use crate::rate_limit::RateLimiter;
use crate::sources::GoogleNewsSource;
use crate::traits::{FundingLookup, NewsSource, Throttle};
use crate::types::{
    CompanyQuery, DigestReport, FundingFact, LookupOutcome, MonitorError, NewsItem, Result,
    RunDiagnostics, SourceFailure,
};
use crate::window::TimeWindow;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Everything one company contributed to a run.
#[derive(Debug, Default)]
struct CompanyOutcome {
    items: Vec<NewsItem>,
    source_failure: Option<String>,
    normalize: NormalizeStats,
    outside_window: usize,
    future_dated: usize,
    /// `None` when enrichment was not attempted.
    funding: Option<LookupOutcome<FundingFact>>,
}

/// One-shot batch run: fetch, normalize, window and enrich every company,
/// then compile the digest.
pub struct DigestPipeline {
    news: Arc<dyn NewsSource>,
    funding: Option<Arc<dyn FundingLookup>>,
    news_throttle: Arc<dyn Throttle>,
    funding_throttle: Arc<dyn Throttle>,
    settings: DigestSettings,
}

impl DigestPipeline {
    pub fn new(news: Arc<dyn NewsSource>, settings: DigestSettings) -> Self {
        let news_throttle = Arc::new(RateLimiter::from_millis(settings.request_delay_ms, settings.jitter_ms));
        let funding_throttle = Arc::new(RateLimiter::from_millis(settings.funding_delay_ms, settings.jitter_ms));

        Self {
            news,
            funding: None,
            news_throttle,
            funding_throttle,
            settings,
        }
    }

    /// Wires the HTTP source client and search-based enrichment from config.
    pub fn from_config(config: &MonitorConfig) -> Result<Self> {
        config.validate()?;

        let fetcher = Arc::new(Fetcher::new(config.fetch.clone())?);
        let news = GoogleNewsSource::from_endpoint(&config.fetch.news_endpoint, fetcher.clone())?;
        let mut pipeline = Self::new(Arc::new(news), config.settings.clone());

        if config.settings.include_funding {
            let lookup = SearchFundingLookup::from_endpoint(&config.fetch.funding_endpoint, fetcher)?;
            pipeline = pipeline.with_funding_lookup(Arc::new(lookup));
        }

        Ok(pipeline)
    }

    pub fn with_funding_lookup(mut self, lookup: Arc<dyn FundingLookup>) -> Self {
        self.funding = Some(lookup);
        self
    }

    pub fn with_news_throttle(mut self, throttle: Arc<dyn Throttle>) -> Self {
        self.news_throttle = throttle;
        self
    }

    pub fn with_funding_throttle(mut self, throttle: Arc<dyn Throttle>) -> Self {
        self.funding_throttle = throttle;
        self
    }

    pub async fn run(&self, companies: &[CompanyQuery]) -> Result<DigestReport> {
        self.run_at(Utc::now(), companies).await
    }

    /// Run anchored at `now`: the lookback window ends there and the report
    /// is stamped with it.
    pub async fn run_at(&self, now: DateTime<Utc>, companies: &[CompanyQuery]) -> Result<DigestReport> {
        if companies.is_empty() {
            return Err(MonitorError::Configuration(
                "no companies configured".to_string(),
            ));
        }
        let window = TimeWindow::new(self.settings.days_back, now)?;
        let run_id = Uuid::new_v4();
        let concurrency = self.settings.concurrency.max(1);

        info!(
            "Run {} started: {} companies, {} day window, funding {}, {} worker(s), source {}",
            run_id,
            companies.len(),
            window.days(),
            if self.enrichment_enabled() { "on" } else { "off" },
            concurrency,
            self.news.source_name()
        );

        // Completion order is arbitrary; results are keyed by configured position.
        let mut outcomes: HashMap<usize, CompanyOutcome> = HashMap::with_capacity(companies.len());
        let window_ref = &window;
        let mut pending = stream::iter(companies.iter().enumerate())
            .map(|(index, company)| async move { (index, self.process_company(company, window_ref).await) })
            .buffer_unordered(concurrency);

        while let Some((index, outcome)) = pending.next().await {
            outcomes.insert(index, outcome);
        }
        drop(pending);

        let mut diagnostics = RunDiagnostics::default();
        let mut results = Vec::with_capacity(companies.len());

        for (index, company) in companies.iter().enumerate() {
            let outcome = outcomes.remove(&index).unwrap_or_default();
            let funding = Self::record(&mut diagnostics, company, &outcome);
            results.push(CompanyResult::new(company.clone(), outcome.items).with_funding(funding));
        }

        let report = DigestCompiler::new()
            .with_max_items(self.settings.max_items_per_company)
            .compile_at(now, window.days(), results)
            .with_run_id(run_id)
            .with_diagnostics(diagnostics);

        info!(
            "Run {} finished: {} active, {} quiet, {} source failure(s)",
            run_id,
            report.active_sections.len(),
            report.quiet_companies.len(),
            report.diagnostics.source_failures.len()
        );

        Ok(report)
    }

    fn enrichment_enabled(&self) -> bool {
        self.settings.include_funding && self.funding.is_some()
    }

    async fn process_company(&self, company: &CompanyQuery, window: &TimeWindow) -> CompanyOutcome {
        let (mut outcome, funding) = tokio::join!(
            self.collect_news(company, window),
            self.lookup_funding(company)
        );
        outcome.funding = funding;
        outcome
    }

    async fn collect_news(&self, company: &CompanyQuery, window: &TimeWindow) -> CompanyOutcome {
        self.news_throttle.acquire().await;

        let raw = match self.news.search(company, window.days()).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Treating {} as having no news this run: {}", company.name, e);
                return CompanyOutcome {
                    source_failure: Some(e.to_string()),
                    ..Default::default()
                };
            }
        };

        let normalizer = Normalizer::new().with_base(self.news.base_url());
        let (items, normalize) = normalizer.normalize_entries(raw);
        let windowed = window.filter(items);

        info!("Found {} recent articles for {}", windowed.kept.len(), company.name);

        CompanyOutcome {
            items: windowed.kept,
            source_failure: None,
            normalize,
            outside_window: windowed.expired,
            future_dated: windowed.future_dated,
            funding: None,
        }
    }

    async fn lookup_funding(&self, company: &CompanyQuery) -> Option<LookupOutcome<FundingFact>> {
        if !self.settings.include_funding {
            return None;
        }
        let lookup = self.funding.as_ref()?;

        self.funding_throttle.acquire().await;
        Some(lookup.lookup(company).await)
    }

    /// Fold one company's outcome into the run diagnostics and collapse the
    /// funding outcome to what the digest carries.
    fn record(
        diagnostics: &mut RunDiagnostics,
        company: &CompanyQuery,
        outcome: &CompanyOutcome,
    ) -> Option<FundingFact> {
        if let Some(reason) = &outcome.source_failure {
            diagnostics.source_failures.push(SourceFailure {
                company: company.name.clone(),
                reason: reason.clone(),
            });
        }
        diagnostics.entries_skipped += outcome.normalize.skipped;
        diagnostics.duplicates_removed += outcome.normalize.duplicates;
        diagnostics.outside_window += outcome.outside_window;
        diagnostics.future_dated += outcome.future_dated;

        match &outcome.funding {
            Some(LookupOutcome::Found(fact)) => {
                diagnostics.funding_found += 1;
                Some(fact.clone())
            }
            Some(LookupOutcome::NotFound) => {
                diagnostics.funding_not_found += 1;
                None
            }
            Some(LookupOutcome::TransientError(reason)) => {
                warn!("Could not fetch funding info for {}: {}", company.name, reason);
                diagnostics.funding_errors += 1;
                None
            }
            None => None,
        }
    }
}
