use crate::types::{
    CompanyDigestSection, CompanyQuery, DigestReport, DigestTotals, FundingFact, NewsItem,
    RunDiagnostics,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

/// Filtered news and optional funding for one configured company.
#[derive(Debug, Clone)]
pub struct CompanyResult {
    pub company: CompanyQuery,
    pub items: Vec<NewsItem>,
    pub funding: Option<FundingFact>,
}

impl CompanyResult {
    pub fn new(company: CompanyQuery, items: Vec<NewsItem>) -> Self {
        Self {
            company,
            items,
            funding: None,
        }
    }

    pub fn with_funding(mut self, funding: Option<FundingFact>) -> Self {
        self.funding = funding;
        self
    }
}

/// Builds the [`DigestReport`] from per-company results in configured order.
#[derive(Debug, Clone, Default)]
pub struct DigestCompiler {
    max_items_per_company: Option<usize>,
}

impl DigestCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max` items per section after sorting. `0` means no cap.
    pub fn with_max_items(mut self, max: usize) -> Self {
        self.max_items_per_company = (max > 0).then_some(max);
        self
    }

    pub fn compile(&self, window_days: u32, results: Vec<CompanyResult>) -> DigestReport {
        self.compile_at(Utc::now(), window_days, results)
    }

    /// Every section in the report shares `generated_at`.
    pub fn compile_at(
        &self,
        generated_at: DateTime<Utc>,
        window_days: u32,
        results: Vec<CompanyResult>,
    ) -> DigestReport {
        let companies_checked = results.len();
        let mut active_sections = Vec::new();
        let mut quiet_companies = Vec::new();

        for result in results {
            if result.items.is_empty() {
                debug!("No news this run: {}", result.company.name);
                quiet_companies.push(result.company);
                continue;
            }

            active_sections.push(CompanyDigestSection {
                items: self.order_items(result.items),
                company: result.company,
                funding: result.funding,
            });
        }

        let totals = DigestTotals {
            companies_checked,
            companies_with_news: active_sections.len(),
            total_items: active_sections.iter().map(|s| s.items.len()).sum(),
        };

        info!(
            "Compiled digest: {} companies checked, {} with news, {} items",
            totals.companies_checked, totals.companies_with_news, totals.total_items
        );

        DigestReport {
            run_id: Uuid::new_v4(),
            generated_at,
            window_days,
            active_sections,
            quiet_companies,
            totals,
            diagnostics: RunDiagnostics::default(),
        }
    }

    /// Most recent first. The sort is stable, so ties keep discovery order.
    fn order_items(&self, mut items: Vec<NewsItem>) -> Vec<NewsItem> {
        items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        if let Some(max) = self.max_items_per_company {
            items.truncate(max);
        }
        items
    }
}
