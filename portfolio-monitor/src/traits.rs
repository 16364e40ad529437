use crate::types::{CompanyQuery, FundingFact, LookupOutcome, RawEntry, Result};
use async_trait::async_trait;
use url::Url;

/// Search backend that returns raw entries for one company.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Human-readable name for logs
    fn source_name(&self) -> String;

    /// Base for resolving relative links in this source's entries
    fn base_url(&self) -> Option<Url> {
        None
    }

    /// One query for one company. `Err` means the source was unavailable
    /// for this company only.
    async fn search(&self, company: &CompanyQuery, days_back: u32) -> Result<Vec<RawEntry>>;
}

/// Best-effort funding/valuation lookup. Never fails; misses are outcomes.
#[async_trait]
pub trait FundingLookup: Send + Sync {
    async fn lookup(&self, company: &CompanyQuery) -> LookupOutcome<FundingFact>;
}

/// Paces outbound requests. Shared by every worker in a run.
#[async_trait]
pub trait Throttle: Send + Sync {
    async fn acquire(&self);
}
