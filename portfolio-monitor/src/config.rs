use crate::types::{CompanyQuery, FetchConfig, MonitorError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "config/companies.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DigestSettings {
    pub days_back: u32,
    pub include_funding: bool,
    /// Worker pool size. `1` runs companies strictly one after another.
    pub concurrency: usize,
    /// `0` disables the cap.
    pub max_items_per_company: usize,
    pub request_delay_ms: u64,
    pub funding_delay_ms: u64,
    pub jitter_ms: u64,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            days_back: 7,
            include_funding: true,
            concurrency: 1,
            max_items_per_company: 10,
            request_delay_ms: 1000,
            funding_delay_ms: 2000,
            jitter_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub companies: Vec<CompanyQuery>,
    #[serde(default)]
    pub settings: DigestSettings,
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl MonitorConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MonitorError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {} ({} companies)", path.display(), config.companies.len());
        Ok(config)
    }

    /// Checks that must hold before any network activity.
    pub fn validate(&self) -> Result<()> {
        if self.companies.is_empty() {
            return Err(MonitorError::Configuration(
                "no companies configured".to_string(),
            ));
        }

        if let Some(index) = self.companies.iter().position(|c| c.name.trim().is_empty()) {
            return Err(MonitorError::Configuration(format!(
                "company #{} has an empty name",
                index + 1
            )));
        }

        if self.settings.days_back == 0 {
            return Err(MonitorError::Configuration(
                "days_back must be at least 1".to_string(),
            ));
        }

        if self.settings.concurrency == 0 {
            return Err(MonitorError::Configuration(
                "concurrency must be at least 1".to_string(),
            ));
        }

        for (field, endpoint) in [
            ("news_endpoint", &self.fetch.news_endpoint),
            ("funding_endpoint", &self.fetch.funding_endpoint),
        ] {
            Url::parse(endpoint).map_err(|e| {
                MonitorError::Configuration(format!("{} {:?} is not a URL: {}", field, endpoint, e))
            })?;
        }

        if self.settings.request_delay_ms == 0 && self.settings.jitter_ms == 0 {
            return Err(MonitorError::Configuration(
                "request_delay_ms and jitter_ms cannot both be 0".to_string(),
            ));
        }

        if self.settings.include_funding
            && self.settings.funding_delay_ms == 0
            && self.settings.jitter_ms == 0
        {
            return Err(MonitorError::Configuration(
                "funding_delay_ms and jitter_ms cannot both be 0".to_string(),
            ));
        }

        if self.fetch.max_retries > crate::fetcher::MAX_RETRIES {
            warn!(
                "max_retries = {} exceeds the per-request bound, using {}",
                self.fetch.max_retries,
                crate::fetcher::MAX_RETRIES
            );
        }

        let mut names: Vec<&str> = self.companies.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        if names.windows(2).any(|w| w[0] == w[1]) {
            warn!("Company list contains duplicate names; each entry is searched separately");
        }

        Ok(())
    }
}
