use crate::types::{FetchConfig, MonitorError, Result};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

/// Upper bound on retries per request regardless of configuration.
pub const MAX_RETRIES: u32 = 1;

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub content: String,
    pub attempts: u32,
    pub response_time_ms: u64,
}

pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    /// GET `url` and return the body. Transient failures get at most one
    /// retry after a short backoff; everything else fails immediately.
    pub async fn fetch_text(&self, url: &Url) -> Result<FetchResult> {
        let start_time = Instant::now();
        let max_retries = self.config.max_retries.min(MAX_RETRIES);
        let mut backoff = self.retry_backoff();
        let mut attempt = 0;

        debug!("Fetching: {}", url);

        loop {
            attempt += 1;

            let err = match self.fetch_once(url).await {
                Ok(content) => {
                    info!("Fetched {} ({} bytes, attempt {})", url, content.len(), attempt);
                    return Ok(FetchResult {
                        content,
                        attempts: attempt,
                        response_time_ms: start_time.elapsed().as_millis() as u64,
                    });
                }
                Err(e) => e,
            };

            if attempt > max_retries || !err.is_transient() {
                error!("Failed to fetch {} after {} attempt(s): {}", url, attempt, err);
                return Err(err);
            }

            match backoff.next_backoff() {
                Some(delay) => {
                    warn!("Attempt {} failed for {}: {}, retrying in {:?}", attempt, url, err, delay);
                    tokio::time::sleep(delay).await;
                }
                None => return Err(err),
            }
        }
    }

    async fn fetch_once(&self, url: &Url) -> Result<String> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(MonitorError::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }

    fn retry_backoff(&self) -> ExponentialBackoff<backoff::SystemClock> {
        let delay = Duration::from_millis(self.config.retry_delay_ms);
        ExponentialBackoff {
            current_interval: delay,
            initial_interval: delay,
            max_interval: delay * 4,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}
