use crate::types::{MonitorError, NewsItem, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPosition {
    BeforeWindow,
    Within,
    Future,
}

/// Trailing lookback window `[anchor - days, anchor]`, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    days: u32,
    anchor: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct WindowOutcome {
    pub kept: Vec<NewsItem>,
    pub expired: usize,
    pub future_dated: usize,
}

impl TimeWindow {
    pub fn new(days: u32, anchor: DateTime<Utc>) -> Result<Self> {
        if days == 0 {
            return Err(MonitorError::Configuration(
                "days_back must be at least 1".to_string(),
            ));
        }
        Ok(Self { days, anchor })
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn start(&self) -> DateTime<Utc> {
        // Windows reaching past chrono's range simply start at its minimum.
        self.anchor
            .checked_sub_signed(Duration::days(i64::from(self.days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn classify(&self, ts: DateTime<Utc>) -> WindowPosition {
        if ts > self.anchor {
            WindowPosition::Future
        } else if ts < self.start() {
            WindowPosition::BeforeWindow
        } else {
            WindowPosition::Within
        }
    }

    /// Keep items inside the window. Future-dated items are treated as clock
    /// skew: dropped and logged.
    pub fn filter(&self, items: Vec<NewsItem>) -> WindowOutcome {
        let mut outcome = WindowOutcome::default();

        for item in items {
            match self.classify(item.published_at) {
                WindowPosition::Within => outcome.kept.push(item),
                WindowPosition::BeforeWindow => {
                    debug!("Outside lookback window: {} ({})", item.title, item.published_at);
                    outcome.expired += 1;
                }
                WindowPosition::Future => {
                    warn!(
                        "Future-dated entry ignored: {} ({} > {})",
                        item.title, item.published_at, self.anchor
                    );
                    outcome.future_dated += 1;
                }
            }
        }

        outcome
    }
}
