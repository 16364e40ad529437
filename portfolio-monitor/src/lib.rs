pub mod types;
pub mod config;
pub mod traits;
pub mod utils;
pub mod rate_limit;
pub mod fetcher;
pub mod parser;
pub mod sources;
pub mod normalize;
pub mod window;
pub mod enrichment;
pub mod digest;
pub mod pipeline;
pub mod render;
pub mod output;

pub use types::*;
pub use config::{DigestSettings, MonitorConfig};
pub use traits::{FundingLookup, NewsSource, Throttle};
pub use rate_limit::RateLimiter;
pub use fetcher::Fetcher;
pub use parser::{FeedParser, ParserVariant};
pub use sources::GoogleNewsSource;
pub use normalize::Normalizer;
pub use window::TimeWindow;
pub use enrichment::SearchFundingLookup;
pub use digest::{CompanyResult, DigestCompiler};
pub use pipeline::DigestPipeline;
