pub mod google_news;

pub use google_news::{GoogleNewsSource, DEFAULT_NEWS_ENDPOINT};
