mod common;

use chrono::{Duration, Utc};
use common::*;
use portfolio_monitor::types::*;
use portfolio_monitor::{
    DigestPipeline, DigestSettings, Fetcher, FundingLookup, GoogleNewsSource, MonitorConfig, NewsSource,
    SearchFundingLookup,
};
use std::sync::Arc;
use tracing::info;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_fetch_config(server: &MockServer) -> FetchConfig {
    FetchConfig {
        user_agent: "Portfolio-Monitor-Test/1.0".to_string(),
        timeout_seconds: 5,
        retry_delay_ms: 10,
        news_endpoint: format!("{}/rss/search", server.uri()),
        funding_endpoint: format!("{}/html/", server.uri()),
        ..Default::default()
    }
}

fn news_source(server: &MockServer) -> GoogleNewsSource {
    let config = test_fetch_config(server);
    let endpoint = config.news_endpoint.clone();
    let fetcher = Arc::new(Fetcher::new(config).unwrap());
    GoogleNewsSource::from_endpoint(&endpoint, fetcher).unwrap()
}

fn funding_lookup(server: &MockServer) -> SearchFundingLookup {
    let config = test_fetch_config(server);
    let endpoint = config.funding_endpoint.clone();
    let fetcher = Arc::new(Fetcher::new(config).unwrap());
    SearchFundingLookup::from_endpoint(&endpoint, fetcher).unwrap()
}

fn acme_feed() -> String {
    let now = Utc::now();
    rss_feed(&[
        rss_item(
            "Acme raises $10M",
            "https://techcrunch.com/2025/acme-raises",
            now - Duration::days(1),
            "TechCrunch",
        ),
        rss_item(
            "Acme opens Lisbon office",
            "https://www.reuters.com/business/acme-lisbon",
            now - Duration::days(2),
            "Reuters",
        ),
    ])
}

#[tokio::test]
async fn test_news_search_builds_exact_phrase_query() -> Result<()> {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rss/search"))
        .and(query_param("q", "\"Acme\" when:7d"))
        .and(query_param("hl", "en-US"))
        .and(query_param("gl", "US"))
        .and(query_param("ceid", "US:en"))
        .respond_with(ResponseTemplate::new(200).set_body_string(acme_feed()))
        .expect(1)
        .mount(&server)
        .await;

    let source = news_source(&server);
    let entries = source.search(&CompanyQuery::new("Acme"), 7).await?;
    info!("Fetched {} entries from mock feed", entries.len());

    assert_eq!(entries.len(), 2);
    assert!(entries[0].title.starts_with("Acme raises $10M"));
    assert_eq!(entries[0].link, "https://techcrunch.com/2025/acme-raises");
    assert!(entries.iter().all(|e| e.published_at.is_some()));

    Ok(())
}

#[tokio::test]
async fn test_search_override_reaches_query() -> Result<()> {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rss/search"))
        .and(query_param("q", "\"Bolt Robotics\" when:14d"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss_feed(&[])))
        .expect(1)
        .mount(&server)
        .await;

    let source = news_source(&server);
    let company = CompanyQuery::new("Bolt").with_search("Bolt Robotics");
    let entries = source.search(&company, 14).await?;
    assert!(entries.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_server_error_retried_once() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rss/search"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let result = news_source(&server).search(&CompanyQuery::new("Acme"), 7).await;

    match result {
        Err(MonitorError::SourceUnavailable { company, reason }) => {
            assert_eq!(company, "Acme");
            assert!(reason.contains("503"));
        }
        other => panic!("expected SourceUnavailable, got {:?}", other.map(|e| e.len())),
    }
}

#[tokio::test]
async fn test_client_error_not_retried() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rss/search"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let result = news_source(&server).search(&CompanyQuery::new("Acme"), 7).await;
    assert!(matches!(result, Err(MonitorError::SourceUnavailable { .. })));
}

#[tokio::test]
async fn test_non_feed_body_is_source_failure() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rss/search"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>Please verify you are human</body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = news_source(&server).search(&CompanyQuery::new("Acme"), 7).await;
    assert!(matches!(result, Err(MonitorError::SourceUnavailable { .. })));
}

#[tokio::test]
async fn test_loose_markup_read_by_fallback() -> Result<()> {
    init_tracing();
    let server = MockServer::start().await;
    let published = (Utc::now() - Duration::days(1)).to_rfc2822();
    let body = format!(
        "<html><body><item><title>Acme wins contract</title>\
         <link>https://acme.example.com/contract</link><pubDate>{}</pubDate>\
         <source url=\"https://www.bloomberg.com\">Bloomberg</source></item></body></html>",
        published
    );

    Mock::given(method("GET"))
        .and(path("/rss/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let entries = news_source(&server).search(&CompanyQuery::new("Acme"), 7).await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, "Acme wins contract");
    assert_eq!(entries[0].link, "https://acme.example.com/contract");

    Ok(())
}

#[tokio::test]
async fn test_funding_lookup_found() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/html/"))
        .and(query_param("q", "\"Acme\" funding round valuation"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<div class=\"result\"><a>Acme funding</a><p>Jan 12, 2025 - Acme has raised $45 million \
             in Series B funding.</p></div>",
        ))
        .mount(&server)
        .await;

    let outcome = funding_lookup(&server).lookup(&CompanyQuery::new("Acme")).await;
    let fact = match outcome {
        LookupOutcome::Found(fact) => fact,
        other => panic!("expected funding fact, got {:?}", other),
    };

    assert_eq!(fact.amount_or_valuation, "raised $45 million");
    assert_eq!(fact.as_of, chrono::NaiveDate::from_ymd_opt(2025, 1, 12));
    assert!(fact.source_note.starts_with("search results"));
}

#[tokio::test]
async fn test_funding_lookup_not_found() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>Acme opens a new office.</p>"))
        .mount(&server)
        .await;

    let outcome = funding_lookup(&server).lookup(&CompanyQuery::new("Acme")).await;
    assert_eq!(outcome, LookupOutcome::NotFound);
}

#[tokio::test]
async fn test_funding_lookup_server_error_is_transient() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let outcome = funding_lookup(&server).lookup(&CompanyQuery::new("Acme")).await;
    assert!(matches!(outcome, LookupOutcome::TransientError(_)));
    assert!(outcome.into_option().is_none());
}

#[tokio::test]
async fn test_pipeline_from_config_end_to_end() -> Result<()> {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rss/search"))
        .and(query_param("q", "\"Acme\" when:7d"))
        .respond_with(ResponseTemplate::new(200).set_body_string(acme_feed()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rss/search"))
        .and(query_param("q", "\"Bolt\" when:7d"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss_feed(&[])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<p>The company is valued at $3 billion.</p>"),
        )
        .expect(2)
        .mount(&server)
        .await;

    let config = MonitorConfig {
        companies: vec![CompanyQuery::new("Acme"), CompanyQuery::new("Bolt")],
        settings: DigestSettings {
            request_delay_ms: 5,
            funding_delay_ms: 5,
            jitter_ms: 0,
            ..Default::default()
        },
        fetch: test_fetch_config(&server),
    };

    let pipeline = DigestPipeline::from_config(&config)?;
    let report = pipeline.run(&config.companies).await?;
    info!("End-to-end run {} produced {:?}", report.run_id, report.totals);

    let acme = report.section("Acme").expect("Acme should have news");
    assert_eq!(acme.items.len(), 2);
    assert_eq!(acme.items[0].title, "Acme raises $10M");
    assert!(acme.items[0].source.to_lowercase().contains("techcrunch"));
    assert!(acme.items[0].published_at > acme.items[1].published_at);
    assert_eq!(
        acme.funding.as_ref().map(|f| f.amount_or_valuation.as_str()),
        Some("valued at $3 billion")
    );

    assert!(report.is_quiet("Bolt"));
    assert_eq!(report.diagnostics.funding_found, 2);
    assert!(report.diagnostics.source_failures.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_pipeline_from_config_rejects_empty_list() {
    let config = MonitorConfig::default();
    assert!(matches!(
        DigestPipeline::from_config(&config),
        Err(MonitorError::Configuration(_))
    ));
}
