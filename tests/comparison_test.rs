use httpmock::prelude::*;
use revalue::{
    GeminiClient, ScraperProxy, ValuationEngine, ValuationOutcome, ValuationPipeline,
    ValuationRequest, ValuationError, ValuatorConfig,
};
use serde_json::json;
use std::time::Duration;

fn engine_for(proxy: &MockServer, ai: &MockServer) -> ValuationEngine<ScraperProxy, GeminiClient> {
    let mut config = ValuatorConfig::default();
    config.proxy.endpoint = proxy.base_url();
    config.proxy.timeout_seconds = 5;
    config.analysis.endpoint = ai.base_url();
    config.analysis.model = "test-model".to_string();

    let fetcher = ScraperProxy::new(
        config.proxy.endpoint.clone(),
        Some("proxy-key".to_string()),
        Duration::from_secs(config.proxy.timeout_seconds),
    )
    .unwrap();
    let analyzer = GeminiClient::new(&config.analysis, Some("ai-key".to_string()));
    ValuationEngine::new(ValuationPipeline::new(fetcher, analyzer, &config).unwrap())
}

fn gemini_response(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{"content": {"parts": [{"text": text}]}}]
    })
}

#[tokio::test]
async fn end_to_end_comparison_builds_snapshot() {
    let proxy = MockServer::start();
    let ai = MockServer::start();

    proxy.mock(|when, then| {
        when.method(GET);
        then.status(200)
            .body(r#"<span class="s-item__price">$120.00</span>"#);
    });

    let ai_mock = ai.mock(|when, then| {
        when.method(POST).body_contains("recentSales");
        then.status(200).json_body(gemini_response(
            r#"```json
{
  "recentSales": [
    {"price": 100, "condition": "Good", "date": "3 days ago", "platform": "eBay"},
    {"price": 150, "condition": "Excellent", "date": "1 week ago", "platform": "Swappa"},
    {"price": 200, "condition": "Good", "date": "2 weeks ago", "platform": "eBay"}
  ],
  "priceRange": {"min": 100, "max": 200},
  "demandLevel": "high"
}
```"#,
        ));
    });

    let engine = engine_for(&proxy, &ai);
    let outcome = engine
        .run(ValuationRequest::Compare {
            brand: "Apple".to_string(),
            model: "iPhone 13".to_string(),
        })
        .await
        .unwrap();

    ai_mock.assert();
    match outcome {
        ValuationOutcome::Snapshot(snapshot) => {
            assert_eq!(snapshot.recent_sales.len(), 3);
            // averagePrice was absent, so it is computed from the sales.
            assert_eq!(snapshot.average_price, 150.0);
            assert_eq!(snapshot.price_range.min, 100.0);
            assert_eq!(snapshot.price_range.max, 200.0);
        }
        other => panic!("expected snapshot outcome, got {:?}", other),
    }
}

#[tokio::test]
async fn zero_surviving_observations_is_no_market_data_not_an_empty_snapshot() {
    let proxy = MockServer::start();
    let ai = MockServer::start();

    proxy.mock(|when, then| {
        when.method(GET);
        then.status(500);
    });
    ai.mock(|when, then| {
        when.method(POST);
        then.status(200).json_body(gemini_response(
            r#"{"recentSales": [{"price": 0, "platform": "eBay"}, {"price": -10, "platform": "Swappa"}]}"#,
        ));
    });

    let engine = engine_for(&proxy, &ai);
    let result = engine
        .run(ValuationRequest::Compare {
            brand: "Apple".to_string(),
            model: "iPhone 13".to_string(),
        })
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, ValuationError::NoMarketData));
    assert_eq!(
        err.user_friendly_message(),
        "Could not fetch market data. Please try again."
    );
}

#[tokio::test]
async fn comparison_response_with_trailing_commas_still_parses() {
    let proxy = MockServer::start();
    let ai = MockServer::start();

    proxy.mock(|when, then| {
        when.method(GET);
        then.status(500);
    });
    ai.mock(|when, then| {
        when.method(POST);
        then.status(200).json_body(gemini_response(
            r#"{"recentSales": [{"price": 130, "platform": "eBay"},], "demandLevel": "low",}"#,
        ));
    });

    let engine = engine_for(&proxy, &ai);
    let outcome = engine
        .run(ValuationRequest::Compare {
            brand: "Apple".to_string(),
            model: "iPhone 13".to_string(),
        })
        .await
        .unwrap();

    match outcome {
        ValuationOutcome::Snapshot(snapshot) => {
            assert_eq!(snapshot.recent_sales.len(), 1);
            assert_eq!(snapshot.recent_sales[0].price, 130.0);
        }
        other => panic!("expected snapshot outcome, got {:?}", other),
    }
}

#[tokio::test]
async fn comparison_with_prose_only_response_is_a_parse_error() {
    let proxy = MockServer::start();
    let ai = MockServer::start();

    proxy.mock(|when, then| {
        when.method(GET);
        then.status(500);
    });
    ai.mock(|when, then| {
        when.method(POST);
        then.status(200).json_body(gemini_response(
            "I'm sorry, I could not find any recent sales for that device.",
        ));
    });

    let engine = engine_for(&proxy, &ai);
    let result = engine
        .run(ValuationRequest::Compare {
            brand: "Apple".to_string(),
            model: "iPhone 13".to_string(),
        })
        .await;

    assert!(matches!(result, Err(ValuationError::ParseError { .. })));
}
