use crate::core::stats::{self, AggregateHints};
use crate::domain::model::{
    DamageAssessment, DemandLevel, DeviceAnalysisResult, MarketSnapshot, PriceObservation,
    Severity,
};
use crate::utils::error::{Result, ValuationError};
use regex::Regex;
use serde_json::Value;

// Documented fallbacks for a degraded-but-present analysis. The service's
// output is unreliable prose; a missing or non-numeric field gets one of
// these instead of failing the whole result.
pub const FALLBACK_VALUE_MIN: f64 = 200.0;
pub const FALLBACK_VALUE_MAX: f64 = 350.0;
pub const FALLBACK_CONFIDENCE: u32 = 70;
pub const FALLBACK_INSIGHTS: &str = "Based on market comparables";
pub const FALLBACK_DAMAGE_DESCRIPTION: &str = "Good used condition";

const FALLBACK_CONDITION: &str = "Good";
const FALLBACK_RECENCY: &str = "Recently";
const FALLBACK_PLATFORM: &str = "Marketplace";

/// Pull the JSON object out of a noisy free-text response.
///
/// The service wraps its JSON in code fences and commentary more often
/// than not. Strip fences, take the first `{` through the last `}`,
/// repair trailing commas, then parse exactly once; anything still
/// broken after that is a hard parse failure.
pub fn extract_json(text: &str) -> Result<Value> {
    let fence_open = Regex::new(r"(?i)```json\s*").unwrap();
    let fence = Regex::new(r"```\s*").unwrap();
    let stripped = fence.replace_all(&fence_open.replace_all(text, ""), "").into_owned();

    let start = stripped.find('{');
    let end = stripped.rfind('}');
    let candidate = match (start, end) {
        (Some(start), Some(end)) if start < end => &stripped[start..=end],
        _ => {
            return Err(ValuationError::ParseError {
                message: "no JSON object found in response".to_string(),
            })
        }
    };

    let trailing_obj = Regex::new(r",\s*\}").unwrap();
    let trailing_arr = Regex::new(r",\s*\]").unwrap();
    let repaired = trailing_arr
        .replace_all(&trailing_obj.replace_all(candidate, "}"), "]")
        .into_owned();

    serde_json::from_str(&repaired).map_err(|e| ValuationError::ParseError {
        message: format!("invalid JSON in response: {}", e),
    })
}

/// Numeric coercion matching the lenient contract: accept JSON numbers
/// and numeric strings; everything else (including zero) counts as
/// absent so a documented fallback applies. Negative values pass through
/// untouched for the invariant check to judge.
fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| *n != 0.0 && n.is_finite())
}

fn coerce_string(value: &Value, fallback: &str) -> String {
    match value.as_str() {
        Some(s) if !s.trim().is_empty() => s.to_string(),
        _ => fallback.to_string(),
    }
}

/// Parse and validate a valuation response into a typed result.
///
/// Field-level problems degrade to fallbacks; the price-ordering
/// invariant does not. A response claiming min > max (or a negative min)
/// fails hard, because the direction of any correction would be a guess.
pub fn parse_analysis(text: &str, device_name: &str) -> Result<DeviceAnalysisResult> {
    let parsed = extract_json(text)?;

    let value_min = coerce_number(&parsed["valueMin"]).unwrap_or(FALLBACK_VALUE_MIN);
    let value_max = coerce_number(&parsed["valueMax"]).unwrap_or(FALLBACK_VALUE_MAX);
    let confidence = match coerce_number(&parsed["confidence"]) {
        Some(c) => (c.round() as i64).clamp(1, 100) as u32,
        None => FALLBACK_CONFIDENCE,
    };

    let damage_value = &parsed["damageAnalysis"];
    let damage = DamageAssessment {
        detected: damage_value["detected"].as_bool().unwrap_or(false),
        severity: Severity::parse(damage_value["severity"].as_str().unwrap_or("none")),
        areas: damage_value["areas"]
            .as_array()
            .map(|areas| {
                areas
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default(),
        description: coerce_string(&damage_value["description"], FALLBACK_DAMAGE_DESCRIPTION),
    };

    let suggested_listing = coerce_string(
        &parsed["suggestedListing"],
        &format!("{} in good condition", device_name),
    );
    let market_insights = coerce_string(&parsed["marketInsights"], FALLBACK_INSIGHTS);

    DeviceAnalysisResult::new(
        value_min,
        value_max,
        confidence,
        damage,
        suggested_listing,
        market_insights,
    )
}

/// Parse a market-comparison response into a snapshot.
///
/// Observations with non-positive prices are dropped; zero survivors is
/// "no market data", a terminal failure rather than an empty snapshot.
pub fn parse_comparison(text: &str) -> Result<MarketSnapshot> {
    let parsed = extract_json(text)?;

    let sales: Vec<PriceObservation> = parsed["recentSales"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .map(|sale| PriceObservation {
                    price: coerce_number(&sale["price"]).unwrap_or(0.0),
                    source: coerce_string(&sale["platform"], FALLBACK_PLATFORM),
                    condition: Some(coerce_string(&sale["condition"], FALLBACK_CONDITION)),
                    recency: Some(coerce_string(&sale["date"], FALLBACK_RECENCY)),
                })
                .filter(|sale| sale.price > 0.0)
                .collect()
        })
        .unwrap_or_default();

    if sales.is_empty() {
        return Err(ValuationError::NoMarketData);
    }

    let hints = AggregateHints {
        average_price: coerce_number(&parsed["averagePrice"]),
        price_min: coerce_number(&parsed["priceRange"]["min"]),
        price_max: coerce_number(&parsed["priceRange"]["max"]),
        demand_level: parsed["demandLevel"].as_str().map(DemandLevel::parse),
    };

    stats::summarize(sales, hints)
}
