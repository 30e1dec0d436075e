use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::utils::error::{Result, ValuationError};

/// Identifies the device being valued. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub brand: String,
    pub model: String,
    pub storage: Option<String>,
    pub memory: Option<String>,
    pub accessories: Option<String>,
    /// JPEG photo bytes, base64-encoded at the boundary.
    pub photo_base64: Option<String>,
}

impl DeviceSpec {
    pub fn new(brand: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            brand: brand.into(),
            model: model.into(),
            storage: None,
            memory: None,
            accessories: None,
            photo_base64: None,
        }
    }

    /// Human-readable device identity, e.g. `Apple iPhone 13 128GB`.
    pub fn device_name(&self) -> String {
        match &self.storage {
            Some(storage) => format!("{} {} {}", self.brand, self.model, storage),
            None => format!("{} {}", self.brand, self.model),
        }
    }
}

/// One extracted or AI-reported price point. Produced only by the price
/// extractor or the response parser, never taken from user input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub price: f64,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recency: Option<String>,
}

/// Raw page content per marketplace, keyed by marketplace name. Only
/// sources that fetched successfully and returned content are present; a
/// missing key means that source failed or came back empty. Iteration
/// order is alphabetical so prompt rendering is deterministic.
#[derive(Debug, Clone, Default)]
pub struct RawContentBundle {
    sources: BTreeMap<String, String>,
}

impl RawContentBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, marketplace: impl Into<String>, content: String) {
        self.sources.insert(marketplace.into(), content);
    }

    pub fn get(&self, marketplace: &str) -> Option<&str> {
        self.sources.get(marketplace).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sources
            .iter()
            .map(|(name, content)| (name.as_str(), content.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Minor,
    Moderate,
    Severe,
}

impl Severity {
    /// Unknown labels coerce to `None`; the analysis service is free text
    /// and not trusted to stay on-vocabulary.
    pub fn parse(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "minor" => Severity::Minor,
            "moderate" => Severity::Moderate,
            "severe" => Severity::Severe,
            _ => Severity::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageAssessment {
    pub detected: bool,
    pub severity: Severity,
    pub areas: Vec<String>,
    pub description: String,
}

/// Final valuation produced by the response parser. The price-ordering
/// invariant is enforced here, at construction: a violation is a
/// validation failure, never a silent correction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAnalysisResult {
    pub value_min: f64,
    pub value_max: f64,
    pub confidence: u32,
    #[serde(rename = "damageAnalysis")]
    pub damage: DamageAssessment,
    pub suggested_listing: String,
    pub market_insights: String,
}

impl DeviceAnalysisResult {
    pub fn new(
        value_min: f64,
        value_max: f64,
        confidence: u32,
        damage: DamageAssessment,
        suggested_listing: String,
        market_insights: String,
    ) -> Result<Self> {
        if value_min < 0.0 || value_min > value_max {
            return Err(ValuationError::ValidationError {
                message: format!("invalid price range: min {} max {}", value_min, value_max),
            });
        }
        if !(1..=100).contains(&confidence) {
            return Err(ValuationError::ValidationError {
                message: format!("confidence {} outside 1-100", confidence),
            });
        }
        Ok(Self {
            value_min,
            value_max,
            confidence,
            damage,
            suggested_listing,
            market_insights,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemandLevel {
    Low,
    Medium,
    High,
}

impl DemandLevel {
    pub fn parse(label: &str) -> Self {
        match label.to_ascii_lowercase().as_str() {
            "low" => DemandLevel::Low,
            "high" => DemandLevel::High,
            _ => DemandLevel::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// Summary of recent comparable sales. Built fresh per request; this core
/// never caches or persists snapshots.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub recent_sales: Vec<PriceObservation>,
    pub average_price: f64,
    pub price_range: PriceRange,
    pub demand_level: DemandLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_name_includes_storage_when_present() {
        let mut spec = DeviceSpec::new("Apple", "iPhone 13");
        assert_eq!(spec.device_name(), "Apple iPhone 13");

        spec.storage = Some("128GB".to_string());
        assert_eq!(spec.device_name(), "Apple iPhone 13 128GB");
    }

    #[test]
    fn analysis_result_rejects_inverted_range() {
        let damage = DamageAssessment {
            detected: false,
            severity: Severity::None,
            areas: vec![],
            description: "Good used condition".to_string(),
        };

        let result = DeviceAnalysisResult::new(
            100.0,
            50.0,
            70,
            damage,
            "listing".to_string(),
            "insights".to_string(),
        );
        assert!(matches!(
            result,
            Err(ValuationError::ValidationError { .. })
        ));
    }

    #[test]
    fn analysis_result_rejects_negative_min() {
        let damage = DamageAssessment {
            detected: false,
            severity: Severity::None,
            areas: vec![],
            description: String::new(),
        };

        let result =
            DeviceAnalysisResult::new(-1.0, 50.0, 70, damage, String::new(), String::new());
        assert!(result.is_err());
    }

    #[test]
    fn analysis_result_rejects_out_of_range_confidence() {
        let damage = DamageAssessment {
            detected: false,
            severity: Severity::None,
            areas: vec![],
            description: String::new(),
        };

        assert!(DeviceAnalysisResult::new(
            100.0,
            200.0,
            0,
            damage.clone(),
            String::new(),
            String::new()
        )
        .is_err());
        assert!(
            DeviceAnalysisResult::new(100.0, 200.0, 101, damage, String::new(), String::new())
                .is_err()
        );
    }

    #[test]
    fn severity_parse_coerces_unknown_labels() {
        assert_eq!(Severity::parse("Moderate"), Severity::Moderate);
        assert_eq!(Severity::parse("catastrophic"), Severity::None);
    }

    #[test]
    fn bundle_iterates_in_name_order() {
        let mut bundle = RawContentBundle::new();
        bundle.insert("swappa", "b".to_string());
        bundle.insert("ebay", "a".to_string());

        let names: Vec<&str> = bundle.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["ebay", "swappa"]);
    }

    #[test]
    fn analysis_result_serializes_with_api_field_names() {
        let damage = DamageAssessment {
            detected: true,
            severity: Severity::Minor,
            areas: vec!["screen".to_string()],
            description: "Light scratches".to_string(),
        };
        let result = DeviceAnalysisResult::new(
            200.0,
            350.0,
            80,
            damage,
            "listing".to_string(),
            "insights".to_string(),
        )
        .unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["valueMin"], 200.0);
        assert_eq!(json["valueMax"], 350.0);
        assert_eq!(json["damageAnalysis"]["severity"], "minor");
        assert_eq!(json["suggestedListing"], "listing");
    }
}
