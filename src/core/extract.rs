use crate::config::MarketplaceConfig;
use crate::domain::model::PriceObservation;
use crate::utils::error::{Result, ValuationError};
use regex::Regex;
use std::collections::HashSet;

/// Plausibility bounds for a single used-device price. Anything outside is
/// page noise (shipping costs, item counts, accessory prices, ad copy).
pub const MIN_PLAUSIBLE_PRICE: f64 = 50.0;
pub const MAX_PLAUSIBLE_PRICE: f64 = 5_000.0;

/// One extraction capability: a pattern whose first capture group is the
/// numeric price token. Rules are independent and applied in order.
#[derive(Debug, Clone)]
pub struct PriceRule {
    pattern: Regex,
}

impl PriceRule {
    pub fn new(pattern: &str) -> Result<Self> {
        let compiled =
            Regex::new(pattern).map_err(|e| ValuationError::InvalidConfigValueError {
                field: "marketplace.patterns".to_string(),
                value: pattern.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { pattern: compiled })
    }
}

/// The ordered pattern rules for one marketplace, plus its per-extraction
/// observation cap.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<PriceRule>,
    max_observations: usize,
}

impl RuleSet {
    pub fn compile(config: &MarketplaceConfig) -> Result<Self> {
        let rules = config
            .patterns
            .iter()
            .map(|pattern| PriceRule::new(pattern))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            rules,
            max_observations: config.max_observations,
        })
    }

    /// Scan raw marketplace content for plausible price observations.
    ///
    /// Never fails: malformed or empty input yields an empty list, which
    /// upstream treats as "no data" for this source. Values are
    /// deduplicated exactly within one call (rule order decides which
    /// duplicate is kept) and capped to bound prompt size downstream.
    pub fn extract(&self, raw_content: &str, source_label: &str) -> Vec<PriceObservation> {
        let mut seen: HashSet<i64> = HashSet::new();
        let mut observations = Vec::new();

        for rule in &self.rules {
            for caps in rule.pattern.captures_iter(raw_content) {
                let token = match caps.get(1) {
                    Some(m) => m.as_str(),
                    None => continue,
                };
                let price = match parse_price_token(token) {
                    Some(p) => p,
                    None => continue,
                };
                if !(MIN_PLAUSIBLE_PRICE..=MAX_PLAUSIBLE_PRICE).contains(&price) {
                    continue;
                }
                if !seen.insert(price_key(price)) {
                    continue;
                }
                observations.push(PriceObservation {
                    price,
                    source: source_label.to_string(),
                    condition: None,
                    recency: None,
                });
                if observations.len() >= self.max_observations {
                    return observations;
                }
            }
        }

        observations
    }
}

/// Strip thousands separators and parse the numeric token.
fn parse_price_token(token: &str) -> Option<f64> {
    token.replace(',', "").parse::<f64>().ok()
}

/// Exact-value dedup key in integer cents; avoids hashing floats.
fn price_key(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ebay_rules() -> RuleSet {
        let config = crate::config::toml_config::ValuatorConfig::default();
        RuleSet::compile(&config.marketplaces[0]).unwrap()
    }

    const EBAY_FIXTURE: &str = r#"
        <li class="s-item">
            <span class="s-item__price">$299.99</span>
        </li>
        <li class="s-item">
            <span class="s-item__price">$1,150.00</span>
        </li>
        <li class="s-item">
            <span class="s-item__price">$299.99</span>
        </li>
        <div>Sold for $340.00 on a recent listing</div>
        <span class="s-item__shipping">$5.99</span>
    "#;

    #[test]
    fn extracts_prices_from_listing_markup() {
        let observations = ebay_rules().extract(EBAY_FIXTURE, "ebay");
        let prices: Vec<f64> = observations.iter().map(|o| o.price).collect();

        assert!(prices.contains(&299.99));
        assert!(prices.contains(&1150.0));
        assert!(prices.contains(&340.0));
        assert!(observations.iter().all(|o| o.source == "ebay"));
    }

    #[test]
    fn deduplicates_exact_values_within_one_call() {
        let observations = ebay_rules().extract(EBAY_FIXTURE, "ebay");
        let count_299 = observations.iter().filter(|o| o.price == 299.99).count();
        assert_eq!(count_299, 1);
    }

    #[test]
    fn rejects_prices_outside_plausible_bounds() {
        let raw = r#"
            <span class="s-item__price">$5.99</span>
            <span class="s-item__price">$49.99</span>
            <span class="s-item__price">$50.00</span>
            <span class="s-item__price">$5,000.00</span>
            <span class="s-item__price">$9,999.00</span>
        "#;
        let observations = ebay_rules().extract(raw, "ebay");
        let prices: Vec<f64> = observations.iter().map(|o| o.price).collect();

        assert_eq!(prices, vec![50.0, 5000.0]);
    }

    #[test]
    fn strips_thousands_separators() {
        let raw = r#"<span class="s-item__price">$1,234.56</span>"#;
        let observations = ebay_rules().extract(raw, "ebay");
        assert_eq!(observations[0].price, 1234.56);
    }

    #[test]
    fn caps_observations_per_source() {
        let mut raw = String::new();
        for i in 0..40 {
            raw.push_str(&format!(
                r#"<span class="s-item__price">${}.00</span>"#,
                100 + i
            ));
        }
        let observations = ebay_rules().extract(&raw, "ebay");
        assert_eq!(observations.len(), 15);
    }

    #[test]
    fn malformed_input_yields_empty_list() {
        let rules = ebay_rules();
        assert!(rules.extract("", "ebay").is_empty());
        assert!(rules.extract("<<<<>>>> not html $ at all", "ebay").is_empty());
        assert!(rules.extract("no prices here", "ebay").is_empty());
    }

    #[test]
    fn extraction_is_idempotent() {
        let rules = ebay_rules();
        let first = rules.extract(EBAY_FIXTURE, "ebay");
        let second = rules.extract(EBAY_FIXTURE, "ebay");
        assert_eq!(first, second);
    }

    #[test]
    fn sold_for_phrasing_is_case_insensitive() {
        let raw = "SOLD FOR $225.00 last week";
        let observations = ebay_rules().extract(raw, "ebay");
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].price, 225.0);
    }

    #[test]
    fn swappa_rules_match_data_price_attributes() {
        let config = crate::config::toml_config::ValuatorConfig::default();
        let rules = RuleSet::compile(&config.marketplaces[1]).unwrap();

        let raw = r#"
            <div class="listing" data-price="410.00">Pixel 8</div>
            <span class="price">$395.00</span></div>
        "#;
        let observations = rules.extract(raw, "swappa");
        let prices: Vec<f64> = observations.iter().map(|o| o.price).collect();
        assert!(prices.contains(&410.0));
        assert!(prices.contains(&395.0));
    }

    #[test]
    fn bad_pattern_fails_compilation() {
        let config = MarketplaceConfig {
            name: "broken".to_string(),
            search_url: "https://example.com/{query}".to_string(),
            patterns: vec!["([unclosed".to_string()],
            max_observations: 15,
        };
        assert!(RuleSet::compile(&config).is_err());
    }
}
