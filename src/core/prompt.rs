use crate::domain::model::{DeviceSpec, RawContentBundle};

/// Marker embedded verbatim when every marketplace fetch failed; the
/// analysis service is told to fall back to generic domain knowledge.
pub const NO_MARKET_DATA_MARKER: &str = "No marketplace data available";

/// JSON contract for the valuation response. This text is the exact dual
/// of `parse::parse_analysis`; changing a field name here without
/// changing the parser breaks the pipeline.
const ANALYSIS_SCHEMA: &str = r#"{
  "valueMin": <lowest realistic resale price for this condition>,
  "valueMax": <highest realistic resale price for this condition>,
  "confidence": <1-100 based on how many comparable sales support the range>,
  "damageAnalysis": {
    "detected": <true if damage visible, false otherwise>,
    "severity": "<none|minor|moderate|severe>",
    "areas": ["list", "of", "damaged", "areas"],
    "description": "<detailed condition description>"
  },
  "suggestedListing": "<honest listing description mentioning condition>",
  "marketInsights": "<explain the range based on the sales data>"
}"#;

/// JSON contract for the comparison response, dual of
/// `parse::parse_comparison`.
const COMPARISON_SCHEMA: &str = r#"{
  "recentSales": [
    {"price": <price>, "condition": "<Good|Excellent|Fair>", "date": "<when it sold>", "platform": "<marketplace name>"}
  ],
  "averagePrice": <average of the prices>,
  "priceRange": {"min": <lowest price>, "max": <highest price>},
  "demandLevel": "<low|medium|high based on sales volume>"
}"#;

/// Renders bounded, deterministic analysis requests. The only inputs are
/// the device spec and the bundle; the same inputs always produce the
/// same prompt text.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    max_excerpt_chars: usize,
}

impl PromptBuilder {
    pub fn new(max_excerpt_chars: usize) -> Self {
        Self { max_excerpt_chars }
    }

    pub fn build_analysis_prompt(&self, spec: &DeviceSpec, bundle: &RawContentBundle) -> String {
        let mut prompt = String::new();

        prompt.push_str(
            "ANALYZE THIS DEVICE and determine its current used resale value from comparable sales.\n\n",
        );
        if spec.photo_base64.is_some() {
            prompt.push_str(
                "PHOTO PROVIDED: Examine the device carefully for condition, damage, wear, scratches, screen condition.\n\n",
            );
        } else {
            prompt.push_str("NO PHOTO: Assume typical good used condition.\n\n");
        }

        prompt.push_str(&format!("Device: \"{}\"\n", spec.device_name()));
        if let Some(memory) = &spec.memory {
            prompt.push_str(&format!("Memory: {}\n", memory));
        }
        if let Some(accessories) = &spec.accessories {
            prompt.push_str(&format!("Accessories: {}\n", accessories));
        }
        prompt.push('\n');

        self.push_market_section(&mut prompt, bundle);

        prompt.push_str("Return ONLY this JSON format:\n");
        prompt.push_str(ANALYSIS_SCHEMA);
        prompt
    }

    pub fn build_comparison_prompt(
        &self,
        brand: &str,
        model: &str,
        bundle: &RawContentBundle,
    ) -> String {
        let mut prompt = String::new();

        prompt.push_str(&format!(
            "Find recent sold prices for a used \"{} {}\".\n\n",
            brand, model
        ));

        self.push_market_section(&mut prompt, bundle);

        prompt.push_str("Return ONLY this JSON format:\n");
        prompt.push_str(COMPARISON_SCHEMA);
        prompt
    }

    fn push_market_section(&self, prompt: &mut String, bundle: &RawContentBundle) {
        if bundle.is_empty() {
            prompt.push_str(NO_MARKET_DATA_MARKER);
            prompt.push_str(
                ". Estimate from your general knowledge of this device's resale market.\n\n",
            );
            return;
        }

        prompt.push_str("Scraped marketplace listings to base the prices on:\n\n");
        for (name, content) in bundle.iter() {
            prompt.push_str(&format!("=== {} (excerpt) ===\n", name));
            prompt.push_str(truncate_chars(content, self.max_excerpt_chars));
            prompt.push_str("\n\n");
        }
    }
}

/// Truncate to at most `max` characters without splitting a UTF-8
/// character. Truncation keeps prompt cost bounded; no re-extraction.
fn truncate_chars(content: &str, max: usize) -> &str {
    match content.char_indices().nth(max) {
        Some((byte_index, _)) => &content[..byte_index],
        None => content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle_with(entries: &[(&str, &str)]) -> RawContentBundle {
        let mut bundle = RawContentBundle::new();
        for (name, content) in entries {
            bundle.insert(*name, content.to_string());
        }
        bundle
    }

    #[test]
    fn analysis_prompt_embeds_device_identity_and_schema() {
        let mut spec = DeviceSpec::new("Apple", "iPhone 13");
        spec.storage = Some("128GB".to_string());
        let bundle = bundle_with(&[("ebay", "listing content")]);

        let prompt = PromptBuilder::new(9_000).build_analysis_prompt(&spec, &bundle);

        assert!(prompt.contains("Device: \"Apple iPhone 13 128GB\""));
        assert!(prompt.contains("\"valueMin\""));
        assert!(prompt.contains("\"damageAnalysis\""));
        assert!(prompt.contains("\"suggestedListing\""));
        assert!(prompt.contains("=== ebay (excerpt) ==="));
        assert!(prompt.contains("listing content"));
    }

    #[test]
    fn analysis_prompt_flags_missing_photo() {
        let spec = DeviceSpec::new("Apple", "iPhone 13");
        let bundle = RawContentBundle::new();
        let prompt = PromptBuilder::new(9_000).build_analysis_prompt(&spec, &bundle);
        assert!(prompt.contains("NO PHOTO"));

        let mut with_photo = DeviceSpec::new("Apple", "iPhone 13");
        with_photo.photo_base64 = Some("aGk=".to_string());
        let prompt = PromptBuilder::new(9_000).build_analysis_prompt(&with_photo, &bundle);
        assert!(prompt.contains("PHOTO PROVIDED"));
    }

    #[test]
    fn empty_bundle_produces_no_data_marker() {
        let spec = DeviceSpec::new("Apple", "iPhone 13");
        let prompt = PromptBuilder::new(9_000).build_analysis_prompt(&spec, &RawContentBundle::new());
        assert!(prompt.contains(NO_MARKET_DATA_MARKER));
        assert!(!prompt.contains("excerpt"));
    }

    #[test]
    fn excerpts_are_truncated_to_the_configured_cap() {
        let long_content = "x".repeat(20_000);
        let bundle = bundle_with(&[("ebay", &long_content)]);
        let spec = DeviceSpec::new("Apple", "iPhone 13");

        let builder = PromptBuilder::new(9_000);
        let prompt = builder.build_analysis_prompt(&spec, &bundle);

        // Whole prompt stays bounded: template + capped excerpt.
        assert!(prompt.len() < 11_000);
        assert!(prompt.contains(&"x".repeat(9_000)));
        assert!(!prompt.contains(&"x".repeat(9_001)));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let content = "é".repeat(10);
        assert_eq!(truncate_chars(&content, 3), "ééé");
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn prompt_is_deterministic_for_the_same_inputs() {
        let spec = DeviceSpec::new("Apple", "iPhone 13");
        let bundle = bundle_with(&[("swappa", "b"), ("ebay", "a")]);
        let builder = PromptBuilder::new(9_000);

        let first = builder.build_analysis_prompt(&spec, &bundle);
        let second = builder.build_analysis_prompt(&spec, &bundle);
        assert_eq!(first, second);

        // Sources render in name order regardless of insertion order.
        let ebay_pos = first.find("=== ebay").unwrap();
        let swappa_pos = first.find("=== swappa").unwrap();
        assert!(ebay_pos < swappa_pos);
    }

    #[test]
    fn comparison_prompt_carries_its_own_schema() {
        let bundle = bundle_with(&[("ebay", "sold for $200")]);
        let prompt = PromptBuilder::new(9_000).build_comparison_prompt("Apple", "iPhone 13", &bundle);

        assert!(prompt.contains("used \"Apple iPhone 13\""));
        assert!(prompt.contains("\"recentSales\""));
        assert!(prompt.contains("\"demandLevel\""));
        assert!(prompt.contains("sold for $200"));
    }
}
