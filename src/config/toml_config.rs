use crate::utils::error::{Result, ValuationError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full pipeline configuration. Loadable from a TOML file with `${ENV}`
/// substitution; `Default` carries the built-in marketplace rule sets so
/// the CLI works with no config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuatorConfig {
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default = "default_marketplaces", rename = "marketplace")]
    pub marketplaces: Vec<MarketplaceConfig>,
}

impl Default for ValuatorConfig {
    fn default() -> Self {
        Self {
            proxy: ProxyConfig::default(),
            analysis: AnalysisConfig::default(),
            prompt: PromptConfig::default(),
            marketplaces: default_marketplaces(),
        }
    }
}

/// Scraping/render proxy settings. The credential comes from the config
/// file (usually via `${SCRAPER_API_KEY}`) or straight from the
/// environment when the file omits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_proxy_endpoint")]
    pub endpoint: String,
    pub api_key: Option<String>,
    #[serde(default = "default_fetch_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            endpoint: default_proxy_endpoint(),
            api_key: None,
            timeout_seconds: default_fetch_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_analysis_endpoint")]
    pub endpoint: String,
    pub api_key: Option<String>,
    #[serde(default = "default_analysis_model")]
    pub model: String,
    /// Low randomness keeps numeric output reproducible-ish.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: default_analysis_endpoint(),
            api_key: None,
            model: default_analysis_model(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Hard per-source cap on raw content embedded in a prompt.
    #[serde(default = "default_max_excerpt_chars")]
    pub max_excerpt_chars: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_excerpt_chars: default_max_excerpt_chars(),
        }
    }
}

/// One marketplace: where to search and how to recognize prices in the
/// fetched page. `search_url` must contain a `{query}` placeholder; each
/// pattern's first capture group is the numeric price token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    pub name: String,
    pub search_url: String,
    pub patterns: Vec<String>,
    #[serde(default = "default_max_observations")]
    pub max_observations: usize,
}

fn default_proxy_endpoint() -> String {
    "https://api.scraperapi.com/".to_string()
}

fn default_fetch_timeout() -> u64 {
    60
}

fn default_analysis_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_analysis_model() -> String {
    "gemini-1.5-pro".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_output_tokens() -> u32 {
    2048
}

fn default_max_excerpt_chars() -> usize {
    9_000
}

fn default_max_observations() -> usize {
    15
}

fn default_marketplaces() -> Vec<MarketplaceConfig> {
    vec![
        MarketplaceConfig {
            name: "ebay".to_string(),
            search_url: "https://www.ebay.com/sch/i.html?_nkw={query}+unlocked+used&LH_ItemCondition=3000&_sacat=0&rt=nc&LH_Sold=1&LH_PrefLoc=1".to_string(),
            patterns: vec![
                r#"class="s-item__price[^"]*">\$([0-9,]+(?:\.[0-9]{2})?)</span>"#.to_string(),
                r#""price":\s*"[^"]*\$([0-9,]+(?:\.[0-9]{2})?)""#.to_string(),
                r#"\$([0-9,]+(?:\.[0-9]{2})?)</span>"#.to_string(),
                r#"s-item__price[^>]*>\$([0-9,]+(?:\.[0-9]{2})?)"#.to_string(),
                r#"(?i)Sold\s+for[^$]*\$([0-9,]+(?:\.[0-9]{2})?)"#.to_string(),
            ],
            max_observations: 15,
        },
        MarketplaceConfig {
            name: "swappa".to_string(),
            search_url: "https://swappa.com/buy/{query}".to_string(),
            patterns: vec![
                r#"class="price[^"]*">\$([0-9,]+(?:\.[0-9]{2})?)</[^>]+>"#.to_string(),
                r#"\$([0-9,]+(?:\.[0-9]{2})?)\s*<[^>]*class="[^"]*price"#.to_string(),
                r#"data-price="([0-9,]+(?:\.[0-9]{2})?)""#.to_string(),
                r#"<span[^>]*>\$([0-9,]+(?:\.[0-9]{2})?)</span>"#.to_string(),
            ],
            max_observations: 10,
        },
    ]
}

impl ValuatorConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ValuationError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ValuationError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR_NAME}` with the environment value; unresolved
    /// placeholders are left in place so validation can flag them.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    /// Proxy credential, preferring the config file over the environment.
    /// `None` is not fatal here: the aggregator degrades to an empty
    /// bundle when the proxy is unusable.
    pub fn proxy_api_key(&self) -> Option<String> {
        resolve_credential(self.proxy.api_key.as_deref(), "SCRAPER_API_KEY")
    }

    /// Analysis credential. Absence is fatal at request time, before any
    /// network call.
    pub fn analysis_api_key(&self) -> Option<String> {
        resolve_credential(self.analysis.api_key.as_deref(), "GEMINI_API_KEY")
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("proxy.endpoint", &self.proxy.endpoint)?;
        validation::validate_url("analysis.endpoint", &self.analysis.endpoint)?;
        validation::validate_positive_number(
            "proxy.timeout_seconds",
            self.proxy.timeout_seconds as usize,
            1,
        )?;
        validation::validate_non_empty_string("analysis.model", &self.analysis.model)?;
        validation::validate_range("analysis.temperature", self.analysis.temperature, 0.0, 2.0)?;
        validation::validate_positive_number(
            "analysis.max_output_tokens",
            self.analysis.max_output_tokens as usize,
            1,
        )?;
        validation::validate_positive_number(
            "prompt.max_excerpt_chars",
            self.prompt.max_excerpt_chars,
            100,
        )?;

        for marketplace in &self.marketplaces {
            validation::validate_non_empty_string("marketplace.name", &marketplace.name)?;
            if !marketplace.search_url.contains("{query}") {
                return Err(ValuationError::InvalidConfigValueError {
                    field: format!("marketplace.{}.search_url", marketplace.name),
                    value: marketplace.search_url.clone(),
                    reason: "search_url must contain a {query} placeholder".to_string(),
                });
            }
            if marketplace.patterns.is_empty() {
                return Err(ValuationError::InvalidConfigValueError {
                    field: format!("marketplace.{}.patterns", marketplace.name),
                    value: String::new(),
                    reason: "at least one price pattern is required".to_string(),
                });
            }
            validation::validate_positive_number(
                "marketplace.max_observations",
                marketplace.max_observations,
                1,
            )?;
        }

        Ok(())
    }
}

fn resolve_credential(configured: Option<&str>, env_name: &str) -> Option<String> {
    match configured {
        // An unresolved ${...} placeholder means the env var was missing.
        Some(value) if !value.is_empty() && !value.starts_with("${") => Some(value.to_string()),
        _ => std::env::var(env_name).ok().filter(|v| !v.is_empty()),
    }
}

impl Validate for ValuatorConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
