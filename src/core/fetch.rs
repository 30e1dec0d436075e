use crate::config::MarketplaceConfig;
use crate::core::extract::RuleSet;
use crate::domain::model::{PriceObservation, RawContentBundle};
use crate::domain::ports::ContentFetcher;
use crate::utils::error::{Result, ValuationError};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// ScraperAPI-style render proxy. The target URL goes through the proxy
/// with rendering enabled so JavaScript-heavy listing pages come back as
/// full markup.
pub struct ScraperProxy {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ScraperProxy {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }
}

#[async_trait]
impl ContentFetcher for ScraperProxy {
    async fn fetch(&self, url: &str) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ValuationError::MissingCredential {
                name: "SCRAPER_API_KEY".to_string(),
            }
        })?;

        let mut proxy_url =
            Url::parse(&self.endpoint).map_err(|e| ValuationError::InvalidConfigValueError {
                field: "proxy.endpoint".to_string(),
                value: self.endpoint.clone(),
                reason: e.to_string(),
            })?;
        proxy_url
            .query_pairs_mut()
            .append_pair("api_key", api_key)
            .append_pair("url", url)
            .append_pair("render", "true");

        let response = self.client.get(proxy_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ValuationError::SourceFetchError {
                reason: format!("proxy returned status {}", status.as_u16()),
            });
        }

        Ok(response.text().await?)
    }
}

/// One marketplace ready for fetching and extraction: compiled rules plus
/// the search URL template.
#[derive(Debug, Clone)]
pub struct Marketplace {
    pub name: String,
    search_url: String,
    rules: RuleSet,
}

impl Marketplace {
    pub fn compile(config: &MarketplaceConfig) -> Result<Self> {
        Ok(Self {
            name: config.name.clone(),
            search_url: config.search_url.clone(),
            rules: RuleSet::compile(config)?,
        })
    }

    /// Substitute the percent-encoded query into the URL template.
    pub fn search_url_for(&self, query: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        self.search_url.replace("{query}", &encoded)
    }

    pub fn extract(&self, raw_content: &str) -> Vec<PriceObservation> {
        self.rules.extract(raw_content, &self.name)
    }
}

/// What one collection pass produced: the raw content of every source
/// that answered, plus whatever price observations the extractor found
/// in them.
#[derive(Debug, Default)]
pub struct CollectedData {
    pub bundle: RawContentBundle,
    pub observations: Vec<PriceObservation>,
}

/// Fans marketplace fetches out concurrently and keeps whatever succeeds.
///
/// Every fetch runs to completion or failure; a dead marketplace never
/// blocks the others, and a request where every source fails still yields
/// an empty bundle rather than an error. Dropping the returned future
/// aborts in-flight fetches (JoinSet aborts its tasks on drop).
pub struct RawDataAggregator<F: ContentFetcher> {
    fetcher: Arc<F>,
    marketplaces: Arc<Vec<Marketplace>>,
    fetch_timeout: Duration,
}

impl<F: ContentFetcher + 'static> RawDataAggregator<F> {
    pub fn new(fetcher: F, marketplaces: Vec<Marketplace>, fetch_timeout: Duration) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            marketplaces: Arc::new(marketplaces),
            fetch_timeout,
        }
    }

    pub fn marketplace_count(&self) -> usize {
        self.marketplaces.len()
    }

    /// Fetch all configured marketplaces for `query` and settle every
    /// call. Sources that fail or return nothing are logged and omitted.
    pub async fn collect(&self, query: &str) -> CollectedData {
        let mut tasks = tokio::task::JoinSet::new();

        for (index, marketplace) in self.marketplaces.iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let url = marketplace.search_url_for(query);
            let timeout = self.fetch_timeout;
            tasks.spawn(async move {
                let outcome = match tokio::time::timeout(timeout, fetcher.fetch(&url)).await {
                    Ok(result) => result,
                    Err(_) => Err(ValuationError::SourceFetchError {
                        reason: format!("timed out after {}s", timeout.as_secs()),
                    }),
                };
                (index, outcome)
            });
        }

        let mut collected = CollectedData::default();
        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) = match joined {
                Ok(settled) => settled,
                Err(e) => {
                    tracing::warn!("⚠️ Marketplace fetch task failed to settle: {}", e);
                    continue;
                }
            };
            let marketplace = &self.marketplaces[index];
            match outcome {
                Ok(content) if content.trim().is_empty() => {
                    tracing::warn!("⚠️ {}: fetch returned no content", marketplace.name);
                }
                Ok(content) => {
                    let observations = marketplace.extract(&content);
                    tracing::info!(
                        "📡 {}: fetched {} chars, extracted {} price points",
                        marketplace.name,
                        content.len(),
                        observations.len()
                    );
                    collected.observations.extend(observations);
                    collected.bundle.insert(marketplace.name.clone(), content);
                }
                Err(e) => {
                    tracing::warn!("⚠️ {}: fetch failed: {}", marketplace.name, e);
                }
            }
        }

        if collected.bundle.is_empty() {
            tracing::warn!("⚠️ No marketplace data collected for '{}'", query);
        }
        collected
    }
}
