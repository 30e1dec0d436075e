use crate::config::ValuatorConfig;
use crate::core::fetch::{Marketplace, RawDataAggregator};
use crate::core::parse;
use crate::core::prompt::PromptBuilder;
use crate::core::stats::{self, AggregateHints};
use crate::domain::model::{DeviceAnalysisResult, DeviceSpec, MarketSnapshot};
use crate::domain::ports::{Analyzer, ContentFetcher};
use crate::utils::error::{Result, ValuationError};
use crate::utils::validation::validate_non_empty_string;
use std::time::Duration;

/// The full valuation data pipeline, generic over the two external seams.
/// Each call owns its bundle, prompt, and result; nothing is shared
/// between concurrent requests.
pub struct ValuationPipeline<F: ContentFetcher, A: Analyzer> {
    aggregator: RawDataAggregator<F>,
    analyzer: A,
    prompts: PromptBuilder,
}

impl<F: ContentFetcher + 'static, A: Analyzer> ValuationPipeline<F, A> {
    pub fn new(fetcher: F, analyzer: A, config: &ValuatorConfig) -> Result<Self> {
        let marketplaces = config
            .marketplaces
            .iter()
            .map(Marketplace::compile)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            aggregator: RawDataAggregator::new(
                fetcher,
                marketplaces,
                Duration::from_secs(config.proxy.timeout_seconds),
            ),
            analyzer,
            prompts: PromptBuilder::new(config.prompt.max_excerpt_chars),
        })
    }

    /// Full valuation: scrape, prompt, analyze (with photo if present),
    /// parse and validate. An empty bundle is a legitimate input state;
    /// a failed analysis call is the request's terminal failure.
    pub async fn valuate(&self, spec: &DeviceSpec) -> Result<DeviceAnalysisResult> {
        let device_name = spec.device_name();
        let collected = self.aggregator.collect(&device_name.to_lowercase()).await;

        tracing::info!(
            "🔍 {}: {}/{} marketplaces answered",
            device_name,
            collected.bundle.len(),
            self.aggregator.marketplace_count()
        );

        let prompt = self.prompts.build_analysis_prompt(spec, &collected.bundle);
        let response = self
            .analyzer
            .analyze(&prompt, spec.photo_base64.as_deref())
            .await?;

        parse::parse_analysis(&response, &device_name)
    }

    /// Market comparison: same collection and analysis path, but the
    /// result is a snapshot of comparable sales with no condition
    /// judgment.
    pub async fn compare(&self, brand: &str, model: &str) -> Result<MarketSnapshot> {
        let device_name = format!("{} {}", brand, model);
        let collected = self.aggregator.collect(&device_name.to_lowercase()).await;

        tracing::info!(
            "🔍 {}: {}/{} marketplaces answered",
            device_name,
            collected.bundle.len(),
            self.aggregator.marketplace_count()
        );

        let prompt = self
            .prompts
            .build_comparison_prompt(brand, model, &collected.bundle);
        let response = self.analyzer.analyze(&prompt, None).await?;

        parse::parse_comparison(&response)
    }

    /// Scraped-prices-only snapshot, no AI call. Returns `None` when the
    /// marketplaces yielded nothing usable.
    pub async fn scan(&self, brand: &str, model: &str) -> Result<Option<MarketSnapshot>> {
        let device_name = format!("{} {}", brand, model).to_lowercase();
        let collected = self.aggregator.collect(&device_name).await;

        if collected.observations.is_empty() {
            return Ok(None);
        }
        let snapshot = stats::summarize(collected.observations, AggregateHints::default())?;
        Ok(Some(snapshot))
    }
}

/// One inbound request.
#[derive(Debug, Clone)]
pub enum ValuationRequest {
    Valuate(DeviceSpec),
    Compare { brand: String, model: String },
}

impl ValuationRequest {
    fn validate(&self) -> Result<()> {
        let (brand, model) = match self {
            ValuationRequest::Valuate(spec) => (spec.brand.as_str(), spec.model.as_str()),
            ValuationRequest::Compare { brand, model } => (brand.as_str(), model.as_str()),
        };
        if validate_non_empty_string("brand", brand).is_err()
            || validate_non_empty_string("model", model).is_err()
        {
            return Err(ValuationError::ValidationError {
                message: "brand and model are required".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum ValuationOutcome {
    Analysis(DeviceAnalysisResult),
    Snapshot(MarketSnapshot),
}

/// Runs one request through the pipeline with stage logging.
pub struct ValuationEngine<F: ContentFetcher, A: Analyzer> {
    pipeline: ValuationPipeline<F, A>,
}

impl<F: ContentFetcher + 'static, A: Analyzer> ValuationEngine<F, A> {
    pub fn new(pipeline: ValuationPipeline<F, A>) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self, request: ValuationRequest) -> Result<ValuationOutcome> {
        request.validate()?;

        match request {
            ValuationRequest::Valuate(spec) => {
                tracing::info!("🚀 Valuating {}", spec.device_name());
                let analysis = self.pipeline.valuate(&spec).await?;
                tracing::info!(
                    "✅ Valuation complete: {}-{} ({}% confidence)",
                    analysis.value_min,
                    analysis.value_max,
                    analysis.confidence
                );
                Ok(ValuationOutcome::Analysis(analysis))
            }
            ValuationRequest::Compare { brand, model } => {
                tracing::info!("🚀 Comparing market for {} {}", brand, model);
                let snapshot = self.pipeline.compare(&brand, &model).await?;
                tracing::info!(
                    "✅ Comparison complete: {} sales, average {}",
                    snapshot.recent_sales.len(),
                    snapshot.average_price
                );
                Ok(ValuationOutcome::Snapshot(snapshot))
            }
        }
    }
}
