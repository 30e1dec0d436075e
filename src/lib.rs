pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::{MarketplaceConfig, ValuatorConfig};

pub use crate::core::analysis::GeminiClient;
pub use crate::core::fetch::ScraperProxy;
pub use crate::core::pipeline::{
    ValuationEngine, ValuationOutcome, ValuationPipeline, ValuationRequest,
};
pub use crate::domain::model::{DeviceAnalysisResult, DeviceSpec, MarketSnapshot};
pub use crate::utils::error::{Result, ValuationError};
