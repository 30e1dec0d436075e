pub mod toml_config;

pub use toml_config::{MarketplaceConfig, ValuatorConfig};

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "revalue")]
#[command(about = "Estimate a used device's resale value from marketplace data and AI analysis")]
pub struct CliConfig {
    /// Device brand, e.g. "Apple"
    #[arg(long)]
    pub brand: String,

    /// Device model, e.g. "iPhone 13"
    #[arg(long)]
    pub model: String,

    /// Storage size, e.g. "128GB"
    #[arg(long)]
    pub storage: Option<String>,

    /// Memory size, e.g. "8GB"
    #[arg(long, alias = "ram")]
    pub memory: Option<String>,

    /// Included accessories, free text
    #[arg(long)]
    pub accessories: Option<String>,

    /// Path to a JPEG photo of the device
    #[arg(long)]
    pub photo: Option<std::path::PathBuf>,

    /// Market comparison only, no condition-based valuation
    #[arg(long)]
    pub compare: bool,

    /// Path to a TOML config file (built-in defaults when omitted)
    #[arg(long)]
    pub config: Option<std::path::PathBuf>,

    /// Write the result JSON here instead of stdout
    #[arg(long)]
    pub output: Option<std::path::PathBuf>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Load the pipeline configuration this invocation should run with.
    pub fn load_valuator_config(&self) -> Result<ValuatorConfig> {
        match &self.config {
            Some(path) => ValuatorConfig::from_file(path),
            None => Ok(ValuatorConfig::default()),
        }
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("brand", &self.brand)?;
        validation::validate_non_empty_string("model", &self.model)?;
        Ok(())
    }
}
