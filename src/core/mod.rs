pub mod analysis;
pub mod extract;
pub mod fetch;
pub mod parse;
pub mod pipeline;
pub mod prompt;
pub mod stats;

pub use crate::domain::model::{
    DeviceAnalysisResult, DeviceSpec, MarketSnapshot, PriceObservation, RawContentBundle,
};
pub use crate::domain::ports::{Analyzer, ContentFetcher};
pub use crate::utils::error::Result;
