use crate::utils::error::Result;
use async_trait::async_trait;

/// Outbound seam to the scraping/render proxy. Given a target URL, returns
/// the rendered page content as text. One call per marketplace fetch; the
/// caller decides what a failure means.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Outbound seam to the AI analysis service. Takes the rendered prompt and
/// an optional inline image, returns the raw free-text response. No JSON
/// interpretation happens behind this trait.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, prompt: &str, image_base64: Option<&str>) -> Result<String>;
}
