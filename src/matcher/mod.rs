//! Cross-site grouping of collected listings.

pub mod ollama;
pub mod prompt;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::SiteListings;

pub use ollama::OllamaMatcher;

/// Proposes clusters for a set of listings.
///
/// Returns the raw response text. It is nominally a JSON object with a
/// `unified_products` list but may be wrapped in prose or truncated.
#[async_trait]
pub trait ProductMatcher: Send + Sync {
    async fn match_products(&self, listings: &[SiteListings], min_confidence: f64) -> Result<String>;
}
