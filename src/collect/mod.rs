//! Listing collection from prediction market sites.

pub mod html;

use async_trait::async_trait;
use futures_util::future::join_all;
use tracing::{info, warn};

use crate::config::SiteConfig;
use crate::error::Result;
use crate::types::SiteListings;

pub use html::HtmlCollector;

/// Fetches the listings of one site. A returned error is recorded on that
/// site's [`SiteListings`] and does not stop the other sites.
#[async_trait]
pub trait ListingCollector: Send + Sync {
    async fn collect(&self, site: &SiteConfig) -> Result<SiteListings>;
}

/// Collect every site concurrently. Output order follows `sites`.
pub async fn collect_all<C: ListingCollector + ?Sized>(
    collector: &C,
    sites: &[SiteConfig],
) -> Vec<SiteListings> {
    join_all(sites.iter().map(|site| async move {
        match collector.collect(site).await {
            Ok(listings) => {
                info!(
                    site = %site.name,
                    products = listings.products.len(),
                    "[COLLECT] site scraped"
                );
                listings
            }
            Err(e) => {
                warn!(site = %site.name, "[COLLECT] site failed: {e}");
                SiteListings::failed(&site.name, e.to_string())
            }
        }
    }))
    .await
}
