use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Listings (scraper output)
// ---------------------------------------------------------------------------

/// One market as scraped from a single site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    pub name: String,
    pub description: String,
    pub price: f64,
    /// 0-100
    pub probability: f64,
    pub category: String,
    pub source: String,
}

/// Everything collected from one site. `error` is set when the site could not be scraped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteListings {
    pub website_name: String,
    #[serde(default)]
    pub products: Vec<RawListing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Page title, kept for sites without a known layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Short text snippets, kept for sites without a known layout.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<String>,
}

impl SiteListings {
    pub fn failed(website_name: &str, reason: impl Into<String>) -> Self {
        Self {
            website_name: website_name.to_string(),
            error: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    FinancialMarkets,
    Politics,
    Sports,
    Awards,
    Other,
    /// Only used by fallback and error rows; the classifier never returns it.
    Error,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Category::FinancialMarkets => "Financial Markets",
            Category::Politics => "Politics",
            Category::Sports => "Sports",
            Category::Awards => "Awards",
            Category::Other => "Other",
            Category::Error => "Error",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Clusters
// ---------------------------------------------------------------------------

/// A source listing referenced from inside a cluster.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductRef {
    /// The matcher only gave a display name.
    BareName(String),
    /// The matcher gave a record; `price` is `None` when absent or not numeric.
    Structured { name: String, price: Option<f64> },
}

impl ProductRef {
    pub fn display_name(&self) -> &str {
        match self {
            ProductRef::BareName(name) => name,
            ProductRef::Structured { name, .. } => name,
        }
    }

    pub fn price(&self) -> Option<f64> {
        match self {
            ProductRef::BareName(_) => None,
            ProductRef::Structured { price, .. } => *price,
        }
    }
}

/// Where a cluster came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterOrigin {
    /// Parsed from a well-formed matcher record.
    Matched,
    /// Rebuilt from regex field scraping of a broken payload. Lossy.
    Extracted,
}

/// A group of listings judged to be the same event across sources.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Never empty.
    pub unified_name: String,
    pub members: Vec<ProductRef>,
    /// Used only when no member carries its own price.
    pub group_average_price: f64,
    /// 0-100
    pub confidence_level: f64,
    /// Distinct, in first-seen order.
    pub sources: Vec<String>,
    pub origin: ClusterOrigin,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClusterStats {
    pub average_price: f64,
    /// Sample standard deviation of member prices.
    pub price_variance: f64,
    pub min_price: f64,
    pub max_price: f64,
    /// Number of members, not distinct sources.
    pub source_count: usize,
}

/// A cluster with everything the report needs about it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedCluster {
    pub cluster: Cluster,
    pub stats: ClusterStats,
    pub category: Category,
}
