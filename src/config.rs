use std::path::PathBuf;

use crate::error::{AppError, Result};

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const MODEL_NAME: &str = "llama3.2";

/// Price bounds shared by the price parser and anything validating prices.
/// Parsed prices are always clamped into `[MIN_PRICE, MAX_PRICE]`.
pub const MIN_PRICE: f64 = 0.01;
pub const MAX_PRICE: f64 = 0.99;

/// Returned by the price parser when no number can be found.
pub const DEFAULT_PRICE: f64 = 0.5;

/// Default grouping threshold handed to the matcher (0-100).
pub const MIN_CONFIDENCE_THRESHOLD: f64 = 50.0;

/// Rows strictly above this confidence count as high confidence in the summary.
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 80.0;

/// Containers inspected per site page.
pub const MAX_LISTINGS_PER_SITE: usize = 10;

/// Generic pages keep at most this many text snippets, each shorter than `MAX_SNIPPET_LEN`.
pub const MAX_GENERIC_SNIPPETS: usize = 5;
pub const MAX_SNIPPET_LEN: usize = 200;

/// Fetch retry backoff values in milliseconds. Attempts past the end reuse the last value.
pub const RETRY_BACKOFF_MS: &[u64] = &[500, 1000, 2000];

pub const OUTPUT_CSV: &str = "unified_prediction_markets.csv";
pub const FALLBACK_CSV: &str = "unified_prediction_markets_fallback.csv";
pub const ERROR_CSV: &str = "unified_prediction_markets_error.csv";

/// Source tag attached to clusters recovered by field scraping.
pub const EXTRACTED_SOURCE: &str = "extracted";

/// Display name used when a cluster or member has none.
pub const UNKNOWN_NAME: &str = "Unknown";

pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// CSS selectors used to pull listings out of a site's page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSelectors {
    /// One element per market.
    pub container: String,
    /// Market title, searched inside the container.
    pub name: String,
    /// Price or probability text, searched inside the container.
    pub price: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    pub name: String,
    pub url: String,
    /// Category tag attached to every listing from this site.
    pub category: String,
    /// `None` = unknown layout; only the page title and a few snippets are kept.
    pub selectors: Option<SiteSelectors>,
}

impl SiteConfig {
    fn known(name: &str, url: &str, category: &str, container: &str, title: &str, price: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            category: category.to_string(),
            selectors: Some(SiteSelectors {
                container: container.to_string(),
                name: title.to_string(),
                price: price.to_string(),
            }),
        }
    }
}

/// The prediction market sites scraped by default.
pub fn default_sites() -> Vec<SiteConfig> {
    vec![
        SiteConfig::known(
            "Polymarket",
            "https://www.polymarket.com",
            "politics",
            "[data-testid*='market'], .market-card, .event-card",
            "h3, .title, .market-title",
            ".price, .probability, [data-testid*='price']",
        ),
        SiteConfig::known(
            "Kalshi",
            "https://www.kalshi.com",
            "events",
            ".event, .market, [data-testid*='event']",
            ".event-title, .title, h3",
            ".price, .last-price, [data-testid*='price']",
        ),
        SiteConfig::known(
            "PredictIt",
            "https://www.predictit.org",
            "politics",
            ".market, .contract, [data-testid*='market']",
            ".market-name, .title, h3",
            ".last-price, .price, .buy-price",
        ),
    ]
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Matcher endpoint (OLLAMA_API_BASE)
    pub ollama_base_url: String,
    /// Model used for grouping (MODEL_NAME)
    pub model_name: String,
    /// Directory receiving the CSV artifact (OUTPUT_DIR)
    pub output_dir: PathBuf,
    pub log_level: String,
    /// Grouping threshold handed to the matcher (MIN_CONFIDENCE_THRESHOLD)
    pub min_confidence_threshold: f64,
    /// HTTP timeout for site fetches (SCRAPE_TIMEOUT_SECS)
    pub scrape_timeout_secs: u64,
    /// HTTP timeout for the matcher call (LLM_TIMEOUT_SECS)
    pub llm_timeout_secs: u64,
    /// Fetch attempts per site (MAX_RETRIES)
    pub max_retries: u32,
    /// Sites to scrape. Narrowed with SITES, comma-separated site names.
    pub sites: Vec<SiteConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama_base_url: OLLAMA_BASE_URL.to_string(),
            model_name: MODEL_NAME.to_string(),
            output_dir: PathBuf::from("./output"),
            log_level: "info".to_string(),
            min_confidence_threshold: MIN_CONFIDENCE_THRESHOLD,
            scrape_timeout_secs: 30,
            llm_timeout_secs: 300,
            max_retries: 3,
            sites: default_sites(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let min_confidence_threshold = match std::env::var("MIN_CONFIDENCE_THRESHOLD") {
            Ok(raw) => {
                let v = raw.trim().parse::<f64>().map_err(|_| {
                    AppError::Config("MIN_CONFIDENCE_THRESHOLD must be a number".to_string())
                })?;
                if !(0.0..=100.0).contains(&v) {
                    return Err(AppError::Config(
                        "MIN_CONFIDENCE_THRESHOLD must be between 0 and 100".to_string(),
                    ));
                }
                v
            }
            Err(_) => defaults.min_confidence_threshold,
        };

        let sites = match std::env::var("SITES") {
            Ok(raw) => select_sites(&defaults.sites, &raw)?,
            Err(_) => defaults.sites,
        };

        Ok(Self {
            ollama_base_url: std::env::var("OLLAMA_API_BASE")
                .unwrap_or(defaults.ollama_base_url),
            model_name: std::env::var("MODEL_NAME")
                .map(|m| m.trim_start_matches("ollama/").to_string())
                .unwrap_or(defaults.model_name),
            output_dir: output_dir_from_env(),
            log_level: std::env::var("LOG_LEVEL")
                .map(|l| l.to_lowercase())
                .unwrap_or(defaults.log_level),
            min_confidence_threshold,
            scrape_timeout_secs: std::env::var("SCRAPE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(defaults.scrape_timeout_secs),
            llm_timeout_secs: std::env::var("LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(defaults.llm_timeout_secs),
            max_retries: std::env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .map(|n| n.max(1))
                .unwrap_or(defaults.max_retries),
            sites,
        })
    }
}

/// OUTPUT_DIR on its own, so a run whose other settings are invalid can still
/// place its error artifact where the user asked.
pub fn output_dir_from_env() -> PathBuf {
    output_dir_or_default(std::env::var("OUTPUT_DIR").ok())
}

fn output_dir_or_default(raw: Option<String>) -> PathBuf {
    match raw {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
        _ => Config::default().output_dir,
    }
}

/// Keep the sites named in a comma-separated list (case-insensitive).
fn select_sites(all: &[SiteConfig], raw: &str) -> Result<Vec<SiteConfig>> {
    let wanted: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if wanted.is_empty() {
        return Ok(all.to_vec());
    }

    let mut selected = Vec::new();
    for name in &wanted {
        match all.iter().find(|s| s.name.to_lowercase() == *name) {
            Some(site) => selected.push(site.clone()),
            None => return Err(AppError::Config(format!("unknown site in SITES: {name}"))),
        }
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sites_have_selectors() {
        let sites = default_sites();
        assert_eq!(sites.len(), 3);
        assert!(sites.iter().all(|s| s.selectors.is_some()));
    }

    #[test]
    fn select_sites_filters_case_insensitively() {
        let sites = select_sites(&default_sites(), "kalshi, PREDICTIT").unwrap();
        let names: Vec<_> = sites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Kalshi", "PredictIt"]);
    }

    #[test]
    fn select_sites_rejects_unknown_name() {
        assert!(matches!(
            select_sites(&default_sites(), "nowhere"),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn output_dir_falls_back_only_when_unset_or_blank() {
        assert_eq!(output_dir_or_default(Some("/var/reports".to_string())), PathBuf::from("/var/reports"));
        assert_eq!(output_dir_or_default(Some("  ".to_string())), PathBuf::from("./output"));
        assert_eq!(output_dir_or_default(None), PathBuf::from("./output"));
    }

    #[test]
    fn empty_site_list_keeps_everything() {
        assert_eq!(select_sites(&default_sites(), " , ").unwrap().len(), 3);
    }
}
