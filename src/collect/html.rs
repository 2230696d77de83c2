use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::collect::ListingCollector;
use crate::config::{
    Config, SiteConfig, SiteSelectors, MAX_GENERIC_SNIPPETS, MAX_LISTINGS_PER_SITE,
    MAX_SNIPPET_LEN, RETRY_BACKOFF_MS, USER_AGENT,
};
use crate::error::{AppError, Result};
use crate::pricing::parse_price;
use crate::types::{RawListing, SiteListings};

/// Selectors used for pages without a known layout.
const GENERIC_SNIPPET_SELECTOR: &str = "[class*='market'], [class*='price'], [class*='bet']";

/// Plain HTTP + CSS selector scraper. Does not run page JavaScript, so
/// client-rendered sites may yield no listings.
pub struct HtmlCollector {
    client: reqwest::Client,
    max_retries: u32,
}

impl HtmlCollector {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.scrape_timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, max_retries: cfg.max_retries.max(1) })
    }

    async fn fetch_html(&self, site: &SiteConfig) -> Result<String> {
        let resp = self.client.get(&site.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Scrape {
                site: site.name.clone(),
                reason: format!("HTTP {status}"),
            });
        }
        Ok(resp.text().await?)
    }

    async fn fetch_with_retries(&self, site: &SiteConfig) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.fetch_html(site).await {
                Ok(html) => return Ok(html),
                Err(e) if attempt >= self.max_retries => return Err(e),
                Err(e) => {
                    let delay_ms = RETRY_BACKOFF_MS
                        .get(attempt as usize - 1)
                        .or(RETRY_BACKOFF_MS.last())
                        .copied()
                        .unwrap_or(1000);
                    warn!(
                        site = %site.name,
                        attempt,
                        "[COLLECT] fetch failed: {e}; retrying in {delay_ms}ms"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }
}

#[async_trait]
impl ListingCollector for HtmlCollector {
    async fn collect(&self, site: &SiteConfig) -> Result<SiteListings> {
        debug!(site = %site.name, url = %site.url, "[COLLECT] fetching");
        let html = self.fetch_with_retries(site).await?;
        extract_listings(&html, site)
    }
}

/// Pull listings out of a fetched page.
pub fn extract_listings(html: &str, site: &SiteConfig) -> Result<SiteListings> {
    let document = Html::parse_document(html);
    match &site.selectors {
        Some(selectors) => extract_known(&document, site, selectors),
        None => extract_generic(&document, site),
    }
}

fn extract_known(document: &Html, site: &SiteConfig, selectors: &SiteSelectors) -> Result<SiteListings> {
    let container = parse_selector(&selectors.container)?;
    let name_sel = parse_selector(&selectors.name)?;
    let price_sel = parse_selector(&selectors.price)?;

    let mut products = Vec::new();
    for element in document.select(&container).take(MAX_LISTINGS_PER_SITE) {
        let Some(name) = first_text(element, &name_sel) else {
            debug!(site = %site.name, "[COLLECT] container without a name, skipped");
            continue;
        };
        let Some(price_text) = first_text(element, &price_sel) else {
            debug!(site = %site.name, name = %name, "[COLLECT] container without a price, skipped");
            continue;
        };

        let price = parse_price(&price_text);
        products.push(RawListing {
            description: name.clone(),
            name,
            price,
            probability: price * 100.0,
            category: site.category.clone(),
            source: site.name.clone(),
        });
    }

    Ok(SiteListings {
        website_name: site.name.clone(),
        products,
        ..SiteListings::default()
    })
}

fn extract_generic(document: &Html, site: &SiteConfig) -> Result<SiteListings> {
    let title_sel = parse_selector("title")?;
    let snippet_sel = parse_selector(GENERIC_SNIPPET_SELECTOR)?;

    let title = document
        .select(&title_sel)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty());

    let content: Vec<String> = document
        .select(&snippet_sel)
        .take(MAX_GENERIC_SNIPPETS)
        .map(element_text)
        .filter(|t| !t.is_empty() && t.len() < MAX_SNIPPET_LEN)
        .collect();

    Ok(SiteListings {
        website_name: site.name.clone(),
        title,
        content,
        ..SiteListings::default()
    })
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::Selector(format!("{s}: {e:?}")))
}

fn first_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

/// Element text with whitespace runs collapsed.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_sites;

    fn site(name: &str) -> SiteConfig {
        default_sites().into_iter().find(|s| s.name == name).unwrap()
    }

    #[test]
    fn polymarket_cards() {
        let html = r#"
            <html><body>
              <div class="market-card"><h3>Fed cuts rates in March?</h3><span class="price">42¢</span></div>
              <div class="market-card"><h3>  Bitcoin   above 100k </h3><span class="price">$0.65</span></div>
              <div class="market-card"><h3>No price here</h3></div>
              <div class="market-card"><span class="price">10%</span></div>
            </body></html>"#;
        let listings = extract_listings(html, &site("Polymarket")).unwrap();
        assert_eq!(listings.website_name, "Polymarket");
        assert_eq!(listings.products.len(), 2);

        let first = &listings.products[0];
        assert_eq!(first.name, "Fed cuts rates in March?");
        assert_eq!(first.description, first.name);
        assert!((first.price - 0.42).abs() < 1e-9);
        assert!((first.probability - 42.0).abs() < 1e-9);
        assert_eq!(first.source, "Polymarket");
        assert_eq!(first.category, "politics");

        assert_eq!(listings.products[1].name, "Bitcoin above 100k");
    }

    #[test]
    fn listing_cap_per_site() {
        let card = r#"<div class="contract"><span class="market-name">M</span><span class="last-price">55¢</span></div>"#;
        let html = format!("<html><body>{}</body></html>", card.repeat(15));
        let listings = extract_listings(&html, &site("PredictIt")).unwrap();
        assert_eq!(listings.products.len(), MAX_LISTINGS_PER_SITE);
    }

    #[test]
    fn generic_page_keeps_title_and_snippets() {
        let site = SiteConfig {
            name: "Elsewhere".to_string(),
            url: "https://example.com".to_string(),
            category: "other".to_string(),
            selectors: None,
        };
        let long = "x".repeat(MAX_SNIPPET_LEN + 1);
        let html = format!(
            r#"<html><head><title>Odds board</title></head><body>
               <div class="bet-row">Team A to win 2.5</div>
               <div class="price-tag">{long}</div>
               </body></html>"#
        );
        let listings = extract_listings(&html, &site).unwrap();
        assert!(listings.products.is_empty());
        assert_eq!(listings.title.as_deref(), Some("Odds board"));
        assert_eq!(listings.content, vec!["Team A to win 2.5"]);
    }

    #[test]
    fn bad_selector_is_an_error() {
        let mut site = site("Kalshi");
        if let Some(sel) = site.selectors.as_mut() {
            sel.container = "[[".to_string();
        }
        assert!(matches!(extract_listings("<html></html>", &site), Err(AppError::Selector(_))));
    }
}
