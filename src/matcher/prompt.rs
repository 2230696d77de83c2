use crate::error::Result;
use crate::types::SiteListings;

pub const SYSTEM_PROMPT: &str = "You are a data analyst expert in prediction markets. You identify \
when different platforms offer the same or similar betting products by analyzing their \
descriptions, categories, and market characteristics. You answer with JSON only.";

/// User prompt asking the model to group listings into cross-site clusters.
pub fn grouping_prompt(listings: &[SiteListings], min_confidence: f64) -> Result<String> {
    let data = serde_json::to_string_pretty(listings)?;
    Ok(format!(
        r#"Analyze the collected prediction market data to identify similar or identical products across different platforms.

Input data:
{data}

Group similar products together based on:
- Market subject/topic
- Event being predicted
- Time frame
- Category

Assign each group a confidence level (0-100) that its products are the same market:
- 90-100: identical markets
- 70-89: very similar markets
- 50-69: somewhat similar markets
- below 50: different markets

Only return groups with confidence_level >= {min_confidence:.1}. Be conservative to avoid false positives.

For each group give the most descriptive unified name, the source products (with name and price), the average price across platforms, the confidence level, and the source sites.

Return JSON in exactly this shape:
{{
    "unified_products": [
        {{
            "unified_name": "descriptive_name",
            "products": [{{"name": "product_name", "price": 0.65}}],
            "average_price": 0.67,
            "confidence_level": 85.5,
            "sources": ["site1", "site2"]
        }}
    ]
}}"#
    ))
}
