use crate::types::Category;

const FINANCIAL_KEYWORDS: &[&str] = &["bitcoin", "ethereum", "solana", "crypto", "financial", "market"];
const POLITICS_KEYWORDS: &[&str] = &["election", "presidential", "politics"];
const SPORTS_KEYWORDS: &[&str] = &[
    "world cup",
    "super bowl",
    "world series",
    "uefa",
    "champions",
    "f1",
    "nfl",
    "sports",
];
const AWARDS_KEYWORDS: &[&str] = &["nobel"];

/// Checked in order; first match wins.
const RULES: &[(Category, &[&str])] = &[
    (Category::FinancialMarkets, FINANCIAL_KEYWORDS),
    (Category::Politics, POLITICS_KEYWORDS),
    (Category::Sports, SPORTS_KEYWORDS),
    (Category::Awards, AWARDS_KEYWORDS),
];

/// Classify a cluster by case-insensitive substring match on its name.
pub fn classify(unified_name: &str) -> Category {
    let name = unified_name.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| name.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}
