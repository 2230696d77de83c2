use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scrape error for {site}: {reason}")]
    Scrape { site: String, reason: String },

    #[error("Invalid CSS selector: {0}")]
    Selector(String),

    #[error("Matcher API error: {status} - {body}")]
    Llm { status: u16, body: String },

    #[error("Matcher response error: {0}")]
    LlmResponse(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
