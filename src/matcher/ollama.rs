use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::matcher::prompt::{grouping_prompt, SYSTEM_PROMPT};
use crate::matcher::ProductMatcher;
use crate::types::SiteListings;

const TEMPERATURE: f32 = 0.1;

/// Groups listings with a model served by a local Ollama instance.
pub struct OllamaMatcher {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaMatcher {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.llm_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.ollama_base_url.trim_end_matches('/').to_string(),
            model: cfg.model_name.clone(),
        })
    }
}

#[async_trait]
impl ProductMatcher for OllamaMatcher {
    async fn match_products(&self, listings: &[SiteListings], min_confidence: f64) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": grouping_prompt(listings, min_confidence)?},
            ],
            "stream": false,
            "options": {"temperature": TEMPERATURE},
        });

        debug!(url = %url, model = %self.model, "[ANALYZE] matcher request");
        let resp = self.client.post(&url).json(&body).send().await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::Llm { status, body });
        }

        let payload: Value = resp.json().await?;
        message_content(&payload)
    }
}

fn message_content(payload: &Value) -> Result<String> {
    payload["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| AppError::LlmResponse("missing message.content".to_string()))
}
