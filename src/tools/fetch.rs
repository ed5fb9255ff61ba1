//! Page fetch tool
//!
//! Fetches a URL and returns its readable text as `{url, content}`, where `url`
//! is the address after redirects. Failures never propagate: they come back as
//! `{url, status_code: "error", error}`.

use crate::tools::extract::extract_text;
use crate::tools::registry::Tool;
use crate::tools::{ToolError, FETCH_TOOL_NAME};
use crate::types::{AppError, Result};
use crate::utils::toml_config::FetchToolConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

pub struct FetchTool {
    client: reqwest::Client,
    default_timeout: Duration,
    max_content_chars: usize,
}

impl FetchTool {
    pub fn new(user_agent: &str, default_timeout: Duration, max_content_chars: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build fetch client: {}", e)))?;

        Ok(Self {
            client,
            default_timeout,
            max_content_chars,
        })
    }

    pub fn from_config(config: &FetchToolConfig) -> Result<Self> {
        Self::new(
            &config.user_agent,
            Duration::from_secs(config.timeout_secs),
            config.max_content_chars,
        )
    }

    /// Fetch `url` and extract its text. Never fails.
    pub async fn fetch(
        &self,
        url: &str,
        timeout: Option<Duration>,
        headers: &HashMap<String, String>,
    ) -> Value {
        tracing::debug!(url, "Fetching page");

        match self.try_fetch(url, timeout, headers).await {
            Ok((final_url, content)) => json!({
                "url": final_url,
                "content": content,
            }),
            Err(error) => {
                tracing::debug!(url, %error, "Fetch failed");
                json!({
                    "url": url,
                    "status_code": "error",
                    "error": error,
                })
            }
        }
    }

    async fn try_fetch(
        &self,
        url: &str,
        timeout: Option<Duration>,
        headers: &HashMap<String, String>,
    ) -> std::result::Result<(String, String), String> {
        let response = self
            .client
            .get(url)
            .timeout(timeout.unwrap_or(self.default_timeout))
            .headers(header_map(headers)?)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let final_url = response.url().to_string();
        let html = response.text().await.map_err(|e| e.to_string())?;

        Ok((final_url, truncate_chars(extract_text(&html), self.max_content_chars)))
    }
}

fn header_map(headers: &HashMap<String, String>) -> std::result::Result<HeaderMap, String> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| format!("Invalid header name '{}': {}", name, e))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| format!("Invalid value for header '{}': {}", name, e))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn truncate_chars(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text,
    }
}

#[async_trait]
impl Tool for FetchTool {
    fn name(&self) -> &str {
        FETCH_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Fetch a web page and return its readable text content."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to fetch"
                },
                "timeout": {
                    "type": "integer",
                    "description": "Request timeout in seconds (default: 30)"
                },
                "headers": {
                    "type": "object",
                    "description": "Optional HTTP headers to send",
                    "additionalProperties": { "type": "string" }
                }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let url = args
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'url' parameter".to_string()))?;

        let timeout = args
            .get("timeout")
            .and_then(|v| v.as_u64())
            .map(Duration::from_secs);

        let headers: HashMap<String, String> = args
            .get("headers")
            .and_then(|v| v.as_object())
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(self.fetch(url, timeout, &headers).await)
    }
}
