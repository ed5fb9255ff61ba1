//! Web search tool backed by the Brave Search API
//!
//! Results are normalized to `{query, total_count, results: [{title, url,
//! description, date}]}`. Rate limiting, upstream 5xx responses and network
//! failures come back as [`ToolError`]s so the agent loop can retry; anything
//! else is reported as `{query, error}`.

use crate::tools::registry::Tool;
use crate::tools::{ToolError, SEARCH_TOOL_NAME};
use crate::types::{AppError, Result};
use crate::utils::toml_config::SearchToolConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Search parameters beyond the query itself
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub count: u32,
    pub country: String,
    pub search_lang: String,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            count: 10,
            country: "us".to_string(),
            search_lang: "en".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    age: Option<String>,
}

/// Web search tool
pub struct SearchTool {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    defaults: SearchOptions,
}

impl SearchTool {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build search client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            defaults: SearchOptions::default(),
        })
    }

    pub fn from_config(config: &SearchToolConfig, api_key: Option<String>) -> Result<Self> {
        let tool = Self::new(
            config.endpoint.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
        )?;

        Ok(tool.with_defaults(SearchOptions {
            count: config.count,
            country: config.country.clone(),
            search_lang: config.search_lang.clone(),
        }))
    }

    pub fn with_defaults(mut self, defaults: SearchOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Run one search request.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<Value> {
        tracing::debug!(query, count = options.count, "Running web search");

        let api_key = match &self.api_key {
            Some(key) => key,
            None => return Ok(error_payload(query, "Search API key is not configured")),
        };

        let count = options.count.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key)
            .query(&[
                ("q", query),
                ("count", count.as_str()),
                ("country", options.country.as_str()),
                ("search_lang", options.search_lang.as_str()),
                ("result_filter", "web"),
            ])
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) if is_network_error(&e) => {
                return Err(ToolError::Network(e.to_string()).into());
            }
            Err(e) => return Ok(error_payload(query, &e.to_string())),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ToolError::RateLimited {
                query: query.to_string(),
            }
            .into());
        }
        if status.is_server_error() {
            return Err(ToolError::ServerError {
                status: status.as_u16(),
                query: query.to_string(),
            }
            .into());
        }
        if !status.is_success() {
            return Ok(error_payload(
                query,
                &format!("Search request failed with status {}", status),
            ));
        }

        let body: BraveResponse = match response.json().await {
            Ok(body) => body,
            Err(e) if is_network_error(&e) => {
                return Err(ToolError::Network(e.to_string()).into());
            }
            Err(e) => return Ok(error_payload(query, &format!("Invalid search response: {}", e))),
        };

        let results: Vec<Value> = body
            .web
            .map(|web| web.results)
            .unwrap_or_default()
            .into_iter()
            .map(|r| {
                json!({
                    "title": r.title,
                    "url": r.url,
                    "description": r.description,
                    "date": r.age.unwrap_or_default(),
                })
            })
            .collect();

        Ok(json!({
            "query": query,
            "total_count": results.len(),
            "results": results,
        }))
    }
}

fn is_network_error(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout() || e.is_request() || e.is_body()
}

fn error_payload(query: &str, error: &str) -> Value {
    json!({
        "query": query,
        "error": error,
    })
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        SEARCH_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Search the web. Returns titles, URLs, descriptions and dates of matching pages."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "count": {
                    "type": "integer",
                    "description": "Number of results to return (1-20, default: 10)",
                    "minimum": 1,
                    "maximum": 20
                },
                "country": {
                    "type": "string",
                    "description": "Country code for localized results (default: us)"
                },
                "search_lang": {
                    "type": "string",
                    "description": "Language of the results (default: en)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' parameter".to_string()))?;

        let options = SearchOptions {
            count: args
                .get("count")
                .and_then(|v| v.as_u64())
                .map(|n| n.clamp(1, 20) as u32)
                .unwrap_or(self.defaults.count),
            country: args
                .get("country")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| self.defaults.country.clone()),
            search_lang: args
                .get("search_lang")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| self.defaults.search_lang.clone()),
        };

        self.search(query, &options).await
    }
}
