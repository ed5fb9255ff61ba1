//! Web tools available to research agents
//!
//! This module provides the tool infrastructure that lets subagents reach beyond
//! text generation: searching the web and reading the pages it turns up.
//!
//! # Module Structure
//!
//! - [`search`](crate::tools::search) - Web search against the Brave Search API
//! - [`fetch`](crate::tools::fetch) - Page retrieval and text extraction
//! - [`extract`](crate::tools::extract) - HTML to plain text
//! - [`retry`](crate::tools::retry) - Retry policy applied at the tool boundary
//! - [`registry`](crate::tools::registry) - Tool registration and execution
//!
//! # Failure Model
//!
//! Tools never hard-fail the calling agent. Transient failures (rate limiting,
//! upstream 5xx, network errors) surface as a [`ToolError`] after the policy's
//! backoff has elapsed, signalling the model to reissue the call. Every other
//! failure is returned as an ordinary JSON result describing the error:
//!
//! ```ignore
//! let registry = ToolRegistry::for_research(&config)?;
//! match registry.execute("web_search", json!({"query": "rust async"}), 1).await {
//!     Ok(value) => println!("{value}"),
//!     Err(e) => println!("retry me: {e}"),
//! }
//! ```

/// HTML text extraction.
pub mod extract;
/// Page fetch tool.
pub mod fetch;
/// Tool registry for managing available tools.
pub mod registry;
/// Retry policy for transient tool failures.
pub mod retry;
/// Web search tool.
pub mod search;

pub use registry::{Tool, ToolRegistry};
pub use retry::RetryPolicy;

/// Name under which the search tool is exposed to models
pub const SEARCH_TOOL_NAME: &str = "web_search";

/// Name under which the fetch tool is exposed to models
pub const FETCH_TOOL_NAME: &str = "web_fetch";

/// Transient tool failures the model is expected to retry.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ToolError {
    #[error("Rate limit exceeded while searching for '{query}', retrying")]
    RateLimited { query: String },

    #[error("Search service returned {status} for '{query}', retrying")]
    ServerError { status: u16, query: String },

    #[error("Network error during search, retrying: {0}")]
    Network(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

impl ToolError {
    /// Whether the failure is expected to clear up on its own
    pub fn is_transient(&self) -> bool {
        !matches!(self, ToolError::InvalidArguments(_))
    }
}
