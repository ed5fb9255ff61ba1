//! HTTP API Handlers and Routes
//!
//! This module provides the HTTP layer, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Chat (`/api/chat`, alias `/chat`)
//! - `POST /api/chat` - Stream a chat reply, or a research report when `webSearch` is true
//!
//! The response is `text/event-stream`. Every frame is `data: <json>\n\n`:
//! ```text
//! data: {"type":"text-start","id":"msg_1"}
//! data: {"type":"text-delta","id":"msg_1","delta":"# Title\n\n"}
//! data: {"type":"text-end","id":"msg_1"}
//! data: [DONE]
//! ```
//! Failures after the stream has started arrive as a final `Error: ...` delta.
//!
//! ## Health (`/health`, `/api/health`)
//! - `GET /health` - Returns `{"status":"ok"}`
//!
//! # OpenAPI Documentation
//!
//! The document is served at `/api/openapi.json`. When the `swagger-ui`
//! feature is enabled, interactive documentation is available at `/swagger-ui/`.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;
