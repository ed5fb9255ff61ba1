//! API request handlers.

/// Chat and research streaming handlers.
pub mod chat;
/// Health check handler.
pub mod health;
