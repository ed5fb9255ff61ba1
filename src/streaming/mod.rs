//! Incremental markdown streaming
//!
//! Structured output arrives as a growing, usually incomplete JSON document.
//! This module turns it into an append-only text stream:
//!
//! 1. [`partial_json`] recovers the fields that are already complete
//! 2. [`markdown`] renders a snapshot in a fixed field order
//! 3. [`streamer`] diffs successive renderings and frames the deltas as
//!    protocol events

pub mod markdown;
pub mod partial_json;
pub mod streamer;

pub use markdown::{render_markdown, PartialReport};
pub use partial_json::parse_partial_json;
pub use streamer::{stream_events, MarkdownStreamer, StreamEvent, DONE_SENTINEL};
