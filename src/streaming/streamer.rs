//! Incremental text streaming over the data-stream event protocol
//!
//! Every response is one logical text block: `text-start`, any number of
//! non-empty `text-delta`s, `text-end`, then the `[DONE]` sentinel. Failures
//! after the stream has started are folded into a final `Error: ...` delta so
//! the client always receives a terminated stream.

use async_stream::stream;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt::Display;

use crate::streaming::markdown::{render_markdown, PartialReport};
use crate::types::Result;

/// Payload of the terminal frame
pub const DONE_SENTINEL: &str = "[DONE]";

/// One frame of the streaming protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    TextStart { id: String },
    TextDelta { id: String, delta: String },
    TextEnd { id: String },
    Done,
}

impl StreamEvent {
    /// The `data:` payload of this frame
    pub fn data(&self) -> String {
        match self {
            StreamEvent::TextStart { id } => json!({"type": "text-start", "id": id}).to_string(),
            StreamEvent::TextDelta { id, delta } => {
                json!({"type": "text-delta", "id": id, "delta": delta}).to_string()
            }
            StreamEvent::TextEnd { id } => json!({"type": "text-end", "id": id}).to_string(),
            StreamEvent::Done => DONE_SENTINEL.to_string(),
        }
    }

    /// Complete frame as written on the wire
    pub fn to_frame(&self) -> String {
        format!("data: {}\n\n", self.data())
    }
}

/// Turns successive snapshots into append-only text deltas
#[derive(Debug, Clone)]
pub struct MarkdownStreamer {
    message_id: String,
    previous: String,
}

impl MarkdownStreamer {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            previous: String::new(),
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Text the client has been sent so far (after any replacement)
    pub fn rendered(&self) -> &str {
        &self.previous
    }

    pub fn start(&self) -> StreamEvent {
        StreamEvent::TextStart {
            id: self.message_id.clone(),
        }
    }

    /// Render `snapshot` and return the delta against the last rendering.
    ///
    /// When the new rendering does not extend the previous one, it is sent in
    /// full as a replacement.
    pub fn push(&mut self, snapshot: &PartialReport) -> Option<StreamEvent> {
        let current = render_markdown(snapshot);

        let delta = match current.strip_prefix(self.previous.as_str()) {
            Some(suffix) => suffix.to_string(),
            None => {
                tracing::debug!(
                    message_id = %self.message_id,
                    "Rendering diverged from previous snapshot, resending in full"
                );
                current.clone()
            }
        };

        if delta.is_empty() {
            return None;
        }

        self.previous = current;
        Some(StreamEvent::TextDelta {
            id: self.message_id.clone(),
            delta,
        })
    }

    pub fn error(&self, error: &dyn Display) -> StreamEvent {
        StreamEvent::TextDelta {
            id: self.message_id.clone(),
            delta: format!("Error: {}", error),
        }
    }

    pub fn finish(&self) -> [StreamEvent; 2] {
        [
            StreamEvent::TextEnd {
                id: self.message_id.clone(),
            },
            StreamEvent::Done,
        ]
    }
}

/// Frame a snapshot stream as protocol events.
///
/// Emission stops after the first error; the stream is still terminated with
/// `text-end` and the done sentinel.
pub fn stream_events<S>(message_id: String, snapshots: S) -> impl Stream<Item = StreamEvent> + Send
where
    S: Stream<Item = Result<PartialReport>> + Send,
{
    stream! {
        let mut streamer = MarkdownStreamer::new(message_id);
        let mut snapshots = Box::pin(snapshots);

        yield streamer.start();

        while let Some(snapshot) = snapshots.next().await {
            match snapshot {
                Ok(snapshot) => {
                    if let Some(event) = streamer.push(&snapshot) {
                        yield event;
                    }
                }
                Err(e) => {
                    tracing::error!(message_id = %streamer.message_id(), error = %e, "Generation failed mid-stream");
                    yield streamer.error(&e);
                    break;
                }
            }
        }

        for event in streamer.finish() {
            yield event;
        }
    }
}
