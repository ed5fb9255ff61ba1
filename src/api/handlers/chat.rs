use std::convert::Infallible;

use async_stream::stream;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
};
use futures::{stream::BoxStream, StreamExt};

use crate::{
    agents::ResearchDeps,
    streaming::{stream_events, PartialReport},
    types::{AppError, ChatRequest, ChatTurn, Result},
    AppState,
};

/// Header announcing the AI SDK data stream protocol
pub const DATA_STREAM_HEADER: &str = "x-vercel-ai-data-stream";

/// Chat with the assistant, or run deep research when `webSearch` is set
///
/// The reply is a server-sent event stream of `text-start`, `text-delta` and
/// `text-end` frames closed by a literal `[DONE]` frame. Nothing but `data:`
/// frames is written, so there is no keep-alive comment during long pauses.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Event stream of markdown deltas", body = String, content_type = "text/event-stream"),
        (status = 400, description = "Malformed request")
    ),
    tag = "chat"
)]
pub async fn chat(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let request: ChatRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidInput(format!("Invalid request format: {}", e)))?;
    let turn = request.into_turn()?;

    tracing::info!(
        message_id = %turn.message_id,
        web_search = turn.web_search,
        history = turn.history.len(),
        "Chat request"
    );

    let message_id = turn.message_id.clone();
    let snapshots = snapshots(&state, turn);
    let events = stream_events(message_id, snapshots)
        .map(|event| Ok::<_, Infallible>(Event::default().data(event.data())));

    Ok((
        [
            (HeaderName::from_static(DATA_STREAM_HEADER), "v1"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Sse::new(events),
    )
        .into_response())
}

/// Snapshot source for one turn: the research pipeline or a plain chat reply
fn snapshots(state: &AppState, turn: ChatTurn) -> BoxStream<'static, Result<PartialReport>> {
    let deps = ResearchDeps::today();

    if turn.web_search {
        let agent = state.research_agent.clone();
        stream! {
            let mut report = Box::pin(agent.research(turn.prompt, turn.history, deps));
            while let Some(snapshot) = report.next().await {
                yield snapshot;
            }
        }
        .boxed()
    } else {
        let agent = state.chat_agent.clone();
        stream! {
            let mut reply = Box::pin(agent.reply(turn.prompt, turn.history, deps));
            while let Some(snapshot) = reply.next().await {
                yield snapshot;
            }
        }
        .boxed()
    }
}
