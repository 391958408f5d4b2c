//! 事件串流 API
//!
//! GET /events (以及 /api/events)，以 SSE 推送 result / complete / keepalive

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use std::{convert::Infallible, sync::Arc};

use crate::api::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/events", get(stream_events))
        .route("/api/events", get(stream_events))
}

/// 客戶端斷線時 stream 被 drop，訂閱隨之移除；進行中的檢查不受影響
async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = state.events().subscribe();
    tracing::info!(subscriber = %subscription.id(), "📡 Event stream opened");

    let stream = async_stream::stream! {
        while let Some(event) = subscription.recv().await {
            match Event::default().event(event.name()).json_data(&event) {
                Ok(frame) => yield Ok(frame),
                Err(e) => {
                    tracing::warn!(subscriber = %subscription.id(), error = %e, "Failed to encode event");
                }
            }
        }
    };

    Sse::new(stream)
}
