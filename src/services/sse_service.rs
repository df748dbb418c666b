//! Bridging per-room broadcast channels onto SSE responses.

use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    dto::sse::ServerEvent,
    error::ServiceError,
    services::room_service,
    state::SharedState,
};

/// Subscribe to a room's event stream; the room must exist.
pub async fn subscribe(
    state: &SharedState,
    code: &str,
) -> Result<broadcast::Receiver<ServerEvent>, ServiceError> {
    room_service::require_room(state, code).await?;
    Ok(state.events().subscribe(code))
}

/// Send a human-readable info message onto a room's event stream.
pub fn broadcast_room_info(state: &SharedState, code: &str, message: &str) {
    state.events().broadcast(
        code,
        ServerEvent::new(Some("info".to_string()), message.to_string()),
    );
}

/// Convert a broadcast receiver into an SSE response, forwarding events
/// until the client disconnects or the room's channel is torn down.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            let mut event = Event::default().data(payload.data);
                            if let Some(name) = payload.event {
                                event = event.event(name);
                            }

                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Skip lagged messages but keep the stream alive.
                            continue;
                        }
                    }
                }
            }
        }

        tracing::info!("SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
