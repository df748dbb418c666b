use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    services::sse_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/rooms/{code}/events",
    tag = "sse",
    params(("code" = String, Path, description = "Join code of the room")),
    responses(
        (status = 200, description = "Room event stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Room not found")
    )
)]
/// Stream a room's realtime events to a connected client.
pub async fn room_stream(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let receiver = sse_service::subscribe(&state, &code).await?;
    info!(code, "new SSE subscriber");
    sse_service::broadcast_room_info(&state, &code, "room stream connected");
    Ok(sse_service::to_sse_stream(receiver))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/rooms/{code}/events", get(room_stream))
}
