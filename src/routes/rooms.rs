use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::room::{CreateRoomRequest, JoinRoomRequest, LeaveRoomRequest, RoomResponse},
    error::AppError,
    services::room_service,
    state::SharedState,
};

/// Routes handling room lifecycle and membership.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/{code}", get(get_room))
        .route("/rooms/{code}/join", post(join_room))
        .route("/rooms/{code}/leave", post(leave_room))
}

/// Create a fresh room and enroll the host.
#[utoipa::path(
    post,
    path = "/rooms",
    tag = "rooms",
    request_body = CreateRoomRequest,
    responses(
        (status = 200, description = "Room created", body = RoomResponse),
        (status = 400, description = "Invalid settings or missing track-source credential")
    )
)]
pub async fn create_room(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateRoomRequest>>,
) -> Result<Json<RoomResponse>, AppError> {
    let response = room_service::create_room(&state, payload).await?;
    Ok(Json(response))
}

/// Current room snapshot; also the polling fallback for clients without SSE.
#[utoipa::path(
    get,
    path = "/rooms/{code}",
    tag = "rooms",
    params(("code" = String, Path, description = "Join code of the room")),
    responses(
        (status = 200, description = "Room snapshot", body = RoomResponse),
        (status = 404, description = "Room not found")
    )
)]
pub async fn get_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<RoomResponse>, AppError> {
    let response = room_service::get_room(&state, &code).await?;
    Ok(Json(response))
}

/// Join a waiting room.
#[utoipa::path(
    post,
    path = "/rooms/{code}/join",
    tag = "rooms",
    params(("code" = String, Path, description = "Join code of the room")),
    request_body = JoinRoomRequest,
    responses(
        (status = 200, description = "Joined (idempotent for members)", body = RoomResponse),
        (status = 404, description = "Room not found"),
        (status = 409, description = "Room full or game already started")
    )
)]
pub async fn join_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<JoinRoomRequest>>,
) -> Result<Json<RoomResponse>, AppError> {
    let response = room_service::join_room(&state, &code, payload).await?;
    Ok(Json(response))
}

/// Leave a room; a departing host closes it.
#[utoipa::path(
    post,
    path = "/rooms/{code}/leave",
    tag = "rooms",
    params(("code" = String, Path, description = "Join code of the room")),
    request_body = LeaveRoomRequest,
    responses(
        (status = 204, description = "Left the room"),
        (status = 404, description = "Room not found")
    )
)]
pub async fn leave_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<LeaveRoomRequest>>,
) -> Result<StatusCode, AppError> {
    room_service::leave_room(&state, &code, &payload.player_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
