use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use axum_valid::Valid;

use crate::{
    dto::{
        game::{CloseRoomRequest, GuessRequest, GuessResponse, NextRoundRequest, StartGameRequest},
        room::RoomResponse,
    },
    error::{AppError, ServiceError},
    services::{game_service, room_service},
    state::SharedState,
};

/// Routes driving the round flow.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms/{code}/start", post(start_game))
        .route("/rooms/{code}/guess", post(submit_guess))
        .route("/rooms/{code}/next-round", post(next_round))
        .route("/rooms/{code}/close", post(close_room))
}

/// Start the game; host only.
#[utoipa::path(
    post,
    path = "/rooms/{code}/start",
    tag = "game",
    params(("code" = String, Path, description = "Join code of the room")),
    request_body = StartGameRequest,
    responses(
        (status = 200, description = "Game started", body = RoomResponse),
        (status = 403, description = "Requester is not the host"),
        (status = 409, description = "Game already started")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<StartGameRequest>>,
) -> Result<Json<RoomResponse>, AppError> {
    game_service::start_game(&state, &code, &payload.player_id).await?;
    let response = room_service::get_room(&state, &code).await?;
    Ok(Json(response))
}

/// Submit a guess for the live round.
#[utoipa::path(
    post,
    path = "/rooms/{code}/guess",
    tag = "game",
    params(("code" = String, Path, description = "Join code of the room")),
    request_body = GuessRequest,
    responses(
        (status = 200, description = "Guess processed", body = GuessResponse),
        (status = 404, description = "Room not found")
    )
)]
pub async fn submit_guess(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<GuessRequest>>,
) -> Result<Json<GuessResponse>, AppError> {
    match game_service::submit_guess(&state, &code, &payload.player_id, &payload.text).await {
        Ok(outcome) => Ok(Json(outcome.into())),
        // A guess landing between rounds is not an error worth surfacing.
        Err(ServiceError::InactiveRound) => Ok(Json(GuessResponse::miss())),
        Err(err) => Err(err.into()),
    }
}

/// Advance to the next round (or finish the game); host only.
#[utoipa::path(
    post,
    path = "/rooms/{code}/next-round",
    tag = "game",
    params(("code" = String, Path, description = "Join code of the room")),
    request_body = NextRoundRequest,
    responses(
        (status = 200, description = "Round advanced or game finished", body = RoomResponse),
        (status = 403, description = "Requester is not the host"),
        (status = 409, description = "Current round has not ended")
    )
)]
pub async fn next_round(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<NextRoundRequest>>,
) -> Result<Json<RoomResponse>, AppError> {
    game_service::next_round(&state, &code, &payload.player_id).await?;
    let response = room_service::get_room(&state, &code).await?;
    Ok(Json(response))
}

/// Close the room; host only.
#[utoipa::path(
    post,
    path = "/rooms/{code}/close",
    tag = "game",
    params(("code" = String, Path, description = "Join code of the room")),
    request_body = CloseRoomRequest,
    responses(
        (status = 204, description = "Room closed"),
        (status = 403, description = "Requester is not the host")
    )
)]
pub async fn close_room(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<CloseRoomRequest>>,
) -> Result<StatusCode, AppError> {
    room_service::close_room(&state, &code, &payload.player_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
