use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the Guessify backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::rooms::create_room,
        crate::routes::rooms::get_room,
        crate::routes::rooms::join_room,
        crate::routes::rooms::leave_room,
        crate::routes::game::start_game,
        crate::routes::game::submit_guess,
        crate::routes::game::next_round,
        crate::routes::game::close_room,
        crate::routes::sse::room_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::room::CreateRoomRequest,
            crate::dto::room::JoinRoomRequest,
            crate::dto::room::LeaveRoomRequest,
            crate::dto::room::RoomResponse,
            crate::dto::room::PlayerSummary,
            crate::dto::game::StartGameRequest,
            crate::dto::game::GuessRequest,
            crate::dto::game::GuessResponse,
            crate::dto::game::NextRoundRequest,
            crate::dto::game::CloseRoomRequest,
            crate::state::room::RoomStatus,
            crate::state::room::SongSource,
            crate::state::room::GuessField,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Room lifecycle and membership"),
        (name = "game", description = "Round flow and guess submission"),
        (name = "sse", description = "Server-sent event streams"),
    )
)]
pub struct ApiDoc;
