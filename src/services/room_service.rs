//! Room lifecycle: creation, membership, closing, and snapshots.

use rand::Rng;
use tracing::info;

use crate::{
    dao::PlayerInsert,
    dto::{
        room::{CreateRoomRequest, JoinRoomRequest, PlayerSummary, RoomResponse},
        validation::validate_room_code,
    },
    error::ServiceError,
    services::{game_service, room_events},
    state::{
        SharedState,
        room::{Player, Room, RoomStatus, SongSource},
    },
};

/// Bytes of entropy behind a room code (rendered as lowercase hex).
const ROOM_CODE_BYTES: usize = 6;

/// Fetch a room or fail with a typed not-found error.
pub(crate) async fn require_room(state: &SharedState, code: &str) -> Result<Room, ServiceError> {
    state
        .store()
        .find_room(code)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("room `{code}` not found")))
}

/// Create a room in WAITING and auto-enroll the host as its first player.
pub async fn create_room(
    state: &SharedState,
    request: CreateRoomRequest,
) -> Result<RoomResponse, ServiceError> {
    if request.source == SongSource::Playlist
        && request
            .source_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .is_none()
    {
        return Err(ServiceError::InvalidInput(
            "playlist source requires a playlist id".into(),
        ));
    }

    if !state.tracks().has_credential(&request.host_id).await {
        return Err(ServiceError::PrerequisiteNotMet(
            "host must link a track source before creating a room".into(),
        ));
    }

    if let Some(existing) = state
        .store()
        .find_active_room_for_host(&request.host_id)
        .await?
    {
        return Err(ServiceError::InvalidState(format!(
            "host already has an active room `{existing}`"
        )));
    }

    let now = std::time::SystemTime::now();
    let mut room = Room {
        code: generate_room_code(),
        host_id: request.host_id.clone(),
        max_players: request.max_players,
        total_rounds: request.total_rounds,
        current_round: 0,
        round_duration_secs: request.round_duration_secs,
        status: RoomStatus::Waiting,
        source: request.source,
        source_id: request.source_id,
        current_track: None,
        round_started_at: None,
        artist_guessed_by: None,
        title_guessed_by: None,
        created_at: now,
        updated_at: now,
    };

    // Codes carry 48 bits of entropy; colliding twice in a row is not a
    // realistic failure mode, so retry until an insert lands.
    while !state.store().insert_room(room.clone()).await? {
        room.code = generate_room_code();
    }

    let host = Player::new(
        request.host_id,
        request.display_name,
        request.avatar,
        true,
    );
    state.store().insert_player(&room.code, host).await?;

    info!(code = %room.code, host = %room.host_id, "room created");

    let players = state.store().list_players(&room.code).await?;
    Ok((room, players).into())
}

/// Join a WAITING room; idempotent for players already enrolled.
pub async fn join_room(
    state: &SharedState,
    code: &str,
    request: JoinRoomRequest,
) -> Result<RoomResponse, ServiceError> {
    validate_room_code(code)
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let room = require_room(state, code).await?;
    if room.status != RoomStatus::Waiting {
        return Err(ServiceError::InvalidState("game already started".into()));
    }

    let source_linked = state.tracks().has_credential(&request.player_id).await;
    let player = Player::new(
        request.player_id.clone(),
        request.display_name,
        request.avatar,
        source_linked,
    );
    let summary: PlayerSummary = player.clone().into();

    match state.store().insert_player(code, player).await? {
        PlayerInsert::Added => {
            let players = state.store().list_players(code).await?;
            room_events::broadcast_player_joined(
                state,
                code,
                summary,
                game_service::standings(players),
            );
        }
        PlayerInsert::AlreadyMember => {
            // Reconnects just refresh activity; no event.
            state
                .store()
                .touch_player(code, &request.player_id, std::time::SystemTime::now())
                .await?;
        }
        PlayerInsert::RoomFull => {
            return Err(ServiceError::InvalidState("room is full".into()));
        }
        PlayerInsert::RoomMissing => {
            return Err(ServiceError::NotFound(format!("room `{code}` not found")));
        }
    }

    snapshot(state, room).await
}

/// Remove a player from the room; a departing host closes the room instead.
pub async fn leave_room(
    state: &SharedState,
    code: &str,
    player_id: &str,
) -> Result<(), ServiceError> {
    let room = require_room(state, code).await?;

    if player_id == room.host_id && !room.status.is_terminal() {
        return close(state, room).await;
    }

    if state.store().remove_player(code, player_id).await? {
        let players = state.store().list_players(code).await?;
        room_events::broadcast_player_left(state, code, player_id, game_service::standings(players));
    }
    Ok(())
}

/// Close the room; host only.
pub async fn close_room(
    state: &SharedState,
    code: &str,
    requester: &str,
) -> Result<(), ServiceError> {
    let room = require_room(state, code).await?;
    if requester != room.host_id {
        return Err(ServiceError::Forbidden(
            "only the host can close the room".into(),
        ));
    }
    close(state, room).await
}

/// Current room snapshot with members ranked by score; doubles as the
/// polling fallback for clients without a live event stream.
pub async fn get_room(state: &SharedState, code: &str) -> Result<RoomResponse, ServiceError> {
    let room = require_room(state, code).await?;
    snapshot(state, room).await
}

async fn snapshot(state: &SharedState, room: Room) -> Result<RoomResponse, ServiceError> {
    let mut players = state.store().list_players(&room.code).await?;
    players.sort_by(|a, b| b.score.cmp(&a.score));
    Ok((room, players).into())
}

async fn close(state: &SharedState, room: Room) -> Result<(), ServiceError> {
    let change = state
        .store()
        .set_status_if(
            &room.code,
            &[RoomStatus::Waiting, RoomStatus::Playing, RoomStatus::RoundEnd],
            RoomStatus::Closed,
        )
        .await?;

    match change {
        crate::dao::StatusChange::Applied(room) => {
            // A stale round timer must never fire against a closed room.
            state.scheduler().cancel(&room.code);
            state.store().clear_players(&room.code).await?;
            room_events::broadcast_room_closed(state, &room.code);
            state.events().close_room(&room.code);
            info!(code = %room.code, "room closed");
            Ok(())
        }
        crate::dao::StatusChange::Rejected { current } => Err(ServiceError::InvalidState(format!(
            "room cannot be closed once finished (status {current:?})"
        ))),
        crate::dao::StatusChange::Missing => {
            Err(ServiceError::NotFound(format!("room `{}` not found", room.code)))
        }
    }
}

fn generate_room_code() -> String {
    let bytes: [u8; ROOM_CODE_BYTES] = rand::rng().random();
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::validation::ROOM_CODE_LENGTH;
    use crate::services::test_support::{sample_track, test_state, waiting_room};

    fn join_request(player_id: &str) -> JoinRoomRequest {
        JoinRoomRequest {
            player_id: player_id.into(),
            display_name: player_id.to_uppercase(),
            avatar: None,
        }
    }

    #[test]
    fn generated_codes_are_well_formed() {
        for _ in 0..32 {
            let code = generate_room_code();
            assert_eq!(code.len(), ROOM_CODE_LENGTH);
            assert!(validate_room_code(&code).is_ok());
        }
    }

    #[tokio::test]
    async fn create_enrolls_the_host() {
        let state = test_state(vec![sample_track("Halo", "Beyoncé")]);
        let code = waiting_room(&state).await;

        let response = get_room(&state, &code).await.unwrap();
        assert_eq!(response.host_id, "host");
        assert_eq!(response.status, RoomStatus::Waiting);
        assert!(response.players.iter().any(|p| p.id == "host"));
    }

    #[tokio::test]
    async fn a_host_cannot_open_two_active_rooms() {
        let state = test_state(Vec::new());
        waiting_room(&state).await;

        let err = create_room(
            &state,
            CreateRoomRequest {
                host_id: "host".into(),
                display_name: "Host".into(),
                avatar: None,
                total_rounds: 3,
                round_duration_secs: 30,
                max_players: 10,
                source: SongSource::LikedSongs,
                source_id: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn playlist_rooms_require_a_playlist_id() {
        let state = test_state(Vec::new());
        let err = create_room(
            &state,
            CreateRoomRequest {
                host_id: "host".into(),
                display_name: "Host".into(),
                avatar: None,
                total_rounds: 3,
                round_duration_secs: 30,
                max_players: 10,
                source: SongSource::Playlist,
                source_id: Some("   ".into()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn join_is_idempotent_for_existing_members() {
        let state = test_state(Vec::new());
        let code = waiting_room(&state).await;

        let before = get_room(&state, &code).await.unwrap().players.len();
        let response = join_room(&state, &code, join_request("guest")).await.unwrap();
        assert_eq!(response.players.len(), before);
    }

    #[tokio::test]
    async fn join_rejects_a_full_room() {
        let state = test_state(Vec::new());
        let room = create_room(
            &state,
            CreateRoomRequest {
                host_id: "host".into(),
                display_name: "Host".into(),
                avatar: None,
                total_rounds: 1,
                round_duration_secs: 30,
                max_players: 2,
                source: SongSource::LikedSongs,
                source_id: None,
            },
        )
        .await
        .unwrap();

        join_room(&state, &room.code, join_request("guest")).await.unwrap();
        let err = join_room(&state, &room.code, join_request("third"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn host_departure_closes_the_room() {
        let state = test_state(Vec::new());
        let code = waiting_room(&state).await;

        leave_room(&state, &code, "host").await.unwrap();

        let room = state.store().find_room(&code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Closed);
        assert!(state.store().list_players(&code).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_the_host_may_close() {
        let state = test_state(Vec::new());
        let code = waiting_room(&state).await;

        let err = close_room(&state, &code, "guest").await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }
}
