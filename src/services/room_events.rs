//! Broadcast helpers emitting the per-room notification sequence.

use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        room::PlayerSummary,
        sse::{
            CorrectGuessEvent, GameEndedEvent, GameStartedEvent, LeaderboardUpdateEvent,
            PlayerJoinedEvent, PlayerLeftEvent, RoomClosedEvent, RoundEndedEvent,
            RoundStartedEvent, ServerEvent,
        },
    },
    services::guess_service::GuessOutcome,
    state::{SharedState, room::Room},
};

const EVENT_ROOM_JOINED: &str = "room.joined";
const EVENT_ROOM_LEFT: &str = "room.left";
const EVENT_ROOM_CLOSED: &str = "room.closed";
const EVENT_GAME_STARTED: &str = "game.started";
const EVENT_ROUND_STARTED: &str = "round.started";
const EVENT_CORRECT_GUESS: &str = "guess.correct";
const EVENT_LEADERBOARD_UPDATE: &str = "leaderboard.update";
const EVENT_ROUND_ENDED: &str = "round.ended";
const EVENT_GAME_ENDED: &str = "game.ended";

/// Broadcast that a player joined, with the refreshed member list.
pub fn broadcast_player_joined(
    state: &SharedState,
    code: &str,
    player: PlayerSummary,
    players: Vec<PlayerSummary>,
) {
    let payload = PlayerJoinedEvent { player, players };
    send_room_event(state, code, EVENT_ROOM_JOINED, &payload);
}

/// Broadcast that a player left, with the refreshed member list.
pub fn broadcast_player_left(
    state: &SharedState,
    code: &str,
    player_id: &str,
    players: Vec<PlayerSummary>,
) {
    let payload = PlayerLeftEvent {
        player_id: player_id.to_string(),
        players,
    };
    send_room_event(state, code, EVENT_ROOM_LEFT, &payload);
}

/// Broadcast that the room has been closed by its host.
pub fn broadcast_room_closed(state: &SharedState, code: &str) {
    let payload = RoomClosedEvent { code: code.into() };
    send_room_event(state, code, EVENT_ROOM_CLOSED, &payload);
}

/// Broadcast that the game has started.
pub fn broadcast_game_started(state: &SharedState, code: &str, room: &Room) {
    let payload = GameStartedEvent {
        total_rounds: room.total_rounds,
        round_duration_secs: room.round_duration_secs,
    };
    send_room_event(state, code, EVENT_GAME_STARTED, &payload);
}

/// Broadcast that a round started. The payload withholds title and artist.
pub fn broadcast_round_started(state: &SharedState, code: &str, room: &Room) {
    let Some(payload) = RoundStartedEvent::from_room(room) else {
        warn!(code, "round started without a current track; event skipped");
        return;
    };
    send_room_event(state, code, EVENT_ROUND_STARTED, &payload);
}

/// Broadcast a scoring guess.
pub fn broadcast_correct_guess(
    state: &SharedState,
    code: &str,
    player_id: &str,
    display_name: &str,
    outcome: &GuessOutcome,
) {
    let payload = CorrectGuessEvent {
        player_id: player_id.to_string(),
        display_name: display_name.to_string(),
        fields: outcome.fields.clone(),
        points: outcome.points,
    };
    send_room_event(state, code, EVENT_CORRECT_GUESS, &payload);
}

/// Broadcast the refreshed leaderboard.
pub fn broadcast_leaderboard(state: &SharedState, code: &str, players: Vec<PlayerSummary>) {
    let payload = LeaderboardUpdateEvent { players };
    send_room_event(state, code, EVENT_LEADERBOARD_UPDATE, &payload);
}

/// Broadcast the end of a round, revealing the answer and its claimants.
pub fn broadcast_round_ended(state: &SharedState, code: &str, room: &Room) {
    let Some(track) = room.current_track.as_ref() else {
        warn!(code, "round ended without a current track; event skipped");
        return;
    };
    let payload = RoundEndedEvent {
        track_id: track.track_id.clone(),
        title: track.title.clone(),
        artist: track.artist.clone(),
        artist_guessed_by: room.artist_guessed_by.clone(),
        title_guessed_by: room.title_guessed_by.clone(),
    };
    send_room_event(state, code, EVENT_ROUND_ENDED, &payload);
}

/// Broadcast the final standings.
pub fn broadcast_game_ended(state: &SharedState, code: &str, standings: Vec<PlayerSummary>) {
    let payload = GameEndedEvent { standings };
    send_room_event(state, code, EVENT_GAME_ENDED, &payload);
}

fn send_room_event(state: &SharedState, code: &str, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.events().broadcast(code, event),
        Err(err) => warn!(code, event, error = %err, "failed to serialize SSE payload"),
    }
}
