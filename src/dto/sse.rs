use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

use crate::{
    dto::{format_system_time, room::PlayerSummary},
    state::room::{GuessField, Room, TrackDescriptor},
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across the per-room SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Build an event with a pre-serialized data field.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a player joins the room.
pub struct PlayerJoinedEvent {
    pub player: PlayerSummary,
    pub players: Vec<PlayerSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a player leaves or disconnects.
pub struct PlayerLeftEvent {
    pub player_id: String,
    pub players: Vec<PlayerSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the host closes the room.
pub struct RoomClosedEvent {
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast once when the host starts the game.
pub struct GameStartedEvent {
    pub total_rounds: u32,
    pub round_duration_secs: u32,
}

/// Track projection that withholds the answer while guessing is open.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct TrackPublic {
    pub track_id: String,
    pub album_art: String,
    pub duration_ms: u64,
    pub preview_url: Option<String>,
    /// When the round started (RFC 3339); lets clients sync their countdown.
    pub started_at: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a round starts. Carries no title or artist.
pub struct RoundStartedEvent {
    pub round: u32,
    pub track: TrackPublic,
    pub round_duration_secs: u32,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a guess claims one or both fields.
pub struct CorrectGuessEvent {
    pub player_id: String,
    pub display_name: String,
    pub fields: Vec<GuessField>,
    pub points: u32,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast whenever a score changes.
pub struct LeaderboardUpdateEvent {
    pub players: Vec<PlayerSummary>,
}

/// Broadcast when a round ends, revealing the answer and its claimants.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundEndedEvent {
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub artist_guessed_by: Option<String>,
    pub title_guessed_by: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast once with the final standings.
pub struct GameEndedEvent {
    pub standings: Vec<PlayerSummary>,
}

impl RoundStartedEvent {
    /// Build the round-started payload from the freshly advanced room.
    ///
    /// Returns `None` when the room has no current track, which would mean
    /// the round never actually started.
    pub fn from_room(room: &Room) -> Option<Self> {
        let track = room.current_track.as_ref()?;
        Some(Self {
            round: room.current_round,
            track: TrackPublic::from((track, room.round_started_at.map(format_system_time))),
            round_duration_secs: room.round_duration_secs,
        })
    }
}

impl From<(&TrackDescriptor, Option<String>)> for TrackPublic {
    fn from((track, started_at): (&TrackDescriptor, Option<String>)) -> Self {
        Self {
            track_id: track.track_id.clone(),
            album_art: track.album_art.clone(),
            duration_ms: track.duration_ms,
            preview_url: track.preview_url.clone(),
            started_at,
        }
    }
}
