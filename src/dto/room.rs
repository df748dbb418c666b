use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::format_system_time,
    state::room::{Player, Room, RoomStatus, SongSource},
};

fn default_round_duration() -> u32 {
    30
}

fn default_max_players() -> u32 {
    10
}

/// Payload used to create a brand-new room.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateRoomRequest {
    /// Identity of the creating player; becomes the room host.
    #[validate(length(min = 1))]
    pub host_id: String,
    /// Display name for the host's membership record.
    #[validate(length(min = 1, max = 64))]
    pub display_name: String,
    /// Optional avatar reference for the host.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Number of rounds the game runs for.
    #[validate(range(min = 1, max = 20))]
    pub total_rounds: u32,
    /// Round duration in seconds.
    #[serde(default = "default_round_duration")]
    #[validate(range(min = 10, max = 60))]
    pub round_duration_secs: u32,
    /// Maximum number of players allowed to join.
    #[serde(default = "default_max_players")]
    #[validate(range(min = 2, max = 10))]
    pub max_players: u32,
    /// Where round tracks are drawn from.
    pub source: SongSource,
    /// Sub-identifier for the source; required for playlists.
    #[serde(default)]
    pub source_id: Option<String>,
}

/// Payload used to join an existing room.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinRoomRequest {
    /// Identity of the joining player.
    #[validate(length(min = 1))]
    pub player_id: String,
    /// Display name shown to other players.
    #[validate(length(min = 1, max = 64))]
    pub display_name: String,
    /// Optional avatar reference.
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Payload used to leave a room.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LeaveRoomRequest {
    /// Identity of the departing player.
    #[validate(length(min = 1))]
    pub player_id: String,
}

/// Public projection of a room and its members.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomResponse {
    /// Join code of the room.
    pub code: String,
    /// Identity of the host.
    pub host_id: String,
    /// Maximum number of players.
    pub max_players: u32,
    /// Total rounds in the game.
    pub total_rounds: u32,
    /// Rounds played so far.
    pub current_round: u32,
    /// Round duration in seconds.
    pub round_duration_secs: u32,
    /// Current lifecycle status.
    pub status: RoomStatus,
    /// Track source selector.
    pub source: SongSource,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Members sorted by score, join order breaking ties.
    pub players: Vec<PlayerSummary>,
}

/// Public projection of a player exposed to REST/SSE clients.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PlayerSummary {
    /// External identity of the player.
    pub id: String,
    /// Display name shown to other players.
    pub display_name: String,
    /// Optional avatar reference.
    pub avatar: Option<String>,
    /// Cumulative score.
    pub score: u32,
    /// Whether the player has a usable track-source credential.
    pub source_linked: bool,
}

impl From<Player> for PlayerSummary {
    fn from(player: Player) -> Self {
        Self {
            id: player.id,
            display_name: player.display_name,
            avatar: player.avatar,
            score: player.score,
            source_linked: player.source_linked,
        }
    }
}

impl From<(Room, Vec<Player>)> for RoomResponse {
    fn from((room, players): (Room, Vec<Player>)) -> Self {
        Self {
            code: room.code,
            host_id: room.host_id,
            max_players: room.max_players,
            total_rounds: room.total_rounds,
            current_round: room.current_round,
            round_duration_secs: room.round_duration_secs,
            status: room.status,
            source: room.source,
            created_at: format_system_time(room.created_at),
            players: players.into_iter().map(Into::into).collect(),
        }
    }
}
