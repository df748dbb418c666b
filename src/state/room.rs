//! Runtime representation of rooms, players, and the room status machine.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle status of a room.
///
/// `GameEnd` and `Closed` are terminal; every other transition is validated
/// by [`RoomStatus::may_transition_to`] before the store applies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// Players can still join; the host has not started the game.
    Waiting,
    /// A round is live and guesses are accepted.
    Playing,
    /// The round answer is revealed; awaiting the host's next-round request.
    RoundEnd,
    /// All rounds are done and final standings were announced.
    GameEnd,
    /// The host left or closed the room.
    Closed,
}

impl RoomStatus {
    /// Whether no further transitions are allowed out of this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, RoomStatus::GameEnd | RoomStatus::Closed)
    }

    /// Validate a status transition against the room lifecycle.
    pub fn may_transition_to(self, next: RoomStatus) -> bool {
        match (self, next) {
            (RoomStatus::Waiting, RoomStatus::Playing) => true,
            (RoomStatus::Playing, RoomStatus::RoundEnd) => true,
            (RoomStatus::RoundEnd, RoomStatus::Playing) => true,
            (RoomStatus::RoundEnd, RoomStatus::GameEnd) => true,
            // Host departure closes a room from any non-terminal status.
            (from, RoomStatus::Closed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Where round tracks are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SongSource {
    /// The host's saved/liked tracks.
    LikedSongs,
    /// A specific playlist; requires [`Room::source_id`].
    Playlist,
    /// The host's most-played tracks.
    TopTracks,
}

/// Metadata for the track being guessed in the current round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    /// Provider-side identifier of the track.
    pub track_id: String,
    /// True title, withheld from clients until the round ends.
    pub title: String,
    /// True artist, withheld from clients until the round ends.
    pub artist: String,
    /// Album art URL, safe to show while guessing.
    pub album_art: String,
    /// Track length in milliseconds.
    pub duration_ms: u64,
    /// Optional preview clip URL.
    pub preview_url: Option<String>,
}

/// One game session keyed by its join code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Short unguessable join code (12 lowercase hex characters).
    pub code: String,
    /// Identity of the player who created the room.
    pub host_id: String,
    /// Maximum number of players allowed to join (2-10).
    pub max_players: u32,
    /// Number of rounds the game runs for (1-20).
    pub total_rounds: u32,
    /// Rounds played so far; 0 until the game starts.
    pub current_round: u32,
    /// How long each round lasts, in seconds (10-60).
    pub round_duration_secs: u32,
    /// Current lifecycle status.
    pub status: RoomStatus,
    /// Selector for where round tracks come from.
    pub source: SongSource,
    /// Sub-identifier for the source (playlist id); required for playlists.
    pub source_id: Option<String>,
    /// Track being guessed, present while a round is live or revealed.
    pub current_track: Option<TrackDescriptor>,
    /// When the current round started.
    pub round_started_at: Option<SystemTime>,
    /// First player to guess the artist this round. Never overwritten once set.
    pub artist_guessed_by: Option<String>,
    /// First player to guess the title this round. Never overwritten once set.
    pub title_guessed_by: Option<String>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the room record was updated.
    pub updated_at: SystemTime,
}

impl Room {
    /// Whether guesses are currently accepted for this room.
    pub fn round_is_live(&self) -> bool {
        self.status == RoomStatus::Playing && self.current_track.is_some()
    }

    /// Whether both claimant slots are taken for the current round.
    pub fn fully_guessed(&self) -> bool {
        self.artist_guessed_by.is_some() && self.title_guessed_by.is_some()
    }
}

/// A guessable field of the current track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GuessField {
    /// The performing artist.
    Artist,
    /// The track title.
    Title,
}

/// Room-scoped membership record for one player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// External identity of the player.
    pub id: String,
    /// Display name shown to other players.
    pub display_name: String,
    /// Optional avatar reference.
    pub avatar: Option<String>,
    /// Cumulative score; only the guess resolver increases it.
    pub score: u32,
    /// Whether the player has a usable track-source credential.
    pub source_linked: bool,
    /// When the player joined the room; breaks leaderboard ties.
    pub joined_at: SystemTime,
    /// Last time the player interacted with the room.
    pub last_activity: SystemTime,
}

impl Player {
    /// Build a fresh membership record with a zero score.
    pub fn new(id: String, display_name: String, avatar: Option<String>, source_linked: bool) -> Self {
        let now = SystemTime::now();
        Self {
            id,
            display_name,
            avatar,
            score: 0,
            source_linked,
            joined_at: now,
            last_activity: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_allowed() {
        assert!(RoomStatus::Waiting.may_transition_to(RoomStatus::Playing));
        assert!(RoomStatus::Playing.may_transition_to(RoomStatus::RoundEnd));
        assert!(RoomStatus::RoundEnd.may_transition_to(RoomStatus::Playing));
        assert!(RoomStatus::RoundEnd.may_transition_to(RoomStatus::GameEnd));
    }

    #[test]
    fn close_is_reachable_from_non_terminal_statuses() {
        assert!(RoomStatus::Waiting.may_transition_to(RoomStatus::Closed));
        assert!(RoomStatus::Playing.may_transition_to(RoomStatus::Closed));
        assert!(RoomStatus::RoundEnd.may_transition_to(RoomStatus::Closed));
    }

    #[test]
    fn terminal_statuses_reject_everything() {
        for next in [
            RoomStatus::Waiting,
            RoomStatus::Playing,
            RoomStatus::RoundEnd,
            RoomStatus::GameEnd,
            RoomStatus::Closed,
        ] {
            assert!(!RoomStatus::GameEnd.may_transition_to(next));
            assert!(!RoomStatus::Closed.may_transition_to(next));
        }
    }

    #[test]
    fn skipping_states_is_rejected() {
        assert!(!RoomStatus::Waiting.may_transition_to(RoomStatus::RoundEnd));
        assert!(!RoomStatus::Waiting.may_transition_to(RoomStatus::GameEnd));
        assert!(!RoomStatus::Playing.may_transition_to(RoomStatus::Playing));
        assert!(!RoomStatus::Playing.may_transition_to(RoomStatus::GameEnd));
    }
}
