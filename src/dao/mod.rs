//! Persistence layer: the room store abstraction and bundled backends.

pub mod memory;
pub mod storage;

use std::time::SystemTime;

use futures::future::BoxFuture;

use crate::dao::storage::StorageResult;
use crate::state::room::{GuessField, Player, Room, RoomStatus, TrackDescriptor};

/// Outcome of a conditional status update.
#[derive(Debug, Clone)]
pub enum StatusChange {
    /// The transition was applied; carries the room as written.
    Applied(Room),
    /// The room was in none of the expected statuses; nothing changed.
    Rejected {
        /// Status observed at the time of the attempt.
        current: RoomStatus,
    },
    /// No room exists under the given code.
    Missing,
}

/// Outcome of atomically advancing a room to its next round.
#[derive(Debug, Clone)]
pub enum RoundAdvance {
    /// The round was started; carries the room as written.
    Started(Room),
    /// Every round has already been played; nothing changed.
    Exhausted,
    /// The room status does not allow starting a round; nothing changed.
    Rejected {
        /// Status observed at the time of the attempt.
        current: RoomStatus,
    },
    /// No room exists under the given code.
    Missing,
}

/// Outcome of enrolling a player into a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerInsert {
    /// The membership record was created.
    Added,
    /// A record for this (room, player) pair already exists.
    AlreadyMember,
    /// The room already holds its maximum number of players.
    RoomFull,
    /// No room exists under the given code.
    RoomMissing,
}

/// Abstraction over the persistence layer for rooms and their players.
///
/// Compound operations (`set_status_if`, `begin_round`, `claim_field`,
/// `add_score`) must be atomic per room: concurrent callers observe either
/// the state before or after, never an interleaving. This is what lets the
/// guess resolver guarantee exactly-once credit per field.
pub trait RoomStore: Send + Sync {
    /// Persist a new room; returns false when the code is already taken.
    fn insert_room(&self, room: Room) -> BoxFuture<'static, StorageResult<bool>>;
    /// Fetch a room snapshot by code.
    fn find_room(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<Room>>>;
    /// Find a WAITING/PLAYING room hosted by the given identity, if any.
    fn find_active_room_for_host(
        &self,
        host_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<String>>>;
    /// Compare-and-set the room status: applied only when the current status
    /// is one of `expected` and the transition is legal.
    fn set_status_if(
        &self,
        code: &str,
        expected: &[RoomStatus],
        next: RoomStatus,
    ) -> BoxFuture<'static, StorageResult<StatusChange>>;
    /// Atomically start the next round: bump the round counter, clear both
    /// claimant slots, install the track, stamp the start time, and move the
    /// room to PLAYING. Applied only when rounds remain and the current
    /// status allows it.
    fn begin_round(
        &self,
        code: &str,
        track: TrackDescriptor,
        started_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<RoundAdvance>>;
    /// Claim a guess field for a player: applied only while the room is
    /// PLAYING and the field's claimant slot is still empty. Returns whether
    /// this call claimed the field.
    fn claim_field(
        &self,
        code: &str,
        field: GuessField,
        player_id: &str,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Add points to a player's score and stamp their activity; returns the
    /// new score, or `None` when the membership record is missing.
    fn add_score(
        &self,
        code: &str,
        player_id: &str,
        delta: u32,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<u32>>>;
    /// Enroll a player; at most one record per (room, player) pair and never
    /// beyond the room's player limit.
    fn insert_player(
        &self,
        code: &str,
        player: Player,
    ) -> BoxFuture<'static, StorageResult<PlayerInsert>>;
    /// Remove a player's membership record; returns whether one existed.
    fn remove_player(
        &self,
        code: &str,
        player_id: &str,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Detach every membership record from the room.
    fn clear_players(&self, code: &str) -> BoxFuture<'static, StorageResult<()>>;
    /// List the room's players in join order.
    fn list_players(&self, code: &str) -> BoxFuture<'static, StorageResult<Vec<Player>>>;
    /// Fetch one membership record.
    fn find_player(
        &self,
        code: &str,
        player_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<Player>>>;
    /// Update a player's last-activity timestamp.
    fn touch_player(
        &self,
        code: &str,
        player_id: &str,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<()>>;
}
