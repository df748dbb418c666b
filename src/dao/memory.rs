//! In-memory room store backing tests and single-node deployments.

use std::time::SystemTime;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{self, BoxFuture};
use indexmap::IndexMap;

use crate::dao::storage::StorageResult;
use crate::dao::{PlayerInsert, RoomStore, RoundAdvance, StatusChange};
use crate::state::room::{GuessField, Player, Room, RoomStatus, TrackDescriptor};

/// Room record plus its memberships, mutated as one unit.
struct RoomSlot {
    room: Room,
    /// Keyed by player identity; iteration order is join order.
    players: IndexMap<String, Player>,
}

/// Sharded in-memory store.
///
/// Every mutation runs while holding the room's map entry, so each compound
/// update is a per-room single-writer critical section: two concurrent
/// claims on the same field serialize and exactly one wins.
#[derive(Default)]
pub struct MemoryRoomStore {
    rooms: DashMap<String, RoomSlot>,
}

impl MemoryRoomStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomStore for MemoryRoomStore {
    fn insert_room(&self, room: Room) -> BoxFuture<'static, StorageResult<bool>> {
        let inserted = match self.rooms.entry(room.code.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(RoomSlot {
                    room,
                    players: IndexMap::new(),
                });
                true
            }
        };
        Box::pin(future::ready(Ok(inserted)))
    }

    fn find_room(&self, code: &str) -> BoxFuture<'static, StorageResult<Option<Room>>> {
        let room = self.rooms.get(code).map(|slot| slot.room.clone());
        Box::pin(future::ready(Ok(room)))
    }

    fn find_active_room_for_host(
        &self,
        host_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let code = self
            .rooms
            .iter()
            .find(|slot| {
                slot.room.host_id == host_id
                    && matches!(slot.room.status, RoomStatus::Waiting | RoomStatus::Playing)
            })
            .map(|slot| slot.room.code.clone());
        Box::pin(future::ready(Ok(code)))
    }

    fn set_status_if(
        &self,
        code: &str,
        expected: &[RoomStatus],
        next: RoomStatus,
    ) -> BoxFuture<'static, StorageResult<StatusChange>> {
        let change = match self.rooms.get_mut(code) {
            None => StatusChange::Missing,
            Some(mut slot) => {
                let room = &mut slot.room;
                if expected.contains(&room.status) && room.status.may_transition_to(next) {
                    room.status = next;
                    room.updated_at = SystemTime::now();
                    StatusChange::Applied(room.clone())
                } else {
                    StatusChange::Rejected {
                        current: room.status,
                    }
                }
            }
        };
        Box::pin(future::ready(Ok(change)))
    }

    fn begin_round(
        &self,
        code: &str,
        track: TrackDescriptor,
        started_at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<RoundAdvance>> {
        let advance = match self.rooms.get_mut(code) {
            None => RoundAdvance::Missing,
            Some(mut slot) => {
                let room = &mut slot.room;
                if room.current_round >= room.total_rounds {
                    RoundAdvance::Exhausted
                } else if !room.status.may_transition_to(RoomStatus::Playing) {
                    RoundAdvance::Rejected {
                        current: room.status,
                    }
                } else {
                    room.current_round += 1;
                    room.status = RoomStatus::Playing;
                    room.artist_guessed_by = None;
                    room.title_guessed_by = None;
                    room.current_track = Some(track);
                    room.round_started_at = Some(started_at);
                    room.updated_at = started_at;
                    RoundAdvance::Started(room.clone())
                }
            }
        };
        Box::pin(future::ready(Ok(advance)))
    }

    fn claim_field(
        &self,
        code: &str,
        field: GuessField,
        player_id: &str,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let claimed = match self.rooms.get_mut(code) {
            None => false,
            Some(mut slot) => {
                let room = &mut slot.room;
                if !room.round_is_live() {
                    false
                } else {
                    let claimant = match field {
                        GuessField::Artist => &mut room.artist_guessed_by,
                        GuessField::Title => &mut room.title_guessed_by,
                    };
                    if claimant.is_none() {
                        *claimant = Some(player_id.to_string());
                        room.updated_at = SystemTime::now();
                        true
                    } else {
                        false
                    }
                }
            }
        };
        Box::pin(future::ready(Ok(claimed)))
    }

    fn add_score(
        &self,
        code: &str,
        player_id: &str,
        delta: u32,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<u32>>> {
        let new_score = self.rooms.get_mut(code).and_then(|mut slot| {
            slot.players.get_mut(player_id).map(|player| {
                player.score += delta;
                player.last_activity = at;
                player.score
            })
        });
        Box::pin(future::ready(Ok(new_score)))
    }

    fn insert_player(
        &self,
        code: &str,
        player: Player,
    ) -> BoxFuture<'static, StorageResult<PlayerInsert>> {
        let outcome = match self.rooms.get_mut(code) {
            None => PlayerInsert::RoomMissing,
            Some(mut slot) => {
                if slot.players.contains_key(&player.id) {
                    PlayerInsert::AlreadyMember
                } else if slot.players.len() as u32 >= slot.room.max_players {
                    PlayerInsert::RoomFull
                } else {
                    slot.players.insert(player.id.clone(), player);
                    PlayerInsert::Added
                }
            }
        };
        Box::pin(future::ready(Ok(outcome)))
    }

    fn remove_player(
        &self,
        code: &str,
        player_id: &str,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let removed = self
            .rooms
            .get_mut(code)
            // shift_remove keeps join order intact for the remaining players
            .map(|mut slot| slot.players.shift_remove(player_id).is_some())
            .unwrap_or(false);
        Box::pin(future::ready(Ok(removed)))
    }

    fn clear_players(&self, code: &str) -> BoxFuture<'static, StorageResult<()>> {
        if let Some(mut slot) = self.rooms.get_mut(code) {
            slot.players.clear();
        }
        Box::pin(future::ready(Ok(())))
    }

    fn list_players(&self, code: &str) -> BoxFuture<'static, StorageResult<Vec<Player>>> {
        let players = self
            .rooms
            .get(code)
            .map(|slot| slot.players.values().cloned().collect())
            .unwrap_or_default();
        Box::pin(future::ready(Ok(players)))
    }

    fn find_player(
        &self,
        code: &str,
        player_id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<Player>>> {
        let player = self
            .rooms
            .get(code)
            .and_then(|slot| slot.players.get(player_id).cloned());
        Box::pin(future::ready(Ok(player)))
    }

    fn touch_player(
        &self,
        code: &str,
        player_id: &str,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<()>> {
        if let Some(mut slot) = self.rooms.get_mut(code) {
            if let Some(player) = slot.players.get_mut(player_id) {
                player.last_activity = at;
            }
        }
        Box::pin(future::ready(Ok(())))
    }
}
