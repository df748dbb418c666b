//! Shared fixtures for service-layer tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::{self, BoxFuture};

use crate::{
    config::AppConfig,
    dao::memory::MemoryRoomStore,
    dto::room::{CreateRoomRequest, JoinRoomRequest},
    services::{game_service, room_service},
    state::{AppState, SharedState, room::{SongSource, TrackDescriptor}},
    track::{TrackError, TrackSource},
};

/// Track source serving a scripted queue of tracks.
pub(crate) struct StubTrackSource {
    tracks: Mutex<VecDeque<TrackDescriptor>>,
    fail_next: AtomicBool,
    hang_next: AtomicBool,
}

impl StubTrackSource {
    pub(crate) fn new(tracks: Vec<TrackDescriptor>) -> Self {
        Self {
            tracks: Mutex::new(tracks.into()),
            fail_next: AtomicBool::new(false),
            hang_next: AtomicBool::new(false),
        }
    }

    /// Make the next fetch fail with an upstream error.
    pub(crate) fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Make the next fetch hang forever, exercising the fetch timeout.
    pub(crate) fn hang_next(&self) {
        self.hang_next.store(true, Ordering::SeqCst);
    }
}

impl TrackSource for StubTrackSource {
    fn has_credential(&self, _owner_id: &str) -> BoxFuture<'static, bool> {
        Box::pin(future::ready(true))
    }

    fn fetch_track(
        &self,
        _owner_id: &str,
        _source: SongSource,
        _source_id: Option<&str>,
    ) -> BoxFuture<'static, Result<TrackDescriptor, TrackError>> {
        if self.hang_next.swap(false, Ordering::SeqCst) {
            return Box::pin(future::pending());
        }
        let result = if self.fail_next.swap(false, Ordering::SeqCst) {
            Err(TrackError::Upstream {
                message: "stubbed upstream failure".into(),
            })
        } else {
            self.tracks
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(TrackError::NoTracksAvailable)
        };
        Box::pin(future::ready(result))
    }
}

pub(crate) fn sample_track(title: &str, artist: &str) -> TrackDescriptor {
    TrackDescriptor {
        track_id: format!("track-{}", crate::matching::normalize(title)),
        title: title.into(),
        artist: artist.into(),
        album_art: "https://img.example/cover".into(),
        duration_ms: 201_000,
        preview_url: None,
    }
}

pub(crate) fn test_state(tracks: Vec<TrackDescriptor>) -> SharedState {
    test_state_with_config(AppConfig::default(), tracks)
}

pub(crate) fn test_state_with_config(
    config: AppConfig,
    tracks: Vec<TrackDescriptor>,
) -> SharedState {
    test_state_with_source(config, Arc::new(StubTrackSource::new(tracks)))
}

pub(crate) fn test_state_with_source(
    config: AppConfig,
    tracks: Arc<StubTrackSource>,
) -> SharedState {
    AppState::new(config, Arc::new(MemoryRoomStore::new()), tracks)
}

/// Create a WAITING room hosted by "host" with "guest" joined.
pub(crate) async fn create_room_with(
    state: &SharedState,
    total_rounds: u32,
    round_duration_secs: u32,
) -> String {
    let room = room_service::create_room(
        state,
        CreateRoomRequest {
            host_id: "host".into(),
            display_name: "Host".into(),
            avatar: None,
            total_rounds,
            round_duration_secs,
            max_players: 10,
            source: SongSource::LikedSongs,
            source_id: None,
        },
    )
    .await
    .expect("room creation");

    room_service::join_room(
        state,
        &room.code,
        JoinRoomRequest {
            player_id: "guest".into(),
            display_name: "Guest".into(),
            avatar: None,
        },
    )
    .await
    .expect("guest join");

    room.code
}

/// A one-round WAITING room that has not started yet.
pub(crate) async fn waiting_room(state: &SharedState) -> String {
    create_room_with(state, 1, 30).await
}

/// A room with round one live.
pub(crate) async fn joined_room(state: &SharedState, total_rounds: u32) -> String {
    let code = create_room_with(state, total_rounds, 30).await;
    game_service::start_game(state, &code, "host")
        .await
        .expect("game start");
    code
}
