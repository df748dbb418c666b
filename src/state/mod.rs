//! Shared application state wiring the store, track source, scheduler, and
//! event hub together.

pub mod events;
pub mod room;
pub mod scheduler;

use std::sync::Arc;

use crate::{config::AppConfig, dao::RoomStore, track::TrackSource};

pub use self::events::RoomEventHub;
pub use self::scheduler::RoundScheduler;

/// Cheaply clonable handle on the application state.
pub type SharedState = Arc<AppState>;

/// Buffered events per room channel before slow subscribers start lagging.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Central application state shared by every request handler and timer.
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn RoomStore>,
    tracks: Arc<dyn TrackSource>,
    scheduler: RoundScheduler,
    events: RoomEventHub,
}

impl AppState {
    /// Construct the shared state wrapped in an [`Arc`].
    pub fn new(
        config: AppConfig,
        store: Arc<dyn RoomStore>,
        tracks: Arc<dyn TrackSource>,
    ) -> SharedState {
        Arc::new(Self {
            config,
            store,
            tracks,
            scheduler: RoundScheduler::new(),
            events: RoomEventHub::new(EVENT_CHANNEL_CAPACITY),
        })
    }

    /// Game rules and timing configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the room store.
    pub fn store(&self) -> &dyn RoomStore {
        self.store.as_ref()
    }

    /// Handle to the track source capability.
    pub fn tracks(&self) -> &dyn TrackSource {
        self.tracks.as_ref()
    }

    /// Per-room round timers.
    pub fn scheduler(&self) -> &RoundScheduler {
        &self.scheduler
    }

    /// Per-room event broadcast hub.
    pub fn events(&self) -> &RoomEventHub {
        &self.events
    }
}
