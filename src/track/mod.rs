//! Track-source capability: where round tracks come from.

pub mod library;
#[cfg(feature = "spotify-source")]
pub mod spotify;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::state::room::{SongSource, TrackDescriptor};

/// Errors raised while fetching a round track.
#[derive(Debug, Error)]
pub enum TrackError {
    /// The owner has no usable credential for the source.
    #[error("no usable track-source credential for `{owner}`")]
    NoCredential {
        /// Identity whose credential lookup failed.
        owner: String,
    },
    /// The selected source exists but holds no playable tracks.
    #[error("no tracks available from the selected source")]
    NoTracksAvailable,
    /// The upstream provider failed or answered with garbage.
    #[error("track source upstream failure: {message}")]
    Upstream {
        /// Human-readable description of the upstream failure.
        message: String,
    },
}

/// Capability that yields one random track for a round.
///
/// Implementations must not block indefinitely; the orchestrator wraps every
/// fetch in its own timeout regardless.
pub trait TrackSource: Send + Sync {
    /// Whether the owner holds a credential good enough to fetch tracks.
    fn has_credential(&self, owner_id: &str) -> BoxFuture<'static, bool>;
    /// Fetch one track for the given source selector.
    fn fetch_track(
        &self,
        owner_id: &str,
        source: SongSource,
        source_id: Option<&str>,
    ) -> BoxFuture<'static, Result<TrackDescriptor, TrackError>>;
}
