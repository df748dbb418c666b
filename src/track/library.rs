//! File-backed track source used for demos, tests, and offline runs.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use futures::future::{self, BoxFuture};
use rand::seq::IndexedRandom;
use serde::Deserialize;
use tracing::{info, warn};

use crate::state::room::{SongSource, TrackDescriptor};
use crate::track::{TrackError, TrackSource};

/// Default location on disk where the server looks for the track library.
const DEFAULT_LIBRARY_PATH: &str = "config/library.json";
/// Environment variable that overrides [`DEFAULT_LIBRARY_PATH`].
const LIBRARY_PATH_ENV: &str = "GUESSIFY_BACK_LIBRARY_PATH";

/// One entry of the JSON track library.
#[derive(Debug, Clone, Deserialize)]
struct LibraryTrack {
    track_id: String,
    title: String,
    artist: String,
    #[serde(default)]
    album_art: String,
    duration_ms: u64,
    #[serde(default)]
    preview_url: Option<String>,
    /// Optional playlist tag matched against a room's source sub-id.
    #[serde(default)]
    playlist: Option<String>,
}

/// Track source serving random picks out of a local JSON library.
///
/// Credentials always pass: the library belongs to the server, not to any
/// player.
pub struct LibraryTrackSource {
    tracks: Vec<LibraryTrack>,
}

impl LibraryTrackSource {
    /// Load the library from disk, falling back to an empty list when the
    /// file is missing or malformed. An empty library yields
    /// [`TrackError::NoTracksAvailable`] on every fetch.
    pub fn load() -> Self {
        let path = resolve_library_path();
        let tracks = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Vec<LibraryTrack>>(&contents) {
                Ok(tracks) => {
                    info!(path = %path.display(), count = tracks.len(), "loaded track library");
                    tracks
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to parse track library");
                    Vec::new()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "track library not found; starting empty");
                Vec::new()
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read track library");
                Vec::new()
            }
        };

        Self { tracks }
    }

    /// Build a library from already-materialized entries (used in tests).
    #[cfg(test)]
    fn with_tracks(tracks: Vec<LibraryTrack>) -> Self {
        Self { tracks }
    }

    fn pick(&self, source: SongSource, source_id: Option<&str>) -> Result<TrackDescriptor, TrackError> {
        let candidates: Vec<&LibraryTrack> = match (source, source_id) {
            (SongSource::Playlist, Some(wanted)) => self
                .tracks
                .iter()
                .filter(|track| track.playlist.as_deref() == Some(wanted))
                .collect(),
            _ => self.tracks.iter().collect(),
        };

        let mut rng = rand::rng();
        let track = candidates
            .choose(&mut rng)
            .ok_or(TrackError::NoTracksAvailable)?;

        Ok(TrackDescriptor {
            track_id: track.track_id.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            album_art: track.album_art.clone(),
            duration_ms: track.duration_ms,
            preview_url: track.preview_url.clone(),
        })
    }
}

impl TrackSource for LibraryTrackSource {
    fn has_credential(&self, _owner_id: &str) -> BoxFuture<'static, bool> {
        Box::pin(future::ready(true))
    }

    fn fetch_track(
        &self,
        _owner_id: &str,
        source: SongSource,
        source_id: Option<&str>,
    ) -> BoxFuture<'static, Result<TrackDescriptor, TrackError>> {
        Box::pin(future::ready(self.pick(source, source_id)))
    }
}

/// Resolve the library path taking the environment override into account.
fn resolve_library_path() -> PathBuf {
    env::var_os(LIBRARY_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LIBRARY_PATH))
}
