//! Spotify Web API track source, enabled by the `spotify-source` feature.

use std::{collections::HashMap, env, fs, io::ErrorKind, path::PathBuf, sync::Arc};

use futures::future::{self, BoxFuture};
use rand::Rng;
use rand::seq::IndexedRandom;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::state::room::{SongSource, TrackDescriptor};
use crate::track::{TrackError, TrackSource};

/// Base URL of the Spotify Web API.
const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1";
/// Default location of the owner-to-token JSON map.
const DEFAULT_TOKENS_PATH: &str = "config/spotify-tokens.json";
/// Environment variable that overrides [`DEFAULT_TOKENS_PATH`].
const TOKENS_PATH_ENV: &str = "SPOTIFY_TOKENS_PATH";
/// Page size used when sampling top tracks.
const TOP_TRACKS_LIMIT: u32 = 50;
/// Page size used when sampling playlist tracks.
const PLAYLIST_LIMIT: u32 = 100;

/// Capability resolving an owner identity to a bearer token.
///
/// OAuth negotiation and refresh live with the identity provider; the game
/// core only ever sees ready-to-use access tokens.
pub trait AccessTokenProvider: Send + Sync {
    /// Return a usable access token for the owner, if one is on file.
    fn access_token(&self, owner_id: &str) -> BoxFuture<'static, Option<String>>;
}

/// Token provider backed by a JSON file mapping owner ids to access tokens.
pub struct FileTokenProvider {
    tokens: HashMap<String, String>,
}

impl FileTokenProvider {
    /// Load the token map from disk, starting empty when the file is missing
    /// or malformed.
    pub fn load() -> Self {
        let path = resolve_tokens_path();
        let tokens = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<HashMap<String, String>>(&contents) {
                Ok(tokens) => {
                    info!(path = %path.display(), count = tokens.len(), "loaded spotify tokens");
                    tokens
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to parse spotify tokens");
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read spotify tokens");
                HashMap::new()
            }
        };

        Self { tokens }
    }
}

impl AccessTokenProvider for FileTokenProvider {
    fn access_token(&self, owner_id: &str) -> BoxFuture<'static, Option<String>> {
        Box::pin(future::ready(self.tokens.get(owner_id).cloned()))
    }
}

/// Track source drawing random picks from the Spotify Web API.
pub struct SpotifyTrackSource {
    client: Client,
    tokens: Arc<dyn AccessTokenProvider>,
    api_base: Arc<str>,
}

impl SpotifyTrackSource {
    /// Build a source on top of the given token provider.
    pub fn new(tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self {
            client: Client::new(),
            tokens,
            api_base: Arc::from(DEFAULT_API_BASE),
        }
    }

    async fn fetch(
        client: Client,
        api_base: Arc<str>,
        token: String,
        owner: String,
        source: SongSource,
        source_id: Option<String>,
    ) -> Result<TrackDescriptor, TrackError> {
        let track = match source {
            SongSource::LikedSongs => {
                // Two requests: first learns the library size, second lands
                // on a uniformly random saved track.
                let url = format!("{api_base}/me/tracks?limit=1");
                let page: SavedTracksPage = get_json(&client, &url, &token, &owner).await?;
                if page.total == 0 {
                    return Err(TrackError::NoTracksAvailable);
                }
                let offset = rand::rng().random_range(0..page.total);
                let url = format!("{api_base}/me/tracks?limit=1&offset={offset}");
                let page: SavedTracksPage = get_json(&client, &url, &token, &owner).await?;
                page.items
                    .into_iter()
                    .next()
                    .map(|item| item.track)
                    .ok_or(TrackError::NoTracksAvailable)?
            }
            SongSource::Playlist => {
                let playlist_id = source_id.ok_or_else(|| TrackError::Upstream {
                    message: "playlist source requires a playlist id".into(),
                })?;
                let url = format!(
                    "{api_base}/playlists/{playlist_id}/tracks?limit={PLAYLIST_LIMIT}"
                );
                let page: PlaylistPage = get_json(&client, &url, &token, &owner).await?;
                let tracks: Vec<ApiTrack> = page
                    .items
                    .into_iter()
                    .filter_map(|item| item.track)
                    .collect();
                tracks
                    .choose(&mut rand::rng())
                    .cloned()
                    .ok_or(TrackError::NoTracksAvailable)?
            }
            SongSource::TopTracks => {
                let url = format!(
                    "{api_base}/me/top/tracks?limit={TOP_TRACKS_LIMIT}&time_range=medium_term"
                );
                let page: TopTracksPage = get_json(&client, &url, &token, &owner).await?;
                page.items
                    .choose(&mut rand::rng())
                    .cloned()
                    .ok_or(TrackError::NoTracksAvailable)?
            }
        };

        Ok(track.into())
    }
}

impl TrackSource for SpotifyTrackSource {
    fn has_credential(&self, owner_id: &str) -> BoxFuture<'static, bool> {
        let lookup = self.tokens.access_token(owner_id);
        Box::pin(async move { lookup.await.is_some() })
    }

    fn fetch_track(
        &self,
        owner_id: &str,
        source: SongSource,
        source_id: Option<&str>,
    ) -> BoxFuture<'static, Result<TrackDescriptor, TrackError>> {
        let client = self.client.clone();
        let api_base = Arc::clone(&self.api_base);
        let tokens = Arc::clone(&self.tokens);
        let owner = owner_id.to_string();
        let source_id = source_id.map(str::to_owned);

        Box::pin(async move {
            let token = tokens
                .access_token(&owner)
                .await
                .ok_or_else(|| TrackError::NoCredential {
                    owner: owner.clone(),
                })?;
            Self::fetch(client, api_base, token, owner, source, source_id).await
        })
    }
}

async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    token: &str,
    owner: &str,
) -> Result<T, TrackError> {
    let response = client
        .get(url)
        .bearer_auth(token)
        .send()
        .await
        .map_err(|err| TrackError::Upstream {
            message: err.to_string(),
        })?;

    match response.status() {
        status if status.is_success() => {
            response.json::<T>().await.map_err(|err| TrackError::Upstream {
                message: format!("malformed spotify response: {err}"),
            })
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(TrackError::NoCredential {
            owner: owner.to_string(),
        }),
        status => Err(TrackError::Upstream {
            message: format!("spotify answered {status}"),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct SavedTracksPage {
    total: u64,
    items: Vec<SavedTrackItem>,
}

#[derive(Debug, Deserialize)]
struct SavedTrackItem {
    track: ApiTrack,
}

#[derive(Debug, Deserialize)]
struct PlaylistPage {
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    /// Absent for removed or locally-added entries.
    track: Option<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct TopTracksPage {
    items: Vec<ApiTrack>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiTrack {
    id: String,
    name: String,
    artists: Vec<ApiArtist>,
    album: ApiAlbum,
    duration_ms: u64,
    #[serde(default)]
    preview_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiArtist {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiAlbum {
    #[serde(default)]
    images: Vec<ApiImage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiImage {
    url: String,
}

impl From<ApiTrack> for TrackDescriptor {
    fn from(track: ApiTrack) -> Self {
        Self {
            track_id: track.id,
            title: track.name,
            artist: track
                .artists
                .into_iter()
                .map(|artist| artist.name)
                .collect::<Vec<_>>()
                .join(", "),
            album_art: track
                .album
                .images
                .into_iter()
                .next()
                .map(|image| image.url)
                .unwrap_or_default(),
            duration_ms: track.duration_ms,
            preview_url: track.preview_url,
        }
    }
}

/// Resolve the tokens path taking the environment override into account.
fn resolve_tokens_path() -> PathBuf {
    env::var_os(TOKENS_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKENS_PATH))
}
