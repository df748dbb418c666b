//! Application-level configuration loading, including game rules and timing.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::matching::DEFAULT_MATCH_THRESHOLD;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GUESSIFY_BACK_CONFIG_PATH";

/// Points awarded to the first player to guess the artist.
const DEFAULT_ARTIST_POINTS: u32 = 2;
/// Points awarded to the first player to guess the title.
const DEFAULT_TITLE_POINTS: u32 = 3;
/// Flat total awarded when one guess claims both fields. This overrides the
/// per-field sum instead of adding to it.
const DEFAULT_FULL_GUESS_BONUS: u32 = 5;
/// Pause between both fields being claimed and the round ending.
const DEFAULT_REVEAL_DELAY: Duration = Duration::from_secs(3);
/// Pause between the final round ending and the final standings.
const DEFAULT_STANDINGS_DELAY: Duration = Duration::from_secs(5);
/// Upper bound on a single track-source fetch.
const DEFAULT_TRACK_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Similarity ratio a partial guess must reach to count as a match.
    pub match_threshold: f64,
    /// Points for being first to guess the artist.
    pub artist_points: u32,
    /// Points for being first to guess the title.
    pub title_points: u32,
    /// Flat total when a single guess claims both fields.
    pub full_guess_bonus: u32,
    /// Delay before ending a round once both fields are claimed.
    pub reveal_delay: Duration,
    /// Delay before announcing final standings after the last round.
    pub standings_delay: Duration,
    /// Timeout applied to every track-source fetch.
    pub track_fetch_timeout: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// baked-in defaults when the file is missing or malformed.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded game rules from config");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            artist_points: DEFAULT_ARTIST_POINTS,
            title_points: DEFAULT_TITLE_POINTS,
            full_guess_bonus: DEFAULT_FULL_GUESS_BONUS,
            reveal_delay: DEFAULT_REVEAL_DELAY,
            standings_delay: DEFAULT_STANDINGS_DELAY,
            track_fetch_timeout: DEFAULT_TRACK_FETCH_TIMEOUT,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    match_threshold: Option<f64>,
    artist_points: Option<u32>,
    title_points: Option<u32>,
    full_guess_bonus: Option<u32>,
    reveal_delay_secs: Option<u64>,
    standings_delay_secs: Option<u64>,
    track_fetch_timeout_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            match_threshold: value.match_threshold.unwrap_or(defaults.match_threshold),
            artist_points: value.artist_points.unwrap_or(defaults.artist_points),
            title_points: value.title_points.unwrap_or(defaults.title_points),
            full_guess_bonus: value.full_guess_bonus.unwrap_or(defaults.full_guess_bonus),
            reveal_delay: value
                .reveal_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.reveal_delay),
            standings_delay: value
                .standings_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.standings_delay),
            track_fetch_timeout: value
                .track_fetch_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.track_fetch_timeout),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_remaining_defaults() {
        let raw: RawConfig = serde_json::from_str(r#"{"title_points": 4}"#).unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.title_points, 4);
        assert_eq!(config.artist_points, DEFAULT_ARTIST_POINTS);
        assert_eq!(config.full_guess_bonus, DEFAULT_FULL_GUESS_BONUS);
    }
}
