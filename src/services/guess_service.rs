//! Concurrent-guess resolution: first-claim-wins per field, scored exactly once.

use std::time::SystemTime;

use tracing::warn;

use crate::{
    dto::game::GuessResponse,
    error::ServiceError,
    matching::is_match,
    state::{SharedState, room::GuessField},
};

/// What a single guess achieved.
#[derive(Debug, Clone)]
pub struct GuessOutcome {
    /// Whether the guess claimed at least one field.
    pub correct: bool,
    /// Fields newly claimed by this guess. Matching an already-claimed field
    /// does not appear here and does not score.
    pub fields: Vec<GuessField>,
    /// Points awarded for this guess.
    pub points: u32,
}

impl GuessOutcome {
    fn miss() -> Self {
        Self {
            correct: false,
            fields: Vec::new(),
            points: 0,
        }
    }
}

impl From<GuessOutcome> for GuessResponse {
    fn from(outcome: GuessOutcome) -> Self {
        Self {
            correct: outcome.correct,
            fields: outcome.fields,
            points: outcome.points,
        }
    }
}

/// Resolve one guess against the room's live round.
///
/// Field claims go through the store's conditional update, so two guesses
/// racing for the same field end with exactly one winner; the loser simply
/// reports no claim. Rejected guesses have no side effects.
pub async fn resolve(
    state: &SharedState,
    code: &str,
    player_id: &str,
    text: &str,
) -> Result<GuessOutcome, ServiceError> {
    if text.trim().is_empty() {
        return Ok(GuessOutcome::miss());
    }

    let store = state.store();
    let Some(room) = store.find_room(code).await? else {
        return Err(ServiceError::NotFound(format!("room `{code}` not found")));
    };
    let Some(track) = room.current_track.clone().filter(|_| room.round_is_live()) else {
        return Err(ServiceError::InactiveRound);
    };

    let config = state.config();
    let mut fields = Vec::new();

    if is_match(text, &track.artist, config.match_threshold)
        && store.claim_field(code, GuessField::Artist, player_id).await?
    {
        fields.push(GuessField::Artist);
    }
    if is_match(text, &track.title, config.match_threshold)
        && store.claim_field(code, GuessField::Title, player_id).await?
    {
        fields.push(GuessField::Title);
    }

    if fields.is_empty() {
        return Ok(GuessOutcome::miss());
    }

    // One precise guess that lands both fields earns the flat bonus, not the
    // sum of the per-field values.
    let points = if fields.len() == 2 {
        config.full_guess_bonus
    } else {
        fields
            .iter()
            .map(|field| match field {
                GuessField::Artist => config.artist_points,
                GuessField::Title => config.title_points,
            })
            .sum()
    };

    if store
        .add_score(code, player_id, points, SystemTime::now())
        .await?
        .is_none()
    {
        warn!(code, player_id, "scoring guess from a player with no membership record");
    }

    Ok(GuessOutcome {
        correct: true,
        fields,
        points,
    })
}
