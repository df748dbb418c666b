use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::state::room::GuessField;

/// Payload sent by the host to start the game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct StartGameRequest {
    /// Identity of the requester; must be the host.
    #[validate(length(min = 1))]
    pub player_id: String,
}

/// Inbound guess submission.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GuessRequest {
    /// Identity of the guessing player.
    #[validate(length(min = 1))]
    pub player_id: String,
    /// Free-text guess; blank submissions never score.
    #[validate(length(max = 200))]
    pub text: String,
}

/// Payload sent by the host to advance to the next round.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct NextRoundRequest {
    /// Identity of the requester; must be the host.
    #[validate(length(min = 1))]
    pub player_id: String,
}

/// Payload sent by the host to close the room.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CloseRoomRequest {
    /// Identity of the requester; must be the host.
    #[validate(length(min = 1))]
    pub player_id: String,
}

/// Result of one guess submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct GuessResponse {
    /// Whether this guess claimed at least one field.
    pub correct: bool,
    /// Fields newly claimed by this guess.
    pub fields: Vec<GuessField>,
    /// Points awarded for this guess.
    pub points: u32,
}

impl GuessResponse {
    /// Response for a guess that claimed nothing.
    pub fn miss() -> Self {
        Self {
            correct: false,
            fields: Vec::new(),
            points: 0,
        }
    }
}
