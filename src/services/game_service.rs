//! Game orchestration: round flow, guess handling, and final standings.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{
    dao::{RoundAdvance, StatusChange},
    dto::room::PlayerSummary,
    error::ServiceError,
    services::{guess_service, guess_service::GuessOutcome, room_events, room_service},
    state::{
        SharedState,
        room::{Player, Room, RoomStatus},
    },
    track::TrackError,
};

/// Players shown on broadcast leaderboards and final standings.
pub(crate) const LEADERBOARD_LIMIT: usize = 10;

/// Rank players by score, join order breaking ties, capped for display.
pub(crate) fn standings(mut players: Vec<Player>) -> Vec<PlayerSummary> {
    // Stable sort: equal scores keep join order, which makes ranking
    // deterministic under replays.
    players.sort_by(|a, b| b.score.cmp(&a.score));
    players
        .into_iter()
        .take(LEADERBOARD_LIMIT)
        .map(Into::into)
        .collect()
}

/// Start the game; host only, and only from WAITING.
pub async fn start_game(
    state: &SharedState,
    code: &str,
    requester: &str,
) -> Result<(), ServiceError> {
    let room = room_service::require_room(state, code).await?;
    if requester != room.host_id {
        return Err(ServiceError::Forbidden(
            "only the host can start the game".into(),
        ));
    }
    if room.status != RoomStatus::Waiting {
        return Err(ServiceError::InvalidState("game already started".into()));
    }
    if state.store().list_players(code).await?.is_empty() {
        return Err(ServiceError::InvalidState(
            "cannot start a game without players".into(),
        ));
    }

    let room = advance_round(state, code).await?;
    info!(code, "game started");
    room_events::broadcast_game_started(state, code, &room);
    room_events::broadcast_round_started(state, code, &room);
    Ok(())
}

/// Start the next round and announce it.
pub async fn start_round(state: &SharedState, code: &str) -> Result<Room, ServiceError> {
    let room = advance_round(state, code).await?;
    room_events::broadcast_round_started(state, code, &room);
    Ok(room)
}

/// Fetch a track and atomically move the room into its next round.
///
/// A fetch failure or timeout propagates before anything is written, so the
/// room is left untouched and the caller may simply retry.
async fn advance_round(state: &SharedState, code: &str) -> Result<Room, ServiceError> {
    let room = room_service::require_room(state, code).await?;
    if room.current_round >= room.total_rounds {
        return Err(ServiceError::InvalidState(
            "all rounds have been played".into(),
        ));
    }

    let fetch = state
        .tracks()
        .fetch_track(&room.host_id, room.source, room.source_id.as_deref());
    let track = match timeout(state.config().track_fetch_timeout, fetch).await {
        Ok(Ok(track)) => track,
        Ok(Err(err)) => return Err(err.into()),
        Err(_) => {
            return Err(ServiceError::TrackUnavailable(TrackError::Upstream {
                message: "track fetch timed out".into(),
            }));
        }
    };

    let advance = state
        .store()
        .begin_round(code, track, SystemTime::now())
        .await?;
    let room = match advance {
        RoundAdvance::Started(room) => room,
        RoundAdvance::Exhausted => {
            return Err(ServiceError::InvalidState(
                "all rounds have been played".into(),
            ));
        }
        RoundAdvance::Rejected { current } => {
            return Err(ServiceError::InvalidState(format!(
                "cannot start a round while the room is {current:?}"
            )));
        }
        RoundAdvance::Missing => {
            return Err(ServiceError::NotFound(format!("room `{code}` not found")));
        }
    };

    debug!(code, round = room.current_round, "round started");
    schedule_round_end(
        state,
        code,
        Duration::from_secs(u64::from(room.round_duration_secs)),
    );
    Ok(room)
}

/// Resolve a guess and fan out the resulting events.
///
/// When the guess completes the round (both fields claimed), the round keeps
/// running for a short reveal delay so clients can show the correct-guess
/// notification, then ends early.
pub async fn submit_guess(
    state: &SharedState,
    code: &str,
    player_id: &str,
    text: &str,
) -> Result<GuessOutcome, ServiceError> {
    let outcome = guess_service::resolve(state, code, player_id, text).await?;
    if outcome.points == 0 {
        return Ok(outcome);
    }

    let display_name = state
        .store()
        .find_player(code, player_id)
        .await?
        .map(|player| player.display_name)
        .unwrap_or_else(|| player_id.to_string());
    room_events::broadcast_correct_guess(state, code, player_id, &display_name, &outcome);

    let players = state.store().list_players(code).await?;
    room_events::broadcast_leaderboard(state, code, standings(players));

    let room = room_service::require_room(state, code).await?;
    if room.fully_guessed() && room.status == RoomStatus::Playing {
        schedule_round_end(state, code, state.config().reveal_delay);
    }

    Ok(outcome)
}

/// End the current round, revealing the answer.
///
/// Guarded by a status compare-and-set: the round-duration timer and the
/// early-end timer can both route here, and whichever runs second observes
/// the room already out of PLAYING and does nothing.
pub async fn end_round(state: &SharedState, code: &str) -> Result<(), ServiceError> {
    let change = state
        .store()
        .set_status_if(code, &[RoomStatus::Playing], RoomStatus::RoundEnd)
        .await?;

    let room = match change {
        StatusChange::Applied(room) => room,
        StatusChange::Rejected { current } => {
            debug!(code, status = ?current, "round already ended; skipping");
            return Ok(());
        }
        StatusChange::Missing => {
            debug!(code, "round end fired for an unknown room; skipping");
            return Ok(());
        }
    };

    info!(code, round = room.current_round, "round ended");
    room_events::broadcast_round_ended(state, code, &room);

    let players = state.store().list_players(code).await?;
    room_events::broadcast_leaderboard(state, code, standings(players));

    if room.current_round >= room.total_rounds {
        schedule_game_end(state, code, state.config().standings_delay);
    }
    Ok(())
}

/// Advance to the next round, or finish the game when none remain. Host only.
pub async fn next_round(
    state: &SharedState,
    code: &str,
    requester: &str,
) -> Result<(), ServiceError> {
    let room = room_service::require_room(state, code).await?;
    if requester != room.host_id {
        return Err(ServiceError::Forbidden(
            "only the host can start the next round".into(),
        ));
    }
    if room.status != RoomStatus::RoundEnd {
        return Err(ServiceError::InvalidState(
            "current round has not ended".into(),
        ));
    }

    if room.current_round >= room.total_rounds {
        end_game(state, code).await.map(|_| ())
    } else {
        start_round(state, code).await.map(|_| ())
    }
}

/// Finish the game and announce the final standings.
///
/// Safe to call from both the host path and the delayed timer path; the
/// status compare-and-set guarantees a single game-ended event.
pub async fn end_game(state: &SharedState, code: &str) -> Result<Vec<PlayerSummary>, ServiceError> {
    // Whatever happens next, no stale round timer may outlive the game.
    state.scheduler().cancel(code);

    let change = state
        .store()
        .set_status_if(code, &[RoomStatus::RoundEnd], RoomStatus::GameEnd)
        .await?;

    let players = state.store().list_players(code).await?;
    let standings = standings(players);

    match change {
        StatusChange::Applied(room) => {
            info!(code = %room.code, "game ended");
            room_events::broadcast_game_ended(state, code, standings.clone());
            Ok(standings)
        }
        StatusChange::Rejected { current } => {
            debug!(code, status = ?current, "game end skipped");
            Ok(standings)
        }
        StatusChange::Missing => Err(ServiceError::NotFound(format!("room `{code}` not found"))),
    }
}

fn schedule_round_end(state: &SharedState, code: &str, delay: Duration) {
    let task_state = Arc::clone(state);
    let task_code = code.to_string();
    state.scheduler().schedule(code, delay, move || async move {
        if let Err(err) = end_round(&task_state, &task_code).await {
            warn!(code = %task_code, error = %err, "background round end failed");
        }
    });
}

fn schedule_game_end(state: &SharedState, code: &str, delay: Duration) {
    let task_state = Arc::clone(state);
    let task_code = code.to_string();
    state.scheduler().schedule(code, delay, move || async move {
        if let Err(err) = end_game(&task_state, &task_code).await {
            warn!(code = %task_code, error = %err, "background game end failed");
        }
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::Value;
    use tokio::sync::broadcast::Receiver;

    use super::*;
    use crate::config::AppConfig;
    use crate::dto::sse::ServerEvent;
    use crate::services::room_service;
    use crate::services::test_support::{
        StubTrackSource, create_room_with, joined_room, sample_track, test_state,
        test_state_with_source, waiting_room,
    };

    fn drain(receiver: &mut Receiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    fn names(events: &[ServerEvent]) -> Vec<String> {
        events.iter().filter_map(|e| e.event.clone()).collect()
    }

    fn payload(event: &ServerEvent) -> Value {
        serde_json::from_str(&event.data).expect("event payload parses")
    }

    #[tokio::test]
    async fn start_game_is_host_only() {
        let state = test_state(vec![sample_track("Halo", "Beyoncé")]);
        let code = waiting_room(&state).await;

        let err = start_game(&state, &code, "guest").await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn start_game_rejects_a_running_game() {
        let state = test_state(vec![
            sample_track("Halo", "Beyoncé"),
            sample_track("Get Lucky", "Daft Punk"),
        ]);
        let code = joined_room(&state, 2).await;

        let err = start_game(&state, &code, "host").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn failed_track_fetch_leaves_the_room_untouched() {
        let source = Arc::new(StubTrackSource::new(vec![sample_track("Halo", "Beyoncé")]));
        let state = test_state_with_source(AppConfig::default(), Arc::clone(&source));
        let code = waiting_room(&state).await;

        source.fail_next();
        let err = start_game(&state, &code, "host").await.unwrap_err();
        assert!(matches!(err, ServiceError::TrackUnavailable(_)));

        let room = state.store().find_room(&code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Waiting);
        assert_eq!(room.current_round, 0);
        assert!(room.current_track.is_none());

        // A retry right after succeeds.
        start_game(&state, &code, "host").await.unwrap();
        let room = state.store().find_room(&code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Playing);
        assert_eq!(room.current_round, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_track_fetch_times_out() {
        let source = Arc::new(StubTrackSource::new(vec![sample_track("Halo", "Beyoncé")]));
        let state = test_state_with_source(AppConfig::default(), Arc::clone(&source));
        let code = waiting_room(&state).await;

        source.hang_next();
        let err = start_game(&state, &code, "host").await.unwrap_err();
        assert!(matches!(err, ServiceError::TrackUnavailable(_)));

        let room = state.store().find_room(&code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Waiting);
    }

    #[tokio::test]
    async fn start_round_fails_once_rounds_are_exhausted() {
        let state = test_state(vec![sample_track("Halo", "Beyoncé")]);
        let code = joined_room(&state, 1).await;
        end_round(&state, &code).await.unwrap();

        let before = state.store().find_room(&code).await.unwrap().unwrap();
        let err = start_round(&state, &code).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let after = state.store().find_room(&code).await.unwrap().unwrap();
        assert_eq!(after.status, before.status);
        assert_eq!(after.current_round, before.current_round);
    }

    #[tokio::test(start_paused = true)]
    async fn round_ends_by_timer() {
        let state = test_state(vec![sample_track("Halo", "Beyoncé")]);
        let code = create_room_with(&state, 1, 30).await;
        let mut events = state.events().subscribe(&code);

        start_game(&state, &code, "host").await.unwrap();
        tokio::time::sleep(Duration::from_secs(31)).await;

        let room = state.store().find_room(&code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::RoundEnd);

        let seen = names(&drain(&mut events));
        assert_eq!(
            seen.iter().filter(|name| *name == "round.ended").count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn both_fields_claimed_end_the_round_after_the_reveal_delay() {
        let state = test_state(vec![sample_track("Halo", "Beyoncé")]);
        let code = joined_room(&state, 1).await;

        submit_guess(&state, &code, "guest", "beyonce").await.unwrap();
        submit_guess(&state, &code, "host", "halo").await.unwrap();

        // Still revealing the correct guesses.
        let room = state.store().find_room(&code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Playing);

        tokio::time::sleep(Duration::from_secs(4)).await;
        let room = state.store().find_room(&code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::RoundEnd);
    }

    #[tokio::test(start_paused = true)]
    async fn racing_round_ends_produce_a_single_event() {
        let state = test_state(vec![sample_track("Halo", "Beyoncé")]);
        let code = joined_room(&state, 1).await;
        let mut events = state.events().subscribe(&code);

        let (first, second) = tokio::join!(end_round(&state, &code), end_round(&state, &code));
        first.unwrap();
        second.unwrap();

        let seen = names(&drain(&mut events));
        assert_eq!(
            seen.iter().filter(|name| *name == "round.ended").count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn next_round_clears_claims_even_after_a_fully_guessed_round() {
        let state = test_state(vec![
            sample_track("Halo", "Beyoncé"),
            sample_track("Get Lucky", "Daft Punk"),
        ]);
        let code = joined_room(&state, 2).await;

        submit_guess(&state, &code, "guest", "beyonce").await.unwrap();
        submit_guess(&state, &code, "guest", "halo").await.unwrap();
        tokio::time::sleep(Duration::from_secs(4)).await;

        let room = state.store().find_room(&code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::RoundEnd);
        assert!(room.fully_guessed());

        next_round(&state, &code, "host").await.unwrap();

        let room = state.store().find_room(&code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Playing);
        assert_eq!(room.current_round, 2);
        assert!(room.artist_guessed_by.is_none());
        assert!(room.title_guessed_by.is_none());
    }

    #[tokio::test]
    async fn next_round_guards_host_and_status() {
        let state = test_state(vec![sample_track("Halo", "Beyoncé")]);
        let code = joined_room(&state, 1).await;

        let err = next_round(&state, &code, "guest").await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        // Round is still live, so even the host has to wait.
        let err = next_round(&state, &code, "host").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn final_round_end_schedules_the_final_standings() {
        let state = test_state(vec![sample_track("Halo", "Beyoncé")]);
        let code = joined_room(&state, 1).await;
        let mut events = state.events().subscribe(&code);

        end_round(&state, &code).await.unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;

        let room = state.store().find_room(&code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::GameEnd);

        let seen = names(&drain(&mut events));
        assert_eq!(seen.iter().filter(|name| *name == "game.ended").count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn single_round_game_plays_out_end_to_end() {
        let state = test_state(vec![sample_track("Halo", "Beyoncé")]);
        let code = create_room_with(&state, 1, 30).await;
        let mut events = state.events().subscribe(&code);

        start_game(&state, &code, "host").await.unwrap();

        let outcome = submit_guess(&state, &code, "guest", "halo").await.unwrap();
        assert!(outcome.correct);
        assert_eq!(outcome.points, 3);

        // Artist stays unclaimed, so the duration timer governs the round.
        tokio::time::sleep(Duration::from_secs(31)).await;
        // Final standings follow after the display delay.
        tokio::time::sleep(Duration::from_secs(6)).await;

        let seen = drain(&mut events);
        let sequence = names(&seen);
        assert_eq!(
            sequence,
            vec![
                "game.started",
                "round.started",
                "guess.correct",
                "leaderboard.update",
                "round.ended",
                "leaderboard.update",
                "game.ended",
            ]
        );

        let round_started = payload(&seen[1]);
        assert!(round_started["track"].get("title").is_none());
        assert!(round_started["track"].get("artist").is_none());

        let correct = payload(&seen[2]);
        assert_eq!(correct["player_id"], "guest");
        assert_eq!(correct["points"], 3);

        let round_ended = payload(&seen[4]);
        assert_eq!(round_ended["artist"], "Beyoncé");
        assert_eq!(round_ended["title"], "Halo");
        assert_eq!(round_ended["title_guessed_by"], "guest");
        assert!(round_ended.get("artist_guessed_by").is_none());

        let game_ended = payload(&seen[6]);
        let standings = game_ended["standings"].as_array().unwrap();
        assert_eq!(standings[0]["id"], "guest");
        assert_eq!(standings[0]["score"], 3);
        assert_eq!(standings[1]["id"], "host");
    }

    #[tokio::test(start_paused = true)]
    async fn closing_a_room_cancels_its_pending_timer() {
        let state = test_state(vec![sample_track("Halo", "Beyoncé")]);
        let code = joined_room(&state, 1).await;
        let mut events = state.events().subscribe(&code);

        room_service::close_room(&state, &code, "host").await.unwrap();
        assert!(!state.scheduler().is_pending(&code));

        tokio::time::sleep(Duration::from_secs(60)).await;

        let room = state.store().find_room(&code).await.unwrap().unwrap();
        assert_eq!(room.status, RoomStatus::Closed);

        // Nothing after the closure notice; the stream then terminates.
        let seen = names(&drain(&mut events));
        assert_eq!(seen, vec!["room.closed"]);
        assert!(matches!(
            events.recv().await,
            Err(tokio::sync::broadcast::error::RecvError::Closed)
        ));
    }

    #[test]
    fn standings_break_ties_by_join_order() {
        let mut players = Vec::new();
        for (id, score) in [("first", 2), ("second", 5), ("third", 2)] {
            let mut player = Player::new(id.into(), id.into(), None, false);
            player.score = score;
            players.push(player);
        }

        let ranked = standings(players);
        let ids: Vec<&str> = ranked.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["second", "first", "third"]);
    }
}
