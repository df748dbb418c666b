//! Service layer: room lifecycle, game orchestration, and event fan-out.

pub mod documentation;
pub mod game_service;
pub mod guess_service;
pub mod health_service;
pub mod room_events;
pub mod room_service;
pub mod sse_service;

#[cfg(test)]
pub(crate) mod test_support;
