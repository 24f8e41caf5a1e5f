//! Startrade Core - game-session coordinator for a multiplayer
//! space-trading board game.
//!
//! This crate is the transport-free core of the game server. It handles:
//! - Per-match serialization of concurrent player actions
//! - The match phase state machine (lobby, building, flight, ended)
//! - The adventure-card decision protocol that drives the flight phase
//! - Hazard resolution (meteorites and shots against declared defenses)
//!
//! It never opens sockets or performs wire encoding; a hosting network
//! service decodes requests into [`protocol::PlayerAction`] values, routes
//! them through the [`session::SessionRegistry`], and encodes the
//! [`protocol::GameEvent`] values broadcast back out.

pub mod board;
pub mod config;
pub mod game;
pub mod protocol;
pub mod session;

pub use game::error::GameError;
pub use game::r#match::{MatchController, MatchPhase, MatchRules};
pub use protocol::{GameEvent, PlayerAction, ResponseKind, StepOutcome};
pub use session::SessionRegistry;
