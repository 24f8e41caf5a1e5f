//! Game error taxonomy
//!
//! Every variant is local to one action attempt: the per-match lock
//! guarantees an action either fully applies or is fully rejected, so no
//! error leaves shared match state half-mutated.

use crate::board::{Coord, Direction};
use crate::game::r#match::MatchPhase;
use crate::protocol::{PlayerColor, ResponseKind};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    // Protocol errors: caller mistakes, surfaced to that client only
    #[error("action is not legal in the {phase:?} phase")]
    IllegalPhase { phase: MatchPhase },

    #[error("unexpected response {got:?}, expected {expected:?}")]
    UnexpectedResponse {
        got: ResponseKind,
        expected: Option<ResponseKind>,
    },

    #[error("player {0} is not part of this match")]
    UnknownPlayer(String),

    #[error("it is not {0}'s turn to respond")]
    NotCurrentTurn(String),

    // Choice errors: rejected action, the player's turn position is kept
    #[error("this step requires the {0} choice, which was not provided")]
    IncompleteChoice(&'static str),

    #[error("required defense choice {0} is missing")]
    MissingRequiredChoice(&'static str),

    #[error("component at ({},{}) cannot defend against a hazard from {direction:?}", coord.row, coord.col)]
    InvalidDefensePlacement { coord: Coord, direction: Direction },

    #[error("component at ({},{}) cannot be used for this step", .0.row, .0.col)]
    InvalidActivation(Coord),

    #[error("planet {0} is out of range or already taken")]
    PlanetUnavailable(u8),

    // Capacity/identity errors: surfaced at join time, no state mutation
    #[error("match is full")]
    CapacityExceeded,

    #[error("color {0:?} is already taken")]
    ColorTaken(PlayerColor),

    #[error("nickname {0} already joined this match")]
    AlreadyJoined(String),

    #[error("match has already started")]
    MatchAlreadyStarted,

    #[error("nickname {0} is already registered")]
    NicknameTaken(String),

    #[error("no match with id {0}")]
    MatchNotFound(String),

    // Fatal match errors: force a transition to Ended
    #[error("not enough players to continue the match")]
    InsufficientPlayers,
}

impl GameError {
    /// Fatal errors end the match for everyone; the rest reject a single
    /// action attempt.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InsufficientPlayers)
    }
}
