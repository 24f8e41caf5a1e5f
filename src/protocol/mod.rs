//! Typed action and event definitions
//! These are the core's boundary values: a hosting transport decodes its
//! wire format into `PlayerAction` and encodes `GameEvent` back out.

use serde::{Deserialize, Serialize};

use crate::board::{BoardSnapshot, Component, Coord};
use crate::game::card::AdventureCard;
use crate::game::choices::DecisionBuffer;
use crate::game::r#match::MatchPhase;

/// Player colors, unique within a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerColor {
    Red,
    Blue,
    Green,
    Yellow,
}

/// Actions a player submits against a match
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerAction {
    /// Building phase: add a component to the player's ship-board
    PlaceComponent { coord: Coord, component: Component },

    /// Building phase: signal the ship is finished
    Ready,

    /// Flight phase: answer the current card step
    CardResponse {
        kind: ResponseKind,
        choices: DecisionBuffer,
    },
}

/// The response kinds a card step can require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// Declare a defense against an incoming hazard
    DeclareDefense,
    /// Declare cannon power against pirates
    DeclareCannons,
    /// Declare engine power in open space
    DeclareEngines,
    /// Decide whether (and where) to land on a planet card
    VisitDecision,
    /// Stow goods after landing, or forfeit them
    AcceptReward,
    /// Decide whether to claim an abandoned ship
    ClaimDecision,
}

/// Events broadcast verbatim to all match participants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    PlayerJoined {
        nickname: String,
        color: PlayerColor,
    },

    PlayerLeft {
        nickname: String,
        reason: String,
    },

    PhaseChanged {
        phase: MatchPhase,
    },

    CardDrawn {
        card: AdventureCard,
    },

    CardStepResolved {
        nickname: String,
        outcome: StepOutcome,
    },

    ShipBoardUpdated {
        nickname: String,
        board: BoardSnapshot,
    },

    MatchEnded {
        reason: EndReason,
        standings: Vec<PlayerStanding>,
    },
}

/// Per-step results carried in `CardStepResolved`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Hazard missed or a shield absorbed it
    Unharmed,
    ComponentDestroyed { coord: Coord },
    BatteriesConsumed { count: u8 },

    /// Pirates beaten, reward credited
    PiratesDefeated { reward: i64 },
    /// Cannon power fell short; the volleys will follow
    PiratesOverran,
    /// Cannon power matched exactly, neither side prevails
    Standoff,

    /// Open space: moved forward by engine power
    Advanced { distance: i32 },
    /// Engine power zero, the player drifts out of the match
    Adrift,

    Landed { planet: u8 },
    GoodsLoaded { count: u32 },
    RewardForfeited,

    ShipClaimed { reward: i64 },

    /// Declined a visit or claim
    Passed,
    /// Step auto-satisfied for an eliminated or unresponsive player
    Skipped,
}

/// Why a match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    DeckExhausted,
    InsufficientPlayers,
}

/// Final per-player standing broadcast with `MatchEnded`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStanding {
    pub nickname: String,
    pub credits: i64,
    pub position: i32,
    pub goods: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_a_type_tag() {
        let event = GameEvent::PlayerJoined {
            nickname: "ana".to_string(),
            color: PlayerColor::Red,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "player_joined",
                "nickname": "ana",
                "color": "red",
            })
        );
    }

    #[test]
    fn card_responses_deserialize_from_tagged_json() {
        let raw = r#"{
            "type": "card_response",
            "kind": "declare_defense",
            "choices": { "shield": { "choice": "decline" } }
        }"#;
        let action: PlayerAction = serde_json::from_str(raw).unwrap();
        let PlayerAction::CardResponse { kind, choices } = action else {
            panic!("wrong action variant");
        };
        assert_eq!(kind, ResponseKind::DeclareDefense);
        assert_eq!(
            choices.shield,
            Some(crate::game::choices::ShieldChoice::Decline)
        );
    }
}
