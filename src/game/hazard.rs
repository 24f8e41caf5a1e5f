//! Hazard resolution engine
//!
//! Maps one dangerous-object occurrence plus one player's declared
//! defense to an outcome. The only state touched is the player's own
//! ship-board; all validation happens before any damage or battery cost
//! is applied, so a rejected defense leaves the board untouched.

use serde::{Deserialize, Serialize};

use crate::board::{Coord, Direction, ShipBoard};
use crate::game::choices::{DecisionBuffer, ShieldChoice};
use crate::game::error::GameError;

/// Hazard variants, each with its own resolution rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardKind {
    /// Neutralized by a shield facing it, at the cost of one charge
    SmallMeteorite,
    /// Shot down by an aligned double cannon, at the cost of one charge
    BigMeteorite,
    /// Pirate fire, same mechanic as a small meteorite
    SmallShot,
    /// Unavoidable pirate fire, no defense exists
    BigShot,
}

/// One hazard occurrence: variant, direction it arrives from, and the
/// impact line rolled when the hazard activated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DangerousObject {
    pub kind: HazardKind,
    pub direction: Direction,
    pub line: i8,
}

/// Result of resolving one hazard against one ship-board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardOutcome {
    /// The hazard missed the board, or a shield absorbed it
    Unharmed,
    ComponentDestroyed(Coord),
    /// An active defense (cannon fire) spent this many charges
    BatteriesConsumed(u8),
}

/// Resolve `object` against `board` given the player's declared defense.
///
/// A successful shield defense consumes exactly one battery charge; an
/// empty chosen battery box is not an error but a failed defense. A
/// misaligned shield or cannon choice is rejected before any mutation.
pub fn resolve(
    object: &DangerousObject,
    board: &mut ShipBoard,
    choices: &DecisionBuffer,
) -> Result<HazardOutcome, GameError> {
    match object.kind {
        // No defense exists; any populated buffer fields are ignored.
        HazardKind::BigShot => Ok(impact(object, board)),
        HazardKind::SmallMeteorite | HazardKind::SmallShot => {
            resolve_with_shield(object, board, choices)
        }
        HazardKind::BigMeteorite => resolve_with_cannon(object, board, choices),
    }
}

/// Strike the first exposed component on the impact line, if any
fn impact(object: &DangerousObject, board: &mut ShipBoard) -> HazardOutcome {
    match board.exposed_component(object.direction, object.line) {
        Some(coord) => {
            board.destroy(coord);
            HazardOutcome::ComponentDestroyed(coord)
        }
        None => HazardOutcome::Unharmed,
    }
}

fn resolve_with_shield(
    object: &DangerousObject,
    board: &mut ShipBoard,
    choices: &DecisionBuffer,
) -> Result<HazardOutcome, GameError> {
    match choices.shield()? {
        ShieldChoice::Decline => Ok(impact(object, board)),
        ShieldChoice::Raise { shield } => {
            if !board.shield_covers(shield, object.direction) {
                return Err(GameError::InvalidDefensePlacement {
                    coord: shield,
                    direction: object.direction,
                });
            }
            let battery = chosen_battery(board, choices)?;
            if board.discharge_battery(battery) {
                Ok(HazardOutcome::Unharmed)
            } else {
                Ok(impact(object, board))
            }
        }
    }
}

fn resolve_with_cannon(
    object: &DangerousObject,
    board: &mut ShipBoard,
    choices: &DecisionBuffer,
) -> Result<HazardOutcome, GameError> {
    match choices.double_cannons()?.first().copied() {
        // Empty list is an explicit decision not to fire.
        None => Ok(impact(object, board)),
        Some(cannon) => {
            if !board.cannon_defends(cannon, object.direction, object.line) {
                return Err(GameError::InvalidDefensePlacement {
                    coord: cannon,
                    direction: object.direction,
                });
            }
            let battery = chosen_battery(board, choices)?;
            if board.discharge_battery(battery) {
                Ok(HazardOutcome::BatteriesConsumed(1))
            } else {
                Ok(impact(object, board))
            }
        }
    }
}

/// The first declared battery box, validated to actually be one
fn chosen_battery(board: &ShipBoard, choices: &DecisionBuffer) -> Result<Coord, GameError> {
    let battery = choices
        .battery_boxes()?
        .first()
        .copied()
        .ok_or(GameError::MissingRequiredChoice("battery_boxes"))?;
    if board.battery_charges(battery).is_none() {
        return Err(GameError::InvalidActivation(battery));
    }
    Ok(battery)
}
