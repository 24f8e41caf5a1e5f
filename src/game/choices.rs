//! Decision buffer - a player's in-progress choices for one card step

use serde::{Deserialize, Serialize};

use crate::board::Coord;
use crate::game::error::GameError;

/// Optional-field record of a player's response to the current card step.
///
/// Only the fields relevant to the step are populated; the card state
/// machine ignores the rest. Client-submitted data is adversarial input,
/// so required-field access returns a typed absence error instead of
/// panicking.
///
/// An explicit "no defense" is a first-class value, distinct from an
/// incomplete submission: `ShieldChoice::Decline` (or an empty coordinate
/// list) resolves as "no defense", while an absent field rejects the
/// action with `MissingRequiredChoice` or `IncompleteChoice` and leaves
/// the step pending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionBuffer {
    /// Double cannons to power (empty = decline to fire)
    pub double_cannons: Option<Vec<Coord>>,
    /// Double engines to power (empty = coast on single engines)
    pub double_engines: Option<Vec<Coord>>,
    /// Battery boxes paying for activations, one entry per activation
    pub battery_boxes: Option<Vec<Coord>>,
    /// Shield response to an incoming small hazard
    pub shield: Option<ShieldChoice>,
    /// Cabins to take crew losses from
    pub cabins: Option<Vec<Coord>>,
    /// Storage components to stow reward goods into
    pub storage: Option<Vec<Coord>>,
    /// Landing decision on a planet card
    pub planet: Option<PlanetChoice>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "choice", rename_all = "snake_case")]
pub enum ShieldChoice {
    /// Explicitly take the hit to save batteries
    Decline,
    Raise { shield: Coord },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "choice", rename_all = "snake_case")]
pub enum PlanetChoice {
    Skip,
    Land { planet: u8 },
}

impl DecisionBuffer {
    pub fn shield(&self) -> Result<ShieldChoice, GameError> {
        self.shield
            .ok_or(GameError::MissingRequiredChoice("shield"))
    }

    pub fn double_cannons(&self) -> Result<&[Coord], GameError> {
        self.double_cannons
            .as_deref()
            .ok_or(GameError::MissingRequiredChoice("double_cannons"))
    }

    pub fn battery_boxes(&self) -> Result<&[Coord], GameError> {
        self.battery_boxes
            .as_deref()
            .ok_or(GameError::MissingRequiredChoice("battery_boxes"))
    }

    pub fn double_engines(&self) -> Result<&[Coord], GameError> {
        self.double_engines
            .as_deref()
            .ok_or(GameError::IncompleteChoice("double_engines"))
    }

    pub fn cabins(&self) -> Result<&[Coord], GameError> {
        self.cabins
            .as_deref()
            .ok_or(GameError::IncompleteChoice("cabins"))
    }

    pub fn storage(&self) -> Result<&[Coord], GameError> {
        self.storage
            .as_deref()
            .ok_or(GameError::IncompleteChoice("storage"))
    }

    pub fn planet(&self) -> Result<PlanetChoice, GameError> {
        self.planet
            .ok_or(GameError::IncompleteChoice("planet"))
    }
}
