//! Game core modules

pub mod card;
pub mod choices;
pub mod deck;
pub mod error;
pub mod hazard;
pub mod r#match;

pub use card::{AdventureCard, CardKind, CardMachine, HazardSpec};
pub use choices::{DecisionBuffer, PlanetChoice, ShieldChoice};
pub use error::GameError;
pub use hazard::{DangerousObject, HazardKind, HazardOutcome};
pub use r#match::{MatchController, MatchPhase, MatchRules, Player};
