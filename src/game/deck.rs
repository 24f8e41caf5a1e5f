//! Flight deck - the fixed card pool and its seeded shuffle

use std::collections::VecDeque;

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::board::Direction;
use crate::game::card::{AdventureCard, CardKind, HazardSpec};
use crate::game::hazard::HazardKind;

/// Build the standard flight deck, shuffled with the match RNG. The same
/// seed always produces the same flight.
pub fn standard_deck(rng: &mut ChaCha8Rng) -> VecDeque<AdventureCard> {
    let mut cards = vec![
        AdventureCard {
            name: "Open Space".to_string(),
            kind: CardKind::OpenSpace,
        },
        AdventureCard {
            name: "Open Space".to_string(),
            kind: CardKind::OpenSpace,
        },
        AdventureCard {
            name: "Meteor Swarm".to_string(),
            kind: CardKind::MeteorSwarm {
                volleys: vec![
                    HazardSpec {
                        kind: HazardKind::SmallMeteorite,
                        direction: Direction::North,
                    },
                    HazardSpec {
                        kind: HazardKind::SmallMeteorite,
                        direction: Direction::East,
                    },
                    HazardSpec {
                        kind: HazardKind::BigMeteorite,
                        direction: Direction::North,
                    },
                ],
            },
        },
        AdventureCard {
            name: "Meteor Swarm".to_string(),
            kind: CardKind::MeteorSwarm {
                volleys: vec![
                    HazardSpec {
                        kind: HazardKind::BigMeteorite,
                        direction: Direction::North,
                    },
                    HazardSpec {
                        kind: HazardKind::SmallMeteorite,
                        direction: Direction::West,
                    },
                ],
            },
        },
        AdventureCard {
            name: "Pirate Raid".to_string(),
            kind: CardKind::Pirates {
                strength: 5.0,
                reward: 6,
                volleys: vec![
                    HazardSpec {
                        kind: HazardKind::SmallShot,
                        direction: Direction::North,
                    },
                    HazardSpec {
                        kind: HazardKind::BigShot,
                        direction: Direction::North,
                    },
                ],
            },
        },
        AdventureCard {
            name: "Trade Planets".to_string(),
            kind: CardKind::Planets {
                landing_rewards: vec![4, 3, 2],
                step_cost: 2,
            },
        },
        AdventureCard {
            name: "Abandoned Ship".to_string(),
            kind: CardKind::AbandonedShip {
                reward: 4,
                crew_cost: 2,
                step_cost: 1,
            },
        },
    ];

    cards.shuffle(rng);
    cards.into()
}
