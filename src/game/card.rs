//! Adventure card state machine
//!
//! One `CardMachine` is live per drawn card. It owns the card's ordered
//! step queue (who must answer what, in match turn order), validates and
//! consumes decision buffers, and invokes the hazard engine when a step
//! is a hazard. A failed response never advances the step, so the player
//! keeps their turn position and may resubmit.

use std::collections::{BTreeMap, VecDeque};

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::board::{Coord, Direction};
use crate::game::choices::{DecisionBuffer, PlanetChoice, ShieldChoice};
use crate::game::error::GameError;
use crate::game::hazard::{self, DangerousObject, HazardKind, HazardOutcome};
use crate::game::r#match::Player;
use crate::protocol::{GameEvent, ResponseKind, StepOutcome};

/// Immutable template data for one deck card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdventureCard {
    pub name: String,
    pub kind: CardKind,
}

/// Card kinds carry their step protocol as data, not as subclasses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardKind {
    /// Every player defends against every volley, in turn order
    MeteorSwarm { volleys: Vec<HazardSpec> },

    /// Players declare cannons in turn order. The first to beat
    /// `strength` takes the reward and spares everyone after them;
    /// players who fell short suffer the volleys.
    Pirates {
        strength: f32,
        reward: i64,
        volleys: Vec<HazardSpec>,
    },

    /// Each planet can host one lander; landing costs flight position
    Planets {
        landing_rewards: Vec<u32>,
        step_cost: i32,
    },

    /// First claimant trades crew for credits
    AbandonedShip {
        reward: i64,
        crew_cost: u8,
        step_cost: i32,
    },

    /// Everyone declares engine power and advances
    OpenSpace,
}

/// A hazard the card throws: variant plus fixed direction. The impact
/// line is rolled when the volley activates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardSpec {
    pub kind: HazardKind,
    pub direction: Direction,
}

/// One pending player response
#[derive(Debug, Clone)]
struct Step {
    nickname: String,
    kind: ResponseKind,
    payload: StepPayload,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum StepPayload {
    Hazard { volley: usize },
    Cannons,
    Engines,
    Visit,
    Reward { planet: u8 },
    Claim,
}

/// Drives one card's multi-round decision protocol to completion
pub struct CardMachine {
    card: AdventureCard,
    queue: VecDeque<Step>,
    /// Impact line per volley, rolled once and shared by every player
    /// facing that volley
    rolled_lines: Vec<Option<i8>>,
    planets_taken: Vec<bool>,
    /// Responses satisfied so far (including skips), in resolution order
    responded: Vec<(String, ResponseKind)>,
}

impl CardMachine {
    pub fn new(card: AdventureCard, turn_order: &[String]) -> Self {
        let mut queue = VecDeque::new();
        let mut rolled_lines = Vec::new();
        let mut planets_taken = Vec::new();

        match &card.kind {
            CardKind::MeteorSwarm { volleys } => {
                rolled_lines = vec![None; volleys.len()];
                for volley in 0..volleys.len() {
                    for nickname in turn_order {
                        queue.push_back(Step {
                            nickname: nickname.clone(),
                            kind: ResponseKind::DeclareDefense,
                            payload: StepPayload::Hazard { volley },
                        });
                    }
                }
            }
            CardKind::Pirates { volleys, .. } => {
                rolled_lines = vec![None; volleys.len()];
                for nickname in turn_order {
                    queue.push_back(Step {
                        nickname: nickname.clone(),
                        kind: ResponseKind::DeclareCannons,
                        payload: StepPayload::Cannons,
                    });
                }
            }
            CardKind::Planets { landing_rewards, .. } => {
                planets_taken = vec![false; landing_rewards.len()];
                for nickname in turn_order {
                    queue.push_back(Step {
                        nickname: nickname.clone(),
                        kind: ResponseKind::VisitDecision,
                        payload: StepPayload::Visit,
                    });
                }
            }
            CardKind::AbandonedShip { .. } => {
                for nickname in turn_order {
                    queue.push_back(Step {
                        nickname: nickname.clone(),
                        kind: ResponseKind::ClaimDecision,
                        payload: StepPayload::Claim,
                    });
                }
            }
            CardKind::OpenSpace => {
                for nickname in turn_order {
                    queue.push_back(Step {
                        nickname: nickname.clone(),
                        kind: ResponseKind::DeclareEngines,
                        payload: StepPayload::Engines,
                    });
                }
            }
        }

        Self {
            card,
            queue,
            rolled_lines,
            planets_taken,
            responded: Vec::new(),
        }
    }

    pub fn card(&self) -> &AdventureCard {
        &self.card
    }

    /// The player and response kind the card is waiting on
    pub fn expected(&self) -> Option<(&str, ResponseKind)> {
        self.queue.front().map(|s| (s.nickname.as_str(), s.kind))
    }

    /// Steps still pending for one player
    pub fn pending_for(&self, nickname: &str) -> usize {
        self.queue.iter().filter(|s| s.nickname == nickname).count()
    }

    /// True once every required player response has been recorded or the
    /// player was skipped
    pub fn is_resolved(&self) -> bool {
        self.queue.is_empty()
    }

    /// Responses satisfied so far, in resolution order
    pub fn responded(&self) -> &[(String, ResponseKind)] {
        &self.responded
    }

    /// The deterministic timeout default for a step: treated as an
    /// explicit "no valid defense" / decline, never as an absent field
    pub fn default_buffer(kind: ResponseKind) -> DecisionBuffer {
        match kind {
            ResponseKind::DeclareDefense => DecisionBuffer {
                shield: Some(ShieldChoice::Decline),
                double_cannons: Some(Vec::new()),
                battery_boxes: Some(Vec::new()),
                ..Default::default()
            },
            ResponseKind::DeclareCannons => DecisionBuffer {
                double_cannons: Some(Vec::new()),
                battery_boxes: Some(Vec::new()),
                ..Default::default()
            },
            ResponseKind::DeclareEngines => DecisionBuffer {
                double_engines: Some(Vec::new()),
                battery_boxes: Some(Vec::new()),
                ..Default::default()
            },
            ResponseKind::VisitDecision => DecisionBuffer {
                planet: Some(PlanetChoice::Skip),
                ..Default::default()
            },
            ResponseKind::AcceptReward => DecisionBuffer {
                storage: Some(Vec::new()),
                ..Default::default()
            },
            ResponseKind::ClaimDecision => DecisionBuffer {
                cabins: Some(Vec::new()),
                ..Default::default()
            },
        }
    }

    /// Validate and consume one player response. `player` must be the
    /// player the current step is waiting on.
    pub fn handle_response(
        &mut self,
        nickname: &str,
        kind: ResponseKind,
        choices: &DecisionBuffer,
        player: &mut Player,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec<GameEvent>, GameError> {
        // Pop before dispatching so step handlers may reshape the rest of
        // the queue; a rejected or invalid response is pushed straight back.
        let Some(step) = self.queue.pop_front() else {
            return Err(GameError::UnexpectedResponse {
                got: kind,
                expected: None,
            });
        };
        if step.nickname != nickname {
            self.queue.push_front(step);
            return Err(GameError::NotCurrentTurn(nickname.to_string()));
        }
        if step.kind != kind {
            let expected = step.kind;
            self.queue.push_front(step);
            return Err(GameError::UnexpectedResponse {
                got: kind,
                expected: Some(expected),
            });
        }

        let result = match step.payload {
            StepPayload::Hazard { volley } => self.resolve_hazard(volley, choices, player, rng),
            StepPayload::Cannons => self.resolve_cannons(choices, player),
            StepPayload::Engines => self.resolve_engines(choices, player),
            StepPayload::Visit => self.resolve_visit(choices, player),
            StepPayload::Reward { planet } => self.resolve_reward(planet, choices, player),
            StepPayload::Claim => self.resolve_claim(choices, player),
        };

        match result {
            Ok(events) => {
                self.responded.push((step.nickname, step.kind));
                Ok(events)
            }
            Err(err) => {
                self.queue.push_front(step);
                Err(err)
            }
        }
    }

    /// Drop every remaining step of an eliminated or unresponsive player,
    /// treating them as already satisfied so the round cannot deadlock.
    pub fn mark_unresponsive(&mut self, nickname: &str) -> Vec<GameEvent> {
        let mut skipped = Vec::new();
        self.queue.retain(|step| {
            if step.nickname == nickname {
                skipped.push((step.nickname.clone(), step.kind));
                false
            } else {
                true
            }
        });
        if skipped.is_empty() {
            return Vec::new();
        }
        self.responded.extend(skipped);
        vec![GameEvent::CardStepResolved {
            nickname: nickname.to_string(),
            outcome: StepOutcome::Skipped,
        }]
    }

    fn volleys(&self) -> &[HazardSpec] {
        match &self.card.kind {
            CardKind::MeteorSwarm { volleys } | CardKind::Pirates { volleys, .. } => volleys,
            _ => &[],
        }
    }

    fn resolve_hazard(
        &mut self,
        volley: usize,
        choices: &DecisionBuffer,
        player: &mut Player,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec<GameEvent>, GameError> {
        let spec = self.volleys()[volley];
        // Roll the line on first activation; retries after a rejected
        // defense face the same coordinate.
        let line = match self.rolled_lines[volley] {
            Some(line) => line,
            None => {
                let line = roll_line(rng);
                self.rolled_lines[volley] = Some(line);
                line
            }
        };

        let object = DangerousObject {
            kind: spec.kind,
            direction: spec.direction,
            line,
        };
        let outcome = match hazard::resolve(&object, &mut player.board, choices)? {
            HazardOutcome::Unharmed => StepOutcome::Unharmed,
            HazardOutcome::ComponentDestroyed(coord) => StepOutcome::ComponentDestroyed { coord },
            HazardOutcome::BatteriesConsumed(count) => StepOutcome::BatteriesConsumed { count },
        };

        Ok(vec![
            GameEvent::CardStepResolved {
                nickname: player.nickname.clone(),
                outcome,
            },
            GameEvent::ShipBoardUpdated {
                nickname: player.nickname.clone(),
                board: player.board.snapshot(),
            },
        ])
    }

    fn resolve_cannons(
        &mut self,
        choices: &DecisionBuffer,
        player: &mut Player,
    ) -> Result<Vec<GameEvent>, GameError> {
        let (strength, reward, volley_count) = match &self.card.kind {
            CardKind::Pirates {
                strength,
                reward,
                volleys,
            } => (*strength, *reward, volleys.len()),
            _ => {
                return Err(GameError::UnexpectedResponse {
                    got: ResponseKind::DeclareCannons,
                    expected: None,
                })
            }
        };

        let doubles = choices.double_cannons()?.to_vec();
        let batteries = choices.battery_boxes()?.to_vec();
        for &coord in &doubles {
            if !player.board.is_double_cannon(coord) {
                return Err(GameError::InvalidActivation(coord));
            }
        }
        let powered = activate_doubles(&mut player.board, &doubles, &batteries)?;

        let declared = player.board.cannon_strength(&powered);
        let mut events = Vec::new();

        let outcome = if declared > strength {
            player.credits += reward;
            // Everyone after the victor is spared the encounter.
            events.extend(self.skip_remaining(StepPayload::Cannons));
            StepOutcome::PiratesDefeated { reward }
        } else if declared < strength {
            // The pirates won this exchange; the volleys follow once every
            // player has declared.
            for volley in 0..volley_count {
                self.queue.push_back(Step {
                    nickname: player.nickname.clone(),
                    kind: ResponseKind::DeclareDefense,
                    payload: StepPayload::Hazard { volley },
                });
            }
            StepOutcome::PiratesOverran
        } else {
            StepOutcome::Standoff
        };

        events.insert(
            0,
            GameEvent::CardStepResolved {
                nickname: player.nickname.clone(),
                outcome,
            },
        );
        if !doubles.is_empty() {
            events.push(GameEvent::ShipBoardUpdated {
                nickname: player.nickname.clone(),
                board: player.board.snapshot(),
            });
        }
        Ok(events)
    }

    fn resolve_engines(
        &mut self,
        choices: &DecisionBuffer,
        player: &mut Player,
    ) -> Result<Vec<GameEvent>, GameError> {
        let doubles = choices.double_engines()?.to_vec();
        for &coord in &doubles {
            if !player.board.is_double_engine(coord) {
                return Err(GameError::InvalidActivation(coord));
            }
        }
        let powered = if doubles.is_empty() {
            Vec::new()
        } else {
            let batteries = choices.battery_boxes()?.to_vec();
            activate_doubles(&mut player.board, &doubles, &batteries)?
        };

        let power = player.board.engine_power(&powered);
        let outcome = if power == 0 {
            player.eliminated = true;
            StepOutcome::Adrift
        } else {
            player.position += power as i32;
            StepOutcome::Advanced {
                distance: power as i32,
            }
        };

        let mut events = vec![GameEvent::CardStepResolved {
            nickname: player.nickname.clone(),
            outcome,
        }];
        if !doubles.is_empty() {
            events.push(GameEvent::ShipBoardUpdated {
                nickname: player.nickname.clone(),
                board: player.board.snapshot(),
            });
        }
        Ok(events)
    }

    fn resolve_visit(
        &mut self,
        choices: &DecisionBuffer,
        player: &mut Player,
    ) -> Result<Vec<GameEvent>, GameError> {
        let outcome = match choices.planet()? {
            PlanetChoice::Skip => StepOutcome::Passed,
            PlanetChoice::Land { planet } => {
                let idx = planet as usize;
                if idx >= self.planets_taken.len() || self.planets_taken[idx] {
                    return Err(GameError::PlanetUnavailable(planet));
                }
                self.planets_taken[idx] = true;
                // The lander stows (or forfeits) goods before the next
                // player decides.
                self.queue.push_front(Step {
                    nickname: player.nickname.clone(),
                    kind: ResponseKind::AcceptReward,
                    payload: StepPayload::Reward { planet },
                });
                StepOutcome::Landed { planet }
            }
        };

        Ok(vec![GameEvent::CardStepResolved {
            nickname: player.nickname.clone(),
            outcome,
        }])
    }

    fn resolve_reward(
        &mut self,
        planet: u8,
        choices: &DecisionBuffer,
        player: &mut Player,
    ) -> Result<Vec<GameEvent>, GameError> {
        let (reward, step_cost) = match &self.card.kind {
            CardKind::Planets {
                landing_rewards,
                step_cost,
            } => (
                landing_rewards.get(planet as usize).copied().unwrap_or(0),
                *step_cost,
            ),
            _ => {
                return Err(GameError::UnexpectedResponse {
                    got: ResponseKind::AcceptReward,
                    expected: None,
                })
            }
        };

        let coords = choices.storage()?.to_vec();
        let mut events = Vec::new();
        let outcome = if coords.is_empty() {
            StepOutcome::RewardForfeited
        } else {
            let used = &coords[..coords.len().min(reward as usize)];
            let mut per_coord: BTreeMap<Coord, u8> = BTreeMap::new();
            for &coord in used {
                *per_coord.entry(coord).or_insert(0) += 1;
            }
            for (&coord, &needed) in &per_coord {
                match player.board.storage_space(coord) {
                    Some(space) if space >= needed => {}
                    _ => return Err(GameError::InvalidActivation(coord)),
                }
            }
            for &coord in used {
                player.board.add_goods(coord);
            }
            events.push(GameEvent::ShipBoardUpdated {
                nickname: player.nickname.clone(),
                board: player.board.snapshot(),
            });
            StepOutcome::GoodsLoaded {
                count: used.len() as u32,
            }
        };

        // Landing costs flight position whether or not goods were kept.
        player.position -= step_cost;

        events.insert(
            0,
            GameEvent::CardStepResolved {
                nickname: player.nickname.clone(),
                outcome,
            },
        );
        Ok(events)
    }

    fn resolve_claim(
        &mut self,
        choices: &DecisionBuffer,
        player: &mut Player,
    ) -> Result<Vec<GameEvent>, GameError> {
        let (reward, crew_cost, step_cost) = match &self.card.kind {
            CardKind::AbandonedShip {
                reward,
                crew_cost,
                step_cost,
            } => (*reward, *crew_cost, *step_cost),
            _ => {
                return Err(GameError::UnexpectedResponse {
                    got: ResponseKind::ClaimDecision,
                    expected: None,
                })
            }
        };

        let coords = choices.cabins()?.to_vec();
        if coords.is_empty() {
            return Ok(vec![GameEvent::CardStepResolved {
                nickname: player.nickname.clone(),
                outcome: StepOutcome::Passed,
            }]);
        }

        if coords.len() != crew_cost as usize {
            return Err(GameError::IncompleteChoice("cabins"));
        }
        let mut per_coord: BTreeMap<Coord, u8> = BTreeMap::new();
        for &coord in &coords {
            *per_coord.entry(coord).or_insert(0) += 1;
        }
        for (&coord, &needed) in &per_coord {
            match player.board.cabin_crew(coord) {
                Some(crew) if crew >= needed => {}
                _ => return Err(GameError::InvalidActivation(coord)),
            }
        }
        for &coord in &coords {
            player.board.remove_crew(coord);
        }

        player.credits += reward;
        player.position -= step_cost;

        let mut events = vec![
            GameEvent::CardStepResolved {
                nickname: player.nickname.clone(),
                outcome: StepOutcome::ShipClaimed { reward },
            },
            GameEvent::ShipBoardUpdated {
                nickname: player.nickname.clone(),
                board: player.board.snapshot(),
            },
        ];
        events.extend(self.skip_remaining(StepPayload::Claim));
        Ok(events)
    }

    /// Remove every remaining step with the given payload, recording the
    /// affected players as satisfied
    fn skip_remaining(&mut self, payload: StepPayload) -> Vec<GameEvent> {
        let mut skipped = Vec::new();
        self.queue.retain(|step| {
            if step.payload == payload {
                skipped.push((step.nickname.clone(), step.kind));
                false
            } else {
                true
            }
        });
        let events = skipped
            .iter()
            .map(|(nickname, _)| GameEvent::CardStepResolved {
                nickname: nickname.clone(),
                outcome: StepOutcome::Skipped,
            })
            .collect();
        self.responded.extend(skipped);
        events
    }
}

/// Power each double component with one battery charge. Component and
/// battery choices are validated before any charge is spent; an empty
/// box simply fails to power its component.
fn activate_doubles(
    board: &mut crate::board::ShipBoard,
    doubles: &[Coord],
    batteries: &[Coord],
) -> Result<Vec<Coord>, GameError> {
    if batteries.len() < doubles.len() {
        return Err(GameError::MissingRequiredChoice("battery_boxes"));
    }
    for &battery in &batteries[..doubles.len()] {
        if board.battery_charges(battery).is_none() {
            return Err(GameError::InvalidActivation(battery));
        }
    }

    let mut powered = Vec::with_capacity(doubles.len());
    for (i, &coord) in doubles.iter().enumerate() {
        if board.discharge_battery(batteries[i]) {
            powered.push(coord);
        }
    }
    Ok(powered)
}

/// Roll an impact line with two dice, mapped onto the 0..=10 range
/// of board coordinates
fn roll_line(rng: &mut ChaCha8Rng) -> i8 {
    rng.gen_range(1..=6) + rng.gen_range(1..=6) - 2
}
