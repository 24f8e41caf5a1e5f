//! Match controller - serialized authoritative entry point for one match
//!
//! Every mutating operation locks the match's own mutex for the duration
//! of one logical state transition, so actions against the same match are
//! totally ordered while different matches proceed fully in parallel.
//! Holding the lock never blocks on client I/O or on another match.

use std::collections::VecDeque;
use std::fmt;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::board::ShipBoard;
use crate::game::card::{AdventureCard, CardMachine};
use crate::game::deck::standard_deck;
use crate::game::error::GameError;
use crate::protocol::{
    EndReason, GameEvent, PlayerAction, PlayerColor, PlayerStanding, ResponseKind,
};

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Waiting for players to join
    Lobby,
    /// Players assemble their ship-boards
    Building,
    /// Cards are drawn and resolved
    Flight,
    /// Absorbing: no further actions are accepted
    Ended,
}

/// Match ruleset
#[derive(Debug, Clone, Copy)]
pub struct MatchRules {
    /// Player capacity, 2-4
    pub capacity: usize,
}

impl MatchRules {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.clamp(2, 4),
        }
    }
}

/// Player state within a match (authoritative)
#[derive(Debug, Clone)]
pub struct Player {
    pub nickname: String,
    pub color: PlayerColor,
    pub board: ShipBoard,
    pub credits: i64,
    pub position: i32,
    pub connected: bool,
    pub ready: bool,
    pub eliminated: bool,
}

impl Player {
    pub fn new(nickname: &str, color: PlayerColor) -> Self {
        Self {
            nickname: nickname.to_string(),
            color,
            board: ShipBoard::new(),
            credits: 0,
            position: 0,
            connected: true,
            ready: false,
            eliminated: false,
        }
    }
}

/// Match state (owned by the controller, only reachable under its lock)
struct MatchState {
    phase: MatchPhase,
    /// Ordered by join time; this is the match's fixed turn order
    players: Vec<Player>,
    deck: VecDeque<AdventureCard>,
    card: Option<CardMachine>,
    rng: ChaCha8Rng,
}

/// The authoritative controller for one match
pub struct MatchController {
    id: String,
    rules: MatchRules,
    events: broadcast::Sender<GameEvent>,
    inner: Mutex<MatchState>,
}

impl fmt::Debug for MatchController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchController")
            .field("id", &self.id)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl MatchController {
    pub fn new(id: String, rules: MatchRules, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let deck = standard_deck(&mut rng);
        Self::with_deck_inner(id, rules, rng, deck)
    }

    /// Create a controller with an explicit (unshuffled) deck
    pub fn with_deck(
        id: String,
        rules: MatchRules,
        seed: u64,
        deck: VecDeque<AdventureCard>,
    ) -> Self {
        Self::with_deck_inner(id, rules, ChaCha8Rng::seed_from_u64(seed), deck)
    }

    fn with_deck_inner(
        id: String,
        rules: MatchRules,
        rng: ChaCha8Rng,
        deck: VecDeque<AdventureCard>,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            id,
            rules,
            events,
            inner: Mutex::new(MatchState {
                phase: MatchPhase::Lobby,
                players: Vec::new(),
                deck,
                card: None,
                rng,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Subscribe to this match's broadcast events
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    pub async fn phase(&self) -> MatchPhase {
        self.inner.lock().await.phase
    }

    pub async fn player_count(&self) -> usize {
        self.inner.lock().await.players.len()
    }

    /// A match with no players left may be removed from the registry
    pub async fn is_disposable(&self) -> bool {
        let state = self.inner.lock().await;
        state.players.is_empty() || state.phase == MatchPhase::Ended
    }

    /// Snapshot of one player's state, for hosts and tests
    pub async fn player(&self, nickname: &str) -> Option<Player> {
        self.inner
            .lock()
            .await
            .players
            .iter()
            .find(|p| p.nickname == nickname)
            .cloned()
    }

    /// The player and response kind the live card is waiting on
    pub async fn expected_response(&self) -> Option<(String, ResponseKind)> {
        self.inner
            .lock()
            .await
            .card
            .as_ref()
            .and_then(|m| m.expected().map(|(n, k)| (n.to_string(), k)))
    }

    /// Add a player to the match. Auto-transitions to the building phase
    /// once capacity is reached.
    pub async fn add_player(
        &self,
        nickname: &str,
        color: PlayerColor,
    ) -> Result<Vec<GameEvent>, GameError> {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;

        if state.players.iter().any(|p| p.nickname == nickname) {
            return Err(GameError::AlreadyJoined(nickname.to_string()));
        }
        if state.players.iter().any(|p| p.color == color) {
            return Err(GameError::ColorTaken(color));
        }
        if state.players.len() >= self.rules.capacity {
            return Err(GameError::CapacityExceeded);
        }
        if !matches!(state.phase, MatchPhase::Lobby | MatchPhase::Building) {
            return Err(GameError::MatchAlreadyStarted);
        }

        state.players.push(Player::new(nickname, color));
        info!(
            match_id = %self.id,
            nickname,
            player_count = state.players.len(),
            "Player joined match"
        );

        let mut events = vec![GameEvent::PlayerJoined {
            nickname: nickname.to_string(),
            color,
        }];
        if state.phase == MatchPhase::Lobby && state.players.len() == self.rules.capacity {
            state.phase = MatchPhase::Building;
            events.push(GameEvent::PhaseChanged {
                phase: MatchPhase::Building,
            });
            info!(match_id = %self.id, "Building phase started");
        }

        self.broadcast(&events);
        Ok(events)
    }

    /// Remove a player on their explicit leave
    pub async fn remove_player(&self, nickname: &str) -> Result<Vec<GameEvent>, GameError> {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;
        if !state.players.iter().any(|p| p.nickname == nickname) {
            return Err(GameError::UnknownPlayer(nickname.to_string()));
        }
        let events = self.drop_player(state, nickname, "left");
        self.broadcast(&events);
        Ok(events)
    }

    /// Remove a player after an unrecoverable notification failure.
    /// Prior card steps are not rolled back; remaining steps for this
    /// player are treated as already satisfied.
    pub async fn handle_disconnect(&self, nickname: &str) -> Vec<GameEvent> {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;
        let events = self.drop_player(state, nickname, "disconnected");
        self.broadcast(&events);
        events
    }

    /// Submit a player action, routed to the current phase handler
    pub async fn submit_action(
        &self,
        nickname: &str,
        action: PlayerAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;

        let player_idx = state
            .players
            .iter()
            .position(|p| p.nickname == nickname)
            .ok_or_else(|| GameError::UnknownPlayer(nickname.to_string()))?;
        let phase = state.phase;

        let events = match action {
            PlayerAction::PlaceComponent { coord, component } => {
                if phase != MatchPhase::Building {
                    return Err(GameError::IllegalPhase { phase });
                }
                let player = &mut state.players[player_idx];
                if !player.board.place(coord, component) {
                    return Err(GameError::InvalidActivation(coord));
                }
                vec![GameEvent::ShipBoardUpdated {
                    nickname: nickname.to_string(),
                    board: player.board.snapshot(),
                }]
            }

            PlayerAction::Ready => {
                if phase != MatchPhase::Building {
                    return Err(GameError::IllegalPhase { phase });
                }
                state.players[player_idx].ready = true;
                info!(match_id = %self.id, nickname, "Player ready");
                if state.players.iter().all(|p| p.ready) {
                    self.start_flight(state)
                } else {
                    Vec::new()
                }
            }

            PlayerAction::CardResponse { kind, choices } => {
                if phase != MatchPhase::Flight {
                    return Err(GameError::IllegalPhase { phase });
                }
                let MatchState {
                    card, players, rng, ..
                } = &mut *state;
                let machine = match card.as_mut() {
                    Some(machine) => machine,
                    None => return Err(GameError::IllegalPhase { phase }),
                };
                let player = &mut players[player_idx];
                let mut events = machine.handle_response(nickname, kind, &choices, player, rng)?;
                let eliminated = player.eliminated;
                if eliminated {
                    events.extend(machine.mark_unresponsive(nickname));
                }
                if machine.is_resolved() {
                    events.extend(self.advance_card(state));
                }
                events
            }
        };

        self.broadcast(&events);
        Ok(events)
    }

    /// Apply the deterministic timeout default ("no valid defense") for
    /// the player the live card is waiting on. Driven by the host after
    /// `Config.response_timeout_secs`.
    pub async fn expire_response(&self, nickname: &str) -> Result<Vec<GameEvent>, GameError> {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;
        if state.phase != MatchPhase::Flight {
            return Err(GameError::IllegalPhase { phase: state.phase });
        }

        let (expected_nick, kind) = match state.card.as_ref().and_then(|m| m.expected()) {
            Some((n, k)) => (n.to_string(), k),
            None => return Ok(Vec::new()),
        };
        if expected_nick != nickname {
            return Err(GameError::NotCurrentTurn(nickname.to_string()));
        }
        warn!(match_id = %self.id, nickname, ?kind, "Response timed out, applying default");

        let MatchState {
            card, players, rng, ..
        } = &mut *state;
        let machine = match card.as_mut() {
            Some(machine) => machine,
            None => return Ok(Vec::new()),
        };
        let player_idx = players
            .iter()
            .position(|p| p.nickname == nickname)
            .ok_or_else(|| GameError::UnknownPlayer(nickname.to_string()))?;

        let buffer = CardMachine::default_buffer(kind);
        let mut events =
            machine.handle_response(nickname, kind, &buffer, &mut players[player_idx], rng)?;
        if players[player_idx].eliminated {
            events.extend(machine.mark_unresponsive(nickname));
        }
        if machine.is_resolved() {
            events.extend(self.advance_card(state));
        }

        self.broadcast(&events);
        Ok(events)
    }

    /// Remove a player and apply the fallout (card skips, match end)
    fn drop_player(&self, state: &mut MatchState, nickname: &str, reason: &str) -> Vec<GameEvent> {
        let idx = match state.players.iter().position(|p| p.nickname == nickname) {
            Some(idx) => idx,
            None => return Vec::new(),
        };
        state.players.remove(idx);
        info!(
            match_id = %self.id,
            nickname,
            reason,
            player_count = state.players.len(),
            "Player removed from match"
        );

        let mut events = vec![GameEvent::PlayerLeft {
            nickname: nickname.to_string(),
            reason: reason.to_string(),
        }];
        if let Some(machine) = state.card.as_mut() {
            events.extend(machine.mark_unresponsive(nickname));
        }

        if state.phase == MatchPhase::Flight && state.players.len() < 2 {
            events.extend(self.end_match(state, EndReason::InsufficientPlayers));
        } else if state.phase == MatchPhase::Building
            && state.players.len() >= 2
            && state.players.iter().all(|p| p.ready)
        {
            // The departed player may have been the only one still
            // building; the remaining ready players launch immediately.
            events.extend(self.start_flight(state));
        } else {
            events.extend(self.advance_card(state));
        }
        events
    }

    /// Transition Building -> Flight and draw the first card
    fn start_flight(&self, state: &mut MatchState) -> Vec<GameEvent> {
        state.phase = MatchPhase::Flight;
        info!(match_id = %self.id, "Flight phase started");
        let mut events = vec![GameEvent::PhaseChanged {
            phase: MatchPhase::Flight,
        }];
        events.extend(self.advance_card(state));
        events
    }

    /// Draw cards until one is live or the deck runs out. A no-op unless
    /// the match is in flight with no unresolved card.
    fn advance_card(&self, state: &mut MatchState) -> Vec<GameEvent> {
        let mut events = Vec::new();
        loop {
            if state.phase != MatchPhase::Flight {
                break;
            }
            if let Some(machine) = &state.card {
                if !machine.is_resolved() {
                    break;
                }
            }
            state.card = None;

            let turn_order: Vec<String> = state
                .players
                .iter()
                .filter(|p| !p.eliminated)
                .map(|p| p.nickname.clone())
                .collect();
            if turn_order.len() < 2 {
                events.extend(self.end_match(state, EndReason::InsufficientPlayers));
                break;
            }

            match state.deck.pop_front() {
                None => {
                    events.extend(self.end_match(state, EndReason::DeckExhausted));
                    break;
                }
                Some(card) => {
                    info!(match_id = %self.id, card = %card.name, "Card drawn");
                    events.push(GameEvent::CardDrawn { card: card.clone() });
                    state.card = Some(CardMachine::new(card, &turn_order));
                }
            }
        }
        events
    }

    /// Transition to Ended and broadcast the final standings
    fn end_match(&self, state: &mut MatchState, reason: EndReason) -> Vec<GameEvent> {
        state.phase = MatchPhase::Ended;
        state.card = None;

        let mut standings: Vec<PlayerStanding> = state
            .players
            .iter()
            .map(|p| PlayerStanding {
                nickname: p.nickname.clone(),
                credits: p.credits,
                position: p.position,
                goods: p.board.total_goods(),
            })
            .collect();
        standings.sort_by(|a, b| {
            b.position
                .cmp(&a.position)
                .then_with(|| b.credits.cmp(&a.credits))
        });

        info!(match_id = %self.id, ?reason, "Match ended");
        vec![
            GameEvent::PhaseChanged {
                phase: MatchPhase::Ended,
            },
            GameEvent::MatchEnded { reason, standings },
        ]
    }

    /// Fire-and-forget fan-out; a lagging or absent subscriber never
    /// fails the action that produced the event
    fn broadcast(&self, events: &[GameEvent]) {
        for event in events {
            let _ = self.events.send(event.clone());
        }
    }
}
