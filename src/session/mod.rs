//! Session registry - match and participant bookkeeping
//!
//! Thin boundary consumed by the transport layer: it resolves match ids
//! to controllers and nicknames to broadcast subscriptions. Everything
//! game-related happens inside the resolved `MatchController`.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::game::error::GameError;
use crate::game::r#match::{MatchController, MatchRules};
use crate::protocol::GameEvent;

/// Registry of all active matches and connected participants
pub struct SessionRegistry {
    matches: DashMap<String, Arc<MatchController>>,
    /// Nickname -> match id; nicknames are unique across the registry
    participants: DashMap<String, String>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
            participants: DashMap::new(),
        }
    }

    /// Create a match with a fresh id and register it
    pub fn create_match(&self, rules: MatchRules, seed: u64) -> Arc<MatchController> {
        let id = Uuid::new_v4().to_string();
        let controller = Arc::new(MatchController::new(id.clone(), rules, seed));
        self.matches.insert(id.clone(), controller.clone());
        info!(match_id = %id, capacity = rules.capacity, "Match created");
        controller
    }

    /// Resolve a match id to its controller
    pub fn resolve(&self, match_id: &str) -> Result<Arc<MatchController>, GameError> {
        self.matches
            .get(match_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| GameError::MatchNotFound(match_id.to_string()))
    }

    pub fn remove_match(&self, match_id: &str) -> Option<Arc<MatchController>> {
        self.matches.remove(match_id).map(|(_, controller)| {
            info!(match_id, "Match removed from registry");
            controller
        })
    }

    /// Register a connected participant and subscribe them to their
    /// match's event stream. The transport forwards received events to
    /// the client; the registry never encodes anything.
    pub fn register_participant(
        &self,
        nickname: &str,
        match_id: &str,
    ) -> Result<broadcast::Receiver<GameEvent>, GameError> {
        // Claiming the nickname must be atomic; a check-then-insert
        // would let two concurrent registrations both pass the check.
        match self.participants.entry(nickname.to_string()) {
            Entry::Occupied(_) => Err(GameError::NicknameTaken(nickname.to_string())),
            Entry::Vacant(slot) => {
                let controller = self.resolve(match_id)?;
                slot.insert(match_id.to_string());
                info!(match_id, nickname, "Participant registered");
                Ok(controller.subscribe())
            }
        }
    }

    /// Unregister a participant, running the disconnect path on their
    /// match so a mid-card departure cannot deadlock the round
    pub async fn unregister_participant(&self, nickname: &str) -> Vec<GameEvent> {
        let Some((_, match_id)) = self.participants.remove(nickname) else {
            return Vec::new();
        };
        info!(match_id = %match_id, nickname, "Participant unregistered");
        match self.resolve(&match_id) {
            Ok(controller) => {
                let events = controller.handle_disconnect(nickname).await;
                if controller.is_disposable().await {
                    self.remove_match(&match_id);
                }
                events
            }
            Err(_) => Vec::new(),
        }
    }

    /// Match id a nickname is registered to
    pub fn participant_match(&self, nickname: &str) -> Option<String> {
        self.participants.get(nickname).map(|entry| entry.clone())
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    pub fn total_participants(&self) -> usize {
        self.participants.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
