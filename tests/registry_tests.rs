//! Session registry tests: match lookup, participant bookkeeping, and
//! disposal of finished matches.

use pretty_assertions::assert_eq;

use startrade_core::protocol::{GameEvent, PlayerColor};
use startrade_core::{GameError, MatchRules, SessionRegistry};

#[tokio::test]
async fn created_matches_resolve_by_id_until_removed() {
    let registry = SessionRegistry::new();
    let game = registry.create_match(MatchRules::new(2), 3);

    let resolved = registry.resolve(game.id()).unwrap();
    assert_eq!(resolved.id(), game.id());
    assert_eq!(registry.active_matches(), 1);

    registry.remove_match(game.id());
    assert_eq!(
        registry.resolve(game.id()).unwrap_err(),
        GameError::MatchNotFound(game.id().to_string())
    );
    assert_eq!(registry.active_matches(), 0);
}

#[tokio::test]
async fn nicknames_are_unique_across_the_whole_registry() {
    let registry = SessionRegistry::new();
    let first = registry.create_match(MatchRules::new(2), 3);
    let second = registry.create_match(MatchRules::new(2), 9);

    registry.register_participant("ana", first.id()).unwrap();
    assert_eq!(
        registry
            .register_participant("ana", second.id())
            .unwrap_err(),
        GameError::NicknameTaken("ana".to_string())
    );
    assert_eq!(
        registry.register_participant("bea", "no-such-match").unwrap_err(),
        GameError::MatchNotFound("no-such-match".to_string())
    );

    assert_eq!(registry.participant_match("ana"), Some(first.id().to_string()));
    assert_eq!(registry.participant_match("bea"), None);
    assert_eq!(registry.total_participants(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_of_one_nickname_admit_exactly_one() {
    let registry = std::sync::Arc::new(SessionRegistry::new());
    let game = registry.create_match(MatchRules::new(4), 3);
    let match_id = game.id().to_string();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let registry = std::sync::Arc::clone(&registry);
        let match_id = match_id.clone();
        handles.push(tokio::spawn(async move {
            registry.register_participant("ana", &match_id).is_ok()
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 1);
    assert_eq!(registry.total_participants(), 1);
}

#[tokio::test]
async fn registered_participants_receive_match_events() {
    let registry = SessionRegistry::new();
    let game = registry.create_match(MatchRules::new(2), 3);

    let mut feed = registry.register_participant("ana", game.id()).unwrap();
    game.add_player("ana", PlayerColor::Red).await.unwrap();

    assert_eq!(
        feed.recv().await.unwrap(),
        GameEvent::PlayerJoined {
            nickname: "ana".to_string(),
            color: PlayerColor::Red,
        }
    );
}

#[tokio::test]
async fn unregistering_the_last_participant_disposes_the_match() {
    let registry = SessionRegistry::new();
    let game = registry.create_match(MatchRules::new(2), 3);
    let match_id = game.id().to_string();

    registry.register_participant("ana", &match_id).unwrap();
    game.add_player("ana", PlayerColor::Red).await.unwrap();

    let events = registry.unregister_participant("ana").await;
    assert!(events.contains(&GameEvent::PlayerLeft {
        nickname: "ana".to_string(),
        reason: "disconnected".to_string(),
    }));

    // The emptied match is gone along with the participant entry.
    assert_eq!(registry.active_matches(), 0);
    assert_eq!(registry.total_participants(), 0);
    assert_eq!(
        registry.resolve(&match_id).unwrap_err(),
        GameError::MatchNotFound(match_id.clone())
    );

    // Unregistering an unknown nickname is a quiet no-op.
    assert!(registry.unregister_participant("zoe").await.is_empty());
}
