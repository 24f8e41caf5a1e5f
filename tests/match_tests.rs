//! Match lifecycle tests: joining, phase transitions, flight rounds,
//! timeouts, and match endings.

use std::collections::VecDeque;

use pretty_assertions::assert_eq;

use startrade_core::board::{Component, Coord, Direction};
use startrade_core::game::card::{AdventureCard, CardKind, HazardSpec};
use startrade_core::game::choices::DecisionBuffer;
use startrade_core::game::hazard::HazardKind;
use startrade_core::protocol::{EndReason, GameEvent, PlayerColor};
use startrade_core::{
    GameError, MatchController, MatchPhase, MatchRules, PlayerAction, ResponseKind,
};

fn controller(deck: Vec<AdventureCard>) -> MatchController {
    MatchController::with_deck(
        "m-test".to_string(),
        MatchRules::new(2),
        7,
        VecDeque::from(deck),
    )
}

fn open_space() -> AdventureCard {
    AdventureCard {
        name: "Open Space".to_string(),
        kind: CardKind::OpenSpace,
    }
}

fn meteor_swarm() -> AdventureCard {
    AdventureCard {
        name: "Meteor Swarm".to_string(),
        kind: CardKind::MeteorSwarm {
            volleys: vec![HazardSpec {
                kind: HazardKind::SmallMeteorite,
                direction: Direction::North,
            }],
        },
    }
}

async fn place_engines(game: &MatchController, nickname: &str, count: i8) {
    for col in 0..count {
        game.submit_action(
            nickname,
            PlayerAction::PlaceComponent {
                coord: Coord::new(8, col),
                component: Component::Engine { double: false },
            },
        )
        .await
        .unwrap();
    }
}

/// Two players joined, boards built, both ready: match is in Flight
/// with the first card drawn.
async fn launched(deck: Vec<AdventureCard>) -> MatchController {
    let game = controller(deck);
    game.add_player("ana", PlayerColor::Red).await.unwrap();
    game.add_player("bea", PlayerColor::Blue).await.unwrap();
    place_engines(&game, "ana", 2).await;
    place_engines(&game, "bea", 1).await;
    game.submit_action("ana", PlayerAction::Ready).await.unwrap();
    game.submit_action("bea", PlayerAction::Ready).await.unwrap();
    game
}

#[tokio::test]
async fn joining_validates_nickname_color_and_capacity() {
    let game = controller(vec![open_space()]);

    game.add_player("ana", PlayerColor::Red).await.unwrap();
    assert_eq!(
        game.add_player("ana", PlayerColor::Blue).await.unwrap_err(),
        GameError::AlreadyJoined("ana".to_string())
    );
    assert_eq!(
        game.add_player("bea", PlayerColor::Red).await.unwrap_err(),
        GameError::ColorTaken(PlayerColor::Red)
    );

    // Second join fills the match and starts the building phase.
    let events = game.add_player("bea", PlayerColor::Blue).await.unwrap();
    assert!(events.contains(&GameEvent::PhaseChanged {
        phase: MatchPhase::Building
    }));
    assert_eq!(game.phase().await, MatchPhase::Building);

    assert_eq!(
        game.add_player("cam", PlayerColor::Green).await.unwrap_err(),
        GameError::CapacityExceeded
    );
}

#[tokio::test]
async fn actions_are_rejected_outside_their_phase() {
    let game = controller(vec![open_space()]);
    game.add_player("ana", PlayerColor::Red).await.unwrap();

    // Still in the lobby: no building actions yet.
    assert_eq!(
        game.submit_action("ana", PlayerAction::Ready).await.unwrap_err(),
        GameError::IllegalPhase {
            phase: MatchPhase::Lobby
        }
    );

    game.add_player("bea", PlayerColor::Blue).await.unwrap();
    assert_eq!(
        game.submit_action(
            "ana",
            PlayerAction::CardResponse {
                kind: ResponseKind::DeclareEngines,
                choices: DecisionBuffer::default(),
            },
        )
        .await
        .unwrap_err(),
        GameError::IllegalPhase {
            phase: MatchPhase::Building
        }
    );

    assert_eq!(
        game.submit_action("zoe", PlayerAction::Ready).await.unwrap_err(),
        GameError::UnknownPlayer("zoe".to_string())
    );
}

#[tokio::test]
async fn all_ready_starts_flight_and_draws_the_first_card() {
    let game = controller(vec![open_space()]);
    game.add_player("ana", PlayerColor::Red).await.unwrap();
    game.add_player("bea", PlayerColor::Blue).await.unwrap();

    let events = game.submit_action("ana", PlayerAction::Ready).await.unwrap();
    assert!(events.is_empty());
    assert_eq!(game.phase().await, MatchPhase::Building);

    let events = game.submit_action("bea", PlayerAction::Ready).await.unwrap();
    assert!(events.contains(&GameEvent::PhaseChanged {
        phase: MatchPhase::Flight
    }));
    assert!(events
        .iter()
        .any(|e| matches!(e, GameEvent::CardDrawn { .. })));
    assert_eq!(
        game.expected_response().await,
        Some(("ana".to_string(), ResponseKind::DeclareEngines))
    );
}

#[tokio::test]
async fn exhausting_the_deck_ends_the_match_with_standings() {
    let game = launched(vec![open_space()]).await;

    let coast = PlayerAction::CardResponse {
        kind: ResponseKind::DeclareEngines,
        choices: DecisionBuffer {
            double_engines: Some(vec![]),
            ..Default::default()
        },
    };
    game.submit_action("ana", coast.clone()).await.unwrap();
    let events = game.submit_action("bea", coast).await.unwrap();

    assert_eq!(game.phase().await, MatchPhase::Ended);
    let standings = events
        .iter()
        .find_map(|e| match e {
            GameEvent::MatchEnded { reason, standings } => {
                assert_eq!(*reason, EndReason::DeckExhausted);
                Some(standings.clone())
            }
            _ => None,
        })
        .expect("match end event");

    // Ana built two engines to Bea's one and finishes ahead.
    assert_eq!(standings[0].nickname, "ana");
    assert_eq!(standings[0].position, 2);
    assert_eq!(standings[1].nickname, "bea");
    assert_eq!(standings[1].position, 1);
    assert!(game.is_disposable().await);
}

#[tokio::test]
async fn a_flight_cannot_continue_below_two_players() {
    let game = launched(vec![open_space(), open_space()]).await;

    let events = game.remove_player("bea").await.unwrap();
    assert!(events.contains(&GameEvent::PlayerLeft {
        nickname: "bea".to_string(),
        reason: "left".to_string(),
    }));
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::MatchEnded {
            reason: EndReason::InsufficientPlayers,
            ..
        }
    )));
    assert_eq!(game.phase().await, MatchPhase::Ended);

    assert_eq!(
        game.remove_player("zoe").await.unwrap_err(),
        GameError::UnknownPlayer("zoe".to_string())
    );
}

#[tokio::test]
async fn a_disconnect_mid_card_skips_the_players_steps() {
    let game = launched(vec![meteor_swarm(), open_space()]).await;
    assert_eq!(
        game.expected_response().await,
        Some(("ana".to_string(), ResponseKind::DeclareDefense))
    );

    // With only two players the flight cannot continue, but the pending
    // defense step must not block the ending either.
    let events = game.handle_disconnect("ana").await;
    assert!(events.contains(&GameEvent::PlayerLeft {
        nickname: "ana".to_string(),
        reason: "disconnected".to_string(),
    }));
    assert_eq!(game.phase().await, MatchPhase::Ended);
}

#[tokio::test]
async fn timeouts_apply_the_no_defense_default() {
    let game = launched(vec![meteor_swarm()]).await;

    // Only the player the card is waiting on can time out.
    assert_eq!(
        game.expire_response("bea").await.unwrap_err(),
        GameError::NotCurrentTurn("bea".to_string())
    );

    game.expire_response("ana").await.unwrap();
    assert_eq!(
        game.expected_response().await,
        Some(("bea".to_string(), ResponseKind::DeclareDefense))
    );
}

#[tokio::test]
async fn last_unready_player_leaving_launches_the_flight() {
    let game = MatchController::with_deck(
        "m-test".to_string(),
        MatchRules::new(3),
        7,
        VecDeque::from(vec![open_space()]),
    );
    game.add_player("ana", PlayerColor::Red).await.unwrap();
    game.add_player("bea", PlayerColor::Blue).await.unwrap();
    game.add_player("cam", PlayerColor::Green).await.unwrap();
    game.submit_action("ana", PlayerAction::Ready).await.unwrap();
    game.submit_action("bea", PlayerAction::Ready).await.unwrap();
    assert_eq!(game.phase().await, MatchPhase::Building);

    // Cam never readied; this leave is what completes the condition.
    let events = game.remove_player("cam").await.unwrap();
    assert!(events.contains(&GameEvent::PhaseChanged {
        phase: MatchPhase::Flight
    }));
    assert_eq!(game.phase().await, MatchPhase::Flight);
    assert_eq!(
        game.expected_response().await,
        Some(("ana".to_string(), ResponseKind::DeclareEngines))
    );
}

#[tokio::test]
async fn an_ended_match_absorbs_further_actions() {
    let game = launched(vec![open_space()]).await;
    game.remove_player("bea").await.unwrap();
    assert_eq!(game.phase().await, MatchPhase::Ended);

    assert_eq!(
        game.submit_action("ana", PlayerAction::Ready).await.unwrap_err(),
        GameError::IllegalPhase {
            phase: MatchPhase::Ended
        }
    );
    assert_eq!(
        game.add_player("cam", PlayerColor::Green).await.unwrap_err(),
        GameError::MatchAlreadyStarted
    );
    assert_eq!(
        game.expire_response("ana").await.unwrap_err(),
        GameError::IllegalPhase {
            phase: MatchPhase::Ended
        }
    );
}

#[tokio::test]
async fn building_rejects_out_of_bounds_and_occupied_slots() {
    let game = controller(vec![open_space()]);
    game.add_player("ana", PlayerColor::Red).await.unwrap();
    game.add_player("bea", PlayerColor::Blue).await.unwrap();

    let coord = Coord::new(5, 5);
    game.submit_action(
        "ana",
        PlayerAction::PlaceComponent {
            coord,
            component: Component::Structural,
        },
    )
    .await
    .unwrap();

    assert_eq!(
        game.submit_action(
            "ana",
            PlayerAction::PlaceComponent {
                coord,
                component: Component::Cabin { crew: 2 },
            },
        )
        .await
        .unwrap_err(),
        GameError::InvalidActivation(coord)
    );
    assert_eq!(
        game.submit_action(
            "ana",
            PlayerAction::PlaceComponent {
                coord: Coord::new(11, 0),
                component: Component::Structural,
            },
        )
        .await
        .unwrap_err(),
        GameError::InvalidActivation(Coord::new(11, 0))
    );

    // A storage filled beyond capacity is malformed client data and must
    // be rejected at placement, not trusted by later card steps.
    let overfull = Coord::new(6, 6);
    assert_eq!(
        game.submit_action(
            "ana",
            PlayerAction::PlaceComponent {
                coord: overfull,
                component: Component::Storage { goods: 5, capacity: 3 },
            },
        )
        .await
        .unwrap_err(),
        GameError::InvalidActivation(overfull)
    );

    // A player's placements never touch another board.
    assert!(game.player("bea").await.unwrap().board.is_empty());
}

#[tokio::test]
async fn subscribers_see_the_same_events_the_caller_gets() {
    let game = controller(vec![open_space()]);
    let mut feed = game.subscribe();

    let returned = game.add_player("ana", PlayerColor::Red).await.unwrap();
    let broadcast = feed.recv().await.unwrap();
    assert_eq!(returned[0], broadcast);
}
