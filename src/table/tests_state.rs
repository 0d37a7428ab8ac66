//! Table controller tests: seat assignment, takeover, timers, and the
//! broadcast ordering around tricks and rounds.

use rand::rngs::StdRng;
use rand::SeedableRng;
use uuid::Uuid;

use crate::domain::engine::{GameEngine, GameType};
use crate::domain::hearts::HeartsPhase;
use crate::errors::GameError;
use crate::table::state::{Audience, DelayKind, Effect, TableState, TimerKind};
use crate::ws::protocol::{ServerMsg, TableOptions};

fn table(game_type: GameType, seed: u64) -> TableState {
    TableState::with_rng(
        "willow".to_string(),
        game_type,
        TableOptions::default(),
        StdRng::seed_from_u64(seed),
    )
}

fn join4(t: &mut TableState) -> ([Uuid; 4], Vec<Effect>) {
    let conns = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
    let mut last = Vec::new();
    for (i, conn) in conns.iter().enumerate() {
        last = t.join(*conn, &format!("player{i}")).unwrap();
    }
    (conns, last)
}

fn msgs(fx: &[Effect]) -> Vec<&ServerMsg> {
    fx.iter()
        .filter_map(|e| match e {
            Effect::Send(_, m) => Some(m),
            _ => None,
        })
        .collect()
}

fn armed(fx: &[Effect]) -> Option<(TimerKind, u64)> {
    fx.iter().rev().find_map(|e| match e {
        Effect::ArmTimer { kind, gen, .. } => Some((*kind, *gen)),
        _ => None,
    })
}

fn delayed(fx: &[Effect]) -> Option<(DelayKind, u64)> {
    fx.iter().rev().find_map(|e| match e {
        Effect::Delay { kind, gen, .. } => Some((*kind, *gen)),
        _ => None,
    })
}

#[test]
fn seats_fill_in_order_and_the_fourth_join_starts_the_game() {
    let mut t = table(GameType::Hearts, 1);
    let a = Uuid::new_v4();
    let fx = t.join(a, "ali").unwrap();
    assert!(msgs(&fx)
        .iter()
        .any(|m| matches!(m, ServerMsg::TableJoined { seat: 0, .. })));
    assert!(t.engine.is_none());

    for (i, name) in ["b", "c"].iter().enumerate() {
        let fx = t.join(Uuid::new_v4(), name).unwrap();
        let want = (i + 1) as u8;
        assert!(msgs(&fx)
            .iter()
            .any(|m| matches!(m, ServerMsg::TableJoined { seat, .. } if *seat == want)));
    }

    let fx = t.join(Uuid::new_v4(), "d").unwrap();
    assert!(t.engine.is_some());
    let start_count = msgs(&fx)
        .iter()
        .filter(|m| matches!(m, ServerMsg::StartGame { .. }))
        .count();
    assert_eq!(start_count, 4);
    // Round one passes left, so the pass timer is armed.
    assert!(msgs(&fx)
        .iter()
        .any(|m| matches!(m, ServerMsg::PassTimerStart { .. })));
    assert_eq!(armed(&fx).map(|(k, _)| k), Some(TimerKind::Pass));
}

#[test]
fn blank_names_are_rejected() {
    let mut t = table(GameType::Hearts, 2);
    assert_eq!(t.join(Uuid::new_v4(), "   "), Err(GameError::NameRequired));
}

#[test]
fn join_during_a_game_without_open_seats_is_rejected() {
    let mut t = table(GameType::Spades, 3);
    let _ = join4(&mut t);
    assert_eq!(
        t.join(Uuid::new_v4(), "late"),
        Err(GameError::GameInProgress)
    );
}

#[test]
fn pre_game_leave_frees_the_seat() {
    let mut t = table(GameType::Hearts, 4);
    let a = Uuid::new_v4();
    t.join(a, "ali").unwrap();
    t.join(Uuid::new_v4(), "veli").unwrap();
    t.remove_participant(a);
    assert_eq!(t.players_public().len(), 1);

    let fx = t.join(Uuid::new_v4(), "ayse").unwrap();
    assert!(msgs(&fx)
        .iter()
        .any(|m| matches!(m, ServerMsg::TableJoined { seat: 0, .. })));
}

#[test]
fn mid_game_leave_keeps_the_seat_for_takeover() {
    let mut t = table(GameType::Hearts, 5);
    let (conns, _) = join4(&mut t);
    t.remove_participant(conns[1]);

    assert_eq!(t.summary().takeover_seats, vec![1]);
    let fx = t.join(Uuid::new_v4(), "yedek").unwrap();
    assert!(msgs(&fx)
        .iter()
        .any(|m| matches!(m, ServerMsg::TableJoined { seat: 1, .. })));
    assert!(msgs(&fx)
        .iter()
        .any(|m| matches!(m, ServerMsg::UpdateGame { .. })));
    // The running pass timer is replayed to the joiner.
    assert!(msgs(&fx)
        .iter()
        .any(|m| matches!(m, ServerMsg::PassTimerStart { .. })));
    assert!(t.summary().takeover_seats.is_empty());
}

#[test]
fn abandoned_tables_schedule_cleanup_and_rejoin_cancels_it() {
    let mut t = table(GameType::Hearts, 6);
    let (conns, _) = join4(&mut t);
    let mut scheduled = false;
    for conn in conns {
        let fx = t.remove_participant(conn);
        scheduled |= fx.iter().any(|e| matches!(e, Effect::ScheduleCleanup(_)));
    }
    assert!(scheduled);
    assert!(t.is_abandoned());

    let fx = t.join(Uuid::new_v4(), "geri").unwrap();
    assert!(fx.iter().any(|e| matches!(e, Effect::CancelCleanup)));
    assert_eq!(t.on_cleanup_fired(), Vec::new());
}

#[test]
fn cleanup_fires_only_while_still_abandoned() {
    let mut t = table(GameType::Hearts, 7);
    let (conns, _) = join4(&mut t);
    for conn in conns {
        t.remove_participant(conn);
    }
    assert_eq!(t.on_cleanup_fired(), vec![Effect::Destroy]);
}

#[test]
fn chat_is_sanitized_and_attributed() {
    let mut t = table(GameType::Hearts, 8);
    let a = Uuid::new_v4();
    t.join(a, "ali").unwrap();

    let fx = t.chat(a, "selam <script> dünya!");
    let (from, seat, text) = fx
        .iter()
        .find_map(|e| match e {
            Effect::Send(Audience::Room, ServerMsg::Chat { from, seat, text, .. }) => {
                Some((from.clone(), *seat, text.clone()))
            }
            _ => None,
        })
        .expect("chat event");
    assert_eq!(from, "ali");
    assert_eq!(seat, Some(0));
    assert_eq!(text, "selam script dünya!");

    // Unknown connections and empty-after-filter messages are dropped.
    assert!(t.chat(Uuid::new_v4(), "hi").is_empty());
    assert!(t.chat(a, "\u{1F0A1}").is_empty());
}

#[test]
fn typing_updates_go_to_everyone_but_the_sender() {
    let mut t = table(GameType::Hearts, 9);
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    t.join(a, "ali").unwrap();
    t.join(b, "veli").unwrap();

    let fx = t.typing(a, true);
    assert!(fx.iter().any(|e| matches!(
        e,
        Effect::Send(Audience::RoomExcept(conn), ServerMsg::TypingUpdate { .. }) if *conn == a
    )));
    assert!(fx
        .iter()
        .any(|e| matches!(e, Effect::ScheduleTypingSweep(_))));
}

#[test]
fn rematch_is_only_valid_after_game_end() {
    let mut t = table(GameType::Hearts, 10);
    let (conns, _) = join4(&mut t);
    assert_eq!(t.rematch(conns[0], true), Err(GameError::PhaseError));
}

#[test]
fn spades_bidding_then_a_trick_follows_the_ordering_guarantee() {
    let mut t = table(GameType::Spades, 11);
    let (conns, start_fx) = join4(&mut t);
    assert!(msgs(&start_fx)
        .iter()
        .any(|m| matches!(m, ServerMsg::BiddingStart { .. })));
    assert_eq!(armed(&start_fx).map(|(k, _)| k), Some(TimerKind::Bid));

    // Bids in seat order; the last one opens play.
    let mut fx = Vec::new();
    for seat in 0..4u8 {
        fx = t
            .submit_bid(conns[seat as usize], crate::domain::spades::SpadesBid::Number(3))
            .unwrap();
    }
    assert!(msgs(&fx)
        .iter()
        .any(|m| matches!(m, ServerMsg::TurnStart { player: 0, .. })));
    assert_eq!(armed(&fx).map(|(k, _)| k), Some(TimerKind::Turn));

    // Play one full trick.
    let mut last_fx = Vec::new();
    for _ in 0..4 {
        let Some(GameEngine::Spades(e)) = &t.engine else {
            panic!("spades engine expected");
        };
        let seat = e.current_player();
        let card = e.legal_cards(seat)[0];
        last_fx = t.play_card(conns[seat as usize], card).unwrap();
    }
    // Fourth card: cardPlayed flags completion, timer parks, trick gap runs.
    assert!(msgs(&last_fx).iter().any(|m| matches!(
        m,
        ServerMsg::CardPlayed {
            trick_complete: Some(true),
            winner: Some(_),
            ..
        }
    )));
    assert!(last_fx.iter().any(|e| matches!(e, Effect::CancelTimer)));
    let (kind, gen) = delayed(&last_fx).expect("trick gap scheduled");
    assert_eq!(kind, DelayKind::TrickGap);

    // Plays are blocked during the animation window.
    let Some(GameEngine::Spades(e)) = &t.engine else {
        panic!("spades engine expected");
    };
    let seat = e.current_player();
    let card = e.hand(seat)[0];
    assert_eq!(
        t.play_card(conns[seat as usize], card),
        Err(GameError::PhaseError)
    );

    let fx = t.on_delay_fired(DelayKind::TrickGap, gen);
    assert!(msgs(&fx)
        .iter()
        .any(|m| matches!(m, ServerMsg::TrickEnd { .. })));
    assert!(msgs(&fx)
        .iter()
        .any(|m| matches!(m, ServerMsg::TurnStart { .. })));
    assert_eq!(armed(&fx).map(|(k, _)| k), Some(TimerKind::Turn));
}

#[test]
fn pass_timeout_auto_passes_the_missing_seats() {
    let mut t = table(GameType::Hearts, 12);
    let (conns, start_fx) = join4(&mut t);
    let (kind, gen) = armed(&start_fx).unwrap();
    assert_eq!(kind, TimerKind::Pass);

    // Seat 0 passes on time; the others sleep.
    let Some(GameEngine::Hearts(e)) = &t.engine else {
        panic!("hearts engine expected");
    };
    let hand = e.hand(0).to_vec();
    t.submit_pass(conns[0], &hand[..3]).unwrap();

    let fx = t.on_timer_fired(TimerKind::Pass, gen).unwrap();
    let auto_count = msgs(&fx)
        .iter()
        .filter(|m| matches!(m, ServerMsg::AutoPassSubmitted { .. }))
        .count();
    assert_eq!(auto_count, 3);
    assert!(msgs(&fx)
        .iter()
        .any(|m| matches!(m, ServerMsg::TurnStart { .. })));

    let Some(GameEngine::Hearts(e)) = &t.engine else {
        panic!("hearts engine expected");
    };
    assert_eq!(e.phase(), HeartsPhase::Playing);
}

#[test]
fn turn_timeout_auto_plays_a_legal_card() {
    let mut t = table(GameType::Spades, 13);
    let (conns, _) = join4(&mut t);
    let mut fx = Vec::new();
    for seat in 0..4u8 {
        fx = t
            .submit_bid(conns[seat as usize], crate::domain::spades::SpadesBid::Number(3))
            .unwrap();
    }
    let (kind, gen) = armed(&fx).unwrap();
    assert_eq!(kind, TimerKind::Turn);

    let fx = t.on_timer_fired(TimerKind::Turn, gen).unwrap();
    assert!(msgs(&fx)
        .iter()
        .any(|m| matches!(m, ServerMsg::AutoPlay { .. })));
    assert!(msgs(&fx)
        .iter()
        .any(|m| matches!(m, ServerMsg::CardPlayed { .. })));
    // A fresh timer covers the next seat.
    assert_eq!(armed(&fx).map(|(k, _)| k), Some(TimerKind::Turn));
}

#[test]
fn stale_timer_fires_are_ignored() {
    let mut t = table(GameType::Spades, 14);
    let (_, fx) = join4(&mut t);
    let (_, gen) = armed(&fx).unwrap();
    assert_eq!(
        t.on_timer_fired(TimerKind::Bid, gen + 17).unwrap(),
        Vec::new()
    );
}

#[test]
fn warning_fires_only_for_the_live_turn_timer() {
    let mut t = table(GameType::Spades, 15);
    let (conns, _) = join4(&mut t);
    let mut fx = Vec::new();
    for seat in 0..4u8 {
        fx = t
            .submit_bid(conns[seat as usize], crate::domain::spades::SpadesBid::Number(2))
            .unwrap();
    }
    let (_, gen) = armed(&fx).unwrap();
    let warn = t.on_warning_fired(gen);
    assert!(msgs(&warn)
        .iter()
        .any(|m| matches!(m, ServerMsg::TimerWarning {})));
    assert!(t.on_warning_fired(gen + 1).is_empty());
}

#[test]
fn spectators_get_a_projection_without_hands() {
    let mut t = table(GameType::Spades, 16);
    let (_, _) = join4(&mut t);
    let s = Uuid::new_v4();
    let fx = t.spectate(s, Some("izleyici"));
    let game_state = fx
        .iter()
        .find_map(|e| match e {
            Effect::Send(_, ServerMsg::SpectateJoined { game_state, .. }) => {
                Some(game_state.clone())
            }
            _ => None,
        })
        .expect("spectateJoined event");
    let snapshot = game_state.expect("running game is projected");
    let json = serde_json::to_value(&snapshot).unwrap();
    assert!(json.get("hand").is_none());
    assert!(json.get("currentTrick").is_some());
}
