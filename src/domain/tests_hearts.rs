//! Hearts engine tests, including the seeded legal-lead and moon-shot
//! scenarios.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::domain::dealing::{deal, full_deck};
use crate::domain::hearts::{
    resolve_moon_shot, HeartsEngine, HeartsPhase, PassDirection, QUEEN_OF_SPADES, TWO_OF_CLUBS,
};
use crate::domain::{Card, Rank, Suit};
use crate::errors::GameError;

fn card(suit: Suit, rank: Rank) -> Card {
    Card::new(suit, rank)
}

fn engine(seed: u64) -> HeartsEngine {
    HeartsEngine::new(50, &mut StdRng::seed_from_u64(seed))
}

/// Engine dealt from the unshuffled deck, forced into a hold round. Seat 0
/// holds the 2♣ (deck index 0).
fn hold_round_engine() -> HeartsEngine {
    let mut e = engine(0);
    e.hands = deal(&full_deck());
    e.phase = HeartsPhase::Playing;
    e.pass_direction = PassDirection::Hold;
    e.pending_passes = [None; 4];
    e.current_trick.clear();
    e.current_player = 0;
    e.hearts_broken = false;
    e.tricks_played = 0;
    e.tricks_taken = Default::default();
    e
}

#[test]
fn pass_direction_cycle() {
    assert_eq!(PassDirection::for_round(1), PassDirection::Left);
    assert_eq!(PassDirection::for_round(2), PassDirection::Right);
    assert_eq!(PassDirection::for_round(3), PassDirection::Across);
    assert_eq!(PassDirection::for_round(4), PassDirection::Hold);
    assert_eq!(PassDirection::for_round(5), PassDirection::Left);
}

#[test]
fn pass_receivers() {
    assert_eq!(PassDirection::Left.receiver(0), 1);
    assert_eq!(PassDirection::Right.receiver(0), 3);
    assert_eq!(PassDirection::Across.receiver(1), 3);
    assert_eq!(PassDirection::Hold.receiver(2), 2);
}

#[test]
fn opening_lead_must_be_two_of_clubs() {
    let mut e = hold_round_engine();
    assert_eq!(e.legal_cards(0), vec![TWO_OF_CLUBS]);

    let other = card(Suit::Clubs, Rank::Six); // also in seat 0's hand
    assert!(e.hand(0).contains(&other));
    assert_eq!(e.play_card(0, other), Err(GameError::IllegalCard));

    e.play_card(0, TWO_OF_CLUBS).unwrap();
    assert_eq!(e.current_player(), 1);

    // Seat 1 holds clubs and must follow; no hearts are legal.
    let legal = e.legal_cards(1);
    assert!(!legal.is_empty());
    assert!(legal.iter().all(|c| c.suit == Suit::Clubs));
}

#[test]
fn wrong_turn_and_wrong_phase_are_rejected() {
    let mut e = hold_round_engine();
    assert_eq!(
        e.play_card(2, card(Suit::Clubs, Rank::Four)),
        Err(GameError::NotYourTurn)
    );

    let mut passing = engine(1);
    assert_eq!(passing.phase(), HeartsPhase::Passing);
    let c = passing.hand(0)[0];
    assert_eq!(passing.play_card(0, c), Err(GameError::PhaseError));
}

#[test]
fn round_one_passes_and_exchanges_left() {
    let mut e = engine(7);
    assert_eq!(e.phase(), HeartsPhase::Passing);
    assert_eq!(e.pass_direction(), PassDirection::Left);

    let mut given: [[Card; 3]; 4] = [[TWO_OF_CLUBS; 3]; 4];
    for seat in 0..4u8 {
        let hand = e.hand(seat);
        given[seat as usize] = [hand[0], hand[1], hand[2]];
        let exchanged = e.submit_pass(seat, given[seat as usize]).unwrap();
        assert_eq!(exchanged, seat == 3);
    }

    assert_eq!(e.phase(), HeartsPhase::Playing);
    assert_eq!(e.current_player(), {
        let mut holder = 0;
        for seat in 0..4u8 {
            if e.hand(seat).contains(&TWO_OF_CLUBS) {
                holder = seat;
            }
        }
        holder
    });
    for seat in 0..4u8 {
        assert_eq!(e.hand(seat).len(), 13);
        // Giver's cards landed one seat to the left.
        let receiver = (seat + 1) % 4;
        for c in given[seat as usize] {
            assert!(e.hand(receiver).contains(&c));
            assert!(!e.hand(seat).contains(&c));
        }
    }
}

#[test]
fn bad_passes_are_rejected_without_mutation() {
    let mut e = engine(8);
    let hand: Vec<Card> = e.hand(0).to_vec();

    // Duplicate card
    assert_eq!(
        e.submit_pass(0, [hand[0], hand[0], hand[1]]),
        Err(GameError::BadPass)
    );
    // Card not in hand
    let foreign = e.hand(1)[0];
    assert_eq!(
        e.submit_pass(0, [hand[0], hand[1], foreign]),
        Err(GameError::BadPass)
    );
    assert!(!e.has_passed(0));

    // Double submission
    e.submit_pass(0, [hand[0], hand[1], hand[2]]).unwrap();
    assert_eq!(
        e.submit_pass(0, [hand[3], hand[4], hand[5]]),
        Err(GameError::NotYourTurn)
    );
}

#[test]
fn moon_shot_option_a_when_cumulatives_are_level() {
    // Seed scenario: seat 2 took all 26 points at 0-0-0-0.
    let (applied, shooter) = resolve_moon_shot([0, 0, 26, 0], [0, 0, 0, 0]);
    assert_eq!(shooter, Some(2));
    assert_eq!(applied, [26, 26, 0, 26]);
}

#[test]
fn moon_shot_without_shooter_passes_through() {
    let (applied, shooter) = resolve_moon_shot([13, 5, 8, 0], [10, 0, 0, 30]);
    assert_eq!(shooter, None);
    assert_eq!(applied, [13, 5, 8, 0]);
}

#[test]
fn moon_shot_falls_back_to_option_a() {
    // Shooter so far ahead that neither option keeps them at the bottom;
    // ties and dead heats resolve to option A.
    let (applied, shooter) = resolve_moon_shot([26, 0, 0, 0], [60, 10, 20, 30]);
    assert_eq!(shooter, Some(0));
    assert_eq!(applied, [0, 26, 26, 26]);
}

/// Drive a full hold round picking the first legal card each turn.
fn play_out_round(e: &mut HeartsEngine) -> crate::domain::hearts::HeartsRoundEnd {
    let mut last = None;
    while e.phase() == HeartsPhase::Playing {
        let seat = e.current_player();
        let card = e.legal_cards(seat)[0];
        let outcome = e.play_card(seat, card).unwrap();
        if let Some(round) = outcome.round {
            last = Some(round);
        }
    }
    last.expect("round must complete")
}

#[test]
fn full_round_accounts_for_every_card_and_point() {
    let mut e = hold_round_engine();
    let round = play_out_round(&mut e);

    assert_eq!(e.tricks_played, 13);
    let captured: usize = (0..4)
        .map(|s| {
            e.tricks_taken[s]
                .iter()
                .map(|t| t.plays.len())
                .sum::<usize>()
        })
        .sum();
    assert_eq!(captured, 52);
    for seat in 0..4u8 {
        assert!(e.hand(seat).is_empty());
    }

    // 26 points total; 78 when a moon shot turned into option A.
    let total: i32 = round.round_scores.iter().sum();
    assert!(total == 26 || total == 78, "unexpected total {total}");
    let queen_counted = round
        .point_cards_taken
        .iter()
        .flatten()
        .any(|&c| c == QUEEN_OF_SPADES);
    assert!(queen_counted);
}

#[test]
fn game_ends_at_the_ending_score_and_lowest_seat_wins() {
    let mut e = hold_round_engine();
    e.cumulative_scores = [49, 49, 49, 0];
    let round = play_out_round(&mut e);

    assert!(round.game_over);
    assert_eq!(e.phase(), HeartsPhase::GameEnd);
    let min = *round.cumulative_scores.iter().min().unwrap();
    for &w in &round.winners {
        assert_eq!(round.cumulative_scores[w as usize], min);
    }
}

#[test]
fn next_round_rotates_the_direction() {
    let mut e = hold_round_engine();
    let _ = play_out_round(&mut e);
    assert_eq!(e.phase(), HeartsPhase::RoundEnd);

    let round_before = e.round_number();
    e.start_next_round(&mut StdRng::seed_from_u64(3));
    assert_eq!(e.round_number(), round_before + 1);
    assert_eq!(
        e.pass_direction(),
        PassDirection::for_round(e.round_number())
    );
    for seat in 0..4u8 {
        assert_eq!(e.hand(seat).len(), 13);
    }
}

#[test]
fn hearts_cannot_be_led_until_broken() {
    let mut e = hold_round_engine();
    // Give seat 0 a crafted hand: hearts plus one club.
    e.hands[0] = vec![
        card(Suit::Clubs, Rank::Two),
        card(Suit::Hearts, Rank::Five),
        card(Suit::Hearts, Rank::Nine),
    ];
    e.tricks_played = 1; // past the first trick
    e.hearts_broken = false;
    let legal = e.legal_cards(0);
    assert_eq!(legal, vec![card(Suit::Clubs, Rank::Two)]);

    e.hearts_broken = true;
    assert_eq!(e.legal_cards(0).len(), 3);
}

#[test]
fn first_trick_never_gives_up_points_unless_forced() {
    let mut e = hold_round_engine();
    // Seat 1 void in clubs, holding a heart, the queen, and a diamond.
    e.hands[1] = vec![
        card(Suit::Diamonds, Rank::Three),
        card(Suit::Hearts, Rank::Ace),
        QUEEN_OF_SPADES,
    ];
    e.play_card(0, TWO_OF_CLUBS).unwrap();
    assert_eq!(e.legal_cards(1), vec![card(Suit::Diamonds, Rank::Three)]);

    // All point cards: the restriction lifts.
    e.hands[1] = vec![card(Suit::Hearts, Rank::Ace), QUEEN_OF_SPADES];
    assert_eq!(e.legal_cards(1).len(), 2);
}
