//! King engine tests: contract quotas, per-contract legality, early
//! termination, scoring, and a full 20-game party.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::domain::king::{
    score_game, Contract, KingEngine, KingPhase, PenaltyKind, KING_OF_HEARTS, PARTY_GAMES,
};
use crate::domain::tricks::{CompletedTrick, TrickPlay};
use crate::domain::{Card, Rank, Suit};
use crate::errors::GameError;

fn card(suit: Suit, rank: Rank) -> Card {
    Card::new(suit, rank)
}

fn engine(seed: u64) -> KingEngine {
    KingEngine::new(0, &mut StdRng::seed_from_u64(seed))
}

fn penalty(name: PenaltyKind) -> Contract {
    Contract::Penalty { name }
}

fn trump(suit: Suit) -> Contract {
    Contract::Trump { suit }
}

/// Engine mid-game under `contract` with crafted hands; `current_player`
/// leads the next trick.
fn playing_engine(contract: Contract, hands: [Vec<Card>; 4], leader: u8) -> KingEngine {
    let mut e = engine(0);
    e.contract = Some(contract);
    e.phase = KingPhase::Playing;
    e.hands = hands;
    e.current_player = leader;
    e.current_trick.clear();
    e
}

#[test]
fn only_the_selector_selects_and_only_in_phase() {
    let mut e = engine(1);
    assert_eq!(e.selector_seat(), 0);
    assert_eq!(
        e.select_contract(2, penalty(PenaltyKind::El)),
        Err(GameError::NotYourTurn)
    );
    e.select_contract(0, penalty(PenaltyKind::El)).unwrap();
    assert_eq!(e.phase(), KingPhase::Playing);
    assert_eq!(e.current_player(), 0);
    assert_eq!(
        e.select_contract(0, penalty(PenaltyKind::Kupa)),
        Err(GameError::PhaseError)
    );
    assert_eq!(e.contract_history().len(), 1);
}

#[test]
fn exhausted_global_usage_rejects_the_contract() {
    let mut e = engine(2);
    // trump:hearts has been taken twice earlier in the party.
    e.global_usage[6 + Suit::Hearts as usize] = 2;
    assert_eq!(
        e.select_contract(0, trump(Suit::Hearts)),
        Err(GameError::QuotaExhausted)
    );
    // trump:spades is untouched and goes through.
    e.select_contract(0, trump(Suit::Spades)).unwrap();
    assert_eq!(e.contract(), Some(trump(Suit::Spades)));
}

#[test]
fn selector_quotas_cap_penalties_and_trumps() {
    let mut e = engine(3);
    e.usage[0].penalties = 3;
    assert_eq!(
        e.select_contract(0, penalty(PenaltyKind::Kiz)),
        Err(GameError::QuotaExhausted)
    );
    e.usage[0].trumps = 2;
    assert_eq!(
        e.select_contract(0, trump(Suit::Clubs)),
        Err(GameError::QuotaExhausted)
    );
    let available = e.available_contracts();
    assert!(available.is_empty());
}

#[test]
fn play_order_is_counter_clockwise() {
    let hands = [
        vec![card(Suit::Clubs, Rank::Ace), card(Suit::Diamonds, Rank::Two)],
        vec![card(Suit::Clubs, Rank::Five), card(Suit::Diamonds, Rank::Three)],
        vec![card(Suit::Clubs, Rank::Seven), card(Suit::Diamonds, Rank::Four)],
        vec![card(Suit::Clubs, Rank::Nine), card(Suit::Diamonds, Rank::Five)],
    ];
    let mut e = playing_engine(penalty(PenaltyKind::El), hands, 0);
    e.play_card(0, card(Suit::Clubs, Rank::Ace)).unwrap();
    assert_eq!(e.current_player(), 3);
    assert_eq!(
        e.play_card(1, card(Suit::Clubs, Rank::Five)),
        Err(GameError::NotYourTurn)
    );
}

#[test]
fn rifki_ends_the_game_when_the_king_falls() {
    let hands = [
        vec![card(Suit::Clubs, Rank::Ace), card(Suit::Diamonds, Rank::Two)],
        vec![card(Suit::Clubs, Rank::Five), card(Suit::Diamonds, Rank::Three)],
        vec![KING_OF_HEARTS, card(Suit::Diamonds, Rank::Four)],
        vec![card(Suit::Clubs, Rank::Nine), card(Suit::Diamonds, Rank::Five)],
    ];
    let mut e = playing_engine(penalty(PenaltyKind::Rifki), hands, 0);
    e.tricks_played = 6; // the king falls on trick 7
    e.trick_winners = vec![0, 1, 2, 3, 0, 1];

    e.play_card(0, card(Suit::Clubs, Rank::Ace)).unwrap();
    e.play_card(3, card(Suit::Clubs, Rank::Nine)).unwrap();
    // Seat 2 is void in clubs and holds K♥: it is forced out.
    assert_eq!(e.legal_cards(2), vec![KING_OF_HEARTS]);
    e.play_card(2, KING_OF_HEARTS).unwrap();
    let outcome = e.play_card(1, card(Suit::Clubs, Rank::Five)).unwrap();

    let game = outcome.game.expect("rifki must end early");
    assert_eq!(game.game_scores, [-320, 0, 0, 0]);
    assert!(!game.party_over);
    assert_eq!(e.phase(), KingPhase::GameEnd);
}

#[test]
fn erkek_forces_kings_and_jacks_under_a_higher_card() {
    let hands = [
        vec![card(Suit::Spades, Rank::Ace), card(Suit::Clubs, Rank::Two)],
        vec![
            card(Suit::Spades, Rank::King),
            card(Suit::Spades, Rank::Two),
            card(Suit::Clubs, Rank::Three),
        ],
        vec![card(Suit::Diamonds, Rank::King), card(Suit::Clubs, Rank::Four)],
        vec![card(Suit::Spades, Rank::Five), card(Suit::Clubs, Rank::Six)],
    ];
    let mut e = playing_engine(penalty(PenaltyKind::Erkek), hands, 0);
    e.play_card(0, card(Suit::Spades, Rank::Ace)).unwrap();
    // Seat 3 follows plainly.
    e.play_card(3, card(Suit::Spades, Rank::Five)).unwrap();
    // Seat 2 is void in spades and holds a king: forced to shed it.
    assert_eq!(e.legal_cards(2), vec![card(Suit::Diamonds, Rank::King)]);
    e.play_card(2, card(Suit::Diamonds, Rank::King)).unwrap();
    // Seat 1 follows and its K♠ sits under the table's A♠: forced.
    assert_eq!(e.legal_cards(1), vec![card(Suit::Spades, Rank::King)]);
}

#[test]
fn kupa_forces_heart_discards_and_blocks_heart_leads() {
    let hands = [
        vec![card(Suit::Hearts, Rank::Ace), card(Suit::Clubs, Rank::Two)],
        vec![card(Suit::Clubs, Rank::Five), card(Suit::Hearts, Rank::Three)],
        vec![card(Suit::Hearts, Rank::Nine), card(Suit::Diamonds, Rank::Four)],
        vec![card(Suit::Clubs, Rank::Nine), card(Suit::Diamonds, Rank::Five)],
    ];
    let mut e = playing_engine(penalty(PenaltyKind::Kupa), hands, 0);
    // Leading hearts is barred while unbroken.
    assert_eq!(e.legal_cards(0), vec![card(Suit::Clubs, Rank::Two)]);
    e.play_card(0, card(Suit::Clubs, Rank::Two)).unwrap();
    e.play_card(3, card(Suit::Clubs, Rank::Nine)).unwrap();
    // Seat 2 void in clubs with a heart in hand: must discard it.
    assert_eq!(e.legal_cards(2), vec![card(Suit::Hearts, Rank::Nine)]);
}

#[test]
fn trump_contract_blocks_trump_leads_until_broken() {
    let hands = [
        vec![card(Suit::Spades, Rank::Ace), card(Suit::Clubs, Rank::Two)],
        vec![card(Suit::Clubs, Rank::Five), card(Suit::Spades, Rank::Three)],
        vec![card(Suit::Diamonds, Rank::Nine), card(Suit::Spades, Rank::Four)],
        vec![card(Suit::Clubs, Rank::Nine), card(Suit::Diamonds, Rank::Five)],
    ];
    let mut e = playing_engine(trump(Suit::Spades), hands, 0);
    assert!(!e.trump_broken);
    assert_eq!(e.legal_cards(0), vec![card(Suit::Clubs, Rank::Two)]);

    e.play_card(0, card(Suit::Clubs, Rank::Two)).unwrap();
    e.play_card(3, card(Suit::Clubs, Rank::Nine)).unwrap();
    // Seat 2 void in clubs ruffs: trump is broken and wins the trick.
    e.play_card(2, card(Suit::Spades, Rank::Four)).unwrap();
    assert!(e.trump_broken);
    let outcome = e.play_card(1, card(Suit::Clubs, Rank::Five)).unwrap();
    assert_eq!(outcome.trick.unwrap().winner, 2);
}

#[test]
fn scoring_table_per_contract() {
    let trick_for = |winner: u8, cards: Vec<Card>| CompletedTrick {
        winner,
        plays: cards
            .into_iter()
            .enumerate()
            .map(|(i, card)| TrickPlay {
                seat: (winner + i as u8) % 4,
                card,
            })
            .collect(),
    };

    // el: 50 per trick taken
    let mut taken: [Vec<CompletedTrick>; 4] = Default::default();
    taken[1].push(trick_for(1, vec![card(Suit::Clubs, Rank::Two)]));
    taken[1].push(trick_for(1, vec![card(Suit::Clubs, Rank::Three)]));
    assert_eq!(
        score_game(penalty(PenaltyKind::El), &taken, &[1, 1]),
        [0, -100, 0, 0]
    );

    // kupa: 30 per heart captured
    let mut taken: [Vec<CompletedTrick>; 4] = Default::default();
    taken[2].push(trick_for(
        2,
        vec![card(Suit::Hearts, Rank::Two), card(Suit::Hearts, Rank::Nine)],
    ));
    assert_eq!(
        score_game(penalty(PenaltyKind::Kupa), &taken, &[2]),
        [0, 0, -60, 0]
    );

    // kiz: 100 per queen
    let mut taken: [Vec<CompletedTrick>; 4] = Default::default();
    taken[0].push(trick_for(
        0,
        vec![card(Suit::Spades, Rank::Queen), card(Suit::Hearts, Rank::Queen)],
    ));
    assert_eq!(
        score_game(penalty(PenaltyKind::Kiz), &taken, &[0]),
        [-200, 0, 0, 0]
    );

    // rifki: 320 for the king of hearts
    let mut taken: [Vec<CompletedTrick>; 4] = Default::default();
    taken[3].push(trick_for(3, vec![KING_OF_HEARTS]));
    assert_eq!(
        score_game(penalty(PenaltyKind::Rifki), &taken, &[3]),
        [0, 0, 0, -320]
    );

    // sonIki: the winners of the last two tricks
    let winners: Vec<u8> = vec![0, 1, 2, 3, 0, 1, 2, 3, 0, 1, 2, 2, 2];
    let taken: [Vec<CompletedTrick>; 4] = Default::default();
    assert_eq!(
        score_game(penalty(PenaltyKind::SonIki), &taken, &winners),
        [0, 0, -360, 0]
    );

    // trump: +50 per trick
    let mut taken: [Vec<CompletedTrick>; 4] = Default::default();
    taken[0].push(trick_for(0, vec![card(Suit::Clubs, Rank::Two)]));
    taken[2].push(trick_for(2, vec![card(Suit::Clubs, Rank::Three)]));
    assert_eq!(
        score_game(trump(Suit::Hearts), &taken, &[0, 2]),
        [50, 0, 50, 0]
    );
}

/// Drive a whole party: the selector greedily takes the first available
/// contract and every seat plays its first legal card.
#[test]
fn a_full_party_respects_every_quota() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut e = KingEngine::new(0, &mut rng);
    let mut last_game = None;

    loop {
        let selector = e.selector_seat();
        let pick = e.available_contracts()[0];
        e.select_contract(selector, pick).unwrap();

        loop {
            let seat = e.current_player();
            let card = e.legal_cards(seat)[0];
            if let Some(game) = e.play_card(seat, card).unwrap().game {
                last_game = Some(game);
                break;
            }
        }
        if e.phase() == KingPhase::PartyEnd {
            break;
        }
        e.start_next_game(&mut rng);
    }

    assert_eq!(e.game_number(), PARTY_GAMES);
    assert_eq!(e.contract_history().len(), PARTY_GAMES as usize);
    for seat in 0..4 {
        assert!(e.usage[seat].penalties <= 3);
        assert!(e.usage[seat].trumps <= 2);
        assert_eq!(e.usage[seat].penalties + e.usage[seat].trumps, 5);
    }
    for &used in &e.global_usage {
        assert_eq!(used, 2);
    }

    // Winners are exactly the non-negative seats, best first.
    let last_game = last_game.expect("party produced a final game");
    assert!(last_game.party_over);
    let cumulative = e.cumulative_scores();
    let mut expected: Vec<u8> = (0..4u8).filter(|&s| cumulative[s as usize] >= 0).collect();
    expected.sort_by_key(|&s| -cumulative[s as usize]);
    assert_eq!(last_game.winners, expected);
}

#[test]
fn selector_rotates_counter_clockwise_between_games() {
    let mut rng = StdRng::seed_from_u64(9);
    let mut e = KingEngine::new(2, &mut rng);
    assert_eq!(e.selector_seat(), 2);
    e.select_contract(2, penalty(PenaltyKind::El)).unwrap();
    // Flush the game quickly by playing first legal cards.
    loop {
        let seat = e.current_player();
        let card = e.legal_cards(seat)[0];
        if e.play_card(seat, card).unwrap().game.is_some() {
            break;
        }
    }
    e.start_next_game(&mut rng);
    assert_eq!(e.selector_seat(), 1);
    assert_eq!(e.game_number(), 2);
}
