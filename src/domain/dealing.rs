//! Deck construction and dealing.

use rand::seq::SliceRandom;
use rand::Rng;

use super::cards_types::{Card, Rank, Suit};

/// Generate a full 52-card deck in standard order.
pub fn full_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(52);
    for suit in Suit::ALL {
        for rank in Rank::ALL {
            deck.push(Card::new(suit, rank));
        }
    }
    deck
}

/// Full deck shuffled with the supplied RNG (Fisher-Yates via `SliceRandom`).
///
/// Tests inject a seeded `StdRng` here for reproducible deals.
pub fn shuffled_deck<R: Rng + ?Sized>(rng: &mut R) -> Vec<Card> {
    let mut deck = full_deck();
    deck.shuffle(rng);
    deck
}

/// Deal a deck round-robin by index (`i mod 4`) into four sorted hands.
pub fn deal(deck: &[Card]) -> [Vec<Card>; 4] {
    let mut hands: [Vec<Card>; 4] = Default::default();
    for (i, card) in deck.iter().enumerate() {
        hands[i % 4].push(*card);
    }
    for hand in hands.iter_mut() {
        hand.sort();
    }
    hands
}
