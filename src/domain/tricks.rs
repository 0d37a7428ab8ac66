//! Trick representation and winner resolution.

use serde::{Deserialize, Serialize};

use super::cards_logic::card_beats;
use super::cards_types::{Card, Suit};
use super::Seat;
use crate::errors::GameError;

/// One card played into a trick by a seat.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrickPlay {
    pub seat: Seat,
    pub card: Card,
}

/// A completed trick kept around for display and scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedTrick {
    pub winner: Seat,
    pub plays: Vec<TrickPlay>,
}

impl CompletedTrick {
    pub fn cards(&self) -> impl Iterator<Item = Card> + '_ {
        self.plays.iter().map(|p| p.card)
    }
}

/// Resolve the winner of a complete four-card trick.
///
/// If `trump` is set and any card is of that suit, the highest trump wins;
/// otherwise the highest card of the led suit wins. All other cards are
/// inert.
pub fn trick_winner(plays: &[TrickPlay], trump: Option<Suit>) -> Result<Seat, GameError> {
    if plays.len() != 4 {
        return Err(GameError::internal(format!(
            "trick_winner called with {} plays",
            plays.len()
        )));
    }
    let lead = plays[0].card.suit;
    let mut best = 0usize;
    for i in 1..plays.len() {
        if card_beats(plays[i].card, plays[best].card, lead, trump) {
            best = i;
        }
    }
    Ok(plays[best].seat)
}
