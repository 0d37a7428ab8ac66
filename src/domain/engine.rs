//! Engine dispatch: one table owns at most one of the three engines.

use serde::{Deserialize, Serialize};

use super::cards_types::Card;
use super::hearts::{HeartsEngine, HeartsPhase};
use super::king::{KingEngine, KingPhase};
use super::spades::{SpadesEngine, SpadesPhase};
use super::Seat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Hearts,
    King,
    Spades,
}

#[derive(Debug, Clone)]
pub enum GameEngine {
    Hearts(HeartsEngine),
    King(KingEngine),
    Spades(SpadesEngine),
}

impl GameEngine {
    pub fn game_type(&self) -> GameType {
        match self {
            GameEngine::Hearts(_) => GameType::Hearts,
            GameEngine::King(_) => GameType::King,
            GameEngine::Spades(_) => GameType::Spades,
        }
    }

    pub fn hand(&self, seat: Seat) -> &[Card] {
        match self {
            GameEngine::Hearts(e) => e.hand(seat),
            GameEngine::King(e) => e.hand(seat),
            GameEngine::Spades(e) => e.hand(seat),
        }
    }

    pub fn legal_cards(&self, seat: Seat) -> Vec<Card> {
        match self {
            GameEngine::Hearts(e) => e.legal_cards(seat),
            GameEngine::King(e) => e.legal_cards(seat),
            GameEngine::Spades(e) => e.legal_cards(seat),
        }
    }

    pub fn current_trick_plays(&self) -> Vec<super::tricks::TrickPlay> {
        match self {
            GameEngine::Hearts(e) => e.current_trick().to_vec(),
            GameEngine::King(e) => e.current_trick().to_vec(),
            GameEngine::Spades(e) => e.current_trick().to_vec(),
        }
    }

    /// Seat whose card play is currently awaited, if any.
    pub fn current_player(&self) -> Option<Seat> {
        match self {
            GameEngine::Hearts(e) if e.phase() == HeartsPhase::Playing => {
                Some(e.current_player())
            }
            GameEngine::King(e) if e.phase() == KingPhase::Playing => Some(e.current_player()),
            GameEngine::Spades(e) if e.phase() == SpadesPhase::Playing => {
                Some(e.current_player())
            }
            _ => None,
        }
    }

    /// The game (or party) has reached its terminal state.
    pub fn is_terminal(&self) -> bool {
        match self {
            GameEngine::Hearts(e) => e.phase() == HeartsPhase::GameEnd,
            GameEngine::King(e) => e.phase() == KingPhase::PartyEnd,
            GameEngine::Spades(e) => e.phase() == SpadesPhase::GameEnd,
        }
    }

    /// Lowest legal card by rank (suit order breaks ties); used by the turn
    /// timeout auto-play.
    pub fn lowest_legal_card(&self, seat: Seat) -> Option<Card> {
        self.legal_cards(seat)
            .into_iter()
            .min_by_key(|c| (c.rank, c.suit))
    }
}
