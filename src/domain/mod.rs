//! Pure game domain: cards, tricks, and the three rule engines.
//!
//! Nothing in this module performs I/O or knows about tables, timers, or the
//! wire protocol; the table controller drives engines and fans out their
//! structured results.

pub mod cards_logic;
pub mod cards_types;
pub mod dealing;
pub mod engine;
pub mod hearts;
pub mod king;
pub mod snapshot;
pub mod spades;
pub mod tricks;

pub use cards_logic::{card_beats, cards_of_suit, hand_all_suit, hand_has_suit};
pub use cards_types::{Card, Rank, Suit};
pub use dealing::{deal, full_deck, shuffled_deck};
pub use engine::{GameEngine, GameType};
pub use tricks::{trick_winner, CompletedTrick, TrickPlay};

/// Fixed seats 0..=3 around the table.
pub type Seat = u8;

pub const SEATS: usize = 4;

/// Next seat clockwise (0 → 1 → 2 → 3 → 0). Hearts and Spades play order.
#[inline]
pub fn next_clockwise(seat: Seat) -> Seat {
    (seat + 1) % 4
}

/// Next seat counter-clockwise (0 → 3 → 2 → 1 → 0). King play and selector
/// rotation.
#[inline]
pub fn next_counter_clockwise(seat: Seat) -> Seat {
    (seat + 3) % 4
}

#[cfg(test)]
mod tests_hearts;
#[cfg(test)]
mod tests_king;
