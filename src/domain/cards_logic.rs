//! Card comparisons shared by the engines: suit membership and trick strength.

use super::cards_types::{Card, Suit};

pub fn hand_has_suit(hand: &[Card], suit: Suit) -> bool {
    hand.iter().any(|c| c.suit == suit)
}

pub fn cards_of_suit(hand: &[Card], suit: Suit) -> Vec<Card> {
    hand.iter().copied().filter(|c| c.suit == suit).collect()
}

/// True when hand consists solely of `suit`.
pub fn hand_all_suit(hand: &[Card], suit: Suit) -> bool {
    !hand.is_empty() && hand.iter().all(|c| c.suit == suit)
}

/// Whether card `a` beats card `b` given the led suit and optional trump.
///
/// Trump beats any non-trump; within trump (or within the led suit when no
/// trump is involved) rank decides. Cards that neither follow the lead nor
/// trump are inert.
pub fn card_beats(a: Card, b: Card, lead: Suit, trump: Option<Suit>) -> bool {
    if let Some(trump_suit) = trump {
        let a_trump = a.suit == trump_suit;
        let b_trump = b.suit == trump_suit;
        if a_trump != b_trump {
            return a_trump;
        }
        if a_trump && b_trump {
            return a.rank > b.rank;
        }
    }
    let a_follows = a.suit == lead;
    let b_follows = b.suit == lead;
    if a_follows != b_follows {
        return a_follows;
    }
    a_follows && a.rank > b.rank
}
