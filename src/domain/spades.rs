//! Spades rules engine: partnership bidding and play with spades as trump.
//!
//! Teams are fixed by seat parity (`team = seat % 2`). Bags accumulate per
//! team and convert into a −100 penalty per ten, with carry.

use std::fmt;

use rand::Rng;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use super::cards_logic::{hand_all_suit, hand_has_suit};
use super::cards_types::{Card, Suit};
use super::dealing::{deal, shuffled_deck};
use super::tricks::{trick_winner, CompletedTrick, TrickPlay};
use super::{next_clockwise, Seat};
use crate::errors::GameError;

pub const DEFAULT_WIN_THRESHOLD: i32 = 300;
pub const BLIND_NIL_DEFICIT: i32 = 100;

pub fn team_of(seat: Seat) -> usize {
    (seat % 2) as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpadesBid {
    Number(u8),
    Nil,
    BlindNil,
}

impl SpadesBid {
    /// Contribution to the team bid; nil variants count as zero.
    pub fn effective(&self) -> u8 {
        match self {
            SpadesBid::Number(n) => *n,
            SpadesBid::Nil | SpadesBid::BlindNil => 0,
        }
    }
}

// Bids travel as a bare integer or the strings "nil" / "blind_nil".
impl Serialize for SpadesBid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SpadesBid::Number(n) => serializer.serialize_u8(*n),
            SpadesBid::Nil => serializer.serialize_str("nil"),
            SpadesBid::BlindNil => serializer.serialize_str("blind_nil"),
        }
    }
}

impl<'de> Deserialize<'de> for SpadesBid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BidVisitor;

        impl Visitor<'_> for BidVisitor {
            type Value = SpadesBid;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an integer 0..=13, \"nil\", or \"blind_nil\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<SpadesBid, E> {
                if v <= 13 {
                    Ok(SpadesBid::Number(v as u8))
                } else {
                    Err(E::custom(format!("bid out of range: {v}")))
                }
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<SpadesBid, E> {
                if (0..=13).contains(&v) {
                    Ok(SpadesBid::Number(v as u8))
                } else {
                    Err(E::custom(format!("bid out of range: {v}")))
                }
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<SpadesBid, E> {
                match v {
                    "nil" => Ok(SpadesBid::Nil),
                    "blind_nil" => Ok(SpadesBid::BlindNil),
                    other => Err(E::custom(format!("unknown bid: {other:?}"))),
                }
            }
        }

        deserializer.deserialize_any(BidVisitor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SpadesPhase {
    Bidding,
    Playing,
    RoundEnd,
    GameEnd,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpadesBidOutcome {
    pub next_bidder: Option<Seat>,
    pub all_bids_in: bool,
}

#[derive(Debug, Clone)]
pub struct SpadesPlayOutcome {
    pub trick: Option<SpadesTrickEnd>,
    pub round: Option<SpadesRoundEnd>,
}

#[derive(Debug, Clone)]
pub struct SpadesTrickEnd {
    pub winner: Seat,
    pub trick: CompletedTrick,
}

#[derive(Debug, Clone)]
pub struct SpadesRoundEnd {
    pub round_scores: [i32; 2],
    pub cumulative_scores: [i32; 2],
    pub bags: [u32; 2],
    pub team_tricks: [u8; 2],
    pub game_over: bool,
    /// Winning team indices (two on a tie). Empty until the game is over.
    pub winners: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct SpadesEngine {
    pub(crate) hands: [Vec<Card>; 4],
    pub(crate) round_number: u32,
    pub(crate) phase: SpadesPhase,
    pub(crate) bids: [Option<SpadesBid>; 4],
    pub(crate) current_bidder: Seat,
    pub(crate) current_trick: Vec<TrickPlay>,
    pub(crate) current_player: Seat,
    pub(crate) spades_broken: bool,
    pub(crate) tricks_taken_by_seat: [u8; 4],
    pub(crate) tricks_played: u8,
    pub(crate) bags: [u32; 2],
    pub(crate) round_scores: [i32; 2],
    pub(crate) cumulative_scores: [i32; 2],
    pub(crate) win_threshold: i32,
    pub(crate) last_trick: Option<CompletedTrick>,
}

impl SpadesEngine {
    pub fn new<R: Rng + ?Sized>(win_threshold: i32, rng: &mut R) -> Self {
        let deck = shuffled_deck(rng);
        Self {
            hands: deal(&deck),
            round_number: 1,
            phase: SpadesPhase::Bidding,
            bids: [None; 4],
            current_bidder: 0,
            current_trick: Vec::with_capacity(4),
            current_player: 0,
            spades_broken: false,
            tricks_taken_by_seat: [0; 4],
            tricks_played: 0,
            bags: [0; 2],
            round_scores: [0; 2],
            cumulative_scores: [0; 2],
            win_threshold,
            last_trick: None,
        }
    }

    pub fn phase(&self) -> SpadesPhase {
        self.phase
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    pub fn current_bidder(&self) -> Seat {
        self.current_bidder
    }

    pub fn current_player(&self) -> Seat {
        self.current_player
    }

    pub fn hand(&self, seat: Seat) -> &[Card] {
        &self.hands[seat as usize]
    }

    pub fn bids(&self) -> [Option<SpadesBid>; 4] {
        self.bids
    }

    pub fn current_trick(&self) -> &[TrickPlay] {
        &self.current_trick
    }

    pub fn last_trick(&self) -> Option<&CompletedTrick> {
        self.last_trick.as_ref()
    }

    pub fn cumulative_scores(&self) -> [i32; 2] {
        self.cumulative_scores
    }

    /// Blind nil is only open to a seat whose team trails by at least 100
    /// and whose partner has not already bid it.
    pub fn blind_nil_allowed(&self, seat: Seat) -> bool {
        let mine = self.cumulative_scores[team_of(seat)];
        let theirs = self.cumulative_scores[1 - team_of(seat)];
        let partner = (seat + 2) % 4;
        theirs - mine >= BLIND_NIL_DEFICIT
            && self.bids[partner as usize] != Some(SpadesBid::BlindNil)
    }

    pub fn submit_bid(
        &mut self,
        seat: Seat,
        bid: SpadesBid,
    ) -> Result<SpadesBidOutcome, GameError> {
        if self.phase != SpadesPhase::Bidding {
            return Err(GameError::PhaseError);
        }
        if seat != self.current_bidder {
            return Err(GameError::NotYourTurn);
        }
        match bid {
            SpadesBid::Number(n) if n > 13 => return Err(GameError::InvalidBid),
            SpadesBid::BlindNil if !self.blind_nil_allowed(seat) => {
                return Err(GameError::BlindNilNotAllowed)
            }
            _ => {}
        }
        self.bids[seat as usize] = Some(bid);

        if seat == 3 {
            self.phase = SpadesPhase::Playing;
            self.current_player = 0;
            return Ok(SpadesBidOutcome {
                next_bidder: None,
                all_bids_in: true,
            });
        }
        self.current_bidder = seat + 1;
        Ok(SpadesBidOutcome {
            next_bidder: Some(self.current_bidder),
            all_bids_in: false,
        })
    }

    /// Legal cards for `seat`, independent of turn enforcement.
    pub fn legal_cards(&self, seat: Seat) -> Vec<Card> {
        if self.phase != SpadesPhase::Playing {
            return Vec::new();
        }
        let hand = &self.hands[seat as usize];
        if hand.is_empty() {
            return Vec::new();
        }
        if self.current_trick.is_empty() {
            if !self.spades_broken && !hand_all_suit(hand, Suit::Spades) {
                return hand
                    .iter()
                    .copied()
                    .filter(|c| c.suit != Suit::Spades)
                    .collect();
            }
            return hand.clone();
        }
        let lead = self.current_trick[0].card.suit;
        if hand_has_suit(hand, lead) {
            hand.iter().copied().filter(|c| c.suit == lead).collect()
        } else {
            hand.clone()
        }
    }

    pub fn play_card(&mut self, seat: Seat, card: Card) -> Result<SpadesPlayOutcome, GameError> {
        if self.phase != SpadesPhase::Playing {
            return Err(GameError::PhaseError);
        }
        if self.current_player != seat {
            return Err(GameError::NotYourTurn);
        }
        if !self.legal_cards(seat).contains(&card) {
            return Err(GameError::IllegalCard);
        }

        let hand = &mut self.hands[seat as usize];
        let pos = hand
            .iter()
            .position(|&c| c == card)
            .ok_or(GameError::IllegalCard)?;
        hand.remove(pos);
        self.current_trick.push(TrickPlay { seat, card });
        if card.suit == Suit::Spades {
            self.spades_broken = true;
        }

        if self.current_trick.len() < 4 {
            self.current_player = next_clockwise(seat);
            return Ok(SpadesPlayOutcome {
                trick: None,
                round: None,
            });
        }

        let winner = trick_winner(&self.current_trick, Some(Suit::Spades))?;
        let trick = CompletedTrick {
            winner,
            plays: std::mem::take(&mut self.current_trick),
        };
        self.tricks_taken_by_seat[winner as usize] += 1;
        self.tricks_played += 1;
        self.last_trick = Some(trick.clone());
        self.current_player = winner;

        let round = if self.tricks_played == 13 {
            Some(self.finish_round())
        } else {
            None
        };

        Ok(SpadesPlayOutcome {
            trick: Some(SpadesTrickEnd { winner, trick }),
            round,
        })
    }

    fn finish_round(&mut self) -> SpadesRoundEnd {
        let bids = self.bids.map(|b| b.unwrap_or(SpadesBid::Number(0)));
        let (scores, new_bags) = score_round(bids, self.tricks_taken_by_seat, self.bags);
        self.round_scores = scores;
        self.bags = new_bags;
        for team in 0..2 {
            self.cumulative_scores[team] += scores[team];
        }

        let team_tricks = [
            self.tricks_taken_by_seat[0] + self.tricks_taken_by_seat[2],
            self.tricks_taken_by_seat[1] + self.tricks_taken_by_seat[3],
        ];
        let game_over = self
            .cumulative_scores
            .iter()
            .any(|&s| s >= self.win_threshold);
        let winners = if game_over {
            let max = self.cumulative_scores[0].max(self.cumulative_scores[1]);
            (0..2)
                .filter(|&t| self.cumulative_scores[t] == max)
                .collect()
        } else {
            Vec::new()
        };
        self.phase = if game_over {
            SpadesPhase::GameEnd
        } else {
            SpadesPhase::RoundEnd
        };

        SpadesRoundEnd {
            round_scores: self.round_scores,
            cumulative_scores: self.cumulative_scores,
            bags: self.bags,
            team_tricks,
            game_over,
            winners,
        }
    }

    pub fn start_next_round<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.phase != SpadesPhase::RoundEnd {
            return;
        }
        self.round_number += 1;
        let deck = shuffled_deck(rng);
        self.hands = deal(&deck);
        self.phase = SpadesPhase::Bidding;
        self.bids = [None; 4];
        self.current_bidder = 0;
        self.current_trick.clear();
        self.current_player = 0;
        self.spades_broken = false;
        self.tricks_taken_by_seat = [0; 4];
        self.tricks_played = 0;
        self.round_scores = [0; 2];
        self.last_trick = None;
    }
}

/// Round scoring and bag accumulation, separated from mutation for direct
/// testing.
///
/// Per team: each nil-variant bid is evaluated independently (±50 / ±100 on
/// whether that seat took zero tricks); the team bid (sum of effective bids)
/// pays 10 per trick bid when made plus 1 per overtrick, or −10 per trick
/// bid when set. Every ten accumulated bags costs 100, with carry.
pub fn score_round(
    bids: [SpadesBid; 4],
    tricks_by_seat: [u8; 4],
    bags_before: [u32; 2],
) -> ([i32; 2], [u32; 2]) {
    let mut scores = [0i32; 2];
    let mut bags = bags_before;

    for seat in 0..4u8 {
        let team = team_of(seat);
        let took_none = tricks_by_seat[seat as usize] == 0;
        match bids[seat as usize] {
            SpadesBid::Nil => scores[team] += if took_none { 50 } else { -50 },
            SpadesBid::BlindNil => scores[team] += if took_none { 100 } else { -100 },
            SpadesBid::Number(_) => {}
        }
    }

    for team in 0..2 {
        let team_bid =
            (bids[team].effective() + bids[team + 2].effective()) as i32;
        let team_tricks =
            (tricks_by_seat[team] + tricks_by_seat[team + 2]) as i32;
        if team_tricks >= team_bid {
            let overtricks = team_tricks - team_bid;
            scores[team] += 10 * team_bid + overtricks;
            bags[team] += overtricks as u32;
        } else {
            scores[team] -= 10 * team_bid;
        }
        while bags[team] >= 10 {
            scores[team] -= 100;
            bags[team] -= 10;
        }
    }

    (scores, bags)
}
