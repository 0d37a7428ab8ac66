//! Hearts rules engine: a pure state machine over four hands.
//!
//! The engine owns hands and trick data and never performs I/O; the table
//! controller drives it and fans out the structured results it returns.

use rand::Rng;
use serde::Serialize;

use super::cards_logic::hand_has_suit;
use super::cards_types::{Card, Rank, Suit};
use super::dealing::{deal, shuffled_deck};
use super::tricks::{trick_winner, CompletedTrick, TrickPlay};
use super::{next_clockwise, Seat};
use crate::errors::GameError;

pub const TOTAL_ROUND_POINTS: i32 = 26;
pub const QUEEN_OF_SPADES: Card = Card::new(Suit::Spades, Rank::Queen);
pub const TWO_OF_CLUBS: Card = Card::new(Suit::Clubs, Rank::Two);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HeartsPhase {
    Passing,
    Playing,
    RoundEnd,
    GameEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PassDirection {
    Left,
    Right,
    Across,
    Hold,
}

impl PassDirection {
    /// Direction for a 1-based round number: 1 left, 2 right, 3 across,
    /// every fourth round holds.
    pub fn for_round(round_number: u32) -> Self {
        match round_number % 4 {
            1 => PassDirection::Left,
            2 => PassDirection::Right,
            3 => PassDirection::Across,
            _ => PassDirection::Hold,
        }
    }

    /// Seat that receives `giver`'s cards under this direction.
    pub fn receiver(&self, giver: Seat) -> Seat {
        let offset = match self {
            PassDirection::Left => 1,
            PassDirection::Right => 3,
            PassDirection::Across => 2,
            PassDirection::Hold => 0,
        };
        (giver + offset) % 4
    }
}

/// Result of a successful play.
#[derive(Debug, Clone, PartialEq)]
pub struct HeartsPlayOutcome {
    pub trick: Option<HeartsTrickEnd>,
    pub round: Option<HeartsRoundEnd>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeartsTrickEnd {
    pub winner: Seat,
    pub points: i32,
    pub trick: CompletedTrick,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeartsRoundEnd {
    pub round_scores: [i32; 4],
    pub cumulative_scores: [i32; 4],
    pub moon_shooter: Option<Seat>,
    pub point_cards_taken: [Vec<Card>; 4],
    pub game_over: bool,
    pub winners: Vec<Seat>,
}

#[derive(Debug, Clone)]
pub struct HeartsEngine {
    pub(crate) hands: [Vec<Card>; 4],
    pub(crate) round_number: u32,
    pub(crate) phase: HeartsPhase,
    pub(crate) pass_direction: PassDirection,
    pub(crate) pending_passes: [Option<[Card; 3]>; 4],
    pub(crate) current_trick: Vec<TrickPlay>,
    pub(crate) current_player: Seat,
    pub(crate) hearts_broken: bool,
    pub(crate) tricks_taken: [Vec<CompletedTrick>; 4],
    pub(crate) tricks_played: u8,
    pub(crate) last_trick: Option<CompletedTrick>,
    pub(crate) round_scores: [i32; 4],
    pub(crate) cumulative_scores: [i32; 4],
    pub(crate) ending_score: i32,
}

impl HeartsEngine {
    pub fn new<R: Rng + ?Sized>(ending_score: i32, rng: &mut R) -> Self {
        let mut engine = Self {
            hands: Default::default(),
            round_number: 0,
            phase: HeartsPhase::RoundEnd,
            pass_direction: PassDirection::Hold,
            pending_passes: [None; 4],
            current_trick: Vec::with_capacity(4),
            current_player: 0,
            hearts_broken: false,
            tricks_taken: Default::default(),
            tricks_played: 0,
            last_trick: None,
            round_scores: [0; 4],
            cumulative_scores: [0; 4],
            ending_score,
        };
        engine.start_next_round(rng);
        engine
    }

    pub fn phase(&self) -> HeartsPhase {
        self.phase
    }

    pub fn pass_direction(&self) -> PassDirection {
        self.pass_direction
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    pub fn current_player(&self) -> Seat {
        self.current_player
    }

    pub fn hand(&self, seat: Seat) -> &[Card] {
        &self.hands[seat as usize]
    }

    pub fn current_trick(&self) -> &[TrickPlay] {
        &self.current_trick
    }

    pub fn last_trick(&self) -> Option<&CompletedTrick> {
        self.last_trick.as_ref()
    }

    pub fn cumulative_scores(&self) -> [i32; 4] {
        self.cumulative_scores
    }

    pub fn has_passed(&self, seat: Seat) -> bool {
        self.pending_passes[seat as usize].is_some()
    }

    /// Deal the next round and reset per-round state. Advances the round
    /// number, so direction follows the left/right/across/hold cycle.
    pub fn start_next_round<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.round_number += 1;
        let deck = shuffled_deck(rng);
        self.hands = deal(&deck);
        self.pass_direction = PassDirection::for_round(self.round_number);
        self.pending_passes = [None; 4];
        self.current_trick.clear();
        self.hearts_broken = false;
        self.tricks_taken = Default::default();
        self.tricks_played = 0;
        self.last_trick = None;
        self.round_scores = [0; 4];
        if self.pass_direction == PassDirection::Hold {
            self.phase = HeartsPhase::Playing;
            self.current_player = self.holder_of(TWO_OF_CLUBS);
        } else {
            self.phase = HeartsPhase::Passing;
        }
    }

    fn holder_of(&self, card: Card) -> Seat {
        for seat in 0..4u8 {
            if self.hands[seat as usize].contains(&card) {
                return seat;
            }
        }
        // Unreachable after a full deal; seat 0 keeps the engine total.
        0
    }

    /// Submit a seat's three pass cards. When the fourth submission arrives
    /// the exchange happens atomically and play begins at the 2♣ holder.
    pub fn submit_pass(&mut self, seat: Seat, cards: [Card; 3]) -> Result<bool, GameError> {
        if self.phase != HeartsPhase::Passing {
            return Err(GameError::PhaseError);
        }
        if self.pending_passes[seat as usize].is_some() {
            return Err(GameError::NotYourTurn);
        }
        if cards[0] == cards[1] || cards[0] == cards[2] || cards[1] == cards[2] {
            return Err(GameError::BadPass);
        }
        let hand = &self.hands[seat as usize];
        if cards.iter().any(|c| !hand.contains(c)) {
            return Err(GameError::BadPass);
        }
        self.pending_passes[seat as usize] = Some(cards);

        if self.pending_passes.iter().all(|p| p.is_some()) {
            self.exchange_passes();
            self.phase = HeartsPhase::Playing;
            self.current_player = self.holder_of(TWO_OF_CLUBS);
            return Ok(true);
        }
        Ok(false)
    }

    fn exchange_passes(&mut self) {
        let mut incoming: [Vec<Card>; 4] = Default::default();
        for giver in 0..4u8 {
            let Some(cards) = self.pending_passes[giver as usize].take() else {
                continue;
            };
            let receiver = self.pass_direction.receiver(giver);
            self.hands[giver as usize].retain(|c| !cards.contains(c));
            incoming[receiver as usize].extend_from_slice(&cards);
        }
        for seat in 0..4 {
            self.hands[seat].extend_from_slice(&incoming[seat]);
            self.hands[seat].sort();
        }
    }

    fn is_point_card(card: Card) -> bool {
        card.suit == Suit::Hearts || card == QUEEN_OF_SPADES
    }

    /// Legal cards for `seat`, independent of turn enforcement.
    pub fn legal_cards(&self, seat: Seat) -> Vec<Card> {
        if self.phase != HeartsPhase::Playing {
            return Vec::new();
        }
        let hand = &self.hands[seat as usize];
        if hand.is_empty() {
            return Vec::new();
        }
        let first_trick = self.tricks_played == 0;

        let candidates: Vec<Card> = if self.current_trick.is_empty() {
            if first_trick {
                // Opening lead is always the 2♣.
                return hand.iter().copied().filter(|&c| c == TWO_OF_CLUBS).collect();
            }
            if !self.hearts_broken && hand.iter().any(|c| c.suit != Suit::Hearts) {
                hand.iter().copied().filter(|c| c.suit != Suit::Hearts).collect()
            } else {
                hand.clone()
            }
        } else {
            let lead = self.current_trick[0].card.suit;
            if hand_has_suit(hand, lead) {
                hand.iter().copied().filter(|c| c.suit == lead).collect()
            } else {
                hand.clone()
            }
        };

        if first_trick {
            // No points on the first trick unless the hand leaves no choice.
            let safe: Vec<Card> = candidates
                .iter()
                .copied()
                .filter(|&c| !Self::is_point_card(c))
                .collect();
            if !safe.is_empty() {
                return safe;
            }
        }
        candidates
    }

    pub fn play_card(&mut self, seat: Seat, card: Card) -> Result<HeartsPlayOutcome, GameError> {
        if self.phase != HeartsPhase::Playing {
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
        if card.suit == Suit::Hearts {
            self.hearts_broken = true;
        }

        if self.current_trick.len() < 4 {
            self.current_player = next_clockwise(seat);
            return Ok(HeartsPlayOutcome {
                trick: None,
                round: None,
            });
        }

        let winner = trick_winner(&self.current_trick, None)?;
        let trick = CompletedTrick {
            winner,
            plays: std::mem::take(&mut self.current_trick),
        };
        let points: i32 = trick
            .cards()
            .map(|c| {
                if c == QUEEN_OF_SPADES {
                    13
                } else if c.suit == Suit::Hearts {
                    1
                } else {
                    0
                }
            })
            .sum();
        self.tricks_taken[winner as usize].push(trick.clone());
        self.last_trick = Some(trick.clone());
        self.tricks_played += 1;
        self.current_player = winner;

        let round = if self.tricks_played == 13 {
            Some(self.finish_round())
        } else {
            None
        };

        Ok(HeartsPlayOutcome {
            trick: Some(HeartsTrickEnd {
                winner,
                points,
                trick,
            }),
            round,
        })
    }

    fn finish_round(&mut self) -> HeartsRoundEnd {
        let mut raw = [0i32; 4];
        let mut point_cards_taken: [Vec<Card>; 4] = Default::default();
        for seat in 0..4 {
            for trick in &self.tricks_taken[seat] {
                for card in trick.cards() {
                    if Self::is_point_card(card) {
                        point_cards_taken[seat].push(card);
                        raw[seat] += if card == QUEEN_OF_SPADES { 13 } else { 1 };
                    }
                }
            }
            point_cards_taken[seat].sort();
        }

        let (applied, moon_shooter) = resolve_moon_shot(raw, self.cumulative_scores);
        self.round_scores = applied;
        for seat in 0..4 {
            self.cumulative_scores[seat] += applied[seat];
        }

        let game_over = self.cumulative_scores.iter().any(|&s| s >= self.ending_score);
        let winners = if game_over {
            let min = *self.cumulative_scores.iter().min().unwrap_or(&0);
            (0..4u8)
                .filter(|&s| self.cumulative_scores[s as usize] == min)
                .collect()
        } else {
            Vec::new()
        };
        self.phase = if game_over {
            HeartsPhase::GameEnd
        } else {
            HeartsPhase::RoundEnd
        };

        HeartsRoundEnd {
            round_scores: applied,
            cumulative_scores: self.cumulative_scores,
            moon_shooter,
            point_cards_taken,
            game_over,
            winners,
        }
    }
}

/// Moon-shot disambiguation, separated from mutation so it can be
/// property-tested in isolation.
///
/// If a seat took all 26 points, two applications are possible:
/// A) shooter 0, everyone else +26; B) the raw scores (shooter +26). The
/// applied option is the one under which the shooter's hypothetical
/// cumulative stays at or below the minimum of the others'; ties go to A.
pub fn resolve_moon_shot(raw: [i32; 4], cumulative_before: [i32; 4]) -> ([i32; 4], Option<Seat>) {
    let Some(shooter) = (0..4u8).find(|&s| raw[s as usize] == TOTAL_ROUND_POINTS) else {
        return (raw, None);
    };
    let s = shooter as usize;

    let mut option_a = [TOTAL_ROUND_POINTS; 4];
    option_a[s] = 0;

    let others_min_a = (0..4)
        .filter(|&i| i != s)
        .map(|i| cumulative_before[i] + option_a[i])
        .min()
        .unwrap_or(0);
    if cumulative_before[s] <= others_min_a {
        return (option_a, Some(shooter));
    }

    let others_min_b = (0..4)
        .filter(|&i| i != s)
        .map(|i| cumulative_before[i])
        .min()
        .unwrap_or(0);
    if cumulative_before[s] + TOTAL_ROUND_POINTS <= others_min_b {
        return (raw, Some(shooter));
    }
    (option_a, Some(shooter))
}
