//! King rules engine: a 20-game party of penalty and trump contracts.
//!
//! Play order is counter-clockwise. The selector of each game picks a
//! contract constrained by per-selector quotas (3 penalties, 2 trumps) and a
//! global cap of two selections per contract over the party.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::cards_logic::{cards_of_suit, hand_all_suit, hand_has_suit};
use super::cards_types::{Card, Rank, Suit};
use super::dealing::{deal, shuffled_deck};
use super::tricks::{trick_winner, CompletedTrick, TrickPlay};
use super::{next_counter_clockwise, Seat};
use crate::errors::GameError;

pub const PARTY_GAMES: u8 = 20;
pub const KING_OF_HEARTS: Card = Card::new(Suit::Hearts, Rank::King);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PenaltyKind {
    El,
    Kupa,
    Erkek,
    Kiz,
    Rifki,
    SonIki,
}

impl PenaltyKind {
    pub const ALL: [PenaltyKind; 6] = [
        PenaltyKind::El,
        PenaltyKind::Kupa,
        PenaltyKind::Erkek,
        PenaltyKind::Kiz,
        PenaltyKind::Rifki,
        PenaltyKind::SonIki,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "contractType", rename_all = "camelCase")]
pub enum Contract {
    Penalty { name: PenaltyKind },
    Trump { suit: Suit },
}

impl Contract {
    pub fn is_penalty(&self) -> bool {
        matches!(self, Contract::Penalty { .. })
    }

    pub fn trump_suit(&self) -> Option<Suit> {
        match self {
            Contract::Trump { suit } => Some(*suit),
            Contract::Penalty { .. } => None,
        }
    }

    /// Stable index into the global usage table (6 penalties + 4 trumps).
    fn usage_index(&self) -> usize {
        match self {
            Contract::Penalty { name } => *name as usize,
            Contract::Trump { suit } => 6 + *suit as usize,
        }
    }

    pub const ALL: [Contract; 10] = [
        Contract::Penalty { name: PenaltyKind::El },
        Contract::Penalty { name: PenaltyKind::Kupa },
        Contract::Penalty { name: PenaltyKind::Erkek },
        Contract::Penalty { name: PenaltyKind::Kiz },
        Contract::Penalty { name: PenaltyKind::Rifki },
        Contract::Penalty { name: PenaltyKind::SonIki },
        Contract::Trump { suit: Suit::Clubs },
        Contract::Trump { suit: Suit::Diamonds },
        Contract::Trump { suit: Suit::Hearts },
        Contract::Trump { suit: Suit::Spades },
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum KingPhase {
    Selecting,
    Playing,
    GameEnd,
    PartyEnd,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectorUsage {
    pub penalties: u8,
    pub trumps: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRecord {
    pub game_number: u8,
    pub selector: Seat,
    pub contract: Contract,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KingPlayOutcome {
    pub trick: Option<KingTrickEnd>,
    pub game: Option<KingGameEnd>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KingTrickEnd {
    pub winner: Seat,
    pub points: i32,
    pub trick: CompletedTrick,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KingGameEnd {
    pub game_number: u8,
    pub game_scores: [i32; 4],
    pub cumulative_scores: [i32; 4],
    pub party_over: bool,
    /// Seats with a non-negative cumulative score, best first. Empty until
    /// the party is over.
    pub winners: Vec<Seat>,
}

#[derive(Debug, Clone)]
pub struct KingEngine {
    pub(crate) hands: [Vec<Card>; 4],
    pub(crate) game_number: u8,
    pub(crate) phase: KingPhase,
    pub(crate) selector_seat: Seat,
    pub(crate) contract: Option<Contract>,
    pub(crate) current_trick: Vec<TrickPlay>,
    pub(crate) current_player: Seat,
    pub(crate) tricks_taken: [Vec<CompletedTrick>; 4],
    pub(crate) trick_winners: Vec<Seat>,
    pub(crate) tricks_played: u8,
    pub(crate) hearts_broken: bool,
    pub(crate) trump_broken: bool,
    pub(crate) usage: [SelectorUsage; 4],
    pub(crate) global_usage: [u8; 10],
    pub(crate) contract_history: Vec<ContractRecord>,
    pub(crate) game_scores: [i32; 4],
    pub(crate) cumulative_scores: [i32; 4],
    pub(crate) last_trick: Option<CompletedTrick>,
}

impl KingEngine {
    pub fn new<R: Rng + ?Sized>(initial_selector: Seat, rng: &mut R) -> Self {
        let deck = shuffled_deck(rng);
        Self {
            hands: deal(&deck),
            game_number: 1,
            phase: KingPhase::Selecting,
            selector_seat: initial_selector % 4,
            contract: None,
            current_trick: Vec::with_capacity(4),
            current_player: initial_selector % 4,
            tricks_taken: Default::default(),
            trick_winners: Vec::with_capacity(13),
            tricks_played: 0,
            hearts_broken: false,
            trump_broken: false,
            usage: [SelectorUsage::default(); 4],
            global_usage: [0; 10],
            contract_history: Vec::with_capacity(PARTY_GAMES as usize),
            game_scores: [0; 4],
            cumulative_scores: [0; 4],
            last_trick: None,
        }
    }

    pub fn phase(&self) -> KingPhase {
        self.phase
    }

    pub fn game_number(&self) -> u8 {
        self.game_number
    }

    pub fn selector_seat(&self) -> Seat {
        self.selector_seat
    }

    pub fn contract(&self) -> Option<Contract> {
        self.contract
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

    pub fn contract_history(&self) -> &[ContractRecord] {
        &self.contract_history
    }

    /// Contracts the current selector may still pick.
    pub fn available_contracts(&self) -> Vec<Contract> {
        let usage = self.usage[self.selector_seat as usize];
        Contract::ALL
            .iter()
            .copied()
            .filter(|c| {
                if self.global_usage[c.usage_index()] >= 2 {
                    return false;
                }
                if c.is_penalty() {
                    usage.penalties < 3
                } else {
                    usage.trumps < 2
                }
            })
            .collect()
    }

    pub fn select_contract(&mut self, seat: Seat, contract: Contract) -> Result<(), GameError> {
        if self.phase != KingPhase::Selecting {
            return Err(GameError::PhaseError);
        }
        if seat != self.selector_seat {
            return Err(GameError::NotYourTurn);
        }
        let usage = &self.usage[seat as usize];
        let quota_left = if contract.is_penalty() {
            usage.penalties < 3
        } else {
            usage.trumps < 2
        };
        if !quota_left || self.global_usage[contract.usage_index()] >= 2 {
            return Err(GameError::QuotaExhausted);
        }

        if contract.is_penalty() {
            self.usage[seat as usize].penalties += 1;
        } else {
            self.usage[seat as usize].trumps += 1;
        }
        self.global_usage[contract.usage_index()] += 1;
        self.contract_history.push(ContractRecord {
            game_number: self.game_number,
            selector: seat,
            contract,
        });
        self.contract = Some(contract);
        self.phase = KingPhase::Playing;
        self.current_player = seat;
        Ok(())
    }

    /// Legal cards for `seat` under the selected contract, independent of
    /// turn enforcement.
    pub fn legal_cards(&self, seat: Seat) -> Vec<Card> {
        if self.phase != KingPhase::Playing {
            return Vec::new();
        }
        let Some(contract) = self.contract else {
            return Vec::new();
        };
        let hand = &self.hands[seat as usize];
        if hand.is_empty() {
            return Vec::new();
        }

        if self.current_trick.is_empty() {
            return self.legal_leads(contract, hand);
        }

        let lead = self.current_trick[0].card.suit;
        if hand_has_suit(hand, lead) {
            let follow = cards_of_suit(hand, lead);
            return match contract {
                Contract::Penalty { name: PenaltyKind::Erkek } => {
                    forced_under_table(&follow, &self.current_trick, lead, &[Rank::King, Rank::Jack])
                }
                Contract::Penalty { name: PenaltyKind::Kiz } => {
                    forced_under_table(&follow, &self.current_trick, lead, &[Rank::Queen])
                }
                _ => follow,
            };
        }

        // Void in the led suit: penalty contracts force discards.
        match contract {
            Contract::Penalty { name: PenaltyKind::Erkek } => {
                non_empty_or_hand(ranked_cards(hand, &[Rank::King, Rank::Jack]), hand)
            }
            Contract::Penalty { name: PenaltyKind::Kiz } => {
                non_empty_or_hand(ranked_cards(hand, &[Rank::Queen]), hand)
            }
            Contract::Penalty { name: PenaltyKind::Rifki } => {
                if hand.contains(&KING_OF_HEARTS) {
                    vec![KING_OF_HEARTS]
                } else {
                    non_empty_or_hand(cards_of_suit(hand, Suit::Hearts), hand)
                }
            }
            Contract::Penalty { name: PenaltyKind::Kupa } => {
                non_empty_or_hand(cards_of_suit(hand, Suit::Hearts), hand)
            }
            _ => hand.clone(),
        }
    }

    fn legal_leads(&self, contract: Contract, hand: &[Card]) -> Vec<Card> {
        match contract {
            Contract::Trump { suit } if !self.trump_broken && !hand_all_suit(hand, suit) => {
                hand.iter().copied().filter(|c| c.suit != suit).collect()
            }
            Contract::Penalty {
                name: PenaltyKind::Kupa | PenaltyKind::Rifki,
            } if !self.hearts_broken && !hand_all_suit(hand, Suit::Hearts) => hand
                .iter()
                .copied()
                .filter(|c| c.suit != Suit::Hearts)
                .collect(),
            _ => hand.to_vec(),
        }
    }

    pub fn play_card(&mut self, seat: Seat, card: Card) -> Result<KingPlayOutcome, GameError> {
        if self.phase != KingPhase::Playing {
            return Err(GameError::PhaseError);
        }
        if self.current_player != seat {
            return Err(GameError::NotYourTurn);
        }
        if !self.legal_cards(seat).contains(&card) {
            return Err(GameError::IllegalCard);
        }
        let contract = self
            .contract
            .ok_or_else(|| GameError::internal("playing with no contract"))?;

        let leading = self.current_trick.is_empty();
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
        if !leading && contract.trump_suit() == Some(card.suit) {
            self.trump_broken = true;
        }

        if self.current_trick.len() < 4 {
            self.current_player = next_counter_clockwise(seat);
            return Ok(KingPlayOutcome {
                trick: None,
                game: None,
            });
        }

        let winner = trick_winner(&self.current_trick, contract.trump_suit())?;
        let trick = CompletedTrick {
            winner,
            plays: std::mem::take(&mut self.current_trick),
        };
        self.tricks_played += 1;
        let points = trick_points(contract, self.tricks_played, &trick);
        self.tricks_taken[winner as usize].push(trick.clone());
        self.trick_winners.push(winner);
        self.last_trick = Some(trick.clone());
        self.current_player = winner;

        let game = if self.tricks_played == 13 || self.contract_satisfied(contract) {
            Some(self.finish_game())
        } else {
            None
        };

        Ok(KingPlayOutcome {
            trick: Some(KingTrickEnd {
                winner,
                points,
                trick,
            }),
            game,
        })
    }

    /// Whether the contract's objective is exhausted before trick 13.
    fn contract_satisfied(&self, contract: Contract) -> bool {
        let no_rank_left = |ranks: &[Rank]| {
            !self
                .hands
                .iter()
                .flatten()
                .any(|c| ranks.contains(&c.rank))
        };
        match contract {
            Contract::Penalty { name: PenaltyKind::Rifki } => self
                .last_trick
                .as_ref()
                .is_some_and(|t| t.cards().any(|c| c == KING_OF_HEARTS)),
            Contract::Penalty { name: PenaltyKind::Kupa } => {
                !self.hands.iter().any(|h| hand_has_suit(h, Suit::Hearts))
            }
            Contract::Penalty { name: PenaltyKind::Erkek } => {
                no_rank_left(&[Rank::King, Rank::Jack])
            }
            Contract::Penalty { name: PenaltyKind::Kiz } => no_rank_left(&[Rank::Queen]),
            _ => false,
        }
    }

    fn finish_game(&mut self) -> KingGameEnd {
        let contract = self.contract.unwrap_or(Contract::Penalty {
            name: PenaltyKind::El,
        });
        self.game_scores = score_game(contract, &self.tricks_taken, &self.trick_winners);
        for seat in 0..4 {
            self.cumulative_scores[seat] += self.game_scores[seat];
        }

        let party_over = self.game_number >= PARTY_GAMES;
        self.phase = if party_over {
            KingPhase::PartyEnd
        } else {
            KingPhase::GameEnd
        };
        let winners = if party_over {
            let mut seats: Vec<Seat> = (0..4u8)
                .filter(|&s| self.cumulative_scores[s as usize] >= 0)
                .collect();
            seats.sort_by_key(|&s| -self.cumulative_scores[s as usize]);
            seats
        } else {
            Vec::new()
        };

        KingGameEnd {
            game_number: self.game_number,
            game_scores: self.game_scores,
            cumulative_scores: self.cumulative_scores,
            party_over,
            winners,
        }
    }

    /// Deal the next game: rotate the selector counter-clockwise and reset
    /// per-game state. No-op once the party is over.
    pub fn start_next_game<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if self.phase != KingPhase::GameEnd {
            return;
        }
        self.game_number += 1;
        self.selector_seat = next_counter_clockwise(self.selector_seat);
        let deck = shuffled_deck(rng);
        self.hands = deal(&deck);
        self.contract = None;
        self.current_trick.clear();
        self.current_player = self.selector_seat;
        self.tricks_taken = Default::default();
        self.trick_winners.clear();
        self.tricks_played = 0;
        self.hearts_broken = false;
        self.trump_broken = false;
        self.game_scores = [0; 4];
        self.last_trick = None;
        self.phase = KingPhase::Selecting;
    }
}

/// Cards of `hand` whose rank is in `ranks`.
fn ranked_cards(hand: &[Card], ranks: &[Rank]) -> Vec<Card> {
    hand.iter()
        .copied()
        .filter(|c| ranks.contains(&c.rank))
        .collect()
}

fn non_empty_or_hand(forced: Vec<Card>, hand: &[Card]) -> Vec<Card> {
    if forced.is_empty() {
        hand.to_vec()
    } else {
        forced
    }
}

/// Follow-suit forcing for erkek/kiz: when the table's highest card of the
/// led suit outranks a held penalty card of that suit, the penalty card must
/// be played.
fn forced_under_table(
    follow: &[Card],
    trick: &[TrickPlay],
    lead: Suit,
    ranks: &[Rank],
) -> Vec<Card> {
    let Some(table_high) = trick
        .iter()
        .filter(|p| p.card.suit == lead)
        .map(|p| p.card.rank)
        .max()
    else {
        return follow.to_vec();
    };
    let forced: Vec<Card> = follow
        .iter()
        .copied()
        .filter(|c| ranks.contains(&c.rank) && c.rank < table_high)
        .collect();
    if forced.is_empty() {
        follow.to_vec()
    } else {
        forced
    }
}

/// Per-trick score delta for the charged seat under `contract`.
/// `trick_no` is 1-based.
pub fn trick_points(contract: Contract, trick_no: u8, trick: &CompletedTrick) -> i32 {
    match contract {
        Contract::Penalty { name: PenaltyKind::El } => -50,
        Contract::Penalty { name: PenaltyKind::Kupa } => {
            -30 * trick.cards().filter(|c| c.suit == Suit::Hearts).count() as i32
        }
        Contract::Penalty { name: PenaltyKind::Erkek } => {
            -60 * trick
                .cards()
                .filter(|c| matches!(c.rank, Rank::King | Rank::Jack))
                .count() as i32
        }
        Contract::Penalty { name: PenaltyKind::Kiz } => {
            -100 * trick.cards().filter(|c| c.rank == Rank::Queen).count() as i32
        }
        Contract::Penalty { name: PenaltyKind::Rifki } => {
            if trick.cards().any(|c| c == KING_OF_HEARTS) {
                -320
            } else {
                0
            }
        }
        Contract::Penalty { name: PenaltyKind::SonIki } => {
            if trick_no >= 12 {
                -180
            } else {
                0
            }
        }
        Contract::Trump { .. } => 50,
    }
}

/// Game scoring, separated from mutation for direct testing.
pub fn score_game(
    contract: Contract,
    tricks_taken: &[Vec<CompletedTrick>; 4],
    trick_winners: &[Seat],
) -> [i32; 4] {
    let mut scores = [0i32; 4];
    match contract {
        Contract::Penalty { name: PenaltyKind::SonIki } => {
            // The last two completed tricks carry the penalty.
            let start = trick_winners.len().saturating_sub(2);
            for &winner in &trick_winners[start..] {
                scores[winner as usize] -= 180;
            }
        }
        _ => {
            for seat in 0..4 {
                let captured = || tricks_taken[seat].iter().flat_map(|t| t.cards());
                scores[seat] = match contract {
                    Contract::Penalty { name: PenaltyKind::El } => {
                        -50 * tricks_taken[seat].len() as i32
                    }
                    Contract::Penalty { name: PenaltyKind::Kupa } => {
                        -30 * captured().filter(|c| c.suit == Suit::Hearts).count() as i32
                    }
                    Contract::Penalty { name: PenaltyKind::Erkek } => {
                        -60 * captured()
                            .filter(|c| matches!(c.rank, Rank::King | Rank::Jack))
                            .count() as i32
                    }
                    Contract::Penalty { name: PenaltyKind::Kiz } => {
                        -100 * captured().filter(|c| c.rank == Rank::Queen).count() as i32
                    }
                    Contract::Penalty { name: PenaltyKind::Rifki } => {
                        if captured().any(|c| c == KING_OF_HEARTS) {
                            -320
                        } else {
                            0
                        }
                    }
                    Contract::Penalty { name: PenaltyKind::SonIki } => 0,
                    Contract::Trump { .. } => 50 * tricks_taken[seat].len() as i32,
                };
            }
        }
    }
    scores
}
