//! Per-viewer projections of engine state.
//!
//! A snapshot is a pure function of (engine state, viewer): seated players
//! see their own hand and legal cards, spectators see neither. Everything
//! else (tricks, scores, contracts, bids once made) is public.

use serde::Serialize;

use super::engine::GameEngine;
use super::hearts::{HeartsEngine, HeartsPhase, PassDirection};
use super::king::{Contract, ContractRecord, KingEngine, KingPhase};
use super::spades::{SpadesBid, SpadesEngine, SpadesPhase};
use super::tricks::{CompletedTrick, TrickPlay};
use super::{Card, Seat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Seat(Seat),
    Spectator,
}

impl Viewer {
    fn seat(&self) -> Option<Seat> {
        match self {
            Viewer::Seat(s) => Some(*s),
            Viewer::Spectator => None,
        }
    }
}

/// Full idempotent state projection carried by `updateGame`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "gameType", rename_all = "lowercase")]
pub enum GameSnapshot {
    Hearts(HeartsSnapshot),
    King(KingSnapshot),
    Spades(SpadesSnapshot),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartsSnapshot {
    pub phase: HeartsPhase,
    pub round_number: u32,
    pub pass_direction: PassDirection,
    pub current_player: Seat,
    pub hearts_broken: bool,
    pub pass_submitted: [bool; 4],
    pub current_trick: Vec<TrickPlay>,
    pub last_trick: Option<CompletedTrick>,
    pub tricks_taken: [u8; 4],
    pub round_scores: [i32; 4],
    pub cumulative_scores: [i32; 4],
    pub ending_score: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hand: Option<Vec<Card>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_cards: Option<Vec<Card>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KingSnapshot {
    pub phase: KingPhase,
    pub game_number: u8,
    pub selector_seat: Seat,
    pub contract: Option<Contract>,
    pub available_contracts: Vec<Contract>,
    pub current_player: Seat,
    pub hearts_broken: bool,
    pub trump_broken: bool,
    pub current_trick: Vec<TrickPlay>,
    pub last_trick: Option<CompletedTrick>,
    pub tricks_taken: [u8; 4],
    pub contract_history: Vec<ContractRecord>,
    pub game_scores: [i32; 4],
    pub cumulative_scores: [i32; 4],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hand: Option<Vec<Card>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_cards: Option<Vec<Card>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpadesSnapshot {
    pub phase: SpadesPhase,
    pub round_number: u32,
    pub current_bidder: Seat,
    pub bids: [Option<SpadesBid>; 4],
    pub current_player: Seat,
    pub spades_broken: bool,
    pub current_trick: Vec<TrickPlay>,
    pub last_trick: Option<CompletedTrick>,
    pub tricks_taken_by_seat: [u8; 4],
    pub bags: [u32; 2],
    pub round_scores: [i32; 2],
    pub cumulative_scores: [i32; 2],
    pub win_threshold: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hand: Option<Vec<Card>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_cards: Option<Vec<Card>>,
}

/// Entry point: project engine state for one viewer.
pub fn project(engine: &GameEngine, viewer: Viewer) -> GameSnapshot {
    match engine {
        GameEngine::Hearts(e) => GameSnapshot::Hearts(project_hearts(e, viewer)),
        GameEngine::King(e) => GameSnapshot::King(project_king(e, viewer)),
        GameEngine::Spades(e) => GameSnapshot::Spades(project_spades(e, viewer)),
    }
}

fn own_hand<E>(viewer: Viewer, hand: impl Fn(Seat) -> Vec<Card>, legal: E) -> (Option<Vec<Card>>, Option<Vec<Card>>)
where
    E: Fn(Seat) -> Vec<Card>,
{
    match viewer.seat() {
        Some(seat) => (Some(hand(seat)), Some(legal(seat))),
        None => (None, None),
    }
}

fn project_hearts(e: &HeartsEngine, viewer: Viewer) -> HeartsSnapshot {
    let (hand, legal_cards) = own_hand(
        viewer,
        |s| e.hand(s).to_vec(),
        |s| e.legal_cards(s),
    );
    HeartsSnapshot {
        phase: e.phase(),
        round_number: e.round_number(),
        pass_direction: e.pass_direction(),
        current_player: e.current_player(),
        hearts_broken: e.hearts_broken,
        pass_submitted: [0, 1, 2, 3].map(|s| e.has_passed(s)),
        current_trick: e.current_trick().to_vec(),
        last_trick: e.last_trick().cloned(),
        tricks_taken: [0, 1, 2, 3].map(|s: usize| e.tricks_taken[s].len() as u8),
        round_scores: e.round_scores,
        cumulative_scores: e.cumulative_scores(),
        ending_score: e.ending_score,
        hand,
        legal_cards,
    }
}

fn project_king(e: &KingEngine, viewer: Viewer) -> KingSnapshot {
    let (hand, legal_cards) = own_hand(
        viewer,
        |s| e.hand(s).to_vec(),
        |s| e.legal_cards(s),
    );
    KingSnapshot {
        phase: e.phase(),
        game_number: e.game_number(),
        selector_seat: e.selector_seat(),
        contract: e.contract(),
        available_contracts: e.available_contracts(),
        current_player: e.current_player(),
        hearts_broken: e.hearts_broken,
        trump_broken: e.trump_broken,
        current_trick: e.current_trick().to_vec(),
        last_trick: e.last_trick().cloned(),
        tricks_taken: [0, 1, 2, 3].map(|s: usize| e.tricks_taken[s].len() as u8),
        contract_history: e.contract_history().to_vec(),
        game_scores: e.game_scores,
        cumulative_scores: e.cumulative_scores(),
        hand,
        legal_cards,
    }
}

fn project_spades(e: &SpadesEngine, viewer: Viewer) -> SpadesSnapshot {
    let (hand, legal_cards) = own_hand(
        viewer,
        |s| e.hand(s).to_vec(),
        |s| e.legal_cards(s),
    );
    SpadesSnapshot {
        phase: e.phase(),
        round_number: e.round_number(),
        current_bidder: e.current_bidder(),
        bids: e.bids(),
        current_player: e.current_player(),
        spades_broken: e.spades_broken,
        current_trick: e.current_trick().to_vec(),
        last_trick: e.last_trick().cloned(),
        tricks_taken_by_seat: e.tricks_taken_by_seat,
        bags: e.bags,
        round_scores: e.round_scores,
        cumulative_scores: e.cumulative_scores(),
        win_threshold: e.win_threshold,
        hand,
        legal_cards,
    }
}
