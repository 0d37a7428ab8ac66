//! Wire protocol: every event that crosses the websocket, in both
//! directions. Events are internally tagged JSON records; unlisted fields
//! are ignored on input.

use serde::{Deserialize, Serialize};

use crate::domain::hearts::PassDirection;
use crate::domain::king::{Contract, PenaltyKind};
use crate::domain::snapshot::GameSnapshot;
use crate::domain::spades::SpadesBid;
use crate::domain::tricks::{CompletedTrick, TrickPlay};
use crate::domain::{Card, GameType, Seat, Suit};
use crate::errors::GameError;

/// Per-table options supplied at creation and echoed in summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableOptions {
    pub ending_score: Option<i32>,
    pub win_threshold: Option<i32>,
    pub initial_selector_seat: Option<Seat>,
}

/// Public view of a seated player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPublic {
    pub name: String,
    pub seat: Seat,
    pub connected: bool,
}

/// Lobby listing entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    pub id: String,
    pub game_type: GameType,
    pub player_count: usize,
    pub spectator_count: usize,
    pub in_progress: bool,
    pub takeover_seats: Vec<Seat>,
    pub players: Vec<String>,
}

/// Client → server events.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    #[serde(rename_all = "camelCase")]
    ListTables {
        game_type: Option<GameType>,
        #[serde(default)]
        include_in_progress: bool,
    },
    #[serde(rename_all = "camelCase")]
    CreateTable {
        player_name: String,
        game_type: GameType,
        #[serde(default)]
        options: TableOptions,
    },
    #[serde(rename_all = "camelCase")]
    JoinTable { table_id: String, player_name: String },
    LeaveTable {},
    #[serde(rename_all = "camelCase")]
    SpectateTable {
        table_id: String,
        player_name: Option<String>,
    },
    LeaveSpectate {},
    SubmitPass { cards: Vec<Card> },
    #[serde(rename_all = "camelCase")]
    SelectContract {
        contract_type: ContractTypeField,
        contract_name: Option<PenaltyKind>,
        trump_suit: Option<Suit>,
    },
    SubmitBid { bid: SpadesBid },
    PlayCard { card: Card },
    Rematch { vote: bool },
    ChatMessage { text: String },
    #[serde(rename_all = "camelCase")]
    Typing { is_typing: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContractTypeField {
    Penalty,
    Trump,
}

/// Assemble a [`Contract`] from the loose `selectContract` payload.
pub fn contract_from_fields(
    contract_type: ContractTypeField,
    contract_name: Option<PenaltyKind>,
    trump_suit: Option<Suit>,
) -> Result<Contract, GameError> {
    match contract_type {
        ContractTypeField::Penalty => contract_name
            .map(|name| Contract::Penalty { name })
            .ok_or(GameError::InvalidContract),
        ContractTypeField::Trump => trump_suit
            .map(|suit| Contract::Trump { suit })
            .ok_or(GameError::InvalidContract),
    }
}

/// Server → client events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    TablesList {
        tables: Vec<TableSummary>,
    },
    #[serde(rename_all = "camelCase")]
    TableJoined {
        table_id: String,
        seat: Seat,
        game_type: GameType,
        #[serde(skip_serializing_if = "Option::is_none")]
        ending_score: Option<i32>,
        players: Vec<PlayerPublic>,
    },
    #[serde(rename_all = "camelCase")]
    SpectateJoined {
        table_id: String,
        game_type: GameType,
        players: Vec<PlayerPublic>,
        #[serde(skip_serializing_if = "Option::is_none")]
        game_state: Option<GameSnapshot>,
    },
    #[serde(rename_all = "camelCase")]
    SpectatorUpdate {
        #[serde(skip_serializing_if = "Option::is_none")]
        game_state: Option<GameSnapshot>,
        #[serde(skip_serializing_if = "Option::is_none")]
        spectator_count: Option<usize>,
    },
    UpdatePlayers {
        players: Vec<PlayerPublic>,
    },
    #[serde(rename_all = "camelCase")]
    UpdateGame {
        game_state: GameSnapshot,
    },
    #[serde(rename_all = "camelCase")]
    StartGame {
        hand: Vec<Card>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pass_direction: Option<PassDirection>,
        phase: &'static str,
        current_player: Seat,
        game_type: GameType,
    },
    #[serde(rename_all = "camelCase")]
    ContractSelectionStart {
        selector: Seat,
        available_contracts: Vec<Contract>,
        game_number: u8,
        party_number: u32,
        hand: Vec<Card>,
    },
    #[serde(rename_all = "camelCase")]
    ContractSelected {
        contract: Contract,
        game_number: u8,
    },
    #[serde(rename_all = "camelCase")]
    BiddingStart {
        hand: Vec<Card>,
        current_bidder: Seat,
        round_number: u32,
    },
    #[serde(rename_all = "camelCase")]
    BidSubmitted {
        seat: Seat,
        bid: SpadesBid,
        bids: [Option<SpadesBid>; 4],
        #[serde(skip_serializing_if = "Option::is_none")]
        next_bidder: Option<Seat>,
    },
    #[serde(rename_all = "camelCase")]
    CardPlayed {
        seat: Seat,
        card: Card,
        current_trick: Vec<TrickPlay>,
        #[serde(skip_serializing_if = "Option::is_none")]
        trick_complete: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        winner: Option<Seat>,
    },
    #[serde(rename_all = "camelCase")]
    TrickEnd {
        winner: Seat,
        points: i32,
        last_trick: CompletedTrick,
    },
    #[serde(rename_all = "camelCase")]
    TurnStart {
        player: Seat,
        timeout_at: i64,
    },
    #[serde(rename_all = "camelCase")]
    PassTimerStart {
        timeout_at: i64,
    },
    #[serde(rename_all = "camelCase")]
    SelectTimerStart {
        timeout_at: i64,
        selector_seat: Seat,
    },
    #[serde(rename_all = "camelCase")]
    BidTimerStart {
        player: Seat,
        timeout_at: i64,
    },
    TimerWarning {},
    AutoPlay {
        card: Card,
    },
    AutoPassSubmitted {
        cards: Vec<Card>,
    },
    #[serde(rename_all = "camelCase")]
    RoundEnd {
        round_scores: Vec<i32>,
        cumulative_scores: Vec<i32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        moon_shooter: Option<Seat>,
        #[serde(skip_serializing_if = "Option::is_none")]
        point_cards_taken: Option<[Vec<Card>; 4]>,
        #[serde(skip_serializing_if = "Option::is_none")]
        game_number: Option<u8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        bags: Option<[u32; 2]>,
        game_over: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        game_winner: Option<Vec<Seat>>,
    },
    #[serde(rename_all = "camelCase")]
    GameEnd {
        winner: Vec<Seat>,
        final_scores: Vec<i32>,
    },
    RematchStatus {
        votes: [Option<bool>; 4],
    },
    Chat {
        from: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        seat: Option<Seat>,
        text: String,
        timestamp: i64,
    },
    TypingUpdate {
        players: Vec<String>,
    },
    Error {
        message: String,
    },
}

impl ServerMsg {
    pub fn error(err: &GameError) -> Self {
        ServerMsg::Error {
            message: err.to_string(),
        }
    }
}
