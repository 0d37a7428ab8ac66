//! Domain-level error type shared by the engines and the table controller.
//!
//! This error type is transport-agnostic. The websocket layer converts it
//! into a wire `error { message }` event; nothing in here knows about HTTP
//! or sockets.

use thiserror::Error;

/// Central game error type.
///
/// Recoverable client-input errors (everything except `Internal`) never
/// mutate engine state; the table stays in the same action-eligible state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// Operation attempted in the wrong phase.
    #[error("action not valid in the current phase")]
    PhaseError,
    /// Seat is not the current actor (or not among pending passers).
    #[error("not your turn")]
    NotYourTurn,
    /// Card not in hand or not in the legal set.
    #[error("that card cannot be played")]
    IllegalCard,
    /// Pass with wrong count, duplicates, or cards not in hand.
    #[error("pass must be three distinct cards from your hand")]
    BadPass,
    /// Bid outside 0..=13 or submitted twice.
    #[error("invalid bid")]
    InvalidBid,
    /// Contract not selectable (unknown, or malformed payload).
    #[error("invalid contract selection")]
    InvalidContract,
    /// Selector or global contract quota exhausted.
    #[error("that contract is no longer available")]
    QuotaExhausted,
    /// Blind nil bid without eligibility.
    #[error("blind nil is not allowed right now")]
    BlindNilNotAllowed,
    /// No table with that id.
    #[error("table not found")]
    TableNotFound,
    /// All four seats occupied and no takeover slot.
    #[error("table is full")]
    TableFull,
    /// Table already has a running engine and no takeover slot.
    #[error("game already in progress")]
    GameInProgress,
    /// Join/create/spectate without a usable name.
    #[error("a player name is required")]
    NameRequired,
    /// Invariant violation; logged server-side.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GameError {
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }

    /// Internal errors are logged and keep the table intact; everything else
    /// is a recoverable client-input error answered with a single reply.
    pub fn is_internal(&self) -> bool {
        matches!(self, GameError::Internal(_))
    }
}
