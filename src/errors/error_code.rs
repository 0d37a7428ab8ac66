//! Error codes for the cardroom wire protocol.
//!
//! Every [`GameError`] maps 1:1 to a SCREAMING_SNAKE_CASE code used in
//! structured logs. Add new codes here; never log ad-hoc strings as codes.

use core::fmt;

use crate::errors::GameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    PhaseError,
    NotYourTurn,
    IllegalCard,
    BadPass,
    InvalidBid,
    InvalidContract,
    QuotaExhausted,
    BlindNilNotAllowed,
    TableNotFound,
    TableFull,
    GameInProgress,
    NameRequired,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::PhaseError => "PHASE_ERROR",
            ErrorCode::NotYourTurn => "NOT_YOUR_TURN",
            ErrorCode::IllegalCard => "ILLEGAL_CARD",
            ErrorCode::BadPass => "BAD_PASS",
            ErrorCode::InvalidBid => "INVALID_BID",
            ErrorCode::InvalidContract => "INVALID_CONTRACT",
            ErrorCode::QuotaExhausted => "QUOTA_EXHAUSTED",
            ErrorCode::BlindNilNotAllowed => "BLIND_NIL_NOT_ALLOWED",
            ErrorCode::TableNotFound => "TABLE_NOT_FOUND",
            ErrorCode::TableFull => "TABLE_FULL",
            ErrorCode::GameInProgress => "GAME_IN_PROGRESS",
            ErrorCode::NameRequired => "NAME_REQUIRED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&GameError> for ErrorCode {
    fn from(err: &GameError) -> Self {
        match err {
            GameError::PhaseError => ErrorCode::PhaseError,
            GameError::NotYourTurn => ErrorCode::NotYourTurn,
            GameError::IllegalCard => ErrorCode::IllegalCard,
            GameError::BadPass => ErrorCode::BadPass,
            GameError::InvalidBid => ErrorCode::InvalidBid,
            GameError::InvalidContract => ErrorCode::InvalidContract,
            GameError::QuotaExhausted => ErrorCode::QuotaExhausted,
            GameError::BlindNilNotAllowed => ErrorCode::BlindNilNotAllowed,
            GameError::TableNotFound => ErrorCode::TableNotFound,
            GameError::TableFull => ErrorCode::TableFull,
            GameError::GameInProgress => ErrorCode::GameInProgress,
            GameError::NameRequired => ErrorCode::NameRequired,
            GameError::Internal(_) => ErrorCode::InternalError,
        }
    }
}
