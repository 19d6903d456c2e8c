//! Error types.
//!
//! Recoverable failures only. A board whose indexes disagree with the
//! journal is not recoverable and panics at the point of detection.

use thiserror::Error;

use crate::model::{Coords, PieceIndex, PlayerColor, moving::MoveDraft};

/// Failures of the piece arena.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("square {0} is already occupied")]
    OccupiedSquare(Coords),
    #[error("no piece with index {0}")]
    NoSuchPiece(PieceIndex),
    #[error("piece slot {0} is still in use")]
    SlotInUse(PieceIndex),
}

/// Failures while loading a variant.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("variant file is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("malformed position string: {0}")]
    PositionString(String),
    #[error("sliding direction {0},{1} is not primitive or too long")]
    NonPrimitiveDirection(i64, i64),
    #[error("turn order must not be empty")]
    EmptyTurnOrder,
    #[error("neutral cannot take turns")]
    NeutralTurn,
    #[error("square {0} is too far from the origin")]
    OutOfRange(Coords),
    #[error("special right at {0} names an empty square")]
    DanglingSpecialRight(Coords),
    #[error("no built-in variant named {0:?}")]
    UnknownVariant(String),
    #[error("unknown piece type {0:?}")]
    UnknownPieceType(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures of the move-making interface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("no piece at {0}")]
    NoPieceAt(Coords),
    #[error("it is not {0}'s turn")]
    NotYourTurn(PlayerColor),
    #[error("illegal move {0:?}")]
    IllegalMove(MoveDraft),
    #[error("moves can only be made at the latest ply")]
    NotAtFront,
    #[error("the game is already over")]
    GameOver,
    #[error("move generation is unbounded for the piece at {0}")]
    UnboundedMoves(Coords),
    #[error("premove rejected: {0:?}")]
    PremoveRejected(MoveDraft),
}

/// A string that does not parse as the notation asked for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {kind} {text:?}")]
pub struct NotationError {
    pub kind: &'static str,
    pub text: String,
}
