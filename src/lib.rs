//! Position and move engine for chess variants on an unbounded board.
//!
//! ```
//! use unbounded::model::{Coords, moving::MoveDraft, position::Position};
//!
//! let mut pos = Position::builtin("classical").unwrap();
//! pos.play(MoveDraft::new(Coords::new(5, 2), Coords::new(5, 4))).unwrap();
//! assert!(pos.piece_at(Coords::new(5, 4)).is_some());
//! ```

pub mod error;

/// Modeling the game on an unbounded board.
pub mod model;

/// Reading and writing positions and moves.
pub mod notation;

#[cfg(test)]
mod tests;
