//! # Repetition.
//!
//! Walking back from the latest move, every undone move adds what it
//! would restore to a surplus set and what it would take away to a
//! deficit set, the two cancelling each other out. Whenever both are
//! empty at a whole round of turns back, the board was identical.
//!
//! The walk stops at the first irreversible move: a capture, a
//! promotion, a lost special right, or any pawn move. Nothing before
//! those can repeat, so the walk is as long as the current
//! reversible stretch and not the whole game.

use std::collections::HashSet;

use crate::model::{
    Coords, PieceType, RawType,
    moving::{BoardChange, Move},
    position::Position,
    state::{EnPassant, StateChange},
};

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Flux {
    PIECE(Coords, PieceType),
    EN_PASSANT(EnPassant),
}

#[derive(Debug, Default)]
struct Ledger {
    surplus: HashSet<Flux>,
    deficit: HashSet<Flux>,
}

impl Ledger {
    fn gain(&mut self, f: Flux) {
        if !self.deficit.remove(&f) {
            self.surplus.insert(f);
        }
    }

    fn lose(&mut self, f: Flux) {
        if !self.surplus.remove(&f) {
            self.deficit.insert(f);
        }
    }

    fn balanced(&self) -> bool {
        self.surplus.is_empty() && self.deficit.is_empty()
    }

    /// Account for undoing `mv`.
    fn undo(&mut self, mv: &Move) {
        for change in &mv.changes {
            if let BoardChange::MOVE { piece, end, .. } = change {
                self.gain(Flux::PIECE(piece.coords, piece.kind));
                self.lose(Flux::PIECE(*end, piece.kind));
            }
        }
        for change in &mv.state.global {
            if let StateChange::EN_PASSANT(t) = change {
                if let Some(ep) = t.current {
                    self.gain(Flux::EN_PASSANT(ep));
                }
                if let Some(ep) = t.future {
                    self.lose(Flux::EN_PASSANT(ep));
                }
            }
        }
    }
}

fn is_one_way(mv: &Move) -> bool {
    mv.alters_material() || mv.loses_special_right() || mv.mover.raw == RawType::PAWN
}

/// Whether the latest position occurred twice before.
pub fn detect_repetition(pos: &Position) -> bool {
    let turns = pos.rules.turn_order.len();
    let applied = &pos.moves[..pos.state.local.move_index];
    let mut ledger = Ledger::default();
    let mut matches = 0;
    let mut last_match = 0;

    for (k, mv) in applied.iter().rev().enumerate().map(|(i, m)| (i + 1, m)) {
        if is_one_way(mv) {
            break;
        }
        ledger.undo(mv);
        if ledger.balanced() && k % turns == 0 && k - last_match >= turns {
            matches += 1;
            last_match = k;
            if matches == 2 {
                return true;
            }
        }
    }
    false
}
