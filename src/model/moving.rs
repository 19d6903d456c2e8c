//! # Making and unmaking moves.
//!
//! A [`MoveDraft`] is what a player asks for: from, to, maybe a
//! promotion, and the special tag move generation attached. Turning a
//! draft into a [`Move`] computes every board change and state change
//! up front, without touching the board. Applying the move forward or
//! backward is then purely mechanical, which is what makes viewing
//! history, premoves, and search share one code path.

use log::trace;

use crate::{
    error::EngineError,
    model::{
        Coords, LegalMove, Piece, PieceType, RawType,
        pieces::{OrganizedPieces, SlotAllocator},
        position::Position,
        specials::{self, SpecialMove},
        state::{BoardState, MoveState, StateChange, Transition, apply_move_state, create_state},
    },
};

/// A requested move, before its consequences are worked out.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoveDraft {
    pub start: Coords,
    pub end: Coords,
    pub promotion: Option<RawType>,
    pub special: Option<SpecialMove>,
}

impl MoveDraft {
    pub fn new(start: Coords, end: Coords) -> Self {
        Self {
            start,
            end,
            promotion: None,
            special: None,
        }
    }

    pub fn promoting(mut self, raw: RawType) -> Self {
        self.promotion = Some(raw);
        self
    }
}

/// One reversible edit of the board.
///
/// Each records the full piece, index included, so that reversing it
/// puts the very same piece back into the very same slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardChange {
    ADD { piece: Piece },
    DELETE { piece: Piece },
    MOVE {
        piece: Piece,
        end: Coords,
        path: Option<Vec<Coords>>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveFlags {
    pub capture: bool,
    pub check: bool,
    pub mate: bool,
}

/// A fully worked-out move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub draft: MoveDraft,
    pub mover: PieceType,
    pub changes: Vec<BoardChange>,
    pub state: MoveState,
    pub flags: MoveFlags,
}

impl Move {
    pub fn new(draft: MoveDraft, mover: PieceType) -> Self {
        Self {
            draft,
            mover,
            changes: vec![],
            state: MoveState::default(),
            flags: MoveFlags::default(),
        }
    }

    /// Captures, promotions, and other additions or removals.
    pub fn alters_material(&self) -> bool {
        self.changes
            .iter()
            .any(|c| matches!(c, BoardChange::ADD { .. } | BoardChange::DELETE { .. }))
    }

    pub fn loses_special_right(&self) -> bool {
        self.state.global.iter().any(|c| {
            matches!(c, StateChange::SPECIAL_RIGHTS { change, .. } if change.current && !change.future)
        })
    }
}

/// Remove whatever stands on `coords` as part of `mv`.
pub(crate) fn capture_at(
    pos: &Position,
    mv: &mut Move,
    coords: Coords,
    alloc: &mut SlotAllocator,
    skip_state: bool,
) {
    let Some(victim) = pos.pieces.piece_at(coords) else {
        return;
    };
    mv.changes.push(BoardChange::DELETE { piece: victim });
    alloc.release(victim.index);
    mv.flags.capture = true;
    if !skip_state {
        lose_special_right(pos, mv, coords);
    }
}

pub(crate) fn relocate(mv: &mut Move, piece: Piece, end: Coords, path: Option<Vec<Coords>>) {
    mv.changes.push(BoardChange::MOVE { piece, end, path });
}

pub(crate) fn lose_special_right(pos: &Position, mv: &mut Move, coords: Coords) {
    let held = pos.state.global.special_rights.contains(&coords);
    let recorded = mv.state.global.iter().any(
        |c| matches!(c, StateChange::SPECIAL_RIGHTS { coords: at, .. } if *at == coords),
    );
    if held && !recorded {
        create_state(
            mv,
            StateChange::SPECIAL_RIGHTS {
                coords,
                change: Transition::new(true, false),
            },
            None,
        );
    }
}

/// Work out every consequence of `draft` on the current board.
///
/// With `skip_state` only board changes are produced; premoves and
/// legality simulation have no business touching the game's state.
pub fn generate_move(
    pos: &Position,
    draft: &MoveDraft,
    skip_state: bool,
) -> Result<Move, EngineError> {
    let piece = pos
        .pieces
        .piece_at(draft.start)
        .ok_or(EngineError::NoPieceAt(draft.start))?;
    let mut mv = Move::new(draft.clone(), piece.kind);
    let mut alloc = pos.pieces.store().allocator();

    if !skip_state {
        if let Some(ep) = pos.state.global.en_passant {
            create_state(
                &mut mv,
                StateChange::EN_PASSANT(Transition::new(Some(ep), None)),
                None,
            );
        }
        lose_special_right(pos, &mut mv, draft.start);
    }

    if !specials::execute(pos, &mut mv, &piece, &mut alloc, skip_state) {
        capture_at(pos, &mut mv, draft.end, &mut alloc, skip_state);
        relocate(&mut mv, piece, draft.end, None);
    }

    if let Some(raw) = draft.promotion {
        let moved = Piece {
            coords: draft.end,
            ..piece
        };
        mv.changes.push(BoardChange::DELETE { piece: moved });
        alloc.release(moved.index);
        mv.changes.push(BoardChange::ADD {
            piece: Piece {
                kind: PieceType::new(raw, piece.color()),
                coords: draft.end,
                index: alloc.take(),
            },
        });
    }

    if !skip_state && pos.rules.move_rule.is_some() {
        if let Some(count) = pos.state.global.move_rule_state {
            let reset = mv.flags.capture || piece.raw() == RawType::PAWN;
            let future = if reset { 0 } else { count + 1 };
            create_state(
                &mut mv,
                StateChange::MOVE_RULE(Transition::new(Some(count), Some(future))),
                None,
            );
        }
    }

    trace!("generated {:?} with {} changes", mv.draft, mv.changes.len());
    Ok(mv)
}

fn apply_change(pieces: &mut OrganizedPieces, change: &BoardChange, forward: bool) {
    let res = match (change, forward) {
        (BoardChange::ADD { piece }, true) | (BoardChange::DELETE { piece }, false) => {
            pieces.add_at(piece.index, piece.coords, piece.kind)
        }
        (BoardChange::ADD { piece }, false) | (BoardChange::DELETE { piece }, true) => {
            pieces.remove(piece.index).map(|_| ())
        }
        (BoardChange::MOVE { piece, end, .. }, true) => pieces.move_to(piece.index, *end).map(|_| ()),
        (BoardChange::MOVE { piece, .. }, false) => {
            pieces.move_to(piece.index, piece.coords).map(|_| ())
        }
    };
    if let Err(err) = res {
        panic!("board out of sync with move journal: {err} while replaying {change:?}");
    }
}

/// Replay board changes; backwards in reverse order.
pub fn apply_changes(pieces: &mut OrganizedPieces, changes: &[BoardChange], forward: bool) {
    if forward {
        for change in changes {
            apply_change(pieces, change, true);
        }
    } else {
        for change in changes.iter().rev() {
            apply_change(pieces, change, false);
        }
    }
}

/// Replay a whole move: its board changes, its local state, and its
/// global state too if `global`.
pub fn apply_move(
    pieces: &mut OrganizedPieces,
    state: &mut BoardState,
    mv: &Move,
    forward: bool,
    global: bool,
) {
    if forward {
        apply_changes(pieces, &mv.changes, true);
        apply_move_state(state, mv, true, global);
    } else {
        apply_move_state(state, mv, false, global);
        apply_changes(pieces, &mv.changes, false);
    }
}

/// Play a legal move at the front of the game, recording it.
///
/// Does not look for the end of the game; see
/// [`Position::make_move`] for that.
pub fn make_legal_move(pos: &mut Position, mv: LegalMove) -> Result<(), EngineError> {
    if !pos.is_at_front() {
        return Err(EngineError::NotAtFront);
    }
    let mv = generate_move(pos, &mv.0, false)?;
    apply_move(&mut pos.pieces, &mut pos.state, &mv, true, true);
    pos.moves.push(mv);
    pos.state.local.move_index += 1;
    crate::model::check::update_check_state(pos);
    Ok(())
}

/// Take back the last move of the game.
pub fn unmake_legal_move(pos: &mut Position) -> Option<Move> {
    if !pos.is_at_front() {
        return None;
    }
    let mv = pos.moves.pop()?;
    apply_move(&mut pos.pieces, &mut pos.state, &mv, false, true);
    pos.state.local.move_index -= 1;
    Some(mv)
}
