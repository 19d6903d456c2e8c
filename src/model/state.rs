//! # The state journal.
//!
//! Everything about a position that is not where the pieces stand is
//! changed only through [`StateChange`]s recorded on a move. Each
//! change carries both its `current` and `future` value, so a move can
//! be replayed in either direction without recomputing anything.
//!
//! Changes come in two kinds:
//!
//! - local: check and attacker tracking, meaningful for whatever ply is
//!   being viewed and always replayed
//! - global: special rights, en passant, and the move-rule counter,
//!   which describe the game's front and are only replayed when the
//!   game really advances or rewinds

use indexmap::IndexSet;
use serde::Serialize;
use strum::EnumIs;

use crate::model::{Coords, attacking::Attacker, moving::Move};

/// A pawn that just made a multi-square push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EnPassant {
    /// The square a capturing pawn moves to.
    pub square: Coords,
    /// The pawn that gets captured.
    pub pawn: Coords,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<T> {
    pub current: T,
    pub future: T,
}

impl<T: Clone> Transition<T> {
    pub fn new(current: T, future: T) -> Self {
        Self { current, future }
    }

    #[inline]
    pub fn value(&self, forward: bool) -> T {
        if forward {
            self.future.clone()
        } else {
            self.current.clone()
        }
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, PartialEq, Eq, EnumIs)]
pub enum StateChange {
    SPECIAL_RIGHTS {
        coords: Coords,
        change: Transition<bool>,
    },
    CHECK(Transition<Vec<Coords>>),
    ATTACKERS(Transition<Vec<Attacker>>),
    EN_PASSANT(Transition<Option<EnPassant>>),
    MOVE_RULE(Transition<Option<u32>>),
}

impl StateChange {
    /// Local changes describe the viewed ply rather than the game.
    #[inline]
    pub fn is_local(&self) -> bool {
        matches!(self, StateChange::CHECK(_) | StateChange::ATTACKERS(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalState {
    pub special_rights: IndexSet<Coords>,
    pub en_passant: Option<EnPassant>,
    pub move_rule_state: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalState {
    /// Royals of the side to move under attack.
    pub in_check: Vec<Coords>,
    /// Up to two of the pieces giving that check.
    pub attackers: Vec<Attacker>,
    /// Plies applied to the board; lower than the move count while
    /// viewing history.
    pub move_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardState {
    pub global: GlobalState,
    pub local: LocalState,
}

/// State changes of one move, split by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveState {
    pub local: Vec<StateChange>,
    pub global: Vec<StateChange>,
}

impl MoveState {
    pub fn iter(&self) -> impl Iterator<Item = &StateChange> {
        self.local.iter().chain(self.global.iter())
    }
}

/// Record a change on `mv`, optionally applying it at once.
///
/// A move has at most one en-passant change: recording a second one
/// keeps the first's `current` and takes the new `future`.
pub fn create_state(mv: &mut Move, change: StateChange, apply_now: Option<&mut BoardState>) {
    if let Some(state) = apply_now {
        apply_state(state, &change, true);
    }

    if let StateChange::EN_PASSANT(new) = &change {
        let existing = mv.state.global.iter_mut().find_map(|c| match c {
            StateChange::EN_PASSANT(t) => Some(t),
            _ => None,
        });
        if let Some(t) = existing {
            t.future = new.future;
            return;
        }
    }

    if change.is_local() {
        mv.state.local.push(change);
    } else {
        mv.state.global.push(change);
    }
}

pub fn apply_state(state: &mut BoardState, change: &StateChange, forward: bool) {
    match change {
        StateChange::SPECIAL_RIGHTS { coords, change } => {
            if change.value(forward) {
                state.global.special_rights.insert(*coords);
            } else {
                state.global.special_rights.shift_remove(coords);
            }
        }
        StateChange::CHECK(t) => state.local.in_check = t.value(forward),
        StateChange::ATTACKERS(t) => state.local.attackers = t.value(forward),
        StateChange::EN_PASSANT(t) => state.global.en_passant = t.value(forward),
        StateChange::MOVE_RULE(t) => state.global.move_rule_state = t.value(forward),
    }
}

/// Replay a move's journal. Local changes always, global ones only if
/// `global`. Backwards replays in reverse order.
pub fn apply_move_state(state: &mut BoardState, mv: &Move, forward: bool, global: bool) {
    let changes = |c: &&StateChange| global || c.is_local();
    if forward {
        for change in mv.state.iter().filter(changes) {
            apply_state(state, change, true);
        }
    } else {
        let all: Vec<_> = mv.state.iter().filter(changes).collect();
        for change in all.into_iter().rev() {
            apply_state(state, change, false);
        }
    }
}

#[cfg(test)]
fn blank_move() -> Move {
    use crate::model::{PieceType, PlayerColor, RawType, moving::MoveDraft};
    Move::new(
        MoveDraft::new(Coords::new(1, 2), Coords::new(1, 4)),
        PieceType::new(RawType::PAWN, PlayerColor::WHITE),
    )
}

#[test]
fn second_en_passant_change_overwrites_future() {
    let mut mv = blank_move();
    let old = EnPassant {
        square: Coords::new(3, 6),
        pawn: Coords::new(3, 5),
    };
    let new = EnPassant {
        square: Coords::new(1, 3),
        pawn: Coords::new(1, 4),
    };
    create_state(&mut mv, StateChange::EN_PASSANT(Transition::new(Some(old), None)), None);
    create_state(&mut mv, StateChange::EN_PASSANT(Transition::new(Some(old), Some(new))), None);
    assert_eq!(
        mv.state.global,
        vec![StateChange::EN_PASSANT(Transition::new(Some(old), Some(new)))]
    );
}

#[test]
fn global_changes_only_replay_when_asked() {
    let mut mv = blank_move();
    let mut state = BoardState::default();
    state.global.special_rights.insert(Coords::new(1, 2));
    let before = state.clone();

    create_state(
        &mut mv,
        StateChange::SPECIAL_RIGHTS {
            coords: Coords::new(1, 2),
            change: Transition::new(true, false),
        },
        None,
    );
    create_state(
        &mut mv,
        StateChange::CHECK(Transition::new(vec![], vec![Coords::new(5, 8)])),
        None,
    );

    apply_move_state(&mut state, &mv, true, false);
    assert!(state.global.special_rights.contains(&Coords::new(1, 2)));
    assert_eq!(state.local.in_check, vec![Coords::new(5, 8)]);

    apply_move_state(&mut state, &mv, false, false);
    assert_eq!(state, before);

    apply_move_state(&mut state, &mv, true, true);
    assert!(state.global.special_rights.is_empty());
    apply_move_state(&mut state, &mv, false, true);
    assert_eq!(state, before);
}
