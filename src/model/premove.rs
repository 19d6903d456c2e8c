//! # Premoves.
//!
//! Moves queued by a player while waiting on their opponent. They are
//! applied to the board at once, so it shows them, but they carry no
//! state changes and never enter the move history. Before the
//! opponent's move lands they are rewound in reverse order; afterwards
//! each one is checked and generated again from scratch, and the first
//! one that no longer fits is dropped along with everything after it.

use log::debug;

use crate::{
    error::EngineError,
    model::{
        PlayerColor,
        movegen::MoveMode,
        moving::{Move, MoveDraft},
        position::Position,
    },
};

#[derive(Debug, Clone)]
struct Premove {
    draft: MoveDraft,
    mv: Move,
}

/// The premove queue of one player, applied to the board while it is
/// not empty.
#[derive(Debug, Clone)]
pub struct Premoves {
    color: PlayerColor,
    queue: Vec<Premove>,
}

impl Premoves {
    pub fn new(color: PlayerColor) -> Self {
        Self {
            color,
            queue: vec![],
        }
    }

    #[inline]
    pub fn color(&self) -> PlayerColor {
        self.color
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn drafts(&self) -> impl Iterator<Item = &MoveDraft> {
        self.queue.iter().map(|p| &p.draft)
    }

    /// Check `draft` against the board as the premoves so far left it,
    /// and work out its board changes.
    fn prepare(&self, pos: &Position, draft: &MoveDraft) -> Result<Premove, EngineError> {
        if pos.conclusion().is_some() {
            return Err(EngineError::GameOver);
        }
        if !pos.is_at_front() {
            return Err(EngineError::NotAtFront);
        }
        let piece = pos
            .piece_at(draft.start)
            .ok_or(EngineError::NoPieceAt(draft.start))?;
        if piece.color() != self.color {
            return Err(EngineError::NotYourTurn(piece.color()));
        }

        let rejected = || EngineError::PremoveRejected(draft.clone());
        let moves = pos
            .pseudo_legal_moves_at(draft.start, MoveMode::PREMOVE)
            .ok_or_else(rejected)?;
        let target = moves.find(draft.end).ok_or_else(rejected)?;
        match (target.promotes, draft.promotion) {
            (true, Some(raw)) if pos.rules().promotions_of(self.color).contains(&raw) => {}
            (false, None) => {}
            _ => return Err(rejected()),
        }

        let draft = MoveDraft {
            special: target.special,
            ..draft.clone()
        };
        let mv = pos.generate_move(&draft, true)?;
        Ok(Premove { draft, mv })
    }

    /// Queue a premove and show it on the board.
    pub fn push(&mut self, pos: &mut Position, draft: MoveDraft) -> Result<(), EngineError> {
        let premove = self.prepare(pos, &draft)?;
        pos.apply_edit(&premove.mv, true, false);
        debug!("premove {:?} queued, {} pending", premove.draft, self.queue.len() + 1);
        self.queue.push(premove);
        Ok(())
    }

    /// Take every premove off the board, last first. The queue stays.
    pub fn rewind(&self, pos: &mut Position) {
        for premove in self.queue.iter().rev() {
            pos.apply_edit(&premove.mv, false, false);
        }
        if !self.queue.is_empty() {
            debug!("rewound {} premoves", self.queue.len());
        }
    }

    /// Put the queue back on a board it was rewound from, regenerating
    /// every premove. Returns how many survived.
    pub fn reapply(&mut self, pos: &mut Position) -> usize {
        let queued = std::mem::take(&mut self.queue);
        for premove in queued {
            match self.prepare(pos, &premove.draft) {
                Ok(fresh) => {
                    pos.apply_edit(&fresh.mv, true, false);
                    self.queue.push(fresh);
                }
                Err(err) => {
                    debug!("premoves discarded from {:?}: {err}", premove.draft);
                    break;
                }
            }
        }
        self.queue.len()
    }

    /// Rewind the premoves, make the opponent's move for real, then
    /// reapply whatever still fits.
    pub fn on_authoritative_move(
        &mut self,
        pos: &mut Position,
        draft: MoveDraft,
    ) -> Result<Move, EngineError> {
        self.rewind(pos);
        let res = pos.play(draft).cloned();
        self.reapply(pos);
        res
    }

    /// Play the first premove for real once it is this player's turn.
    ///
    /// Should it turn out illegal, the whole queue is cancelled.
    pub fn execute_first(&mut self, pos: &mut Position) -> Result<Option<Move>, EngineError> {
        if self.queue.is_empty() || pos.side_to_move() != self.color {
            return Ok(None);
        }
        self.rewind(pos);
        let first = self.queue.remove(0);

        let made = match pos.legalize(first.draft.clone()) {
            Ok(legal) => pos.make_move(legal).cloned(),
            Err(_) => Err(EngineError::PremoveRejected(first.draft)),
        };
        match made {
            Ok(mv) => {
                self.reapply(pos);
                Ok(Some(mv))
            }
            Err(err) => {
                debug!("first premove failed, dropping {} more", self.queue.len());
                self.queue.clear();
                Err(err)
            }
        }
    }

    /// Rewind, then forget every premove.
    pub fn cancel(&mut self, pos: &mut Position) {
        self.rewind(pos);
        self.queue.clear();
    }
}

#[cfg(test)]
use crate::model::{Coords, RawType};

#[cfg(test)]
fn draft(a: (i128, i128), b: (i128, i128)) -> MoveDraft {
    MoveDraft::new(Coords::new(a.0, a.1), Coords::new(b.0, b.1))
}

#[test]
fn premoves_survive_an_unrelated_reply() {
    let mut pos = Position::builtin("classical").unwrap();
    pos.play(draft((5, 2), (5, 4))).unwrap();

    let mut pre = Premoves::new(PlayerColor::WHITE);
    pre.push(&mut pos, draft((4, 2), (4, 4))).unwrap();
    assert_eq!(pos.piece_at(Coords::new(4, 4)).map(|p| p.raw()), Some(RawType::PAWN));
    assert!(pos.piece_at(Coords::new(4, 2)).is_none());
    assert_eq!(pos.moves().len(), 1);

    pre.on_authoritative_move(&mut pos, draft((5, 7), (5, 5)))
        .unwrap();
    assert_eq!(pre.len(), 1);
    assert_eq!(pos.moves().len(), 2);
    assert!(pos.piece_at(Coords::new(4, 4)).is_some());

    let made = pre.execute_first(&mut pos).unwrap().unwrap();
    assert_eq!(made.draft.end, Coords::new(4, 4));
    assert!(pre.is_empty());
    assert_eq!(pos.moves().len(), 3);
    assert_eq!(pos.side_to_move(), PlayerColor::BLACK);
}

#[test]
fn captured_premover_drops_the_queue() {
    let mut pos = Position::builtin("classical").unwrap();
    pos.play(draft((5, 2), (5, 4))).unwrap();
    pos.play(draft((4, 7), (4, 5))).unwrap();
    pos.play(draft((2, 1), (3, 3))).unwrap();

    let mut pre = Premoves::new(PlayerColor::WHITE);
    pre.push(&mut pos, draft((5, 4), (5, 5))).unwrap();
    pre.push(&mut pos, draft((5, 5), (5, 6))).unwrap();
    assert_eq!(pre.len(), 2);

    pre.on_authoritative_move(&mut pos, draft((4, 5), (5, 4)))
        .unwrap();
    assert!(pre.is_empty());
    assert_eq!(pos.piece_at(Coords::new(5, 4)).map(|p| p.color()), Some(PlayerColor::BLACK));
    assert!(pos.piece_at(Coords::new(5, 6)).is_none());
}

#[test]
fn premoves_leave_no_trace_when_cancelled() {
    let mut pos = Position::builtin("classical").unwrap();
    pos.play(draft((5, 2), (5, 4))).unwrap();
    let before = pos.snapshot();

    let mut pre = Premoves::new(PlayerColor::WHITE);
    pre.push(&mut pos, draft((6, 1), (3, 4))).unwrap();
    pre.push(&mut pos, draft((3, 4), (6, 7))).unwrap();
    assert_eq!(pos.piece_at(Coords::new(6, 7)).map(|p| p.raw()), Some(RawType::BISHOP));

    pre.cancel(&mut pos);
    assert!(pre.is_empty());
    assert!(pos.snapshot() == before);
    assert!(pos.pieces().is_consistent());
}

#[test]
fn pawn_premoves_respect_their_own_pieces() {
    let mut pos = Position::builtin("classical").unwrap();
    pos.play(draft((5, 2), (5, 4))).unwrap();

    let mut pre = Premoves::new(PlayerColor::WHITE);
    pre.push(&mut pos, draft((2, 1), (3, 3))).unwrap();
    assert!(matches!(
        pre.push(&mut pos, draft((2, 2), (3, 3))),
        Err(EngineError::PremoveRejected(_))
    ));
    assert_eq!(pre.len(), 1);
    assert_eq!(pos.piece_at(Coords::new(3, 3)).map(|p| p.raw()), Some(RawType::KNIGHT));
    assert_eq!(pos.piece_at(Coords::new(2, 2)).map(|p| p.raw()), Some(RawType::PAWN));

    // An empty diagonal may hold an enemy piece by the time it plays.
    pre.push(&mut pos, draft((5, 4), (4, 5))).unwrap();
    assert_eq!(pre.len(), 2);
    assert!(pos.pieces().is_consistent());
}

#[test]
fn premoves_need_a_reachable_square() {
    let mut pos = Position::builtin("classical").unwrap();
    pos.play(draft((5, 2), (5, 4))).unwrap();

    let mut pre = Premoves::new(PlayerColor::WHITE);
    assert!(matches!(
        pre.push(&mut pos, draft((4, 1), (4, 3))),
        Err(EngineError::PremoveRejected(_))
    ));
    assert!(matches!(
        pre.push(&mut pos, draft((4, 7), (4, 5))),
        Err(EngineError::NotYourTurn(PlayerColor::BLACK))
    ));
    assert!(pre.is_empty());
}
