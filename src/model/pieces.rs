//! # Piece storage.
//!
//! Pieces live in an arena of slots. A slot's index is the piece's
//! stable identity for as long as it stays on the board, and freed
//! slots are recycled last-in first-out, so that replaying the same
//! changes always hands out the same indices.
//!
//! [`OrganizedPieces`] couples the arena with the [`LineIndex`] and is
//! the only way the rest of the crate mutates the board.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};

use crate::{
    error::StoreError,
    model::{
        Coords, Direction, Piece, PieceIndex, PieceType, PlayerColor,
        lines::LineIndex,
    },
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PieceStore {
    slots: Vec<Option<Piece>>,
    free: Vec<PieceIndex>,
    occupancy: HashMap<Coords, PieceIndex>,
    by_type: IndexMap<PieceType, IndexSet<PieceIndex>>,
}

impl PieceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a new piece in the next free slot.
    pub fn add(&mut self, coords: Coords, kind: PieceType) -> Result<PieceIndex, StoreError> {
        if self.occupancy.contains_key(&coords) {
            return Err(StoreError::OccupiedSquare(coords));
        }
        let index = match self.free.pop() {
            Some(ix) => ix,
            None => {
                self.slots.push(None);
                (self.slots.len() - 1) as PieceIndex
            }
        };
        self.fill(index, coords, kind);
        Ok(index)
    }

    /// Place a piece in a specific slot, as when undoing its removal.
    pub fn add_at(
        &mut self,
        index: PieceIndex,
        coords: Coords,
        kind: PieceType,
    ) -> Result<(), StoreError> {
        if self.occupancy.contains_key(&coords) {
            return Err(StoreError::OccupiedSquare(coords));
        }
        let ix = index as usize;
        while self.slots.len() < ix {
            // Skipped slots go to the bottom of the free stack.
            self.free.insert(0, self.slots.len() as PieceIndex);
            self.slots.push(None);
        }
        if ix == self.slots.len() {
            self.slots.push(None);
        } else if self.slots[ix].is_some() {
            return Err(StoreError::SlotInUse(index));
        } else if let Some(at) = self.free.iter().rposition(|&f| f == index) {
            self.free.remove(at);
        }
        self.fill(index, coords, kind);
        Ok(())
    }

    fn fill(&mut self, index: PieceIndex, coords: Coords, kind: PieceType) {
        self.slots[index as usize] = Some(Piece {
            kind,
            coords,
            index,
        });
        self.occupancy.insert(coords, index);
        self.by_type.entry(kind).or_default().insert(index);
    }

    pub fn remove(&mut self, index: PieceIndex) -> Result<Piece, StoreError> {
        let piece = self
            .slots
            .get_mut(index as usize)
            .and_then(Option::take)
            .ok_or(StoreError::NoSuchPiece(index))?;
        self.free.push(index);
        self.occupancy.remove(&piece.coords);
        if let Some(set) = self.by_type.get_mut(&piece.kind) {
            set.shift_remove(&index);
            if set.is_empty() {
                self.by_type.shift_remove(&piece.kind);
            }
        }
        Ok(piece)
    }

    /// Relocate a piece, returning where it stood.
    pub fn move_to(&mut self, index: PieceIndex, to: Coords) -> Result<Coords, StoreError> {
        if let Some(&other) = self.occupancy.get(&to) {
            if other == index {
                return Ok(to);
            }
            return Err(StoreError::OccupiedSquare(to));
        }
        let piece = self
            .slots
            .get_mut(index as usize)
            .and_then(Option::as_mut)
            .ok_or(StoreError::NoSuchPiece(index))?;
        let from = piece.coords;
        piece.coords = to;
        self.occupancy.remove(&from);
        self.occupancy.insert(to, index);
        Ok(from)
    }

    #[inline]
    pub fn get(&self, index: PieceIndex) -> Option<Piece> {
        self.slots.get(index as usize).copied().flatten()
    }

    #[inline]
    pub fn piece_at(&self, coords: Coords) -> Option<Piece> {
        self.occupancy.get(&coords).and_then(|&ix| self.get(ix))
    }

    #[inline]
    pub fn is_occupied(&self, coords: Coords) -> bool {
        self.occupancy.contains_key(&coords)
    }

    /// Live pieces in slot order.
    pub fn iter(&self) -> impl Iterator<Item = Piece> + '_ {
        self.slots.iter().filter_map(|s| *s)
    }

    pub fn of_type(&self, kind: PieceType) -> impl Iterator<Item = Piece> + '_ {
        self.by_type
            .get(&kind)
            .into_iter()
            .flatten()
            .filter_map(|&ix| self.get(ix))
    }

    pub fn of_color(&self, color: PlayerColor) -> impl Iterator<Item = Piece> + '_ {
        self.iter().filter(move |p| p.color() == color)
    }

    pub fn count_of(&self, kind: PieceType) -> usize {
        self.by_type.get(&kind).map_or(0, IndexSet::len)
    }

    pub fn len(&self) -> usize {
        self.occupancy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy.is_empty()
    }

    /// Number of slots, live or free.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Indices a sequence of additions would receive, given the
    /// removals interleaved with them.
    pub fn allocator(&self) -> SlotAllocator {
        SlotAllocator {
            free: self.free.clone(),
            next: self.slots.len() as PieceIndex,
        }
    }

    /// Smallest box containing every piece, as (min, max).
    pub fn bounding_box(&self) -> Option<(Coords, Coords)> {
        self.iter().map(|p| p.coords).fold(None, |acc, c| match acc {
            None => Some((c, c)),
            Some((lo, hi)) => Some((
                Coords::new(lo.x.min(c.x), lo.y.min(c.y)),
                Coords::new(hi.x.max(c.x), hi.y.max(c.y)),
            )),
        })
    }
}

/// Predicts the slot indices of a store without mutating it.
#[derive(Debug, Clone)]
pub struct SlotAllocator {
    free: Vec<PieceIndex>,
    next: PieceIndex,
}

impl SlotAllocator {
    pub fn take(&mut self) -> PieceIndex {
        self.free.pop().unwrap_or_else(|| {
            self.next += 1;
            self.next - 1
        })
    }

    pub fn release(&mut self, index: PieceIndex) {
        self.free.push(index);
    }
}

/// The arena plus the line index, always updated together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizedPieces {
    store: PieceStore,
    lines: LineIndex,
}

impl OrganizedPieces {
    pub fn new(directions: impl IntoIterator<Item = Direction>) -> Self {
        Self {
            store: PieceStore::new(),
            lines: LineIndex::new(directions),
        }
    }

    #[inline]
    pub fn store(&self) -> &PieceStore {
        &self.store
    }

    #[inline]
    pub fn lines(&self) -> &LineIndex {
        &self.lines
    }

    #[inline]
    pub fn piece_at(&self, coords: Coords) -> Option<Piece> {
        self.store.piece_at(coords)
    }

    pub fn add(&mut self, coords: Coords, kind: PieceType) -> Result<PieceIndex, StoreError> {
        let index = self.store.add(coords, kind)?;
        self.lines.insert(index, coords);
        Ok(index)
    }

    pub fn add_at(
        &mut self,
        index: PieceIndex,
        coords: Coords,
        kind: PieceType,
    ) -> Result<(), StoreError> {
        self.store.add_at(index, coords, kind)?;
        self.lines.insert(index, coords);
        Ok(())
    }

    pub fn remove(&mut self, index: PieceIndex) -> Result<Piece, StoreError> {
        let piece = self.store.remove(index)?;
        if !self.lines.remove(index, piece.coords) {
            panic!("line index lost piece {index} at {}", piece.coords);
        }
        Ok(piece)
    }

    pub fn move_to(&mut self, index: PieceIndex, to: Coords) -> Result<Coords, StoreError> {
        let from = self.store.move_to(index, to)?;
        if from != to {
            if !self.lines.remove(index, from) {
                panic!("line index lost piece {index} at {from}");
            }
            self.lines.insert(index, to);
        }
        Ok(from)
    }

    /// Rebuild the line index from the arena.
    pub fn regenerate(&mut self) {
        self.lines.clear();
        for piece in self.store.iter() {
            self.lines.insert(piece.index, piece.coords);
        }
    }

    /// Every live piece on exactly one line per direction, at its
    /// current coordinates, and nothing else on any line.
    pub fn is_consistent(&self) -> bool {
        let dirs = self.lines.directions().count();
        let live_ok = self
            .store
            .iter()
            .all(|p| self.lines.memberships(p.index) == dirs);
        let entries_ok = self.lines.entries().all(|(dir, key, e)| {
            self.store.get(e.index).is_some_and(|p| {
                dir.line_key(p.coords) == key && dir.along(p.coords) == e.along
            })
        });
        live_ok && entries_ok
    }
}

#[cfg(test)]
fn w(raw: crate::model::RawType) -> PieceType {
    PieceType::new(raw, PlayerColor::WHITE)
}

#[test]
fn occupied_square_is_rejected() {
    use crate::model::RawType::*;
    let mut store = PieceStore::new();
    store.add(Coords::new(1, 1), w(ROOK)).unwrap();
    assert_eq!(
        store.add(Coords::new(1, 1), w(KNIGHT)),
        Err(StoreError::OccupiedSquare(Coords::new(1, 1)))
    );
    let b = store.add(Coords::new(2, 1), w(BISHOP)).unwrap();
    assert_eq!(
        store.move_to(b, Coords::new(1, 1)),
        Err(StoreError::OccupiedSquare(Coords::new(1, 1)))
    );
    assert_eq!(store.len(), 2);
}

#[test]
fn freed_slots_are_reused_last_in_first_out() {
    use crate::model::RawType::*;
    let mut store = PieceStore::new();
    let a = store.add(Coords::new(0, 0), w(PAWN)).unwrap();
    let b = store.add(Coords::new(0, 1), w(PAWN)).unwrap();
    let mut alloc = store.allocator();
    store.remove(a).unwrap();
    alloc.release(a);
    store.remove(b).unwrap();
    alloc.release(b);
    assert_eq!(alloc.take(), b);
    assert_eq!(store.add(Coords::new(9, 9), w(QUEEN)).unwrap(), b);
    assert_eq!(alloc.take(), a);
    assert_eq!(alloc.take(), 2);
}

#[test]
fn add_at_restores_exact_slot() {
    use crate::model::RawType::*;
    let mut store = PieceStore::new();
    let a = store.add(Coords::new(0, 0), w(KING)).unwrap();
    let before = store.clone();
    let removed = store.remove(a).unwrap();
    store.add_at(removed.index, removed.coords, removed.kind).unwrap();
    assert_eq!(store, before);
    assert_eq!(
        store.add_at(a, Coords::new(5, 5), w(KING)),
        Err(StoreError::SlotInUse(a))
    );
}

#[test]
fn incremental_lines_match_regeneration() {
    use crate::model::RawType::*;
    let mut pieces = OrganizedPieces::new([
        Direction::HORIZONTAL,
        Direction::VERTICAL,
        Direction::DIAGONAL,
        Direction::new(1, 2).unwrap(),
    ]);
    let r = pieces.add(Coords::new(1, 1), w(ROOK)).unwrap();
    let q = pieces.add(Coords::new(-4, 7), w(QUEEN)).unwrap();
    pieces.add(Coords::new(3, 7), w(PAWN)).unwrap();
    pieces.move_to(r, Coords::new(1_000_000, 1)).unwrap();
    pieces.remove(q).unwrap();
    pieces.add(Coords::new(2, 2), w(KNIGHT)).unwrap();
    assert!(pieces.is_consistent());

    let mut rebuilt = pieces.clone();
    rebuilt.regenerate();
    assert_eq!(rebuilt, pieces);
}

#[test]
#[should_panic(expected = "line index lost piece")]
fn lost_line_entries_are_fatal() {
    use crate::model::RawType::*;
    let mut pieces = OrganizedPieces::new([Direction::HORIZONTAL]);
    let r = pieces.add(Coords::new(1, 1), w(ROOK)).unwrap();
    pieces.lines.clear();
    let _ = pieces.move_to(r, Coords::new(2, 1));
}
