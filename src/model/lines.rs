//! # Line buckets.
//!
//! For every tracked direction, pieces are grouped by the line they
//! stand on (see [`Direction::line_key`]), and each line is kept sorted
//! by the position along it. Finding the nearest piece in any direction
//! is then a binary search, no matter how sparse the board is.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::model::{Coords, Direction, PieceIndex};

/// One piece's membership on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEntry {
    pub along: i128,
    pub index: PieceIndex,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineIndex {
    lines: IndexMap<Direction, HashMap<i128, Vec<LineEntry>>>,
}

impl LineIndex {
    pub fn new(directions: impl IntoIterator<Item = Direction>) -> Self {
        Self {
            lines: directions.into_iter().map(|d| (d, HashMap::new())).collect(),
        }
    }

    pub fn directions(&self) -> impl Iterator<Item = Direction> + '_ {
        self.lines.keys().copied()
    }

    #[inline]
    pub fn tracks(&self, dir: Direction) -> bool {
        self.lines.contains_key(&dir)
    }

    pub fn clear(&mut self) {
        for buckets in self.lines.values_mut() {
            buckets.clear();
        }
    }

    /// Enter a piece into every tracked direction.
    pub fn insert(&mut self, index: PieceIndex, coords: Coords) {
        for (dir, buckets) in &mut self.lines {
            let along = dir.along(coords);
            let line = buckets.entry(dir.line_key(coords)).or_default();
            let at = line.partition_point(|e| e.along < along);
            line.insert(at, LineEntry { along, index });
        }
    }

    /// Withdraw a piece from every tracked direction. Returns false if
    /// the piece was missing from any line.
    pub fn remove(&mut self, index: PieceIndex, coords: Coords) -> bool {
        let mut found = true;
        for (dir, buckets) in &mut self.lines {
            let key = dir.line_key(coords);
            let Some(line) = buckets.get_mut(&key) else {
                found = false;
                continue;
            };
            let along = dir.along(coords);
            match line.binary_search_by_key(&along, |e| e.along) {
                Ok(at) if line[at].index == index => {
                    line.remove(at);
                }
                _ => found = false,
            }
            if line.is_empty() {
                buckets.remove(&key);
            }
        }
        found
    }

    /// The sorted line through `coords` in direction `dir`.
    pub fn line(&self, dir: Direction, coords: Coords) -> &[LineEntry] {
        self.lines
            .get(&dir)
            .and_then(|b| b.get(&dir.line_key(coords)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Pieces on the line through `from`, strictly beyond it, nearest
    /// first. `forward` walks with the canonical step, otherwise
    /// against it.
    pub fn walk(
        &self,
        dir: Direction,
        from: Coords,
        forward: bool,
    ) -> Box<dyn Iterator<Item = &LineEntry> + '_> {
        let line = self.line(dir, from);
        let along = dir.along(from);
        if forward {
            let at = line.partition_point(|e| e.along <= along);
            Box::new(line[at..].iter())
        } else {
            let at = line.partition_point(|e| e.along < along);
            Box::new(line[..at].iter().rev())
        }
    }

    /// Number of line memberships of a piece over all directions.
    pub fn memberships(&self, index: PieceIndex) -> usize {
        self.lines
            .values()
            .flat_map(|b| b.values())
            .flatten()
            .filter(|e| e.index == index)
            .count()
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (Direction, i128, &LineEntry)> + '_ {
        self.lines.iter().flat_map(|(dir, buckets)| {
            buckets
                .iter()
                .flat_map(move |(key, line)| line.iter().map(move |e| (*dir, *key, e)))
        })
    }
}

#[test]
fn walk_finds_nearest_both_ways() {
    let mut lines = LineIndex::new([Direction::HORIZONTAL, Direction::DIAGONAL]);
    lines.insert(0, Coords::new(-10, 0));
    lines.insert(1, Coords::new(3, 0));
    lines.insert(2, Coords::new(1_000_000_000_000, 0));
    lines.insert(3, Coords::new(5, 5));

    let ahead: Vec<_> = lines
        .walk(Direction::HORIZONTAL, Coords::new(0, 0), true)
        .map(|e| e.index)
        .collect();
    assert_eq!(ahead, vec![1, 2]);

    let behind: Vec<_> = lines
        .walk(Direction::HORIZONTAL, Coords::new(3, 0), false)
        .map(|e| e.index)
        .collect();
    assert_eq!(behind, vec![0]);

    let diag: Vec<_> = lines
        .walk(Direction::DIAGONAL, Coords::new(0, 0), true)
        .map(|e| e.index)
        .collect();
    assert_eq!(diag, vec![3]);
}

#[test]
fn remove_drops_empty_lines() {
    let mut lines = LineIndex::new([Direction::VERTICAL]);
    lines.insert(7, Coords::new(2, 2));
    assert!(lines.remove(7, Coords::new(2, 2)));
    assert_eq!(lines, LineIndex::new([Direction::VERTICAL]));
    assert!(!lines.remove(7, Coords::new(2, 2)));
}
