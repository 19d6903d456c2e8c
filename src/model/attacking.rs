//! # Attack queries.
//!
//! Attacks are found backwards from the target square rather than by
//! generating every enemy move:
//!
//! - leapers via the catalog's vicinity table
//! - pawns via their two capture diagonals
//! - roses by tracing rose paths out of the target
//! - riders by walking each line bucket outward
//!
//! None of these depend on how big or empty the board is.

use crate::model::{
    Coords, Direction, Piece, PlayerColor,
    movesets::SpecialKind,
    position::Position,
    specials::rose_hops,
};

/// Whose pieces count as attackers.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackSide {
    /// Pieces of exactly this color.
    OF(PlayerColor),
    /// Pieces of any color other than this one.
    AGAINST(PlayerColor),
}

impl AttackSide {
    #[inline]
    fn includes(self, color: PlayerColor) -> bool {
        match self {
            AttackSide::OF(c) => color == c,
            AttackSide::AGAINST(c) => color != c,
        }
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttackKind {
    INDIVIDUAL,
    SLIDING(Direction),
    /// A rose, with the squares between it and the target.
    PATH(Vec<Coords>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attacker {
    pub coords: Coords,
    pub target: Coords,
    pub kind: AttackKind,
}

pub fn is_square_attacked(pos: &Position, target: Coords, side: AttackSide) -> bool {
    !attackers(pos, target, side, Some(1)).is_empty()
}

/// Pieces of `color` attacking `target`.
pub fn is_square_attacked_by(pos: &Position, target: Coords, color: PlayerColor) -> Vec<Attacker> {
    attackers(pos, target, AttackSide::OF(color), None)
}

/// Pieces on `side` attacking `target`, at most `limit` of them.
pub fn attackers(
    pos: &Position,
    target: Coords,
    side: AttackSide,
    limit: Option<usize>,
) -> Vec<Attacker> {
    let mut found = vec![];
    let full = |found: &Vec<Attacker>| limit.is_some_and(|l| found.len() >= l);
    if !pos.rules.in_bounds(target) {
        return found;
    }

    let store = pos.pieces.store();
    let hit = |found: &mut Vec<Attacker>, piece: &Piece, kind: AttackKind| {
        found.push(Attacker {
            coords: piece.coords,
            target,
            kind,
        });
    };

    for (&offset, raws) in pos.catalog.vicinity() {
        let Some(piece) = store.piece_at(target - offset) else {
            continue;
        };
        if side.includes(piece.color()) && raws.contains(&piece.raw()) {
            hit(&mut found, &piece, AttackKind::INDIVIDUAL);
            if full(&found) {
                return found;
            }
        }
    }

    let pawn_types: Vec<_> = pos.catalog.types_with_special(SpecialKind::PAWNS).collect();
    if !pawn_types.is_empty() {
        for color in [PlayerColor::WHITE, PlayerColor::BLACK] {
            if !side.includes(color) {
                continue;
            }
            for dx in [-1, 1] {
                let from = target - Coords::new(dx, color.pawn_direction());
                let Some(piece) = store.piece_at(from) else {
                    continue;
                };
                if piece.color() == color && pawn_types.contains(&piece.raw()) {
                    hit(&mut found, &piece, AttackKind::INDIVIDUAL);
                    if full(&found) {
                        return found;
                    }
                }
            }
        }
    }

    let rose_types: Vec<_> = pos.catalog.types_with_special(SpecialKind::ROSES).collect();
    if !rose_types.is_empty() {
        for hop in rose_hops(pos, target, |_| false) {
            let Some(piece) = hop.occupant else {
                continue;
            };
            if side.includes(piece.color()) && rose_types.contains(&piece.raw()) {
                hit(&mut found, &piece, AttackKind::PATH(hop.path));
                if full(&found) {
                    return found;
                }
            }
        }
    }

    for dir in pos.pieces.lines().directions() {
        for forward in [true, false] {
            let mut between: Vec<Coords> = vec![];
            for entry in pos.pieces.lines().walk(dir, target, forward) {
                let Some(piece) = store.get(entry.index) else {
                    continue;
                };
                if side.includes(piece.color()) && rides_onto(pos, &piece, dir, target, &between) {
                    hit(&mut found, &piece, AttackKind::SLIDING(dir));
                    if full(&found) {
                        return found;
                    }
                }
                if !pos.catalog.has_skippers() {
                    break;
                }
                between.push(piece.coords);
            }
        }
    }

    found
}

/// Whether `piece` slides along `dir` onto `target`, through the
/// occupied squares `between`.
fn rides_onto(pos: &Position, piece: &Piece, dir: Direction, target: Coords, between: &[Coords]) -> bool {
    let Some(moveset) = pos.catalog.get(piece.raw()) else {
        return false;
    };
    if !moveset.slides_along(dir) || moveset.ignores(piece.coords, target) {
        return false;
    }
    let steps = dir.steps_between(piece.coords, target).abs();
    if pos.rules.slide_limit().is_some_and(|l| steps > l) {
        return false;
    }
    between.iter().all(|&b| moveset.ignores(piece.coords, b))
}

#[cfg(test)]
use crate::model::{RawType, position::Position as P};

#[test]
fn riders_are_blocked_by_the_first_piece() {
    let pos = P::from_position_string("K1,1|R1,8|b1,5|k8,8").unwrap();
    let white = AttackSide::OF(PlayerColor::WHITE);
    assert!(!is_square_attacked(&pos, Coords::new(1, 4), white));
    assert!(is_square_attacked(&pos, Coords::new(1, 6), white));
    assert!(is_square_attacked(&pos, Coords::new(1, 5), white));
    assert!(is_square_attacked(&pos, Coords::new(-1_000_000, 8), white));
    assert!(!is_square_attacked(&pos, Coords::new(1_000_000, 8), white));
}

#[test]
fn leapers_and_pawns_attack_by_offset() {
    let pos = P::from_position_string("K0,0|N10,10|P-3,-3|k50,50|gi100,100").unwrap();
    let white = AttackSide::OF(PlayerColor::WHITE);
    assert!(is_square_attacked(&pos, Coords::new(11, 12), white));
    assert!(is_square_attacked(&pos, Coords::new(-2, -2), white));
    assert!(is_square_attacked(&pos, Coords::new(-4, -2), white));
    assert!(!is_square_attacked(&pos, Coords::new(-3, -2), white));
    let by_black = is_square_attacked_by(&pos, Coords::new(101, 104), PlayerColor::BLACK);
    assert_eq!(by_black.len(), 1);
    assert_eq!(by_black[0].coords, Coords::new(100, 100));
}

#[test]
fn huygens_see_through_composite_distances() {
    let pos = P::from_position_string("HU0,0|p0,4|K20,20|k-20,-20").unwrap();
    let white = AttackSide::OF(PlayerColor::WHITE);
    assert!(is_square_attacked(&pos, Coords::new(0, 5), white));
    assert!(!is_square_attacked(&pos, Coords::new(0, 6), white));
    assert!(is_square_attacked(&pos, Coords::new(0, 7), white));
    assert!(is_square_attacked(&pos, Coords::new(0, -1_000_000_007), white));
}

#[test]
fn rose_attacks_report_their_path() {
    let pos = P::from_position_string("RO0,0|K30,30|k-30,-30").unwrap();
    let found = is_square_attacked_by(&pos, Coords::new(3, 3), PlayerColor::WHITE);
    assert_eq!(found.len(), 1);
    let AttackKind::PATH(path) = &found[0].kind else {
        panic!("expected a rose path, got {:?}", found[0].kind);
    };
    assert_eq!(path.len(), 1);
    assert_eq!(pos.piece_at(Coords::ORIGIN).map(|p| p.raw()), Some(RawType::ROSE));
}
