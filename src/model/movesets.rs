//! # Movesets.
//!
//! Every piece type's movement is described as data:
//!
//! - `individual`: fixed jump offsets (leapers, the king's step)
//! - `sliding`: primitive directions it rides along, both ways
//! - `ignore`: squares a rider passes through as if empty
//! - `blocking`: whether a piece in the way is capturable or a wall
//! - `special`: a hook for pawns, castling royals, and roses
//!
//! The catalog also derives the reverse "vicinity" table of jump
//! offsets, so an attack by any leaper is a handful of lookups.

use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use strum::EnumIs;

use crate::{
    error::ConfigError,
    model::{Coords, Direction, PieceType, PlayerColor, RawType},
};

/// Predicate of squares a rider treats as transparent, given its start
/// and the square examined.
pub type IgnoreFn = fn(Coords, Coords) -> bool;

/// How a mover of the given color treats a piece in its way.
pub type BlockingFn = fn(PlayerColor, PieceType) -> Blocking;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIs)]
pub enum Blocking {
    /// Can be captured; the ride ends on it.
    CAPTURE,
    /// Cannot be entered; the ride ends before it.
    STOP,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs)]
pub enum SpecialKind {
    PAWNS,
    KINGS,
    ROSES,
}

#[derive(Debug, Clone)]
pub struct Moveset {
    pub individual: Vec<Coords>,
    pub sliding: Vec<Direction>,
    pub ignore: Option<IgnoreFn>,
    pub blocking: BlockingFn,
    pub special: Option<SpecialKind>,
}

impl Default for Moveset {
    fn default() -> Self {
        Self {
            individual: vec![],
            sliding: vec![],
            ignore: None,
            blocking: default_blocking,
            special: None,
        }
    }
}

impl Moveset {
    fn leaper(offsets: &[(i128, i128)]) -> Self {
        Self {
            individual: symmetric(offsets),
            ..Default::default()
        }
    }

    fn rider(dirs: &[Direction]) -> Self {
        Self {
            sliding: dirs.to_vec(),
            ..Default::default()
        }
    }

    fn and(mut self, other: Moveset) -> Self {
        self.individual.extend(other.individual);
        self.sliding.extend(other.sliding);
        self
    }

    fn special(mut self, kind: SpecialKind) -> Self {
        self.special = Some(kind);
        self
    }

    #[inline]
    pub fn slides_along(&self, dir: Direction) -> bool {
        self.sliding.contains(&dir)
    }

    #[inline]
    pub fn ignores(&self, start: Coords, square: Coords) -> bool {
        self.ignore.is_some_and(|f| f(start, square))
    }
}

/// Friendly pieces and voids are walls, anything else is capturable.
pub fn default_blocking(mover: PlayerColor, other: PieceType) -> Blocking {
    if other.color == mover || other.raw == RawType::VOID {
        Blocking::STOP
    } else {
        Blocking::CAPTURE
    }
}

/// Huygens only land on, and are only blocked at, prime distances.
pub fn huygen_ignore(start: Coords, square: Coords) -> bool {
    !is_prime(start.chebyshev(square))
}

/// Deterministic Miller-Rabin over the 64-bit range. Larger distances
/// are treated as composite.
pub fn is_prime(n: u128) -> bool {
    if n < 2 {
        return false;
    }
    const WITNESSES: [u128; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];
    for p in WITNESSES {
        if n % p == 0 {
            return n == p;
        }
    }
    if n > u64::MAX as u128 {
        return false;
    }

    let mut d = n - 1;
    let mut r = 0;
    while d % 2 == 0 {
        d /= 2;
        r += 1;
    }

    let pow = |mut b: u128, mut e: u128| {
        let mut acc = 1u128;
        b %= n;
        while e > 0 {
            if e & 1 == 1 {
                acc = acc * b % n;
            }
            b = b * b % n;
            e >>= 1;
        }
        acc
    };

    'witness: for a in WITNESSES {
        let mut x = pow(a, d);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..r {
            x = x * x % n;
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

fn symmetric(offsets: &[(i128, i128)]) -> Vec<Coords> {
    let mut res = vec![];
    for &(a, b) in offsets {
        for (x, y) in [(a, b), (b, a)] {
            for (sx, sy) in [(1, 1), (1, -1), (-1, 1), (-1, -1)] {
                let c = Coords::new(x * sx, y * sy);
                if !res.contains(&c) {
                    res.push(c);
                }
            }
        }
    }
    res
}

const ORTHOGONALS: [Direction; 2] = [Direction::HORIZONTAL, Direction::VERTICAL];
const DIAGONALS: [Direction; 2] = [Direction::DIAGONAL, Direction::ANTIDIAGONAL];

fn knightrider_directions() -> Vec<Direction> {
    [(1, 2), (2, 1), (1, -2), (2, -1)]
        .into_iter()
        .filter_map(|(dx, dy)| Direction::new(dx, dy))
        .collect()
}

/// Overrides of a piece type's geometry from a variant file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MovesetOverride {
    pub individual: Option<Vec<[i64; 2]>>,
    pub sliding: Option<Vec<[i64; 2]>>,
}

#[derive(Debug, Clone)]
pub struct MovesetCatalog {
    movesets: IndexMap<RawType, Moveset>,
    vicinity: IndexMap<Coords, Vec<RawType>>,
    directions: Vec<Direction>,
    skippers: bool,
}

impl MovesetCatalog {
    pub fn empty() -> Self {
        Self::from_movesets(IndexMap::new())
    }

    /// The built-in movement of every piece type.
    pub fn standard() -> Self {
        use RawType::*;

        let king = || Moveset::leaper(&[(1, 0), (1, 1)]);
        let knight = || Moveset::leaper(&[(1, 2)]);
        let rook = || Moveset::rider(&ORTHOGONALS);
        let bishop = || Moveset::rider(&DIAGONALS);
        let queen = || rook().and(bishop());

        let mut movesets = IndexMap::new();
        movesets.insert(KING, king().special(SpecialKind::KINGS));
        movesets.insert(GIRAFFE, Moveset::leaper(&[(1, 4)]));
        movesets.insert(CAMEL, Moveset::leaper(&[(1, 3)]));
        movesets.insert(ZEBRA, Moveset::leaper(&[(2, 3)]));
        movesets.insert(
            KNIGHTRIDER,
            Moveset {
                sliding: knightrider_directions(),
                ..Default::default()
            },
        );
        movesets.insert(AMAZON, queen().and(knight()));
        movesets.insert(QUEEN, queen());
        movesets.insert(ROYAL_QUEEN, queen());
        movesets.insert(HAWK, Moveset::leaper(&[(2, 0), (3, 0), (2, 2), (3, 3)]));
        movesets.insert(CHANCELLOR, rook().and(knight()));
        movesets.insert(ARCHBISHOP, bishop().and(knight()));
        movesets.insert(CENTAUR, king().and(knight()));
        movesets.insert(ROYAL_CENTAUR, king().and(knight()).special(SpecialKind::KINGS));
        movesets.insert(ROSE, Moveset::default().special(SpecialKind::ROSES));
        movesets.insert(KNIGHT, knight());
        movesets.insert(GUARD, king());
        movesets.insert(
            HUYGEN,
            Moveset {
                sliding: ORTHOGONALS.to_vec(),
                ignore: Some(huygen_ignore),
                ..Default::default()
            },
        );
        movesets.insert(ROOK, rook());
        movesets.insert(BISHOP, bishop());
        movesets.insert(PAWN, Moveset::default().special(SpecialKind::PAWNS));
        movesets.insert(VOID, Moveset::default());
        movesets.insert(OBSTACLE, Moveset::default());

        Self::from_movesets(movesets)
    }

    fn from_movesets(movesets: IndexMap<RawType, Moveset>) -> Self {
        let mut res = Self {
            movesets,
            vicinity: IndexMap::new(),
            directions: vec![],
            skippers: false,
        };
        res.derive();
        res
    }

    fn derive(&mut self) {
        self.vicinity.clear();
        self.directions.clear();
        self.skippers = false;
        for (&raw, moveset) in &self.movesets {
            for &offset in &moveset.individual {
                let types = self.vicinity.entry(offset).or_default();
                if !types.contains(&raw) {
                    types.push(raw);
                }
            }
            for &dir in &moveset.sliding {
                if !self.directions.contains(&dir) {
                    self.directions.push(dir);
                }
            }
            self.skippers |= moveset.ignore.is_some() && !moveset.sliding.is_empty();
        }
    }

    #[inline]
    pub fn get(&self, raw: RawType) -> Option<&Moveset> {
        self.movesets.get(&raw)
    }

    pub fn set(&mut self, raw: RawType, moveset: Moveset) {
        self.movesets.insert(raw, moveset);
        self.derive();
    }

    /// Every sliding direction any piece type uses.
    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    /// Jump offset to the types reaching it.
    pub fn vicinity(&self) -> &IndexMap<Coords, Vec<RawType>> {
        &self.vicinity
    }

    /// Whether some rider can pass through occupied squares.
    #[inline]
    pub fn has_skippers(&self) -> bool {
        self.skippers
    }

    pub fn types_with_special(&self, kind: SpecialKind) -> impl Iterator<Item = RawType> + '_ {
        self.movesets
            .iter()
            .filter(move |(_, m)| m.special == Some(kind))
            .map(|(&raw, _)| raw)
    }

    pub fn apply_overrides(
        &mut self,
        overrides: &IndexMap<String, MovesetOverride>,
    ) -> Result<(), ConfigError> {
        for (name, o) in overrides {
            let raw: RawType = name
                .parse()
                .map_err(|_| ConfigError::UnknownPieceType(name.clone()))?;
            let moveset = self.movesets.entry(raw).or_default();
            if let Some(jumps) = &o.individual {
                moveset.individual = jumps
                    .iter()
                    .map(|&[x, y]| Coords::new(x as i128, y as i128))
                    .collect();
            }
            if let Some(slides) = &o.sliding {
                let mut dirs = vec![];
                for &[dx, dy] in slides {
                    let dir = Direction::new(dx as i128, dy as i128)
                        .ok_or(ConfigError::NonPrimitiveDirection(dx, dy))?;
                    if !dirs.contains(&dir) {
                        dirs.push(dir);
                    }
                }
                moveset.sliding = dirs;
            }
            debug!("overrode moveset of {raw:?}");
        }
        self.derive();
        Ok(())
    }
}

#[test]
fn vicinity_lists_every_leaper() {
    let catalog = MovesetCatalog::standard();
    let jump = catalog.vicinity().get(&Coords::new(1, 2)).unwrap();
    for raw in [RawType::KNIGHT, RawType::AMAZON, RawType::CENTAUR, RawType::CHANCELLOR] {
        assert!(jump.contains(&raw), "{raw:?}");
    }
    assert!(!jump.contains(&RawType::KING));
    assert!(catalog.vicinity().get(&Coords::new(-1, -4)).unwrap().contains(&RawType::GIRAFFE));
}

#[test]
fn catalog_tracks_rider_directions() {
    let catalog = MovesetCatalog::standard();
    assert_eq!(catalog.directions().len(), 8);
    assert!(catalog.directions().contains(&Direction::new(2, -1).unwrap()));
    assert!(catalog.has_skippers());
}

#[test]
fn primes_for_huygens() {
    let primes: Vec<u128> = (0..40).filter(|&n| is_prime(n)).collect();
    assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37]);
    assert!(is_prime(1_000_000_007));
    assert!(!is_prime(1_000_000_007 * 3));
    assert!(huygen_ignore(Coords::new(0, 0), Coords::new(0, 4)));
    assert!(!huygen_ignore(Coords::new(0, 0), Coords::new(0, -5)));
}

#[test]
fn overrides_reject_non_primitive_slides() {
    let mut catalog = MovesetCatalog::standard();
    let mut overrides = IndexMap::new();
    overrides.insert(
        "r".to_string(),
        MovesetOverride {
            individual: None,
            sliding: Some(vec![[2, 0]]),
        },
    );
    assert!(matches!(
        catalog.apply_overrides(&overrides),
        Err(ConfigError::NonPrimitiveDirection(2, 0))
    ));
}
