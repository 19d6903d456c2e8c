//! # Modeling chess on an unbounded board.
//!
//! Unlike the classical game, the board here has no edges unless a
//! variant installs a world border. Every coordinate is a pair of
//! arbitrary-magnitude integers and nothing is ever stored per square.
//!
//! The model is split into:
//!
//! - [`pieces`]: the piece arena, indexed by square and by type
//! - [`lines`]: per-direction line buckets used for all sliding queries
//! - [`movesets`]: the catalog of how each piece type moves
//! - [`movegen`], [`specials`]: pseudo-legal and legal move generation
//! - [`moving`], [`state`]: reversible moves and the state journal
//! - [`check`], [`gameover`], [`repetition`]: game-end detection
//! - [`position`]: the aggregate tying all of the above together

use std::{
    fmt::Display,
    ops::{Add, Mul, Neg, Sub},
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use strum::{EnumIs, EnumIter, EnumString, IntoStaticStr, VariantArray};

pub mod attacking;
pub mod check;
pub mod events;
pub mod gameover;
pub mod lines;
pub mod movegen;
pub mod movesets;
pub mod moving;
pub mod perft;
pub mod pieces;
pub mod position;
pub mod premove;
pub mod repetition;
pub mod rules;
pub mod specials;
pub mod state;
pub mod variant;

/// Stable handle of a piece inside the arena.
pub type PieceIndex = u32;

/// Largest distance from the origin, on either axis, at which a square
/// still exists. Keeps every line computation inside `i128`.
pub const COORD_LIMIT: i128 = 1 << 100;

/// Largest component of a sliding direction.
pub const DIRECTION_LIMIT: i128 = 1 << 24;

/// A square on the unbounded board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Coords {
    pub x: i128,
    pub y: i128,
}

impl Coords {
    pub const ORIGIN: Coords = Coords { x: 0, y: 0 };

    #[inline]
    pub const fn new(x: i128, y: i128) -> Self {
        Self { x, y }
    }

    /// Whether both coordinates lie within [`COORD_LIMIT`].
    #[inline]
    pub fn is_representable(self) -> bool {
        self.x.unsigned_abs() <= COORD_LIMIT as u128 && self.y.unsigned_abs() <= COORD_LIMIT as u128
    }

    /// King-move distance between two squares.
    #[inline]
    pub fn chebyshev(self, other: Coords) -> u128 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

impl Add for Coords {
    type Output = Coords;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Coords::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Coords {
    type Output = Coords;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Coords::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Coords {
    type Output = Coords;

    #[inline]
    fn neg(self) -> Self::Output {
        Coords::new(-self.x, -self.y)
    }
}

impl Mul<i128> for Coords {
    type Output = Coords;

    #[inline]
    fn mul(self, rhs: i128) -> Self::Output {
        Coords::new(self.x * rhs, self.y * rhs)
    }
}

impl Display for Coords {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

pub(crate) fn gcd(a: i128, b: i128) -> u128 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// A primitive sliding direction.
///
/// Directions are kept in a canonical orientation so that a direction
/// and its negation are the same line: `dx > 0`, or `dx == 0` and
/// `dy > 0`. The components are always coprime, so every square of a
/// line is reachable in whole steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Direction {
    dx: i128,
    dy: i128,
}

impl Direction {
    pub const HORIZONTAL: Direction = Direction { dx: 1, dy: 0 };
    pub const VERTICAL: Direction = Direction { dx: 0, dy: 1 };
    pub const DIAGONAL: Direction = Direction { dx: 1, dy: 1 };
    pub const ANTIDIAGONAL: Direction = Direction { dx: 1, dy: -1 };

    /// Canonicalize a step vector, or `None` if it is zero, not
    /// primitive, or has a component beyond [`DIRECTION_LIMIT`].
    pub fn new(dx: i128, dy: i128) -> Option<Self> {
        if (dx, dy) == (0, 0)
            || gcd(dx, dy) != 1
            || dx.unsigned_abs() > DIRECTION_LIMIT as u128
            || dy.unsigned_abs() > DIRECTION_LIMIT as u128
        {
            return None;
        }

        if dx < 0 || (dx == 0 && dy < 0) {
            Some(Self { dx: -dx, dy: -dy })
        } else {
            Some(Self { dx, dy })
        }
    }

    #[inline]
    pub fn dx(self) -> i128 {
        self.dx
    }

    #[inline]
    pub fn dy(self) -> i128 {
        self.dy
    }

    /// The unit step in the canonical orientation.
    #[inline]
    pub fn step(self) -> Coords {
        Coords::new(self.dx, self.dy)
    }

    /// Identifies which of the parallel lines of this direction a
    /// square lies on.
    #[inline]
    pub fn line_key(self, c: Coords) -> i128 {
        c.x * self.dy - c.y * self.dx
    }

    /// Position of a square along its line; strictly monotone in the
    /// step count.
    #[inline]
    pub fn along(self, c: Coords) -> i128 {
        if self.dx != 0 { c.x } else { c.y }
    }

    /// Signed number of steps from `from` to `to`, assuming both are on
    /// the same line.
    #[inline]
    pub fn steps_between(self, from: Coords, to: Coords) -> i128 {
        let unit = if self.dx != 0 { self.dx } else { self.dy };
        (self.along(to) - self.along(from)) / unit
    }

    /// If `offset` is a non-zero whole multiple of the step, the
    /// multiplier.
    pub fn multiple_of(self, offset: Coords) -> Option<i128> {
        if offset == Coords::ORIGIN || self.line_key(offset) != 0 {
            return None;
        }
        let k = self.steps_between(Coords::ORIGIN, offset);
        (self.step() * k == offset).then_some(k)
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.dx, self.dy)
    }
}

/// The owner of a piece.
///
/// `NEUTRAL` owns board furniture like voids and obstacles; it never
/// takes a turn.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    EnumIs, EnumIter, strum::Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    WHITE,
    BLACK,
    NEUTRAL,
}

impl PlayerColor {
    /// Use this color as an array index.
    #[inline]
    pub fn ix(self) -> usize {
        self as usize
    }

    /// Direction of travel of this color's pawns along the y axis.
    #[inline]
    pub fn pawn_direction(self) -> i128 {
        match self {
            PlayerColor::WHITE => 1,
            PlayerColor::BLACK => -1,
            PlayerColor::NEUTRAL => 0,
        }
    }
}

/// Colorless piece type.
///
/// The strum serialization is the abbreviation used by position
/// strings, case-insensitively.
#[allow(non_camel_case_types)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    EnumIs, EnumIter, VariantArray, EnumString, IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum RawType {
    #[strum(serialize = "k")]
    KING,
    #[strum(serialize = "gi")]
    GIRAFFE,
    #[strum(serialize = "ca")]
    CAMEL,
    #[strum(serialize = "ze")]
    ZEBRA,
    #[strum(serialize = "nr")]
    KNIGHTRIDER,
    #[strum(serialize = "am")]
    AMAZON,
    #[strum(serialize = "q")]
    QUEEN,
    #[strum(serialize = "rq")]
    ROYAL_QUEEN,
    #[strum(serialize = "ha")]
    HAWK,
    #[strum(serialize = "ch")]
    CHANCELLOR,
    #[strum(serialize = "ar")]
    ARCHBISHOP,
    #[strum(serialize = "ce")]
    CENTAUR,
    #[strum(serialize = "rc")]
    ROYAL_CENTAUR,
    #[strum(serialize = "ro")]
    ROSE,
    #[strum(serialize = "n")]
    KNIGHT,
    #[strum(serialize = "gu")]
    GUARD,
    #[strum(serialize = "hu")]
    HUYGEN,
    #[strum(serialize = "r")]
    ROOK,
    #[strum(serialize = "b")]
    BISHOP,
    #[strum(serialize = "p")]
    PAWN,
    #[strum(serialize = "vo")]
    VOID,
    #[strum(serialize = "ob")]
    OBSTACLE,
}

impl RawType {
    /// Losing every royal piece loses the game.
    #[inline]
    pub fn is_royal(self) -> bool {
        matches!(
            self,
            RawType::KING | RawType::ROYAL_QUEEN | RawType::ROYAL_CENTAUR
        )
    }

    /// Board furniture that always belongs to the neutral player.
    #[inline]
    pub fn is_neutral_only(self) -> bool {
        matches!(self, RawType::VOID | RawType::OBSTACLE)
    }

    #[inline]
    pub fn abbreviation(self) -> &'static str {
        self.into()
    }
}

impl Serialize for RawType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.abbreviation())
    }
}

impl<'de> Deserialize<'de> for RawType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RawType::from_str(&s).map_err(|_| D::Error::custom(format!("unknown piece type {s:?}")))
    }
}

/// A colored piece type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PieceType {
    pub raw: RawType,
    pub color: PlayerColor,
}

impl PieceType {
    #[inline]
    pub const fn new(raw: RawType, color: PlayerColor) -> Self {
        Self { raw, color }
    }

    /// Parse a position-string abbreviation. Uppercase is white,
    /// lowercase is black, and voids and obstacles are neutral
    /// whatever their case.
    pub fn from_abbreviation(s: &str) -> Option<Self> {
        let raw = RawType::from_str(s).ok()?;
        let color = if raw.is_neutral_only() {
            PlayerColor::NEUTRAL
        } else if s.chars().all(|c| c.is_ascii_uppercase()) {
            PlayerColor::WHITE
        } else if s.chars().all(|c| c.is_ascii_lowercase()) {
            PlayerColor::BLACK
        } else {
            return None;
        };
        Some(Self { raw, color })
    }
}

impl Display for PieceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let abbr = self.raw.abbreviation();
        if self.color.is_white() {
            f.write_str(&abbr.to_ascii_uppercase())
        } else {
            f.write_str(abbr)
        }
    }
}

impl Serialize for PieceType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A piece standing on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceType,
    pub coords: Coords,
    pub index: PieceIndex,
}

impl Piece {
    #[inline]
    pub fn color(&self) -> PlayerColor {
        self.kind.color
    }

    #[inline]
    pub fn raw(&self) -> RawType {
        self.kind.raw
    }
}

/// One value per playing color.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ByColor<T> {
    pub white: T,
    pub black: T,
}

impl<T> ByColor<T> {
    pub fn new(white: T, black: T) -> Self {
        Self { white, black }
    }

    #[inline]
    pub fn get(&self, color: PlayerColor) -> Option<&T> {
        match color {
            PlayerColor::WHITE => Some(&self.white),
            PlayerColor::BLACK => Some(&self.black),
            PlayerColor::NEUTRAL => None,
        }
    }

    #[inline]
    pub fn get_mut(&mut self, color: PlayerColor) -> Option<&mut T> {
        match color {
            PlayerColor::WHITE => Some(&mut self.white),
            PlayerColor::BLACK => Some(&mut self.black),
            PlayerColor::NEUTRAL => None,
        }
    }
}

/// Pseudo-legal move, "syntactic salt" newtype.
///
/// Honors how pieces move but not whether the mover's royals are
/// left attacked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PseudoLegal(pub moving::MoveDraft);

/// Legal move, "syntactic salt" newtype.
///
/// Only produced by the legal move generator; the only kind of move
/// [`position::Position::make_move`] accepts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LegalMove(pub moving::MoveDraft);

#[test]
fn direction_canonical_form() {
    assert_eq!(Direction::new(-1, 0), Some(Direction::HORIZONTAL));
    assert_eq!(Direction::new(0, -3), None);
    assert_eq!(Direction::new(-2, -1), Direction::new(2, 1));
    assert_eq!(Direction::new(0, 0), None);
    assert_eq!(Direction::new(-1, 1), Some(Direction::ANTIDIAGONAL));
    assert!(Direction::new(1, DIRECTION_LIMIT).is_some());
    assert_eq!(Direction::new(1, DIRECTION_LIMIT + 1), None);
}

#[test]
fn squares_end_at_the_coordinate_limit() {
    assert!(Coords::new(COORD_LIMIT, -COORD_LIMIT).is_representable());
    assert!(!Coords::new(COORD_LIMIT + 1, 0).is_representable());
    assert!(!Coords::new(0, i128::MIN).is_representable());
}

#[test]
fn direction_multiples() {
    let d = Direction::new(1, 2).unwrap();
    assert_eq!(d.multiple_of(Coords::new(3, 6)), Some(3));
    assert_eq!(d.multiple_of(Coords::new(-2, -4)), Some(-2));
    assert_eq!(d.multiple_of(Coords::new(2, 3)), None);
    assert_eq!(Direction::VERTICAL.multiple_of(Coords::new(0, -7)), Some(-7));
    assert_eq!(Direction::VERTICAL.multiple_of(Coords::ORIGIN), None);
}

#[test]
fn abbreviations_decide_color() {
    let king = PieceType::from_abbreviation("K").unwrap();
    assert_eq!(king, PieceType::new(RawType::KING, PlayerColor::WHITE));
    let rose = PieceType::from_abbreviation("ro").unwrap();
    assert_eq!(rose, PieceType::new(RawType::ROSE, PlayerColor::BLACK));
    let void = PieceType::from_abbreviation("VO").unwrap();
    assert_eq!(void.color, PlayerColor::NEUTRAL);
    assert_eq!(PieceType::from_abbreviation("Nr"), None);
    assert_eq!(PieceType::from_abbreviation("x"), None);
    assert_eq!(format!("{}", PieceType::new(RawType::HUYGEN, PlayerColor::WHITE)), "HU");
}
