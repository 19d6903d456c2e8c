//! # Notation.
//!
//! Text formats of the unbounded board, parsed with chumsky:
//!
//! - coordinates: `x,y` with signed integers of any size
//! - piece types: one or two letters, uppercase for white
//! - moves in coordinate notation: `5,2>5,4`, `7,7>7,8=Q`
//! - position strings: `K5,1+|r-3,8`, a `+` marking a special right
//! - the compressed game export, as serde data

pub mod compressed;
pub mod position;

use std::{fmt::Display, str::FromStr};

use chumsky::{error::EmptyErr, prelude::*};

use crate::{
    error::NotationError,
    model::{Coords, PieceType, RawType, moving::MoveDraft},
};

/// Parsers over string slices.
pub trait Prs<'s, T>: Parser<'s, &'s str, T> {}

impl<'s, T, P: Parser<'s, &'s str, T>> Prs<'s, T> for P {}

pub trait Parsable: Sized {
    fn parser<'s>() -> impl Prs<'s, Self>;

    /// Parse the whole of `s`.
    fn parse_str(s: &str) -> Option<Self> {
        Self::parser().then_ignore(end()).parse(s).into_output()
    }
}

/// Signed integer of arbitrary length, within `i128`.
pub fn integer<'s>() -> impl Prs<'s, i128> {
    just('-')
        .or_not()
        .then(text::int(10))
        .to_slice()
        .try_map(|s: &str, _| s.parse::<i128>().map_err(|_| EmptyErr::default()))
}

fn letters<'s>() -> impl Prs<'s, &'s str> {
    any()
        .filter(|c: &char| c.is_ascii_alphabetic())
        .repeated()
        .at_least(1)
        .at_most(2)
        .to_slice()
}

impl Parsable for Coords {
    fn parser<'s>() -> impl Prs<'s, Self> {
        group((integer(), just(','), integer())).map(|(x, _, y)| Coords::new(x, y))
    }
}

impl Parsable for PieceType {
    fn parser<'s>() -> impl Prs<'s, Self> {
        letters().try_map(|s, _| PieceType::from_abbreviation(s).ok_or(EmptyErr::default()))
    }
}

impl Parsable for RawType {
    fn parser<'s>() -> impl Prs<'s, Self> {
        letters().try_map(|s, _| RawType::from_str(s).map_err(|_| EmptyErr::default()))
    }
}

/// A move as start and end coordinates, with an optional promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CoordNotation {
    pub start: Coords,
    pub end: Coords,
    pub promotion: Option<RawType>,
}

impl Parsable for CoordNotation {
    fn parser<'s>() -> impl Prs<'s, Self> {
        group((
            Coords::parser(),
            just('>'),
            Coords::parser(),
            just('=').ignore_then(RawType::parser()).or_not(),
        ))
        .map(|(start, _, end, promotion)| Self {
            start,
            end,
            promotion,
        })
    }
}

impl FromStr for CoordNotation {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s.trim()).ok_or_else(|| NotationError {
            kind: "move",
            text: s.to_string(),
        })
    }
}

impl Display for CoordNotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}>{}", self.start, self.end)?;
        if let Some(raw) = self.promotion {
            write!(f, "={}", raw.abbreviation().to_ascii_uppercase())?;
        }
        Ok(())
    }
}

impl From<&MoveDraft> for CoordNotation {
    fn from(value: &MoveDraft) -> Self {
        Self {
            start: value.start,
            end: value.end,
            promotion: value.promotion,
        }
    }
}

impl From<CoordNotation> for MoveDraft {
    fn from(value: CoordNotation) -> Self {
        Self {
            start: value.start,
            end: value.end,
            promotion: value.promotion,
            special: None,
        }
    }
}

#[test]
fn coordinates_of_any_size() {
    assert_eq!(Coords::parse_str("5,-2"), Some(Coords::new(5, -2)));
    assert_eq!(
        Coords::parse_str("-170141183460469231731687303715884105728,0"),
        Some(Coords::new(i128::MIN, 0))
    );
    assert_eq!(Coords::parse_str("5 ,2"), None);
    assert_eq!(Coords::parse_str("1e3,2"), None);
}

#[test]
fn coord_notation_round_trips_through_display() {
    let push: CoordNotation = "5,2>5,4".parse().unwrap();
    assert_eq!(push.start, Coords::new(5, 2));
    assert_eq!(push.promotion, None);

    let promo: CoordNotation = "7,7>7,8=Q".parse().unwrap();
    assert_eq!(promo.promotion, Some(RawType::QUEEN));
    assert_eq!(promo.to_string(), "7,7>7,8=Q");

    let rose: CoordNotation = "-3,-3>0,0=ro".parse().unwrap();
    assert_eq!(rose.to_string(), "-3,-3>0,0=RO");

    assert!("7,7-7,8".parse::<CoordNotation>().is_err());
    assert!("7,7>7,8=X".parse::<CoordNotation>().is_err());
}
