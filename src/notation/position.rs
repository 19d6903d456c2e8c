//! Position strings: `|`-separated pieces, each a type abbreviation
//! and coordinates, with a trailing `+` for a special right.

use std::{fmt::Display, str::FromStr};

use chumsky::prelude::*;

use crate::{
    error::ConfigError,
    model::{Coords, PieceType, position::Position, variant::StartingPosition},
    notation::{Parsable, Prs},
};

fn entry<'s>() -> impl Prs<'s, (PieceType, Coords, bool)> {
    group((
        PieceType::parser(),
        Coords::parser(),
        just('+').or_not().map(|p| p.is_some()),
    ))
}

impl Parsable for StartingPosition {
    fn parser<'s>() -> impl Prs<'s, Self> {
        entry()
            .separated_by(just('|'))
            .collect::<Vec<_>>()
            .map(|entries| {
                let mut res = StartingPosition::default();
                for (kind, coords, special) in entries {
                    res.pieces.push((coords, kind));
                    if special {
                        res.special_rights.push(coords);
                    }
                }
                res
            })
    }
}

impl FromStr for StartingPosition {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s.trim()).ok_or_else(|| ConfigError::PositionString(s.to_string()))
    }
}

fn write_entries(
    f: &mut std::fmt::Formatter<'_>,
    entries: impl Iterator<Item = (Coords, PieceType, bool)>,
) -> std::fmt::Result {
    for (i, (coords, kind, special)) in entries.enumerate() {
        if i > 0 {
            f.write_str("|")?;
        }
        write!(f, "{kind}{coords}")?;
        if special {
            f.write_str("+")?;
        }
    }
    Ok(())
}

impl Display for StartingPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_entries(
            f,
            self.pieces
                .iter()
                .map(|&(c, k)| (c, k, self.special_rights.contains(&c))),
        )
    }
}

/// The position string of the viewed board, pieces in slot order.
pub struct PositionString<'a>(pub &'a Position);

impl Display for PositionString<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rights = &self.0.state().global.special_rights;
        write_entries(
            f,
            self.0
                .pieces()
                .store()
                .iter()
                .map(|p| (p.coords, p.kind, rights.contains(&p.coords))),
        )
    }
}

#[test]
fn position_strings_parse() {
    use crate::model::{PlayerColor, RawType};

    let start: StartingPosition = "K5,1+|r-3,8|vo0,0|HU1000000000000,-4".parse().unwrap();
    assert_eq!(start.pieces.len(), 4);
    assert_eq!(start.special_rights, vec![Coords::new(5, 1)]);
    assert_eq!(
        start.pieces[1],
        (Coords::new(-3, 8), PieceType::new(RawType::ROOK, PlayerColor::BLACK))
    );
    assert_eq!(start.pieces[2].1.color, PlayerColor::NEUTRAL);
    assert_eq!(start.to_string(), "K5,1+|r-3,8|vo0,0|HU1000000000000,-4");

    assert_eq!(StartingPosition::from_str("").unwrap(), StartingPosition::default());
    assert!(StartingPosition::from_str("K5,1|").is_err());
    assert!(StartingPosition::from_str("X5,1").is_err());
}
