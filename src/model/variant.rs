//! # Variants.
//!
//! A variant is a TOML file: a name, a starting position string, the
//! game rules, and optional moveset overrides. A few are built in.
//!
//! ```toml
//! name = "tiny"
//! position = "K0,0+|R7,0+|k0,7"
//!
//! [rules]
//! turn_order = ["white", "black"]
//! slide_limit = 50
//!
//! [movesets.gu]
//! individual = [[1, 0], [-1, 0], [0, 1], [0, -1]]
//! ```

use std::str::FromStr;

use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;

use crate::{
    error::ConfigError,
    model::{
        Coords, PieceType, PlayerColor,
        movesets::{MovesetCatalog, MovesetOverride},
        rules::GameRules,
    },
};

/// Built-in variant files by name.
pub const BUILTIN: [(&str, &str); 3] = [
    ("classical", include_str!("variants/classical.toml")),
    ("classical_bounded", include_str!("variants/classical_bounded.toml")),
    ("rose_garden", include_str!("variants/rose_garden.toml")),
];

#[derive(Debug, Clone, Deserialize)]
struct VariantFile {
    name: String,
    position: String,
    /// Replaces the `+` marks of the position string when present.
    #[serde(default)]
    special_rights: Option<Vec<[i64; 2]>>,
    #[serde(default)]
    rules: GameRules,
    #[serde(default)]
    movesets: IndexMap<String, MovesetOverride>,
}

/// Pieces and special rights of a position string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartingPosition {
    pub pieces: Vec<(Coords, PieceType)>,
    pub special_rights: Vec<Coords>,
}

#[derive(Debug, Clone)]
pub struct Variant {
    pub name: String,
    pub start: StartingPosition,
    pub rules: GameRules,
    pub catalog: MovesetCatalog,
}

impl Variant {
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let file: VariantFile = toml::from_str(s)?;
        validate(&file.rules)?;
        let mut catalog = MovesetCatalog::standard();
        catalog.apply_overrides(&file.movesets)?;
        let mut start = StartingPosition::from_str(&file.position)?;
        if let Some(rights) = &file.special_rights {
            start.special_rights = rights
                .iter()
                .map(|&[x, y]| Coords::new(x as i128, y as i128))
                .collect();
        }
        debug!("loaded variant {:?} with {} pieces", file.name, start.pieces.len());
        Ok(Self {
            name: file.name,
            start,
            rules: file.rules,
            catalog,
        })
    }

    pub fn builtin(name: &str) -> Result<Self, ConfigError> {
        let (_, src) = BUILTIN
            .iter()
            .find(|(n, _)| *n == name)
            .ok_or_else(|| ConfigError::UnknownVariant(name.to_string()))?;
        Self::from_toml(src)
    }

    pub fn classical() -> Result<Self, ConfigError> {
        Self::builtin("classical")
    }

    /// Classical chess confined to the usual 8x8 board.
    pub fn classical_bounded() -> Result<Self, ConfigError> {
        Self::builtin("classical_bounded")
    }

    pub fn rose_garden() -> Result<Self, ConfigError> {
        Self::builtin("rose_garden")
    }

    /// Default rules and movesets around a bare position string.
    pub fn from_position_string(position: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            name: "custom".to_string(),
            start: StartingPosition::from_str(position)?,
            rules: GameRules::default(),
            catalog: MovesetCatalog::standard(),
        })
    }
}

fn validate(rules: &GameRules) -> Result<(), ConfigError> {
    if rules.turn_order.is_empty() {
        return Err(ConfigError::EmptyTurnOrder);
    }
    if rules.turn_order.contains(&PlayerColor::NEUTRAL) {
        return Err(ConfigError::NeutralTurn);
    }
    Ok(())
}

#[test]
fn builtins_load() {
    for (name, _) in BUILTIN {
        let variant = Variant::builtin(name).unwrap();
        assert_eq!(variant.name, name);
        assert_eq!(variant.rules.turn_order.len(), 2);
    }
    let bounded = Variant::builtin("classical_bounded").unwrap();
    assert_eq!(bounded.start.pieces.len(), 32);
    assert_eq!(bounded.start.special_rights.len(), 22);
    assert!(bounded.rules.world_border.is_some());
    assert!(matches!(
        Variant::builtin("nonexistent"),
        Err(ConfigError::UnknownVariant(_))
    ));
}

#[test]
fn variant_files_validate() {
    let src = r#"
        name = "lonely"
        position = "K0,0|k5,5"
        [rules]
        turn_order = []
    "#;
    assert!(matches!(Variant::from_toml(src), Err(ConfigError::EmptyTurnOrder)));

    let src = r#"
        name = "guarded"
        position = "K0,0|k5,5|GU2,2"
        [rules]
        turn_order = ["white", "black"]
        slide_limit = 0
        [movesets.gu]
        sliding = [[1, 1]]
    "#;
    let variant = Variant::from_toml(src).unwrap();
    assert_eq!(variant.rules.slide_limit, Some(0));
    assert!(variant.start.special_rights.is_empty());
    let guard = variant.catalog.get(crate::model::RawType::GUARD).unwrap();
    assert_eq!(guard.sliding, vec![crate::model::Direction::DIAGONAL]);
}

#[test]
fn explicit_special_rights_replace_marks() {
    let src = r#"
        name = "castles"
        position = "K5,1+|R1,1+|R8,1+|k5,8"
        special_rights = [[5, 1], [8, 1]]
    "#;
    let variant = Variant::from_toml(src).unwrap();
    assert_eq!(
        variant.start.special_rights,
        vec![Coords::new(5, 1), Coords::new(8, 1)]
    );
    assert_eq!(variant.rules, GameRules::default());
}
