//! The compact export of a game: where it started, under which rules,
//! and the moves since, in coordinate notation.

use indexmap::IndexMap;
use serde::Serialize;

use crate::{
    model::{
        PieceType, gameover::GameConclusion, position::Position, rules::GameRules,
        state::EnPassant,
    },
    notation::CoordNotation,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Compressed {
    pub metadata: IndexMap<String, String>,
    pub position_string: String,
    /// Pieces of the starting position keyed by `x,y`.
    pub starting_position: IndexMap<String, PieceType>,
    pub special_rights: Vec<String>,
    pub game_rules: GameRules,
    pub moves: Vec<String>,
    #[serde(rename = "enpassant", skip_serializing_if = "Option::is_none")]
    pub en_passant: Option<EnPassant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub move_rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<GameConclusion>,
}

impl Position {
    /// Export the game, every move up to the front included.
    pub fn compress(&self, metadata: IndexMap<String, String>) -> Compressed {
        let mut metadata = metadata;
        metadata
            .entry("Variant".to_string())
            .or_insert_with(|| self.name.clone());

        Compressed {
            metadata,
            position_string: self.start.to_string(),
            starting_position: self
                .start
                .pieces
                .iter()
                .map(|(c, k)| (c.to_string(), *k))
                .collect(),
            special_rights: self.start.special_rights.iter().map(|c| c.to_string()).collect(),
            game_rules: self.rules.clone(),
            moves: self
                .moves
                .iter()
                .map(|mv| CoordNotation::from(&mv.draft).to_string())
                .collect(),
            en_passant: self.start_state.en_passant,
            move_rule: match (self.start_state.move_rule_state, self.rules.move_rule) {
                (Some(count), Some(limit)) => Some(format!("{count}/{limit}")),
                _ => None,
            },
            conclusion: self.conclusion,
        }
    }
}

#[test]
fn compressed_games_serialize() {
    use crate::model::{Coords, moving::MoveDraft};

    let mut pos = Position::builtin("classical").unwrap();
    pos.play(MoveDraft::new(Coords::new(5, 2), Coords::new(5, 4)))
        .unwrap();
    pos.play(MoveDraft::new(Coords::new(7, 8), Coords::new(6, 6)))
        .unwrap();

    let out = pos.compress(IndexMap::from([("Event".to_string(), "test".to_string())]));
    assert_eq!(out.moves, vec!["5,2>5,4", "7,8>6,6"]);
    assert_eq!(out.starting_position.len(), 32);
    assert_eq!(out.starting_position["5,1"].to_string(), "K");

    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["metadata"]["Variant"], "classical");
    assert_eq!(json["moveRule"], "0/100");
    assert_eq!(json["gameRules"]["turn_order"][0], "white");
    assert!(json.get("enpassant").is_none());
    assert!(json.get("conclusion").is_none());
    assert!(json["positionString"].as_str().unwrap().starts_with("P1,2+"));
}
