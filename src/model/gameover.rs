//! # Game conclusions.
//!
//! After every move the position looks for an ending, in this order:
//!
//! 1. a royal captured, for a player winning by royal capture
//! 2. a player's last royal captured
//! 3. a player's last piece captured
//! 4. threefold repetition
//! 5. no legal moves: checkmate if in check, otherwise stalemate
//! 6. the move rule
//!
//! Time, resignation, and aborts come from outside and are only
//! recorded.

use std::{fmt::Display, str::FromStr};

use log::info;
use serde::{Deserialize, Serialize};
use strum::EnumIs;

use crate::model::{
    PlayerColor,
    check::{is_in_check, royals_of},
    movegen::has_legal_move,
    moving::BoardChange,
    position::Position,
    repetition::detect_repetition,
    rules::WinCondition,
};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    EnumIs, strum::Display, strum::EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    CHECKMATE,
    ROYALCAPTURE,
    ALLROYALSCAPTURED,
    ALLPIECESCAPTURED,
    STALEMATE,
    REPETITION,
    MOVERULE,
    TIME,
    RESIGNATION,
    ABORTED,
}

impl From<WinCondition> for Condition {
    fn from(value: WinCondition) -> Self {
        match value {
            WinCondition::CHECKMATE => Condition::CHECKMATE,
            WinCondition::ROYALCAPTURE => Condition::ROYALCAPTURE,
            WinCondition::ALLROYALSCAPTURED => Condition::ALLROYALSCAPTURED,
            WinCondition::ALLPIECESCAPTURED => Condition::ALLPIECESCAPTURED,
        }
    }
}

/// How a game ended. No victor is a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameConclusion {
    pub victor: Option<PlayerColor>,
    pub condition: Condition,
}

impl GameConclusion {
    pub fn win(victor: PlayerColor, condition: Condition) -> Self {
        Self {
            victor: Some(victor),
            condition,
        }
    }

    pub fn draw(condition: Condition) -> Self {
        Self {
            victor: None,
            condition,
        }
    }
}

impl Display for GameConclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.victor {
            Some(v) => write!(f, "{v} {}", self.condition),
            None => write!(f, "draw {}", self.condition),
        }
    }
}

impl FromStr for GameConclusion {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (victor, condition) = s
            .split_once(' ')
            .ok_or(strum::ParseError::VariantNotFound)?;
        let victor = match victor {
            "draw" => None,
            v => Some(v.parse()?),
        };
        Ok(Self {
            victor,
            condition: condition.parse()?,
        })
    }
}

impl Serialize for GameConclusion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn captured_colors(pos: &Position) -> Vec<(PlayerColor, bool)> {
    let Some(mv) = pos.moves.last() else {
        return vec![];
    };
    mv.changes
        .iter()
        .filter_map(|c| match c {
            BoardChange::DELETE { piece } if piece.color() != mv.mover.color => {
                Some((piece.color(), piece.raw().is_royal()))
            }
            _ => None,
        })
        .collect()
}

/// Look for an ending caused by the last move.
pub fn detect_conclusion(pos: &mut Position) -> Option<GameConclusion> {
    let ply = pos.state.local.move_index;
    if ply == 0 {
        return None;
    }
    let mover = pos.rules.turn_at(ply - 1);
    let captured = captured_colors(pos);

    let rules = &pos.rules;
    if rules.wins_by(mover, WinCondition::ROYALCAPTURE) && captured.iter().any(|&(_, royal)| royal) {
        return Some(GameConclusion::win(mover, Condition::ROYALCAPTURE));
    }
    for &(victim, royal) in &captured {
        if royal
            && rules.wins_by(mover, WinCondition::ALLROYALSCAPTURED)
            && royals_of(pos, victim).is_empty()
        {
            return Some(GameConclusion::win(mover, Condition::ALLROYALSCAPTURED));
        }
        if rules.wins_by(mover, WinCondition::ALLPIECESCAPTURED)
            && pos.pieces.store().of_color(victim).next().is_none()
        {
            return Some(GameConclusion::win(mover, Condition::ALLPIECESCAPTURED));
        }
    }

    if detect_repetition(pos) {
        return Some(GameConclusion::draw(Condition::REPETITION));
    }

    let side = pos.side_to_move();
    if !has_legal_move(pos, side) {
        if is_in_check(pos, side) && pos.rules.wins_by(mover, WinCondition::CHECKMATE) {
            return Some(GameConclusion::win(mover, Condition::CHECKMATE));
        }
        return Some(GameConclusion::draw(Condition::STALEMATE));
    }

    if let (Some(limit), Some(count)) = (pos.rules.move_rule, pos.state.global.move_rule_state) {
        if count >= limit {
            info!("move rule reached after {count} plies");
            return Some(GameConclusion::draw(Condition::MOVERULE));
        }
    }

    None
}

#[test]
fn conclusions_print_and_parse() {
    let mate = GameConclusion::win(PlayerColor::WHITE, Condition::CHECKMATE);
    assert_eq!(mate.to_string(), "white checkmate");
    assert_eq!("white checkmate".parse::<GameConclusion>(), Ok(mate));
    let draw = GameConclusion::draw(Condition::REPETITION);
    assert_eq!(draw.to_string(), "draw repetition");
    assert_eq!("draw repetition".parse::<GameConclusion>(), Ok(draw));
    assert!("nobody".parse::<GameConclusion>().is_err());
}
