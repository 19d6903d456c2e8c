//! Game rules of a variant.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use strum::EnumIs;

use crate::model::{ByColor, COORD_LIMIT, Coords, PlayerColor, RawType};

/// How a player can win.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    EnumIs, strum::Display, strum::EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WinCondition {
    CHECKMATE,
    ROYALCAPTURE,
    ALLROYALSCAPTURED,
    ALLPIECESCAPTURED,
}

/// Inclusive rectangle outside of which nothing may move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldBorder {
    pub left: i64,
    pub right: i64,
    pub bottom: i64,
    pub top: i64,
}

impl WorldBorder {
    #[inline]
    pub fn contains(&self, c: Coords) -> bool {
        (self.left as i128..=self.right as i128).contains(&c.x)
            && (self.bottom as i128..=self.top as i128).contains(&c.y)
    }

    /// How many whole `step`s fit from `from` before leaving the border.
    pub fn max_steps(&self, from: Coords, step: Coords) -> i128 {
        steps_within(
            from,
            step,
            (self.left as i128, self.right as i128),
            (self.bottom as i128, self.top as i128),
        )
    }
}

/// Whole `step`s from `from` that stay inside the x and y ranges.
fn steps_within(from: Coords, step: Coords, xs: (i128, i128), ys: (i128, i128)) -> i128 {
    let axis = |pos: i128, d: i128, (lo, hi): (i128, i128)| -> i128 {
        match d.signum() {
            1 => (hi - pos).div_euclid(d),
            -1 => (pos - lo).div_euclid(-d),
            _ => i128::MAX,
        }
    };
    axis(from.x, step.x, xs).min(axis(from.y, step.y, ys)).max(0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    pub turn_order: Vec<PlayerColor>,
    pub win_conditions: ByColor<Vec<WinCondition>>,
    pub promotion_ranks: Option<ByColor<Vec<i64>>>,
    pub promotions_allowed: ByColor<Vec<RawType>>,
    /// Plies without capture or pawn move that draw the game.
    pub move_rule: Option<u32>,
    /// Longest slide, in steps. Zero means unlimited.
    pub slide_limit: Option<u64>,
    pub world_border: Option<WorldBorder>,
    pub pawn_push_distance: u32,
}

impl Default for GameRules {
    fn default() -> Self {
        use RawType::*;
        let promotions = vec![QUEEN, ROOK, BISHOP, KNIGHT];
        Self {
            turn_order: vec![PlayerColor::WHITE, PlayerColor::BLACK],
            win_conditions: ByColor::new(
                vec![WinCondition::CHECKMATE],
                vec![WinCondition::CHECKMATE],
            ),
            promotion_ranks: None,
            promotions_allowed: ByColor::new(promotions.clone(), promotions),
            move_rule: Some(100),
            slide_limit: None,
            world_border: None,
            pawn_push_distance: 2,
        }
    }
}

impl GameRules {
    /// Whose turn it is after `ply` moves.
    #[inline]
    pub fn turn_at(&self, ply: usize) -> PlayerColor {
        self.turn_order[ply % self.turn_order.len()]
    }

    /// The distinct players other than `color`, in turn order.
    pub fn opponents(&self, color: PlayerColor) -> Vec<PlayerColor> {
        let mut res = vec![];
        for &c in &self.turn_order {
            if c != color && !res.contains(&c) {
                res.push(c);
            }
        }
        res
    }

    pub fn wins_by(&self, color: PlayerColor, condition: WinCondition) -> bool {
        self.win_conditions
            .get(color)
            .is_some_and(|w| w.contains(&condition))
    }

    /// Whether any opponent of `color` could win by `condition`.
    pub fn opponent_wins_by(&self, color: PlayerColor, condition: WinCondition) -> bool {
        self.opponents(color)
            .into_iter()
            .any(|o| self.wins_by(o, condition))
    }

    pub fn promotion_ranks_of(&self, color: PlayerColor) -> &[i64] {
        self.promotion_ranks
            .as_ref()
            .and_then(|r| r.get(color))
            .map_or(&[], Vec::as_slice)
    }

    pub fn promotions_of(&self, color: PlayerColor) -> &[RawType] {
        self.promotions_allowed.get(color).map_or(&[], Vec::as_slice)
    }

    /// Whether a pawn of `color` arriving at `end` promotes.
    pub fn promotes_at(&self, color: PlayerColor, end: Coords) -> bool {
        !self.promotions_of(color).is_empty()
            && self
                .promotion_ranks_of(color)
                .iter()
                .any(|&r| r as i128 == end.y)
    }

    #[inline]
    pub fn slide_limit(&self) -> Option<i128> {
        self.slide_limit.map(|l| l as i128)
    }

    #[inline]
    pub fn in_bounds(&self, c: Coords) -> bool {
        c.is_representable() && self.world_border.is_none_or(|b| b.contains(c))
    }

    /// Longest ride from `from` with `step`, by limit and border. A
    /// limited ride also stops at [`COORD_LIMIT`].
    pub fn max_slide(&self, from: Coords, step: Coords) -> Option<i128> {
        let border = self.world_border.map(|b| b.max_steps(from, step));
        let reach = match (self.slide_limit(), border) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }?;
        let band = (-COORD_LIMIT, COORD_LIMIT);
        Some(reach.min(steps_within(from, step, band, band)))
    }

    /// Resolve settings that mean something else than they say.
    pub(crate) fn normalize(&mut self, royals: impl Fn(PlayerColor) -> usize) {
        if self.slide_limit == Some(0) {
            warn!("slide limit of 0 read as unlimited");
            self.slide_limit = None;
        }
        if self.pawn_push_distance == 0 {
            warn!("pawn push distance of 0 read as 1");
            self.pawn_push_distance = 1;
        }

        let players = self.opponents(PlayerColor::NEUTRAL);
        for &color in &players {
            if !self.wins_by(color, WinCondition::CHECKMATE) {
                continue;
            }
            let mateable = self
                .opponents(color)
                .into_iter()
                .all(|o| royals(o) == 1);
            if mateable {
                continue;
            }
            info!("{color} cannot checkmate without exactly one enemy royal, using royal capture");
            if let Some(wins) = self.win_conditions.get_mut(color) {
                wins.retain(|w| !w.is_checkmate());
                if !wins.contains(&WinCondition::ROYALCAPTURE) {
                    wins.push(WinCondition::ROYALCAPTURE);
                }
            }
        }
    }
}

#[test]
fn border_clamps_slides() {
    let border = WorldBorder {
        left: 1,
        right: 8,
        bottom: 1,
        top: 8,
    };
    assert_eq!(border.max_steps(Coords::new(1, 1), Coords::new(1, 1)), 7);
    assert_eq!(border.max_steps(Coords::new(4, 1), Coords::new(-1, 0)), 3);
    assert_eq!(border.max_steps(Coords::new(4, 1), Coords::new(0, -1)), 0);
    assert_eq!(border.max_steps(Coords::new(4, 4), Coords::new(1, 2)), 2);
    assert!(!border.contains(Coords::new(0, 4)));
}

#[test]
fn checkmate_needs_a_single_royal() {
    let mut rules = GameRules::default();
    rules.normalize(|c| if c.is_white() { 2 } else { 1 });
    assert!(rules.wins_by(PlayerColor::WHITE, WinCondition::CHECKMATE));
    assert!(!rules.wins_by(PlayerColor::BLACK, WinCondition::CHECKMATE));
    assert!(rules.wins_by(PlayerColor::BLACK, WinCondition::ROYALCAPTURE));
}

#[test]
fn zero_slide_limit_is_unlimited() {
    let mut rules = GameRules {
        slide_limit: Some(0),
        ..Default::default()
    };
    rules.normalize(|_| 1);
    assert_eq!(rules.max_slide(Coords::ORIGIN, Coords::new(1, 0)), None);
}

#[test]
fn limited_rides_stop_at_the_coordinate_limit() {
    let rules = GameRules {
        slide_limit: Some(100),
        ..Default::default()
    };
    let edge = Coords::new(COORD_LIMIT - 10, 0);
    assert_eq!(rules.max_slide(edge, Coords::new(1, 0)), Some(10));
    assert_eq!(rules.max_slide(edge, Coords::new(-1, 0)), Some(100));
    assert!(!rules.in_bounds(Coords::new(COORD_LIMIT + 1, 0)));
}
