//! Check detection and the check tracking recorded on each move.

use crate::model::{
    Coords, Piece, PieceType, PlayerColor, RawType,
    attacking::{AttackSide, Attacker, attackers},
    position::Position,
    rules::WinCondition,
    state::{StateChange, Transition, create_state},
};

/// The royal pieces of `color`, in slot order.
pub fn royals_of(pos: &Position, color: PlayerColor) -> Vec<Piece> {
    let store = pos.pieces.store();
    let mut res: Vec<Piece> = [RawType::KING, RawType::ROYAL_QUEEN, RawType::ROYAL_CENTAUR]
        .into_iter()
        .flat_map(|raw| store.of_type(PieceType::new(raw, color)))
        .collect();
    res.sort_by_key(|p| p.index);
    res
}

/// Attacks on any royal of `color`, at most `limit` overall.
pub fn royal_attackers(pos: &Position, color: PlayerColor, limit: Option<usize>) -> Vec<Attacker> {
    let mut res = vec![];
    for royal in royals_of(pos, color) {
        let left = limit.map(|l| l - res.len());
        res.extend(attackers(pos, royal.coords, AttackSide::AGAINST(color), left));
        if limit.is_some_and(|l| res.len() >= l) {
            break;
        }
    }
    res
}

/// The royals of `color` currently attacked.
pub fn royals_in_check(pos: &Position, color: PlayerColor) -> Vec<Coords> {
    royals_of(pos, color)
        .into_iter()
        .filter(|r| !attackers(pos, r.coords, AttackSide::AGAINST(color), Some(1)).is_empty())
        .map(|r| r.coords)
        .collect()
}

#[inline]
pub fn is_in_check(pos: &Position, color: PlayerColor) -> bool {
    !royals_in_check(pos, color).is_empty()
}

/// After a move has been applied, record check tracking for the side
/// now to move on that move, applying it at once.
///
/// Attackers are only tracked when an opponent wins by checkmate, as
/// only then does legal move generation need them.
pub(crate) fn update_check_state(pos: &mut Position) {
    let color = pos.side_to_move();
    let in_check = royals_in_check(pos, color);
    let tracked = if !in_check.is_empty() && pos.rules.opponent_wins_by(color, WinCondition::CHECKMATE) {
        royal_attackers(pos, color, Some(2))
    } else {
        vec![]
    };

    let Some(mv) = pos.moves.last_mut() else {
        return;
    };
    mv.flags.check = !in_check.is_empty();
    if in_check != pos.state.local.in_check {
        let old = pos.state.local.in_check.clone();
        create_state(mv, StateChange::CHECK(Transition::new(old, in_check)), Some(&mut pos.state));
    }
    if tracked != pos.state.local.attackers {
        let old = pos.state.local.attackers.clone();
        create_state(mv, StateChange::ATTACKERS(Transition::new(old, tracked)), Some(&mut pos.state));
    }
}
