//! # Special moves.
//!
//! Pawns, castling royals, and roses move in ways a plain moveset
//! cannot express. Their generators attach a [`SpecialMove`] tag to
//! each target, and the executor turns a tagged draft into board and
//! state changes. Untagged drafts fall through to the generic
//! capture-then-move.

use strum::EnumIs;

use crate::model::{
    Coords, Direction, Piece, PlayerColor, RawType,
    attacking::{AttackSide, is_square_attacked},
    movegen::{MoveMode, MoveTarget},
    moving::{Move, capture_at, lose_special_right, relocate},
    pieces::SlotAllocator,
    position::Position,
    rules::WinCondition,
    state::{EnPassant, StateChange, Transition, create_state},
};

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs)]
pub enum SpecialMove {
    /// The royal moves two squares toward `partner`, which lands on the
    /// square the royal passed.
    CASTLE { dir: i8, partner: Coords },
    /// A multi-square pawn push, opening en passant.
    EN_PASSANT_CREATE(EnPassant),
    /// Captures the pawn at `pawn`, wherever it stands.
    EN_PASSANT { pawn: Coords },
    /// A rose's curved path, squares between start and end.
    ROSE(Vec<Coords>),
}

/// Knight offsets in circular order; a rose turns one notch per hop.
const ROSE_CYCLE: [Coords; 8] = [
    Coords::new(1, 2),
    Coords::new(2, 1),
    Coords::new(2, -1),
    Coords::new(1, -2),
    Coords::new(-1, -2),
    Coords::new(-2, -1),
    Coords::new(-2, 1),
    Coords::new(-1, 2),
];

fn is_opponent(mover: PlayerColor, other: PlayerColor) -> bool {
    other != mover && other != PlayerColor::NEUTRAL
}

fn can_capture(pos: &Position, mover: &Piece, other: &Piece) -> bool {
    pos.catalog
        .get(mover.raw())
        .is_some_and(|m| (m.blocking)(mover.color(), other.kind).is_capture())
}

pub(crate) fn pawn_moves(pos: &Position, piece: &Piece, mode: MoveMode, out: &mut Vec<MoveTarget>) {
    let dy = piece.color().pawn_direction();
    if dy == 0 {
        return;
    }
    let rules = &pos.rules;
    let store = pos.pieces.store();
    let color = piece.color();
    let fwd = Coords::new(0, dy);

    let passable = |c: Coords| {
        rules.in_bounds(c)
            && match store.piece_at(c) {
                None => true,
                Some(p) => mode.is_premove() && is_opponent(color, p.color()),
            }
    };

    let one = piece.coords + fwd;
    if passable(one) {
        out.push(MoveTarget::new(one, None, rules.promotes_at(color, one)));

        let n = rules.pawn_push_distance as i128;
        if n >= 2
            && pos.state.global.special_rights.contains(&piece.coords)
            && (2..=n).all(|k| passable(piece.coords + fwd * k))
        {
            let end = piece.coords + fwd * n;
            let ep = EnPassant {
                square: one,
                pawn: end,
            };
            out.push(MoveTarget::new(
                end,
                Some(SpecialMove::EN_PASSANT_CREATE(ep)),
                rules.promotes_at(color, end),
            ));
        }
    }

    for dx in [-1, 1] {
        let sq = piece.coords + Coords::new(dx, dy);
        if !rules.in_bounds(sq) {
            continue;
        }
        let promotes = rules.promotes_at(color, sq);
        match store.piece_at(sq) {
            Some(other) => {
                if (other.color() != color && can_capture(pos, piece, &other))
                    || (mode.is_premove() && is_opponent(color, other.color()))
                {
                    out.push(MoveTarget::new(sq, None, promotes));
                }
            }
            None => {
                let passant = pos
                    .state
                    .global
                    .en_passant
                    .filter(|ep| ep.square == sq)
                    .filter(|ep| {
                        store
                            .piece_at(ep.pawn)
                            .is_some_and(|p| is_opponent(color, p.color()))
                    });
                if let Some(ep) = passant {
                    out.push(MoveTarget::new(
                        sq,
                        Some(SpecialMove::EN_PASSANT { pawn: ep.pawn }),
                        promotes,
                    ));
                } else if mode.is_premove() {
                    out.push(MoveTarget::new(sq, None, promotes));
                }
            }
        }
    }
}

/// Pieces on the same rank as `from`, nearest first, toward `dir`.
fn along_rank<'a>(pos: &'a Position, from: Coords, dir: i8) -> Box<dyn Iterator<Item = Piece> + 'a> {
    let store = pos.pieces.store();
    if pos.pieces.lines().tracks(Direction::HORIZONTAL) {
        Box::new(
            pos.pieces
                .lines()
                .walk(Direction::HORIZONTAL, from, dir > 0)
                .filter_map(move |e| store.get(e.index)),
        )
    } else {
        let mut row: Vec<Piece> = store
            .iter()
            .filter(|p| p.coords.y == from.y && (p.coords.x - from.x).signum() == dir as i128)
            .collect();
        row.sort_by_key(|p| p.coords.x.abs_diff(from.x));
        Box::new(row.into_iter())
    }
}

fn castling_partner(pos: &Position, royal: &Piece, dir: i8, mode: MoveMode) -> Option<Piece> {
    let color = royal.color();
    let partner = along_rank(pos, royal.coords, dir)
        .find(|p| !(mode.is_premove() && is_opponent(color, p.color())))?;

    let qualifies = partner.color() == color
        && pos.state.global.special_rights.contains(&partner.coords)
        && partner.raw() != RawType::PAWN
        && !partner.raw().is_royal()
        && partner.coords.x.abs_diff(royal.coords.x) >= 3;
    qualifies.then_some(partner)
}

pub(crate) fn castling_moves(
    pos: &Position,
    piece: &Piece,
    mode: MoveMode,
    out: &mut Vec<MoveTarget>,
) {
    if !pos.state.global.special_rights.contains(&piece.coords) {
        return;
    }
    let color = piece.color();
    let guarded = !mode.is_premove() && pos.rules.opponent_wins_by(color, WinCondition::CHECKMATE);

    for dir in [-1i8, 1] {
        let Some(partner) = castling_partner(pos, piece, dir, mode) else {
            continue;
        };
        let step = Coords::new(dir as i128, 0);
        let end = piece.coords + step * 2;
        if !pos.rules.in_bounds(end) {
            continue;
        }
        if guarded
            && [piece.coords, piece.coords + step]
                .into_iter()
                .any(|sq| is_square_attacked(pos, sq, AttackSide::AGAINST(color)))
        {
            continue;
        }
        out.push(MoveTarget::new(
            end,
            Some(SpecialMove::CASTLE {
                dir,
                partner: partner.coords,
            }),
            false,
        ));
    }
}

/// One reachable end of a rose path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoseHop {
    pub end: Coords,
    /// Squares strictly between start and end.
    pub path: Vec<Coords>,
    pub occupant: Option<Piece>,
}

/// Every square a rose standing on `start` reaches, by its shortest
/// path. Pieces for which `transparent` holds do not stop the rose.
pub(crate) fn rose_hops(
    pos: &Position,
    start: Coords,
    transparent: impl Fn(&Piece) -> bool,
) -> Vec<RoseHop> {
    let mut hops: Vec<RoseHop> = vec![];
    for first in 0..8 {
        for turn in [1, 7] {
            let mut cur = start;
            let mut path = vec![];
            for hop in 0..7 {
                cur = cur + ROSE_CYCLE[(first + turn * hop) % 8];
                if cur == start || !pos.rules.in_bounds(cur) {
                    break;
                }
                let occupant = pos.pieces.piece_at(cur).filter(|p| !transparent(p));
                match hops.iter_mut().find(|h| h.end == cur) {
                    Some(h) if h.path.len() > path.len() => h.path = path.clone(),
                    Some(_) => {}
                    None => hops.push(RoseHop {
                        end: cur,
                        path: path.clone(),
                        occupant,
                    }),
                }
                if occupant.is_some() {
                    break;
                }
                path.push(cur);
            }
        }
    }
    hops
}

pub(crate) fn rose_moves(pos: &Position, piece: &Piece, mode: MoveMode, out: &mut Vec<MoveTarget>) {
    let color = piece.color();
    let hops = rose_hops(pos, piece.coords, |p| {
        mode.is_premove() && is_opponent(color, p.color())
    });
    for hop in hops {
        let lands = match &hop.occupant {
            None => true,
            Some(other) => can_capture(pos, piece, other),
        };
        if lands {
            out.push(MoveTarget::new(hop.end, Some(SpecialMove::ROSE(hop.path)), false));
        }
    }
}

/// Fill in the changes of a tagged draft. False if the draft needs the
/// generic treatment instead.
pub(crate) fn execute(
    pos: &Position,
    mv: &mut Move,
    piece: &Piece,
    alloc: &mut SlotAllocator,
    skip_state: bool,
) -> bool {
    let Some(special) = mv.draft.special.clone() else {
        return false;
    };
    let end = mv.draft.end;

    match special {
        SpecialMove::CASTLE { dir, partner } => {
            let Some(rook) = pos.pieces.piece_at(partner) else {
                return false;
            };
            let rook_end = end - Coords::new(dir as i128, 0);
            capture_at(pos, mv, end, alloc, skip_state);
            capture_at(pos, mv, rook_end, alloc, skip_state);
            relocate(mv, *piece, end, None);
            relocate(mv, rook, rook_end, None);
            if !skip_state {
                lose_special_right(pos, mv, partner);
            }
        }
        SpecialMove::EN_PASSANT { pawn } => {
            capture_at(pos, mv, pawn, alloc, skip_state);
            if pawn != end {
                capture_at(pos, mv, end, alloc, skip_state);
            }
            relocate(mv, *piece, end, None);
        }
        SpecialMove::EN_PASSANT_CREATE(ep) => {
            capture_at(pos, mv, end, alloc, skip_state);
            relocate(mv, *piece, end, None);
            if !skip_state {
                let current = pos.state.global.en_passant;
                create_state(
                    mv,
                    StateChange::EN_PASSANT(Transition::new(current, Some(ep))),
                    None,
                );
            }
        }
        SpecialMove::ROSE(path) => {
            capture_at(pos, mv, end, alloc, skip_state);
            relocate(mv, *piece, end, Some(path));
        }
    }
    true
}
