//! # Move generation.
//!
//! Moves of a piece come in two shapes. Jumps and special moves are
//! listed square by square. Slides are kept as a range of steps per
//! direction, possibly unbounded, and are only ever enumerated when a
//! caller insists (see [`LegalMoves::targets`]).
//!
//! Legality is layered on top as a [`BlessingStrategy`], so the same
//! pseudo-legal generator serves premoves, royal-capture variants, and
//! checkmate variants:
//!
//! - [`NoBlessing`] trusts the pseudo-legal moves
//! - [`LegalBlessing`] removes moves that leave a royal attacked
//!
//! A royal's own slides cannot be filtered as ranges, since the squares
//! it may not step onto are scattered along them. They stay ranges,
//! marked unverified, and each destination is simulated when asked for
//! through [`legal_target`].

use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;
use strum::EnumIs;

use crate::{
    error::EngineError,
    model::{
        Coords, Direction, LegalMove, Piece, PlayerColor, PseudoLegal,
        attacking::{AttackKind, Attacker, AttackSide, attackers},
        check::{royal_attackers, royals_of},
        movesets::{Blocking, IgnoreFn},
        moving::{BoardChange, MoveDraft, apply_changes, generate_move},
        position::Position,
        rules::WinCondition,
        specials::{self, SpecialMove},
    },
};

/// Distance from a piece within which its leaps, pawn captures, and
/// rose paths can land.
pub const HORIZON_MARGIN: i128 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIs)]
pub enum MoveMode {
    PSEUDO,
    /// Speculative moves for a player waiting on their opponent: enemy
    /// pieces may have left by then, so they neither block nor protect.
    PREMOVE,
}

/// A listed destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MoveTarget {
    pub end: Coords,
    pub special: Option<SpecialMove>,
    pub promotes: bool,
}

impl MoveTarget {
    pub fn new(end: Coords, special: Option<SpecialMove>, promotes: bool) -> Self {
        Self {
            end,
            special,
            promotes,
        }
    }
}

/// Reach of a slide in steps each way; `None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideRange {
    pub backward: Option<i128>,
    pub forward: Option<i128>,
}

impl SlideRange {
    #[inline]
    pub fn allows(&self, k: i128) -> bool {
        match k.signum() {
            1 => self.forward.is_none_or(|f| k <= f),
            -1 => self.backward.is_none_or(|b| -k <= b),
            _ => false,
        }
    }

    #[inline]
    pub fn is_bounded(&self) -> bool {
        self.backward.is_some() && self.forward.is_some()
    }
}

/// Everything one piece may do.
#[derive(Debug, Clone)]
pub struct LegalMoves {
    pub start: Coords,
    pub individual: Vec<MoveTarget>,
    pub sliding: IndexMap<Direction, SlideRange>,
    pub ignore: Option<IgnoreFn>,
    /// Slide destinations may still expose a royal; see
    /// [`legal_target`].
    pub slides_unverified: bool,
}

impl LegalMoves {
    fn new(start: Coords, ignore: Option<IgnoreFn>) -> Self {
        Self {
            start,
            individual: vec![],
            sliding: IndexMap::new(),
            ignore,
            slides_unverified: false,
        }
    }

    #[inline]
    fn skips(&self, end: Coords) -> bool {
        self.ignore.is_some_and(|f| f(self.start, end))
    }

    /// Whether some slide lands on `end`.
    pub fn slides_to(&self, end: Coords) -> bool {
        end.is_representable()
            && !self.skips(end)
            && self.sliding.iter().any(|(dir, range)| {
                dir.multiple_of(end - self.start)
                    .is_some_and(|k| range.allows(k))
            })
    }

    /// The move landing on `end`, if any. Listed moves win over slides,
    /// as they carry the special tags. Unverified slides are taken on
    /// trust.
    pub fn find(&self, end: Coords) -> Option<MoveTarget> {
        if let Some(t) = self.individual.iter().find(|t| t.end == end) {
            return Some(t.clone());
        }
        self.slides_to(end).then(|| MoveTarget::new(end, None, false))
    }

    #[inline]
    pub fn contains(&self, end: Coords) -> bool {
        self.find(end).is_some()
    }

    pub fn has_any(&self) -> bool {
        if !self.individual.is_empty() {
            return true;
        }
        self.sliding.iter().any(|(dir, range)| {
            [1i128, -1].into_iter().any(|sign| {
                let reach = if sign > 0 { range.forward } else { range.backward };
                match reach {
                    // A ride out to infinity always crosses a landable
                    // square; ignore predicates only thin them out.
                    None => true,
                    Some(r) => (1..=r).any(|k| !self.skips(self.start + dir.step() * (k * sign))),
                }
            })
        })
    }

    pub fn is_bounded(&self) -> bool {
        self.sliding.values().all(SlideRange::is_bounded)
    }

    /// Every destination, or an error if a slide is unbounded.
    pub fn targets(&self) -> Result<Vec<MoveTarget>, EngineError> {
        let mut res = self.individual.clone();
        for (dir, range) in &self.sliding {
            let (Some(back), Some(fwd)) = (range.backward, range.forward) else {
                return Err(EngineError::UnboundedMoves(self.start));
            };
            for k in (-back..=fwd).filter(|&k| k != 0) {
                let end = self.start + dir.step() * k;
                if !self.skips(end) && !res.iter().any(|t| t.end == end) {
                    res.push(MoveTarget::new(end, None, false));
                }
            }
        }
        Ok(res)
    }
}

/// How far a slide gets from `piece` before the first piece in the
/// way, in steps. `None` if nothing is in the way.
fn slide_reach(pos: &Position, piece: &Piece, dir: Direction, forward: bool, mode: MoveMode) -> Option<i128> {
    let moveset = pos.catalog.get(piece.raw())?;
    let store = pos.pieces.store();
    for entry in pos.pieces.lines().walk(dir, piece.coords, forward) {
        let Some(other) = store.get(entry.index) else {
            continue;
        };
        if moveset.ignores(piece.coords, other.coords) {
            continue;
        }
        let opponent = other.color() != piece.color() && other.color() != PlayerColor::NEUTRAL;
        if mode.is_premove() && opponent {
            continue;
        }
        let steps = dir.steps_between(piece.coords, other.coords).abs();
        return Some(match (moveset.blocking)(piece.color(), other.kind) {
            Blocking::CAPTURE => steps,
            Blocking::STOP => steps - 1,
        });
    }
    None
}

fn min_reach(a: Option<i128>, b: Option<i128>) -> Option<i128> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// How the piece moves, ignoring whether it exposes its royals.
pub fn pseudo_legal_moves(pos: &Position, piece: &Piece, mode: MoveMode) -> LegalMoves {
    let Some(moveset) = pos.catalog.get(piece.raw()) else {
        return LegalMoves::new(piece.coords, None);
    };
    let mut moves = LegalMoves::new(piece.coords, moveset.ignore);
    let store = pos.pieces.store();

    for &offset in &moveset.individual {
        let end = piece.coords + offset;
        if !pos.rules.in_bounds(end) {
            continue;
        }
        let lands = match store.piece_at(end) {
            None => true,
            Some(other) if mode.is_premove() && other.color() != piece.color() => {
                other.color() != PlayerColor::NEUTRAL
                    || (moveset.blocking)(piece.color(), other.kind).is_capture()
            }
            Some(other) => (moveset.blocking)(piece.color(), other.kind).is_capture(),
        };
        if lands {
            moves.individual.push(MoveTarget::new(end, None, false));
        }
    }

    for &dir in &moveset.sliding {
        let mut reach = [None; 2];
        for (i, forward) in [false, true].into_iter().enumerate() {
            let step = if forward { dir.step() } else { -dir.step() };
            reach[i] = min_reach(
                slide_reach(pos, piece, dir, forward, mode),
                pos.rules.max_slide(piece.coords, step),
            );
        }
        moves.sliding.insert(
            dir,
            SlideRange {
                backward: reach[0],
                forward: reach[1],
            },
        );
    }

    match moveset.special {
        Some(kind) if kind.is_pawns() => specials::pawn_moves(pos, piece, mode, &mut moves.individual),
        Some(kind) if kind.is_kings() => specials::castling_moves(pos, piece, mode, &mut moves.individual),
        Some(_) => specials::rose_moves(pos, piece, mode, &mut moves.individual),
        None => {}
    }

    moves
}

/// Whether playing `target` with `piece` leaves any royal of its color
/// attacked. The board is restored before returning.
fn exposes_royal(pos: &mut Position, piece: &Piece, target: &MoveTarget) -> bool {
    let draft = MoveDraft {
        start: piece.coords,
        end: target.end,
        promotion: None,
        special: target.special.clone(),
    };
    let Ok(mv) = generate_move(pos, &draft, true) else {
        return true;
    };
    apply_changes(&mut pos.pieces, &mv.changes, true);
    let exposed = royals_of(pos, piece.color())
        .iter()
        .any(|r| !attackers(pos, r.coords, AttackSide::AGAINST(piece.color()), Some(1)).is_empty());
    apply_changes(&mut pos.pieces, &mv.changes, false);
    exposed
}

/// How removing a piece changes the attacks on its royals.
#[derive(Debug, Clone, Copy)]
enum Pin {
    FREE,
    ALONG(Direction),
    FROZEN,
}

fn pin_of(pos: &mut Position, piece: &Piece) -> Pin {
    let color = piece.color();
    let before: HashSet<Attacker> = royal_attackers(pos, color, None).into_iter().collect();

    let lifted = BoardChange::DELETE { piece: *piece };
    apply_changes(&mut pos.pieces, std::slice::from_ref(&lifted), true);
    let after = royal_attackers(pos, color, None);
    apply_changes(&mut pos.pieces, std::slice::from_ref(&lifted), false);

    let mut pin = Pin::FREE;
    for a in after.into_iter().filter(|a| !before.contains(a)) {
        let AttackKind::SLIDING(d) = a.kind else {
            return Pin::FROZEN;
        };
        match pin {
            Pin::FREE => pin = Pin::ALONG(d),
            Pin::ALONG(p) if p == d => {}
            _ => return Pin::FROZEN,
        }
    }
    pin
}

/// Candidate squares that might resolve a check: the checkers
/// themselves, and every square between a checker and its target that
/// this piece's slides cross.
fn evasion_squares(moves: &LegalMoves, attackers: &[Attacker]) -> Vec<Coords> {
    let mut res = vec![];
    let mut add = |c: Coords| {
        if !res.contains(&c) {
            res.push(c);
        }
    };
    for a in attackers {
        add(a.coords);
        match &a.kind {
            AttackKind::INDIVIDUAL => {}
            AttackKind::PATH(path) => path.iter().copied().for_each(&mut add),
            AttackKind::SLIDING(e) => {
                let span = e.multiple_of(a.coords - a.target).unwrap_or(0);
                let e = if span < 0 { -e.step() } else { e.step() };
                let span = span.abs();
                let w = a.target - moves.start;
                for d in moves.sliding.keys() {
                    let d = d.step();
                    let cross = |u: Coords, v: Coords| u.x * v.y - u.y * v.x;
                    let det = cross(d, e);
                    if det == 0 {
                        continue;
                    }
                    let (s, t) = (cross(w, e), cross(w, d));
                    if s % det != 0 || t % det != 0 {
                        continue;
                    }
                    let t = t / det;
                    if 0 < t && t < span {
                        add(a.target + e * t);
                    }
                }
            }
        }
    }
    res
}

/// Strategy to turn pseudo-legal moves into the moves handed out.
pub trait BlessingStrategy {
    type Blessing;

    fn bless_piece(pos: &mut Position, piece: &Piece) -> LegalMoves;

    fn wrap(draft: MoveDraft) -> Self::Blessing;
}

/// Pseudo-legal moves as they are.
pub struct NoBlessing;

impl BlessingStrategy for NoBlessing {
    type Blessing = PseudoLegal;

    fn bless_piece(pos: &mut Position, piece: &Piece) -> LegalMoves {
        pseudo_legal_moves(pos, piece, MoveMode::PSEUDO)
    }

    fn wrap(draft: MoveDraft) -> Self::Blessing {
        PseudoLegal(draft)
    }
}

/// Only moves that leave no royal attacked, where that matters.
pub struct LegalBlessing;

impl BlessingStrategy for LegalBlessing {
    type Blessing = LegalMove;

    fn bless_piece(pos: &mut Position, piece: &Piece) -> LegalMoves {
        legal_moves(pos, piece)
    }

    fn wrap(draft: MoveDraft) -> Self::Blessing {
        LegalMove(draft)
    }
}

/// Legal moves of a piece.
///
/// Royals only need protecting against an opponent who wins by
/// checkmate; otherwise moving into danger is allowed and this is the
/// pseudo-legal set. The slides of royals, and of riders pinned where
/// skipping riders exist, come back unverified.
pub fn legal_moves(pos: &mut Position, piece: &Piece) -> LegalMoves {
    let mut moves = pseudo_legal_moves(pos, piece, MoveMode::PSEUDO);
    let color = piece.color();
    if !pos.rules.opponent_wins_by(color, WinCondition::CHECKMATE) || royals_of(pos, color).is_empty() {
        return moves;
    }

    let individual = std::mem::take(&mut moves.individual);
    moves.individual = individual
        .into_iter()
        .filter(|t| !exposes_royal(pos, piece, t))
        .collect();

    if moves.sliding.is_empty() {
        return moves;
    }

    if piece.raw().is_royal() {
        moves.slides_unverified = true;
        return moves;
    }

    let checks = if color == pos.side_to_move() && pos.is_at_front() {
        pos.state.local.attackers.clone()
    } else {
        royal_attackers(pos, color, Some(2))
    };

    if !checks.is_empty() {
        let candidates: Vec<Coords> = evasion_squares(&moves, &checks)
            .into_iter()
            .filter(|&c| moves.slides_to(c) && !moves.individual.iter().any(|t| t.end == c))
            .collect();
        moves.sliding.clear();
        for c in candidates {
            let t = MoveTarget::new(c, None, false);
            if !exposes_royal(pos, piece, &t) {
                moves.individual.push(t);
            }
        }
        return moves;
    }

    match pin_of(pos, piece) {
        Pin::FREE => {}
        Pin::FROZEN => moves.sliding.clear(),
        Pin::ALONG(d) => {
            moves.sliding.retain(|&k, _| k == d);
            // Riders that skip pieces may pin through squares that stop
            // pinning once the piece moves along the line.
            moves.slides_unverified = pos.catalog.has_skippers();
        }
    }
    moves
}

/// The legal move of `piece` landing on `end`, simulating it if it is
/// an unverified slide.
pub fn legal_target(
    pos: &mut Position,
    piece: &Piece,
    moves: &LegalMoves,
    end: Coords,
) -> Option<MoveTarget> {
    let target = moves.find(end)?;
    let listed = moves.individual.iter().any(|t| t.end == end);
    if moves.slides_unverified && !listed && exposes_royal(pos, piece, &target) {
        return None;
    }
    Some(target)
}

/// Steps along `dir` worth simulating to learn whether an unverified
/// slide has any safe square.
///
/// Leaps, pawns, and roses only reach squares near some piece, and a
/// rider off the line attacks at most the one square where its line
/// crosses. Every other square of a ray is attacked alike, except by
/// riders that skip pieces at some distances, so a few of them stand
/// for the rest.
fn slide_candidates(pos: &Position, start: Coords, dir: Direction, range: &SlideRange) -> Vec<i128> {
    let step = dir.step();
    let unit = if dir.dx() != 0 { dir.dx() } else { dir.dy() };
    let cross = |u: Coords, v: Coords| u.x * v.y - u.y * v.x;
    let mut near = BTreeSet::new();

    for piece in pos.pieces.store().iter() {
        let lo = dir.along(piece.coords) - HORIZON_MARGIN - dir.along(start);
        let hi = lo + 2 * HORIZON_MARGIN;
        for k in -(-lo).div_euclid(unit)..=hi.div_euclid(unit) {
            if (start + step * k).chebyshev(piece.coords) <= HORIZON_MARGIN as u128 {
                near.insert(k);
            }
        }
        for &e in pos.catalog.directions() {
            let det = cross(step, e.step());
            let num = cross(piece.coords - start, e.step());
            if det != 0 && num % det == 0 {
                near.insert(num / det);
            }
        }
    }

    let lands = |k: i128| {
        range.allows(k) && k.unsigned_abs() <= 1 << 102 && (start + step * k).is_representable()
    };
    let mut res: Vec<i128> = near.iter().copied().filter(|&k| lands(k)).collect();
    for sign in [1i128, -1] {
        let mut k = sign;
        let mut beyond = 0;
        while beyond < 4 && lands(k) {
            if !near.contains(&k) {
                res.push(k);
                beyond += 1;
            }
            k += sign;
        }
    }
    res.sort_by_key(|k| k.unsigned_abs());
    res
}

/// Whether a piece can move at all, simulating unverified slides.
fn has_any_legal(pos: &mut Position, piece: &Piece, moves: &LegalMoves) -> bool {
    if !moves.slides_unverified || !moves.individual.is_empty() {
        return moves.has_any();
    }
    for (&dir, range) in &moves.sliding {
        for k in slide_candidates(pos, moves.start, dir, range) {
            let end = moves.start + dir.step() * k;
            if !moves.skips(end) && !exposes_royal(pos, piece, &MoveTarget::new(end, None, false)) {
                return true;
            }
        }
    }
    false
}

/// Every blessed move of the side to move, promotions spelled out.
pub fn enumerate<L: BlessingStrategy>(
    pos: &mut Position,
    buffer: &mut Vec<L::Blessing>,
) -> Result<(), EngineError> {
    let color = pos.side_to_move();
    let pieces: Vec<Piece> = pos.pieces.store().of_color(color).collect();
    for piece in pieces {
        let moves = L::bless_piece(pos, &piece);
        for target in moves.targets()? {
            if moves.slides_unverified
                && !moves.individual.contains(&target)
                && exposes_royal(pos, &piece, &target)
            {
                continue;
            }
            let draft = MoveDraft {
                start: piece.coords,
                end: target.end,
                promotion: None,
                special: target.special,
            };
            if target.promotes {
                for &raw in pos.rules.promotions_of(color) {
                    buffer.push(L::wrap(draft.clone().promoting(raw)));
                }
            } else {
                buffer.push(L::wrap(draft));
            }
        }
    }
    Ok(())
}

/// Whether `color` has any legal move at all, stopping at the first.
pub fn has_legal_move(pos: &mut Position, color: PlayerColor) -> bool {
    let pieces: Vec<Piece> = pos.pieces.store().of_color(color).collect();
    pieces.iter().any(|p| {
        let moves = legal_moves(pos, p);
        has_any_legal(pos, p, &moves)
    })
}
