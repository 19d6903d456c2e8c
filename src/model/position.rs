//! # The position.
//!
//! [`Position`] owns the pieces, the rules, the state, and the move
//! history, and is the one place where moves are made, taken back, or
//! browsed. Two rules hold throughout:
//!
//! - moves are only made or taken back at the front of the game
//! - viewing an earlier ply replays local state only, so the game's
//!   special rights, en passant, and move-rule counter stay those of
//!   the front

use std::fmt::Debug;

use log::{debug, info};

use crate::{
    error::{ConfigError, EngineError},
    model::{
        Coords, LegalMove, Piece, PlayerColor,
        attacking::{AttackSide, Attacker, attackers},
        check::{royal_attackers, royals_in_check},
        events::{PositionEvent, PositionObserver},
        gameover::{GameConclusion, detect_conclusion},
        movegen::{LegalMoves, MoveMode, legal_moves, legal_target, pseudo_legal_moves},
        movesets::MovesetCatalog,
        moving::{Move, MoveDraft, apply_move, generate_move, make_legal_move, unmake_legal_move},
        pieces::OrganizedPieces,
        rules::{GameRules, WinCondition},
        state::{BoardState, GlobalState},
        variant::{StartingPosition, Variant},
    },
};

pub struct Position {
    pub(crate) name: String,
    pub(crate) pieces: OrganizedPieces,
    pub(crate) catalog: MovesetCatalog,
    pub(crate) rules: GameRules,
    pub(crate) state: BoardState,
    pub(crate) moves: Vec<Move>,
    pub(crate) start: StartingPosition,
    pub(crate) start_state: GlobalState,
    pub(crate) conclusion: Option<GameConclusion>,
    observers: Vec<Box<dyn PositionObserver>>,
}

impl Debug for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Position")
            .field("name", &self.name)
            .field("pieces", &self.pieces.store().len())
            .field("moves", &self.moves.len())
            .field("move_index", &self.state.local.move_index)
            .field("conclusion", &self.conclusion)
            .finish()
    }
}

/// The parts of a position a replay must restore exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub pieces: OrganizedPieces,
    pub state: BoardState,
}

impl Position {
    pub fn new(variant: Variant) -> Result<Self, ConfigError> {
        let Variant {
            name,
            start,
            mut rules,
            catalog,
        } = variant;

        let mut pieces = OrganizedPieces::new(catalog.directions().iter().copied());
        for &(coords, kind) in &start.pieces {
            if !coords.is_representable() {
                return Err(ConfigError::OutOfRange(coords));
            }
            pieces.add(coords, kind)?;
        }

        let mut global = GlobalState::default();
        for &c in &start.special_rights {
            if pieces.piece_at(c).is_none() {
                return Err(ConfigError::DanglingSpecialRight(c));
            }
            global.special_rights.insert(c);
        }
        global.move_rule_state = rules.move_rule.map(|_| 0);

        rules.normalize(|color| {
            pieces
                .store()
                .of_color(color)
                .filter(|p| p.raw().is_royal())
                .count()
        });

        let mut pos = Self {
            name,
            pieces,
            catalog,
            rules,
            state: BoardState {
                global: global.clone(),
                local: Default::default(),
            },
            moves: vec![],
            start,
            start_state: global,
            conclusion: None,
            observers: vec![],
        };

        let color = pos.side_to_move();
        pos.state.local.in_check = royals_in_check(&pos, color);
        if !pos.state.local.in_check.is_empty()
            && pos.rules.opponent_wins_by(color, WinCondition::CHECKMATE)
        {
            pos.state.local.attackers = royal_attackers(&pos, color, Some(2));
        }
        debug!("set up {:?} with {} pieces", pos.name, pos.pieces.store().len());
        Ok(pos)
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Self::new(Variant::from_toml(s)?)
    }

    pub fn builtin(name: &str) -> Result<Self, ConfigError> {
        Self::new(Variant::builtin(name)?)
    }

    /// Classical rules around a bare position string.
    pub fn from_position_string(s: &str) -> Result<Self, ConfigError> {
        Self::new(Variant::from_position_string(s)?)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn pieces(&self) -> &OrganizedPieces {
        &self.pieces
    }

    #[inline]
    pub fn catalog(&self) -> &MovesetCatalog {
        &self.catalog
    }

    #[inline]
    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    #[inline]
    pub fn state(&self) -> &BoardState {
        &self.state
    }

    #[inline]
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    #[inline]
    pub fn conclusion(&self) -> Option<GameConclusion> {
        self.conclusion
    }

    #[inline]
    pub fn piece_at(&self, coords: Coords) -> Option<Piece> {
        self.pieces.piece_at(coords)
    }

    /// The player to move at the viewed ply.
    #[inline]
    pub fn side_to_move(&self) -> PlayerColor {
        self.rules.turn_at(self.state.local.move_index)
    }

    #[inline]
    pub fn is_at_front(&self) -> bool {
        self.state.local.move_index == self.moves.len()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            pieces: self.pieces.clone(),
            state: self.state.clone(),
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn PositionObserver>) {
        self.observers.push(observer);
    }

    fn notify(&mut self, event: PositionEvent) {
        for o in &mut self.observers {
            o.notify(&event);
        }
    }

    pub fn attackers_of(&self, coords: Coords, color: PlayerColor) -> Vec<Attacker> {
        attackers(self, coords, AttackSide::OF(color), None)
    }

    pub fn is_in_check(&self, color: PlayerColor) -> bool {
        !royals_in_check(self, color).is_empty()
    }

    pub fn legal_moves_at(&mut self, coords: Coords) -> Option<LegalMoves> {
        let piece = self.piece_at(coords)?;
        Some(legal_moves(self, &piece))
    }

    pub fn pseudo_legal_moves_at(&self, coords: Coords, mode: MoveMode) -> Option<LegalMoves> {
        let piece = self.piece_at(coords)?;
        Some(pseudo_legal_moves(self, &piece, mode))
    }

    /// Check a requested move and attach the special tag its
    /// destination needs.
    pub fn legalize(&mut self, draft: MoveDraft) -> Result<LegalMove, EngineError> {
        if !self.is_at_front() {
            return Err(EngineError::NotAtFront);
        }
        if self.conclusion.is_some() {
            return Err(EngineError::GameOver);
        }
        let piece = self
            .piece_at(draft.start)
            .ok_or(EngineError::NoPieceAt(draft.start))?;
        if piece.color() != self.side_to_move() {
            return Err(EngineError::NotYourTurn(piece.color()));
        }

        let moves = legal_moves(self, &piece);
        let Some(target) = legal_target(self, &piece, &moves, draft.end) else {
            return Err(EngineError::IllegalMove(draft));
        };
        let promotion = match (target.promotes, draft.promotion) {
            (true, Some(raw)) if self.rules.promotions_of(piece.color()).contains(&raw) => Some(raw),
            (false, None) => None,
            _ => return Err(EngineError::IllegalMove(draft)),
        };
        Ok(LegalMove(MoveDraft {
            start: draft.start,
            end: draft.end,
            promotion,
            special: target.special,
        }))
    }

    /// Make a legal move at the front, then look for the end of the
    /// game.
    pub fn make_move(&mut self, mv: LegalMove) -> Result<&Move, EngineError> {
        if self.conclusion.is_some() {
            return Err(EngineError::GameOver);
        }
        make_legal_move(self, mv)?;
        let ply = self.moves.len();
        self.notify(PositionEvent::MOVE_MADE { ply });

        if let Some(conclusion) = detect_conclusion(self) {
            if let Some(last) = self.moves.last_mut() {
                last.flags.mate = conclusion.condition.is_checkmate();
            }
            self.set_conclusion(conclusion);
        }
        Ok(&self.moves[ply - 1])
    }

    /// [`Self::legalize`] and [`Self::make_move`] in one.
    pub fn play(&mut self, draft: MoveDraft) -> Result<&Move, EngineError> {
        let mv = self.legalize(draft)?;
        self.make_move(mv)
    }

    /// Take back the last move of the game.
    pub fn undo_move(&mut self) -> Result<Move, EngineError> {
        if !self.is_at_front() {
            return Err(EngineError::NotAtFront);
        }
        let mv = unmake_legal_move(self).ok_or(EngineError::NotAtFront)?;
        self.conclusion = None;
        let ply = self.moves.len();
        self.notify(PositionEvent::MOVE_UNMADE { ply });
        Ok(mv)
    }

    /// Show the board as it was after `ply` moves, local state included.
    pub fn view_ply(&mut self, ply: usize) {
        let ply = ply.min(self.moves.len());
        let Self {
            pieces,
            state,
            moves,
            ..
        } = self;
        while state.local.move_index > ply {
            let i = state.local.move_index - 1;
            apply_move(pieces, state, &moves[i], false, false);
            state.local.move_index = i;
        }
        while state.local.move_index < ply {
            let i = state.local.move_index;
            apply_move(pieces, state, &moves[i], true, false);
            state.local.move_index = i + 1;
        }
    }

    /// Work out a move's consequences without making it.
    pub fn generate_move(&self, draft: &MoveDraft, skip_state: bool) -> Result<Move, EngineError> {
        generate_move(self, draft, skip_state)
    }

    /// Replay a move that is not part of the history, as premoves do.
    pub fn apply_edit(&mut self, mv: &Move, forward: bool, global: bool) {
        apply_move(&mut self.pieces, &mut self.state, mv, forward, global);
    }

    /// Record an ending decided elsewhere, like a flag fall.
    pub fn set_conclusion(&mut self, conclusion: GameConclusion) {
        info!("{} concluded: {conclusion}", self.name);
        self.conclusion = Some(conclusion);
        self.notify(PositionEvent::CONCLUDED(conclusion));
    }

    /// Rebuild the line index from the arena.
    pub fn regenerate_pieces(&mut self) {
        self.pieces.regenerate();
        self.notify(PositionEvent::PIECES_REGENERATED);
    }
}
