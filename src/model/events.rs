//! Notifications for whoever mirrors a position, like a renderer.

use crate::model::gameover::GameConclusion;

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionEvent {
    /// The line index was rebuilt from scratch.
    PIECES_REGENERATED,
    MOVE_MADE { ply: usize },
    MOVE_UNMADE { ply: usize },
    CONCLUDED(GameConclusion),
}

pub trait PositionObserver {
    fn notify(&mut self, event: &PositionEvent);
}
