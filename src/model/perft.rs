use std::{
    collections::BTreeMap,
    fmt::Display,
    time::{Duration, Instant},
};

use log::info;

use crate::{
    error::EngineError,
    model::{
        LegalMove,
        movegen::{LegalBlessing, enumerate},
        moving::{make_legal_move, unmake_legal_move},
        position::Position,
    },
    notation::CoordNotation,
};

/// Count the move paths of length `depth` from the current position,
/// broken down by first move.
///
/// Only meaningful where every piece has finitely many moves, that is
/// inside a world border or under a slide limit; anything else fails
/// with [`EngineError::UnboundedMoves`]. The position is left as it
/// was found.
pub fn perft(pos: &mut Position, depth: usize) -> Result<PerfTestRes, EngineError> {
    let mut breakdown = BTreeMap::new();
    let now = Instant::now();

    if depth != 0 {
        let mut firstmoves = vec![];
        enumerate::<LegalBlessing>(pos, &mut firstmoves)?;

        for mv in firstmoves {
            let key = CoordNotation::from(&mv.0);
            make_legal_move(pos, mv)?;
            let res = perft_recurse(depth - 1, pos);
            unmake_legal_move(pos);
            breakdown.insert(key, res?);
        }
    }

    Ok(PerfTestRes {
        elapsed_duration: now.elapsed(),
        breakdown,
        depth,
    })
}

fn perft_recurse(depth: usize, pos: &mut Position) -> Result<usize, EngineError> {
    if depth == 0 {
        return Ok(1);
    }
    let mut moves: Vec<LegalMove> = vec![];
    enumerate::<LegalBlessing>(pos, &mut moves)?;
    if depth == 1 {
        return Ok(moves.len());
    }

    let mut res = 0;
    for mv in moves {
        make_legal_move(pos, mv)?;
        let sub = perft_recurse(depth - 1, pos);
        unmake_legal_move(pos);
        res += sub?;
    }
    Ok(res)
}

pub struct PerfTestRes {
    pub depth: usize,
    pub elapsed_duration: Duration,
    pub breakdown: BTreeMap<CoordNotation, usize>,
}

impl PerfTestRes {
    pub fn nodes(&self) -> usize {
        self.breakdown.values().sum()
    }

    pub fn pretty_print(&self) {
        for line in self.to_string().lines() {
            info!("{line}");
        }
    }
}

impl Display for PerfTestRes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Performance test depth {}", self.depth)?;
        for (mv, n) in &self.breakdown {
            writeln!(f, "{}: {}", mv, n)?;
        }
        writeln!(
            f,
            "Time elapsed: {:.02}ms",
            self.elapsed_duration.as_secs_f64() * 1000.0
        )?;
        writeln!(
            f,
            "Nodes per second: {:.02}",
            self.nodes() as f64 / self.elapsed_duration.as_secs_f64()
        )?;
        write!(f, "Nodes searched: {}", self.nodes())
    }
}

#[test]
fn bounded_classical_perft() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut pos = Position::builtin("classical_bounded").unwrap();
    let before = pos.snapshot();

    assert_eq!(perft(&mut pos, 1).unwrap().nodes(), 20);
    assert_eq!(perft(&mut pos, 2).unwrap().nodes(), 400);

    let res = perft(&mut pos, 3).unwrap();
    res.pretty_print();
    assert_eq!(res.nodes(), 8902);
    assert_eq!(res.breakdown.len(), 20);
    assert!(pos.snapshot() == before);
}

#[test]
fn unbounded_boards_refuse_perft() {
    let mut pos = Position::builtin("classical").unwrap();
    assert_eq!(perft(&mut pos, 0).unwrap().nodes(), 0);
    assert!(matches!(
        perft(&mut pos, 1),
        Err(EngineError::UnboundedMoves(_))
    ));
}
