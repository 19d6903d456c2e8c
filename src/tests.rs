//! Whole-game scenarios.

use std::{cell::RefCell, rc::Rc};

use rand::{Rng, SeedableRng, rngs::SmallRng};

use crate::{
    error::{ConfigError, EngineError},
    model::{
        COORD_LIMIT, Coords, LegalMove, PlayerColor, RawType,
        events::{PositionEvent, PositionObserver},
        gameover::{Condition, GameConclusion},
        movegen::{LegalBlessing, enumerate, has_legal_move},
        moving::MoveDraft,
        position::Position,
        specials::SpecialMove,
    },
};

fn draft(a: (i128, i128), b: (i128, i128)) -> MoveDraft {
    MoveDraft::new(Coords::new(a.0, a.1), Coords::new(b.0, b.1))
}

fn play_all(pos: &mut Position, moves: &[((i128, i128), (i128, i128))]) {
    for &(a, b) in moves {
        pos.play(draft(a, b)).unwrap();
    }
}

fn pi_rng() -> SmallRng {
    SmallRng::from_seed(*b"3.141592653589793238462643383279")
}

#[test]
fn random_games_replay_exactly() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut rng = pi_rng();

    for _ in 0..4 {
        let mut pos = Position::builtin("classical_bounded").unwrap();
        let start = pos.snapshot();
        let mut snapshots = vec![start.clone()];
        let mut buf: Vec<LegalMove> = vec![];

        for _ in 0..80 {
            if pos.conclusion().is_some() {
                break;
            }
            buf.clear();
            enumerate::<LegalBlessing>(&mut pos, &mut buf).unwrap();
            if buf.is_empty() {
                break;
            }
            let mover = pos.side_to_move();
            let mv = buf.swap_remove(rng.random_range(0..buf.len()));
            pos.make_move(mv).unwrap();

            assert!(!pos.is_in_check(mover), "{mover} left its king attacked");
            assert!(pos.pieces().is_consistent());
            snapshots.push(pos.snapshot());
        }

        let front = pos.snapshot();
        let plies = pos.moves().len();

        pos.view_ply(0);
        assert!(pos.pieces() == &start.pieces);
        assert_eq!(pos.state().local, start.state.local);
        pos.view_ply(plies / 2);
        assert!(pos.pieces() == &snapshots[plies / 2].pieces);
        pos.view_ply(plies);
        assert!(pos.snapshot() == front);

        while !pos.moves().is_empty() {
            pos.undo_move().unwrap();
            let ply = pos.moves().len();
            assert!(pos.snapshot() == snapshots[ply], "undo diverged at ply {ply}");
        }
        assert!(pos.snapshot() == start);
    }
}

#[test]
fn viewing_history_keeps_the_game_state() {
    let mut pos = Position::builtin("classical").unwrap();
    play_all(&mut pos, &[((5, 2), (5, 4)), ((5, 7), (5, 5))]);
    let after_two = pos.snapshot();
    play_all(&mut pos, &[((5, 1), (5, 2)), ((5, 8), (5, 7))]);
    let front = pos.snapshot();

    pos.view_ply(2);
    assert!(!pos.is_at_front());
    assert!(pos.pieces() == &after_two.pieces);
    assert!(!pos.state().global.special_rights.contains(&Coords::new(5, 1)));
    assert_eq!(pos.state().global, front.state.global);
    assert_eq!(
        pos.play(draft((4, 2), (4, 4))).unwrap_err(),
        EngineError::NotAtFront
    );

    pos.view_ply(100);
    assert!(pos.is_at_front());
    assert!(pos.snapshot() == front);
}

#[test]
fn fools_mate() {
    let mut pos = Position::builtin("classical_bounded").unwrap();
    play_all(
        &mut pos,
        &[((6, 2), (6, 3)), ((5, 7), (5, 5)), ((7, 2), (7, 4))],
    );
    assert_eq!(pos.conclusion(), None);
    let mate = pos.play(draft((4, 8), (8, 4))).unwrap();
    assert!(mate.flags.check && mate.flags.mate);
    assert_eq!(
        pos.conclusion(),
        Some(GameConclusion::win(PlayerColor::BLACK, Condition::CHECKMATE))
    );
    assert_eq!(pos.state().local.in_check, vec![Coords::new(5, 1)]);
    assert_eq!(pos.play(draft((5, 2), (5, 3))).unwrap_err(), EngineError::GameOver);

    pos.undo_move().unwrap();
    assert_eq!(pos.conclusion(), None);
    assert!(pos.state().local.in_check.is_empty());
}

const CORNER: &str = r#"
    name = "corner"
    position = "K1,1|k3,2|q3,3"

    [rules]
    turn_order = ["black", "white"]
    world_border = { left = 1, right = 8, bottom = 1, top = 8 }
"#;

#[test]
fn checkmate_and_stalemate_in_the_corner() {
    let mut pos = Position::from_toml(CORNER).unwrap();
    pos.play(draft((3, 3), (2, 3))).unwrap();
    assert_eq!(
        pos.conclusion(),
        Some(GameConclusion::draw(Condition::STALEMATE))
    );
    assert_eq!(pos.conclusion().unwrap().to_string(), "draw stalemate");

    let mut pos = Position::from_toml(CORNER).unwrap();
    pos.play(draft((3, 3), (2, 2))).unwrap();
    assert_eq!(
        pos.conclusion(),
        Some(GameConclusion::win(PlayerColor::BLACK, Condition::CHECKMATE))
    );
}

#[test]
fn capturing_the_king_wins_without_checkmate() {
    let src = r#"
        name = "regicide"
        position = "K1,1|R2,2|r1,8|k8,8"

        [rules.win_conditions]
        white = ["royalcapture"]
        black = ["royalcapture"]
    "#;
    let mut pos = Position::from_toml(src).unwrap();
    assert!(pos.is_in_check(PlayerColor::WHITE));
    assert!(pos.state().local.attackers.is_empty());

    pos.play(draft((2, 2), (2, 3))).unwrap();
    pos.play(draft((1, 8), (1, 1))).unwrap();
    assert_eq!(
        pos.conclusion(),
        Some(GameConclusion::win(PlayerColor::BLACK, Condition::ROYALCAPTURE))
    );
}

#[test]
fn knights_shuffling_repeat() {
    let out = [((7, 1), (6, 3)), ((7, 8), (6, 6))];
    let back = [((6, 3), (7, 1)), ((6, 6), (7, 8))];

    let mut pos = Position::builtin("classical").unwrap();
    play_all(&mut pos, &out);
    play_all(&mut pos, &back);
    play_all(&mut pos, &out);
    assert_eq!(pos.conclusion(), None);
    play_all(&mut pos, &back);
    assert_eq!(
        pos.conclusion(),
        Some(GameConclusion::draw(Condition::REPETITION))
    );
}

#[test]
fn pawn_moves_restart_the_repetition_count() {
    let out = [((7, 1), (6, 3)), ((7, 8), (6, 6))];
    let back = [((6, 3), (7, 1)), ((6, 6), (7, 8))];

    let mut pos = Position::builtin("classical").unwrap();
    play_all(&mut pos, &out);
    play_all(&mut pos, &back);
    play_all(&mut pos, &[((5, 2), (5, 3)), ((5, 7), (5, 6))]);
    play_all(&mut pos, &out);
    play_all(&mut pos, &back);
    assert_eq!(pos.conclusion(), None);
    play_all(&mut pos, &out);
    play_all(&mut pos, &back);
    assert_eq!(
        pos.conclusion(),
        Some(GameConclusion::draw(Condition::REPETITION))
    );
    assert_eq!(pos.moves().len(), 14);
}

#[test]
fn quiet_moves_run_out_the_move_rule() {
    let src = r#"
        name = "quiet"
        position = "K1,1|N3,3|k8,8|n6,6"

        [rules]
        move_rule = 4
    "#;
    let mut pos = Position::from_toml(src).unwrap();
    play_all(
        &mut pos,
        &[((3, 3), (5, 4)), ((6, 6), (4, 5)), ((5, 4), (3, 3))],
    );
    assert_eq!(pos.state().global.move_rule_state, Some(3));
    assert_eq!(pos.conclusion(), None);
    pos.play(draft((4, 5), (6, 6))).unwrap();
    assert_eq!(
        pos.conclusion(),
        Some(GameConclusion::draw(Condition::MOVERULE))
    );
}

#[test]
fn long_pushes_leave_en_passant_behind() {
    let src = r#"
        name = "long pawns"
        position = "P2,2+|p3,4|K10,1|k10,10"

        [rules]
        pawn_push_distance = 3
    "#;
    let mut pos = Position::from_toml(src).unwrap();
    let push = pos.play(draft((2, 2), (2, 5))).unwrap();
    assert!(matches!(push.draft.special, Some(SpecialMove::EN_PASSANT_CREATE(_))));
    let ep = pos.state().global.en_passant.unwrap();
    assert_eq!(ep.square, Coords::new(2, 3));
    assert_eq!(ep.pawn, Coords::new(2, 5));

    let capture = pos.play(draft((3, 4), (2, 3))).unwrap();
    assert!(capture.flags.capture);
    assert!(pos.piece_at(Coords::new(2, 5)).is_none());
    assert_eq!(pos.piece_at(Coords::new(2, 3)).map(|p| p.color()), Some(PlayerColor::BLACK));
    assert_eq!(pos.state().global.en_passant, None);

    pos.undo_move().unwrap();
    assert_eq!(pos.state().global.en_passant, Some(ep));
    assert_eq!(pos.piece_at(Coords::new(2, 5)).map(|p| p.raw()), Some(RawType::PAWN));

    pos.play(draft((10, 10), (10, 9))).unwrap();
    assert_eq!(pos.state().global.en_passant, None);
    assert!(!pos.legal_moves_at(Coords::new(3, 4)).unwrap().contains(Coords::new(2, 3)));
}

#[test]
fn castling_avoids_attacked_squares() {
    let src = r#"
        name = "castles"
        position = "K5,1+|R8,1+|R1,1+|k5,8|r6,8"

        [rules]
        world_border = { left = 1, right = 8, bottom = 1, top = 8 }
    "#;
    let mut pos = Position::from_toml(src).unwrap();
    let king = pos.legal_moves_at(Coords::new(5, 1)).unwrap();
    assert!(!king.contains(Coords::new(7, 1)));
    let long = king.find(Coords::new(3, 1)).unwrap();
    assert_eq!(
        long.special,
        Some(SpecialMove::CASTLE {
            dir: -1,
            partner: Coords::new(1, 1)
        })
    );

    let before = pos.snapshot();
    pos.play(draft((5, 1), (3, 1))).unwrap();
    assert_eq!(pos.piece_at(Coords::new(3, 1)).map(|p| p.raw()), Some(RawType::KING));
    assert_eq!(pos.piece_at(Coords::new(4, 1)).map(|p| p.raw()), Some(RawType::ROOK));
    let rights = &pos.state().global.special_rights;
    assert!(!rights.contains(&Coords::new(5, 1)));
    assert!(!rights.contains(&Coords::new(1, 1)));
    assert!(rights.contains(&Coords::new(8, 1)));

    pos.undo_move().unwrap();
    assert!(pos.snapshot() == before);
}

#[test]
fn roses_take_the_shortest_open_path() {
    let mut pos = Position::from_position_string("K100,100|k-100,-100|RO0,0").unwrap();
    let hop = pos.play(draft((0, 0), (3, 3))).unwrap();
    let Some(SpecialMove::ROSE(path)) = &hop.draft.special else {
        panic!("rose move without its path: {:?}", hop.draft);
    };
    assert_eq!(path.len(), 1);

    let mut pos =
        Position::from_position_string("K100,100|k-100,-100|RO0,0|GU1,2|GU2,1").unwrap();
    let moves = pos.legal_moves_at(Coords::ORIGIN).unwrap();
    let Some(SpecialMove::ROSE(path)) = moves.find(Coords::new(3, 3)).unwrap().special else {
        panic!("rose cannot reach 3,3 around its guards");
    };
    assert_eq!(path.len(), 5);
    assert!(!path.contains(&Coords::new(1, 2)));
    assert!(!path.contains(&Coords::new(2, 1)));
}

#[test]
fn slides_stop_at_limits_and_blockers() {
    let src = r#"
        name = "fenced"
        position = "K0,0|k10,10|R5,5|N5,20|n5,-20"

        [rules]
        slide_limit = 50
    "#;
    let mut pos = Position::from_toml(src).unwrap();
    let rook = pos.legal_moves_at(Coords::new(5, 5)).unwrap();
    assert!(rook.contains(Coords::new(55, 5)));
    assert!(!rook.contains(Coords::new(56, 5)));
    assert!(rook.contains(Coords::new(-45, 5)));
    assert!(rook.contains(Coords::new(5, 19)));
    assert!(!rook.contains(Coords::new(5, 20)));
    assert!(rook.contains(Coords::new(5, -20)));
    assert!(!rook.contains(Coords::new(5, -21)));
    assert!(rook.is_bounded());
    assert_eq!(rook.targets().unwrap().len(), 50 + 50 + 14 + 25);
}

#[test]
fn far_away_squares_are_ordinary() {
    let far = 1_000_000_000_000_000_000_000_000_000_000i128;
    let mut pos = Position::from_position_string("K0,0|Q0,1|k-5,-5").unwrap();
    let queen = pos.legal_moves_at(Coords::new(0, 1)).unwrap();
    assert!(!queen.is_bounded());
    assert!(queen.contains(Coords::new(far, far + 1)));
    assert!(queen.contains(Coords::new(-far, 1)));
    assert!(matches!(queen.targets(), Err(EngineError::UnboundedMoves(_))));

    pos.play(draft((0, 1), (far, far + 1))).unwrap();
    assert_eq!(pos.piece_at(Coords::new(far, far + 1)).map(|p| p.raw()), Some(RawType::QUEEN));
    assert!(pos.pieces().is_consistent());
}

#[test]
fn royal_riders_reach_past_the_pieces() {
    let mut pos = Position::from_position_string("RQ0,0|k5,5|r1000,7").unwrap();
    assert!(pos.legal_moves_at(Coords::ORIGIN).unwrap().slides_unverified);
    assert!(pos.legalize(draft((0, 0), (0, 1000))).is_ok());
    assert!(pos.legalize(draft((0, 0), (999, 0))).is_ok());
    assert!(pos.legalize(draft((0, 0), (-1_000_000, -1_000_000))).is_ok());
    for attacked in [(1000, 0), (0, 7), (4, 4)] {
        assert!(matches!(
            pos.legalize(draft((0, 0), attacked)),
            Err(EngineError::IllegalMove(_))
        ));
    }
    assert!(has_legal_move(&mut pos, PlayerColor::WHITE));

    let before = pos.snapshot();
    pos.play(draft((0, 0), (0, 1000))).unwrap();
    pos.undo_move().unwrap();
    assert!(pos.snapshot() == before);

    // A rook behind the royal covers the whole file.
    let mut pos = Position::from_position_string("RQ0,0|r0,-5|k5,5").unwrap();
    assert!(pos.is_in_check(PlayerColor::WHITE));
    assert!(matches!(
        pos.legalize(draft((0, 0), (0, 1000))),
        Err(EngineError::IllegalMove(_))
    ));
    assert!(pos.legalize(draft((0, 0), (1000, 0))).is_ok());
    assert!(pos.legalize(draft((0, 0), (0, -5))).is_ok());
}

#[test]
fn squares_past_the_coordinate_limit_are_refused() {
    assert!(matches!(
        Position::from_position_string("K170141183460469231731687303715884105000,0|k0,0"),
        Err(ConfigError::OutOfRange(_))
    ));

    let edge = COORD_LIMIT;
    let src = format!("K0,0|k5,5|R{edge},0|N{},1", edge - 1);
    let mut pos = Position::from_position_string(&src).unwrap();
    assert!(pos.pieces().is_consistent());

    let knight = pos.legal_moves_at(Coords::new(edge - 1, 1)).unwrap();
    assert!(!knight.contains(Coords::new(edge + 1, 2)));
    assert!(knight.contains(Coords::new(edge - 3, 2)));

    for end in [(edge + 1, 0), (i128::MAX, 0), (edge, i128::MIN)] {
        assert!(matches!(
            pos.play(draft((edge, 0), end)),
            Err(EngineError::IllegalMove(_))
        ));
    }
    assert!(pos.attackers_of(Coords::new(i128::MAX, 0), PlayerColor::WHITE).is_empty());

    pos.play(draft((edge, 0), (edge, -1_000_000))).unwrap();
    assert!(pos.pieces().is_consistent());
}

#[test]
fn pinned_riders_keep_their_line() {
    let mut pos = Position::from_position_string("K0,0|R0,3|r0,10|k20,20").unwrap();
    let rook = pos.legal_moves_at(Coords::new(0, 3)).unwrap();
    assert!(rook.contains(Coords::new(0, 9)));
    assert!(rook.contains(Coords::new(0, 10)));
    assert!(!rook.contains(Coords::new(4, 3)));
    assert!(!rook.contains(Coords::new(0, -1)));
}

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<PositionEvent>>>);

impl PositionObserver for Recorder {
    fn notify(&mut self, event: &PositionEvent) {
        self.0.borrow_mut().push(event.clone());
    }
}

#[test]
fn observers_hear_everything() {
    let mut pos = Position::builtin("classical").unwrap();
    let events = Recorder::default();
    pos.add_observer(Box::new(events.clone()));

    pos.play(draft((5, 2), (5, 4))).unwrap();
    pos.undo_move().unwrap();
    pos.regenerate_pieces();
    let flag = GameConclusion::win(PlayerColor::BLACK, Condition::TIME);
    pos.set_conclusion(flag);

    assert_eq!(
        *events.0.borrow(),
        vec![
            PositionEvent::MOVE_MADE { ply: 1 },
            PositionEvent::MOVE_UNMADE { ply: 0 },
            PositionEvent::PIECES_REGENERATED,
            PositionEvent::CONCLUDED(flag),
        ]
    );
    assert_eq!(pos.play(draft((5, 2), (5, 4))).unwrap_err(), EngineError::GameOver);
}

#[test]
fn requests_are_checked() {
    let mut pos = Position::builtin("classical").unwrap();
    assert_eq!(
        pos.play(draft((5, 5), (5, 6))).unwrap_err(),
        EngineError::NoPieceAt(Coords::new(5, 5))
    );
    assert_eq!(
        pos.play(draft((5, 7), (5, 5))).unwrap_err(),
        EngineError::NotYourTurn(PlayerColor::BLACK)
    );
    assert!(matches!(
        pos.play(draft((5, 2), (6, 3))),
        Err(EngineError::IllegalMove(_))
    ));
    assert_eq!(pos.undo_move().unwrap_err(), EngineError::NotAtFront);
}

#[test]
fn pawns_promote_on_their_rank() {
    let src = r#"
        name = "promotion"
        position = "P1,7|K5,1|k8,8"

        [rules]
        promotion_ranks = { white = [8], black = [1] }
    "#;
    let mut pos = Position::from_toml(src).unwrap();
    assert!(matches!(
        pos.play(draft((1, 7), (1, 8))),
        Err(EngineError::IllegalMove(_))
    ));
    assert!(matches!(
        pos.play(draft((1, 7), (1, 8)).promoting(RawType::KING)),
        Err(EngineError::IllegalMove(_))
    ));
    let before = pos.snapshot();
    pos.play(draft((1, 7), (1, 8)).promoting(RawType::QUEEN))
        .unwrap();
    let queen = pos.piece_at(Coords::new(1, 8)).unwrap();
    assert_eq!(queen.raw(), RawType::QUEEN);
    assert_eq!(queen.color(), PlayerColor::WHITE);
    assert!(pos.is_in_check(PlayerColor::BLACK));

    pos.undo_move().unwrap();
    assert!(pos.snapshot() == before);
}
