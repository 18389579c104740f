use sheep_grid::{Action, GridPosition};
use sheep_script::SessionId;
use sheep_wasm_engine::{BridgeConfig, GuestBridge, GuestRunner};
use sheepcraft::{load_board, Error, Playthrough, RunFailure, RunOutcome};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const GUEST: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../testdata/guest.wat"
));

/// The test guest answers every clean run with three `forward` markers for
/// session "t3st".
fn playthrough() -> Playthrough {
    Playthrough::with_session(SessionId::new("t3st").unwrap()).with_delay(Duration::ZERO)
}

async fn bridge() -> GuestBridge {
    let bridge =
        GuestBridge::spawn(GuestRunner::new(GUEST, BridgeConfig::default()).unwrap()).unwrap();
    bridge.init().await.unwrap();
    bridge
}

fn level(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

const STRAIGHT_RUN: &str = r#"
[board]
size = 4
exit = { x = 1, y = 0 }
player = { position = { x = 1, y = 3 } }
"#;

#[tokio::test]
async fn clean_run_reaches_exit() {
    let bridge = bridge().await;
    let file = level(STRAIGHT_RUN);
    let mut board = load_board(file.path()).unwrap();

    let outcome = playthrough()
        .run(&bridge, &mut board, "forward(3)")
        .await
        .unwrap();

    assert!(outcome.solved(), "{outcome:?}");
    let trace = outcome.trace().unwrap();
    assert_eq!(trace.actions(), &[Action::Forward; 3]);
    assert_eq!(trace.call_count(), 1);
    assert_eq!(trace.size(), 10);
    assert_eq!(outcome.output(), ["hello from guest".to_string()]);
    assert_eq!(board.agent().pos, GridPosition::new(1, 0));
}

#[tokio::test]
async fn action_limit_fails_an_otherwise_solved_level() {
    let bridge = bridge().await;
    let file = level(&format!("{STRAIGHT_RUN}\n[board.limits]\nmax_actions = 2\n"));
    let mut board = load_board(file.path()).unwrap();

    let outcome = playthrough()
        .run(&bridge, &mut board, "forward(3)")
        .await
        .unwrap();

    let solve = outcome.solve();
    assert!(solve.player_on_exit);
    assert_eq!(solve.actions.map(|t| t.solved), Some(false));
    assert!(!solve.solved);
    assert!(!outcome.solved());
}

#[tokio::test]
async fn guest_error_still_replays_emitted_actions() {
    let bridge = bridge().await;
    let file = level(STRAIGHT_RUN);
    let mut board = load_board(file.path()).unwrap();

    // '#' makes the test guest report a runtime error next to its transcript
    let outcome = playthrough()
        .run(&bridge, &mut board, "forward(3) # then fail")
        .await
        .unwrap();

    match &outcome {
        RunOutcome::Failed {
            failure: RunFailure::Guest { exit_code, stderr },
            trace: Some(trace),
            ..
        } => {
            assert_eq!(*exit_code, 1);
            assert_eq!(stderr, "runtime error: boom");
            assert_eq!(trace.actions().len(), 3);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(!outcome.solved());
    assert_eq!(board.agent().pos, GridPosition::new(1, 0));
}

#[tokio::test]
async fn trap_is_a_failed_run_and_next_run_recovers() {
    let bridge = bridge().await;
    let file = level(STRAIGHT_RUN);

    let mut board = load_board(file.path()).unwrap();
    let outcome = playthrough()
        .run(&bridge, &mut board, "panic!()")
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        RunOutcome::Failed {
            failure: RunFailure::Guest { exit_code: -1, .. },
            ..
        }
    ));
    assert_eq!(board.agent().pos, GridPosition::new(1, 3));

    let mut board = load_board(file.path()).unwrap();
    let outcome = playthrough()
        .run(&bridge, &mut board, "forward(3)")
        .await
        .unwrap();
    assert!(outcome.solved());
}

#[tokio::test]
async fn markers_from_another_session_are_plain_output() {
    let bridge = bridge().await;
    let file = level(STRAIGHT_RUN);
    let mut board = load_board(file.path()).unwrap();

    let outcome = Playthrough::with_session(SessionId::new("other").unwrap())
        .with_delay(Duration::ZERO)
        .run(&bridge, &mut board, "forward(3)")
        .await
        .unwrap();

    assert!(outcome.trace().unwrap().actions().is_empty());
    assert!(!outcome.solve().player_on_exit);
    assert_eq!(outcome.output().len(), 11);
}

#[test]
fn invalid_level_is_a_grid_error() {
    let file = level(
        r#"
[board]
size = 3
exit = { x = 5, y = 0 }
player = { position = { x = 1, y = 1 } }
"#,
    );
    assert!(matches!(load_board(file.path()), Err(Error::Grid(_))));
}
