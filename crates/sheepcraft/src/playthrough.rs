use crate::Result;
use sheep_grid::{Board, ExecutionTrace, SolveState};
use sheep_script::{Instrumentor, SessionId};
use sheep_wasm_engine::{ExecuteResult, GuestBridge};
use std::time::Duration;
use thiserror::Error;

/// Logical file name the guest sees for every script.
pub const ENTRY_NAME: &str = "main.goose";

/// Pause between replayed actions.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(400);

/// Why a run did not complete cleanly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunFailure {
    /// The guest reported an error or trapped.
    #[error("guest exited with code {exit_code}: {stderr}")]
    Guest { exit_code: i32, stderr: String },

    /// The guest's output could not be decoded into a trace. The guest's own
    /// exit code and stderr are kept alongside the decode error.
    #[error("{source}")]
    Protocol {
        source: sheep_script::Error,
        exit_code: i32,
        stderr: String,
    },
}

/// Result of running one script against a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The guest finished cleanly and its trace was replayed.
    Completed {
        trace: ExecutionTrace,
        solve: SolveState,
        /// Lines the script printed itself.
        output: Vec<String>,
    },
    /// The run failed. A guest failure still replays whatever actions the
    /// program got through; a decode failure replays nothing.
    Failed {
        failure: RunFailure,
        trace: Option<ExecutionTrace>,
        solve: SolveState,
        output: Vec<String>,
    },
}

impl RunOutcome {
    /// The board evaluation after replay.
    pub fn solve(&self) -> &SolveState {
        match self {
            RunOutcome::Completed { solve, .. } | RunOutcome::Failed { solve, .. } => solve,
        }
    }

    /// The decoded trace, if there was one.
    pub fn trace(&self) -> Option<&ExecutionTrace> {
        match self {
            RunOutcome::Completed { trace, .. } => Some(trace),
            RunOutcome::Failed { trace, .. } => trace.as_ref(),
        }
    }

    /// Lines the script printed itself.
    pub fn output(&self) -> &[String] {
        match self {
            RunOutcome::Completed { output, .. } | RunOutcome::Failed { output, .. } => output,
        }
    }

    /// The run completed and every objective was met.
    pub fn solved(&self) -> bool {
        matches!(self, RunOutcome::Completed { solve, .. } if solve.solved)
    }
}

/// Drives one script through instrument, execute, decode and replay.
#[derive(Debug, Clone)]
pub struct Playthrough {
    instrumentor: Instrumentor,
    delay: Duration,
}

impl Default for Playthrough {
    fn default() -> Self {
        Self::new()
    }
}

impl Playthrough {
    /// A playthrough with a fresh session and the default replay delay.
    pub fn new() -> Self {
        Self::with_session(SessionId::generate())
    }

    /// A playthrough bound to `session`.
    pub fn with_session(session: SessionId) -> Self {
        Self {
            instrumentor: Instrumentor::with_session(session),
            delay: DEFAULT_DELAY,
        }
    }

    /// Set the pause between replayed actions.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// The session tagging this playthrough's markers.
    pub fn session(&self) -> &SessionId {
        self.instrumentor.session()
    }

    /// Run `source` in the guest and replay it on `board`.
    ///
    /// Guest and decode failures are part of the outcome; only a bridge that
    /// cannot run the guest at all is an error.
    pub async fn run(
        &self,
        bridge: &GuestBridge,
        board: &mut Board,
        source: &str,
    ) -> Result<RunOutcome> {
        let program = self.instrumentor.instrument(source);
        let result = bridge.execute(ENTRY_NAME, &program).await?;
        Ok(self.finish(board, result).await)
    }

    async fn finish(&self, board: &mut Board, result: ExecuteResult) -> RunOutcome {
        let decoder = self.instrumentor.decoder();
        let output = decoder
            .program_output(&result.stdout)
            .into_iter()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        let trace = match decoder.decode(&result.stdout) {
            Ok(trace) => trace,
            Err(e) => {
                tracing::warn!(session = %self.session(), "could not decode guest output: {}", e);
                return RunOutcome::Failed {
                    failure: RunFailure::Protocol {
                        source: e,
                        exit_code: result.exit_code,
                        stderr: result.stderr,
                    },
                    trace: None,
                    solve: board.solve_state(None),
                    output,
                };
            }
        };

        self.replay(board, &trace).await;
        let solve = board.solve_state(Some(&trace));

        if result.succeeded() {
            tracing::info!(
                actions = trace.actions().len(),
                calls = trace.call_count(),
                solved = solve.solved,
                "run completed"
            );
            RunOutcome::Completed {
                trace,
                solve,
                output,
            }
        } else {
            tracing::info!(exit_code = result.exit_code, "guest run failed");
            RunOutcome::Failed {
                failure: RunFailure::Guest {
                    exit_code: result.exit_code,
                    stderr: result.stderr,
                },
                trace: Some(trace),
                solve,
                output,
            }
        }
    }

    async fn replay(&self, board: &mut Board, trace: &ExecutionTrace) {
        for (tick, &action) in trace.actions().iter().enumerate() {
            if tick > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            board.apply(action);
            tracing::debug!(tick, %action, position = %board.agent().pos, "replayed action");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheep_grid::{Action, AgentSpec, BoardSpec, Direction, GridPosition, Limits};

    fn board() -> Board {
        Board::new(BoardSpec {
            size: 3,
            player: AgentSpec {
                position: GridPosition::new(1, 2),
                facing: Direction::North,
            },
            exit: GridPosition::new(1, 0),
            limits: Limits::default(),
        })
        .unwrap()
    }

    fn playthrough() -> Playthrough {
        Playthrough::with_session(SessionId::new("s").unwrap()).with_delay(Duration::ZERO)
    }

    fn result(exit_code: i32, stdout: &str, stderr: &str) -> ExecuteResult {
        ExecuteResult {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            trace: String::new(),
        }
    }

    #[tokio::test]
    async fn clean_run_replays_and_solves() {
        let mut board = board();
        let stdout = "__s__forward__\n__s__forward__\n__s__forward__calls__1__\nhi\n";
        let outcome = playthrough().finish(&mut board, result(0, stdout, "")).await;

        assert!(outcome.solved());
        assert_eq!(outcome.output(), ["hi".to_string()]);
        assert_eq!(board.agent().pos, GridPosition::new(1, 0));
    }

    #[tokio::test]
    async fn failed_run_still_replays_partial_trace() {
        let mut board = board();
        let stdout = "__s__forward__\n";
        let outcome = playthrough()
            .finish(&mut board, result(2, stdout, "line 3: oops"))
            .await;

        match &outcome {
            RunOutcome::Failed {
                failure: RunFailure::Guest { exit_code, stderr },
                trace: Some(trace),
                ..
            } => {
                assert_eq!(*exit_code, 2);
                assert_eq!(stderr, "line 3: oops");
                assert_eq!(trace.actions(), &[Action::Forward]);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(!outcome.solved());
        assert_eq!(board.agent().pos, GridPosition::new(1, 1));
    }

    #[tokio::test]
    async fn protocol_error_replays_nothing() {
        let mut board = board();
        let stdout = "__s__forward__\n__s__fly__\n";
        let outcome = playthrough().finish(&mut board, result(0, stdout, "")).await;

        assert!(matches!(
            outcome,
            RunOutcome::Failed {
                failure: RunFailure::Protocol { exit_code: 0, .. },
                trace: None,
                ..
            }
        ));
        assert_eq!(board.agent().pos, GridPosition::new(1, 2));
    }

    #[tokio::test]
    async fn protocol_error_keeps_guest_diagnostic() {
        let mut board = board();
        let stdout = "__s__forward__
__s__forward__calls__x__
";
        let outcome = playthrough()
            .finish(&mut board, result(1, stdout, "line 9: boom"))
            .await;

        match outcome {
            RunOutcome::Failed {
                failure:
                    RunFailure::Protocol {
                        source,
                        exit_code,
                        stderr,
                    },
                trace: None,
                ..
            } => {
                assert!(matches!(source, sheep_script::Error::Protocol { .. }));
                assert_eq!(exit_code, 1);
                assert_eq!(stderr, "line 9: boom");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(board.agent().pos, GridPosition::new(1, 2));
    }
}
