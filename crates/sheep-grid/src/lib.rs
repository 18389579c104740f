//! # sheep-grid
//!
//! Board model and herd simulation for sheepcraft levels.
//!
//! This crate provides:
//! - Grid positions, facings and the six-verb [`Action`] vocabulary
//! - A closed set of entity kinds (agent, exit, obstacles, herd units and targets)
//! - The [`Board`] state machine that applies one action per tick
//! - Solve-state evaluation against an [`ExecutionTrace`]
//!
//! ## Example
//!
//! ```
//! use sheep_grid::{Action, AgentSpec, Board, BoardSpec, Direction, GridPosition, Limits};
//!
//! let mut board = Board::new(BoardSpec {
//!     size: 3,
//!     player: AgentSpec { position: GridPosition::new(1, 2), facing: Direction::North },
//!     exit: GridPosition::new(1, 0),
//!     limits: Limits::default(),
//! })?;
//!
//! board.apply(Action::Forward);
//! board.apply(Action::Forward);
//! assert!(board.solve_state(None).solved);
//! # Ok::<(), sheep_grid::Error>(())
//! ```

mod action;
mod board;
mod entity;
mod error;
mod point;
mod solve;
mod spec;
mod trace;

pub use action::{Action, UnknownAction};
pub use board::Board;
pub use entity::{Entity, EntityId, EntityKind, HerdColor, AGENT_PRIORITY, CARRIED_PRIORITY};
pub use error::{Error, Result};
pub use point::{Direction, GridPosition, ParseDirectionError, ParsePositionError};
pub use solve::{HerdCoverage, SolveState, Threshold};
pub use spec::{AgentSpec, BoardFile, BoardSpec, EntitySpec, Limits, Obstacle};
pub use trace::ExecutionTrace;
