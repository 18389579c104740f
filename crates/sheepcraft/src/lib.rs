//! # sheepcraft
//!
//! Runs a player's script against a level: the source is instrumented, executed
//! by the guest, decoded into a trace and replayed on the board.
//!
//! ## Example
//!
//! ```ignore
//! use sheep_wasm_engine::{BridgeConfig, GuestBridge, GuestRunner};
//! use sheepcraft::{load_board, Playthrough};
//!
//! let bridge = GuestBridge::spawn(GuestRunner::from_file("goose.wasm", BridgeConfig::default())?)?;
//! bridge.init().await?;
//!
//! let mut board = load_board("level1.toml")?;
//! let outcome = Playthrough::new().run(&bridge, &mut board, "forward(2)").await?;
//! println!("solved: {}", outcome.solved());
//! ```

mod error;
mod playthrough;

pub use error::{Error, Result};
pub use playthrough::{Playthrough, RunFailure, RunOutcome, DEFAULT_DELAY, ENTRY_NAME};

use sheep_grid::{Board, BoardFile};
use std::path::Path;

/// Build a board from a TOML level file.
pub fn load_board(path: impl AsRef<Path>) -> Result<Board> {
    let text = std::fs::read_to_string(path)?;
    Ok(BoardFile::from_toml(&text)?.build()?)
}
