//! # sheep-wasm-engine
//!
//! Hosts the sheepcraft script guest, an opaque WebAssembly module, with
//! [wasmtime](https://wasmtime.dev/).
//!
//! This crate provides:
//! - [`GuestRunner`], a synchronous state machine that compiles the module
//!   once, instantiates it, marshals strings across guest memory and recovers
//!   from traps by re-instantiating
//! - [`GuestBridge`], an asynchronous handle that serializes every call onto a
//!   dedicated worker thread
//! - [`BridgeConfig`], loadable from TOML
//!
//! The bridge does not bound guest execution time; a program that never
//! terminates blocks the worker.
//!
//! ## Example
//!
//! ```ignore
//! use sheep_wasm_engine::{BridgeConfig, GuestBridge, GuestRunner};
//!
//! let runner = GuestRunner::from_file("goose.wasm", BridgeConfig::default())?;
//! let bridge = GuestBridge::spawn(runner)?;
//! bridge.init().await?;
//!
//! let result = bridge.execute("main.goose", "print(\"hi\")").await?;
//! if result.succeeded() {
//!     println!("{}", result.stdout);
//! }
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod runner;
pub mod worker;

pub use config::{BridgeConfig, RestartPolicy};
pub use error::{Error, Result};
pub use host::{HostFunctions, HostState};
pub use runner::{BridgeState, GuestRunner};
pub use worker::GuestBridge;

use serde::Serialize;

/// Outcome of one guest `execute`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResult {
    /// Guest exit code; -1 when the bridge itself reports the failure.
    pub exit_code: i32,
    /// Program stdout.
    pub stdout: String,
    /// Program stderr, or the trap diagnostic.
    pub stderr: String,
    /// Guest-provided trace text, passed through untouched.
    pub trace: String,
}

impl ExecuteResult {
    /// Exit code 0 and nothing on stderr.
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0 && self.stderr.is_empty()
    }

    /// A result the guest did not return as a structured record.
    pub(crate) fn raw(stdout: String) -> Self {
        Self {
            exit_code: -1,
            stdout,
            ..Self::default()
        }
    }

    /// A call that threw before producing a result.
    pub(crate) fn failure(stderr: String) -> Self {
        Self {
            exit_code: -1,
            stderr,
            ..Self::default()
        }
    }
}
