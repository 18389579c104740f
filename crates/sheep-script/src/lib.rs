//! # sheep-script
//!
//! Instrumentation of player scripts and decoding of their marker output.
//!
//! This crate provides:
//! - Session identifiers that tag every marker line of one run
//! - The [`Instrumentor`], which wraps player source with reporting action functions
//! - The [`TraceDecoder`], which turns captured stdout back into an [`ExecutionTrace`]
//!
//! ## Example
//!
//! ```
//! use sheep_grid::Action;
//! use sheep_script::{Instrumentor, SessionId};
//!
//! let instrumentor = Instrumentor::with_session(SessionId::new("demo")?);
//! let program = instrumentor.instrument("turnLeft()");
//! assert!(program.contains("fn turnLeft(n = 1)"));
//!
//! let trace = instrumentor
//!     .decoder()
//!     .decode("__demo__turnLeft__\n__demo__turnLeft__calls__1__\n")?;
//! assert_eq!(trace.actions(), &[Action::TurnLeft]);
//! # Ok::<(), sheep_script::Error>(())
//! ```
//!
//! [`ExecutionTrace`]: sheep_grid::ExecutionTrace

mod decode;
mod error;
mod instrument;

pub use decode::TraceDecoder;
pub use error::{Error, Result};
pub use instrument::{Instrumentor, SessionId, SESSION_ID_LEN};
