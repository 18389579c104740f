use thiserror::Error;

/// Errors from the guest bridge.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Module compilation, linking or instantiation failed.
    #[error("WASM error: {0}")]
    Wasm(String),

    /// No live guest instance; call `init` first.
    #[error("guest is not ready")]
    NotReady,

    /// The live instance trapped and must be restarted.
    #[error("guest faulted; restart required")]
    Faulted,

    /// The guest trapped during a call.
    #[error("guest trap: {0}")]
    Trap(String),

    /// The guest's exports never became callable.
    #[error("guest not ready after {attempts} attempts")]
    ReadyTimeout { attempts: u32 },

    /// A required export is absent or has the wrong signature.
    #[error("missing guest export: {0}")]
    MissingExport(String),

    /// Guest memory could not be read or written.
    #[error("guest memory error: {0}")]
    Memory(String),

    /// Invalid bridge configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The bridge worker thread is gone.
    #[error("guest bridge closed")]
    BridgeClosed,
}

/// Result type for sheep-wasm-engine operations.
pub type Result<T> = std::result::Result<T, Error>;
