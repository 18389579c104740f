use thiserror::Error;

/// Errors that stop a playthrough before the guest produced a result.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The guest bridge failed.
    #[error("Bridge error: {0}")]
    Bridge(#[from] sheep_wasm_engine::Error),

    /// The board could not be built or changed.
    #[error("Board error: {0}")]
    Grid(#[from] sheep_grid::Error),
}

/// Result type for sheepcraft operations.
pub type Result<T> = std::result::Result<T, Error>;
