use crate::entity::EntityId;
use crate::point::GridPosition;
use thiserror::Error;

/// Errors raised by the board model.
#[derive(Debug, Error)]
pub enum Error {
    /// An action token outside the six-verb vocabulary reached the simulation.
    ///
    /// This indicates a decoder bug rather than a player mistake.
    #[error("unknown action token: {0}")]
    UnknownAction(String),

    /// A position lies outside the board.
    #[error("position {position} is outside a {size}x{size} board")]
    OutOfBounds {
        /// The offending position.
        position: GridPosition,
        /// Board size.
        size: i32,
    },

    /// Board sizes must be positive.
    #[error("invalid board size: {0}")]
    InvalidSize(i32),

    /// An entity id does not exist on this board.
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// The agent and the exit zone cannot be added or removed after construction.
    #[error("entity {0} is fixed to the board")]
    FixedEntity(EntityId),

    /// Error parsing a board description.
    #[error("board config error: {0}")]
    Config(String),
}

/// Result type for sheep-grid operations.
pub type Result<T> = std::result::Result<T, Error>;
