//! Error kinds raised by the simulation core.

use crate::agent::AgentId;
use thiserror::Error;

/// Errors emitted by the grid, the configuration checks and the engine.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    /// Configuration values that cannot be used to build a model.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Cell outside a bounded grid.
    #[error("cell ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    /// Agent not registered on the grid.
    #[error("agent {0} is not on the grid")]
    AgentNotFound(AgentId),
}
