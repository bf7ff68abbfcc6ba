//! Agent-based simulation of an infectious disease spreading over a grid.
//!
//! Consumers drive a run through [`Engine`]: build it from a [`Config`],
//! call [`Engine::step`] once per tick, and read [`Engine::snapshot`] and
//! [`Engine::metrics`] between ticks.

pub mod agent;
pub mod config;
pub mod engine;
pub mod error;
pub mod grid;
pub mod scheduler;
pub mod stats;

pub use crate::agent::{Agent, AgentId, Status};
pub use crate::config::Config;
pub use crate::engine::Engine;
pub use crate::error::SimError;
pub use crate::stats::Record;
