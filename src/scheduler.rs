//! Random-activation scheduling of the live agents.

use crate::agent::{Agent, AgentId, Status};
use anyhow::{Context, Result};
use rand::prelude::*;

/// Random-activation scheduler.
///
/// Owns every agent created for the run and the set of those still alive.
/// Agents are stored by id, so an agent's id is its index in `agt_vec`.
#[derive(Debug, Clone)]
pub struct Scheduler {
    agt_vec: Vec<Agent>,
    live: Vec<AgentId>,
}

impl Scheduler {
    pub fn new(agt_vec: Vec<Agent>) -> Self {
        let live = agt_vec.iter().map(Agent::id).collect();
        Self { agt_vec, live }
    }

    /// Number of live agents.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Ids of the live agents, in the order of the last activation.
    pub fn live(&self) -> &[AgentId] {
        &self.live
    }

    /// Iterate over the live agents.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.live.iter().map(|&id| &self.agt_vec[id])
    }

    pub fn get(&self, id: AgentId) -> Result<&Agent> {
        self.agt_vec
            .get(id)
            .with_context(|| format!("unknown agent {id}"))
    }

    pub fn get_mut(&mut self, id: AgentId) -> Result<&mut Agent> {
        self.agt_vec
            .get_mut(id)
            .with_context(|| format!("unknown agent {id}"))
    }

    /// Shuffle the live agents and return the activation order for one tick.
    pub fn activation_order<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<AgentId> {
        self.live.shuffle(rng);
        self.live.clone()
    }

    /// Drop the agents that died during the tick, returning how many were removed.
    pub fn remove_dead(&mut self) -> usize {
        let n_before = self.live.len();
        let agt_vec = &self.agt_vec;
        self.live.retain(|&id| agt_vec[id].status() != Status::Dead);
        n_before - self.live.len()
    }
}
