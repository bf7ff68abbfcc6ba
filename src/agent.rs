//! Simulation agents and their disease state machine.

use crate::config::ModelConfig;
use anyhow::Result;
use rand::Rng;
use rand_distr::{Bernoulli, Distribution};

/// Identifier of an agent, unique within a model run.
pub type AgentId = usize;

/// Disease status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Susceptible.
    Healthy,
    /// Infected but not yet contagious.
    Incubating,
    /// Contagious and stationary.
    Infectious,
    /// Recovered, cannot be infected again.
    Immune,
    /// Terminal, removed from the population.
    Dead,
}

impl Status {
    /// Code used in grid snapshots, where 0 stands for an empty cell.
    pub fn code(self) -> u8 {
        match self {
            Status::Healthy => 1,
            Status::Incubating => 2,
            Status::Infectious => 3,
            Status::Immune => 4,
            Status::Dead => 5,
        }
    }

    /// Carrying the disease, contagious or not.
    pub fn is_sick(self) -> bool {
        matches!(self, Status::Incubating | Status::Infectious)
    }
}

/// Running countdown.
///
/// An agent stores `Option<Countdown>`; `None` is the "not running" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
    started: u64,
}

impl Countdown {
    pub fn new(ticks: u32, started: u64) -> Self {
        Self {
            remaining: ticks,
            started,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

/// Decrement a countdown, returning `true` when it has just expired.
///
/// A countdown is not decremented during the tick in which it was started.
fn tick_down(timer: &mut Option<Countdown>, tick: u64) -> bool {
    let Some(countdown) = timer else {
        return false;
    };
    if countdown.started >= tick {
        return false;
    }
    countdown.remaining = countdown.remaining.saturating_sub(1);
    if countdown.remaining == 0 {
        *timer = None;
        return true;
    }
    false
}

/// Disease rules shared by all agents, with the draws pre-built.
#[derive(Debug, Clone)]
pub struct Disease {
    pub move_radius: usize,
    pub infection_radius: usize,
    pub incubation_ticks: u32,
    pub recovery_ticks: u32,
    pub transmission_probability: f64,
    pub transmission: Bernoulli,
    pub death: Bernoulli,
}

impl Disease {
    pub fn new(cfg: &ModelConfig) -> Result<Self> {
        Ok(Self {
            move_radius: cfg.move_radius,
            infection_radius: cfg.infection_radius,
            incubation_ticks: cfg.incubation_ticks,
            recovery_ticks: cfg.recovery_ticks,
            transmission_probability: cfg.transmission_probability,
            transmission: Bernoulli::new(cfg.transmission_probability)?,
            death: Bernoulli::new(cfg.death_probability)?,
        })
    }
}

/// What an agent does with the rest of its turn once its timers have advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Move,
    Infect,
    Die,
}

/// Agent of the simulation.
#[derive(Debug, Clone)]
pub struct Agent {
    id: AgentId,
    status: Status,
    incubation: Option<Countdown>,
    recovery: Option<Countdown>,
    infections: u32,
}

impl Agent {
    /// Create an agent. Only `Healthy` and `Immune` are valid initial statuses.
    pub fn new(id: AgentId, immune: bool) -> Self {
        Self {
            id,
            status: if immune {
                Status::Immune
            } else {
                Status::Healthy
            },
            incubation: None,
            recovery: None,
            infections: 0,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn incubation(&self) -> Option<Countdown> {
        self.incubation
    }

    pub fn recovery(&self) -> Option<Countdown> {
        self.recovery
    }

    /// Number of agents infected by this one during the current tick.
    pub fn infections(&self) -> u32 {
        self.infections
    }

    pub fn add_infections(&mut self, count: u32) {
        self.infections += count;
    }

    /// Start the incubation period.
    pub fn infect(&mut self, tick: u64, incubation_ticks: u32) {
        self.status = Status::Incubating;
        self.incubation = Some(Countdown::new(incubation_ticks, tick));
        self.recovery = None;
    }

    /// Timers and status are consistent with each other.
    pub fn is_consistent(&self) -> bool {
        match self.status {
            Status::Incubating => self.incubation.is_some() && self.recovery.is_none(),
            Status::Infectious => self.incubation.is_none() && self.recovery.is_some(),
            _ => self.incubation.is_none() && self.recovery.is_none(),
        }
    }

    /// Advance the agent's own state by one tick.
    ///
    /// Resets the infection counter, runs both countdowns and resolves
    /// the end of the infectious period. The returned [`Action`] tells the
    /// caller what the agent does next on the grid.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        tick: u64,
        disease: &Disease,
        rng: &mut R,
    ) -> Action {
        self.infections = 0;

        if tick_down(&mut self.incubation, tick) && self.status == Status::Incubating {
            self.status = Status::Infectious;
            self.recovery = Some(Countdown::new(disease.recovery_ticks, tick));
        }

        if tick_down(&mut self.recovery, tick) && self.status == Status::Infectious {
            if disease.death.sample(rng) {
                self.status = Status::Dead;
                return Action::Die;
            }
            self.status = Status::Immune;
        }

        match self.status {
            Status::Infectious => Action::Infect,
            Status::Dead => Action::Die,
            _ => Action::Move,
        }
    }
}
