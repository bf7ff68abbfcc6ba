//! Per-tick metrics.

use crate::agent::{Disease, Status};
use crate::grid::Grid;
use crate::scheduler::Scheduler;
use anyhow::{Context, Result};
use rand::prelude::*;
use std::io::Write;

/// Running mean and variance (Welford).
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug)]
pub struct AccumulatorReport {
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    /// Mean of the values added so far, 0 if there are none.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            mean: self.mean,
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}

/// Metrics of the population right after one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Tick the record was taken after.
    pub tick: u64,
    /// Number of live agents.
    pub population: usize,
    /// Cumulative number of deaths.
    pub deaths: usize,
    /// Mean Chebyshev distance from each agent to its closest neighbor.
    pub mean_nearest_distance: f64,
    /// Agents infected during this tick.
    pub new_infections: u32,
    /// Mean infections caused this tick by the currently infectious agents.
    pub mean_infections_per_infectious: f64,
    /// Agents incubating or infectious.
    pub sick: usize,
    /// Single-sample estimate of the reproduction number.
    pub reproduction_estimate: f64,
}

impl Record {
    pub const NAMES: [&'static str; 7] = [
        "population",
        "deaths",
        "mean_nearest_distance",
        "new_infections",
        "mean_infections_per_infectious",
        "sick",
        "reproduction_estimate",
    ];

    /// Named scalar values, in the order of [`Record::NAMES`].
    pub fn values(&self) -> [(&'static str, f64); 7] {
        let vals = [
            self.population as f64,
            self.deaths as f64,
            self.mean_nearest_distance,
            self.new_infections as f64,
            self.mean_infections_per_infectious,
            self.sick as f64,
            self.reproduction_estimate,
        ];
        std::array::from_fn(|i| (Self::NAMES[i], vals[i]))
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values()
            .into_iter()
            .find_map(|(key, val)| (key == name).then_some(val))
    }
}

/// Time series of [`Record`]s, one per tick.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    records: Vec<Record>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn last(&self) -> Option<&Record> {
        self.records.last()
    }

    /// History of one named metric, or `None` for an unknown name.
    pub fn series(&self, name: &str) -> Option<Vec<f64>> {
        if !Record::NAMES.iter().any(|&key| key == name) {
            return None;
        }
        self.records.iter().map(|rec| rec.get(name)).collect()
    }

    /// Compute a record from the current population and append it.
    pub fn collect<R: Rng + ?Sized>(
        &mut self,
        tick: u64,
        deaths: usize,
        sched: &Scheduler,
        grid: &Grid,
        disease: &Disease,
        rng: &mut R,
    ) -> Result<()> {
        let mut new_infections = 0;
        let mut sick = 0;
        let mut infections_acc = Accumulator::new();
        for agt in sched.agents() {
            new_infections += agt.infections();
            if agt.status().is_sick() {
                sick += 1;
            }
            if agt.status() == Status::Infectious {
                infections_acc.add(agt.infections() as f64);
            }
        }

        let rec = Record {
            tick,
            population: sched.len(),
            deaths,
            mean_nearest_distance: mean_nearest_distance(sched, grid)
                .context("failed to compute nearest distances")?,
            new_infections,
            mean_infections_per_infectious: infections_acc.mean(),
            sick,
            reproduction_estimate: reproduction_estimate(sched, grid, disease, rng)
                .context("failed to estimate reproduction number")?,
        };
        log::trace!("{rec:?}");

        self.records.push(rec);
        Ok(())
    }
}

fn mean_nearest_distance(sched: &Scheduler, grid: &Grid) -> Result<f64> {
    if sched.len() < 2 {
        return Ok(0.0);
    }
    let mut acc = Accumulator::new();
    for &id in sched.live() {
        let dist = grid.nearest_distance(id)?.unwrap_or(0);
        acc.add(dist as f64);
    }
    Ok(acc.mean())
}

fn reproduction_estimate<R: Rng + ?Sized>(
    sched: &Scheduler,
    grid: &Grid,
    disease: &Disease,
    rng: &mut R,
) -> Result<f64> {
    let Some(&id) = sched.live().choose(rng) else {
        return Ok(0.0);
    };
    let cell = grid
        .position(id)
        .with_context(|| format!("agent {id} is not on the grid"))?;
    let n_contacts = grid.neighbors(cell, disease.infection_radius, true)?.len();
    Ok(n_contacts as f64 * disease.transmission_probability)
}

/// Write records as a whitespace-aligned table with a header line.
pub fn write_table<W: Write>(records: &[Record], out: &mut W) -> Result<()> {
    write!(out, "#{:>7}", "tick")?;
    for name in Record::NAMES {
        write!(out, " {name:>16}")?;
    }
    writeln!(out)?;

    for rec in records {
        write!(out, " {:>7}", rec.tick)?;
        for (_, val) in rec.values() {
            write!(out, " {val:>16.6}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Mean and standard deviation of each metric over a run.
pub fn summarize(records: &[Record]) -> Vec<(&'static str, AccumulatorReport)> {
    let mut acc_vec = Vec::new();
    acc_vec.resize_with(Record::NAMES.len(), Accumulator::new);
    for rec in records {
        for (acc, (_, val)) in acc_vec.iter_mut().zip(rec.values()) {
            acc.add(val);
        }
    }
    Record::NAMES
        .into_iter()
        .zip(acc_vec.iter().map(Accumulator::report))
        .collect()
}
