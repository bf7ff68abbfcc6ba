//! Spatial grid with per-cell agent buckets.
//!
//! Neighborhood queries visit only the cells inside the requested Chebyshev
//! radius, so their cost depends on the radius and not on the population.

use crate::agent::AgentId;
use crate::error::SimError;
use std::collections::HashMap;

/// Normalized cell coordinates `(x, y)`.
pub type Cell = (usize, usize);

/// Two-dimensional multi-occupancy grid.
#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    wrap_around: bool,
    buckets: Vec<Vec<AgentId>>,
    positions: HashMap<AgentId, Cell>,
}

impl Grid {
    pub fn new(width: usize, height: usize, wrap_around: bool) -> Result<Self, SimError> {
        if width == 0 || height == 0 {
            return Err(SimError::InvalidConfiguration(format!(
                "grid dimensions must be positive, but are {width}x{height}"
            )));
        }
        Ok(Self {
            width,
            height,
            wrap_around,
            buckets: vec![Vec::new(); width * height],
            positions: HashMap::new(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn wrap_around(&self) -> bool {
        self.wrap_around
    }

    /// Number of agents currently on the grid.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Current cell of an agent, if it is on the grid.
    pub fn position(&self, agent: AgentId) -> Option<Cell> {
        self.positions.get(&agent).copied()
    }

    /// Register an agent at a cell.
    ///
    /// Placing an agent that is already on the grid moves it instead.
    pub fn place(&mut self, agent: AgentId, cell: Cell) -> Result<(), SimError> {
        let cell = self.normalize(cell)?;
        if self.positions.contains_key(&agent) {
            self.detach(agent)?;
        }
        self.attach(agent, cell);
        Ok(())
    }

    /// Move a registered agent to another cell.
    pub fn move_to(&mut self, agent: AgentId, cell: Cell) -> Result<(), SimError> {
        let cell = self.normalize(cell)?;
        self.detach(agent)?;
        self.attach(agent, cell);
        Ok(())
    }

    /// Deregister an agent, returning the cell it occupied.
    pub fn remove(&mut self, agent: AgentId) -> Result<Cell, SimError> {
        self.detach(agent)
    }

    /// Agents located at one cell.
    pub fn cell_occupants(&self, cell: Cell) -> Result<&[AgentId], SimError> {
        let cell = self.normalize(cell)?;
        Ok(&self.buckets[self.index(cell)])
    }

    /// Cells of the Moore neighborhood of the given radius around `center`.
    ///
    /// With wrap-around the coordinates wrap modulo the grid dimensions and
    /// each cell appears once even if the radius exceeds the grid. Without
    /// it the neighborhood is clipped to the grid bounds.
    pub fn neighborhood(
        &self,
        center: Cell,
        radius: usize,
        include_center: bool,
    ) -> Result<Vec<Cell>, SimError> {
        let center = self.normalize(center)?;
        let xs = self.axis_span(center.0, radius, self.width);
        let ys = self.axis_span(center.1, radius, self.height);

        let mut cells = Vec::with_capacity(xs.len() * ys.len());
        for &x in &xs {
            for &y in &ys {
                if !include_center && (x, y) == center {
                    continue;
                }
                cells.push((x, y));
            }
        }
        Ok(cells)
    }

    /// Agents found in the Moore neighborhood of the given radius around `center`.
    ///
    /// The result is an owned list, unaffected by later grid mutations.
    pub fn neighbors(
        &self,
        center: Cell,
        radius: usize,
        include_center: bool,
    ) -> Result<Vec<AgentId>, SimError> {
        let cells = self.neighborhood(center, radius, include_center)?;
        let agents = cells
            .into_iter()
            .flat_map(|cell| self.buckets[self.index(cell)].iter().copied())
            .collect();
        Ok(agents)
    }

    /// Smallest Chebyshev distance from `agent` to another agent.
    ///
    /// Returns `Ok(None)` when no other agent is on the grid.
    pub fn nearest_distance(&self, agent: AgentId) -> Result<Option<usize>, SimError> {
        let center = self
            .position(agent)
            .ok_or(SimError::AgentNotFound(agent))?;
        if self.positions.len() < 2 {
            return Ok(None);
        }

        let max_radius = self.width.max(self.height);
        for radius in 0..=max_radius {
            let found = self
                .ring(center, radius)
                .into_iter()
                .any(|cell| self.buckets[self.index(cell)].iter().any(|&a| a != agent));
            if found {
                return Ok(Some(radius));
            }
        }
        Ok(None)
    }

    /// Cells at exactly the given Chebyshev distance from `center`.
    fn ring(&self, center: Cell, radius: usize) -> Vec<Cell> {
        if radius == 0 {
            return vec![center];
        }
        let radius = radius as i64;
        let (cx, cy) = (center.0 as i64, center.1 as i64);

        let mut cells = Vec::new();
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                if dx.abs() != radius && dy.abs() != radius {
                    continue;
                }
                if let Some(cell) = self.offset(cx + dx, cy + dy) {
                    cells.push(cell);
                }
            }
        }
        cells
    }

    fn offset(&self, x: i64, y: i64) -> Option<Cell> {
        let (w, h) = (self.width as i64, self.height as i64);
        if self.wrap_around {
            Some((x.rem_euclid(w) as usize, y.rem_euclid(h) as usize))
        } else if (0..w).contains(&x) && (0..h).contains(&y) {
            Some((x as usize, y as usize))
        } else {
            None
        }
    }

    /// Coordinates within `radius` of `center` along one axis of length `len`.
    fn axis_span(&self, center: usize, radius: usize, len: usize) -> Vec<usize> {
        if self.wrap_around {
            if 2 * radius + 1 >= len {
                return (0..len).collect();
            }
            let center = center as i64;
            let radius = radius as i64;
            let len = len as i64;
            (center - radius..=center + radius)
                .map(|c| c.rem_euclid(len) as usize)
                .collect()
        } else {
            let lo = center.saturating_sub(radius);
            let hi = (center + radius).min(len - 1);
            (lo..=hi).collect()
        }
    }

    fn normalize(&self, (x, y): Cell) -> Result<Cell, SimError> {
        if self.wrap_around {
            return Ok((x % self.width, y % self.height));
        }
        if x >= self.width || y >= self.height {
            return Err(SimError::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok((x, y))
    }

    fn index(&self, (x, y): Cell) -> usize {
        y * self.width + x
    }

    fn attach(&mut self, agent: AgentId, cell: Cell) {
        let idx = self.index(cell);
        self.buckets[idx].push(agent);
        self.positions.insert(agent, cell);
    }

    fn detach(&mut self, agent: AgentId) -> Result<Cell, SimError> {
        let cell = self
            .positions
            .remove(&agent)
            .ok_or(SimError::AgentNotFound(agent))?;
        let idx = self.index(cell);
        let bucket = &mut self.buckets[idx];
        if let Some(slot) = bucket.iter().position(|&a| a == agent) {
            bucket.swap_remove(slot);
        }
        Ok(cell)
    }
}
