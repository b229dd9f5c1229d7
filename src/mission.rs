//! Driver loop for a robot that only learns the true cell costs by sensing them on the way.
//!
//! Each [Mission::step] scans around the robot, feeds any cost that differs from what the
//! planner believes into [Planner::update], replans if something changed and then moves one
//! cell along the planned path.
use crate::cost_grid::{validate_cost, CellId, CostGrid};
use crate::error::PlanError;
use crate::math::equals;
use crate::planner::Planner;
use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use log::{debug, info};
use std::collections::VecDeque;

type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Source of cost observations around the robot. Which cells are visible from a position is
/// entirely up to the implementation.
pub trait Sensor {
    /// Returns observed `(cell, cost)` pairs. The grid holds the costs the planner currently
    /// believes in. If a cell is reported more than once, the last report counts.
    fn scan(&mut self, grid: &CostGrid, position: CellId) -> Vec<(CellId, f64)>;
}

impl<F> Sensor for F
where
    F: FnMut(&CostGrid, CellId) -> Vec<(CellId, f64)>,
{
    fn scan(&mut self, grid: &CostGrid, position: CellId) -> Vec<(CellId, f64)> {
        self(grid, position)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MissionConfig {
    /// Number of moves after which [Mission::run] gives up.
    pub max_moves: usize,
}

impl Default for MissionConfig {
    fn default() -> MissionConfig {
        MissionConfig { max_moves: 100_000 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissionStatus {
    /// The robot advanced to the given cell.
    Moved(CellId),
    /// The robot stands on the goal.
    Arrived,
}

pub struct Mission<S> {
    planner: Planner,
    sensor: S,
    config: MissionConfig,
    planned: VecDeque<CellId>,
    traversed: Vec<CellId>,
    replans: usize,
    /// Set once a cost change reached the planner and cleared by the next successful replan.
    stale: bool,
}

impl<S: Sensor> Mission<S> {
    pub fn new(planner: Planner, sensor: S) -> Result<Mission<S>, PlanError> {
        Mission::with_config(planner, sensor, MissionConfig::default())
    }

    /// Plans the initial path on the costs the planner starts out with.
    pub fn with_config(
        mut planner: Planner,
        sensor: S,
        config: MissionConfig,
    ) -> Result<Mission<S>, PlanError> {
        let path = planner.try_replan()?;
        let start = planner.start();
        Ok(Mission {
            planner,
            sensor,
            config,
            planned: path.into_iter().skip(1).collect(),
            traversed: vec![start],
            replans: 1,
            stale: false,
        })
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }
    pub fn into_planner(self) -> Planner {
        self.planner
    }
    pub fn position(&self) -> CellId {
        self.planner.start()
    }
    /// Cells visited so far, starting with the initial position.
    pub fn traversed(&self) -> &[CellId] {
        &self.traversed
    }
    /// Remaining cells of the current plan, excluding the current position.
    pub fn planned(&self) -> impl Iterator<Item = &CellId> {
        self.planned.iter()
    }
    /// Number of paths computed, including the initial one.
    pub fn replans(&self) -> usize {
        self.replans
    }

    /// Applies the observations from the current position. Nothing is applied unless every
    /// observation names a cell of the grid and a valid cost.
    fn sense(&mut self) -> Result<(), PlanError> {
        let position = self.planner.start();
        let observed: FxIndexMap<CellId, f64> = self
            .sensor
            .scan(self.planner.grid(), position)
            .into_iter()
            .collect();
        let mut changes = Vec::new();
        for (cell, cost) in observed {
            let cell = self.planner.grid().check(cell)?;
            let cost = validate_cost(cost)?;
            // The planner keeps the goal cost fixed
            if cell != self.planner.goal() && !equals(self.planner.grid().cost(cell), cost) {
                changes.push((cell, cost));
            }
        }
        if !changes.is_empty() {
            self.stale = true;
        }
        for (cell, cost) in changes {
            self.planner.update(cell, cost)?;
        }
        Ok(())
    }

    /// Senses, replans if needed and advances one cell.
    pub fn step(&mut self) -> Result<MissionStatus, PlanError> {
        let position = self.planner.start();
        if position == self.planner.goal() {
            return Ok(MissionStatus::Arrived);
        }
        self.sense()?;
        if self.stale {
            info!("Map changed around {}, replanning", position);
            let path = self.planner.try_replan()?;
            self.replans += 1;
            self.planned = path.into_iter().skip(1).collect();
            self.stale = false;
        }
        let next = self.planned.pop_front().ok_or(PlanError::Unreachable {
            start: position,
            goal: self.planner.goal(),
        })?;
        self.planner.set_start(next)?;
        self.traversed.push(next);
        debug!("Moved from {} to {}", position, next);
        Ok(MissionStatus::Moved(next))
    }

    /// Steps until the goal is reached, returning the traversed cells.
    pub fn run(&mut self) -> Result<&[CellId], PlanError> {
        loop {
            let moves = self.traversed.len() - 1;
            if self.planner.start() == self.planner.goal() {
                info!(
                    "Reached {} after {} moves and {} plans",
                    self.planner.goal(),
                    moves,
                    self.replans
                );
                return Ok(&self.traversed);
            }
            if moves >= self.config.max_moves {
                return Err(PlanError::MoveLimit {
                    moves: self.config.max_moves,
                });
            }
            self.step()?;
        }
    }
}
