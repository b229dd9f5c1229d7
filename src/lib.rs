//! # dstar_lite
//!
//! Incremental shortest-path planning on 8-connected cost grids using
//! [D* Lite](http://idm-lab.org/bib/abstracts/papers/aaai02b.pdf). A robot that discovers
//! obstacles on the way reports the changed cells to the [Planner], which repairs only the
//! part of its search affected by the change instead of planning again from scratch.
//!
//! Cells carry a traversal cost of at least [MIN_COST], or [UNWALKABLE]. Moving between two
//! adjacent cells costs the mean of both cell costs, times √2 for diagonal moves.
//!
//! ```
//! use dstar_lite::{CellId, CostGrid, Planner, UNWALKABLE};
//!
//! let grid: CostGrid = "
//!     .....
//!     .....
//!     .....
//! ".parse().unwrap();
//! let mut planner = Planner::new(grid, CellId::new(0, 0), CellId::new(2, 4)).unwrap();
//! let path = planner.replan().unwrap();
//! assert_eq!(path.len(), 5);
//!
//! planner.update(CellId::new(1, 2), UNWALKABLE).unwrap();
//! let path = planner.replan().unwrap();
//! assert!(!path.contains(&CellId::new(1, 2)));
//! ```
pub mod cost_grid;
pub mod error;
pub mod math;
pub mod mission;
pub mod open_list;
pub mod planner;

pub use cost_grid::{Cell, CellId, CostGrid, Direction, IntensityMapping};
pub use error::{GridError, PlanError};
pub use mission::{Mission, MissionConfig, MissionStatus, Sensor};
pub use planner::{edge_cost, Planner, PlannerConfig, SearchStats};

/// Cost of a cell that can not be entered.
pub const UNWALKABLE: f64 = math::INF;
/// Smallest finite cell cost, which keeps the octile heuristic admissible.
pub const MIN_COST: f64 = 1.0;
pub const DEFAULT_COST: f64 = 1.0;
pub const NUM_NEIGHBOURS: usize = 8;
/// Default bound on the number of open list pops of a single search.
pub const MAX_STEPS: usize = 1_000_000;
/// Precision used when comparing open list keys.
pub const KEY_EPSILON: f64 = 1e-9;
