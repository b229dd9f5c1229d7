//! Error types for grid access and planning.
//!
//! An unreachable goal is an ordinary outcome of planning and is reported by
//! [Planner::replan](crate::planner::Planner::replan) as `None`;
//! [PlanError] is only needed by callers that want to tell the causes apart.
use thiserror::Error;

use crate::cost_grid::CellId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("cell ({row}, {col}) is outside of the {rows}x{cols} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("cell {0} does not belong to this grid")]
    UnknownCell(CellId),

    #[error("invalid cell cost {cost}")]
    InvalidCost { cost: f64 },

    #[error("expected {expected} cell values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("could not parse grid: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("no path from {start} to {goal}")]
    Unreachable { start: CellId, goal: CellId },

    #[error("search budget of {steps} steps exhausted")]
    BudgetExhausted { steps: usize },

    #[error("goal not reached within {moves} moves")]
    MoveLimit { moves: usize },

    #[error(transparent)]
    Grid(#[from] GridError),
}
