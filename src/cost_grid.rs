use crate::error::GridError;
use crate::{DEFAULT_COST, MIN_COST, NUM_NEIGHBOURS, UNWALKABLE};
use core::fmt;
use smallvec::SmallVec;
use std::ops::Index;
use std::str::FromStr;

/// Identity of a cell: its row and column. Cells never move, so the pair is stable for the
/// lifetime of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    pub row: usize,
    pub col: usize,
}

impl CellId {
    pub fn new(row: usize, col: usize) -> CellId {
        CellId { row, col }
    }
    /// Horizontal coordinate, equal to the column.
    pub fn x(&self) -> usize {
        self.col
    }
    /// Vertical coordinate, equal to the row.
    pub fn y(&self) -> usize {
        self.row
    }
    /// Signed column and row difference from `self` to `other`.
    pub fn delta(&self, other: &CellId) -> (i64, i64) {
        (
            other.col as i64 - self.col as i64,
            other.row as i64 - self.row as i64,
        )
    }
    /// Whether `other` is one of the 8 cells surrounding `self`.
    pub fn is_adjacent(&self, other: &CellId) -> bool {
        let (dx, dy) = self.delta(other);
        self != other && dx.abs() <= 1 && dy.abs() <= 1
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The 8 moves of the Moore neighbourhood, numbered clockwise starting from the top left. The
/// number doubles as the index into [Cell::neighbours].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    TopLeft = 0,
    Top = 1,
    TopRight = 2,
    Right = 3,
    BottomRight = 4,
    Bottom = 5,
    BottomLeft = 6,
    Left = 7,
}

impl Direction {
    pub const ALL: [Direction; NUM_NEIGHBOURS] = [
        Direction::TopLeft,
        Direction::Top,
        Direction::TopRight,
        Direction::Right,
        Direction::BottomRight,
        Direction::Bottom,
        Direction::BottomLeft,
        Direction::Left,
    ];

    pub fn num(self) -> usize {
        self as usize
    }
    pub fn diagonal(self) -> bool {
        self.num() % 2 == 0
    }
    /// Row and column offset of the move.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::TopLeft => (-1, -1),
            Direction::Top => (-1, 0),
            Direction::TopRight => (-1, 1),
            Direction::Right => (0, 1),
            Direction::BottomRight => (1, 1),
            Direction::Bottom => (1, 0),
            Direction::BottomLeft => (1, -1),
            Direction::Left => (0, -1),
        }
    }
    pub fn opposite(self) -> Direction {
        Direction::ALL[(self.num() + 4) % NUM_NEIGHBOURS]
    }
}

/// A single grid cell. Only the cost can change after the grid is built.
#[derive(Clone, Debug)]
pub struct Cell {
    id: CellId,
    cost: f64,
    neighbours: [Option<CellId>; NUM_NEIGHBOURS],
}

impl Cell {
    pub fn id(&self) -> CellId {
        self.id
    }
    pub fn x(&self) -> usize {
        self.id.x()
    }
    pub fn y(&self) -> usize {
        self.id.y()
    }
    pub fn cost(&self) -> f64 {
        self.cost
    }
    pub fn is_walkable(&self) -> bool {
        self.cost != UNWALKABLE
    }
    /// Neighbour links indexed by [Direction::num], `None` past the grid edge.
    pub fn neighbours(&self) -> &[Option<CellId>; NUM_NEIGHBOURS] {
        &self.neighbours
    }
    pub fn neighbour(&self, dir: Direction) -> Option<CellId> {
        self.neighbours[dir.num()]
    }
    /// Sets the cost after validating it, returning the previous cost.
    ///
    /// Once a [Planner](crate::planner::Planner) has been built on the grid, costs must be
    /// changed through [Planner::update](crate::planner::Planner::update) instead.
    pub fn set_cost(&mut self, cost: f64) -> Result<f64, GridError> {
        let cost = validate_cost(cost)?;
        Ok(std::mem::replace(&mut self.cost, cost))
    }
}

/// Accepts [UNWALKABLE] and finite costs of at least [MIN_COST]. Smaller costs would make the
/// octile heuristic overestimate.
pub fn validate_cost(cost: f64) -> Result<f64, GridError> {
    if cost == UNWALKABLE || (cost.is_finite() && cost >= MIN_COST) {
        Ok(cost)
    } else {
        Err(GridError::InvalidCost { cost })
    }
}

/// Describes how raw sensor or image intensities map to cell costs: anything at or below
/// `unwalkable_value` is impassable, everything else costs `max_value - raw + 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct IntensityMapping {
    pub max_value: f64,
    pub unwalkable_value: f64,
}

impl Default for IntensityMapping {
    fn default() -> IntensityMapping {
        IntensityMapping {
            max_value: 255.0,
            unwalkable_value: 0.0,
        }
    }
}

impl IntensityMapping {
    pub fn cost(&self, raw: f64) -> f64 {
        if raw <= self.unwalkable_value {
            UNWALKABLE
        } else {
            self.max_value - raw + 1.0
        }
    }
}

/// [CostGrid] owns a fixed rows x cols arena of [Cell]s. Neighbour links are computed once on
/// construction and never change.
#[derive(Clone, Debug)]
pub struct CostGrid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl CostGrid {
    /// Builds a grid in which every cell has [DEFAULT_COST].
    pub fn new(rows: usize, cols: usize) -> CostGrid {
        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                cells.push(Cell {
                    id: CellId::new(row, col),
                    cost: DEFAULT_COST,
                    neighbours: [None; NUM_NEIGHBOURS],
                });
            }
        }
        let mut grid = CostGrid { rows, cols, cells };
        grid.link_neighbours();
        grid
    }

    pub fn with_cost(rows: usize, cols: usize, cost: f64) -> Result<CostGrid, GridError> {
        CostGrid::from_costs(rows, cols, vec![cost; rows * cols])
    }

    /// Builds a grid from row-major costs.
    pub fn from_costs(rows: usize, cols: usize, costs: Vec<f64>) -> Result<CostGrid, GridError> {
        if costs.len() != rows * cols {
            return Err(GridError::DimensionMismatch {
                expected: rows * cols,
                actual: costs.len(),
            });
        }
        let mut grid = CostGrid::new(rows, cols);
        for (cell, cost) in grid.cells.iter_mut().zip(costs) {
            cell.set_cost(cost)?;
        }
        Ok(grid)
    }

    /// Builds a grid from row-major raw intensities such as a grayscale bitmap.
    pub fn from_intensities(
        rows: usize,
        cols: usize,
        raw: &[u8],
        mapping: &IntensityMapping,
    ) -> Result<CostGrid, GridError> {
        let costs = raw.iter().map(|&v| mapping.cost(v as f64)).collect();
        CostGrid::from_costs(rows, cols, costs)
    }

    fn link_neighbours(&mut self) {
        for ix in 0..self.cells.len() {
            let id = self.cells[ix].id;
            for dir in Direction::ALL {
                let (dr, dc) = dir.offset();
                let row = id.row as isize + dr;
                let col = id.col as isize + dc;
                if row >= 0 && col >= 0 && self.in_bounds(row as usize, col as usize) {
                    self.cells[ix].neighbours[dir.num()] =
                        Some(CellId::new(row as usize, col as usize));
                }
            }
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
    pub fn cols(&self) -> usize {
        self.cols
    }
    pub fn len(&self) -> usize {
        self.cells.len()
    }
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }
    pub fn contains(&self, id: CellId) -> bool {
        self.in_bounds(id.row, id.col)
    }

    /// Dense index of a cell, used by the planner for its per-cell state.
    ///
    /// Panics if the cell lies outside of the grid.
    pub fn index_of(&self, id: CellId) -> usize {
        assert!(self.contains(id), "{id} is outside of the {}x{} grid", self.rows, self.cols);
        id.row * self.cols + id.col
    }

    pub fn id(&self, row: usize, col: usize) -> Result<CellId, GridError> {
        if self.in_bounds(row, col) {
            Ok(CellId::new(row, col))
        } else {
            Err(GridError::OutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            })
        }
    }
    pub fn at(&self, row: usize, col: usize) -> Result<&Cell, GridError> {
        let id = self.id(row, col)?;
        Ok(&self[id])
    }
    pub fn at_mut(&mut self, row: usize, col: usize) -> Result<&mut Cell, GridError> {
        let ix = self.index_of(self.id(row, col)?);
        Ok(&mut self.cells[ix])
    }
    pub fn get(&self, id: CellId) -> Option<&Cell> {
        if self.contains(id) {
            Some(&self[id])
        } else {
            None
        }
    }
    pub fn check(&self, id: CellId) -> Result<CellId, GridError> {
        if self.contains(id) {
            Ok(id)
        } else {
            Err(GridError::UnknownCell(id))
        }
    }
    pub fn cost(&self, id: CellId) -> f64 {
        self[id].cost
    }
    /// Sets the cost of a cell, returning the previous cost.
    pub fn set_cost(&mut self, id: CellId, cost: f64) -> Result<f64, GridError> {
        let ix = self.index_of(self.check(id)?);
        self.cells[ix].set_cost(cost)
    }
    pub fn neighbours(&self, id: CellId) -> SmallVec<[CellId; NUM_NEIGHBOURS]> {
        self[id].neighbours.iter().flatten().copied().collect()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Checks whether the move from `a` to `b` cuts a corner, i.e. is diagonal and one of the two
    /// cells it passes between is unwalkable or off the grid. Straight moves never graze.
    pub fn grazes(&self, a: CellId, b: CellId) -> bool {
        let (dx, dy) = a.delta(&b);
        if dx.abs() + dy.abs() <= 1 {
            return false;
        }
        let row = a.row as i64 + dy;
        let col = a.col as i64 + dx;
        if row < 0 || col < 0 {
            return true;
        }
        let (row, col) = (row as usize, col as usize);
        match (self.at(a.row, col), self.at(row, a.col)) {
            (Ok(horizontal), Ok(vertical)) => !horizontal.is_walkable() || !vertical.is_walkable(),
            _ => true,
        }
    }
}

impl Index<CellId> for CostGrid {
    type Output = Cell;

    fn index(&self, id: CellId) -> &Cell {
        &self.cells[self.index_of(id)]
    }
}

/// Renders unwalkable cells as `#`, unit cost cells as `.`, integral costs up to 9 as digits and
/// anything else as `~`. The output parses back with [FromStr] for grids without `~`.
impl fmt::Display for CostGrid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in self.cells.chunks(self.cols.max(1)) {
            for cell in row {
                let c = match cell.cost {
                    c if c == UNWALKABLE => '#',
                    c if c == 1.0 => '.',
                    c if c.fract() == 0.0 && c <= 9.0 => {
                        char::from_digit(c as u32, 10).unwrap_or('~')
                    }
                    _ => '~',
                };
                write!(f, "{c}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Parses a map in which every line is a row: `.` is a unit cost cell, `#` or `@` an unwalkable
/// one and `1`-`9` a cell with that cost. Blank lines and surrounding whitespace are ignored.
impl FromStr for CostGrid {
    type Err = GridError;

    fn from_str(s: &str) -> Result<CostGrid, GridError> {
        let lines: Vec<&str> = s
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let rows = lines.len();
        let cols = lines.first().map_or(0, |l| l.chars().count());
        let mut costs = Vec::with_capacity(rows * cols);
        for (row, line) in lines.iter().enumerate() {
            if line.chars().count() != cols {
                return Err(GridError::Parse(format!(
                    "row {row} has {} cells, expected {cols}",
                    line.chars().count()
                )));
            }
            for c in line.chars() {
                let cost = match c {
                    '.' => 1.0,
                    '#' | '@' => UNWALKABLE,
                    '1'..='9' => c.to_digit(10).map_or(1.0, |d| d as f64),
                    other => {
                        return Err(GridError::Parse(format!(
                            "unexpected character '{other}' in row {row}"
                        )))
                    }
                };
                costs.push(cost);
            }
        }
        CostGrid::from_costs(rows, cols, costs)
    }
}
