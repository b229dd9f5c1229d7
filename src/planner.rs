//! D* Lite, following "D* Lite" by Sven Koenig and Maxim Likhachev (final, optimized version).
//!
//! The search runs backwards from the goal. Every cell has a `g` value, the current estimate of
//! its distance to the goal, and an `rhs` value, the one-step lookahead computed from its
//! neighbours. Cells whose two values disagree sit on the [OpenList] until they are made
//! consistent again. Cost changes only invalidate the cells around them, so replanning after a
//! change reuses almost all previous work.
use crate::cost_grid::{validate_cost, CellId, CostGrid};
use crate::error::{GridError, PlanError};
use crate::math::{equals, greater, less, octile, INF, SQRT2};
use crate::open_list::{Key, OpenList};
use crate::{MAX_STEPS, UNWALKABLE};
use itertools::Itertools;
use log::{debug, info, warn};

/// Cost of moving between two adjacent cells with the given cell costs: the mean of both costs,
/// scaled by [SQRT2] for diagonal moves. Impassable if either end is.
pub fn edge_cost(cost_a: f64, cost_b: f64, diagonal: bool) -> f64 {
    if cost_a == UNWALKABLE || cost_b == UNWALKABLE {
        return UNWALKABLE;
    }
    let scale = if diagonal { SQRT2 } else { 1.0 };
    scale * (cost_a + cost_b) / 2.0
}

fn is_diagonal(a: CellId, b: CellId) -> bool {
    let (dx, dy) = a.delta(&b);
    dx.abs() + dy.abs() > 1
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlannerConfig {
    /// Number of open list pops after which a search gives up.
    pub max_steps: usize,
}

impl Default for PlannerConfig {
    fn default() -> PlannerConfig {
        PlannerConfig {
            max_steps: MAX_STEPS,
        }
    }
}

/// Counters of the most recent search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Open list pops, including stale entries that were only re-keyed.
    pub steps: usize,
    /// Pops that changed the `g` value of a cell.
    pub expansions: usize,
}

/// Incremental planner between a start and a goal cell of a [CostGrid].
///
/// The planner owns the grid, so every cost change goes through [Planner::update] and the search
/// state can never silently go stale.
#[derive(Clone, Debug)]
pub struct Planner {
    grid: CostGrid,
    config: PlannerConfig,
    g: Vec<f64>,
    rhs: Vec<f64>,
    open: OpenList,
    start: CellId,
    goal: CellId,
    last: CellId,
    km: f64,
    stats: SearchStats,
    /// Keys of all open list pops, flagged when the entry was stale and only re-keyed.
    #[cfg(test)]
    pops: Vec<(Key, bool)>,
}

impl Planner {
    pub fn new(grid: CostGrid, start: CellId, goal: CellId) -> Result<Planner, GridError> {
        Planner::with_config(grid, start, goal, PlannerConfig::default())
    }

    pub fn with_config(
        grid: CostGrid,
        start: CellId,
        goal: CellId,
        config: PlannerConfig,
    ) -> Result<Planner, GridError> {
        grid.check(start)?;
        grid.check(goal)?;
        let n = grid.len();
        let mut planner = Planner {
            grid,
            config,
            g: vec![INF; n],
            rhs: vec![INF; n],
            open: OpenList::new(),
            start,
            goal,
            last: start,
            km: 0.0,
            stats: SearchStats::default(),
            #[cfg(test)]
            pops: Vec::new(),
        };
        planner.reset();
        Ok(planner)
    }

    /// Forgets all search state and seeds the open list with the goal.
    fn reset(&mut self) {
        self.g.fill(INF);
        self.rhs.fill(INF);
        self.open.clear();
        self.km = 0.0;
        self.last = self.start;
        let key = self.key_of(self.goal);
        self.open.insert(self.goal, key);
    }

    pub fn grid(&self) -> &CostGrid {
        &self.grid
    }
    pub fn into_grid(self) -> CostGrid {
        self.grid
    }
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }
    pub fn start(&self) -> CellId {
        self.start
    }
    pub fn goal(&self) -> CellId {
        self.goal
    }
    pub fn km(&self) -> f64 {
        self.km
    }
    pub fn last_stats(&self) -> SearchStats {
        self.stats
    }
    pub fn open_len(&self) -> usize {
        self.open.len()
    }

    /// Moves the start, typically because the robot advanced along the path. The accumulated
    /// heuristic offset is brought up to date on the next [update](Self::update).
    pub fn set_start(&mut self, cell: CellId) -> Result<(), GridError> {
        self.start = self.grid.check(cell)?;
        Ok(())
    }

    /// Switches to a new goal. All search state is keyed to the old goal, so it is discarded and
    /// the next [replan](Self::replan) searches from scratch on the current costs.
    pub fn set_goal(&mut self, cell: CellId) -> Result<(), GridError> {
        let goal = self.grid.check(cell)?;
        if goal != self.goal {
            debug!("Goal moved from {} to {}, resetting search", self.goal, goal);
            self.goal = goal;
            self.reset();
        }
        Ok(())
    }

    /// Current distance estimate of a cell.
    pub fn g(&self, cell: CellId) -> Result<f64, GridError> {
        Ok(self.g_of(self.grid.check(cell)?))
    }
    /// One-step lookahead of a cell. The goal's `rhs` is 0 by definition.
    pub fn rhs(&self, cell: CellId) -> Result<f64, GridError> {
        Ok(self.rhs_of(self.grid.check(cell)?))
    }
    pub fn is_consistent(&self, cell: CellId) -> Result<bool, GridError> {
        Ok(self.consistent(self.grid.check(cell)?))
    }
    /// Edge cost between two adjacent cells under the current cell costs.
    pub fn cost(&self, a: CellId, b: CellId) -> Result<f64, GridError> {
        Ok(self.edge(self.grid.check(a)?, self.grid.check(b)?))
    }
    pub fn key(&self, cell: CellId) -> Result<Key, GridError> {
        Ok(self.key_of(self.grid.check(cell)?))
    }

    fn g_of(&self, cell: CellId) -> f64 {
        self.g[self.grid.index_of(cell)]
    }
    fn rhs_of(&self, cell: CellId) -> f64 {
        if cell == self.goal {
            0.0
        } else {
            self.rhs[self.grid.index_of(cell)]
        }
    }
    fn set_g(&mut self, cell: CellId, value: f64) {
        let ix = self.grid.index_of(cell);
        self.g[ix] = value;
    }
    fn set_rhs(&mut self, cell: CellId, value: f64) {
        if cell != self.goal {
            let ix = self.grid.index_of(cell);
            self.rhs[ix] = value;
        }
    }
    fn consistent(&self, cell: CellId) -> bool {
        equals(self.g_of(cell), self.rhs_of(cell))
    }
    fn edge(&self, a: CellId, b: CellId) -> f64 {
        edge_cost(self.grid.cost(a), self.grid.cost(b), is_diagonal(a, b))
    }

    /// Octile distance, a lower bound on [cost](Self::cost) summed along any path since cell
    /// costs are at least 1.
    pub fn heuristic(a: CellId, b: CellId) -> f64 {
        let (dx, dy) = a.delta(&b);
        octile(dx as f64, dy as f64)
    }

    fn key_of(&self, cell: CellId) -> Key {
        let m = self.g_of(cell).min(self.rhs_of(cell));
        Key::new(m + Planner::heuristic(self.start, cell) + self.km, m)
    }

    /// Cheapest neighbour to continue through towards the goal, with the cost of doing so.
    /// Neighbours behind an impassable edge or without a known distance are skipped.
    fn min_succ(&self, cell: CellId) -> (Option<CellId>, f64) {
        let mut best = (None, INF);
        for n in self.grid.neighbours(cell) {
            let cost = self.edge(cell, n);
            let g = self.g_of(n);
            if cost.is_infinite() || g.is_infinite() {
                continue;
            }
            if less(cost + g, best.1) {
                best = (Some(n), cost + g);
            }
        }
        best
    }

    /// Recomputes the `rhs` of a cell and files it on the open list according to whether it is
    /// still inconsistent.
    fn update_vertex(&mut self, cell: CellId) {
        if cell != self.goal {
            let (_, rhs) = self.min_succ(cell);
            self.set_rhs(cell, rhs);
        }
        let consistent = self.consistent(cell);
        match (consistent, self.open.contains(cell)) {
            (false, true) => {
                let key = self.key_of(cell);
                self.open.update(cell, key);
            }
            (false, false) => {
                let key = self.key_of(cell);
                self.open.insert(cell, key);
            }
            (true, true) => {
                self.open.remove(cell);
            }
            (true, false) => {}
        }
    }

    /// Propagates inconsistencies until the start is consistent and no open cell can still lower
    /// its distance.
    fn compute(&mut self) -> Result<(), PlanError> {
        self.stats = SearchStats::default();
        loop {
            let Some((u, k_old)) = self.open.peek() else {
                if self.consistent(self.start) {
                    return Ok(());
                }
                warn!("Open list exhausted with inconsistent start {}", self.start);
                return Err(PlanError::Unreachable {
                    start: self.start,
                    goal: self.goal,
                });
            };
            if !k_old.less(&self.key_of(self.start)) && self.consistent(self.start) {
                return Ok(());
            }
            if self.stats.steps >= self.config.max_steps {
                warn!(
                    "No path from {} to {} within {} steps",
                    self.start, self.goal, self.config.max_steps
                );
                return Err(PlanError::BudgetExhausted {
                    steps: self.config.max_steps,
                });
            }
            self.stats.steps += 1;

            let k_new = self.key_of(u);
            if k_old.less(&k_new) {
                // The key went stale because the start moved since it was computed
                self.open.update(u, k_new);
                #[cfg(test)]
                self.pops.push((k_old, true));
                continue;
            }
            self.stats.expansions += 1;
            #[cfg(test)]
            self.pops.push((k_old, false));

            if greater(self.g_of(u), self.rhs_of(u)) {
                let g_u = self.rhs_of(u);
                self.set_g(u, g_u);
                self.open.remove(u);
                for n in self.grid.neighbours(u) {
                    if n != self.goal {
                        let candidate = self.edge(n, u) + g_u;
                        if less(candidate, self.rhs_of(n)) {
                            self.set_rhs(n, candidate);
                        }
                    }
                    self.update_vertex(n);
                }
            } else {
                let g_old = self.g_of(u);
                self.set_g(u, INF);
                if u != self.goal {
                    let (_, rhs) = self.min_succ(u);
                    self.set_rhs(u, rhs);
                }
                self.update_vertex(u);
                for n in self.grid.neighbours(u) {
                    if n != self.goal && equals(self.rhs_of(n), self.edge(n, u) + g_old) {
                        let (_, rhs) = self.min_succ(n);
                        self.set_rhs(n, rhs);
                    }
                    self.update_vertex(n);
                }
            }
        }
    }

    /// Brings the search up to date and extracts the path from the start to the goal, both
    /// included. Tells apart an unreachable goal from a search that ran out of steps.
    pub fn try_replan(&mut self) -> Result<Vec<CellId>, PlanError> {
        info!("Replanning from {} to {}", self.start, self.goal);
        self.compute()?;
        let unreachable = PlanError::Unreachable {
            start: self.start,
            goal: self.goal,
        };
        let mut path = Vec::new();
        let mut current = self.start;
        loop {
            path.push(current);
            if current == self.goal {
                break;
            }
            // A walk longer than the grid would be going in circles
            if path.len() > self.grid.len() || self.g_of(current).is_infinite() {
                info!("{} is not reachable from {}", self.goal, self.start);
                return Err(unreachable);
            }
            match self.min_succ(current) {
                (Some(next), _) => current = next,
                (None, _) => return Err(unreachable),
            }
        }
        info!(
            "Found path of {} cells after {} steps ({} expansions)",
            path.len(),
            self.stats.steps,
            self.stats.expansions
        );
        Ok(path)
    }

    /// Brings the search up to date and extracts the path from the start to the goal, both
    /// included, or `None` if there is none.
    pub fn replan(&mut self) -> Option<Vec<CellId>> {
        self.try_replan().ok()
    }

    /// Changes the cost of a cell and repairs the search state around it. The path itself is only
    /// recomputed by the next [replan](Self::replan). Updates to the goal are ignored.
    pub fn update(&mut self, cell: CellId, cost: f64) -> Result<(), GridError> {
        let cell = self.grid.check(cell)?;
        let new_cost = validate_cost(cost)?;
        if cell == self.goal {
            return Ok(());
        }
        self.km += Planner::heuristic(self.last, self.start);
        self.last = self.start;

        let old_cost = self.grid.set_cost(cell, new_cost)?;
        debug!("Cost of {} changed from {} to {}", cell, old_cost, new_cost);
        if old_cost == new_cost {
            return Ok(());
        }

        let neighbours = self.grid.neighbours(cell);
        for &n in &neighbours {
            let n_cost = self.grid.cost(n);
            let diagonal = is_diagonal(cell, n);
            let c_old = edge_cost(old_cost, n_cost, diagonal);
            let c_new = edge_cost(new_cost, n_cost, diagonal);
            self.repair_edge(cell, n, c_old, c_new);
        }
        for &n in &neighbours {
            let n_cost = self.grid.cost(n);
            let diagonal = is_diagonal(cell, n);
            let c_old = edge_cost(old_cost, n_cost, diagonal);
            let c_new = edge_cost(new_cost, n_cost, diagonal);
            self.repair_edge(n, cell, c_old, c_new);
        }
        self.update_vertex(cell);
        for n in neighbours {
            self.update_vertex(n);
        }
        Ok(())
    }

    /// Adjusts `rhs(u)` after the cost of the edge from `u` to `v` changed from `c_old` to
    /// `c_new`.
    fn repair_edge(&mut self, u: CellId, v: CellId, c_old: f64, c_new: f64) {
        if u == self.goal {
            return;
        }
        if greater(c_old, c_new) {
            let candidate = c_new + self.g_of(v);
            if less(candidate, self.rhs_of(u)) {
                self.set_rhs(u, candidate);
            }
        } else if equals(self.rhs_of(u), c_old + self.g_of(v)) {
            let (_, rhs) = self.min_succ(u);
            self.set_rhs(u, rhs);
        }
    }

    /// Sum of the edge costs along a path under the current cell costs. Fails if the path leaves
    /// the grid.
    pub fn path_cost(&self, path: &[CellId]) -> Result<f64, GridError> {
        for &cell in path {
            self.grid.check(cell)?;
        }
        Ok(path
            .iter()
            .tuple_windows()
            .map(|(&a, &b)| self.edge(a, b))
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::equals_within;
    use rand::prelude::*;

    fn planner(map: &str, start: (usize, usize), goal: (usize, usize)) -> Planner {
        let grid: CostGrid = map.parse().unwrap();
        Planner::new(
            grid,
            CellId::new(start.0, start.1),
            CellId::new(goal.0, goal.1),
        )
        .unwrap()
    }

    fn cells(coords: &[(usize, usize)]) -> Vec<CellId> {
        coords.iter().map(|&(r, c)| CellId::new(r, c)).collect()
    }

    /// The open list must hold exactly the inconsistent cells.
    fn assert_open_list_matches_inconsistent(planner: &Planner) {
        for cell in planner.grid.iter() {
            let id = cell.id();
            assert_eq!(
                planner.open.contains(id),
                !planner.consistent(id),
                "open list membership of {id} disagrees with consistency"
            );
        }
    }

    fn assert_valid_path(planner: &Planner, path: &[CellId]) {
        assert_eq!(path.first(), Some(&planner.start()));
        assert_eq!(path.last(), Some(&planner.goal()));
        for (a, b) in path.iter().tuple_windows() {
            assert!(a.is_adjacent(b), "{a} and {b} are not adjacent");
        }
        for cell in path.iter().skip(1).take(path.len().saturating_sub(2)) {
            assert!(planner.grid()[*cell].is_walkable());
        }
    }

    fn uniform_grid(n: usize) -> CostGrid {
        CostGrid::new(n, n)
    }

    #[test]
    fn edge_costs() {
        assert_eq!(edge_cost(1.0, 3.0, false), 2.0);
        assert!(equals_within(edge_cost(1.0, 1.0, true), SQRT2, 1e-12));
        assert_eq!(edge_cost(UNWALKABLE, 1.0, false), UNWALKABLE);
        assert_eq!(edge_cost(2.0, UNWALKABLE, true), UNWALKABLE);
    }

    #[test]
    fn state_defaults() {
        let planner = Planner::new(uniform_grid(3), CellId::new(0, 0), CellId::new(2, 2)).unwrap();
        assert_eq!(planner.g(CellId::new(1, 1)), Ok(INF));
        assert_eq!(planner.rhs(CellId::new(1, 1)), Ok(INF));
        assert_eq!(planner.rhs(planner.goal()), Ok(0.0));
        let key = planner.key(planner.goal()).unwrap();
        assert!(equals_within(key.k1, 2.0 * SQRT2, 1e-12));
        assert_eq!(key.k2, 0.0);
        assert_eq!(planner.open_len(), 1);
        assert!(Planner::new(uniform_grid(3), CellId::new(3, 0), CellId::new(2, 2)).is_err());
    }

    #[test]
    fn diagonal_path_on_uniform_grid() {
        let mut planner =
            Planner::new(uniform_grid(10), CellId::new(0, 0), CellId::new(9, 9)).unwrap();
        let path = planner.replan().unwrap();
        assert_eq!(path.len(), 10);
        assert_valid_path(&planner, &path);
        for (a, b) in path.iter().tuple_windows() {
            assert!(is_diagonal(*a, *b));
        }
        assert!(equals_within(planner.path_cost(&path).unwrap(), 9.0 * SQRT2, 1e-9));
    }

    #[test]
    fn routes_around_unwalkable_cell() {
        let mut grid = uniform_grid(10);
        grid.set_cost(CellId::new(5, 5), UNWALKABLE).unwrap();
        let mut planner = Planner::new(grid, CellId::new(0, 0), CellId::new(9, 9)).unwrap();
        let path = planner.replan().unwrap();
        assert!(!path.contains(&CellId::new(5, 5)));
        assert_valid_path(&planner, &path);
        assert!(equals_within(
            planner.path_cost(&path).unwrap(),
            8.0 * SQRT2 + 2.0,
            1e-9
        ));
    }

    #[test]
    fn start_equals_goal() {
        let mut planner =
            Planner::new(uniform_grid(3), CellId::new(1, 1), CellId::new(1, 1)).unwrap();
        assert_eq!(planner.replan(), Some(vec![CellId::new(1, 1)]));
    }

    #[test]
    fn enclosed_goal_is_unreachable() {
        let mut planner = planner(
            "
            ......
            ...###
            ...#..
            ...###
            ",
            (0, 0),
            (2, 5),
        );
        assert_eq!(planner.replan(), None);
        assert_eq!(
            planner.try_replan(),
            Err(PlanError::Unreachable {
                start: CellId::new(0, 0),
                goal: CellId::new(2, 5)
            })
        );
    }

    #[test]
    fn unwalkable_goal_is_unreachable() {
        let mut planner = planner("...\n..#", (0, 0), (1, 2));
        assert_eq!(planner.replan(), None);
    }

    #[test]
    fn budget_exhaustion_is_reported() {
        let config = PlannerConfig { max_steps: 3 };
        let mut planner = Planner::with_config(
            uniform_grid(10),
            CellId::new(0, 0),
            CellId::new(9, 9),
            config,
        )
        .unwrap();
        assert_eq!(
            planner.try_replan(),
            Err(PlanError::BudgetExhausted { steps: 3 })
        );
        assert_eq!(planner.last_stats().steps, 3);
        assert_eq!(planner.replan(), None);
    }

    const CORRIDOR_OPEN: &str = "
        .......
        ###.###
    ";
    const CORRIDOR_BLOCKED: &str = "
        ...#...
        ###.###
    ";

    #[test]
    fn blocking_update_matches_fresh_plan() {
        let mut incremental = planner(CORRIDOR_OPEN, (0, 0), (0, 6));
        let straight = incremental.replan().unwrap();
        assert_eq!(
            straight,
            cells(&[(0, 0), (0, 1), (0, 2), (0, 3), (0, 4), (0, 5), (0, 6)])
        );

        incremental.update(CellId::new(0, 3), UNWALKABLE).unwrap();
        assert_open_list_matches_inconsistent(&incremental);
        let detour = incremental.replan().unwrap();

        let mut fresh = planner(CORRIDOR_BLOCKED, (0, 0), (0, 6));
        assert_eq!(Some(detour.clone()), fresh.replan());
        assert_eq!(
            detour,
            cells(&[(0, 0), (0, 1), (0, 2), (1, 3), (0, 4), (0, 5), (0, 6)])
        );
    }

    #[test]
    fn opening_update_matches_fresh_plan() {
        let mut incremental = planner(CORRIDOR_BLOCKED, (0, 0), (0, 6));
        let detour = incremental.replan().unwrap();
        assert!(detour.contains(&CellId::new(1, 3)));

        incremental.update(CellId::new(0, 3), 1.0).unwrap();
        let shortcut = incremental.replan().unwrap();
        let mut fresh = planner(CORRIDOR_OPEN, (0, 0), (0, 6));
        assert_eq!(Some(shortcut.clone()), fresh.replan());
        assert_eq!(shortcut.len(), 7);
        assert!(!shortcut.contains(&CellId::new(1, 3)));
    }

    #[test]
    fn moving_start_shrinks_path() {
        let mut planner =
            Planner::new(uniform_grid(10), CellId::new(0, 0), CellId::new(9, 9)).unwrap();
        let path = planner.replan().unwrap();
        for step in 1..4 {
            planner.set_start(path[step]).unwrap();
            let shorter = planner.replan().unwrap();
            assert_eq!(shorter, path[step..].to_vec());
        }
    }

    #[test]
    fn updating_goal_is_ignored() {
        let mut planner = planner("...\n...", (0, 0), (1, 2));
        planner.update(CellId::new(1, 2), UNWALKABLE).unwrap();
        assert_eq!(planner.grid().cost(CellId::new(1, 2)), 1.0);
        assert!(planner.replan().is_some());
    }

    #[test]
    fn invalid_updates_fail() {
        let mut planner = planner("...\n...", (0, 0), (1, 2));
        assert_eq!(
            planner.update(CellId::new(5, 0), 2.0),
            Err(GridError::UnknownCell(CellId::new(5, 0)))
        );
        assert_eq!(
            planner.update(CellId::new(0, 1), 0.0),
            Err(GridError::InvalidCost { cost: 0.0 })
        );
        assert!(planner.set_start(CellId::new(0, 3)).is_err());
    }

    #[test]
    fn state_queries_reject_foreign_cells() {
        let planner = planner("...\n...", (0, 0), (1, 2));
        let outside = CellId::new(0, 3);
        let err = GridError::UnknownCell(outside);
        assert_eq!(planner.g(outside).unwrap_err(), err);
        assert_eq!(planner.rhs(outside).unwrap_err(), err);
        assert_eq!(planner.is_consistent(outside).unwrap_err(), err);
        assert_eq!(planner.key(outside).unwrap_err(), err);
        assert_eq!(planner.cost(CellId::new(0, 2), outside).unwrap_err(), err);
        assert_eq!(
            planner
                .path_cost(&[CellId::new(0, 2), outside])
                .unwrap_err(),
            err
        );
    }

    #[test]
    fn km_accumulates_start_movement() {
        let mut planner =
            Planner::new(uniform_grid(6), CellId::new(0, 0), CellId::new(5, 5)).unwrap();
        let path = planner.replan().unwrap();
        planner.set_start(path[2]).unwrap();
        planner.update(CellId::new(4, 4), 5.0).unwrap();
        assert!(equals_within(planner.km(), 2.0 * SQRT2, 1e-12));
        // No movement since the last update
        planner.update(CellId::new(4, 3), 5.0).unwrap();
        assert!(equals_within(planner.km(), 2.0 * SQRT2, 1e-12));
    }

    #[test]
    fn goal_change_reseeds_search() {
        let mut planner = planner(
            "
            ......
            .##...
            ......
            ",
            (0, 0),
            (2, 5),
        );
        assert!(planner.replan().is_some());
        planner.set_goal(CellId::new(2, 0)).unwrap();
        assert_eq!(planner.km(), 0.0);
        assert_eq!(planner.open_len(), 1);
        let path = planner.replan().unwrap();
        assert_eq!(path, cells(&[(0, 0), (1, 0), (2, 0)]));
        assert!(planner.set_goal(CellId::new(9, 9)).is_err());
    }

    #[test]
    fn search_converges_to_consistent_state() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut grid = uniform_grid(15);
        for _ in 0..40 {
            let cell = CellId::new(rng.gen_range(0..15), rng.gen_range(0..15));
            grid.set_cost(cell, UNWALKABLE).unwrap();
        }
        let (start, goal) = (CellId::new(0, 0), CellId::new(14, 14));
        grid.set_cost(start, 1.0).unwrap();
        let mut planner = Planner::new(grid, start, goal).unwrap();
        if let Some(path) = planner.replan() {
            assert_valid_path(&planner, &path);
            for cell in &path {
                assert!(planner.is_consistent(*cell).unwrap());
            }
            assert!(equals_within(
                planner.path_cost(&path).unwrap(),
                planner.g(start).unwrap(),
                1e-9
            ));
        }
        assert!(planner.is_consistent(start).unwrap());
        assert_open_list_matches_inconsistent(&planner);
    }

    /// Expanded keys never decrease within a search, also after the start moved and km grew.
    /// Only a stale entry that gets re-keyed may be followed by a smaller key.
    #[test]
    fn expanded_keys_are_monotonic() {
        const N: usize = 20;
        let check = |pops: &[(Key, bool)]| {
            for (prev, next) in pops.iter().tuple_windows() {
                assert!(prev.1 || !next.0.less(&prev.0), "{} popped after {}", next.0, prev.0);
            }
            let expanded = pops.iter().filter(|(_, stale)| !stale).map(|(key, _)| key);
            for (prev, next) in expanded.tuple_windows() {
                assert!(!next.less(prev), "{next} expanded after {prev}");
            }
        };
        let mut rng = StdRng::seed_from_u64(11);
        let mut stale_pops = 0;
        let goal = CellId::new(N - 1, N - 1);
        for _ in 0..50 {
            let mut grid = uniform_grid(N);
            let ids: Vec<CellId> = grid.iter().map(|c| c.id()).collect();
            for id in ids {
                let cost = if rng.gen_bool(0.2) {
                    UNWALKABLE
                } else {
                    rng.gen_range(1..5) as f64
                };
                grid.set_cost(id, cost).unwrap();
            }
            grid.set_cost(CellId::new(0, 0), 1.0).unwrap();
            grid.set_cost(goal, 1.0).unwrap();
            let mut planner = Planner::new(grid, CellId::new(0, 0), goal).unwrap();
            let Some(mut path) = planner.replan() else {
                continue;
            };
            check(&planner.pops);

            for _ in 0..5 {
                let ahead = path.len().saturating_sub(1).min(3);
                if ahead == 0 {
                    break;
                }
                planner.set_start(path[ahead]).unwrap();
                for _ in 0..4 {
                    let cell = CellId::new(rng.gen_range(0..N), rng.gen_range(0..N));
                    if cell != planner.start() && cell != goal {
                        let cost = if rng.gen_bool(0.5) { UNWALKABLE } else { 1.0 };
                        planner.update(cell, cost).unwrap();
                    }
                }
                assert!(planner.km() > 0.0);
                planner.pops.clear();
                let next = planner.replan();
                check(&planner.pops);
                stale_pops += planner.pops.iter().filter(|(_, stale)| *stale).count();
                match next {
                    Some(next) => path = next,
                    None => break,
                }
            }
        }
        assert!(stale_pops > 0);
    }
}
