//! Terrain sources for exercising the planner: maps and scenarios from the
//! [Moving AI benchmarks](https://movingai.com/benchmarks/grids.html) and seeded random terrain
//! with obstacles that are only discovered on the way.
//!
//! Terrain is stored as row-major raw intensities, where 0 is unwalkable and higher values are
//! cheaper to traverse, matching the default intensity mapping of `dstar_lite`.
use csv::ReaderBuilder;
use rand::Rng;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

/// Intensity of a free cell, the cheapest one to traverse.
pub const FREE: u8 = 255;
/// Intensity of a cell that can not be entered.
pub const BLOCKED: u8 = 0;

#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
    #[error("malformed map: {0}")]
    Map(String),
    #[error("unknown benchmark {0}")]
    UnknownBenchmark(String),
}

/// Row-major grid of raw intensities.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Terrain {
    pub rows: usize,
    pub cols: usize,
    pub intensities: Vec<u8>,
}

impl Terrain {
    pub fn new(rows: usize, cols: usize, intensity: u8) -> Terrain {
        Terrain {
            rows,
            cols,
            intensities: vec![intensity; rows * cols],
        }
    }
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.intensities[row * self.cols + col]
    }
    pub fn set(&mut self, row: usize, col: usize, intensity: u8) {
        self.intensities[row * self.cols + col] = intensity;
    }
    pub fn is_free(&self, row: usize, col: usize) -> bool {
        self.get(row, col) != BLOCKED
    }

    /// Returns a copy in which `count` randomly chosen free cells are blocked. Cells in
    /// `keep_free` are never blocked.
    pub fn with_hidden_obstacles<R: Rng>(
        &self,
        rng: &mut R,
        count: usize,
        keep_free: &[(usize, usize)],
    ) -> Terrain {
        let mut candidates: Vec<(usize, usize)> = (0..self.rows)
            .flat_map(|row| (0..self.cols).map(move |col| (row, col)))
            .filter(|&(row, col)| self.is_free(row, col) && !keep_free.contains(&(row, col)))
            .collect();
        let mut truth = self.clone();
        for _ in 0..count.min(candidates.len()) {
            let (row, col) = candidates.swap_remove(rng.gen_range(0..candidates.len()));
            truth.set(row, col, BLOCKED);
        }
        truth
    }

    /// Cells whose intensity in `other` differs from this terrain, with the value in `other`.
    pub fn changes(&self, other: &Terrain) -> Vec<((usize, usize), u8)> {
        self.intensities
            .iter()
            .zip(&other.intensities)
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(ix, (_, &b))| ((ix / self.cols, ix % self.cols), b))
            .collect()
    }
}

/// Random terrain in which a cell is blocked with probability `obstacle_ratio` and otherwise
/// gets an intensity in `min_intensity..=255`.
pub fn random_terrain<R: Rng>(
    rng: &mut R,
    rows: usize,
    cols: usize,
    obstacle_ratio: f64,
    min_intensity: u8,
) -> Terrain {
    let low = min_intensity.max(1);
    let intensities = (0..rows * cols)
        .map(|_| {
            if rng.gen_bool(obstacle_ratio) {
                BLOCKED
            } else {
                rng.gen_range(low..=FREE)
            }
        })
        .collect();
    Terrain {
        rows,
        cols,
        intensities,
    }
}

#[allow(unused)]
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Scenario {
    bucket: u32,
    map: String,
    width: usize,
    height: usize,
    start_x: usize,
    start_y: usize,
    goal_x: usize,
    goal_y: usize,
    optimal_length: f64,
}

impl Scenario {
    /// Start as (row, column).
    pub fn start(&self) -> (usize, usize) {
        (self.start_y, self.start_x)
    }
    /// Goal as (row, column).
    pub fn goal(&self) -> (usize, usize) {
        (self.goal_y, self.goal_x)
    }
    /// Length of the shortest path when diagonal moves may not cut corners.
    pub fn optimal_length(&self) -> f64 {
        self.optimal_length
    }
}

/// Parses a Moving AI `.map` file. `.`, `G` and `S` are free, everything else is blocked.
pub fn parse_map(text: &str) -> Result<Terrain, BenchmarkError> {
    let mut lines = text.lines();
    let mut rows = None;
    let mut cols = None;
    for line in lines.by_ref() {
        let line = line.trim();
        if line == "map" {
            break;
        }
        match line.split_once(' ') {
            Some(("height", value)) => rows = value.trim().parse::<usize>().ok(),
            Some(("width", value)) => cols = value.trim().parse::<usize>().ok(),
            _ => {}
        }
    }
    let (Some(rows), Some(cols)) = (rows, cols) else {
        return Err(BenchmarkError::Map("missing height or width".to_owned()));
    };
    let mut intensities = Vec::with_capacity(rows * cols);
    for (row, line) in lines.take(rows).enumerate() {
        let line = line.trim_end();
        if line.len() != cols {
            return Err(BenchmarkError::Map(format!(
                "row {} has {} cells instead of {}",
                row,
                line.len(),
                cols
            )));
        }
        intensities.extend(line.bytes().map(|tile| {
            if [b'.', b'G', b'S'].contains(&tile) {
                FREE
            } else {
                BLOCKED
            }
        }));
    }
    if intensities.len() != rows * cols {
        return Err(BenchmarkError::Map(format!("expected {} rows", rows)));
    }
    Ok(Terrain {
        rows,
        cols,
        intensities,
    })
}

/// Parses a Moving AI `.scen` file.
pub fn parse_scenarios(text: &str) -> Result<Vec<Scenario>, BenchmarkError> {
    // Skip the version line
    let records = text.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_reader(records.as_bytes());
    let mut scenarios = Vec::new();
    for result in reader.deserialize() {
        scenarios.push(result?);
    }
    Ok(scenarios)
}

/// Names of all maps below `root/maps`, relative to it and without extension.
pub fn benchmark_names(root: &Path) -> Result<Vec<String>, BenchmarkError> {
    let maps = root.join("maps");
    let mut names = Vec::new();
    for entry in WalkDir::new(&maps) {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "map") {
            continue;
        }
        if let Some(name) = path
            .strip_prefix(&maps)
            .ok()
            .map(|rel| rel.with_extension(""))
            .and_then(|rel| rel.to_str().map(|s| s.replace('\\', "/")))
        {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Loads `root/maps/<name>.map` together with `root/scenarios/<name>.map.scen`.
pub fn load_benchmark(root: &Path, name: &str) -> Result<(Terrain, Vec<Scenario>), BenchmarkError> {
    if !benchmark_names(root)?.iter().any(|n| n == name) {
        return Err(BenchmarkError::UnknownBenchmark(name.to_owned()));
    }
    let terrain = parse_map(&fs::read_to_string(
        root.join("maps").join(format!("{}.map", name)),
    )?)?;
    let scenarios = parse_scenarios(&fs::read_to_string(
        root.join("scenarios").join(format!("{}.map.scen", name)),
    )?)?;
    Ok((terrain, scenarios))
}

/// Root of the benchmarks shipped with this crate.
pub fn bundled_root() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR"))
}
