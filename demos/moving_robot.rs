use dstar_lite::{CellId, CostGrid, Mission, Planner};

// In this example a robot believes the grid to be empty, but the real map contains a wall with
// a single gap:
// S.........
// ..........
// ..........
// #######.##
// ..........
// .........G
// The robot only sees the cells next to it, so it discovers the wall when it gets close and
// replans through the gap.
fn main() {
    let truth: CostGrid = "
        ..........
        ..........
        ..........
        #######.##
        ..........
        ..........
    "
    .parse()
    .unwrap();
    let sensor = |_: &CostGrid, position: CellId| {
        truth
            .neighbours(position)
            .into_iter()
            .map(|cell| (cell, truth.cost(cell)))
            .collect::<Vec<_>>()
    };
    let planner = Planner::new(CostGrid::new(6, 10), CellId::new(0, 0), CellId::new(5, 9)).unwrap();
    let mut mission = Mission::new(planner, sensor).unwrap();
    match mission.run() {
        Ok(traversed) => {
            println!("Reached the goal in {} moves:", traversed.len() - 1);
            for cell in traversed {
                println!("{}", cell);
            }
        }
        Err(err) => println!("Mission failed: {}", err),
    }
    println!("{} paths were planned", mission.replans());
}
