use dstar_lite::{CellId, CostGrid, Planner, UNWALKABLE};

// In this example a path is found on a grid with shape
// S....
// .....
// ....G
// S marks the start and G the goal. Afterwards the middle cell turns out to be blocked and
// the path is repaired around it.
fn main() {
    let grid = CostGrid::new(3, 5);
    let start = CellId::new(0, 0);
    let goal = CellId::new(2, 4);
    let mut planner = Planner::new(grid, start, goal).unwrap();
    if let Some(path) = planner.replan() {
        println!("A path has been found:");
        for cell in path {
            println!("{}", cell);
        }
    }

    planner.update(CellId::new(1, 2), UNWALKABLE).unwrap();
    println!("{}", planner.grid());
    match planner.replan() {
        Some(path) => println!("Repaired path: {:?}", path),
        None => println!("The goal can no longer be reached"),
    }
}
