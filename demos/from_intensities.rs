use dstar_lite::{CellId, CostGrid, IntensityMapping, Planner};

// In this example a grid is built from 8-bit intensities such as a grayscale image, where 0 is
// a wall and brighter pixels are cheaper to cross. The dark band in the middle column is
// expensive, so the path prefers to go around it through the bright bottom row.
fn main() {
    #[rustfmt::skip]
    let pixels: [u8; 20] = [
        255, 255,  55, 255, 255,
        255,   0,  55,   0, 255,
        255,   0,  55,   0, 255,
        255, 255, 255, 255, 255,
    ];
    let grid = CostGrid::from_intensities(4, 5, &pixels, &IntensityMapping::default()).unwrap();
    println!("{}", grid);
    let mut planner = Planner::new(grid, CellId::new(0, 0), CellId::new(0, 4)).unwrap();
    let path = planner.replan().unwrap();
    println!("Path of cost {:.3}:", planner.path_cost(&path).unwrap());
    for cell in path {
        println!("{}", cell);
    }
}
