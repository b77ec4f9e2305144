use zumo_geometry::SceneBoundary;
use zumo_map::OccupancyMapBuilder;

fn main() {
    // An L-shaped room in metres, rasterized at 10 cells per metre.
    let scene = [(0.0, 0.0), (3.0, 0.0), (3.0, 1.2), (1.5, 1.2), (1.5, 2.4), (0.0, 2.4)];
    let boundary = match SceneBoundary::from_metres(&scene, 10.0) {
        Ok(b) => b,
        Err(e) => {
            println!("Invalid scene: {}", e);
            return;
        }
    };

    let map = match OccupancyMapBuilder::new(3, 10.0).build(&boundary) {
        Ok(m) => m,
        Err(e) => {
            println!("Failed to build map: {}", e);
            return;
        }
    };

    println!("{}", map);
    println!(
        "{} of {} cells are free",
        map.grid().free_count(),
        map.width() * map.height()
    );

    // Where does a point 0.5 m into the room land on the grid?
    let p = map.metres_to_grid(0.5, 0.5);
    println!("Scene (0.50, 0.50) m -> grid {} (free: {})", p, map.is_free_at(p));
}
