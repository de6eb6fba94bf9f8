// SPDX-License-Identifier: MIT
//
// Copyright (c) 2025 Alexandre Severino
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use groundtin::geometry::{Point3, Transform};
use groundtin::ground::grid::{
    BorderFlags, CellKind, Grid, MAX_NB_SEEDPOINTS_TO_ADD, SMALL_GRID_SEEDPOINTS_TO_ADD,
};
use groundtin::ground::seed::lowest_points;
use groundtin::{GroundDetectionParameters, InMemoryPointCloud, PointsProviderCreator};

fn sloped_cloud(width: usize, height: usize) -> Vec<Point3> {
    let mut pts = Vec::with_capacity((width + 1) * (height + 1));
    for x in 0..=width {
        for y in 0..=height {
            pts.push(Point3::new(x as f64, y as f64, 0.01 * (x + y) as f64));
        }
    }
    pts
}

fn params(size: f64) -> GroundDetectionParameters {
    GroundDetectionParameters {
        largest_structure_size: size,
        use_multithread: false,
        ..Default::default()
    }
}

#[test]
fn test_grid_dimensions_and_border_ring() {
    let cloud = InMemoryPointCloud::new(sloped_cloud(100, 50), Transform::identity());
    let grid = Grid::build(&cloud, &params(10.0)).unwrap();
    assert_eq!(grid.rows(), 7);
    assert_eq!(grid.cols(), 12);
    assert_eq!(grid.len(), 84);

    let border = grid
        .cells()
        .iter()
        .filter(|c| matches!(c.kind(), CellKind::Border(_)))
        .count();
    assert_eq!(border, 34);
    assert!(grid.cells().iter().all(|c| c.points_to_add() == MAX_NB_SEEDPOINTS_TO_ADD));

    let range = grid.grid_range();
    assert_eq!(range.min.x, -5.0);
    assert_eq!(range.max.y, 55.0);
    assert_eq!(grid.bounding_box().max.x, 100.0);
}

#[test]
fn test_cells_tile_the_grid_range() {
    let cloud = InMemoryPointCloud::new(sloped_cloud(100, 50), Transform::identity());
    let grid = Grid::build(&cloud, &params(10.0)).unwrap();
    let last = grid.cell(grid.len() - 1).unwrap();
    assert_eq!(last.range_meters().max.x, grid.grid_range().max.x);
    assert_eq!(last.range_meters().max.y, grid.grid_range().max.y);
    assert_eq!(
        last.kind(),
        CellKind::Border(BorderFlags::TOP | BorderFlags::RIGHT)
    );
    let area: f64 = grid
        .cells()
        .iter()
        .map(|c| c.range_meters().extent(0) * c.range_meters().extent(1))
        .sum();
    let r = grid.grid_range();
    assert!((area - r.extent(0) * r.extent(1)).abs() < 1e-6);
}

#[test]
fn test_thin_cloud_keeps_one_interior_row() {
    let pts: Vec<Point3> = (0..=200).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect();
    let cloud = InMemoryPointCloud::new(pts, Transform::identity());
    let grid = Grid::build(&cloud, &params(10.0)).unwrap();
    assert_eq!(grid.rows(), 3);
    assert_eq!(grid.cols(), 22);
}

#[test]
fn test_small_grid_takes_more_seeds() {
    let cloud = InMemoryPointCloud::new(sloped_cloud(5, 5), Transform::identity());
    let grid = Grid::build(&cloud, &params(10.0)).unwrap();
    assert_eq!((grid.rows(), grid.cols()), (3, 3));
    assert!(grid.cells().iter().all(|c| c.points_to_add() == SMALL_GRID_SEEDPOINTS_TO_ADD));
}

#[test]
fn test_empty_cloud_gives_empty_grid() {
    let cloud = InMemoryPointCloud::new(Vec::new(), Transform::identity());
    assert!(cloud.bounding_box().is_empty());
    let grid = Grid::build(&cloud, &params(10.0)).unwrap();
    assert!(grid.is_empty());
    assert_eq!(grid.rows(), 0);
}

#[test]
fn test_seed_query_returns_lowest_point_per_cell() {
    let pts = sloped_cloud(100, 50);
    let cloud = InMemoryPointCloud::new(pts.clone(), Transform::identity());
    let grid = Grid::build(&cloud, &params(10.0)).unwrap();
    for cell in grid.cells() {
        let seeds = cell.query_seed_points(false).unwrap();
        assert!(seeds.len() <= 1);
        let inside: Vec<Point3> = pts
            .iter()
            .copied()
            .filter(|p| cell.range_meters().contains(p))
            .collect();
        assert_eq!(seeds, lowest_points(&inside, 1));
        assert_eq!(cell.memory_size(), 0);
    }
}

#[test]
fn test_corner_cell_mirrors_its_seed() {
    let cloud = InMemoryPointCloud::new(sloped_cloud(100, 50), Transform::identity());
    let grid = Grid::build(&cloud, &params(10.0)).unwrap();
    let corner = grid.cell(0).unwrap();
    assert_eq!(corner.kind(), CellKind::Border(BorderFlags::LEFT | BorderFlags::BOTTOM));
    let seeds = corner.query_seed_points(true).unwrap();
    assert_eq!(
        seeds,
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(-5.0, 0.0, 0.0),
            Point3::new(0.0, -5.0, 0.0),
            Point3::new(-5.0, -5.0, 0.0),
        ]
    );
}

#[test]
fn test_grid_in_project_units() {
    // cloud stored in half-meter units
    let to_units = Transform::from_scale(2.0);
    let pts: Vec<Point3> = sloped_cloud(100, 50)
        .iter()
        .map(|p| to_units.apply(p))
        .collect();
    let cloud = InMemoryPointCloud::new(pts, to_units);
    let p = GroundDetectionParameters {
        meters_to_project_units: to_units,
        ..params(10.0)
    };
    let grid = Grid::build(&cloud, &p).unwrap();
    assert_eq!((grid.rows(), grid.cols()), (7, 12));
    let seeds = grid.cell(0).unwrap().query_seed_points(false).unwrap();
    assert_eq!(seeds.len(), 1);
    assert!(seeds[0].distance_to(&Point3::new(0.0, 0.0, 0.0)) < 1e-9);
}

#[test]
fn test_lowest_points_breaks_ties_on_xy() {
    let pts = [
        Point3::new(1.0, 0.0, 5.0),
        Point3::new(3.0, 0.0, 2.0),
        Point3::new(0.0, 0.0, 8.0),
        Point3::new(2.0, 0.0, 2.0),
    ];
    assert_eq!(lowest_points(&pts, 1), vec![Point3::new(2.0, 0.0, 2.0)]);
    assert_eq!(
        lowest_points(&pts, 3),
        vec![
            Point3::new(2.0, 0.0, 2.0),
            Point3::new(3.0, 0.0, 2.0),
            Point3::new(1.0, 0.0, 5.0),
        ]
    );
}
