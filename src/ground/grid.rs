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

//! Seed grid over the survey area.
//!
//! The tight cloud range is covered by `max(1, floor(extent / cell))`
//! interior cells per axis, plus one ring of border cells straddling the
//! range so the initial TIN reaches the survey edges.

use std::{
    ops::{BitOr, BitOrAssign},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use tracing::debug;

use crate::{
    error::Result,
    geometry::{aabb::Aabb, point::Point3, transform::Transform},
    ground::seed::SeedPointCandidateSet,
    params::GroundDetectionParameters,
    provider::{PointsProvider, PointsProviderCreator},
};

/// Fraction of a cell by which the grid overhangs the cloud on every side,
/// counted as half a cell per unit.
pub const SEED_BORDER_FACTOR: f64 = 1.0;

/// Seeds per cell on regular grids.
pub const MAX_NB_SEEDPOINTS_TO_ADD: usize = 1;

/// Seeds per cell when the grid has fewer than four interior cells.
pub const SMALL_GRID_SEEDPOINTS_TO_ADD: usize = 4;

/// Position of a cell on the outer ring, OR-able for corners.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BorderFlags(u8);

impl BorderFlags {
    pub const NONE: BorderFlags = BorderFlags(0);
    pub const LEFT: BorderFlags = BorderFlags(1);
    pub const RIGHT: BorderFlags = BorderFlags(1 << 1);
    pub const TOP: BorderFlags = BorderFlags(1 << 2);
    pub const BOTTOM: BorderFlags = BorderFlags(1 << 3);

    #[inline]
    pub fn contains(self, other: BorderFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Flags of the cell at (`row`, `col`) in a `rows` x `cols` grid whose
    /// row 0 is the bottom (lowest y).
    pub fn for_position(row: usize, col: usize, rows: usize, cols: usize) -> BorderFlags {
        let mut flags = BorderFlags::NONE;
        if row == 0 {
            flags |= BorderFlags::BOTTOM;
        }
        if row + 1 == rows {
            flags |= BorderFlags::TOP;
        }
        if col == 0 {
            flags |= BorderFlags::LEFT;
        }
        if col + 1 == cols {
            flags |= BorderFlags::RIGHT;
        }
        flags
    }
}

impl BitOr for BorderFlags {
    type Output = BorderFlags;
    fn bitor(self, rhs: BorderFlags) -> BorderFlags {
        BorderFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for BorderFlags {
    fn bitor_assign(&mut self, rhs: BorderFlags) {
        self.0 |= rhs.0;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellKind {
    Interior,
    Border(BorderFlags),
}

impl CellKind {
    pub fn from_flags(flags: BorderFlags) -> CellKind {
        if flags.is_empty() {
            CellKind::Interior
        } else {
            CellKind::Border(flags)
        }
    }

    pub fn flags(&self) -> BorderFlags {
        match self {
            CellKind::Interior => BorderFlags::NONE,
            CellKind::Border(flags) => *flags,
        }
    }
}

/// One grid cell and the provider scoped to it.
pub struct GridCell {
    row: usize,
    col: usize,
    kind: CellKind,
    range_meters: Aabb,
    range_project: Aabb,
    points_to_add: usize,
    provider: Mutex<Box<dyn PointsProvider>>,
    memory_size: AtomicUsize,
}

impl std::fmt::Debug for GridCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridCell")
            .field("row", &self.row)
            .field("col", &self.col)
            .field("kind", &self.kind)
            .field("range_meters", &self.range_meters)
            .field("points_to_add", &self.points_to_add)
            .finish()
    }
}

impl GridCell {
    #[inline]
    pub fn row(&self) -> usize {
        self.row
    }

    #[inline]
    pub fn col(&self) -> usize {
        self.col
    }

    #[inline]
    pub fn kind(&self) -> CellKind {
        self.kind
    }

    #[inline]
    pub fn range_meters(&self) -> &Aabb {
        &self.range_meters
    }

    #[inline]
    pub fn range_project(&self) -> &Aabb {
        &self.range_project
    }

    #[inline]
    pub fn points_to_add(&self) -> usize {
        self.points_to_add
    }

    /// Bytes held by the cell's last prefetch.
    pub fn memory_size(&self) -> usize {
        self.memory_size.load(Ordering::Relaxed)
    }

    /// Lowest points of the cell, in meters, plus their mirrors on the
    /// survey edges when `expand_to_range` is set and the cell is on the
    /// border. Prefetched points are released before returning.
    pub fn query_seed_points(&self, expand_to_range: bool) -> Result<Vec<Point3>> {
        let mut provider = self.provider.lock().unwrap_or_else(|e| e.into_inner());
        provider.prefetch_points()?;
        self.memory_size
            .store(provider.memory_size(), Ordering::Relaxed);

        let mut candidates = SeedPointCandidateSet::new(self.points_to_add);
        candidates.extend_from_slice(provider.points());
        provider.clear_prefetched_points();
        self.memory_size.store(0, Ordering::Relaxed);
        drop(provider);

        let mut seeds = candidates.into_lowest();
        if expand_to_range {
            if let CellKind::Border(flags) = self.kind {
                let mirrored: Vec<Point3> = seeds
                    .iter()
                    .flat_map(|s| mirror_on_border(s, flags, &self.range_meters))
                    .collect();
                seeds.extend(mirrored);
            }
        }
        Ok(seeds)
    }
}

/// Copies of `seed` moved onto the outer edges (and corner) of `range`
/// designated by `flags`, keeping the seed's elevation.
pub fn mirror_on_border(seed: &Point3, flags: BorderFlags, range: &Aabb) -> Vec<Point3> {
    let mut out = Vec::with_capacity(3);
    let x_edge = if flags.contains(BorderFlags::LEFT) {
        Some(range.min.x)
    } else if flags.contains(BorderFlags::RIGHT) {
        Some(range.max.x)
    } else {
        None
    };
    let y_edge = if flags.contains(BorderFlags::BOTTOM) {
        Some(range.min.y)
    } else if flags.contains(BorderFlags::TOP) {
        Some(range.max.y)
    } else {
        None
    };

    if let Some(x) = x_edge {
        out.push(Point3::new(x, seed.y, seed.z));
    }
    if let Some(y) = y_edge {
        out.push(Point3::new(seed.x, y, seed.z));
    }
    if let (Some(x), Some(y)) = (x_edge, y_edge) {
        out.push(Point3::new(x, y, seed.z));
    }
    out
}

/// Interior rows and columns for a tight range.
pub fn interior_dimensions(range: &Aabb, cell_size: f64) -> (usize, usize) {
    fn count(extent: f64, cell: f64) -> usize {
        let n = (extent / cell).floor();
        if n.is_finite() && n >= 1.0 {
            n as usize
        } else {
            1
        }
    }
    (
        count(range.extent(1), cell_size),
        count(range.extent(0), cell_size),
    )
}

/// The seed grid, in meters.
#[derive(Debug)]
pub struct Grid {
    cells: Vec<GridCell>,
    rows: usize,
    cols: usize,
    cell_size: f64,
    cloud_range_meters: Aabb,
    grid_range_meters: Aabb,
}

impl Grid {
    /// Splits the creator's cloud into cells of `largest_structure_size`
    /// meters and creates one meter-unit provider per cell.
    pub fn build(
        creator: &dyn PointsProviderCreator,
        params: &GroundDetectionParameters,
    ) -> Result<Grid> {
        let to_project = params.meters_to_project_units;
        let to_meters = params.project_to_meters();
        let cloud_range_meters = to_meters.apply_range(&creator.bounding_box());
        let cell_size = params.largest_structure_size;

        if cloud_range_meters.is_empty() {
            return Ok(Grid {
                cells: Vec::new(),
                rows: 0,
                cols: 0,
                cell_size,
                cloud_range_meters,
                grid_range_meters: cloud_range_meters,
            });
        }

        let (inner_rows, inner_cols) = interior_dimensions(&cloud_range_meters, cell_size);
        let points_to_add = if inner_rows * inner_cols < 4 {
            SMALL_GRID_SEEDPOINTS_TO_ADD
        } else {
            MAX_NB_SEEDPOINTS_TO_ADD
        };
        let rows = inner_rows + 2;
        let cols = inner_cols + 2;

        let margin = SEED_BORDER_FACTOR * cell_size / 2.0;
        let grid_range_meters = cloud_range_meters.expanded_xy(margin);
        let dx = grid_range_meters.extent(0) / cols as f64;
        let dy = grid_range_meters.extent(1) / rows as f64;

        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let min = Point3::new(
                    grid_range_meters.min.x + col as f64 * dx,
                    grid_range_meters.min.y + row as f64 * dy,
                    grid_range_meters.min.z,
                );
                // last row/col snap to the grid edge
                let max = Point3::new(
                    if col + 1 == cols {
                        grid_range_meters.max.x
                    } else {
                        grid_range_meters.min.x + (col + 1) as f64 * dx
                    },
                    if row + 1 == rows {
                        grid_range_meters.max.y
                    } else {
                        grid_range_meters.min.y + (row + 1) as f64 * dy
                    },
                    grid_range_meters.max.z,
                );
                let range_meters = Aabb::new(min, max);
                cells.push(Self::make_cell(
                    creator,
                    params,
                    &to_project,
                    row,
                    col,
                    BorderFlags::for_position(row, col, rows, cols),
                    range_meters,
                    points_to_add,
                ));
            }
        }

        debug!(
            rows,
            cols,
            cell_size,
            points_to_add,
            "seed grid built"
        );

        Ok(Grid {
            cells,
            rows,
            cols,
            cell_size,
            cloud_range_meters,
            grid_range_meters,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn make_cell(
        creator: &dyn PointsProviderCreator,
        params: &GroundDetectionParameters,
        to_project: &Transform,
        row: usize,
        col: usize,
        flags: BorderFlags,
        range_meters: Aabb,
        points_to_add: usize,
    ) -> GridCell {
        let range_project = to_project.apply_range(&range_meters);
        let mut provider = creator.create(&range_project);
        provider.set_use_meter_unit(true);
        provider.set_use_multi_thread(params.use_multithread);
        GridCell {
            row,
            col,
            kind: CellKind::from_flags(flags),
            range_meters,
            range_project,
            points_to_add,
            provider: Mutex::new(provider),
            memory_size: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    #[inline]
    pub fn cell(&self, index: usize) -> Option<&GridCell> {
        self.cells.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Tight range of the cloud, in meters.
    #[inline]
    pub fn bounding_box(&self) -> &Aabb {
        &self.cloud_range_meters
    }

    /// Range covered by the cells, border ring included.
    #[inline]
    pub fn grid_range(&self) -> &Aabb {
        &self.grid_range_meters
    }

    pub fn memory_size(&self) -> usize {
        self.cells.iter().map(GridCell::memory_size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_flags_combine() {
        let f = BorderFlags::for_position(0, 0, 3, 3);
        assert!(f.contains(BorderFlags::LEFT));
        assert!(f.contains(BorderFlags::BOTTOM));
        assert!(!f.contains(BorderFlags::TOP));
        assert!(BorderFlags::for_position(1, 1, 3, 3).is_empty());
        let top_right = BorderFlags::for_position(2, 2, 3, 3);
        assert_eq!(top_right, BorderFlags::TOP | BorderFlags::RIGHT);
    }

    #[test]
    fn corner_mirror_emits_three_points() {
        let range = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 10.0, 1.0));
        let seed = Point3::new(4.0, 6.0, 2.5);
        let out = mirror_on_border(&seed, BorderFlags::LEFT | BorderFlags::TOP, &range);
        assert_eq!(
            out,
            vec![
                Point3::new(0.0, 6.0, 2.5),
                Point3::new(4.0, 10.0, 2.5),
                Point3::new(0.0, 10.0, 2.5),
            ]
        );
        assert!(mirror_on_border(&seed, BorderFlags::NONE, &range).is_empty());
    }

    #[test]
    fn thin_range_still_has_one_interior_cell() {
        let range = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1000.0, 0.0, 0.0));
        assert_eq!(interior_dimensions(&range, 50.0), (1, 20));
    }
}
