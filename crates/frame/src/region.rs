use crate::a1::Coord;
use serde::{Deserialize, Serialize};

/// A rectangular block of cells in grid space: 0-based, half-open on both
/// axes, matching the remote service's grid-range convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub start_row: usize,
    pub end_row: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl Region {
    #[must_use]
    pub fn new(start_row: usize, end_row: usize, start_col: usize, end_col: usize) -> Self {
        Region {
            start_row,
            end_row,
            start_col,
            end_col,
        }
    }

    /// Build from an inclusive 1-based coordinate pair.
    #[must_use]
    pub fn from_coords(start: Coord, end: Coord) -> Self {
        Region {
            start_row: start.row - 1,
            end_row: end.row,
            start_col: start.col - 1,
            end_col: end.col,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start_row >= self.end_row || self.start_col >= self.end_col
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.end_row - self.start_row) * (self.end_col - self.start_col)
        }
    }

    /// Whether two regions share at least one cell.
    #[must_use]
    pub fn overlaps(&self, other: &Region) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.start_row < other.end_row
            && other.start_row < self.end_row
            && self.start_col < other.end_col
            && other.start_col < self.end_col
    }

    /// Clip to a `rows` x `cols` grid. Returns `None` when nothing is left.
    #[must_use]
    pub fn clip(&self, rows: usize, cols: usize) -> Option<Region> {
        let clipped = Region {
            start_row: self.start_row,
            end_row: self.end_row.min(rows),
            start_col: self.start_col,
            end_col: self.end_col.min(cols),
        };
        if clipped.is_empty() {
            None
        } else {
            Some(clipped)
        }
    }
}

/// Copy each merged region's top-left value across the rest of the region.
///
/// Regions partially outside the grid are clipped; a region whose anchor
/// (top-left) cell falls outside the grid carries no recoverable value and
/// is skipped. Running this twice over the same regions is a no-op the
/// second time.
pub fn fill_merged(grid: &mut [Vec<String>], regions: &[Region]) {
    let rows = grid.len();
    let cols = grid.first().map_or(0, Vec::len);

    for region in regions {
        if region.start_row >= rows || region.start_col >= cols {
            continue;
        }
        let Some(clipped) = region.clip(rows, cols) else {
            continue;
        };

        let anchor = grid[clipped.start_row][clipped.start_col].clone();
        for row in &mut grid[clipped.start_row..clipped.end_row] {
            for cell in &mut row[clipped.start_col..clipped.end_col] {
                cell.clone_from(&anchor);
            }
        }
    }
}
