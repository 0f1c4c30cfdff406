//! Grid assignment: which image, if any, each print cell shows.
//!
//! Cells alternate left/right starting with left, so the grid has two columns
//! and `grid_rows` rows. Within a side, images cycle: the `k`-th cell of a
//! side shows image `k mod n`. With more than `grid_rows` images on a side,
//! the extra images are never shown.

use crate::paper::PaperConfig;
use crate::store::{ImageSet, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub index: usize,
    pub side: Side,
    pub row: usize,
    /// Index into the side's list; `None` when that side has no images.
    pub image: Option<usize>,
}

impl Cell {
    pub fn column(&self) -> usize {
        match self.side {
            Side::Left => 0,
            Side::Right => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_none()
    }
}

/// Cells each side gets on one sheet. Images past this index on a side never show.
pub fn cells_per_side(paper: &PaperConfig) -> usize {
    paper.grid_rows
}

pub fn layout(paper: &PaperConfig, images: &ImageSet) -> Vec<Cell> {
    (0..paper.cell_count())
        .map(|index| {
            let side = if index % 2 == 0 { Side::Left } else { Side::Right };
            let row = index / 2;
            let len = images.side(side).len();
            let image = if len == 0 { None } else { Some(row % len) };
            Cell {
                index,
                side,
                row,
                image,
            }
        })
        .collect()
}
