//! The render surface: one page in physical units, built fresh from the layout.

use crate::canvas::{Canvas, Document};
use crate::layout::{Cell, layout};
use crate::paper::PaperConfig;
use crate::store::ImageSet;
use crate::types::{Color, Pt, Rect};

pub const GRID_COLUMNS: usize = 2;

/// Bounds of a grid cell on the page. Rows and columns split the page evenly.
pub fn cell_rect(paper: &PaperConfig, cell: &Cell) -> Rect {
    let page = paper.page_size();
    let rows = paper.grid_rows.max(1) as i32;
    let cell_w = page.width / GRID_COLUMNS as i32;
    let cell_h = page.height / rows;
    Rect {
        x: cell_w * cell.column() as i32,
        y: cell_h * cell.row as i32,
        width: cell_w,
        height: cell_h,
    }
}

pub fn render_surface(paper: &PaperConfig, images: &ImageSet) -> Document {
    let page = paper.page_size();
    let mut canvas = Canvas::new(page);
    canvas.set_fill_color(Color::WHITE);
    canvas.draw_rect(Rect {
        x: Pt::ZERO,
        y: Pt::ZERO,
        width: page.width,
        height: page.height,
    });

    for cell in layout(paper, images) {
        let Some(record) = cell.image.and_then(|i| images.get(cell.side, i)) else {
            continue;
        };
        let bounds = cell_rect(paper, &cell);
        let target = bounds.centered(Pt::from_mm(record.width_mm), Pt::from_mm(record.height_mm));
        canvas.save_state();
        canvas.clip_rect(bounds);
        canvas.draw_image(target, record);
        canvas.restore_state();
    }

    canvas.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Command;
    use crate::paper::PaperSize;
    use crate::store::{Dimension, ImageRecord, Side};

    #[test]
    fn empty_set_draws_only_background() {
        let doc = render_surface(PaperSize::A5.config(), &ImageSet::default());
        assert_eq!(doc.draw_image_count(), 0);
        assert!(doc.images.is_empty());
        assert!(matches!(doc.commands[1], Command::DrawRect { .. }));
    }

    #[test]
    fn a4_cells_tile_the_page() {
        let paper = PaperSize::A4.config();
        let cells = layout(paper, &ImageSet::default());
        let last = cell_rect(paper, &cells[7]);
        assert!((last.x.to_mm() - 105.0).abs() < 0.01);
        assert!((last.y.to_mm() - 222.75).abs() < 0.01);
        assert!((last.width.to_mm() - 105.0).abs() < 0.01);
        assert!((last.height.to_mm() - 74.25).abs() < 0.01);
    }

    #[test]
    fn image_is_centered_at_its_physical_size() {
        let mut set = ImageSet::default();
        set.push(Side::Right, ImageRecord::new("data:image/png;base64,AAAA"));
        set.resize(Side::Right, 0, Dimension::Width, "40");
        let doc = render_surface(PaperSize::A5.config(), &set);
        assert_eq!(doc.draw_image_count(), 2);
        let first = doc.commands.iter().find_map(|cmd| match cmd {
            Command::DrawImage { x, y, width, height, .. } => Some((*x, *y, *width, *height)),
            _ => None,
        });
        let (x, y, width, height) = first.unwrap();
        assert!((width.to_mm() - 40.0).abs() < 0.01);
        assert!((height.to_mm() - 25.0).abs() < 0.01);
        // right column starts at 74mm, cell is 74mm wide, row is 105mm tall
        assert!((x.to_mm() - (74.0 + 17.0)).abs() < 0.01);
        assert!((y.to_mm() - 40.0).abs() < 0.01);
    }

    #[test]
    fn every_image_is_clipped_to_its_cell() {
        let mut set = ImageSet::default();
        set.push(Side::Left, ImageRecord::new("data:image/png;base64,AAAA"));
        let doc = render_surface(PaperSize::A4.config(), &set);
        let clips = doc
            .commands
            .iter()
            .filter(|cmd| matches!(cmd, Command::ClipRect { .. }))
            .count();
        assert_eq!(clips, 4);
        assert_eq!(doc.images.len(), 1);
    }
}
