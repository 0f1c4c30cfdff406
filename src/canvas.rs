use crate::store::ImageRecord;
use crate::types::{Color, Pt, Rect, Size};
use std::collections::BTreeMap;
use std::sync::Arc;

// Coordinates are PDF points with a top-left origin; y grows downward.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SaveState,
    RestoreState,
    SetFillColor(Color),
    // Intersects the current clip with the rect. Undone by RestoreState.
    ClipRect {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
    },
    DrawRect {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
    },
    DrawImage {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        resource_id: String,
    },
}

/// One page of drawing commands plus the images they reference, keyed by fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub page_size: Size,
    pub commands: Vec<Command>,
    pub images: BTreeMap<String, Arc<str>>,
}

impl Document {
    pub fn image_source(&self, resource_id: &str) -> Option<&str> {
        self.images.get(resource_id).map(|uri| uri.as_ref())
    }

    pub fn draw_image_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, Command::DrawImage { .. }))
            .count()
    }
}

pub struct Canvas {
    page_size: Size,
    commands: Vec<Command>,
    images: BTreeMap<String, Arc<str>>,
    fill_color: Color,
    state_stack: Vec<Color>,
}

impl Canvas {
    pub fn new(page_size: Size) -> Self {
        Self {
            page_size,
            commands: Vec::new(),
            images: BTreeMap::new(),
            fill_color: Color::rgb(0.0, 0.0, 0.0),
            state_stack: Vec::new(),
        }
    }

    pub fn save_state(&mut self) {
        self.state_stack.push(self.fill_color);
        self.commands.push(Command::SaveState);
    }

    pub fn restore_state(&mut self) {
        if let Some(color) = self.state_stack.pop() {
            self.fill_color = color;
            self.commands.push(Command::RestoreState);
        }
    }

    pub fn set_fill_color(&mut self, color: Color) {
        if self.fill_color == color {
            return;
        }
        self.fill_color = color;
        self.commands.push(Command::SetFillColor(color));
    }

    pub fn clip_rect(&mut self, rect: Rect) {
        self.commands.push(Command::ClipRect {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        });
    }

    pub fn draw_rect(&mut self, rect: Rect) {
        self.commands.push(Command::DrawRect {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        });
    }

    pub fn draw_image(&mut self, rect: Rect, record: &ImageRecord) {
        let resource_id = record.fingerprint().to_string();
        self.images
            .entry(resource_id.clone())
            .or_insert_with(|| record.data_uri.clone());
        self.commands.push(Command::DrawImage {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            resource_id,
        });
    }

    pub fn finish(mut self) -> Document {
        while !self.state_stack.is_empty() {
            self.restore_state();
        }
        Document {
            page_size: self.page_size,
            commands: self.commands,
            images: self.images,
        }
    }
}
