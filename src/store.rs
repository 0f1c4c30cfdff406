use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_IMAGE_MM: f32 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "left" | "l" => Some(Side::Left),
            "right" | "r" => Some(Side::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Width,
    Height,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Width => "width",
            Dimension::Height => "height",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub data_uri: Arc<str>,
    pub width_mm: f32,
    pub height_mm: f32,
    fingerprint: Arc<str>,
}

impl ImageRecord {
    pub fn new(data_uri: impl Into<Arc<str>>) -> Self {
        let data_uri = data_uri.into();
        let fingerprint = fingerprint_hex(data_uri.as_bytes()).into();
        Self {
            data_uri,
            width_mm: DEFAULT_IMAGE_MM,
            height_mm: DEFAULT_IMAGE_MM,
            fingerprint,
        }
    }

    // sha256 of the data URI; identical uploads share decode work and PDF objects.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn fingerprint_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageSet {
    pub left: Vec<ImageRecord>,
    pub right: Vec<ImageRecord>,
}

impl ImageSet {
    pub fn side(&self, side: Side) -> &[ImageRecord] {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut Vec<ImageRecord> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    pub fn get(&self, side: Side, index: usize) -> Option<&ImageRecord> {
        self.side(side).get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }

    pub fn push(&mut self, side: Side, record: ImageRecord) {
        self.side_mut(side).push(record);
    }

    /// Removes the record at `index`. Out of bounds is a no-op and returns `None`.
    pub fn remove(&mut self, side: Side, index: usize) -> Option<ImageRecord> {
        let list = self.side_mut(side);
        if index < list.len() {
            Some(list.remove(index))
        } else {
            None
        }
    }

    /// Applies a dimension edit from a text field. Returns whether the record changed.
    ///
    /// The value must parse as a finite float greater than zero; anything else
    /// leaves the record untouched.
    pub fn resize(&mut self, side: Side, index: usize, dimension: Dimension, raw: &str) -> bool {
        let Some(value) = parse_positive_mm(raw) else {
            return false;
        };
        let Some(record) = self.side_mut(side).get_mut(index) else {
            return false;
        };
        match dimension {
            Dimension::Width => record.width_mm = value,
            Dimension::Height => record.height_mm = value,
        }
        true
    }
}

fn parse_positive_mm(raw: &str) -> Option<f32> {
    let value = leading_number(raw)?;
    if value.is_finite() && value > 0.0 {
        Some(value)
    } else {
        None
    }
}

// Reads the decimal number a field starts with: "12.5mm" is 12.5, "mm12" is nothing.
fn leading_number(raw: &str) -> Option<f32> {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let digits_from = |start: usize| {
        start + bytes[start..].iter().take_while(|b| b.is_ascii_digit()).count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_end = digits_from(end);
    let mut has_digits = int_end > end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        has_digits |= frac_end > end + 1;
        end = frac_end;
    }
    if !has_digits {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_end = digits_from(end + 1 + sign);
        if exp_end > end + 1 + sign {
            end = exp_end;
        }
    }
    text[..end].parse().ok()
}
