use crate::types::Size;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperConfig {
    pub name: &'static str,
    pub width_mm: f32,
    pub height_mm: f32,
    pub grid_rows: usize,
}

impl PaperConfig {
    pub fn page_size(&self) -> Size {
        Size::from_mm(self.width_mm, self.height_mm)
    }

    pub fn cell_count(&self) -> usize {
        self.grid_rows * 2
    }
}

const A4: PaperConfig = PaperConfig {
    name: "A4",
    width_mm: 210.0,
    height_mm: 297.0,
    grid_rows: 4,
};

const A5: PaperConfig = PaperConfig {
    name: "A5",
    width_mm: 148.0,
    height_mm: 210.0,
    grid_rows: 2,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PaperSize {
    #[default]
    A4,
    A5,
}

impl PaperSize {
    pub fn config(self) -> &'static PaperConfig {
        match self {
            PaperSize::A4 => &A4,
            PaperSize::A5 => &A5,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.config().name
    }

    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "A4" => Some(PaperSize::A4),
            "A5" => Some(PaperSize::A5),
            _ => None,
        }
    }
}

impl fmt::Display for PaperSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Export resolution in dots per inch, always within `[Dpi::MIN, Dpi::MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dpi(u32);

impl Dpi {
    pub const MIN: u32 = 72;
    pub const MAX: u32 = 1200;
    pub const DEFAULT: u32 = 300;
    // Reference screen resolution the raster scale is measured against.
    pub const BASELINE: u32 = 96;

    pub fn clamped(value: i64) -> Self {
        Dpi(value.clamp(Self::MIN as i64, Self::MAX as i64) as u32)
    }

    /// Parses user input the way the DPI field does: integer prefix, default on
    /// failure, clamp always.
    pub fn parse(raw: &str) -> Self {
        match leading_integer(raw) {
            Some(value) => Dpi::clamped(value),
            None => Dpi::clamped(Self::DEFAULT as i64),
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn scale(self) -> f32 {
        self.0 as f32 / Self::BASELINE as f32
    }
}

impl Default for Dpi {
    fn default() -> Self {
        Dpi(Self::DEFAULT)
    }
}

impl fmt::Display for Dpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Accepts "150", " 150", "150dpi", "-3"; rejects "", "abc", "dpi150".
fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1i64, &trimmed[1..]),
        Some(b'+') => (1i64, &trimmed[1..]),
        _ => (1i64, trimmed),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(sign.saturating_mul(magnitude))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn presets_match_iso_sizes() {
        let a4 = PaperSize::A4.config();
        assert_eq!((a4.width_mm, a4.height_mm, a4.grid_rows), (210.0, 297.0, 4));
        let a5 = PaperSize::A5.config();
        assert_eq!((a5.width_mm, a5.height_mm, a5.grid_rows), (148.0, 210.0, 2));
    }

    #[test]
    fn cell_counts_per_preset() {
        assert_eq!(PaperSize::A4.config().cell_count(), 8);
        assert_eq!(PaperSize::A5.config().cell_count(), 4);
    }

    #[test]
    fn paper_names_parse_case_insensitively() {
        assert_eq!(PaperSize::from_str("a5"), Some(PaperSize::A5));
        assert_eq!(PaperSize::from_str(" A4 "), Some(PaperSize::A4));
        assert_eq!(PaperSize::from_str("letter"), None);
    }

    #[test]
    fn dpi_clamps_and_defaults() {
        assert_eq!(Dpi::parse("50").get(), 72);
        assert_eq!(Dpi::parse("5000").get(), 1200);
        assert_eq!(Dpi::parse("abc").get(), 300);
        assert_eq!(Dpi::parse("").get(), 300);
        assert_eq!(Dpi::parse("150").get(), 150);
        assert_eq!(Dpi::parse("600dpi").get(), 600);
        assert_eq!(Dpi::parse("-20").get(), 72);
        assert_eq!(Dpi::parse("99999999999999999999999").get(), 1200);
    }

    #[test]
    fn dpi_scale_is_relative_to_96() {
        assert_eq!(Dpi::clamped(96).scale(), 1.0);
        assert_eq!(Dpi::clamped(300).scale(), 3.125);
    }

    proptest! {
        #[test]
        fn parsed_dpi_is_always_in_range(raw in ".{0,12}") {
            let dpi = Dpi::parse(&raw).get();
            prop_assert!((Dpi::MIN..=Dpi::MAX).contains(&dpi));
        }

        #[test]
        fn in_range_integers_are_kept(value in 72u32..=1200) {
            prop_assert_eq!(Dpi::parse(&value.to_string()).get(), value);
        }
    }
}
