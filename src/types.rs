use fixed::types::I32F32;

pub const MM_PER_INCH: f32 = 25.4;
pub const PT_PER_INCH: f32 = 72.0;
// CSS reference pixel: 96 per inch regardless of the output device.
pub const CSS_PX_PER_INCH: f32 = 96.0;

// Fixed-point PDF points. Geometry stays deterministic across the raster and print paths.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Pt(I32F32);

impl Pt {
    pub const ZERO: Pt = Pt(I32F32::ZERO);

    /// Non-finite input maps to zero; out-of-range input saturates.
    pub fn from_f32(value: f32) -> Pt {
        if !value.is_finite() {
            return Pt::ZERO;
        }
        Pt(I32F32::saturating_from_num(value))
    }

    pub fn from_mm(mm: f32) -> Pt {
        Pt::from_f32(mm * PT_PER_INCH / MM_PER_INCH)
    }

    pub fn to_f32(self) -> f32 {
        self.0.to_num()
    }

    pub fn to_mm(self) -> f32 {
        self.to_f32() * MM_PER_INCH / PT_PER_INCH
    }
}

impl std::ops::Add for Pt {
    type Output = Pt;
    fn add(self, rhs: Pt) -> Pt {
        Pt(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for Pt {
    type Output = Pt;
    fn sub(self, rhs: Pt) -> Pt {
        Pt(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::Mul<i32> for Pt {
    type Output = Pt;
    fn mul(self, rhs: i32) -> Pt {
        Pt(self.0.saturating_mul_int(i64::from(rhs)))
    }
}

// Division by zero yields zero rather than panicking.
impl std::ops::Div<i32> for Pt {
    type Output = Pt;
    fn div(self, rhs: i32) -> Pt {
        Pt(self.0.checked_div_int(i64::from(rhs)).unwrap_or(I32F32::ZERO))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: Pt,
    pub height: Pt,
}

impl Size {
    pub fn from_mm(width_mm: f32, height_mm: f32) -> Self {
        Self {
            width: Pt::from_mm(width_mm),
            height: Pt::from_mm(height_mm),
        }
    }

    /// Size in CSS reference pixels (96 per inch), the unit the raster scale applies to.
    pub fn css_px(self) -> (f32, f32) {
        let factor = CSS_PX_PER_INCH / PT_PER_INCH;
        (self.width.to_f32() * factor, self.height.to_f32() * factor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: Pt,
    pub y: Pt,
    pub width: Pt,
    pub height: Pt,
}

impl Rect {
    /// Centers a `width` x `height` box inside `self`. The result may overflow `self`.
    pub fn centered(self, width: Pt, height: Pt) -> Rect {
        Rect {
            x: self.x + (self.width - width) / 2,
            y: self.y + (self.height - height) / 2,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mm_to_pt_matches_iso_a4() {
        let size = Size::from_mm(210.0, 297.0);
        assert!((size.width.to_f32() - 595.276).abs() < 0.01);
        assert!((size.height.to_f32() - 841.89).abs() < 0.01);
    }

    #[test]
    fn css_px_uses_96_per_inch() {
        let (w, h) = Size::from_mm(25.4, 50.8).css_px();
        assert!((w - 96.0).abs() < 0.01);
        assert!((h - 192.0).abs() < 0.01);
    }

    #[test]
    fn centered_box_can_overflow() {
        let cell = Rect {
            x: Pt::from_f32(10.0),
            y: Pt::from_f32(10.0),
            width: Pt::from_f32(20.0),
            height: Pt::from_f32(20.0),
        };
        let inner = cell.centered(Pt::from_f32(40.0), Pt::from_f32(10.0));
        assert_eq!(inner.x, Pt::ZERO);
        assert_eq!(inner.y, Pt::from_f32(15.0));
    }

    #[test]
    fn division_by_zero_is_zero() {
        assert_eq!(Pt::from_f32(12.0) / 0, Pt::ZERO);
        assert_eq!(Pt::from_f32(12.0) / 4, Pt::from_f32(3.0));
        assert_eq!(Pt::from_f32(f32::NAN), Pt::ZERO);
    }

    #[test]
    fn pt_round_trips_through_mm() {
        let pt = Pt::from_mm(25.0);
        assert!((pt.to_mm() - 25.0).abs() < 0.001);
    }
}
