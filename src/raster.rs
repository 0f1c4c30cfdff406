use crate::canvas::{Command, Document};
use crate::error::EyeGridError;
use crate::types::{CSS_PX_PER_INCH, Color, PT_PER_INCH, Pt};
use crate::upload::parse_data_uri;
use rayon::prelude::*;
use std::collections::HashMap;
use tiny_skia::{
    FilterQuality, IntSize, Paint, Pattern, Pixmap, Rect, Shader, SpreadMode, Transform,
};

// Every clip on the surface is an axis-aligned rect in page points, so the
// running clip is their intersection rather than a page-sized mask.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Clip {
    Page,
    Rect(Rect),
    Nothing,
}

impl Clip {
    fn intersect(self, rect: Rect) -> Clip {
        match self.visible_part(rect) {
            Some(visible) => Clip::Rect(visible),
            None => Clip::Nothing,
        }
    }

    fn visible_part(self, rect: Rect) -> Option<Rect> {
        match self {
            Clip::Page => Some(rect),
            Clip::Rect(clip) => clip.intersect(&rect),
            Clip::Nothing => None,
        }
    }
}

/// Pixel dimensions of `document` rendered at `scale` times the CSS reference size.
pub fn raster_size(document: &Document, scale: f32) -> Result<(u32, u32), EyeGridError> {
    if !scale.is_finite() || scale <= 0.0 {
        return Err(EyeGridError::InvalidConfiguration(format!(
            "raster scale must be > 0, got {scale}"
        )));
    }
    let (css_w, css_h) = document.page_size.css_px();
    Ok((scaled_px(css_w, scale)?, scaled_px(css_h, scale)?))
}

fn scaled_px(css: f32, scale: f32) -> Result<u32, EyeGridError> {
    let px = (f64::from(css) * f64::from(scale)).round();
    if px < 1.0 || px > f64::from(u32::MAX) {
        return Err(EyeGridError::Raster(format!(
            "{css} css px at scale {scale} is not a usable pixel size"
        )));
    }
    Ok(px as u32)
}

/// Rasterizes the page on an opaque white background and encodes it as PNG.
pub fn document_to_png(document: &Document, scale: f32) -> Result<Vec<u8>, EyeGridError> {
    rasterize(document, scale)?
        .encode_png()
        .map_err(|e| EyeGridError::Raster(format!("png encode failed: {e}")))
}

pub(crate) fn rasterize(document: &Document, scale: f32) -> Result<Pixmap, EyeGridError> {
    let (width, height) = raster_size(document, scale)?;
    let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
        EyeGridError::Raster(format!("cannot allocate a {width}x{height} raster"))
    })?;
    pixmap.fill(tiny_skia::Color::WHITE);

    let images = decode_images(document)?;
    let px_per_pt = scale * CSS_PX_PER_INCH / PT_PER_INCH;
    let page = Transform::from_scale(px_per_pt, px_per_pt);

    // Fill color and clip travel together through save/restore.
    let mut fill = Color::rgb(0.0, 0.0, 0.0);
    let mut clip = Clip::Page;
    let mut saved: Vec<(Color, Clip)> = Vec::new();

    for cmd in &document.commands {
        match cmd {
            Command::SaveState => saved.push((fill, clip)),
            Command::RestoreState => {
                if let Some((prev_fill, prev_clip)) = saved.pop() {
                    fill = prev_fill;
                    clip = prev_clip;
                }
            }
            Command::SetFillColor(color) => fill = *color,
            Command::ClipRect {
                x,
                y,
                width: w,
                height: h,
            } => {
                clip = match skia_rect(*x, *y, *w, *h) {
                    Some(rect) => clip.intersect(rect),
                    None => Clip::Nothing,
                };
            }
            Command::DrawRect {
                x,
                y,
                width: w,
                height: h,
            } => {
                if let Some(rect) = skia_rect(*x, *y, *w, *h).and_then(|r| clip.visible_part(r)) {
                    pixmap.fill_rect(rect, &solid_paint(fill), page, None);
                }
            }
            Command::DrawImage {
                x,
                y,
                width: w,
                height: h,
                resource_id,
            } => {
                let image = images.get(resource_id).ok_or_else(|| {
                    EyeGridError::Raster(format!("image {resource_id} is not part of the page"))
                })?;
                let Some(visible) = skia_rect(*x, *y, *w, *h).and_then(|r| clip.visible_part(r))
                else {
                    continue;
                };
                // Stretch the source's pixel grid onto the target box in page points.
                let placement = Transform::from_row(
                    w.to_f32() / image.width() as f32,
                    0.0,
                    0.0,
                    h.to_f32() / image.height() as f32,
                    x.to_f32(),
                    y.to_f32(),
                );
                let paint = image_paint(image, placement);
                pixmap.fill_rect(visible, &paint, page, None);
            }
        }
    }

    Ok(pixmap)
}

fn skia_rect(x: Pt, y: Pt, width: Pt, height: Pt) -> Option<Rect> {
    Rect::from_xywh(x.to_f32(), y.to_f32(), width.to_f32(), height.to_f32())
}

fn image_paint(image: &Pixmap, placement: Transform) -> Paint<'_> {
    let shader: Shader<'_> = Pattern::new(
        image.as_ref(),
        SpreadMode::Pad,
        FilterQuality::Bilinear,
        1.0,
        placement,
    );
    Paint {
        shader,
        anti_alias: true,
        ..Paint::default()
    }
}

fn solid_paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(channel_u8(color.r), channel_u8(color.g), channel_u8(color.b), 255);
    paint.anti_alias = true;
    paint
}

fn channel_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

// Every referenced image must decode; a page with a missing cell is not exported.
fn decode_images(document: &Document) -> Result<HashMap<String, Pixmap>, EyeGridError> {
    document
        .images
        .par_iter()
        .map(|(id, uri)| {
            let pixmap = decode_data_uri(uri).ok_or_else(|| {
                EyeGridError::Raster(format!("image {id} could not be decoded"))
            })?;
            Ok((id.clone(), pixmap))
        })
        .collect()
}

fn decode_data_uri(uri: &str) -> Option<Pixmap> {
    let (_, bytes) = parse_data_uri(uri)?;
    let rgba = image::load_from_memory(&bytes).ok()?.into_rgba8();
    let size = IntSize::from_wh(rgba.width(), rgba.height())?;
    // tiny-skia stores premultiplied RGBA.
    let mut data = rgba.into_raw();
    for px in data.chunks_exact_mut(4) {
        let alpha = px[3];
        for channel in &mut px[..3] {
            *channel = premultiply(*channel, alpha);
        }
    }
    Pixmap::from_vec(data, size)
}

fn premultiply(channel: u8, alpha: u8) -> u8 {
    ((u16::from(channel) * u16::from(alpha) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::store::ImageRecord;
    use crate::types::{Pt, Size};
    use crate::upload::encode_data_uri;
    use image::RgbaImage;

    fn png_bytes(width: u32, height: u32, rows: &[[u8; 4]]) -> Vec<u8> {
        let mut src = RgbaImage::new(width, height);
        for (y, color) in rows.iter().enumerate() {
            for x in 0..width {
                src.put_pixel(x, y as u32, image::Rgba(*color));
            }
        }
        let mut bytes = Vec::new();
        src.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
        bytes
    }

    fn rect(x: f32, y: f32, w: f32, h: f32) -> crate::types::Rect {
        crate::types::Rect {
            x: Pt::from_f32(x),
            y: Pt::from_f32(y),
            width: Pt::from_f32(w),
            height: Pt::from_f32(h),
        }
    }

    #[test]
    fn a4_at_300dpi_matches_print_resolution() {
        let doc = Canvas::new(Size::from_mm(210.0, 297.0)).finish();
        assert_eq!(raster_size(&doc, 300.0 / 96.0).unwrap(), (2480, 3508));
        assert_eq!(raster_size(&doc, 1.0).unwrap(), (794, 1123));
    }

    #[test]
    fn non_positive_scale_is_rejected() {
        let doc = Canvas::new(Size::from_mm(10.0, 10.0)).finish();
        assert!(matches!(
            raster_size(&doc, 0.0),
            Err(EyeGridError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn empty_page_is_opaque_white() {
        let doc = Canvas::new(Size::from_mm(20.0, 20.0)).finish();
        let png = document_to_png(&doc, 1.0).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        assert!(img.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn decoded_pixels_are_premultiplied() {
        let uri = encode_data_uri("image/png", &png_bytes(1, 1, &[[255, 0, 0, 128]]));
        let pixmap = decode_data_uri(&uri).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (1, 1));
        assert_eq!(pixmap.data(), &[128, 0, 0, 128]);
    }

    #[test]
    fn draw_image_preserves_top_to_bottom_source_orientation() {
        let uri = encode_data_uri(
            "image/png",
            &png_bytes(1, 2, &[[255, 0, 0, 255], [0, 0, 255, 255]]),
        );
        let record = ImageRecord::new(uri);
        let mut canvas = Canvas::new(Size {
            width: Pt::from_f32(72.0),
            height: Pt::from_f32(72.0),
        });
        canvas.draw_image(rect(18.0, 18.0, 36.0, 36.0), &record);
        // 72pt at scale 1 is 96px; 1pt = 4/3px.
        let img = image::load_from_memory(&document_to_png(&canvas.finish(), 1.0).unwrap())
            .unwrap()
            .to_rgba8();
        let top = img.get_pixel(48, 30).0;
        let bottom = img.get_pixel(48, 66).0;
        assert!(top[0] > top[2], "expected red on top, got {:?}", top);
        assert!(bottom[2] > bottom[0], "expected blue at bottom, got {:?}", bottom);
    }

    #[test]
    fn clip_rect_limits_oversized_image() {
        let uri = encode_data_uri("image/png", &png_bytes(1, 1, &[[0, 0, 0, 255]]));
        let record = ImageRecord::new(uri);
        let mut canvas = Canvas::new(Size {
            width: Pt::from_f32(72.0),
            height: Pt::from_f32(72.0),
        });
        canvas.save_state();
        canvas.clip_rect(rect(0.0, 0.0, 36.0, 72.0));
        canvas.draw_image(rect(0.0, 0.0, 72.0, 72.0), &record);
        canvas.restore_state();
        let img = image::load_from_memory(&document_to_png(&canvas.finish(), 1.0).unwrap())
            .unwrap()
            .to_rgba8();
        let inside = img.get_pixel(10, 48).0;
        assert!(inside[0] < 16 && inside[3] == 255, "got {:?}", inside);
        assert_eq!(img.get_pixel(80, 48).0, [255, 255, 255, 255]);
    }

    #[test]
    fn nested_clips_intersect() {
        let uri = encode_data_uri("image/png", &png_bytes(1, 1, &[[0, 0, 0, 255]]));
        let record = ImageRecord::new(uri);
        let mut canvas = Canvas::new(Size {
            width: Pt::from_f32(72.0),
            height: Pt::from_f32(72.0),
        });
        canvas.save_state();
        canvas.clip_rect(rect(0.0, 0.0, 36.0, 72.0));
        canvas.clip_rect(rect(0.0, 36.0, 72.0, 36.0));
        canvas.draw_image(rect(0.0, 0.0, 72.0, 72.0), &record);
        canvas.restore_state();
        let img = image::load_from_memory(&document_to_png(&canvas.finish(), 1.0).unwrap())
            .unwrap()
            .to_rgba8();
        // only the bottom-left quadrant is inside both clips
        assert!(img.get_pixel(20, 70).0[0] < 16);
        assert_eq!(img.get_pixel(20, 20).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(70, 70).0, [255, 255, 255, 255]);
    }

    #[test]
    fn disjoint_clips_hide_everything_until_restore() {
        let uri = encode_data_uri("image/png", &png_bytes(1, 1, &[[0, 0, 0, 255]]));
        let record = ImageRecord::new(uri);
        let mut canvas = Canvas::new(Size {
            width: Pt::from_f32(72.0),
            height: Pt::from_f32(72.0),
        });
        canvas.save_state();
        canvas.clip_rect(rect(0.0, 0.0, 20.0, 20.0));
        canvas.clip_rect(rect(40.0, 40.0, 20.0, 20.0));
        canvas.draw_image(rect(0.0, 0.0, 72.0, 72.0), &record);
        canvas.restore_state();
        let doc = canvas.finish();
        let img = image::load_from_memory(&document_to_png(&doc, 1.0).unwrap())
            .unwrap()
            .to_rgba8();
        assert!(img.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn clip_state_is_plain_rect_intersection() {
        let a = Rect::from_xywh(0.0, 0.0, 10.0, 10.0).unwrap();
        let b = Rect::from_xywh(5.0, 5.0, 10.0, 10.0).unwrap();
        let far = Rect::from_xywh(50.0, 50.0, 1.0, 1.0).unwrap();
        assert_eq!(Clip::Page.visible_part(a), Some(a));
        assert_eq!(
            Clip::Page.intersect(a).intersect(b),
            Clip::Rect(Rect::from_xywh(5.0, 5.0, 5.0, 5.0).unwrap())
        );
        assert_eq!(Clip::Rect(a).intersect(far), Clip::Nothing);
        assert_eq!(Clip::Nothing.visible_part(a), None);
    }

    #[test]
    fn undecodable_image_fails_the_raster() {
        let record = ImageRecord::new(encode_data_uri("image/png", b"not a png"));
        let mut canvas = Canvas::new(Size::from_mm(20.0, 20.0));
        canvas.draw_image(rect(0.0, 0.0, 10.0, 10.0), &record);
        let err = document_to_png(&canvas.finish(), 1.0).unwrap_err();
        assert!(matches!(err, EyeGridError::Raster(_)));
    }
}
