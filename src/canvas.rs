//! CPU drawing surface standing in for a browser 2D canvas.
//!
//! Only the handful of operations the encoder and compositor need are
//! provided: axis-aligned fills, affine image draws, transform save/restore,
//! and pixel readback. Storage is premultiplied RGBA8; readback is straight.

use image::imageops::FilterType;
use kurbo::{Affine, Point, Rect};

use crate::{
    assets,
    foundation::{
        core::{RasterImage, Rgba8},
        error::{MarkerError, MarkerResult},
    },
};

/// Largest side length a surface may have.
pub const MAX_CANVAS_SIDE: u32 = 32_767;
/// Largest pixel count a surface may have.
pub const MAX_CANVAS_AREA: u64 = 268_435_456;

type PremulRgba8 = [u8; 4];

#[derive(Clone, Debug)]
pub struct Canvas {
    width: u32,
    height: u32,
    /// Premultiplied RGBA8, row-major, tightly packed.
    data: Vec<u8>,
    transform: Affine,
    saved: Vec<Affine>,
}

impl Canvas {
    /// Transparent surface of `width x height` pixels.
    pub fn new(width: u32, height: u32) -> MarkerResult<Self> {
        if width == 0 || height == 0 {
            return Err(MarkerError::canvas_unavailable(format!(
                "surface dimensions must be > 0 (got {width}x{height})"
            )));
        }
        if width > MAX_CANVAS_SIDE || height > MAX_CANVAS_SIDE {
            return Err(MarkerError::canvas_unavailable(format!(
                "surface side exceeds {MAX_CANVAS_SIDE} (got {width}x{height})"
            )));
        }
        let area = u64::from(width) * u64::from(height);
        if area > MAX_CANVAS_AREA {
            return Err(MarkerError::canvas_unavailable(format!(
                "surface area {area} exceeds {MAX_CANVAS_AREA} pixels"
            )));
        }

        Ok(Self {
            width,
            height,
            data: vec![0u8; area as usize * 4],
            transform: Affine::IDENTITY,
            saved: Vec::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn transform(&self) -> Affine {
        self.transform
    }

    /// Resets every pixel to transparent black. Ignores the current transform.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn save(&mut self) {
        self.saved.push(self.transform);
    }

    /// Pops the last saved transform; a restore without a matching save is a no-op.
    pub fn restore(&mut self) {
        if let Some(t) = self.saved.pop() {
            self.transform = t;
        }
    }

    pub fn translate(&mut self, tx: f64, ty: f64) {
        self.transform = self.transform * Affine::translate((tx, ty));
    }

    /// Rotates user space by `radians`, clockwise on screen for positive angles.
    pub fn rotate(&mut self, radians: f64) {
        self.transform = self.transform * Affine::rotate(radians);
    }

    /// Fills `rect` (user space) with `color`.
    ///
    /// The transformed rect is reduced to its device bounding box, which is exact
    /// for translations, scales and quarter-turn rotations. Pixels the box only
    /// partially covers are blended by covered area.
    pub fn fill_rect(&mut self, rect: Rect, color: Rgba8) {
        let device = self.transform.transform_rect_bbox(rect.abs());
        let Some((x_start, x_end, y_start, y_end)) = self.clip_to_pixels(device) else {
            return;
        };
        let src = color.to_premul();

        for y in y_start..y_end {
            let cov_y = span_coverage(y, device.y0, device.y1);
            for x in x_start..x_end {
                let coverage = cov_y * span_coverage(x, device.x0, device.x1);
                if coverage <= 0.0 {
                    continue;
                }
                let i = self.offset(x, y);
                let dst = [
                    self.data[i],
                    self.data[i + 1],
                    self.data[i + 2],
                    self.data[i + 3],
                ];
                let out = over(dst, src, coverage as f32);
                self.data[i..i + 4].copy_from_slice(&out);
            }
        }
    }

    /// Draws `image` stretched onto `dst` (user space) through the current transform.
    ///
    /// Each device pixel whose center lands inside `dst` is bilinearly sampled
    /// from the image. When the draw shrinks the image, it is first area-filtered
    /// down to the destination size so small targets stay representative.
    pub fn draw_image(&mut self, image: &RasterImage, dst: Rect) {
        let dst = dst.abs();
        if dst.width() <= 0.0 || dst.height() <= 0.0 {
            return;
        }
        let det = self.transform.determinant();
        if !det.is_finite() || det.abs() < f64::EPSILON {
            return;
        }
        let inverse = self.transform.inverse();
        let device = self.transform.transform_rect_bbox(dst);
        let Some((x_start, x_end, y_start, y_end)) = self.clip_to_pixels(device) else {
            return;
        };

        let source = SampleSource::prepare(image, dst, det.abs().sqrt());
        let sx = f64::from(source.width) / dst.width();
        let sy = f64::from(source.height) / dst.height();

        for y in y_start..y_end {
            for x in x_start..x_end {
                let p = inverse * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                if p.x < dst.x0 || p.x >= dst.x1 || p.y < dst.y0 || p.y >= dst.y1 {
                    continue;
                }
                let u = (p.x - dst.x0) * sx - 0.5;
                let v = (p.y - dst.y0) * sy - 0.5;
                let src = source.sample_bilinear(u, v);

                let i = self.offset(x, y);
                let dst_px = [
                    self.data[i],
                    self.data[i + 1],
                    self.data[i + 2],
                    self.data[i + 3],
                ];
                let out = over(dst_px, src, 1.0);
                self.data[i..i + 4].copy_from_slice(&out);
            }
        }
    }

    /// Straight-alpha copy of the whole surface.
    pub fn image_data(&self) -> MarkerResult<RasterImage> {
        let mut straight = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(4) {
            let c = Rgba8::from_premul([px[0], px[1], px[2], px[3]]);
            straight.extend_from_slice(&[c.r, c.g, c.b, c.a]);
        }
        RasterImage::from_rgba8(self.width, self.height, straight)
    }

    pub fn encode_png(&self) -> MarkerResult<Vec<u8>> {
        assets::encode_png(&self.image_data()?)
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Pixel index ranges `[x_start, x_end) x [y_start, y_end)` touched by `device`.
    fn clip_to_pixels(&self, device: Rect) -> Option<(u32, u32, u32, u32)> {
        let clip = |lo: f64, hi: f64, max: u32| -> Option<(u32, u32)> {
            if !lo.is_finite() || !hi.is_finite() {
                return None;
            }
            let start = lo.floor().max(0.0);
            let end = hi.ceil().min(f64::from(max));
            (start < end).then_some((start as u32, end as u32))
        };
        let (x_start, x_end) = clip(device.x0, device.x1, self.width)?;
        let (y_start, y_end) = clip(device.y0, device.y1, self.height)?;
        Some((x_start, x_end, y_start, y_end))
    }
}

/// Premultiplied pixels an image is sampled from during one draw.
struct SampleSource {
    width: u32,
    height: u32,
    premul: Vec<u8>,
}

impl SampleSource {
    fn prepare(image: &RasterImage, dst: Rect, device_scale: f64) -> Self {
        let target_w = (dst.width() * device_scale).round().max(1.0) as u32;
        let target_h = (dst.height() * device_scale).round().max(1.0) as u32;

        let (width, height, straight) = if target_w < image.width() || target_h < image.height()
        {
            let w = target_w.min(image.width());
            let h = target_h.min(image.height());
            let resized = image::imageops::resize(&image.to_rgba_image(), w, h, FilterType::Triangle);
            (w, h, resized.into_raw())
        } else {
            (image.width(), image.height(), image.as_rgba8().to_vec())
        };

        let premul = straight
            .chunks_exact(4)
            .flat_map(|px| {
                Rgba8 {
                    r: px[0],
                    g: px[1],
                    b: px[2],
                    a: px[3],
                }
                .to_premul()
            })
            .collect();

        Self {
            width,
            height,
            premul,
        }
    }

    fn texel(&self, x: i64, y: i64) -> [f64; 4] {
        let x = x.clamp(0, i64::from(self.width) - 1) as usize;
        let y = y.clamp(0, i64::from(self.height) - 1) as usize;
        let i = (y * self.width as usize + x) * 4;
        [
            f64::from(self.premul[i]),
            f64::from(self.premul[i + 1]),
            f64::from(self.premul[i + 2]),
            f64::from(self.premul[i + 3]),
        ]
    }

    /// Bilinear sample at texel-grid coordinates, clamped to the edge.
    fn sample_bilinear(&self, u: f64, v: f64) -> PremulRgba8 {
        let x0 = u.floor();
        let y0 = v.floor();
        let fx = u - x0;
        let fy = v - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let p00 = self.texel(x0, y0);
        let p10 = self.texel(x0 + 1, y0);
        let p01 = self.texel(x0, y0 + 1);
        let p11 = self.texel(x0 + 1, y0 + 1);

        let mut out = [0u8; 4];
        for c in 0..4 {
            let a = p00[c] + fx * (p10[c] - p00[c]);
            let b = p01[c] + fx * (p11[c] - p01[c]);
            out[c] = (a + fy * (b - a)).round().clamp(0.0, 255.0) as u8;
        }
        // Keep the premultiplied invariant after rounding.
        for c in 0..3 {
            out[c] = out[c].min(out[3]);
        }
        out
    }
}

fn span_coverage(px: u32, lo: f64, hi: f64) -> f64 {
    let start = f64::from(px).max(lo);
    let end = (f64::from(px) + 1.0).min(hi);
    (end - start).clamp(0.0, 1.0)
}

/// Source-over of premultiplied `src`, scaled by `opacity`, onto `dst`.
fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::*;

    fn gradient(w: u32, h: u32) -> RasterImage {
        let img = image::RgbaImage::from_fn(w, h, |x, y| {
            image::Rgba([(x * 10) as u8, (y * 10) as u8, 7, 255])
        });
        RasterImage::try_from(img).unwrap()
    }

    #[test]
    fn new_rejects_unusable_dimensions() {
        for (w, h) in [(0, 10), (10, 0), (MAX_CANVAS_SIDE + 1, 1), (20_000, 20_000)] {
            let err = Canvas::new(w, h).unwrap_err();
            assert!(matches!(err, MarkerError::CanvasUnavailable(_)), "{w}x{h}");
        }
    }

    #[test]
    fn new_canvas_is_transparent() {
        let c = Canvas::new(3, 3).unwrap();
        let img = c.image_data().unwrap();
        assert!(img.as_rgba8().iter().all(|&b| b == 0));
    }

    #[test]
    fn over_opaque_src_replaces_dst() {
        assert_eq!(over([0, 0, 0, 255], [255, 0, 0, 255], 1.0), [255, 0, 0, 255]);
        assert_eq!(over([1, 2, 3, 4], [200, 200, 200, 200], 0.0), [1, 2, 3, 4]);
    }

    #[test]
    fn fill_rect_blends_partial_edge_pixels() {
        let mut c = Canvas::new(4, 1).unwrap();
        c.fill_rect(Rect::new(0.0, 0.0, 4.0, 1.0), Rgba8::WHITE);
        c.fill_rect(Rect::new(1.5, 0.0, 4.0, 1.0), Rgba8::BLACK);
        let img = c.image_data().unwrap();

        assert_eq!(img.pixel(0, 0), Some(Rgba8::WHITE));
        let half = img.pixel(1, 0).unwrap();
        assert!((126..=129).contains(&half.r), "{half:?}");
        assert_eq!(img.pixel(2, 0), Some(Rgba8::BLACK));
        assert_eq!(img.pixel(3, 0), Some(Rgba8::BLACK));
    }

    #[test]
    fn fill_rect_outside_surface_is_noop() {
        let mut c = Canvas::new(2, 2).unwrap();
        c.fill_rect(Rect::new(5.0, 5.0, 9.0, 9.0), Rgba8::BLACK);
        c.fill_rect(Rect::new(-9.0, -9.0, -5.0, -5.0), Rgba8::BLACK);
        assert!(c.image_data().unwrap().as_rgba8().iter().all(|&b| b == 0));
    }

    #[test]
    fn draw_image_same_size_copies_pixels() {
        let src = gradient(5, 4);
        let mut c = Canvas::new(5, 4).unwrap();
        c.draw_image(&src, Rect::new(0.0, 0.0, 5.0, 4.0));
        assert_eq!(c.image_data().unwrap(), src);
    }

    #[test]
    fn quarter_turn_about_center_permutes_pixels() {
        let src = gradient(6, 6);
        let mut c = Canvas::new(6, 6).unwrap();
        c.save();
        c.translate(3.0, 3.0);
        c.rotate(-FRAC_PI_2);
        c.draw_image(&src, Rect::new(-3.0, -3.0, 3.0, 3.0));
        c.restore();
        assert_eq!(c.transform(), Affine::IDENTITY);

        let out = c.image_data().unwrap();
        for y in 0..6 {
            for x in 0..6 {
                assert_eq!(out.pixel(x, y), src.pixel(5 - y, x), "({x},{y})");
            }
        }
    }

    #[test]
    fn draw_image_downscale_averages_blocks() {
        let img = image::RgbaImage::from_fn(8, 8, |x, _| {
            if x < 4 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        let src = RasterImage::try_from(img).unwrap();
        let mut c = Canvas::new(2, 2).unwrap();
        c.draw_image(&src, Rect::new(0.0, 0.0, 2.0, 2.0));
        let out = c.image_data().unwrap();
        assert!(out.pixel(0, 0).unwrap().r < 64);
        assert!(out.pixel(1, 1).unwrap().r > 192);
    }

    #[test]
    fn draw_image_transparent_pixels_keep_background() {
        let src = RasterImage::filled(2, 2, Rgba8::TRANSPARENT).unwrap();
        let mut c = Canvas::new(2, 2).unwrap();
        c.fill_rect(Rect::new(0.0, 0.0, 2.0, 2.0), Rgba8::WHITE);
        c.draw_image(&src, Rect::new(0.0, 0.0, 2.0, 2.0));
        assert_eq!(c.image_data().unwrap().pixel(1, 1), Some(Rgba8::WHITE));
    }

    #[test]
    fn restore_without_save_keeps_transform() {
        let mut c = Canvas::new(1, 1).unwrap();
        c.translate(2.0, 0.0);
        c.restore();
        assert_eq!(c.transform(), Affine::translate((2.0, 0.0)));
    }
}
