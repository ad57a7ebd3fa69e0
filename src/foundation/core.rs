use std::sync::Arc;

use crate::foundation::error::{MarkerError, MarkerResult};

/// Straight (non-premultiplied) RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const WHITE: Self = Self::opaque(255, 255, 255);
    pub const BLACK: Self = Self::opaque(0, 0, 0);
    pub const TRANSPARENT: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_premul(self) -> [u8; 4] {
        fn premul(c: u8, a: u8) -> u8 {
            ((u16::from(c) * u16::from(a) + 127) / 255) as u8
        }
        [
            premul(self.r, self.a),
            premul(self.g, self.a),
            premul(self.b, self.a),
            self.a,
        ]
    }

    pub fn from_premul(px: [u8; 4]) -> Self {
        let a = px[3];
        if a == 0 {
            return Self::TRANSPARENT;
        }
        let unpremul = |c: u8| -> u8 {
            ((u32::from(c) * 255 + u32::from(a) / 2) / u32::from(a)).min(255) as u8
        };
        Self {
            r: unpremul(px[0]),
            g: unpremul(px[1]),
            b: unpremul(px[2]),
            a,
        }
    }
}

/// Decoded raster in straight RGBA8, row-major, tightly packed.
///
/// The pixel buffer is shared and never mutated after construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    rgba8: Arc<[u8]>,
}

impl RasterImage {
    pub fn from_rgba8(width: u32, height: u32, rgba8: Vec<u8>) -> MarkerResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| MarkerError::validation("raster size overflow"))?;
        if width == 0 || height == 0 {
            return Err(MarkerError::validation("raster dimensions must be > 0"));
        }
        if rgba8.len() != expected {
            return Err(MarkerError::validation(format!(
                "raster buffer has {} bytes, expected {expected} for {width}x{height}",
                rgba8.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8: rgba8.into(),
        })
    }

    /// Every pixel set to `color`.
    pub fn filled(width: u32, height: u32, color: Rgba8) -> MarkerResult<Self> {
        let px = [color.r, color.g, color.b, color.a];
        let len = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| MarkerError::validation("raster size overflow"))?;
        Self::from_rgba8(width, height, px.repeat(len))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_rgba8(&self) -> &[u8] {
        &self.rgba8
    }

    /// Pixel at `(x, y)`, or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.rgba8[i..i + 4];
        Some(Rgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        })
    }

    pub fn to_rgba_image(&self) -> image::RgbaImage {
        image::RgbaImage::from_fn(self.width, self.height, |x, y| {
            let i = (y as usize * self.width as usize + x as usize) * 4;
            image::Rgba([
                self.rgba8[i],
                self.rgba8[i + 1],
                self.rgba8[i + 2],
                self.rgba8[i + 3],
            ])
        })
    }
}

impl TryFrom<image::RgbaImage> for RasterImage {
    type Error = MarkerError;

    fn try_from(img: image::RgbaImage) -> MarkerResult<Self> {
        let (width, height) = img.dimensions();
        Self::from_rgba8(width, height, img.into_raw())
    }
}
