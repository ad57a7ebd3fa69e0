//! Printable marker composition: white margin, colored border, inner image.

use kurbo::Rect;

use crate::{
    assets::{self, ImageSource},
    canvas::Canvas,
    foundation::{
        core::{RasterImage, Rgba8},
        error::{MarkerError, MarkerResult},
    },
};

/// Fraction of the side left white on each edge.
pub const WHITE_MARGIN: f64 = 0.10;

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MarkerGeometry {
    /// Share of the bordered area given to the inner image, in (0, 1).
    pub pattern_ratio: f64,
    /// Side of the square output in pixels.
    pub size: u32,
}

impl MarkerGeometry {
    pub fn new(pattern_ratio: f64, size: u32) -> MarkerResult<Self> {
        let g = Self {
            pattern_ratio,
            size,
        };
        g.validate()?;
        Ok(g)
    }

    pub fn validate(&self) -> MarkerResult<()> {
        if !(self.pattern_ratio > 0.0 && self.pattern_ratio < 1.0) {
            return Err(MarkerError::validation(format!(
                "pattern ratio must be in (0, 1), got {}",
                self.pattern_ratio
            )));
        }
        if self.size == 0 {
            return Err(MarkerError::validation("marker size must be > 0"));
        }
        Ok(())
    }

    /// Border thickness as a fraction of the side.
    pub fn black_margin(&self) -> f64 {
        (1.0 - 2.0 * WHITE_MARGIN) * ((1.0 - self.pattern_ratio) / 2.0)
    }

    /// Distance from the edge to the inner image, as a fraction of the side.
    pub fn inner_margin(&self) -> f64 {
        WHITE_MARGIN + self.black_margin()
    }

    /// Outer edge of the border band, in pixels.
    pub fn border_rect(&self) -> Rect {
        square_inset(f64::from(self.size), WHITE_MARGIN)
    }

    /// Window the inner image is stretched into, in pixels.
    pub fn inner_rect(&self) -> Rect {
        square_inset(f64::from(self.size), self.inner_margin())
    }
}

fn square_inset(side: f64, margin: f64) -> Rect {
    let origin = margin * side;
    let extent = side * (1.0 - 2.0 * margin);
    Rect::from_origin_size((origin, origin), (extent, extent))
}

/// A composed marker ready to be saved or printed.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerImage {
    pub image: RasterImage,
    pub geometry: MarkerGeometry,
    pub border: Rgba8,
}

impl MarkerImage {
    pub fn encode_png(&self) -> MarkerResult<Vec<u8>> {
        assets::encode_png(&self.image)
    }

    pub fn to_data_url(&self) -> MarkerResult<String> {
        Ok(assets::png_data_url(&self.encode_png()?))
    }
}

/// Composes a marker around an already decoded inner image.
///
/// `border` is used as given; validating user input is the caller's job
/// (see [`crate::color::resolve_border_color`]).
#[tracing::instrument(
    level = "debug",
    skip(inner),
    fields(inner_w = inner.width(), inner_h = inner.height())
)]
pub fn compose_marker(
    inner: &RasterImage,
    geometry: MarkerGeometry,
    border: Rgba8,
) -> MarkerResult<MarkerImage> {
    geometry.validate()?;
    tracing::debug!(
        black_margin = geometry.black_margin(),
        inner_margin = geometry.inner_margin(),
        "marker geometry"
    );

    let side = f64::from(geometry.size);
    let mut canvas = Canvas::new(geometry.size, geometry.size)?;
    canvas.fill_rect(Rect::new(0.0, 0.0, side, side), Rgba8::WHITE);
    canvas.fill_rect(geometry.border_rect(), border);

    // White under the image so transparent pixels print as paper.
    let inner_rect = geometry.inner_rect();
    canvas.fill_rect(inner_rect, Rgba8::WHITE);
    canvas.draw_image(inner, inner_rect);

    Ok(MarkerImage {
        image: canvas.image_data()?,
        geometry,
        border,
    })
}

/// Decodes `source` then composes; nothing is produced if decoding fails.
pub fn build_full_marker(
    source: &ImageSource,
    geometry: MarkerGeometry,
    border: Rgba8,
) -> MarkerResult<MarkerImage> {
    geometry.validate()?;
    let inner = source.load().map_err(|e| match e {
        MarkerError::ImageDecode(msg) => MarkerError::image_decode(format!("inner image: {msg}")),
        other => other,
    })?;
    compose_marker(&inner, geometry, border)
}
