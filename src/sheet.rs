//! Printable A4 sheets holding one, two or six copies of a marker.
//!
//! Placement is expressed in PostScript points and rasterized at the requested
//! DPI. Markers flow from the top margin; single and pair layouts are centered
//! horizontally, the six-up layout is two adjacent 200 pt columns.

use kurbo::Rect;

use crate::{
    canvas::Canvas,
    foundation::{
        core::{RasterImage, Rgba8},
        error::{MarkerError, MarkerResult},
    },
    marker::MarkerImage,
};

pub const PAGE_WIDTH_PT: f64 = 595.28;
pub const PAGE_HEIGHT_PT: f64 = 841.89;
pub const PAGE_MARGIN_PT: f64 = 40.0;
pub const DEFAULT_DPI: u32 = 150;
pub const MIN_DPI: u32 = 36;
pub const MAX_DPI: u32 = 1200;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SheetLayout {
    Single,
    Pair,
    Six,
}

impl SheetLayout {
    pub fn from_per_page(per_page: u32) -> MarkerResult<Self> {
        match per_page {
            1 => Ok(Self::Single),
            2 => Ok(Self::Pair),
            6 => Ok(Self::Six),
            n => Err(MarkerError::validation(format!(
                "markers per page must be 1, 2 or 6, got {n}"
            ))),
        }
    }

    pub fn per_page(self) -> u32 {
        match self {
            Self::Single => 1,
            Self::Pair => 2,
            Self::Six => 6,
        }
    }

    /// Marker placements on the page, in points.
    pub fn slots(self) -> Vec<Rect> {
        let content_w = PAGE_WIDTH_PT - 2.0 * PAGE_MARGIN_PT;
        let centered = |side: f64, top: f64| {
            let x = PAGE_MARGIN_PT + (content_w - side) / 2.0;
            Rect::from_origin_size((x, top), (side, side))
        };

        match self {
            Self::Single => vec![centered(500.0, PAGE_MARGIN_PT)],
            Self::Pair => vec![
                centered(250.0, PAGE_MARGIN_PT),
                centered(250.0, PAGE_MARGIN_PT + 250.0 + 20.0),
            ],
            Self::Six => {
                let side = 200.0;
                let row_gap = 10.0;
                (0..3)
                    .flat_map(|row| {
                        let top = PAGE_MARGIN_PT + f64::from(row) * (side + row_gap);
                        (0..2).map(move |col| {
                            let left = PAGE_MARGIN_PT + f64::from(col) * side;
                            Rect::from_origin_size((left, top), (side, side))
                        })
                    })
                    .collect()
            }
        }
    }
}

/// Rasterizes a white A4 page with `layout.per_page()` copies of `marker`.
#[tracing::instrument(level = "debug", skip(marker))]
pub fn compose_sheet(
    marker: &MarkerImage,
    layout: SheetLayout,
    dpi: u32,
) -> MarkerResult<RasterImage> {
    if !(MIN_DPI..=MAX_DPI).contains(&dpi) {
        return Err(MarkerError::validation(format!(
            "sheet dpi must be in {MIN_DPI}..={MAX_DPI}, got {dpi}"
        )));
    }
    let scale = f64::from(dpi) / 72.0;
    let width = (PAGE_WIDTH_PT * scale).round() as u32;
    let height = (PAGE_HEIGHT_PT * scale).round() as u32;

    let mut canvas = Canvas::new(width, height)?;
    canvas.fill_rect(
        Rect::new(0.0, 0.0, f64::from(width), f64::from(height)),
        Rgba8::WHITE,
    );
    for slot in layout.slots() {
        canvas.draw_image(&marker.image, slot.scale_from_origin(scale));
    }
    canvas.image_data()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::{MarkerGeometry, compose_marker};

    fn marker() -> MarkerImage {
        let inner = RasterImage::filled(4, 4, Rgba8::opaque(0, 0, 255)).unwrap();
        compose_marker(&inner, MarkerGeometry::new(0.5, 64).unwrap(), Rgba8::BLACK).unwrap()
    }

    #[test]
    fn per_page_round_trips() {
        for n in [1, 2, 6] {
            assert_eq!(SheetLayout::from_per_page(n).unwrap().per_page(), n);
        }
        assert!(SheetLayout::from_per_page(4).is_err());
    }

    #[test]
    fn slots_fit_inside_margins_without_overlap() {
        let page = Rect::new(
            PAGE_MARGIN_PT,
            PAGE_MARGIN_PT,
            PAGE_WIDTH_PT - PAGE_MARGIN_PT,
            PAGE_HEIGHT_PT - PAGE_MARGIN_PT,
        );
        for layout in [SheetLayout::Single, SheetLayout::Pair, SheetLayout::Six] {
            let slots = layout.slots();
            assert_eq!(slots.len() as u32, layout.per_page());
            for (i, a) in slots.iter().enumerate() {
                assert!(page.union(*a) == page, "{layout:?} slot {i} leaves the page");
                for b in &slots[i + 1..] {
                    assert!(a.intersect(*b).area() <= 0.0, "{layout:?} overlap");
                }
            }
        }
    }

    #[test]
    fn single_sheet_has_marker_centered() {
        let sheet = compose_sheet(&marker(), SheetLayout::Single, 72).unwrap();
        assert_eq!(sheet.width(), 595);
        assert_eq!(sheet.height(), 842);
        assert_eq!(sheet.pixel(5, 5), Some(Rgba8::WHITE));

        // Slot is x in [47.64, 547.64), y in [40, 540); its center is the blue inner image.
        assert_eq!(sheet.pixel(297, 290), Some(Rgba8::opaque(0, 0, 255)));
        assert_eq!(sheet.pixel(297, 700), Some(Rgba8::WHITE));
    }

    #[test]
    fn rejects_unreasonable_dpi() {
        assert!(compose_sheet(&marker(), SheetLayout::Pair, 10).is_err());
        assert!(compose_sheet(&marker(), SheetLayout::Pair, 5000).is_err());
    }
}
