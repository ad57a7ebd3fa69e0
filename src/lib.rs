//! AR.js marker tooling.
//!
//! Two independent transforms over decoded images:
//!
//! 1. **Pattern encoding**: image -> `.patt` text (16x16 samples, four quarter-turn
//!    orientations, blue/green/red channel grids), see [`encode_image`].
//! 2. **Marker composition**: image -> printable square with a white margin, a
//!    colored border band and the image in the middle, see [`compose_marker`].
//!
//! Border colors given as text go through [`is_valid_color`] / [`resolve_border_color`]
//! before composition. Decoding happens up front ([`ImageSource::load`]); once pixels are
//! decoded nothing touches the filesystem. Every drawing surface is owned by the call
//! that created it, so independent calls may run concurrently.
#![forbid(unsafe_code)]

mod assets;
mod canvas;
mod color;
mod config;
mod export;
mod foundation;
mod marker;
mod pattern;
mod sheet;

pub use assets::{ImageSource, decode_data_url, decode_image, encode_png, png_data_url};
pub use canvas::{Canvas, MAX_CANVAS_AREA, MAX_CANVAS_SIDE};
pub use color::{
    DEFAULT_BORDER_COLOR, is_valid_color, named_color, parse_color, resolve_border_color,
};
pub use config::MarkerConfig;
pub use export::{
    DEFAULT_IMAGE_NAME, check_unique_outputs, image_name_from_file, marker_file_name,
    pattern_file_name, sheet_file_name, slugify_example_name, write_pattern_file, write_png,
};
pub use foundation::core::{RasterImage, Rgba8};
pub use foundation::error::{MarkerError, MarkerResult};
pub use marker::{MarkerGeometry, MarkerImage, WHITE_MARGIN, build_full_marker, compose_marker};
pub use pattern::{
    Orientation, PATTERN_SIZE, PatternChannel, PatternDescriptor, encode_image, encode_source,
    encode_sources,
};
pub use sheet::{
    DEFAULT_DPI, MAX_DPI, MIN_DPI, PAGE_HEIGHT_PT, PAGE_MARGIN_PT, PAGE_WIDTH_PT, SheetLayout,
    compose_sheet,
};
