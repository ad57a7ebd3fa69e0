//! AR.js `.patt` pattern encoding.
//!
//! A pattern is the source image resampled to 16x16 in four orientations. Each
//! orientation is dumped as three 16x16 channel grids in blue, green, red
//! order, one row per line, values right-aligned to width 3.

use std::{f64::consts::FRAC_PI_2, fmt, fmt::Write as _};

use kurbo::Rect;
use rayon::prelude::*;

use crate::{
    assets::ImageSource,
    canvas::Canvas,
    foundation::{
        core::RasterImage,
        error::{MarkerError, MarkerResult},
    },
};

/// Side length of the resampled pattern grid.
pub const PATTERN_SIZE: u32 = 16;

const SIDE: usize = PATTERN_SIZE as usize;
const ROWS_PER_BLOCK: usize = SIDE * PatternChannel::ALL.len();
const VALUES_PER_ORIENTATION: usize = SIDE * SIDE * PatternChannel::ALL.len();
const ROW_WIDTH: usize = SIDE * 4 - 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Orientation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Orientation {
    /// Emission order of the four blocks.
    pub const ALL: [Self; 4] = [Self::Deg0, Self::Deg90, Self::Deg180, Self::Deg270];

    /// Canvas rotation applied before sampling; steps are negative quarter turns.
    pub fn radians(self) -> f64 {
        -FRAC_PI_2 * self.index() as f64
    }

    pub fn index(self) -> usize {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 1,
            Self::Deg180 => 2,
            Self::Deg270 => 3,
        }
    }
}

/// Color channels in the order they appear inside a block. Alpha is never written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PatternChannel {
    Blue,
    Green,
    Red,
}

impl PatternChannel {
    pub const ALL: [Self; 3] = [Self::Blue, Self::Green, Self::Red];

    /// Byte offset of the channel inside an RGBA8 pixel.
    pub fn rgba_offset(self) -> usize {
        match self {
            Self::Blue => 2,
            Self::Green => 1,
            Self::Red => 0,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Blue => 0,
            Self::Green => 1,
            Self::Red => 2,
        }
    }
}

/// Text of a `.patt` file together with the sampled values it was built from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternDescriptor {
    text: String,
    /// `[orientation][channel][y][x]`, channel in [`PatternChannel::ALL`] order.
    values: Vec<u8>,
}

impl PatternDescriptor {
    fn from_values(values: Vec<u8>) -> Self {
        let capacity = Orientation::ALL.len() * (ROWS_PER_BLOCK * (ROW_WIDTH + 1) + 1);
        let mut text = String::with_capacity(capacity);
        for (block, chunk) in values.chunks_exact(VALUES_PER_ORIENTATION).enumerate() {
            if block != 0 {
                text.push('\n');
            }
            for row in chunk.chunks_exact(SIDE) {
                for (x, v) in row.iter().enumerate() {
                    if x != 0 {
                        text.push(' ');
                    }
                    // Writing into a String cannot fail.
                    let _ = write!(text, "{v:>3}");
                }
                text.push('\n');
            }
        }
        Self { text, values }
    }

    /// Parses and validates `.patt` text.
    pub fn parse(text: &str) -> MarkerResult<Self> {
        let body = text
            .strip_suffix('\n')
            .ok_or_else(|| MarkerError::validation("pattern must end with a newline"))?;
        let lines: Vec<&str> = body.split('\n').collect();
        let expected_lines = Orientation::ALL.len() * (ROWS_PER_BLOCK + 1) - 1;
        if lines.len() != expected_lines {
            return Err(MarkerError::validation(format!(
                "pattern has {} lines, expected {expected_lines}",
                lines.len()
            )));
        }

        let mut values = Vec::with_capacity(Orientation::ALL.len() * VALUES_PER_ORIENTATION);
        for (i, line) in lines.iter().enumerate() {
            let line_no = i + 1;
            if (i + 1) % (ROWS_PER_BLOCK + 1) == 0 {
                if !line.is_empty() {
                    return Err(MarkerError::validation(format!(
                        "line {line_no}: expected blank line between orientations"
                    )));
                }
                continue;
            }
            parse_row(line, line_no, &mut values)?;
        }

        Ok(Self {
            text: text.to_owned(),
            values,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Sampled value at `(x, y)` of one channel grid.
    pub fn value(
        &self,
        orientation: Orientation,
        channel: PatternChannel,
        x: u32,
        y: u32,
    ) -> Option<u8> {
        let (x, y) = (x as usize, y as usize);
        if x >= SIDE || y >= SIDE {
            return None;
        }
        let i = orientation.index() * VALUES_PER_ORIENTATION
            + channel.index() * SIDE * SIDE
            + y * SIDE
            + x;
        self.values.get(i).copied()
    }
}

impl fmt::Display for PatternDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn parse_row(line: &str, line_no: usize, out: &mut Vec<u8>) -> MarkerResult<()> {
    let bytes = line.as_bytes();
    if bytes.len() != ROW_WIDTH {
        return Err(MarkerError::validation(format!(
            "line {line_no}: row must be {ROW_WIDTH} characters, got {}",
            bytes.len()
        )));
    }
    for x in 0..SIDE {
        let start = x * 4;
        if x != 0 && bytes[start - 1] != b' ' {
            return Err(MarkerError::validation(format!(
                "line {line_no}: values must be separated by a single space"
            )));
        }
        let token = line.get(start..start + 3).ok_or_else(|| {
            MarkerError::validation(format!("line {line_no}: non-ascii content"))
        })?;
        let v = parse_token(token).ok_or_else(|| {
            MarkerError::validation(format!("line {line_no}: bad value {token:?}"))
        })?;
        out.push(v);
    }
    Ok(())
}

/// Space padding then ASCII digits only; `u8::from_str` alone would take a `+` sign.
fn parse_token(token: &str) -> Option<u8> {
    let digits = token.trim_start_matches(' ');
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Encodes a decoded image. Only fails if the working surface cannot be allocated.
#[tracing::instrument(
    level = "debug",
    skip(image),
    fields(width = image.width(), height = image.height())
)]
pub fn encode_image(image: &RasterImage) -> MarkerResult<PatternDescriptor> {
    let mut canvas = Canvas::new(PATTERN_SIZE, PATTERN_SIZE)?;
    let half = f64::from(PATTERN_SIZE) / 2.0;
    let mut values = Vec::with_capacity(Orientation::ALL.len() * VALUES_PER_ORIENTATION);

    for orientation in Orientation::ALL {
        canvas.save();
        canvas.clear();
        canvas.translate(half, half);
        canvas.rotate(orientation.radians());
        canvas.draw_image(image, Rect::new(-half, -half, half, half));
        canvas.restore();

        let sampled = canvas.image_data()?;
        let rgba = sampled.as_rgba8();
        for channel in PatternChannel::ALL {
            let offset = channel.rgba_offset();
            values.extend(rgba.chunks_exact(4).map(|px| px[offset]));
        }
    }

    Ok(PatternDescriptor::from_values(values))
}

/// Decodes `source` and encodes it; decode failures surface before encoding starts.
#[tracing::instrument(level = "debug", skip(source), fields(source = %source.describe()))]
pub fn encode_source(source: &ImageSource) -> MarkerResult<PatternDescriptor> {
    let image = source.load()?;
    encode_image(&image)
}

/// Encodes every source in parallel; `result[i]` belongs to `sources[i]`.
pub fn encode_sources(sources: &[ImageSource]) -> Vec<MarkerResult<PatternDescriptor>> {
    sources.par_iter().map(encode_source).collect()
}
