use std::path::PathBuf;

use anyhow::Context as _;

use crate::foundation::{
    core::RasterImage,
    error::{MarkerError, MarkerResult},
};

pub mod decode;

pub use decode::{decode_data_url, decode_image, encode_png, png_data_url};

/// Where a raster comes from: an uploaded file, raw bytes, or a data URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
    DataUrl(String),
}

impl ImageSource {
    /// Reads and decodes the source. Every failure is an [`MarkerError::ImageDecode`].
    #[tracing::instrument(level = "debug", skip(self), fields(source = %self.describe()))]
    pub fn load(&self) -> MarkerResult<RasterImage> {
        match self {
            Self::Path(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("read image '{}'", path.display()))
                    .map_err(|e| MarkerError::image_decode(format!("{e:#}")))?;
                decode_image(&bytes)
            }
            Self::Bytes(bytes) => decode_image(bytes),
            Self::DataUrl(url) => decode_image(&decode_data_url(url)?),
        }
    }

    /// Short human-readable label for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
            Self::DataUrl(url) => {
                let head = url.split(',').next().unwrap_or("data:");
                format!("{head},<{} chars>", url.len().saturating_sub(head.len() + 1))
            }
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}
