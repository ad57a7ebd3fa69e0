use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::{
    color,
    export::{DEFAULT_IMAGE_NAME, image_name_from_file},
    foundation::{
        core::Rgba8,
        error::{MarkerError, MarkerResult},
    },
    marker::MarkerGeometry,
    sheet,
};

/// Generator settings, loadable from JSON. Missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkerConfig {
    pub pattern_ratio: f64,
    pub size: u32,
    pub border_color: String,
    /// Base name for exported files. When unset, each export is named after its input file.
    pub image_name: Option<String>,
    pub sheet_dpi: u32,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            pattern_ratio: 0.5,
            size: 512,
            border_color: "#000000".to_owned(),
            image_name: None,
            sheet_dpi: sheet::DEFAULT_DPI,
        }
    }
}

impl MarkerConfig {
    pub fn from_path(path: &Path) -> MarkerResult<Self> {
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            MarkerError::validation(format!("parse config '{}': {e}", path.display()))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_str(s: &str) -> MarkerResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| MarkerError::validation(format!("parse config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks ranges. An unusable `border_color` is not an error here; see [`Self::border`].
    pub fn validate(&self) -> MarkerResult<()> {
        self.geometry()?;
        if !(sheet::MIN_DPI..=sheet::MAX_DPI).contains(&self.sheet_dpi) {
            return Err(MarkerError::validation(format!(
                "sheet_dpi must be in {}..={}, got {}",
                sheet::MIN_DPI,
                sheet::MAX_DPI,
                self.sheet_dpi
            )));
        }
        if self.image_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(MarkerError::validation("image_name must not be empty"));
        }
        Ok(())
    }

    pub fn geometry(&self) -> MarkerResult<MarkerGeometry> {
        MarkerGeometry::new(self.pattern_ratio, self.size)
    }

    /// Export base name for `input`: the configured name, else the input's file stem.
    pub fn export_name(&self, input: &Path) -> String {
        if let Some(name) = &self.image_name {
            return name.clone();
        }
        input
            .file_name()
            .map(|n| image_name_from_file(&n.to_string_lossy()))
            .unwrap_or_else(|| DEFAULT_IMAGE_NAME.to_owned())
    }

    /// Border color with the black fallback applied.
    pub fn border(&self) -> Rgba8 {
        color::resolve_border_color(&self.border_color)
    }
}
