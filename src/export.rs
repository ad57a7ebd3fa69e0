use std::{collections::HashMap, path::Path};

use anyhow::Context as _;

use crate::{
    assets,
    foundation::{
        core::RasterImage,
        error::{MarkerError, MarkerResult},
    },
    pattern::PatternDescriptor,
};

pub const DEFAULT_IMAGE_NAME: &str = "marker";

/// Base name for exports from an uploaded file name: last extension dropped.
pub fn image_name_from_file(file_name: &str) -> String {
    let stem = match file_name.rfind('.') {
        Some(i) if i + 1 < file_name.len() && !file_name[i + 1..].contains('/') => {
            &file_name[..i]
        }
        _ => file_name,
    };
    if stem.is_empty() {
        DEFAULT_IMAGE_NAME.to_owned()
    } else {
        stem.to_owned()
    }
}

/// Lowercase with whitespace runs collapsed to `-`, e.g. "QR Code" -> "qr-code".
pub fn slugify_example_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;
    for ch in name.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push('-');
            }
            in_space = true;
        } else {
            out.extend(ch.to_lowercase());
            in_space = false;
        }
    }
    out
}

pub fn pattern_file_name(image_name: &str) -> String {
    format!("pattern-{image_name}.patt")
}

pub fn marker_file_name(image_name: &str) -> String {
    format!("pattern-{image_name}.png")
}

pub fn sheet_file_name(image_name: &str) -> String {
    format!("{image_name}-markers.png")
}

pub fn write_pattern_file(path: &Path, pattern: &PatternDescriptor) -> MarkerResult<()> {
    create_parent_dir(path)?;
    std::fs::write(path, pattern.as_str())
        .with_context(|| format!("write pattern '{}'", path.display()))?;
    Ok(())
}

pub fn write_png(path: &Path, image: &RasterImage) -> MarkerResult<()> {
    let png = assets::encode_png(image)?;
    create_parent_dir(path)?;
    std::fs::write(path, png).with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

/// Fails when two inputs of a batch would be written to the same output path.
pub fn check_unique_outputs<I, O>(planned: &[(I, O)]) -> MarkerResult<()>
where
    I: AsRef<Path>,
    O: AsRef<Path>,
{
    let mut seen: HashMap<&Path, &Path> = HashMap::with_capacity(planned.len());
    for (input, output) in planned {
        let (input, output) = (input.as_ref(), output.as_ref());
        if let Some(first) = seen.insert(output, input) {
            return Err(MarkerError::validation(format!(
                "inputs '{}' and '{}' both export to '{}'",
                first.display(),
                input.display(),
                output.display()
            )));
        }
    }
    Ok(())
}

fn create_parent_dir(path: &Path) -> MarkerResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}
