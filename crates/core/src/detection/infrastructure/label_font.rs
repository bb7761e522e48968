use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::FontArc;
use thiserror::Error;

/// Common TrueType fonts tried in order when no font is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "C:\\Windows\\Fonts\\segoeui.ttf",
];

#[derive(Debug, Error)]
pub enum LabelFontError {
    #[error("label font not found: {0}")]
    NotFound(PathBuf),
    #[error("could not read label font {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{0} is not a usable TrueType/OpenType font")]
    Invalid(PathBuf),
}

/// Loads the font used for detection labels.
///
/// An explicit path must load. Without one the first readable system font
/// wins; `Ok(None)` means labels are drawn as plain color tags.
pub fn resolve_label_font(explicit: Option<&Path>) -> Result<Option<FontArc>, LabelFontError> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(LabelFontError::NotFound(path.to_path_buf()));
        }
        return load_font(path).map(Some);
    }

    for candidate in SYSTEM_FONT_CANDIDATES.iter().map(Path::new) {
        if !candidate.exists() {
            continue;
        }
        match load_font(candidate) {
            Ok(font) => {
                log::debug!("Using label font {}", candidate.display());
                return Ok(Some(font));
            }
            Err(e) => log::debug!("Skipping label font: {e}"),
        }
    }
    log::warn!("No label font found; detections are tagged without text");
    Ok(None)
}

fn load_font(path: &Path) -> Result<FontArc, LabelFontError> {
    let bytes = fs::read(path).map_err(|source| LabelFontError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    FontArc::try_from_vec(bytes).map_err(|_| LabelFontError::Invalid(path.to_path_buf()))
}
