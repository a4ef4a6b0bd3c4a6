use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::error::WatermarkResult;

/// Extensions picked up by [`find_images`], without the leading dot.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// How [`find_images`] compares file extensions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionCase {
    /// `.JPG` and `.jpg` both match.
    #[default]
    Insensitive,
    /// Only lowercase extensions match.
    Exact,
}

impl ExtensionCase {
    pub fn matches(self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        match self {
            Self::Insensitive => IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known)),
            Self::Exact => IMAGE_EXTENSIONS.contains(&ext),
        }
    }
}

/// List the images directly inside `dir` (no recursion), sorted by path.
pub fn find_images(dir: &Path, case: ExtensionCase) -> WatermarkResult<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("read image folder '{}'", dir.display()))?;

    let mut images = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("scan image folder '{}'", dir.display()))?;
        let path = entry.path();
        if path.is_file() && case.matches(&path) {
            images.push(path);
        }
    }
    images.sort();

    tracing::debug!(dir = %dir.display(), count = images.len(), "scanned image folder");
    Ok(images)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/scan.rs"]
mod tests;
