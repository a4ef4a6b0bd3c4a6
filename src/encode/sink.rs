use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use image::{DynamicImage, ImageFormat};

use crate::encode::preview::encodable;
use crate::foundation::error::WatermarkResult;

/// Destination for marked images.
///
/// Called concurrently from pool workers, one call per successfully composited image. A
/// returned error is treated as a failure of that image only.
pub trait ImageSink: Send + Sync {
    fn save(&self, image: &DynamicImage, path: &Path, format: ImageFormat) -> WatermarkResult<()>;
}

/// Writes marked images to the filesystem, overwriting existing files.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsImageSink;

impl ImageSink for FsImageSink {
    fn save(&self, image: &DynamicImage, path: &Path, format: ImageFormat) -> WatermarkResult<()> {
        encodable(image, format)
            .save_with_format(path, format)
            .with_context(|| format!("write marked image '{}'", path.display()))?;
        Ok(())
    }
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    saved: Mutex<Vec<(PathBuf, DynamicImage)>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output paths in completion order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn get(&self, path: &Path) -> Option<DynamicImage> {
        self.lock()
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, img)| img.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(PathBuf, DynamicImage)>> {
        self.saved
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ImageSink for InMemorySink {
    fn save(&self, image: &DynamicImage, path: &Path, _format: ImageFormat) -> WatermarkResult<()> {
        self.lock().push((path.to_path_buf(), image.clone()));
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/sink.rs"]
mod tests;
