use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::assets::scan::{ExtensionCase, find_images};
use crate::engine::Engine;
use crate::foundation::core::Padding;
use crate::foundation::error::{WatermarkError, WatermarkResult};

/// Engine-wide options fixed at construction.
#[derive(Clone, Debug, Default)]
pub struct EngineOpts {
    /// Worker pool size. `None` uses [`default_threads`].
    pub threads: Option<usize>,
    /// Extension matching used by [`find_images`].
    pub extension_case: ExtensionCase,
}

impl EngineOpts {
    pub fn resolved_threads(&self) -> usize {
        self.threads.unwrap_or_else(default_threads)
    }
}

/// Logical cores minus two, leaving headroom for the host process; never below one.
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(2)
        .max(1)
}

/// Batch description as read from a JSON job file.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Folder scanned (non-recursively) for source images.
    #[serde(default)]
    pub images: Option<PathBuf>,
    /// Explicit source list, used instead of `images` when non-empty.
    #[serde(default)]
    pub files: Vec<PathBuf>,
    #[serde(default)]
    pub watermark: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub suffix: String,
    #[serde(default)]
    pub padding_around: u32,
    #[serde(default)]
    pub padding_between: u32,
    #[serde(default)]
    pub threads: Option<usize>,
}

impl JobConfig {
    pub fn from_path(path: &Path) -> WatermarkResult<Self> {
        let f = std::fs::File::open(path)
            .with_context(|| format!("open job file '{}'", path.display()))?;
        let cfg: Self = serde_json::from_reader(std::io::BufReader::new(f))
            .with_context(|| format!("parse job file '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> WatermarkResult<()> {
        if !self
            .suffix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(WatermarkError::validation(format!(
                "suffix '{}' may only contain letters, digits, '-' and '_'",
                self.suffix
            )));
        }
        if self.threads == Some(0) {
            return Err(WatermarkError::validation("threads must be >= 1 when set"));
        }
        Ok(())
    }

    pub fn engine_opts(&self, extension_case: ExtensionCase) -> EngineOpts {
        EngineOpts {
            threads: self.threads,
            extension_case,
        }
    }

    /// Source images this job names: the explicit list, or a scan of `images`.
    pub fn sources(&self, case: ExtensionCase) -> WatermarkResult<Vec<PathBuf>> {
        if !self.files.is_empty() {
            return Ok(self.files.clone());
        }
        match &self.images {
            Some(dir) => find_images(dir, case),
            None => Ok(Vec::new()),
        }
    }

    /// Push every configured field into `engine`. Returns the number of sources set.
    pub fn apply(&self, engine: &Engine) -> WatermarkResult<usize> {
        self.validate()?;
        let sources = self.sources(engine.opts().extension_case)?;
        let count = sources.len();
        engine.set_sources(sources);
        if let Some(wm) = &self.watermark {
            engine.set_watermark(wm.clone());
        }
        if let Some(out) = &self.output_dir {
            engine.set_output_dir(out.clone());
        }
        engine.set_suffix(self.suffix.clone());
        engine.set_padding(Padding::new(self.padding_around, self.padding_between));
        Ok(count)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
