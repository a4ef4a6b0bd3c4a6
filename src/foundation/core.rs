use std::fmt;
use std::path::{Path, PathBuf};

/// Externally visible state of the batch engine.
///
/// `Pausing` and `Canceling` are transient: they last only until the worker pool has drained
/// its in-flight images.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Pausing,
    Paused,
    Canceling,
}

impl RunState {
    /// Return `true` while a runner pass is (or may still be) active.
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Running | Self::Pausing | Self::Canceling)
    }

    /// Return `true` for the states that resolve on their own once the pool drains.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Pausing | Self::Canceling)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Pausing => "pausing",
            Self::Paused => "paused",
            Self::Canceling => "canceling",
        })
    }
}

/// Operator intent handed to [`Engine::request_transition`](crate::Engine::request_transition).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Run,
    Pause,
    Cancel,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Run => "run",
            Self::Pause => "pause",
            Self::Cancel => "cancel",
        })
    }
}

/// Inputs that must be configured before a fresh run may start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InputKind {
    Sources,
    Watermark,
    OutputDir,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sources => "images",
            Self::Watermark => "watermark",
            Self::OutputDir => "output folder",
        })
    }
}

/// Margins used when tiling, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Padding {
    /// Gap between the tiled group and the image edge.
    pub around: u32,
    /// Gap between consecutive watermark copies.
    pub between: u32,
}

impl Padding {
    pub fn new(around: u32, between: u32) -> Self {
        Self { around, between }
    }
}

/// Watermark image plus tiling paddings, frozen for the duration of one runner pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatermarkSpec {
    pub path: PathBuf,
    pub padding: Padding,
}

/// Where marked images go and how they are named.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputSpec {
    pub dir: PathBuf,
    /// Appended to the source stem, before the extension.
    pub suffix: String,
}

impl OutputSpec {
    /// `{dir}/{stem}{suffix}{ext}` for `source`. Existing files are overwritten by the caller.
    pub fn path_for(&self, source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut name = format!("{stem}{}", self.suffix);
        if let Some(ext) = source.extension() {
            name.push('.');
            name.push_str(&ext.to_string_lossy());
        }
        self.dir.join(name)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
