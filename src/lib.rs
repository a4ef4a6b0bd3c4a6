//! Watermarker is a batch engine that tiles a watermark image across many source images.
//!
//! # Pipeline overview
//!
//! 1. **Configure**: point an [`Engine`] at source images, a watermark, an output folder,
//!    a filename suffix and two paddings (or load a [`JobConfig`]).
//! 2. **Run**: [`Engine::request_transition`] with [`Intent::Run`] seeds the todo list and
//!    fans the images out to a fixed-size worker pool.
//! 3. **Compose**: each worker scales the watermark to fit, tiles it along one axis
//!    ([`TileLayout`]) and writes the result next to its siblings in the output folder.
//! 4. **Observe**: the todo/done counts and an encoded preview of the latest image are
//!    published after every completion; see [`Engine::progress`] and
//!    [`Engine::latest_preview`].
//!
//! Pause and cancel are cooperative: images already in flight always finish.
#![forbid(unsafe_code)]

pub mod assets;
pub mod batch;
pub mod compose;
pub mod config;
pub mod encode;
pub mod engine;
pub mod foundation;

pub use assets::decode::{format_for, load_image, load_watermark};
pub use assets::scan::{ExtensionCase, IMAGE_EXTENSIONS, find_images};
pub use batch::{Ledger, LedgerSnapshot, RunReport};
pub use compose::{TileAxis, TileLayout, place_watermark};
pub use config::{EngineOpts, JobConfig, default_threads};
pub use encode::preview::{PreviewFrame, encode_preview, render_single_preview};
pub use encode::sink::{FsImageSink, ImageSink, InMemorySink};
pub use engine::{Engine, Progress};
pub use foundation::core::{InputKind, Intent, OutputSpec, Padding, RunState, WatermarkSpec};
pub use foundation::error::{WatermarkError, WatermarkResult};
