use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use image::RgbaImage;

use crate::assets::decode::{format_for, load_image};
use crate::compose::place_watermark;
use crate::encode::preview::{PreviewFrame, encode_preview};
use crate::encode::sink::ImageSink;
use crate::foundation::core::{OutputSpec, WatermarkSpec};
use crate::foundation::error::{WatermarkError, WatermarkResult};

/// Cooperative stop signal shared by every task of one runner pass.
///
/// Tasks check it once, before they start; a task already past that point always runs to
/// completion.
#[derive(Clone, Debug, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Everything one runner pass needs, snapshotted when the pass starts.
#[derive(Clone, Debug)]
pub struct BatchJob {
    pub images: Vec<PathBuf>,
    pub watermark: WatermarkSpec,
    /// Decoded watermark pixels, shared read-only by all workers.
    pub watermark_pixels: Arc<RgbaImage>,
    pub output: OutputSpec,
}

/// Receives per-image results as workers finish them.
pub trait LedgerHost: Send + Sync {
    /// `source` was written successfully; move it to done and publish its preview.
    fn image_marked(&self, source: &Path, preview: PreviewFrame);
    /// `source` failed; drop it from todo without recording it as done.
    fn image_failed(&self, source: &Path);
    /// Every task of a pass started with [`PoolRunner::spawn_run`] has resolved.
    fn pass_drained(&self, report: RunReport);
}

/// Tally of one runner pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    pub saved: usize,
    pub failed: usize,
    /// Images never started because a pause or cancel arrived first.
    pub withheld: usize,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn attempted(&self) -> usize {
        self.saved + self.failed
    }
}

/// One source image bound to the job it belongs to.
pub struct ImageTask<'a> {
    pub source: &'a Path,
    pub job: &'a BatchJob,
}

/// Result of a successful [`ImageTask`].
#[derive(Debug)]
pub struct TaskOutcome {
    pub output: PathBuf,
    pub preview: PreviewFrame,
}

impl ImageTask<'_> {
    pub fn execute(&self, sink: &dyn ImageSink) -> WatermarkResult<TaskOutcome> {
        let format = format_for(self.source)?;
        let image = load_image(self.source)?;
        let marked = place_watermark(
            &image,
            &self.job.watermark_pixels,
            self.job.watermark.padding,
        );

        // Encoded first so a preview failure never leaves an output behind.
        let bytes = encode_preview(&marked, format)?;
        let output = self.job.output.path_for(self.source);
        sink.save(&marked, &output, format)?;

        Ok(TaskOutcome {
            output,
            preview: PreviewFrame {
                source: self.source.to_path_buf(),
                format,
                bytes,
            },
        })
    }
}

/// Fixed-size worker pool that marks every image of a [`BatchJob`].
pub struct PoolRunner {
    pool: rayon::ThreadPool,
    sink: Arc<dyn ImageSink>,
}

impl PoolRunner {
    pub fn new(threads: usize, sink: Arc<dyn ImageSink>) -> WatermarkResult<Self> {
        Ok(Self {
            pool: build_thread_pool(threads)?,
            sink,
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `job` on the pool without blocking the caller; `host.pass_drained` fires once every
    /// task has resolved.
    pub fn spawn_run(self: &Arc<Self>, job: BatchJob, host: Arc<dyn LedgerHost>, stop: StopToken) {
        let runner = Arc::clone(self);
        self.pool.spawn(move || {
            let report = runner.run(&job, host.as_ref(), &stop);
            host.pass_drained(report);
        });
    }

    /// Mark every image in `job`, reporting each result to `host`, and return once all
    /// submitted tasks have resolved.
    ///
    /// After `stop` is raised no further image is started; those already running finish.
    #[tracing::instrument(skip_all, fields(images = job.images.len(), threads = self.threads()))]
    pub fn run(&self, job: &BatchJob, host: &dyn LedgerHost, stop: &StopToken) -> RunReport {
        let started = Instant::now();
        let saved = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let withheld = AtomicUsize::new(0);
        let sink = self.sink.as_ref();

        self.pool.scope(|s| {
            for source in &job.images {
                let (saved, failed, withheld) = (&saved, &failed, &withheld);
                s.spawn(move |_| {
                    if stop.is_stopped() {
                        withheld.fetch_add(1, Ordering::Relaxed);
                        return;
                    }
                    let task = ImageTask { source, job };
                    let result = catch_unwind(AssertUnwindSafe(|| task.execute(sink)))
                        .unwrap_or_else(|payload| {
                            Err(WatermarkError::image(format!(
                                "panicked: {}",
                                panic_message(payload.as_ref())
                            )))
                        });
                    match result {
                        Ok(outcome) => {
                            tracing::debug!(
                                image = %source.display(),
                                output = %outcome.output.display(),
                                "marked image"
                            );
                            host.image_marked(source, outcome.preview);
                            saved.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(err) => {
                            tracing::error!(
                                image = %source.display(),
                                watermark = %job.watermark.path.display(),
                                padding_around = job.watermark.padding.around,
                                padding_between = job.watermark.padding.between,
                                output_dir = %job.output.dir.display(),
                                error = %err,
                                "failed to place watermark"
                            );
                            host.image_failed(source);
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                });
            }
        });

        RunReport {
            saved: saved.into_inner(),
            failed: failed.into_inner(),
            withheld: withheld.into_inner(),
            elapsed: started.elapsed(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

fn build_thread_pool(threads: usize) -> WatermarkResult<rayon::ThreadPool> {
    if threads == 0 {
        return Err(WatermarkError::validation("worker threads must be >= 1"));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("watermark-worker-{i}"))
        .panic_handler(|payload| {
            tracing::error!(panic = panic_message(payload.as_ref()), "worker task panicked");
        })
        .build()
        .map_err(|e| WatermarkError::configuration(format!("failed to build worker pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/batch/runner.rs"]
mod tests;
