use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use image::RgbaImage;

use crate::assets::decode::load_watermark;
use crate::batch::ledger::{Ledger, LedgerSnapshot};
use crate::batch::runner::{BatchJob, LedgerHost, PoolRunner, RunReport, StopToken};
use crate::config::EngineOpts;
use crate::encode::preview::{PreviewFrame, render_single_preview};
use crate::encode::sink::{FsImageSink, ImageSink};
use crate::engine::transitions::{Action, plan_transition, resolve_drained};
use crate::foundation::core::{InputKind, Intent, OutputSpec, Padding, RunState, WatermarkSpec};
use crate::foundation::error::{WatermarkError, WatermarkResult};

/// Point-in-time view of a batch, handed to observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub state: RunState,
    pub todo: usize,
    pub done: usize,
    /// Bumped on every state, ledger or preview change.
    pub generation: u64,
}

impl Progress {
    pub fn total(&self) -> usize {
        self.todo + self.done
    }
}

/// Batch watermarking engine.
///
/// Owns the run state, the ledger and the latest preview. All of them sit behind one lock,
/// so observers on other threads always see a consistent picture. Changes are announced on a
/// condition variable; see [`Engine::wait_until_settled`] and [`Engine::wait_for_change`].
pub struct Engine {
    shared: Arc<Shared>,
    runner: Arc<PoolRunner>,
    opts: EngineOpts,
}

struct Shared {
    inner: Mutex<Inner>,
    changed: Condvar,
}

#[derive(Default)]
struct Inner {
    state: RunState,
    ledger: Ledger,
    settings: Settings,
    preview: Option<Arc<PreviewFrame>>,
    stop: Option<StopToken>,
    report: Option<RunReport>,
    /// The ledger holds a batch left by a fold-back or a restored snapshot. The next `run`
    /// from `Idle` continues it instead of reseeding from the configured sources.
    carry_over: bool,
    generation: u64,
}

#[derive(Clone, Debug, Default)]
struct Settings {
    sources: Vec<PathBuf>,
    watermark: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    suffix: String,
    padding: Padding,
}

impl Settings {
    fn watermark_spec(&self) -> Option<WatermarkSpec> {
        self.watermark.as_ref().map(|path| WatermarkSpec {
            path: path.clone(),
            padding: self.padding,
        })
    }
}

/// Inputs validated and decoded ahead of a runner pass.
struct PreparedPass {
    sources: Vec<PathBuf>,
    watermark: WatermarkSpec,
    pixels: Arc<RgbaImage>,
    output: OutputSpec,
}

impl Engine {
    /// Engine writing marked images to disk.
    pub fn new(opts: EngineOpts) -> WatermarkResult<Self> {
        Self::with_sink(opts, Arc::new(FsImageSink))
    }

    pub fn with_sink(opts: EngineOpts, sink: Arc<dyn ImageSink>) -> WatermarkResult<Self> {
        let runner = PoolRunner::new(opts.resolved_threads(), sink)?;
        tracing::debug!(threads = runner.threads(), "engine ready");
        Ok(Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::default()),
                changed: Condvar::new(),
            }),
            runner: Arc::new(runner),
            opts,
        })
    }

    pub fn opts(&self) -> &EngineOpts {
        &self.opts
    }

    pub fn threads(&self) -> usize {
        self.runner.threads()
    }

    // Settings are snapshotted when a pass starts; later changes apply from the next run or
    // resume.

    /// Replace the source list. While `Idle` this also drops any carried-over batch, so the
    /// next `run` starts from these sources.
    pub fn set_sources(&self, sources: Vec<PathBuf>) {
        let mut inner = self.shared.lock();
        inner.settings.sources = sources;
        if inner.state == RunState::Idle {
            inner.carry_over = false;
        }
    }

    pub fn set_watermark(&self, path: impl Into<PathBuf>) {
        self.shared.lock().settings.watermark = Some(path.into());
    }

    pub fn set_output_dir(&self, dir: impl Into<PathBuf>) {
        self.shared.lock().settings.output_dir = Some(dir.into());
    }

    pub fn set_suffix(&self, suffix: impl Into<String>) {
        self.shared.lock().settings.suffix = suffix.into();
    }

    pub fn set_padding(&self, padding: Padding) {
        self.shared.lock().settings.padding = padding;
    }

    pub fn set_padding_around(&self, around: u32) {
        self.shared.lock().settings.padding.around = around;
    }

    pub fn set_padding_between(&self, between: u32) {
        self.shared.lock().settings.padding.between = between;
    }

    /// Apply an operator intent according to the transition table.
    ///
    /// `run` from `Idle` validates the configured inputs first and fails with
    /// [`WatermarkError::MissingInput`] or [`WatermarkError::Configuration`] without touching
    /// any state. Returns the state the engine moved to.
    #[tracing::instrument(skip(self))]
    pub fn request_transition(&self, intent: Intent) -> WatermarkResult<RunState> {
        // Validation decodes the watermark; do it without holding the lock.
        let prepared = {
            let (action, settings, seed) = {
                let inner = self.shared.lock();
                let transition = plan_transition(inner.state, intent)
                    .inspect_err(|err| tracing::warn!(error = %err, "rejected transition"))?;
                (transition.action, inner.settings.clone(), inner.seed_for(transition.action))
            };
            match action {
                Action::StartFresh | Action::Resume => {
                    Some((action, seed, prepare_pass(&settings, seed == Seed::Sources)?))
                }
                Action::Stop | Action::FoldBack => None,
            }
        };

        let mut inner = self.shared.lock();
        // Another caller may have moved the engine while the lock was released.
        let transition = plan_transition(inner.state, intent)?;
        let seed = inner.seed_for(transition.action);
        let pass = match (transition.action, prepared) {
            (Action::Stop | Action::FoldBack, _) => None,
            (action, Some((prepared_for, prepared_seed, pass)))
                if action == prepared_for && seed == prepared_seed =>
            {
                Some(pass)
            }
            (_, _) => Some(prepare_pass(&inner.settings, seed == Seed::Sources)?),
        };
        match (transition.action, pass) {
            (Action::StartFresh | Action::Resume, Some(pass)) => {
                if seed == Seed::Sources {
                    inner.ledger.seed(&pass.sources);
                }
                inner.carry_over = false;
                self.start_pass(&mut inner, pass);
            }
            (Action::Stop, _) => {
                if let Some(stop) = &inner.stop {
                    stop.stop();
                }
            }
            (Action::FoldBack, _) => {
                inner.ledger.fold_back();
                inner.carry_over = true;
            }
            (Action::StartFresh | Action::Resume, None) => {}
        }

        inner.state = transition.to;
        inner.touch();
        self.shared.changed.notify_all();
        tracing::info!(
            from = %transition.from,
            to = %transition.to,
            todo = inner.ledger.todo_count(),
            done = inner.ledger.done_count(),
            "state changed"
        );
        Ok(transition.to)
    }

    fn start_pass(&self, inner: &mut Inner, pass: PreparedPass) {
        let stop = StopToken::new();
        let job = BatchJob {
            images: inner.ledger.todo().to_vec(),
            watermark: pass.watermark,
            watermark_pixels: pass.pixels,
            output: pass.output,
        };
        tracing::info!(
            images = job.images.len(),
            watermark = %job.watermark.path.display(),
            output_dir = %job.output.dir.display(),
            "starting runner pass"
        );

        let host: Arc<Shared> = Arc::clone(&self.shared);
        self.runner.spawn_run(job, host, stop.clone());
        inner.stop = Some(stop);
        inner.report = None;
    }

    /// Seed the ledger from a saved `(todo, done)` pair and enter `Paused`.
    ///
    /// Only allowed while `Idle`. A snapshot with nothing left to do is loaded but leaves the
    /// engine `Idle`.
    pub fn resume_from(&self, snapshot: LedgerSnapshot) -> WatermarkResult<RunState> {
        let mut inner = self.shared.lock();
        if inner.state != RunState::Idle {
            return Err(WatermarkError::validation(format!(
                "a saved batch can only be loaded while idle (engine is {})",
                inner.state
            )));
        }
        inner.ledger = Ledger::restore(snapshot);
        inner.carry_over = true;
        if !inner.ledger.is_finished() {
            inner.state = RunState::Paused;
        }
        inner.touch();
        self.shared.changed.notify_all();
        tracing::info!(
            todo = inner.ledger.todo_count(),
            done = inner.ledger.done_count(),
            state = %inner.state,
            "loaded saved batch"
        );
        Ok(inner.state)
    }

    pub fn state(&self) -> RunState {
        self.shared.lock().state
    }

    pub fn todo_count(&self) -> usize {
        self.shared.lock().ledger.todo_count()
    }

    pub fn done_count(&self) -> usize {
        self.shared.lock().ledger.done_count()
    }

    /// Encoded bytes of the most recently completed image, if any.
    pub fn latest_preview(&self) -> Option<Arc<PreviewFrame>> {
        self.shared.lock().preview.clone()
    }

    pub fn progress(&self) -> Progress {
        self.shared.lock().progress()
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.shared.lock().ledger.snapshot()
    }

    /// Tally of the most recent finished runner pass.
    pub fn last_report(&self) -> Option<RunReport> {
        self.shared.lock().report
    }

    /// Mark `source` with the configured watermark without writing anything.
    ///
    /// The result also becomes the latest preview.
    pub fn render_single_preview(&self, source: &Path) -> Option<Arc<PreviewFrame>> {
        let spec = self.shared.lock().settings.watermark_spec()?;
        let frame = Arc::new(render_single_preview(source, Some(&spec))?);
        let mut inner = self.shared.lock();
        inner.preview = Some(Arc::clone(&frame));
        inner.touch();
        self.shared.changed.notify_all();
        Some(frame)
    }

    /// Block until the engine is `Idle` or `Paused`.
    pub fn wait_until_settled(&self) -> RunState {
        let inner = self.shared.lock();
        let inner = self
            .shared
            .changed
            .wait_while(inner, |i| i.state.is_busy())
            .unwrap_or_else(PoisonError::into_inner);
        inner.state
    }

    /// Block until something changes after `seen_generation`, or `timeout` elapses.
    pub fn wait_for_change(&self, seen_generation: u64, timeout: Duration) -> Progress {
        let inner = self.shared.lock();
        let (inner, _) = self
            .shared
            .changed
            .wait_timeout_while(inner, timeout, |i| i.generation == seen_generation)
            .unwrap_or_else(PoisonError::into_inner);
        inner.progress()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let inner = self.shared.lock();
        if let Some(stop) = &inner.stop {
            stop.stop();
        }
        // In-flight images finish; the drained pass then settles the state.
        drop(
            self.shared
                .changed
                .wait_while(inner, |i| i.state.is_busy())
                .unwrap_or_else(PoisonError::into_inner),
        );
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

}

impl LedgerHost for Shared {
    fn image_marked(&self, source: &Path, preview: PreviewFrame) {
        let mut inner = self.lock();
        if inner.ledger.complete(source) {
            inner.preview = Some(Arc::new(preview));
        }
        inner.touch();
        self.changed.notify_all();
    }

    fn image_failed(&self, source: &Path) {
        let mut inner = self.lock();
        inner.ledger.discard(source);
        inner.touch();
        self.changed.notify_all();
    }

    fn pass_drained(&self, report: RunReport) {
        let mut inner = self.lock();
        let from = inner.state;
        let resolution = resolve_drained(from, inner.ledger.is_finished());
        if resolution.fold_back {
            inner.ledger.fold_back();
            inner.carry_over = true;
        }
        inner.state = resolution.state;
        inner.stop = None;
        inner.report = Some(report);
        inner.touch();
        self.changed.notify_all();
        tracing::info!(
            from = %from,
            to = %resolution.state,
            saved = report.saved,
            failed = report.failed,
            withheld = report.withheld,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "runner pass drained"
        );
    }
}

/// Where a starting pass takes its images from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Seed {
    /// Reseed the ledger from the configured source list.
    Sources,
    /// Run over the ledger's current todo list.
    Ledger,
}

impl Inner {
    fn seed_for(&self, action: Action) -> Seed {
        let carried = self.carry_over && !self.ledger.is_finished();
        match action {
            Action::StartFresh if !carried => Seed::Sources,
            _ => Seed::Ledger,
        }
    }

    fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn progress(&self) -> Progress {
        Progress {
            state: self.state,
            todo: self.ledger.todo_count(),
            done: self.ledger.done_count(),
            generation: self.generation,
        }
    }
}

fn prepare_pass(settings: &Settings, needs_sources: bool) -> WatermarkResult<PreparedPass> {
    let mut missing = Vec::new();
    if needs_sources && settings.sources.is_empty() {
        missing.push(InputKind::Sources);
    }
    if settings.watermark.is_none() {
        missing.push(InputKind::Watermark);
    }
    if settings.output_dir.is_none() {
        missing.push(InputKind::OutputDir);
    }
    let (Some(watermark), Some(output_dir)) = (&settings.watermark, &settings.output_dir) else {
        return Err(WatermarkError::missing_input(missing));
    };
    if !missing.is_empty() {
        return Err(WatermarkError::missing_input(missing));
    }

    check_output_dir(output_dir)?;
    let pixels = load_watermark(watermark).map_err(|e| {
        WatermarkError::configuration(format!(
            "watermark '{}' could not be loaded: {e}",
            watermark.display()
        ))
    })?;

    Ok(PreparedPass {
        sources: settings.sources.clone(),
        watermark: WatermarkSpec {
            path: watermark.clone(),
            padding: settings.padding,
        },
        pixels: Arc::new(pixels),
        output: OutputSpec {
            dir: output_dir.clone(),
            suffix: settings.suffix.clone(),
        },
    })
}

/// The output folder must exist, be a directory and accept new files.
fn check_output_dir(dir: &Path) -> WatermarkResult<()> {
    if !dir.is_dir() {
        return Err(WatermarkError::configuration(format!(
            "output folder '{}' does not exist or is not a directory",
            dir.display()
        )));
    }

    static PROBES: AtomicU64 = AtomicU64::new(0);
    let probe = dir.join(format!(
        ".watermarker-probe-{}-{}",
        std::process::id(),
        PROBES.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&probe)
        .map_err(|e| {
            WatermarkError::configuration(format!(
                "output folder '{}' is not writable: {e}",
                dir.display()
            ))
        })?;
    if let Err(err) = std::fs::remove_file(&probe) {
        tracing::warn!(probe = %probe.display(), error = %err, "could not remove write probe");
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/engine/state_machine.rs"]
mod tests;
