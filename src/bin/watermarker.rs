use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use watermarker::{
    Engine, ExtensionCase, Intent, JobConfig, LedgerSnapshot, Padding, RunState, WatermarkSpec,
};

#[derive(Parser, Debug)]
#[command(name = "watermarker", version)]
struct Cli {
    /// More log output (`-v` debug, `-vv` trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watermark every image of a batch.
    Run(RunArgs),
    /// Watermark one image in memory and emit the encoded result.
    Preview(PreviewArgs),
    /// List the images a folder scan would pick up.
    Scan(ScanArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Job description JSON. Flags given alongside override its fields.
    #[arg(long)]
    job: Option<PathBuf>,

    /// Folder scanned (non-recursively) for .jpg/.jpeg/.png images.
    #[arg(long)]
    images: Option<PathBuf>,

    /// Explicit source images; used instead of `--images`.
    files: Vec<PathBuf>,

    /// Watermark image.
    #[arg(long)]
    watermark: Option<PathBuf>,

    /// Output folder (created if missing).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Appended to each output file stem.
    #[arg(long)]
    suffix: Option<String>,

    /// Pixels kept clear between the image edge and the watermark band.
    #[arg(long)]
    padding_around: Option<u32>,

    /// Pixels between consecutive watermark tiles.
    #[arg(long)]
    padding_between: Option<u32>,

    /// Worker threads (defaults to logical cores minus two).
    #[arg(long)]
    threads: Option<usize>,

    /// Match image extensions case-sensitively.
    #[arg(long)]
    exact_case: bool,

    /// Keep the todo/done lists here while running so an interrupted batch can be resumed.
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Continue the batch recorded in `--state-file`.
    #[arg(long, requires = "state_file")]
    resume: bool,
}

#[derive(Args, Debug)]
struct PreviewArgs {
    /// Source image.
    #[arg(long)]
    image: PathBuf,

    /// Watermark image.
    #[arg(long)]
    watermark: PathBuf,

    #[arg(long, default_value_t = 0)]
    padding_around: u32,

    #[arg(long, default_value_t = 0)]
    padding_between: u32,

    /// Write the encoded bytes here instead of printing them.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Print a `data:` URI rather than bare base64.
    #[arg(long, conflicts_with = "out")]
    data_uri: bool,
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Folder to scan.
    #[arg(long)]
    images: PathBuf,

    /// Match image extensions case-sensitively.
    #[arg(long)]
    exact_case: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Preview(args) => cmd_preview(args),
        Command::Scan(args) => cmd_scan(args),
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn extension_case(exact: bool) -> ExtensionCase {
    if exact {
        ExtensionCase::Exact
    } else {
        ExtensionCase::Insensitive
    }
}

fn job_from_args(args: &RunArgs) -> anyhow::Result<JobConfig> {
    let mut job = match &args.job {
        Some(path) => JobConfig::from_path(path)?,
        None => JobConfig::default(),
    };
    if args.images.is_some() {
        job.images = args.images.clone();
    }
    if !args.files.is_empty() {
        job.files = args.files.clone();
    }
    if args.watermark.is_some() {
        job.watermark = args.watermark.clone();
    }
    if args.out.is_some() {
        job.output_dir = args.out.clone();
    }
    if let Some(suffix) = &args.suffix {
        job.suffix = suffix.clone();
    }
    if let Some(p) = args.padding_around {
        job.padding_around = p;
    }
    if let Some(p) = args.padding_between {
        job.padding_between = p;
    }
    if args.threads.is_some() {
        job.threads = args.threads;
    }
    job.validate()?;
    Ok(job)
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let job = job_from_args(&args)?;
    let case = extension_case(args.exact_case);

    if let Some(out) = &job.output_dir {
        std::fs::create_dir_all(out)
            .with_context(|| format!("create output dir '{}'", out.display()))?;
    }

    let engine = Engine::new(job.engine_opts(case))?;
    let sources = job.apply(&engine)?;

    if args.resume {
        let state_file = args
            .state_file
            .as_deref()
            .context("--resume needs --state-file")?;
        let snapshot = read_state_file(state_file)?;
        if engine.resume_from(snapshot)? == RunState::Idle {
            eprintln!("nothing left to do in {}", state_file.display());
            remove_state_file(state_file)?;
            return Ok(());
        }
    } else if sources == 0 {
        tracing::warn!("no source images found");
    }

    engine.request_transition(Intent::Run)?;
    let total = engine.progress().total();
    eprintln!(
        "marking {total} image(s) with {} thread(s)",
        engine.threads()
    );

    let mut seen = engine.progress();
    if let Some(path) = &args.state_file {
        write_state_file(path, &engine.snapshot())?;
    }
    while seen.state.is_busy() {
        let now = engine.wait_for_change(seen.generation, Duration::from_millis(500));
        if (now.todo, now.done) != (seen.todo, seen.done) {
            eprintln!("{}/{} done", now.done, now.total());
            if let Some(path) = &args.state_file {
                write_state_file(path, &engine.snapshot())?;
            }
        }
        seen = now;
    }

    let report = engine.last_report().unwrap_or_default();
    if let Some(path) = &args.state_file
        && engine.todo_count() == 0
    {
        remove_state_file(path)?;
    }

    eprintln!(
        "marked {} image(s) in {}",
        report.saved,
        format_elapsed(report.elapsed)
    );
    if report.failed > 0 {
        anyhow::bail!("{} image(s) could not be watermarked", report.failed);
    }
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let spec = WatermarkSpec {
        path: args.watermark.clone(),
        padding: Padding::new(args.padding_around, args.padding_between),
    };
    let frame = watermarker::render_single_preview(&args.image, Some(&spec))
        .with_context(|| format!("preview '{}' failed", args.image.display()))?;

    match &args.out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create output dir '{}'", parent.display()))?;
            }
            std::fs::write(out, &frame.bytes)
                .with_context(|| format!("write preview '{}'", out.display()))?;
            eprintln!("wrote {}", out.display());
        }
        None if args.data_uri => println!("{}", frame.data_uri()),
        None => println!("{}", frame.to_base64()),
    }
    Ok(())
}

fn cmd_scan(args: ScanArgs) -> anyhow::Result<()> {
    let found = watermarker::find_images(&args.images, extension_case(args.exact_case))?;
    for path in &found {
        println!("{}", path.display());
    }
    eprintln!("{} image(s)", found.len());
    Ok(())
}

fn read_state_file(path: &Path) -> anyhow::Result<LedgerSnapshot> {
    let f = File::open(path).with_context(|| format!("open state file '{}'", path.display()))?;
    serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parse state file '{}'", path.display()))
}

fn write_state_file(path: &Path, snapshot: &LedgerSnapshot) -> anyhow::Result<()> {
    let tmp = path.with_extension("tmp");
    let json = serde_json::to_vec_pretty(snapshot).context("serialize batch state")?;
    std::fs::write(&tmp, json).with_context(|| format!("write state file '{}'", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("replace state file '{}'", path.display()))?;
    Ok(())
}

fn remove_state_file(path: &Path) -> anyhow::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("remove state file '{}'", path.display())),
    }
}

/// Human-readable duration: `1 hr 2 min 3 sec`, `2 min 3 sec` or `3 sec`.
fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if hours > 0 {
        format!("{hours} hr {minutes} min {seconds} sec")
    } else if minutes > 0 {
        format!("{minutes} min {seconds} sec")
    } else {
        format!("{seconds} sec")
    }
}

#[cfg(test)]
#[path = "../../tests/unit/bin/watermarker.rs"]
mod tests;
