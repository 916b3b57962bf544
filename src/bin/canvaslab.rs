use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use canvaslab::{
    AnimationFrames, Clock as _, CompositorSession, DEFAULT_REFRESH_MS, Discipline, ExportOpts,
    FilterKind, FilterParams, FixedInterval, FrameSource, Scheduler, SceneMode, SessionConfig,
    SystemClock,
};

#[derive(Parser, Debug)]
#[command(name = "canvaslab", version)]
struct Cli {
    /// Log scheduler and cache activity to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a pixel filter to an image file and write a PNG.
    Filter(FilterArgs),
    /// Build a session, optionally advance it, and export one PNG.
    Frame(FrameArgs),
    /// Drive a session from the frame scheduler and print timing statistics as JSON.
    Bench(BenchArgs),
}

#[derive(Parser, Debug)]
struct FilterArgs {
    /// Input image (PNG or JPEG).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Filter to apply.
    #[arg(long, default_value_t = FilterKind::Grayscale)]
    kind: FilterKind,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Pixelate block edge in pixels.
    #[arg(long)]
    block: Option<u32>,

    /// Grayscale contrast factor.
    #[arg(long)]
    contrast: Option<f64>,

    /// Edge response multiplier.
    #[arg(long)]
    boost: Option<f64>,

    /// Skip the final difference-with-white pass of the edge filter.
    #[arg(long)]
    no_invert: bool,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Session config JSON; defaults to the sticker playground.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured scene.
    #[arg(long)]
    scene: Option<SceneMode>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Export without the background.
    #[arg(long)]
    transparent: bool,

    /// Synthetic 60 Hz ticks to advance before exporting.
    #[arg(long, default_value_t = 0)]
    ticks: u32,
}

#[derive(Parser, Debug)]
struct BenchArgs {
    /// Session config JSON; defaults to the frame benchmark preset.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured scene.
    #[arg(long)]
    scene: Option<SceneMode>,

    /// Tick discipline.
    #[arg(long, default_value_t = Discipline::AnimationFrame)]
    discipline: Discipline,

    #[arg(long)]
    duration_ms: Option<f64>,

    #[arg(long)]
    warmup_ms: Option<f64>,

    /// Estimate the refresh interval from live ticks instead of assuming the configured one.
    #[arg(long)]
    estimate_refresh: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    match cli.cmd {
        Command::Filter(args) => cmd_filter(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Bench(args) => cmd_bench(args),
    }
}

fn load_config(
    path: Option<&Path>,
    scene: Option<SceneMode>,
    fallback: fn() -> SessionConfig,
) -> anyhow::Result<SessionConfig> {
    let mut config = match path {
        Some(path) => SessionConfig::from_path(path)?,
        None => fallback(),
    };
    if let Some(scene) = scene {
        config.scene = scene;
    }
    config.validate().context("validate session config")?;
    Ok(config)
}

fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write png '{}'", path.display()))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn cmd_filter(args: FilterArgs) -> anyhow::Result<()> {
    let bitmap = canvaslab::load_bitmap(&args.in_path)
        .with_context(|| format!("load image '{}'", args.in_path.display()))?;
    let src = bitmap.to_raster()?;

    let mut params = FilterParams::default();
    if let Some(block) = args.block {
        params.pixelate_block = block;
    }
    if let Some(contrast) = args.contrast {
        params.contrast = contrast;
    }
    if let Some(boost) = args.boost {
        params.edge_boost = boost;
    }
    params.edge_invert = !args.no_invert;

    let out = canvaslab::apply_filter(&src, args.kind, &params)
        .with_context(|| format!("apply {} filter", args.kind))?;
    let bytes = canvaslab::encode_png(&out)?;
    write_output(&args.out, &bytes)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let config = load_config(
        args.config.as_deref(),
        args.scene,
        SessionConfig::sticker_playground,
    )?;
    let mode = config.scene;
    let mut session = CompositorSession::new(config).context("create session")?;

    for _ in 0..args.ticks {
        session.advance(DEFAULT_REFRESH_MS);
        session.render_frame()?;
    }

    let opts = ExportOpts::default().transparent(args.transparent);
    let bytes = session
        .export(&opts)
        .with_context(|| format!("export {mode} frame"))?;
    write_output(&args.out, &bytes)
}

fn cmd_bench(args: BenchArgs) -> anyhow::Result<()> {
    let mut config = load_config(
        args.config.as_deref(),
        args.scene,
        SessionConfig::frame_benchmark,
    )?;
    if let Some(duration_ms) = args.duration_ms {
        config.timing.duration_ms = duration_ms;
    }
    if let Some(warmup_ms) = args.warmup_ms {
        config.timing.warmup_ms = warmup_ms;
    }
    config.timing.validate().context("validate timing")?;

    let timing = config.timing.clone();
    let scene = config.scene;
    let clock = SystemClock::new();

    let refresh_ms = if args.estimate_refresh {
        let mut sampler = AnimationFrames::new(timing.display_refresh_ms);
        canvaslab::estimate_refresh_interval(&mut sampler, &clock, timing.refresh_samples)?
    } else {
        timing.display_refresh_ms
    };

    let mut session = CompositorSession::new(config).context("create session")?;
    let started = clock.now_ms();
    let report = match args.discipline {
        Discipline::AnimationFrame => run_with(
            AnimationFrames::new(timing.display_refresh_ms),
            &clock,
            &mut session,
            &timing,
            refresh_ms,
        )?,
        Discipline::FixedInterval => run_with(
            FixedInterval::new(timing.interval_ms),
            &clock,
            &mut session,
            &timing,
            refresh_ms,
        )?,
    };
    tracing::debug!(wall_ms = clock.now_ms() - started, "bench finished");

    let out = serde_json::json!({
        "scene": scene,
        "discipline": report.discipline,
        "reason": report.reason,
        "frames": report.frames,
        "refresh_ms": refresh_ms,
        "stats": report.stats,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&out).context("serialize bench report")?
    );
    Ok(())
}

fn run_with<S: FrameSource>(
    source: S,
    clock: &SystemClock,
    session: &mut CompositorSession,
    timing: &canvaslab::TimingConfig,
    refresh_ms: f64,
) -> anyhow::Result<canvaslab::RunReport> {
    let mut scheduler = Scheduler::new(source);
    let report = scheduler
        .run(clock, session, timing, refresh_ms)
        .context("run frame scheduler")?;
    Ok(report)
}
