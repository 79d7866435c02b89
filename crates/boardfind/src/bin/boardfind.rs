//! boardfind CLI: locate, rectify and classify checkerboard game boards.

use boardfind::detect;
use boardfind::io::{self, BoardFindConfig};
use boardfind::{BoardCorners, CornerSource, Occupancy};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::path::{Path, PathBuf};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "boardfind")]
#[command(about = "Locate, rectify and classify checkerboard game boards in photographs")]
#[command(version)]
struct Cli {
    /// Log level for the `boardfind` crates (`RUST_LOG` overrides it under `tracing`).
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    /// Emit tracing output as JSON lines.
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the four board corners (TL, TR, BR, BL).
    Corners(CornersArgs),

    /// Write the rectified N×N board image.
    Rectify(RectifyArgs),

    /// Classify the 64 squares from a point scan.
    Squares(SquaresArgs),
}

#[derive(Debug, Clone, Args)]
struct CornersArgs {
    /// Path to the input image.
    image: PathBuf,

    /// Write a copy of the image with the corners marked.
    #[arg(long)]
    annotate: Option<PathBuf>,

    /// JSON config (finder, partition and camera settings).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct RectifyArgs {
    /// Path to the input image.
    image: PathBuf,

    /// Path of the rectified output image.
    out: PathBuf,

    /// Side length of the rectified image in pixels (overrides the config).
    #[arg(long)]
    size: Option<usize>,

    /// JSON config (finder, partition and camera settings).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct SquaresArgs {
    /// Path to the input image.
    image: PathBuf,

    /// Point scan JSON (`{"points": [{"position": [x, y, z], "color": [r, g, b]}]}`).
    scan: PathBuf,

    /// Camera model JSON; falls back to the `camera` entry of the config.
    #[arg(long)]
    camera: Option<PathBuf>,

    /// Write the per-square report as JSON.
    #[arg(long)]
    report: Option<PathBuf>,

    /// JSON config (finder, partition and camera settings).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    match cli.command {
        Commands::Corners(args) => run_corners(&args),
        Commands::Rectify(args) => run_rectify(&args),
        Commands::Squares(args) => run_squares(&args),
    }
}

#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) -> CliResult<()> {
    // RUST_LOG, when set, takes precedence over `--log-level`.
    let _ = tracing_log::LogTracer::init();
    boardfind::core::init_tracing(cli.log_json, cli.log_level.into());
    Ok(())
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) -> CliResult<()> {
    boardfind::core::init_with_level(cli.log_level.into()).map_err(|e| e.to_string())?;
    Ok(())
}

fn load_config(path: Option<&Path>) -> CliResult<BoardFindConfig> {
    match path {
        Some(p) => Ok(BoardFindConfig::load_json(p)?),
        None => Ok(BoardFindConfig::default()),
    }
}

fn print_corners(corners: &BoardCorners) {
    if let CornerSource::Fallback(reason) = &corners.source {
        println!("Board not detected ({reason}); using default corners");
    }
    println!("Found corners:");
    for (label, p) in [
        ("Top-left:", corners.top_left()),
        ("Top-right:", corners.top_right()),
        ("Bottom-right:", corners.bottom_right()),
        ("Bottom-left:", corners.bottom_left()),
    ] {
        println!("  {label:<14}({}, {})", p.x, p.y);
    }
}

fn run_corners(args: &CornersArgs) -> CliResult<()> {
    let cfg = load_config(args.config.as_deref())?;
    let img = image::open(&args.image)?;
    println!("Image size: {}x{}", img.width(), img.height());

    let corners = detect::find_board(&img, &cfg.finder)?;
    print_corners(&corners);

    if let Some(out) = &args.annotate {
        let mut rgb = img.to_rgb8();
        detect::annotate_corners(&mut rgb, &corners);
        rgb.save(out)?;
        println!("Annotated image written to {}", out.display());
    }
    Ok(())
}

fn run_rectify(args: &RectifyArgs) -> CliResult<()> {
    let cfg = load_config(args.config.as_deref())?;
    let size = args.size.unwrap_or(cfg.partition.rectified_size);
    let img = image::open(&args.image)?;

    let corners = detect::find_board(&img, &cfg.finder)?;
    print_corners(&corners);

    let board = detect::rectify_board(&img.to_rgb8(), &corners, size)?;
    board.save(&args.out)?;
    println!("Rectified {size}x{size} board written to {}", args.out.display());
    Ok(())
}

fn run_squares(args: &SquaresArgs) -> CliResult<()> {
    let cfg = load_config(args.config.as_deref())?;
    let camera = match (&args.camera, cfg.camera) {
        (Some(path), _) => io::load_camera(path)?,
        (None, Some(camera)) => camera,
        (None, None) => {
            return Err("no camera model: pass --camera or set `camera` in the config".into())
        }
    };
    let scan = io::load_point_scan(&args.scan)?;
    let img = image::open(&args.image)?.to_rgb8();

    let report = detect::classify_board(&img, &scan, &camera, &cfg.finder, &cfg.partition)?;
    print_corners(&report.corners);

    for region in &report.squares {
        let mark = match region.occupancy {
            Occupancy::Empty => ".",
            occupied => occupied.tag(),
        };
        println!("{} {} {}", region.name(), mark, region.point_count());
    }

    if let Some(out) = &args.report {
        report.write_json(out)?;
        println!("Report written to {}", out.display());
    }
    Ok(())
}
