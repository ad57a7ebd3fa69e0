use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "arpattern", version)]
struct Cli {
    /// Generator settings JSON (ratio, size, border color, sheet dpi).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug diagnostics to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode images into AR.js `.patt` files.
    Pattern(PatternArgs),
    /// Compose a printable marker PNG.
    Marker(MarkerArgs),
    /// Lay out copies of a marker on an A4 PNG page.
    Sheet(SheetArgs),
    /// Check whether a border color is accepted.
    CheckColor(CheckColorArgs),
}

#[derive(Parser, Debug)]
struct PatternArgs {
    /// Input images.
    #[arg(long = "in", required = true, num_args = 1..)]
    in_paths: Vec<PathBuf>,

    /// Directory receiving `pattern-<name>.patt` files.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Parser, Debug)]
struct MarkerArgs {
    /// Inner image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Share of the bordered area used by the image, in (0, 1).
    #[arg(long)]
    ratio: Option<f64>,

    /// Output side length in pixels.
    #[arg(long)]
    size: Option<u32>,

    /// Border color (`#RRGGBB` or a CSS color name); invalid values fall back to black.
    #[arg(long)]
    color: Option<String>,

    /// Export base name (default: the input's file stem).
    #[arg(long)]
    name: Option<String>,

    /// Output PNG path (default: `pattern-<name>.png`).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct SheetArgs {
    /// Inner image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Markers per page: 1, 2 or 6.
    #[arg(long, default_value_t = 1)]
    per_page: u32,

    /// Raster resolution of the page.
    #[arg(long)]
    dpi: Option<u32>,

    /// Export base name (default: the input's file stem).
    #[arg(long)]
    name: Option<String>,

    /// Output PNG path (default: `<name>-markers.png`).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct CheckColorArgs {
    color: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => arpattern::MarkerConfig::from_path(path)?,
        None => arpattern::MarkerConfig::default(),
    };

    match cli.cmd {
        Command::Pattern(args) => cmd_pattern(args, &config),
        Command::Marker(args) => cmd_marker(args, &config),
        Command::Sheet(args) => cmd_sheet(args, &config),
        Command::CheckColor(args) => cmd_check_color(args),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_pattern(args: PatternArgs, config: &arpattern::MarkerConfig) -> anyhow::Result<()> {
    let planned: Vec<(PathBuf, PathBuf)> = args
        .in_paths
        .iter()
        .map(|path| {
            let name = config.export_name(path);
            (path.clone(), args.out_dir.join(arpattern::pattern_file_name(&name)))
        })
        .collect();
    arpattern::check_unique_outputs(&planned)?;

    let sources: Vec<arpattern::ImageSource> = args
        .in_paths
        .iter()
        .cloned()
        .map(arpattern::ImageSource::Path)
        .collect();
    let results = arpattern::encode_sources(&sources);

    let mut failed = 0usize;
    for ((path, out), result) in planned.iter().zip(results) {
        match result {
            Ok(pattern) => {
                arpattern::write_pattern_file(out, &pattern)?;
                eprintln!("wrote {}", out.display());
            }
            Err(err) => {
                failed += 1;
                eprintln!("error: {}: {err}", path.display());
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} input(s) failed", args.in_paths.len());
    }
    Ok(())
}

fn with_name_override(
    config: &arpattern::MarkerConfig,
    name: Option<String>,
) -> anyhow::Result<arpattern::MarkerConfig> {
    let mut config = config.clone();
    if name.is_some() {
        config.image_name = name;
        config.validate()?;
    }
    Ok(config)
}

fn build_marker(
    in_path: &Path,
    ratio: Option<f64>,
    size: Option<u32>,
    color: Option<&str>,
    config: &arpattern::MarkerConfig,
) -> anyhow::Result<arpattern::MarkerImage> {
    let geometry = arpattern::MarkerGeometry::new(
        ratio.unwrap_or(config.pattern_ratio),
        size.unwrap_or(config.size),
    )?;
    let border = match color {
        Some(c) => arpattern::resolve_border_color(c),
        None => config.border(),
    };
    let source = arpattern::ImageSource::Path(in_path.to_path_buf());
    let marker = arpattern::build_full_marker(&source, geometry, border)
        .with_context(|| format!("build marker from '{}'", in_path.display()))?;
    Ok(marker)
}

fn cmd_marker(args: MarkerArgs, config: &arpattern::MarkerConfig) -> anyhow::Result<()> {
    let config = with_name_override(config, args.name)?;
    let marker = build_marker(
        &args.in_path,
        args.ratio,
        args.size,
        args.color.as_deref(),
        &config,
    )?;
    let out = args.out.unwrap_or_else(|| {
        PathBuf::from(arpattern::marker_file_name(&config.export_name(&args.in_path)))
    });
    arpattern::write_png(&out, &marker.image)?;
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_sheet(args: SheetArgs, config: &arpattern::MarkerConfig) -> anyhow::Result<()> {
    let config = with_name_override(config, args.name)?;
    let layout = arpattern::SheetLayout::from_per_page(args.per_page)?;
    let marker = build_marker(&args.in_path, None, None, None, &config)?;
    let sheet = arpattern::compose_sheet(&marker, layout, args.dpi.unwrap_or(config.sheet_dpi))?;
    let out = args.out.unwrap_or_else(|| {
        PathBuf::from(arpattern::sheet_file_name(&config.export_name(&args.in_path)))
    });
    arpattern::write_png(&out, &sheet)?;
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_check_color(args: CheckColorArgs) -> anyhow::Result<()> {
    let color = arpattern::parse_color(&args.color)?;
    println!(
        "valid #{:02x}{:02x}{:02x} alpha {}",
        color.r, color.g, color.b, color.a
    );
    Ok(())
}
