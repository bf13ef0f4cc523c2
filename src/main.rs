use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use semiovis::config::Settings;
use semiovis::entry::{run_colorize, run_range, ColorizeRequest, ParcellationInput};
use semiovis::io::input::VoxelType;
use semiovis::texture::SliceAxis;
use semiovis::NamedPalette;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "semiovis")]
#[command(about = "Color brain parcellation regions by semiology scores")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Style every segment and write styles, score volume and overlay.
    Colorize(ColorizeArgs),
    /// Print the normalization bounds of a score file.
    Range(RangeArgs),
    /// List the named palettes.
    Palettes,
}

#[derive(Args)]
struct ColorizeArgs {
    #[arg(long)]
    scores: PathBuf,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    color_table: Option<PathBuf>,
    #[arg(long)]
    palette: Option<String>,
    /// Headerless little-endian label buffer.
    #[arg(long)]
    parcellation: Option<PathBuf>,
    /// Volume shape as `Z,Y,X`.
    #[arg(long, value_delimiter = ',')]
    shape: Vec<usize>,
    #[arg(long, default_value = "u16")]
    voxel_type: VoxelType,
    #[arg(long, default_value = "axial")]
    axis: SliceAxis,
}

#[derive(Args)]
struct RangeArgs {
    #[arg(long)]
    scores: PathBuf,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Colorize(args) => colorize(args),
        Command::Range(args) => range(args),
        Command::Palettes => {
            for palette in NamedPalette::all() {
                println!("{}", palette.name());
            }
            Ok(())
        }
    }
}

fn colorize(args: ColorizeArgs) -> Result<()> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(table) = args.color_table {
        settings.atlas.color_table = Some(table);
    }
    if let Some(palette) = args.palette {
        settings.styling.palette = palette;
    }

    let parcellation = match args.parcellation {
        Some(path) => {
            if args.shape.is_empty() {
                bail!("--shape is required with --parcellation");
            }
            Some(ParcellationInput {
                path,
                shape: args.shape,
                voxel_type: args.voxel_type,
            })
        }
        None => None,
    };

    let request = ColorizeRequest {
        scores_path: args.scores,
        output_dir: args.out,
        parcellation,
        axis: args.axis,
    };
    let outcome = run_colorize(&settings, &request).context("colorize failed")?;

    info!(
        table = %outcome.color_table,
        styled = outcome.report.styles.len(),
        visible = outcome.report.styles.visible_count(),
        unresolved = outcome.report.unresolved.len(),
        "done"
    );
    Ok(())
}

fn range(args: RangeArgs) -> Result<()> {
    let range = run_range(&args.scores)?;
    println!("min_positive={} max_positive={}", range.min_positive, range.max_positive);
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
