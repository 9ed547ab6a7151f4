use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use log::info;

use leaf_health_lib::config::Config;
use leaf_health_lib::image_io::{load_image, save_image};
use leaf_health_lib::output::{write_csv_report, write_json, write_json_report, ReportSummary};
use leaf_health_lib::pipeline::process_image;

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "LeafHealth - Leaf segmentation and pigment health analysis")]
struct Args {
    /// Path to the leaf photo
    #[clap(short, long)]
    input: Option<String>,

    /// Path to output directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file (defaults are used if it does not exist)
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Report format
    #[clap(short, long, value_enum, default_value_t = ReportFormat::Json)]
    format: ReportFormat,

    /// Downscale so the longest side is at most this many pixels (overwrites config)
    #[clap(long)]
    max_dimension: Option<u32>,

    /// Worker threads for the row-parallel stages (overwrites config)
    #[clap(long)]
    threads: Option<usize>,

    /// Print the JSON report to stdout instead of writing a file
    #[clap(long)]
    stdout: bool,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Json,
    Csv,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    // Load configuration
    let mut config = Config::from_file_or_default(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config))?;

    // Override config with command-line arguments
    if let Some(input) = args.input.clone() {
        config.input_path = input;
    }
    if let Some(output) = args.output.clone() {
        config.output_dir = output;
    }
    if let Some(max_dim) = args.max_dimension {
        config.max_dimension = Some(max_dim);
    }
    if let Some(threads) = args.threads {
        config.threads = Some(threads);
    }

    config.validate()?;

    if let Some(threads) = config.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("configuring worker threads")?;
    }

    let input_path = PathBuf::from(&config.input_path);
    if !input_path.is_file() {
        bail!("input must be a single image file: {}", input_path.display());
    }

    let start_time = Instant::now();

    info!("Processing: {}", input_path.display());
    let input_image = load_image(&input_path)
        .with_context(|| format!("loading {}", input_path.display()))?;
    let filename = input_image.filename.clone();

    let report = process_image(input_image, &config, None)?;

    let output_dir = PathBuf::from(&config.output_dir);
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    if config.save_segmented {
        let segmented_path = output_dir.join(format!("{}_segmented.png", filename));
        save_image(&report.segmented.clone().into_rgba_image()?, &segmented_path)?;
        info!("Segmented leaf written to {}", segmented_path.display());
    }

    let summary = ReportSummary::new(&filename, &report);
    match (args.format, args.stdout) {
        (ReportFormat::Json, true) => write_json(&summary, std::io::stdout().lock())?,
        (ReportFormat::Json, false) => {
            let path = write_json_report(&summary, &output_dir)?;
            info!("Report written to {}", path.display());
        }
        (ReportFormat::Csv, _) => {
            let path = write_csv_report(&summary, &output_dir)?;
            info!("Report written to {}", path.display());
        }
    }

    info!(
        "{}: {} ({} leaf pixels, {:.1}% healthy pigment)",
        filename,
        report.result.verdict,
        report.result.counts.total,
        report.result.healthy_pct
    );

    let elapsed = start_time.elapsed();
    info!("Processing completed in {:.2} seconds", elapsed.as_secs_f64());

    Ok(())
}
