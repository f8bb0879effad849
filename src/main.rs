//! spot-diff: find and mark the regions that differ between two images.
//!
//! ```text
//! spot-diff [OPTIONS] <ORIGINAL> <MODIFIED>
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::error;
use spot_diff::{
    ChangeDetector, ChannelReduction, DiffConfig, MarkerStyle, Strategy,
    error::DiffError,
    io::{FsExporter, FsLoader, PreviewDisplay},
    report::JsonReport,
};

/// Compare two aligned images and localize the regions that changed.
#[derive(Parser)]
#[command(name = "spot-diff", version)]
struct Cli {
    /// Reference image.
    original: PathBuf,

    /// Image to compare against the reference. Resized to match if needed.
    modified: PathBuf,

    /// Difference magnitude cutoff (0-255).
    #[arg(long, default_value_t = DiffConfig::DEFAULT_SENSITIVITY)]
    sensitivity: u8,

    /// Minimum region area in pixels.
    #[arg(long, default_value_t = DiffConfig::DEFAULT_MIN_AREA)]
    min_area: u32,

    /// Padding added around each region, in pixels.
    #[arg(long, default_value_t = DiffConfig::DEFAULT_PADDING)]
    padding: u32,

    /// Crops smaller than this (either side) are upscaled.
    #[arg(long, default_value_t = DiffConfig::DEFAULT_MIN_CROP_SIZE)]
    min_crop_size: u32,

    /// Differencing strategy.
    #[arg(long, value_enum, default_value_t = StrategyArg::MultiColorspace)]
    strategy: StrategyArg,

    /// How per-channel differences collapse into one intensity.
    #[arg(long, value_enum, default_value_t = ReductionArg::Max)]
    reduction: ReductionArg,

    /// Morphological kernel size in pixels (odd; 0 or 1 disables).
    #[arg(long, default_value_t = DiffConfig::DEFAULT_MORPH_KERNEL_SIZE)]
    morph_kernel_size: u32,

    /// Dilation passes after the opening.
    #[arg(long, default_value_t = DiffConfig::DEFAULT_MORPH_ITERATIONS)]
    morph_iterations: u32,

    /// Marker drawn around each region.
    #[arg(long, value_enum, default_value_t = MarkerArg::Rectangle)]
    marker: MarkerArg,

    /// Show the comparison and annotated views, waiting for Enter.
    #[arg(long)]
    display: bool,

    /// Write the annotated image, per-region crops and report.json.
    #[arg(long)]
    export: bool,

    /// Directory for exported files.
    #[arg(long, default_value = DiffConfig::DEFAULT_EXPORT_DIRECTORY)]
    export_directory: PathBuf,

    /// Full config as a JSON file. When provided, all other option flags
    /// are ignored.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the region report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// RGB + HSV absolute difference.
    MultiColorspace,
    /// Sobel edge-magnitude difference.
    Gradient,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReductionArg {
    Max,
    Luma,
}

#[derive(Clone, Copy, ValueEnum)]
enum MarkerArg {
    Rectangle,
    Circle,
}

impl Cli {
    fn to_config(&self) -> Result<DiffConfig, DiffError> {
        if let Some(path) = &self.config {
            return DiffConfig::from_json_file(path);
        }

        Ok(DiffConfig {
            sensitivity: self.sensitivity,
            min_area: self.min_area,
            padding: self.padding,
            min_crop_size: self.min_crop_size,
            strategy: match self.strategy {
                StrategyArg::MultiColorspace => Strategy::MultiColorspace,
                StrategyArg::Gradient => Strategy::Gradient,
            },
            reduction: match self.reduction {
                ReductionArg::Max => ChannelReduction::Max,
                ReductionArg::Luma => ChannelReduction::Luma,
            },
            morph_kernel_size: self.morph_kernel_size,
            morph_iterations: self.morph_iterations,
            marker: match self.marker {
                MarkerArg::Rectangle => MarkerStyle::Rectangle,
                MarkerArg::Circle => MarkerStyle::Circle,
            },
            display: self.display,
            export: self.export,
            export_directory: self.export_directory.clone(),
        })
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match cli.to_config().and_then(|config| config.validate().map(|()| config)) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(2);
        }
    };

    let detector = ChangeDetector::new().with_config(config.clone());
    let mut display = PreviewDisplay::stdin(config.export_directory.join("preview"));
    let exporter = FsExporter::new(&config.export_directory);

    let outcome = match detector.run(&FsLoader, &mut display, &exporter, &cli.original, &cli.modified) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = &outcome.detection;
    if cli.json {
        match JsonReport::new(result, &config).to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => error!("{}", e),
        }
    } else if result.has_changes() {
        println!("Found {} change(s):", result.region_count());
        for region in &result.regions {
            println!(
                "  #{}: x={} y={} w={} h={} area={}",
                region.id,
                region.padded.x,
                region.padded.y,
                region.padded.width,
                region.padded.height,
                region.area
            );
        }
    } else {
        println!("No changes found.");
    }

    match outcome.export {
        Some(Err(_)) => ExitCode::from(3),
        _ => ExitCode::SUCCESS,
    }
}
