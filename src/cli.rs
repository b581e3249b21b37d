use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use image::imageops::FilterType;
use tonetrace::{CohortOrder, TraceOptions};
use visioncortex::PathSimplifyMode;
use vtracer::Hierarchical;

/// Command line interface definition.
#[derive(Parser, Debug)]
#[command(author, version, about, propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct GlobalOptions {
    /// Longest side of the normalized raster; smaller inputs are never enlarged
    #[arg(long = "max-dimension", default_value_t = 1000, env = "TONETRACE_MAX_DIMENSION")]
    pub max_dimension: u32,
    /// Filter used when shrinking the input
    #[arg(long = "resize-filter", value_enum, default_value_t = ResampleFilter::Lanczos3)]
    pub resize_filter: ResampleFilter,
    /// Worker threads for the batch (defaults to one per core)
    #[arg(long, env = "TONETRACE_THREADS")]
    pub threads: Option<usize>,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Trace stacked gray layers and recover the photo's colors
    Color(ColorCommand),
    /// Trace a single black layer
    #[command(name = "black-and-white", alias = "bw")]
    BlackAndWhite(BlackAndWhiteCommand),
}

/// Resampling filters for image resizing.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ResampleFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResampleFilter> for FilterType {
    /// Convert ResampleFilter to image::imageops::FilterType.
    fn from(value: ResampleFilter) -> Self {
        match value {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Gaussian => FilterType::Gaussian,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Input image paths
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// Directory for the SVG files (defaults to beside each input)
    #[arg(short = 'o', long = "output-dir")]
    pub output_dir: Option<PathBuf>,
    /// Print the batch report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ColorCommand {
    #[command(flatten)]
    pub batch: BatchArgs,
    /// Number of stacked luminance layers
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u8).range(1..))]
    pub steps: u8,
    /// How stacked opacities are grouped when resolving grays
    #[arg(long = "cohort-order", value_enum, default_value_t = CohortOrderArg::ByOpacity)]
    pub cohort_order: CohortOrderArg,
    /// Palette size requested from the quantizer per color region
    #[arg(long = "palette-size", default_value_t = 5)]
    pub palette_size: usize,
    #[command(flatten)]
    pub trace_options: TraceOptionsArgs,
}

#[derive(Args, Debug)]
pub struct BlackAndWhiteCommand {
    #[command(flatten)]
    pub batch: BatchArgs,
    /// Luminance at or below which a pixel is traced
    #[arg(long, default_value_t = 128)]
    pub threshold: u8,
    #[command(flatten)]
    pub trace_options: TraceOptionsArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CohortOrderArg {
    ByOpacity,
    DocumentOrder,
}

impl From<CohortOrderArg> for CohortOrder {
    fn from(value: CohortOrderArg) -> Self {
        match value {
            CohortOrderArg::ByOpacity => CohortOrder::ByOpacity,
            CohortOrderArg::DocumentOrder => CohortOrder::DocumentOrder,
        }
    }
}

/// Hierarchical tracing modes for SVG vectorization.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum TracerHierarchy {
    Stacked,
    Cutout,
}

impl From<TracerHierarchy> for Hierarchical {
    /// Convert TracerHierarchy to vtracer::Hierarchical.
    fn from(value: TracerHierarchy) -> Self {
        match value {
            TracerHierarchy::Stacked => Hierarchical::Stacked,
            TracerHierarchy::Cutout => Hierarchical::Cutout,
        }
    }
}

/// Path simplification modes for SVG vectorization.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum TracerMode {
    None,
    Polygon,
    Spline,
}

impl From<TracerMode> for PathSimplifyMode {
    /// Convert TracerMode to vtracer::PathSimplifyMode.
    fn from(value: TracerMode) -> Self {
        match value {
            TracerMode::None => PathSimplifyMode::None,
            TracerMode::Polygon => PathSimplifyMode::Polygon,
            TracerMode::Spline => PathSimplifyMode::Spline,
        }
    }
}

#[derive(Args, Debug)]
pub struct TraceOptionsArgs {
    /// Hierarchical tracing mode
    #[arg(long = "hierarchy", value_enum, default_value_t = TracerHierarchy::Stacked)]
    pub hierarchy: TracerHierarchy,
    /// Path simplification mode
    #[arg(long = "mode", value_enum, default_value_t = TracerMode::Spline)]
    pub mode: TracerMode,
    /// Speckle filter size used by the tracer
    #[arg(long = "filter-speckle", default_value_t = 2)]
    pub filter_speckle: usize,
    /// Corner threshold in degrees
    #[arg(long = "corner-threshold", default_value_t = 60)]
    pub corner_threshold: i32,
    /// Segment length threshold
    #[arg(long = "length-threshold", default_value_t = 4.0)]
    pub length_threshold: f64,
    /// Maximum subdivision iterations
    #[arg(long = "max-iterations", default_value_t = 10)]
    pub max_iterations: usize,
    /// Splice threshold in degrees
    #[arg(long = "splice-threshold", default_value_t = 45)]
    pub splice_threshold: i32,
    /// Path precision (decimal places)
    #[arg(long = "path-precision")]
    pub path_precision: Option<u32>,
    /// Disable explicit path precision
    #[arg(long = "no-path-precision", conflicts_with = "path_precision")]
    pub no_path_precision: bool,
}

impl From<&TraceOptionsArgs> for TraceOptions {
    fn from(args: &TraceOptionsArgs) -> Self {
        let path_precision = if args.no_path_precision {
            None
        } else {
            args.path_precision.or(TraceOptions::default().path_precision)
        };
        Self {
            hierarchical: args.hierarchy.into(),
            simplify_mode: args.mode.into(),
            filter_speckle: args.filter_speckle,
            corner_threshold: args.corner_threshold,
            length_threshold: args.length_threshold,
            max_iterations: args.max_iterations,
            splice_threshold: args.splice_threshold,
            path_precision,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn color_subcommand_parses_defaults() {
        let cli = Cli::try_parse_from(["tonetrace", "color", "a.png", "b.jpg"]).unwrap();
        assert_eq!(cli.global.max_dimension, 1000);
        let Commands::Color(cmd) = cli.command else {
            panic!("expected color subcommand");
        };
        assert_eq!(cmd.batch.inputs.len(), 2);
        assert_eq!(cmd.steps, 4);
        assert!(!cmd.batch.json);
    }

    #[test]
    fn black_and_white_accepts_threshold() {
        let cli =
            Cli::try_parse_from(["tonetrace", "-v", "black-and-white", "--threshold", "90", "a.png"])
                .unwrap();
        assert_eq!(cli.global.verbose, 1);
        let Commands::BlackAndWhite(cmd) = cli.command else {
            panic!("expected black-and-white subcommand");
        };
        assert_eq!(cmd.threshold, 90);
    }

    #[test]
    fn zero_steps_is_rejected() {
        assert!(Cli::try_parse_from(["tonetrace", "color", "--steps", "0", "a.png"]).is_err());
    }
}
