use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use geoinfer::core::params::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_TIMEOUT_SECS};
use geoinfer::{PixelNormalization, TensorLayout};

#[derive(Parser)]
#[command(name = "geoinfer", version, about = "geoinfer CLI")]
pub struct CliArgs {
    /// Enable logging (to stderr; RUST_LOG overrides the default filter)
    #[arg(long, global = true, default_value_t = false)]
    pub log: bool,

    /// Result output: a JSON document on stdout, or log events
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Deadline in seconds for each file/network read and model load
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum OutputFormat {
    Json,
    Log,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resize an image to fit inside WIDTHxHEIGHT (never enlarging) and save it as JPEG
    Resize {
        /// Input image
        #[arg(short, long)]
        input: PathBuf,

        /// Output JPEG file
        #[arg(short, long)]
        output: PathBuf,

        /// Bounding box, e.g. 800x600
        #[arg(long, default_value = "1024x1024")]
        size: String,

        /// JPEG quality (0-100)
        #[arg(long, default_value_t = 80, value_parser = clap::value_parser!(u8).range(0..=100))]
        quality: u8,
    },

    /// Classify an image (path or URL) with a pretrained ONNX classifier
    Classify {
        /// Image path or http(s) URL
        location: String,

        #[command(flatten)]
        model: PretrainedArgs,

        /// Number of classes to return
        #[arg(long, default_value_t = 3)]
        top_k: usize,

        /// Minimum score to report
        #[arg(long, default_value_t = 0.0)]
        threshold: f32,
    },

    /// Detect objects in an image (path or URL) with a pretrained ONNX detector
    Detect {
        /// Image path or http(s) URL
        location: String,

        #[command(flatten)]
        model: PretrainedArgs,

        /// Minimum score to report
        #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
        threshold: f32,

        /// Maximum detections kept after non-maximum suppression
        #[arg(long, default_value_t = 20)]
        max_detections: usize,
    },

    /// Train a dense model on one vector dataset and predict another
    TrainPredict {
        /// Labelled training dataset (any OGR vector format)
        #[arg(long)]
        training: PathBuf,

        /// Dataset to predict
        #[arg(long)]
        predict: PathBuf,

        /// JSON pipeline configuration (schema, layers, training, decoding)
        #[arg(long)]
        config: PathBuf,

        /// Override the configured number of epochs
        #[arg(long)]
        epochs: Option<usize>,

        /// Override the configured confidence threshold
        #[arg(long)]
        threshold: Option<f32>,
    },
}

#[derive(clap::Args)]
pub struct PretrainedArgs {
    /// ONNX model file
    #[arg(long)]
    pub model: PathBuf,

    /// Labels file, one class name per line
    #[arg(long)]
    pub labels: PathBuf,

    /// Cache key for the model (defaults to the model file name)
    #[arg(long)]
    pub model_id: Option<String>,

    /// Square input side expected by the model
    #[arg(long)]
    pub input_size: Option<usize>,

    /// Input tensor layout
    #[arg(long, value_enum)]
    pub layout: Option<TensorLayout>,

    /// Pixel normalization applied before inference
    #[arg(long, value_enum)]
    pub normalization: Option<PixelNormalization>,
}
