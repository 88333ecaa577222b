use std::io;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use geoinfer::api::{process_image, train_and_predict};
use geoinfer::{
    GeoPredictParams, JsonReporter, LogReporter, PretrainedSpec, Reporter, ResizeParams,
};
use serde::Serialize;

use super::args::{CliArgs, Command, OutputFormat, PretrainedArgs};
use super::errors::AppError;

fn parse_size(size: &str) -> Result<(usize, usize), AppError> {
    let invalid = || AppError::InvalidSize {
        size: size.to_string(),
    };
    let (w, h) = size
        .split_once(['x', 'X'])
        .ok_or_else(invalid)?;
    let width = w.trim().parse::<usize>().map_err(|_| invalid())?;
    let height = h.trim().parse::<usize>().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok((width, height))
}

fn pretrained_spec(args: &PretrainedArgs, detector: bool) -> PretrainedSpec {
    let id = args.model_id.clone().unwrap_or_else(|| {
        args.model
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| args.model.display().to_string())
    });
    let mut spec = if detector {
        PretrainedSpec::detector(id, args.model.clone(), args.labels.clone())
    } else {
        PretrainedSpec::classifier(id, args.model.clone(), args.labels.clone())
    };
    if let Some(size) = args.input_size {
        spec.input_size = size;
    }
    if let Some(layout) = args.layout {
        spec.layout = layout;
    }
    if let Some(normalization) = args.normalization {
        spec.normalization = normalization;
    }
    spec
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("geoinfer=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[cfg(feature = "onnx")]
async fn run_classify(
    location: &str,
    spec: PretrainedSpec,
    threshold: f32,
    deadline: Duration,
) -> Result<Vec<geoinfer::Classification>, AppError> {
    let cache = geoinfer::ModelCache::new(deadline);
    let classifier = geoinfer::load_classifier(&cache, spec).await?;
    Ok(geoinfer::classify_image(location, classifier.as_ref(), threshold, deadline).await?)
}

#[cfg(not(feature = "onnx"))]
async fn run_classify(
    _location: &str,
    spec: PretrainedSpec,
    _threshold: f32,
    _deadline: Duration,
) -> Result<Vec<geoinfer::Classification>, AppError> {
    warn!("Cannot load classifier '{}' without ONNX support", spec.id);
    Err(AppError::Unsupported {
        backend: "ONNX Runtime",
        feature: "onnx",
    })
}

#[cfg(feature = "onnx")]
async fn run_detect(
    location: &str,
    spec: PretrainedSpec,
    threshold: f32,
    deadline: Duration,
) -> Result<Vec<geoinfer::Detection>, AppError> {
    let cache = geoinfer::ModelCache::new(deadline);
    let detector = geoinfer::load_detector(&cache, spec).await?;
    Ok(geoinfer::detect_objects(location, detector.as_ref(), threshold, deadline).await?)
}

#[cfg(not(feature = "onnx"))]
async fn run_detect(
    _location: &str,
    spec: PretrainedSpec,
    _threshold: f32,
    _deadline: Duration,
) -> Result<Vec<geoinfer::Detection>, AppError> {
    warn!("Cannot load detector '{}' without ONNX support", spec.id);
    Err(AppError::Unsupported {
        backend: "ONNX Runtime",
        feature: "onnx",
    })
}

fn emit<T: Serialize>(format: OutputFormat, source: &str, items: &[T]) -> geoinfer::Result<()> {
    match format {
        OutputFormat::Json => JsonReporter::new(io::stdout().lock()).report(source, items),
        OutputFormat::Log => LogReporter.report(source, items),
    }
}

pub async fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.log || args.format == OutputFormat::Log {
        init_logging();
    }
    let deadline = Duration::from_secs(args.timeout_secs);
    let format = args.format;

    match args.command {
        Command::Resize {
            input,
            output,
            size,
            quality,
        } => {
            let (width, height) = parse_size(&size)?;
            let params = ResizeParams {
                width,
                height,
                quality,
            };
            let outcome = process_image(&input, &output, &params).map_err(AppError::from)?;
            info!("Successfully processed: {:?} -> {:?}", input, output);
            emit(format, &output.display().to_string(), &[outcome])?;
        }
        Command::Classify {
            location,
            model,
            top_k,
            threshold,
        } => {
            let mut spec = pretrained_spec(&model, false);
            spec.top_k = top_k;
            let classes = run_classify(&location, spec, threshold, deadline).await?;
            emit(format, &location, &classes)?;
        }
        Command::Detect {
            location,
            model,
            threshold,
            max_detections,
        } => {
            let mut spec = pretrained_spec(&model, true);
            spec.max_detections = max_detections;
            let detections = run_detect(&location, spec, threshold, deadline).await?;
            emit(format, &location, &detections)?;
        }
        Command::TrainPredict {
            training,
            predict,
            config,
            epochs,
            threshold,
        } => {
            let mut params = GeoPredictParams::from_json_file(&config).map_err(AppError::from)?;
            if let Some(epochs) = epochs {
                params.train.epochs = epochs;
            }
            if let Some(threshold) = threshold {
                params.threshold = threshold;
            }
            params.io_timeout_secs = args.timeout_secs;
            info!("Training on {:?}, predicting {:?}", training, predict);
            let result = train_and_predict(&training, &predict, &params)
                .await
                .map_err(AppError::from)?;
            if let Some(loss) = result.training.final_loss() {
                info!("Final training loss: {:.6}", loss);
            }
            emit(format, &predict.display().to_string(), &result.predictions)?;
        }
    }

    Ok(())
}
