//! High-level, ergonomic library API: the four end-to-end pipelines (train and
//! predict on vector layers, image classification, object detection, image
//! resize) plus cached loaders for the pretrained models. Prefer these entry
//! points over the low-level `core` modules when integrating geoinfer.
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::core::batch::TensorBatcher;
use crate::core::filter::{filter_by_confidence, validate_threshold};
use crate::core::model::{Classifier, DenseNetwork, Detector, TrainingReport};
use crate::core::params::{GeoPredictParams, ResizeParams};
use crate::core::processing::save::{ResizeOutcome, save_resized_jpeg};
use crate::core::schema::{FeatureExtractor, extract_all};
use crate::error::{Error, Result};
use crate::io::source::{open_image, open_vector_layer};
use crate::types::{Classification, Detection, Prediction};

#[cfg(feature = "onnx")]
use crate::core::model::ModelCache;
#[cfg(feature = "onnx")]
use crate::core::params::PretrainedSpec;
#[cfg(feature = "onnx")]
use std::sync::Arc;

/// Outcome of `train_and_predict`
#[derive(Debug, Clone, Serialize)]
pub struct GeoPrediction {
    pub training: TrainingReport,
    /// Number of prediction records before filtering
    pub evaluated: usize,
    /// Predictions at or above the confidence threshold, in record order
    pub predictions: Vec<Prediction>,
}

/// Train a dense model on one vector dataset and predict another.
///
/// Both datasets are read from the same 1-based layer and encoded with the
/// same schema; the schema must declare a label attribute.
pub async fn train_and_predict(
    training_path: &Path,
    prediction_path: &Path,
    params: &GeoPredictParams,
) -> Result<GeoPrediction> {
    validate_threshold(params.threshold)?;
    params.train.validate()?;
    let schema = &params.schema;
    if schema.label.is_none() {
        return Err(Error::MissingArgument {
            arg: "schema.label".into(),
        });
    }
    if schema.width() == 0 {
        return Err(Error::InvalidArgument {
            arg: "schema.fields",
            value: "[]".into(),
        });
    }
    let output_units = params.layers.last().map_or(0, |l| l.units);
    if let Some(expected) = params.decoding.expected_width() {
        if expected != output_units {
            error!(
                "Label decoding expects {} output unit(s), network has {}",
                expected, output_units
            );
            return Err(Error::ShapeMismatch {
                row: 0,
                expected,
                found: output_units,
            });
        }
    }
    let batcher = TensorBatcher::new(schema.width());

    let training_records =
        open_vector_layer(training_path, params.layer, params.io_timeout()).await?;
    let training = extract_all(schema, training_records, true)?;
    if training.skipped > 0 {
        warn!("Skipped {} malformed training record(s)", training.skipped);
    }
    let labels = training.labels.unwrap_or_default();
    let train_batch = batcher.training_batch(&training.vectors, &labels, &training.indices)?;

    let mut model = DenseNetwork::build(schema.width(), &params.layers, params.train.seed)?;
    let report = model
        .train(&train_batch, &params.train)
        .inspect_err(|e| error!("Training failed: {}", e))?;

    let prediction_records =
        open_vector_layer(prediction_path, params.layer, params.io_timeout()).await?;
    let inference = extract_all(schema, prediction_records, false)?;
    if inference.skipped > 0 {
        warn!("Skipped {} malformed prediction record(s)", inference.skipped);
    }
    let batch = batcher.inference_batch(&inference.vectors, &inference.indices)?;
    let outputs = model.predict(&batch)?;
    let decoded = params.decoding.decode(&outputs, &batch.indices)?;
    let evaluated = decoded.len();
    let predictions = filter_by_confidence(decoded, params.threshold)?;

    info!(
        "Predicted {} record(s), {} at or above threshold {}",
        evaluated,
        predictions.len(),
        params.threshold
    );
    Ok(GeoPrediction {
        training: report,
        evaluated,
        predictions,
    })
}

/// Classify one image from a path or URL. Results are ordered by descending
/// score and filtered at `threshold`.
pub async fn classify_image(
    location: &str,
    classifier: &dyn Classifier,
    threshold: f32,
    deadline: Duration,
) -> Result<Vec<Classification>> {
    validate_threshold(threshold)?;
    let (_, image) = open_image(location, None, deadline).await?;
    let classes = classifier.classify(&image)?;
    info!(
        "Classifier '{}' returned {} class(es) for {}",
        classifier.id(),
        classes.len(),
        location
    );
    filter_by_confidence(classes, threshold)
}

/// Detect objects in one image from a path or URL, keeping detections with
/// score >= `threshold`.
pub async fn detect_objects(
    location: &str,
    detector: &dyn Detector,
    threshold: f32,
    deadline: Duration,
) -> Result<Vec<Detection>> {
    validate_threshold(threshold)?;
    let (_, image) = open_image(location, None, deadline).await?;
    let detections = detector.detect(&image)?;
    info!(
        "Detector '{}' returned {} detection(s) for {}",
        detector.id(),
        detections.len(),
        location
    );
    filter_by_confidence(detections, threshold)
}

/// Resize `input` to fit inside `params.width` x `params.height` without
/// enlarging and write it as JPEG at `params.quality`.
pub fn process_image(input: &Path, output: &Path, params: &ResizeParams) -> Result<ResizeOutcome> {
    save_resized_jpeg(input, output, params).inspect_err(|e| error!("Resize failed: {}", e))
}

/// Load (once per id) an ONNX classifier through `cache`
#[cfg(feature = "onnx")]
pub async fn load_classifier(
    cache: &ModelCache<dyn Classifier>,
    spec: PretrainedSpec,
) -> Result<Arc<dyn Classifier>> {
    let id = spec.id.clone();
    cache
        .get_or_load(&id, || async move {
            let model = tokio::task::spawn_blocking(move || {
                crate::core::model::onnx::OnnxClassifier::load(spec)
            })
            .await
            .map_err(Error::external)??;
            Ok(Arc::new(model) as Arc<dyn Classifier>)
        })
        .await
}

/// Load (once per id) an ONNX detector through `cache`
#[cfg(feature = "onnx")]
pub async fn load_detector(
    cache: &ModelCache<dyn Detector>,
    spec: PretrainedSpec,
) -> Result<Arc<dyn Detector>> {
    let id = spec.id.clone();
    cache
        .get_or_load(&id, || async move {
            let model = tokio::task::spawn_blocking(move || {
                crate::core::model::onnx::OnnxDetector::load(spec)
            })
            .await
            .map_err(Error::external)??;
            Ok(Arc::new(model) as Arc<dyn Detector>)
        })
        .await
}
