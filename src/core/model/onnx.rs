//! ONNX Runtime backends for the pretrained classifier and detector.
use std::sync::Mutex;

use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use tracing::{debug, info};

use crate::core::model::postprocess::{SsdOutputs, decode_ssd, load_labels, rank_classes};
use crate::core::model::{Classifier, Detector};
use crate::core::params::PretrainedSpec;
use crate::core::processing::resize::resize_tensor;
use crate::error::{Error, Result};
use crate::types::{Classification, Detection, ImageTensor, PixelNormalization, TensorLayout};

fn inference_error(e: impl std::fmt::Display) -> Error {
    Error::Processing(format!("ONNX inference failed: {}", e))
}

fn load_session(spec: &PretrainedSpec) -> Result<Session> {
    info!("Loading ONNX model '{}' from {:?}", spec.id, spec.model_path);
    if !spec.model_path.exists() {
        return Err(Error::model_load_failed(
            &spec.id,
            format!("model file not found: {:?}", spec.model_path),
        ));
    }
    let session = Session::builder()
        .map_err(|e| Error::model_load_failed(&spec.id, e))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| Error::model_load_failed(&spec.id, e))?
        .commit_from_file(&spec.model_path)
        .map_err(|e| Error::model_load_failed(&spec.id, e))?;
    Ok(session)
}

/// Resize to the model's square input and lay the pixels out as it expects
fn input_tensor(spec: &PretrainedSpec, image: &ImageTensor) -> Result<(Vec<usize>, Vec<f32>)> {
    let side = spec.input_size;
    let resized = resize_tensor(image, side, side)?;
    let norm = spec.normalization;
    let data: Vec<f32> = match spec.layout {
        TensorLayout::Nhwc => resized.data.iter().map(|&v| norm.apply(v)).collect(),
        TensorLayout::Nchw => {
            let plane = side * side;
            let mut out = vec![0.0; plane * 3];
            for (i, px) in resized.data.chunks_exact(3).enumerate() {
                for c in 0..3 {
                    out[c * plane + i] = norm.apply(px[c]);
                }
            }
            out
        }
    };
    let shape = match spec.layout {
        TensorLayout::Nhwc => vec![1, side, side, 3],
        TensorLayout::Nchw => vec![1, 3, side, side],
    };
    Ok((shape, data))
}

pub struct OnnxClassifier {
    spec: PretrainedSpec,
    labels: Vec<String>,
    session: Mutex<Session>,
}

impl OnnxClassifier {
    pub fn load(spec: PretrainedSpec) -> Result<Self> {
        let session = load_session(&spec)?;
        let labels = load_labels(&spec.labels_path)?;
        debug!("Classifier '{}' has {} labels", spec.id, labels.len());
        Ok(Self {
            spec,
            labels,
            session: Mutex::new(session),
        })
    }
}

impl Classifier for OnnxClassifier {
    fn id(&self) -> &str {
        &self.spec.id
    }

    fn classify(&self, image: &ImageTensor) -> Result<Vec<Classification>> {
        let (shape, data) = input_tensor(&self.spec, image)?;
        let input = Tensor::from_array((shape, data)).map_err(inference_error)?;
        let scores: Vec<f32> = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| Error::Processing("ONNX session lock poisoned".into()))?;
            let outputs = session.run(ort::inputs![input]).map_err(inference_error)?;
            let (_, values) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(inference_error)?;
            values.to_vec()
        };
        Ok(rank_classes(&scores, &self.labels, self.spec.top_k))
    }
}

/// SSD-style detector exported with the TensorFlow Object Detection output
/// names (`detection_boxes`, `detection_scores`, `detection_classes`)
pub struct OnnxDetector {
    spec: PretrainedSpec,
    labels: Vec<String>,
    session: Mutex<Session>,
}

impl OnnxDetector {
    pub fn load(spec: PretrainedSpec) -> Result<Self> {
        let session = load_session(&spec)?;
        let labels = load_labels(&spec.labels_path)?;
        Ok(Self {
            spec,
            labels,
            session: Mutex::new(session),
        })
    }
}

impl Detector for OnnxDetector {
    fn id(&self) -> &str {
        &self.spec.id
    }

    fn detect(&self, image: &ImageTensor) -> Result<Vec<Detection>> {
        let (shape, data) = input_tensor(&self.spec, image)?;
        let mut session = self
            .session
            .lock()
            .map_err(|_| Error::Processing("ONNX session lock poisoned".into()))?;
        // Raw-pixel detectors take uint8 input
        let outputs = if self.spec.normalization == PixelNormalization::None {
            let bytes: Vec<u8> = data.iter().map(|&v| v as u8).collect();
            let input = Tensor::from_array((shape, bytes)).map_err(inference_error)?;
            session.run(ort::inputs![input]).map_err(inference_error)?
        } else {
            let input = Tensor::from_array((shape, data)).map_err(inference_error)?;
            session.run(ort::inputs![input]).map_err(inference_error)?
        };
        let (_, boxes) = outputs["detection_boxes"]
            .try_extract_tensor::<f32>()
            .map_err(inference_error)?;
        let (_, scores) = outputs["detection_scores"]
            .try_extract_tensor::<f32>()
            .map_err(inference_error)?;
        let (_, classes) = outputs["detection_classes"]
            .try_extract_tensor::<f32>()
            .map_err(inference_error)?;
        let raw = SsdOutputs {
            boxes,
            scores,
            classes,
        };
        Ok(decode_ssd(
            &raw,
            &self.labels,
            image.width,
            image.height,
            self.spec.iou_threshold,
            self.spec.max_detections,
        ))
    }
}
