use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::decode::LabelDecoding;
use crate::core::schema::FeatureSchema;
use crate::error::{Error, Result};
use crate::types::{
    Activation, LossFn, Metric, Optimizer, PixelNormalization, TensorLayout,
};

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.2;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

fn default_threshold() -> f32 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_layer() -> usize {
    1
}

fn default_seed() -> u64 {
    42
}

fn default_true() -> bool {
    true
}

/// One dense layer of the trainable network
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub units: usize,
    pub activation: Activation,
}

impl LayerSpec {
    pub fn new(units: usize, activation: Activation) -> Self {
        Self { units, activation }
    }
}

/// 32 ReLU units feeding a single sigmoid output
pub fn default_layers() -> Vec<LayerSpec> {
    vec![
        LayerSpec::new(32, Activation::Relu),
        LayerSpec::new(1, Activation::Sigmoid),
    ]
}

/// Training configuration. `epochs` has no default and must be supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub epochs: usize,
    /// Mini-batch size; None trains on the full batch each step
    #[serde(default)]
    pub batch_size: Option<usize>,
    pub loss: LossFn,
    pub optimizer: Optimizer,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_true")]
    pub shuffle: bool,
}

impl TrainConfig {
    /// Mean squared error, plain SGD and accuracy
    pub fn new(epochs: usize) -> Self {
        Self {
            epochs,
            batch_size: None,
            loss: LossFn::MeanSquaredError,
            optimizer: Optimizer::sgd(0.01),
            metrics: vec![Metric::Accuracy],
            seed: default_seed(),
            shuffle: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::InvalidArgument {
                arg: "epochs",
                value: "0".into(),
            });
        }
        if self.batch_size == Some(0) {
            return Err(Error::InvalidArgument {
                arg: "batch_size",
                value: "0".into(),
            });
        }
        let lr = match self.optimizer {
            Optimizer::Sgd { learning_rate }
            | Optimizer::Momentum { learning_rate, .. }
            | Optimizer::Adam { learning_rate, .. } => learning_rate,
        };
        if !(lr.is_finite() && lr > 0.0) {
            return Err(Error::InvalidArgument {
                arg: "learning_rate",
                value: lr.to_string(),
            });
        }
        Ok(())
    }
}

/// Parameters of the geospatial train-and-predict pipeline, suitable for config files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoPredictParams {
    pub schema: FeatureSchema,
    /// 1-based layer index used for both datasets
    #[serde(default = "default_layer")]
    pub layer: usize,
    #[serde(default = "default_layers")]
    pub layers: Vec<LayerSpec>,
    pub train: TrainConfig,
    #[serde(default)]
    pub decoding: LabelDecoding,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default = "default_timeout_secs")]
    pub io_timeout_secs: u64,
}

impl GeoPredictParams {
    pub fn new(schema: FeatureSchema, train: TrainConfig) -> Self {
        Self {
            schema,
            layer: default_layer(),
            layers: default_layers(),
            train,
            decoding: LabelDecoding::default(),
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            io_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }
}

/// Image resize request; fit is "contain without upscaling"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeParams {
    pub width: usize,
    pub height: usize,
    /// JPEG quality 0-100
    pub quality: u8,
}

impl Default for ResizeParams {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            quality: 80,
        }
    }
}

/// A pretrained ONNX model on disk plus its preprocessing contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PretrainedSpec {
    /// Cache key
    pub id: String,
    pub model_path: PathBuf,
    /// One class name per line; line N names class id N
    pub labels_path: PathBuf,
    /// Square side the image is resized to before inference
    pub input_size: usize,
    pub layout: TensorLayout,
    pub normalization: PixelNormalization,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_detections")]
    pub max_detections: usize,
    #[serde(default = "default_iou")]
    pub iou_threshold: f32,
}

fn default_top_k() -> usize {
    3
}

fn default_max_detections() -> usize {
    20
}

fn default_iou() -> f32 {
    0.5
}

impl PretrainedSpec {
    /// MobileNet-style classifier: 224x224 NHWC, pixels in [-1, 1]
    pub fn classifier(id: impl Into<String>, model_path: PathBuf, labels_path: PathBuf) -> Self {
        Self {
            id: id.into(),
            model_path,
            labels_path,
            input_size: 224,
            layout: TensorLayout::Nhwc,
            normalization: PixelNormalization::Symmetric,
            top_k: default_top_k(),
            max_detections: default_max_detections(),
            iou_threshold: default_iou(),
        }
    }

    /// SSD-style detector: 300x300 NHWC, raw pixels
    pub fn detector(id: impl Into<String>, model_path: PathBuf, labels_path: PathBuf) -> Self {
        Self {
            input_size: 300,
            normalization: PixelNormalization::None,
            ..Self::classifier(id, model_path, labels_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_fill_defaults_from_minimal_json() {
        let json = r#"{
            "schema": {"fields": [{"attribute": "a"}], "label": {"attribute": "y"}},
            "train": {"epochs": 5, "loss": "binary_cross_entropy", "optimizer": {"kind": "sgd", "learning_rate": 0.1}}
        }"#;
        let params: GeoPredictParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.layer, 1);
        assert_eq!(params.threshold, 0.2);
        assert_eq!(params.layers, default_layers());
        assert_eq!(params.train.seed, 42);
        assert!(params.train.shuffle);
        assert_eq!(params.decoding, LabelDecoding::Raw);
    }

    #[test]
    fn epochs_are_required() {
        let json = r#"{"loss": "mean_squared_error", "optimizer": {"kind": "sgd", "learning_rate": 0.1}}"#;
        assert!(serde_json::from_str::<TrainConfig>(json).is_err());
    }

    #[test]
    fn train_config_validation() {
        assert!(TrainConfig::new(10).validate().is_ok());
        assert!(TrainConfig::new(0).validate().is_err());
        let mut cfg = TrainConfig::new(1);
        cfg.optimizer = Optimizer::sgd(-1.0);
        assert!(matches!(
            cfg.validate(),
            Err(Error::InvalidArgument {
                arg: "learning_rate",
                ..
            })
        ));
    }
}
