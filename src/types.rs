//! Shared types and enums used across geoinfer.
//! Includes pipeline records (`Record`, `ImageTensor`), prediction outputs
//! (`Prediction`, `Classification`, `Detection`), and the training enums
//! (`Activation`, `LossFn`, `Optimizer`, `Metric`).
use std::collections::BTreeMap;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Fixed-length numeric encoding of a record
pub type FeatureVector = Vec<f32>;

/// Scalar training target (numeric value or categorical class index)
pub type Label = f32;

/// Single attribute value carried by a vector feature
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Integer(v) => write!(f, "{}", v),
            AttributeValue::Real(v) => write!(f, "{}", v),
            AttributeValue::Text(v) => write!(f, "{}", v),
            AttributeValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// Interleaved RGB pixels of shape [height, width, 3], values in [0, 255]
#[derive(Clone, Debug, PartialEq)]
pub struct ImageTensor {
    pub height: usize,
    pub width: usize,
    pub data: Vec<u8>,
}

impl ImageTensor {
    pub fn new(height: usize, width: usize, data: Vec<u8>) -> Result<Self> {
        let expected = height * width * 3;
        if data.len() != expected {
            return Err(Error::ShapeMismatch {
                row: 0,
                expected,
                found: data.len(),
            });
        }
        Ok(Self {
            height,
            width,
            data,
        })
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.height, self.width, 3]
    }

    pub fn from_rgb_image(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            height: height as usize,
            width: width as usize,
            data: img.into_raw(),
        }
    }
}

/// Source-specific payload of a record
#[derive(Clone, Debug, PartialEq)]
pub enum RecordPayload {
    Attributes(BTreeMap<String, AttributeValue>),
    Image(ImageTensor),
}

/// One unit of input, consumed once by feature extraction
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub index: u64,
    pub payload: RecordPayload,
}

impl Record {
    pub fn attributes(index: u64, attributes: BTreeMap<String, AttributeValue>) -> Self {
        Self {
            index,
            payload: RecordPayload::Attributes(attributes),
        }
    }

    pub fn image(index: u64, image: ImageTensor) -> Self {
        Self {
            index,
            payload: RecordPayload::Image(image),
        }
    }
}

/// Anything carrying a confidence score that can be threshold-filtered
pub trait Scored {
    fn score(&self) -> f32;
}

/// Per-record output of the trainable model after label decoding
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub index: u64,
    pub score: f32,
    pub scores: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f32; 4]>,
}

impl Scored for Prediction {
    fn score(&self) -> f32 {
        self.score
    }
}

/// Pretrained classifier output
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub score: f32,
}

impl Scored for Classification {
    fn score(&self) -> f32 {
        self.score
    }
}

/// Pretrained detector output; bbox is [x, y, width, height] in pixels
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: [f32; 4],
    pub label: String,
    pub score: f32,
}

impl Scored for Detection {
    fn score(&self) -> f32 {
        self.score
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl std::fmt::Display for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Activation::Linear => "Linear",
            Activation::Relu => "Relu",
            Activation::Sigmoid => "Sigmoid",
            Activation::Tanh => "Tanh",
        };
        write!(f, "{}", s)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossFn {
    MeanSquaredError,
    BinaryCrossEntropy,
}

impl std::fmt::Display for LossFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LossFn::MeanSquaredError => write!(f, "MeanSquaredError"),
            LossFn::BinaryCrossEntropy => write!(f, "BinaryCrossEntropy"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Optimizer {
    Sgd {
        learning_rate: f32,
    },
    Momentum {
        learning_rate: f32,
        momentum: f32,
    },
    Adam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    },
}

impl Optimizer {
    pub fn sgd(learning_rate: f32) -> Self {
        Optimizer::Sgd { learning_rate }
    }

    pub fn adam(learning_rate: f32) -> Self {
        Optimizer::Adam {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Accuracy,
    MeanAbsoluteError,
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Accuracy => write!(f, "accuracy"),
            Metric::MeanAbsoluteError => write!(f, "mae"),
        }
    }
}

/// Memory layout of the image tensor fed to an ONNX model
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensorLayout {
    Nhwc,
    Nchw,
}

/// Pixel normalization applied before pretrained inference
#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelNormalization {
    /// Raw values in [0, 255]
    None,
    /// Scale to [0, 1]
    UnitRange,
    /// Scale to [-1, 1] (MobileNet style)
    Symmetric,
}

impl PixelNormalization {
    pub fn apply(self, v: u8) -> f32 {
        match self {
            PixelNormalization::None => v as f32,
            PixelNormalization::UnitRange => v as f32 / 255.0,
            PixelNormalization::Symmetric => v as f32 / 127.5 - 1.0,
        }
    }
}
