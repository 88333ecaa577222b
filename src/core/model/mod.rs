//! Model Runner: the trainable dense network, pretrained classifier and
//! detector interfaces, their post-processing, and the model cache.
pub mod cache;
pub mod dense;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod postprocess;

pub use cache::ModelCache;
pub use dense::{DenseNetwork, EpochStats, TrainingReport};

use crate::error::Result;
use crate::types::{Classification, Detection, ImageTensor};

/// Pretrained image classifier. Implementations must be safe to call from
/// several tasks; backends that are not serialize internally.
pub trait Classifier: Send + Sync {
    fn id(&self) -> &str;

    /// Classes ordered by descending score
    fn classify(&self, image: &ImageTensor) -> Result<Vec<Classification>>;
}

/// Pretrained object detector; output order is unspecified
pub trait Detector: Send + Sync {
    fn id(&self) -> &str;

    fn detect(&self, image: &ImageTensor) -> Result<Vec<Detection>>;
}
