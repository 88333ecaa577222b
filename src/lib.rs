#![doc = r#"
geoinfer: geospatial and image inference pipelines.

This crate wires one linear pipeline, Source Reader → Feature Extractor →
Tensor Batcher → Model Runner → Result Filter, around GDAL-backed readers,
a trainable dense network, and pretrained ONNX classifiers/detectors. It
powers the `geoinfer` CLI and can be embedded in your own Rust applications.

Requirements
------------
- GDAL development headers and runtime available on your system.
- Rust 2024 edition toolchain.
- ONNX Runtime when the `onnx` feature is enabled.

Train on one vector layer, predict another
------------------------------------------
```rust,no_run
use std::path::Path;
use geoinfer::{
    train_and_predict, Encoding, FeatureField, FeatureSchema, GeoPredictParams,
    LabelDecoding, LossFn, MissingPolicy, Optimizer, TrainConfig,
};

#[tokio::main]
async fn main() -> geoinfer::Result<()> {
    let schema = FeatureSchema::new(vec![
        FeatureField::numeric("elevation"),
        FeatureField::numeric("rainfall"),
        FeatureField::categorical("soil", &["clay", "loam", "sand"]),
    ])
    .with_missing(MissingPolicy::Default { value: 0.0 })
    .with_label("flooded", Encoding::Numeric);

    let mut train = TrainConfig::new(200);
    train.loss = LossFn::BinaryCrossEntropy;
    train.optimizer = Optimizer::adam(0.01);

    let mut params = GeoPredictParams::new(schema, train);
    params.decoding = LabelDecoding::Threshold {
        cutoff: 0.5,
        positive: "flood".into(),
        negative: "dry".into(),
    };

    let result = train_and_predict(
        Path::new("/data/parcels_2023.gpkg"),
        Path::new("/data/parcels_2024.gpkg"),
        &params,
    )
    .await?;
    for p in &result.predictions {
        println!("{} {:?} {:.3}", p.index, p.label, p.score);
    }
    Ok(())
}
```

Resize an image
---------------
```rust,no_run
use std::path::Path;
use geoinfer::{process_image, ResizeParams};

fn main() -> geoinfer::Result<()> {
    let params = ResizeParams { width: 100, height: 100, quality: 80 };
    let outcome = process_image(Path::new("in.png"), Path::new("out.jpg"), &params)?;
    println!("{}x{}", outcome.width, outcome.height);
    Ok(())
}
```

Pretrained models
-----------------
`classify_image` and `detect_objects` accept any `Classifier` / `Detector`.
With the `onnx` feature, `load_classifier` / `load_detector` build ONNX
Runtime backends through an explicit `ModelCache`, so each model is loaded
once per process.

Error handling
--------------
All public functions return `geoinfer::Result<T>`; match on `geoinfer::Error`
to handle specific cases such as `SourceUnavailable`, `IndexOutOfRange` or
`Timeout`.

Feature flags
-------------
- `onnx`: ONNX Runtime classifier/detector backends.
- `full`: everything.
"#]

pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use core::batch::{Batch, TensorBatcher, TrainingBatch};
pub use core::decode::LabelDecoding;
pub use core::filter::filter_by_confidence;
pub use core::model::{Classifier, DenseNetwork, Detector, ModelCache, TrainingReport};
pub use core::params::{
    GeoPredictParams, LayerSpec, PretrainedSpec, ResizeParams, TrainConfig,
};
pub use core::processing::save::ResizeOutcome;
pub use core::report::{JsonReporter, LogReporter, Reporter};
pub use core::schema::{
    Encoding, FeatureExtractor, FeatureField, FeatureSchema, MissingPolicy,
};
pub use error::{Error, Result};
pub use types::{
    Activation, AttributeValue, Classification, Detection, ImageTensor, LossFn, Metric,
    Optimizer, PixelNormalization, Prediction, Record, RecordPayload, Scored, TensorLayout,
};

// Readers
pub use io::{GdalRasterReader, RasterSource, SourceMetadata, SourceRecords, VectorSource};

// High-level API re-exports
pub use api::{
    GeoPrediction, classify_image, detect_objects, process_image, train_and_predict,
};
#[cfg(feature = "onnx")]
pub use api::{load_classifier, load_detector};
