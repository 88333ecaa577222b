//! Tensor batching: rectangular `[N, L]` feature matrices for model consumption.
use ndarray::Array2;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{FeatureVector, Label};

/// Inference batch; row `i` came from record `indices[i]`
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub features: Array2<f32>,
    pub indices: Vec<u64>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.features.nrows() == 0
    }

    pub fn width(&self) -> usize {
        self.features.ncols()
    }
}

/// Training batch; `labels` has shape `[N, 1]`
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingBatch {
    pub batch: Batch,
    pub labels: Array2<f32>,
}

pub struct TensorBatcher {
    width: usize,
}

impl TensorBatcher {
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn inference_batch(&self, vectors: &[FeatureVector], indices: &[u64]) -> Result<Batch> {
        if indices.len() != vectors.len() {
            return Err(Error::ShapeMismatch {
                row: vectors.len().min(indices.len()),
                expected: vectors.len(),
                found: indices.len(),
            });
        }
        let mut flat = Vec::with_capacity(vectors.len() * self.width);
        for (row, vector) in vectors.iter().enumerate() {
            if vector.len() != self.width {
                return Err(Error::ShapeMismatch {
                    row,
                    expected: self.width,
                    found: vector.len(),
                });
            }
            flat.extend_from_slice(vector);
        }
        let features = Array2::from_shape_vec((vectors.len(), self.width), flat)
            .map_err(|e| Error::Processing(e.to_string()))?;
        debug!("Assembled batch of shape {:?}", features.dim());
        Ok(Batch {
            features,
            indices: indices.to_vec(),
        })
    }

    pub fn training_batch(
        &self,
        vectors: &[FeatureVector],
        labels: &[Label],
        indices: &[u64],
    ) -> Result<TrainingBatch> {
        if labels.len() != vectors.len() {
            return Err(Error::ShapeMismatch {
                row: vectors.len().min(labels.len()),
                expected: vectors.len(),
                found: labels.len(),
            });
        }
        let batch = self.inference_batch(vectors, indices)?;
        let labels = Array2::from_shape_vec((labels.len(), 1), labels.to_vec())
            .map_err(|e| Error::Processing(e.to_string()))?;
        Ok(TrainingBatch { batch, labels })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_shape_matches_rows_and_width() {
        let batcher = TensorBatcher::new(3);
        let vectors = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let batch = batcher.inference_batch(&vectors, &[10, 11]).unwrap();
        assert_eq!(batch.features.dim(), (2, 3));
        assert_eq!(batch.features[[1, 2]], 6.0);
        assert_eq!(batch.indices, vec![10, 11]);
        for row in batch.features.rows() {
            assert_eq!(row.len(), 3);
        }
    }

    #[test]
    fn ragged_row_is_shape_mismatch() {
        let batcher = TensorBatcher::new(2);
        let err = batcher
            .inference_batch(&[vec![1.0, 2.0], vec![1.0]], &[0, 1])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ShapeMismatch {
                row: 1,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn label_count_must_match_rows() {
        let batcher = TensorBatcher::new(1);
        let err = batcher
            .training_batch(&[vec![1.0], vec![2.0]], &[1.0], &[0, 1])
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));

        let ok = batcher
            .training_batch(&[vec![1.0], vec![2.0]], &[0.0, 1.0], &[0, 1])
            .unwrap();
        assert_eq!(ok.labels.dim(), (2, 1));
    }

    #[test]
    fn empty_input_gives_zero_row_batch() {
        let batch = TensorBatcher::new(4).inference_batch(&[], &[]).unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.width(), 4);
    }
}
