//! Label decoding: turns raw network outputs into scored predictions.
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Prediction;

/// Policy mapping one output row to a score and optional label
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LabelDecoding {
    /// Score is the first output, no label (regression)
    #[default]
    Raw,
    /// Single sigmoid unit: `positive` when output >= cutoff, else `negative`.
    /// Score is the confidence in the chosen label.
    Threshold {
        cutoff: f32,
        positive: String,
        negative: String,
    },
    /// One output per label; the largest wins
    Argmax { labels: Vec<String> },
}

impl LabelDecoding {
    /// Output width this policy decodes; `None` accepts any width
    pub fn expected_width(&self) -> Option<usize> {
        match self {
            LabelDecoding::Raw => None,
            LabelDecoding::Threshold { .. } => Some(1),
            LabelDecoding::Argmax { labels } => Some(labels.len()),
        }
    }

    pub fn decode(&self, outputs: &Array2<f32>, indices: &[u64]) -> Result<Vec<Prediction>> {
        let width = outputs.ncols();
        if let Some(expected) = self.expected_width() {
            if expected != width {
                return Err(Error::ShapeMismatch {
                    row: 0,
                    expected,
                    found: width,
                });
            }
        }
        if width == 0 || indices.len() != outputs.nrows() {
            return Err(Error::ShapeMismatch {
                row: 0,
                expected: outputs.nrows(),
                found: indices.len(),
            });
        }

        let mut predictions = Vec::with_capacity(outputs.nrows());
        for (row, &index) in outputs.rows().into_iter().zip(indices) {
            let scores = row.to_vec();
            let (score, label) = match self {
                LabelDecoding::Raw => (scores[0], None),
                LabelDecoding::Threshold {
                    cutoff,
                    positive,
                    negative,
                } => {
                    let v = scores[0];
                    if v >= *cutoff {
                        (v, Some(positive.clone()))
                    } else {
                        (1.0 - v, Some(negative.clone()))
                    }
                }
                LabelDecoding::Argmax { labels } => {
                    let (best, value) = argmax(&scores);
                    (value, Some(labels[best].clone()))
                }
            };
            predictions.push(Prediction {
                index,
                score,
                scores,
                label,
                bbox: None,
            });
        }
        Ok(predictions)
    }
}

/// Index and value of the largest element; the first one wins ties
pub fn argmax(values: &[f32]) -> (usize, f32) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, v)| {
            if v > best.1 { (i, v) } else { best }
        })
}
