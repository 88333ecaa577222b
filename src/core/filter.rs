//! Result filtering: keep predictions whose score reaches the confidence threshold.
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::Scored;

pub fn validate_threshold(threshold: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(Error::InvalidArgument {
            arg: "threshold",
            value: threshold.to_string(),
        });
    }
    Ok(())
}

/// Order-preserving subsequence of `predictions` with score >= `threshold`.
pub fn filter_by_confidence<P: Scored>(predictions: Vec<P>, threshold: f32) -> Result<Vec<P>> {
    validate_threshold(threshold)?;
    let total = predictions.len();
    let kept: Vec<P> = predictions
        .into_iter()
        .filter(|p| p.score() >= threshold)
        .collect();
    debug!(
        "Confidence filter {}: kept {} of {}",
        threshold,
        kept.len(),
        total
    );
    Ok(kept)
}
