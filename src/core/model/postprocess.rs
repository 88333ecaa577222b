//! Backend-independent post-processing for pretrained classifier and detector outputs.
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{Classification, Detection};

/// Read a labels file: one class name per line, line N names class id N
pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::model_load_failed(path.display().to_string(), e))?;
    Ok(text.lines().map(|l| l.trim().to_string()).collect())
}

/// Softmax with max subtraction
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum > 0.0 {
        exps.into_iter().map(|e| e / sum).collect()
    } else {
        exps
    }
}

fn label_for(labels: &[String], class: usize) -> String {
    labels
        .get(class)
        .cloned()
        .unwrap_or_else(|| format!("class_{}", class))
}

/// Top-k classes by descending probability.
///
/// Logits are passed through softmax unless they already form a
/// distribution (all within [0, 1] and summing to ~1).
pub fn rank_classes(outputs: &[f32], labels: &[String], top_k: usize) -> Vec<Classification> {
    let sum: f32 = outputs.iter().sum();
    let is_distribution =
        outputs.iter().all(|v| (0.0..=1.0).contains(v)) && (sum - 1.0).abs() < 1e-3;
    let probs = if is_distribution {
        outputs.to_vec()
    } else {
        softmax(outputs)
    };
    let mut ranked: Vec<(usize, f32)> = probs.into_iter().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(top_k)
        .map(|(class, score)| Classification {
            label: label_for(labels, class),
            score,
        })
        .collect()
}

/// Intersection over union of two [x, y, w, h] boxes
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = (a[0] + a[2]).min(b[0] + b[2]);
    let y2 = (a[1] + a[3]).min(b[1] + b[3]);
    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a[2] * a[3] + b[2] * b[3] - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

/// Greedy non-maximum suppression, keeping at most `max_detections`
pub fn non_max_suppression(
    mut detections: Vec<Detection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Detection> {
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<Detection> = Vec::new();
    for candidate in detections {
        if kept.len() >= max_detections {
            break;
        }
        if kept
            .iter()
            .all(|k| iou(&k.bbox, &candidate.bbox) <= iou_threshold)
        {
            kept.push(candidate);
        }
    }
    kept
}

/// Raw SSD-style detector outputs for one image
pub struct SsdOutputs<'a> {
    /// N x [ymin, xmin, ymax, xmax], normalized to [0, 1]
    pub boxes: &'a [f32],
    /// N scores
    pub scores: &'a [f32],
    /// N class ids
    pub classes: &'a [f32],
}

/// Decode normalized SSD boxes to pixel [x, y, w, h] detections, then suppress overlaps.
pub fn decode_ssd(
    outputs: &SsdOutputs<'_>,
    labels: &[String],
    image_width: usize,
    image_height: usize,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Detection> {
    let (w, h) = (image_width as f32, image_height as f32);
    let count = outputs
        .scores
        .len()
        .min(outputs.classes.len())
        .min(outputs.boxes.len() / 4);
    let detections = (0..count)
        .map(|i| {
            let b = &outputs.boxes[i * 4..i * 4 + 4];
            let (ymin, xmin) = (b[0].clamp(0.0, 1.0) * h, b[1].clamp(0.0, 1.0) * w);
            let (ymax, xmax) = (b[2].clamp(0.0, 1.0) * h, b[3].clamp(0.0, 1.0) * w);
            let class = outputs.classes[i].max(0.0).round() as usize;
            Detection {
                bbox: [xmin, ymin, (xmax - xmin).max(0.0), (ymax - ymin).max(0.0)],
                label: label_for(labels, class),
                score: outputs.scores[i],
            }
        })
        .collect();
    non_max_suppression(detections, iou_threshold, max_detections)
}
