//! Trainable fully-connected network on ndarray: build, train with mini-batch
//! gradient descent (SGD, momentum or Adam), predict.
use ndarray::{Array1, Array2, Axis, Zip};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::batch::{Batch, TrainingBatch};
use crate::core::decode::argmax;
use crate::core::params::{LayerSpec, TrainConfig};
use crate::error::{Error, Result};
use crate::types::{Activation, LossFn, Metric, Optimizer};

const BCE_EPSILON: f32 = 1e-7;

#[derive(Debug, Clone)]
struct DenseLayer {
    /// Shape (inputs, units)
    weights: Array2<f32>,
    bias: Array1<f32>,
    activation: Activation,
}

fn activate(z: &mut Array2<f32>, activation: Activation) {
    match activation {
        Activation::Linear => {}
        Activation::Relu => z.mapv_inplace(|v| v.max(0.0)),
        Activation::Sigmoid => z.mapv_inplace(|v| 1.0 / (1.0 + (-v).exp())),
        Activation::Tanh => z.mapv_inplace(f32::tanh),
    }
}

/// Derivative expressed through the activation output `a`
fn activation_grad(a: &Array2<f32>, activation: Activation) -> Array2<f32> {
    match activation {
        Activation::Linear => Array2::ones(a.dim()),
        Activation::Relu => a.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
        Activation::Sigmoid => a.mapv(|v| v * (1.0 - v)),
        Activation::Tanh => a.mapv(|v| 1.0 - v * v),
    }
}

fn loss_value(loss: LossFn, output: &Array2<f32>, target: &Array2<f32>) -> f32 {
    let n = output.len().max(1) as f32;
    match loss {
        LossFn::MeanSquaredError => {
            Zip::from(output)
                .and(target)
                .fold(0.0, |acc, &a, &y| acc + (a - y) * (a - y))
                / n
        }
        LossFn::BinaryCrossEntropy => {
            -Zip::from(output).and(target).fold(0.0, |acc, &a, &y| {
                let a = a.clamp(BCE_EPSILON, 1.0 - BCE_EPSILON);
                acc + y * a.ln() + (1.0 - y) * (1.0 - a).ln()
            }) / n
        }
    }
}

/// dLoss/dOutput
fn loss_grad(loss: LossFn, output: &Array2<f32>, target: &Array2<f32>) -> Array2<f32> {
    let n = output.len().max(1) as f32;
    let mut grad = Array2::zeros(output.dim());
    match loss {
        LossFn::MeanSquaredError => {
            Zip::from(&mut grad)
                .and(output)
                .and(target)
                .for_each(|g, &a, &y| *g = 2.0 * (a - y) / n);
        }
        LossFn::BinaryCrossEntropy => {
            Zip::from(&mut grad)
                .and(output)
                .and(target)
                .for_each(|g, &a, &y| {
                    let a = a.clamp(BCE_EPSILON, 1.0 - BCE_EPSILON);
                    *g = (a - y) / (a * (1.0 - a)) / n;
                });
        }
    }
    grad
}

fn metric_value(metric: Metric, output: &Array2<f32>, target: &Array2<f32>) -> f32 {
    let rows = output.nrows().max(1) as f32;
    match metric {
        Metric::MeanAbsoluteError => {
            Zip::from(output)
                .and(target)
                .fold(0.0, |acc, &a, &y| acc + (a - y).abs())
                / output.len().max(1) as f32
        }
        Metric::Accuracy => {
            let correct = output
                .rows()
                .into_iter()
                .zip(target.rows())
                .filter(|(a, y)| {
                    if a.len() == 1 {
                        (a[0] >= 0.5) == (y[0] >= 0.5)
                    } else {
                        argmax(&a.to_vec()).0 == argmax(&y.to_vec()).0
                    }
                })
                .count();
            correct as f32 / rows
        }
    }
}

/// Per-layer optimizer state
#[derive(Debug, Clone)]
struct Moments {
    w1: Array2<f32>,
    b1: Array1<f32>,
    w2: Array2<f32>,
    b2: Array1<f32>,
}

impl Moments {
    fn zeros(layer: &DenseLayer) -> Self {
        Self {
            w1: Array2::zeros(layer.weights.dim()),
            b1: Array1::zeros(layer.bias.len()),
            w2: Array2::zeros(layer.weights.dim()),
            b2: Array1::zeros(layer.bias.len()),
        }
    }
}

fn apply_update(
    layer: &mut DenseLayer,
    state: &mut Moments,
    optimizer: Optimizer,
    step: i32,
    grad_w: &Array2<f32>,
    grad_b: &Array1<f32>,
) {
    match optimizer {
        Optimizer::Sgd { learning_rate } => {
            layer.weights.scaled_add(-learning_rate, grad_w);
            layer.bias.scaled_add(-learning_rate, grad_b);
        }
        Optimizer::Momentum {
            learning_rate,
            momentum,
        } => {
            state.w1 = &state.w1 * momentum - grad_w * learning_rate;
            state.b1 = &state.b1 * momentum - grad_b * learning_rate;
            layer.weights += &state.w1;
            layer.bias += &state.b1;
        }
        Optimizer::Adam {
            learning_rate,
            beta1,
            beta2,
            epsilon,
        } => {
            state.w1 = &state.w1 * beta1 + grad_w * (1.0 - beta1);
            state.b1 = &state.b1 * beta1 + grad_b * (1.0 - beta1);
            state.w2 = &state.w2 * beta2 + &grad_w.mapv(|g| g * g) * (1.0 - beta2);
            state.b2 = &state.b2 * beta2 + &grad_b.mapv(|g| g * g) * (1.0 - beta2);
            let c1 = 1.0 - beta1.powi(step);
            let c2 = 1.0 - beta2.powi(step);
            Zip::from(&mut layer.weights)
                .and(&state.w1)
                .and(&state.w2)
                .for_each(|w, &m, &v| *w -= learning_rate * (m / c1) / ((v / c2).sqrt() + epsilon));
            Zip::from(&mut layer.bias)
                .and(&state.b1)
                .and(&state.b2)
                .for_each(|b, &m, &v| *b -= learning_rate * (m / c1) / ((v / c2).sqrt() + epsilon));
        }
    }
}

/// Loss and metrics after one epoch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpochStats {
    pub epoch: usize,
    pub loss: f32,
    pub metrics: Vec<(Metric, f32)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingReport {
    pub history: Vec<EpochStats>,
}

impl TrainingReport {
    pub fn final_loss(&self) -> Option<f32> {
        self.history.last().map(|s| s.loss)
    }

    pub fn final_metric(&self, metric: Metric) -> Option<f32> {
        self.history.last().and_then(|s| {
            s.metrics
                .iter()
                .find(|(m, _)| *m == metric)
                .map(|(_, v)| *v)
        })
    }
}

/// Sequential dense network
#[derive(Debug, Clone)]
pub struct DenseNetwork {
    input_len: usize,
    layers: Vec<DenseLayer>,
}

impl DenseNetwork {
    /// Build a network with Xavier-uniform weights and zero biases
    pub fn build(input_len: usize, specs: &[LayerSpec], seed: u64) -> Result<Self> {
        if input_len == 0 {
            return Err(Error::InvalidArgument {
                arg: "input_len",
                value: "0".into(),
            });
        }
        if specs.is_empty() || specs.iter().any(|s| s.units == 0) {
            return Err(Error::InvalidArgument {
                arg: "layers",
                value: format!("{:?}", specs),
            });
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let mut layers = Vec::with_capacity(specs.len());
        let mut fan_in = input_len;
        for spec in specs {
            let limit = (6.0 / (fan_in + spec.units) as f32).sqrt();
            let weights =
                Array2::from_shape_fn((fan_in, spec.units), |_| rng.random_range(-limit..limit));
            layers.push(DenseLayer {
                weights,
                bias: Array1::zeros(spec.units),
                activation: spec.activation,
            });
            fan_in = spec.units;
        }
        debug!(
            "Built dense network: input={} layers={:?}",
            input_len,
            specs.iter().map(|s| (s.units, s.activation)).collect::<Vec<_>>()
        );
        Ok(Self { input_len, layers })
    }

    pub fn input_len(&self) -> usize {
        self.input_len
    }

    pub fn output_len(&self) -> usize {
        self.layers.last().map_or(0, |l| l.bias.len())
    }

    /// Activations of every layer, input first
    fn forward(&self, x: &Array2<f32>) -> Vec<Array2<f32>> {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(x.clone());
        for layer in &self.layers {
            let prev = activations.last().map_or(x, |a| a);
            let mut z = prev.dot(&layer.weights) + &layer.bias;
            activate(&mut z, layer.activation);
            activations.push(z);
        }
        activations
    }

    fn check_width(&self, batch: &Batch) -> Result<()> {
        if batch.width() != self.input_len {
            return Err(Error::ShapeMismatch {
                row: 0,
                expected: self.input_len,
                found: batch.width(),
            });
        }
        Ok(())
    }

    /// Targets shaped like the output layer: labels as-is for a single unit,
    /// one-hot class indices otherwise
    fn targets(&self, data: &TrainingBatch) -> Result<Array2<f32>> {
        let units = self.output_len();
        if units == 1 {
            return Ok(data.labels.clone());
        }
        let mut one_hot = Array2::zeros((data.labels.nrows(), units));
        for (row, &label) in data.labels.column(0).iter().enumerate() {
            let class = label.round();
            if class < 0.0 || class as usize >= units || (label - class).abs() > 1e-6 {
                return Err(Error::MalformedRecord {
                    index: data.batch.indices.get(row).copied().unwrap_or(row as u64),
                    reason: format!("label {} is not a class index below {}", label, units),
                });
            }
            one_hot[[row, class as usize]] = 1.0;
        }
        Ok(one_hot)
    }

    pub fn train(&mut self, data: &TrainingBatch, config: &TrainConfig) -> Result<TrainingReport> {
        config.validate()?;
        self.check_width(&data.batch)?;
        let n = data.batch.len();
        if n == 0 {
            return Err(Error::InvalidArgument {
                arg: "training_batch",
                value: "empty".into(),
            });
        }
        let x = &data.batch.features;
        let targets = self.targets(data)?;
        let batch_size = config.batch_size.unwrap_or(n).min(n);
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut order: Vec<usize> = (0..n).collect();
        let mut states: Vec<Moments> = self.layers.iter().map(Moments::zeros).collect();
        let mut step = 0i32;
        let mut report = TrainingReport::default();

        info!(
            "Training on {} sample(s): epochs={} batch_size={} loss={} optimizer={:?}",
            n, config.epochs, batch_size, config.loss, config.optimizer
        );

        for epoch in 1..=config.epochs {
            if config.shuffle {
                order.shuffle(&mut rng);
            }
            let mut epoch_loss = 0.0f32;
            for chunk in order.chunks(batch_size) {
                let xb = x.select(Axis(0), chunk);
                let yb = targets.select(Axis(0), chunk);
                let activations = self.forward(&xb);
                let output = &activations[activations.len() - 1];
                epoch_loss += loss_value(config.loss, output, &yb) * chunk.len() as f32;

                step += 1;
                let mut delta = loss_grad(config.loss, output, &yb);
                for l in (0..self.layers.len()).rev() {
                    let dz = delta * activation_grad(&activations[l + 1], self.layers[l].activation);
                    let grad_w = activations[l].t().dot(&dz);
                    let grad_b = dz.sum_axis(Axis(0));
                    delta = dz.dot(&self.layers[l].weights.t());
                    apply_update(
                        &mut self.layers[l],
                        &mut states[l],
                        config.optimizer,
                        step,
                        &grad_w,
                        &grad_b,
                    );
                }
            }
            let loss = epoch_loss / n as f32;
            if !loss.is_finite() {
                warn!("Loss became non-finite at epoch {}: {}", epoch, loss);
                return Err(Error::TrainingDiverged { epoch, loss });
            }

            let metrics = if config.metrics.is_empty() {
                Vec::new()
            } else {
                let full = self.forward(x);
                let output = &full[full.len() - 1];
                config
                    .metrics
                    .iter()
                    .map(|&m| (m, metric_value(m, output, &targets)))
                    .collect()
            };
            debug!("epoch {}/{} loss={:.6} {:?}", epoch, config.epochs, loss, metrics);
            report.history.push(EpochStats {
                epoch,
                loss,
                metrics,
            });
        }

        if let Some(last) = report.history.last() {
            info!(
                "Training finished: loss={:.6} metrics={:?}",
                last.loss, last.metrics
            );
        }
        Ok(report)
    }

    /// Raw outputs of shape `[batch.len(), output_len()]`
    pub fn predict(&self, batch: &Batch) -> Result<Array2<f32>> {
        self.check_width(batch)?;
        let mut activations = self.forward(&batch.features);
        activations
            .pop()
            .ok_or_else(|| Error::Processing("network has no layers".into()))
    }
}
