//! Neural Network (Multi-Layer Perceptron) regressor
//!
//! A feedforward network with a linear output unit, trained by mini-batch
//! gradient descent with momentum and L2 weight decay. Early stopping watches
//! the chronological tail of the training rows, never a shuffled sample.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::{ForecastError, Result};
use crate::training::models::{Predictable, Trainable};

/// Activation function for hidden layers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Rectified Linear Unit
    #[default]
    ReLU,
    /// Logistic sigmoid
    Sigmoid,
    /// Hyperbolic tangent
    Tanh,
    /// Identity
    Linear,
}

impl Activation {
    fn apply(&self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::ReLU => z.mapv(|v| v.max(0.0)),
            Activation::Sigmoid => z.mapv(sigmoid),
            Activation::Tanh => z.mapv(f64::tanh),
            Activation::Linear => z.clone(),
        }
    }

    fn derivative(&self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::ReLU => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Sigmoid => z.mapv(|v| {
                let s = sigmoid(v);
                s * (1.0 - s)
            }),
            Activation::Tanh => z.mapv(|v| 1.0 - v.tanh().powi(2)),
            Activation::Linear => Array2::ones(z.raw_dim()),
        }
    }
}

impl std::str::FromStr for Activation {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "relu" => Ok(Activation::ReLU),
            "sigmoid" | "logistic" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            "linear" | "identity" => Ok(Activation::Linear),
            other => Err(ForecastError::invalid_parameter(
                "activation",
                other,
                "expected relu, sigmoid, tanh or linear",
            )),
        }
    }
}

#[inline]
fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

/// MLP hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlpConfig {
    /// Hidden layer sizes, input side first
    pub hidden_layers: Vec<usize>,
    /// Activation function for hidden layers
    pub activation: Activation,
    /// Learning rate
    pub learning_rate: f64,
    /// Number of epochs
    pub max_epochs: usize,
    /// Batch size
    pub batch_size: usize,
    /// L2 regularization
    pub alpha: f64,
    /// Momentum
    pub momentum: f64,
    /// Epochs without validation improvement before stopping
    pub early_stopping_patience: usize,
    /// Fraction of the most recent training rows held back for early stopping
    pub validation_split: f64,
    /// Random seed; `None` seeds from entropy
    pub random_state: Option<u64>,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![10, 5],
            activation: Activation::Tanh,
            learning_rate: 0.01,
            max_epochs: 300,
            batch_size: 16,
            alpha: 0.0001,
            momentum: 0.9,
            early_stopping_patience: 20,
            validation_split: 0.1,
            random_state: Some(42),
        }
    }
}

impl MlpConfig {
    pub fn with_hidden_layers(mut self, layers: Vec<usize>) -> Self {
        self.hidden_layers = layers;
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_max_epochs(mut self, epochs: usize) -> Self {
        self.max_epochs = epochs;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Check hyperparameters before training
    pub fn validate(&self) -> Result<()> {
        if self.hidden_layers.is_empty() || self.hidden_layers.contains(&0) {
            return Err(ForecastError::invalid_parameter(
                "hidden_layers",
                format!("{:?}", self.hidden_layers),
                "need at least one hidden layer, each with at least one unit",
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ForecastError::invalid_parameter(
                "learning_rate",
                self.learning_rate,
                "must be positive",
            ));
        }
        if self.batch_size == 0 {
            return Err(ForecastError::invalid_parameter("batch_size", 0, "must be positive"));
        }
        if self.alpha < 0.0 {
            return Err(ForecastError::invalid_parameter("alpha", self.alpha, "must be non-negative"));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(ForecastError::invalid_parameter("momentum", self.momentum, "must be in [0, 1)"));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(ForecastError::invalid_parameter(
                "validation_split",
                self.validation_split,
                "must be in [0, 1)",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Layer {
    weights: Array2<f64>,
    bias: Array1<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Network {
    layers: Vec<Layer>,
    activation: Activation,
}

impl Network {
    /// Xavier/Glorot uniform initialization
    fn init(sizes: &[usize], activation: Activation, rng: &mut Xoshiro256PlusPlus) -> Self {
        let layers = sizes
            .windows(2)
            .map(|pair| {
                let (n_in, n_out) = (pair[0], pair[1]);
                let scale = (2.0 / (n_in + n_out) as f64).sqrt();
                Layer {
                    weights: Array2::from_shape_fn((n_in, n_out), |_| rng.gen::<f64>() * 2.0 * scale - scale),
                    bias: Array1::zeros(n_out),
                }
            })
            .collect();
        Self { layers, activation }
    }

    /// Pre-activations and activations of every layer; `activations[0]` is the input
    fn forward(&self, x: &Array2<f64>) -> (Vec<Array2<f64>>, Vec<Array2<f64>>) {
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        let mut z_values = Vec::with_capacity(self.layers.len());
        let mut a = x.to_owned();

        for (i, layer) in self.layers.iter().enumerate() {
            let z = a.dot(&layer.weights) + &layer.bias;
            let next = if i + 1 < self.layers.len() {
                self.activation.apply(&z)
            } else {
                // Linear output for regression
                z.clone()
            };
            activations.push(a);
            z_values.push(z);
            a = next;
        }
        activations.push(a);

        (activations, z_values)
    }

    fn output(&self, x: &Array2<f64>) -> Array1<f64> {
        let mut a = x.to_owned();
        for (i, layer) in self.layers.iter().enumerate() {
            let z = a.dot(&layer.weights) + &layer.bias;
            a = if i + 1 < self.layers.len() { self.activation.apply(&z) } else { z };
        }
        a.column(0).to_owned()
    }

    /// MSE gradients per layer, input side first
    fn backward(
        &self,
        y: &Array1<f64>,
        activations: &[Array2<f64>],
        z_values: &[Array2<f64>],
    ) -> Vec<(Array2<f64>, Array1<f64>)> {
        let n = y.len() as f64;
        let n_layers = self.layers.len();
        let mut gradients = Vec::with_capacity(n_layers);

        let y_2d = y.view().insert_axis(Axis(1));
        let mut delta = (&activations[n_layers] - &y_2d) / n;

        for i in (0..n_layers).rev() {
            let grad_w = activations[i].t().dot(&delta);
            let grad_b = delta.sum_axis(Axis(0));
            gradients.push((grad_w, grad_b));

            if i > 0 {
                delta = delta.dot(&self.layers[i].weights.t()) * self.activation.derivative(&z_values[i - 1]);
            }
        }

        gradients.reverse();
        gradients
    }
}

/// Trains an MLP regressor; holds hyperparameters only
#[derive(Debug, Clone, Default)]
pub struct MlpTrainer {
    config: MlpConfig,
}

impl MlpTrainer {
    pub fn new(config: MlpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MlpConfig {
        &self.config
    }
}

impl Trainable for MlpTrainer {
    type Model = FittedMlp;

    fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<FittedMlp> {
        self.config.validate()?;
        let cfg = &self.config;
        let n_samples = x.nrows();

        if n_samples != y.len() {
            return Err(ForecastError::ShapeError {
                expected: format!("{} targets", n_samples),
                actual: format!("{} targets", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(ForecastError::TrainingError("no training rows".to_string()));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(ForecastError::TrainingError("non-finite value in training data".to_string()));
        }

        let start = Instant::now();
        let mut rng = match cfg.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let mut sizes = vec![x.ncols()];
        sizes.extend(&cfg.hidden_layers);
        sizes.push(1);
        let mut network = Network::init(&sizes, cfg.activation, &mut rng);

        // Hold back the most recent rows for early stopping
        let mut val_size = (n_samples as f64 * cfg.validation_split) as usize;
        if val_size >= n_samples {
            val_size = 0;
        }
        let train_size = n_samples - val_size;

        let x_train = x.slice(ndarray::s![..train_size, ..]);
        let y_train = y.slice(ndarray::s![..train_size]);
        let x_val = x.slice(ndarray::s![train_size.., ..]).to_owned();
        let y_val = y.slice(ndarray::s![train_size..]).to_owned();

        let mut velocities_w: Vec<Array2<f64>> =
            network.layers.iter().map(|l| Array2::zeros(l.weights.raw_dim())).collect();
        let mut velocities_b: Vec<Array1<f64>> =
            network.layers.iter().map(|l| Array1::zeros(l.bias.len())).collect();

        let mut best_val_loss = f64::INFINITY;
        let mut best_network = network.clone();
        let mut patience_counter = 0;
        let mut epochs = 0;
        let mut indices: Vec<usize> = (0..train_size).collect();

        for _epoch in 0..cfg.max_epochs {
            epochs += 1;
            indices.shuffle(&mut rng);

            for batch in indices.chunks(cfg.batch_size) {
                let x_batch = x_train.select(Axis(0), batch);
                let y_batch = y_train.select(Axis(0), batch);

                let (activations, z_values) = network.forward(&x_batch);
                let gradients = network.backward(&y_batch, &activations, &z_values);

                for (i, (grad_w, grad_b)) in gradients.into_iter().enumerate() {
                    velocities_w[i] = &velocities_w[i] * cfg.momentum - &grad_w * cfg.learning_rate;
                    velocities_b[i] = &velocities_b[i] * cfg.momentum - &grad_b * cfg.learning_rate;

                    let layer = &mut network.layers[i];
                    layer.weights += &velocities_w[i];
                    layer.bias += &velocities_b[i];

                    // L2 weight decay
                    layer.weights *= 1.0 - cfg.alpha * cfg.learning_rate;
                }
            }

            if val_size > 0 {
                let val_loss = mse(&y_val, &network.output(&x_val));
                if val_loss < best_val_loss {
                    best_val_loss = val_loss;
                    best_network = network.clone();
                    patience_counter = 0;
                } else {
                    patience_counter += 1;
                    if patience_counter >= cfg.early_stopping_patience {
                        break;
                    }
                }
            }
        }

        if val_size > 0 {
            network = best_network;
        }

        let train_loss = mse(&y_train.to_owned(), &network.output(&x_train.to_owned()));
        if !train_loss.is_finite() {
            return Err(ForecastError::TrainingError(format!(
                "training diverged after {} epochs; try a smaller learning rate",
                epochs
            )));
        }

        debug!(
            epochs,
            train_rows = train_size,
            validation_rows = val_size,
            train_loss,
            elapsed = ?start.elapsed(),
            "Trained MLP"
        );

        Ok(FittedMlp {
            network,
            n_features: x.ncols(),
            epochs_trained: epochs,
            train_loss,
        })
    }
}

/// Fitted MLP regressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedMlp {
    network: Network,
    n_features: usize,
    epochs_trained: usize,
    train_loss: f64,
}

impl FittedMlp {
    /// Epochs run before stopping
    pub fn epochs_trained(&self) -> usize {
        self.epochs_trained
    }

    /// Mean squared error on the rows used for gradient updates
    pub fn train_loss(&self) -> f64 {
        self.train_loss
    }
}

impl Predictable for FittedMlp {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.n_features {
            return Err(ForecastError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(self.network.output(x))
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

fn mse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / y_true.len() as f64
}
