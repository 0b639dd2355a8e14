//! Model capability traits
//!
//! Training and prediction are separate capabilities: a [`Trainable`] value
//! holds hyperparameters only, and fitting it yields an immutable
//! [`Predictable`] model. A model therefore cannot be used before it is fitted.

use crate::error::Result;
use ndarray::{Array1, Array2};

/// Something that can learn a regression model from `(x, y)`
pub trait Trainable {
    /// Fitted model produced by [`Trainable::fit`]
    type Model: Predictable;

    /// Fit on feature matrix `x` (one row per example) and targets `y`
    fn fit(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<Self::Model>;
}

/// A fitted model that maps feature rows to predictions
pub trait Predictable {
    /// Predict one value per row of `x`
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Number of feature columns the model expects
    fn n_features(&self) -> usize;
}
