//! RNN Model Configuration and Parameters
//!
//! A vanilla recurrent network with one hidden layer:
//!
//! ```text
//! h[t] = tanh(U·x[t] + W·h[t-1] + b)
//! p[t] = softmax(V·h[t] + c)
//! ```
//!
//! where `x[t]` is the one-hot encoding of the input token at step `t`.
//!
//! ## Parameter Shapes
//!
//! | Tensor | Shape                       | Role                          |
//! |--------|-----------------------------|-------------------------------|
//! | `U`    | `[hidden_size, input_size]` | input → hidden                |
//! | `W`    | `[hidden_size, hidden_size]`| hidden → hidden (recurrence)  |
//! | `V`    | `[input_size, hidden_size]` | hidden → output logits        |
//! | `b`    | `[hidden_size]`             | hidden bias                   |
//! | `c`    | `[input_size]`              | output bias                   |
//!
//! Shapes are fixed at construction. The same `U`, `W`, `V` are reused at
//! every timestep, which is why their gradients are *sums* over the window.
//!
//! ## Initialization
//!
//! Weights are drawn from `U(-1/√fan_in, +1/√fan_in)`; `fan_in` is
//! `input_size` for `U` and `hidden_size` for `W` and `V`. Biases start at
//! zero.

use crate::error::{Result, RnnError};
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Model configuration
///
/// # Fields
///
/// - `hidden_size`: Size of the recurrent memory
/// - `input_size`: Vocabulary size (number of distinct tokens)
/// - `seq_length`: Window length the data source is expected to produce
/// - `learning_rate`: Gradient descent step size
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RnnConfig {
    pub hidden_size: usize,
    pub input_size: usize,
    pub seq_length: usize,
    pub learning_rate: f64,
}

impl RnnConfig {
    /// Create and validate a configuration
    pub fn new(
        hidden_size: usize,
        input_size: usize,
        seq_length: usize,
        learning_rate: f64,
    ) -> Result<Self> {
        let config = Self {
            hidden_size,
            input_size,
            seq_length,
            learning_rate,
        };
        config.validate()?;
        Ok(config)
    }

    /// Small preset for quick experiments on a given vocabulary
    pub fn tiny(input_size: usize) -> Self {
        Self {
            hidden_size: 32,
            input_size,
            seq_length: 16,
            learning_rate: 0.1,
        }
    }

    /// Reject non-positive sizes and learning rates
    pub fn validate(&self) -> Result<()> {
        if self.hidden_size == 0 {
            return Err(RnnError::InvalidConfig("hidden_size must be positive".into()));
        }
        if self.input_size == 0 {
            return Err(RnnError::InvalidConfig("input_size must be positive".into()));
        }
        if self.seq_length == 0 {
            return Err(RnnError::InvalidConfig("seq_length must be positive".into()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(RnnError::InvalidConfig(format!(
                "learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

/// The five trainable tensors of the network
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RnnParams {
    pub u: Tensor,
    pub w: Tensor,
    pub v: Tensor,
    pub b: Tensor,
    pub c: Tensor,
}

impl RnnParams {
    /// Allocate and randomly initialize all parameters from thread-local
    /// entropy
    ///
    /// # Errors
    ///
    /// [`RnnError::InvalidConfig`] if either size is zero.
    pub fn initialize(hidden_size: usize, input_size: usize) -> Result<Self> {
        Self::initialize_with_rng(hidden_size, input_size, &mut rand::rng())
    }

    /// Reproducible initialization from a fixed seed
    pub fn initialize_seeded(hidden_size: usize, input_size: usize, seed: u64) -> Result<Self> {
        Self::initialize_with_rng(hidden_size, input_size, &mut StdRng::seed_from_u64(seed))
    }

    pub fn initialize_with_rng<R>(
        hidden_size: usize,
        input_size: usize,
        rng: &mut R,
    ) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        if hidden_size == 0 || input_size == 0 {
            return Err(RnnError::InvalidConfig(format!(
                "sizes must be positive, got hidden_size={} input_size={}",
                hidden_size, input_size
            )));
        }

        let input_scale = (1.0 / input_size as f64).sqrt();
        let hidden_scale = (1.0 / hidden_size as f64).sqrt();

        Ok(Self {
            u: Tensor::random_uniform(vec![hidden_size, input_size], input_scale, rng)?,
            w: Tensor::random_uniform(vec![hidden_size, hidden_size], hidden_scale, rng)?,
            v: Tensor::random_uniform(vec![input_size, hidden_size], hidden_scale, rng)?,
            b: Tensor::zeros(vec![hidden_size]),
            c: Tensor::zeros(vec![input_size]),
        })
    }

    pub fn hidden_size(&self) -> usize {
        self.b.len()
    }

    pub fn input_size(&self) -> usize {
        self.c.len()
    }

    /// Plain gradient descent: `param -= learning_rate * grad` for all five
    /// tensors
    pub fn apply_gradients(&mut self, grads: &RnnGradients, learning_rate: f64) {
        for ((_, param), (_, grad)) in self.tensors_mut().into_iter().zip(grads.tensors()) {
            param.scaled_add_assign(-learning_rate, grad);
        }
    }

    /// Named views of the parameters, in `U, W, V, b, c` order
    pub fn tensors(&self) -> [(&'static str, &Tensor); 5] {
        [
            ("U", &self.u),
            ("W", &self.w),
            ("V", &self.v),
            ("b", &self.b),
            ("c", &self.c),
        ]
    }

    pub fn tensors_mut(&mut self) -> [(&'static str, &mut Tensor); 5] {
        [
            ("U", &mut self.u),
            ("W", &mut self.w),
            ("V", &mut self.v),
            ("b", &mut self.b),
            ("c", &mut self.c),
        ]
    }

    /// Check every tensor against the shapes implied by `config`
    pub fn ensure_shapes(&self, config: &RnnConfig) -> Result<()> {
        let (h, i) = (config.hidden_size, config.input_size);
        self.u.ensure_shape("U", &[h, i])?;
        self.w.ensure_shape("W", &[h, h])?;
        self.v.ensure_shape("V", &[i, h])?;
        self.b.ensure_shape("b", &[h])?;
        self.c.ensure_shape("c", &[i])
    }
}

/// Gradient accumulators, one per parameter and with the same shape
#[derive(Clone, Debug, PartialEq)]
pub struct RnnGradients {
    pub u: Tensor,
    pub w: Tensor,
    pub v: Tensor,
    pub b: Tensor,
    pub c: Tensor,
}

impl RnnGradients {
    /// Zeroed accumulators shaped like `params`
    pub fn zeros_like(params: &RnnParams) -> Self {
        Self {
            u: Tensor::zeros(params.u.shape.clone()),
            w: Tensor::zeros(params.w.shape.clone()),
            v: Tensor::zeros(params.v.shape.clone()),
            b: Tensor::zeros(params.b.shape.clone()),
            c: Tensor::zeros(params.c.shape.clone()),
        }
    }

    /// Named views of the gradients, in `U, W, V, b, c` order
    pub fn tensors(&self) -> [(&'static str, &Tensor); 5] {
        [
            ("U", &self.u),
            ("W", &self.w),
            ("V", &self.v),
            ("b", &self.b),
            ("c", &self.c),
        ]
    }

    pub fn tensors_mut(&mut self) -> [(&'static str, &mut Tensor); 5] {
        [
            ("U", &mut self.u),
            ("W", &mut self.w),
            ("V", &mut self.v),
            ("b", &mut self.b),
            ("c", &mut self.c),
        ]
    }
}
