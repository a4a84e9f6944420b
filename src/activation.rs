//! Activation Functions
//!
//! The vanilla RNN uses two nonlinearities:
//!
//! - **tanh** on the hidden pre-activation, squashing the recurrent state
//!   into `(-1, 1)`
//! - **softmax** on the output logits, turning them into a probability
//!   distribution over the vocabulary
//!
//! ## Softmax
//!
//! ```text
//! softmax(z)[i] = exp(z[i] - max(z)) / Σ_j exp(z[j] - max(z))
//! ```
//!
//! Subtracting the maximum keeps `exp` from overflowing and does not change
//! the result, since the common factor `exp(-max(z))` cancels. Each logit
//! vector is normalized on its own: one timestep's max and sum never leak
//! into another's.
//!
//! ## tanh derivative
//!
//! The derivative is expressed through the activation itself, which the
//! forward trace already stores:
//!
//! ```text
//! d/dx tanh(x) = 1 - tanh(x)²
//! ```

use crate::tensor::Tensor;

/// Numerically stable softmax of a single logit vector
///
/// Entries that underflow `exp` are floored at `f64::MIN_POSITIVE`, so every
/// probability stays strictly positive even for widely spread logits.
///
/// # Example
///
/// ```rust
/// # use char_rnn::{softmax, Tensor};
/// let p = softmax(&Tensor::from_vec(vec![1.0, 2.0, 3.0]));
/// assert!((p.sum() - 1.0).abs() < 1e-12);
/// ```
pub fn softmax(logits: &Tensor) -> Tensor {
    let max = logits.max();
    let exp_values = logits.map(|z| (z - max).exp());
    let sum = exp_values.sum();
    // Comparison instead of f64::max so a NaN still propagates
    exp_values.map(|e| {
        let p = e / sum;
        if p < f64::MIN_POSITIVE {
            f64::MIN_POSITIVE
        } else {
            p
        }
    })
}

/// tanh applied element-wise
pub fn tanh_forward(x: &Tensor) -> Tensor {
    x.map(f64::tanh)
}

/// Gradient through tanh
///
/// # Arguments
///
/// * `grad_out` - Gradient with respect to the activation `h`
/// * `h` - The activation `tanh(x)` saved by the forward pass
///
/// # Returns
///
/// `grad_out * (1 - h²)`, the gradient with respect to the pre-activation
pub fn tanh_backward(grad_out: &Tensor, h: &Tensor) -> Tensor {
    grad_out.mul(&h.map(|v| 1.0 - v * v))
}
