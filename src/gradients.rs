//! Gradient Utilities
//!
//! Backpropagation through time multiplies by `Wᵀ` and the tanh derivative
//! once per timestep. Over a long window that product can grow without
//! bound, and a single exploding update is enough to wreck a model:
//!
//! ```text
//! Step 1000: Loss = 1.92
//! Step 1001: Loss = 48.3   (gradient explosion!)
//! Step 1002: Loss = NaN    (training failed)
//! ```
//!
//! Two defenses live here:
//!
//! - **Element-wise clipping**: every accumulator entry is clamped into
//!   `[-limit, +limit]`
//! - **Finiteness check**: a NaN or infinite entry aborts the iteration
//!   before any parameter is touched
//!
//! The global L2 norm is also exposed for monitoring.

use crate::error::{Result, RnnError};
use crate::model::RnnGradients;

/// Clamp every gradient entry into `[-limit, limit]`
///
/// Unlike norm-based clipping this does not preserve the gradient
/// direction, but it bounds each individual update.
///
/// # Example
///
/// ```rust
/// # use char_rnn::{RnnParams, RnnGradients};
/// # use char_rnn::gradients::clip_gradients;
/// let params = RnnParams::initialize_seeded(3, 2, 0).unwrap();
/// let mut grads = RnnGradients::zeros_like(&params);
/// grads.c.data[0] = 12.0;
/// clip_gradients(&mut grads, 5.0);
/// assert_eq!(grads.c.data[0], 5.0);
/// ```
pub fn clip_gradients(grads: &mut RnnGradients, limit: f64) {
    for (_, grad) in grads.tensors_mut() {
        grad.clamp_assign(-limit, limit);
    }
}

/// Fail with [`RnnError::NonFiniteGradient`] naming the first corrupt tensor
pub fn ensure_finite(grads: &RnnGradients) -> Result<()> {
    match grads.tensors().into_iter().find(|(_, g)| !g.all_finite()) {
        Some((param, _)) => Err(RnnError::NonFiniteGradient { param }),
        None => Ok(()),
    }
}

/// L2 norm of all gradients taken together: `√(Σ g²)`
pub fn compute_grad_norm(grads: &RnnGradients) -> f64 {
    grads
        .tensors()
        .iter()
        .map(|(_, g)| g.sum_of_squares())
        .sum::<f64>()
        .sqrt()
}
