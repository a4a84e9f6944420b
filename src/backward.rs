//! Backpropagation Through Time
//!
//! Computes the gradient of the window's total cross-entropy loss with
//! respect to all five parameters by walking the forward trace in reverse.
//!
//! ## Loss
//!
//! ```text
//! loss = -Σ_t log p[t][targets[t]]
//! ```
//!
//! Probabilities are clamped to [`PROB_EPSILON`] before the logarithm, so
//! a confidently wrong prediction yields a large but finite loss.
//!
//! ## Per-Timestep Gradients
//!
//! Softmax and cross-entropy combine into the simple output gradient
//! `dy = p - one_hot(target)`. From there, for `t = T-1 .. 0`:
//!
//! ```text
//! dV      += dy ⊗ h[t]
//! dc      += dy
//! dh       = Vᵀ·dy + dh_next          (dh_next = 0 at t = T-1)
//! dh_raw   = dh * (1 - h[t]²)
//! db      += dh_raw
//! dU      += dh_raw ⊗ x[t]
//! dW      += dh_raw ⊗ h[t-1]
//! dh_next  = Wᵀ·dh_raw
//! ```
//!
//! The recurrent term `dh_next` is what makes this "through time": the
//! gradient at step `t` includes every later step's dependence on `h[t]`.
//! Nothing flows in from the following window (truncated BPTT).
//!
//! After the sweep every accumulator is checked for NaN/inf and then
//! clipped element-wise.

use crate::activation::tanh_backward;
use crate::error::{Result, RnnError};
use crate::forward::ForwardTrace;
use crate::gradients::{clip_gradients, ensure_finite};
use crate::model::{RnnGradients, RnnParams};
use crate::tensor::Tensor;

/// Smallest probability fed to `ln` when computing the loss
pub const PROB_EPSILON: f64 = 1e-12;

/// Default element-wise gradient clip
pub const DEFAULT_GRAD_CLIP: f64 = 5.0;

/// Result of one backward pass
#[derive(Clone, Debug)]
pub struct BackwardOutput {
    /// Clipped gradients, summed over all timesteps
    pub grads: RnnGradients,
    /// Gradient with respect to the hidden state that entered the window.
    /// Truncated BPTT does not use it; it is kept for diagnostics.
    pub dh_seed: Tensor,
    /// Total cross-entropy over the window
    pub loss: f64,
}

fn check_targets(trace: &ForwardTrace, targets: &[usize]) -> Result<()> {
    if targets.len() != trace.len() {
        return Err(RnnError::LengthMismatch {
            inputs: trace.len(),
            targets: targets.len(),
        });
    }
    Ok(())
}

fn target_probability(p: &Tensor, target: usize) -> Result<f64> {
    p.data
        .get(target)
        .copied()
        .ok_or(RnnError::IndexOutOfRange {
            index: target,
            size: p.len(),
        })
}

/// Total cross-entropy of a forward trace against `targets`
pub fn cross_entropy(trace: &ForwardTrace, targets: &[usize]) -> Result<f64> {
    check_targets(trace, targets)?;
    let mut loss = 0.0;
    for (p, &target) in trace.ps.iter().zip(targets) {
        loss -= target_probability(p, target)?.max(PROB_EPSILON).ln();
    }
    Ok(loss)
}

/// Back-propagate through the whole window
///
/// # Arguments
///
/// * `params` - Parameters the trace was produced with
/// * `trace` - Output of [`forward`](crate::forward::forward)
/// * `targets` - Expected next token at each timestep
/// * `clip` - Element-wise clip applied to every gradient
///
/// # Errors
///
/// - [`RnnError::InvalidConfig`] if `clip` is NaN or not positive
/// - [`RnnError::LengthMismatch`] if `targets` and the trace differ in length
/// - [`RnnError::IndexOutOfRange`] for a target outside the vocabulary
/// - [`RnnError::NonFiniteGradient`] if any accumulator holds NaN/inf
pub fn backward(
    params: &RnnParams,
    trace: &ForwardTrace,
    targets: &[usize],
    clip: f64,
) -> Result<BackwardOutput> {
    if clip.is_nan() || clip <= 0.0 {
        return Err(RnnError::InvalidConfig(format!(
            "gradient clip must be positive, got {}",
            clip
        )));
    }
    check_targets(trace, targets)?;

    let mut grads = RnnGradients::zeros_like(params);
    let mut dh_next = Tensor::zeros(vec![params.hidden_size()]);
    let mut loss = 0.0;

    for t in (0..trace.len()).rev() {
        let target = targets[t];
        let h = &trace.hs[t];

        // dy = p - one_hot(target)
        let mut dy = trace.ps[t].clone();
        let p_target = target_probability(&dy, target)?;
        loss -= p_target.max(PROB_EPSILON).ln();
        dy.data[target] -= 1.0;

        grads.v.add_outer_assign(&dy, h);
        grads.c.add_assign(&dy);

        let dh = params.v.transpose_matvec(&dy).add(&dh_next);
        let dh_raw = tanh_backward(&dh, h);

        grads.b.add_assign(&dh_raw);
        grads.u.add_outer_assign(&dh_raw, &trace.xs[t]);
        grads.w.add_outer_assign(&dh_raw, trace.hidden_before(t));

        dh_next = params.w.transpose_matvec(&dh_raw);
    }

    ensure_finite(&grads)?;
    clip_gradients(&mut grads, clip);

    Ok(BackwardOutput {
        grads,
        dh_seed: dh_next,
        loss,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::forward;

    #[test]
    fn test_loss_matches_cross_entropy() {
        let params = RnnParams::initialize_seeded(4, 3, 2).unwrap();
        let trace = forward(&params, &[0, 1, 2, 0], &Tensor::zeros(vec![4])).unwrap();
        let targets = [1, 2, 0, 1];

        let out = backward(&params, &trace, &targets, DEFAULT_GRAD_CLIP).unwrap();
        let expected: f64 = trace
            .ps
            .iter()
            .zip(&targets)
            .map(|(p, &t)| -p.data[t].ln())
            .sum();
        assert!((out.loss - expected).abs() < 1e-12);
        assert!((cross_entropy(&trace, &targets).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_untouched_input_columns_have_zero_gradient() {
        let params = RnnParams::initialize_seeded(4, 5, 8).unwrap();
        let trace = forward(&params, &[1, 3, 1], &Tensor::zeros(vec![4])).unwrap();
        let out = backward(&params, &trace, &[3, 1, 3], DEFAULT_GRAD_CLIP).unwrap();

        // Tokens 0, 2 and 4 never appear as inputs
        for row in 0..4 {
            for col in [0, 2, 4] {
                assert_eq!(out.grads.u.at(row, col), 0.0);
            }
        }
    }

    #[test]
    fn test_output_bias_gradient_sums_to_zero() {
        // Each dy = p - one_hot sums to zero, so dc does too
        let params = RnnParams::initialize_seeded(6, 4, 21).unwrap();
        let trace = forward(&params, &[0, 1, 2, 3, 0], &Tensor::zeros(vec![6])).unwrap();
        let out = backward(&params, &trace, &[1, 2, 3, 0, 1], DEFAULT_GRAD_CLIP).unwrap();
        assert!(out.grads.c.sum().abs() < 1e-12);
    }

    #[test]
    fn test_rejects_invalid_clip() {
        let params = RnnParams::initialize_seeded(3, 3, 0).unwrap();
        let trace = forward(&params, &[0, 1], &Tensor::zeros(vec![3])).unwrap();
        for clip in [-1.0, 0.0, f64::NAN] {
            assert!(
                matches!(
                    backward(&params, &trace, &[1, 2], clip),
                    Err(RnnError::InvalidConfig(_))
                ),
                "clip {} accepted",
                clip
            );
        }
    }

    #[test]
    fn test_length_mismatch() {
        let params = RnnParams::initialize_seeded(3, 3, 0).unwrap();
        let trace = forward(&params, &[0, 1], &Tensor::zeros(vec![3])).unwrap();
        assert!(matches!(
            backward(&params, &trace, &[1], DEFAULT_GRAD_CLIP),
            Err(RnnError::LengthMismatch {
                inputs: 2,
                targets: 1
            })
        ));
    }

    #[test]
    fn test_target_out_of_range() {
        let params = RnnParams::initialize_seeded(3, 3, 0).unwrap();
        let trace = forward(&params, &[0, 1], &Tensor::zeros(vec![3])).unwrap();
        assert!(matches!(
            backward(&params, &trace, &[1, 7], DEFAULT_GRAD_CLIP),
            Err(RnnError::IndexOutOfRange { index: 7, size: 3 })
        ));
    }

    #[test]
    fn test_zero_probability_is_clamped() {
        let params = RnnParams::initialize_seeded(2, 2, 0).unwrap();
        let mut trace = forward(&params, &[0], &Tensor::zeros(vec![2])).unwrap();
        trace.ps[0] = Tensor::from_vec(vec![1.0, 0.0]);

        let loss = cross_entropy(&trace, &[1]).unwrap();
        assert!(loss.is_finite());
        assert!((loss + PROB_EPSILON.ln()).abs() < 1e-9);
    }

    #[test]
    fn test_nan_in_trace_is_reported() {
        let params = RnnParams::initialize_seeded(2, 2, 0).unwrap();
        let mut trace = forward(&params, &[0], &Tensor::zeros(vec![2])).unwrap();
        trace.ps[0] = Tensor::from_vec(vec![f64::NAN, 0.5]);
        assert!(matches!(
            backward(&params, &trace, &[1], DEFAULT_GRAD_CLIP),
            Err(RnnError::NonFiniteGradient { .. })
        ));
    }
}
