//! Parameter Update Rules
//!
//! Two optimizers are available:
//!
//! - **SGD**: `θ -= lr * g`, exactly [`RnnParams::apply_gradients`]
//! - **Adagrad**: per-parameter step sizes that shrink for parameters with
//!   a history of large gradients
//!
//! ## Adagrad
//!
//! ```text
//! mem += g²
//! θ   -= lr * g / √(mem + ε)
//! ```
//!
//! with ε = 1e-8. Adagrad is the update rule of the classic
//! character-level RNN recipe and tolerates a much larger learning rate
//! than plain SGD, since the effective step decays on its own.

use crate::model::{RnnGradients, RnnParams};
use crate::tensor::Tensor;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Numerical stability constant inside the Adagrad square root
pub const ADAGRAD_EPSILON: f64 = 1e-8;

/// Which update rule the trainer uses
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerKind {
    #[default]
    Sgd,
    Adagrad,
}

/// Adagrad state: running sum of squared gradients for each parameter
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdagradOptimizer {
    pub mem_u: Tensor,
    pub mem_w: Tensor,
    pub mem_v: Tensor,
    pub mem_b: Tensor,
    pub mem_c: Tensor,
}

impl AdagradOptimizer {
    /// Zeroed memory shaped like `params`
    pub fn new(params: &RnnParams) -> Self {
        Self {
            mem_u: Tensor::zeros(params.u.shape.clone()),
            mem_w: Tensor::zeros(params.w.shape.clone()),
            mem_v: Tensor::zeros(params.v.shape.clone()),
            mem_b: Tensor::zeros(params.b.shape.clone()),
            mem_c: Tensor::zeros(params.c.shape.clone()),
        }
    }

    /// Apply one Adagrad step to every parameter
    pub fn update(&mut self, params: &mut RnnParams, grads: &RnnGradients, lr: f64) {
        // Parallelizes for large tensors, sequential for small ones
        macro_rules! adagrad_update_param {
            ($param:expr, $grad:expr, $mem:expr) => {
                if $param.data.len() > 1000 {
                    $param
                        .data
                        .par_iter_mut()
                        .zip($grad.data.par_iter())
                        .zip($mem.data.par_iter_mut())
                        .for_each(|((param_val, &grad_val), mem_val)| {
                            *mem_val += grad_val * grad_val;
                            *param_val -= lr * grad_val / (*mem_val + ADAGRAD_EPSILON).sqrt();
                        });
                } else {
                    for i in 0..$param.data.len() {
                        let g = $grad.data[i];
                        $mem.data[i] += g * g;
                        $param.data[i] -= lr * g / ($mem.data[i] + ADAGRAD_EPSILON).sqrt();
                    }
                }
            };
        }

        adagrad_update_param!(params.u, grads.u, self.mem_u);
        adagrad_update_param!(params.w, grads.w, self.mem_w);
        adagrad_update_param!(params.v, grads.v, self.mem_v);
        adagrad_update_param!(params.b, grads.b, self.mem_b);
        adagrad_update_param!(params.c, grads.c, self.mem_c);
    }
}

/// Optimizer together with whatever state it carries between steps
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Optimizer {
    Sgd,
    Adagrad(AdagradOptimizer),
}

impl Optimizer {
    pub fn new(kind: OptimizerKind, params: &RnnParams) -> Self {
        match kind {
            OptimizerKind::Sgd => Optimizer::Sgd,
            OptimizerKind::Adagrad => Optimizer::Adagrad(AdagradOptimizer::new(params)),
        }
    }

    pub fn kind(&self) -> OptimizerKind {
        match self {
            Optimizer::Sgd => OptimizerKind::Sgd,
            Optimizer::Adagrad(_) => OptimizerKind::Adagrad,
        }
    }

    /// Update `params` in place with `grads`
    pub fn step(&mut self, params: &mut RnnParams, grads: &RnnGradients, lr: f64) {
        match self {
            Optimizer::Sgd => params.apply_gradients(grads, lr),
            Optimizer::Adagrad(state) => state.update(params, grads, lr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sgd_matches_apply_gradients() {
        let mut a = RnnParams::initialize_seeded(3, 4, 1).unwrap();
        let mut b = a.clone();
        let mut grads = RnnGradients::zeros_like(&a);
        grads.w.data.iter_mut().for_each(|g| *g = 0.3);

        Optimizer::new(OptimizerKind::Sgd, &a).step(&mut a, &grads, 0.1);
        b.apply_gradients(&grads, 0.1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_adagrad_first_step_is_sign_times_lr() {
        // With empty memory, g / √(g²) = sign(g)
        let mut params = RnnParams::initialize_seeded(2, 2, 4).unwrap();
        let before = params.clone();
        let mut grads = RnnGradients::zeros_like(&params);
        grads.c.data = vec![4.0, -0.25];

        let mut opt = Optimizer::new(OptimizerKind::Adagrad, &params);
        opt.step(&mut params, &grads, 0.1);

        assert!((params.c.data[0] - (before.c.data[0] - 0.1)).abs() < 1e-6);
        assert!((params.c.data[1] - (before.c.data[1] + 0.1)).abs() < 1e-6);
        // Zero gradient leaves the parameter alone
        assert_eq!(params.u, before.u);
    }

    #[test]
    fn test_adagrad_steps_shrink() {
        let mut params = RnnParams::initialize_seeded(2, 2, 4).unwrap();
        let mut grads = RnnGradients::zeros_like(&params);
        grads.b.data = vec![1.0, 1.0];

        let mut opt = AdagradOptimizer::new(&params);
        let mut last = params.b.data[0];
        let mut last_step = f64::INFINITY;
        for _ in 0..5 {
            opt.update(&mut params, &grads, 0.1);
            let step = last - params.b.data[0];
            assert!(step > 0.0 && step < last_step);
            last_step = step;
            last = params.b.data[0];
        }
        assert!((opt.mem_b.data[0] - 5.0).abs() < 1e-12);
    }
}
