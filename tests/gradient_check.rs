//! Finite-difference verification of the analytic BPTT gradients.
//!
//! Every entry of every parameter tensor is nudged by ±ε and the centered
//! difference of the loss is compared with what `backward` returns.

use char_rnn::{backward, cross_entropy, forward, RnnParams, Tensor};

const EPS: f64 = 1e-5;
const REL_TOL: f64 = 1e-4;
// Entries whose true gradient is essentially zero are compared absolutely
const ABS_FLOOR: f64 = 1e-9;

fn small_model() -> RnnParams {
    let mut params = RnnParams::initialize_seeded(3, 4, 2024).unwrap();
    // Non-zero biases so their gradients are not trivially symmetric
    params.b = Tensor::from_vec(vec![0.05, -0.1, 0.2]);
    params.c = Tensor::from_vec(vec![0.3, -0.2, 0.0, 0.1]);
    params
}

fn window_loss(params: &RnnParams, inputs: &[usize], targets: &[usize], h0: &Tensor) -> f64 {
    let trace = forward(params, inputs, h0).unwrap();
    cross_entropy(&trace, targets).unwrap()
}

fn nudged(params: &RnnParams, tensor: usize, index: usize, delta: f64) -> RnnParams {
    let mut p = params.clone();
    let (_, t) = p.tensors_mut().into_iter().nth(tensor).unwrap();
    t.data[index] += delta;
    p
}

fn assert_close(name: &str, index: usize, analytic: f64, numeric: f64) {
    let diff = (analytic - numeric).abs();
    let scale = analytic.abs().max(numeric.abs());
    assert!(
        diff <= ABS_FLOOR || diff <= REL_TOL * scale,
        "{}[{}]: analytic {:.10e} vs numeric {:.10e} (rel err {:.3e})",
        name,
        index,
        analytic,
        numeric,
        diff / scale
    );
}

#[test]
fn test_gradients_match_finite_differences() {
    let params = small_model();
    let inputs = [0, 2, 1, 3, 2, 0];
    let targets = [2, 1, 3, 2, 0, 1];
    // Non-zero seed so dW at t = 0 is exercised
    let h0 = Tensor::from_vec(vec![0.1, -0.2, 0.3]);

    let trace = forward(&params, &inputs, &h0).unwrap();
    // Clip far outside the gradient range so the raw values are compared
    let analytic = backward(&params, &trace, &targets, 1e6).unwrap();

    for (k, (name, grad)) in analytic.grads.tensors().into_iter().enumerate() {
        for i in 0..grad.len() {
            let plus = window_loss(&nudged(&params, k, i, EPS), &inputs, &targets, &h0);
            let minus = window_loss(&nudged(&params, k, i, -EPS), &inputs, &targets, &h0);
            let numeric = (plus - minus) / (2.0 * EPS);
            assert_close(name, i, grad.data[i], numeric);
        }
    }
}

#[test]
fn test_seed_gradient_matches_finite_differences() {
    let params = small_model();
    let inputs = [1, 3, 0];
    let targets = [3, 0, 2];
    let h0 = Tensor::from_vec(vec![-0.3, 0.15, 0.05]);

    let trace = forward(&params, &inputs, &h0).unwrap();
    let analytic = backward(&params, &trace, &targets, 1e6).unwrap();

    for i in 0..h0.len() {
        let mut plus = h0.clone();
        plus.data[i] += EPS;
        let mut minus = h0.clone();
        minus.data[i] -= EPS;
        let numeric = (window_loss(&params, &inputs, &targets, &plus)
            - window_loss(&params, &inputs, &targets, &minus))
            / (2.0 * EPS);
        assert_close("dh_seed", i, analytic.dh_seed.data[i], numeric);
    }
}

#[test]
fn test_analytic_loss_matches_forward_loss() {
    let params = small_model();
    let inputs = [3, 3, 1];
    let targets = [3, 1, 0];
    let h0 = Tensor::zeros(vec![3]);

    let trace = forward(&params, &inputs, &h0).unwrap();
    let out = backward(&params, &trace, &targets, 5.0).unwrap();
    assert!((out.loss - window_loss(&params, &inputs, &targets, &h0)).abs() < 1e-12);
}
