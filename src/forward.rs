//! Forward Pass
//!
//! Runs the recurrence over one window of token indices:
//!
//! ```text
//! for t in 0..T:
//!     x[t] = one_hot(inputs[t])
//!     h[t] = tanh(U·x[t] + W·h[t-1] + b)      (h[-1] = h_prev)
//!     p[t] = softmax(V·h[t] + c)
//! ```
//!
//! Every timestep gets freshly allocated `x`, `h` and `p` tensors. The
//! backward pass walks these snapshots in reverse, so they must never share
//! storage with a buffer that is later overwritten.

use crate::activation::{softmax, tanh_forward};
use crate::error::Result;
use crate::model::RnnParams;
use crate::tensor::Tensor;

/// Everything the backward pass needs from one forward pass
///
/// `xs`, `hs` and `ps` all have one entry per input token. `h_seed` is the
/// hidden state that entered the window (`h[-1]`).
#[derive(Clone, Debug)]
pub struct ForwardTrace {
    pub xs: Vec<Tensor>,
    pub hs: Vec<Tensor>,
    pub ps: Vec<Tensor>,
    pub h_seed: Tensor,
}

impl ForwardTrace {
    /// Number of timesteps
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Hidden state feeding timestep `t`: `h[t-1]`, or the seed for `t == 0`
    pub fn hidden_before(&self, t: usize) -> &Tensor {
        if t == 0 {
            &self.h_seed
        } else {
            &self.hs[t - 1]
        }
    }

    /// Final hidden state `h[T-1]`, to carry into the next window
    pub fn last_hidden(&self) -> &Tensor {
        self.hs.last().unwrap_or(&self.h_seed)
    }
}

/// Run the network over `inputs` starting from hidden state `h_prev`
///
/// # Errors
///
/// - [`RnnError::ShapeMismatch`](crate::RnnError::ShapeMismatch) if `h_prev`
///   is not a `[hidden_size]` vector
/// - [`RnnError::IndexOutOfRange`](crate::RnnError::IndexOutOfRange) if any
///   input token is not in `[0, input_size)`
pub fn forward(params: &RnnParams, inputs: &[usize], h_prev: &Tensor) -> Result<ForwardTrace> {
    let input_size = params.input_size();
    h_prev.ensure_shape("hidden state", &[params.hidden_size()])?;

    let mut xs = Vec::with_capacity(inputs.len());
    let mut hs: Vec<Tensor> = Vec::with_capacity(inputs.len());
    let mut ps = Vec::with_capacity(inputs.len());

    for &token in inputs {
        let x = Tensor::one_hot(input_size, token)?;
        let h_before = hs.last().unwrap_or(h_prev);

        let raw = params
            .u
            .matvec(&x)
            .add(&params.w.matvec(h_before))
            .add(&params.b);
        let h = tanh_forward(&raw);

        let logits = params.v.matvec(&h).add(&params.c);
        ps.push(softmax(&logits));
        xs.push(x);
        hs.push(h);
    }

    Ok(ForwardTrace {
        xs,
        hs,
        ps,
        h_seed: h_prev.clone(),
    })
}
