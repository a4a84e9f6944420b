//! Tensor Operations for Recurrent Networks
//!
//! This module provides the small dense vector/matrix library the RNN is
//! written against. A character-level RNN only ever needs rank-1 tensors
//! (hidden states, one-hot inputs, probability distributions) and rank-2
//! tensors (the weight matrices), so that is all this supports.
//!
//! ## Core Concepts
//!
//! - **Data**: Flat `Vec<f64>` storing all elements in row-major order
//! - **Shape**: `[len]` for vectors, `[rows, cols]` for matrices
//! - **Strides**: Step sizes for each dimension to compute flat indices
//!
//! Values are `f64` throughout. Gradient checking by finite differences
//! needs the extra precision to resolve relative errors near `1e-4`.
//!
//! ## Example
//!
//! ```rust
//! use char_rnn::Tensor;
//!
//! // y = A·x for a 2x3 matrix
//! let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
//! let x = Tensor::from_vec(vec![1.0, 0.0, -1.0]);
//! let y = a.matvec(&x);
//! assert_eq!(y.data, vec![-2.0, -2.0]);
//! ```
//!
//! ## Performance
//!
//! Matrix-vector products, outer products and element-wise maps switch to
//! Rayon row-parallel loops once the work crosses [`PARALLEL_THRESHOLD`].
//! Each output element is still computed by one thread in a fixed order, so
//! results are bit-for-bit identical between the sequential and parallel
//! paths. Reductions (`sum`, `max`) are always sequential for the same
//! reason.

use crate::error::{Result, RnnError};
use rand::distr::{Distribution, Uniform};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Number of scalar operations above which Rayon is used.
pub const PARALLEL_THRESHOLD: usize = 4096;

/// A dense vector or matrix of `f64` values
///
/// # Memory Layout
///
/// For shape `[2, 3]`, data is stored as:
/// `[row0_col0, row0_col1, row0_col2, row1_col0, row1_col1, row1_col2]`
/// and strides are `[3, 1]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    /// Flat storage of all tensor elements
    pub data: Vec<f64>,
    /// Shape of the tensor (dimensions)
    pub shape: Vec<usize>,
    /// Strides for each dimension (computed from shape)
    pub strides: Vec<usize>,
}

impl Tensor {
    /// Create a new tensor with given data and shape
    ///
    /// # Panics
    ///
    /// Panics if the product of shape dimensions doesn't equal data length
    pub fn new(data: Vec<f64>, shape: Vec<usize>) -> Self {
        let expected_size: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            expected_size,
            "Data length ({}) doesn't match shape {:?} (expected {})",
            data.len(),
            shape,
            expected_size
        );

        let strides = Self::compute_strides(&shape);
        Self {
            data,
            shape,
            strides,
        }
    }

    /// Create a rank-1 tensor from a vector of values
    pub fn from_vec(data: Vec<f64>) -> Self {
        let len = data.len();
        Self::new(data, vec![len])
    }

    /// Create a tensor filled with zeros
    ///
    /// ```rust
    /// # use char_rnn::Tensor;
    /// let tensor = Tensor::zeros(vec![3, 4]);
    /// assert_eq!(tensor.data.len(), 12);
    /// assert!(tensor.data.iter().all(|&x| x == 0.0));
    /// ```
    pub fn zeros(shape: Vec<usize>) -> Self {
        let size: usize = shape.iter().product();
        Self::new(vec![0.0; size], shape)
    }

    /// One-hot vector of length `size` with a `1.0` at `index`
    ///
    /// # Errors
    ///
    /// [`RnnError::IndexOutOfRange`] if `index >= size`. The index is never
    /// clamped: a clamped index would silently encode the wrong token.
    pub fn one_hot(size: usize, index: usize) -> Result<Self> {
        if index >= size {
            return Err(RnnError::IndexOutOfRange { index, size });
        }
        let mut data = vec![0.0; size];
        data[index] = 1.0;
        Ok(Self::from_vec(data))
    }

    /// Tensor with entries drawn uniformly from `[-scale, +scale]`
    pub fn random_uniform<R>(shape: Vec<usize>, scale: f64, rng: &mut R) -> Result<Self>
    where
        R: Rng + ?Sized,
    {
        let dist = Uniform::new_inclusive(-scale, scale)
            .map_err(|e| RnnError::InvalidConfig(format!("init scale {scale}: {e}")))?;
        let size: usize = shape.iter().product();
        let data = (0..size).map(|_| dist.sample(rng)).collect();
        Ok(Self::new(data, shape))
    }

    /// Compute strides from shape (row-major layout)
    fn compute_strides(shape: &[usize]) -> Vec<usize> {
        let mut strides = vec![1; shape.len()];
        for i in (0..shape.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * shape[i + 1];
        }
        strides
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the tensor holds no elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element at `(row, col)` of a matrix
    pub fn at(&self, row: usize, col: usize) -> f64 {
        debug_assert_eq!(self.shape.len(), 2);
        self.data[row * self.strides[0] + col * self.strides[1]]
    }

    /// Check that this tensor has exactly `expected` shape, a matching
    /// element count and row-major strides
    pub fn ensure_shape(&self, what: &'static str, expected: &[usize]) -> Result<()> {
        let size: usize = expected.iter().product();
        if self.shape != expected
            || self.data.len() != size
            || self.strides != Self::compute_strides(expected)
        {
            return Err(RnnError::ShapeMismatch {
                what,
                expected: expected.to_vec(),
                actual: self.shape.clone(),
            });
        }
        Ok(())
    }

    /// Inner loop shared by the matrix kernels: `y += alpha * x`
    #[inline(always)]
    fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
        for (y_val, &x_val) in y.iter_mut().zip(x.iter()) {
            *y_val += alpha * x_val;
        }
    }

    /// Matrix-vector product
    ///
    /// For `A` of shape `[m, n]` and `v` of shape `[n]`, returns `A·v` of
    /// shape `[m]`.
    ///
    /// # Panics
    ///
    /// Panics if `self` is not a matrix or the inner dimensions disagree
    pub fn matvec(&self, v: &Tensor) -> Tensor {
        assert_eq!(self.shape.len(), 2, "matvec needs a matrix, got {:?}", self.shape);
        let rows = self.shape[0];
        let cols = self.shape[1];
        assert_eq!(
            v.data.len(),
            cols,
            "Matrix-vector dimensions incompatible: [{}, {}] · [{}]",
            rows,
            cols,
            v.data.len()
        );

        let row_dot = |row: &[f64]| row.iter().zip(&v.data).map(|(a, b)| a * b).sum::<f64>();

        let result: Vec<f64> = if rows * cols >= PARALLEL_THRESHOLD {
            self.data.par_chunks(cols).map(row_dot).collect()
        } else {
            self.data.chunks(cols).map(row_dot).collect()
        };

        Tensor::new(result, vec![rows])
    }

    /// Transposed matrix-vector product `Aᵀ·v`
    ///
    /// For `A` of shape `[m, n]` and `v` of shape `[m]`, returns shape `[n]`.
    /// Small matrices are handled without materializing the transpose.
    pub fn transpose_matvec(&self, v: &Tensor) -> Tensor {
        assert_eq!(self.shape.len(), 2, "transpose_matvec needs a matrix, got {:?}", self.shape);
        let rows = self.shape[0];
        let cols = self.shape[1];
        assert_eq!(
            v.data.len(),
            rows,
            "Matrix-vector dimensions incompatible: [{}, {}]ᵀ · [{}]",
            rows,
            cols,
            v.data.len()
        );

        if rows * cols >= PARALLEL_THRESHOLD {
            return self.transpose().matvec(v);
        }

        let mut result = vec![0.0; cols];
        for (row, &v_val) in self.data.chunks(cols).zip(&v.data) {
            Self::axpy(v_val, row, &mut result);
        }
        Tensor::new(result, vec![cols])
    }

    /// Transpose a matrix
    ///
    /// ```rust
    /// # use char_rnn::Tensor;
    /// let tensor = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
    /// let transposed = tensor.transpose();
    /// assert_eq!(transposed.shape, vec![3, 2]);
    /// assert_eq!(transposed.data, vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    /// ```
    pub fn transpose(&self) -> Tensor {
        assert_eq!(self.shape.len(), 2, "transpose needs a matrix, got {:?}", self.shape);
        let rows = self.shape[0];
        let cols = self.shape[1];
        let mut result = vec![0.0; rows * cols];

        for i in 0..rows {
            for j in 0..cols {
                result[j * rows + i] = self.data[i * cols + j];
            }
        }

        Tensor::new(result, vec![cols, rows])
    }

    /// Outer product `a ⊗ b` of two vectors, shape `[a.len(), b.len()]`
    pub fn outer(a: &Tensor, b: &Tensor) -> Tensor {
        let mut result = Tensor::zeros(vec![a.len(), b.len()]);
        result.add_outer_assign(a, b);
        result
    }

    /// Accumulate an outer product in place: `self += a ⊗ b`
    ///
    /// This is how every weight gradient in BPTT is built up, once per
    /// timestep, without allocating a temporary matrix.
    pub fn add_outer_assign(&mut self, a: &Tensor, b: &Tensor) {
        assert_eq!(
            self.shape,
            vec![a.len(), b.len()],
            "Outer product [{}] ⊗ [{}] doesn't fit accumulator {:?}",
            a.len(),
            b.len(),
            self.shape
        );
        let cols = b.len();

        if self.data.len() >= PARALLEL_THRESHOLD {
            self.data
                .par_chunks_mut(cols)
                .zip(a.data.par_iter())
                .for_each(|(row, &a_val)| Self::axpy(a_val, &b.data, row));
        } else {
            for (row, &a_val) in self.data.chunks_mut(cols).zip(&a.data) {
                Self::axpy(a_val, &b.data, row);
            }
        }
    }

    fn zip_with<F>(&self, other: &Tensor, op: &'static str, f: F) -> Tensor
    where
        F: Fn(f64, f64) -> f64 + Sync + Send,
    {
        assert_eq!(
            self.shape, other.shape,
            "Shapes must match for {}: {:?} vs {:?}",
            op, self.shape, other.shape
        );
        let result = if self.data.len() >= PARALLEL_THRESHOLD {
            self.data
                .par_iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect()
        } else {
            self.data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect()
        };
        Tensor::new(result, self.shape.clone())
    }

    /// Element-wise addition
    pub fn add(&self, other: &Tensor) -> Tensor {
        self.zip_with(other, "addition", |a, b| a + b)
    }

    /// Element-wise subtraction
    pub fn sub(&self, other: &Tensor) -> Tensor {
        self.zip_with(other, "subtraction", |a, b| a - b)
    }

    /// Element-wise (Hadamard) product
    pub fn mul(&self, other: &Tensor) -> Tensor {
        self.zip_with(other, "multiplication", |a, b| a * b)
    }

    /// Apply `f` to every element, returning a new tensor
    pub fn map<F>(&self, f: F) -> Tensor
    where
        F: Fn(f64) -> f64 + Sync + Send,
    {
        let result = if self.data.len() >= PARALLEL_THRESHOLD {
            self.data.par_iter().map(|&x| f(x)).collect()
        } else {
            self.data.iter().map(|&x| f(x)).collect()
        };
        Tensor::new(result, self.shape.clone())
    }

    /// In-place element-wise addition: `self += other`
    pub fn add_assign(&mut self, other: &Tensor) {
        self.scaled_add_assign(1.0, other);
    }

    /// In-place scaled addition: `self += alpha * other`
    pub fn scaled_add_assign(&mut self, alpha: f64, other: &Tensor) {
        assert_eq!(
            self.shape, other.shape,
            "Shapes must match for scaled add: {:?} vs {:?}",
            self.shape, other.shape
        );
        if self.data.len() >= PARALLEL_THRESHOLD {
            self.data
                .par_iter_mut()
                .zip(&other.data)
                .for_each(|(a, &b)| *a += alpha * b);
        } else {
            Self::axpy(alpha, &other.data, &mut self.data);
        }
    }

    /// Clamp every element into `[min, max]` in place
    pub fn clamp_assign(&mut self, min: f64, max: f64) {
        for val in self.data.iter_mut() {
            *val = val.clamp(min, max);
        }
    }

    /// Largest element (`-inf` for an empty tensor)
    pub fn max(&self) -> f64 {
        self.data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b))
    }

    /// Sum of all elements
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Sum of squared elements
    pub fn sum_of_squares(&self) -> f64 {
        self.data.iter().map(|&x| x * x).sum()
    }

    /// True if no element is NaN or infinite
    pub fn all_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_matvec_small() {
        let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        let v = Tensor::from_vec(vec![1.0, 1.0]);
        assert_eq!(a.matvec(&v).data, vec![3.0, 7.0]);
    }

    #[test]
    fn test_transpose_matvec_matches_explicit_transpose() {
        let a = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let v = Tensor::from_vec(vec![0.5, -1.0]);
        assert_eq!(a.transpose_matvec(&v), a.transpose().matvec(&v));
        assert_eq!(a.transpose_matvec(&v).data, vec![-3.5, -4.0, -4.5]);
    }

    #[test]
    fn test_parallel_and_sequential_matvec_agree() {
        // 80 x 80 crosses the parallel threshold
        let mut rng = StdRng::seed_from_u64(7);
        let a = Tensor::random_uniform(vec![80, 80], 1.0, &mut rng).unwrap();
        let v = Tensor::random_uniform(vec![80], 1.0, &mut rng).unwrap();

        let parallel = a.matvec(&v);
        let sequential: Vec<f64> = (0..80)
            .map(|i| (0..80).map(|j| a.at(i, j) * v.data[j]).sum())
            .collect();
        assert_eq!(parallel.data, sequential);
    }

    #[test]
    fn test_outer_product() {
        let a = Tensor::from_vec(vec![1.0, 2.0]);
        let b = Tensor::from_vec(vec![3.0, 4.0, 5.0]);
        let o = Tensor::outer(&a, &b);
        assert_eq!(o.shape, vec![2, 3]);
        assert_eq!(o.data, vec![3.0, 4.0, 5.0, 6.0, 8.0, 10.0]);
    }

    #[test]
    fn test_add_outer_assign_accumulates() {
        let a = Tensor::from_vec(vec![1.0, -1.0]);
        let b = Tensor::from_vec(vec![2.0, 0.5]);
        let mut acc = Tensor::zeros(vec![2, 2]);
        acc.add_outer_assign(&a, &b);
        acc.add_outer_assign(&a, &b);
        assert_eq!(acc.data, vec![4.0, 1.0, -4.0, -1.0]);
    }

    #[test]
    fn test_one_hot_rejects_out_of_range() {
        let hot = Tensor::one_hot(4, 2).unwrap();
        assert_eq!(hot.data, vec![0.0, 0.0, 1.0, 0.0]);

        match Tensor::one_hot(4, 4) {
            Err(RnnError::IndexOutOfRange { index, size }) => {
                assert_eq!((index, size), (4, 4));
            }
            other => panic!("expected IndexOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_random_uniform_respects_scale() {
        let mut rng = StdRng::seed_from_u64(1);
        let t = Tensor::random_uniform(vec![10, 10], 0.25, &mut rng).unwrap();
        assert!(t.data.iter().all(|&x| (-0.25..=0.25).contains(&x)));
        assert!(t.data.iter().any(|&x| x != t.data[0]));
    }

    #[test]
    fn test_clamp_and_reductions() {
        let mut t = Tensor::from_vec(vec![-10.0, 0.5, 10.0]);
        t.clamp_assign(-5.0, 5.0);
        assert_eq!(t.data, vec![-5.0, 0.5, 5.0]);
        assert_eq!(t.max(), 5.0);
        assert_eq!(t.sum(), 0.5);
        assert_eq!(t.sum_of_squares(), 50.25);
        assert!(t.all_finite());
        assert!(!Tensor::from_vec(vec![f64::NAN]).all_finite());
    }

    #[test]
    fn test_ensure_shape() {
        let t = Tensor::zeros(vec![2, 3]);
        assert!(t.ensure_shape("t", &[2, 3]).is_ok());
        assert!(matches!(
            t.ensure_shape("t", &[3, 2]),
            Err(RnnError::ShapeMismatch { what: "t", .. })
        ));
    }
}
