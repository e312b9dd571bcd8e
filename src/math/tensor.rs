use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

/// A named trainable array with a gradient buffer of identical shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub name: String,
    pub value: Matrix,
    pub grad: Matrix,
}

impl Tensor {
    pub fn zeros(name: impl Into<String>, rows: usize, cols: usize) -> Tensor {
        Tensor::from_matrix(name, Matrix::zeros(rows, cols))
    }

    pub fn random<R: Rng + ?Sized>(name: impl Into<String>, rows: usize, cols: usize, rng: &mut R) -> Tensor {
        Tensor::from_matrix(name, Matrix::random(rows, cols, rng))
    }

    pub fn from_matrix(name: impl Into<String>, value: Matrix) -> Tensor {
        let grad = Matrix::zeros(value.rows, value.cols);
        Tensor { name: name.into(), value, grad }
    }

    pub fn rows(&self) -> usize {
        self.value.rows
    }

    pub fn cols(&self) -> usize {
        self.value.cols
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Overwrites the values in place; `values` must match the tensor length.
    pub fn set(&mut self, values: &[f32]) {
        self.value.data.copy_from_slice(values);
    }

    pub fn zero_grad(&mut self) {
        self.grad.fill(0.0);
    }

    /// Swaps the value buffers of two same-shaped tensors without
    /// reallocating either. Gradients are left where they are.
    pub fn swap_values(&mut self, other: &mut Tensor) {
        assert!(self.value.same_shape(&other.value), "Matrices are of incorrect sizes");
        std::mem::swap(&mut self.value.data, &mut other.value.data);
    }
}
