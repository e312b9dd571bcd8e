use serde::{Serialize, Deserialize};

use crate::math::tensor::Tensor;

/// Position of a tensor inside its `ParameterSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorId(pub usize);

/// Ordered collection of trainable tensors.
///
/// Insertion order is fixed at construction. Optimizer state is stored in
/// arrays aligned with this order, so tensors are never reordered or removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    tensors: Vec<Tensor>,
}

impl ParameterSet {
    pub fn new() -> ParameterSet {
        ParameterSet { tensors: Vec::new() }
    }

    pub fn push(&mut self, tensor: Tensor) -> TensorId {
        self.tensors.push(tensor);
        TensorId(self.tensors.len() - 1)
    }

    pub fn get(&self, id: TensorId) -> &Tensor {
        &self.tensors[id.0]
    }

    pub fn get_mut(&mut self, id: TensorId) -> &mut Tensor {
        &mut self.tensors[id.0]
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tensor> {
        self.tensors.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Tensor> {
        self.tensors.iter_mut()
    }

    /// Element count of every tensor, in order. Used to size optimizer state.
    pub fn lengths(&self) -> Vec<usize> {
        self.tensors.iter().map(Tensor::len).collect()
    }

    pub fn zero_grad(&mut self) {
        self.tensors.iter_mut().for_each(Tensor::zero_grad);
    }

    /// Global L2 norm over every gradient element of every tensor.
    pub fn grad_norm(&self) -> f32 {
        self.tensors
            .iter()
            .flat_map(|t| t.grad.data.iter())
            .map(|g| g * g)
            .sum::<f32>()
            .sqrt()
    }

    pub fn scale_grads(&mut self, factor: f32) {
        for tensor in &mut self.tensors {
            tensor.grad.data.iter_mut().for_each(|g| *g *= factor);
        }
    }

    /// Copies every value buffer of `source` into this set without
    /// reallocating. Both sets must share a layout.
    pub fn copy_from(&mut self, source: &ParameterSet) {
        assert_eq!(self.len(), source.len(), "parameter sets have different layouts");
        for (dst, src) in self.tensors.iter_mut().zip(&source.tensors) {
            dst.value.data.copy_from_slice(&src.value.data);
        }
    }

    /// Exchanges the value buffer of tensor `id` between two sets.
    pub fn swap_values(&mut self, other: &mut ParameterSet, id: TensorId) {
        self.tensors[id.0].swap_values(&mut other.tensors[id.0]);
    }

    /// All values flattened in set order. Handy for comparisons and export.
    pub fn flatten(&self) -> Vec<f32> {
        self.tensors.iter().flat_map(|t| t.value.data.iter().copied()).collect()
    }
}

impl std::ops::Index<TensorId> for ParameterSet {
    type Output = Tensor;

    fn index(&self, id: TensorId) -> &Tensor {
        self.get(id)
    }
}
