use serde::{Serialize, Deserialize};

use crate::network::parameter_set::ParameterSet;

/// Rescales gradients so their global L2 norm does not exceed `max_norm`.
///
/// The norm is taken over every gradient element of the whole set, so one
/// large tensor shrinks the update of every other tensor too.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientClipper {
    pub max_norm: f32,
}

impl Default for GradientClipper {
    fn default() -> Self {
        GradientClipper { max_norm: 1.0 }
    }
}

impl GradientClipper {
    pub fn new(max_norm: f32) -> GradientClipper {
        GradientClipper { max_norm }
    }

    /// Clips in place and returns the norm measured before clipping.
    /// Gradients within the bound are left bit-for-bit untouched.
    pub fn clip(&self, params: &mut ParameterSet) -> f32 {
        let norm = params.grad_norm();
        if norm > self.max_norm {
            params.scale_grads(self.max_norm / norm);
        }
        norm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tensor::Tensor;
    use crate::network::parameter_set::TensorId;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn with_grads(grads: &[Vec<f32>]) -> ParameterSet {
        let mut set = ParameterSet::new();
        for (i, g) in grads.iter().enumerate() {
            let id = set.push(Tensor::zeros(format!("t{i}"), 1, g.len()));
            set.get_mut(id).grad.data.copy_from_slice(g);
        }
        set
    }

    #[test]
    fn large_gradients_end_on_the_unit_sphere() {
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..50 {
            let grads: Vec<Vec<f32>> = (0..3)
                .map(|_| (0..4).map(|_| rng.gen_range(-10.0..10.0)).collect())
                .collect();
            let mut set = with_grads(&grads);
            let before = GradientClipper::default().clip(&mut set);
            assert!(set.grad_norm() <= 1.0 + 1e-5, "norm {} from {before}", set.grad_norm());
        }
    }

    #[test]
    fn small_gradients_are_bit_identical() {
        let grads = vec![vec![0.1, -0.2, 0.3], vec![0.05]];
        let mut set = with_grads(&grads);
        let norm = GradientClipper::default().clip(&mut set);
        assert!(norm <= 1.0);
        assert_eq!(set.get(TensorId(0)).grad.data, grads[0]);
        assert_eq!(set.get(TensorId(1)).grad.data, grads[1]);
    }

    #[test]
    fn one_tensor_suppresses_all() {
        let mut set = with_grads(&[vec![100.0], vec![0.5]]);
        GradientClipper::default().clip(&mut set);
        assert!(set.get(TensorId(1)).grad.data[0] < 0.01);
    }
}
