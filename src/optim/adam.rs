use crate::network::parameter_set::ParameterSet;
use crate::optim::optimizer::Optimizer;
use crate::optim::state::OptimizerState;

/// Adam with bias correction.
///
/// The step index passed to `apply` is the 1-based epoch number, not a count
/// of updates: every update inside one epoch uses the same correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adam {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
}

impl Default for Adam {
    fn default() -> Self {
        Adam {
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
        }
    }
}

impl Adam {
    /// Bias-correction divisors `(1 − β1^t, 1 − β2^t)` for step `t`.
    pub fn corrections(&self, step: u32) -> (f32, f32) {
        let t = step as f32;
        (1.0 - self.beta1.powf(t), 1.0 - self.beta2.powf(t))
    }
}

impl Optimizer for Adam {
    fn name(&self) -> &'static str {
        "adam"
    }

    fn state_slots(&self) -> usize {
        2
    }

    fn apply(&self, params: &mut ParameterSet, state: &mut OptimizerState, step: u32) {
        debug_assert!(step >= 1, "adam steps are 1-based");
        let (c1, c2) = self.corrections(step);
        let (m, v) = state.pair_mut();

        for ((tensor, m), v) in params.iter_mut().zip(m.iter_mut()).zip(v.iter_mut()) {
            let moments = m.iter_mut().zip(v.iter_mut());
            for ((x, g), (m, v)) in tensor.value.data.iter_mut().zip(&tensor.grad.data).zip(moments) {
                *m = self.beta1 * *m + (1.0 - self.beta1) * g;
                *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
                let m_hat = *m / c1;
                let v_hat = *v / c2;
                *x -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
            }
        }
    }
}
