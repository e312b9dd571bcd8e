use crate::network::parameter_set::ParameterSet;
use crate::optim::optimizer::Optimizer;
use crate::optim::state::OptimizerState;

/// Classical momentum: `v ← α·v − η·g; x ← x + v`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Momentum {
    pub alpha: f32,
    pub eta: f32,
}

impl Momentum {
    pub fn new(alpha: f32, eta: f32) -> Momentum {
        Momentum { alpha, eta }
    }
}

impl Optimizer for Momentum {
    fn name(&self) -> &'static str {
        "momentum"
    }

    fn state_slots(&self) -> usize {
        1
    }

    fn apply(&self, params: &mut ParameterSet, state: &mut OptimizerState, _step: u32) {
        let velocity = state.slot_mut(0);
        debug_assert_eq!(velocity.len(), params.len());

        for (tensor, v) in params.iter_mut().zip(velocity.iter_mut()) {
            for ((x, g), v) in tensor.value.data.iter_mut().zip(&tensor.grad.data).zip(v.iter_mut()) {
                *v = self.alpha * *v - self.eta * g;
                *x += *v;
            }
        }
    }
}
