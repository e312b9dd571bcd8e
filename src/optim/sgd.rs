use crate::network::parameter_set::ParameterSet;
use crate::optim::optimizer::Optimizer;
use crate::optim::state::OptimizerState;

/// Static learning rate: `x ← x − η·g`. Keeps no state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sgd {
    pub learning_rate: f32,
}

impl Sgd {
    pub fn new(learning_rate: f32) -> Sgd {
        Sgd { learning_rate }
    }
}

impl Optimizer for Sgd {
    fn name(&self) -> &'static str {
        "static"
    }

    fn state_slots(&self) -> usize {
        0
    }

    fn apply(&self, params: &mut ParameterSet, _state: &mut OptimizerState, _step: u32) {
        for tensor in params.iter_mut() {
            for (x, g) in tensor.value.data.iter_mut().zip(&tensor.grad.data) {
                *x -= self.learning_rate * g;
            }
        }
    }
}
