use crate::error::{Error, Result};
use crate::network::parameter_set::ParameterSet;
use crate::optim::optimizer::Optimizer;

/// Persistent optimizer memory for one `ParameterSet`.
///
/// Holds `slots` arrays per tensor (momentum uses one, Adam two, SGD none),
/// each positionally aligned with the parameter set and zero-filled on
/// creation. Never resized afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerState {
    slots: Vec<Vec<Vec<f32>>>,
}

impl OptimizerState {
    pub fn zeros(slots: usize, lengths: &[usize]) -> OptimizerState {
        let slots = (0..slots)
            .map(|_| lengths.iter().map(|&n| vec![0.0; n]).collect())
            .collect();
        OptimizerState { slots }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, index: usize) -> &[Vec<f32>] {
        &self.slots[index]
    }

    pub fn slot_mut(&mut self, index: usize) -> &mut [Vec<f32>] {
        &mut self.slots[index]
    }

    /// The first two slots, borrowed together.
    pub fn pair_mut(&mut self) -> (&mut [Vec<f32>], &mut [Vec<f32>]) {
        let (first, rest) = self.slots.split_at_mut(1);
        (&mut first[0], &mut rest[0])
    }

    pub fn is_zero(&self) -> bool {
        self.slots.iter().flatten().flatten().all(|&x| x == 0.0)
    }
}

/// Where optimizer state lives: one buffer shared by every example, or one
/// buffer per training example ("contextual" training).
#[derive(Debug, Clone, PartialEq)]
pub enum StateScope {
    Shared(OptimizerState),
    PerExample(Vec<OptimizerState>),
}

impl StateScope {
    /// Allocates zeroed state for `optimizer`. Contextual scope needs a
    /// stateful optimizer; asking for it with plain SGD is a config error.
    pub fn new(
        optimizer: &dyn Optimizer,
        params: &ParameterSet,
        contextual: bool,
        examples: usize,
    ) -> Result<StateScope> {
        let fresh = || optimizer.new_state(params);
        if !contextual {
            return Ok(StateScope::Shared(fresh()));
        }
        if optimizer.state_slots() == 0 {
            return Err(Error::InvalidConfig(format!(
                "contextual training needs optimizer state, but {} has none",
                optimizer.name()
            )));
        }
        if examples == 0 {
            return Err(Error::InvalidConfig("contextual training needs at least one example".into()));
        }
        Ok(StateScope::PerExample((0..examples).map(|_| fresh()).collect()))
    }

    pub fn is_contextual(&self) -> bool {
        matches!(self, StateScope::PerExample(_))
    }

    /// The state to use while presenting `example` (an index into the
    /// dataset, not into the shuffled order).
    pub fn resolve(&mut self, example: usize) -> &mut OptimizerState {
        match self {
            StateScope::Shared(state) => state,
            StateScope::PerExample(states) => &mut states[example],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tensor::Tensor;
    use crate::optim::{momentum::Momentum, sgd::Sgd};

    fn params() -> ParameterSet {
        let mut set = ParameterSet::new();
        set.push(Tensor::zeros("w", 2, 2));
        set.push(Tensor::zeros("b", 2, 1));
        set
    }

    #[test]
    fn state_is_aligned_with_parameters() {
        let state = OptimizerState::zeros(2, &params().lengths());
        assert_eq!(state.slot_count(), 2);
        let lengths: Vec<usize> = state.slot(1).iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![4, 2]);
        assert!(state.is_zero());
    }

    #[test]
    fn contextual_static_is_a_config_error() {
        let result = StateScope::new(&Sgd::new(0.1), &params(), true, 4);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
        assert!(StateScope::new(&Sgd::new(0.1), &params(), false, 4).is_ok());
    }

    #[test]
    fn per_example_states_are_isolated() {
        let optimizer = Momentum::new(0.5, 0.1);
        let mut params = params();
        let mut scope = StateScope::new(&optimizer, &params, true, 3).unwrap();
        assert!(scope.is_contextual());

        params.iter_mut().for_each(|t| t.grad.fill(1.0));
        optimizer.apply(&mut params, scope.resolve(1), 1);

        assert!(scope.resolve(0).is_zero());
        assert!(scope.resolve(2).is_zero());
        assert!(!scope.resolve(1).is_zero());
    }

    #[test]
    fn shared_scope_ignores_example() {
        let optimizer = Momentum::new(0.5, 0.1);
        let mut params = params();
        let mut scope = StateScope::new(&optimizer, &params, false, 3).unwrap();

        params.iter_mut().for_each(|t| t.grad.fill(1.0));
        optimizer.apply(&mut params, scope.resolve(2), 1);
        assert!(!scope.resolve(0).is_zero());
    }
}
