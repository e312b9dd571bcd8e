use std::fmt;

use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::network::parameter_set::ParameterSet;
use crate::optim::{adam::Adam, momentum::Momentum, sgd::Sgd, state::OptimizerState};

/// A gradient-update rule.
///
/// `apply` consumes the (already clipped) gradients of `params` and updates
/// both the values and the rule's own slots in `state`. The rule itself is
/// immutable, so one instance can be shared across threads.
pub trait Optimizer: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Per-element state arrays this rule keeps (0 for static SGD).
    fn state_slots(&self) -> usize;

    fn new_state(&self, params: &ParameterSet) -> OptimizerState {
        OptimizerState::zeros(self.state_slots(), &params.lengths())
    }

    /// One update. `step` is 1-based; only Adam's bias correction reads it.
    fn apply(&self, params: &mut ParameterSet, state: &mut OptimizerState, step: u32);
}

/// Serializable choice of update rule, resolved into an `Optimizer` once per
/// run by `build`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptimizerConfig {
    Static { learning_rate: f32 },
    Momentum { alpha: f32, eta: f32 },
    Adam { learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32 },
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig::adam()
    }
}

impl OptimizerConfig {
    /// Adam with lr 0.001, β1 0.9, β2 0.999, ε 1e-8.
    pub fn adam() -> OptimizerConfig {
        let Adam { learning_rate, beta1, beta2, epsilon } = Adam::default();
        OptimizerConfig::Adam { learning_rate, beta1, beta2, epsilon }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OptimizerConfig::Static { .. } => "static",
            OptimizerConfig::Momentum { .. } => "momentum",
            OptimizerConfig::Adam { .. } => "adam",
        }
    }

    /// Whether the rule keeps memory between updates.
    pub fn is_stateful(&self) -> bool {
        !matches!(self, OptimizerConfig::Static { .. })
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |what: &str, x: f32| {
            if x > 0.0 && x.is_finite() {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!("{what} must be positive, got {x}")))
            }
        };
        let unit = |what: &str, x: f32| {
            if (0.0..1.0).contains(&x) {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!("{what} must lie in [0, 1), got {x}")))
            }
        };

        match *self {
            OptimizerConfig::Static { learning_rate } => positive("learning rate", learning_rate),
            OptimizerConfig::Momentum { alpha, eta } => {
                unit("momentum alpha", alpha)?;
                positive("momentum eta", eta)
            }
            OptimizerConfig::Adam { learning_rate, beta1, beta2, epsilon } => {
                positive("learning rate", learning_rate)?;
                unit("adam beta1", beta1)?;
                unit("adam beta2", beta2)?;
                positive("adam epsilon", epsilon)
            }
        }
    }

    pub fn build(&self) -> Result<Box<dyn Optimizer>> {
        self.validate()?;
        Ok(match *self {
            OptimizerConfig::Static { learning_rate } => Box::new(Sgd::new(learning_rate)),
            OptimizerConfig::Momentum { alpha, eta } => Box::new(Momentum::new(alpha, eta)),
            OptimizerConfig::Adam { learning_rate, beta1, beta2, epsilon } => {
                Box::new(Adam { learning_rate, beta1, beta2, epsilon })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tensor::Tensor;
    use crate::network::parameter_set::TensorId;
    use approx::assert_relative_eq;

    fn single(values: &[f32]) -> ParameterSet {
        let mut set = ParameterSet::new();
        let id = set.push(Tensor::zeros("x", 1, values.len()));
        set.get_mut(id).set(values);
        set
    }

    fn set_grad(set: &mut ParameterSet, grad: &[f32]) {
        set.get_mut(TensorId(0)).grad.data.copy_from_slice(grad);
    }

    #[test]
    fn momentum_without_memory_is_gradient_descent() {
        let optimizer = OptimizerConfig::Momentum { alpha: 0.0, eta: 1.0 }.build().unwrap();
        let mut params = single(&[0.5, -0.25]);
        let mut state = optimizer.new_state(&params);

        let mut expected = vec![0.5f32, -0.25];
        for n in 0..5 {
            let g = [0.1 * n as f32, -0.05];
            set_grad(&mut params, &g);
            optimizer.apply(&mut params, &mut state, n + 1);
            for (x, g) in expected.iter_mut().zip(g) {
                *x -= g;
            }
            assert_eq!(params[TensorId(0)].value.data, expected);
        }
    }

    #[test]
    fn momentum_accumulates_velocity() {
        let optimizer = Momentum::new(0.5, 0.1);
        let mut params = single(&[0.0]);
        let mut state = optimizer.new_state(&params);
        set_grad(&mut params, &[1.0]);

        optimizer.apply(&mut params, &mut state, 1);
        assert_relative_eq!(state.slot(0)[0][0], -0.1);
        optimizer.apply(&mut params, &mut state, 2);
        assert_relative_eq!(state.slot(0)[0][0], -0.15);
        assert_relative_eq!(params[TensorId(0)].value.data[0], -0.25);
    }

    #[test]
    fn adam_bias_corrected_moments_approach_gradient() {
        let adam = Adam::default();
        let g = 0.3f32;
        let mut params = single(&[0.0]);
        let mut state = adam.new_state(&params);

        for t in 1..=5000u32 {
            set_grad(&mut params, &[g]);
            adam.apply(&mut params, &mut state, t);
            let (c1, c2) = adam.corrections(t);
            let m_hat = state.slot(0)[0][0] / c1;
            let v_hat = state.slot(1)[0][0] / c2;
            if t == 1 {
                assert_relative_eq!(m_hat, g, max_relative = 1e-5);
                assert_relative_eq!(v_hat, g * g, max_relative = 1e-5);
            }
            if t == 5000 {
                assert_relative_eq!(m_hat, g, max_relative = 1e-3);
                assert_relative_eq!(v_hat, g * g, max_relative = 1e-2);
            }
        }
    }

    #[test]
    fn adam_first_step_moves_by_learning_rate() {
        let adam = Adam::default();
        let mut params = single(&[1.0, 1.0]);
        let mut state = adam.new_state(&params);
        set_grad(&mut params, &[4.0, -0.01]);
        adam.apply(&mut params, &mut state, 1);

        let x = &params[TensorId(0)].value.data;
        assert_relative_eq!(x[0], 1.0 - 0.001, max_relative = 1e-4);
        assert_relative_eq!(x[1], 1.0 + 0.001, max_relative = 1e-4);
    }

    #[test]
    fn static_rate_keeps_no_state() {
        let optimizer = OptimizerConfig::Static { learning_rate: 0.5 }.build().unwrap();
        let mut params = single(&[1.0]);
        let mut state = optimizer.new_state(&params);
        assert_eq!(state.slot_count(), 0);
        set_grad(&mut params, &[0.5]);
        optimizer.apply(&mut params, &mut state, 1);
        assert_eq!(params[TensorId(0)].value.data, vec![0.75]);
    }

    #[test]
    fn invalid_hyperparameters_are_rejected() {
        let bad = [
            OptimizerConfig::Static { learning_rate: 0.0 },
            OptimizerConfig::Momentum { alpha: 1.0, eta: 0.1 },
            OptimizerConfig::Momentum { alpha: 0.1, eta: -1.0 },
            OptimizerConfig::Adam { learning_rate: 0.001, beta1: 1.0, beta2: 0.999, epsilon: 1e-8 },
        ];
        for config in bad {
            assert!(matches!(config.build(), Err(Error::InvalidConfig(_))), "{config:?}");
        }
        assert!(OptimizerConfig::adam().validate().is_ok());
    }

    #[test]
    fn config_round_trips_through_json() {
        let json = serde_json::to_string(&OptimizerConfig::Momentum { alpha: 0.1, eta: 0.6 }).unwrap();
        assert!(json.contains("\"type\":\"momentum\""));
        let back: OptimizerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, OptimizerConfig::Momentum { alpha: 0.1, eta: 0.6 });
    }
}
