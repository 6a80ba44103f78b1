//! Fused semi-implicit Euler solver for the LTC membrane equation.
//!
//! One call advances the state by `elapsed_time` using exactly `ode_unfolds`
//! sub-steps of
//!
//! ```text
//! v' = (cm_t * v + gleak * vleak + Σ w_act * erev) / (cm_t + gleak + Σ w_act + ε)
//! ```
//!
//! with `cm_t = cm / (elapsed_time / ode_unfolds)`. There is no convergence
//! check; the cost of a step is fixed.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::params::LTCParams;
use super::synapse::Synapses;
use crate::error::{LtcError, Result};

pub const DEFAULT_ODE_UNFOLDS: usize = 6;
pub const DEFAULT_EPSILON: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdeSolver {
    ode_unfolds: usize,
    epsilon: f64,
}

impl Default for OdeSolver {
    fn default() -> Self {
        Self {
            ode_unfolds: DEFAULT_ODE_UNFOLDS,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl OdeSolver {
    pub fn new(ode_unfolds: usize, epsilon: f64) -> Result<Self> {
        if ode_unfolds == 0 {
            return Err(LtcError::config("ode_unfolds must be at least 1"));
        }
        if !(epsilon.is_finite() && epsilon > 0.0) {
            return Err(LtcError::config(format!(
                "epsilon must be a positive finite number, got {}",
                epsilon
            )));
        }
        Ok(Self {
            ode_unfolds,
            epsilon,
        })
    }

    pub fn ode_unfolds(&self) -> usize {
        self.ode_unfolds
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Advances `state: [batch, N]` driven by `inputs: [batch, S]` over
    /// `elapsed_time: [batch]`.
    pub fn solve<B: Backend>(
        &self,
        params: &LTCParams<B>,
        inputs: Tensor<B, 2>,
        state: Tensor<B, 2>,
        elapsed_time: Tensor<B, 1>,
    ) -> Tensor<B, 2> {
        let [batch, state_size] = state.dims();
        let shape = [batch, state_size];

        // sensory input is constant across sub-steps
        let sensory = Synapses::new(
            params.sensory_mu.val(),
            params.sensory_sigma.val(),
            params.sensory_w.val(),
            params.sensory_erev.val(),
            params.sensory_sparsity_mask.val(),
        )
        .current(inputs);

        let recurrent = Synapses::new(
            params.mu.val(),
            params.sigma.val(),
            params.w.val(),
            params.erev.val(),
            params.sparsity_mask.val(),
        );

        let dt = elapsed_time
            .div_scalar(self.ode_unfolds as f64)
            .unsqueeze_dim::<2>(1)
            .expand(shape);
        let cm_t = params.cm.val().unsqueeze::<2>().expand(shape).div(dt);

        let gleak = params.gleak.val().unsqueeze::<2>().expand(shape);
        let vleak = params.vleak.val().unsqueeze::<2>().expand(shape);
        let leak_current = gleak.clone().mul(vleak);

        // loop-invariant parts of numerator and denominator
        let numerator_base = leak_current.add(sensory.numerator);
        let denominator_base = cm_t
            .clone()
            .add(gleak)
            .add(sensory.denominator)
            .add_scalar(self.epsilon);

        let mut v_pre = state;
        for _ in 0..self.ode_unfolds {
            let synaptic = recurrent.current(v_pre.clone());

            let numerator = cm_t
                .clone()
                .mul(v_pre)
                .add(numerator_base.clone())
                .add(synaptic.numerator);
            let denominator = denominator_base.clone().add(synaptic.denominator);

            v_pre = numerator.div(denominator);
        }

        v_pre
    }
}
