//! Sigmoidal synapse model.
//!
//! For presynaptic activity `p[i]` and a synapse `(i, j)`:
//!
//! ```text
//! w_act[i, j]   = w[i, j] * sigmoid(sigma[i, j] * (p[i] - mu[i, j])) * mask[i, j]
//! numerator[j]  = Σ_i w_act[i, j] * erev[i, j]
//! denominator[j] = Σ_i w_act[i, j]
//! ```

use burn::tensor::activation;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Conductance-weighted reversal potential and total conductance, `[batch, N]` each
#[derive(Debug, Clone)]
pub struct SynapticCurrent<B: Backend> {
    pub numerator: Tensor<B, 2>,
    pub denominator: Tensor<B, 2>,
}

/// A `[P, N]` block of synapses from `P` presynaptic sources onto `N` neurons.
///
/// Tensors are held as `[1, P, N]` so they broadcast over the batch.
#[derive(Debug, Clone)]
pub struct Synapses<B: Backend> {
    mu: Tensor<B, 3>,
    sigma: Tensor<B, 3>,
    w: Tensor<B, 3>,
    erev: Tensor<B, 3>,
    mask: Tensor<B, 3>,
}

impl<B: Backend> Synapses<B> {
    pub fn new(
        mu: Tensor<B, 2>,
        sigma: Tensor<B, 2>,
        w: Tensor<B, 2>,
        erev: Tensor<B, 2>,
        mask: Tensor<B, 2>,
    ) -> Self {
        Self {
            mu: mu.unsqueeze::<3>(),
            sigma: sigma.unsqueeze::<3>(),
            w: w.unsqueeze::<3>(),
            erev: erev.unsqueeze::<3>(),
            mask: mask.unsqueeze::<3>(),
        }
    }

    /// `(P, N)`
    pub fn dims(&self) -> (usize, usize) {
        let [_, sources, targets] = self.mu.dims();
        (sources, targets)
    }

    /// Pairwise activation `sigmoid(sigma * (p - mu))`, `[batch, P, N]`
    pub fn activation(&self, presynaptic: Tensor<B, 2>) -> Tensor<B, 3> {
        let [batch, sources] = presynaptic.dims();
        let (_, targets) = self.dims();
        let shape = [batch, sources, targets];

        let pre = presynaptic.reshape([batch, sources, 1]).expand(shape);
        let mu = self.mu.clone().expand(shape);
        let sigma = self.sigma.clone().expand(shape);
        activation::sigmoid(sigma.mul(pre.sub(mu)))
    }

    /// Reduces over presynaptic sources. `presynaptic` is `[batch, P]`.
    pub fn current(&self, presynaptic: Tensor<B, 2>) -> SynapticCurrent<B> {
        let [batch, sources] = presynaptic.dims();
        let (_, targets) = self.dims();
        let shape = [batch, sources, targets];

        let w_activation = self.w.clone().expand(shape).mul(self.activation(presynaptic));
        // mask after the sigmoid so masked pairs are exactly zero
        let w_activation = w_activation.mul(self.mask.clone().expand(shape));
        let rev_activation = w_activation.clone().mul(self.erev.clone().expand(shape));

        SynapticCurrent {
            numerator: rev_activation.sum_dim(1).reshape([batch, targets]),
            denominator: w_activation.sum_dim(1).reshape([batch, targets]),
        }
    }
}
