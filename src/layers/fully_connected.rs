//! Fully connected (dense) layer.

use crate::layers::{Layer, Param};
use crate::tensor::Tensor;
use crate::utils::SimpleRng;

/// Fully connected layer computing `output = input · W + B`.
///
/// `W` has shape `(n_input, n_output)` and `B` is a `(1, n_output)` row vector
/// broadcast over the batch. Weights use Xavier initialization, uniform in
/// `[-limit, limit]` with `limit = sqrt(6 / (n_input + n_output))`; biases
/// start at zero.
///
/// Backward given `d_out` of shape `(batch, n_output)`:
///
/// * `W.grad = inputᵀ · d_out`
/// * `B.grad = column-sum(d_out)`
/// * returns `d_out · Wᵀ` of shape `(batch, n_input)`
///
/// Both parameter gradients are overwritten, not accumulated, on every
/// backward call.
pub struct FullyConnectedLayer {
    n_input: usize,
    n_output: usize,
    w: Param,
    b: Param,
    input: Option<Tensor>,
}

impl FullyConnectedLayer {
    /// Create a new layer mapping `n_input` features to `n_output`.
    pub fn new(n_input: usize, n_output: usize, rng: &mut SimpleRng) -> Self {
        let limit = (6.0 / (n_input + n_output) as f64).sqrt();
        let mut weights = Tensor::zeros(&[n_input, n_output]);
        for value in weights.data_mut() {
            *value = rng.gen_range(-limit, limit);
        }

        Self {
            n_input,
            n_output,
            w: Param::new(weights),
            b: Param::new(Tensor::zeros(&[1, n_output])),
            input: None,
        }
    }

    /// Number of input features.
    pub fn n_input(&self) -> usize {
        self.n_input
    }

    /// Number of output features.
    pub fn n_output(&self) -> usize {
        self.n_output
    }

    /// Total number of trainable values (weights plus biases).
    pub fn parameter_count(&self) -> usize {
        self.w.value.len() + self.b.value.len()
    }
}

impl Layer for FullyConnectedLayer {
    fn forward(&mut self, input: &Tensor) -> Tensor {
        let (batch, features) = input.dims2();
        assert_eq!(
            features, self.n_input,
            "input has {} features, layer expects {}",
            features, self.n_input
        );

        let mut output = Tensor::zeros(&[batch, self.n_output]);
        let w = self.w.value.data();
        let b = self.b.value.data();
        for bi in 0..batch {
            for j in 0..self.n_output {
                let mut sum = b[j];
                for i in 0..self.n_input {
                    sum += input.at2(bi, i) * w[i * self.n_output + j];
                }
                output.set2(bi, j, sum);
            }
        }

        self.input = Some(input.clone());
        output
    }

    fn backward(&mut self, grad_output: &Tensor) -> Tensor {
        let input = self
            .input
            .as_ref()
            .expect("FullyConnectedLayer::backward called before forward");
        let (batch, _) = input.dims2();
        let (grad_batch, grad_features) = grad_output.dims2();
        assert_eq!(grad_batch, batch, "grad_output batch size mismatch");
        assert_eq!(
            grad_features, self.n_output,
            "grad_output has {} features, layer produces {}",
            grad_features, self.n_output
        );

        // W.grad = X^T * d_out, overwritten each call.
        self.w.zero_grad();
        self.b.zero_grad();
        let grad_w = self.w.grad.data_mut();
        let grad_b = self.b.grad.data_mut();

        let mut grad_input = Tensor::zeros(&[batch, self.n_input]);
        let w = self.w.value.data();
        for bi in 0..batch {
            for j in 0..self.n_output {
                let g = grad_output.at2(bi, j);
                grad_b[j] += g;
                for i in 0..self.n_input {
                    grad_w[i * self.n_output + j] += input.at2(bi, i) * g;
                    grad_input.data_mut()[bi * self.n_input + i] += g * w[i * self.n_output + j];
                }
            }
        }

        grad_input
    }

    fn params(&mut self) -> Vec<(&'static str, &mut Param)> {
        vec![("W", &mut self.w), ("B", &mut self.b)]
    }
}
