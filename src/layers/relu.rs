//! ReLU activation layer.

use crate::layers::{Layer, Param};
use crate::tensor::Tensor;

/// Element-wise rectified linear unit: `output = max(0, input)`.
///
/// The forward pass records which positions were negative; the backward pass
/// zeroes the incoming gradient at exactly those positions. The layer has no
/// parameters and no state other than that one cached mask, which is replaced
/// on every forward call.
pub struct ReLULayer {
    negative_mask: Option<Vec<bool>>,
}

impl ReLULayer {
    /// Create a new ReLU layer.
    pub fn new() -> Self {
        Self { negative_mask: None }
    }
}

impl Default for ReLULayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for ReLULayer {
    fn forward(&mut self, input: &Tensor) -> Tensor {
        let mask: Vec<bool> = input.data().iter().map(|&v| v < 0.0).collect();

        let mut output = input.clone();
        for (value, &negative) in output.data_mut().iter_mut().zip(&mask) {
            if negative {
                *value = 0.0;
            }
        }

        self.negative_mask = Some(mask);
        output
    }

    fn backward(&mut self, grad_output: &Tensor) -> Tensor {
        let mask = self
            .negative_mask
            .as_ref()
            .expect("ReLULayer::backward called before forward");
        assert_eq!(
            grad_output.len(),
            mask.len(),
            "grad_output shape {:?} does not match the last forward input",
            grad_output.shape()
        );

        let mut grad_input = grad_output.clone();
        for (value, &negative) in grad_input.data_mut().iter_mut().zip(mask) {
            if negative {
                *value = 0.0;
            }
        }
        grad_input
    }

    fn params(&mut self) -> Vec<(&'static str, &mut Param)> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relu_forward_clamps_negatives() {
        let mut layer = ReLULayer::new();
        let x = Tensor::from_vec(vec![-2.0, -0.5, 0.0, 0.5, 2.0], &[1, 5]);
        let out = layer.forward(&x);
        assert_eq!(out.data(), &[0.0, 0.0, 0.0, 0.5, 2.0]);
        assert_eq!(out.shape(), x.shape());
    }

    #[test]
    fn test_relu_backward_masks_exactly_negative_positions() {
        let mut layer = ReLULayer::new();
        let x = Tensor::from_vec(vec![-1.0, 0.0, 3.0, -7.0], &[2, 2]);
        layer.forward(&x);

        let grad = layer.backward(&Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]));
        // Zero is not negative, so its gradient passes through.
        assert_eq!(grad.data(), &[0.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_relu_mask_is_replaced_by_new_forward() {
        let mut layer = ReLULayer::new();
        layer.forward(&Tensor::from_vec(vec![-1.0, 1.0], &[1, 2]));
        layer.forward(&Tensor::from_vec(vec![1.0, -1.0], &[1, 2]));

        let grad = layer.backward(&Tensor::from_vec(vec![5.0, 5.0], &[1, 2]));
        assert_eq!(grad.data(), &[5.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "backward called before forward")]
    fn test_relu_backward_without_forward_panics() {
        let mut layer = ReLULayer::new();
        layer.backward(&Tensor::zeros(&[1, 2]));
    }

    #[test]
    fn test_relu_has_no_params() {
        let mut layer = ReLULayer::new();
        assert!(layer.params().is_empty());
    }
}
