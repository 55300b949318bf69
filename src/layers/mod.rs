//! Layer abstractions for the network pipeline.
//!
//! This module provides the [`Layer`] trait, the [`Param`] trainable-parameter
//! container, and the concrete layer implementations (fully connected,
//! convolutional, max pooling, ReLU, flatten).

pub mod conv;
pub mod flatten;
pub mod fully_connected;
pub mod maxpool;
pub mod relu;

pub use conv::ConvolutionalLayer;
pub use flatten::Flattener;
pub use fully_connected::FullyConnectedLayer;
pub use maxpool::MaxPoolingLayer;
pub use relu::ReLULayer;

use crate::tensor::Tensor;

/// Trainable parameter: a value tensor paired with its gradient accumulator.
///
/// The gradient always has the same shape as the value and starts at zero.
/// Every `backward` call on the owning layer overwrites the gradient with the
/// gradient of that call's loss; accumulating across micro-batches or steps is
/// the caller's job, as is zeroing between optimizer steps.
pub struct Param {
    /// Current parameter value.
    pub value: Tensor,
    /// Gradient of the loss with respect to `value`, written by `backward`.
    pub grad: Tensor,
}

impl Param {
    /// Wrap a value tensor, with a zero gradient of the same shape.
    pub fn new(value: Tensor) -> Self {
        let grad = Tensor::zeros_like(&value);
        Self { value, grad }
    }

    /// Reset the gradient to zero.
    pub fn zero_grad(&mut self) {
        for g in self.grad.data_mut() {
            *g = 0.0;
        }
    }

    /// Split borrow of the value (mutable) and gradient (shared) buffers, in
    /// the form an [`Optimizer`](crate::optimizers::Optimizer) update expects.
    pub fn value_and_grad(&mut self) -> (&mut [f64], &[f64]) {
        (self.value.data_mut(), self.grad.data())
    }
}

/// Core trait for network layers.
///
/// A layer is used strictly as one `forward` call followed by the matching
/// `backward` call. `forward` caches whatever input state the backward pass
/// needs (sign mask, padded input, cached shape); a second `forward` silently
/// replaces that cache, and `backward` without any prior `forward` panics.
///
/// Shape invariant: `backward`'s argument must have the shape of the previous
/// `forward` output, and its return value has the shape of that `forward`
/// input.
///
/// # Example
///
/// ```
/// use cnn_from_scratch::layers::{Layer, ReLULayer};
/// use cnn_from_scratch::tensor::Tensor;
///
/// let mut relu = ReLULayer::new();
/// let x = Tensor::from_vec(vec![-1.0, 2.0], &[1, 2]);
/// let out = relu.forward(&x);
/// assert_eq!(out.data(), &[0.0, 2.0]);
/// let grad = relu.backward(&Tensor::from_vec(vec![1.0, 1.0], &[1, 2]));
/// assert_eq!(grad.data(), &[0.0, 1.0]);
/// ```
pub trait Layer {
    /// Compute the layer output and cache the state the backward pass needs.
    fn forward(&mut self, input: &Tensor) -> Tensor;

    /// Given the gradient of the loss with respect to the forward output,
    /// write the parameter gradients and return the gradient with respect to
    /// the forward input.
    ///
    /// # Panics
    ///
    /// Panics if called before `forward`, or if `grad_output` does not match
    /// the previous forward output shape.
    fn backward(&mut self, grad_output: &Tensor) -> Tensor;

    /// Named trainable parameters of this layer, in a stable order.
    ///
    /// Parameter-free layers return an empty vector.
    fn params(&mut self) -> Vec<(&'static str, &mut Param)>;
}
