//! Optimizer abstractions for parameter updates.
//!
//! The layers in this crate only compute gradients; applying them is the
//! optimizer's job. An optimizer consumes the `(value, grad)` buffers exposed
//! by [`Param::value_and_grad`](crate::layers::Param::value_and_grad) and
//! updates the value in place, once per step, after the backward pass.

pub mod sgd;

pub use sgd::SGD;

/// Core trait for optimizers.
pub trait Optimizer {
    /// Update parameters in place using gradients.
    ///
    /// # Panics
    ///
    /// Panics if `parameters` and `gradients` have different lengths.
    fn update(&mut self, parameters: &mut [f64], gradients: &[f64]);

    /// Clear any accumulated internal state (momentum and the like). A no-op
    /// for stateless optimizers.
    fn reset(&mut self);

    /// The base learning rate.
    fn learning_rate(&self) -> f64;

    /// Replace the base learning rate, e.g. from a schedule.
    fn set_learning_rate(&mut self, lr: f64);
}
