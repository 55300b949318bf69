//! Stochastic gradient descent.

use crate::optimizers::Optimizer;

/// Vanilla stochastic gradient descent: `w = w - η * ∇L/∂w`.
///
/// No momentum, no weight decay, no adaptive rates. It is the reference
/// optimizer the rest of the crate is tested against.
///
/// # Example
///
/// ```
/// use cnn_from_scratch::optimizers::{Optimizer, SGD};
///
/// let mut optimizer = SGD::new(0.1);
/// let mut params = vec![1.0, 2.0];
/// optimizer.update(&mut params, &[0.5, -0.5]);
/// assert!((params[0] - 0.95).abs() < 1e-12);
/// assert!((params[1] - 2.05).abs() < 1e-12);
/// ```
pub struct SGD {
    learning_rate: f64,
}

impl SGD {
    /// Create a new SGD optimizer with the given learning rate.
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate }
    }
}

impl Optimizer for SGD {
    fn update(&mut self, parameters: &mut [f64], gradients: &[f64]) {
        assert_eq!(
            parameters.len(),
            gradients.len(),
            "Parameters and gradients must have the same length"
        );

        for (param, grad) in parameters.iter_mut().zip(gradients.iter()) {
            *param -= self.learning_rate * grad;
        }
    }

    fn reset(&mut self) {
        // Vanilla SGD has no state to reset.
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f64) {
        self.learning_rate = lr;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sgd_update() {
        let mut optimizer = SGD::new(0.1);
        let mut params = vec![1.0, 2.0, 3.0];
        let grads = vec![0.1, 0.2, 0.3];

        optimizer.update(&mut params, &grads);

        assert!((params[0] - 0.99).abs() < 1e-12);
        assert!((params[1] - 1.98).abs() < 1e-12);
        assert!((params[2] - 2.97).abs() < 1e-12);
    }

    #[test]
    fn test_sgd_learning_rate_update() {
        let mut optimizer = SGD::new(0.1);
        optimizer.set_learning_rate(0.01);
        assert_eq!(optimizer.learning_rate(), 0.01);

        let mut params = vec![1.0];
        optimizer.update(&mut params, &[1.0]);
        assert!((params[0] - 0.99).abs() < 1e-12);
    }

    #[test]
    #[should_panic(expected = "Parameters and gradients must have the same length")]
    fn test_sgd_mismatched_lengths() {
        let mut optimizer = SGD::new(0.01);
        let mut params = vec![1.0, 2.0];
        optimizer.update(&mut params, &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_sgd_zero_learning_rate() {
        let mut optimizer = SGD::new(0.0);
        let mut params = vec![1.0, 2.0];
        let original = params.clone();

        optimizer.update(&mut params, &[0.1, 0.2]);
        assert_eq!(params, original);
    }
}
