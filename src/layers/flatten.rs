//! Flatten layer bridging 4D image tensors and 2D feature matrices.

use crate::layers::{Layer, Param};
use crate::tensor::Tensor;

/// Reshapes `(batch, height, width, channels)` to
/// `(batch, height * width * channels)`, remembering the original shape so the
/// backward pass can reshape the gradient back. No parameters.
pub struct Flattener {
    input_shape: Option<[usize; 4]>,
}

impl Flattener {
    /// Create a new flattener.
    pub fn new() -> Self {
        Self { input_shape: None }
    }
}

impl Default for Flattener {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for Flattener {
    fn forward(&mut self, input: &Tensor) -> Tensor {
        let (batch, height, width, channels) = input.dims4();
        self.input_shape = Some([batch, height, width, channels]);
        input.reshaped(&[batch, height * width * channels])
    }

    fn backward(&mut self, grad_output: &Tensor) -> Tensor {
        let shape = self
            .input_shape
            .expect("Flattener::backward called before forward");
        grad_output.reshaped(&shape)
    }

    fn params(&mut self) -> Vec<(&'static str, &mut Param)> {
        Vec::new()
    }
}
