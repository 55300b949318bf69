//! Max pooling layer over NHWC tensors.

use crate::layers::{Layer, Param};
use crate::tensor::Tensor;

/// Max pooling over `pool_size × pool_size` windows with the given stride.
///
/// No padding is applied; the output extent is
/// `(input - pool_size) / stride + 1` with floor division. The forward pass
/// caches the raw input; the backward pass recomputes which position inside
/// each window attained the max (first occurrence on ties, matching the
/// forward search) and routes that window's entire incoming gradient there.
/// With overlapping windows (`stride < pool_size`) contributions to the same
/// input position accumulate.
pub struct MaxPoolingLayer {
    pool_size: usize,
    stride: usize,
    input: Option<Tensor>,
}

impl MaxPoolingLayer {
    /// Create a new max pooling layer.
    pub fn new(pool_size: usize, stride: usize) -> Self {
        assert!(pool_size > 0, "pool_size must be positive");
        assert!(stride > 0, "stride must be positive");
        Self {
            pool_size,
            stride,
            input: None,
        }
    }

    /// Pooling window side.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Step between pooling windows.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Position of the maximum inside the window anchored at `(y0, x0)`,
    /// first occurrence winning ties.
    fn window_argmax(&self, input: &Tensor, b: usize, y0: usize, x0: usize, c: usize) -> (usize, usize, f64) {
        let mut best = f64::NEG_INFINITY;
        let mut best_dy = 0;
        let mut best_dx = 0;
        for dy in 0..self.pool_size {
            for dx in 0..self.pool_size {
                let v = input.at4(b, y0 + dy, x0 + dx, c);
                if v > best {
                    best = v;
                    best_dy = dy;
                    best_dx = dx;
                }
            }
        }
        (best_dy, best_dx, best)
    }
}

impl Layer for MaxPoolingLayer {
    fn forward(&mut self, input: &Tensor) -> Tensor {
        let (batch, height, width, channels) = input.dims4();
        assert!(
            height >= self.pool_size && width >= self.pool_size,
            "pooling window {} larger than input extent {}x{}",
            self.pool_size,
            height,
            width
        );

        let out_height = (height - self.pool_size) / self.stride + 1;
        let out_width = (width - self.pool_size) / self.stride + 1;
        let mut output = Tensor::zeros(&[batch, out_height, out_width, channels]);

        for b in 0..batch {
            for y in 0..out_height {
                for x in 0..out_width {
                    for c in 0..channels {
                        let (_, _, best) =
                            self.window_argmax(input, b, y * self.stride, x * self.stride, c);
                        output.set4(b, y, x, c, best);
                    }
                }
            }
        }

        self.input = Some(input.clone());
        output
    }

    fn backward(&mut self, grad_output: &Tensor) -> Tensor {
        let input = self
            .input
            .take()
            .expect("MaxPoolingLayer::backward called before forward");
        let (batch, _, _, channels) = input.dims4();
        let (grad_batch, out_height, out_width, grad_channels) = grad_output.dims4();
        assert_eq!(grad_batch, batch, "grad_output batch size mismatch");
        assert_eq!(grad_channels, channels, "grad_output channel count mismatch");

        let mut grad_input = Tensor::zeros(input.shape());
        for b in 0..batch {
            for y in 0..out_height {
                for x in 0..out_width {
                    for c in 0..channels {
                        let y0 = y * self.stride;
                        let x0 = x * self.stride;
                        let (dy, dx, _) = self.window_argmax(&input, b, y0, x0, c);
                        // Accumulate rather than overwrite: overlapping
                        // windows can route into the same input cell.
                        grad_input.add4(b, y0 + dy, x0 + dx, c, grad_output.at4(b, y, x, c));
                    }
                }
            }
        }

        self.input = Some(input);
        grad_input
    }

    fn params(&mut self) -> Vec<(&'static str, &mut Param)> {
        Vec::new()
    }
}
