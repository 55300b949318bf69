//! 2D convolutional layer over NHWC tensors.
//!
//! The convolution is computed position by position: for every output spatial
//! location the matching `filter_size × filter_size × in_channels` window is
//! extracted across the whole batch, flattened, and multiplied by the
//! flattened filter matrix. This is an explicit im2col-by-position strategy
//! rather than a general sliding-kernel convolution routine, which keeps both
//! passes a sequence of small dense matmuls.

use crate::layers::{Layer, Param};
use crate::tensor::Tensor;
use crate::utils::SimpleRng;

/// Convolutional layer with learnable filters and per-channel biases.
///
/// The filter tensor has shape `(filter_size, filter_size, in_channels,
/// out_channels)` and the bias has shape `(out_channels)`. Inputs are 4D
/// `(batch, height, width, channels)` tensors; the input is zero-padded by
/// `padding` on each spatial side, and the stride is fixed at 1:
///
/// `out_height = height + 1 - filter_size + 2 * padding` (width symmetric).
///
/// Weights use Xavier initialization over the filter fan-in/fan-out; biases
/// start at zero. Parameter gradients are overwritten on every backward call,
/// with the per-position contributions accumulated within that single call.
pub struct ConvolutionalLayer {
    in_channels: usize,
    out_channels: usize,
    filter_size: usize,
    padding: usize,
    w: Param,
    b: Param,
    padded_input: Option<Tensor>,
}

impl ConvolutionalLayer {
    /// Create a new convolutional layer.
    ///
    /// # Arguments
    ///
    /// * `in_channels` - number of input channels
    /// * `out_channels` - number of filters
    /// * `filter_size` - side of the square filter
    /// * `padding` - zero padding applied to each spatial side
    /// * `rng` - random number generator for weight initialization
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        filter_size: usize,
        padding: usize,
        rng: &mut SimpleRng,
    ) -> Self {
        assert!(filter_size > 0, "filter_size must be positive");

        let fan_in = (in_channels * filter_size * filter_size) as f64;
        let fan_out = (out_channels * filter_size * filter_size) as f64;
        let limit = (6.0 / (fan_in + fan_out)).sqrt();

        let mut weights = Tensor::zeros(&[filter_size, filter_size, in_channels, out_channels]);
        for value in weights.data_mut() {
            *value = rng.gen_range(-limit, limit);
        }

        Self {
            in_channels,
            out_channels,
            filter_size,
            padding,
            w: Param::new(weights),
            b: Param::new(Tensor::zeros(&[out_channels])),
            padded_input: None,
        }
    }

    /// Number of input channels.
    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    /// Number of output channels (filters).
    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    /// Side of the square filter.
    pub fn filter_size(&self) -> usize {
        self.filter_size
    }

    /// Zero padding applied to each spatial side.
    pub fn padding(&self) -> usize {
        self.padding
    }

    /// Total number of trainable values (filters plus biases).
    pub fn parameter_count(&self) -> usize {
        self.w.value.len() + self.b.value.len()
    }

    /// Output spatial extent for a given input extent.
    ///
    /// # Panics
    ///
    /// Panics if the configuration yields a non-positive output extent.
    fn output_extent(&self, input_extent: usize) -> usize {
        let out = input_extent as isize + 1 - self.filter_size as isize
            + 2 * self.padding as isize;
        assert!(
            out > 0,
            "invalid configuration: input extent {}, filter_size {}, padding {} \
             yield non-positive output extent {}",
            input_extent,
            self.filter_size,
            self.padding,
            out
        );
        out as usize
    }

}

/// Gather the flattened window at output position `(y, x)` for every sample
/// in the batch. The window buffer is `(batch, window_len)` with `window_len =
/// filter_size² * in_channels`, matching the row-major layout of the
/// flattened filter matrix.
fn gather_window(
    padded: &Tensor,
    filter_size: usize,
    in_channels: usize,
    y: usize,
    x: usize,
    window: &mut [f64],
) {
    let (batch, _, _, _) = padded.dims4();
    let window_len = filter_size * filter_size * in_channels;
    for bi in 0..batch {
        let mut k = 0;
        for ky in 0..filter_size {
            for kx in 0..filter_size {
                for ic in 0..in_channels {
                    window[bi * window_len + k] = padded.at4(bi, y + ky, x + kx, ic);
                    k += 1;
                }
            }
        }
    }
}

impl Layer for ConvolutionalLayer {
    fn forward(&mut self, input: &Tensor) -> Tensor {
        let (batch, height, width, channels) = input.dims4();
        assert_eq!(
            channels, self.in_channels,
            "input has {} channels, layer expects {}",
            channels, self.in_channels
        );

        let out_height = self.output_extent(height);
        let out_width = self.output_extent(width);

        let padded = input.pad_spatial(self.padding);
        let window_len = self.filter_size * self.filter_size * self.in_channels;
        let mut window = vec![0.0; batch * window_len];
        let mut output = Tensor::zeros(&[batch, out_height, out_width, self.out_channels]);

        // The flattened filter tensor is already the (window_len, out_channels)
        // matrix the per-position matmul needs.
        let w_flat = self.w.value.data();
        let bias = self.b.value.data();

        for y in 0..out_height {
            for x in 0..out_width {
                gather_window(&padded, self.filter_size, self.in_channels, y, x, &mut window);
                for bi in 0..batch {
                    for oc in 0..self.out_channels {
                        let mut sum = bias[oc];
                        for k in 0..window_len {
                            sum += window[bi * window_len + k] * w_flat[k * self.out_channels + oc];
                        }
                        output.set4(bi, y, x, oc, sum);
                    }
                }
            }
        }

        self.padded_input = Some(padded);
        output
    }

    fn backward(&mut self, grad_output: &Tensor) -> Tensor {
        let padded = self
            .padded_input
            .take()
            .expect("ConvolutionalLayer::backward called before forward");
        let (batch, padded_height, padded_width, _) = padded.dims4();
        let (grad_batch, out_height, out_width, grad_channels) = grad_output.dims4();
        assert_eq!(grad_batch, batch, "grad_output batch size mismatch");
        assert_eq!(
            grad_channels, self.out_channels,
            "grad_output has {} channels, layer produces {}",
            grad_channels, self.out_channels
        );
        assert_eq!(out_height, self.output_extent(padded_height - 2 * self.padding));
        assert_eq!(out_width, self.output_extent(padded_width - 2 * self.padding));

        self.w.zero_grad();
        self.b.zero_grad();
        let grad_w = self.w.grad.data_mut();
        let grad_b = self.b.grad.data_mut();
        let w_flat = self.w.value.data();

        let window_len = self.filter_size * self.filter_size * self.in_channels;
        let mut window = vec![0.0; batch * window_len];
        let mut grad_padded = Tensor::zeros(padded.shape());

        for y in 0..out_height {
            for x in 0..out_width {
                // Recompute this position's im2col window from the cached
                // padded input; the backward of the per-position matmul is the
                // same pair of matmuls as for a fully connected layer.
                gather_window(&padded, self.filter_size, self.in_channels, y, x, &mut window);

                for bi in 0..batch {
                    for oc in 0..self.out_channels {
                        let g = grad_output.at4(bi, y, x, oc);
                        grad_b[oc] += g;
                        for k in 0..window_len {
                            grad_w[k * self.out_channels + oc] += window[bi * window_len + k] * g;
                        }
                    }

                    // Scatter-add this position's input gradient back into the
                    // padded buffer.
                    let mut k = 0;
                    for ky in 0..self.filter_size {
                        for kx in 0..self.filter_size {
                            for ic in 0..self.in_channels {
                                let mut sum = 0.0;
                                for oc in 0..self.out_channels {
                                    sum += grad_output.at4(bi, y, x, oc)
                                        * w_flat[k * self.out_channels + oc];
                                }
                                grad_padded.add4(bi, y + ky, x + kx, ic, sum);
                                k += 1;
                            }
                        }
                    }
                }
            }
        }

        self.padded_input = Some(padded);
        grad_padded.crop_spatial(self.padding)
    }

    fn params(&mut self) -> Vec<(&'static str, &mut Param)> {
        vec![("W", &mut self.w), ("B", &mut self.b)]
    }
}
