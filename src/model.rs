//! Layer pipeline: an ordered sequence of layers with a loss at the end.

use crate::layers::{
    ConvolutionalLayer, Flattener, FullyConnectedLayer, Layer, MaxPoolingLayer, Param, ReLULayer,
};
use crate::losses::{l2_regularization, softmax_with_cross_entropy};
use crate::optimizers::Optimizer;
use crate::tensor::Tensor;
use crate::utils::SimpleRng;

/// An ordered sequence of layers trained with softmax cross-entropy.
///
/// The model chains layer `forward` calls in order, feeds the final output to
/// the fused softmax/cross-entropy loss, chains `backward` calls in reverse,
/// and finally adds L2 regularization to every parameter. It performs no
/// epoch orchestration; a training loop drives it one batch at a time.
pub struct Model {
    layers: Vec<Box<dyn Layer>>,
}

impl Model {
    /// Build a model from an ordered list of layers.
    pub fn new(layers: Vec<Box<dyn Layer>>) -> Self {
        assert!(!layers.is_empty(), "model must have at least one layer");
        Self { layers }
    }

    /// The classic small convolutional network:
    /// conv → ReLU → maxpool → conv → ReLU → maxpool → flatten → fully connected.
    ///
    /// # Arguments
    ///
    /// * `input_shape` - `(height, width, channels)` of one sample
    /// * `conv1_channels`, `conv2_channels` - filters in each conv stage
    /// * `filter_size`, `padding` - shared conv configuration
    /// * `pool_size`, `pool_stride` - shared pooling configuration
    /// * `n_classes` - output classes of the final fully connected layer
    /// * `rng` - random number generator for weight initialization
    ///
    /// # Panics
    ///
    /// Panics if the configuration shrinks any stage to a non-positive
    /// spatial extent.
    #[allow(clippy::too_many_arguments)]
    pub fn conv_net(
        input_shape: (usize, usize, usize),
        conv1_channels: usize,
        conv2_channels: usize,
        filter_size: usize,
        padding: usize,
        pool_size: usize,
        pool_stride: usize,
        n_classes: usize,
        rng: &mut SimpleRng,
    ) -> Self {
        let (height, width, channels) = input_shape;

        let conv_extent = |extent: usize| -> usize {
            let out = extent as isize + 1 - filter_size as isize + 2 * padding as isize;
            assert!(out > 0, "conv stage shrinks extent {} to {}", extent, out);
            out as usize
        };
        let pool_extent = |extent: usize| -> usize {
            assert!(
                extent >= pool_size,
                "pool stage window {} larger than extent {}",
                pool_size,
                extent
            );
            (extent - pool_size) / pool_stride + 1
        };

        let h = pool_extent(conv_extent(height));
        let w = pool_extent(conv_extent(width));
        let h = pool_extent(conv_extent(h));
        let w = pool_extent(conv_extent(w));
        let fc_input = h * w * conv2_channels;

        Self::new(vec![
            Box::new(ConvolutionalLayer::new(
                channels,
                conv1_channels,
                filter_size,
                padding,
                rng,
            )),
            Box::new(ReLULayer::new()),
            Box::new(MaxPoolingLayer::new(pool_size, pool_stride)),
            Box::new(ConvolutionalLayer::new(
                conv1_channels,
                conv2_channels,
                filter_size,
                padding,
                rng,
            )),
            Box::new(ReLULayer::new()),
            Box::new(MaxPoolingLayer::new(pool_size, pool_stride)),
            Box::new(Flattener::new()),
            Box::new(FullyConnectedLayer::new(fc_input, n_classes, rng)),
        ])
    }

    /// Number of layers in the pipeline.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Chain every layer's forward pass and return the class scores.
    pub fn forward(&mut self, x: &Tensor) -> Tensor {
        let mut out = x.clone();
        for layer in &mut self.layers {
            out = layer.forward(&out);
        }
        out
    }

    /// One full training-step computation on a batch: forward chain, loss,
    /// reverse backward chain, then L2 regularization with strength `reg`
    /// added to the loss and to every parameter gradient.
    ///
    /// Returns the total (data + regularization) loss. Parameter gradients
    /// are left ready for an optimizer step.
    pub fn compute_loss_and_gradients(&mut self, x: &Tensor, targets: &[usize], reg: f64) -> f64 {
        let scores = self.forward(x);
        let (loss, mut grad) = softmax_with_cross_entropy(&scores, targets);

        for layer in self.layers.iter_mut().rev() {
            grad = layer.backward(&grad);
        }

        let mut total = loss;
        if reg != 0.0 {
            for (_, param) in self.params() {
                let (reg_loss, reg_grad) = l2_regularization(&param.value, reg);
                total += reg_loss;
                for (g, r) in param.grad.data_mut().iter_mut().zip(reg_grad.data()) {
                    *g += r;
                }
            }
        }
        total
    }

    /// Predicted class index for every sample in the batch.
    pub fn predict(&mut self, x: &Tensor) -> Vec<usize> {
        let scores = self.forward(x);
        let (rows, cols) = scores.dims2();

        let mut predictions = Vec::with_capacity(rows);
        for row in 0..rows {
            let mut best = scores.at2(row, 0);
            let mut arg = 0;
            for col in 1..cols {
                let v = scores.at2(row, col);
                if v > best {
                    best = v;
                    arg = col;
                }
            }
            predictions.push(arg);
        }
        predictions
    }

    /// Fraction of samples whose predicted class matches `targets`.
    pub fn accuracy(&mut self, x: &Tensor, targets: &[usize]) -> f64 {
        let predictions = self.predict(x);
        assert_eq!(predictions.len(), targets.len(), "target count mismatch");
        let correct = predictions
            .iter()
            .zip(targets)
            .filter(|(p, t)| p == t)
            .count();
        correct as f64 / targets.len() as f64
    }

    /// Every trainable parameter, with names qualified by layer index
    /// (`"layer0.W"`, `"layer7.B"`, ...), in pipeline order.
    pub fn params(&mut self) -> Vec<(String, &mut Param)> {
        self.layers
            .iter_mut()
            .enumerate()
            .flat_map(|(i, layer)| {
                layer
                    .params()
                    .into_iter()
                    .map(move |(name, param)| (format!("layer{}.{}", i, name), param))
            })
            .collect()
    }

    /// Apply one optimizer update to every parameter from its current
    /// gradient.
    pub fn apply_gradients(&mut self, optimizer: &mut dyn Optimizer) {
        for (_, param) in self.params() {
            let (value, grad) = param.value_and_grad();
            optimizer.update(value, grad);
        }
    }
}
