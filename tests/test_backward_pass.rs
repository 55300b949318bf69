// Tests for layer backward passes: a worked fully connected example, gradient
// routing in max pooling and ReLU, and the backward shape invariant.

use approx::assert_relative_eq;
use cnn_from_scratch::layers::{
    ConvolutionalLayer, Flattener, FullyConnectedLayer, Layer, MaxPoolingLayer, ReLULayer,
};
use cnn_from_scratch::tensor::Tensor;
use cnn_from_scratch::utils::SimpleRng;

fn set_param(layer: &mut dyn Layer, name: &str, value: Tensor) {
    for (n, p) in layer.params() {
        if n == name {
            assert_eq!(p.value.shape(), value.shape());
            p.value = value;
            return;
        }
    }
    panic!("no parameter named '{}'", name);
}

fn param_grad(layer: &mut dyn Layer, name: &str) -> Tensor {
    layer
        .params()
        .into_iter()
        .find(|(n, _)| *n == name)
        .map(|(_, p)| p.grad.clone())
        .unwrap_or_else(|| panic!("no parameter named '{}'", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fully_connected_worked_example_backward() {
        let mut rng = SimpleRng::new(42);
        let mut layer = FullyConnectedLayer::new(3, 2, &mut rng);
        set_param(
            &mut layer,
            "W",
            Tensor::from_vec(vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0], &[3, 2]),
        );
        set_param(&mut layer, "B", Tensor::from_vec(vec![0.0, 0.0], &[1, 2]));

        layer.forward(&Tensor::from_vec(vec![1.0, 2.0, 3.0], &[1, 3]));
        let grad_input = layer.backward(&Tensor::from_vec(vec![1.0, 1.0], &[1, 2]));

        // grad_input = d_out · Wᵀ
        assert_eq!(grad_input.shape(), &[1, 3]);
        assert_relative_eq!(grad_input.at2(0, 0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(grad_input.at2(0, 1), 1.0, epsilon = 1e-12);
        assert_relative_eq!(grad_input.at2(0, 2), 2.0, epsilon = 1e-12);

        // W.grad = Xᵀ · d_out
        let grad_w = param_grad(&mut layer, "W");
        assert_eq!(grad_w.data(), &[1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);

        // B.grad = column sums of d_out
        let grad_b = param_grad(&mut layer, "B");
        assert_eq!(grad_b.data(), &[1.0, 1.0]);
    }

    #[test]
    fn test_fully_connected_gradients_are_overwritten_not_accumulated() {
        let mut rng = SimpleRng::new(42);
        let mut layer = FullyConnectedLayer::new(2, 2, &mut rng);
        let x = Tensor::from_vec(vec![1.0, 2.0], &[1, 2]);
        let d = Tensor::from_vec(vec![1.0, -1.0], &[1, 2]);

        layer.forward(&x);
        layer.backward(&d);
        let first = param_grad(&mut layer, "W");

        layer.forward(&x);
        layer.backward(&d);
        let second = param_grad(&mut layer, "W");

        assert_eq!(first, second);
    }

    #[test]
    fn test_relu_backward_uses_forward_mask() {
        let mut layer = ReLULayer::new();
        let x = Tensor::from_vec(vec![-2.0, 0.0, 1.0, -0.1], &[1, 4]);
        layer.forward(&x);

        let grad = layer.backward(&Tensor::from_vec(vec![10.0, 20.0, 30.0, 40.0], &[1, 4]));
        assert_eq!(grad.data(), &[0.0, 20.0, 30.0, 0.0]);
    }

    #[test]
    fn test_maxpool_routes_gradient_to_unique_max() {
        let mut layer = MaxPoolingLayer::new(2, 2);
        let x = Tensor::from_vec(
            vec![
                1.0, 2.0, 5.0, 0.0, //
                3.0, 9.0, 1.0, 4.0, //
            ],
            &[1, 2, 4, 1],
        );
        layer.forward(&x);

        let grad = layer.backward(&Tensor::from_vec(vec![7.0, -2.0], &[1, 1, 2, 1]));
        // Maxes are 9 at (1, 1) and 5 at (0, 2); everything else gets zero.
        assert_eq!(
            grad.data(),
            &[
                0.0, 0.0, -2.0, 0.0, //
                0.0, 7.0, 0.0, 0.0, //
            ]
        );
    }

    #[test]
    fn test_maxpool_overlapping_windows_accumulate() {
        // pool 2, stride 1: the two windows overlap on the middle column, and
        // both route to the shared maximum at (0, 1).
        let mut layer = MaxPoolingLayer::new(2, 1);
        let x = Tensor::from_vec(
            vec![
                0.0, 5.0, 0.0, //
                1.0, 2.0, 1.0, //
            ],
            &[1, 2, 3, 1],
        );
        layer.forward(&x);

        let grad = layer.backward(&Tensor::from_vec(vec![1.0, 1.0], &[1, 1, 2, 1]));
        assert_eq!(
            grad.data(),
            &[
                0.0, 2.0, 0.0, //
                0.0, 0.0, 0.0, //
            ]
        );
    }

    #[test]
    fn test_conv_backward_shape_matches_input() {
        // The backward output must have the unpadded input shape for every
        // filter/padding combination.
        let cases = [(3, 0), (3, 1), (1, 0), (5, 2), (2, 1)];
        for &(filter_size, padding) in &cases {
            let mut rng = SimpleRng::new(42);
            let mut layer = ConvolutionalLayer::new(2, 3, filter_size, padding, &mut rng);

            let x = Tensor::zeros(&[2, 6, 7, 2]);
            let out = layer.forward(&x);
            let seed = Tensor::from_vec(vec![1.0; out.len()], out.shape());
            let grad_input = layer.backward(&seed);
            assert_eq!(
                grad_input.shape(),
                x.shape(),
                "filter {} padding {}",
                filter_size,
                padding
            );
        }
    }

    #[test]
    fn test_conv_identity_filter_backward_passes_gradient_through() {
        let mut rng = SimpleRng::new(42);
        let mut layer = ConvolutionalLayer::new(1, 1, 1, 0, &mut rng);
        set_param(&mut layer, "W", Tensor::from_vec(vec![1.0], &[1, 1, 1, 1]));
        set_param(&mut layer, "B", Tensor::from_vec(vec![0.0], &[1]));

        let x = Tensor::from_vec((0..6).map(|v| v as f64).collect(), &[1, 2, 3, 1]);
        layer.forward(&x);

        let seed = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[1, 2, 3, 1]);
        let grad_input = layer.backward(&seed);
        assert_eq!(grad_input, seed);

        // With a 1x1 identity filter, W.grad is the input/seed dot product
        // and B.grad the seed sum.
        let grad_w = param_grad(&mut layer, "W");
        let expected: f64 = x.data().iter().zip(seed.data()).map(|(a, b)| a * b).sum();
        assert_relative_eq!(grad_w.data()[0], expected, epsilon = 1e-12);
        let grad_b = param_grad(&mut layer, "B");
        assert_relative_eq!(grad_b.data()[0], 21.0, epsilon = 1e-12);
    }

    #[test]
    fn test_flatten_backward_restores_image_shape() {
        let mut layer = Flattener::new();
        let x = Tensor::from_vec((0..16).map(|v| v as f64).collect(), &[2, 2, 2, 2]);
        let flat = layer.forward(&x);

        let grad = layer.backward(&flat);
        assert_eq!(grad, x);
    }
}
