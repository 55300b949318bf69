// Tests for the loss functions: softmax, cross-entropy, their fused form,
// and L2 regularization.

use approx::assert_relative_eq;
use cnn_from_scratch::losses::{
    cross_entropy_loss, l2_regularization, softmax, softmax_with_cross_entropy,
};
use cnn_from_scratch::tensor::Tensor;

fn row_sum(t: &Tensor, row: usize, cols: usize) -> f64 {
    t.data()[row * cols..(row + 1) * cols].iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Softmax tests.
    #[test]
    fn test_softmax_vector_sums_to_one() {
        let probs = softmax(&Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[4]));
        assert_relative_eq!(row_sum(&probs, 0, 4), 1.0, epsilon = 1e-6);
        for &p in probs.data() {
            assert!(p > 0.0 && p < 1.0);
        }
    }

    #[test]
    fn test_softmax_batch_rows_sum_to_one() {
        let scores = Tensor::from_vec(
            vec![
                1.0, -2.0, 0.5, //
                10.0, 10.0, 10.0, //
                -3.0, 7.0, 0.0, //
            ],
            &[3, 3],
        );
        let probs = softmax(&scores);
        for row in 0..3 {
            assert_relative_eq!(row_sum(&probs, row, 3), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_softmax_is_shift_invariant() {
        let scores = Tensor::from_vec(vec![0.3, -1.2, 2.7], &[3]);
        let mut shifted = scores.clone();
        for v in shifted.data_mut() {
            *v += 123.0;
        }

        let a = softmax(&scores);
        let b = softmax(&shifted);
        for (x, y) in a.data().iter().zip(b.data()) {
            assert_relative_eq!(x, y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_softmax_survives_huge_scores() {
        // Without max subtraction exp(1000) would overflow to infinity.
        let probs = softmax(&Tensor::from_vec(vec![1000.0, 1001.0, 1002.0], &[3]));
        assert!(probs.data().iter().all(|p| p.is_finite()));
        assert_relative_eq!(row_sum(&probs, 0, 3), 1.0, epsilon = 1e-6);
        assert!(probs.data()[2] > probs.data()[1]);
    }

    #[test]
    fn test_softmax_uniform_scores_give_uniform_probs() {
        let probs = softmax(&Tensor::from_vec(vec![5.0; 4], &[4]));
        for &p in probs.data() {
            assert_relative_eq!(p, 0.25, epsilon = 1e-12);
        }
    }

    // Cross-entropy tests.
    #[test]
    fn test_cross_entropy_known_value() {
        // p_target = 0.5 gives loss ln 2.
        let probs = Tensor::from_vec(vec![0.5, 0.25, 0.25], &[1, 3]);
        let loss = cross_entropy_loss(&probs, &[0]);
        assert_relative_eq!(loss, 2.0f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_cross_entropy_averages_over_batch() {
        let probs = Tensor::from_vec(
            vec![
                0.5, 0.5, //
                0.25, 0.75, //
            ],
            &[2, 2],
        );
        let loss = cross_entropy_loss(&probs, &[0, 1]);
        let expected = -(0.5f64.ln() + 0.75f64.ln()) / 2.0;
        assert_relative_eq!(loss, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_cross_entropy_perfect_prediction_is_zero() {
        let probs = Tensor::from_vec(vec![0.0, 1.0, 0.0], &[1, 3]);
        let loss = cross_entropy_loss(&probs, &[1]);
        assert_relative_eq!(loss, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cross_entropy_zero_probability_is_large_but_finite() {
        let probs = Tensor::from_vec(vec![1.0, 0.0], &[1, 2]);
        let loss = cross_entropy_loss(&probs, &[1]);
        assert!(loss.is_finite());
        assert!(loss > 20.0);
    }

    // Fused softmax + cross-entropy tests.
    #[test]
    fn test_fused_loss_matches_composition() {
        let scores = Tensor::from_vec(vec![1.5, -0.5, 0.25, 2.0, 0.0, -1.0], &[2, 3]);
        let targets = [2, 0];

        let (fused_loss, _) = softmax_with_cross_entropy(&scores, &targets);
        let composed_loss = cross_entropy_loss(&softmax(&scores), &targets);
        assert_relative_eq!(fused_loss, composed_loss, epsilon = 1e-12);
    }

    #[test]
    fn test_fused_gradient_rows_sum_to_zero() {
        // probs sum to 1 per row and one_hot sums to 1, so each sample's
        // gradient sums to zero regardless of scaling.
        let scores = Tensor::from_vec(vec![2.0, -1.0, 0.5, 0.0, 3.0, 3.0], &[2, 3]);
        let (_, grad) = softmax_with_cross_entropy(&scores, &[1, 2]);
        for row in 0..2 {
            assert_relative_eq!(row_sum(&grad, row, 3), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_fused_gradient_shape_matches_input() {
        let vector = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3]);
        let (_, grad) = softmax_with_cross_entropy(&vector, &[0]);
        assert_eq!(grad.shape(), &[3]);

        let batch = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]);
        let (_, grad) = softmax_with_cross_entropy(&batch, &[0, 1]);
        assert_eq!(grad.shape(), &[2, 2]);
    }

    #[test]
    fn test_fused_gradient_batch_scaling() {
        // Duplicating a sample must not change the gradient for that sample,
        // because the batch gradient is averaged.
        let single = Tensor::from_vec(vec![1.0, -1.0], &[1, 2]);
        let (_, g1) = softmax_with_cross_entropy(&single, &[0]);

        let doubled = Tensor::from_vec(vec![1.0, -1.0, 1.0, -1.0], &[2, 2]);
        let (_, g2) = softmax_with_cross_entropy(&doubled, &[0, 0]);

        assert_relative_eq!(g2.at2(0, 0), g1.at2(0, 0) / 2.0, epsilon = 1e-12);
        assert_relative_eq!(g2.at2(0, 1), g1.at2(0, 1) / 2.0, epsilon = 1e-12);
    }

    // L2 regularization tests.
    #[test]
    fn test_l2_loss_and_gradient() {
        let w = Tensor::from_vec(vec![1.0, -2.0, 3.0], &[3]);
        let (loss, grad) = l2_regularization(&w, 0.1);

        assert_relative_eq!(loss, 0.1 * 14.0, epsilon = 1e-12);
        assert_relative_eq!(grad.data()[0], 0.2, epsilon = 1e-12);
        assert_relative_eq!(grad.data()[1], -0.4, epsilon = 1e-12);
        assert_relative_eq!(grad.data()[2], 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_l2_zero_strength_is_free() {
        let w = Tensor::from_vec(vec![5.0, -5.0], &[2]);
        let (loss, grad) = l2_regularization(&w, 0.0);
        assert_eq!(loss, 0.0);
        assert!(grad.data().iter().all(|&g| g == 0.0));
    }
}
