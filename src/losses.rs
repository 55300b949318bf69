//! Loss functions: softmax, cross-entropy and L2 regularization.
//!
//! Class scores are 1D `(classes)` or 2D `(batch, classes)` tensors. Target
//! classes are always passed as a per-sample slice of indices — a single
//! unbatched prediction takes a one-element slice — so no function here
//! dispatches on the target representation at runtime.

use crate::tensor::Tensor;

// Floor for probabilities before taking the log; softmax outputs can
// underflow to exactly zero for extreme logits.
const PROB_EPSILON: f64 = 1e-12;

/// View a 1D tensor as a single row or a 2D tensor as its rows.
fn rows_of(t: &Tensor) -> (usize, usize) {
    match t.ndim() {
        1 => (1, t.shape()[0]),
        2 => t.dims2(),
        _ => panic!("expected a 1D or 2D tensor, got shape {:?}", t.shape()),
    }
}

/// L2 regularization loss `strength * Σ W²` and its gradient
/// `2 * strength * W`.
///
/// # Example
///
/// ```
/// use cnn_from_scratch::losses::l2_regularization;
/// use cnn_from_scratch::tensor::Tensor;
///
/// let w = Tensor::from_vec(vec![1.0, -2.0], &[2]);
/// let (loss, grad) = l2_regularization(&w, 0.5);
/// assert_eq!(loss, 2.5);
/// assert_eq!(grad.data(), &[1.0, -2.0]);
/// ```
pub fn l2_regularization(w: &Tensor, strength: f64) -> (f64, Tensor) {
    let loss = strength * w.data().iter().map(|&v| v * v).sum::<f64>();
    let mut grad = w.clone();
    for value in grad.data_mut() {
        *value *= 2.0 * strength;
    }
    (loss, grad)
}

/// Numerically stable softmax over the last axis.
///
/// Accepts a single unbatched score vector or a batch matrix; the output has
/// the input's shape and every row sums to 1. The per-row maximum is
/// subtracted before exponentiating so large scores do not overflow.
pub fn softmax(scores: &Tensor) -> Tensor {
    let (rows, cols) = rows_of(scores);
    assert!(cols > 0, "softmax over zero classes");

    let mut probs = scores.clone();
    for row in probs.data_mut().chunks_exact_mut(cols).take(rows) {
        let mut max_value = row[0];
        for &value in row.iter().skip(1) {
            if value > max_value {
                max_value = value;
            }
        }

        let mut sum = 0.0;
        for value in row.iter_mut() {
            *value = (*value - max_value).exp();
            sum += *value;
        }

        let inv_sum = 1.0 / sum;
        for value in row.iter_mut() {
            *value *= inv_sum;
        }
    }
    probs
}

/// Cross-entropy loss `-mean(ln p_target)` over the batch.
///
/// `targets` holds one true-class index per sample (row). Probabilities are
/// clamped away from zero before the log, so a degenerate zero probability
/// yields a large finite loss rather than infinity.
///
/// # Panics
///
/// Panics if `targets.len()` differs from the number of rows or an index is
/// out of range.
pub fn cross_entropy_loss(probs: &Tensor, targets: &[usize]) -> f64 {
    let (rows, cols) = rows_of(probs);
    assert_eq!(
        targets.len(),
        rows,
        "{} target indices for {} samples",
        targets.len(),
        rows
    );

    let data = probs.data();
    let mut loss = 0.0;
    for (row, &target) in targets.iter().enumerate() {
        assert!(target < cols, "target index {} out of range for {} classes", target, cols);
        let p = data[row * cols + target].max(PROB_EPSILON);
        loss -= p.ln();
    }
    loss / rows as f64
}

/// Fused softmax and cross-entropy with the gradient w.r.t. predictions.
///
/// Returns the scalar loss and `probs - one_hot(target)`, divided by the
/// batch size when `predictions` is batched (2D). The gradient has the shape
/// of `predictions`, and each sample's gradient sums to zero across classes.
///
/// # Example
///
/// ```
/// use cnn_from_scratch::losses::softmax_with_cross_entropy;
/// use cnn_from_scratch::tensor::Tensor;
///
/// let scores = Tensor::from_vec(vec![1.0, 1.0], &[2]);
/// let (loss, grad) = softmax_with_cross_entropy(&scores, &[0]);
/// assert!((loss - 2.0f64.ln()).abs() < 1e-12);
/// assert!((grad.data()[0] + 0.5).abs() < 1e-12);
/// assert!((grad.data()[1] - 0.5).abs() < 1e-12);
/// ```
pub fn softmax_with_cross_entropy(predictions: &Tensor, targets: &[usize]) -> (f64, Tensor) {
    let (rows, cols) = rows_of(predictions);

    let probs = softmax(predictions);
    let loss = cross_entropy_loss(&probs, targets);

    let mut grad = probs;
    // Batched predictions average the loss over rows, so the gradient is
    // scaled down by the batch size; a single unbatched vector is not.
    let scale = if predictions.ndim() == 2 {
        1.0 / rows as f64
    } else {
        1.0
    };
    for (row, &target) in targets.iter().enumerate() {
        let data = grad.data_mut();
        data[row * cols + target] -= 1.0;
        for value in &mut data[row * cols..(row + 1) * cols] {
            *value *= scale;
        }
    }

    (loss, grad)
}
