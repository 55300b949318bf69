//! Numerical gradient checking with centered finite differences.
//!
//! Backpropagation bugs almost always show up as a mismatch between the
//! analytic gradient a layer returns and the finite-difference gradient of a
//! scalar probe loss. The helpers here check a bare function, a layer's input
//! gradient, a layer's parameter gradients, and a whole model's parameter
//! gradients. They print the first offending element and return `false` on
//! mismatch, so test failures point at the exact index.

use crate::layers::{Layer, Param};
use crate::model::Model;
use crate::tensor::Tensor;

/// Sensible finite-difference step for f64 probes.
pub const DEFAULT_DELTA: f64 = 1e-5;
/// Default relative tolerance for gradient comparisons.
pub const DEFAULT_TOL: f64 = 1e-4;

fn gradients_close(numeric: f64, analytic: f64, tol: f64) -> bool {
    let scale = numeric.abs().max(analytic.abs()).max(1.0);
    (numeric - analytic).abs() <= tol * scale
}

/// Check the gradient of a scalar-valued function at `x`.
///
/// `f` must return the scalar value and the analytic gradient with respect to
/// its argument. Every element of the analytic gradient is compared against a
/// centered difference `(f(x + δ) - f(x - δ)) / 2δ` within relative tolerance
/// `tol`.
pub fn check_gradient<F>(f: &mut F, x: &Tensor, delta: f64, tol: f64) -> bool
where
    F: FnMut(&Tensor) -> (f64, Tensor),
{
    assert!(delta > 0.0, "delta must be positive");

    let (_, analytic) = f(x);
    assert_eq!(
        analytic.shape(),
        x.shape(),
        "analytic gradient shape {:?} does not match input shape {:?}",
        analytic.shape(),
        x.shape()
    );

    for i in 0..x.len() {
        let mut x_plus = x.clone();
        x_plus.data_mut()[i] += delta;
        let (loss_plus, _) = f(&x_plus);

        let mut x_minus = x.clone();
        x_minus.data_mut()[i] -= delta;
        let (loss_minus, _) = f(&x_minus);

        let numeric = (loss_plus - loss_minus) / (2.0 * delta);
        let analytic_at_i = analytic.data()[i];
        if !gradients_close(numeric, analytic_at_i, tol) {
            eprintln!(
                "gradient mismatch at index {}: numeric={:.10e}, analytic={:.10e}",
                i, numeric, analytic_at_i
            );
            return false;
        }
    }
    true
}

fn with_param<R>(layer: &mut dyn Layer, name: &str, f: impl FnOnce(&mut Param) -> R) -> R {
    let param = layer
        .params()
        .into_iter()
        .find(|(n, _)| *n == name)
        .map(|(_, p)| p)
        .unwrap_or_else(|| panic!("layer has no parameter named '{}'", name));
    f(param)
}

fn with_model_param<R>(model: &mut Model, name: &str, f: impl FnOnce(&mut Param) -> R) -> R {
    let param = model
        .params()
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, p)| p)
        .unwrap_or_else(|| panic!("model has no parameter named '{}'", name));
    f(param)
}

/// Check a layer's input gradient against finite differences.
///
/// The probe loss is the plain sum of the layer output, so the backward seed
/// is a tensor of ones.
pub fn check_layer_gradient(layer: &mut dyn Layer, x: &Tensor, delta: f64, tol: f64) -> bool {
    let mut f = |input: &Tensor| {
        let output = layer.forward(input);
        let loss: f64 = output.data().iter().sum();
        let seed = Tensor::from_vec(vec![1.0; output.len()], output.shape());
        let grad = layer.backward(&seed);
        (loss, grad)
    };
    check_gradient(&mut f, x, delta, tol)
}

/// Check one named parameter gradient of a layer against finite differences,
/// with the layer input held fixed at `x`. The parameter value is restored
/// afterwards.
pub fn check_layer_param_gradient(
    layer: &mut dyn Layer,
    x: &Tensor,
    param_name: &str,
    delta: f64,
    tol: f64,
) -> bool {
    let initial = with_param(&mut *layer, param_name, |p| p.value.clone());

    let mut f = |w: &Tensor| {
        with_param(&mut *layer, param_name, |p| p.value = w.clone());
        let output = layer.forward(x);
        let loss: f64 = output.data().iter().sum();
        let seed = Tensor::from_vec(vec![1.0; output.len()], output.shape());
        layer.backward(&seed);
        let grad = with_param(&mut *layer, param_name, |p| p.grad.clone());
        (loss, grad)
    };
    let ok = check_gradient(&mut f, &initial, delta, tol);

    with_param(&mut *layer, param_name, |p| p.value = initial);
    ok
}

/// Check every parameter gradient of a model against finite differences of
/// the full regularized loss on one batch.
pub fn check_model_gradient(
    model: &mut Model,
    x: &Tensor,
    targets: &[usize],
    reg: f64,
    delta: f64,
    tol: f64,
) -> bool {
    let names: Vec<String> = model.params().iter().map(|(n, _)| n.clone()).collect();

    for name in &names {
        let initial = with_model_param(model, name, |p| p.value.clone());

        let mut f = |w: &Tensor| {
            with_model_param(model, name, |p| p.value = w.clone());
            let loss = model.compute_loss_and_gradients(x, targets, reg);
            let grad = with_model_param(model, name, |p| p.grad.clone());
            (loss, grad)
        };
        let ok = check_gradient(&mut f, &initial, delta, tol);

        with_model_param(model, name, |p| p.value = initial);
        if !ok {
            eprintln!("gradient check failed for parameter '{}'", name);
            return false;
        }
    }
    true
}
