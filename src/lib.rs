//! Convolutional Neural Network Library
//!
//! This library implements the forward and backward passes of a small
//! convolutional network from scratch: layers, losses, and a layer pipeline,
//! all on flat row-major tensors with no linear algebra backend.
//!
//! # Modules
//!
//! - `tensor`: Flat row-major N-dimensional array with NHWC 4D indexing
//! - `layers`: Layer trait and implementations (fully connected, conv, etc.)
//! - `losses`: Softmax, cross-entropy, and L2 regularization
//! - `model`: Layer pipeline with loss and prediction
//! - `optimizers`: Optimizer trait and SGD
//! - `config`: Architecture configuration and model building
//! - `utils`: Shared utilities (RNG, gradient checking)

pub mod config;
pub mod layers;
pub mod losses;
pub mod model;
pub mod optimizers;
pub mod tensor;
pub mod utils;
