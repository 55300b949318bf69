//! Shared utilities: RNG and numerical gradient checking.

pub mod gradient_check;
pub mod rng;

pub use rng::SimpleRng;
