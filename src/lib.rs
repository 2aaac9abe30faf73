pub mod error;
pub mod math;
pub mod loss;
pub mod check;

// Convenience re-exports
pub use error::{Result, SoftmaxError};
pub use math::matrix::Matrix;
pub use loss::softmax::SoftmaxLoss;
pub use loss::strategy::LossStrategy;
pub use loss::config::SoftmaxLossConfig;
pub use check::gradient::{grad_check_sparse, GradientCheckConfig};
