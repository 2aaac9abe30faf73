pub mod softmax;
pub mod strategy;
pub mod config;

pub use softmax::{SoftmaxLoss, validate_inputs};
pub use strategy::LossStrategy;
pub use config::SoftmaxLossConfig;
