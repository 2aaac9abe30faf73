use serde::{Serialize, Deserialize};

/// Selects how `SoftmaxLoss::evaluate` computes the loss.
///
/// - `Naive`      — explicit loop over examples; the reference to check against.
/// - `Vectorized` — batched matrix algebra; the one to use in practice.
///
/// Both return the same `(loss, dW)` up to floating-point rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossStrategy {
    Naive,
    #[default]
    Vectorized,
}
