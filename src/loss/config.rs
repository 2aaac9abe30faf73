use serde::{Serialize, Deserialize};

use crate::error::{Result, SoftmaxError};
use crate::loss::softmax::SoftmaxLoss;
use crate::loss::strategy::LossStrategy;
use crate::math::matrix::Matrix;

/// Caller-side settings for a softmax loss evaluation.
///
/// Fields:
/// - `reg`      — L2 regularization strength, finite and `>= 0`
/// - `strategy` — which implementation computes the loss
///
/// Can be saved to / loaded from JSON so a run's settings live next to its
/// data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxLossConfig {
    #[serde(default)]
    pub reg: f64,
    #[serde(default)]
    pub strategy: LossStrategy,
}

impl Default for SoftmaxLossConfig {
    fn default() -> Self {
        SoftmaxLossConfig { reg: 0.0, strategy: LossStrategy::Vectorized }
    }
}

impl SoftmaxLossConfig {
    pub fn new(reg: f64, strategy: LossStrategy) -> Result<Self> {
        let config = SoftmaxLossConfig { reg, strategy };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.reg.is_finite() || self.reg < 0.0 {
            return Err(SoftmaxError::InvalidRegularization(self.reg));
        }
        Ok(())
    }

    /// Returns `(loss, dW)` for this config's strategy and strength.
    pub fn evaluate(&self, weights: &Matrix, inputs: &Matrix, labels: &[usize]) -> Result<(f64, Matrix)> {
        SoftmaxLoss::evaluate(self.strategy, weights, inputs, labels, self.reg)
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes and validates a config previously written by `save_json`.
    pub fn load_json(path: &str) -> Result<SoftmaxLossConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let config: SoftmaxLossConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}
