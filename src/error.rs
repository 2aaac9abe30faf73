use thiserror::Error;

/// Errors raised while building matrices or evaluating the loss.
#[derive(Debug, Error)]
pub enum SoftmaxError {
    #[error("dimension mismatch in {op}: left is {left_rows}x{left_cols}, right is {right_rows}x{right_cols}")]
    DimensionMismatch {
        op: &'static str,
        left_rows: usize,
        left_cols: usize,
        right_rows: usize,
        right_cols: usize,
    },

    #[error("label index out of range: y[{index}] = {label}, expected < {classes}")]
    LabelOutOfRange {
        index: usize,
        label: usize,
        classes: usize,
    },

    #[error("label count {labels} does not match batch size {examples}")]
    LabelCount { labels: usize, examples: usize },

    #[error("empty batch: at least one example is required")]
    EmptyBatch,

    #[error("invalid shape: {0}")]
    InvalidShape(String),

    #[error("invalid regularization strength {0}: must be finite and >= 0")]
    InvalidRegularization(f64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SoftmaxError>;
