use crate::error::{Result, SoftmaxError};
use crate::loss::strategy::LossStrategy;
use crate::math::matrix::Matrix;

/// Softmax (cross-entropy) loss of a linear classifier `scores = X · W`,
/// with L2 regularization on `W`.
///
/// Shapes: `W` is (D, C), `X` is (N, D), `y` holds N labels in `[0, C)`.
/// Both strategies return `(loss, dW)` where
///
/// ```text
/// loss = mean_i( ln Σ_c exp(s_ic) - s_i,y_i ) + reg · Σ W²
/// dW   = Xᵀ · (P - onehot(y)) / N + 2 · reg · W
/// ```
///
/// and `P` is the row-wise softmax of the scores. Each row of scores is
/// shifted by its maximum before exponentiating, so large scores never
/// overflow.
pub struct SoftmaxLoss;

impl SoftmaxLoss {
    /// Dispatches to the chosen strategy.
    pub fn evaluate(
        strategy: LossStrategy,
        weights: &Matrix,
        inputs: &Matrix,
        labels: &[usize],
        reg: f64,
    ) -> Result<(f64, Matrix)> {
        match strategy {
            LossStrategy::Naive => SoftmaxLoss::naive(weights, inputs, labels, reg),
            LossStrategy::Vectorized => SoftmaxLoss::vectorized(weights, inputs, labels, reg),
        }
    }

    /// Per-example loop: scores, loss and gradient are accumulated one
    /// example at a time without any matrix products.
    pub fn naive(
        weights: &Matrix,
        inputs: &Matrix,
        labels: &[usize],
        reg: f64,
    ) -> Result<(f64, Matrix)> {
        validate_inputs(weights, inputs, labels, reg)?;

        let (dims, classes) = weights.shape();
        let num_train = inputs.rows;

        let mut loss = 0.0;
        let mut grad = Matrix::zeros(dims, classes);
        let mut scores = vec![0.0; classes];

        for (i, &label) in labels.iter().enumerate() {
            let x_i = inputs.row(i);

            for (c, score) in scores.iter_mut().enumerate() {
                *score = 0.0;
                for (k, &x) in x_i.iter().enumerate() {
                    *score += x * weights.data[k][c];
                }
            }

            let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let correct = scores[label] - max;

            // scores now hold exp(s - max)
            let mut sum_exp = 0.0;
            for score in scores.iter_mut() {
                *score = (*score - max).exp();
                sum_exp += *score;
            }

            loss += sum_exp.ln() - correct;

            for (c, &exp_score) in scores.iter().enumerate() {
                let prob = exp_score / sum_exp;
                let coeff = if c == label { prob - 1.0 } else { prob };
                for (k, &x) in x_i.iter().enumerate() {
                    grad.data[k][c] += x * coeff;
                }
            }
        }

        let n = num_train as f64;
        loss = loss / n + reg * weights.sum_of_squares();

        for (grad_row, w_row) in grad.data.iter_mut().zip(weights.data.iter()) {
            for (g, &w) in grad_row.iter_mut().zip(w_row.iter()) {
                *g = *g / n + 2.0 * reg * w;
            }
        }

        Ok((loss, grad))
    }

    /// Batched form built only from shape-checked `Matrix` operations.
    pub fn vectorized(
        weights: &Matrix,
        inputs: &Matrix,
        labels: &[usize],
        reg: f64,
    ) -> Result<(f64, Matrix)> {
        validate_inputs(weights, inputs, labels, reg)?;

        let n = inputs.rows as f64;

        let scores = inputs.matmul(weights)?;
        let shifted = scores.sub_column(&scores.row_max())?;
        let correct = shifted.gather(labels)?;

        let mut probs = shifted.map(f64::exp);
        let sum_exp = probs.row_sums();
        probs.div_column_in_place(&sum_exp)?;

        let data_loss = sum_exp.iter().zip(correct.iter())
            .map(|(s, c)| s.ln() - c)
            .sum::<f64>() / n;
        let loss = data_loss + reg * weights.sum_of_squares();

        // One-hot width comes from W, not from the labels present in this batch.
        let dscores = probs.elementwise_sub(&Matrix::one_hot(labels, weights.cols)?)?;
        let grad = inputs.transpose()
            .matmul(&dscores)?
            .scale(1.0 / n)
            .elementwise_add(&weights.scale(2.0 * reg))?;

        Ok((loss, grad))
    }
}

/// Checks every precondition shared by both strategies.
pub fn validate_inputs(weights: &Matrix, inputs: &Matrix, labels: &[usize], reg: f64) -> Result<()> {
    if inputs.rows == 0 {
        return Err(SoftmaxError::EmptyBatch);
    }
    if inputs.cols != weights.rows {
        return Err(SoftmaxError::DimensionMismatch {
            op: "scores",
            left_rows: inputs.rows,
            left_cols: inputs.cols,
            right_rows: weights.rows,
            right_cols: weights.cols,
        });
    }
    if labels.len() != inputs.rows {
        return Err(SoftmaxError::LabelCount { labels: labels.len(), examples: inputs.rows });
    }
    if let Some((index, &label)) = labels.iter().enumerate().find(|&(_, &l)| l >= weights.cols) {
        return Err(SoftmaxError::LabelOutOfRange { index, label, classes: weights.cols });
    }
    if !reg.is_finite() || reg < 0.0 {
        return Err(SoftmaxError::InvalidRegularization(reg));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_problem(seed: u64, n: usize, d: usize, c: usize, w_std: f64) -> (Matrix, Matrix, Vec<usize>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let w = Matrix::random_normal(d, c, w_std, &mut rng);
        let x = Matrix::random_normal(n, d, 1.0, &mut rng);
        let y = (0..n).map(|_| rng.gen_range(0..c)).collect();
        (w, x, y)
    }

    #[test]
    fn test_regression_fixture_zero_weights() {
        let w = Matrix::zeros(3, 4);
        let x = Matrix::filled(2, 3, 1.0);
        let y = [0, 1];

        for strategy in [LossStrategy::Naive, LossStrategy::Vectorized] {
            let (loss, grad) = SoftmaxLoss::evaluate(strategy, &w, &x, &y, 0.0).unwrap();
            assert_relative_eq!(loss, 4.0_f64.ln(), epsilon = 1e-12);
            assert_eq!(grad.shape(), (3, 4));
            // dscores rows: [-0.75, .25, .25, .25] and [.25, -.75, .25, .25]; summed over
            // two all-ones examples and halved.
            for row in &grad.data {
                let expected = [-0.25, -0.25, 0.25, 0.25];
                for (g, e) in row.iter().zip(expected.iter()) {
                    assert_abs_diff_eq!(*g, *e, epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_regularization_terms() {
        let w = Matrix::from_data(vec![vec![1.0, -1.0], vec![0.5, 2.0]]).unwrap();
        let x = Matrix::zeros(3, 2);
        let y = [0, 1, 1];
        let reg = 0.1;

        let (loss, grad) = SoftmaxLoss::vectorized(&w, &x, &y, reg).unwrap();
        // Zero inputs give uniform scores: data loss is ln 2 and the data gradient vanishes.
        assert_relative_eq!(loss, 2.0_f64.ln() + reg * 6.25, epsilon = 1e-12);
        assert_eq!(grad, w.scale(2.0 * reg));
    }

    #[test]
    fn test_strategies_agree() {
        let (w, x, y) = random_problem(42, 20, 7, 5, 0.1);
        let (loss_naive, grad_naive) = SoftmaxLoss::naive(&w, &x, &y, 0.5).unwrap();
        let (loss_vec, grad_vec) = SoftmaxLoss::vectorized(&w, &x, &y, 0.5).unwrap();

        assert_relative_eq!(loss_naive, loss_vec, max_relative = 1e-7);
        for (a, b) in grad_naive.data.iter().flatten().zip(grad_vec.data.iter().flatten()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12, max_relative = 1e-7);
        }
    }

    #[test]
    fn test_large_scores_stay_finite() {
        let (w, x, y) = random_problem(3, 8, 4, 6, 1.0);
        let w = w.scale(1e4);
        for strategy in [LossStrategy::Naive, LossStrategy::Vectorized] {
            let (loss, grad) = SoftmaxLoss::evaluate(strategy, &w, &x, &y, 0.0).unwrap();
            assert!(loss.is_finite() && loss >= 0.0, "loss = {loss}");
            assert!(grad.data.iter().flatten().all(|g| g.is_finite()));
        }
    }

    #[test]
    fn test_weights_not_mutated() {
        let (w, x, y) = random_problem(9, 5, 3, 4, 0.3);
        let before = w.clone();
        SoftmaxLoss::naive(&w, &x, &y, 1.0).unwrap();
        SoftmaxLoss::vectorized(&w, &x, &y, 1.0).unwrap();
        assert_eq!(w, before);
    }

    #[test]
    fn test_label_out_of_range() {
        let w = Matrix::zeros(3, 4);
        let x = Matrix::filled(2, 3, 1.0);
        for strategy in [LossStrategy::Naive, LossStrategy::Vectorized] {
            let err = SoftmaxLoss::evaluate(strategy, &w, &x, &[0, 4], 0.0).unwrap_err();
            assert!(matches!(err, SoftmaxError::LabelOutOfRange { index: 1, label: 4, classes: 4 }));
            assert!(err.to_string().contains("label index out of range"));
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let w = Matrix::zeros(3, 4);
        let x = Matrix::filled(2, 5, 1.0);
        for strategy in [LossStrategy::Naive, LossStrategy::Vectorized] {
            let err = SoftmaxLoss::evaluate(strategy, &w, &x, &[0, 1], 0.0).unwrap_err();
            assert!(matches!(err, SoftmaxError::DimensionMismatch { left_cols: 5, right_rows: 3, .. }));
        }
    }

    #[test]
    fn test_invalid_inputs() {
        let w = Matrix::zeros(3, 4);
        let x = Matrix::filled(2, 3, 1.0);
        assert!(matches!(
            validate_inputs(&w, &x, &[0], 0.0),
            Err(SoftmaxError::LabelCount { labels: 1, examples: 2 })
        ));
        assert!(matches!(
            validate_inputs(&w, &Matrix::zeros(0, 3), &[], 0.0),
            Err(SoftmaxError::EmptyBatch)
        ));
        assert!(matches!(
            validate_inputs(&w, &x, &[0, 1], -0.5),
            Err(SoftmaxError::InvalidRegularization(_))
        ));
        assert!(validate_inputs(&w, &x, &[0, 1], f64::NAN).is_err());
        assert!(validate_inputs(&w, &x, &[3, 2], 0.0).is_ok());
    }
}
