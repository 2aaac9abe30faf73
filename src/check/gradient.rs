//! Finite-difference verification of analytic gradients.
//!
//! Central differences approximate each partial derivative:
//!
//! ```text
//! ∂f/∂w ≈ [f(w + h) - f(w - h)] / 2h
//! ```
//!
//! Comparing this against `dW` from `SoftmaxLoss` catches mistakes in the
//! analytic gradient that a loss value alone would never show.

use rand::Rng;

use crate::error::{Result, SoftmaxError};
use crate::math::matrix::Matrix;

/// Tolerances and sampling for a gradient check.
#[derive(Debug, Clone)]
pub struct GradientCheckConfig {
    /// Step used for the central difference.
    pub epsilon: f64,
    /// Relative tolerance (see `rel_error`).
    pub rtol: f64,
    /// Absolute tolerance; an entry passes if either tolerance holds.
    pub atol: f64,
    /// Entries sampled by `grad_check_sparse`.
    pub num_checks: usize,
    pub seed: u64,
}

impl Default for GradientCheckConfig {
    fn default() -> Self {
        GradientCheckConfig {
            epsilon: 1e-5,
            rtol: 1e-5,
            atol: 1e-8,
            num_checks: 10,
            seed: 231,
        }
    }
}

/// One checked entry of the weight matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientSample {
    pub row: usize,
    pub col: usize,
    pub numerical: f64,
    pub analytic: f64,
    pub rel_error: f64,
}

/// Summary over every checked entry.
#[derive(Debug, Clone)]
pub struct GradientCheckReport {
    pub samples: Vec<GradientSample>,
    pub max_relative_error: f64,
    pub max_absolute_error: f64,
    pub num_failures: usize,
    pub passed: bool,
}

impl GradientCheckReport {
    fn from_samples(samples: Vec<GradientSample>, config: &GradientCheckConfig) -> Self {
        let mut max_relative_error: f64 = 0.0;
        let mut max_absolute_error: f64 = 0.0;
        let mut num_failures = 0;

        for s in &samples {
            let abs_err = (s.numerical - s.analytic).abs();
            max_relative_error = max_relative_error.max(s.rel_error);
            max_absolute_error = max_absolute_error.max(abs_err);
            if abs_err > config.atol && s.rel_error > config.rtol {
                num_failures += 1;
            }
        }

        GradientCheckReport {
            samples,
            max_relative_error,
            max_absolute_error,
            num_failures,
            passed: num_failures == 0,
        }
    }

    pub fn num_checked(&self) -> usize {
        self.samples.len()
    }
}

/// `|a - b| / max(1e-8, |a| + |b|)`
pub fn rel_error(a: f64, b: f64) -> f64 {
    (a - b).abs() / (a.abs() + b.abs()).max(1e-8)
}

fn central_difference<F>(f: &mut F, probe: &mut Matrix, row: usize, col: usize, h: f64) -> Result<f64>
where
    F: FnMut(&Matrix) -> Result<f64>,
{
    let old = probe.get(row, col);
    probe.set(row, col, old + h);
    let plus = f(probe)?;
    probe.set(row, col, old - h);
    let minus = f(probe)?;
    probe.set(row, col, old);
    Ok((plus - minus) / (2.0 * h))
}

fn check_step(h: f64) -> Result<()> {
    if !(h.is_finite() && h > 0.0) {
        return Err(SoftmaxError::InvalidShape(format!("finite-difference step must be > 0, got {h}")));
    }
    Ok(())
}

/// Central-difference gradient of `f` at every entry of `weights`.
///
/// `f` sees a private copy of `weights`; the caller's matrix is untouched.
pub fn numerical_gradient<F>(mut f: F, weights: &Matrix, h: f64) -> Result<Matrix>
where
    F: FnMut(&Matrix) -> Result<f64>,
{
    check_step(h)?;
    let mut probe = weights.clone();
    let mut grad = Matrix::zeros(weights.rows, weights.cols);
    for i in 0..weights.rows {
        for j in 0..weights.cols {
            grad.data[i][j] = central_difference(&mut f, &mut probe, i, j, h)?;
        }
    }
    Ok(grad)
}

/// Compares `analytic` against central differences at every entry.
pub fn check_gradient<F>(
    f: F,
    weights: &Matrix,
    analytic: &Matrix,
    config: &GradientCheckConfig,
) -> Result<GradientCheckReport>
where
    F: FnMut(&Matrix) -> Result<f64>,
{
    let numerical = numerical_gradient(f, weights, config.epsilon)?;
    if numerical.shape() != analytic.shape() {
        return Err(SoftmaxError::DimensionMismatch {
            op: "check_gradient",
            left_rows: numerical.rows,
            left_cols: numerical.cols,
            right_rows: analytic.rows,
            right_cols: analytic.cols,
        });
    }

    let mut samples = Vec::with_capacity(weights.rows * weights.cols);
    for i in 0..weights.rows {
        for j in 0..weights.cols {
            let (n, a) = (numerical.get(i, j), analytic.get(i, j));
            samples.push(GradientSample { row: i, col: j, numerical: n, analytic: a, rel_error: rel_error(n, a) });
        }
    }
    Ok(GradientCheckReport::from_samples(samples, config))
}

/// Checks `num_checks` randomly chosen entries; cheaper than
/// `check_gradient` when `weights` is large. Entries may repeat.
pub fn grad_check_sparse<F, R>(
    mut f: F,
    weights: &Matrix,
    analytic: &Matrix,
    config: &GradientCheckConfig,
    rng: &mut R,
) -> Result<GradientCheckReport>
where
    F: FnMut(&Matrix) -> Result<f64>,
    R: Rng + ?Sized,
{
    check_step(config.epsilon)?;
    if weights.shape() != analytic.shape() {
        return Err(SoftmaxError::DimensionMismatch {
            op: "grad_check_sparse",
            left_rows: weights.rows,
            left_cols: weights.cols,
            right_rows: analytic.rows,
            right_cols: analytic.cols,
        });
    }
    if weights.rows == 0 || weights.cols == 0 {
        return Err(SoftmaxError::InvalidShape("cannot sample entries of an empty matrix".into()));
    }

    let mut probe = weights.clone();
    let mut samples = Vec::with_capacity(config.num_checks);
    for _ in 0..config.num_checks {
        let row = rng.gen_range(0..weights.rows);
        let col = rng.gen_range(0..weights.cols);
        let numerical = central_difference(&mut f, &mut probe, row, col, config.epsilon)?;
        let analytic = analytic.get(row, col);
        samples.push(GradientSample { row, col, numerical, analytic, rel_error: rel_error(numerical, analytic) });
    }
    Ok(GradientCheckReport::from_samples(samples, config))
}
