use rand::Rng;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

use crate::error::{Result, SoftmaxError};

/// Dense row-major matrix of `f64`.
///
/// Every operation that combines two shapes checks them and returns
/// `SoftmaxError::DimensionMismatch` instead of broadcasting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix{
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>
}

impl Matrix{
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix::filled(rows, cols, 0.0)
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Matrix {
        Matrix{
            rows,
            cols,
            data: vec![vec![value; cols]; rows]
        }
    }

    /// Builds a matrix from rows, rejecting empty or ragged input.
    pub fn from_data(data: Vec<Vec<f64>>) -> Result<Matrix> {
        let cols = match data.first() {
            Some(first) if !first.is_empty() => first.len(),
            _ => return Err(SoftmaxError::InvalidShape("matrix needs at least one non-empty row".into())),
        };
        if let Some(i) = data.iter().position(|row| row.len() != cols) {
            return Err(SoftmaxError::InvalidShape(format!(
                "row {i} has {} columns, expected {cols}", data[i].len()
            )));
        }

        Ok(Matrix {
            rows: data.len(),
            cols,
            data
        })
    }

    /// Samples a single value from N(0, 1) using the Box-Muller transform.
    fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
        // Draw two independent uniform samples in (0, 1] to avoid log(0).
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = 1.0 - rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    /// Samples every entry from N(0, std_dev²).
    ///
    /// `random_normal(d, c, 1e-4, rng)` is the usual small-weight start for a
    /// linear classifier: initial scores are near zero and the loss starts
    /// close to `ln(C)`.
    pub fn random_normal<R: Rng + ?Sized>(rows: usize, cols: usize, std_dev: f64, rng: &mut R) -> Matrix {
        let mut res = Matrix::zeros(rows, cols);
        for i in 0..rows {
            for j in 0..cols {
                res.data[i][j] = Matrix::sample_standard_normal(rng) * std_dev;
            }
        }
        res
    }

    /// Indicator matrix of shape (labels.len(), classes) with a single 1.0
    /// per row at the label's column.
    pub fn one_hot(labels: &[usize], classes: usize) -> Result<Matrix> {
        let mut res = Matrix::zeros(labels.len(), classes);
        for (i, &label) in labels.iter().enumerate() {
            if label >= classes {
                return Err(SoftmaxError::LabelOutOfRange { index: i, label, classes });
            }
            res.data[i][label] = 1.0;
        }
        Ok(res)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row][col] = value;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row]
    }

    pub fn transpose(&self) -> Matrix {
        let mut res = Matrix::zeros(self.cols, self.rows);

        for i in 0..res.rows {
            for j in 0..res.cols {
                res.data[i][j] = self.data[j][i];
            }
        }

        res
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data
                .iter()
                .map(|row| row.iter().map(|&x| functor(x)).collect())
                .collect()
        }
    }

    pub fn scale(&self, factor: f64) -> Matrix {
        self.map(|x| x * factor)
    }

    fn check_same_shape(&self, rhs: &Matrix, op: &'static str) -> Result<()> {
        if self.rows != rhs.rows || self.cols != rhs.cols {
            return Err(self.mismatch(rhs.rows, rhs.cols, op));
        }
        Ok(())
    }

    fn mismatch(&self, right_rows: usize, right_cols: usize, op: &'static str) -> SoftmaxError {
        SoftmaxError::DimensionMismatch {
            op,
            left_rows: self.rows,
            left_cols: self.cols,
            right_rows,
            right_cols,
        }
    }

    fn zip_with<F>(&self, rhs: &Matrix, op: &'static str, functor: F) -> Result<Matrix>
    where
        F: Fn(f64, f64) -> f64,
    {
        self.check_same_shape(rhs, op)?;
        let data = self.data.iter().zip(rhs.data.iter())
            .map(|(row_a, row_b)| {
                row_a.iter().zip(row_b.iter()).map(|(&a, &b)| functor(a, b)).collect()
            })
            .collect();
        Ok(Matrix { rows: self.rows, cols: self.cols, data })
    }

    pub fn elementwise_add(&self, rhs: &Matrix) -> Result<Matrix> {
        self.zip_with(rhs, "add", |a, b| a + b)
    }

    pub fn elementwise_sub(&self, rhs: &Matrix) -> Result<Matrix> {
        self.zip_with(rhs, "sub", |a, b| a - b)
    }

    /// Element-wise (Hadamard) product of two same-shape matrices.
    pub fn hadamard(&self, rhs: &Matrix) -> Result<Matrix> {
        self.zip_with(rhs, "hadamard", |a, b| a * b)
    }

    /// Matrix product `self · rhs`; requires `self.cols == rhs.rows`.
    pub fn matmul(&self, rhs: &Matrix) -> Result<Matrix> {
        if self.cols != rhs.rows {
            return Err(self.mismatch(rhs.rows, rhs.cols, "matmul"));
        }

        let mut res = Matrix::zeros(self.rows, rhs.cols);

        // i-k-j order keeps the inner loop on contiguous rows.
        for i in 0..self.rows {
            let out = &mut res.data[i];
            for (k, &a) in self.data[i].iter().enumerate() {
                for (o, &b) in out.iter_mut().zip(rhs.data[k].iter()) {
                    *o += a * b;
                }
            }
        }

        Ok(res)
    }

    pub fn row_max(&self) -> Vec<f64> {
        self.data.iter()
            .map(|row| row.iter().copied().fold(f64::NEG_INFINITY, f64::max))
            .collect()
    }

    pub fn row_sums(&self) -> Vec<f64> {
        self.data.iter().map(|row| row.iter().sum()).collect()
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().flatten().sum()
    }

    pub fn sum_of_squares(&self) -> f64 {
        self.data.iter().flatten().map(|x| x * x).sum()
    }

    /// Largest absolute element-wise difference between two same-shape matrices.
    pub fn max_abs_diff(&self, rhs: &Matrix) -> Result<f64> {
        self.check_same_shape(rhs, "max_abs_diff")?;
        Ok(self.data.iter().flatten().zip(rhs.data.iter().flatten())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max))
    }

    fn check_column(&self, column: &[f64], op: &'static str) -> Result<()> {
        if column.len() != self.rows {
            return Err(self.mismatch(column.len(), 1, op));
        }
        Ok(())
    }

    /// Subtracts `column[i]` from every entry of row `i`.
    pub fn sub_column(&self, column: &[f64]) -> Result<Matrix> {
        self.check_column(column, "sub_column")?;
        let mut res = self.clone();
        for (row, &c) in res.data.iter_mut().zip(column) {
            row.iter_mut().for_each(|x| *x -= c);
        }
        Ok(res)
    }

    /// Divides every entry of row `i` by `column[i]`, in place.
    pub fn div_column_in_place(&mut self, column: &[f64]) -> Result<()> {
        self.check_column(column, "div_column")?;
        for (row, &c) in self.data.iter_mut().zip(column) {
            row.iter_mut().for_each(|x| *x /= c);
        }
        Ok(())
    }

    pub fn div_column(&self, column: &[f64]) -> Result<Matrix> {
        let mut res = self.clone();
        res.div_column_in_place(column)?;
        Ok(res)
    }

    /// Picks `self[i, labels[i]]` for every row.
    pub fn gather(&self, labels: &[usize]) -> Result<Vec<f64>> {
        if labels.len() != self.rows {
            return Err(SoftmaxError::LabelCount { labels: labels.len(), examples: self.rows });
        }
        labels.iter().enumerate()
            .map(|(i, &label)| {
                self.data[i].get(label).copied().ok_or(SoftmaxError::LabelOutOfRange {
                    index: i,
                    label,
                    classes: self.cols,
                })
            })
            .collect()
    }
}
