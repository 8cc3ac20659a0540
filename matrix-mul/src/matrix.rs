//! Dense row-major matrix of f64.

use rand::Rng;

use crate::Error;

/// A `rows × cols` matrix stored as one flat row-major buffer.
///
/// The buffer is what travels between ranks, so it is exposed directly
/// through [`values`](Self::values) and [`values_mut`](Self::values_mut).
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl Matrix {
    /// A zero-filled matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: vec![0.0; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut matrix = Self::zeros(n, n);
        for i in 0..n {
            matrix.set(i, i, 1.0);
        }
        matrix
    }

    pub fn from_vec(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self, Error> {
        if values.len() != rows * cols {
            return Err(Error::Shape {
                rows,
                cols,
                len: values.len(),
            });
        }
        Ok(Self { rows, cols, values })
    }

    /// Builds a matrix from nested rows, which must all have the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, Error> {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, |row| row.len());
        let mut values = Vec::with_capacity(nrows * ncols);
        for row in rows {
            if row.len() != ncols {
                return Err(Error::Shape {
                    rows: nrows,
                    cols: ncols,
                    len: row.len(),
                });
            }
            values.extend(row);
        }
        Ok(Self {
            rows: nrows,
            cols: ncols,
            values,
        })
    }

    /// Fills row after row with 1, 2, 3, ...
    pub fn sequential(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: (1..=rows * cols).map(|v| v as f64).collect(),
        }
    }

    /// Uniform values in `[-1, 1)`.
    pub fn random<R: Rng>(rows: usize, cols: usize, rng: &mut R) -> Self {
        Self {
            rows,
            cols,
            values: (0..rows * cols).map(|_| rng.gen_range(-1.0..1.0)).collect(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.values[row * self.cols + col] = value;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.cols..(row + 1) * self.cols]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.rows).map(|r| self.row(r).to_vec()).collect()
    }

    /// Checks that `first × second` is defined and fits in `result`.
    pub fn check_product(first: &Matrix, second: &Matrix, result: &Matrix) -> Result<(), Error> {
        if first.cols != second.rows {
            return Err(Error::DimensionMismatch(
                first.rows,
                first.cols,
                second.rows,
                second.cols,
            ));
        }
        if result.rows != first.rows || result.cols != second.cols {
            return Err(Error::ResultShape {
                expected_rows: first.rows,
                expected_cols: second.cols,
                rows: result.rows,
                cols: result.cols,
            });
        }
        Ok(())
    }
}
