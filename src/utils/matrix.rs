//! Row-major matrix of f64 values
//!
//! Batches are laid out as `batch_size × features`: one sample per row. Every
//! binary operation checks its operands' shapes and returns
//! `NetworkError::ShapeMismatch` rather than panicking.

use crate::error::{NetworkError, Result};
use crate::utils::rng::SimpleRng;

/// Dense row-major matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Matrix of the given shape filled with zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Wrap a flat row-major buffer.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(NetworkError::ShapeMismatch {
                op: "from_vec",
                expected: format!("{} values", rows * cols),
                found: format!("{} values", data.len()),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from nested rows; every row must have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(NetworkError::shape(
                    "from_rows",
                    (rows.len(), cols),
                    (rows.len(), row.len()),
                ));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Matrix whose entries are drawn uniformly from [low, high).
    pub fn random_uniform(rows: usize, cols: usize, low: f64, high: f64, rng: &mut SimpleRng) -> Self {
        let data = (0..rows * cols).map(|_| rng.gen_range_f64(low, high)).collect();
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Overwrite a single entry; out-of-range indices are a shape error.
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        if row >= self.rows || col >= self.cols {
            return Err(NetworkError::shape("set", self.shape(), (row + 1, col + 1)));
        }
        self.data[row * self.cols + col] = value;
        Ok(())
    }

    /// Slice of one row, or `None` past the last row.
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.cols;
        self.data.get(start..start + self.cols)
    }

    pub fn transpose(&self) -> Matrix {
        let mut data = vec![0.0; self.data.len()];
        for r in 0..self.rows {
            for c in 0..self.cols {
                data[c * self.rows + r] = self.data[r * self.cols + c];
            }
        }
        Matrix {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }

    /// Matrix product `self @ rhs`.
    pub fn matmul(&self, rhs: &Matrix) -> Result<Matrix> {
        if self.cols != rhs.rows {
            return Err(NetworkError::shape(
                "matmul",
                (self.cols, rhs.cols),
                (rhs.rows, rhs.cols),
            ));
        }
        let mut out = vec![0.0; self.rows * rhs.cols];
        // i-k-j order keeps the inner loop on contiguous rows of both operands
        for i in 0..self.rows {
            let out_row = &mut out[i * rhs.cols..(i + 1) * rhs.cols];
            for k in 0..self.cols {
                let a = self.data[i * self.cols + k];
                let rhs_row = &rhs.data[k * rhs.cols..(k + 1) * rhs.cols];
                for (o, &b) in out_row.iter_mut().zip(rhs_row) {
                    *o += a * b;
                }
            }
        }
        Ok(Matrix {
            rows: self.rows,
            cols: rhs.cols,
            data: out,
        })
    }

    /// Add `vector` to every row (bias broadcast over the batch axis).
    pub fn add_row_vector(&self, vector: &[f64]) -> Result<Matrix> {
        if vector.len() != self.cols {
            return Err(NetworkError::shape(
                "add_row_vector",
                (1, self.cols),
                (1, vector.len()),
            ));
        }
        let mut out = self.clone();
        for row in out.data.chunks_exact_mut(self.cols.max(1)) {
            for (value, b) in row.iter_mut().zip(vector) {
                *value += b;
            }
        }
        Ok(out)
    }

    /// Elementwise product.
    pub fn hadamard(&self, rhs: &Matrix) -> Result<Matrix> {
        self.zip_with("hadamard", rhs, |a, b| a * b)
    }

    /// Elementwise difference `self - rhs`.
    pub fn sub(&self, rhs: &Matrix) -> Result<Matrix> {
        self.zip_with("sub", rhs, |a, b| a - b)
    }

    fn zip_with(&self, op: &'static str, rhs: &Matrix, f: impl Fn(f64, f64) -> f64) -> Result<Matrix> {
        if self.shape() != rhs.shape() {
            return Err(NetworkError::shape(op, self.shape(), rhs.shape()));
        }
        let data = self
            .data
            .iter()
            .zip(&rhs.data)
            .map(|(&a, &b)| f(a, b))
            .collect();
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    /// Apply `f` to every entry.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    pub fn scale(&self, scalar: f64) -> Matrix {
        self.map(|x| x * scalar)
    }

    /// In-place `self -= scalar * rhs`.
    pub fn sub_assign_scaled(&mut self, scalar: f64, rhs: &Matrix) -> Result<()> {
        if self.shape() != rhs.shape() {
            return Err(NetworkError::shape("sub_assign_scaled", self.shape(), rhs.shape()));
        }
        for (value, &delta) in self.data.iter_mut().zip(&rhs.data) {
            *value -= scalar * delta;
        }
        Ok(())
    }

    /// Column means: the mean over the batch axis, one value per column.
    pub fn mean_rows(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.cols];
        for row in self.data.chunks_exact(self.cols.max(1)) {
            for (sum, &value) in sums.iter_mut().zip(row) {
                *sum += value;
            }
        }
        if self.rows > 0 {
            let inv = 1.0 / self.rows as f64;
            for sum in &mut sums {
                *sum *= inv;
            }
        }
        sums
    }

    /// Index of the maximum entry of each row.
    ///
    /// The first maximum wins on ties. A NaN compares above every number, so a
    /// row containing NaN reports its first NaN. Zero-width rows report 0.
    pub fn argmax_rows(&self) -> Vec<usize> {
        (0..self.rows)
            .map(|r| self.row(r).map_or(0, argmax))
            .collect()
    }

    /// Sum of all entries.
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }
}

fn argmax(row: &[f64]) -> usize {
    let mut best = 0;
    for (i, &value) in row.iter().enumerate() {
        if value.is_nan() {
            return i;
        }
        if value > row[best] {
            best = i;
        }
    }
    best
}
