//! Exact integer matrix algebra with float inversion.
//!
//! All session key material in Echolock is an n×n integer matrix. This module
//! provides the arithmetic the protocol is built on: element-wise addition and
//! subtraction (masking), the matrix product (key establishment), and
//! inversion over `f64` followed by rounding back to integers (decryption).
//!
//! # Numeric Contract
//!
//! - Integer arithmetic wraps on overflow (two's complement). Protocol values
//!   stay far below the 64-bit limits, and wrapping keeps additive masking
//!   exactly reversible for any 64-bit transport key.
//! - Rounding is nearest-integer with ties to even (banker's rounding). This
//!   is the correctness-critical contract for recovering exact integers from
//!   a float inverse; see [`round_ties_even`].
//! - A matrix counts as singular when its determinant ROUNDS to zero, not
//!   when it is within a tolerance of zero. A matrix with exact determinant
//!   0.3 is rejected; one with determinant 1.4 is accepted. This mirrors the
//!   deployed protocol and is relied on by the invertible-matrix generator.

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::AlgebraError;

/// Round to the nearest integer, ties to even.
///
/// `0.5` rounds to `0`, `1.5` and `2.5` both round to `2`, `-1.5` rounds to
/// `-2`. Non-finite inputs saturate (`NaN` becomes `0`), so the conversion
/// itself never fails.
#[must_use]
pub fn round_ties_even(value: f64) -> i64 {
    value.round_ties_even() as i64
}

/// An n×m integer matrix, stored row-major.
///
/// Serializes as a list of rows (`Vec<Vec<i64>>`), the shape the excluded
/// transport layer exchanges. Deserialization validates rectangularity, so a
/// ragged array from an untrusted boundary is rejected before any arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<i64>>", into = "Vec<Vec<i64>>")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<i64>,
}

impl Matrix {
    /// Create a matrix from row-major data.
    ///
    /// # Errors
    ///
    /// `DataLength` if `data.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, data: Vec<i64>) -> Result<Self, AlgebraError> {
        if data.len() != rows * cols {
            return Err(AlgebraError::DataLength { len: data.len(), rows, cols });
        }
        Ok(Self { rows, cols, data })
    }

    /// Create a matrix from a list of rows, validating rectangularity.
    ///
    /// # Errors
    ///
    /// `RaggedRows` if any row's length differs from the first row's.
    pub fn from_rows(rows: Vec<Vec<i64>>) -> Result<Self, AlgebraError> {
        let row_count = rows.len();
        let col_count = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(row_count * col_count);
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != col_count {
                return Err(AlgebraError::RaggedRows {
                    row: index,
                    len: row.len(),
                    expected: col_count,
                });
            }
            data.extend_from_slice(&row);
        }
        Ok(Self { rows: row_count, cols: col_count, data })
    }

    /// The n×n zero matrix.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self { rows, cols, data: vec![0; rows * cols] }
    }

    /// The n×n identity matrix.
    #[must_use]
    pub fn identity(size: usize) -> Self {
        let mut matrix = Self::zeros(size, size);
        for i in 0..size {
            matrix.data[i * size + i] = 1;
        }
        matrix
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// True if the matrix is square.
    #[must_use]
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Entry at (`row`, `col`).
    ///
    /// # Panics
    ///
    /// Panics if the indices are out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> i64 {
        self.data[row * self.cols + col]
    }

    /// Copy out as a list of rows.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<i64>> {
        self.data.chunks(self.cols.max(1)).map(<[i64]>::to_vec).collect()
    }

    /// Element-wise sum. Masking is this operation with the transport key.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if the dimensions differ.
    pub fn add(&self, other: &Self) -> Result<Self, AlgebraError> {
        self.require_same_shape("add", other)?;
        let data =
            self.data.iter().zip(&other.data).map(|(a, b)| a.wrapping_add(*b)).collect();
        Ok(Self { rows: self.rows, cols: self.cols, data })
    }

    /// Element-wise difference. Unmasking is this operation.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if the dimensions differ.
    pub fn sub(&self, other: &Self) -> Result<Self, AlgebraError> {
        self.require_same_shape("sub", other)?;
        let data =
            self.data.iter().zip(&other.data).map(|(a, b)| a.wrapping_sub(*b)).collect();
        Ok(Self { rows: self.rows, cols: self.cols, data })
    }

    /// Add a scalar to every entry (broadcast form of masking).
    #[must_use]
    pub fn add_scalar(&self, scalar: i64) -> Self {
        let data = self.data.iter().map(|a| a.wrapping_add(scalar)).collect();
        Self { rows: self.rows, cols: self.cols, data }
    }

    /// Subtract a scalar from every entry (broadcast form of unmasking).
    #[must_use]
    pub fn sub_scalar(&self, scalar: i64) -> Self {
        let data = self.data.iter().map(|a| a.wrapping_sub(scalar)).collect();
        Self { rows: self.rows, cols: self.cols, data }
    }

    /// Matrix product `self * other`.
    ///
    /// Matrix multiplication is not commutative; the key-establishment step
    /// fixes the operand order (initiator's matrix on the left) for both
    /// parties.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` unless `self.cols == other.rows`.
    pub fn mul(&self, other: &Self) -> Result<Self, AlgebraError> {
        if self.cols != other.rows {
            return Err(self.shape_mismatch("mul", other.rows, other.cols));
        }
        let mut data = vec![0i64; self.rows * other.cols];
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.data[i * self.cols + k];
                if a == 0 {
                    continue;
                }
                for j in 0..other.cols {
                    let product = a.wrapping_mul(other.data[k * other.cols + j]);
                    let cell = &mut data[i * other.cols + j];
                    *cell = cell.wrapping_add(product);
                }
            }
        }
        Ok(Self { rows: self.rows, cols: other.cols, data })
    }

    /// Matrix times column vector.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` unless `self.cols == vector.len()`.
    pub fn mul_vec(&self, vector: &[i64]) -> Result<Vec<i64>, AlgebraError> {
        if self.cols != vector.len() {
            return Err(self.shape_mismatch("mul_vec", vector.len(), 1));
        }
        let mut out = vec![0i64; self.rows];
        for i in 0..self.rows {
            let mut acc = 0i64;
            for j in 0..self.cols {
                acc = acc.wrapping_add(self.data[i * self.cols + j].wrapping_mul(vector[j]));
            }
            out[i] = acc;
        }
        Ok(out)
    }

    /// Determinant, computed over `f64` by LU elimination with partial
    /// pivoting.
    ///
    /// # Errors
    ///
    /// `NotSquare` for non-square matrices.
    pub fn determinant(&self) -> Result<f64, AlgebraError> {
        if !self.is_square() {
            return Err(AlgebraError::NotSquare { rows: self.rows, cols: self.cols });
        }
        let n = self.rows;
        let mut a: Vec<f64> = self.data.iter().map(|&v| v as f64).collect();
        let mut det = 1.0f64;
        for col in 0..n {
            let pivot_row = pivot_search(&a, n, col);
            if a[pivot_row * n + col] == 0.0 {
                return Ok(0.0);
            }
            if pivot_row != col {
                swap_rows(&mut a, n, pivot_row, col);
                det = -det;
            }
            let pivot = a[col * n + col];
            det *= pivot;
            for row in (col + 1)..n {
                let factor = a[row * n + col] / pivot;
                if factor == 0.0 {
                    continue;
                }
                for j in col..n {
                    a[row * n + j] -= factor * a[col * n + j];
                }
            }
        }
        Ok(det)
    }

    /// Float inverse via Gauss-Jordan elimination with partial pivoting.
    ///
    /// Fails when the determinant ROUNDS to exactly zero (see the module's
    /// numeric contract). The returned [`FloatMatrix`] is meant to be applied
    /// to integer vectors and rounded back with
    /// [`FloatMatrix::round_to_integer`] or [`round_ties_even`].
    ///
    /// # Errors
    ///
    /// - `NotSquare` for non-square matrices
    /// - `Singular` when the rounded determinant is zero
    pub fn invert(&self) -> Result<FloatMatrix, AlgebraError> {
        let det = self.determinant()?;
        if round_ties_even(det) == 0 {
            return Err(AlgebraError::Singular { determinant: det });
        }
        let n = self.rows;
        let mut a: Vec<f64> = self.data.iter().map(|&v| v as f64).collect();
        let mut inv = FloatMatrix::identity(n);
        for col in 0..n {
            let pivot_row = pivot_search(&a, n, col);
            if a[pivot_row * n + col] == 0.0 {
                // The rounded-determinant gate above admits matrices this
                // close to singular only when the determinant itself is
                // nonzero, so an exactly-zero pivot column cannot be reached
                // from integer entries. Kept as a typed failure rather than
                // an assertion.
                return Err(AlgebraError::Singular { determinant: det });
            }
            if pivot_row != col {
                swap_rows(&mut a, n, pivot_row, col);
                swap_rows(&mut inv.data, n, pivot_row, col);
            }
            let pivot = a[col * n + col];
            for j in 0..n {
                a[col * n + j] /= pivot;
                inv.data[col * n + j] /= pivot;
            }
            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = a[row * n + col];
                if factor == 0.0 {
                    continue;
                }
                for j in 0..n {
                    a[row * n + j] -= factor * a[col * n + j];
                    inv.data[row * n + j] -= factor * inv.data[col * n + j];
                }
            }
        }
        Ok(inv)
    }

    fn require_same_shape(
        &self,
        operation: &'static str,
        other: &Self,
    ) -> Result<(), AlgebraError> {
        if self.rows == other.rows && self.cols == other.cols {
            Ok(())
        } else {
            Err(self.shape_mismatch(operation, other.rows, other.cols))
        }
    }

    fn shape_mismatch(
        &self,
        operation: &'static str,
        right_rows: usize,
        right_cols: usize,
    ) -> AlgebraError {
        AlgebraError::ShapeMismatch {
            operation,
            left_rows: self.rows,
            left_cols: self.cols,
            right_rows,
            right_cols,
        }
    }
}

// Private matrices and the established key are session secrets.
impl Zeroize for Matrix {
    fn zeroize(&mut self) {
        self.data.zeroize();
    }
}

impl TryFrom<Vec<Vec<i64>>> for Matrix {
    type Error = AlgebraError;

    fn try_from(rows: Vec<Vec<i64>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<Matrix> for Vec<Vec<i64>> {
    fn from(matrix: Matrix) -> Self {
        matrix.to_rows()
    }
}

/// A float matrix produced by [`Matrix::invert`].
///
/// Never crosses the protocol boundary; it exists to be applied to cipher
/// blocks and rounded straight back to integers.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl FloatMatrix {
    fn identity(size: usize) -> Self {
        let mut data = vec![0.0f64; size * size];
        for i in 0..size {
            data[i * size + i] = 1.0;
        }
        Self { rows: size, cols: size, data }
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Entry at (`row`, `col`).
    ///
    /// # Panics
    ///
    /// Panics if the indices are out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Apply to an integer column vector.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` unless `self.cols == vector.len()`.
    pub fn mul_vec(&self, vector: &[i64]) -> Result<Vec<f64>, AlgebraError> {
        if self.cols != vector.len() {
            return Err(AlgebraError::ShapeMismatch {
                operation: "mul_vec",
                left_rows: self.rows,
                left_cols: self.cols,
                right_rows: vector.len(),
                right_cols: 1,
            });
        }
        let mut out = vec![0.0f64; self.rows];
        for i in 0..self.rows {
            let mut acc = 0.0f64;
            for j in 0..self.cols {
                acc += self.data[i * self.cols + j] * vector[j] as f64;
            }
            out[i] = acc;
        }
        Ok(out)
    }

    /// Round every entry back to integers, ties to even.
    #[must_use]
    pub fn round_to_integer(&self) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&v| round_ties_even(v)).collect(),
        }
    }
}

fn pivot_search(a: &[f64], n: usize, col: usize) -> usize {
    let mut best = col;
    let mut best_abs = a[col * n + col].abs();
    for row in (col + 1)..n {
        let candidate = a[row * n + col].abs();
        if candidate > best_abs {
            best = row;
            best_abs = candidate;
        }
    }
    best
}

fn swap_rows(a: &mut [f64], n: usize, first: usize, second: usize) {
    for j in 0..n {
        a.swap(first * n + j, second * n + j);
    }
}
