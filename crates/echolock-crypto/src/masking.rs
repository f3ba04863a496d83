//! Additive transport-key masking.
//!
//! Private matrices never cross the channel in the clear. Each party adds the
//! session transport key (TK) before sending and subtracts it after
//! receiving: `masked = private + TK`, recoverable only by a TK holder.
//!
//! The two historical TK forms are kept numerically distinct:
//!
//! - [`TransportKey::Scalar`] adds one integer uniformly to every entry
//!   (the direct-integer protocol variant).
//! - [`TransportKey::Mask`] adds a full matrix element-wise (the
//!   hash-expansion variant, byte-range entries).
//!
//! A scalar TK of 7 and a 7-filled mask matrix produce the same masked
//! output but are different keys; the variant is part of the session
//! configuration, never inferred from the data.

use zeroize::Zeroize;

use crate::{error::AlgebraError, matrix::Matrix};

/// The session transport key.
///
/// Immutable for the lifetime of a session and zeroized on drop.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportKey {
    /// A single integer, broadcast-added to every matrix entry.
    Scalar(i64),
    /// An n×n additive mask, applied element-wise.
    Mask(Matrix),
}

impl TransportKey {
    /// Mask a private matrix for transmission: `private + TK`.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if a matrix-form TK does not match the private
    /// matrix's dimensions.
    pub fn mask(&self, private: &Matrix) -> Result<Matrix, AlgebraError> {
        match self {
            Self::Scalar(value) => Ok(private.add_scalar(*value)),
            Self::Mask(mask) => private.add(mask),
        }
    }

    /// Recover a private matrix from a masked one: `masked - TK`.
    ///
    /// Exact inverse of [`TransportKey::mask`] for any 64-bit key material
    /// (the addition wraps, so the subtraction reverses it bit-exactly).
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if a matrix-form TK does not match the masked
    /// matrix's dimensions.
    pub fn unmask(&self, masked: &Matrix) -> Result<Matrix, AlgebraError> {
        match self {
            Self::Scalar(value) => Ok(masked.sub_scalar(*value)),
            Self::Mask(mask) => masked.sub(mask),
        }
    }

    /// Dimension of a matrix-form key, `None` for the scalar form.
    #[must_use]
    pub fn mask_size(&self) -> Option<usize> {
        match self {
            Self::Scalar(_) => None,
            Self::Mask(mask) => Some(mask.rows()),
        }
    }
}

impl Zeroize for TransportKey {
    fn zeroize(&mut self) {
        match self {
            Self::Scalar(value) => value.zeroize(),
            Self::Mask(mask) => mask.zeroize(),
        }
    }
}

// TK is a session secret; wipe it when the session releases it.
impl Drop for TransportKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: Vec<Vec<i64>>) -> Matrix {
        match Matrix::from_rows(rows) {
            Ok(m) => m,
            Err(e) => unreachable!("test matrix must be rectangular: {e}"),
        }
    }

    #[test]
    fn scalar_mask_round_trips_doubled_identity() {
        // n=4, TK scalar 7, M_A = 2*I (det 16).
        let private =
            matrix(vec![vec![2, 0, 0, 0], vec![0, 2, 0, 0], vec![0, 0, 2, 0], vec![0, 0, 0, 2]]);
        let tk = TransportKey::Scalar(7);

        let Ok(masked) = tk.mask(&private) else {
            unreachable!("scalar masking cannot fail");
        };

        assert_eq!(
            masked,
            matrix(vec![vec![9, 7, 7, 7], vec![7, 9, 7, 7], vec![7, 7, 9, 7], vec![7, 7, 7, 9]])
        );
        assert_eq!(tk.unmask(&masked), Ok(private), "unmask must recover M_A exactly");
    }

    #[test]
    fn matrix_mask_round_trips() {
        let private = matrix(vec![vec![3, 1], vec![4, 1]]);
        let tk = TransportKey::Mask(matrix(vec![vec![200, 13], vec![0, 255]]));

        let masked = tk.mask(&private);
        let recovered = masked.and_then(|m| tk.unmask(&m));

        assert_eq!(recovered, Ok(private));
    }

    #[test]
    fn matrix_mask_rejects_wrong_size() {
        let private = matrix(vec![vec![3, 1], vec![4, 1]]);
        let tk = TransportKey::Mask(Matrix::identity(3));

        assert!(matches!(tk.mask(&private), Err(AlgebraError::ShapeMismatch { .. })));
    }

    #[test]
    fn extreme_scalar_round_trips() {
        let private = matrix(vec![vec![1, -9], vec![5, 0]]);
        let tk = TransportKey::Scalar(i64::MAX);

        let recovered = tk.mask(&private).and_then(|m| tk.unmask(&m));

        assert_eq!(recovered, Ok(private), "wrapping addition must reverse exactly");
    }

    #[test]
    fn scalar_and_filled_mask_are_distinct_keys() {
        let scalar = TransportKey::Scalar(7);
        let filled = TransportKey::Mask(matrix(vec![vec![7, 7], vec![7, 7]]));

        assert_ne!(scalar, filled);
        assert_eq!(scalar.mask_size(), None);
        assert_eq!(filled.mask_size(), Some(2));
    }
}
