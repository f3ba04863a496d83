//! Error types for the Echolock primitives.
//!
//! Strongly-typed errors per layer: matrix algebra (shape and singularity),
//! transport-key derivation (digest material), and the block cipher. The
//! session crate converts these upward into its own error type; none of them
//! drive normal control flow.

use thiserror::Error;

/// Errors from integer matrix algebra.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlgebraError {
    /// Operand dimensions are incompatible for the attempted operation.
    #[error(
        "shape mismatch in {operation}: left is {left_rows}x{left_cols}, \
         right is {right_rows}x{right_cols}"
    )]
    ShapeMismatch {
        /// Operation that was attempted
        operation: &'static str,
        /// Left operand rows
        left_rows: usize,
        /// Left operand columns
        left_cols: usize,
        /// Right operand rows
        right_rows: usize,
        /// Right operand columns
        right_cols: usize,
    },

    /// Determinant or inverse requested for a non-square matrix.
    #[error("matrix is not square: {rows}x{cols}")]
    NotSquare {
        /// Row count
        rows: usize,
        /// Column count
        cols: usize,
    },

    /// The determinant rounds to exactly zero.
    ///
    /// Singularity is judged on the ROUNDED determinant, never on a numeric
    /// tolerance. In the matrix-generation path this triggers a fresh draw;
    /// in the decrypt path it is a hard failure.
    #[error("matrix is singular: determinant {determinant} rounds to zero")]
    Singular {
        /// The unrounded determinant
        determinant: f64,
    },

    /// A row list arriving from the boundary was not rectangular.
    #[error("ragged matrix: row {row} has {len} entries, expected {expected}")]
    RaggedRows {
        /// Index of the offending row
        row: usize,
        /// Its length
        len: usize,
        /// Length of the first row
        expected: usize,
    },

    /// Row-major data length does not match the declared dimensions.
    #[error("data length {len} does not match {rows}x{cols}")]
    DataLength {
        /// Provided data length
        len: usize,
        /// Declared rows
        rows: usize,
        /// Declared columns
        cols: usize,
    },
}

/// Errors from hash-expansion transport-key derivation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterialError {
    /// The digest yields no complete byte groups to expand from.
    #[error("insufficient key material: need {required} byte groups, digest provides {available}")]
    Insufficient {
        /// Byte groups required for the configured matrix size
        required: usize,
        /// Complete two-hex-character groups available in the digest
        available: usize,
    },

    /// The digest string contains a non-hexadecimal character.
    #[error("invalid hex digit in digest at position {position}")]
    InvalidHexDigit {
        /// Byte offset of the offending character
        position: usize,
    },
}

/// Errors from the block cipher.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CipherError {
    /// Underlying algebra failure (singular key, shape mismatch).
    #[error(transparent)]
    Algebra(#[from] AlgebraError),

    /// A cipher block's length differs from the key dimension.
    #[error("cipher block {block} has length {len}, key dimension is {expected}")]
    BlockLength {
        /// Index of the offending block
        block: usize,
        /// Its length
        len: usize,
        /// The key dimension n
        expected: usize,
    },

    /// A recovered code fell outside the 0-255 character range.
    ///
    /// Out-of-range codes are rejected, never clamped: a block that rounds
    /// outside the byte range means the ciphertext was not produced under
    /// this key, and clamping would silently corrupt the output.
    #[error("block {block} entry {index} decodes to {value}, outside the 0-255 character range")]
    CodeOutOfRange {
        /// Index of the offending block
        block: usize,
        /// Entry index within the block
        index: usize,
        /// The rounded code
        value: i64,
    },

    /// Plaintext contains a character that cannot be encoded as a byte code.
    #[error("character {character:?} at position {position} is outside the 0-255 code range")]
    UnencodableChar {
        /// The offending character
        character: char,
        /// Its character index in the plaintext
        position: usize,
    },
}

impl CipherError {
    /// Returns true if this error indicates a corrupted session.
    ///
    /// A singular key matrix should be impossible when both private factors
    /// were generated invertible; hitting it means the session state is bad
    /// and the session must be discarded. Input-shaped failures (block
    /// length, out-of-range codes) leave the session usable.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Algebra(AlgebraError::Singular { .. }) => true,
            Self::Algebra(_)
            | Self::BlockLength { .. }
            | Self::CodeOutOfRange { .. }
            | Self::UnencodableChar { .. } => false,
        }
    }
}
