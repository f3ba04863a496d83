//! Matrix block cipher.
//!
//! Messages are encoded as length-n integer vectors of character codes and
//! encrypted by exact integer multiplication with the shared key matrix:
//! `C = Key · P`. Decryption inverts the key over `f64` once per call,
//! applies `Key⁻¹ · C` per block, and rounds ties-to-even back to the exact
//! original integers.
//!
//! # Character Codes
//!
//! Codes are bytes (0-255) mapped through Latin-1. Decryption REJECTS a
//! block that rounds outside that range rather than clamping it; such a
//! block was not produced under this key, and clamping would hand the caller
//! silently corrupted plaintext. Trailing whitespace introduced by block
//! padding is stripped from the recovered string.

use crate::{
    error::CipherError,
    matrix::{Matrix, round_ties_even},
};

/// Padding character appended to fill the final plaintext block.
const PAD_CHAR: char = ' ';

/// Encrypt a plaintext string under the shared key matrix.
///
/// The text is encoded as Latin-1 character codes, padded with spaces to a
/// multiple of the key dimension, and multiplied block-wise: `C = Key · P`
/// in exact integer arithmetic. The key operand order matches what
/// [`decrypt`] inverts.
///
/// # Errors
///
/// - `UnencodableChar` for characters above code 255
/// - `BlockLength` if the key has dimension zero and there is text to encode
/// - `ShapeMismatch` (via algebra) for a non-square key
pub fn encrypt(plaintext: &str, key: &Matrix) -> Result<Vec<Vec<i64>>, CipherError> {
    let n = key.rows();
    let mut codes = Vec::with_capacity(plaintext.len());
    for (position, character) in plaintext.chars().enumerate() {
        let code = u32::from(character);
        if code > 255 {
            return Err(CipherError::UnencodableChar { character, position });
        }
        codes.push(i64::from(code));
    }
    if codes.is_empty() {
        return Ok(Vec::new());
    }
    if n == 0 {
        return Err(CipherError::BlockLength { block: 0, len: codes.len(), expected: 0 });
    }
    while codes.len() % n != 0 {
        codes.push(i64::from(u32::from(PAD_CHAR)));
    }
    let mut blocks = Vec::with_capacity(codes.len() / n);
    for chunk in codes.chunks_exact(n) {
        blocks.push(key.mul_vec(chunk)?);
    }
    Ok(blocks)
}

/// Decrypt cipher blocks under the shared key matrix.
///
/// The key is inverted once and the inverse reused across all blocks of the
/// call. Each block is recovered as `round(Key⁻¹ · C)` and decoded through
/// Latin-1; trailing whitespace from padding is stripped.
///
/// # Errors
///
/// - `Singular` when the key's rounded determinant is zero (a session whose
///   factors were generated invertible should never hit this; it indicates
///   corrupted state)
/// - `BlockLength` when a block's length differs from the key dimension
/// - `CodeOutOfRange` when a recovered code is outside 0-255
pub fn decrypt(blocks: &[Vec<i64>], key: &Matrix) -> Result<String, CipherError> {
    let n = key.rows();
    let inverse = key.invert()?;
    let mut out = String::with_capacity(blocks.len() * n);
    for (block_index, block) in blocks.iter().enumerate() {
        if block.len() != n {
            return Err(CipherError::BlockLength {
                block: block_index,
                len: block.len(),
                expected: n,
            });
        }
        let recovered = inverse.mul_vec(block)?;
        for (index, &value) in recovered.iter().enumerate() {
            let code = round_ties_even(value);
            let byte = u8::try_from(code).map_err(|_| CipherError::CodeOutOfRange {
                block: block_index,
                index,
                value: code,
            })?;
            out.push(char::from(byte));
        }
    }
    Ok(out.trim_end().to_owned())
}
