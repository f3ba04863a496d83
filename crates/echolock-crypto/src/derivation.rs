//! Transport-key derivation from a round-trip-time measurement.
//!
//! The hash-expansion protocol variant turns an averaged RTT into an n×n
//! byte-range mask matrix:
//!
//! ```text
//! average RTT (seconds)
//!        │  round, ties to even
//!        ▼
//! decimal string ("123")
//!        │  SHA-256, lowercase hex
//!        ▼
//! 64-character digest
//!        │  two-hex-character groups, row-major, cycled as needed
//!        ▼
//! n×n transport-key matrix (entries 0-255)
//! ```
//!
//! Both parties measure the same RTT, so both derive the same digest and the
//! same mask without transmitting it. Derivation is fully deterministic:
//! equal RTT inputs yield bit-identical matrices.
//!
//! Group layout follows the deployed expansion: the digest's 32 byte groups
//! are laid out row-major and repeated cyclically when the matrix needs more
//! entries than one digest provides (an 8×8 mask consumes the digest twice).
//! Derivation therefore fails for lack of material only when the digest
//! contains no complete group at all.

use sha2::{Digest, Sha256};

use crate::{
    error::KeyMaterialError,
    matrix::{Matrix, round_ties_even},
};

/// Lowercase hex SHA-256 digest of the rounded RTT's decimal string.
///
/// The RTT is rounded to whole seconds (ties to even) before hashing, so
/// small jitter between the parties' measurements still converges on the
/// same digest.
#[must_use]
pub fn rtt_digest(average_rtt_secs: f64) -> String {
    let rounded = round_ties_even(average_rtt_secs);
    let digest = Sha256::digest(rounded.to_string().as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let hi = char::from_digit(u32::from(byte >> 4), 16);
        let lo = char::from_digit(u32::from(byte & 0x0f), 16);
        let (Some(hi), Some(lo)) = (hi, lo) else {
            unreachable!("nibbles are always valid base-16 digits");
        };
        out.push(hi);
        out.push(lo);
    }
    out
}

/// Derive an n×n transport-key matrix from an averaged RTT.
///
/// Deterministic: the same RTT always yields the same matrix.
///
/// # Errors
///
/// See [`expand_digest`].
pub fn expand_rtt(average_rtt_secs: f64, size: usize) -> Result<Matrix, KeyMaterialError> {
    expand_digest(&rtt_digest(average_rtt_secs), size)
}

/// Expand a hex digest into an n×n byte-range matrix.
///
/// The digest is partitioned into two-hex-character groups, each parsed as a
/// byte value (0-255) and laid out row-major; the groups repeat cyclically
/// when `size * size` exceeds the group count.
///
/// # Errors
///
/// - `Insufficient` when entries are needed but the digest holds no complete
///   group
/// - `InvalidHexDigit` on any non-hexadecimal character
pub fn expand_digest(digest_hex: &str, size: usize) -> Result<Matrix, KeyMaterialError> {
    let groups = parse_groups(digest_hex)?;
    let required = size * size;
    if required > 0 && groups.is_empty() {
        return Err(KeyMaterialError::Insufficient { required, available: 0 });
    }
    let data = (0..required).map(|i| i64::from(groups[i % groups.len()])).collect();
    let Ok(matrix) = Matrix::new(size, size, data) else {
        unreachable!("row-major data length is size * size by construction");
    };
    Ok(matrix)
}

fn parse_groups(digest_hex: &str) -> Result<Vec<u8>, KeyMaterialError> {
    let bytes = digest_hex.as_bytes();
    let mut groups = Vec::with_capacity(bytes.len() / 2);
    for (index, pair) in bytes.chunks_exact(2).enumerate() {
        let hi = hex_value(pair[0]).ok_or(KeyMaterialError::InvalidHexDigit {
            position: index * 2,
        })?;
        let lo = hex_value(pair[1]).ok_or(KeyMaterialError::InvalidHexDigit {
            position: index * 2 + 1,
        })?;
        groups.push((hi << 4) | lo);
    }
    Ok(groups)
}

fn hex_value(ascii: u8) -> Option<u8> {
    match ascii {
        b'0'..=b'9' => Some(ascii - b'0'),
        b'a'..=b'f' => Some(ascii - b'a' + 10),
        b'A'..=b'F' => Some(ascii - b'A' + 10),
        _ => None,
    }
}
