//! Property-based tests for the matrix primitives

use echolock_crypto::{AlgebraError, Matrix, TransportKey, decrypt, encrypt, round_ties_even};
use proptest::prelude::*;

fn build(size: usize, data: Vec<i64>) -> Matrix {
    match Matrix::new(size, size, data) {
        Ok(matrix) => matrix,
        Err(e) => unreachable!("strategy always supplies size*size entries: {e}"),
    }
}

fn square_matrix(size: usize) -> impl Strategy<Value = Matrix> {
    prop::collection::vec(-1_000i64..1_000, size * size)
        .prop_map(move |data| build(size, data))
}

fn matrix_pair() -> impl Strategy<Value = (Matrix, Matrix)> {
    (1usize..=4).prop_flat_map(|size| (square_matrix(size), square_matrix(size)))
}

/// Property: scalar masking round-trips for any key and matrix
#[test]
fn prop_scalar_mask_round_trips() {
    proptest!(|((private, _) in matrix_pair(), tk_value in any::<i64>())| {
        let tk = TransportKey::Scalar(tk_value);

        let masked = tk.mask(&private)?;
        let recovered = tk.unmask(&masked)?;

        prop_assert_eq!(recovered, private);
    });
}

/// Property: matrix masking round-trips for any same-size mask
#[test]
fn prop_matrix_mask_round_trips() {
    proptest!(|((private, mask) in matrix_pair())| {
        let tk = TransportKey::Mask(mask);

        let masked = tk.mask(&private)?;
        let recovered = tk.unmask(&masked)?;

        prop_assert_eq!(recovered, private);
    });
}

/// Property: masking is concealing for nonzero keys (masked != private
/// unless the key is the zero mask)
#[test]
fn prop_scalar_mask_changes_entries() {
    proptest!(|((private, _) in matrix_pair(), tk_value in 1i64..1_000_000)| {
        let tk = TransportKey::Scalar(tk_value);

        let masked = tk.mask(&private)?;

        prop_assert_ne!(masked, private);
    });
}

/// Property: encrypt/decrypt round-trips printable text under an
/// invertible small-entry key (the range the protocol generates)
#[test]
fn prop_encrypt_decrypt_round_trips() {
    proptest!(|(
        size in 2usize..=4,
        raw in prop::collection::vec(1i64..=9, 16),
        message in "[ -~]{0,32}",
    )| {
        let key = build(size, raw[..size * size].to_vec());
        prop_assume!(round_ties_even(key.determinant()?) != 0);

        let blocks = encrypt(&message, &key)?;
        let recovered = decrypt(&blocks, &key)?;

        prop_assert_eq!(recovered, message.trim_end());
    });
}

/// Property: a matrix with two identical rows has determinant zero and
/// never inverts
#[test]
fn prop_duplicate_row_matrix_is_singular() {
    proptest!(|(size in 2usize..=4, row in prop::collection::vec(-9i64..=9, 4))| {
        let mut rows = vec![row[..size].to_vec(); size];
        // Perturb all rows after the first two so only one duplication is
        // guaranteed.
        for (index, r) in rows.iter_mut().enumerate().skip(2) {
            r[0] = r[0].wrapping_add(index as i64);
        }
        let matrix = match Matrix::from_rows(rows) {
            Ok(m) => m,
            Err(e) => unreachable!("rows are rectangular: {e}"),
        };

        let det = matrix.determinant()?;
        prop_assert_eq!(round_ties_even(det), 0);
        prop_assert!(matches!(matrix.invert(), Err(AlgebraError::Singular { .. })));
    });
}

/// Property: rounding a float inverse of a det=±1 integer matrix times the
/// matrix itself gives the identity
#[test]
fn prop_unimodular_inverse_is_exact() {
    proptest!(|(shear in -50i64..=50)| {
        // [[1, s], [0, 1]] has det 1 for every shear s.
        let matrix = build(2, vec![1, shear, 0, 1]);

        let inverse = matrix.invert()?;

        prop_assert_eq!(inverse.round_to_integer(), build(2, vec![1, -shear, 0, 1]));
    });
}
