//! Fuzz target for the decrypt path
//!
//! Feed arbitrary cipher blocks to an established session
//!
//! # Strategy
//!
//! - Establish a real key via the responder flow, then decrypt garbage
//! - Block lengths from empty to oversized, entries across the i64 range
//!
//! # Invariants
//!
//! - Decryption never panics; every failure is a typed error
//! - An established key is never reported singular (generated factors are
//!   invertible by construction)
//! - Failed decrypts leave the session in `KeyEstablished`

#![no_main]

use echolock_core::{Environment, Session, SessionConfig, SessionError, SessionState};
use echolock_crypto::{AlgebraError, CipherError, Matrix};
use libfuzzer_sys::fuzz_target;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
struct FuzzEnv {
    rng: Arc<Mutex<ChaCha20Rng>>,
}

impl FuzzEnv {
    fn new(seed: u64) -> Self {
        Self { rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))) }
    }
}

impl Environment for FuzzEnv {
    fn unix_time(&self) -> f64 {
        1_700_000_000.0
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap().fill_bytes(buffer);
    }
}

fuzz_target!(|input: (u64, i64, Vec<Vec<i64>>)| {
    let (seed, tk, blocks) = input;

    let mut session = Session::new(FuzzEnv::new(seed), SessionConfig::default());
    if session.derive_tk_direct(tk).is_err() {
        return;
    }
    let masked_a = Matrix::identity(4).add_scalar(tk);
    if session.exchange_matrix(masked_a).is_err() {
        return;
    }

    match session.decrypt(&blocks) {
        Ok(_) => {}
        Err(SessionError::Cipher(CipherError::Algebra(AlgebraError::Singular { .. }))) => {
            panic!("established key reported singular");
        }
        Err(_) => {}
    }

    if session.state() != SessionState::KeyEstablished {
        panic!("decrypt changed session state to {:?}", session.state());
    }
});
