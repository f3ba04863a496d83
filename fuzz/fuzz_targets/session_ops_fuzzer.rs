//! Fuzz target for the session state machine
//!
//! Drive arbitrary operation sequences against a session (HIGH priority)
//!
//! # Strategy
//!
//! - Operations in any order: TK derivation, offers, exchanges, decrypts,
//!   resets, both strategies interleaved
//! - Matrix inputs: session-sized, wrong-sized, ragged values, extremes
//! - Deterministic environment seeded from fuzz input
//!
//! # Invariants
//!
//! - No operation sequence panics; failures are typed errors
//! - `key()` is `Some` exactly in the `KeyEstablished` state
//! - `reset` always returns the session to `Init` with no key

#![no_main]

use arbitrary::Arbitrary;
use echolock_core::{Environment, Session, SessionConfig, SessionState};
use echolock_crypto::Matrix;
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

#[derive(Debug, Arbitrary)]
enum SessionOp {
    DeriveDirect { tk: i64 },
    DeriveFromRtt { millis: u32 },
    OfferMatrix,
    ReceiveMatrix { size: MatrixSize, fill: i64 },
    ExchangeMatrix { size: MatrixSize, fill: i64 },
    EstablishKey,
    Decrypt { blocks: Vec<Vec<i64>> },
    Reset,
}

#[derive(Debug, Arbitrary)]
enum MatrixSize {
    SessionSized,
    Small,
    Large,
    Empty,
}

fn build_matrix(size: &MatrixSize, fill: i64, n: usize) -> Matrix {
    let dim = match size {
        MatrixSize::SessionSized => n,
        MatrixSize::Small => n.saturating_sub(1),
        MatrixSize::Large => n + 1,
        MatrixSize::Empty => 0,
    };
    Matrix::identity(dim).add_scalar(fill)
}

fuzz_target!(|input: (u64, bool, Vec<SessionOp>)| {
    let (seed, hash_strategy, ops) = input;
    let config = if hash_strategy {
        SessionConfig::hash_expansion()
    } else {
        SessionConfig::default()
    };
    let n = config.matrix_size;
    let mut session = Session::new(FuzzEnv::new(seed), config);

    for op in ops {
        match op {
            SessionOp::DeriveDirect { tk } => {
                let _ = session.derive_tk_direct(tk);
            }
            SessionOp::DeriveFromRtt { millis } => {
                let _ = session.derive_tk_from_rtt(f64::from(millis) / 1_000.0);
            }
            SessionOp::OfferMatrix => {
                let _ = session.offer_matrix();
            }
            SessionOp::ReceiveMatrix { size, fill } => {
                let _ = session.receive_matrix(build_matrix(&size, fill, n));
            }
            SessionOp::ExchangeMatrix { size, fill } => {
                let _ = session.exchange_matrix(build_matrix(&size, fill, n));
            }
            SessionOp::EstablishKey => {
                let _ = session.establish_key();
            }
            SessionOp::Decrypt { blocks } => {
                let _ = session.decrypt(&blocks);
            }
            SessionOp::Reset => {
                session.reset();
                if session.state() != SessionState::Init {
                    panic!("reset left session in {:?}", session.state());
                }
                if session.key().is_some() {
                    panic!("reset left key material behind");
                }
            }
        }

        let key_held = session.key().is_some();
        let key_state = session.state() == SessionState::KeyEstablished;
        if key_held != key_state {
            panic!(
                "key presence ({key_held}) disagrees with state {:?}",
                session.state()
            );
        }
    }
});
