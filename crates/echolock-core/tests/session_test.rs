//! End-to-end session scenarios: both roles of the exchange run in-process
//! against each other.

use std::sync::{Arc, Mutex};

use echolock_core::{
    DerivationStrategy, Environment, Session, SessionConfig, SessionError, SessionState,
};
use echolock_crypto::{Matrix, cipher, derivation};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

// Deterministic test environment: seeded RNG, fixed clock.
#[derive(Clone)]
struct SeededEnv {
    rng: Arc<Mutex<ChaCha20Rng>>,
    now: f64,
}

impl SeededEnv {
    fn new(seed: u64) -> Self {
        Self { rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))), now: 1_700_000_000.0 }
    }
}

impl Environment for SeededEnv {
    fn unix_time(&self) -> f64 {
        self.now
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap().fill_bytes(buffer);
    }
}

fn run_exchange(
    initiator: &mut Session<SeededEnv>,
    responder: &mut Session<SeededEnv>,
) -> (Matrix, Matrix) {
    let masked_a = initiator.offer_matrix().unwrap();
    let masked_b = responder.exchange_matrix(masked_a).unwrap();
    initiator.receive_matrix(masked_b).unwrap();
    initiator.establish_key().unwrap();

    (initiator.key().unwrap().clone(), responder.key().unwrap().clone())
}

#[test]
fn direct_tk_exchange_agrees_on_the_key() {
    let mut initiator = Session::new(SeededEnv::new(11), SessionConfig::default());
    let mut responder = Session::new(SeededEnv::new(22), SessionConfig::default());

    initiator.derive_tk_direct(982_451_653).unwrap();
    responder.derive_tk_direct(982_451_653).unwrap();

    let (key_initiator, key_responder) = run_exchange(&mut initiator, &mut responder);

    assert_eq!(key_initiator, key_responder, "both parties must hold a bit-identical key");
    assert_eq!(initiator.state(), SessionState::KeyEstablished);
    assert_eq!(responder.state(), SessionState::KeyEstablished);
}

#[test]
fn encrypted_message_crosses_the_session_boundary() {
    let mut initiator = Session::new(SeededEnv::new(33), SessionConfig::default());
    let mut responder = Session::new(SeededEnv::new(44), SessionConfig::default());
    initiator.derive_tk_direct(7).unwrap();
    responder.derive_tk_direct(7).unwrap();
    let (key_initiator, _) = run_exchange(&mut initiator, &mut responder);

    let message = "attack at dawn";
    let blocks = cipher::encrypt(message, &key_initiator).unwrap();
    let recovered = responder.decrypt(&blocks).unwrap();

    assert_eq!(recovered, message);
}

#[test]
fn rtt_derived_sessions_agree_without_transmitting_the_key() {
    let config = SessionConfig::hash_expansion();
    let mut initiator = Session::new(SeededEnv::new(55), config.clone());
    let mut responder = Session::new(SeededEnv::new(66), config);

    // Both parties measured the same average RTT; neither sends the TK.
    initiator.derive_tk_from_rtt(123.456).unwrap();
    responder.derive_tk_from_rtt(123.456).unwrap();

    let (key_initiator, key_responder) = run_exchange(&mut initiator, &mut responder);
    assert_eq!(key_initiator, key_responder);

    let blocks = cipher::encrypt("rtt variant", &key_initiator).unwrap();
    assert_eq!(responder.decrypt(&blocks).unwrap(), "rtt variant");
}

#[test]
fn jittered_rtt_measurements_still_agree() {
    // 122.9 and 123.2 both round to 123 before hashing.
    let config = SessionConfig::hash_expansion();
    let mut initiator = Session::new(SeededEnv::new(77), config.clone());
    let mut responder = Session::new(SeededEnv::new(88), config);

    initiator.derive_tk_from_rtt(122.9).unwrap();
    responder.derive_tk_from_rtt(123.2).unwrap();

    let (key_initiator, key_responder) = run_exchange(&mut initiator, &mut responder);

    assert_eq!(key_initiator, key_responder);
}

#[test]
fn rtt_mask_matches_the_reference_digest() {
    // The session's TK matrix is SHA-256("123") laid out row-major; the
    // first entry is 0xa6 = 166. Recover the mask by exchanging a known
    // matrix and comparing against a direct expansion.
    let expected = derivation::expand_rtt(123.456, 4).unwrap();
    let reference = hex::decode(derivation::rtt_digest(123.456)).unwrap();

    assert_eq!(expected.get(0, 0), i64::from(reference[0]));
    assert_eq!(expected.get(0, 0), 166);
}

#[test]
fn doubled_identity_scenario_recovers_exactly() {
    // n=4, scalar TK 7, M_A = 2*I (det 16): the responder must unmask M_A
    // exactly, so Key = 2 * M_B and every key entry is even.
    let mut responder = Session::new(SeededEnv::new(99), SessionConfig::default());
    responder.derive_tk_direct(7).unwrap();

    let doubled = Matrix::identity(4).add(&Matrix::identity(4)).unwrap();
    let masked_a = doubled.add_scalar(7);

    responder.exchange_matrix(masked_a).unwrap();

    let key = responder.key().unwrap();
    for row in key.to_rows() {
        for entry in row {
            assert_eq!(entry % 2, 0, "Key = 2*M_B must have even entries");
        }
    }
}

#[test]
fn out_of_order_calls_are_rejected_and_recoverable() {
    let mut responder = Session::new(SeededEnv::new(111), SessionConfig::default());

    let err = responder.decrypt(&[vec![1, 2, 3, 4]]).unwrap_err();
    assert!(matches!(err, SessionError::InvalidState { .. }));
    assert!(!err.is_fatal(), "order violations are recoverable");

    // Completing the prerequisite steps afterwards succeeds.
    responder.derive_tk_direct(1).unwrap();
    let masked_b = responder.exchange_matrix(Matrix::identity(4).add_scalar(1));
    assert!(masked_b.is_ok());
}

#[test]
fn garbage_blocks_fail_without_corrupting_the_session() {
    let mut initiator = Session::new(SeededEnv::new(121), SessionConfig::default());
    let mut responder = Session::new(SeededEnv::new(131), SessionConfig::default());
    initiator.derive_tk_direct(3).unwrap();
    responder.derive_tk_direct(3).unwrap();
    let (key_initiator, _) = run_exchange(&mut initiator, &mut responder);

    // Blocks that were never encrypted under the key decode out of range.
    let garbage = vec![vec![1_000_000, -1_000_000, 3, 4]];
    let err = responder.decrypt(&garbage).unwrap_err();
    assert!(matches!(err, SessionError::Cipher(_)));
    assert!(!err.is_fatal());

    // The session still decrypts real traffic.
    let blocks = cipher::encrypt("still alive", &key_initiator).unwrap();
    assert_eq!(responder.decrypt(&blocks).unwrap(), "still alive");
}

#[test]
fn reset_supports_a_second_exchange() {
    let mut initiator = Session::new(SeededEnv::new(141), SessionConfig::default());
    let mut responder = Session::new(SeededEnv::new(151), SessionConfig::default());
    initiator.derive_tk_direct(5).unwrap();
    responder.derive_tk_direct(5).unwrap();
    let (first_initiator, _) = run_exchange(&mut initiator, &mut responder);

    initiator.reset();
    responder.reset();
    assert_eq!(initiator.state(), SessionState::Init);

    initiator.derive_tk_direct(9).unwrap();
    responder.derive_tk_direct(9).unwrap();
    let (second_initiator, second_responder) = run_exchange(&mut initiator, &mut responder);

    assert_eq!(second_initiator, second_responder);
    assert_ne!(
        first_initiator, second_initiator,
        "fresh random matrices must give a fresh key"
    );
}

#[test]
fn strategy_is_enforced_per_session() {
    let mut session = Session::new(SeededEnv::new(161), SessionConfig::default());

    let err = session.derive_tk_from_rtt(5.0).unwrap_err();

    assert_eq!(
        err,
        SessionError::StrategyMismatch {
            configured: DerivationStrategy::DirectInteger,
            operation: "derive_tk_from_rtt"
        }
    );
    assert!(err.is_fatal(), "a misconfigured caller cannot make progress");
}
