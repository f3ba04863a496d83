//! Key-agreement session state machine.
//!
//! Owns all per-exchange state (transport key, private matrices, shared
//! key) as one value object with exclusive ownership: every operation takes
//! `&mut self`, so Rust's borrow rules serialize the four-step transition
//! without any internal locking. The machine is pure with respect to I/O;
//! time and entropy come from the injected [`Environment`].
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ derive_tk_* ┌───────────────┐ matrices held ┌───────────────────┐
//! │ Init │────────────>│ TkEstablished │──────────────>│ MatricesExchanged │
//! └──────┘             └───────────────┘               └───────────────────┘
//!     ↑                                                          │
//!     │ reset (any state)                                        │ establish_key
//!     │                                                ┌────────────────┐
//!     └────────────────────────────────────────────────│ KeyEstablished │
//!                                                      └────────────────┘
//! ```
//!
//! The responder reaches `MatricesExchanged` inside [`Session::exchange_matrix`],
//! which unmasks the initiator's matrix, generates its own, and establishes
//! the key in one call (one request, one response). The initiator takes the
//! three steps individually: [`Session::offer_matrix`],
//! [`Session::receive_matrix`], [`Session::establish_key`].
//!
//! Out-of-order calls are rejected with a typed error naming the current
//! state; stale or default state is never silently used. A session that
//! fails fatally (see [`SessionError::is_fatal`]) must be discarded or
//! [`Session::reset`].

use echolock_crypto::{
    AlgebraError, Matrix, TransportKey, cipher, derivation, matrix::round_ties_even,
};
use zeroize::Zeroize;

use crate::{env::Environment, error::SessionError};

/// Matrix dimension agreed out-of-band by both parties.
pub const DEFAULT_MATRIX_SIZE: usize = 4;

/// Smallest private-matrix entry drawn by the generator.
pub const DEFAULT_ENTRY_MIN: i64 = 1;

/// Largest private-matrix entry drawn by the generator.
///
/// The 1-9 range keeps determinants well-conditioned, so a random draw is
/// almost always invertible.
pub const DEFAULT_ENTRY_MAX: i64 = 9;

/// Random draws allowed before invertible-matrix generation gives up.
pub const DEFAULT_MAX_KEYGEN_ATTEMPTS: u32 = 10_000;

/// Idle seconds before [`Session::is_expired`] reports the session stale.
pub const DEFAULT_IDLE_TIMEOUT_SECS: f64 = 300.0;

/// How the session's transport key is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationStrategy {
    /// The initiator supplies an arbitrary integer TK established by a
    /// prior agreement; it is stored verbatim, without validation.
    DirectInteger,
    /// Both parties expand SHA-256 of the rounded average RTT into an n×n
    /// mask matrix.
    HashExpansion,
}

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport key yet.
    Init,
    /// Both parties hold the transport key.
    TkEstablished,
    /// Both private matrices are held locally; key not yet computed.
    MatricesExchanged,
    /// The shared key matrix is established; decryption is available.
    KeyEstablished,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Matrix dimension n; all matrices in the session are n×n.
    pub matrix_size: usize,
    /// Transport-key derivation strategy.
    pub strategy: DerivationStrategy,
    /// Inclusive lower bound for generated private-matrix entries.
    pub entry_min: i64,
    /// Inclusive upper bound for generated private-matrix entries.
    pub entry_max: i64,
    /// Retry budget for invertible-matrix generation.
    pub max_keygen_attempts: u32,
    /// Idle seconds before the session counts as expired.
    pub idle_timeout_secs: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            matrix_size: DEFAULT_MATRIX_SIZE,
            strategy: DerivationStrategy::DirectInteger,
            entry_min: DEFAULT_ENTRY_MIN,
            entry_max: DEFAULT_ENTRY_MAX,
            max_keygen_attempts: DEFAULT_MAX_KEYGEN_ATTEMPTS,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
        }
    }
}

impl SessionConfig {
    /// Default configuration with the hash-expansion strategy.
    #[must_use]
    pub fn hash_expansion() -> Self {
        Self { strategy: DerivationStrategy::HashExpansion, ..Self::default() }
    }
}

/// One party's half of a key-agreement exchange.
///
/// Create one per exchange and discard it afterwards; there is no
/// cross-session state. The same type serves both roles: the initiator
/// calls [`Session::offer_matrix`] / [`Session::receive_matrix`] /
/// [`Session::establish_key`], the responder calls
/// [`Session::exchange_matrix`].
#[derive(Debug, Clone)]
pub struct Session<E: Environment> {
    env: E,
    config: SessionConfig,
    state: SessionState,
    tk: Option<TransportKey>,
    matrix_a: Option<Matrix>,
    matrix_b: Option<Matrix>,
    key: Option<Matrix>,
    last_activity: f64,
}

impl<E: Environment> Session<E> {
    /// Create a session in [`SessionState::Init`].
    pub fn new(env: E, config: SessionConfig) -> Self {
        let last_activity = env.unix_time();
        Self {
            env,
            config,
            state: SessionState::Init,
            tk: None,
            matrix_a: None,
            matrix_b: None,
            key: None,
            last_activity,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The established key matrix, `None` before [`SessionState::KeyEstablished`].
    #[must_use]
    pub fn key(&self) -> Option<&Matrix> {
        self.key.as_ref()
    }

    /// Wall-clock seconds of the most recent operation.
    #[must_use]
    pub fn last_activity(&self) -> f64 {
        self.last_activity
    }

    /// True once the configured idle timeout has elapsed since the last
    /// operation. Advisory: the caller discards or resets an expired
    /// session; nothing expires it in the background.
    #[must_use]
    pub fn is_expired(&self, now: f64) -> bool {
        now - self.last_activity > self.config.idle_timeout_secs
    }

    /// Discard all key material and return to [`SessionState::Init`].
    ///
    /// The transport key, both private matrices, and the shared key are
    /// zeroized. The configuration is kept, so the same session value can
    /// host a fresh exchange.
    pub fn reset(&mut self) {
        self.tk = None;
        if let Some(mut matrix) = self.matrix_a.take() {
            matrix.zeroize();
        }
        if let Some(mut matrix) = self.matrix_b.take() {
            matrix.zeroize();
        }
        if let Some(mut key) = self.key.take() {
            key.zeroize();
        }
        self.state = SessionState::Init;
        self.touch();
        tracing::debug!("session reset to Init");
    }

    /// Store a directly-agreed integer transport key.
    ///
    /// Any 64-bit signed integer is accepted verbatim; its provenance is the
    /// caller's concern. Transitions to [`SessionState::TkEstablished`].
    ///
    /// # Errors
    ///
    /// - `InvalidState` unless the session is in `Init`
    /// - `StrategyMismatch` unless configured for
    ///   [`DerivationStrategy::DirectInteger`]
    pub fn derive_tk_direct(&mut self, tk: i64) -> Result<(), SessionError> {
        self.touch();
        self.require_state(SessionState::Init, "derive_tk_direct")?;
        self.require_strategy(DerivationStrategy::DirectInteger, "derive_tk_direct")?;
        self.tk = Some(TransportKey::Scalar(tk));
        self.set_state(SessionState::TkEstablished);
        Ok(())
    }

    /// Derive the transport key from an averaged round-trip time.
    ///
    /// Deterministic, so two parties that measured the same rounded RTT
    /// derive the same mask matrix independently. Transitions to
    /// [`SessionState::TkEstablished`].
    ///
    /// # Errors
    ///
    /// - `InvalidState` unless the session is in `Init`
    /// - `StrategyMismatch` unless configured for
    ///   [`DerivationStrategy::HashExpansion`]
    /// - `KeyMaterial` if the digest cannot fill an n×n matrix
    pub fn derive_tk_from_rtt(&mut self, average_rtt_secs: f64) -> Result<(), SessionError> {
        self.touch();
        self.require_state(SessionState::Init, "derive_tk_from_rtt")?;
        self.require_strategy(DerivationStrategy::HashExpansion, "derive_tk_from_rtt")?;
        let mask = derivation::expand_rtt(average_rtt_secs, self.config.matrix_size)?;
        self.tk = Some(TransportKey::Mask(mask));
        self.set_state(SessionState::TkEstablished);
        Ok(())
    }

    /// Initiator: generate the private matrix M_A and return it masked.
    ///
    /// The session stays in [`SessionState::TkEstablished`] until the
    /// responder's masked matrix arrives via [`Session::receive_matrix`].
    ///
    /// # Errors
    ///
    /// - `InvalidState` before TK establishment, or if M_A was already
    ///   offered
    /// - `KeyGeneration` if the retry budget is exhausted
    pub fn offer_matrix(&mut self) -> Result<Matrix, SessionError> {
        self.touch();
        self.require_state(SessionState::TkEstablished, "offer_matrix")?;
        if self.matrix_a.is_some() {
            return Err(self.invalid("offer_matrix"));
        }
        let private = self.random_invertible()?;
        let masked = self.tk_ref("offer_matrix")?.mask(&private)?;
        self.matrix_a = Some(private);
        tracing::debug!("offered masked initiator matrix");
        Ok(masked)
    }

    /// Initiator: unmask the responder's matrix M_B.
    ///
    /// Transitions to [`SessionState::MatricesExchanged`]; call
    /// [`Session::establish_key`] next.
    ///
    /// # Errors
    ///
    /// - `InvalidState` unless M_A was offered and TK is established
    /// - `ShapeMismatch` (via algebra) if the masked matrix is not n×n
    pub fn receive_matrix(&mut self, masked_b: Matrix) -> Result<(), SessionError> {
        self.touch();
        self.require_state(SessionState::TkEstablished, "receive_matrix")?;
        if self.matrix_a.is_none() {
            return Err(self.invalid("receive_matrix"));
        }
        self.require_session_shape("receive_matrix", &masked_b)?;
        let recovered = self.tk_ref("receive_matrix")?.unmask(&masked_b)?;
        self.matrix_b = Some(recovered);
        self.set_state(SessionState::MatricesExchanged);
        Ok(())
    }

    /// Responder: consume the initiator's masked matrix, return our own.
    ///
    /// Unmasks M_A, generates the private matrix M_B, establishes the
    /// shared key, and returns `M_B + TK`. Passes through
    /// [`SessionState::MatricesExchanged`] and ends in
    /// [`SessionState::KeyEstablished`].
    ///
    /// # Errors
    ///
    /// - `InvalidState` before TK establishment or after an exchange
    /// - `ShapeMismatch` (via algebra) if the masked matrix is not n×n
    /// - `KeyGeneration` if the retry budget is exhausted
    pub fn exchange_matrix(&mut self, masked_a: Matrix) -> Result<Matrix, SessionError> {
        self.touch();
        self.require_state(SessionState::TkEstablished, "exchange_matrix")?;
        if self.matrix_a.is_some() {
            return Err(self.invalid("exchange_matrix"));
        }
        self.require_session_shape("exchange_matrix", &masked_a)?;
        let own_private = self.random_invertible()?;
        let (recovered_a, masked_b) = {
            let tk = self.tk_ref("exchange_matrix")?;
            (tk.unmask(&masked_a)?, tk.mask(&own_private)?)
        };
        self.matrix_a = Some(recovered_a);
        self.matrix_b = Some(own_private);
        self.set_state(SessionState::MatricesExchanged);
        self.establish_key()?;
        Ok(masked_b)
    }

    /// Compute the shared key `Key = M_A · M_B`.
    ///
    /// The initiator's matrix is ALWAYS the left operand, on both sides of
    /// the exchange; matrix multiplication does not commute, and the two
    /// parties must land on a bit-identical key. Transitions to
    /// [`SessionState::KeyEstablished`].
    ///
    /// # Errors
    ///
    /// `InvalidState` unless both matrices are held.
    pub fn establish_key(&mut self) -> Result<(), SessionError> {
        self.touch();
        self.require_state(SessionState::MatricesExchanged, "establish_key")?;
        let (Some(matrix_a), Some(matrix_b)) = (self.matrix_a.as_ref(), self.matrix_b.as_ref())
        else {
            return Err(self.invalid("establish_key"));
        };
        let key = matrix_a.mul(matrix_b)?;
        self.key = Some(key);
        self.set_state(SessionState::KeyEstablished);
        Ok(())
    }

    /// Decrypt cipher blocks under the established key.
    ///
    /// # Errors
    ///
    /// - `InvalidState` before [`SessionState::KeyEstablished`]
    /// - `Cipher` for singular keys, malformed blocks, or out-of-range codes
    pub fn decrypt(&mut self, blocks: &[Vec<i64>]) -> Result<String, SessionError> {
        self.touch();
        self.require_state(SessionState::KeyEstablished, "decrypt")?;
        let Some(key) = self.key.as_ref() else {
            return Err(self.invalid("decrypt"));
        };
        Ok(cipher::decrypt(blocks, key)?)
    }

    /// Draw random n×n matrices until one has a nonzero rounded
    /// determinant, within the configured retry budget.
    fn random_invertible(&self) -> Result<Matrix, SessionError> {
        let n = self.config.matrix_size;
        let span = self
            .config
            .entry_max
            .saturating_sub(self.config.entry_min)
            .saturating_add(1)
            .max(1) as u64;
        let mut draw = vec![0u8; n * n * 8];
        for attempt in 1..=self.config.max_keygen_attempts {
            self.env.random_bytes(&mut draw);
            let data: Vec<i64> = draw
                .chunks_exact(8)
                .map(|chunk| {
                    let Ok(bytes) = <[u8; 8]>::try_from(chunk) else {
                        unreachable!("chunks_exact yields 8-byte chunks");
                    };
                    let value = u64::from_be_bytes(bytes);
                    self.config.entry_min.wrapping_add((value % span) as i64)
                })
                .collect();
            let Ok(candidate) = Matrix::new(n, n, data) else {
                unreachable!("row-major data length is n*n by construction");
            };
            if round_ties_even(candidate.determinant()?) != 0 {
                if attempt > 1 {
                    tracing::debug!(attempt, "invertible matrix found after redraws");
                }
                return Ok(candidate);
            }
        }
        let attempts = self.config.max_keygen_attempts;
        tracing::warn!(attempts, "invertible matrix generation exhausted its retry budget");
        Err(SessionError::KeyGeneration { attempts })
    }

    fn require_state(
        &self,
        expected: SessionState,
        operation: &'static str,
    ) -> Result<(), SessionError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn require_strategy(
        &self,
        expected: DerivationStrategy,
        operation: &'static str,
    ) -> Result<(), SessionError> {
        if self.config.strategy == expected {
            Ok(())
        } else {
            Err(SessionError::StrategyMismatch {
                configured: self.config.strategy,
                operation,
            })
        }
    }

    fn require_session_shape(
        &self,
        operation: &'static str,
        matrix: &Matrix,
    ) -> Result<(), SessionError> {
        let n = self.config.matrix_size;
        if matrix.rows() == n && matrix.cols() == n {
            Ok(())
        } else {
            Err(SessionError::Algebra(AlgebraError::ShapeMismatch {
                operation,
                left_rows: n,
                left_cols: n,
                right_rows: matrix.rows(),
                right_cols: matrix.cols(),
            }))
        }
    }

    fn tk_ref(&self, operation: &'static str) -> Result<&TransportKey, SessionError> {
        match self.tk.as_ref() {
            Some(tk) => Ok(tk),
            None => Err(self.invalid(operation)),
        }
    }

    fn invalid(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidState { state: self.state, operation }
    }

    fn set_state(&mut self, next: SessionState) {
        tracing::debug!(from = ?self.state, to = ?next, "session state transition");
        self.state = next;
    }

    fn touch(&mut self) {
        self.last_activity = self.env.unix_time();
    }
}
