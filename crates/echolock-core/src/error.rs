//! Error types for the Echolock session core.
//!
//! Strongly-typed errors for the protocol state machine, converted upward
//! from the primitive layers (`echolock-crypto`) with `From`. State-order
//! violations are recoverable by completing the prerequisite step; key
//! material and generation failures are fatal for the session, which must
//! be discarded and restarted. The core never attempts cross-session
//! recovery.

use echolock_crypto::{AlgebraError, CipherError, KeyMaterialError};
use thiserror::Error;

use crate::session::{DerivationStrategy, SessionState};

/// Errors from session state machine operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Operation invoked out of the required state order.
    #[error("invalid state: cannot {operation} in {state:?}")]
    InvalidState {
        /// Current state when the error occurred
        state: SessionState,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// A TK derivation entry point that does not match the configured
    /// strategy was invoked.
    #[error("strategy mismatch: session is configured for {configured:?}, cannot {operation}")]
    StrategyMismatch {
        /// The session's configured derivation strategy
        configured: DerivationStrategy,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// The invertible-matrix retry budget was exhausted.
    #[error("no invertible matrix found after {attempts} attempts")]
    KeyGeneration {
        /// Number of random draws that were tried
        attempts: u32,
    },

    /// Matrix algebra failure (shape mismatch, singularity).
    #[error("algebra error: {0}")]
    Algebra(#[from] AlgebraError),

    /// Transport-key derivation failure.
    #[error("key material error: {0}")]
    KeyMaterial(#[from] KeyMaterialError),

    /// Block cipher failure.
    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),
}

impl SessionError {
    /// Returns true if this error is fatal for the session.
    ///
    /// Fatal errors mean the session cannot make progress and must be
    /// discarded. Non-fatal errors are caller mistakes (wrong order, wrong
    /// shape, garbage ciphertext) that leave the session state intact.
    pub fn is_fatal(&self) -> bool {
        match self {
            // Complete the prerequisite step and retry
            Self::InvalidState { .. } => false,

            // Configuration and key material problems end the session
            Self::StrategyMismatch { .. }
            | Self::KeyGeneration { .. }
            | Self::KeyMaterial(_) => true,

            // A singular matrix where invertibility was required indicates
            // corrupted state; shape problems are caller input mistakes
            Self::Algebra(err) => matches!(err, AlgebraError::Singular { .. }),
            Self::Cipher(err) => err.is_fatal(),
        }
    }
}
