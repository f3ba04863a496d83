//! Echolock Protocol Core
//!
//! Two-party symmetric key agreement from round-trip timing and additive
//! matrix masking, plus the matrix block cipher keyed by the result.
//!
//! The excluded transport layer (HTTP, JSON framing) hands this crate
//! already-parsed values and serializes what comes back; everything here is
//! synchronous, in-memory, and free of I/O.
//!
//! # Protocol
//!
//! ```text
//! Initiator                                   Responder
//!   │  measure_round_trip(t1)  ───────────────>  │
//!   │  <───────────────  TimeSync { t1, t2 }     │
//!   │                                            │
//!   │  derive_tk_*  (both sides, same TK)        │
//!   │                                            │
//!   │  offer_matrix() = M_A + TK  ─────────────> │ exchange_matrix:
//!   │                                            │   M_A = unmask, gen M_B,
//!   │  <─────────────  M_B + TK                  │   Key = M_A · M_B
//!   │  receive_matrix, establish_key             │
//!   │                                            │
//!   │  cipher blocks  ─────────────────────────> │ decrypt
//! ```
//!
//! Both parties multiply `M_A · M_B` with the initiator's matrix on the
//! left; the protocol has no integrity check, so a divergent key silently
//! decrypts to garbage. See [`session::Session`] for the state machine and
//! [`error::SessionError`] for the failure taxonomy.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod error;
pub mod session;
pub mod timesync;

pub use env::{Environment, SystemEnv};
pub use error::SessionError;
pub use session::{DerivationStrategy, Session, SessionConfig, SessionState};
pub use timesync::{RttEstimator, TimeSync, measure_round_trip};
