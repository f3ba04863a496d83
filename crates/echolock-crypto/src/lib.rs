//! Echolock Cryptographic Primitives
//!
//! Matrix building blocks for the Echolock key-agreement protocol. Pure
//! functions with deterministic outputs. Callers provide random matrices
//! and timing measurements; nothing here touches a clock, an RNG, or I/O.
//!
//! # Key Lifecycle
//!
//! This section describes how session key material flows from a round-trip
//! measurement to per-message decryption. Both parties derive the transport
//! key (TK) from the same timing measurement (or direct agreement), use it
//! to mask their private matrices in transit, and multiply the two private
//! matrices into the shared key.
//!
//! ```text
//! Round-trip time (or direct integer)
//!        │
//!        ▼
//! SHA-256 expansion → Transport Key (scalar or n×n mask)
//!        │
//!        ▼
//! Additive Masking → masked M_A, masked M_B on the wire
//!        │
//!        ▼
//! Key = M_A · M_B → matrix block cipher
//! ```
//!
//! # Security
//!
//! Confidentiality in transit:
//! - Private matrices cross the channel only as `private + TK`
//! - Unmasking requires holding the session TK
//!
//! Consistency:
//! - Key establishment fixes the operand order (initiator's matrix left);
//!   both parties must arrive at a bit-identical key matrix or decryption
//!   produces garbage; the protocol carries no integrity check
//!
//! Explicit non-properties:
//! - No peer authentication, no replay or man-in-the-middle protection;
//!   the scheme conceals the private matrices from a passive observer only
//!
//! Key hygiene:
//! - Transport keys zeroize on drop; matrices zeroize on demand

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cipher;
pub mod derivation;
pub mod error;
pub mod masking;
pub mod matrix;

pub use cipher::{decrypt, encrypt};
pub use derivation::{expand_digest, expand_rtt, rtt_digest};
pub use error::{AlgebraError, CipherError, KeyMaterialError};
pub use masking::TransportKey;
pub use matrix::{FloatMatrix, Matrix, round_ties_even};
