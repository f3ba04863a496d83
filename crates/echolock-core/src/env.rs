//! Environment abstraction for deterministic testing.
//!
//! Decouples the session state machine from system resources (wall-clock
//! time, randomness). Tests inject a seeded RNG and a virtual clock; the
//! production environment uses the OS clock and OS entropy.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::{RngCore, rngs::OsRng};

/// Abstract environment providing time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `unix_time()` never goes backwards within one execution context
/// - `random_bytes()` uses cryptographically secure entropy in production
pub trait Environment: Clone + Send + Sync + 'static {
    /// Seconds since the Unix epoch, as the timestamp-echo operation and
    /// idle-expiry bookkeeping observe them.
    ///
    /// Wall-clock seconds rather than a monotonic instant: round-trip
    /// measurement echoes the value to a peer on another machine, so it has
    /// to be an absolute timestamp.
    fn unix_time(&self) -> f64;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    /// - Uses cryptographically secure RNG in production
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    ///
    /// Convenience for drawing one matrix entry's worth of randomness.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}

/// Production environment: OS clock and OS entropy.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    fn unix_time(&self) -> f64 {
        // A clock set before 1970 reports the epoch itself rather than
        // failing; session expiry degrades gracefully either way.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0.0, |elapsed| elapsed.as_secs_f64())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        OsRng.fill_bytes(buffer);
    }
}
