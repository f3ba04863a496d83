//! Round-trip timestamp echo and RTT estimation.
//!
//! The RTT-derived protocol variant needs both parties to agree on a timing
//! measurement before any key material exists. The responder's half is a
//! pure echo: receive the initiator's timestamp, attach the local clock,
//! return both. The initiator's half samples several echoes and averages
//! the observed round-trip times before feeding the result to TK
//! derivation.

use serde::{Deserialize, Serialize};

use crate::env::Environment;

/// One timestamp-echo exchange.
///
/// The initiator's timestamp comes back untouched so it can compute
/// `received_at - client_timestamp` without trusting the responder's clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSync {
    /// The initiator's send timestamp, echoed verbatim (Unix seconds).
    pub client_timestamp: f64,
    /// The responder's clock when the echo was produced (Unix seconds).
    pub server_timestamp: f64,
}

/// Echo the initiator's timestamp alongside the local clock.
///
/// Pure with respect to session state; callable at any time, in any state.
pub fn measure_round_trip<E: Environment>(env: &E, client_timestamp: f64) -> TimeSync {
    TimeSync { client_timestamp, server_timestamp: env.unix_time() }
}

/// Accumulates round-trip samples into an average for TK derivation.
#[derive(Debug, Clone, Default)]
pub struct RttEstimator {
    samples: Vec<f64>,
}

impl RttEstimator {
    /// Create an estimator with no samples.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one round: the send timestamp and the time the echo arrived.
    pub fn record(&mut self, sent_at: f64, received_at: f64) {
        self.samples.push(received_at - sent_at);
    }

    /// Average round-trip time in seconds, `None` before the first sample.
    #[must_use]
    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    /// Number of recorded samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if no samples have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Discard all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
