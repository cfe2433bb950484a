//! Ingestion boundary - producer connections, decoding, and the transfer queue
//!
//! Everything here runs on the Tokio runtime. The only thing shared with the
//! simulation is the [`TransferQueue`] and the read-only [`IngestCounters`].

pub mod demo;
pub mod queue;
pub mod server;

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

pub use demo::DemoSpawner;
pub use queue::{PushOutcome, TransferQueue};
pub use server::IngestServer;

/// Counters updated by connection tasks
#[derive(Debug, Default)]
pub struct IngestCounters {
    connections_accepted: AtomicU64,
    connection_errors: AtomicU64,
    messages_accepted: AtomicU64,
    decode_errors: AtomicU64,
}

/// Point-in-time copy of [`IngestCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub connections_accepted: u64,
    pub connection_errors: u64,
    pub messages_accepted: u64,
    pub decode_errors: u64,
}

impl IngestCounters {
    /// Record a new connection, returning its sequence number
    pub fn connection_opened(&self) -> u64 {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed)
    }

    pub fn connection_failed(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_accepted(&self) {
        self.messages_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decode_failed(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> IngestStats {
        IngestStats {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            messages_accepted: self.messages_accepted.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = IngestCounters::default();
        assert_eq!(counters.connection_opened(), 0);
        assert_eq!(counters.connection_opened(), 1);
        counters.decode_failed();
        counters.message_accepted();
        counters.message_accepted();

        let stats = counters.snapshot();
        assert_eq!(stats.connections_accepted, 2);
        assert_eq!(stats.decode_errors, 1);
        assert_eq!(stats.messages_accepted, 2);
        assert_eq!(stats.connection_errors, 0);
    }
}
