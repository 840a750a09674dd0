//! Replay protection via a bounded consumed-nonce ledger
//!
//! Tracks single-use tokens that have already been accepted. The ledger is
//! bounded: once the window fills, the oldest entries are evicted. That
//! keeps memory flat while still catching replays inside any realistic
//! attack window (claims themselves expire after minutes, evicted nonces
//! are hours old).

use std::collections::{HashSet, VecDeque};

use rand::RngCore;

/// Default ledger window
pub const DEFAULT_LEDGER_CAPACITY: usize = 10_000;

/// Set of consumed nonces with FIFO eviction
#[derive(Debug)]
pub struct NonceLedger {
    consumed: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl NonceLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            consumed: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Check without consuming
    pub fn is_consumed(&self, nonce: &str) -> bool {
        self.consumed.contains(nonce)
    }

    /// Record a nonce as used. Returns false if it was already consumed,
    /// making this the single atomic check-then-record point.
    pub fn consume(&mut self, nonce: &str) -> bool {
        if !self.consumed.insert(nonce.to_string()) {
            return false;
        }
        self.order.push_back(nonce.to_string());

        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.consumed.remove(&oldest);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }
}

/// Generate a fresh random nonce (32 hex chars from OS randomness)
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_once() {
        let mut ledger = NonceLedger::new(100);
        assert!(!ledger.is_consumed("n1"));
        assert!(ledger.consume("n1"));
        assert!(ledger.is_consumed("n1"));
        assert!(!ledger.consume("n1"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_eviction_keeps_window_bounded() {
        let mut ledger = NonceLedger::new(3);
        for n in ["a", "b", "c", "d"] {
            assert!(ledger.consume(n));
        }
        assert_eq!(ledger.len(), 3);
        // Oldest entry fell out of the window
        assert!(!ledger.is_consumed("a"));
        assert!(ledger.is_consumed("d"));
        // An evicted nonce can be consumed again; the window bounds detection
        assert!(ledger.consume("a"));
    }

    #[test]
    fn test_generated_nonces_are_unique() {
        let nonces: HashSet<String> = (0..100).map(|_| generate_nonce()).collect();
        assert_eq!(nonces.len(), 100);
        assert_eq!(nonces.iter().next().unwrap().len(), 32);
    }
}
