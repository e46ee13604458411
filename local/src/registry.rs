//! Stream registry: `cid -> per-stream inbound queue` (spec §4.2).
//!
//! Backed by `DashMap` for the same reason the teacher's sibling process
//! (`aether-hub`) depends on it: lock-free concurrent access from the
//! acceptor, the tunnel receiver, and the switcher's drain path, with no
//! single global lock serializing unrelated streams.

use dashmap::DashMap;
use tokio::sync::mpsc;
use tunnel_proto::Message;

/// Per-stream inbound handle: the tunnel receiver (and switcher drain) push
/// frames addressed to this `cid` here; the stream's downstream pump reads
/// them out.
#[derive(Clone)]
pub struct StreamEntry {
    pub inbound: mpsc::Sender<Message>,
}

#[derive(Default)]
pub struct StreamRegistry {
    streams: DashMap<String, StreamEntry>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self {
            streams: DashMap::new(),
        }
    }

    pub fn insert(&self, cid: String, entry: StreamEntry) {
        self.streams.insert(cid, entry);
    }

    pub fn lookup(&self, cid: &str) -> Option<StreamEntry> {
        self.streams.get(cid).map(|e| e.clone())
    }

    /// Idempotent: removing an absent `cid` is a no-op.
    pub fn remove(&self, cid: &str) {
        self.streams.remove(cid);
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_lookup_remove_round_trip() {
        let registry = StreamRegistry::new();
        let (tx, _rx) = mpsc::channel(4);
        registry.insert("abcd1234".to_string(), StreamEntry { inbound: tx });

        assert!(registry.lookup("abcd1234").is_some());
        assert_eq!(registry.len(), 1);

        registry.remove("abcd1234");
        assert!(registry.lookup("abcd1234").is_none());
    }

    #[test]
    fn remove_is_idempotent_on_missing_key() {
        let registry = StreamRegistry::new();
        registry.remove("missing1");
        registry.remove("missing1");
    }

    #[test]
    fn lookup_on_unknown_cid_returns_none() {
        let registry = StreamRegistry::new();
        assert!(registry.lookup("nope0000").is_none());
    }
}
