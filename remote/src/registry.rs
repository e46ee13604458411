//! Upstream registry: `cid -> live TCP upstream` (spec §4.9).

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Handle to a live upstream connection's pump task.
pub struct UpstreamEntry {
    /// Data frames destined for this upstream are pushed here; the pump
    /// task owns the TCP write half and drains this queue into it.
    pub to_upstream: mpsc::Sender<bytes::Bytes>,
    pub pump: JoinHandle<()>,
}

#[derive(Default)]
pub struct UpstreamRegistry {
    upstreams: DashMap<String, UpstreamEntry>,
}

impl UpstreamRegistry {
    pub fn new() -> Self {
        Self {
            upstreams: DashMap::new(),
        }
    }

    pub fn insert(&self, cid: String, entry: UpstreamEntry) {
        self.upstreams.insert(cid, entry);
    }

    pub fn sender_for(&self, cid: &str) -> Option<mpsc::Sender<bytes::Bytes>> {
        self.upstreams.get(cid).map(|e| e.to_upstream.clone())
    }

    /// Remove and abort the pump task. Idempotent.
    pub fn remove(&self, cid: &str) {
        if let Some((_, entry)) = self.upstreams.remove(cid) {
            entry.pump.abort();
        }
    }

    pub fn len(&self) -> usize {
        self.upstreams.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_lookup_remove_round_trip() {
        let registry = UpstreamRegistry::new();
        let (tx, _rx) = mpsc::channel(4);
        let pump = tokio::spawn(async {});
        registry.insert("abcd1234".to_string(), UpstreamEntry { to_upstream: tx, pump });

        assert!(registry.sender_for("abcd1234").is_some());
        assert_eq!(registry.len(), 1);

        registry.remove("abcd1234");
        assert!(registry.sender_for("abcd1234").is_none());
    }

    #[test]
    fn remove_is_idempotent_on_missing_key() {
        let registry = UpstreamRegistry::new();
        registry.remove("missing1");
        registry.remove("missing1");
    }
}
