//! Registry of in-flight proxy streams
//!
//! Every binary passthrough registers a [`StreamLease`]. The lease owns a child
//! of the process-wide shutdown token, so cancelling the registry ends every
//! stream at once. Dropping a lease (stream finished, client gone, shutdown)
//! removes the entry and logs a one-line summary.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::utils::{format_bytes, format_duration};

/// Why a stream stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Completed,
    ClientDisconnected,
    UpstreamFailed,
    /// Upstream sent nothing for longer than the upstream timeout
    UpstreamStalled,
    /// The lease token was cancelled while the process kept running
    Cancelled,
    Shutdown,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EndReason::Completed => "completed",
            EndReason::ClientDisconnected => "client disconnected",
            EndReason::UpstreamFailed => "upstream failed",
            EndReason::UpstreamStalled => "upstream stalled",
            EndReason::Cancelled => "cancelled",
            EndReason::Shutdown => "shutdown",
        };
        f.write_str(label)
    }
}

/// Snapshot of one active stream
#[derive(Debug, Clone, Serialize)]
pub struct StreamInfo {
    pub id: Uuid,
    /// Upstream URL with credentials masked
    pub upstream_url: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub bytes_forwarded: u64,
}

struct ActiveStream {
    seq: u64,
    upstream_url: String,
    started_at: DateTime<Utc>,
    clock: Instant,
    bytes: Arc<AtomicU64>,
}

#[derive(Clone)]
pub struct StreamRegistry {
    root: CancellationToken,
    next_seq: Arc<AtomicU64>,
    streams: Arc<Mutex<HashMap<Uuid, ActiveStream>>>,
}

impl StreamRegistry {
    pub fn new(root: CancellationToken) -> Self {
        Self {
            root,
            next_seq: Arc::new(AtomicU64::new(0)),
            streams: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a stream; it stays listed until the returned lease is dropped.
    pub fn register(&self, upstream_url: impl Into<String>) -> StreamLease {
        let id = Uuid::new_v4();
        let token = self.root.child_token();
        let bytes = Arc::new(AtomicU64::new(0));
        let started_at = Instant::now();
        let upstream_url = upstream_url.into();

        let mut streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
        streams.insert(
            id,
            ActiveStream {
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
                upstream_url: upstream_url.clone(),
                started_at: Utc::now(),
                clock: started_at,
                bytes: bytes.clone(),
            },
        );
        info!(
            "Stream {} started for {} ({} active)",
            id,
            upstream_url,
            streams.len()
        );

        StreamLease {
            id,
            upstream_url,
            started_at,
            bytes,
            token,
            shutdown: self.root.clone(),
            end_reason: EndReason::ClientDisconnected,
            streams: self.streams.clone(),
        }
    }

    pub fn active_count(&self) -> usize {
        self.streams.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Active streams, oldest first
    pub fn active_streams(&self) -> Vec<StreamInfo> {
        let streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries: Vec<_> = streams.iter().collect();
        entries.sort_by_key(|(_, s)| s.seq);
        entries
            .into_iter()
            .map(|(id, s)| StreamInfo {
                id: *id,
                upstream_url: s.upstream_url.clone(),
                started_at: s.started_at,
                duration_ms: s.clock.elapsed().as_millis() as u64,
                bytes_forwarded: s.bytes.load(Ordering::Relaxed),
            })
            .collect()
    }

    /// Cancel every registered stream. Leases registered afterwards start cancelled.
    pub fn cancel_all(&self) {
        let count = self.active_count();
        if count > 0 {
            warn!("Cancelling {} active stream(s)", count);
        }
        self.root.cancel();
    }

}

/// Handle held by a running stream for its whole lifetime
pub struct StreamLease {
    id: Uuid,
    upstream_url: String,
    started_at: Instant,
    bytes: Arc<AtomicU64>,
    token: CancellationToken,
    shutdown: CancellationToken,
    end_reason: EndReason,
    streams: Arc<Mutex<HashMap<Uuid, ActiveStream>>>,
}

impl StreamLease {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Cancelled on shutdown or when the lease drops
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Reason to report once [`Self::token`] has fired.
    pub fn cancellation_reason(&self) -> EndReason {
        if self.shutdown.is_cancelled() {
            EndReason::Shutdown
        } else {
            EndReason::Cancelled
        }
    }

    pub fn record_bytes(&self, len: usize) {
        self.bytes.fetch_add(len as u64, Ordering::Relaxed);
    }

    pub fn bytes_forwarded(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Set the reason reported when the lease drops.
    pub fn finish(&mut self, reason: EndReason) {
        self.end_reason = reason;
    }
}

impl Drop for StreamLease {
    fn drop(&mut self) {
        self.token.cancel();
        let remaining = {
            let mut streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
            streams.remove(&self.id);
            streams.len()
        };
        info!(
            "Stream {} ended ({}): {} in {} for {} ({} active)",
            self.id,
            self.end_reason,
            format_bytes(self.bytes_forwarded()),
            format_duration(self.started_at.elapsed().as_millis() as u64),
            self.upstream_url,
            remaining
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_drop_removes_entry() {
        let registry = StreamRegistry::new(CancellationToken::new());
        let lease = registry.register("https://cdn.example.com/a.ts");
        lease.record_bytes(1024);
        assert_eq!(registry.active_count(), 1);
        assert_eq!(registry.active_streams()[0].bytes_forwarded, 1024);

        let token = lease.token();
        drop(lease);
        assert_eq!(registry.active_count(), 0);
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_all_cancels_every_lease() {
        let registry = StreamRegistry::new(CancellationToken::new());
        let first = registry.register("https://cdn.example.com/a.ts");
        let second = registry.register("https://cdn.example.com/b.ts");

        registry.cancel_all();
        assert!(first.token().is_cancelled());
        assert!(second.token().is_cancelled());
        assert_eq!(first.cancellation_reason(), EndReason::Shutdown);
    }

    #[test]
    fn cancellation_reason_follows_shutdown_token() {
        let registry = StreamRegistry::new(CancellationToken::new());
        let first = registry.register("https://cdn.example.com/a.ts");
        let second = registry.register("https://cdn.example.com/b.ts");

        first.token().cancel();
        assert_eq!(first.cancellation_reason(), EndReason::Cancelled);
        assert!(!second.token().is_cancelled());

        registry.cancel_all();
        assert_eq!(second.cancellation_reason(), EndReason::Shutdown);
    }

    #[test]
    fn active_streams_are_listed_oldest_first() {
        let registry = StreamRegistry::new(CancellationToken::new());
        let first = registry.register("https://cdn.example.com/a.ts");
        let _second = registry.register("https://cdn.example.com/b.ts");
        first.record_bytes(188);

        let active = registry.active_streams();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].id, first.id());
        assert_eq!(active[0].bytes_forwarded, 188);
        assert_eq!(active[1].upstream_url, "https://cdn.example.com/b.ts");
    }

    #[test]
    fn dropping_one_lease_leaves_siblings_running() {
        let registry = StreamRegistry::new(CancellationToken::new());
        let first = registry.register("https://cdn.example.com/a.ts");
        let second = registry.register("https://cdn.example.com/b.ts");
        drop(first);
        assert_eq!(registry.active_count(), 1);
        assert!(!second.token().is_cancelled());
    }
}
