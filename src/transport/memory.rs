//! In-memory transport
//!
//! Records frames instead of sending them. Used for `transport = "dry_run"`
//! and by tests, which can also inject send failures.

use super::Transport;
use crate::error::{BridgeError, Result};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Default)]
struct Recorded {
    frames: VecDeque<Bytes>,
    /// Oldest frames are dropped beyond this many (0 = unbounded)
    capacity: usize,
    /// Number of upcoming sends that fail
    failures: usize,
    /// Successful sends left before one injected failure
    fail_after: Option<usize>,
}

/// Recording transport; clones share the same record
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<Recorded>>,
}

impl MemoryTransport {
    /// Unbounded recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder keeping only the last `capacity` frames
    pub fn bounded(capacity: usize) -> Self {
        let transport = Self::default();
        transport.inner.lock().capacity = capacity;
        transport
    }

    /// Frames sent so far, oldest first
    pub fn sent(&self) -> Vec<Bytes> {
        self.inner.lock().frames.iter().cloned().collect()
    }

    /// Make the next `count` sends fail with a transport error
    pub fn fail_next(&self, count: usize) {
        self.inner.lock().failures = count;
    }

    /// Let `successes` sends through, then fail exactly one
    pub fn fail_after(&self, successes: usize) {
        self.inner.lock().fail_after = Some(successes);
    }

    pub fn clear(&self) {
        self.inner.lock().frames.clear();
    }
}

impl Transport for MemoryTransport {
    async fn send(&mut self, frame: &[u8]) -> Result<()> {
        let mut rec = self.inner.lock();
        let injected = || {
            BridgeError::transport(
                "memory",
                std::io::Error::new(std::io::ErrorKind::BrokenPipe, "injected send failure"),
            )
        };
        match rec.fail_after {
            Some(0) => {
                rec.fail_after = None;
                return Err(injected());
            }
            Some(n) => rec.fail_after = Some(n - 1),
            None => {}
        }
        if rec.failures > 0 {
            rec.failures -= 1;
            return Err(injected());
        }
        if rec.capacity > 0 && rec.frames.len() == rec.capacity {
            rec.frames.pop_front();
        }
        rec.frames.push_back(Bytes::copy_from_slice(frame));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_in_order() {
        let mut transport = MemoryTransport::new();
        let probe = transport.clone();

        transport.send(&[1]).await.unwrap();
        transport.send(&[2, 3]).await.unwrap();

        let sent = probe.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].as_ref(), &[1]);
        assert_eq!(sent[1].as_ref(), &[2, 3]);
    }

    #[tokio::test]
    async fn test_injected_failure_records_nothing() {
        let mut transport = MemoryTransport::new();
        transport.fail_next(1);

        assert!(transport.send(&[1]).await.is_err());
        assert!(transport.sent().is_empty());

        transport.send(&[2]).await.unwrap();
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_fail_after() {
        let mut transport = MemoryTransport::new();
        transport.fail_after(2);

        transport.send(&[1]).await.unwrap();
        transport.send(&[2]).await.unwrap();
        assert!(transport.send(&[3]).await.is_err());
        transport.send(&[4]).await.unwrap();

        assert_eq!(transport.sent().len(), 3);
    }

    #[tokio::test]
    async fn test_bounded_drops_oldest() {
        let mut transport = MemoryTransport::bounded(2);
        for i in 0..4u8 {
            transport.send(&[i]).await.unwrap();
        }
        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].as_ref(), &[2]);
        assert_eq!(sent[1].as_ref(), &[3]);
    }
}
