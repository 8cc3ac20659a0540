//! Per-rank store of delivered payloads waiting for a matching receive.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

use crate::Error;

/// Broadcast traffic is kept apart from point-to-point traffic so that a
/// broadcast sequence number can never match a send tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Lane {
    Point,
    Broadcast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct MailKey {
    pub lane: Lane,
    pub peer: usize,
    pub tag: u64,
}

impl MailKey {
    pub fn point(peer: usize, tag: u64) -> Self {
        Self {
            lane: Lane::Point,
            peer,
            tag,
        }
    }

    pub fn broadcast(peer: usize, seq: u64) -> Self {
        Self {
            lane: Lane::Broadcast,
            peer,
            tag: seq,
        }
    }
}

/// FIFO queues of payloads keyed by `(lane, peer, tag)`.
#[derive(Debug)]
pub(crate) struct Mailbox {
    slots: Mutex<HashMap<MailKey, VecDeque<Vec<f64>>>>,
    arrived: Notify,
    closed: AtomicBool,
}

impl Mailbox {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            arrived: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Recovers a poisoned lock; no holder leaves the queues half-updated.
    fn slots(&self) -> MutexGuard<'_, HashMap<MailKey, VecDeque<Vec<f64>>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn deliver(&self, key: MailKey, payload: Vec<f64>) {
        self.slots().entry(key).or_default().push_back(payload);
        self.arrived.notify_waiters();
    }

    /// Marks the mailbox as fed by nothing anymore. Payloads already
    /// delivered can still be taken.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.arrived.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Waits for the oldest payload under `key` and removes it.
    pub async fn take(&self, key: MailKey) -> Result<Vec<f64>, Error> {
        loop {
            let notified = self.arrived.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(payload) = self.try_take(&key) {
                return Ok(payload);
            }
            if self.is_closed() {
                return Err(Error::ConnectionClosed);
            }

            notified.await;
        }
    }

    fn try_take(&self, key: &MailKey) -> Option<Vec<f64>> {
        let mut guard = self.slots();
        let queue = guard.get_mut(key)?;
        let payload = queue.pop_front();
        if queue.is_empty() {
            guard.remove(key);
        }
        payload
    }

    /// Number of payloads delivered but not yet taken.
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.slots().values().map(VecDeque::len).sum()
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}
