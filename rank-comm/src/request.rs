//! Handles for posted non-blocking receives.

use std::sync::Arc;

use tracing::trace;

use crate::Error;
use crate::mailbox::{MailKey, Mailbox};

/// A posted receive. The payload lands in the caller's buffer at
/// `offset..offset + len` when the request is passed to `wait_all`.
///
/// Payloads are buffered in the rank's mailbox as they arrive; nothing is
/// taken out of it until `wait_all`, so dropping a request leaves the
/// matching payload for the next receive.
#[derive(Debug)]
pub struct Request {
    offset: usize,
    len: usize,
    key: MailKey,
    mailbox: Arc<Mailbox>,
}

impl Request {
    pub(crate) fn new(mailbox: Arc<Mailbox>, key: MailKey, offset: usize, len: usize) -> Self {
        Self {
            offset,
            len,
            key,
            mailbox,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn peer(&self) -> usize {
        self.key.peer
    }

    pub fn tag(&self) -> u64 {
        self.key.tag
    }
}

/// Waits for every request and copies each payload into `buffer`.
///
/// Extents are checked before anything is taken from a mailbox. Payloads
/// may arrive in any order; requests sharing a `(source, tag)` match in
/// the order they were posted.
pub async fn wait_all(buffer: &mut [f64], requests: Vec<Request>) -> Result<(), Error> {
    for request in &requests {
        Error::check_extent(request.offset, request.len, buffer.len())?;
    }

    for request in requests {
        let payload = request.mailbox.take(request.key).await?;
        Error::check_len(request.key.peer, request.len, payload.len())?;
        buffer[request.offset..request.offset + request.len].copy_from_slice(&payload);
        trace!(peer = request.key.peer, tag = request.key.tag, len = request.len, "receive completed");
    }
    Ok(())
}
