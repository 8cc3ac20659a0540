//! In-process world: every rank is a task and messages are handed over
//! through shared mailboxes.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::trace;

use crate::mailbox::{MailKey, Mailbox};
use crate::{Communicator, Error, Request};

/// Factory for a set of [`LocalComm`]s sharing one world.
pub struct LocalWorld;

impl LocalWorld {
    /// Creates the communicators of a world of `world_size` ranks, in rank
    /// order.
    pub fn create(world_size: usize) -> Result<Vec<LocalComm>, Error> {
        if world_size == 0 {
            return Err(Error::EmptyWorld);
        }

        let mailboxes: Arc<Vec<Arc<Mailbox>>> =
            Arc::new((0..world_size).map(|_| Arc::new(Mailbox::new())).collect());

        Ok((0..world_size)
            .map(|rank| LocalComm {
                rank,
                mailboxes: Arc::clone(&mailboxes),
                broadcasts: AtomicU64::new(0),
            })
            .collect())
    }

    /// Spawns `body` once per rank and collects the outputs in rank order.
    pub async fn run<F, Fut, T>(world_size: usize, body: F) -> Result<Vec<T>, Error>
    where
        F: Fn(LocalComm) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let handles: Vec<_> = Self::create(world_size)?
            .into_iter()
            .map(|comm| tokio::spawn(body(comm)))
            .collect();

        let mut outputs = Vec::with_capacity(handles.len());
        for handle in handles {
            outputs.push(handle.await?);
        }
        Ok(outputs)
    }
}

/// One rank of a [`LocalWorld`].
pub struct LocalComm {
    rank: usize,
    mailboxes: Arc<Vec<Arc<Mailbox>>>,
    broadcasts: AtomicU64,
}

impl LocalComm {
    fn mailbox(&self, rank: usize) -> &Arc<Mailbox> {
        &self.mailboxes[rank]
    }
}

#[async_trait]
impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.mailboxes.len()
    }

    async fn broadcast(&self, buffer: &mut [f64], source: usize) -> Result<(), Error> {
        Error::check_rank(source, self.world_size())?;
        let seq = self.broadcasts.fetch_add(1, Ordering::SeqCst);
        let key = MailKey::broadcast(source, seq);

        if self.rank == source {
            for peer in (0..self.world_size()).filter(|&p| p != source) {
                self.mailbox(peer).deliver(key, buffer.to_vec());
            }
        } else {
            let payload = self.mailbox(self.rank).take(key).await?;
            Error::check_len(source, buffer.len(), payload.len())?;
            buffer.copy_from_slice(&payload);
        }

        trace!(rank = self.rank, source, seq, len = buffer.len(), "broadcast done");
        Ok(())
    }

    async fn send(
        &self,
        buffer: &[f64],
        offset: usize,
        len: usize,
        dest: usize,
        tag: u64,
    ) -> Result<(), Error> {
        Error::check_rank(dest, self.world_size())?;
        Error::check_extent(offset, len, buffer.len())?;
        if len == 0 {
            return Ok(());
        }

        self.mailbox(dest)
            .deliver(MailKey::point(self.rank, tag), buffer[offset..offset + len].to_vec());
        trace!(rank = self.rank, dest, tag, len, "sent");
        Ok(())
    }

    fn post_receive(
        &self,
        offset: usize,
        len: usize,
        source: usize,
        tag: u64,
    ) -> Result<Option<Request>, Error> {
        Error::check_rank(source, self.world_size())?;
        if len == 0 {
            return Ok(None);
        }

        let mailbox = Arc::clone(self.mailbox(self.rank));
        Ok(Some(Request::new(
            mailbox,
            MailKey::point(source, tag),
            offset,
            len,
        )))
    }
}
