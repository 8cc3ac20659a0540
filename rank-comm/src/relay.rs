//! Ranks as clients of a relay server.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use relay_types::mp::relay_client::RelayClient;
use relay_types::mp::{Envelope, EnvelopeKind};
use tokio::task::JoinHandle;
use tonic::transport::{Channel, Endpoint};
use tracing::{error, instrument, trace};

use crate::mailbox::{MailKey, Mailbox};
use crate::sync::SyncTask;
use crate::{Communicator, Error, Request, codec};

/// One rank of a world whose messages travel through a relay server.
///
/// Every rank of a world connects with the same session name and world
/// size, and a distinct rank. Sends are posted to the relay log; a
/// background task subscribes to the envelopes addressed to this rank and
/// files them in a local mailbox, where receives and broadcasts pick them
/// up.
///
/// A broadcast is a single envelope addressed to every rank but the source.
///
/// # Example
///
/// ```no_run
/// use rank_comm::{Communicator, RelayComm};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let comm = RelayComm::connect("localhost:50051", "job-1", 0, 2).await?;
///
///     let mut values = vec![1.0, 2.0, 3.0];
///     comm.broadcast(&mut values, 0).await?;
///     comm.send(&values, 0, 3, 1, 7).await?;
///     Ok(())
/// }
/// ```
pub struct RelayComm {
    inner: Arc<RelayInner>,
}

struct RelayInner {
    client: RelayClient<Channel>,
    session: String,
    rank: usize,
    world_size: usize,
    mailbox: Arc<Mailbox>,
    broadcasts: AtomicU64,
    sync_handle: JoinHandle<()>,
}

impl Drop for RelayInner {
    fn drop(&mut self) {
        self.sync_handle.abort();
    }
}

impl RelayComm {
    /// Connects rank `rank` of a `world_size` world to the relay at `addr`.
    ///
    /// This spawns the background subscription before returning, so no
    /// envelope addressed to this rank is missed.
    #[instrument(name = "relay_connect", skip_all, fields(rank = rank, world_size = world_size))]
    pub async fn connect(
        addr: impl Into<ServerAddr>,
        session: impl Into<String>,
        rank: usize,
        world_size: usize,
    ) -> Result<Self, Error> {
        if world_size == 0 {
            return Err(Error::EmptyWorld);
        }
        Error::check_rank(rank, world_size)?;

        let server_addr = addr.into();
        let endpoint = Endpoint::from_shared(format!("http://{}", server_addr.0))?;
        let channel = endpoint.connect().await?;
        let client = RelayClient::new(channel);

        let session = session.into();
        let mailbox = Arc::new(Mailbox::new());
        let sync_task = SyncTask::new(
            client.clone(),
            session.clone(),
            rank as u32,
            Arc::clone(&mailbox),
        );

        let sync_handle = tokio::spawn(async move {
            if let Err(e) = sync_task.run().await {
                error!(rank, error = %e, "relay subscription failed");
            }
        });

        Ok(Self {
            inner: Arc::new(RelayInner {
                client,
                session,
                rank,
                world_size,
                mailbox,
                broadcasts: AtomicU64::new(0),
                sync_handle,
            }),
        })
    }

    pub fn session(&self) -> &str {
        &self.inner.session
    }

    async fn post(&self, kind: EnvelopeKind, dest: i32, tag: u64, values: &[f64]) -> Result<u64, Error> {
        let mut envelope = Envelope {
            session: self.inner.session.clone(),
            source: self.inner.rank as u32,
            dest,
            tag,
            payload: codec::encode(values),
            ..Default::default()
        };
        envelope.set_kind(kind);

        let mut client = self.inner.client.clone();
        let response = client.post(envelope).await?.into_inner();
        Ok(response.ordinal)
    }
}

#[async_trait]
impl Communicator for RelayComm {
    fn rank(&self) -> usize {
        self.inner.rank
    }

    fn world_size(&self) -> usize {
        self.inner.world_size
    }

    async fn broadcast(&self, buffer: &mut [f64], source: usize) -> Result<(), Error> {
        Error::check_rank(source, self.inner.world_size)?;
        let seq = self.inner.broadcasts.fetch_add(1, Ordering::SeqCst);

        if self.inner.rank == source {
            if self.inner.world_size > 1 {
                let ordinal = self
                    .post(EnvelopeKind::Broadcast, relay_types::ALL_RANKS, seq, buffer)
                    .await?;
                trace!(rank = self.inner.rank, seq, ordinal, "broadcast posted");
            }
        } else {
            let payload = self.inner.mailbox.take(MailKey::broadcast(source, seq)).await?;
            Error::check_len(source, buffer.len(), payload.len())?;
            buffer.copy_from_slice(&payload);
            trace!(rank = self.inner.rank, source, seq, "broadcast received");
        }
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
        Error::check_rank(dest, self.inner.world_size)?;
        Error::check_extent(offset, len, buffer.len())?;
        if len == 0 {
            return Ok(());
        }

        let ordinal = self
            .post(EnvelopeKind::Point, dest as i32, tag, &buffer[offset..offset + len])
            .await?;
        trace!(rank = self.inner.rank, dest, tag, len, ordinal, "sent");
        Ok(())
    }

    fn post_receive(
        &self,
        offset: usize,
        len: usize,
        source: usize,
        tag: u64,
    ) -> Result<Option<Request>, Error> {
        Error::check_rank(source, self.inner.world_size)?;
        if len == 0 {
            return Ok(None);
        }

        Ok(Some(Request::new(
            Arc::clone(&self.inner.mailbox),
            MailKey::point(source, tag),
            offset,
            len,
        )))
    }
}

/// Server address wrapper for type-safe connection.
#[derive(Clone)]
pub struct ServerAddr(pub String);

impl From<String> for ServerAddr {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ServerAddr {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
