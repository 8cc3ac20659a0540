//! Background subscription feeding a relay rank's mailbox.

use std::sync::Arc;

use futures_util::StreamExt;
use relay_types::mp::relay_client::RelayClient;
use relay_types::mp::{EnvelopeKind, Record, SubscribeRequest};
use tonic::transport::Channel;
use tracing::{debug, instrument, trace};

use crate::Error;
use crate::codec;
use crate::mailbox::{Lane, MailKey, Mailbox};

pub struct SyncTask {
    client: RelayClient<Channel>,
    session: String,
    rank: u32,
    mailbox: Arc<Mailbox>,
    last_seen: u64,
}

impl SyncTask {
    pub fn new(
        client: RelayClient<Channel>,
        session: String,
        rank: u32,
        mailbox: Arc<Mailbox>,
    ) -> Self {
        Self {
            client,
            session,
            rank,
            mailbox,
            last_seen: 0,
        }
    }

    /// Follows the relay log until the subscription fails; the mailbox is
    /// closed on the way out so pending receives fail instead of hanging.
    #[instrument(name = "relay_sync", skip_all, fields(rank = self.rank, session = %self.session))]
    pub async fn run(mut self) -> Result<(), Error> {
        let result = self.follow().await;
        self.mailbox.close();
        result
    }

    async fn follow(&mut self) -> Result<(), Error> {
        loop {
            let request = SubscribeRequest {
                session: self.session.clone(),
                rank: self.rank,
                start_ordinal: self.last_seen,
            };

            let mut stream = self.client.subscribe(request).await?.into_inner();
            debug!(rank = self.rank, from = self.last_seen, "subscribed to relay");

            while let Some(result) = stream.next().await {
                self.process_record(result?)?;
            }
            debug!(rank = self.rank, "relay stream ended, resubscribing");
        }
    }

    fn process_record(&mut self, record: Record) -> Result<(), Error> {
        if record.ordinal <= self.last_seen {
            return Ok(());
        }
        self.last_seen = record.ordinal;

        let key = MailKey {
            lane: lane_of(record.kind)?,
            peer: record.source as usize,
            tag: record.tag,
        };
        let payload = codec::decode(&record.payload)?;

        trace!(rank = self.rank, ordinal = record.ordinal, ?key, len = payload.len(), "delivered");
        self.mailbox.deliver(key, payload);
        Ok(())
    }
}

fn lane_of(kind: i32) -> Result<Lane, Error> {
    match EnvelopeKind::try_from(kind) {
        Ok(EnvelopeKind::Point) => Ok(Lane::Point),
        Ok(EnvelopeKind::Broadcast) => Ok(Lane::Broadcast),
        Err(_) => Err(Error::UnknownKind(kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lanes_follow_the_envelope_kind() {
        assert_eq!(lane_of(EnvelopeKind::Point as i32).unwrap(), Lane::Point);
        assert_eq!(lane_of(EnvelopeKind::Broadcast as i32).unwrap(), Lane::Broadcast);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(matches!(lane_of(7), Err(Error::UnknownKind(7))));
    }
}
