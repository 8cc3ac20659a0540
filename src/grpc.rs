use crate::models;
use crate::storage::Storage;
use futures_util::stream::{Stream, StreamExt};
use relay_types::mp::relay_server::{Relay, RelayServer};
use relay_types::mp::{Envelope, PostResponse, Record, SubscribeRequest};
use std::pin::Pin;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{debug, error};

#[derive(Clone)]
pub struct RelayServiceImpl {
    storage: Arc<Storage>,
}

impl RelayServiceImpl {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

type SubscribeStream = Pin<Box<dyn Stream<Item = Result<Record, Status>> + Send>>;

#[tonic::async_trait]
impl Relay for RelayServiceImpl {
    type SubscribeStream = SubscribeStream;

    async fn post(&self, request: Request<Envelope>) -> Result<Response<PostResponse>, Status> {
        let envelope = request.into_inner();
        if envelope.session.is_empty() {
            return Err(Status::invalid_argument("session must not be empty"));
        }
        if envelope.dest < relay_types::ALL_RANKS {
            return Err(Status::invalid_argument(format!(
                "invalid destination rank {}",
                envelope.dest
            )));
        }

        let record = models::Record::new(
            envelope.session,
            envelope.kind,
            envelope.source,
            envelope.dest,
            envelope.tag,
            envelope.payload,
        );

        let ordinal = self.storage.append(&record).await.map_err(|e| {
            error!(error = %e, "failed to append envelope");
            Status::internal(format!("Database error: {}", e))
        })?;

        debug!(
            session = %record.session,
            source = record.source,
            dest = record.dest,
            tag = record.tag,
            ordinal,
            "envelope appended"
        );

        Ok(Response::new(PostResponse { ordinal }))
    }

    async fn subscribe(
        &self,
        request: Request<SubscribeRequest>,
    ) -> Result<Response<Self::SubscribeStream>, Status> {
        let req = request.into_inner();
        if req.session.is_empty() {
            return Err(Status::invalid_argument("session must not be empty"));
        }

        debug!(session = %req.session, rank = req.rank, from = req.start_ordinal, "subscriber attached");
        let stream = self
            .storage
            .subscribe_from(req.session, req.rank, req.start_ordinal);

        let output = async_stream::stream! {
            let mut db_stream = stream;
            while let Some(result) = db_stream.next().await {
                match result {
                    Ok(record) => {
                        yield Ok(Record {
                            ordinal: record.ordinal,
                            session: record.session,
                            kind: record.kind,
                            source: record.source,
                            dest: record.dest,
                            tag: record.tag,
                            payload: record.payload,
                            timestamp: record.timestamp,
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "subscription query failed");
                        yield Err(Status::internal(format!("Database error: {}", e)));
                        break;
                    }
                }
            }
        };

        Ok(Response::new(Box::pin(output)))
    }
}

pub fn create_server(storage: Arc<Storage>) -> RelayServer<RelayServiceImpl> {
    RelayServer::new(RelayServiceImpl::new(storage))
}
