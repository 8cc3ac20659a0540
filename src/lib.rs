//! Message relay for SPMD ranks.
//!
//! Ranks post envelopes to the relay, which appends them to a per-session
//! log in SQLite. Each rank holds one subscription stream that replays the
//! envelopes addressed to it and then follows the log live.

pub mod config;
pub mod db;
pub mod grpc;
pub mod models;
pub mod storage;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

/// Serves the relay on an already bound listener until the server fails.
pub async fn serve(
    listener: TcpListener,
    storage: Arc<storage::Storage>,
) -> Result<(), tonic::transport::Error> {
    Server::builder()
        .add_service(grpc::create_server(storage))
        .serve_with_incoming(TcpListenerStream::new(listener))
        .await
}
