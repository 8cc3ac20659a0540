//! Rank-to-rank message passing for SPMD programs.
//!
//! `rank-comm` provides the [`Communicator`] trait, the handful of
//! primitives a rank needs to take part in a collective computation, and
//! two transports implementing it:
//!
//! - [`LocalWorld`]: every rank is a task in the current process and
//!   messages travel through in-memory mailboxes.
//! - [`RelayComm`]: every rank is a client of a relay server and messages
//!   travel through its envelope log over gRPC.
//!
//! # Matching
//!
//! A receive matches on `(source, tag)`, never on arrival order. Payloads
//! with the same `(source, tag)` are consumed in the order they were sent.
//! The k-th broadcast a rank takes part in is matched against the k-th
//! broadcast of the source, so every rank must issue its broadcasts in the
//! same order.
//!
//! # Example
//!
//! ```no_run
//! use rank_comm::{Communicator, LocalWorld};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sums = LocalWorld::run(3, |comm| async move {
//!         let mut values = if comm.rank() == 0 { vec![1.0, 2.0] } else { vec![0.0; 2] };
//!         comm.broadcast(&mut values, 0).await?;
//!         Ok::<_, rank_comm::Error>(values.iter().sum::<f64>())
//!     })
//!     .await?;
//!
//!     assert!(sums.iter().all(|s| matches!(s, Ok(v) if *v == 3.0)));
//!     Ok(())
//! }
//! ```

mod codec;
mod error;
mod local;
mod mailbox;
mod relay;
mod request;
mod sync;

use async_trait::async_trait;

pub use error::Error;
pub use local::{LocalComm, LocalWorld};
pub use relay::{RelayComm, ServerAddr};
pub use request::{Request, wait_all};

/// The primitives one rank uses to cooperate with the rest of its world.
///
/// `rank` and `world_size` are fixed for the communicator's lifetime.
/// `broadcast` is collective: every rank must call it with the same source
/// and a buffer of the same length.
#[async_trait]
pub trait Communicator: Send + Sync {
    fn rank(&self) -> usize;

    fn world_size(&self) -> usize;

    /// On return, `buffer` on every rank equals `buffer` on `source`.
    async fn broadcast(&self, buffer: &mut [f64], source: usize) -> Result<(), Error>;

    /// Sends `buffer[offset..offset + len]` to `dest`. A zero `len` sends
    /// nothing.
    async fn send(
        &self,
        buffer: &[f64],
        offset: usize,
        len: usize,
        dest: usize,
        tag: u64,
    ) -> Result<(), Error>;

    /// Starts receiving `len` elements from `source` and returns without
    /// waiting. Returns `None` for a zero `len`.
    fn post_receive(
        &self,
        offset: usize,
        len: usize,
        source: usize,
        tag: u64,
    ) -> Result<Option<Request>, Error>;

    /// Waits for every request and lands its payload in `buffer`.
    async fn wait_all(&self, buffer: &mut [f64], requests: Vec<Request>) -> Result<(), Error> {
        wait_all(buffer, requests).await
    }
}
