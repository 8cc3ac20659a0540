//! Gathering every rank's result rows onto the source rank.

use rank_comm::Communicator;
use tracing::debug;

use crate::Error;
use crate::matrix::Matrix;
use crate::partition::plan;

/// Collects the result rows computed by every rank into `result` on
/// `source`.
///
/// Every other rank sends its own rows once, tagged with its rank, and
/// skips the send when it owns no rows. The source already holds its own
/// rows in place; it posts one receive per non-empty peer range before
/// waiting on any of them, so peers can deliver in any order.
///
/// After return only the source's `result` is complete. The result on
/// other ranks holds their own rows and whatever it held before elsewhere.
pub async fn consolidate<C>(comm: &C, result: &mut Matrix, source: usize) -> Result<(), Error>
where
    C: Communicator + ?Sized,
{
    let world_size = comm.world_size();
    let rank = comm.rank();
    let nrows = result.rows();
    let cols = result.cols();

    if rank == source {
        let mut requests = Vec::with_capacity(world_size.saturating_sub(1));
        for peer in (0..world_size).filter(|&p| p != source) {
            let (offset, len) = plan(nrows, world_size, peer).extent(cols);
            if let Some(request) = comm.post_receive(offset, len, peer, peer as u64)? {
                requests.push(request);
            }
        }

        debug!(rank, posted = requests.len(), "waiting for peer rows");
        comm.wait_all(result.values_mut(), requests).await?;
    } else {
        let (offset, len) = plan(nrows, world_size, rank).extent(cols);
        if len == 0 {
            debug!(rank, "no rows owned, nothing to send");
            return Ok(());
        }

        comm.send(result.values(), offset, len, source, rank as u64)
            .await?;
        debug!(rank, source, offset, len, "rows sent");
    }

    Ok(())
}
