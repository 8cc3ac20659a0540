//! Replication of the input operands from the source rank.

use rank_comm::Communicator;
use tracing::debug;

use crate::Error;
use crate::matrix::Matrix;

/// Broadcasts `matrix` from `source`; on return every rank's copy equals
/// the source's. Collective: every rank calls it in the same order with a
/// matrix of the same shape.
pub async fn replicate<C>(comm: &C, matrix: &mut Matrix, source: usize) -> Result<(), Error>
where
    C: Communicator + ?Sized,
{
    let (rows, cols) = (matrix.rows(), matrix.cols());
    comm.broadcast(matrix.values_mut(), source).await?;
    debug!(rank = comm.rank(), source, rows, cols, "operand replicated");
    Ok(())
}
