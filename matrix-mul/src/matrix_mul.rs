//! SPMD matrix multiplication driver.

use std::fmt;

use rank_comm::Communicator;
use tracing::{debug, info, instrument};

use crate::Error;
use crate::compute::multiply_rows;
use crate::consolidate::consolidate;
use crate::matrix::Matrix;
use crate::partition::{RowRange, plan};
use crate::replicate::replicate;

/// Rank that holds the inputs and receives the assembled result unless
/// told otherwise.
pub const SOURCE_RANK: usize = 0;

/// Progress of one rank through one multiply call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Partitioned,
    Replicated,
    Computed,
    Consolidated,
    Done,
}

impl Phase {
    pub fn next(self) -> Phase {
        match self {
            Phase::Start => Phase::Partitioned,
            Phase::Partitioned => Phase::Replicated,
            Phase::Replicated => Phase::Computed,
            Phase::Computed => Phase::Consolidated,
            Phase::Consolidated | Phase::Done => Phase::Done,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Start => "start",
            Phase::Partitioned => "partitioned",
            Phase::Replicated => "replicated",
            Phase::Computed => "computed",
            Phase::Consolidated => "consolidated",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Multiplies matrices cooperatively across every rank of `comm`'s world.
///
/// Every rank builds a `MatrixMul` with the same source and calls
/// [`multiply`](Self::multiply) with matrices of the same shapes. The
/// inputs only need to be populated on the source; the result must be
/// zero-filled everywhere.
pub struct MatrixMul<'a, C: ?Sized> {
    comm: &'a C,
    source: usize,
}

impl<'a, C> MatrixMul<'a, C>
where
    C: Communicator + ?Sized,
{
    /// Uses [`SOURCE_RANK`] as the source.
    pub fn new(comm: &'a C) -> Self {
        Self {
            comm,
            source: SOURCE_RANK,
        }
    }

    pub fn with_source(comm: &'a C, source: usize) -> Result<Self, Error> {
        if source >= comm.world_size() {
            return Err(Error::InvalidSource(source, comm.world_size()));
        }
        Ok(Self { comm, source })
    }

    pub fn source(&self) -> usize {
        self.source
    }

    pub fn is_source(&self) -> bool {
        self.comm.rank() == self.source
    }

    /// Rows of an `nrows`-row result this rank computes.
    pub fn row_range(&self, nrows: usize) -> RowRange {
        plan(nrows, self.comm.world_size(), self.comm.rank())
    }

    /// Runs partition, replication, local compute and consolidation, and
    /// returns the rows this rank computed.
    ///
    /// On return `first` and `second` equal the source's on every rank and
    /// `result` on the source holds `first × second`.
    #[instrument(
        name = "multiply",
        skip_all,
        fields(rank = self.comm.rank(), world_size = self.comm.world_size(), source = self.source)
    )]
    pub async fn multiply(
        &self,
        first: &mut Matrix,
        second: &mut Matrix,
        result: &mut Matrix,
    ) -> Result<RowRange, Error> {
        let mut phase = Phase::Start;

        let range = self.row_range(result.rows());
        phase = self.advance(phase);
        debug!(start = range.start, end = range.end, "rows assigned");

        replicate(self.comm, first, self.source).await?;
        replicate(self.comm, second, self.source).await?;
        phase = self.advance(phase);

        multiply_rows(first, second, result, range);
        phase = self.advance(phase);

        consolidate(self.comm, result, self.source).await?;
        phase = self.advance(phase);

        let done = self.advance(phase);
        debug_assert_eq!(done, Phase::Done);
        if self.is_source() {
            info!(rows = result.rows(), cols = result.cols(), "product assembled");
        }
        Ok(range)
    }

    fn advance(&self, phase: Phase) -> Phase {
        let next = phase.next();
        debug!(from = %phase, to = %next, "phase");
        next
    }
}

/// Multiplies `first × second` into `result` on [`SOURCE_RANK`].
pub async fn parallel_matrix_multiply<C>(
    first: &mut Matrix,
    second: &mut Matrix,
    result: &mut Matrix,
    comm: &C,
) -> Result<RowRange, Error>
where
    C: Communicator + ?Sized,
{
    MatrixMul::new(comm).multiply(first, second, result).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_run_in_a_straight_line() {
        let mut phase = Phase::Start;
        let mut seen = vec![phase];
        while phase != Phase::Done {
            phase = phase.next();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                Phase::Start,
                Phase::Partitioned,
                Phase::Replicated,
                Phase::Computed,
                Phase::Consolidated,
                Phase::Done,
            ]
        );
        assert_eq!(Phase::Done.next(), Phase::Done);
    }

    #[test]
    fn rejects_source_outside_world() {
        let comms = rank_comm::LocalWorld::create(2).unwrap();
        assert!(matches!(
            MatrixMul::with_source(&comms[0], 2),
            Err(Error::InvalidSource(2, 2))
        ));
        assert_eq!(MatrixMul::with_source(&comms[0], 1).unwrap().source(), 1);
    }
}
