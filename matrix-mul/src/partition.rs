//! Block partition of result rows across ranks.

use std::ops::Range;

/// Half-open interval `[start, end)` of row indices owned by one rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Offset and length of these rows in a flat row-major buffer with
    /// `cols` columns.
    pub fn extent(&self, cols: usize) -> (usize, usize) {
        (self.start * cols, self.len() * cols)
    }

    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Rows owned by `rank` out of `nrows`, split into contiguous chunks of
/// `ceil(nrows / world_size)`. Ranks past the last chunk get the empty
/// range `[nrows, nrows)`.
///
/// `world_size` must be at least 1.
pub fn plan(nrows: usize, world_size: usize, rank: usize) -> RowRange {
    let chunk = nrows.div_ceil(world_size);
    let start = rank.saturating_mul(chunk);
    if start >= nrows {
        return RowRange {
            start: nrows,
            end: nrows,
        };
    }
    RowRange {
        start,
        end: (start + chunk).min(nrows),
    }
}

/// Every rank's range, in rank order.
pub fn plan_all(nrows: usize, world_size: usize) -> Vec<RowRange> {
    (0..world_size)
        .map(|rank| plan(nrows, world_size, rank))
        .collect()
}
