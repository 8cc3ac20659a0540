//! SPMD matrix multiplication over rank-to-rank message passing.
//!
//! Every rank of a world runs the same code: it works out which
//! contiguous block of result rows it owns, receives both operands by
//! broadcast from the source rank, computes its rows, and sends them back
//! to the source, which assembles the full product.
//!
//! The ranks talk through any [`rank_comm::Communicator`]: tasks in one
//! process with [`rank_comm::LocalWorld`], or separate processes sharing a
//! relay server with [`rank_comm::RelayComm`].
//!
//! # Example
//!
//! ```no_run
//! use matrix_mul::{Matrix, parallel_matrix_multiply};
//! use rank_comm::{Communicator, LocalWorld};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let results = LocalWorld::run(2, |comm| async move {
//!         let (mut a, mut b) = if comm.rank() == 0 {
//!             (
//!                 Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]])?,
//!                 Matrix::from_rows(vec![vec![5.0, 6.0], vec![7.0, 8.0]])?,
//!             )
//!         } else {
//!             (Matrix::zeros(2, 2), Matrix::zeros(2, 2))
//!         };
//!         let mut c = Matrix::zeros(2, 2);
//!         parallel_matrix_multiply(&mut a, &mut b, &mut c, &comm).await?;
//!         Ok::<_, matrix_mul::Error>(c)
//!     })
//!     .await?;
//!
//!     let c = results.into_iter().next().unwrap()?;
//!     assert_eq!(c.to_rows(), vec![vec![19.0, 22.0], vec![43.0, 50.0]]);
//!     Ok(())
//! }
//! ```

pub mod compute;
pub mod config;
pub mod consolidate;
mod error;
mod matrix;
mod matrix_mul;
pub mod partition;
pub mod replicate;

pub use compute::{multiply_rows, multiply_sequential};
pub use error::Error;
pub use matrix::Matrix;
pub use matrix_mul::{MatrixMul, Phase, SOURCE_RANK, parallel_matrix_multiply};
pub use partition::{RowRange, plan, plan_all};
