use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use matrix_mul::{Matrix, MatrixMul, RowRange, multiply_sequential, parallel_matrix_multiply};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rank_comm::{Communicator, LocalWorld, Request};

/// Counts the point-to-point traffic a rank issues.
struct Counting<C> {
    inner: C,
    sends: AtomicUsize,
    posted: AtomicUsize,
}

impl<C> Counting<C> {
    fn new(inner: C) -> Self {
        Self {
            inner,
            sends: AtomicUsize::new(0),
            posted: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl<C: Communicator> Communicator for Counting<C> {
    fn rank(&self) -> usize {
        self.inner.rank()
    }

    fn world_size(&self) -> usize {
        self.inner.world_size()
    }

    async fn broadcast(&self, buffer: &mut [f64], source: usize) -> Result<(), rank_comm::Error> {
        self.inner.broadcast(buffer, source).await
    }

    async fn send(
        &self,
        buffer: &[f64],
        offset: usize,
        len: usize,
        dest: usize,
        tag: u64,
    ) -> Result<(), rank_comm::Error> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        self.inner.send(buffer, offset, len, dest, tag).await
    }

    fn post_receive(
        &self,
        offset: usize,
        len: usize,
        source: usize,
        tag: u64,
    ) -> Result<Option<Request>, rank_comm::Error> {
        let request = self.inner.post_receive(offset, len, source, tag)?;
        if request.is_some() {
            self.posted.fetch_add(1, Ordering::SeqCst);
        }
        Ok(request)
    }
}

struct RankOutput {
    range: RowRange,
    first: Matrix,
    second: Matrix,
    result: Matrix,
    sends: usize,
    posted: usize,
}

/// Runs one multiply across a local world; only `source` starts with the
/// operands.
async fn run_world(world_size: usize, a: &Matrix, b: &Matrix, source: usize) -> Vec<RankOutput> {
    let (a, b) = (a.clone(), b.clone());
    LocalWorld::run(world_size, move |comm| {
        let (a, b) = (a.clone(), b.clone());
        async move {
            let comm = Counting::new(comm);
            let (mut first, mut second) = if comm.rank() == source {
                (a, b)
            } else {
                (Matrix::zeros(a.rows(), a.cols()), Matrix::zeros(b.rows(), b.cols()))
            };
            let mut result = Matrix::zeros(first.rows(), second.cols());

            let range = MatrixMul::with_source(&comm, source)?
                .multiply(&mut first, &mut second, &mut result)
                .await?;

            Ok::<_, matrix_mul::Error>(RankOutput {
                range,
                first,
                second,
                result,
                sends: comm.sends.load(Ordering::SeqCst),
                posted: comm.posted.load(Ordering::SeqCst),
            })
        }
    })
    .await
    .unwrap()
    .into_iter()
    .map(|output| output.unwrap())
    .collect()
}

fn sequential(a: &Matrix, b: &Matrix) -> Matrix {
    let mut c = Matrix::zeros(a.rows(), b.cols());
    multiply_sequential(a, b, &mut c);
    c
}

fn random(rows: usize, cols: usize, seed: u64) -> Matrix {
    Matrix::random(rows, cols, &mut StdRng::seed_from_u64(seed))
}

fn ranges(outputs: &[RankOutput]) -> Vec<(usize, usize)> {
    outputs.iter().map(|o| (o.range.start, o.range.end)).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn identity_times_b_on_two_ranks() {
    let b = Matrix::from_rows(vec![
        vec![1.0, -2.0, 3.5, 0.25],
        vec![4.0, 5.0, -6.0, 7.0],
        vec![8.5, 9.0, 10.0, -11.0],
        vec![12.0, 13.0, 14.0, 15.5],
    ])
    .unwrap();

    let outputs = run_world(2, &Matrix::identity(4), &b, 0).await;

    assert_eq!(ranges(&outputs), vec![(0, 2), (2, 4)]);
    assert_eq!(outputs[0].result, b);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn non_square_product_one_row_per_rank() {
    let a = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
    let b = Matrix::from_rows(vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0, 8.0]]).unwrap();

    let outputs = run_world(3, &a, &b, 0).await;

    assert_eq!(ranges(&outputs), vec![(0, 1), (1, 2), (2, 3)]);
    assert_eq!(
        outputs[0].result.to_rows(),
        vec![
            vec![11.0, 14.0, 17.0, 20.0],
            vec![23.0, 30.0, 37.0, 44.0],
            vec![35.0, 46.0, 57.0, 68.0],
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn uneven_split_gives_last_rank_one_row() {
    let a = Matrix::sequential(5, 3);
    let b = Matrix::sequential(3, 2);

    let outputs = run_world(3, &a, &b, 0).await;

    assert_eq!(ranges(&outputs), vec![(0, 2), (2, 4), (4, 5)]);
    assert_eq!(outputs[0].result, sequential(&a, &b));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_rank_matches_sequential_product() {
    let a = random(6, 4, 1);
    let b = random(4, 3, 2);

    let outputs = run_world(1, &a, &b, 0).await;

    assert_eq!(ranges(&outputs), vec![(0, 6)]);
    assert_eq!(outputs[0].result, sequential(&a, &b));
    assert_eq!((outputs[0].sends, outputs[0].posted), (0, 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn result_is_identical_for_every_world_size() {
    let a = random(7, 5, 11);
    let b = random(5, 4, 12);
    let expected = sequential(&a, &b);

    for world_size in 1..=a.rows() {
        let outputs = run_world(world_size, &a, &b, 0).await;
        let result = &outputs[0].result;
        for (x, y) in result.values().iter().zip(expected.values()) {
            assert_eq!(x.to_bits(), y.to_bits(), "world_size={}", world_size);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn surplus_ranks_neither_send_nor_receive() {
    let a = random(2, 3, 21);
    let b = random(3, 2, 22);

    let outputs = run_world(5, &a, &b, 0).await;

    assert_eq!(ranges(&outputs), vec![(0, 1), (1, 2), (2, 2), (2, 2), (2, 2)]);
    assert_eq!(outputs[0].result, sequential(&a, &b));

    // rank 0 only waits on rank 1, the only other rank with rows
    assert_eq!((outputs[0].sends, outputs[0].posted), (0, 1));
    assert_eq!((outputs[1].sends, outputs[1].posted), (1, 0));
    for output in &outputs[2..] {
        assert_eq!((output.sends, output.posted), (0, 0));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn operands_are_replicated_to_every_rank() {
    let a = random(4, 3, 31);
    let b = random(3, 5, 32);

    let outputs = run_world(3, &a, &b, 0).await;

    for output in &outputs {
        assert_eq!(output.first, a);
        assert_eq!(output.second, b);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn non_zero_source_assembles_the_product() {
    let a = random(5, 2, 41);
    let b = random(2, 3, 42);

    let outputs = run_world(3, &a, &b, 2).await;

    assert_eq!(outputs[2].result, sequential(&a, &b));
    assert_eq!(outputs[2].sends, 0);
    assert_eq!(outputs[2].posted, 2);
    assert_eq!((outputs[0].sends, outputs[1].sends), (1, 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn non_source_results_hold_only_their_own_rows() {
    let a = Matrix::sequential(4, 2);
    let b = Matrix::sequential(2, 2);
    let expected = sequential(&a, &b);

    let outputs = run_world(2, &a, &b, 0).await;

    let rank1 = &outputs[1].result;
    assert_eq!(rank1.row(2), expected.row(2));
    assert_eq!(rank1.row(3), expected.row(3));
    assert_eq!(rank1.row(0), &[0.0, 0.0]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn back_to_back_multiplies_share_a_world() {
    let a1 = random(4, 4, 51);
    let b1 = random(4, 4, 52);
    let a2 = random(3, 4, 53);
    let b2 = random(4, 2, 54);
    let expected = (sequential(&a1, &b1), sequential(&a2, &b2));

    let outputs = LocalWorld::run(3, move |comm| {
        let inputs = (a1.clone(), b1.clone(), a2.clone(), b2.clone());
        async move {
            let mut results = Vec::new();
            for (a, b) in [(inputs.0, inputs.1), (inputs.2, inputs.3)] {
                let (mut first, mut second) = if comm.rank() == 0 {
                    (a, b)
                } else {
                    (Matrix::zeros(a.rows(), a.cols()), Matrix::zeros(b.rows(), b.cols()))
                };
                let mut result = Matrix::zeros(first.rows(), second.cols());
                let comm: &dyn Communicator = &comm;
                parallel_matrix_multiply(&mut first, &mut second, &mut result, comm).await?;
                results.push(result);
            }
            Ok::<_, matrix_mul::Error>(results)
        }
    })
    .await
    .unwrap();

    let source = outputs.into_iter().next().unwrap().unwrap();
    assert_eq!(source[0], expected.0);
    assert_eq!(source[1], expected.1);
}
