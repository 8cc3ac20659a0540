use std::env;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rank_comm::{Communicator, LocalWorld, RelayComm};
use tracing::{info, warn};

use matrix_mul::config::{Mode, RunConfig, USAGE};
use matrix_mul::{Matrix, MatrixMul, multiply_sequential};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let config = match RunConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", USAGE);
            std::process::exit(1);
        }
    };

    match config.mode.clone() {
        Mode::Local => {
            info!(world_size = config.world_size, "running every rank in-process");
            let outputs = LocalWorld::run(config.world_size, |comm| {
                let config = config.clone();
                async move { run_rank(&comm, &config).await }
            })
            .await?;
            for output in outputs {
                output?;
            }
        }
        Mode::Rank {
            addr,
            session,
            rank,
        } => {
            info!(%addr, %session, rank, world_size = config.world_size, "connecting to relay");
            let comm = RelayComm::connect(addr, session, rank, config.world_size).await?;
            run_rank(&comm, &config).await?;
        }
    }

    Ok(())
}

/// Runs one rank: the source fills the operands, every rank multiplies,
/// and the source prints and checks the product.
async fn run_rank<C: Communicator>(comm: &C, config: &RunConfig) -> Result<(), matrix_mul::Error> {
    let mm = MatrixMul::new(comm);
    let (m, n, p) = (config.m, config.n, config.p);

    let (mut a, mut b) = if mm.is_source() {
        match config.seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                (Matrix::random(m, n, &mut rng), Matrix::random(n, p, &mut rng))
            }
            None => (Matrix::sequential(m, n), Matrix::sequential(n, p)),
        }
    } else {
        (Matrix::zeros(m, n), Matrix::zeros(n, p))
    };
    let mut c = Matrix::zeros(m, p);
    Matrix::check_product(&a, &b, &c)?;

    if mm.is_source() {
        println!("Matrix A ({}x{}):", m, n);
        for row in a.to_rows() {
            println!("  {:?}", row);
        }
        println!("Matrix B ({}x{}):", n, p);
        for row in b.to_rows() {
            println!("  {:?}", row);
        }
    }

    let range = mm.multiply(&mut a, &mut b, &mut c).await?;
    info!(rank = comm.rank(), start = range.start, end = range.end, "rank finished");

    if mm.is_source() {
        println!("Result ({}x{}):", m, p);
        for row in c.to_rows() {
            println!("  {:?}", row);
        }

        let mut expected = Matrix::zeros(m, p);
        multiply_sequential(&a, &b, &mut expected);
        if expected == c {
            info!("result matches the sequential product");
        } else {
            warn!("result differs from the sequential product");
        }
    }

    Ok(())
}
