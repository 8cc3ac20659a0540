//! Command-line configuration for the `matrix-mul` binary.

use crate::Error;

pub const RANK_VAR: &str = "SPMD_RANK";
pub const WORLD_SIZE_VAR: &str = "SPMD_WORLD_SIZE";

const DEFAULT_DIM: usize = 2;

pub const USAGE: &str = "\
matrix-mul local <world_size> [m] [n] [p] [seed]
matrix-mul rank <addr> <session> <rank|-> <world_size|-> [m] [n] [p] [seed]

Multiplies an m×n matrix by an n×p matrix across world_size ranks.
A `-` rank or world size is read from SPMD_RANK / SPMD_WORLD_SIZE.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Every rank runs as a task in this process.
    Local,
    /// This process is one rank talking to a relay server.
    Rank {
        addr: String,
        session: String,
        rank: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub mode: Mode,
    pub world_size: usize,
    pub m: usize,
    pub n: usize,
    pub p: usize,
    /// Random inputs from this seed; sequential 1, 2, 3, ... without one.
    pub seed: Option<u64>,
}

impl RunConfig {
    /// Parses `std::env::args()`-style arguments, program name included.
    pub fn from_args(args: &[String]) -> Result<Self, Error> {
        Self::parse(args, |var| std::env::var(var).ok())
    }

    pub fn parse(args: &[String], env: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mode = args.get(1).map(String::as_str);
        let (mode, world_size, rest) = match mode {
            Some("local") => {
                let world_size = required(args, 2, "world_size")?.parse::<usize>()?;
                (Mode::Local, world_size, 3)
            }
            Some("rank") => {
                let addr = required(args, 2, "addr")?.to_string();
                let session = required(args, 3, "session")?.to_string();
                let rank = from_arg_or_env(required(args, 4, "rank")?, RANK_VAR, &env)?;
                let world_size =
                    from_arg_or_env(required(args, 5, "world_size")?, WORLD_SIZE_VAR, &env)?;
                (
                    Mode::Rank {
                        addr,
                        session,
                        rank,
                    },
                    world_size,
                    6,
                )
            }
            Some(other) => return Err(Error::Usage(format!("unknown mode {}", other))),
            None => return Err(Error::Usage("missing mode".to_string())),
        };

        if world_size == 0 {
            return Err(Error::Usage("world_size must be at least 1".to_string()));
        }
        if let Mode::Rank { rank, .. } = &mode {
            if *rank >= world_size {
                return Err(Error::Usage(format!(
                    "rank {} is outside a world of size {}",
                    rank, world_size
                )));
            }
        }

        let dim = |i: usize| -> Result<usize, Error> {
            Ok(args.get(rest + i).map(|s| s.parse()).transpose()?.unwrap_or(DEFAULT_DIM))
        };
        let m = dim(0)?;
        let n = dim(1)?;
        let p = dim(2)?;
        let seed = args
            .get(rest + 3)
            .map(|s| s.parse::<u64>())
            .transpose()?;

        Ok(Self {
            mode,
            world_size,
            m,
            n,
            p,
            seed,
        })
    }
}

fn required<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str, Error> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| Error::Usage(format!("missing <{}>", name)))
}

fn from_arg_or_env(
    value: &str,
    var: &str,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<usize, Error> {
    if value != "-" {
        return Ok(value.parse()?);
    }
    let value = env(var).ok_or_else(|| Error::Usage(format!("{} is not set", var)))?;
    Ok(value.parse()?)
}
