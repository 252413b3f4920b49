//! Shared CLI-argument parsing and worker harness for the demo binaries.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use rsds::set::ConcurrentSet;

/// A recoverable failure parsing the demo binaries' positional arguments.
///
/// This is the one place in the crate that returns a `Result`: malformed
/// input is an ordinary user-facing failure, not a programmer error.
#[derive(Debug)]
pub enum DemoError {
    /// Too few or too many positional arguments were given.
    WrongArgCount { expected: usize, got: usize },
    /// An argument could not be parsed as the numeric type it names.
    NotANumber { arg: String, source: std::num::ParseIntError },
    /// An argument was parsed but violates a constructor's precondition.
    NotPositive { arg: String, value: i64 },
}

impl fmt::Display for DemoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemoError::WrongArgCount { expected, got } => {
                write!(f, "expected {expected} positional arguments, got {got}")
            }
            DemoError::NotANumber { arg, source } => {
                write!(f, "argument {arg:?} is not a number: {source}")
            }
            DemoError::NotPositive { arg, value } => {
                write!(f, "argument {arg:?} must be positive, got {value}")
            }
        }
    }
}

impl Error for DemoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DemoError::NotANumber { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn parse_positive(arg: &str) -> Result<usize, DemoError> {
    let value: i64 = arg.parse().map_err(|source| DemoError::NotANumber {
        arg: arg.to_string(),
        source,
    })?;
    if value <= 0 {
        return Err(DemoError::NotPositive { arg: arg.to_string(), value });
    }
    Ok(value as usize)
}

/// Parses the three positional arguments shared by every concurrent demo:
/// `num_threads`, `initial_capacity`, `chunk_size`.
pub fn parse_concurrent_args(args: &[String]) -> Result<(usize, usize, usize), DemoError> {
    if args.len() != 3 {
        return Err(DemoError::WrongArgCount { expected: 3, got: args.len() });
    }
    let num_threads = parse_positive(&args[0])?;
    let initial_capacity = parse_positive(&args[1])?;
    let chunk_size = parse_positive(&args[2])?;
    Ok((num_threads, initial_capacity, chunk_size))
}

/// Parses the two positional arguments of the sequential demo:
/// `initial_capacity`, `count`.
pub fn parse_sequential_args(args: &[String]) -> Result<(usize, usize), DemoError> {
    if args.len() != 2 {
        return Err(DemoError::WrongArgCount { expected: 2, got: args.len() });
    }
    let initial_capacity = parse_positive(&args[0])?;
    let count = parse_positive(&args[1])?;
    Ok((initial_capacity, count))
}

/// Runs the worker-thread harness of the benchmark collaborator contract
/// against `set`, returning the final `Size` observed after every worker
/// joins.
///
/// Worker `i` (0-indexed) owns the range `[i * chunk_size, i * chunk_size +
/// 2*chunk_size)`: it Adds the whole range, performs twenty passes of
/// Contains-every-element-and-Remove-those-divisible-by-20, then re-Adds its
/// range. Adjacent workers' ranges overlap by `chunk_size`, so their union is
/// `[0, (num_threads + 1) * chunk_size)`.
pub fn run_harness<S>(set: Arc<S>, num_threads: usize, chunk_size: usize) -> usize
where
    S: ConcurrentSet<usize> + Send + Sync + 'static,
{
    let span = 2 * chunk_size;
    let handles: Vec<_> = (0..num_threads)
        .map(|i| {
            let set = set.clone();
            std::thread::spawn(move || {
                let start = i * chunk_size;
                let end = start + span;
                for v in start..end {
                    set.add(v);
                }
                for _pass in 0..20 {
                    for v in start..end {
                        set.contains(v);
                        if v % 20 == 0 {
                            set.remove(v);
                        }
                    }
                }
                for v in start..end {
                    set.add(v);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().expect("worker thread panicked");
    }

    set.size()
}
