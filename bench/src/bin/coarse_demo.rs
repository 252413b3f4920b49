use std::sync::Arc;

use bench::{parse_concurrent_args, run_harness};
use rsds::set::CoarseSet;

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (num_threads, initial_capacity, chunk_size) = parse_concurrent_args(&args)?;

    log::info!("coarse_demo: {num_threads} threads, initial_capacity={initial_capacity}, chunk_size={chunk_size}");

    let set = Arc::new(CoarseSet::new(initial_capacity));
    let expected = (num_threads + 1) * chunk_size;
    let final_size = run_harness(set, num_threads, chunk_size);

    if final_size != expected {
        log::error!("mismatch: expected size {expected}, got {final_size}");
        std::process::exit(1);
    }
    log::info!("coarse_demo: ok, size={final_size}");

    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}
