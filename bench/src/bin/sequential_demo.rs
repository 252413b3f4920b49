use bench::parse_sequential_args;
use rsds::set::{ConcurrentSet, SequentialSet};

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (initial_capacity, count) = parse_sequential_args(&args)?;

    let set = SequentialSet::new(initial_capacity);
    for v in 0..count {
        set.add(v);
    }
    log::debug!("added {count} keys, bucket_count now unknown to the caller by design");

    for v in 0..count {
        if !set.contains(v) {
            log::error!("mismatch: expected {v} to be present after add, was absent");
            std::process::exit(1);
        }
    }
    for v in 0..count {
        set.remove(v);
    }
    if set.size() != 0 {
        log::error!("mismatch: expected size 0 after removing every key, got {}", set.size());
        std::process::exit(1);
    }

    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}
