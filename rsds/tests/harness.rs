//! Multi-threaded round-trip tests against every concurrent variant: `T`
//! threads each own the range `[i*chunk_size, i*chunk_size + 2*chunk_size)`
//! (adjacent workers overlap by `chunk_size`), Add it, cycle
//! Contains/Remove-divisible-by-20 twenty times, then re-Add it. The union of
//! every worker's range is `[0, (T+1)*chunk_size)`, so the set's final `Size`
//! must equal `(T+1) * chunk_size`.

use std::sync::Arc;

use rsds::set::{CoarseSet, ConcurrentSet, RefinableSet, StripedSet};

fn run_harness<S>(set: Arc<S>, num_threads: usize, chunk_size: usize) -> usize
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
        h.join().unwrap();
    }

    set.size()
}

#[test]
fn coarse_round_trip_eight_threads() {
    let set = Arc::new(CoarseSet::new(4));
    let size = run_harness(set.clone(), 8, 100);
    assert_eq!(size, 9 * 100);
    for v in 0..900 {
        assert!(set.contains(v));
    }
}

#[test]
fn striped_round_trip_eight_threads() {
    let set = Arc::new(StripedSet::new(4));
    let size = run_harness(set.clone(), 8, 100);
    assert_eq!(size, 9 * 100);
    assert_eq!(set.lock_count(), 4);
}

#[test]
fn refinable_round_trip_eight_threads() {
    let set = Arc::new(RefinableSet::new(4));
    let size = run_harness(set.clone(), 8, 100);
    assert_eq!(size, 9 * 100);
}

#[test]
fn striped_two_threads_disjoint_ranges() {
    let set = Arc::new(StripedSet::new(4));
    let a = {
        let set = set.clone();
        std::thread::spawn(move || {
            for v in 0..500usize {
                set.add(v);
            }
        })
    };
    let b = {
        let set = set.clone();
        std::thread::spawn(move || {
            for v in 500..1000usize {
                set.add(v);
            }
        })
    };
    a.join().unwrap();
    b.join().unwrap();

    assert_eq!(set.size(), 1000);
    assert_eq!(set.lock_count(), 4);
    for v in 0..1000 {
        assert!(set.contains(v));
    }
}

#[test]
fn refinable_stress_sixteen_threads() {
    let set = Arc::new(RefinableSet::new(4));
    let size = run_harness(set.clone(), 16, 100);
    assert_eq!(size, 17 * 100);
    for v in 0..1700 {
        assert!(set.contains(v));
    }
}

#[test]
fn coarse_vs_sequential_oracle_agree() {
    use rsds::set::SequentialSet;

    let sequential = SequentialSet::new(4);
    let coarse = CoarseSet::new(4);

    for v in 0..2000usize {
        assert_eq!(sequential.add(v), coarse.add(v));
    }
    for v in (0..2000usize).step_by(3) {
        assert_eq!(sequential.remove(v), coarse.remove(v));
    }
    for v in 0..2000usize {
        assert_eq!(sequential.contains(v), coarse.contains(v));
    }
    assert_eq!(sequential.size(), coarse.size());
}
