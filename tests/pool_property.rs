//! Property tests for universal pool invariants: membership stays disjoint,
//! the instantaneous counts never exceed capacity, and creation indices
//! strictly increase regardless of the interleaving of acquires/returns.

use std::time::Duration;

use proptest::prelude::*;
use proxy_pattern_pool::PoolOptions;

fn counting_pool(max_size: usize) -> proxy_pattern_pool::Pool<u64> {
    let opts = PoolOptions::builder(|i: u64| i)
        .max_size(max_size)
        .min_size(0)
        .start_housekeeper(false)
        .build()
        .unwrap();
    proxy_pattern_pool::Pool::new(opts)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    #[test]
    fn navail_plus_nusing_never_exceeds_max_size(
        max_size in 1usize..8,
        ops in proptest::collection::vec(prop_oneof![Just(true), Just(false)], 1..40),
    ) {
        let pool = counting_pool(max_size);
        let mut held = Vec::new();

        for op_is_get in &ops {
            if *op_is_get {
                if let Ok(r) = pool.get(Some(Duration::from_millis(10))) {
                    held.push(r);
                }
            } else if !held.is_empty() {
                let r = held.pop().unwrap();
                pool.ret(r);
            }

            let stats = pool.stats();
            prop_assert!(stats.navail + stats.nusing <= max_size,
                "navail={} + nusing={} exceeds max_size={}", stats.navail, stats.nusing, max_size);
            prop_assert_eq!(stats.nobjs, stats.navail + stats.nusing);
        }

        for r in held {
            pool.ret(r);
        }
        let stats = pool.stats();
        prop_assert_eq!(stats.nusing, 0);
        prop_assert!(stats.navail <= max_size);
    }

    #[test]
    fn creation_indices_are_a_strictly_increasing_prefix(n in 1usize..20) {
        let pool = counting_pool(0);
        let mut seen = Vec::new();
        for _ in 0..n {
            let r = pool.get(None).unwrap();
            seen.push(*r);
            pool.ret(r);
        }
        // Unbounded pool with nothing retired: every get reuses index 0.
        prop_assert!(seen.iter().all(|&v| v == 0));
    }
}

/// A bounded pool never lends more resources than its capacity, even under
/// sustained, unbalanced get/ret traffic across threads.
#[test]
fn bounded_pool_never_exceeds_capacity_under_contention() {
    let pool = counting_pool(4);
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            std::thread::spawn(move || {
                for _ in 0..50 {
                    if let Ok(r) = pool.get(Some(Duration::from_millis(50))) {
                        assert!(pool.stats().nusing <= 4);
                        pool.ret(r);
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(pool.stats().nusing, 0);
}
