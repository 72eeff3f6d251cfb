// ==============================================
// CONCURRENCY TESTS (integration)
// ==============================================
//
// Many threads share one cache through `Arc`. Assertions are made at
// quiescence, after every worker has joined.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use linkmap::cache::ConcurrentLinkedCache;
use linkmap::policy::EvictionPolicy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;

const THREADS: usize = 8;
const POLICIES: [EvictionPolicy; 3] = [
    EvictionPolicy::Fifo,
    EvictionPolicy::Lru,
    EvictionPolicy::SecondChance,
];

fn run_workers(threads: usize, work: impl Fn(usize) + Send + Sync + 'static) {
    let barrier = Arc::new(Barrier::new(threads));
    let work = Arc::new(work);
    let handles: Vec<_> = (0..threads)
        .map(|thread_id| {
            let barrier = barrier.clone();
            let work = work.clone();
            thread::spawn(move || {
                barrier.wait();
                work(thread_id);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

mod mixed_workload {
    use super::*;

    #[test]
    fn invariants_hold_after_mixed_operations() {
        for policy in POLICIES {
            let cache: Arc<ConcurrentLinkedCache<u64, u64>> = Arc::new(
                ConcurrentLinkedCache::builder(64)
                    .policy(policy)
                    .shards(8)
                    .access_buffer_capacity(16)
                    .build(),
            );

            let shared = cache.clone();
            run_workers(THREADS, move |thread_id| {
                let mut rng = StdRng::seed_from_u64(thread_id as u64);
                for _ in 0..5_000 {
                    let key = rng.random_range(0..256u64);
                    match rng.random_range(0..10u8) {
                        0..=3 => {
                            shared.get(&key);
                        },
                        4..=5 => {
                            shared.insert(key, key);
                        },
                        6 => {
                            shared.insert_if_absent(key, key + 1);
                        },
                        7 => {
                            shared.remove(&key);
                        },
                        8 => {
                            shared.replace_if_eq(&key, &key, key + 1);
                        },
                        _ => {
                            shared.remove_if_eq(&key, &(key + 1));
                        },
                    }
                }
            });

            cache.check_invariants().unwrap();
            assert!(cache.len() <= cache.capacity(), "{policy}");
        }
    }

    #[test]
    fn capacity_changes_race_with_writers() {
        let cache: Arc<ConcurrentLinkedCache<u64, u64>> =
            Arc::new(ConcurrentLinkedCache::new(128, EvictionPolicy::SecondChance));

        let shared = cache.clone();
        run_workers(4, move |thread_id| {
            let mut rng = StdRng::seed_from_u64(100 + thread_id as u64);
            for i in 0..2_000u64 {
                if thread_id == 0 && i % 100 == 0 {
                    let capacity = rng.random_range(1..=128usize);
                    shared.set_capacity(capacity).unwrap();
                } else {
                    let key = rng.random_range(0..512u64);
                    shared.insert(key, i);
                    shared.get(&rng.random_range(0..512u64));
                }
            }
        });

        cache.check_invariants().unwrap();
        assert!(cache.len() <= cache.capacity());
    }
}

mod notifications {
    use super::*;

    #[test]
    fn every_entry_is_reported_exactly_once() {
        const PER_THREAD: u64 = 2_000;

        for policy in POLICIES {
            let seen: Arc<Mutex<FxHashMap<u64, usize>>> = Arc::default();
            let sink = seen.clone();
            let cache: Arc<ConcurrentLinkedCache<u64, u64>> = Arc::new(
                ConcurrentLinkedCache::builder(32)
                    .policy(policy)
                    .shards(4)
                    .listener(move |key: u64, _value: Arc<u64>| {
                        *sink.lock().unwrap().entry(key).or_default() += 1;
                    })
                    .build(),
            );

            // Each key is inserted once; other threads race to remove it
            // while capacity pressure is evicting it.
            let shared = cache.clone();
            run_workers(THREADS, move |thread_id| {
                let base = thread_id as u64 * PER_THREAD;
                let neighbor = ((thread_id + 1) % THREADS) as u64 * PER_THREAD;
                for i in 0..PER_THREAD {
                    shared.insert(base + i, i);
                    shared.get(&(base + i));
                    shared.remove(&(neighbor + i));
                }
            });
            cache.clear();

            let seen = seen.lock().unwrap();
            let inserted = THREADS as u64 * PER_THREAD;
            assert_eq!(seen.len() as u64, inserted, "{policy}");
            assert!(
                seen.values().all(|&count| count == 1),
                "{policy}: some key was reported more than once"
            );
            assert!(cache.is_empty());
            cache.check_invariants().unwrap();
        }
    }

    #[test]
    fn listener_may_reenter_cache() {
        let reentered = Arc::new(AtomicUsize::new(0));
        let cache: Arc<ConcurrentLinkedCache<u64, u64>> =
            Arc::new_cyclic(|weak: &std::sync::Weak<ConcurrentLinkedCache<u64, u64>>| {
                let weak = weak.clone();
                let reentered = reentered.clone();
                ConcurrentLinkedCache::builder(4)
                    .policy(EvictionPolicy::Lru)
                    .listener(move |key: u64, _value: Arc<u64>| {
                        if let Some(cache) = weak.upgrade() {
                            let _ = cache.len();
                            let _ = cache.contains_key(&key);
                            reentered.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                    .build()
            });

        for key in 0..10 {
            cache.insert(key, key);
        }
        cache.remove(&9);
        assert_eq!(reentered.load(Ordering::SeqCst), 7);
        cache.check_invariants().unwrap();
    }
}

mod readers {
    use super::*;

    #[test]
    fn concurrent_reads_see_consistent_values() {
        let cache: Arc<ConcurrentLinkedCache<u64, u64>> =
            Arc::new(ConcurrentLinkedCache::new(1_024, EvictionPolicy::Lru));
        for key in 0..1_024u64 {
            cache.insert(key, key * 3);
        }

        let shared = cache.clone();
        run_workers(THREADS, move |thread_id| {
            for round in 0..20u64 {
                for key in (thread_id as u64..1_024).step_by(THREADS) {
                    let value = shared.get(&key).expect("no evictions at full capacity");
                    assert_eq!(*value, key * 3, "round {round}");
                }
            }
        });

        assert_eq!(cache.len(), 1_024);
        cache.check_invariants().unwrap();
        #[cfg(feature = "metrics")]
        {
            let snapshot = linkmap::metrics::MetricsSnapshotProvider::snapshot(&*cache);
            assert_eq!(snapshot.get_hits, 20 * 1_024);
            assert_eq!(snapshot.evicted_entries, 0);
        }
    }
}
