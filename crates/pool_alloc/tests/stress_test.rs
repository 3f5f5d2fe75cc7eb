//! Allocation stress regression for pools and the pool manager.
//!
//! Fill every allocation with its own index, verify, release everything,
//! then do it again on the recycled memory.
//!
//! The typed pool runs the full ten million `u32` values by default (about
//! 40MB of blocks). The manager variant at that count also keeps ten million
//! handles alive, so it is `#[ignore]`d; run it with `cargo test -- --ignored`.

use pool_alloc::{MemoryManager, PoolManager, TypedPool, DEFAULT_MAX_CHUNK_BYTES};

const COUNT: u32 = 1_000_000;
const FULL_COUNT: u32 = 10_000_000;

fn run_typed_pool(count: u32) {
    let mut pool: TypedPool<u32> = TypedPool::new(1024);

    for round in 0..2 {
        let handles: Vec<_> = (0..count).map(|i| pool.alloc(i)).collect();

        let correct = handles
            .iter()
            .enumerate()
            .filter(|&(i, h)| pool.get(h) == i as u32)
            .count();
        assert_eq!(correct, count as usize, "round {round}");

        for h in handles {
            let _ = pool.release(h);
        }
    }

    // The second round ran entirely on recycled blocks.
    assert_eq!(pool.pool().capacity(), (count as usize).div_ceil(1024) * 1024);
}

fn run_manager(count: u32) {
    let mut pools =
        PoolManager::from_sizes([10, 1, 14, 20, 9, 8], DEFAULT_MAX_CHUNK_BYTES).unwrap();

    for round in 0..2 {
        let handles: Vec<_> = (0..count).map(|i| pools.alloc_value(i)).collect();

        let correct = handles
            .iter()
            .enumerate()
            .filter(|&(i, h)| pools.get(h) == i as u32)
            .count();
        assert_eq!(correct, count as usize, "round {round}");

        for h in handles {
            let _ = pools.release_value(h);
        }
    }

    // u32 lands in the smallest class; no other pool was touched.
    assert!(pools.pools()[0].chunk_count() > 0);
    assert!(pools.pools()[1..].iter().all(|p| p.chunk_count() == 0));
}

#[test]
fn test_typed_pool_stress() {
    run_typed_pool(FULL_COUNT);
}

#[test]
fn test_manager_stress() {
    run_manager(COUNT);
}

#[test]
#[ignore = "holds ten million handles; run with --ignored"]
fn test_manager_stress_full() {
    run_manager(FULL_COUNT);
}

#[test]
fn test_growth_is_unbounded() {
    let mut pools = PoolManager::from_sizes([64], 256).unwrap();

    let handles: Vec<_> = (0..10_000).map(|_| pools.alloc(64)).collect();
    assert_eq!(pools.pools()[0].blocks_per_chunk(), 4);
    assert_eq!(pools.pools()[0].chunk_count(), 2_500);

    let mut addresses: Vec<usize> = handles
        .iter()
        .map(|h| pools.bytes(h).as_ptr() as usize)
        .collect();
    addresses.sort_unstable();
    addresses.dedup();
    assert_eq!(addresses.len(), handles.len());

    for h in handles {
        pools.release(h);
    }
}

#[test]
fn test_interface_mirrors_sized_release() {
    let mut pools =
        PoolManager::from_sizes([10, 1, 14, 20, 9, 8], DEFAULT_MAX_CHUNK_BYTES).unwrap();

    let handles: Vec<_> = (0..10_000).map(|_| pools.allocate_type::<u32>(1)).collect();
    for h in handles {
        pools.deallocate_type::<u32>(h, 1);
    }

    let again = pools.allocate_type::<u32>(1);
    assert_eq!(again.class(), Some(0));
    pools.deallocate_type::<u32>(again, 1);
}
