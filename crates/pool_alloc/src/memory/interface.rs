//! # Memory Manager Interface
//!
//! The two-operation allocator contract other subsystems program against.
//! Anything written over [`MemoryManager`] can switch between the plain heap
//! ([`HeapManager`]) and a [`PoolManager`] without changes.

use std::mem::{align_of, size_of};

use super::manager::{Handle, PoolManager};

/// Alignment assumed when the caller does not ask for more.
pub const DEFAULT_ALIGN: usize = 16;

/// Generic `allocate` / `deallocate` contract.
///
/// Storage is byte-addressed and read or written by copy, so `align` is
/// validated but does not constrain where an allocation is placed.
pub trait MemoryManager {
    /// Token returned by `allocate` and consumed by `deallocate`.
    type Allocation;

    /// Allocates room for `count` values of `type_size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `align` is not a power of two, if the total size overflows,
    /// or if the backing allocator fails.
    fn allocate(&mut self, type_size: usize, count: usize, align: usize) -> Self::Allocation;

    /// Gives back an allocation made with the same `type_size`, `count` and
    /// `align`.
    fn deallocate(
        &mut self,
        allocation: Self::Allocation,
        type_size: usize,
        count: usize,
        align: usize,
    );

    /// Storage behind an allocation.
    fn bytes<'a>(&'a self, allocation: &'a Self::Allocation) -> &'a [u8];

    /// Mutable storage behind an allocation.
    fn bytes_mut<'a>(&'a mut self, allocation: &'a mut Self::Allocation) -> &'a mut [u8];

    /// Allocates room for `count` values of `T`.
    fn allocate_type<T>(&mut self, count: usize) -> Self::Allocation {
        self.allocate(size_of::<T>(), count, type_align::<T>())
    }

    /// Gives back an allocation made with [`allocate_type`](Self::allocate_type).
    fn deallocate_type<T>(&mut self, allocation: Self::Allocation, count: usize) {
        self.deallocate(allocation, size_of::<T>(), count, type_align::<T>());
    }
}

fn type_align<T>() -> usize {
    align_of::<T>().max(DEFAULT_ALIGN)
}

fn total_size(type_size: usize, count: usize, align: usize) -> usize {
    assert!(align.is_power_of_two(), "alignment {align} is not a power of two");
    match type_size.checked_mul(count) {
        Some(total) => total,
        None => panic!("allocation of {count} x {type_size} bytes overflows usize"),
    }
}

/// [`MemoryManager`] over the global allocator.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapManager;

impl MemoryManager for HeapManager {
    type Allocation = Box<[u8]>;

    fn allocate(&mut self, type_size: usize, count: usize, align: usize) -> Box<[u8]> {
        vec![0u8; total_size(type_size, count, align)].into_boxed_slice()
    }

    fn deallocate(&mut self, allocation: Box<[u8]>, type_size: usize, count: usize, align: usize) {
        debug_assert_eq!(allocation.len(), total_size(type_size, count, align));
        drop(allocation);
    }

    fn bytes<'a>(&'a self, allocation: &'a Box<[u8]>) -> &'a [u8] {
        allocation
    }

    fn bytes_mut<'a>(&'a mut self, allocation: &'a mut Box<[u8]>) -> &'a mut [u8] {
        allocation
    }
}

impl MemoryManager for PoolManager {
    type Allocation = Handle;

    fn allocate(&mut self, type_size: usize, count: usize, align: usize) -> Handle {
        self.alloc(total_size(type_size, count, align))
    }

    fn deallocate(&mut self, allocation: Handle, type_size: usize, count: usize, align: usize) {
        self.release_sized(allocation, total_size(type_size, count, align));
    }

    fn bytes<'a>(&'a self, allocation: &'a Handle) -> &'a [u8] {
        PoolManager::bytes(self, allocation)
    }

    fn bytes_mut<'a>(&'a mut self, allocation: &'a mut Handle) -> &'a mut [u8] {
        PoolManager::bytes_mut(self, allocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A subsystem that only knows the interface.
    fn fill_and_sum<M: MemoryManager>(manager: &mut M, count: usize) -> u64 {
        let mut allocation = manager.allocate_type::<u32>(count);
        for (i, chunk) in manager.bytes_mut(&mut allocation)[..count * 4]
            .chunks_exact_mut(4)
            .enumerate()
        {
            chunk.copy_from_slice(&(i as u32).to_ne_bytes());
        }

        let sum = manager.bytes(&allocation)[..count * 4]
            .chunks_exact(4)
            .map(|c| u64::from(bytemuck::pod_read_unaligned::<u32>(c)))
            .sum();

        manager.deallocate_type::<u32>(allocation, count);
        sum
    }

    #[test]
    fn test_heap_and_pool_are_interchangeable() {
        let mut heap = HeapManager;
        let mut pools = PoolManager::from_sizes([8, 16, 32], 256).unwrap();

        for count in [1, 3, 8, 20] {
            let expected: u64 = (0..count as u64).sum();
            assert_eq!(fill_and_sum(&mut heap, count), expected);
            assert_eq!(fill_and_sum(&mut pools, count), expected);
        }
    }

    #[test]
    fn test_pool_dispatch_through_interface() {
        let mut pools = PoolManager::from_sizes([10, 1, 14, 20, 9, 8], 1024).unwrap();

        let small = pools.allocate_type::<u32>(1);
        assert_eq!(small.class(), Some(0));

        let big = pools.allocate(8, 4, DEFAULT_ALIGN);
        assert!(!big.is_pooled());

        pools.deallocate_type::<u32>(small, 1);
        pools.deallocate(big, 8, 4, DEFAULT_ALIGN);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn test_bad_alignment() {
        let _ = HeapManager.allocate(4, 1, 3);
    }
}
