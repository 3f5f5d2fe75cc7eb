//! # Typed Pool
//!
//! A [`SizeClassPool`] sized for one plain-old-data type.

use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;

use bytemuck::Pod;

use super::size_class::{Block, SizeClassPool};

/// Handle to a `T` stored in a [`TypedPool`].
#[must_use = "dropping a block handle leaks the block until its pool is dropped"]
pub struct TypedBlock<T> {
    block: Block,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedBlock<T> {
    /// Position of the underlying block in its pool.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.block.index()
    }
}

impl<T> fmt::Debug for TypedBlock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedBlock").field(&self.block.index()).finish()
    }
}

/// A pool whose blocks each hold one `T`.
///
/// Values are copied in and out, so `T` needs no particular alignment
/// within the pool's chunks.
///
/// # Example
///
/// ```rust,ignore
/// let mut pool: TypedPool<u32> = TypedPool::new(1024);
///
/// let handle = pool.alloc(42);
/// assert_eq!(pool.get(&handle), 42);
/// assert_eq!(pool.release(handle), 42);
/// ```
pub struct TypedPool<T: Pod> {
    pool: SizeClassPool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Pod> TypedPool<T> {
    /// Creates an empty pool growing by `blocks_per_chunk` values at a time.
    ///
    /// # Panics
    ///
    /// Panics if `blocks_per_chunk` is zero.
    #[must_use]
    pub fn new(blocks_per_chunk: usize) -> Self {
        Self {
            pool: SizeClassPool::new(size_of::<T>(), blocks_per_chunk),
            _marker: PhantomData,
        }
    }

    /// The underlying untyped pool.
    #[inline]
    #[must_use]
    pub const fn pool(&self) -> &SizeClassPool {
        &self.pool
    }

    /// Allocates a block and stores `value` in it.
    #[inline]
    pub fn alloc(&mut self, value: T) -> TypedBlock<T> {
        let block = self.pool.alloc();
        let handle = TypedBlock {
            block,
            _marker: PhantomData,
        };
        self.set(&handle, value);
        handle
    }

    /// Reads the value stored behind `handle`.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: &TypedBlock<T>) -> T {
        bytemuck::pod_read_unaligned(&self.pool.bytes(&handle.block)[..size_of::<T>()])
    }

    /// Overwrites the value stored behind `handle`.
    #[inline]
    pub fn set(&mut self, handle: &TypedBlock<T>, value: T) {
        self.pool.bytes_mut(&handle.block)[..size_of::<T>()]
            .copy_from_slice(bytemuck::bytes_of(&value));
    }

    /// Releases the block, returning the value it last held.
    #[inline]
    pub fn release(&mut self, handle: TypedBlock<T>) -> T {
        let value = self.get(&handle);
        self.pool.release(handle.block);
        value
    }
}

impl<T: Pod> fmt::Debug for TypedPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedPool").field("pool", &self.pool).finish()
    }
}
