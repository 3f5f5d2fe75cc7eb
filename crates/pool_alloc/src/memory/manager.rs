//! # Pool Manager
//!
//! One [`SizeClassPool`] per configured size class, plus a dense index that
//! maps every byte size up to the largest class straight to the smallest pool
//! able to hold it. Larger requests bypass pooling and go to the global
//! allocator.
//!
//! ## Dispatch
//!
//! ```text
//! alloc(n) -- n <= max_size --> index[n] --> pools[class].alloc()
//!          \- n >  max_size --> Box<[u8]> of n bytes
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;
use std::path::Path;

use bytemuck::Pod;

use super::size_class::{Block, SizeClassPool};
use crate::config::{PoolConfig, SizeClasses};
use crate::error::{fatal, ConfigError, PoolError, PoolResult};

/// Handle to memory obtained from a [`PoolManager`].
///
/// A handle remembers which size class served it, so it can be released
/// without restating the allocation size. Handles are move-only; releasing
/// one consumes it.
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use = "dropping a pooled handle leaks its block until the manager is dropped"]
pub struct Handle {
    slot: Slot,
}

#[derive(Debug, PartialEq, Eq, Hash)]
enum Slot {
    Pooled { class: usize, block: Block },
    Heap(Box<[u8]>),
}

impl Handle {
    /// Position in [`PoolManager::pools`] of the pool that served this
    /// handle, or `None` if it came from the heap fallback.
    #[inline]
    #[must_use]
    pub const fn class(&self) -> Option<usize> {
        match self.slot {
            Slot::Pooled { class, .. } => Some(class),
            Slot::Heap(_) => None,
        }
    }

    /// Returns true if the handle is backed by a size-class pool.
    #[inline]
    #[must_use]
    pub const fn is_pooled(&self) -> bool {
        matches!(self.slot, Slot::Pooled { .. })
    }
}

/// Handle to a `T` stored through a [`PoolManager`].
#[must_use = "dropping a pooled handle leaks its block until the manager is dropped"]
pub struct TypedHandle<T> {
    handle: Handle,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedHandle<T> {
    /// The untyped handle.
    #[inline]
    #[must_use]
    pub const fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Drops the type, keeping the untyped handle.
    #[inline]
    pub fn into_handle(self) -> Handle {
        self.handle
    }
}

impl<T> fmt::Debug for TypedHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypedHandle").field(&self.handle).finish()
    }
}

/// Allocator front-end dispatching across many size classes in O(1).
///
/// # Thread Safety
///
/// This manager is NOT thread-safe. Wrap the whole instance in a mutex
/// (see [`SharedPoolManager`](crate::SharedPoolManager)) to share it.
///
/// # Example
///
/// ```rust,ignore
/// let mut pools = PoolManager::from_sizes([8, 16, 32, 64], DEFAULT_MAX_CHUNK_BYTES)?;
///
/// let small = pools.alloc(12);   // served by the 16-byte pool
/// let large = pools.alloc(4096); // served by the global allocator
///
/// pools.release(small);
/// pools.release(large);
/// ```
pub struct PoolManager {
    /// Largest configured class; anything bigger goes to the heap.
    max_size: usize,
    /// One pool per distinct class, ascending by block size.
    pools: Vec<SizeClassPool>,
    /// `index[n]` is the position in `pools` of the smallest class >= n.
    index: Vec<usize>,
}

impl PoolManager {
    /// Builds a manager from a [`PoolConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::NoSizeClasses`] for an empty class list,
    /// [`PoolError::ZeroStep`] for a progression with step 0, and
    /// [`PoolError::IndexTooLarge`] or [`PoolError::OutOfMemory`] when the
    /// largest class is too big to index.
    pub fn from_config(config: &PoolConfig) -> PoolResult<Self> {
        Self::load(config.classes.expand()?, config.max_chunk_bytes)
    }

    /// Reads a TOML [`PoolConfig`] from `path` and builds a manager from it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or if it
    /// describes no usable size classes.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = PoolConfig::from_toml_file(path)?;
        Ok(Self::from_config(&config)?)
    }

    /// Builds a manager from a list of class sizes.
    ///
    /// Sizes below [`SizeClassPool::lowest_block_size`] are raised to it and
    /// duplicates are merged, so the list may be in any order.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::NoSizeClasses`] if `sizes` is empty, and
    /// [`PoolError::IndexTooLarge`] or [`PoolError::OutOfMemory`] if the
    /// largest size cannot be indexed.
    pub fn from_sizes(
        sizes: impl IntoIterator<Item = usize>,
        max_chunk_bytes: usize,
    ) -> PoolResult<Self> {
        Self::load(sizes.into_iter().collect(), max_chunk_bytes)
    }

    /// Builds a manager with classes `step, 2 * step, ...` up to `max_size`.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ZeroStep`] if `step` is zero, and
    /// [`PoolError::IndexTooLarge`] or [`PoolError::OutOfMemory`] if
    /// `max_size` cannot be indexed.
    pub fn with_step(max_size: usize, step: usize, max_chunk_bytes: usize) -> PoolResult<Self> {
        Self::load(
            SizeClasses::Step { max_size, step }.expand()?,
            max_chunk_bytes,
        )
    }

    fn load(sizes: Vec<usize>, max_chunk_bytes: usize) -> PoolResult<Self> {
        let sizes = canonical_classes(sizes);
        let max_size = *sizes.last().ok_or(PoolError::NoSizeClasses)?;

        let pools: Vec<SizeClassPool> = sizes
            .iter()
            .map(|&size| SizeClassPool::new(size, (max_chunk_bytes / size).max(1)))
            .collect();

        let index = build_index(&pools, max_size)?;

        tracing::debug!(classes = ?sizes, max_size, max_chunk_bytes, "pool manager loaded");

        Ok(Self {
            max_size,
            pools,
            index,
        })
    }

    /// Largest size served from a pool.
    #[inline]
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    /// The pools, ascending by block size.
    #[inline]
    #[must_use]
    pub fn pools(&self) -> &[SizeClassPool] {
        &self.pools
    }

    /// The pool that serves requests of `size` bytes, or `None` if such
    /// requests go to the heap.
    #[inline]
    #[must_use]
    pub fn pool_for(&self, size: usize) -> Option<&SizeClassPool> {
        self.index.get(size).map(|&class| &self.pools[class])
    }

    /// Allocates at least `size` bytes.
    ///
    /// Sizes up to [`max_size`](Self::max_size) are served in O(1) by the
    /// matching pool. Larger sizes are forwarded to the global allocator.
    ///
    /// # Panics
    ///
    /// Failure of the backing allocator is fatal.
    #[inline]
    pub fn alloc(&mut self, size: usize) -> Handle {
        match self.try_alloc(size) {
            Ok(handle) => handle,
            Err(err) => fatal(&err),
        }
    }

    /// Allocates at least `size` bytes, reporting backing-allocator failure.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::OutOfMemory`] if a chunk or heap buffer could not
    /// be reserved.
    pub fn try_alloc(&mut self, size: usize) -> PoolResult<Handle> {
        let slot = if size <= self.max_size {
            let class = self.index[size];
            Slot::Pooled {
                class,
                block: self.pools[class].try_alloc()?,
            }
        } else {
            tracing::trace!(size, max_size = self.max_size, "request bypasses pools");
            let mut buffer = Vec::new();
            buffer
                .try_reserve_exact(size)
                .map_err(|source| PoolError::OutOfMemory { bytes: size, source })?;
            buffer.resize(size, 0u8);
            Slot::Heap(buffer.into_boxed_slice())
        };

        Ok(Handle { slot })
    }

    /// Releases memory obtained from this manager.
    ///
    /// Pooled blocks return to their pool's free list; heap buffers are freed.
    #[inline]
    pub fn release(&mut self, handle: Handle) {
        match handle.slot {
            Slot::Pooled { class, block } => self.pools[class].release(block),
            Slot::Heap(buffer) => drop(buffer),
        }
    }

    /// Releases memory, stating the size it was allocated with.
    ///
    /// This is the sized contract of the classic pool interface. `size` must
    /// be the size passed to [`alloc`](Self::alloc); a mismatch that maps to a
    /// different class is caught in debug builds only. The handle itself
    /// decides where the memory goes.
    #[inline]
    pub fn release_sized(&mut self, handle: Handle, size: usize) {
        debug_assert_eq!(
            handle.class(),
            self.index.get(size).copied(),
            "release size {size} does not map to the class this handle came from"
        );
        self.release(handle);
    }

    /// Storage behind `handle`.
    ///
    /// Pooled handles expose their whole block, which may be longer than the
    /// size requested. Heap handles expose exactly the requested size.
    #[inline]
    #[must_use]
    pub fn bytes<'a>(&'a self, handle: &'a Handle) -> &'a [u8] {
        match handle.slot {
            Slot::Pooled { class, ref block } => self.pools[class].bytes(block),
            Slot::Heap(ref buffer) => &buffer[..],
        }
    }

    /// Mutable storage behind `handle`.
    #[inline]
    pub fn bytes_mut<'a>(&'a mut self, handle: &'a mut Handle) -> &'a mut [u8] {
        match handle.slot {
            Slot::Pooled { class, ref block } => self.pools[class].bytes_mut(block),
            Slot::Heap(ref mut buffer) => &mut buffer[..],
        }
    }

    /// Allocates `size_of::<T>()` bytes and stores `value` in them.
    #[inline]
    pub fn alloc_value<T: Pod>(&mut self, value: T) -> TypedHandle<T> {
        let mut handle = TypedHandle {
            handle: self.alloc(size_of::<T>()),
            _marker: PhantomData,
        };
        self.set(&mut handle, value);
        handle
    }

    /// Reads the value stored behind `handle`.
    #[inline]
    #[must_use]
    pub fn get<T: Pod>(&self, handle: &TypedHandle<T>) -> T {
        bytemuck::pod_read_unaligned(&self.bytes(&handle.handle)[..size_of::<T>()])
    }

    /// Overwrites the value stored behind `handle`.
    #[inline]
    pub fn set<T: Pod>(&mut self, handle: &mut TypedHandle<T>, value: T) {
        self.bytes_mut(&mut handle.handle)[..size_of::<T>()]
            .copy_from_slice(bytemuck::bytes_of(&value));
    }

    /// Releases a typed allocation, returning the value it last held.
    #[inline]
    pub fn release_value<T: Pod>(&mut self, handle: TypedHandle<T>) -> T {
        let value = self.get(&handle);
        self.release_sized(handle.handle, size_of::<T>());
        value
    }
}

impl fmt::Debug for PoolManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolManager")
            .field("max_size", &self.max_size)
            .field("pools", &self.pools)
            .finish_non_exhaustive()
    }
}

/// Maps every size in `0..=max_size` to the smallest pool that holds it.
fn build_index(pools: &[SizeClassPool], max_size: usize) -> PoolResult<Vec<usize>> {
    let len = max_size
        .checked_add(1)
        .ok_or(PoolError::IndexTooLarge { max_size })?;

    let mut index = Vec::new();
    index
        .try_reserve_exact(len)
        .map_err(|source| PoolError::OutOfMemory {
            bytes: len.saturating_mul(size_of::<usize>()),
            source,
        })?;
    index.resize(len, 0);

    // Single pass: every size up to a pool's block size maps to that pool.
    let mut size = 1;
    for (class, pool) in pools.iter().enumerate() {
        while size <= pool.block_size() {
            index[size] = class;
            size += 1;
        }
    }

    Ok(index)
}

/// Raises undersized classes to the link-size floor, sorts them and drops
/// duplicates.
fn canonical_classes(mut sizes: Vec<usize>) -> Vec<usize> {
    let floor = SizeClassPool::lowest_block_size();
    for size in &mut sizes {
        *size = (*size).max(floor);
    }
    sizes.sort_unstable();
    sizes.dedup();
    sizes
}
