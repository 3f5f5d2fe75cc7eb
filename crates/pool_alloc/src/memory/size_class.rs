//! # Size-Class Pool
//!
//! Slab allocator serving blocks of exactly one size.
//!
//! Memory is obtained from the global allocator one chunk at a time. Each
//! chunk is carved into `blocks_per_chunk` blocks of `block_size` bytes and
//! threaded onto a free list. While a block is free its first bytes hold the
//! index of the next free block; once handed out, the whole block belongs to
//! the caller. Chunks are only returned to the global allocator when the pool
//! is dropped.

use std::fmt;
use std::mem::size_of;

use crate::error::{fatal, PoolError, PoolResult};

/// Bytes used by the free-list link stored inside a free block.
const LINK_BYTES: usize = size_of::<usize>();

/// End-of-list marker for the free list.
const NIL: usize = usize::MAX;

/// Handle to one block handed out by a [`SizeClassPool`].
///
/// Handles are move-only: releasing consumes the handle, so the same block
/// cannot be pushed onto the free list twice.
#[derive(Debug, PartialEq, Eq, Hash)]
#[must_use = "dropping a block handle leaks the block until its pool is dropped"]
pub struct Block {
    /// Index across every chunk of the owning pool.
    index: usize,
}

impl Block {
    /// Position of this block across all chunks of its pool.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }
}

/// A slab allocator for a single size class.
///
/// `alloc` and `release` are O(1). The pool grows by one chunk whenever the
/// free list runs dry and never shrinks.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Use one pool per thread or wrap in a mutex.
///
/// # Contract
///
/// A [`Block`] must only be given back to the pool that produced it. Handing
/// a foreign block to [`release`](Self::release) corrupts the free list; this
/// is checked only in debug builds.
///
/// # Example
///
/// ```rust,ignore
/// let mut pool = SizeClassPool::new(24, 1024);
///
/// // Allocate - O(1), grows by one chunk when empty
/// let block = pool.alloc();
/// pool.bytes_mut(&block)[0] = 7;
///
/// // Release - O(1), memory stays with the pool
/// pool.release(block);
/// ```
pub struct SizeClassPool {
    /// Size the pool was asked to serve.
    type_size: usize,
    /// Size actually carved per block (never below the link size).
    block_size: usize,
    /// Growth quantum.
    blocks_per_chunk: usize,
    /// Every chunk ever allocated, in index order.
    chunks: Vec<Box<[u8]>>,
    /// Head of the free list, or `NIL`.
    free_head: usize,
}

impl SizeClassPool {
    /// Creates an empty pool. No memory is allocated until the first `alloc`.
    ///
    /// # Arguments
    ///
    /// * `type_size` - Requested block size, raised to
    ///   [`lowest_block_size`](Self::lowest_block_size)
    /// * `blocks_per_chunk` - Number of blocks carved from each chunk
    ///
    /// # Panics
    ///
    /// Panics if `blocks_per_chunk` is zero.
    #[must_use]
    pub fn new(type_size: usize, blocks_per_chunk: usize) -> Self {
        assert!(blocks_per_chunk > 0, "blocks_per_chunk must be greater than zero");

        Self {
            type_size,
            block_size: type_size.max(Self::lowest_block_size()),
            blocks_per_chunk,
            chunks: Vec::new(),
            free_head: NIL,
        }
    }

    /// Smallest block a pool will carve: room for one free-list link.
    #[inline]
    #[must_use]
    pub const fn lowest_block_size() -> usize {
        LINK_BYTES
    }

    /// Size the pool was created for, before the link-size floor.
    #[inline]
    #[must_use]
    pub const fn type_size(&self) -> usize {
        self.type_size
    }

    /// Size of every block in this pool.
    #[inline]
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of blocks carved from each chunk.
    #[inline]
    #[must_use]
    pub const fn blocks_per_chunk(&self) -> usize {
        self.blocks_per_chunk
    }

    /// Number of chunks allocated so far.
    #[inline]
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Total number of blocks carved so far, free or not.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.chunks.len() * self.blocks_per_chunk
    }

    /// Returns true if `block` indexes memory carved by this pool.
    ///
    /// Blocks from another pool of equal or larger capacity cannot be told
    /// apart; this only catches indices past the end.
    #[inline]
    #[must_use]
    pub fn owns(&self, block: &Block) -> bool {
        block.index < self.capacity()
    }

    /// Allocates one block.
    ///
    /// This is a **O(1)** operation. When the free list is empty a new chunk
    /// is allocated first.
    ///
    /// # Panics
    ///
    /// Failure of the backing allocator is fatal: it is logged and the
    /// process panics (aborting under the workspace profiles).
    #[inline]
    pub fn alloc(&mut self) -> Block {
        match self.try_alloc() {
            Ok(block) => block,
            Err(err) => fatal(&err),
        }
    }

    /// Allocates one block, reporting chunk-growth failure instead of
    /// terminating.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::OutOfMemory`] if a new chunk could not be
    /// reserved, or [`PoolError::ChunkOverflow`] if the chunk size overflows.
    pub fn try_alloc(&mut self) -> PoolResult<Block> {
        if self.free_head == NIL {
            self.grow()?;
        }

        let index = self.free_head;
        self.free_head = read_link(self.block(index));

        Ok(Block { index })
    }

    /// Returns a block to the free list.
    ///
    /// This is a **O(1)** operation. The block's memory is kept by the pool.
    ///
    /// `block` must come from this pool; see the type-level contract.
    #[inline]
    pub fn release(&mut self, block: Block) {
        debug_assert!(
            self.owns(&block),
            "block {} was not allocated by this pool ({} blocks)",
            block.index,
            self.capacity()
        );

        let next = self.free_head;
        write_link(self.block_mut(block.index), next);
        self.free_head = block.index;
    }

    /// Storage of an allocated block, `block_size` bytes long.
    #[inline]
    #[must_use]
    pub fn bytes(&self, block: &Block) -> &[u8] {
        self.block(block.index)
    }

    /// Mutable storage of an allocated block, `block_size` bytes long.
    #[inline]
    pub fn bytes_mut(&mut self, block: &Block) -> &mut [u8] {
        self.block_mut(block.index)
    }

    /// Maps a block index to its chunk and byte offset.
    #[inline]
    fn locate(&self, index: usize) -> (usize, usize) {
        let chunk = index / self.blocks_per_chunk;
        let slot = index % self.blocks_per_chunk;
        (chunk, slot * self.block_size)
    }

    #[inline]
    fn block(&self, index: usize) -> &[u8] {
        let (chunk, offset) = self.locate(index);
        &self.chunks[chunk][offset..offset + self.block_size]
    }

    #[inline]
    fn block_mut(&mut self, index: usize) -> &mut [u8] {
        let (chunk, offset) = self.locate(index);
        let block_size = self.block_size;
        &mut self.chunks[chunk][offset..offset + block_size]
    }

    /// Allocates a chunk and splices its blocks onto the front of the free list.
    #[cold]
    fn grow(&mut self) -> PoolResult<()> {
        let bytes = self
            .block_size
            .checked_mul(self.blocks_per_chunk)
            .ok_or(PoolError::ChunkOverflow {
                block_size: self.block_size,
                blocks_per_chunk: self.blocks_per_chunk,
            })?;

        let mut chunk = Vec::new();
        chunk
            .try_reserve_exact(bytes)
            .map_err(|source| PoolError::OutOfMemory { bytes, source })?;
        chunk.resize(bytes, 0u8);

        // Block i links to i + 1; the last block links to whatever was free.
        let first = self.capacity();
        let last_slot = self.blocks_per_chunk - 1;
        for (slot, block) in chunk.chunks_exact_mut(self.block_size).enumerate() {
            let next = if slot == last_slot {
                self.free_head
            } else {
                first + slot + 1
            };
            write_link(block, next);
        }

        self.free_head = first;
        self.chunks.push(chunk.into_boxed_slice());

        tracing::debug!(
            block_size = self.block_size,
            blocks = self.blocks_per_chunk,
            chunks = self.chunks.len(),
            "size-class pool grew by one chunk"
        );

        Ok(())
    }
}

impl fmt::Debug for SizeClassPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SizeClassPool")
            .field("type_size", &self.type_size)
            .field("block_size", &self.block_size)
            .field("blocks_per_chunk", &self.blocks_per_chunk)
            .field("chunks", &self.chunks.len())
            .finish_non_exhaustive()
    }
}

#[inline]
fn read_link(block: &[u8]) -> usize {
    bytemuck::pod_read_unaligned(&block[..LINK_BYTES])
}

#[inline]
fn write_link(block: &mut [u8], next: usize) {
    block[..LINK_BYTES].copy_from_slice(bytemuck::bytes_of(&next));
}
