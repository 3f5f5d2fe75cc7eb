//! # Memory Management
//!
//! Segregated size-class pools replacing per-object heap allocation.
//!
//! ## Design Philosophy
//!
//! Memory is taken from the global allocator in large chunks. After that:
//! - Allocation pops a free list
//! - Release pushes onto it
//! - Nothing is returned to the global allocator until the pool is dropped

mod interface;
mod manager;
mod size_class;
mod typed;

pub use interface::{HeapManager, MemoryManager, DEFAULT_ALIGN};
pub use manager::{Handle, PoolManager, TypedHandle};
pub use size_class::{Block, SizeClassPool};
pub use typed::{TypedBlock, TypedPool};
