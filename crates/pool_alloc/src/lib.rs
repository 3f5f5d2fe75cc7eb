//! # Pool Alloc
//!
//! Segregated size-class pool allocator:
//! - O(1) allocation and release from pre-carved, fixed-size blocks
//! - One pool per size class, chosen through a dense size index
//! - Requests above the largest class fall through to the global allocator
//!
//! ## Architecture Rules
//!
//! 1. **No per-block metadata** - A free block's storage holds the free-list link
//! 2. **Monotonic growth** - Chunks are kept until their pool is dropped
//! 3. **Handles, not sizes** - A handle knows which pool it came from
//!
//! ## Example
//!
//! ```rust,ignore
//! use pool_alloc::{PoolConfig, PoolManager};
//!
//! let config = PoolConfig::from_toml_file("pools.toml")?;
//! let mut pools = PoolManager::from_config(&config)?;
//!
//! let handle = pools.alloc_value(42u32);
//! assert_eq!(pools.release_value(handle), 42);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod memory;
pub mod sync;

pub use config::{PoolConfig, SizeClasses, DEFAULT_MAX_CHUNK_BYTES};
pub use error::{ConfigError, PoolError, PoolResult};
pub use memory::{
    Block, Handle, HeapManager, MemoryManager, PoolManager, SizeClassPool, TypedBlock,
    TypedHandle, TypedPool, DEFAULT_ALIGN,
};
pub use sync::SharedPoolManager;
