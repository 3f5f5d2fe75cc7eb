//! # Pool Error Types
//!
//! All errors that can occur while building or growing pools.
//!
//! The hot path never returns these: `alloc` treats chunk-growth failure as
//! fatal and only the `try_` variants and constructors surface a `Result`.

use std::collections::TryReserveError;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by pools and the pool manager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The manager was given an empty list of size classes.
    #[error("no size classes configured")]
    NoSizeClasses,

    /// An arithmetic progression of size classes was requested with step 0.
    #[error("size-class step must be non-zero")]
    ZeroStep,

    /// The largest class is too big to build a size index for.
    #[error("size class of {max_size} bytes is too large to index")]
    IndexTooLarge {
        /// Largest configured class.
        max_size: usize,
    },

    /// `block_size * blocks_per_chunk` does not fit in `usize`.
    #[error("chunk of {blocks_per_chunk} blocks of {block_size} bytes overflows usize")]
    ChunkOverflow {
        /// Size of one block.
        block_size: usize,
        /// Blocks carved per chunk.
        blocks_per_chunk: usize,
    },

    /// The backing allocator could not provide a buffer.
    #[error("backing allocator failed to provide {bytes} bytes")]
    OutOfMemory {
        /// Number of bytes requested.
        bytes: usize,
        /// Underlying reservation failure.
        #[source]
        source: TryReserveError,
    },
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors raised while loading a [`PoolConfig`](crate::PoolConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read pool config {}: {source}", .path.display())]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for a pool config.
    #[error("invalid pool config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config parsed but describes an unusable set of size classes.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Reports an unrecoverable allocator failure and terminates.
///
/// With the workspace's `panic = "abort"` profiles this ends the process.
#[cold]
#[inline(never)]
pub(crate) fn fatal(err: &PoolError) -> ! {
    tracing::error!(error = %err, "pool allocator cannot continue");
    panic!("pool allocator failure: {err}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(PoolError::NoSizeClasses.to_string(), "no size classes configured");

        let err = PoolError::ChunkOverflow {
            block_size: 8,
            blocks_per_chunk: usize::MAX,
        };
        assert!(err.to_string().contains("8 bytes"));
    }

    #[test]
    fn test_config_error_wraps_pool_error() {
        let err = ConfigError::from(PoolError::ZeroStep);
        assert_eq!(err.to_string(), "size-class step must be non-zero");
    }
}
