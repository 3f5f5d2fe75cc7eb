//! # Pool Configuration
//!
//! Size classes and chunk budget for a [`PoolManager`](crate::PoolManager),
//! either built in code or loaded once at startup from TOML.
//!
//! ```toml
//! max_chunk_bytes = 16384
//!
//! [classes]
//! kind = "list"
//! sizes = [8, 16, 24, 32, 64]
//! ```
//!
//! or an arithmetic progression:
//!
//! ```toml
//! [classes]
//! kind = "step"
//! max_size = 256
//! step = 16
//! ```

use std::mem::size_of;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, PoolError, PoolResult};

/// Default byte budget for one chunk (16 KiB).
pub const DEFAULT_MAX_CHUNK_BYTES: usize = 16 * 1024;

fn default_max_chunk_bytes() -> usize {
    DEFAULT_MAX_CHUNK_BYTES
}

/// How the set of size classes is described.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SizeClasses {
    /// An explicit list; order and duplicates do not matter.
    List {
        /// Requested class sizes in bytes.
        sizes: Vec<usize>,
    },
    /// `step, 2 * step, ...` below `max_size`, then `max_size` itself.
    Step {
        /// Largest class.
        max_size: usize,
        /// Distance between consecutive classes.
        step: usize,
    },
}

impl SizeClasses {
    /// Expands the description into a raw list of sizes.
    ///
    /// The list is not yet clamped, sorted or deduplicated.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ZeroStep`] for a progression with step 0,
    /// [`PoolError::IndexTooLarge`] if `max_size` cannot be indexed and
    /// [`PoolError::OutOfMemory`] if the progression cannot be stored.
    pub fn expand(&self) -> PoolResult<Vec<usize>> {
        match *self {
            Self::List { ref sizes } => Ok(sizes.clone()),
            Self::Step { max_size, step } => {
                if step == 0 {
                    return Err(PoolError::ZeroStep);
                }

                // The index needs max_size + 1 slots, so reject before expanding.
                if max_size == usize::MAX {
                    return Err(PoolError::IndexTooLarge { max_size });
                }

                let count = max_size / step + 1;
                let mut sizes = Vec::new();
                sizes
                    .try_reserve_exact(count)
                    .map_err(|source| PoolError::OutOfMemory {
                        bytes: count.saturating_mul(size_of::<usize>()),
                        source,
                    })?;
                sizes.extend((step..max_size).step_by(step));
                sizes.push(max_size);
                Ok(sizes)
            }
        }
    }
}

/// Configuration of a pool manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// The size classes to create pools for.
    pub classes: SizeClasses,
    /// Target bytes per chunk; each class gets `max_chunk_bytes / size` blocks
    /// per chunk (at least one).
    #[serde(default = "default_max_chunk_bytes")]
    pub max_chunk_bytes: usize,
}

impl PoolConfig {
    /// Config with an explicit list of sizes and the default chunk budget.
    #[must_use]
    pub fn from_sizes(sizes: impl IntoIterator<Item = usize>) -> Self {
        Self {
            classes: SizeClasses::List {
                sizes: sizes.into_iter().collect(),
            },
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
        }
    }

    /// Config with classes every `step` bytes up to `max_size`.
    #[must_use]
    pub fn stepped(max_size: usize, step: usize) -> Self {
        Self {
            classes: SizeClasses::Step { max_size, step },
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
        }
    }

    /// Replaces the chunk budget.
    #[must_use]
    pub fn with_max_chunk_bytes(mut self, max_chunk_bytes: usize) -> Self {
        self.max_chunk_bytes = max_chunk_bytes;
        self
    }

    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or missing fields.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if its contents are invalid.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_expansion() {
        let sizes = SizeClasses::Step { max_size: 64, step: 16 }.expand().unwrap();
        assert_eq!(sizes, vec![16, 32, 48, 64]);

        // max_size off the progression is still appended
        let sizes = SizeClasses::Step { max_size: 50, step: 16 }.expand().unwrap();
        assert_eq!(sizes, vec![16, 32, 48, 50]);

        let sizes = SizeClasses::Step { max_size: 4, step: 16 }.expand().unwrap();
        assert_eq!(sizes, vec![4]);
    }

    #[test]
    fn test_zero_step_rejected() {
        let err = SizeClasses::Step { max_size: 64, step: 0 }.expand().unwrap_err();
        assert_eq!(err, PoolError::ZeroStep);
    }

    #[test]
    fn test_huge_step_rejected() {
        let err = SizeClasses::Step { max_size: usize::MAX, step: 1 }.expand().unwrap_err();
        assert_eq!(err, PoolError::IndexTooLarge { max_size: usize::MAX });

        let err = SizeClasses::Step { max_size: usize::MAX / 2, step: 1 }.expand().unwrap_err();
        assert!(matches!(err, PoolError::OutOfMemory { .. }));
    }

    #[test]
    fn test_parse_list_with_default_budget() {
        let config = PoolConfig::from_toml_str(
            r#"
            [classes]
            kind = "list"
            sizes = [1, 8, 14, 20]
            "#,
        )
        .unwrap();

        assert_eq!(config, PoolConfig::from_sizes([1, 8, 14, 20]));
        assert_eq!(config.max_chunk_bytes, DEFAULT_MAX_CHUNK_BYTES);
    }

    #[test]
    fn test_parse_step() {
        let config = PoolConfig::from_toml_str(
            r#"
            max_chunk_bytes = 4096

            [classes]
            kind = "step"
            max_size = 128
            step = 32
            "#,
        )
        .unwrap();

        assert_eq!(config, PoolConfig::stepped(128, 32).with_max_chunk_bytes(4096));
    }

    #[test]
    fn test_parse_unknown_kind() {
        let err = PoolConfig::from_toml_str(
            r#"
            [classes]
            kind = "buddy"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("pool_alloc_config_that_does_not_exist.toml");
        let err = PoolConfig::from_toml_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
