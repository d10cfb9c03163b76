//! Memory configuration structures.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{CHUNK_BITS, DIRECT_ALIGNMENT, MAX_CHUNK_BITS, MAX_NATIVE_CAPACITY, MIN_CHUNK_BITS};
use crate::error::{StrataError, StrataResult};
use crate::memory::MemoryKind;

/// Environment variable consulted by [`MemoryConfig::from_env`].
pub const DIRECT_MEMORY_ENV: &str = "STRATA_DIRECT_MEMORY";

/// Memory configuration.
///
/// Selects the backing kind of every buffer an allocator hands out and the
/// chunk geometry of compound buffers.
///
/// # Example
///
/// ```rust
/// use strata_common::config::MemoryConfig;
///
/// let config = MemoryConfig::default();
/// assert!(!config.direct_memory);
/// assert_eq!(config.chunk_size(), 1 << 30);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Allocate direct (page aligned) memory for all buffers.
    /// Default: false
    #[serde(default)]
    pub direct_memory: bool,

    /// Alignment of direct memory blocks. Must be a power of 2.
    /// Default: 4096
    #[serde(default = "default_direct_alignment")]
    pub direct_alignment: usize,

    /// log2 of the compound buffer chunk size.
    /// Default: 30 (1 GB chunks)
    #[serde(default = "default_chunk_bits")]
    pub chunk_bits: u32,
}

fn default_direct_alignment() -> usize {
    DIRECT_ALIGNMENT
}

fn default_chunk_bits() -> u32 {
    CHUNK_BITS
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            direct_memory: false,
            direct_alignment: default_direct_alignment(),
            chunk_bits: default_chunk_bits(),
        }
    }
}

impl MemoryConfig {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration with tiny chunks so multi-chunk layouts can be
    /// exercised without gigabyte allocations.
    #[must_use]
    pub fn for_testing(chunk_bits: u32) -> Self {
        Self {
            chunk_bits,
            ..Default::default()
        }
    }

    /// Reads the direct memory flag from `STRATA_DIRECT_MEMORY` on top of
    /// the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let direct_memory = std::env::var(DIRECT_MEMORY_ENV)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Self {
            direct_memory,
            ..Default::default()
        }
    }

    /// Enables or disables direct memory.
    #[must_use]
    pub fn with_direct_memory(mut self, enabled: bool) -> Self {
        self.direct_memory = enabled;
        self
    }

    /// Sets the direct memory alignment.
    #[must_use]
    pub fn with_direct_alignment(mut self, alignment: usize) -> Self {
        self.direct_alignment = alignment;
        self
    }

    /// Sets the compound buffer chunk exponent.
    #[must_use]
    pub fn with_chunk_bits(mut self, chunk_bits: u32) -> Self {
        self.chunk_bits = chunk_bits;
        self
    }

    /// Returns the backing kind buffers are allocated with.
    #[inline]
    #[must_use]
    pub fn memory_kind(&self) -> MemoryKind {
        if self.direct_memory {
            MemoryKind::Direct
        } else {
            MemoryKind::Heap
        }
    }

    /// Returns the compound buffer chunk size in bytes.
    #[inline]
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        1usize << self.chunk_bits
    }

    /// Returns the largest capacity served by a single chunk.
    ///
    /// A single-chunk buffer holds less than two full chunks and never more
    /// than a native buffer can address; with the default geometry both
    /// bounds coincide at 2^31 - 1.
    #[inline]
    #[must_use]
    pub fn max_single_capacity(&self) -> usize {
        ((self.chunk_size() << 1) - 1).min(MAX_NATIVE_CAPACITY)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> StrataResult<()> {
        if !(MIN_CHUNK_BITS..=MAX_CHUNK_BITS).contains(&self.chunk_bits) {
            return Err(StrataError::invalid_config(format!(
                "chunk_bits must be in [{MIN_CHUNK_BITS}, {MAX_CHUNK_BITS}], got {}",
                self.chunk_bits
            )));
        }
        if !self.direct_alignment.is_power_of_two() {
            return Err(StrataError::invalid_config(format!(
                "direct_alignment must be a power of 2, got {}",
                self.direct_alignment
            )));
        }
        Ok(())
    }

    /// Parses a configuration from TOML.
    pub fn from_toml_str(content: &str) -> StrataResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| StrataError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> StrataResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Saves configuration to a file.
    pub fn save(&self, path: &Path) -> StrataResult<()> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Converts configuration to a TOML string.
    pub fn to_toml(&self) -> StrataResult<String> {
        toml::to_string_pretty(self).map_err(|e| StrataError::invalid_config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_env() {
        // the only test touching this variable
        for (value, direct) in [("1", true), ("TRUE", true), (" yes ", true), ("0", false), ("no", false)] {
            std::env::set_var(DIRECT_MEMORY_ENV, value);
            let config = MemoryConfig::from_env();
            assert_eq!(config.direct_memory, direct, "value {value:?}");
            assert_eq!(config.chunk_bits, MemoryConfig::default().chunk_bits);
        }
        std::env::remove_var(DIRECT_MEMORY_ENV);
        assert_eq!(MemoryConfig::from_env().memory_kind(), MemoryKind::Heap);
    }

    #[test]
    fn test_default_config() {
        let config = MemoryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.memory_kind(), MemoryKind::Heap);
        assert_eq!(config.max_single_capacity(), MAX_NATIVE_CAPACITY);
    }

    #[test]
    fn test_config_builder() {
        let config = MemoryConfig::new()
            .with_direct_memory(true)
            .with_direct_alignment(64)
            .with_chunk_bits(4);

        assert_eq!(config.memory_kind(), MemoryKind::Direct);
        assert_eq!(config.direct_alignment, 64);
        assert_eq!(config.chunk_size(), 16);
        assert_eq!(config.max_single_capacity(), 31);
    }

    #[test]
    fn test_validation() {
        assert!(MemoryConfig::for_testing(2).validate().is_err());
        assert!(MemoryConfig::for_testing(31).validate().is_err());
        assert!(MemoryConfig::new().with_direct_alignment(48).validate().is_err());
        assert!(MemoryConfig::for_testing(3).validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = MemoryConfig::from_toml_str("direct_memory = true\n").unwrap();
        assert!(config.direct_memory);
        assert_eq!(config.chunk_bits, CHUNK_BITS);
        assert_eq!(config.direct_alignment, DIRECT_ALIGNMENT);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let err = MemoryConfig::from_toml_str("chunk_bits = 40\n").unwrap_err();
        assert!(err.to_string().contains("chunk_bits"));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("memory.toml");

        let config = MemoryConfig::for_testing(5).with_direct_memory(true);
        config.save(&path).unwrap();

        let loaded = MemoryConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
