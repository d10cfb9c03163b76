//! Buffer allocation driven by a [`MemoryConfig`].

use strata_common::config::MemoryConfig;
use strata_common::{StrataError, StrataResult};

use crate::buffer::Buffer;
use crate::element::Element;
use crate::order::ByteOrder;
use crate::typed::TypedBuffer;

/// Hands out zero-filled buffers of the configured memory kind.
///
/// The allocator is a plain value created once and passed to whatever
/// needs to allocate; there is no process-wide allocation state.
///
/// # Example
///
/// ```rust
/// use strata_buffer::Allocator;
/// use strata_common::config::MemoryConfig;
///
/// let direct = Allocator::new(MemoryConfig::new().with_direct_memory(true)).unwrap();
/// let buf = direct.allocate(1024).unwrap();
/// assert!(buf.is_direct());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Allocator {
    config: MemoryConfig,
}

impl Allocator {
    /// Creates an allocator after validating `config`.
    pub fn new(config: MemoryConfig) -> StrataResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Heap allocator with default chunk geometry.
    #[must_use]
    pub fn heap() -> Self {
        Self::default()
    }

    /// Direct memory allocator with default chunk geometry.
    #[must_use]
    pub fn direct() -> Self {
        Self {
            config: MemoryConfig::new().with_direct_memory(true),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Returns true if buffers are backed by direct memory.
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.config.direct_memory
    }

    /// Allocates `capacity` bytes in native byte order.
    pub fn allocate(&self, capacity: usize) -> StrataResult<Buffer> {
        self.allocate_with_order(capacity, ByteOrder::native())
    }

    /// Allocates `capacity` bytes in the given byte order.
    pub fn allocate_with_order(&self, capacity: usize, order: ByteOrder) -> StrataResult<Buffer> {
        Buffer::allocate_in(
            capacity,
            self.config.memory_kind(),
            self.config.direct_alignment,
            order,
        )
    }

    /// Allocates a typed view of `len` elements.
    pub fn allocate_typed<T: Element>(&self, len: usize) -> StrataResult<TypedBuffer<T>> {
        let bytes = len
            .checked_mul(T::SIZE)
            .ok_or_else(|| StrataError::capacity(len as u64, (usize::MAX >> T::SHIFT) as u64))?;
        Ok(self.allocate(bytes)?.as_typed())
    }
}
