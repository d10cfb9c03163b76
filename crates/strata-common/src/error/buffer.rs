//! Buffer, bit-vector and allocation error types.

use std::fmt;
use thiserror::Error;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Invalid argument provided.
    InvalidArgument = 0x0003,
    /// Invalid configuration.
    InvalidConfig = 0x0006,

    // I/O errors (0x0100 - 0x01FF)
    /// General I/O error.
    Io = 0x0100,

    // Addressing errors (0x0200 - 0x02FF)
    /// Invalid `[from, to)` range.
    Range = 0x0200,
    /// Single index outside the addressable range.
    Index = 0x0201,
    /// Not enough remaining space.
    Overflow = 0x0202,
    /// Not enough remaining data.
    Underflow = 0x0203,

    // Memory errors (0x0300 - 0x03FF)
    /// Fixed capacity exceeded.
    Capacity = 0x0300,
    /// The allocator could not satisfy a request.
    AllocationFailed = 0x0301,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "I/O",
            0x02 => "Addressing",
            0x03 => "Memory",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The main error type for strata.
///
/// Every variant carries the offending indices so callers can report or
/// decide whether to abort the surrounding operation.
///
/// # Example
///
/// ```rust
/// use strata_common::error::{StrataError, StrataResult};
///
/// fn check(from: u64, to: u64, capacity: u64) -> StrataResult<()> {
///     if from > to || to > capacity {
///         return Err(StrataError::range(from, to, capacity));
///     }
///     Ok(())
/// }
///
/// assert!(check(2, 1, 10).is_err());
/// ```
#[derive(Debug, Error)]
pub enum StrataError {
    // ==========================================================================
    // Addressing Errors
    // ==========================================================================
    /// Invalid `[from, to)` pair.
    #[error("invalid range [{from}, {to}) for capacity {capacity}")]
    Range {
        /// Inclusive lower bound.
        from: u64,
        /// Exclusive upper bound.
        to: u64,
        /// Capacity the range was checked against.
        capacity: u64,
    },

    /// Single index outside `[0, limit)`.
    #[error("index {index} out of bounds for limit {limit}")]
    Index {
        /// The offending index.
        index: u64,
        /// The exclusive limit.
        limit: u64,
    },

    /// Relative put without enough remaining space.
    #[error("buffer overflow: {requested} bytes requested, {remaining} remaining")]
    Overflow {
        /// Number of elements the operation needed.
        requested: u64,
        /// Number of elements that were left.
        remaining: u64,
    },

    /// Relative get without enough remaining data.
    #[error("buffer underflow: {requested} bytes requested, {remaining} remaining")]
    Underflow {
        /// Number of elements the operation needed.
        requested: u64,
        /// Number of elements that were left.
        remaining: u64,
    },

    // ==========================================================================
    // Memory Errors
    // ==========================================================================
    /// Growth beyond a fixed or absolute maximum capacity.
    #[error("capacity {requested} exceeds maximum {max}")]
    Capacity {
        /// Requested capacity.
        requested: u64,
        /// Allowed maximum.
        max: u64,
    },

    /// The global allocator returned null.
    #[error("failed to allocate {size} bytes")]
    AllocationFailed {
        /// Requested size in bytes.
        size: usize,
    },

    // ==========================================================================
    // General Errors
    // ==========================================================================
    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Error message.
        message: String,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// I/O error from the underlying channel.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl StrataError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Range { .. } => ErrorCode::Range,
            Self::Index { .. } => ErrorCode::Index,
            Self::Overflow { .. } => ErrorCode::Overflow,
            Self::Underflow { .. } => ErrorCode::Underflow,
            Self::Capacity { .. } => ErrorCode::Capacity,
            Self::AllocationFailed { .. } => ErrorCode::AllocationFailed,
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Self::InvalidConfig { .. } => ErrorCode::InvalidConfig,
            Self::Io { .. } => ErrorCode::Io,
        }
    }

    /// Returns true if the error is a caller contract violation, i.e. the
    /// call was rejected before any state changed.
    #[must_use]
    pub const fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::Range { .. }
                | Self::Index { .. }
                | Self::Overflow { .. }
                | Self::Underflow { .. }
                | Self::Capacity { .. }
                | Self::InvalidArgument { .. }
        )
    }

    /// Creates a range error.
    #[must_use]
    pub fn range(from: u64, to: u64, capacity: u64) -> Self {
        Self::Range {
            from,
            to,
            capacity,
        }
    }

    /// Creates an index error.
    #[must_use]
    pub fn index(index: u64, limit: u64) -> Self {
        Self::Index { index, limit }
    }

    /// Creates an overflow error.
    #[must_use]
    pub fn overflow(requested: u64, remaining: u64) -> Self {
        Self::Overflow {
            requested,
            remaining,
        }
    }

    /// Creates an underflow error.
    #[must_use]
    pub fn underflow(requested: u64, remaining: u64) -> Self {
        Self::Underflow {
            requested,
            remaining,
        }
    }

    /// Creates a capacity error.
    #[must_use]
    pub fn capacity(requested: u64, max: u64) -> Self {
        Self::Capacity { requested, max }
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
