//! Error handling for strata.
//!
//! This module provides a unified error type and result alias used
//! across all strata components.

mod buffer;

pub use buffer::{ErrorCode, StrataError};

/// Result type alias for strata operations.
pub type StrataResult<T> = std::result::Result<T, StrataError>;
