//! # strata-bitset
//!
//! Dynamic bit-vector for the strata columnar substrate.
//!
//! This crate implements:
//! - **DynamicBitSet**: a byte-backed bit-vector that tracks the bytes in
//!   use, grows on demand when resizable, and supports set algebra, scans
//!   and shifting
//! - **WireHeader**: the compact on-wire encoding of a bit range
//!
//! ## Example
//!
//! ```rust
//! use strata_bitset::DynamicBitSet;
//!
//! let mut bits = DynamicBitSet::from_indices([3, 9, 40]).unwrap();
//! let mut other = DynamicBitSet::from_indices([9, 41]).unwrap();
//! other.or(&bits).unwrap();
//! bits.and(&other).unwrap();
//! assert_eq!(bits.to_string(), "[3, 9, 40]");
//!
//! let mut wire = Vec::new();
//! bits.write_to(&mut wire, 9, 41).unwrap();
//! let back = DynamicBitSet::read_from(&mut wire.as_slice()).unwrap();
//! assert_eq!(back.to_string(), "[0, 31]");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bitset;
pub mod wire;

pub use bitset::{DynamicBitSet, SetBits};
pub use wire::WireHeader;
