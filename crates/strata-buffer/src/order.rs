//! Byte order of multi-byte values stored in a buffer.

/// Byte order used to encode multi-byte values.
///
/// Duplicates and slices inherit the order of their source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// Most significant byte first.
    BigEndian,
    /// Least significant byte first.
    LittleEndian,
}

impl ByteOrder {
    /// Returns the byte order of the target platform.
    #[inline]
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::BigEndian
        } else {
            Self::LittleEndian
        }
    }

    /// Returns true for big-endian.
    #[inline]
    #[must_use]
    pub const fn is_big_endian(self) -> bool {
        matches!(self, Self::BigEndian)
    }
}

impl Default for ByteOrder {
    fn default() -> Self {
        Self::native()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_order() {
        let expected = if u16::from_ne_bytes([1, 0]) == 1 {
            ByteOrder::LittleEndian
        } else {
            ByteOrder::BigEndian
        };
        assert_eq!(ByteOrder::native(), expected);
        assert_eq!(ByteOrder::default(), expected);
    }
}
