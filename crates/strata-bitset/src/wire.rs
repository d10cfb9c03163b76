//! Compact wire format for bit ranges.
//!
//! ```text
//! +--------+----------------+----------------------+
//! | offset | length (i32 BE)| payload (length B)   |
//! | 1 byte | 4 bytes        |                      |
//! +--------+----------------+----------------------+
//! ```
//!
//! The payload holds the bytes covering the serialized range, starting at
//! the byte that contains its first bit. `offset` is the position of that
//! first bit within the first payload byte. Bits outside the range are
//! masked off and trailing zero bytes are dropped.

use std::io::{Read, Write};

use bytes::{Buf, BufMut};
use strata_buffer::{ops, Allocator, Buffer, ElementStore};
use strata_common::constants::{BITSET_WIRE_HEADER_SIZE, MAX_BITSET_CAPACITY};
use strata_common::{StrataError, StrataResult};

use crate::bitset::{byte_index, check_bit_range, from_mask, through_mask, DynamicBitSet};

/// Header preceding a serialized bit range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireHeader {
    /// Position of the first serialized bit within the first payload byte.
    pub offset: u8,
    /// Payload length in bytes.
    pub length: i32,
}

impl WireHeader {
    /// Size of a serialized header.
    pub const SIZE: usize = BITSET_WIRE_HEADER_SIZE;

    /// Serializes the header.
    pub fn serialize(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.offset);
        buf.put_i32(self.length);
    }

    /// Serializes the header to a byte array.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        let mut cursor = &mut buf[..];
        self.serialize(&mut cursor);
        buf
    }

    /// Deserializes and validates a header.
    pub fn deserialize(buf: &mut impl Buf) -> StrataResult<Self> {
        if buf.remaining() < Self::SIZE {
            return Err(StrataError::underflow(Self::SIZE as u64, buf.remaining() as u64));
        }
        let offset = buf.get_u8();
        let length = buf.get_i32();
        if offset > 7 {
            return Err(StrataError::invalid_argument(format!(
                "bit offset {offset} outside a byte"
            )));
        }
        if length < 0 {
            return Err(StrataError::invalid_argument(format!(
                "negative payload length {length}"
            )));
        }
        if length as usize > MAX_BITSET_CAPACITY {
            return Err(StrataError::capacity(length as u64, MAX_BITSET_CAPACITY as u64));
        }
        Ok(Self { offset, length })
    }

    /// Deserializes a header from a byte slice.
    pub fn from_bytes(bytes: &[u8]) -> StrataResult<Self> {
        Self::deserialize(&mut &bytes[..])
    }
}

impl DynamicBitSet {
    /// Writes bits `[from, to)` to `channel` and returns the number of bytes
    /// written, header included.
    pub fn write_to<W: Write + ?Sized>(&self, channel: &mut W, from: usize, to: usize) -> StrataResult<usize> {
        check_bit_range(from, to)?;
        let offset = (from & 7) as u8;
        let end = to.min(self.length());

        let mut payload = if from < end {
            self.payload(from, end)?
        } else {
            Buffer::empty()
        };

        let header = WireHeader {
            offset,
            length: payload.remaining() as i32,
        };
        channel.write_all(&header.to_bytes())?;
        let written = ops::write_fully(channel, &mut payload)?;
        Ok(WireHeader::SIZE + written as usize)
    }

    /// Copies the bytes covering `[from, end)` with the bits outside the
    /// range masked off and trailing zero bytes dropped from the limit.
    fn payload(&self, from: usize, end: usize) -> StrataResult<Buffer> {
        let first = byte_index(from);
        let last = byte_index(end - 1);
        let mut payload = self.buffer().copy_range(first, last + 1)?;
        let tail = last - first;
        payload.store(0, payload.load(0) & from_mask(from));
        payload.store(tail, payload.load(tail) & through_mask(end - 1));

        let mut len = tail + 1;
        while len > 0 && payload.load(len - 1) == 0 {
            len -= 1;
        }
        payload.set_limit(len)?;
        Ok(payload)
    }

    /// Reads a bit range written by [`write_to`](Self::write_to) into heap
    /// memory. The result is fixed-capacity and re-based so its first bit is
    /// the first serialized bit.
    pub fn read_from<R: Read + ?Sized>(channel: &mut R) -> StrataResult<Self> {
        Self::read_from_in(&Allocator::default(), channel)
    }

    /// Like [`read_from`](Self::read_from), with the payload allocated from
    /// `allocator`.
    pub fn read_from_in<R: Read + ?Sized>(allocator: &Allocator, channel: &mut R) -> StrataResult<Self> {
        let mut raw = [0u8; WireHeader::SIZE];
        channel.read_exact(&mut raw)?;
        let header = WireHeader::from_bytes(&raw)?;
        if header.length == 0 {
            return Ok(Self::empty());
        }

        let length = header.length as usize;
        let mut buffer = allocator.allocate(length)?;
        ops::read_fully(channel, &mut buffer)?;
        tracing::trace!(length, offset = header.offset, "read bitset payload");

        let bits = Self::from_filled(buffer, false)?;
        if header.offset == 0 {
            Ok(bits)
        } else {
            bits.get_range(header.offset as usize, length << 3)
        }
    }
}
