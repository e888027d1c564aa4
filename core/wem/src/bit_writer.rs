//! Bit-packed output buffer and the transfer helpers built on it.

use crate::bit_reader::BitCursor;
use crate::error::BitError;

/// Growable LSB-first bit buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackBuffer {
    bytes: Vec<u8>,
    bit_len: u64,
}

impl PackBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            bit_len: 0,
        }
    }

    /// Append the low `count` bits of `value`. Counts above 32 are clamped.
    pub fn write(&mut self, value: u32, count: u32) {
        let count = count.min(32);
        let mut value = u64::from(value) & ((1u64 << count) - 1);
        let mut left = count;

        while left > 0 {
            let used = (self.bit_len % 8) as u32;
            if used == 0 {
                self.bytes.push(0);
            }
            let take = (8 - used).min(left);
            if let Some(last) = self.bytes.last_mut() {
                *last |= ((value & ((1u64 << take) - 1)) as u8) << used;
            }
            value >>= take;
            left -= take;
            self.bit_len += u64::from(take);
        }
    }

    pub fn write_bit(&mut self, bit: bool) {
        self.write(u32::from(bit), 1);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.bit_len % 8 == 0 {
            self.bytes.extend_from_slice(bytes);
            self.bit_len += bytes.len() as u64 * 8;
        } else {
            for &byte in bytes {
                self.write(u32::from(byte), 8);
            }
        }
    }

    pub fn bits_written(&self) -> u64 {
        self.bit_len
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The packed bytes. A partial final byte is zero padded.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Read `count` bits from `src`, write them to `dst` and return them.
pub fn transfer(src: &mut BitCursor<'_>, count: u32, dst: &mut PackBuffer) -> Result<u32, BitError> {
    let value = src.read(count)?;
    dst.write(value, count);
    Ok(value)
}

/// Copy `bits` bits in 32-bit words, then the tail.
pub fn transfer_bulk(src: &mut BitCursor<'_>, dst: &mut PackBuffer, bits: u64) -> Result<(), BitError> {
    if bits > src.remaining() {
        return Err(BitError::Underrun {
            requested: bits.min(u64::from(u32::MAX)) as u32,
            available: src.remaining(),
        });
    }
    for _ in 0..bits >> 5 {
        transfer(src, 32, dst)?;
    }
    transfer(src, (bits & 31) as u32, dst)?;
    Ok(())
}

/// Copy everything left in `src` and return the number of bits moved.
pub fn transfer_remaining(src: &mut BitCursor<'_>, dst: &mut PackBuffer) -> Result<u64, BitError> {
    let bits = src.remaining();
    transfer_bulk(src, dst, bits)?;
    Ok(bits)
}
