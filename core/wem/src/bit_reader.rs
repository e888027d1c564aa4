//! Bit-level reader for Vorbis data.
//!
//! Reads bits LSB-first from a byte slice, the same packing Ogg's
//! `oggpack` uses.

use crate::error::BitError;

/// Read cursor over a byte slice with a declared bit length.
#[derive(Debug, Clone)]
pub struct BitCursor<'a> {
    data: &'a [u8],
    bit_len: u64,
    byte_offset: usize,
    bit_offset: u8,
}

impl<'a> BitCursor<'a> {
    /// Cursor over every bit of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_bit_len(data, data.len() as u64 * 8)
    }

    /// Cursor over the first `bit_len` bits of `data`. Lengths past the end
    /// of the slice are clamped.
    pub fn with_bit_len(data: &'a [u8], bit_len: u64) -> Self {
        Self {
            data,
            bit_len: bit_len.min(data.len() as u64 * 8),
            byte_offset: 0,
            bit_offset: 0,
        }
    }

    /// Bits consumed so far.
    pub fn position(&self) -> u64 {
        self.byte_offset as u64 * 8 + u64::from(self.bit_offset)
    }

    pub fn remaining(&self) -> u64 {
        self.bit_len - self.position()
    }

    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    pub fn bit_offset(&self) -> u8 {
        self.bit_offset
    }

    /// Read `count` bits (at most 32).
    pub fn read(&mut self, count: u32) -> Result<u32, BitError> {
        if count > 32 {
            return Err(BitError::TooWide { count });
        }
        let available = self.remaining();
        if u64::from(count) > available {
            return Err(BitError::Underrun {
                requested: count,
                available,
            });
        }

        let mut value = 0u64;
        let mut filled = 0u32;
        while filled < count {
            let byte = self.data[self.byte_offset];
            let take = (8 - u32::from(self.bit_offset)).min(count - filled);
            let bits = (u64::from(byte) >> self.bit_offset) & ((1u64 << take) - 1);
            value |= bits << filled;
            filled += take;
            self.bit_offset += take as u8;
            if self.bit_offset == 8 {
                self.bit_offset = 0;
                self.byte_offset += 1;
            }
        }

        Ok(value as u32)
    }

    pub fn read_bit(&mut self) -> Result<bool, BitError> {
        Ok(self.read(1)? != 0)
    }

    /// Read without consuming.
    pub fn peek(&self, count: u32) -> Result<u32, BitError> {
        self.clone().read(count)
    }

    pub fn skip(&mut self, count: u64) -> Result<(), BitError> {
        let available = self.remaining();
        if count > available {
            return Err(BitError::Underrun {
                requested: count.min(u64::from(u32::MAX)) as u32,
                available,
            });
        }
        let target = self.position() + count;
        self.byte_offset = (target / 8) as usize;
        self.bit_offset = (target % 8) as u8;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_lsb_first() {
        let data = [0b10110100u8, 0b11001010u8];
        let mut reader = BitCursor::new(&data);

        assert_eq!(reader.read(4).unwrap(), 0b0100);
        assert_eq!(reader.read(4).unwrap(), 0b1011);
        assert_eq!(reader.read(8).unwrap(), 0b11001010);
    }

    #[test]
    fn test_single_bits() {
        let data = [0b10110100u8];
        let mut reader = BitCursor::new(&data);

        let bits: Vec<bool> = (0..8).map(|_| reader.read_bit().unwrap()).collect();
        assert_eq!(
            bits,
            vec![false, false, true, false, true, true, false, true]
        );
    }

    #[test]
    fn test_read_zero_bits() {
        let data = [0xFF];
        let mut reader = BitCursor::new(&data);
        assert_eq!(reader.read(0).unwrap(), 0);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_read_across_byte_boundary() {
        // 0xAB then 0xCD: bits 0-7 from the first byte, 8-11 from the second.
        let data = [0xAB, 0xCD];
        let mut reader = BitCursor::new(&data);
        assert_eq!(reader.read(12).unwrap(), 0xDAB);
        assert_eq!(reader.byte_offset(), 1);
        assert_eq!(reader.bit_offset(), 4);
    }

    #[test]
    fn test_read_full_32_bits_unaligned() {
        let data = [0x80, 0x67, 0x45, 0x23, 0x01];
        let mut reader = BitCursor::new(&data);
        reader.read(4).unwrap();
        assert_eq!(reader.read(32).unwrap(), 0x1234_5678);
    }

    #[test]
    fn test_too_wide() {
        let data = [0u8; 8];
        let mut reader = BitCursor::new(&data);
        assert_eq!(reader.read(33), Err(BitError::TooWide { count: 33 }));
    }

    #[test]
    fn test_underrun_leaves_cursor() {
        let data = [0xFF];
        let mut reader = BitCursor::new(&data);
        reader.read(6).unwrap();
        assert_eq!(
            reader.read(3),
            Err(BitError::Underrun {
                requested: 3,
                available: 2
            })
        );
        assert_eq!(reader.position(), 6);
        assert_eq!(reader.read(2).unwrap(), 0b11);
    }

    #[test]
    fn test_declared_bit_length() {
        let data = [0xFF, 0xFF];
        let mut reader = BitCursor::with_bit_len(&data, 10);
        assert_eq!(reader.read(10).unwrap(), 0x3FF);
        assert!(reader.read(1).is_err());
    }

    #[test]
    fn test_peek_and_skip() {
        let data = [0x34, 0x12];
        let mut reader = BitCursor::new(&data);
        assert_eq!(reader.peek(16).unwrap(), 0x1234);
        assert_eq!(reader.position(), 0);
        reader.skip(4).unwrap();
        assert_eq!(reader.read(8).unwrap(), 0x23);
        assert!(reader.skip(5).is_err());
    }
}
