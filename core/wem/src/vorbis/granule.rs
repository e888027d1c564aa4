//! Block sizes of audio packets and the running granule position.

use super::helpers::ilog;

/// What is needed to size an audio packet: the two block sizes and the
/// window flag of every mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    pub blocksize_short: u32,
    pub blocksize_long: u32,
    pub mode_blockflags: Vec<bool>,
}

impl BlockLayout {
    /// Build from the two exponents stored in identification headers.
    pub fn from_exponents(short_exp: u8, long_exp: u8, mode_blockflags: Vec<bool>) -> Self {
        Self {
            blocksize_short: 1u32 << short_exp.min(31),
            blocksize_long: 1u32 << long_exp.min(31),
            mode_blockflags,
        }
    }

    /// Width of the mode number at the start of every audio packet.
    pub fn mode_bits(&self) -> u32 {
        ilog(self.mode_blockflags.len().saturating_sub(1) as u32)
    }

    /// Block size of a standard Vorbis audio packet, or `None` for empty
    /// packets, header packets and packets naming an unknown mode.
    pub fn packet_blocksize(&self, packet: &[u8]) -> Option<u32> {
        let first = u32::from(*packet.first()?);
        if first & 1 != 0 {
            return None;
        }

        let mode_bits = self.mode_bits();
        let mode = if mode_bits == 0 {
            0
        } else {
            // Mode numbers are at most 6 bits, so they always fit the first byte.
            (first >> 1) & ((1u32 << mode_bits) - 1)
        };

        let long = *self.mode_blockflags.get(mode as usize)?;
        Some(if long {
            self.blocksize_long
        } else {
            self.blocksize_short
        })
    }
}

/// Accumulates granule positions packet by packet.
///
/// The first sized packet sits at 0; every later one advances the total by
/// a quarter of the previous and current block sizes.
#[derive(Debug, Clone, Default)]
pub struct GranuleTracker {
    previous: Option<u32>,
    total: u64,
}

impl GranuleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one packet and return its granule position. Unsized
    /// packets leave the state alone and report the current total.
    pub fn advance(&mut self, blocksize: Option<u32>) -> u64 {
        if let Some(current) = blocksize {
            if let Some(previous) = self.previous {
                self.total += (u64::from(previous) + u64::from(current)) / 4;
            }
            self.previous = Some(current);
        }
        self.total
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}
