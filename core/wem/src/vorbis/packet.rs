//! Wwise audio packet framing.
//!
//! Every packet in a WWRIFF `data` chunk is preceded by a small header. Its
//! shape depends on the `vorb` layout:
//! - 2 bytes: payload size.
//! - 6 bytes: 2 byte payload size, 4 byte granule position.
//! - 8 bytes: 4 byte payload size, 4 byte granule position (old files that
//!   still carry the full Vorbis header triad).

use riff::RiffByteOrder;

use crate::error::{WemError, WemResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketHeaderFormat {
    Size16,
    Size16Granule32,
    Size32Granule32,
}

impl PacketHeaderFormat {
    pub fn header_len(self) -> usize {
        match self {
            PacketHeaderFormat::Size16 => 2,
            PacketHeaderFormat::Size16Granule32 => 6,
            PacketHeaderFormat::Size32Granule32 => 8,
        }
    }

    pub fn has_granule(self) -> bool {
        self != PacketHeaderFormat::Size16
    }
}

/// One framed packet borrowed from the `data` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WwisePacket<'a> {
    /// Offset of the packet header within the data chunk.
    pub offset: usize,
    pub payload: &'a [u8],
    /// Stored granule position, when the framing carries one.
    pub granule: Option<u32>,
    /// Offset of the following packet header.
    pub next_offset: usize,
}

/// Read the packet framed at `offset` in `data`.
pub fn read_packet(
    data: &[u8],
    offset: usize,
    format: PacketHeaderFormat,
    order: RiffByteOrder,
) -> WemResult<WwisePacket<'_>> {
    let header_len = format.header_len();
    let header = data
        .get(offset..offset.saturating_add(header_len))
        .ok_or(WemError::TruncatedPacket {
            offset,
            needed: header_len,
            available: data.len().saturating_sub(offset),
        })?;

    let (size, granule) = match format {
        PacketHeaderFormat::Size16 => (order.decode_u16([header[0], header[1]]) as usize, None),
        PacketHeaderFormat::Size16Granule32 => (
            order.decode_u16([header[0], header[1]]) as usize,
            Some(order.decode_u32([header[2], header[3], header[4], header[5]])),
        ),
        PacketHeaderFormat::Size32Granule32 => (
            order.decode_u32([header[0], header[1], header[2], header[3]]) as usize,
            Some(order.decode_u32([header[4], header[5], header[6], header[7]])),
        ),
    };

    let start = offset + header_len;
    let end = start.saturating_add(size);
    let payload = data.get(start..end).ok_or(WemError::TruncatedPacket {
        offset,
        needed: size,
        available: data.len() - start,
    })?;

    Ok(WwisePacket {
        offset,
        payload,
        granule,
        next_offset: end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size16_little_endian() {
        let mut data = vec![0x02, 0x01];
        data.extend(vec![0xAA; 258]);
        let packet = read_packet(&data, 0, PacketHeaderFormat::Size16, RiffByteOrder::Riff).unwrap();
        assert_eq!(packet.payload.len(), 258);
        assert_eq!(packet.granule, None);
        assert_eq!(packet.next_offset, 2 + 258);
    }

    #[test]
    fn test_size16_big_endian() {
        let mut data = vec![0x00, 0x03];
        data.extend([1, 2, 3]);
        let packet = read_packet(&data, 0, PacketHeaderFormat::Size16, RiffByteOrder::Rifx).unwrap();
        assert_eq!(packet.payload, &[1, 2, 3]);
    }

    #[test]
    fn test_size16_granule_little_endian() {
        let mut data = vec![0x01, 0x00, 0x01, 0x02, 0x03, 0x04];
        data.push(0x7F);
        let packet =
            read_packet(&data, 0, PacketHeaderFormat::Size16Granule32, RiffByteOrder::Riff).unwrap();
        assert_eq!(packet.payload, &[0x7F]);
        assert_eq!(packet.granule, Some(0x0403_0201));
        assert_eq!(packet.next_offset, 7);
    }

    #[test]
    fn test_size32_granule_big_endian() {
        let mut data = vec![0x00, 0x00, 0x00, 0x02, 0x12, 0x34, 0x56, 0x78];
        data.extend([9, 9]);
        let packet =
            read_packet(&data, 0, PacketHeaderFormat::Size32Granule32, RiffByteOrder::Ffir).unwrap();
        assert_eq!(packet.payload, &[9, 9]);
        assert_eq!(packet.granule, Some(0x1234_5678));
    }

    #[test]
    fn test_packet_at_offset() {
        let mut data = vec![0u8; 10];
        data.extend([0x02, 0x00, 0xDE, 0xAD, 0xFF]);
        let packet = read_packet(&data, 10, PacketHeaderFormat::Size16, RiffByteOrder::Riff).unwrap();
        assert_eq!(packet.offset, 10);
        assert_eq!(packet.payload, &[0xDE, 0xAD]);
        assert_eq!(packet.next_offset, 14);
    }

    #[test]
    fn test_truncated_header() {
        let data = vec![0x00];
        assert!(matches!(
            read_packet(&data, 0, PacketHeaderFormat::Size16, RiffByteOrder::Riff),
            Err(WemError::TruncatedPacket { offset: 0, needed: 2, available: 1 })
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let data = vec![0x04, 0x00, 1, 2];
        let err = read_packet(&data, 0, PacketHeaderFormat::Size16, RiffByteOrder::Riff).unwrap_err();
        assert!(err.is_underrun());
        assert!(err.to_string().contains("needs 4 bytes, 2 available"));
    }
}
