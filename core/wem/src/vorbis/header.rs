//! Identification and comment headers.

use crate::bit_reader::BitCursor;
use crate::bit_writer::PackBuffer;
use crate::error::{WemError, WemResult};

pub const VORBIS_SYNC: &[u8; 6] = b"vorbis";

pub const PACKET_IDENTIFICATION: u8 = 1;
pub const PACKET_COMMENT: u8 = 3;
pub const PACKET_SETUP: u8 = 5;

/// Vendor string of every synthesized comment header.
pub fn vendor_string() -> String {
    format!(
        "converted from Audiokinetic Wwise by wwogg {}",
        env!("CARGO_PKG_VERSION")
    )
}

/// Packet type byte followed by the `vorbis` sync.
pub fn write_packet_header(writer: &mut PackBuffer, packet_type: u8) {
    writer.write(u32::from(packet_type), 8);
    writer.write_bytes(VORBIS_SYNC);
}

/// Check the type byte and sync of a header packet and step past them.
pub fn expect_packet_header(reader: &mut BitCursor<'_>, packet_type: u8) -> WemResult<()> {
    let found = reader.read(8)?;
    if found != u32::from(packet_type) {
        return Err(WemError::corrupt(format!(
            "expected Vorbis header type {packet_type}, found {found}"
        )));
    }
    for &expected in VORBIS_SYNC {
        if reader.read(8)? != u32::from(expected) {
            return Err(WemError::corrupt("missing vorbis header sync"));
        }
    }
    Ok(())
}

/// Fields of an identification header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentHeader {
    pub channels: u8,
    pub sample_rate: u32,
    pub bitrate_maximum: u32,
    pub bitrate_nominal: u32,
    pub bitrate_minimum: u32,
    pub blocksize_short_exp: u8,
    pub blocksize_long_exp: u8,
}

/// Block size exponents a Vorbis decoder accepts.
pub const BLOCKSIZE_EXPONENTS: std::ops::RangeInclusive<u8> = 6..=13;

impl IdentHeader {
    /// Exponents must lie in 6..=13 and the short block may not exceed
    /// the long one.
    pub fn check_blocksizes(&self) -> WemResult<()> {
        let (short, long) = (self.blocksize_short_exp, self.blocksize_long_exp);
        if !BLOCKSIZE_EXPONENTS.contains(&short) || !BLOCKSIZE_EXPONENTS.contains(&long) {
            return Err(WemError::corrupt(format!(
                "block size exponents {short}/{long} outside 6..=13"
            )));
        }
        if short > long {
            return Err(WemError::corrupt(format!(
                "short block size 2^{short} exceeds long block size 2^{long}"
            )));
        }
        Ok(())
    }

    /// Serialize as a 30 byte header packet.
    pub fn build(&self) -> Vec<u8> {
        let mut writer = PackBuffer::with_capacity(30);
        write_packet_header(&mut writer, PACKET_IDENTIFICATION);
        writer.write(0, 32); // version
        writer.write(u32::from(self.channels), 8);
        writer.write(self.sample_rate, 32);
        writer.write(self.bitrate_maximum, 32);
        writer.write(self.bitrate_nominal, 32);
        writer.write(self.bitrate_minimum, 32);
        writer.write(u32::from(self.blocksize_short_exp), 4);
        writer.write(u32::from(self.blocksize_long_exp), 4);
        writer.write(1, 1); // framing
        writer.into_bytes()
    }

    pub fn parse(packet: &[u8]) -> WemResult<Self> {
        let mut reader = BitCursor::new(packet);
        expect_packet_header(&mut reader, PACKET_IDENTIFICATION)?;

        let version = reader.read(32)?;
        if version != 0 {
            return Err(WemError::corrupt(format!("unsupported Vorbis version {version}")));
        }
        let header = Self {
            channels: reader.read(8)? as u8,
            sample_rate: reader.read(32)?,
            bitrate_maximum: reader.read(32)?,
            bitrate_nominal: reader.read(32)?,
            bitrate_minimum: reader.read(32)?,
            blocksize_short_exp: reader.read(4)? as u8,
            blocksize_long_exp: reader.read(4)? as u8,
        };
        if !reader.read_bit()? {
            return Err(WemError::corrupt("identification header framing bit unset"));
        }
        if header.channels == 0 {
            return Err(WemError::corrupt("identification header has no channels"));
        }
        header.check_blocksizes()?;
        Ok(header)
    }
}

/// Serialize a comment header carrying `vendor` and `comments`.
pub fn build_comment(vendor: &str, comments: &[String]) -> Vec<u8> {
    let mut writer = PackBuffer::new();
    write_packet_header(&mut writer, PACKET_COMMENT);

    writer.write(vendor.len() as u32, 32);
    writer.write_bytes(vendor.as_bytes());

    writer.write(comments.len() as u32, 32);
    for comment in comments {
        writer.write(comment.len() as u32, 32);
        writer.write_bytes(comment.as_bytes());
    }

    writer.write(1, 1); // framing
    writer.into_bytes()
}

/// Walk a comment header and check every length stays inside the packet.
/// Returns the vendor string and the number of user comments.
pub fn check_comment(packet: &[u8]) -> WemResult<(String, u32)> {
    let mut reader = BitCursor::new(packet);
    expect_packet_header(&mut reader, PACKET_COMMENT)?;

    let vendor_len = reader.read(32)?;
    let vendor_start = reader.byte_offset();
    reader.skip(u64::from(vendor_len) * 8)?;
    let vendor = String::from_utf8_lossy(&packet[vendor_start..reader.byte_offset()]).into_owned();

    let count = reader.read(32)?;
    for _ in 0..count {
        let len = reader.read(32)?;
        reader.skip(u64::from(len) * 8)?;
    }
    if !reader.read_bit()? {
        return Err(WemError::corrupt("comment header framing bit unset"));
    }
    Ok((vendor, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident() -> IdentHeader {
        IdentHeader {
            channels: 2,
            sample_rate: 48000,
            bitrate_maximum: 0,
            bitrate_nominal: 16000 * 8,
            bitrate_minimum: 0,
            blocksize_short_exp: 8,
            blocksize_long_exp: 11,
        }
    }

    #[test]
    fn test_ident_is_30_bytes() {
        let packet = ident().build();
        assert_eq!(packet.len(), 30);
        assert_eq!(packet[0], 1);
        assert_eq!(&packet[1..7], b"vorbis");
        assert_eq!(packet[11], 2);
        assert_eq!(packet[28], 0xB8);
        assert_eq!(packet[29], 1);
    }

    #[test]
    fn test_ident_parse() {
        assert_eq!(IdentHeader::parse(&ident().build()).unwrap(), ident());
    }

    #[test]
    fn test_ident_rejects_wrong_type() {
        let mut packet = ident().build();
        packet[0] = 3;
        assert!(matches!(
            IdentHeader::parse(&packet),
            Err(WemError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_ident_truncated_is_underrun() {
        let packet = ident().build();
        let err = IdentHeader::parse(&packet[..20]).unwrap_err();
        assert!(err.is_underrun());
    }

    #[test]
    fn test_blocksize_bounds() {
        assert!(ident().check_blocksizes().is_ok());
        for (short, long) in [(31, 31), (5, 11), (8, 14), (11, 8)] {
            let header = IdentHeader {
                blocksize_short_exp: short,
                blocksize_long_exp: long,
                ..ident()
            };
            assert!(
                matches!(header.check_blocksizes(), Err(WemError::Corrupt { .. })),
                "{short}/{long}"
            );
        }
    }

    #[test]
    fn test_ident_parse_rejects_inverted_blocksizes() {
        let mut packet = ident().build();
        packet[28] = 0x8B; // short 11, long 8
        assert!(matches!(
            IdentHeader::parse(&packet),
            Err(WemError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_comment_layout() {
        let packet = build_comment("vendor", &["SourceFile=a.wem".to_string()]);
        assert_eq!(packet[0], 3);
        assert_eq!(&packet[7..11], &6u32.to_le_bytes());
        assert_eq!(&packet[11..17], b"vendor");
        assert_eq!(&packet[17..21], &1u32.to_le_bytes());
        assert_eq!(&packet[21..25], &16u32.to_le_bytes());
        assert_eq!(&packet[25..41], b"SourceFile=a.wem");
        assert_eq!(packet[41], 1);
        assert_eq!(packet.len(), 42);

        let (vendor, count) = check_comment(&packet).unwrap();
        assert_eq!(vendor, "vendor");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_comment_overlong_length() {
        let mut packet = build_comment("vendor", &[]);
        packet[7] = 200;
        assert!(check_comment(&packet).is_err());
    }

    #[test]
    fn test_vendor_names_tool() {
        assert!(vendor_string().starts_with("converted from Audiokinetic Wwise by wwogg "));
    }
}
