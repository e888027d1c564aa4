//! Finished Vorbis logical streams and their Ogg serialization.

use std::io::{Cursor, Write};

use ogg::{PacketWriteEndInfo, PacketWriter};

use crate::error::WemResult;

/// How the three header packets were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMode {
    /// Synthesized from the WWRIFF descriptor.
    Rebuilt,
    /// Copied from packets already present in the input.
    Copied,
}

/// One audio packet ready to be paged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OggPacket {
    pub data: Vec<u8>,
    pub granule: u64,
    pub packet_number: u64,
    pub end_of_stream: bool,
}

/// Three header packets plus the audio packets of one logical stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VorbisStream {
    pub serial: u32,
    /// Identification, comment and setup packets.
    pub headers: [Vec<u8>; 3],
    pub packets: Vec<OggPacket>,
    pub header_mode: HeaderMode,
}

impl VorbisStream {
    /// Granule position of the final packet.
    pub fn final_granule(&self) -> u64 {
        self.packets.last().map_or(0, |packet| packet.granule)
    }

    /// Page the stream into `output`. The identification header sits on a
    /// page of its own, comment and setup share the next one, and audio
    /// packets are packed normally with end of stream on the last.
    pub fn write_ogg<W: Write>(&self, output: W) -> WemResult<()> {
        let mut writer = PacketWriter::new(output);
        let [ident, comment, setup] = &self.headers;

        writer.write_packet(ident.clone(), self.serial, PacketWriteEndInfo::EndPage, 0)?;
        writer.write_packet(comment.clone(), self.serial, PacketWriteEndInfo::NormalPacket, 0)?;
        let setup_end = if self.packets.is_empty() {
            PacketWriteEndInfo::EndStream
        } else {
            PacketWriteEndInfo::EndPage
        };
        writer.write_packet(setup.clone(), self.serial, setup_end, 0)?;

        for packet in &self.packets {
            let end = if packet.end_of_stream {
                PacketWriteEndInfo::EndStream
            } else {
                PacketWriteEndInfo::NormalPacket
            };
            writer.write_packet(packet.data.clone(), self.serial, end, packet.granule)?;
        }
        Ok(())
    }

    pub fn to_ogg_bytes(&self) -> WemResult<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.write_ogg(&mut out)?;
        Ok(out.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ogg::PacketReader;

    fn stream(audio: usize) -> VorbisStream {
        VorbisStream {
            serial: 0x1234,
            headers: [vec![1, b'v'], vec![3, b'v'], vec![5, b'v']],
            packets: (0..audio)
                .map(|i| OggPacket {
                    data: vec![0, i as u8],
                    granule: i as u64 * 128,
                    packet_number: i as u64 + 3,
                    end_of_stream: i + 1 == audio,
                })
                .collect(),
            header_mode: HeaderMode::Rebuilt,
        }
    }

    #[test]
    fn test_pages_read_back() {
        let bytes = stream(3).to_ogg_bytes().unwrap();
        assert_eq!(&bytes[..4], b"OggS");

        let mut reader = PacketReader::new(Cursor::new(bytes));
        let mut packets = Vec::new();
        while let Some(packet) = reader.read_packet().unwrap() {
            assert_eq!(packet.stream_serial(), 0x1234);
            packets.push(packet);
        }
        assert_eq!(packets.len(), 6);
        assert_eq!(packets[0].data, vec![1, b'v']);
        assert_eq!(packets[2].data, vec![5, b'v']);
        assert_eq!(packets[5].data, vec![0, 2]);
        assert!(packets[5].last_in_stream());
        assert_eq!(packets[5].absgp_page(), 256);
    }

    #[test]
    fn test_headers_only_stream_ends() {
        let bytes = stream(0).to_ogg_bytes().unwrap();
        let mut reader = PacketReader::new(Cursor::new(bytes));
        let mut last = None;
        while let Some(packet) = reader.read_packet().unwrap() {
            last = Some(packet);
        }
        assert!(last.unwrap().last_in_stream());
    }

    #[test]
    fn test_final_granule() {
        assert_eq!(stream(0).final_granule(), 0);
        assert_eq!(stream(4).final_granule(), 384);
    }
}
