//! WWRIFF descriptor: the `fmt`, `vorb` and `data` chunks of a scanned
//! document, decoded into typed fields.

use riff::{BasicKind, RiffByteOrder, RiffDocument};
use tracing::{debug, warn};

use crate::error::{WemError, WemResult};
use crate::vorbis::PacketHeaderFormat;

/// `fmt` format tag of Wwise Vorbis.
pub const VORBIS_FORMAT_TAG: u16 = 0xFFFF;

/// Size of a `fmt` chunk that embeds the `vorb` block.
pub const IMPLICIT_VORB_FMT_SIZE: usize = 66;

const IMPLICIT_VORB_OFFSET: usize = 24;
const IMPLICIT_VORB_SIZE: usize = 42;

/// Mod signal values that mean standard audio packets.
const STANDARD_PACKET_SIGNALS: [u32; 4] = [0x4A, 0x4B, 0x69, 0x70];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WwiseFmt {
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub avg_bytes_per_second: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub extra_size: Option<u16>,
    pub channel_mask: Option<u32>,
    pub guid: Option<[u8; 16]>,
}

impl WwiseFmt {
    pub fn parse(data: &[u8], order: RiffByteOrder) -> WemResult<Self> {
        let u16_at = |offset| order.u16_at(data, offset);
        let u32_at = |offset| order.u32_at(data, offset);
        let short = || WemError::corrupt(format!("fmt chunk too small ({} bytes)", data.len()));

        let mut fmt = Self {
            format_tag: u16_at(0).ok_or_else(short)?,
            channels: u16_at(2).ok_or_else(short)?,
            sample_rate: u32_at(4).ok_or_else(short)?,
            avg_bytes_per_second: u32_at(8).ok_or_else(short)?,
            block_align: u16_at(12).ok_or_else(short)?,
            bits_per_sample: u16_at(14).ok_or_else(short)?,
            extra_size: u16_at(16),
            channel_mask: u32_at(20),
            guid: None,
        };
        if data.len() >= 40 && data.len() != IMPLICIT_VORB_FMT_SIZE {
            let mut guid = [0u8; 16];
            guid.copy_from_slice(&data[24..40]);
            fmt.guid = Some(guid);
        }
        Ok(fmt)
    }
}

/// The `vorb` geometries found in the wild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VorbLayout {
    /// 42 bytes, usually embedded in a 66 byte `fmt`. Audio packets carry
    /// a 2 byte header.
    Compact,
    /// 0x32 or 0x34 bytes. Audio packets carry a 6 byte header.
    Extended,
    /// 0x28 or 0x2C bytes. The full header triad is present and packets
    /// carry an 8 byte header.
    Legacy,
}

impl VorbLayout {
    pub fn from_size(size: usize) -> Option<Self> {
        match size {
            IMPLICIT_VORB_SIZE => Some(VorbLayout::Compact),
            0x32 | 0x34 => Some(VorbLayout::Extended),
            0x28 | 0x2C => Some(VorbLayout::Legacy),
            _ => None,
        }
    }

    pub fn packet_format(self) -> PacketHeaderFormat {
        match self {
            VorbLayout::Compact => PacketHeaderFormat::Size16,
            VorbLayout::Extended => PacketHeaderFormat::Size16Granule32,
            VorbLayout::Legacy => PacketHeaderFormat::Size32Granule32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WwiseVorb {
    pub layout: VorbLayout,
    pub sample_count: u32,
    /// Only stored by the compact layout.
    pub mod_signal: Option<u32>,
    pub header_packets_offset: u32,
    pub audio_start_offset: u32,
    pub uid: u32,
    pub blocksize_short_exp: u8,
    pub blocksize_long_exp: u8,
}

impl WwiseVorb {
    pub fn parse(data: &[u8], order: RiffByteOrder) -> WemResult<Self> {
        let Some(layout) = VorbLayout::from_size(data.len()) else {
            warn!(
                "vorb chunk of 0x{:X} bytes matches no known layout (0x28, 0x2C, 0x2A, 0x32, 0x34)",
                data.len()
            );
            return Err(WemError::corrupt(format!("unknown vorb size 0x{:X}", data.len())));
        };
        // Every layout is at least 0x28 bytes, so the fixed offsets below are in range.
        let u32_at = |offset| order.u32_at(data, offset).unwrap_or_default();

        let vorb = match layout {
            VorbLayout::Compact => Self {
                layout,
                sample_count: u32_at(0),
                mod_signal: Some(u32_at(4)),
                header_packets_offset: u32_at(16),
                audio_start_offset: u32_at(20),
                uid: u32_at(36),
                blocksize_short_exp: data[40],
                blocksize_long_exp: data[41],
            },
            VorbLayout::Extended => Self {
                layout,
                sample_count: u32_at(0),
                mod_signal: None,
                header_packets_offset: u32_at(24),
                audio_start_offset: u32_at(28),
                uid: u32_at(44),
                blocksize_short_exp: data[48],
                blocksize_long_exp: data[49],
            },
            VorbLayout::Legacy => Self {
                layout,
                sample_count: u32_at(0),
                mod_signal: None,
                header_packets_offset: u32_at(24),
                audio_start_offset: u32_at(28),
                uid: 0,
                blocksize_short_exp: 0,
                blocksize_long_exp: 0,
            },
        };
        Ok(vorb)
    }

    /// Whether audio packets drop the packet type bit and window flags.
    pub fn signals_mod_packets(&self) -> bool {
        matches!(self.mod_signal, Some(signal) if !STANDARD_PACKET_SIGNALS.contains(&signal))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DescriptorFlags {
    pub fmt_present: bool,
    pub vorb_present: bool,
    pub data_present: bool,
    pub mod_packets: bool,
    pub granule_in_packet: bool,
    pub all_headers_present: bool,
}

/// Everything the transcoder needs from one WWRIFF stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WwriffDescriptor {
    pub byte_order: RiffByteOrder,
    pub fmt: WwiseFmt,
    pub vorb: WwiseVorb,
    pub data: Vec<u8>,
    pub flags: DescriptorFlags,
    pub packet_format: PacketHeaderFormat,
    /// Window flag of every mode, filled in once the setup header is known.
    pub mode_blockflags: Vec<bool>,
}

impl WwriffDescriptor {
    /// Scan `bytes` as a RIFF document and build the descriptor.
    pub fn parse(bytes: &[u8]) -> WemResult<Self> {
        let document = riff::parse_document(bytes)?;
        Self::from_document(document)
    }

    /// Walk the basic chunks of `document` once, taking ownership of the
    /// `data` payload.
    pub fn from_document(document: RiffDocument) -> WemResult<Self> {
        let order = document.byte_order;
        let mut fmt = None;
        let mut vorb = None;
        let mut data = None;

        for chunk in document.basics {
            match chunk.kind {
                BasicKind::Fmt => {
                    if fmt.is_some() {
                        return Err(WemError::DuplicateChunk { chunk: "fmt" });
                    }
                    let parsed = WwiseFmt::parse(&chunk.data, order)?;
                    if parsed.format_tag != VORBIS_FORMAT_TAG {
                        return Err(WemError::NotVorbis {
                            format_tag: parsed.format_tag,
                        });
                    }
                    if chunk.data.len() == IMPLICIT_VORB_FMT_SIZE {
                        if vorb.is_some() {
                            return Err(WemError::DuplicateChunk { chunk: "vorb" });
                        }
                        let end = IMPLICIT_VORB_OFFSET + IMPLICIT_VORB_SIZE;
                        vorb = Some(WwiseVorb::parse(&chunk.data[IMPLICIT_VORB_OFFSET..end], order)?);
                    }
                    fmt = Some(parsed);
                }
                BasicKind::Vorb => {
                    if vorb.is_some() {
                        return Err(WemError::DuplicateChunk { chunk: "vorb" });
                    }
                    vorb = Some(WwiseVorb::parse(&chunk.data, order)?);
                }
                BasicKind::Data => {
                    if data.is_some() {
                        return Err(WemError::DuplicateChunk { chunk: "data" });
                    }
                    data = Some(chunk.data);
                }
                other => debug!("ignoring {:?} chunk at {}", other, chunk.byte_offset),
            }
        }

        let (fmt, vorb, data) = match (fmt, vorb, data) {
            (Some(fmt), Some(vorb), Some(data)) => (fmt, vorb, data),
            (fmt, vorb, data) => {
                let missing = [("fmt", fmt.is_none()), ("vorb", vorb.is_none()), ("data", data.is_none())]
                    .into_iter()
                    .filter_map(|(name, absent)| absent.then_some(name))
                    .collect();
                return Err(WemError::IncompleteDescriptor { missing });
            }
        };

        let setup = vorb.header_packets_offset as usize;
        let audio = vorb.audio_start_offset as usize;
        if setup > audio || audio > data.len() {
            return Err(WemError::corrupt(format!(
                "header offset {setup} and audio offset {audio} outside {} bytes of data",
                data.len()
            )));
        }

        let packet_format = vorb.layout.packet_format();
        let flags = DescriptorFlags {
            fmt_present: true,
            vorb_present: true,
            data_present: true,
            mod_packets: vorb.signals_mod_packets(),
            granule_in_packet: packet_format.has_granule(),
            all_headers_present: vorb.layout == VorbLayout::Legacy,
        };
        debug!(
            "WWRIFF {:?}: {} channels, {} Hz, vorb {:?}, mod packets {}",
            order, fmt.channels, fmt.sample_rate, vorb.layout, flags.mod_packets
        );

        Ok(Self {
            byte_order: order,
            fmt,
            vorb,
            data,
            flags,
            packet_format,
            mode_blockflags: Vec::new(),
        })
    }

    /// Number of modes, known once the setup header has been read.
    pub fn mode_count(&self) -> usize {
        self.mode_blockflags.len()
    }
}
