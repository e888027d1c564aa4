//! WWRIFF to Vorbis transcoding.
//!
//! Rebuilds (or copies) the three Vorbis header packets of a
//! [`WwriffDescriptor`] and re-frames its audio packets as a standard
//! [`VorbisStream`] with recomputed granule positions.
//!
//! # Example
//!
//! ```no_run
//! use wem::{ConvertOptions, convert_bytes};
//!
//! # fn main() -> Result<(), wem::WemError> {
//! let input = std::fs::read("audio.wem")?;
//! let options = ConvertOptions::new().with_comments(true).with_source_name("audio.wem");
//! let stream = convert_bytes(&input, &options)?;
//! std::fs::write("audio.ogg", stream.to_ogg_bytes()?)?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::{debug, warn};

use crate::bit_reader::BitCursor;
use crate::bit_writer::{PackBuffer, transfer, transfer_remaining};
use crate::codebook::{CodebookLibrary, copy_full_codebook, unpack_raw};
use crate::error::{CodebookError, WemError, WemResult};
use crate::stream::{HeaderMode, OggPacket, VorbisStream};
use crate::vorbis::header::{
    PACKET_COMMENT, PACKET_IDENTIFICATION, PACKET_SETUP, expect_packet_header,
    write_packet_header,
};
use crate::vorbis::{
    BlockLayout, GranuleTracker, IdentHeader, build_comment, parse_setup, read_packet,
    rebuild_setup_tail, vendor_string,
};
use crate::wwriff::WwriffDescriptor;

/// Codebook index Wwise writes where inline codebooks begin, followed by
/// the 14 bits below. Seeing it means the stream was not built against an
/// external library.
const INLINE_CODEBOOK_INDEX: u32 = 0x342;
const INLINE_CODEBOOK_MARKER: u32 = 0x1590;

/// Where the setup header's codebooks come from.
#[derive(Debug, Clone, Default)]
pub enum CodebookSource {
    /// Stored in the setup header itself.
    #[default]
    Inline,
    /// Referenced by index into a shared library.
    External(Arc<CodebookLibrary>),
}

/// Override for the mod signal heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacketFormatOverride {
    #[default]
    Auto,
    ForceModPackets,
    ForceStandardPackets,
}

/// Per-item conversion settings.
///
/// ```
/// use wem::{ConvertOptions, PacketFormatOverride};
///
/// let options = ConvertOptions::new()
///     .with_stripped(true)
///     .with_packet_format(PacketFormatOverride::ForceModPackets);
/// assert!(options.stripped);
/// assert!(!options.comments);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub codebooks: CodebookSource,
    /// The setup header lacks the fields Wwise strips and must be rebuilt
    /// field by field.
    pub stripped: bool,
    pub packet_format: PacketFormatOverride,
    /// Write `SourceFile=` and `OutputFile=` into rebuilt comment headers.
    pub comments: bool,
    pub source_name: Option<String>,
    pub output_name: Option<String>,
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_codebooks(mut self, codebooks: CodebookSource) -> Self {
        self.codebooks = codebooks;
        self
    }

    pub fn with_library(self, library: Arc<CodebookLibrary>) -> Self {
        self.with_codebooks(CodebookSource::External(library))
    }

    pub fn with_stripped(mut self, stripped: bool) -> Self {
        self.stripped = stripped;
        self
    }

    pub fn with_packet_format(mut self, packet_format: PacketFormatOverride) -> Self {
        self.packet_format = packet_format;
        self
    }

    pub fn with_comments(mut self, comments: bool) -> Self {
        self.comments = comments;
        self
    }

    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Comments for a rebuilt comment header; empty unless enabled.
    fn provenance(&self) -> Vec<String> {
        if !self.comments {
            return Vec::new();
        }
        let mut comments = vec![format!(
            "SourceFile={}",
            self.source_name.as_deref().unwrap_or("unknown")
        )];
        if let Some(output) = &self.output_name {
            comments.push(format!("OutputFile={output}"));
        }
        comments
    }
}

/// Scan, describe and transcode one WWRIFF buffer.
pub fn convert_bytes(bytes: &[u8], options: &ConvertOptions) -> WemResult<VorbisStream> {
    let mut descriptor = WwriffDescriptor::parse(bytes)?;
    transcode(&mut descriptor, options)
}

/// Transcode a descriptor. Fills in `mode_blockflags` along the way.
pub fn transcode(desc: &mut WwriffDescriptor, options: &ConvertOptions) -> WemResult<VorbisStream> {
    match options.packet_format {
        PacketFormatOverride::Auto => {}
        PacketFormatOverride::ForceModPackets => desc.flags.mod_packets = true,
        PacketFormatOverride::ForceStandardPackets => desc.flags.mod_packets = false,
    }

    let (headers, ident, header_mode) = if desc.flags.all_headers_present {
        let (headers, ident) = copy_header_triad(desc)?;
        (headers, ident, HeaderMode::Copied)
    } else {
        let (headers, ident) = rebuild_headers(desc, options)?;
        (headers, ident, HeaderMode::Rebuilt)
    };
    debug!(
        "{:?} headers, {} modes, blocksizes 2^{}/2^{}",
        header_mode,
        desc.mode_count(),
        ident.blocksize_short_exp,
        ident.blocksize_long_exp
    );

    let layout = BlockLayout::from_exponents(
        ident.blocksize_short_exp,
        ident.blocksize_long_exp,
        desc.mode_blockflags.clone(),
    );
    let packets = rebuild_audio(desc, &layout)?;

    Ok(VorbisStream {
        serial: desc.vorb.uid,
        headers,
        packets,
        header_mode,
    })
}

fn rebuild_headers(
    desc: &mut WwriffDescriptor,
    options: &ConvertOptions,
) -> WemResult<([Vec<u8>; 3], IdentHeader)> {
    let channels = u8::try_from(desc.fmt.channels).map_err(|_| {
        WemError::corrupt(format!("{} channels cannot be expressed in Vorbis", desc.fmt.channels))
    })?;
    let ident = IdentHeader {
        channels,
        sample_rate: desc.fmt.sample_rate,
        bitrate_maximum: 0,
        bitrate_nominal: desc.fmt.avg_bytes_per_second.saturating_mul(8),
        bitrate_minimum: 0,
        blocksize_short_exp: desc.vorb.blocksize_short_exp,
        blocksize_long_exp: desc.vorb.blocksize_long_exp,
    };
    ident.check_blocksizes()?;
    let comment = build_comment(&vendor_string(), &options.provenance());
    let (setup, blockflags) = rebuild_setup(desc, options)?;
    desc.mode_blockflags = blockflags;

    Ok(([ident.build(), comment, setup], ident))
}

fn rebuild_setup(desc: &WwriffDescriptor, options: &ConvertOptions) -> WemResult<(Vec<u8>, Vec<bool>)> {
    let packet = read_packet(
        &desc.data,
        desc.vorb.header_packets_offset as usize,
        desc.packet_format,
        desc.byte_order,
    )?;
    if packet.granule.is_some_and(|granule| granule != 0) {
        return Err(WemError::corrupt("setup packet granule is not 0"));
    }
    if packet.next_offset != desc.vorb.audio_start_offset as usize {
        return Err(WemError::corrupt(format!(
            "first audio packet at {} does not follow setup packet ending at {}",
            desc.vorb.audio_start_offset, packet.next_offset
        )));
    }

    let channels = u32::from(desc.fmt.channels);
    let mut src = BitCursor::new(packet.payload);
    let mut out = PackBuffer::with_capacity(packet.payload.len() * 2);
    write_packet_header(&mut out, PACKET_SETUP);

    let codebook_count = transfer(&mut src, 8, &mut out)? + 1;
    for _ in 0..codebook_count {
        match &options.codebooks {
            CodebookSource::Inline if options.stripped => unpack_raw(&mut src, &mut out)?,
            CodebookSource::Inline => copy_full_codebook(&mut src, &mut out)?,
            CodebookSource::External(library) => splice_external(&mut src, &mut out, library)?,
        }
    }

    // Time domain transforms: one placeholder entry.
    out.write(0, 6);
    out.write(0, 16);

    if options.stripped {
        let blockflags = rebuild_setup_tail(&mut src, &mut out, channels, codebook_count)?;
        if src.position().div_ceil(8) != packet.payload.len() as u64 {
            return Err(WemError::corrupt(format!(
                "setup rebuild consumed {} bits of a {} byte packet",
                src.position(),
                packet.payload.len()
            )));
        }
        Ok((out.into_bytes(), blockflags))
    } else {
        transfer_remaining(&mut src, &mut out)?;
        let setup = out.into_bytes();
        let blockflags = parse_setup(&setup, channels)?;
        Ok((setup, blockflags))
    }
}

/// Resolve one 10-bit library reference and splice the unpacked codebook.
fn splice_external(
    src: &mut BitCursor<'_>,
    dst: &mut PackBuffer,
    library: &CodebookLibrary,
) -> WemResult<()> {
    let index = src.read(10)?;
    let key = index as usize + 1;

    let Some(book) = library.get(key) else {
        if index == INLINE_CODEBOOK_INDEX && src.peek(14).ok() == Some(INLINE_CODEBOOK_MARKER) {
            return Err(WemError::InlineCodebooksDetected);
        }
        return Err(CodebookError::IndexOutOfRange {
            index: key,
            count: library.len(),
        }
        .into());
    };

    let unpacked = book.unpack()?;
    let mut book_bits = BitCursor::with_bit_len(&unpacked.bytes, unpacked.bits);
    transfer_remaining(&mut book_bits, dst)?;
    Ok(())
}

/// Copy the identification, comment and setup packets stored ahead of
/// the audio in legacy streams.
fn copy_header_triad(desc: &mut WwriffDescriptor) -> WemResult<([Vec<u8>; 3], IdentHeader)> {
    let mut offset = desc.vorb.header_packets_offset as usize;
    let mut headers: [Vec<u8>; 3] = Default::default();

    for (slot, packet_type) in [PACKET_IDENTIFICATION, PACKET_COMMENT, PACKET_SETUP]
        .into_iter()
        .enumerate()
    {
        let packet = read_packet(&desc.data, offset, desc.packet_format, desc.byte_order)?;
        if packet.granule.is_some_and(|granule| granule != 0) {
            return Err(WemError::corrupt(format!(
                "header packet {packet_type} granule is not 0"
            )));
        }

        let mut src = BitCursor::new(packet.payload);
        expect_packet_header(&mut src, packet_type)?;
        let mut out = PackBuffer::with_capacity(packet.payload.len());
        write_packet_header(&mut out, packet_type);

        if packet_type == PACKET_SETUP {
            let codebook_count = transfer(&mut src, 8, &mut out)? + 1;
            for _ in 0..codebook_count {
                copy_full_codebook(&mut src, &mut out)?;
            }
        }
        transfer_remaining(&mut src, &mut out)?;

        headers[slot] = out.into_bytes();
        offset = packet.next_offset;
    }

    if offset != desc.vorb.audio_start_offset as usize {
        return Err(WemError::corrupt(format!(
            "first audio packet at {} does not follow setup packet ending at {offset}",
            desc.vorb.audio_start_offset
        )));
    }

    let ident = IdentHeader::parse(&headers[0])?;
    desc.mode_blockflags = parse_setup(&headers[2], u32::from(ident.channels))?;
    Ok((headers, ident))
}

fn rebuild_audio(desc: &WwriffDescriptor, layout: &BlockLayout) -> WemResult<Vec<OggPacket>> {
    let data = desc.data.as_slice();
    let mode_bits = layout.mode_bits();
    let mode_mask = (1u32 << mode_bits) - 1;
    let blockflag = |mode: u32| layout.mode_blockflags.get(mode as usize).copied();

    let mut packets = Vec::new();
    let mut granules = GranuleTracker::new();
    let mut previous_long = false;
    let mut offset = desc.vorb.audio_start_offset as usize;

    while offset < data.len() {
        let packet = match read_packet(data, offset, desc.packet_format, desc.byte_order) {
            Ok(packet) => packet,
            Err(err @ WemError::TruncatedPacket { .. }) => {
                warn!("{err}, keeping the {} audio packets before it", packets.len());
                break;
            }
            Err(err) => return Err(err),
        };
        let mut out = PackBuffer::with_capacity(packet.payload.len() + 1);

        if !packet.payload.is_empty() {
            let mut src = BitCursor::new(packet.payload);
            if desc.flags.mod_packets {
                out.write(0, 1); // audio packet type
                let mode = transfer(&mut src, mode_bits, &mut out)?;
                let remainder = src.read(8 - mode_bits)?;
                let long = blockflag(mode).ok_or_else(|| {
                    WemError::corrupt(format!("audio packet at {offset} names unknown mode {mode}"))
                })?;

                if long {
                    let next_long = read_packet(data, packet.next_offset, desc.packet_format, desc.byte_order)
                        .ok()
                        .and_then(|next| next.payload.first().copied())
                        .and_then(|first| blockflag(u32::from(first) & mode_mask))
                        .unwrap_or(false);
                    out.write_bit(previous_long);
                    out.write_bit(next_long);
                }
                previous_long = long;
                out.write(remainder, 8 - mode_bits);
            } else {
                transfer(&mut src, 8, &mut out)?;
            }
            transfer_remaining(&mut src, &mut out)?;
        }

        let built = out.into_bytes();
        let granule = granules.advance(layout.packet_blocksize(&built));
        packets.push(OggPacket {
            data: built,
            granule,
            packet_number: packets.len() as u64 + 3,
            end_of_stream: false,
        });
        offset = packet.next_offset;
    }

    if let Some(last) = packets.last_mut() {
        last.end_of_stream = true;
    }
    debug!("{} audio packets, final granule {}", packets.len(), granules.total());
    Ok(packets)
}
