//! Granule position repair for existing Ogg/Vorbis files.

use std::io::Cursor;

use ogg::PacketReader;
use symphonia::core::codecs::{CODEC_TYPE_VORBIS, CodecParameters, DecoderOptions};
use tracing::debug;

use crate::error::{WemError, WemResult};
use crate::stream::{HeaderMode, OggPacket, VorbisStream};
use crate::vorbis::{BlockLayout, GranuleTracker, IdentHeader, check_comment, parse_setup};

/// Outcome of one regranularization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegrainSummary {
    pub serial: u32,
    pub audio_packets: usize,
    pub final_granule: u64,
}

/// Hand the identification and setup headers to symphonia's Vorbis
/// decoder. Any complaint is reported as [`WemError::HeaderRejected`].
pub fn validate_headers(ident: &[u8], setup: &[u8]) -> WemResult<()> {
    let mut extra = Vec::with_capacity(ident.len() + setup.len());
    extra.extend_from_slice(ident);
    extra.extend_from_slice(setup);

    let mut params = CodecParameters::new();
    params
        .for_codec(CODEC_TYPE_VORBIS)
        .with_extra_data(extra.into_boxed_slice());

    symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map(|_| ())
        .map_err(|err| WemError::header_rejected(err.to_string()))
}

/// Read the first logical stream of `input`, recompute every audio
/// packet's granule position and page it again.
pub fn regrain_bytes(input: &[u8]) -> WemResult<(Vec<u8>, RegrainSummary)> {
    let stream = regrain_stream(input)?;
    let summary = RegrainSummary {
        serial: stream.serial,
        audio_packets: stream.packets.len(),
        final_granule: stream.final_granule(),
    };
    Ok((stream.to_ogg_bytes()?, summary))
}

/// Like [`regrain_bytes`] but returns the rebuilt stream unpaged.
pub fn regrain_stream(input: &[u8]) -> WemResult<VorbisStream> {
    let mut reader = PacketReader::new(Cursor::new(input));

    let first = reader
        .read_packet()?
        .ok_or_else(|| WemError::corrupt("no Ogg packets"))?;
    let serial = first.stream_serial();

    let mut headers: Vec<Vec<u8>> = vec![first.data];
    let mut finished = false;
    while headers.len() < 3 {
        let packet = reader
            .read_packet()?
            .ok_or_else(|| WemError::corrupt("stream ends inside the Vorbis headers"))?;
        if packet.stream_serial() != serial {
            continue;
        }
        finished = packet.last_in_stream();
        headers.push(packet.data);
        if finished && headers.len() < 3 {
            return Err(WemError::corrupt("stream ends inside the Vorbis headers"));
        }
    }
    let [ident, comment, setup]: [Vec<u8>; 3] = headers
        .try_into()
        .map_err(|_| WemError::corrupt("expected three Vorbis headers"))?;

    validate_headers(&ident, &setup)?;
    let id = IdentHeader::parse(&ident).map_err(|err| WemError::header_rejected(err.to_string()))?;
    check_comment(&comment).map_err(|err| WemError::header_rejected(err.to_string()))?;
    let blockflags = parse_setup(&setup, u32::from(id.channels))?;

    let layout = BlockLayout::from_exponents(id.blocksize_short_exp, id.blocksize_long_exp, blockflags);
    let mut granules = GranuleTracker::new();
    let mut packets = Vec::new();

    while !finished {
        let Some(packet) = reader.read_packet()? else {
            break;
        };
        if packet.stream_serial() != serial {
            debug!("skipping packet of stream {:#010x}", packet.stream_serial());
            continue;
        }
        finished = packet.last_in_stream();
        let granule = granules.advance(layout.packet_blocksize(&packet.data));
        packets.push(OggPacket {
            data: packet.data,
            granule,
            packet_number: packets.len() as u64 + 3,
            end_of_stream: false,
        });
    }
    if let Some(last) = packets.last_mut() {
        last.end_of_stream = true;
    }
    debug!(
        "stream {serial:#010x}: {} audio packets, final granule {}",
        packets.len(),
        granules.total()
    );

    Ok(VorbisStream {
        serial,
        headers: [ident, comment, setup],
        packets,
        header_mode: HeaderMode::Copied,
    })
}
