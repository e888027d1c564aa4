//! wem library for converting Wwise RIFF/Vorbis streams to Ogg/Vorbis.

pub mod bit_reader;
pub mod bit_writer;
pub mod codebook;
pub mod error;
pub mod process;
pub mod regrain;
pub mod stream;
pub mod transcoder;
pub mod vorbis;
pub mod wwriff;

pub use bit_reader::BitCursor;
pub use bit_writer::{PackBuffer, transfer, transfer_bulk, transfer_remaining};
pub use codebook::{CodebookLibrary, LibraryCache, LibraryLayout, PackedCodebook, UnpackedCodebook};
pub use error::*;
pub use regrain::{RegrainSummary, regrain_bytes, regrain_stream, validate_headers};
pub use stream::{HeaderMode, OggPacket, VorbisStream};
pub use transcoder::{CodebookSource, ConvertOptions, PacketFormatOverride, convert_bytes, transcode};
pub use wwriff::{DescriptorFlags, VorbLayout, WwiseFmt, WwiseVorb, WwriffDescriptor};
