//! RIFF byte orders, chunk kinds and the scanned document model.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::Serialize;

/// Endianness of one aspect (tags or numeric fields) of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// The four root variants. Each fixes the byte order of tags and of data
/// independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RiffByteOrder {
    /// `RIFF`: little-endian tags, little-endian data.
    Riff,
    /// `RIFX`: little-endian tags, big-endian data.
    Rifx,
    /// `XFIR`: big-endian tags, little-endian data.
    Xfir,
    /// `FFIR`: big-endian tags, big-endian data.
    Ffir,
}

impl RiffByteOrder {
    pub const ALL: [RiffByteOrder; 4] = [
        RiffByteOrder::Riff,
        RiffByteOrder::Rifx,
        RiffByteOrder::Xfir,
        RiffByteOrder::Ffir,
    ];

    /// The root tag exactly as it appears in the file.
    pub fn root_tag(self) -> [u8; 4] {
        match self {
            RiffByteOrder::Riff => *b"RIFF",
            RiffByteOrder::Rifx => *b"RIFX",
            RiffByteOrder::Xfir => *b"XFIR",
            RiffByteOrder::Ffir => *b"FFIR",
        }
    }

    /// Identify a root tag from the first four raw bytes.
    pub fn from_root_tag(raw: [u8; 4]) -> Option<Self> {
        Self::ALL.into_iter().find(|order| order.root_tag() == raw)
    }

    pub fn tag_endian(self) -> Endian {
        match self {
            RiffByteOrder::Riff | RiffByteOrder::Rifx => Endian::Little,
            RiffByteOrder::Xfir | RiffByteOrder::Ffir => Endian::Big,
        }
    }

    pub fn data_endian(self) -> Endian {
        match self {
            RiffByteOrder::Riff | RiffByteOrder::Xfir => Endian::Little,
            RiffByteOrder::Rifx | RiffByteOrder::Ffir => Endian::Big,
        }
    }

    /// Normalize a four-character tag read from the file.
    pub fn decode_tag(self, raw: [u8; 4]) -> [u8; 4] {
        match self.tag_endian() {
            Endian::Little => raw,
            Endian::Big => [raw[3], raw[2], raw[1], raw[0]],
        }
    }

    pub fn decode_u16(self, raw: [u8; 2]) -> u16 {
        match self.data_endian() {
            Endian::Little => LittleEndian::read_u16(&raw),
            Endian::Big => BigEndian::read_u16(&raw),
        }
    }

    pub fn decode_u32(self, raw: [u8; 4]) -> u32 {
        match self.data_endian() {
            Endian::Little => LittleEndian::read_u32(&raw),
            Endian::Big => BigEndian::read_u32(&raw),
        }
    }

    /// Read a data-order `u16` at `offset`, if the slice is long enough.
    pub fn u16_at(self, data: &[u8], offset: usize) -> Option<u16> {
        let bytes = data.get(offset..offset.checked_add(2)?)?;
        Some(self.decode_u16([bytes[0], bytes[1]]))
    }

    /// Read a data-order `u32` at `offset`, if the slice is long enough.
    pub fn u32_at(self, data: &[u8], offset: usize) -> Option<u32> {
        let bytes = data.get(offset..offset.checked_add(4)?)?;
        Some(self.decode_u32([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

/// Chunks carrying an opaque payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Cue,
    Data,
    Fmt,
    Junk,
    Labl,
    Vorb,
    Smpl,
    Akd,
}

impl BasicKind {
    pub const ALL: [BasicKind; 8] = [
        BasicKind::Cue,
        BasicKind::Data,
        BasicKind::Fmt,
        BasicKind::Junk,
        BasicKind::Labl,
        BasicKind::Vorb,
        BasicKind::Smpl,
        BasicKind::Akd,
    ];

    pub fn tag(self) -> [u8; 4] {
        match self {
            BasicKind::Cue => *b"cue ",
            BasicKind::Data => *b"data",
            BasicKind::Fmt => *b"fmt ",
            BasicKind::Junk => *b"JUNK",
            BasicKind::Labl => *b"labl",
            BasicKind::Vorb => *b"vorb",
            BasicKind::Smpl => *b"smpl",
            BasicKind::Akd => *b"akd ",
        }
    }

    pub fn from_tag(tag: [u8; 4]) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }
}

/// Chunks whose payload is a sequence of basic chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    List,
}

impl ListKind {
    pub fn tag(self) -> [u8; 4] {
        match self {
            ListKind::List => *b"LIST",
        }
    }

    pub fn from_tag(tag: [u8; 4]) -> Option<Self> {
        (tag == *b"LIST").then_some(ListKind::List)
    }
}

/// The four-character format tag following a list header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListFormat {
    Adtl,
    Unrecognized([u8; 4]),
}

impl ListFormat {
    pub fn from_tag(tag: [u8; 4]) -> Self {
        if tag == *b"adtl" {
            ListFormat::Adtl
        } else {
            ListFormat::Unrecognized(tag)
        }
    }
}

/// The four-character format tag following the root header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    Wave,
    Unrecognized([u8; 4]),
}

impl FormatKind {
    pub fn from_tag(tag: [u8; 4]) -> Self {
        if tag == *b"WAVE" {
            FormatKind::Wave
        } else {
            FormatKind::Unrecognized(tag)
        }
    }
}

/// A recognized chunk with its payload copied verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicChunk {
    pub kind: BasicKind,
    /// Absolute offset of the chunk header in the scanned buffer.
    pub byte_offset: usize,
    pub size: u32,
    pub data: Vec<u8>,
}

/// A `LIST` chunk. Its children are a contiguous run of the document's
/// basic chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListChunk {
    pub kind: ListKind,
    pub format: ListFormat,
    pub byte_offset: usize,
    pub size: u32,
    pub first_child_index: usize,
    pub child_count: usize,
}

/// Everything recognized in one RIFF document, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiffDocument {
    /// The root variant, which also fixes the byte order.
    pub byte_order: RiffByteOrder,
    pub format: FormatKind,
    /// Size field of the root header (excludes the first 8 bytes).
    pub total_size: u32,
    pub basics: Vec<BasicChunk>,
    pub lists: Vec<ListChunk>,
}

impl RiffDocument {
    /// All basic chunks of `kind`, in file order.
    pub fn chunks_of(&self, kind: BasicKind) -> impl Iterator<Item = &BasicChunk> {
        self.basics.iter().filter(move |chunk| chunk.kind == kind)
    }

    /// Child chunks of `list`.
    pub fn children(&self, list: &ListChunk) -> &[BasicChunk] {
        let end = list.first_child_index + list.child_count;
        self.basics
            .get(list.first_child_index..end)
            .unwrap_or_default()
    }
}
