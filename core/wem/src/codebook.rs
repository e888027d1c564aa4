//! Vorbis codebook library for rebuilding Wwise audio.
//!
//! Stripped Wwise setup headers reference codebooks by index into an external
//! library instead of embedding them. A library is a list of packed
//! codebooks stored in one of two layouts:
//!
//! - [`LibraryLayout::OffsetsFirst`]: a table of little-endian `u32` start
//!   offsets, one per codebook, followed by the codebooks. The first entry
//!   doubles as the table size.
//! - [`LibraryLayout::CodebooksFirst`]: the codebooks back to back, followed
//!   by a table of cumulative end offsets. The last entry doubles as the
//!   table start. Files with the `.ocbl` extension use this layout.
//!
//! Packed codebooks use the compact Wwise bit format and are expanded to the
//! standard Vorbis codebook format on first use.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use byteorder::{ByteOrder, LittleEndian};
use tracing::{debug, warn};

use crate::bit_reader::BitCursor;
use crate::bit_writer::{PackBuffer, transfer};
use crate::error::CodebookError;
use crate::vorbis::helpers::{ilog, lookup1_values};

const CODEBOOK_SYNC: u32 = 0x564342;

/// Extension of libraries stored codebooks-first.
pub const CODEBOOKS_FIRST_EXTENSION: &str = "ocbl";

/// On-disk arrangement of a codebook library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryLayout {
    OffsetsFirst,
    CodebooksFirst,
}

impl LibraryLayout {
    pub fn alternate(self) -> Self {
        match self {
            LibraryLayout::OffsetsFirst => LibraryLayout::CodebooksFirst,
            LibraryLayout::CodebooksFirst => LibraryLayout::OffsetsFirst,
        }
    }

    /// Layout implied by a file name, if any.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| ext.eq_ignore_ascii_case(CODEBOOKS_FIRST_EXTENSION))
            .map(|_| LibraryLayout::CodebooksFirst)
    }
}

/// A codebook expanded to the standard Vorbis bit format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackedCodebook {
    /// Exact length of the bitstream; `bytes` is zero padded past it.
    pub bits: u64,
    pub bytes: Vec<u8>,
}

/// One codebook in the compact Wwise format, expanded lazily.
#[derive(Debug, Clone)]
pub struct PackedCodebook {
    raw: Vec<u8>,
    unpacked: OnceLock<UnpackedCodebook>,
}

impl PartialEq for PackedCodebook {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for PackedCodebook {}

impl PackedCodebook {
    pub fn new(raw: Vec<u8>) -> Self {
        Self {
            raw,
            unpacked: OnceLock::new(),
        }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn is_unpacked(&self) -> bool {
        self.unpacked.get().is_some()
    }

    /// The standard-format codebook, computed on first call.
    pub fn unpack(&self) -> Result<&UnpackedCodebook, CodebookError> {
        if let Some(unpacked) = self.unpacked.get() {
            return Ok(unpacked);
        }

        let mut src = BitCursor::new(&self.raw);
        let mut dst = PackBuffer::with_capacity(self.raw.len() * 2);
        unpack_raw(&mut src, &mut dst)?;

        let bits = dst.bits_written();
        Ok(self.unpacked.get_or_init(|| UnpackedCodebook {
            bits,
            bytes: dst.into_bytes(),
        }))
    }
}

/// Ordered codebooks, addressed by index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodebookLibrary {
    books: Vec<PackedCodebook>,
}

fn le_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    bytes
        .get(offset..offset.checked_add(4)?)
        .map(LittleEndian::read_u32)
}

fn copy_book(bytes: &[u8], start: usize, end: usize) -> Result<PackedCodebook, CodebookError> {
    let slice = bytes
        .get(start..end)
        .ok_or_else(|| CodebookError::corrupt(format!("codebook range {start}..{end} out of bounds")))?;
    let mut raw = Vec::new();
    raw.try_reserve_exact(slice.len())?;
    raw.extend_from_slice(slice);
    Ok(PackedCodebook::new(raw))
}

impl CodebookLibrary {
    pub fn new(books: Vec<PackedCodebook>) -> Self {
        Self { books }
    }

    pub fn from_raw<I: IntoIterator<Item = Vec<u8>>>(raw: I) -> Self {
        Self::new(raw.into_iter().map(PackedCodebook::new).collect())
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PackedCodebook> {
        self.books.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackedCodebook> {
        self.books.iter()
    }

    /// Decode `bytes` stored in `layout`. Empty input is an empty library.
    pub fn deserialize(bytes: &[u8], layout: LibraryLayout) -> Result<Self, CodebookError> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        match layout {
            LibraryLayout::OffsetsFirst => Self::deserialize_offsets_first(bytes),
            LibraryLayout::CodebooksFirst => Self::deserialize_codebooks_first(bytes),
        }
    }

    fn deserialize_offsets_first(bytes: &[u8]) -> Result<Self, CodebookError> {
        let size = bytes.len();
        let table_len = le_u32(bytes, 0)
            .ok_or_else(|| CodebookError::corrupt("library shorter than its offset table"))?
            as usize;
        let count = table_len / 4;
        if table_len > size {
            return Err(CodebookError::corrupt(format!(
                "offset table of {table_len} bytes exceeds library size {size}"
            )));
        }

        let mut books = Vec::new();
        books.try_reserve_exact(count)?;

        let mut end = size;
        for index in (0..count).rev() {
            let start = le_u32(bytes, index * 4)
                .ok_or_else(|| CodebookError::corrupt("offset table truncated"))?
                as usize;
            if start > size || end < start {
                return Err(CodebookError::corrupt(format!(
                    "codebook {index} spans {start}..{end} in a library of {size} bytes"
                )));
            }
            books.push(copy_book(bytes, start, end)?);
            end = start;
        }
        books.reverse();

        Ok(Self::new(books))
    }

    fn deserialize_codebooks_first(bytes: &[u8]) -> Result<Self, CodebookError> {
        let size = bytes.len();
        let table_start = le_u32(bytes, size.saturating_sub(4))
            .filter(|_| size >= 4)
            .ok_or_else(|| CodebookError::corrupt("library shorter than its offset table"))?
            as usize;
        if table_start > size - 4 {
            return Err(CodebookError::corrupt(format!(
                "offset table start {table_start} past end of {size} byte library"
            )));
        }
        let count = (size - table_start) / 4;

        let mut books = Vec::new();
        books.try_reserve_exact(count)?;

        let mut start = 0usize;
        for index in 0..count {
            let end = le_u32(bytes, table_start + index * 4)
                .ok_or_else(|| CodebookError::corrupt("offset table truncated"))?
                as usize;
            if end < start || end > size {
                return Err(CodebookError::corrupt(format!(
                    "codebook {index} spans {start}..{end} in a library of {size} bytes"
                )));
            }
            books.push(copy_book(bytes, start, end)?);
            start = end;
        }

        Ok(Self::new(books))
    }

    /// Encode in `layout`. The result deserializes to an equal library.
    pub fn serialize(&self, layout: LibraryLayout) -> Result<Vec<u8>, CodebookError> {
        let table_len = self.books.len() * 4;
        let books_len: usize = self.books.iter().map(|book| book.raw.len()).sum();
        let total = table_len + books_len;
        if u32::try_from(total).is_err() {
            return Err(CodebookError::corrupt(format!(
                "library of {total} bytes cannot be addressed with 32-bit offsets"
            )));
        }

        let mut out = Vec::new();
        out.try_reserve_exact(total)?;
        let mut entry = [0u8; 4];

        match layout {
            LibraryLayout::OffsetsFirst => {
                let mut offset = table_len;
                for book in &self.books {
                    LittleEndian::write_u32(&mut entry, offset as u32);
                    out.extend_from_slice(&entry);
                    offset += book.raw.len();
                }
                for book in &self.books {
                    out.extend_from_slice(&book.raw);
                }
            }
            LibraryLayout::CodebooksFirst => {
                for book in &self.books {
                    out.extend_from_slice(&book.raw);
                }
                let mut end = 0usize;
                for book in &self.books {
                    end += book.raw.len();
                    LittleEndian::write_u32(&mut entry, end as u32);
                    out.extend_from_slice(&entry);
                }
            }
        }

        Ok(out)
    }

    /// Guess the layout of `bytes`: offsets-first when the leading table is
    /// fully consistent with the data, codebooks-first otherwise.
    pub fn detect_layout(bytes: &[u8]) -> LibraryLayout {
        let size = bytes.len();
        let Some(table_len) = le_u32(bytes, 0).map(|v| v as usize) else {
            return LibraryLayout::OffsetsFirst;
        };
        if table_len == 0 || table_len % 4 != 0 || table_len > size {
            return LibraryLayout::CodebooksFirst;
        }

        let mut previous = table_len;
        for index in 0..table_len / 4 {
            match le_u32(bytes, index * 4).map(|v| v as usize) {
                Some(start) if start >= previous && start <= size => previous = start,
                _ => return LibraryLayout::CodebooksFirst,
            }
        }
        LibraryLayout::OffsetsFirst
    }

    /// Decode with a layout hint, falling back to the other layout.
    pub fn deserialize_with_fallback(
        bytes: &[u8],
        preferred: LibraryLayout,
    ) -> Result<(Self, LibraryLayout), CodebookError> {
        match Self::deserialize(bytes, preferred) {
            Ok(library) => Ok((library, preferred)),
            Err(first) => {
                let alternate = preferred.alternate();
                debug!("{preferred:?} codebook layout failed ({first}), trying {alternate:?}");
                Self::deserialize(bytes, alternate)
                    .map(|library| (library, alternate))
                    .map_err(|_| first)
            }
        }
    }

    /// Load a library file. The extension or content picks the layout.
    pub fn from_file(path: &Path) -> Result<(Self, LibraryLayout), CodebookError> {
        let bytes = std::fs::read(path)?;
        let preferred = LibraryLayout::from_path(path).unwrap_or_else(|| Self::detect_layout(&bytes));
        Self::deserialize_with_fallback(&bytes, preferred)
    }
}

/// Expand one packed codebook from `src` into standard form in `dst`.
pub fn unpack_raw(src: &mut BitCursor<'_>, dst: &mut PackBuffer) -> Result<(), CodebookError> {
    dst.write(CODEBOOK_SYNC, 24);
    let dimensions = src.read(4)?;
    dst.write(dimensions, 16);
    let entries = src.read(14)?;
    dst.write(entries, 24);

    let ordered = transfer(src, 1, dst)?;
    if ordered != 0 {
        copy_ordered_lengths(src, dst, entries)?;
    } else {
        let length_bits = src.read(3)?;
        let sparse = src.read(1)?;
        if length_bits > 5 {
            return Err(CodebookError::corrupt(format!(
                "codeword length width {length_bits} exceeds 5 bits"
            )));
        }
        dst.write(sparse, 1);

        for _ in 0..entries {
            let present = sparse == 0 || transfer(src, 1, dst)? != 0;
            if present {
                let length = src.read(length_bits)?;
                dst.write(length, 5);
            }
        }
    }

    let lookup_type = src.read(1)?;
    dst.write(lookup_type, 4);
    copy_lookup(src, dst, lookup_type, entries, dimensions)
}

/// Copy one codebook already in standard form, checking its structure.
pub fn copy_full_codebook(src: &mut BitCursor<'_>, dst: &mut PackBuffer) -> Result<(), CodebookError> {
    let sync = transfer(src, 24, dst)?;
    if sync != CODEBOOK_SYNC {
        return Err(CodebookError::corrupt(format!(
            "codebook sync 0x{sync:06X}, expected 0x{CODEBOOK_SYNC:06X}"
        )));
    }
    let dimensions = transfer(src, 16, dst)?;
    let entries = transfer(src, 24, dst)?;

    let ordered = transfer(src, 1, dst)?;
    if ordered != 0 {
        copy_ordered_lengths(src, dst, entries)?;
    } else {
        let sparse = transfer(src, 1, dst)?;
        for _ in 0..entries {
            let present = sparse == 0 || transfer(src, 1, dst)? != 0;
            if present {
                transfer(src, 5, dst)?;
            }
        }
    }

    let lookup_type = transfer(src, 4, dst)?;
    copy_lookup(src, dst, lookup_type, entries, dimensions)
}

fn copy_ordered_lengths(
    src: &mut BitCursor<'_>,
    dst: &mut PackBuffer,
    entries: u32,
) -> Result<(), CodebookError> {
    let mut length = transfer(src, 5, dst)? + 1;
    let mut current = 0u32;
    while current < entries {
        let number = transfer(src, ilog(entries - current), dst)?;
        current += number;
        length += 1;
        if current > entries {
            return Err(CodebookError::corrupt(format!(
                "ordered lengths overshoot {entries} entries at length {length}"
            )));
        }
    }
    Ok(())
}

fn copy_lookup(
    src: &mut BitCursor<'_>,
    dst: &mut PackBuffer,
    lookup_type: u32,
    entries: u32,
    dimensions: u32,
) -> Result<(), CodebookError> {
    let values = match lookup_type {
        0 => return Ok(()),
        1 => lookup1_values(entries, dimensions),
        2 => entries.saturating_mul(dimensions),
        other => {
            return Err(CodebookError::corrupt(format!("invalid lookup type {other}")));
        }
    };

    transfer(src, 32, dst)?; // minimum value
    transfer(src, 32, dst)?; // delta value
    let value_bits = transfer(src, 4, dst)? + 1;
    transfer(src, 1, dst)?; // sequence flag

    for _ in 0..values {
        transfer(src, value_bits, dst)?;
    }
    Ok(())
}

/// Libraries loaded during a run, keyed by path. Failures are remembered
/// too, so a broken library is reported once and never re-read.
#[derive(Debug, Default)]
pub struct LibraryCache {
    entries: HashMap<PathBuf, Result<Arc<CodebookLibrary>, String>>,
}

impl LibraryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&mut self, path: &Path) -> Result<Arc<CodebookLibrary>, String> {
        self.entries
            .entry(path.to_path_buf())
            .or_insert_with(|| match CodebookLibrary::from_file(path) {
                Ok((library, layout)) => {
                    debug!(
                        "loaded {} codebooks from {} ({layout:?})",
                        library.len(),
                        path.display()
                    );
                    Ok(Arc::new(library))
                }
                Err(err) => {
                    warn!("codebook library {} unusable: {err}", path.display());
                    Err(format!("{}: {err}", path.display()))
                }
            })
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
