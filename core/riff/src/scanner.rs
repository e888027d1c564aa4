//! Incremental chunk scanner.
//!
//! The scanner is driven with the whole input seen so far. Each `step`
//! consumes at most one chunk and reports what happened; callers decide
//! whether to feed more bytes, resynchronize past unknown data, or stop.

use tracing::{debug, warn};

use crate::error::{Result, RiffError};
use crate::types::{
    BasicChunk, BasicKind, FormatKind, ListChunk, ListFormat, ListKind, RiffByteOrder,
    RiffDocument,
};

const ROOT_HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;
const LIST_FORMAT_LEN: usize = 4;

/// Where the scanner is in the document grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    AwaitRoot,
    AwaitChunkHeader,
    ConsumingBasic {
        kind: BasicKind,
        size: u32,
        header_offset: usize,
    },
    ConsumingList {
        kind: ListKind,
        size: u32,
        header_offset: usize,
    },
}

/// Index of a chunk inside the document being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkRef {
    Basic(usize),
    List(usize),
}

/// Outcome of one scanner step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStep {
    /// A chunk was fully consumed.
    Consumed(ChunkRef),
    /// More bytes are required to make progress.
    Incomplete { needed: usize },
    /// The header at `offset` has an unknown tag. Nothing was consumed.
    Unrecognized {
        offset: usize,
        tag: [u8; 4],
        size: u32,
    },
}

#[derive(Debug, Clone, Copy)]
struct OpenList {
    index: usize,
    remaining: i64,
}

#[derive(Debug)]
pub struct ChunkScanner {
    state: ScanState,
    consumed: usize,
    byte_order: Option<RiffByteOrder>,
    format: FormatKind,
    total_size: u32,
    basics: Vec<BasicChunk>,
    lists: Vec<ListChunk>,
    open_list: Option<OpenList>,
}

impl Default for ChunkScanner {
    fn default() -> Self {
        Self::new()
    }
}

fn quad(bytes: &[u8], at: usize) -> [u8; 4] {
    [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]
}

impl ChunkScanner {
    pub fn new() -> Self {
        Self {
            state: ScanState::AwaitRoot,
            consumed: 0,
            byte_order: None,
            format: FormatKind::Unrecognized([0; 4]),
            total_size: 0,
            basics: Vec::new(),
            lists: Vec::new(),
            open_list: None,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Absolute offset of the next unconsumed byte.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn byte_order(&self) -> Option<RiffByteOrder> {
        self.byte_order
    }

    pub fn basics(&self) -> &[BasicChunk] {
        &self.basics
    }

    pub fn lists(&self) -> &[ListChunk] {
        &self.lists
    }

    /// Advance over `buffer`, which must start at the same byte as every
    /// previous call and may only have grown.
    pub fn step(&mut self, buffer: &[u8]) -> Result<ScanStep> {
        loop {
            let rest = buffer.get(self.consumed..).unwrap_or_default();
            let available = rest.len();

            match self.state {
                ScanState::AwaitRoot => {
                    if available < ROOT_HEADER_LEN {
                        return Ok(ScanStep::Incomplete {
                            needed: ROOT_HEADER_LEN - available,
                        });
                    }
                    let raw = quad(rest, 0);
                    let order = RiffByteOrder::from_root_tag(raw).ok_or_else(|| {
                        RiffError::not_riff(self.consumed, format!("unknown root tag {raw:02X?}"))
                    })?;
                    self.total_size = order.decode_u32(quad(rest, 4));
                    self.format = FormatKind::from_tag(order.decode_tag(quad(rest, 8)));
                    self.byte_order = Some(order);
                    debug!(
                        "RIFF root {:?}, size {}, format {:?}",
                        order, self.total_size, self.format
                    );
                    self.consumed += ROOT_HEADER_LEN;
                    self.state = ScanState::AwaitChunkHeader;
                }
                ScanState::AwaitChunkHeader => {
                    let Some(order) = self.byte_order else {
                        self.state = ScanState::AwaitRoot;
                        continue;
                    };
                    if available < CHUNK_HEADER_LEN {
                        return Ok(ScanStep::Incomplete {
                            needed: CHUNK_HEADER_LEN - available,
                        });
                    }
                    let tag = order.decode_tag(quad(rest, 0));
                    let size = order.decode_u32(quad(rest, 4));
                    let header_offset = self.consumed;

                    if let Some(kind) = BasicKind::from_tag(tag) {
                        self.state = ScanState::ConsumingBasic {
                            kind,
                            size,
                            header_offset,
                        };
                    } else if let Some(kind) = ListKind::from_tag(tag) {
                        self.state = ScanState::ConsumingList {
                            kind,
                            size,
                            header_offset,
                        };
                    } else {
                        return Ok(ScanStep::Unrecognized {
                            offset: header_offset,
                            tag,
                            size,
                        });
                    }
                    self.consumed += CHUNK_HEADER_LEN;
                }
                ScanState::ConsumingBasic {
                    kind,
                    size,
                    header_offset,
                } => {
                    let len = size as usize;
                    if available < len {
                        return Ok(ScanStep::Incomplete {
                            needed: len - available,
                        });
                    }
                    let mut data = Vec::new();
                    data.try_reserve_exact(len)?;
                    data.extend_from_slice(&rest[..len]);

                    let index = self.basics.len();
                    self.basics.push(BasicChunk {
                        kind,
                        byte_offset: header_offset,
                        size,
                        data,
                    });

                    if let Some(open) = self.open_list.as_mut() {
                        let list = &mut self.lists[open.index];
                        list.child_count += 1;
                        open.remaining -= i64::from(size) + CHUNK_HEADER_LEN as i64;
                        if open.remaining < 0 {
                            return Err(RiffError::corrupted(
                                header_offset,
                                format!(
                                    "chunk overruns its LIST by {} bytes",
                                    -open.remaining
                                ),
                            ));
                        }
                        if open.remaining == 0 {
                            self.open_list = None;
                        }
                    }

                    self.consumed += len;
                    self.state = ScanState::AwaitChunkHeader;
                    return Ok(ScanStep::Consumed(ChunkRef::Basic(index)));
                }
                ScanState::ConsumingList {
                    kind,
                    size,
                    header_offset,
                } => {
                    let Some(order) = self.byte_order else {
                        self.state = ScanState::AwaitRoot;
                        continue;
                    };
                    if self.open_list.is_some() {
                        return Err(RiffError::not_riff(
                            header_offset,
                            "LIST chunk nested inside another LIST",
                        ));
                    }
                    if available < LIST_FORMAT_LEN {
                        return Ok(ScanStep::Incomplete {
                            needed: LIST_FORMAT_LEN - available,
                        });
                    }
                    let remaining = i64::from(size) - LIST_FORMAT_LEN as i64;
                    if remaining < 0 {
                        return Err(RiffError::corrupted(
                            header_offset,
                            format!("LIST size {size} cannot hold its format tag"),
                        ));
                    }

                    let index = self.lists.len();
                    self.lists.push(ListChunk {
                        kind,
                        format: ListFormat::from_tag(order.decode_tag(quad(rest, 0))),
                        byte_offset: header_offset,
                        size,
                        first_child_index: self.basics.len(),
                        child_count: 0,
                    });
                    if remaining > 0 {
                        self.open_list = Some(OpenList { index, remaining });
                    }

                    self.consumed += LIST_FORMAT_LEN;
                    self.state = ScanState::AwaitChunkHeader;
                    return Ok(ScanStep::Consumed(ChunkRef::List(index)));
                }
            }
        }
    }

    /// Skip one byte past an unrecognized header and look for the next one.
    pub fn resync(&mut self) {
        if self.state == ScanState::AwaitChunkHeader {
            self.consumed += 1;
        }
    }

    /// Finish scanning. Fails only if the root header was never read.
    pub fn into_document(self) -> Result<RiffDocument> {
        let byte_order = self.byte_order.ok_or(RiffError::Incomplete {
            needed: ROOT_HEADER_LEN.saturating_sub(self.consumed),
        })?;
        Ok(RiffDocument {
            byte_order,
            format: self.format,
            total_size: self.total_size,
            basics: self.basics,
            lists: self.lists,
        })
    }
}

/// Scan a complete in-memory document.
///
/// Unrecognized chunks are skipped one byte at a time. Running out of bytes
/// ends the scan without failing, unless the root header itself is missing.
pub fn parse_document(buffer: &[u8]) -> Result<RiffDocument> {
    let mut scanner = ChunkScanner::new();
    loop {
        match scanner.step(buffer)? {
            ScanStep::Consumed(_) => {}
            ScanStep::Unrecognized { offset, tag, size } => {
                debug!(
                    "unrecognized chunk {:?} ({size} bytes) at {offset}, resyncing",
                    String::from_utf8_lossy(&tag)
                );
                scanner.resync();
            }
            ScanStep::Incomplete { needed } => {
                if scanner.byte_order().is_some() && scanner.consumed() < buffer.len() {
                    warn!(
                        "RIFF data truncated at {}: {needed} more bytes needed",
                        scanner.consumed()
                    );
                }
                break;
            }
        }
    }
    scanner.into_document()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(order: RiffByteOrder, size: u32) -> Vec<u8> {
        let mut out = order.root_tag().to_vec();
        out.extend_from_slice(&encode_u32(order, size));
        out.extend_from_slice(&encode_tag(order, *b"WAVE"));
        out
    }

    fn encode_tag(order: RiffByteOrder, tag: [u8; 4]) -> [u8; 4] {
        order.decode_tag(tag)
    }

    fn encode_u32(order: RiffByteOrder, value: u32) -> [u8; 4] {
        match order.data_endian() {
            crate::Endian::Little => value.to_le_bytes(),
            crate::Endian::Big => value.to_be_bytes(),
        }
    }

    fn chunk(order: RiffByteOrder, tag: [u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = encode_tag(order, tag).to_vec();
        out.extend_from_slice(&encode_u32(order, payload.len() as u32));
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_all_root_tags_decode() {
        for order in RiffByteOrder::ALL {
            let mut buf = root(order, 0x0102_0304);
            buf.extend(chunk(order, *b"data", &[1, 2, 3, 4]));
            let doc = parse_document(&buf).unwrap();
            assert_eq!(doc.byte_order, order);
            assert_eq!(doc.total_size, 0x0102_0304);
            assert_eq!(doc.format, FormatKind::Wave);
            assert_eq!(doc.basics.len(), 1);
            assert_eq!(doc.basics[0].kind, BasicKind::Data);
            assert_eq!(doc.basics[0].size, 4);
            assert_eq!(doc.basics[0].data, vec![1, 2, 3, 4]);
            assert_eq!(order.u32_at(&doc.basics[0].data, 0), Some(match order.data_endian() {
                crate::Endian::Little => 0x0403_0201,
                crate::Endian::Big => 0x0102_0304,
            }));
        }
    }

    #[test]
    fn test_unknown_root_is_not_riff() {
        let buf = b"OggS\0\0\0\0WAVE".to_vec();
        assert!(matches!(parse_document(&buf), Err(RiffError::NotRiff { offset: 0, .. })));
    }

    #[test]
    fn test_missing_root_is_incomplete() {
        assert!(matches!(
            parse_document(b"RIFF"),
            Err(RiffError::Incomplete { needed: 8 })
        ));
    }

    #[test]
    fn test_resync_skips_garbage() {
        let order = RiffByteOrder::Riff;
        let mut buf = root(order, 0);
        buf.extend(chunk(order, *b"fmt ", &[0xAA; 4]));
        buf.extend_from_slice(&[0x11, 0x22, 0x33]);
        buf.extend(chunk(order, *b"data", &[0xBB; 2]));

        let doc = parse_document(&buf).unwrap();
        assert_eq!(doc.basics.len(), 2);
        assert_eq!(doc.basics[0].kind, BasicKind::Fmt);
        assert_eq!(doc.basics[1].kind, BasicKind::Data);
        assert_eq!(doc.basics[1].byte_offset, 12 + 12 + 3);
    }

    #[test]
    fn test_unrecognized_does_not_consume() {
        let order = RiffByteOrder::Riff;
        let mut buf = root(order, 0);
        buf.extend(chunk(order, *b"zzzz", &[0; 4]));

        let mut scanner = ChunkScanner::new();
        let step = scanner.step(&buf).unwrap();
        assert_eq!(
            step,
            ScanStep::Unrecognized {
                offset: 12,
                tag: *b"zzzz",
                size: 4
            }
        );
        assert_eq!(scanner.consumed(), 12);
        scanner.resync();
        assert_eq!(scanner.consumed(), 13);
    }

    #[test]
    fn test_list_children_are_counted() {
        let order = RiffByteOrder::Rifx;
        let labl = chunk(order, *b"labl", &[7; 8]);
        let mut list_body = encode_tag(order, *b"adtl").to_vec();
        list_body.extend(&labl);
        list_body.extend(&labl);

        let mut buf = root(order, 0);
        buf.extend(chunk(order, *b"LIST", &list_body));
        buf.extend(chunk(order, *b"data", &[1]));

        let doc = parse_document(&buf).unwrap();
        assert_eq!(doc.lists.len(), 1);
        let list = &doc.lists[0];
        assert_eq!(list.format, ListFormat::Adtl);
        assert_eq!(list.child_count, 2);
        assert_eq!(doc.children(list).len(), 2);
        assert!(doc.children(list).iter().all(|c| c.kind == BasicKind::Labl));
        assert_eq!(doc.chunks_of(BasicKind::Data).count(), 1);
    }

    #[test]
    fn test_nested_list_is_not_riff() {
        let order = RiffByteOrder::Riff;
        let inner = chunk(order, *b"LIST", b"adtl");
        let mut outer_body = b"adtl".to_vec();
        outer_body.extend(&inner);

        let mut buf = root(order, 0);
        buf.extend(chunk(order, *b"LIST", &outer_body));
        assert!(matches!(parse_document(&buf), Err(RiffError::NotRiff { offset: 24, .. })));
    }

    #[test]
    fn test_list_overrun_is_corrupted() {
        let order = RiffByteOrder::Riff;
        let mut buf = root(order, 0);
        // LIST claims 4 + 8 bytes of children, the child carries 4 more.
        buf.extend(b"LIST");
        buf.extend(12u32.to_le_bytes());
        buf.extend(b"adtl");
        buf.extend(chunk(order, *b"labl", &[0; 4]));
        assert!(matches!(parse_document(&buf), Err(RiffError::Corrupted { .. })));
    }

    #[test]
    fn test_truncated_payload_stops_scan() {
        let order = RiffByteOrder::Riff;
        let mut buf = root(order, 0);
        buf.extend(chunk(order, *b"fmt ", &[0; 16]));
        let mut data = chunk(order, *b"data", &[0; 32]);
        data.truncate(20);
        buf.extend(data);

        let doc = parse_document(&buf).unwrap();
        assert_eq!(doc.basics.len(), 1);
        assert_eq!(doc.basics[0].kind, BasicKind::Fmt);
    }

    #[test]
    fn test_incremental_feeding() {
        let order = RiffByteOrder::Ffir;
        let mut full = root(order, 0);
        full.extend(chunk(order, *b"vorb", &[9; 6]));

        let mut scanner = ChunkScanner::new();
        assert_eq!(
            scanner.step(&full[..5]).unwrap(),
            ScanStep::Incomplete { needed: 7 }
        );
        assert_eq!(
            scanner.step(&full[..22]).unwrap(),
            ScanStep::Incomplete { needed: 4 }
        );
        assert_eq!(
            scanner.step(&full).unwrap(),
            ScanStep::Consumed(ChunkRef::Basic(0))
        );
        let doc = scanner.into_document().unwrap();
        assert_eq!(doc.basics[0].data, vec![9; 6]);
    }
}
