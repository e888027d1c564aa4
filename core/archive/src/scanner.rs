use riff::RiffByteOrder;
use tracing::{debug, warn};

use crate::types::{ArchiveScan, RiffGeometry, Truncation};

/// Find every RIFF blob in `buffer`, in file order.
///
/// Every offset is tried as a root tag. A blob whose declared extent runs
/// past the end of the buffer ends the scan.
pub fn scan(buffer: &[u8]) -> ArchiveScan {
    let mut result = ArchiveScan::default();
    let mut offset = 0usize;

    while offset + 8 <= buffer.len() {
        let header = &buffer[offset..offset + 8];
        let Some(order) = RiffByteOrder::from_root_tag([header[0], header[1], header[2], header[3]]) else {
            offset += 1;
            continue;
        };

        let declared = (order.decode_u32([header[4], header[5], header[6], header[7]]) as usize).saturating_add(8);
        let available = buffer.len() - offset;
        if declared > available {
            warn!(
                "RIFF at {offset} declares {declared} bytes but only {available} remain, stopping scan"
            );
            result.truncated = Some(Truncation {
                offset,
                declared,
                available,
            });
            break;
        }

        debug!("{:?} blob at {offset}, {declared} bytes", order);
        result.items.push(RiffGeometry {
            buffer_offset: offset,
            size: declared,
            byte_order: order,
        });
        offset += declared;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(tag: &[u8; 4], payload: &[u8], big_endian: bool) -> Vec<u8> {
        let size = payload.len() as u32;
        let mut out = tag.to_vec();
        if big_endian {
            out.extend(size.to_be_bytes());
        } else {
            out.extend(size.to_le_bytes());
        }
        out.extend(payload);
        out
    }

    #[test]
    fn test_finds_unaligned_blobs() {
        let mut buffer = vec![0xAA; 3];
        buffer.extend(blob(b"RIFF", b"WAVEdata", false));
        buffer.extend([1, 2]);
        buffer.extend(blob(b"RIFX", b"WAVE", true));

        let scan = scan(&buffer);
        assert_eq!(scan.truncated, None);
        assert_eq!(scan.items.len(), 2);
        assert_eq!(scan.items[0].buffer_offset, 3);
        assert_eq!(scan.items[0].size, 16);
        assert_eq!(scan.items[1].buffer_offset, 21);
        assert_eq!(scan.items[1].size, 12);
        assert_eq!(scan.items[1].byte_order, RiffByteOrder::Rifx);
    }

    #[test]
    fn test_contained_tags_are_skipped() {
        // The inner RIFF lies inside the first blob and must not be reported.
        let inner = blob(b"RIFF", b"", false);
        let outer = blob(b"FFIR", &inner, true);
        let scan = scan(&outer);
        assert_eq!(scan.items.len(), 1);
        assert_eq!(scan.items[0].size, outer.len());
    }

    #[test]
    fn test_truncated_tail() {
        let mut buffer = blob(b"RIFF", b"WAVE", false);
        let mut tail = blob(b"RIFF", &[0; 32], false);
        tail.truncate(20);
        buffer.extend(tail);

        let scan = scan(&buffer);
        assert_eq!(scan.items.len(), 1);
        assert_eq!(
            scan.truncated,
            Some(Truncation {
                offset: 12,
                declared: 40,
                available: 20
            })
        );
    }

    #[test]
    fn test_huge_declared_size() {
        let mut buffer = b"XFIR".to_vec();
        buffer.extend([0xFF; 4]);
        let scan = scan(&buffer);
        assert!(scan.items.is_empty());
        assert!(scan.truncated.is_some());
    }

    #[test]
    fn test_short_buffers() {
        assert_eq!(scan(&[]), ArchiveScan::default());
        assert_eq!(scan(b"RIFF\0\0\0"), ArchiveScan::default());
    }
}
