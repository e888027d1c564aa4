use std::collections::BTreeSet;

use riff::RiffByteOrder;
use serde::Serialize;
use tracing::warn;

/// One embedded RIFF blob found in an archive.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiffGeometry {
    /// Offset of the root tag in the archive buffer.
    pub buffer_offset: usize,
    /// Length of the blob, root header included.
    pub size: usize,
    pub byte_order: RiffByteOrder,
}

impl RiffGeometry {
    pub fn end(&self) -> usize {
        self.buffer_offset + self.size
    }

    pub fn slice<'a>(&self, buffer: &'a [u8]) -> Option<&'a [u8]> {
        buffer.get(self.buffer_offset..self.end())
    }
}

/// Where a scan gave up because a blob ran past the end of the buffer.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncation {
    pub offset: usize,
    pub declared: usize,
    pub available: usize,
}

/// Result of scanning an archive buffer.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveScan {
    pub items: Vec<RiffGeometry>,
    pub truncated: Option<Truncation>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    #[default]
    Allow,
    Deny,
}

/// Restricts (allow) or excludes (deny) items by 0-based index. An empty
/// filter passes everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexFilter {
    pub kind: FilterKind,
    pub indices: BTreeSet<u32>,
}

impl IndexFilter {
    pub fn new(kind: FilterKind, indices: impl IntoIterator<Item = u32>) -> Self {
        Self {
            kind,
            indices: indices.into_iter().collect(),
        }
    }

    /// Parse a comma separated index list such as `3, 0x10, #7`. Anything
    /// before the first digit of a token is skipped; tokens that still do
    /// not parse are logged and dropped.
    pub fn parse(kind: FilterKind, list: &str) -> Self {
        let mut indices = BTreeSet::new();
        for token in list.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match parse_index(token) {
                Some(index) => {
                    indices.insert(index);
                }
                None => warn!("Ignoring invalid index {:?} in filter", token),
            }
        }
        Self { kind, indices }
    }

    pub fn passes(&self, index: u32) -> bool {
        if self.indices.is_empty() {
            return true;
        }
        let listed = self.indices.contains(&index);
        match self.kind {
            FilterKind::Allow => listed,
            FilterKind::Deny => !listed,
        }
    }
}

fn parse_index(token: &str) -> Option<u32> {
    let start = token.find(|c: char| c.is_ascii_digit())?;
    let digits = &token[start..];
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        digits.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_passes_all() {
        for kind in [FilterKind::Allow, FilterKind::Deny] {
            let filter = IndexFilter::new(kind, []);
            assert!(filter.passes(0));
            assert!(filter.passes(1000));
        }
    }

    #[test]
    fn test_allow_and_deny() {
        let allow = IndexFilter::new(FilterKind::Allow, [1, 3]);
        assert!(!allow.passes(0));
        assert!(allow.passes(1));
        assert!(allow.passes(3));

        let deny = IndexFilter::new(FilterKind::Deny, [1, 3]);
        assert!(deny.passes(0));
        assert!(!deny.passes(1));
        assert!(deny.passes(2));
    }

    #[test]
    fn test_parse_list() {
        let filter = IndexFilter::parse(FilterKind::Deny, "3, 0x10,#7,,7, abc, 12x");
        assert_eq!(filter.kind, FilterKind::Deny);
        assert_eq!(filter.indices.into_iter().collect::<Vec<_>>(), vec![3, 7, 16]);
    }

    #[test]
    fn test_geometry_slice() {
        let geometry = RiffGeometry {
            buffer_offset: 2,
            size: 3,
            byte_order: RiffByteOrder::Riff,
        };
        assert_eq!(geometry.slice(&[0, 1, 2, 3, 4, 5]), Some(&[2u8, 3, 4][..]));
        assert_eq!(geometry.slice(&[0, 1, 2]), None);
    }
}
