//! Setup header floors, residues, mappings and modes.
//!
//! Wwise strips a few fixed fields from the standard setup header and
//! narrows others. One walker handles both shapes: in stripped form it reads
//! the narrow fields and writes the standard ones, in full form it reads the
//! standard fields and optionally copies them.

use crate::bit_reader::BitCursor;
use crate::bit_writer::PackBuffer;
use crate::codebook::copy_full_codebook;
use crate::error::{WemError, WemResult};

use super::header::{PACKET_SETUP, expect_packet_header};
use super::helpers::ilog;

/// Shape of the setup data being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupForm {
    /// Wwise stripped layout.
    Stripped,
    /// Standard Vorbis layout.
    Full,
}

struct SetupWalker<'w, 'a> {
    src: &'w mut BitCursor<'a>,
    dst: Option<&'w mut PackBuffer>,
    form: SetupForm,
    channels: u32,
    codebook_count: u32,
}

impl SetupWalker<'_, '_> {
    fn emit(&mut self, value: u32, bits: u32) {
        if let Some(dst) = self.dst.as_deref_mut() {
            dst.write(value, bits);
        }
    }

    fn copy(&mut self, bits: u32) -> WemResult<u32> {
        let value = self.src.read(bits)?;
        self.emit(value, bits);
        Ok(value)
    }

    /// A field narrowed to `stripped_bits` by Wwise and `full_bits` wide
    /// in standard headers.
    fn widen(&mut self, stripped_bits: u32, full_bits: u32) -> WemResult<u32> {
        let value = match self.form {
            SetupForm::Stripped => self.src.read(stripped_bits)?,
            SetupForm::Full => self.src.read(full_bits)?,
        };
        self.emit(value, full_bits);
        Ok(value)
    }

    /// A field Wwise drops entirely because it is always `value`.
    fn fixed(&mut self, value: u32, bits: u32, what: &str) -> WemResult<u32> {
        match self.form {
            SetupForm::Stripped => {
                self.emit(value, bits);
                Ok(value)
            }
            SetupForm::Full => {
                let found = self.copy(bits)?;
                if found != value {
                    return Err(WemError::corrupt(format!("{what} is {found}, expected {value}")));
                }
                Ok(found)
            }
        }
    }

    fn check_book(&self, book: u32, what: &str) -> WemResult<()> {
        if book >= self.codebook_count {
            return Err(WemError::corrupt(format!(
                "{what} {book} out of range, {} codebooks",
                self.codebook_count
            )));
        }
        Ok(())
    }

    fn floors(&mut self) -> WemResult<u32> {
        let count = self.copy(6)? + 1;
        for _ in 0..count {
            let floor_type = match self.form {
                SetupForm::Stripped => self.fixed(1, 16, "floor type")?,
                SetupForm::Full => self.copy(16)?,
            };
            match floor_type {
                0 => self.floor0()?,
                1 => self.floor1()?,
                other => return Err(WemError::corrupt(format!("invalid floor type {other}"))),
            }
        }
        Ok(count)
    }

    fn floor0(&mut self) -> WemResult<()> {
        self.copy(8)?; // order
        self.copy(16)?; // rate
        self.copy(16)?; // bark map size
        self.copy(6)?; // amplitude bits
        self.copy(8)?; // amplitude offset
        let books = self.copy(4)? + 1;
        for _ in 0..books {
            let book = self.copy(8)?;
            self.check_book(book, "floor0 book")?;
        }
        Ok(())
    }

    fn floor1(&mut self) -> WemResult<()> {
        let partitions = self.copy(5)?;
        let mut partition_classes = Vec::with_capacity(partitions as usize);
        let mut maximum_class = 0u32;
        for _ in 0..partitions {
            let class = self.copy(4)?;
            maximum_class = maximum_class.max(class);
            partition_classes.push(class);
        }

        let class_count = if partitions == 0 { 0 } else { maximum_class + 1 };
        let mut class_dimensions = Vec::with_capacity(class_count as usize);
        for _ in 0..class_count {
            class_dimensions.push(self.copy(3)? + 1);

            let subclasses = self.copy(2)?;
            if subclasses != 0 {
                let masterbook = self.copy(8)?;
                self.check_book(masterbook, "floor1 masterbook")?;
            }
            for _ in 0..(1u32 << subclasses) {
                let book_plus1 = self.copy(8)?;
                if book_plus1 != 0 {
                    self.check_book(book_plus1 - 1, "floor1 subclass book")?;
                }
            }
        }

        self.copy(2)?; // multiplier - 1
        let rangebits = self.copy(4)?;
        for class in partition_classes {
            for _ in 0..class_dimensions[class as usize] {
                self.copy(rangebits)?;
            }
        }
        Ok(())
    }

    fn residues(&mut self) -> WemResult<u32> {
        let count = self.copy(6)? + 1;
        for _ in 0..count {
            let residue_type = self.widen(2, 16)?;
            if residue_type > 2 {
                return Err(WemError::corrupt(format!("invalid residue type {residue_type}")));
            }

            self.copy(24)?; // begin
            self.copy(24)?; // end
            self.copy(24)?; // partition size - 1
            let classifications = self.copy(6)? + 1;
            let classbook = self.copy(8)?;
            self.check_book(classbook, "residue classbook")?;

            let mut cascades = Vec::with_capacity(classifications as usize);
            for _ in 0..classifications {
                let low_bits = self.copy(3)?;
                let high_bits = if self.copy(1)? != 0 { self.copy(5)? } else { 0 };
                cascades.push(high_bits * 8 + low_bits);
            }
            for cascade in cascades {
                for pass in 0..8 {
                    if cascade & (1 << pass) != 0 {
                        let book = self.copy(8)?;
                        self.check_book(book, "residue book")?;
                    }
                }
            }
        }
        Ok(count)
    }

    fn mappings(&mut self, floor_count: u32, residue_count: u32) -> WemResult<u32> {
        let count = self.copy(6)? + 1;
        for _ in 0..count {
            self.fixed(0, 16, "mapping type")?;

            let submaps = if self.copy(1)? != 0 { self.copy(4)? + 1 } else { 1 };

            if self.copy(1)? != 0 {
                let steps = self.copy(8)? + 1;
                let coupling_bits = ilog(self.channels.saturating_sub(1));
                for _ in 0..steps {
                    let magnitude = self.copy(coupling_bits)?;
                    let angle = self.copy(coupling_bits)?;
                    if magnitude == angle || magnitude >= self.channels || angle >= self.channels {
                        return Err(WemError::corrupt(format!(
                            "invalid channel coupling {magnitude}/{angle} for {} channels",
                            self.channels
                        )));
                    }
                }
            }

            let reserved = self.copy(2)?;
            if reserved != 0 {
                return Err(WemError::corrupt("mapping reserved field nonzero"));
            }

            if submaps > 1 {
                for _ in 0..self.channels {
                    let mux = self.copy(4)?;
                    if mux >= submaps {
                        return Err(WemError::corrupt(format!("mapping mux {mux} >= {submaps} submaps")));
                    }
                }
            }

            for _ in 0..submaps {
                self.copy(8)?; // time configuration
                let floor = self.copy(8)?;
                if floor >= floor_count {
                    return Err(WemError::corrupt(format!("mapping floor {floor} out of range")));
                }
                let residue = self.copy(8)?;
                if residue >= residue_count {
                    return Err(WemError::corrupt(format!("mapping residue {residue} out of range")));
                }
            }
        }
        Ok(count)
    }

    fn modes(&mut self, mapping_count: u32) -> WemResult<Vec<bool>> {
        let count = self.copy(6)? + 1;
        let mut blockflags = Vec::with_capacity(count as usize);
        for _ in 0..count {
            blockflags.push(self.copy(1)? != 0);
            self.fixed(0, 16, "window type")?;
            self.fixed(0, 16, "transform type")?;
            let mapping = self.copy(8)?;
            if mapping >= mapping_count {
                return Err(WemError::corrupt(format!("mode mapping {mapping} out of range")));
            }
        }
        Ok(blockflags)
    }

    /// Everything after the time domain transforms, framing bit included.
    fn walk(&mut self) -> WemResult<Vec<bool>> {
        let floor_count = self.floors()?;
        let residue_count = self.residues()?;
        let mapping_count = self.mappings(floor_count, residue_count)?;
        let blockflags = self.modes(mapping_count)?;
        self.fixed(1, 1, "setup framing bit")?;
        Ok(blockflags)
    }
}

/// Rebuild the stripped floors, residues, mappings and modes from `src`
/// into standard form in `dst`, framing bit included. Returns the window
/// flag of every mode.
pub fn rebuild_setup_tail(
    src: &mut BitCursor<'_>,
    dst: &mut PackBuffer,
    channels: u32,
    codebook_count: u32,
) -> WemResult<Vec<bool>> {
    SetupWalker {
        src,
        dst: Some(dst),
        form: SetupForm::Stripped,
        channels,
        codebook_count,
    }
    .walk()
}

/// Parse a complete standard setup header packet and return the window
/// flag of every mode.
pub fn parse_setup(packet: &[u8], channels: u32) -> WemResult<Vec<bool>> {
    let mut src = BitCursor::new(packet);
    expect_packet_header(&mut src, PACKET_SETUP)?;

    let codebook_count = src.read(8)? + 1;
    let mut scratch = PackBuffer::new();
    for _ in 0..codebook_count {
        copy_full_codebook(&mut src, &mut scratch)?;
    }

    let time_count = src.read(6)? + 1;
    for _ in 0..time_count {
        if src.read(16)? != 0 {
            return Err(WemError::corrupt("nonzero time domain transform"));
        }
    }

    SetupWalker {
        src: &mut src,
        dst: None,
        form: SetupForm::Full,
        channels,
        codebook_count,
    }
    .walk()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vorbis::header::write_packet_header;

    /// Stripped tail: one floor1, one type 2 residue, one mapping, `modes`.
    fn stripped_tail(modes: &[bool]) -> Vec<u8> {
        let mut buf = PackBuffer::new();
        buf.write(0, 6); // one floor
        buf.write(1, 5); // one partition
        buf.write(0, 4); // class 0
        buf.write(0, 3); // dimension 1
        buf.write(0, 2); // no subclasses
        buf.write(0, 8); // no subclass book
        buf.write(0, 2); // multiplier 1
        buf.write(4, 4); // range bits
        buf.write(5, 4); // x

        buf.write(0, 6); // one residue
        buf.write(2, 2); // type 2
        buf.write(0, 24);
        buf.write(0, 24);
        buf.write(0, 24);
        buf.write(0, 6);
        buf.write(0, 8); // classbook
        buf.write(0, 3);
        buf.write(0, 1);

        buf.write(0, 6); // one mapping
        buf.write(0, 1); // no submaps
        buf.write(0, 1); // no coupling
        buf.write(0, 2); // reserved
        buf.write(0, 8);
        buf.write(0, 8);
        buf.write(0, 8);

        buf.write(modes.len() as u32 - 1, 6);
        for &long in modes {
            buf.write(u32::from(long), 1);
            buf.write(0, 8);
        }
        buf.into_bytes()
    }

    fn full_setup_from_tail(tail: &[u8], modes: usize) -> Vec<u8> {
        let mut out = PackBuffer::new();
        write_packet_header(&mut out, PACKET_SETUP);
        out.write(0, 8); // one codebook
        // two entries, one dimension, 1-bit codes, no lookup
        out.write(0x564342, 24);
        out.write(1, 16);
        out.write(2, 24);
        out.write(0, 1);
        out.write(0, 1);
        out.write(0, 5);
        out.write(0, 5);
        out.write(0, 4);
        out.write(0, 6);
        out.write(0, 16);
        let blockflags = rebuild_setup_tail(&mut BitCursor::new(tail), &mut out, 1, 1).unwrap();
        assert_eq!(blockflags.len(), modes);
        out.into_bytes()
    }

    #[test]
    fn test_rebuild_returns_blockflags() {
        let tail = stripped_tail(&[false, true, true]);
        let mut out = PackBuffer::new();
        let flags = rebuild_setup_tail(&mut BitCursor::new(&tail), &mut out, 2, 1).unwrap();
        assert_eq!(flags, vec![false, true, true]);
    }

    #[test]
    fn test_rebuilt_setup_parses() {
        let tail = stripped_tail(&[true, false]);
        let packet = full_setup_from_tail(&tail, 2);
        assert_eq!(parse_setup(&packet, 1).unwrap(), vec![true, false]);
    }

    #[test]
    fn test_rebuild_widens_fields() {
        let tail = stripped_tail(&[false]);
        let mut out = PackBuffer::new();
        rebuild_setup_tail(&mut BitCursor::new(&tail), &mut out, 1, 1).unwrap();

        let mut reader = BitCursor::new(out.as_bytes());
        assert_eq!(reader.read(6).unwrap(), 0);
        assert_eq!(reader.read(16).unwrap(), 1); // floor type written in full
    }

    #[test]
    fn test_rebuild_rejects_bad_classbook() {
        let tail = stripped_tail(&[false]);
        let err = rebuild_setup_tail(&mut BitCursor::new(&tail), &mut PackBuffer::new(), 1, 0)
            .unwrap_err();
        assert!(matches!(err, WemError::Corrupt { .. }));
    }

    #[test]
    fn test_rebuild_rejects_bad_residue_type() {
        let mut buf = PackBuffer::new();
        buf.write(0, 6);
        buf.write(0, 5); // floor1 with no partitions
        buf.write(0, 2);
        buf.write(0, 4);
        buf.write(0, 6);
        buf.write(3, 2); // residue type 3
        let bytes = buf.into_bytes();
        let err = rebuild_setup_tail(&mut BitCursor::new(&bytes), &mut PackBuffer::new(), 1, 1)
            .unwrap_err();
        assert!(err.to_string().contains("residue type 3"));
    }

    #[test]
    fn test_parse_rejects_wrong_packet_type() {
        let tail = stripped_tail(&[false]);
        let mut packet = full_setup_from_tail(&tail, 1);
        packet[0] = 1;
        assert!(parse_setup(&packet, 1).is_err());
    }

    #[test]
    fn test_truncated_tail_underruns() {
        let tail = stripped_tail(&[false]);
        let err = rebuild_setup_tail(&mut BitCursor::new(&tail[..6]), &mut PackBuffer::new(), 1, 1)
            .unwrap_err();
        assert!(err.is_underrun());
    }
}
