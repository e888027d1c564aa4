//! Helpers shared by the file-level drivers: output naming and input
//! type detection.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use riff::RiffByteOrder;
use serde::Serialize;

/// What kind of input a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Ogg,
    Wem,
    Wsp,
    Bnk,
}

impl DataType {
    /// Guess from the first bytes, then from the extension.
    ///
    /// A leading RIFF root makes a single WEM; archives only announce
    /// themselves by extension or by a `BKHD` bank header.
    pub fn detect(path: &Path, head: &[u8]) -> Option<Self> {
        if head.starts_with(b"OggS") {
            return Some(DataType::Ogg);
        }
        if head.starts_with(b"BKHD") {
            return Some(DataType::Bnk);
        }
        if let Some(tag) = head.first_chunk::<4>() {
            if RiffByteOrder::from_root_tag(*tag).is_some() && !Self::is_archive_extension(path) {
                return Some(DataType::Wem);
            }
        }
        Self::from_extension(path)
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "ogg" | "logg" => Some(DataType::Ogg),
            "wem" => Some(DataType::Wem),
            "wsp" => Some(DataType::Wsp),
            "bnk" => Some(DataType::Bnk),
            _ => None,
        }
    }

    fn is_archive_extension(path: &Path) -> bool {
        matches!(Self::from_extension(path), Some(DataType::Wsp | DataType::Bnk))
    }

    pub fn is_archive(self) -> bool {
        matches!(self, DataType::Wsp | DataType::Bnk)
    }
}

/// How drivers treat their output files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputPolicy {
    /// Replace the input instead of writing beside it.
    pub in_place: bool,
    /// Do the work but write nothing.
    pub dry_run: bool,
}

/// `<dir>/<stem><suffix>.<extension>` next to `input`.
pub fn with_suffix(input: &Path, suffix: &str, extension: &str) -> PathBuf {
    let mut name = input.file_stem().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    name.push(".");
    name.push(extension);
    input.with_file_name(name)
}

/// Output name of item `index` out of `count` items extracted from
/// `input`. The index is zero padded to the width of `count`.
pub fn indexed_output_path(input: &Path, index: usize, count: usize, extension: &str) -> PathBuf {
    let width = count.to_string().len();
    with_suffix(input, &format!("_{index:0width$}"), extension)
}
