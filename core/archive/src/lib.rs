//! Scanning of archives (WSP, BNK) that concatenate RIFF blobs.

pub mod error;
pub mod process;
pub mod scanner;
pub mod types;

pub use error::{ArchiveError, Result};
pub use scanner::scan;
pub use types::*;
