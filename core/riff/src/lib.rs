//! RIFF document scanning with support for all four byte-order variants.

pub mod error;
pub mod scanner;
pub mod types;

pub use error::*;
pub use scanner::*;
pub use types::*;
