//! Vorbis bitstream pieces: header packets, setup walking, block sizes and
//! the Wwise packet framing.

pub mod granule;
pub mod header;
pub mod helpers;
pub mod packet;
pub mod setup;

pub use granule::{BlockLayout, GranuleTracker};
pub use header::{IdentHeader, build_comment, check_comment, vendor_string};
pub use helpers::{ilog, lookup1_values};
pub use packet::{PacketHeaderFormat, WwisePacket, read_packet};
pub use setup::{parse_setup, rebuild_setup_tail};
