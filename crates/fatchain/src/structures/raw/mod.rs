//! On-disk records, cast straight out of sector buffers.
//!
//! Every struct is `repr(C, packed)` with byte-array fields, so it has alignment 1 and reads the
//! same on any host.

pub mod boot_sector;
pub mod constants;
pub mod directory;
