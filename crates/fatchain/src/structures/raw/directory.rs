/// One 32 byte short-name record, laid out the same on FAT12, FAT16 and FAT32.
///
/// Multi-byte fields are little endian byte arrays, so the struct can be cast directly from a
/// sector buffer at any 32 byte offset. Timestamps are kept as opaque bytes; nothing here
/// decodes them.
#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::NoUninit, bytemuck::AnyBitPattern)]
pub struct RawFileEntry {
    /// Base name, space padded. Byte 0 doubles as the deleted (0xE5) and end-of-entries (0x00)
    /// marker, with 0x05 standing in for a real leading 0xE5.
    pub name: [u8; 8],
    /// Extension, space padded
    pub extension: [u8; 3],
    pub attributes: u8,
    /// Case flags written by Windows NT
    pub nt_reserved: u8,
    /// Creation time in tenths of a second, then time and date
    pub created: [u8; 5],
    pub accessed: [u8; 2],
    /// Upper half of the first cluster; zero on FAT12/16
    pub first_cluster_high: [u8; 2],
    /// Last write time, then date
    pub modified: [u8; 4],
    pub first_cluster_low: [u8; 2],
    /// File length in bytes, zero for directories
    pub size: [u8; 4],
}
