//! Reserved table values and directory record markers, in native endianness.
//!
//! Any table value at or above `CLUSTER_EOC_MIN` ends a chain; `CLUSTER_END` is the one
//! formatting tools write.

/// The first cluster of the data region. Clusters 0 and 1 are reserved table entries.
pub const FIRST_DATA_CLUSTER: u32 = 2;

/// FAT12 cluster values, packed 12 bits per entry
pub mod fat12 {
    pub const CLUSTER_BAD: u16 = 0xFF7;
    pub const CLUSTER_EOC_MIN: u16 = 0xFF8;
    pub const CLUSTER_END: u16 = 0xFFF;
    pub const ENTRY_MASK: u16 = 0x0FFF;
}

/// FAT16 cluster values
pub mod fat16 {
    pub const CLUSTER_BAD: u16 = 0xFFF7;
    pub const CLUSTER_EOC_MIN: u16 = 0xFFF8;
    pub const CLUSTER_END: u16 = 0xFFFF;
}

/// FAT32 cluster values. The top four bits of an entry are reserved and masked off.
pub mod fat32 {
    pub const CLUSTER_BAD: u32 = 0x0FFFFFF7;
    pub const CLUSTER_EOC_MIN: u32 = 0x0FFFFFF8;
    pub const CLUSTER_END: u32 = 0x0FFFFFFF;
    pub const ENTRY_MASK: u32 = 0x0FFFFFFF;
    /// Highest data cluster count whose cluster numbers stay below `CLUSTER_BAD`
    pub const MAX_CLUSTERS: u32 = CLUSTER_BAD - 2;
}

/// Directory entry values
pub mod directory {
    /// Size of one on-disk directory record
    pub const ENTRY_SIZE: usize = 32;
    /// Byte 0 of a deleted entry
    pub const DELETED_MARK: u8 = 0xE5;
    /// Byte 0 of the first never-used entry; no live entries follow it
    pub const END_OF_ENTRIES: u8 = 0x00;
    /// Stand-in for a name whose first byte really is 0xE5
    pub const ESCAPED_E5: u8 = 0x05;
    /// Attribute byte of a long-file-name slot
    pub const ATTR_LONG_NAME: u8 = 0x0F;
}
