//! The parts of the boot sector that describe where things are on the volume.

/// Parameters at the start of every FAT boot sector, bytes 0 to 35.
///
/// Only the layout fields are read; the CHS values and hidden sector count describe the disk
/// around the volume, not the volume itself.
#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::NoUninit, bytemuck::AnyBitPattern)]
pub struct RawBpb {
    /// x86 jump over the parameter block
    pub jump: [u8; 3],
    /// Name of the formatting tool, space padded
    pub oem_name: [u8; 8],
    /// Always 512 on volumes this crate mounts
    pub bytes_per_sector: [u8; 2],
    /// A power of two between 1 and 128
    pub sectors_per_cluster: u8,
    /// Sectors before the first FAT, the boot sector included
    pub reserved_sectors: [u8; 2],
    pub fat_count: u8,
    /// Capacity of the fixed root directory in 32 byte entries, 0 on FAT32
    pub root_entries: [u8; 2],
    /// Volume size when it fits in 16 bits, otherwise 0
    pub total_sectors_16: [u8; 2],
    pub media: u8,
    /// FAT size for FAT12/16, 0 on FAT32
    pub sectors_per_fat_16: [u8; 2],
    pub sectors_per_track: [u8; 2],
    pub heads: [u8; 2],
    pub hidden_sectors: [u8; 4],
    /// Volume size when `total_sectors_16` is 0
    pub total_sectors_32: [u8; 4],
}

/// The FAT32 continuation of [`RawBpb`], bytes 36 to 63.
///
/// On FAT12/16 volumes these bytes hold the drive number and volume label instead, and are
/// only consulted when `sectors_per_fat_16` is 0.
#[repr(C, packed)]
#[derive(Clone, Copy, bytemuck::NoUninit, bytemuck::AnyBitPattern)]
pub struct RawFat32Bpb {
    pub sectors_per_fat_32: [u8; 4],
    /// Mirroring flags; bit 7 set means only one FAT copy is active
    pub flags: [u8; 2],
    pub version: [u8; 2],
    /// First cluster of the root directory chain
    pub root_cluster: [u8; 4],
    pub fs_info_sector: [u8; 2],
    pub backup_boot_sector: [u8; 2],
    pub reserved: [u8; 12],
}

pub const SIGNATURE_OFFSET: usize = 510;
pub const SIGNATURE: [u8; 2] = [0x55, 0xAA];

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{offset_of, size_of};
    use static_assertions::const_assert_eq;

    const_assert_eq!(size_of::<RawBpb>(), 36);
    const_assert_eq!(size_of::<RawFat32Bpb>(), 28);

    const_assert_eq!(offset_of!(RawBpb, bytes_per_sector), 0x0B);
    const_assert_eq!(offset_of!(RawBpb, sectors_per_cluster), 0x0D);
    const_assert_eq!(offset_of!(RawBpb, reserved_sectors), 0x0E);
    const_assert_eq!(offset_of!(RawBpb, fat_count), 0x10);
    const_assert_eq!(offset_of!(RawBpb, root_entries), 0x11);
    const_assert_eq!(offset_of!(RawBpb, total_sectors_16), 0x13);
    const_assert_eq!(offset_of!(RawBpb, sectors_per_fat_16), 0x16);
    const_assert_eq!(offset_of!(RawBpb, total_sectors_32), 0x20);

    const_assert_eq!(size_of::<RawBpb>() + offset_of!(RawFat32Bpb, root_cluster), 0x2C);
}
