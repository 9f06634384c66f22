//! Filesystem geometry, computed once at mount and consumed read-only afterwards.

use fatchain_io::{SECTOR_SIZE, Sector};

use crate::{
    error::{FatError, Result},
    structures::raw::{
        boot_sector::{RawBpb, RawFat32Bpb, SIGNATURE, SIGNATURE_OFFSET},
        constants::{FIRST_DATA_CLUSTER, directory::ENTRY_SIZE, fat12, fat16, fat32},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatType {
    Fat12,
    Fat16,
    Fat32,
}

impl FatType {
    /// Picks the FAT variant from the number of data clusters, which is the only thing that
    /// determines it. The label in the boot sector is informational.
    pub fn from_cluster_count(clusters: u32) -> Self {
        match clusters {
            0..4085 => Self::Fat12,
            4085..65525 => Self::Fat16,
            _ => Self::Fat32,
        }
    }

    /// Whether `cluster` lies in the variant's reserved end-of-chain range
    pub fn is_end_of_chain(self, cluster: u32) -> bool {
        match self {
            Self::Fat12 => cluster >= fat12::CLUSTER_EOC_MIN as u32,
            Self::Fat16 => cluster >= fat16::CLUSTER_EOC_MIN as u32,
            Self::Fat32 => (cluster & fat32::ENTRY_MASK) >= fat32::CLUSTER_EOC_MIN,
        }
    }

    /// The value used to mark a bad cluster
    pub fn bad_cluster(self) -> u32 {
        match self {
            Self::Fat12 => fat12::CLUSTER_BAD as u32,
            Self::Fat16 => fat16::CLUSTER_BAD as u32,
            Self::Fat32 => fat32::CLUSTER_BAD,
        }
    }

    /// The value written to terminate a chain
    pub fn end_of_chain(self) -> u32 {
        match self {
            Self::Fat12 => fat12::CLUSTER_END as u32,
            Self::Fat16 => fat16::CLUSTER_END as u32,
            Self::Fat32 => fat32::CLUSTER_END,
        }
    }
}

impl core::fmt::Display for FatType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Fat12 => "FAT12",
            Self::Fat16 => "FAT16",
            Self::Fat32 => "FAT32",
        })
    }
}

/// Where the root directory lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootDirectory {
    /// FAT12/16: a fixed run of sectors between the FATs and the data region. It has no chain.
    Fixed { start: u32, sectors: u32 },
    /// FAT32: an ordinary cluster chain
    Cluster(u32),
}

/// The layout of a mounted FAT volume, in sectors relative to the volume start.
///
/// ```text
/// Reserved (boot sector, FsInfo on FAT32)
/// FAT(s)
/// Root directory (FAT12/16 only)
/// Data
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatGeometry {
    pub fat_type: FatType,
    pub sectors_per_cluster: u8,
    /// First sector of the first FAT
    pub fat_start: u32,
    pub sectors_per_fat: u32,
    pub fat_count: u8,
    pub root: RootDirectory,
    /// First sector of cluster 2
    pub data_start: u32,
    /// Number of data clusters, so valid cluster numbers are 2..cluster_count + 2
    pub cluster_count: u32,
}

/// The cluster number that designates the root directory in `..` entries, and that
/// [`FatGeometry::sector_of`] maps onto the fixed root region of FAT12/16
pub const ROOT_CLUSTER_ALIAS: u32 = 0;

impl FatGeometry {
    /// Derives the geometry from the BIOS parameter block in the boot sector.
    pub fn from_boot_sector(sector: &Sector) -> Result<Self> {
        if sector[SIGNATURE_OFFSET..SIGNATURE_OFFSET + 2] != SIGNATURE {
            return Err(FatError::InvalidBootSector("SignatureWord"));
        }
        let bpb: &RawBpb = bytemuck::from_bytes(&sector[..size_of::<RawBpb>()]);

        let bytes_per_sector = u16::from_le_bytes(bpb.bytes_per_sector) as usize;
        if bytes_per_sector != SECTOR_SIZE {
            return Err(FatError::InvalidBootSector("BytesPerSector"));
        }
        let sectors_per_cluster = bpb.sectors_per_cluster;
        if !sectors_per_cluster.is_power_of_two() {
            return Err(FatError::InvalidBootSector("SectorsPerCluster"));
        }
        let reserved = u16::from_le_bytes(bpb.reserved_sectors) as u32;
        if reserved == 0 {
            return Err(FatError::InvalidBootSector("ReservedSectorCount"));
        }
        if bpb.fat_count == 0 {
            return Err(FatError::InvalidBootSector("FatCount"));
        }

        let ext32_start = size_of::<RawBpb>();
        let ext32: &RawFat32Bpb =
            bytemuck::from_bytes(&sector[ext32_start..ext32_start + size_of::<RawFat32Bpb>()]);

        let sectors_per_fat = match u16::from_le_bytes(bpb.sectors_per_fat_16) {
            0 => u32::from_le_bytes(ext32.sectors_per_fat_32),
            n => n as u32,
        };
        if sectors_per_fat == 0 {
            return Err(FatError::InvalidBootSector("SectorsPerFat"));
        }
        let total_sectors = match u16::from_le_bytes(bpb.total_sectors_16) {
            0 => u32::from_le_bytes(bpb.total_sectors_32),
            n => n as u32,
        };

        let root_entries = u16::from_le_bytes(bpb.root_entries) as u32;
        let root_sectors = (root_entries * ENTRY_SIZE as u32).div_ceil(SECTOR_SIZE as u32);
        let fat_start = reserved;
        let root_start = (bpb.fat_count as u32)
            .checked_mul(sectors_per_fat)
            .and_then(|fats| fats.checked_add(fat_start))
            .ok_or(FatError::InvalidBootSector("SectorsPerFat"))?;
        let data_start = root_start
            .checked_add(root_sectors)
            .ok_or(FatError::InvalidBootSector("TotalSectors"))?;
        let cluster_count = total_sectors
            .checked_sub(data_start)
            .ok_or(FatError::InvalidBootSector("TotalSectors"))?
            / sectors_per_cluster as u32;

        let fat_type = FatType::from_cluster_count(cluster_count);
        if cluster_count > fat32::MAX_CLUSTERS {
            return Err(FatError::InvalidBootSector("TotalSectors"));
        }
        // Every cluster, plus the two reserved entries, needs a slot in the table
        let entries = cluster_count as u64 + FIRST_DATA_CLUSTER as u64;
        let table_bytes = match fat_type {
            FatType::Fat12 => (entries * 3).div_ceil(2),
            FatType::Fat16 => entries * 2,
            FatType::Fat32 => entries * 4,
        };
        if table_bytes > sectors_per_fat as u64 * SECTOR_SIZE as u64 {
            return Err(FatError::InvalidBootSector("SectorsPerFat"));
        }

        let root = match fat_type {
            FatType::Fat12 | FatType::Fat16 => {
                if root_sectors == 0 {
                    return Err(FatError::InvalidBootSector("RootEntryCount"));
                }
                RootDirectory::Fixed {
                    start: root_start,
                    sectors: root_sectors,
                }
            }
            FatType::Fat32 => {
                if root_entries != 0 {
                    return Err(FatError::InvalidBootSector("RootEntryCount"));
                }
                let root_cluster = u32::from_le_bytes(ext32.root_cluster) & fat32::ENTRY_MASK;
                if root_cluster < FIRST_DATA_CLUSTER
                    || root_cluster - FIRST_DATA_CLUSTER >= cluster_count
                {
                    return Err(FatError::InvalidBootSector("RootCluster"));
                }
                RootDirectory::Cluster(root_cluster)
            }
        };

        let geometry = Self {
            fat_type,
            sectors_per_cluster,
            fat_start,
            sectors_per_fat,
            fat_count: bpb.fat_count,
            root,
            data_start,
            cluster_count,
        };
        log::debug!("derived geometry: {geometry:?}");
        Ok(geometry)
    }

    /// First cluster of the root directory, with FAT12/16 using [`ROOT_CLUSTER_ALIAS`]
    pub fn root_cluster(&self) -> u32 {
        match self.root {
            RootDirectory::Fixed { .. } => ROOT_CLUSTER_ALIAS,
            RootDirectory::Cluster(cluster) => cluster,
        }
    }

    /// Whether `cluster` designates the fixed FAT12/16 root region rather than a chain
    pub fn is_fixed_root(&self, cluster: u32) -> bool {
        matches!(self.root, RootDirectory::Fixed { .. }) && cluster == ROOT_CLUSTER_ALIAS
    }

    /// Translates a cluster number to the address of its first sector. Pure, no I/O.
    ///
    /// The FAT12/16 root directory is not part of the data region, it is addressed directly.
    pub fn sector_of(&self, cluster: u32) -> u32 {
        match self.root {
            RootDirectory::Fixed { start, .. } if cluster == ROOT_CLUSTER_ALIAS => start,
            _ => {
                (cluster - FIRST_DATA_CLUSTER) * self.sectors_per_cluster as u32 + self.data_start
            }
        }
    }

    /// Whether `cluster` can be the target of a chain link
    pub fn is_data_cluster(&self, cluster: u32) -> bool {
        cluster >= FIRST_DATA_CLUSTER && cluster - FIRST_DATA_CLUSTER < self.cluster_count
    }

    pub fn bytes_per_cluster(&self) -> u32 {
        self.sectors_per_cluster as u32 * SECTOR_SIZE as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fat16_boot_sector() -> Sector {
        let mut sector = [0u8; SECTOR_SIZE];
        sector[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
        sector[11..13].copy_from_slice(&512u16.to_le_bytes());
        sector[13] = 4;
        sector[14..16].copy_from_slice(&4u16.to_le_bytes());
        sector[16] = 2;
        sector[17..19].copy_from_slice(&512u16.to_le_bytes());
        sector[19..21].copy_from_slice(&40_000u16.to_le_bytes());
        sector[21] = 0xF8;
        sector[22..24].copy_from_slice(&40u16.to_le_bytes());
        sector[510..512].copy_from_slice(&SIGNATURE);
        sector
    }

    #[test]
    fn test_fat16_geometry() {
        let geometry = FatGeometry::from_boot_sector(&fat16_boot_sector()).unwrap();
        assert_eq!(geometry.fat_type, FatType::Fat16);
        assert_eq!(geometry.fat_start, 4);
        // 512 entries * 32 bytes = 32 sectors of root directory after 2 * 40 FAT sectors
        assert_eq!(
            geometry.root,
            RootDirectory::Fixed {
                start: 84,
                sectors: 32
            }
        );
        assert_eq!(geometry.data_start, 116);
        assert_eq!(geometry.cluster_count, (40_000 - 116) / 4);
        assert_eq!(geometry.sector_of(2), 116);
        assert_eq!(geometry.sector_of(5), 128);
        assert_eq!(geometry.sector_of(ROOT_CLUSTER_ALIAS), 84);
        assert!(geometry.is_fixed_root(0));
    }

    #[test]
    fn test_fat32_geometry() {
        let sector = fat32_boot_sector();
        let geometry = FatGeometry::from_boot_sector(&sector).unwrap();
        assert_eq!(geometry.fat_type, FatType::Fat32);
        assert_eq!(geometry.root, RootDirectory::Cluster(2));
        assert_eq!(geometry.data_start, 32 + 2 * 1576);
        assert_eq!(geometry.sector_of(2), geometry.data_start);
        assert!(!geometry.is_fixed_root(0));
    }

    #[test]
    fn test_rejects_bad_signature() {
        let mut sector = fat16_boot_sector();
        sector[510] = 0;
        assert_eq!(
            FatGeometry::from_boot_sector(&sector),
            Err(FatError::InvalidBootSector("SignatureWord"))
        );
    }

    fn fat32_boot_sector() -> Sector {
        let mut sector = [0u8; SECTOR_SIZE];
        sector[11..13].copy_from_slice(&512u16.to_le_bytes());
        sector[13] = 1;
        sector[14..16].copy_from_slice(&32u16.to_le_bytes());
        sector[16] = 2;
        sector[32..36].copy_from_slice(&204_800u32.to_le_bytes());
        sector[36..40].copy_from_slice(&1576u32.to_le_bytes());
        sector[44..48].copy_from_slice(&2u32.to_le_bytes());
        sector[510..512].copy_from_slice(&SIGNATURE);
        sector
    }

    #[test]
    fn test_rejects_overflowing_layout() {
        let mut sector = fat32_boot_sector();
        sector[36..40].copy_from_slice(&u32::MAX.to_le_bytes());
        assert_eq!(
            FatGeometry::from_boot_sector(&sector),
            Err(FatError::InvalidBootSector("SectorsPerFat"))
        );

        sector[16] = 1;
        sector[36..40].copy_from_slice(&(u32::MAX - 8).to_le_bytes());
        assert_eq!(
            FatGeometry::from_boot_sector(&sector),
            Err(FatError::InvalidBootSector("SectorsPerFat"))
        );
    }

    #[test]
    fn test_rejects_table_too_small() {
        let mut sector = fat16_boot_sector();
        sector[22..24].copy_from_slice(&10u16.to_le_bytes());
        assert_eq!(
            FatGeometry::from_boot_sector(&sector),
            Err(FatError::InvalidBootSector("SectorsPerFat"))
        );
    }

    #[test]
    fn test_rejects_root_cluster_outside_data() {
        let mut sector = fat32_boot_sector();
        for root in [0u32, 1, 0x0FFF_FFF0] {
            sector[44..48].copy_from_slice(&root.to_le_bytes());
            assert_eq!(
                FatGeometry::from_boot_sector(&sector),
                Err(FatError::InvalidBootSector("RootCluster"))
            );
        }
    }

    #[test]
    fn test_rejects_other_sector_sizes() {
        let mut sector = fat16_boot_sector();
        sector[11..13].copy_from_slice(&4096u16.to_le_bytes());
        assert_eq!(
            FatGeometry::from_boot_sector(&sector),
            Err(FatError::InvalidBootSector("BytesPerSector"))
        );
    }

    #[test]
    fn test_fat_type_by_cluster_count() {
        assert_eq!(FatType::from_cluster_count(4084), FatType::Fat12);
        assert_eq!(FatType::from_cluster_count(4085), FatType::Fat16);
        assert_eq!(FatType::from_cluster_count(65524), FatType::Fat16);
        assert_eq!(FatType::from_cluster_count(65525), FatType::Fat32);
    }

    #[test]
    fn test_end_of_chain_ranges() {
        assert!(FatType::Fat12.is_end_of_chain(0xFF8));
        assert!(!FatType::Fat12.is_end_of_chain(0xFF7));
        assert!(FatType::Fat16.is_end_of_chain(0xFFF8));
        assert!(FatType::Fat16.is_end_of_chain(0xFFFF));
        assert!(!FatType::Fat16.is_end_of_chain(0xFFF7));
        assert!(FatType::Fat32.is_end_of_chain(0x0FFF_FFF8));
        // Reserved high bits are ignored
        assert!(FatType::Fat32.is_end_of_chain(0xFFFF_FFFF));
        assert!(!FatType::Fat32.is_end_of_chain(0xF000_0003));
    }
}
