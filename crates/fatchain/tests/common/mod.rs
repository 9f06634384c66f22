#![allow(dead_code)]

use fatchain::{FatGeometry, FatType, RootDirectory, SECTOR_SIZE};

pub const ARCHIVE: u8 = 0x20;
pub const DIRECTORY: u8 = 0x10;

/// An in-memory FAT image assembled sector by sector
pub struct Image {
    pub disk: Vec<u8>,
    pub geometry: FatGeometry,
}

impl Image {
    pub fn new(geometry: FatGeometry) -> Self {
        let sectors =
            geometry.data_start + geometry.cluster_count * geometry.sectors_per_cluster as u32;
        Self {
            disk: vec![0; sectors as usize * SECTOR_SIZE],
            geometry,
        }
    }

    /// FAT16 with one FAT sector, a one sector fixed root and 8 sector clusters
    pub fn fat16() -> Self {
        Self::new(FatGeometry {
            fat_type: FatType::Fat16,
            sectors_per_cluster: 8,
            fat_start: 1,
            sectors_per_fat: 1,
            fat_count: 1,
            root: RootDirectory::Fixed {
                start: 2,
                sectors: 1,
            },
            data_start: 3,
            cluster_count: 12,
        })
    }

    /// FAT32 with single sector clusters and the root directory at cluster 2
    pub fn fat32() -> Self {
        Self::new(FatGeometry {
            fat_type: FatType::Fat32,
            sectors_per_cluster: 1,
            fat_start: 1,
            sectors_per_fat: 1,
            fat_count: 1,
            root: RootDirectory::Cluster(2),
            data_start: 2,
            cluster_count: 16,
        })
    }

    /// A 1.44 MB floppy with a real boot sector, so it has to be mounted
    pub fn fat12_floppy() -> Self {
        let mut image = Self {
            disk: vec![0; 2880 * SECTOR_SIZE],
            geometry: FatGeometry {
                fat_type: FatType::Fat12,
                sectors_per_cluster: 1,
                fat_start: 1,
                sectors_per_fat: 9,
                fat_count: 2,
                root: RootDirectory::Fixed {
                    start: 19,
                    sectors: 14,
                },
                data_start: 33,
                cluster_count: 2847,
            },
        };
        let boot = &mut image.disk[..SECTOR_SIZE];
        boot[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
        boot[3..11].copy_from_slice(b"MSWIN4.1");
        boot[11..13].copy_from_slice(&512u16.to_le_bytes());
        boot[13] = 1;
        boot[14..16].copy_from_slice(&1u16.to_le_bytes());
        boot[16] = 2;
        boot[17..19].copy_from_slice(&224u16.to_le_bytes());
        boot[19..21].copy_from_slice(&2880u16.to_le_bytes());
        boot[21] = 0xF0;
        boot[22..24].copy_from_slice(&9u16.to_le_bytes());
        boot[38] = 0x29;
        boot[43..54].copy_from_slice(b"NO NAME    ");
        boot[54..62].copy_from_slice(b"FAT12   ");
        boot[510..512].copy_from_slice(&[0x55, 0xAA]);
        image
    }

    pub fn sector_mut(&mut self, sector: u32) -> &mut [u8] {
        let start = sector as usize * SECTOR_SIZE;
        &mut self.disk[start..start + SECTOR_SIZE]
    }

    pub fn cluster_sector(&self, cluster: u32) -> u32 {
        self.geometry.sector_of(cluster)
    }

    /// Writes a link into every FAT copy
    pub fn set_link(&mut self, cluster: u32, value: u32) {
        let fat_bytes = self.geometry.sectors_per_fat as usize * SECTOR_SIZE;
        for copy in 0..self.geometry.fat_count as usize {
            let base = self.geometry.fat_start as usize * SECTOR_SIZE + copy * fat_bytes;
            let fat = &mut self.disk[base..base + fat_bytes];
            match self.geometry.fat_type {
                FatType::Fat12 => {
                    let offset = (cluster + cluster / 2) as usize;
                    let value = value as u16 & 0x0FFF;
                    let pair = u16::from_le_bytes([fat[offset], fat[offset + 1]]);
                    let pair = if cluster & 1 == 1 {
                        (pair & 0x000F) | (value << 4)
                    } else {
                        (pair & 0xF000) | value
                    };
                    fat[offset..offset + 2].copy_from_slice(&pair.to_le_bytes());
                }
                FatType::Fat16 => {
                    let offset = cluster as usize * 2;
                    fat[offset..offset + 2].copy_from_slice(&(value as u16).to_le_bytes());
                }
                FatType::Fat32 => {
                    let offset = cluster as usize * 4;
                    fat[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
                }
            }
        }
    }

    /// Links `clusters` in order and terminates the chain
    pub fn chain(&mut self, clusters: &[u32]) {
        for pair in clusters.windows(2) {
            self.set_link(pair[0], pair[1]);
        }
        if let Some(last) = clusters.last() {
            let end = self.geometry.fat_type.end_of_chain();
            self.set_link(*last, end);
        }
    }

    /// Fills every sector of a chain so that the first four bytes hold its index from the start
    /// of the chain and the rest repeat its low byte
    pub fn fill_sectors(&mut self, clusters: &[u32]) {
        let per_cluster = self.geometry.sectors_per_cluster as u32;
        let mut index = 0u32;
        for cluster in clusters {
            let start = self.cluster_sector(*cluster);
            for sector in start..start + per_cluster {
                let data = self.sector_mut(sector);
                data.fill(index as u8);
                data[..4].copy_from_slice(&index.to_le_bytes());
                index += 1;
            }
        }
    }

    /// Writes a directory record into slot `slot` of directory sector `sector`
    pub fn put_entry(
        &mut self,
        sector: u32,
        slot: usize,
        name: &[u8; 11],
        attributes: u8,
        cluster: u32,
        size: u32,
    ) {
        let record = &mut self.sector_mut(sector)[slot * 32..slot * 32 + 32];
        record.fill(0);
        record[0..11].copy_from_slice(name);
        record[11] = attributes;
        record[0x14..0x16].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
        record[0x1A..0x1C].copy_from_slice(&(cluster as u16).to_le_bytes());
        record[0x1C..0x20].copy_from_slice(&size.to_le_bytes());
    }

    /// First sector of the root directory
    pub fn root_sector(&self) -> u32 {
        self.geometry.sector_of(self.geometry.root_cluster())
    }
}

/// The sector index stamped by [`Image::fill_sectors`]
pub fn stamp(sector: &[u8]) -> u32 {
    u32::from_le_bytes([sector[0], sector[1], sector[2], sector[3]])
}
