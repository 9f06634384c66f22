//! The allocation table: address translation and chain lookup over the volume geometry.
//!
//! The table keeps its own one-sector cache of the FAT region. It is independent of the shared
//! content [`SectorBuffer`](crate::buffer::SectorBuffer), so chain lookups never disturb the
//! position of a directory scan or file read, and repeated lookups are stable.

use fatchain_io::{BlockDevice, SECTOR_SIZE, Sector};

use crate::{
    error::{FatError, Result},
    geometry::{FatGeometry, FatType},
    structures::raw::constants::{fat12, fat32},
};

struct FatCache {
    sector: Option<u32>,
    data: Sector,
}

pub struct AllocationTable {
    geometry: FatGeometry,
    cache: FatCache,
    lookups: u64,
}

impl core::fmt::Debug for AllocationTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AllocationTable")
            .field("fat_type", &self.geometry.fat_type)
            .field("cached_sector", &self.cache.sector)
            .field("lookups", &self.lookups)
            .finish()
    }
}

impl AllocationTable {
    pub fn new(geometry: FatGeometry) -> Self {
        Self {
            geometry,
            cache: FatCache {
                sector: None,
                data: [0; SECTOR_SIZE],
            },
            lookups: 0,
        }
    }

    pub fn geometry(&self) -> &FatGeometry {
        &self.geometry
    }

    /// See [`FatGeometry::sector_of`]
    #[inline]
    pub fn sector_of(&self, cluster: u32) -> u32 {
        self.geometry.sector_of(cluster)
    }

    #[inline]
    pub fn is_end_of_chain(&self, cluster: u32) -> bool {
        self.geometry.fat_type.is_end_of_chain(cluster)
    }

    /// Number of [`AllocationTable::next`] calls since the volume was mounted
    pub fn lookups(&self) -> u64 {
        self.lookups
    }

    /// Looks up the cluster that follows `cluster` in its chain.
    ///
    /// Returns the raw link value, which lies in the end-of-chain range when `cluster` is the last
    /// of its chain. FAT32 values have their reserved top bits masked off.
    ///
    /// # Errors
    /// [`FatError::BadCluster`] if the link is free, marked bad, or points outside the data
    /// region, and [`FatError::InvalidCluster`] if `cluster` itself is not a data cluster.
    pub fn next<D: BlockDevice + ?Sized>(&mut self, device: &mut D, cluster: u32) -> Result<u32> {
        if !self.geometry.is_data_cluster(cluster) {
            return Err(FatError::InvalidCluster(cluster));
        }
        self.lookups += 1;

        let value = match self.geometry.fat_type {
            FatType::Fat12 => {
                let offset = cluster + cluster / 2;
                let low = self.read_byte(device, offset)? as u16;
                let high = self.read_byte(device, offset + 1)? as u16;
                let pair = low | (high << 8);
                let entry = if cluster & 1 == 1 { pair >> 4 } else { pair };
                (entry & fat12::ENTRY_MASK) as u32
            }
            FatType::Fat16 => {
                let offset = cluster * 2;
                let sector = self.load(device, offset)?;
                let index = offset as usize % SECTOR_SIZE;
                u16::from_le_bytes([sector[index], sector[index + 1]]) as u32
            }
            FatType::Fat32 => {
                let offset = cluster * 4;
                let sector = self.load(device, offset)?;
                let index = offset as usize % SECTOR_SIZE;
                let mut bytes = [0u8; 4];
                bytes.copy_from_slice(&sector[index..index + 4]);
                u32::from_le_bytes(bytes) & fat32::ENTRY_MASK
            }
        };
        log::trace!("fat: {cluster} -> {value:#x}");

        if self.is_end_of_chain(value) {
            return Ok(value);
        }
        if value == self.geometry.fat_type.bad_cluster() || !self.geometry.is_data_cluster(value) {
            log::warn!("broken chain: cluster {cluster} links to {value:#x}");
            return Err(FatError::BadCluster { cluster, value });
        }
        Ok(value)
    }

    fn read_byte<D: BlockDevice + ?Sized>(&mut self, device: &mut D, offset: u32) -> Result<u8> {
        let sector = self.load(device, offset)?;
        Ok(sector[offset as usize % SECTOR_SIZE])
    }

    /// Makes sure the FAT sector holding byte `offset` of the table is cached
    fn load<D: BlockDevice + ?Sized>(&mut self, device: &mut D, offset: u32) -> Result<&Sector> {
        let address = self.geometry.fat_start + offset / SECTOR_SIZE as u32;
        if self.cache.sector != Some(address) {
            // Forget the old sector first, a failed read leaves the data incomplete
            self.cache.sector = None;
            log::trace!("fat: loading sector {address}");
            device.read_sector(address, &mut self.cache.data)?;
            self.cache.sector = Some(address);
        }
        Ok(&self.cache.data)
    }
}
