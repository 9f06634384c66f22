//! The single shared sector buffer and its ownership discipline.
//!
//! One [`SectorBuffer`] exists per mounted volume. Directory scans and every open file take turns
//! using it, and each use names its [`Owner`]. A change of owner or sector writes dirty content
//! back before anything else is loaded.

use fatchain_io::{BlockDevice, SECTOR_SIZE, Sector};

use crate::error::Result;

/// Identifies one open file for the lifetime of the mount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(pub(crate) u32);

/// Who the buffer content currently belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Owner {
    #[default]
    None,
    /// A directory scan or directory entry update
    Directory,
    File(FileId),
}

/// Where a chain walk stands: the current cluster, its prefetched successor, and the sector
/// within the cluster.
///
/// For the fixed FAT12/16 root directory `cluster` is
/// [`ROOT_CLUSTER_ALIAS`](crate::geometry::ROOT_CLUSTER_ALIAS) and `next_cluster` is unused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainPosition {
    pub cluster: u32,
    pub next_cluster: u32,
    /// Address of the first sector of `cluster`
    pub cluster_start: u32,
    pub sector_offset: u32,
}

impl ChainPosition {
    /// Address of the sector this position points at
    pub fn sector(&self) -> u32 {
        self.cluster_start + self.sector_offset
    }
}

pub struct SectorBuffer {
    data: Sector,
    owner: Owner,
    dirty: bool,
    /// The sector `data` holds, `None` when nothing was loaded or the last load failed
    loaded: Option<u32>,
    pub(crate) position: Option<ChainPosition>,
}

impl core::fmt::Debug for SectorBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SectorBuffer")
            .field("owner", &self.owner)
            .field("dirty", &self.dirty)
            .field("loaded", &self.loaded)
            .field("position", &self.position)
            .finish()
    }
}

impl Default for SectorBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SectorBuffer {
    pub fn new() -> Self {
        Self {
            data: [0; SECTOR_SIZE],
            owner: Owner::None,
            dirty: false,
            loaded: None,
            position: None,
        }
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    pub fn loaded(&self) -> Option<u32> {
        self.loaded
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn position(&self) -> Option<ChainPosition> {
        self.position
    }

    /// Whether the buffer holds `sector` on behalf of `owner`
    pub fn holds(&self, owner: Owner, sector: u32) -> bool {
        self.owner == owner && self.loaded == Some(sector)
    }

    /// Makes the buffer hold `sector` on behalf of `owner`.
    ///
    /// No I/O happens if it already does. Otherwise dirty content is written back first, then
    /// the sector is read. If the read fails the buffer is left holding nothing, so a later
    /// flush never writes back a partial sector.
    pub fn acquire<D: BlockDevice + ?Sized>(
        &mut self,
        device: &mut D,
        owner: Owner,
        sector: u32,
    ) -> Result<()> {
        if self.holds(owner, sector) {
            return Ok(());
        }
        self.flush(device)?;

        self.owner = owner;
        self.loaded = None;
        log::trace!("buffer: loading sector {sector} for {owner:?}");
        device.read_sector(sector, &mut self.data)?;
        self.loaded = Some(sector);
        Ok(())
    }

    /// Writes the content back if it is dirty. Calling it again without a modification in
    /// between does nothing.
    pub fn flush<D: BlockDevice + ?Sized>(&mut self, device: &mut D) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(sector) = self.loaded {
            log::trace!("buffer: writing back sector {sector}");
            device.write_sector(sector, &self.data)?;
        }
        self.dirty = false;
        Ok(())
    }

    pub fn data(&self) -> &Sector {
        &self.data
    }

    /// Mutable access to the content, which marks it dirty
    pub fn data_mut(&mut self) -> &mut Sector {
        self.dirty = true;
        &mut self.data
    }
}
