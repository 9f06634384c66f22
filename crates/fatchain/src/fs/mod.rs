//! The mounted volume: directory search, chain traversal and the single shared sector buffer.
//!
//! Everything that touches sector content goes through [`FatVolume`]. Open files are plain
//! [`FatFile`] values that borrow the volume for each operation, so a directory lookup can never
//! run in the middle of a file read. The file remembers where its chain walk stands and puts the
//! buffer back in place when it next needs it.

use fatchain_io::{BlockDevice, SECTOR_SIZE, Sector};

use crate::{
    buffer::{ChainPosition, FileId, Owner, SectorBuffer},
    error::{FatError, Result},
    fat::AllocationTable,
    geometry::{FatGeometry, RootDirectory},
    structures::{
        ShortName,
        directory::{self, DirectoryEntry, FileEntryInfo},
        raw::constants::directory::ENTRY_SIZE,
    },
};

pub mod file;
#[cfg(feature = "std")]
pub mod io;

pub use file::{FatFile, File, FileStatus, SeekFrom};

/// How [`FatVolume::load_next_sector`] reached the next sector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Advance {
    WithinCluster,
    NewCluster,
}

enum Scan {
    Found(usize),
    EndOfEntries,
    Exhausted,
}

pub struct FatVolume<D: BlockDevice> {
    device: D,
    table: AllocationTable,
    buffer: SectorBuffer,
    /// First cluster of the current directory
    dir_cluster: u32,
    next_file_id: u32,
}

impl<D: BlockDevice> core::fmt::Debug for FatVolume<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FatVolume")
            .field("table", &self.table)
            .field("buffer", &self.buffer)
            .field("dir_cluster", &self.dir_cluster)
            .finish_non_exhaustive()
    }
}

impl<D: BlockDevice> FatVolume<D> {
    /// Reads the boot sector and mounts the volume, with the root as the current directory.
    pub fn mount(mut device: D) -> Result<Self> {
        if device.sector_size() != SECTOR_SIZE {
            return Err(FatError::InvalidBootSector("BytesPerSector"));
        }
        let mut boot_sector: Sector = [0; SECTOR_SIZE];
        device.read_sector(0, &mut boot_sector)?;
        let geometry = FatGeometry::from_boot_sector(&boot_sector)?;
        log::debug!(
            "mounted {} volume, {} clusters of {} bytes",
            geometry.fat_type,
            geometry.cluster_count,
            geometry.bytes_per_cluster()
        );
        Ok(Self::with_geometry(device, geometry))
    }

    /// Mounts a volume whose geometry is already known
    pub fn with_geometry(device: D, geometry: FatGeometry) -> Self {
        Self {
            device,
            dir_cluster: geometry.root_cluster(),
            table: AllocationTable::new(geometry),
            buffer: SectorBuffer::new(),
            next_file_id: 0,
        }
    }

    pub fn geometry(&self) -> &FatGeometry {
        self.table.geometry()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn buffer(&self) -> &SectorBuffer {
        &self.buffer
    }

    /// Number of allocation table lookups performed since mount
    pub fn lookups(&self) -> u64 {
        self.table.lookups()
    }

    /// First cluster of the current directory
    pub fn current_dir(&self) -> u32 {
        self.dir_cluster
    }

    /// Writes back any pending change in the shared buffer
    pub fn sync(&mut self) -> Result<()> {
        self.buffer.flush(&mut self.device)
    }

    /// Flushes and hands the device back
    pub fn unmount(mut self) -> Result<D> {
        self.sync()?;
        Ok(self.device)
    }

    /// Searches the current directory for `name` and returns the byte offset of its entry within
    /// the sector the buffer now holds.
    ///
    /// The name is compared case-insensitively against the decoded 8.3 name, so `"readme.txt"`
    /// finds `README  TXT`.
    ///
    /// # Errors
    /// [`FatError::NotFound`] when the end-of-entries marker or the end of the directory chain is
    /// reached without a match.
    pub fn find(&mut self, name: &str) -> Result<u16> {
        let target = ShortName::canonical(name).ok_or(FatError::NotFound)?;
        self.buffer.flush(&mut self.device)?;

        let mut position = match self.buffer.position() {
            Some(position) if self.buffer_holds_directory_start() => position,
            _ => self.reload_directory_start()?,
        };

        loop {
            match scan_for(self.buffer.data(), &target) {
                Scan::Found(offset) => {
                    log::trace!("found {target} at sector {}, offset {offset}", position.sector());
                    return Ok(offset as u16);
                }
                Scan::EndOfEntries => return Err(FatError::NotFound),
                Scan::Exhausted => {}
            }
            match self.load_next_sector(Owner::Directory, &mut position) {
                Ok(_) => {}
                Err(FatError::EndOfChain) => return Err(FatError::NotFound),
                Err(error) => return Err(error),
            }
        }
    }

    pub fn exists(&mut self, name: &str) -> Result<bool> {
        match self.find(name) {
            Ok(_) => Ok(true),
            Err(FatError::NotFound) => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// Looks up `name` in the current directory and decodes its entry
    pub fn entry_info(&mut self, name: &str) -> Result<FileEntryInfo> {
        let offset = self.find(name)?;
        Ok(self.entry_at(offset)?.info(self.geometry().fat_type))
    }

    /// Opens the file `name` in the current directory
    pub fn open(&mut self, name: &str) -> Result<FatFile> {
        let offset = self.find(name)?;
        self.open_existing(offset)
    }

    /// Opens the file whose entry sits at `entry_offset` of the directory sector in the buffer,
    /// as returned by [`FatVolume::find`].
    ///
    /// # Errors
    /// [`FatError::EntryNotFile`] if the entry is a directory.
    pub fn open_existing(&mut self, entry_offset: u16) -> Result<FatFile> {
        let entry = self.entry_at(entry_offset)?;
        if entry.is_directory() {
            return Err(FatError::EntryNotFile);
        }
        let dir_sector = self.buffer.loaded().ok_or(FatError::NotFound)?;

        let id = FileId(self.next_file_id);
        self.next_file_id = self.next_file_id.wrapping_add(1);
        let file = FatFile::new(self, id, &entry, dir_sector, entry_offset)?;
        log::debug!("opened {} ({} bytes) as {id:?}", file.name(), file.length());
        Ok(file)
    }

    /// Makes the subdirectory `name` the current directory. `".."` entries pointing at cluster
    /// zero lead back to the root.
    ///
    /// # Errors
    /// [`FatError::EntryNotDirectory`] if `name` is a file.
    pub fn change_dir(&mut self, name: &str) -> Result<()> {
        let offset = self.find(name)?;
        let entry = self.entry_at(offset)?;
        if !entry.is_directory() {
            return Err(FatError::EntryNotDirectory);
        }

        let geometry = *self.geometry();
        let cluster = match entry.first_cluster(geometry.fat_type) {
            0 => geometry.root_cluster(),
            cluster => cluster,
        };
        if !geometry.is_fixed_root(cluster) && !geometry.is_data_cluster(cluster) {
            return Err(FatError::InvalidCluster(cluster));
        }
        log::debug!("changed directory to {name} (cluster {cluster})");
        self.dir_cluster = cluster;
        Ok(())
    }

    /// Makes the root the current directory
    pub fn root_dir(&mut self) {
        self.dir_cluster = self.geometry().root_cluster();
    }

    /// Calls `f` for every live entry of the current directory, in on-disk order.
    ///
    /// Deleted entries and long file name slots are skipped. The walk stops at the
    /// end-of-entries marker or the end of the directory chain.
    pub fn read_dir<F: FnMut(FileEntryInfo)>(&mut self, mut f: F) -> Result<()> {
        self.buffer.flush(&mut self.device)?;
        let fat_type = self.geometry().fat_type;
        let mut position = match self.buffer.position() {
            Some(position) if self.buffer_holds_directory_start() => position,
            _ => self.reload_directory_start()?,
        };

        loop {
            for raw in directory::records(self.buffer.data()) {
                let entry = DirectoryEntry::from_bytes(raw);
                if entry.is_end_of_entries() {
                    return Ok(());
                }
                if entry.is_deleted() || entry.is_long_name() {
                    continue;
                }
                f(entry.info(fat_type));
            }
            match self.load_next_sector(Owner::Directory, &mut position) {
                Ok(_) => {}
                Err(FatError::EndOfChain) => return Ok(()),
                Err(error) => return Err(error),
            }
        }
    }

    fn entry_at(&self, offset: u16) -> Result<DirectoryEntry> {
        if self.buffer.owner() != Owner::Directory || offset as usize % ENTRY_SIZE != 0 {
            return Err(FatError::NotFound);
        }
        DirectoryEntry::at(self.buffer.data(), offset as usize).ok_or(FatError::NotFound)
    }

    /// Whether the buffer holds the first sector of the current directory for a directory scan.
    ///
    /// The sector offset alone says nothing, every cluster has a sector zero, so the cached
    /// cluster start is compared against the expected one too.
    fn buffer_holds_directory_start(&self) -> bool {
        let expected = self.table.sector_of(self.dir_cluster);
        match self.buffer.position() {
            Some(position) => {
                self.buffer.holds(Owner::Directory, expected)
                    && position.sector_offset == 0
                    && position.cluster_start == expected
            }
            None => false,
        }
    }

    fn reload_directory_start(&mut self) -> Result<ChainPosition> {
        let position = self.chain_start(self.dir_cluster)?;
        self.load_position(Owner::Directory, &position)?;
        Ok(position)
    }

    /// The position at sector zero of `cluster`, with its successor looked up
    pub(crate) fn chain_start(&mut self, cluster: u32) -> Result<ChainPosition> {
        let next_cluster = if self.geometry().is_fixed_root(cluster) {
            0
        } else {
            self.table.next(&mut self.device, cluster)?
        };
        Ok(ChainPosition {
            cluster,
            next_cluster,
            cluster_start: self.table.sector_of(cluster),
            sector_offset: 0,
        })
    }

    /// Loads the sector `position` points at on behalf of `owner`. Free when it is already there.
    pub(crate) fn load_position(&mut self, owner: Owner, position: &ChainPosition) -> Result<()> {
        self.buffer.position = None;
        self.buffer
            .acquire(&mut self.device, owner, position.sector())?;
        self.buffer.position = Some(*position);
        Ok(())
    }

    /// Takes a directory sector into the buffer outside of any scan, for entry updates
    pub(crate) fn load_directory_sector(&mut self, sector: u32) -> Result<()> {
        self.buffer.position = None;
        self.buffer.acquire(&mut self.device, Owner::Directory, sector)
    }

    /// Moves `position` to the next sector of its chain and loads it.
    ///
    /// The end of the chain is detected when leaving the last cluster, not up front from the
    /// prefetched successor, so every sector of the last cluster is still reached.
    ///
    /// # Errors
    /// [`FatError::EndOfChain`] when the last sector of the chain, or of the fixed root
    /// directory, has already been reached.
    pub(crate) fn load_next_sector(
        &mut self,
        owner: Owner,
        position: &mut ChainPosition,
    ) -> Result<Advance> {
        if self.table.is_end_of_chain(position.cluster) {
            return Err(FatError::EndOfChain);
        }

        // The fixed root is one run of sectors, treated as a single cluster
        let sectors = match self.geometry().root {
            RootDirectory::Fixed { sectors, .. } if self.geometry().is_fixed_root(position.cluster) => {
                if position.sector_offset + 1 >= sectors {
                    return Err(FatError::EndOfChain);
                }
                sectors
            }
            _ => self.geometry().sectors_per_cluster as u32,
        };

        if position.sector_offset + 1 < sectors {
            position.sector_offset += 1;
            self.load_position(owner, position)?;
            return Ok(Advance::WithinCluster);
        }
        if self.table.is_end_of_chain(position.next_cluster) {
            return Err(FatError::EndOfChain);
        }
        self.inc_cluster(owner, position)?;
        Ok(Advance::NewCluster)
    }

    /// Moves `position` to the first sector of the next cluster in its chain and loads it.
    ///
    /// When the current cluster is the last one, `position` is moved onto the end-of-chain
    /// marker and [`FatError::EndOfChain`] is returned. Advancing from there again fails with
    /// [`FatError::ReadingPastEndOfChain`] before any I/O.
    pub(crate) fn inc_cluster(&mut self, owner: Owner, position: &mut ChainPosition) -> Result<()> {
        if self.table.is_end_of_chain(position.cluster) {
            return Err(FatError::ReadingPastEndOfChain);
        }
        if self.geometry().is_fixed_root(position.cluster) {
            return Err(FatError::EndOfChain);
        }
        if self.table.is_end_of_chain(position.next_cluster) {
            position.cluster = position.next_cluster;
            position.sector_offset = 0;
            return Err(FatError::EndOfChain);
        }

        self.hop(position)?;
        position.sector_offset = 0;
        self.load_position(owner, position)
    }

    /// Steps `position` onto the next cluster without loading anything, looking up the
    /// successor of the new cluster.
    pub(crate) fn hop(&mut self, position: &mut ChainPosition) -> Result<()> {
        if self.table.is_end_of_chain(position.next_cluster) {
            return Err(FatError::EndOfChain);
        }
        let cluster = position.next_cluster;
        let next_cluster = self.table.next(&mut self.device, cluster)?;
        *position = ChainPosition {
            cluster,
            next_cluster,
            cluster_start: self.table.sector_of(cluster),
            sector_offset: position.sector_offset,
        };
        Ok(())
    }

    pub(crate) fn is_end_of_chain(&self, cluster: u32) -> bool {
        self.table.is_end_of_chain(cluster)
    }

    pub(crate) fn buffer_data(&self) -> &Sector {
        self.buffer.data()
    }

    pub(crate) fn buffer_data_mut(&mut self) -> &mut Sector {
        self.buffer.data_mut()
    }
}

fn scan_for(sector: &Sector, target: &ShortName) -> Scan {
    for (index, raw) in directory::records(sector).iter().enumerate() {
        if directory::is_end_of_entries(raw) {
            return Scan::EndOfEntries;
        }
        if directory::is_deleted(raw) {
            continue;
        }
        if DirectoryEntry::from_bytes(raw).is_long_name() {
            continue;
        }
        if directory::decode_name(raw) == *target {
            return Scan::Found(index * ENTRY_SIZE);
        }
    }
    Scan::Exhausted
}
