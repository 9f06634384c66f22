use core::fmt;

use fatchain_io::{BlockDevice, SECTOR_SIZE};

use super::{Advance, FatVolume};
use crate::{
    buffer::{ChainPosition, FileId, Owner},
    error::{FatError, Result},
    structures::{
        ShortName,
        directory::{DirectoryEntry, FileAttributes, write_attributes},
        raw::constants::FIRST_DATA_CLUSTER,
    },
};

/// Byte positions for [`File::seek`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFrom {
    Start(u32),
    Current(i64),
    End(i64),
}

/// What a readable file offers, independent of the filesystem holding it.
///
/// Every operation borrows the volume `V` the file lives on; the file itself holds no reference
/// to it.
pub trait File<V: ?Sized> {
    fn name(&self) -> &ShortName;

    /// Length in bytes
    fn length(&self) -> u32;

    /// Reads up to `buf.len()` bytes from the current position, returning how many were read.
    /// Zero means end of file.
    fn read(&mut self, volume: &mut V, buf: &mut [u8]) -> Result<usize>;

    /// Moves the byte position, clamped to the file, and returns the new position
    fn seek(&mut self, volume: &mut V, pos: SeekFrom) -> Result<u32>;
}

/// An open file on a FAT volume.
///
/// The handle never owns the shared sector buffer. It records its own chain position, and every
/// operation first puts the buffer back on that position if something else used it meanwhile.
/// That costs at most one sector read and no allocation table lookups.
#[derive(Debug, Clone)]
pub struct FatFile {
    name: ShortName,
    id: FileId,
    attributes: FileAttributes,
    first_cluster: u32,
    length: u32,
    /// Sector and byte offset of this file's directory entry
    dir_sector: u32,
    entry_offset: u16,
    /// Where the chain walk stands; `cluster` is an end-of-chain value for an empty file or
    /// after walking off the end
    chain: ChainPosition,
    /// Cluster index from the start of the file
    cluster_index: u32,
    /// Sector index from the start of the file
    sector_index: u32,
    /// Byte position for [`FatFile::read`]
    position: u32,
}

impl FatFile {
    pub(crate) fn new<D: BlockDevice>(
        fs: &mut FatVolume<D>,
        id: FileId,
        entry: &DirectoryEntry,
        dir_sector: u32,
        entry_offset: u16,
    ) -> Result<Self> {
        let first_cluster = entry.first_cluster(fs.geometry().fat_type);
        if first_cluster >= FIRST_DATA_CLUSTER && !fs.geometry().is_data_cluster(first_cluster) {
            return Err(FatError::InvalidCluster(first_cluster));
        }

        let mut file = Self {
            name: entry.name(),
            id,
            attributes: entry.attributes(),
            first_cluster,
            length: entry.size(),
            dir_sector,
            entry_offset,
            chain: empty_chain(fs),
            cluster_index: 0,
            sector_index: 0,
            position: 0,
        };
        file.chain = file.chain_start(fs)?;
        file.reclaim(fs)?;
        Ok(file)
    }

    fn owner(&self) -> Owner {
        Owner::File(self.id)
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn name(&self) -> &ShortName {
        &self.name
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn attributes(&self) -> FileAttributes {
        self.attributes
    }

    pub fn first_cluster(&self) -> u32 {
        self.first_cluster
    }

    /// The cluster the chain walk is on
    pub fn current_cluster(&self) -> u32 {
        self.chain.cluster
    }

    /// Cluster index of the chain walk, counted from the start of the file
    pub fn cluster_index(&self) -> u32 {
        self.cluster_index
    }

    /// Sector index of the chain walk, counted from the start of the file
    pub fn sector_index(&self) -> u32 {
        self.sector_index
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn eof(&self) -> bool {
        self.position >= self.length
    }

    fn chain_start<D: BlockDevice>(&self, fs: &mut FatVolume<D>) -> Result<ChainPosition> {
        if self.first_cluster < FIRST_DATA_CLUSTER {
            return Ok(empty_chain(fs));
        }
        fs.chain_start(self.first_cluster)
    }

    /// Puts the shared buffer back on this file's sector. Nothing to do once the walk is past
    /// the end of the chain.
    fn reclaim<D: BlockDevice>(&self, fs: &mut FatVolume<D>) -> Result<()> {
        if fs.is_end_of_chain(self.chain.cluster) {
            return Ok(());
        }
        fs.load_position(self.owner(), &self.chain)
    }

    /// The content of the current sector
    pub fn sector<'a, D: BlockDevice>(&self, fs: &'a mut FatVolume<D>) -> Result<&'a [u8]> {
        if fs.is_end_of_chain(self.chain.cluster) {
            return Err(FatError::EndOfChain);
        }
        self.reclaim(fs)?;
        Ok(&fs.buffer_data()[..])
    }

    /// Advances the chain walk by one sector and loads it.
    ///
    /// # Errors
    /// [`FatError::EndOfChain`] at the last sector of the file's chain.
    pub fn next_sector<D: BlockDevice>(&mut self, fs: &mut FatVolume<D>) -> Result<()> {
        let mut chain = self.chain;
        let advance = fs.load_next_sector(self.owner(), &mut chain)?;
        self.chain = chain;
        self.sector_index += 1;
        if advance == Advance::NewCluster {
            self.cluster_index += 1;
        }
        Ok(())
    }

    /// Advances the chain walk to the first sector of the next cluster and loads it.
    ///
    /// At the last cluster the walk moves past the end and [`FatError::EndOfChain`] is returned.
    /// Calling it again from there is a sequencing error and fails with
    /// [`FatError::ReadingPastEndOfChain`] without touching the device.
    pub fn inc_cluster<D: BlockDevice>(&mut self, fs: &mut FatVolume<D>) -> Result<()> {
        let mut chain = self.chain;
        let result = fs.inc_cluster(self.owner(), &mut chain);
        if matches!(result, Ok(()) | Err(FatError::EndOfChain)) {
            self.chain = chain;
            self.cluster_index += 1;
            self.sector_index = self.cluster_index * fs.geometry().sectors_per_cluster as u32;
        }
        result
    }

    /// Loads sector `target` of the file, counted from its start.
    ///
    /// A target in the current cluster or ahead of it walks forward from the current cluster,
    /// one lookup per cluster crossed. A target in an earlier cluster restarts from the first
    /// cluster, since the chain has no backward links, and costs one lookup per cluster up to
    /// the target. Seeking to the sector already loaded costs nothing.
    ///
    /// # Errors
    /// [`FatError::EndOfChain`] if the chain ends before the target. The walk position is left
    /// unchanged in that case.
    pub fn seek_sector<D: BlockDevice>(&mut self, fs: &mut FatVolume<D>, target: u32) -> Result<()> {
        let sectors_per_cluster = fs.geometry().sectors_per_cluster as u32;
        let target_cluster = target / sectors_per_cluster;

        let mut chain = self.chain;
        let mut index = self.cluster_index;
        if target_cluster < index {
            log::trace!("{}: restarting chain walk for sector {target}", self.name);
            chain = self.chain_start(fs)?;
            index = 0;
        }
        while index < target_cluster {
            fs.hop(&mut chain)?;
            index += 1;
        }
        if fs.is_end_of_chain(chain.cluster) {
            return Err(FatError::EndOfChain);
        }

        chain.sector_offset = target % sectors_per_cluster;
        fs.load_position(self.owner(), &chain)?;
        self.chain = chain;
        self.cluster_index = index;
        self.sector_index = target;
        Ok(())
    }

    /// Reads up to `buf.len()` bytes from the byte position, stopping at the file length.
    ///
    /// A failure after some bytes were copied ends the read early with the short count; the
    /// position stays on the sector that failed, so the next call reports the error.
    pub fn read<D: BlockDevice>(&mut self, fs: &mut FatVolume<D>, buf: &mut [u8]) -> Result<usize> {
        let mut total = 0;
        while total < buf.len() && self.position < self.length {
            let sector = self.position / SECTOR_SIZE as u32;
            let loaded = if sector == self.sector_index + 1 {
                self.next_sector(fs)
            } else {
                self.seek_sector(fs, sector)
            };
            match loaded {
                Ok(()) => {}
                Err(error) if total == 0 => return Err(error),
                Err(error) => {
                    log::debug!("{}: short read of {total} bytes, {error}", self.name);
                    break;
                }
            }

            let offset = self.position as usize % SECTOR_SIZE;
            let remaining = (self.length - self.position) as usize;
            let count = (SECTOR_SIZE - offset)
                .min(buf.len() - total)
                .min(remaining);
            buf[total..total + count].copy_from_slice(&fs.buffer_data()[offset..offset + count]);
            total += count;
            self.position += count as u32;
        }
        Ok(total)
    }

    /// Moves the byte position. Nothing is loaded until the next read.
    pub fn seek(&mut self, pos: SeekFrom) -> u32 {
        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(delta) => (self.position as i64).saturating_add(delta),
            SeekFrom::End(delta) => (self.length as i64).saturating_add(delta),
        };
        self.position = target.clamp(0, self.length as i64) as u32;
        self.position
    }

    /// Rewrites the attribute byte of this file's directory entry.
    ///
    /// The entry's sector is taken into the shared buffer for the directory and left dirty, it
    /// is written back at the next change of buffer owner or [`FatVolume::sync`].
    pub fn set_attributes<D: BlockDevice>(
        &mut self,
        fs: &mut FatVolume<D>,
        attributes: FileAttributes,
    ) -> Result<()> {
        let attributes = attributes - FileAttributes::DIRECTORY - FileAttributes::VOLUME_ID;
        fs.load_directory_sector(self.dir_sector)?;
        write_attributes(fs.buffer_data_mut(), self.entry_offset as usize, attributes);
        self.attributes = attributes;
        log::debug!("{}: attributes set to {attributes}", self.name);
        Ok(())
    }

    /// A snapshot of the handle's state
    pub fn status(&self) -> FileStatus {
        FileStatus {
            name: self.name,
            attributes: self.attributes,
            length: self.length,
            position: self.position,
            first_cluster: self.first_cluster,
            cluster: self.chain.cluster,
            next_cluster: self.chain.next_cluster,
            cluster_index: self.cluster_index,
            sector_index: self.sector_index,
            dir_sector: self.dir_sector,
            entry_offset: self.entry_offset,
        }
    }
}

impl<D: BlockDevice> File<FatVolume<D>> for FatFile {
    fn name(&self) -> &ShortName {
        &self.name
    }

    fn length(&self) -> u32 {
        self.length
    }

    fn read(&mut self, volume: &mut FatVolume<D>, buf: &mut [u8]) -> Result<usize> {
        FatFile::read(self, volume, buf)
    }

    fn seek(&mut self, _volume: &mut FatVolume<D>, pos: SeekFrom) -> Result<u32> {
        Ok(FatFile::seek(self, pos))
    }
}

fn empty_chain<D: BlockDevice>(fs: &FatVolume<D>) -> ChainPosition {
    let end = fs.geometry().fat_type.end_of_chain();
    ChainPosition {
        cluster: end,
        next_cluster: end,
        cluster_start: 0,
        sector_offset: 0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStatus {
    pub name: ShortName,
    pub attributes: FileAttributes,
    pub length: u32,
    pub position: u32,
    pub first_cluster: u32,
    pub cluster: u32,
    pub next_cluster: u32,
    pub cluster_index: u32,
    pub sector_index: u32,
    pub dir_sector: u32,
    pub entry_offset: u16,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name:            {}", self.name)?;
        writeln!(f, "Attributes:      {}", self.attributes)?;
        writeln!(f, "Length:          {} bytes", self.length)?;
        writeln!(f, "Position:        {}", self.position)?;
        writeln!(f, "First cluster:   {:#x}", self.first_cluster)?;
        writeln!(f, "Cluster:         {:#x} (index {})", self.cluster, self.cluster_index)?;
        writeln!(f, "Next cluster:    {:#x}", self.next_cluster)?;
        writeln!(f, "Sector:          {}", self.sector_index)?;
        write!(
            f,
            "Entry:           sector {}, offset {}",
            self.dir_sector, self.entry_offset
        )
    }
}
