use crate::{BlockDevice, DeviceError, Sector};

/// Wraps a device and counts the sectors transferred through it.
#[derive(Debug, Default)]
pub struct CountingDevice<D> {
    inner: D,
    reads: u64,
    writes: u64,
}

impl<D> CountingDevice<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            reads: 0,
            writes: 0,
        }
    }

    /// Number of successful and failed read requests so far
    pub fn reads(&self) -> u64 {
        self.reads
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn reset(&mut self) {
        self.reads = 0;
        self.writes = 0;
    }

    pub fn get_ref(&self) -> &D {
        &self.inner
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<D: BlockDevice> BlockDevice for CountingDevice<D> {
    fn read_sector(&mut self, address: u32, buffer: &mut Sector) -> Result<(), DeviceError> {
        self.reads += 1;
        self.inner.read_sector(address, buffer)
    }

    fn write_sector(&mut self, address: u32, buffer: &Sector) -> Result<(), DeviceError> {
        self.writes += 1;
        self.inner.write_sector(address, buffer)
    }

    fn sector_size(&self) -> usize {
        self.inner.sector_size()
    }
}

/// Exposes a window of a larger device, starting at `start`, as its own address space.
///
/// This is used for a FAT volume inside a partitioned disk image, where the boot sector lives at
/// the partition's first sector instead of sector zero.
#[derive(Debug)]
pub struct OffsetDevice<D> {
    inner: D,
    start: u32,
}

impl<D> OffsetDevice<D> {
    pub fn new(inner: D, start: u32) -> Self {
        Self { inner, start }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn into_inner(self) -> D {
        self.inner
    }

    fn translate(&self, address: u32) -> Result<u32, DeviceError> {
        self.start
            .checked_add(address)
            .ok_or(DeviceError::OutOfBounds(address))
    }
}

impl<D: BlockDevice> BlockDevice for OffsetDevice<D> {
    fn read_sector(&mut self, address: u32, buffer: &mut Sector) -> Result<(), DeviceError> {
        let address = self.translate(address)?;
        self.inner.read_sector(address, buffer)
    }

    fn write_sector(&mut self, address: u32, buffer: &Sector) -> Result<(), DeviceError> {
        let address = self.translate(address)?;
        self.inner.write_sector(address, buffer)
    }

    fn sector_size(&self) -> usize {
        self.inner.sector_size()
    }
}
