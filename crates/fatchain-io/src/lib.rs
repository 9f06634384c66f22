//! fatchain IO
//!
//! Sector-granular block device access for the fatchain FAT engine.
//!
//! Storage is represented by the [`BlockDevice`] trait, which is implemented for byte slices and,
//! with the `std` feature, for vectors and [`std::fs::File`]. The errors returned by the trait are
//! [`DeviceError`], which the filesystem layer passes through unchanged.
//!
//! Two adapters are provided on top of any device:
//! - [`CountingDevice`] counts reads and writes, which is how I/O cost is measured
//! - [`OffsetDevice`] shifts every address by a fixed start sector, for volumes that live inside
//! a partitioned image

#![cfg_attr(not(feature = "std"), no_std)]

mod adapters;
mod impls;

pub use adapters::{CountingDevice, OffsetDevice};

/// Size of a single sector in bytes. Only 512 byte sectors are supported.
pub const SECTOR_SIZE: usize = 512;

/// The raw contents of one sector
pub type Sector = [u8; SECTOR_SIZE];

/// Errors that can occur when reading or writing to a block device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// The requested sector lies past the end of the device.
    #[error("sector {0} is out of bounds")]
    OutOfBounds(u32),
    /// The underlying storage reported a failure. This can happen at any time and is never
    /// retried by the filesystem layer.
    #[error("device I/O error")]
    Io,
}

/// A sector-addressed storage device.
///
/// Every call blocks until the transfer is complete. Implementations must not cache writes in a
/// way that makes a following [`BlockDevice::read_sector`] of the same address observe stale data.
///
/// # Examples
/// ```
/// use fatchain_io::{BlockDevice, DeviceError};
///
/// // This would be a real disk
/// let mut disk = [0u8; 1024];
/// let mut device = &mut disk[..];
/// let mut buffer = [0u8; 512];
///
/// device.write_sector(1, &[0xAB; 512])?;
/// device.read_sector(1, &mut buffer)?;
/// assert_eq!(buffer[0], 0xAB);
/// # Ok::<(), DeviceError>(())
/// ```
pub trait BlockDevice {
    /// Reads the sector at `address` into `buffer`.
    ///
    /// # Errors
    /// Returns an error if the address is out of bounds, or if the storage fails.
    fn read_sector(&mut self, address: u32, buffer: &mut Sector) -> Result<(), DeviceError>;

    /// Writes `buffer` to the sector at `address`.
    ///
    /// # Errors
    /// Returns an error if the address is out of bounds, or if the storage fails.
    fn write_sector(&mut self, address: u32, buffer: &Sector) -> Result<(), DeviceError>;

    /// The sector size of the device, queried once at mount
    fn sector_size(&self) -> usize {
        SECTOR_SIZE
    }
}

impl<D: BlockDevice + ?Sized> BlockDevice for &mut D {
    fn read_sector(&mut self, address: u32, buffer: &mut Sector) -> Result<(), DeviceError> {
        (**self).read_sector(address, buffer)
    }

    fn write_sector(&mut self, address: u32, buffer: &Sector) -> Result<(), DeviceError> {
        (**self).write_sector(address, buffer)
    }

    fn sector_size(&self) -> usize {
        (**self).sector_size()
    }
}
