//! Implementations of [`BlockDevice`] for in-memory images and, with `std`, for files.

use crate::{BlockDevice, DeviceError, SECTOR_SIZE, Sector};

fn sector_range(address: u32, len: usize) -> Result<core::ops::Range<usize>, DeviceError> {
    let start = address as usize * SECTOR_SIZE;
    let end = start + SECTOR_SIZE;
    if end > len {
        return Err(DeviceError::OutOfBounds(address));
    }
    Ok(start..end)
}

impl BlockDevice for [u8] {
    fn read_sector(&mut self, address: u32, buffer: &mut Sector) -> Result<(), DeviceError> {
        let range = sector_range(address, self.len())?;
        buffer.copy_from_slice(&self[range]);
        Ok(())
    }

    fn write_sector(&mut self, address: u32, buffer: &Sector) -> Result<(), DeviceError> {
        let range = sector_range(address, self.len())?;
        self[range].copy_from_slice(buffer);
        Ok(())
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
        use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

        impl BlockDevice for Vec<u8> {
            fn read_sector(&mut self, address: u32, buffer: &mut Sector) -> Result<(), DeviceError> {
                self.as_mut_slice().read_sector(address, buffer)
            }

            fn write_sector(&mut self, address: u32, buffer: &Sector) -> Result<(), DeviceError> {
                self.as_mut_slice().write_sector(address, buffer)
            }
        }

        fn map_io_error(address: u32, error: std::io::Error) -> DeviceError {
            if error.kind() == ErrorKind::UnexpectedEof {
                DeviceError::OutOfBounds(address)
            } else {
                log::warn!("I/O error on sector {address}: {error}");
                DeviceError::Io
            }
        }

        impl BlockDevice for std::fs::File {
            fn read_sector(&mut self, address: u32, buffer: &mut Sector) -> Result<(), DeviceError> {
                self.seek(SeekFrom::Start(address as u64 * SECTOR_SIZE as u64))
                    .map_err(|e| map_io_error(address, e))?;
                self.read_exact(buffer).map_err(|e| map_io_error(address, e))
            }

            fn write_sector(&mut self, address: u32, buffer: &Sector) -> Result<(), DeviceError> {
                self.seek(SeekFrom::Start(address as u64 * SECTOR_SIZE as u64))
                    .map_err(|e| map_io_error(address, e))?;
                self.write_all(buffer).map_err(|e| map_io_error(address, e))
            }
        }
    }
}
