//! A FAT12/16/32 reader for memory-constrained targets.
//!
//! fatchain walks cluster chains and resolves 8.3 names through one shared 512 byte sector
//! buffer per mounted volume. Directory scans and open files take turns using it; an open file
//! remembers where its chain walk stands and reclaims the buffer when it needs it again.
//!
//! ```no_run
//! use fatchain::FatVolume;
//!
//! # fn main() -> Result<(), fatchain::FatError> {
//! let image = std::fs::File::open("fat.img").expect("image");
//! let mut fs = FatVolume::mount(image)?;
//! fs.change_dir("DOCS")?;
//! let mut file = fs.open("readme.txt")?;
//! let mut contents = [0u8; 64];
//! let n = file.read(&mut fs, &mut contents)?;
//! # let _ = n;
//! # Ok(())
//! # }
//! ```
//!
//! ## Cargo Features
//!
//! - **std**: Enables the [`std::io`] adapter for open files, and block device implementations
//!   for files and vectors

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(target_endian = "little"))]
compile_error!("This crate only supports little endian systems");

pub mod buffer;
pub mod error;
pub mod fat;
pub mod fs;
pub mod geometry;
pub mod structures;

pub use error::{FatError, Result};
pub use fatchain_io::{BlockDevice, CountingDevice, DeviceError, OffsetDevice, SECTOR_SIZE, Sector};
pub use fs::{FatFile, FatVolume, File, FileStatus, SeekFrom};
#[cfg(feature = "std")]
pub use fs::io::FatReader;
pub use geometry::{FatGeometry, FatType, RootDirectory};
pub use structures::{
    ShortName,
    directory::{FileAttributes, FileEntryInfo},
};
