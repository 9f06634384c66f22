//! [`std::io`] access to open files

use fatchain_io::BlockDevice;

use super::{FatFile, FatVolume, SeekFrom};

/// Pairs an open file with its volume so it can be used wherever [`std::io::Read`] is expected.
///
/// The volume stays borrowed for the reader's lifetime; other lookups have to wait until the file
/// is taken back with [`FatReader::into_file`].
pub struct FatReader<'a, D: BlockDevice> {
    volume: &'a mut FatVolume<D>,
    file: FatFile,
}

impl<'a, D: BlockDevice> FatReader<'a, D> {
    pub fn new(volume: &'a mut FatVolume<D>, file: FatFile) -> Self {
        Self { volume, file }
    }

    pub fn file(&self) -> &FatFile {
        &self.file
    }

    pub fn into_file(self) -> FatFile {
        self.file
    }
}

impl<D: BlockDevice> std::io::Read for FatReader<'_, D> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file
            .read(&mut *self.volume, buf)
            .map_err(std::io::Error::other)
    }
}

impl<D: BlockDevice> std::io::Seek for FatReader<'_, D> {
    /// Positions past the end are clamped to the length; positions before byte 0 are an
    /// [`std::io::ErrorKind::InvalidInput`] error and leave the position unchanged.
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        let (base, delta, pos) = match pos {
            std::io::SeekFrom::Start(offset) => {
                let offset = u32::try_from(offset).unwrap_or(u32::MAX);
                return Ok(self.file.seek(SeekFrom::Start(offset)) as u64);
            }
            std::io::SeekFrom::Current(delta) => {
                (self.file.position(), delta, SeekFrom::Current(delta))
            }
            std::io::SeekFrom::End(delta) => (self.file.length(), delta, SeekFrom::End(delta)),
        };
        if (base as i64).checked_add(delta).is_none_or(|target| target < 0) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek before the start of the file",
            ));
        }
        Ok(self.file.seek(pos) as u64)
    }
}
