use core::fmt;

use fatchain_io::{SECTOR_SIZE, Sector};

use super::{
    ShortName,
    raw::{constants::directory as consts, directory::RawFileEntry},
};
use crate::geometry::FatType;

bitflags::bitflags! {
    /// File Attributes
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FileAttributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN = 0x02;
        const SYSTEM = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE = 0x20;
    }
}

/// Display characters for each attribute, as (flag, set, unset), in display order
const ATTRIBUTE_CHARS: [(FileAttributes, char, char); 6] = [
    (FileAttributes::READ_ONLY, 'r', 'w'),
    (FileAttributes::HIDDEN, 'h', '.'),
    (FileAttributes::SYSTEM, 's', '.'),
    (FileAttributes::VOLUME_ID, 'v', '.'),
    (FileAttributes::DIRECTORY, 'd', 'f'),
    (FileAttributes::ARCHIVE, 'a', '.'),
];

impl FileAttributes {
    /// One character per attribute, the set character if the flag is present and the unset
    /// character otherwise
    pub fn to_chars(self) -> [char; 6] {
        ATTRIBUTE_CHARS.map(|(flag, set, unset)| if self.contains(flag) { set } else { unset })
    }
}

impl fmt::Display for FileAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.to_chars() {
            fmt::Write::write_char(f, c)?;
        }
        Ok(())
    }
}

/// Decodes the 8.3 name of a raw directory record.
///
/// Trailing padding spaces are dropped from both parts. A leading 0x05 is restored to 0xE5, and
/// the extension (with its dot) is only appended if its first byte is not a space.
pub fn decode_name(raw: &[u8; consts::ENTRY_SIZE]) -> ShortName {
    let mut name = ShortName::default();

    let base = trim_padding(&raw[0..8]);
    for (i, byte) in base.iter().enumerate() {
        if i == 0 && *byte == consts::ESCAPED_E5 {
            name.push(consts::DELETED_MARK);
        } else {
            name.push(*byte);
        }
    }

    if raw[8] != b' ' {
        name.push(b'.');
        for byte in trim_padding(&raw[8..11]) {
            name.push(*byte);
        }
    }

    name
}

fn trim_padding(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| *b != b' ')
        .map_or(0, |last| last + 1);
    &bytes[..end]
}

pub fn is_deleted(raw: &[u8; consts::ENTRY_SIZE]) -> bool {
    raw[0] == consts::DELETED_MARK
}

/// Whether this record is the first never-used slot of its directory. No live entries follow it,
/// in this sector or any later one.
pub fn is_end_of_entries(raw: &[u8; consts::ENTRY_SIZE]) -> bool {
    raw[0] == consts::END_OF_ENTRIES
}

pub const RECORDS_PER_SECTOR: usize = SECTOR_SIZE / consts::ENTRY_SIZE;

/// Views a directory sector as its fixed size records
pub fn records(sector: &Sector) -> &[[u8; consts::ENTRY_SIZE]; RECORDS_PER_SECTOR] {
    bytemuck::cast_ref(sector)
}

/// A transient decoded copy of one 32 byte directory record
#[derive(Clone, Copy)]
pub struct DirectoryEntry {
    raw: [u8; consts::ENTRY_SIZE],
}

impl DirectoryEntry {
    pub fn from_bytes(bytes: &[u8; consts::ENTRY_SIZE]) -> Self {
        Self { raw: *bytes }
    }

    /// Reads the record at `offset` of a sector, or `None` if it does not fit
    pub fn at(sector: &[u8], offset: usize) -> Option<Self> {
        let bytes = sector.get(offset..offset + consts::ENTRY_SIZE)?;
        Some(Self::from_bytes(bytes.try_into().ok()?))
    }

    fn fields(&self) -> &RawFileEntry {
        bytemuck::from_bytes(&self.raw)
    }

    pub fn as_bytes(&self) -> &[u8; consts::ENTRY_SIZE] {
        &self.raw
    }

    pub fn name(&self) -> ShortName {
        decode_name(&self.raw)
    }

    pub fn is_deleted(&self) -> bool {
        is_deleted(&self.raw)
    }

    pub fn is_end_of_entries(&self) -> bool {
        is_end_of_entries(&self.raw)
    }

    pub fn attributes(&self) -> FileAttributes {
        FileAttributes::from_bits_retain(self.fields().attributes)
    }

    pub fn is_directory(&self) -> bool {
        self.attributes().contains(FileAttributes::DIRECTORY)
    }

    /// Long file name slots share the record size but carry UTF-16 fragments instead of an 8.3
    /// name
    pub fn is_long_name(&self) -> bool {
        self.fields().attributes & consts::ATTR_LONG_NAME == consts::ATTR_LONG_NAME
    }

    /// The first cluster of the entry's chain.
    ///
    /// Only FAT32 uses the high word; its top four bits are reserved and masked off.
    pub fn first_cluster(&self, fat_type: FatType) -> u32 {
        let fields = self.fields();
        let low = u16::from_le_bytes(fields.first_cluster_low) as u32;
        match fat_type {
            FatType::Fat12 | FatType::Fat16 => low,
            FatType::Fat32 => {
                let high = u16::from_le_bytes(fields.first_cluster_high) as u32;
                ((high << 16) | low) & crate::structures::raw::constants::fat32::ENTRY_MASK
            }
        }
    }

    pub fn size(&self) -> u32 {
        u32::from_le_bytes(self.fields().size)
    }

    pub fn info(&self, fat_type: FatType) -> FileEntryInfo {
        FileEntryInfo {
            name: self.name(),
            attributes: self.attributes(),
            first_cluster: self.first_cluster(fat_type),
            size: self.size(),
        }
    }
}

impl fmt::Debug for DirectoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryEntry")
            .field("name", &self.name())
            .field("attributes", &self.attributes())
            .field("size", &self.size())
            .finish()
    }
}

/// Rewrites the attribute byte of the record at `offset` in a sector
pub(crate) fn write_attributes(sector: &mut [u8], offset: usize, attributes: FileAttributes) {
    let record: &mut RawFileEntry =
        bytemuck::from_bytes_mut(&mut sector[offset..offset + consts::ENTRY_SIZE]);
    record.attributes = attributes.bits();
}

/// The decoded contents of a live directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileEntryInfo {
    pub name: ShortName,
    pub attributes: FileAttributes,
    pub first_cluster: u32,
    pub size: u32,
}

impl FileEntryInfo {
    pub fn is_directory(&self) -> bool {
        self.attributes.contains(FileAttributes::DIRECTORY)
    }
}

impl fmt::Display for FileEntryInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t\t{}", self.attributes, self.name)?;
        if self.is_directory() {
            f.write_str("/")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_entry(name: &[u8; 11], attributes: u8, cluster: u32, size: u32) -> [u8; 32] {
        let mut raw = [0u8; 32];
        raw[0..11].copy_from_slice(name);
        raw[0x0B] = attributes;
        raw[0x14..0x16].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
        raw[0x1A..0x1C].copy_from_slice(&(cluster as u16).to_le_bytes());
        raw[0x1C..0x20].copy_from_slice(&size.to_le_bytes());
        raw
    }

    #[test]
    fn test_decode_with_extension() {
        let raw = raw_entry(b"FILE    TXT", 0x20, 5, 12);
        let entry = DirectoryEntry::from_bytes(&raw);
        assert_eq!(entry.name(), "FILE.TXT");
        assert_eq!(entry.size(), 12);
        assert_eq!(entry.attributes(), FileAttributes::ARCHIVE);
        assert_eq!(std::format!("{}", entry.attributes()), "w...fa");
    }

    #[test]
    fn test_decode_without_extension() {
        let raw = raw_entry(b"DOCS       ", 0x10, 3, 0);
        assert_eq!(decode_name(&raw), "DOCS");
        let info = DirectoryEntry::from_bytes(&raw).info(FatType::Fat16);
        assert!(info.is_directory());
        assert_eq!(std::format!("{info}"), "w...d.\t\tDOCS/");
    }

    #[test]
    fn test_decode_full_width() {
        let raw = raw_entry(b"ABCDEFGHXYZ", 0, 0, 0);
        assert_eq!(decode_name(&raw), "ABCDEFGH.XYZ");
    }

    #[test]
    fn test_decode_short_extension() {
        let raw = raw_entry(b"A       C  ", 0, 0, 0);
        assert_eq!(decode_name(&raw), "A.C");
    }

    #[test]
    fn test_escaped_e5() {
        let raw = raw_entry(b"\x05BC     TXT", 0, 0, 0);
        let name = decode_name(&raw);
        assert_eq!(name.as_bytes(), b"\xE5BC.TXT");
        assert!(!is_deleted(&raw));
        assert!(!is_end_of_entries(&raw));
    }

    #[test]
    fn test_escape_only_applies_to_first_byte() {
        let raw = raw_entry(b"A\x05         ", 0, 0, 0);
        assert_eq!(decode_name(&raw).as_bytes(), b"A\x05");
    }

    #[test]
    fn test_sentinels() {
        let mut raw = raw_entry(b"GONE    TXT", 0x20, 0, 0);
        raw[0] = 0xE5;
        assert!(is_deleted(&raw));
        assert!(!is_end_of_entries(&raw));
        assert!(is_end_of_entries(&[0u8; 32]));
    }

    #[test]
    fn test_decode_is_deterministic() {
        // Trailing bytes beyond the name do not take part in the name
        let a = raw_entry(b"SAME    BIN", 0x01, 7, 100);
        let b = raw_entry(b"SAME    BIN", 0x20, 9, 5);
        assert_eq!(decode_name(&a), decode_name(&b));
        assert_eq!(decode_name(&a), decode_name(&a));
    }

    #[test]
    fn test_first_cluster_by_fat_type() {
        let raw = raw_entry(b"BIG     DAT", 0, 0xF012_3456, 0);
        let entry = DirectoryEntry::from_bytes(&raw);
        assert_eq!(entry.first_cluster(FatType::Fat16), 0x3456);
        assert_eq!(entry.first_cluster(FatType::Fat12), 0x3456);
        // Top four bits are reserved
        assert_eq!(entry.first_cluster(FatType::Fat32), 0x0012_3456);
    }

    #[test]
    fn test_long_name_slot() {
        let raw = raw_entry(b"Ax\0y\0z\0\0\0\0\0", 0x0F, 0, 0);
        assert!(DirectoryEntry::from_bytes(&raw).is_long_name());
        let raw = raw_entry(b"PLAIN   TXT", 0x21, 0, 0);
        assert!(!DirectoryEntry::from_bytes(&raw).is_long_name());
    }

    #[test]
    fn test_all_attribute_chars() {
        assert_eq!(FileAttributes::all().to_chars(), ['r', 'h', 's', 'v', 'd', 'a']);
        assert_eq!(FileAttributes::empty().to_chars(), ['w', '.', '.', '.', 'f', '.']);
    }

    #[test]
    fn test_write_attributes() {
        let mut sector = [0u8; 512];
        sector[64..96].copy_from_slice(&raw_entry(b"FILE    TXT", 0x20, 0, 0));
        write_attributes(&mut sector, 64, FileAttributes::READ_ONLY | FileAttributes::HIDDEN);
        let entry = DirectoryEntry::at(&sector, 64).unwrap();
        assert_eq!(
            entry.attributes(),
            FileAttributes::READ_ONLY | FileAttributes::HIDDEN
        );
        assert_eq!(entry.name(), "FILE.TXT");
    }

    #[test]
    fn test_records_view() {
        let mut sector = [0u8; 512];
        sector[32..64].copy_from_slice(&raw_entry(b"SECOND  BIN", 0x20, 0, 0));
        let records = records(&sector);
        assert_eq!(records.len(), 16);
        assert!(is_end_of_entries(&records[0]));
        assert_eq!(decode_name(&records[1]), "SECOND.BIN");
    }

    #[test]
    fn test_entry_at_bounds() {
        let sector = [0u8; 512];
        assert!(DirectoryEntry::at(&sector, 480).is_some());
        assert!(DirectoryEntry::at(&sector, 496).is_none());
    }
}
