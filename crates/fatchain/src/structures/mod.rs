//! Structures for FAT file systems
//!
//! Raw byte structures are defined in the `raw` module, in on-disk little endian layout.
//! The `directory` module decodes 32 byte directory records into names, attributes and cluster
//! numbers.

use core::fmt;

pub mod directory;
pub mod raw;

/// A decoded 8.3 short name, `NAME.EXT` without padding.
///
/// The name holds raw bytes rather than a `str`, because the first byte may legitimately be
/// 0xE5, which is not valid UTF-8 on its own. Display maps each byte to the Latin-1 character
/// with the same value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ShortName {
    raw: [u8; ShortName::MAX_LEN],
    len: u8,
}

impl ShortName {
    /// 8 name characters, a dot, and 3 extension characters
    pub const MAX_LEN: usize = 12;

    /// Canonicalizes a user supplied name for comparison against decoded directory names.
    ///
    /// Each character maps to the Latin-1 byte of the same value, the inverse of `Display`, and
    /// ASCII letters are upper-cased. Returns `None` if the name is empty, longer than any 8.3
    /// name can be, or holds a character above U+00FF, in which case no entry can match it.
    pub fn canonical(name: &str) -> Option<Self> {
        if name.is_empty() {
            return None;
        }
        let mut short = Self::default();
        for c in name.chars() {
            let byte = u8::try_from(c).ok()?;
            if short.len() == Self::MAX_LEN {
                return None;
            }
            short.push(byte.to_ascii_uppercase());
        }
        Some(short)
    }

    pub(crate) fn push(&mut self, byte: u8) {
        self.raw[self.len as usize] = byte;
        self.len += 1;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.as_bytes() {
            fmt::Write::write_char(f, char::from(*byte))?;
        }
        Ok(())
    }
}

impl fmt::Debug for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShortName(\"{self}\")")
    }
}

impl PartialEq<[u8]> for ShortName {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl PartialEq<&str> for ShortName {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes().iter().map(|b| char::from(*b)).eq(other.chars())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_uppercases() {
        let name = ShortName::canonical("fat_test.txt").unwrap();
        assert_eq!(name, "FAT_TEST.TXT");
        assert_eq!(name.len(), 12);
    }

    #[test]
    fn test_canonical_rejects_impossible_names() {
        assert!(ShortName::canonical("").is_none());
        assert!(ShortName::canonical("much_too_long.txt").is_none());
    }

    #[test]
    fn test_canonical_latin1() {
        let name = ShortName::canonical("\u{e5}bc.txt").unwrap();
        assert_eq!(name.as_bytes(), b"\xE5BC.TXT");
        assert_eq!(name, "\u{e5}BC.TXT");
        assert!(ShortName::canonical("\u{3b1}.txt").is_none());
    }

    #[test]
    fn test_display_latin1() {
        let mut name = ShortName::default();
        name.push(0xE5);
        name.push(b'A');
        assert_eq!(std::format!("{name}"), "\u{e5}A");
    }
}
