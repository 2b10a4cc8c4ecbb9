//! Raw preset bytes as read from disk

use crate::error::{PresetError, Result};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Largest preset file accepted (16 MB)
pub const MAX_PRESET_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Immutable preset contents plus file metadata
#[derive(Debug, Clone, Default)]
pub struct RawPresetBytes {
    /// File contents
    pub bytes: Vec<u8>,
    /// Size in bytes
    pub size: u64,
    /// Last modification time, when known
    pub modified: Option<SystemTime>,
    /// Source path, when read from disk
    pub path: Option<PathBuf>,
}

impl RawPresetBytes {
    /// Wrap in-memory bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        Self {
            size: bytes.len() as u64,
            bytes,
            modified: None,
            path: None,
        }
    }

    /// Read a whole file into memory
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path)?;
        if metadata.len() > MAX_PRESET_FILE_SIZE {
            return Err(PresetError::TooLarge {
                size: metadata.len(),
                max: MAX_PRESET_FILE_SIZE,
            });
        }
        let bytes = fs::read(path)?;
        let modified = metadata.modified().ok();
        debug!("Read preset {} ({} bytes)", path.display(), bytes.len());
        Ok(Self {
            size: bytes.len() as u64,
            bytes,
            modified,
            path: Some(path.to_path_buf()),
        })
    }

    /// No bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Contents are valid UTF-8
    pub fn is_utf8(&self) -> bool {
        std::str::from_utf8(&self.bytes).is_ok()
    }

    /// Decode as UTF-8, falling back to a single-byte (Latin-1) decoding
    pub fn decode_text(&self) -> Cow<'_, str> {
        decode_text(&self.bytes)
    }

    /// Share of bytes that look like text (printable ASCII, whitespace or
    /// high-bit characters)
    pub fn printable_ratio(&self) -> f32 {
        printable_ratio(&self.bytes)
    }
}

/// Decode bytes as UTF-8 (BOM stripped), or Latin-1 when that fails
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| b as char).collect()),
    }
}

/// Share of bytes that look like text
pub fn printable_ratio(bytes: &[u8]) -> f32 {
    if bytes.is_empty() {
        return 1.0;
    }
    let printable = bytes
        .iter()
        .filter(|&&b| matches!(b, b'\t' | b'\n' | b'\r' | 0x20..=0x7E | 0x80..=0xFF))
        .count();
    printable as f32 / bytes.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8_and_bom() {
        let raw = RawPresetBytes::from_bytes(b"\xEF\xBB\xBFhello".to_vec());
        assert_eq!(raw.decode_text(), "hello");
        assert!(raw.is_utf8());
    }

    #[test]
    fn test_decode_latin1_fallback() {
        let raw = RawPresetBytes::from_bytes(vec![b'c', b'a', b'f', 0xE9]);
        assert!(!raw.is_utf8());
        assert_eq!(raw.decode_text(), "caf\u{e9}");
    }

    #[test]
    fn test_printable_ratio() {
        assert_eq!(printable_ratio(b"abc\n"), 1.0);
        assert_eq!(printable_ratio(&[0, 0, b'a', b'b']), 0.5);
    }
}
