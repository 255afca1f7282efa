//! Byte sources and the [`RawData`] handle.
//!
//! [`RawDataSource`] is the abstract finite byte source every backing store
//! produces: memory-backed for pre-decompressed bytes, archive-entry-backed
//! for lazy reads against a shared archive handle. [`RawData`] wraps exactly
//! one source and is the unit exchanged with consumers: renderers, audio,
//! and scripting see `RawData`, never archive-internal structure.

mod archive;
mod memory;

pub use archive::{ArchiveHandle, CompressedEntrySource, StoredEntrySource};
pub use memory::MemorySource;

use crate::{Error, Result};

/// An abstract finite byte source.
///
/// Implementations are immutable in size and side-effect-free on reads:
/// repeated reads of the same range return identical bytes. Coordinates are
/// post-decompression coordinates, not raw archive-file coordinates.
pub trait RawDataSource: Send + Sync {
    /// Total size of the source in bytes, constant for its lifetime.
    fn size(&self) -> u64;

    /// Fills `buf` with exactly `buf.len()` bytes starting at `offset`.
    ///
    /// Fails with [`Error::OutOfRange`] if `offset + buf.len()` exceeds
    /// [`size`](Self::size). Never fills partially.
    fn read_into(&self, offset: u64, buf: &mut [u8]) -> Result<()>;
}

/// Validates a read range against a source size.
///
/// Overflow-safe: `offset + len` computed with checked arithmetic.
pub(crate) fn check_range(offset: u64, len: u64, size: u64) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(Error::OutOfRange { offset, len, size }),
    }
}

/// A bounded, randomly-addressable handle over one [`RawDataSource`].
///
/// Owns its source exclusively; the total size is immutable and the read
/// cursor is caller-controlled. Provides the little/big-endian helpers
/// archive tables and asset loaders need.
///
/// # Examples
///
/// ```
/// use assetfs::RawData;
///
/// let mut data = RawData::from_bytes(vec![0x0D, 0xF0, 0xAD, 0xDE]);
/// assert_eq!(data.len(), 4);
/// assert_eq!(data.read_u16_le().unwrap(), 0xF00D);
/// assert_eq!(data.read_u16_le().unwrap(), 0xDEAD);
/// assert!(data.read_u8().is_err());
/// ```
pub struct RawData {
    source: Box<dyn RawDataSource>,
    position: u64,
}

impl RawData {
    /// Creates a `RawData` over the given source, cursor at zero.
    pub fn new(source: Box<dyn RawDataSource>) -> Self {
        Self {
            source,
            position: 0,
        }
    }

    /// Creates a memory-backed `RawData` from owned bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::new(Box::new(MemorySource::new(bytes)))
    }

    /// Total size of the underlying source in bytes.
    pub fn len(&self) -> u64 {
        self.source.size()
    }

    /// Returns `true` if the source is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current cursor position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes remaining between the cursor and the end of the source.
    pub fn remaining(&self) -> u64 {
        self.len() - self.position
    }

    /// Moves the cursor to `position`.
    ///
    /// A position equal to the length is valid (end of data); anything past
    /// it fails with [`Error::OutOfRange`].
    pub fn set_position(&mut self, position: u64) -> Result<()> {
        check_range(position, 0, self.len())?;
        self.position = position;
        Ok(())
    }

    /// Reads at an explicit offset without touching the cursor.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.source.read_into(offset, buf)
    }

    /// Fills `buf` from the cursor and advances it.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        self.source.read_into(self.position, buf)?;
        self.position += buf.len() as u64;
        Ok(())
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let mut b = [0u8; 1];
        self.read_into(&mut b)?;
        Ok(b[0])
    }

    /// Reads a little-endian `u16`.
    pub fn read_u16_le(&mut self) -> Result<u16> {
        let mut b = [0u8; 2];
        self.read_into(&mut b)?;
        Ok(u16::from_le_bytes(b))
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32_le(&mut self) -> Result<u32> {
        let mut b = [0u8; 4];
        self.read_into(&mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    /// Reads a big-endian `u16`.
    pub fn read_u16_be(&mut self) -> Result<u16> {
        let mut b = [0u8; 2];
        self.read_into(&mut b)?;
        Ok(u16::from_be_bytes(b))
    }

    /// Reads a big-endian `u32`.
    pub fn read_u32_be(&mut self) -> Result<u32> {
        let mut b = [0u8; 4];
        self.read_into(&mut b)?;
        Ok(u32::from_be_bytes(b))
    }

    /// Reads `len` bytes as a UTF-8 string, no terminator assumed.
    ///
    /// Fails with [`Error::InvalidFormat`] on invalid UTF-8.
    pub fn read_string(&mut self, len: usize) -> Result<String> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| Error::OutOfMemory { requested: len })?;
        buf.resize(len, 0);
        self.read_into(&mut buf)?;
        String::from_utf8(buf).map_err(|_| Error::InvalidFormat("string is not valid UTF-8".into()))
    }

    /// Reads everything from the cursor to the end of the source.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let len = self.remaining() as usize;
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| Error::OutOfMemory { requested: len })?;
        buf.resize(len, 0);
        self.read_into(&mut buf)?;
        Ok(buf)
    }

    /// Reads the next line of text, consuming the trailing `\n`.
    ///
    /// Returns `Ok(None)` when no data remains. A trailing `\r` is stripped.
    /// Line bytes must be valid UTF-8.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        if self.remaining() == 0 {
            return Ok(None);
        }
        let mut line = Vec::new();
        let mut chunk = [0u8; 256];
        'outer: while self.remaining() > 0 {
            let n = self.remaining().min(chunk.len() as u64) as usize;
            self.read_at(self.position, &mut chunk[..n])?;
            for (i, &b) in chunk[..n].iter().enumerate() {
                if b == b'\n' {
                    self.position += i as u64 + 1;
                    break 'outer;
                }
                line.push(b);
            }
            self.position += n as u64;
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        let s = String::from_utf8(line)
            .map_err(|_| Error::InvalidFormat("line is not valid UTF-8".into()))?;
        Ok(Some(s))
    }
}

impl std::fmt::Debug for RawData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawData")
            .field("len", &self.len())
            .field("position", &self.position)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range() {
        assert!(check_range(0, 4, 4).is_ok());
        assert!(check_range(4, 0, 4).is_ok());
        assert!(check_range(2, 3, 4).is_err());
        assert!(check_range(u64::MAX, 1, u64::MAX).is_err());
    }

    #[test]
    fn test_cursor_reads_advance() {
        let mut data = RawData::from_bytes(vec![1, 2, 3, 4, 5]);
        let mut buf = [0u8; 2];
        data.read_into(&mut buf).unwrap();
        assert_eq!(buf, [1, 2]);
        assert_eq!(data.position(), 2);
        assert_eq!(data.remaining(), 3);
    }

    #[test]
    fn test_read_past_end_fails_without_truncation() {
        let mut data = RawData::from_bytes(vec![1, 2, 3]);
        let mut buf = [0u8; 4];
        let err = data.read_into(&mut buf).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { .. }));
        // Cursor untouched by the failed read.
        assert_eq!(data.position(), 0);
    }

    #[test]
    fn test_read_at_is_cursor_independent() {
        let mut data = RawData::from_bytes(vec![10, 20, 30]);
        data.read_u8().unwrap();
        let mut buf = [0u8; 1];
        data.read_at(0, &mut buf).unwrap();
        assert_eq!(buf[0], 10);
        assert_eq!(data.position(), 1);
    }

    #[test]
    fn test_endian_helpers() {
        let mut data = RawData::from_bytes(vec![0x34, 0x12, 0x12, 0x34, 0x78, 0x56, 0x34, 0x12]);
        assert_eq!(data.read_u16_le().unwrap(), 0x1234);
        assert_eq!(data.read_u16_be().unwrap(), 0x1234);
        assert_eq!(data.read_u32_le().unwrap(), 0x12345678);
    }

    #[test]
    fn test_read_u32_be() {
        let mut data = RawData::from_bytes(vec![0x12, 0x34, 0x56, 0x78]);
        assert_eq!(data.read_u32_be().unwrap(), 0x12345678);
    }

    #[test]
    fn test_set_position_bounds() {
        let mut data = RawData::from_bytes(vec![0; 8]);
        data.set_position(8).unwrap();
        assert_eq!(data.remaining(), 0);
        assert!(data.set_position(9).is_err());
    }

    #[test]
    fn test_read_string() {
        let mut data = RawData::from_bytes(b"hello.bin".to_vec());
        assert_eq!(data.read_string(5).unwrap(), "hello");
        assert_eq!(data.position(), 5);
    }

    #[test]
    fn test_read_string_invalid_utf8() {
        let mut data = RawData::from_bytes(vec![0xFF, 0xFE]);
        assert!(matches!(
            data.read_string(2),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_read_all_from_cursor() {
        let mut data = RawData::from_bytes(vec![1, 2, 3, 4]);
        data.read_u8().unwrap();
        assert_eq!(data.read_all().unwrap(), vec![2, 3, 4]);
        assert_eq!(data.remaining(), 0);
    }

    #[test]
    fn test_read_line() {
        let mut data = RawData::from_bytes(b"first\r\nsecond\nlast".to_vec());
        assert_eq!(data.read_line().unwrap().as_deref(), Some("first"));
        assert_eq!(data.read_line().unwrap().as_deref(), Some("second"));
        assert_eq!(data.read_line().unwrap().as_deref(), Some("last"));
        assert_eq!(data.read_line().unwrap(), None);
    }

    #[test]
    fn test_read_line_spanning_chunks() {
        let mut payload = vec![b'x'; 700];
        payload.push(b'\n');
        payload.push(b'y');
        let mut data = RawData::from_bytes(payload);
        assert_eq!(data.read_line().unwrap().unwrap().len(), 700);
        assert_eq!(data.read_line().unwrap().as_deref(), Some("y"));
    }

    #[test]
    fn test_idempotent_reads() {
        let mut data = RawData::from_bytes((0..64).collect());
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        data.set_position(8).unwrap();
        data.read_at(8, &mut a).unwrap();
        data.read_at(8, &mut b).unwrap();
        assert_eq!(a, b);
    }
}
