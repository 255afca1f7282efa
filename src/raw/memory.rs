//! Memory-backed byte source.

use super::{RawDataSource, check_range};
use crate::Result;

/// A [`RawDataSource`] over an owned byte buffer.
///
/// Used for pre-decompressed bytes and for callers that hand the VFS data
/// they already hold in memory.
pub struct MemorySource {
    bytes: Vec<u8>,
}

impl MemorySource {
    /// Creates a memory source owning `bytes`.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl RawDataSource for MemorySource {
    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read_into(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        check_range(offset, buf.len() as u64, self.size())?;
        let start = offset as usize;
        buf.copy_from_slice(&self.bytes[start..start + buf.len()]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_full_read() {
        let src = MemorySource::new(vec![1, 2, 3, 4]);
        let mut buf = [0u8; 4];
        src.read_into(0, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
    }

    #[test]
    fn test_window_read() {
        let src = MemorySource::new(vec![1, 2, 3, 4]);
        let mut buf = [0u8; 2];
        src.read_into(1, &mut buf).unwrap();
        assert_eq!(buf, [2, 3]);
    }

    #[test]
    fn test_out_of_range() {
        let src = MemorySource::new(vec![1, 2, 3, 4]);
        let mut buf = [0u8; 2];
        assert!(matches!(
            src.read_into(3, &mut buf),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_empty_source() {
        let src = MemorySource::new(Vec::new());
        assert_eq!(src.size(), 0);
        let mut empty: [u8; 0] = [];
        src.read_into(0, &mut empty).unwrap();
    }
}
