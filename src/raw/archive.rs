//! Archive-entry-backed byte sources and the shared archive handle.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{RawDataSource, check_range};
use crate::codec::{self, CompressionMethod};
use crate::{Error, Result};

/// The single open handle to a mounted archive file.
///
/// Each mounted source exclusively owns one handle; entry-backed sources
/// share it via `Arc`, so a `RawData` opened before an unmount keeps the
/// file alive until it is dropped. All positional reads serialize on an
/// internal mutex.
#[derive(Debug)]
pub struct ArchiveHandle {
    file: Mutex<File>,
    len: u64,
    origin: PathBuf,
}

impl ArchiveHandle {
    /// Opens the file at `path` and captures its length.
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).map_err(|e| Error::cannot_open(path.display().to_string(), e))?;
        let len = file
            .metadata()
            .map_err(|e| Error::cannot_open(path.display().to_string(), e))?
            .len();
        Ok(Self {
            file: Mutex::new(file),
            len,
            origin: path.to_path_buf(),
        })
    }

    /// Wraps an already-open file, capturing its length.
    ///
    /// Used by table parsers that have just finished a sequential read of
    /// the same file; the seek position is irrelevant since all reads are
    /// positional.
    pub(crate) fn from_file(file: File, origin: PathBuf) -> Result<Self> {
        let len = file
            .metadata()
            .map_err(|e| Error::cannot_open(origin.display().to_string(), e))?
            .len();
        Ok(Self {
            file: Mutex::new(file),
            len,
            origin,
        })
    }

    /// Length of the underlying file in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` if the underlying file is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The path this handle was opened from.
    pub fn origin(&self) -> &Path {
        &self.origin
    }

    /// Reads exactly `buf.len()` bytes at `offset` in raw file coordinates.
    pub fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        check_range(offset, buf.len() as u64, self.len)?;
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.seek(SeekFrom::Start(offset))
            .and_then(|_| file.read_exact(buf))
            .map_err(|e| Error::cannot_open(self.origin.display().to_string(), e))
    }
}

/// A [`RawDataSource`] over an uncompressed byte window of an archive file.
///
/// Reads go straight to the shared handle with an offset translation; no
/// caching is involved.
pub struct StoredEntrySource {
    handle: Arc<ArchiveHandle>,
    offset: u64,
    len: u64,
}

impl StoredEntrySource {
    /// Creates a window of `len` bytes starting at `offset` in the archive.
    pub fn new(handle: Arc<ArchiveHandle>, offset: u64, len: u64) -> Self {
        Self {
            handle,
            offset,
            len,
        }
    }
}

impl RawDataSource for StoredEntrySource {
    fn size(&self) -> u64 {
        self.len
    }

    fn read_into(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        check_range(offset, buf.len() as u64, self.len)?;
        self.handle.read_exact_at(self.offset + offset, buf)
    }
}

/// A [`RawDataSource`] over a compressed archive entry.
///
/// The packed bytes are decompressed once, lazily, on first read; the
/// plaintext is cached and all subsequent reads are served from the cache.
/// This trades memory for avoiding repeated decompression on sequential
/// partial reads. The one-time decompression is mutex-guarded so concurrent
/// first reads of the same entry do not race.
pub struct CompressedEntrySource {
    handle: Arc<ArchiveHandle>,
    offset: u64,
    packed_len: u64,
    unpacked_len: u64,
    method: CompressionMethod,
    cache: Mutex<Option<Arc<Vec<u8>>>>,
}

impl CompressedEntrySource {
    /// Creates a lazy source for an entry whose packed bytes live at
    /// `offset..offset + packed_len` and decode to `unpacked_len` bytes.
    pub fn new(
        handle: Arc<ArchiveHandle>,
        offset: u64,
        packed_len: u64,
        unpacked_len: u64,
        method: CompressionMethod,
    ) -> Self {
        Self {
            handle,
            offset,
            packed_len,
            unpacked_len,
            method,
            cache: Mutex::new(None),
        }
    }

    fn decompressed(&self) -> Result<Arc<Vec<u8>>> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(bytes) = cache.as_ref() {
            return Ok(Arc::clone(bytes));
        }

        let packed_len = self.packed_len as usize;
        let mut packed = Vec::new();
        packed
            .try_reserve_exact(packed_len)
            .map_err(|_| Error::OutOfMemory {
                requested: packed_len,
            })?;
        packed.resize(packed_len, 0);
        self.handle.read_exact_at(self.offset, &mut packed)?;

        let plain = Arc::new(codec::decode(self.method, &packed, self.unpacked_len)?);
        *cache = Some(Arc::clone(&plain));
        Ok(plain)
    }
}

impl RawDataSource for CompressedEntrySource {
    fn size(&self) -> u64 {
        self.unpacked_len
    }

    fn read_into(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        check_range(offset, buf.len() as u64, self.unpacked_len)?;
        let bytes = self.decompressed()?;
        let start = offset as usize;
        buf.copy_from_slice(&bytes[start..start + buf.len()]);
        Ok(())
    }
}
