//! Legacy DAT archive, second generation (per-entry compression flag).
//!
//! On-disk layout, all integers little-endian:
//!
//! ```text
//! magic       b"DAT2"
//! entry_count u32
//! records     entry_count x { name_len u32, name [u8; name_len],
//!                             method u8, unpacked_len u32,
//!                             packed_len u32, offset u32 }
//! ```
//!
//! `method` 0 means the entry is stored verbatim (`packed_len` must equal
//! `unpacked_len`); 1 means the packed bytes are an LZSS stream decoding to
//! `unpacked_len` bytes. Compressed entries decompress lazily on first read.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use log::debug;

use super::{TableReader, VfsSource, VfsSourceProvider, list_children, probe_magic};
use crate::codec::CompressionMethod;
use crate::raw::{ArchiveHandle, CompressedEntrySource, RawData, StoredEntrySource};
use crate::{Error, Result, VfsPath};

/// Signature at the start of a v2 archive.
pub(crate) const DAT2_MAGIC: &[u8; 4] = b"DAT2";

/// Method byte for entries stored verbatim.
pub(crate) const METHOD_STORE: u8 = 0;

/// Method byte for LZSS-compressed entries.
pub(crate) const METHOD_LZSS: u8 = 1;

const MAX_NAME_LEN: u32 = 4096;

#[derive(Debug)]
struct Entry {
    method: CompressionMethod,
    unpacked_len: u64,
    packed_len: u64,
    offset: u64,
}

/// A mounted second-generation DAT archive.
#[derive(Debug)]
pub struct Dat2Source {
    origin: String,
    handle: Arc<ArchiveHandle>,
    entries: BTreeMap<String, Entry>,
}

impl Dat2Source {
    /// Opens and fully parses the archive at `path`.
    ///
    /// Signature, method bytes, and every record's byte range are validated
    /// before the source exists; any failure is [`Error::InvalidFormat`]
    /// and nothing is mounted.
    pub fn open(path: &Path) -> Result<Self> {
        let origin = path.display().to_string();
        let file = File::open(path).map_err(|e| Error::cannot_open(origin.clone(), e))?;
        let file_len = file
            .metadata()
            .map_err(|e| Error::cannot_open(origin.clone(), e))?
            .len();

        let mut table = TableReader::new(BufReader::new(file), origin.clone());
        let magic = table.read_bytes(DAT2_MAGIC.len())?;
        if magic != DAT2_MAGIC {
            return Err(Error::InvalidFormat("bad DAT2 signature".into()));
        }

        let entry_count = table.read_u32_le()?;
        let mut entries = BTreeMap::new();
        for _ in 0..entry_count {
            let name_len = table.read_u32_le()?;
            if name_len > MAX_NAME_LEN {
                return Err(Error::InvalidFormat(format!(
                    "entry name length {} exceeds limit",
                    name_len
                )));
            }
            let name = table.read_string(name_len as usize)?;
            let path = VfsPath::new(&name)?;
            if path.is_root() {
                return Err(Error::InvalidFormat("empty entry name".into()));
            }

            let method_byte = table.read_u8()?;
            let unpacked_len = table.read_u32_le()? as u64;
            let packed_len = table.read_u32_le()? as u64;
            let offset = table.read_u32_le()? as u64;

            let method = match method_byte {
                METHOD_STORE => {
                    if packed_len != unpacked_len {
                        return Err(Error::InvalidFormat(format!(
                            "stored entry '{}' has mismatched lengths ({} packed, {} unpacked)",
                            path, packed_len, unpacked_len
                        )));
                    }
                    CompressionMethod::Store
                }
                METHOD_LZSS => CompressionMethod::Lzss,
                other => {
                    return Err(Error::InvalidFormat(format!(
                        "unknown compression method {} for entry '{}'",
                        other, path
                    )));
                }
            };

            if offset + packed_len > file_len {
                return Err(Error::InvalidFormat(format!(
                    "entry '{}' extends past end of archive",
                    path
                )));
            }
            // Duplicate names: last record wins.
            entries.insert(
                path.as_str().to_string(),
                Entry {
                    method,
                    unpacked_len,
                    packed_len,
                    offset,
                },
            );
        }

        let file = table.into_inner().into_inner();
        let handle = Arc::new(ArchiveHandle::from_file(file, path.to_path_buf())?);

        debug!("mounted DAT2 '{}': {} entries", origin, entries.len());
        Ok(Self {
            origin,
            handle,
            entries,
        })
    }
}

impl VfsSource for Dat2Source {
    fn origin(&self) -> &str {
        &self.origin
    }

    fn file_exists(&self, path: &VfsPath) -> bool {
        self.entries.contains_key(path.as_str())
    }

    fn open(&self, path: &VfsPath) -> Result<RawData> {
        let entry = self
            .entries
            .get(path.as_str())
            .ok_or_else(|| Error::not_found(path.as_str()))?;
        let source: Box<dyn crate::RawDataSource> = match entry.method {
            CompressionMethod::Store => Box::new(StoredEntrySource::new(
                Arc::clone(&self.handle),
                entry.offset,
                entry.unpacked_len,
            )),
            method => Box::new(CompressedEntrySource::new(
                Arc::clone(&self.handle),
                entry.offset,
                entry.packed_len,
                entry.unpacked_len,
                method,
            )),
        };
        Ok(RawData::new(source))
    }

    fn list_files(&self, dir: &VfsPath) -> BTreeSet<String> {
        list_children(self.entries.keys().map(String::as_str), dir, false)
    }

    fn list_directories(&self, dir: &VfsPath) -> BTreeSet<String> {
        list_children(self.entries.keys().map(String::as_str), dir, true)
    }
}

/// Detector and factory for second-generation DAT archives.
pub struct Dat2Provider;

impl VfsSourceProvider for Dat2Provider {
    fn name(&self) -> &'static str {
        "dat2"
    }

    fn is_readable(&self, path: &Path) -> bool {
        probe_magic(path, DAT2_MAGIC)
    }

    fn create_source(&self, path: &Path) -> Result<Arc<dyn VfsSource>> {
        Ok(Arc::new(Dat2Source::open(path)?))
    }
}
