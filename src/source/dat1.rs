//! Legacy DAT archive, first generation (uncompressed directory table).
//!
//! On-disk layout, all integers little-endian:
//!
//! ```text
//! magic       b"DAT1"
//! entry_count u32
//! records     entry_count x { name_len u32, name [u8; name_len],
//!                             offset u32, length u32 }
//! ```
//!
//! Every entry is stored uncompressed; opening one returns a direct
//! offset/length window into the archive file.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use log::debug;

use super::{TableReader, VfsSource, VfsSourceProvider, list_children, probe_magic};
use crate::raw::{ArchiveHandle, RawData, StoredEntrySource};
use crate::{Error, Result, VfsPath};

/// Signature at the start of a v1 archive.
pub(crate) const DAT1_MAGIC: &[u8; 4] = b"DAT1";

/// Sanity cap on a single entry name, far above anything real tables hold.
const MAX_NAME_LEN: u32 = 4096;

#[derive(Debug)]
struct Entry {
    offset: u64,
    len: u64,
}

/// A mounted first-generation DAT archive.
#[derive(Debug)]
pub struct Dat1Source {
    origin: String,
    handle: Arc<ArchiveHandle>,
    entries: BTreeMap<String, Entry>,
}

impl Dat1Source {
    /// Opens and fully parses the archive at `path`.
    ///
    /// The directory table is read once; a signature mismatch, truncated
    /// table, or an entry pointing outside the file fails with
    /// [`Error::InvalidFormat`] and nothing is mounted.
    pub fn open(path: &Path) -> Result<Self> {
        let origin = path.display().to_string();
        let file = File::open(path).map_err(|e| Error::cannot_open(origin.clone(), e))?;
        let file_len = file
            .metadata()
            .map_err(|e| Error::cannot_open(origin.clone(), e))?
            .len();

        let mut table = TableReader::new(BufReader::new(file), origin.clone());
        let magic = table.read_bytes(DAT1_MAGIC.len())?;
        if magic != DAT1_MAGIC {
            return Err(Error::InvalidFormat("bad DAT1 signature".into()));
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

            let offset = table.read_u32_le()? as u64;
            let len = table.read_u32_le()? as u64;
            if offset + len > file_len {
                return Err(Error::InvalidFormat(format!(
                    "entry '{}' extends past end of archive",
                    path
                )));
            }
            // Duplicate names: last record wins.
            entries.insert(path.as_str().to_string(), Entry { offset, len });
        }

        let file = table.into_inner().into_inner();
        let handle = Arc::new(ArchiveHandle::from_file(file, path.to_path_buf())?);

        debug!("mounted DAT1 '{}': {} entries", origin, entries.len());
        Ok(Self {
            origin,
            handle,
            entries,
        })
    }
}

impl VfsSource for Dat1Source {
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
        Ok(RawData::new(Box::new(StoredEntrySource::new(
            Arc::clone(&self.handle),
            entry.offset,
            entry.len,
        ))))
    }

    fn list_files(&self, dir: &VfsPath) -> BTreeSet<String> {
        list_children(self.entries.keys().map(String::as_str), dir, false)
    }

    fn list_directories(&self, dir: &VfsPath) -> BTreeSet<String> {
        list_children(self.entries.keys().map(String::as_str), dir, true)
    }
}

/// Detector and factory for first-generation DAT archives.
pub struct Dat1Provider;

impl VfsSourceProvider for Dat1Provider {
    fn name(&self) -> &'static str {
        "dat1"
    }

    fn is_readable(&self, path: &Path) -> bool {
        probe_magic(path, DAT1_MAGIC)
    }

    fn create_source(&self, path: &Path) -> Result<Arc<dyn VfsSource>> {
        Ok(Arc::new(Dat1Source::open(path)?))
    }
}
