//! Zip backing store (central-directory format).
//!
//! The end-of-central-directory record is located by scanning the file
//! tail, then the central directory is parsed once at mount time into the
//! index. Store (method 0) and Deflate (method 8) entries are supported;
//! the local header is read at open time to locate the entry's data.
//! Inflation is delegated to `flate2` and the plaintext is verified
//! against the central directory's CRC-32.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use log::debug;

use super::{VfsSource, VfsSourceProvider, list_children};
use crate::codec::CompressionMethod;
use crate::raw::{ArchiveHandle, CompressedEntrySource, RawData, StoredEntrySource};
use crate::{Error, Result, VfsPath};

const LOCAL_SIG: u32 = 0x0403_4B50; // PK\x03\x04
const CENTRAL_SIG: u32 = 0x0201_4B50; // PK\x01\x02
const EOCD_SIG: &[u8; 4] = &[0x50, 0x4B, 0x05, 0x06];

/// Fixed part of the end-of-central-directory record.
const EOCD_LEN: u64 = 22;
/// Fixed part of a local file header.
const LOCAL_HEADER_LEN: u64 = 30;
/// Maximum zip comment length bounds the EOCD tail scan.
const MAX_COMMENT_LEN: u64 = 65535;

const METHOD_STORE: u16 = 0;
const METHOD_DEFLATE: u16 = 8;

/// Encrypted-entry bit in the general-purpose flags.
const FLAG_ENCRYPTED: u16 = 0x0001;

struct Entry {
    method: u16,
    flags: u16,
    crc: u32,
    packed_len: u64,
    unpacked_len: u64,
    local_offset: u64,
}

/// A mounted Zip archive.
pub struct ZipSource {
    origin: String,
    handle: Arc<ArchiveHandle>,
    entries: BTreeMap<String, Entry>,
}

impl ZipSource {
    /// Opens the archive at `path` and parses its central directory.
    pub fn open(path: &Path) -> Result<Self> {
        let origin = path.display().to_string();
        let handle = Arc::new(ArchiveHandle::open(path)?);

        let (cd_offset, cd_size, entry_count) = find_central_directory(&handle)?;

        let cd_len = cd_size as usize;
        let mut cd_bytes = Vec::new();
        cd_bytes
            .try_reserve_exact(cd_len)
            .map_err(|_| Error::OutOfMemory { requested: cd_len })?;
        cd_bytes.resize(cd_len, 0);
        handle.read_exact_at(cd_offset, &mut cd_bytes)?;

        let entries =
            parse_central_directory(cd_bytes, entry_count, handle.len()).map_err(|e| match e {
                Error::OutOfRange { .. } => {
                    Error::InvalidFormat("truncated central directory".into())
                }
                e => e,
            })?;

        debug!("mounted zip '{}': {} entries", origin, entries.len());
        Ok(Self {
            origin,
            handle,
            entries,
        })
    }

    /// Reads the local header to find where the entry's data starts.
    fn data_offset(&self, entry: &Entry) -> Result<u64> {
        let mut header = [0u8; LOCAL_HEADER_LEN as usize];
        self.handle.read_exact_at(entry.local_offset, &mut header)?;
        let mut reader = RawData::from_bytes(header.to_vec());
        if reader.read_u32_le()? != LOCAL_SIG {
            return Err(Error::InvalidFormat("bad local file header".into()));
        }
        reader.set_position(26)?;
        let name_len = reader.read_u16_le()? as u64;
        let extra_len = reader.read_u16_le()? as u64;

        let data_offset = entry.local_offset + LOCAL_HEADER_LEN + name_len + extra_len;
        if data_offset + entry.packed_len > self.handle.len() {
            return Err(Error::InvalidFormat(
                "entry data extends past end of archive".into(),
            ));
        }
        Ok(data_offset)
    }
}

/// Locates the EOCD record and returns (cd_offset, cd_size, entry_count).
fn find_central_directory(handle: &ArchiveHandle) -> Result<(u64, u64, u16)> {
    let file_len = handle.len();
    if file_len < EOCD_LEN {
        return Err(Error::InvalidFormat("file too small for a zip".into()));
    }
    let scan_len = file_len.min(EOCD_LEN + MAX_COMMENT_LEN);
    let scan_start = file_len - scan_len;
    let mut tail = vec![0u8; scan_len as usize];
    handle.read_exact_at(scan_start, &mut tail)?;

    // The comment may embed the signature bytes, so a signature match alone
    // is not enough. The genuine record is the rearmost candidate whose
    // comment-length field reaches exactly to end of file.
    let eocd_pos = tail
        .windows(EOCD_LEN as usize)
        .enumerate()
        .rev()
        .find(|(i, rec)| {
            rec[..4] == *EOCD_SIG && {
                let comment_len = u16::from_le_bytes([rec[20], rec[21]]) as usize;
                i + EOCD_LEN as usize + comment_len == tail.len()
            }
        })
        .map(|(i, _)| i)
        .ok_or_else(|| Error::InvalidFormat("end of central directory not found".into()))?;

    let mut eocd = RawData::from_bytes(tail[eocd_pos..].to_vec());
    eocd.set_position(4)?;
    let disk_num = eocd.read_u16_le()?;
    let cd_disk = eocd.read_u16_le()?;
    let _disk_entries = eocd.read_u16_le()?;
    let total_entries = eocd.read_u16_le()?;
    let cd_size = eocd.read_u32_le()? as u64;
    let cd_offset = eocd.read_u32_le()? as u64;

    if disk_num != 0 || cd_disk != 0 {
        return Err(Error::NotSupported("multi-volume zip archive".into()));
    }
    let eocd_abs = scan_start + eocd_pos as u64;
    if cd_offset + cd_size > eocd_abs {
        return Err(Error::InvalidFormat(
            "central directory extends past its end record".into(),
        ));
    }
    Ok((cd_offset, cd_size, total_entries))
}

fn parse_central_directory(
    bytes: Vec<u8>,
    entry_count: u16,
    file_len: u64,
) -> Result<BTreeMap<String, Entry>> {
    let mut reader = RawData::from_bytes(bytes);
    let mut entries = BTreeMap::new();
    for _ in 0..entry_count {
        if reader.read_u32_le()? != CENTRAL_SIG {
            return Err(Error::InvalidFormat(
                "bad central directory record signature".into(),
            ));
        }
        reader.set_position(reader.position() + 4)?; // versions
        let flags = reader.read_u16_le()?;
        let method = reader.read_u16_le()?;
        reader.set_position(reader.position() + 4)?; // mod time/date
        let crc = reader.read_u32_le()?;
        let packed_len = reader.read_u32_le()? as u64;
        let unpacked_len = reader.read_u32_le()? as u64;
        let name_len = reader.read_u16_le()? as usize;
        let extra_len = reader.read_u16_le()? as u64;
        let comment_len = reader.read_u16_le()? as u64;
        reader.set_position(reader.position() + 8)?; // disk, attributes
        let local_offset = reader.read_u32_le()? as u64;
        let name = reader.read_string(name_len)?;
        reader.set_position(reader.position() + extra_len + comment_len)?;

        // Explicit directory entries carry no bytes; directories are
        // implied by file paths.
        if name.ends_with('/') {
            continue;
        }
        let path = VfsPath::new(&name)?;
        if path.is_root() {
            return Err(Error::InvalidFormat("empty entry name".into()));
        }
        if local_offset + LOCAL_HEADER_LEN + packed_len > file_len {
            return Err(Error::InvalidFormat(format!(
                "entry '{}' extends past end of archive",
                path
            )));
        }
        entries.insert(
            path.as_str().to_string(),
            Entry {
                method,
                flags,
                crc,
                packed_len,
                unpacked_len,
                local_offset,
            },
        );
    }
    Ok(entries)
}

impl VfsSource for ZipSource {
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
        if entry.flags & FLAG_ENCRYPTED != 0 {
            return Err(Error::NotSupported(format!(
                "encrypted zip entry '{}'",
                path
            )));
        }
        let data_offset = self.data_offset(entry)?;
        let source: Box<dyn crate::RawDataSource> = match entry.method {
            METHOD_STORE => {
                if entry.packed_len != entry.unpacked_len {
                    return Err(Error::InvalidFormat(format!(
                        "stored entry '{}' has mismatched lengths",
                        path
                    )));
                }
                Box::new(StoredEntrySource::new(
                    Arc::clone(&self.handle),
                    data_offset,
                    entry.unpacked_len,
                ))
            }
            METHOD_DEFLATE => Box::new(CompressedEntrySource::new(
                Arc::clone(&self.handle),
                data_offset,
                entry.packed_len,
                entry.unpacked_len,
                CompressionMethod::Deflate { crc: entry.crc },
            )),
            other => {
                return Err(Error::NotSupported(format!(
                    "zip compression method {} for entry '{}'",
                    other, path
                )));
            }
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

/// Detector and factory for Zip archives.
pub struct ZipProvider;

impl VfsSourceProvider for ZipProvider {
    fn name(&self) -> &'static str {
        "zip"
    }

    fn is_readable(&self, path: &Path) -> bool {
        // Local header of the first entry, or the EOCD of an empty archive.
        super::probe_magic(path, &[0x50, 0x4B, 0x03, 0x04])
            || super::probe_magic(path, EOCD_SIG)
    }

    fn create_source(&self, path: &Path) -> Result<Arc<dyn VfsSource>> {
        Ok(Arc::new(ZipSource::open(path)?))
    }
}
