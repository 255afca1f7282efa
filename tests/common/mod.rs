//! Shared fixture builders for the integration tests.
//!
//! Archives are built byte by byte so every test controls the exact
//! on-disk layout it exercises, including deliberately broken ones.

#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DAT1_MAGIC: &[u8; 4] = b"DAT1";
pub const DAT2_MAGIC: &[u8; 4] = b"DAT2";

pub const METHOD_STORE: u8 = 0;
pub const METHOD_LZSS: u8 = 1;

/// An LZSS stream decoding to 16 zero bytes: one literal zero followed by
/// a distance-1 length-15 back-reference.
pub const LZSS_SIXTEEN_ZEROS: &[u8] = &[0x01, 0x00, 0x00, 0x0C];

/// Builds a v1 archive from (name, payload) pairs.
pub fn build_dat1(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(DAT1_MAGIC);
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());

    let table_len: usize = 8 + entries
        .iter()
        .map(|(name, _)| 4 + name.len() + 8)
        .sum::<usize>();
    let mut records = Vec::new();
    let mut payload = Vec::new();
    for (name, data) in entries {
        records.extend_from_slice(&(name.len() as u32).to_le_bytes());
        records.extend_from_slice(name.as_bytes());
        records.extend_from_slice(&((table_len + payload.len()) as u32).to_le_bytes());
        records.extend_from_slice(&(data.len() as u32).to_le_bytes());
        payload.extend_from_slice(data);
    }
    out.extend_from_slice(&records);
    out.extend_from_slice(&payload);
    out
}

/// One entry for the v2 builder.
pub struct Dat2Entry<'a> {
    pub name: &'a str,
    pub method: u8,
    pub unpacked_len: u32,
    pub payload: &'a [u8],
}

impl<'a> Dat2Entry<'a> {
    /// A stored entry whose table lengths match the payload.
    pub fn stored(name: &'a str, payload: &'a [u8]) -> Self {
        Self {
            name,
            method: METHOD_STORE,
            unpacked_len: payload.len() as u32,
            payload,
        }
    }

    /// An LZSS entry: `payload` is the packed stream.
    pub fn lzss(name: &'a str, unpacked_len: u32, payload: &'a [u8]) -> Self {
        Self {
            name,
            method: METHOD_LZSS,
            unpacked_len,
            payload,
        }
    }
}

/// Builds a v2 archive from entry descriptions.
pub fn build_dat2(entries: &[Dat2Entry<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(DAT2_MAGIC);
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());

    let table_len: usize = 8 + entries
        .iter()
        .map(|e| 4 + e.name.len() + 13)
        .sum::<usize>();
    let mut records = Vec::new();
    let mut payload = Vec::new();
    for e in entries {
        records.extend_from_slice(&(e.name.len() as u32).to_le_bytes());
        records.extend_from_slice(e.name.as_bytes());
        records.push(e.method);
        records.extend_from_slice(&e.unpacked_len.to_le_bytes());
        records.extend_from_slice(&(e.payload.len() as u32).to_le_bytes());
        records.extend_from_slice(&((table_len + payload.len()) as u32).to_le_bytes());
        payload.extend_from_slice(e.payload);
    }
    out.extend_from_slice(&records);
    out.extend_from_slice(&payload);
    out
}

/// One entry for the zip builder.
pub struct ZipEntry<'a> {
    pub name: &'a str,
    /// 0 = store, 8 = deflate.
    pub method: u16,
    pub plain: &'a [u8],
}

/// Builds a minimal single-disk zip: local records, central directory,
/// end-of-central-directory record.
pub fn build_zip(entries: &[ZipEntry<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut centrals = Vec::new();
    for e in entries {
        let packed = if e.method == 8 {
            let mut enc =
                flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
            enc.write_all(e.plain).unwrap();
            enc.finish().unwrap()
        } else {
            e.plain.to_vec()
        };
        let crc = crc32fast::hash(e.plain);
        let local_offset = out.len() as u32;

        out.extend_from_slice(&[0x50, 0x4B, 0x03, 0x04]);
        out.extend_from_slice(&20u16.to_le_bytes()); // version needed
        out.extend_from_slice(&0u16.to_le_bytes()); // flags
        out.extend_from_slice(&e.method.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]); // time/date
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&(packed.len() as u32).to_le_bytes());
        out.extend_from_slice(&(e.plain.len() as u32).to_le_bytes());
        out.extend_from_slice(&(e.name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // extra
        out.extend_from_slice(e.name.as_bytes());
        out.extend_from_slice(&packed);

        centrals.extend_from_slice(&[0x50, 0x4B, 0x01, 0x02]);
        centrals.extend_from_slice(&20u16.to_le_bytes()); // version made by
        centrals.extend_from_slice(&20u16.to_le_bytes()); // version needed
        centrals.extend_from_slice(&0u16.to_le_bytes()); // flags
        centrals.extend_from_slice(&e.method.to_le_bytes());
        centrals.extend_from_slice(&[0u8; 4]); // time/date
        centrals.extend_from_slice(&crc.to_le_bytes());
        centrals.extend_from_slice(&(packed.len() as u32).to_le_bytes());
        centrals.extend_from_slice(&(e.plain.len() as u32).to_le_bytes());
        centrals.extend_from_slice(&(e.name.len() as u16).to_le_bytes());
        centrals.extend_from_slice(&0u16.to_le_bytes()); // extra
        centrals.extend_from_slice(&0u16.to_le_bytes()); // comment
        centrals.extend_from_slice(&0u16.to_le_bytes()); // disk
        centrals.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
        centrals.extend_from_slice(&0u32.to_le_bytes()); // external attrs
        centrals.extend_from_slice(&local_offset.to_le_bytes());
        centrals.extend_from_slice(e.name.as_bytes());
    }

    let cd_offset = out.len() as u32;
    out.extend_from_slice(&centrals);
    out.extend_from_slice(&[0x50, 0x4B, 0x05, 0x06]);
    out.extend_from_slice(&0u16.to_le_bytes()); // disk
    out.extend_from_slice(&0u16.to_le_bytes()); // central directory disk
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(centrals.len() as u32).to_le_bytes());
    out.extend_from_slice(&cd_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // comment length
    out
}

/// Writes `bytes` to `name` under a fresh temp directory.
pub fn write_archive(name: &str, bytes: &[u8]) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    fs::File::create(&path).unwrap().write_all(bytes).unwrap();
    (dir, path)
}

/// Populates a fresh temp directory with the given relative files.
pub fn write_tree(files: &[(&str, &[u8])]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, bytes) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::File::create(&path).unwrap().write_all(bytes).unwrap();
    }
    dir
}

/// Writes `bytes` to `name` inside an existing directory.
pub fn write_file_in(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::File::create(&path).unwrap().write_all(bytes).unwrap();
    path
}
