//! Mounted backing stores and their format providers.
//!
//! A [`VfsSource`] is one mounted store (a directory tree, a Zip file, or
//! one legacy archive) with its own immutable path index built at mount
//! time. A [`VfsSourceProvider`] pairs a cheap format probe with a factory;
//! the [`Vfs`](crate::Vfs) runs registered providers in order and the first
//! positive probe constructs the source.

mod dat1;
mod dat2;
mod directory;
#[cfg(feature = "zip")]
mod zip;

pub use dat1::{Dat1Provider, Dat1Source};
pub use dat2::{Dat2Provider, Dat2Source};
pub use directory::{DirectoryProvider, DirectorySource};
#[cfg(feature = "zip")]
pub use zip::{ZipProvider, ZipSource};

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::raw::RawData;
use crate::{Error, Result, VfsPath};

/// One mounted backing store.
///
/// The index is built once while mounting and immutable thereafter; all
/// query methods take `&self` and are safe to call concurrently.
pub trait VfsSource: Send + Sync {
    /// The mount origin: the path this source was created from.
    fn origin(&self) -> &str;

    /// Returns `true` if `path` names a file in this source's index.
    fn file_exists(&self, path: &VfsPath) -> bool;

    /// Opens `path` as a [`RawData`].
    ///
    /// Fails with [`Error::NotFound`] if the path is absent from the index.
    fn open(&self, path: &VfsPath) -> Result<RawData>;

    /// The immediate file children of `dir`, duplicate-free.
    fn list_files(&self, dir: &VfsPath) -> BTreeSet<String>;

    /// The immediate subdirectory children of `dir`, duplicate-free.
    fn list_directories(&self, dir: &VfsPath) -> BTreeSet<String>;
}

/// Format detector and factory for one kind of backing store.
pub trait VfsSourceProvider: Send + Sync {
    /// Stable identifier used for diagnostics, not for matching.
    fn name(&self) -> &'static str;

    /// Cheap, non-exclusive probe: can this provider open `path`?
    ///
    /// Peeks at a magic number or file metadata. Never fails for malformed
    /// input; it returns `false` and leaves hard failures to
    /// [`create_source`](Self::create_source).
    fn is_readable(&self, path: &Path) -> bool;

    /// Constructs the source. Invoked only after [`is_readable`]
    /// (Self::is_readable) returned `true` for the same input.
    ///
    /// Fails with [`Error::CannotOpenFile`] if the underlying open fails
    /// despite the probe having passed, or [`Error::InvalidFormat`] if the
    /// table parse fails.
    fn create_source(&self, path: &Path) -> Result<Arc<dyn VfsSource>>;
}

/// Returns `true` if the file at `path` starts with `magic`.
///
/// Any I/O failure reads as "no": probes classify, they never error.
pub(crate) fn probe_magic(path: &Path, magic: &[u8]) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut buf = vec![0u8; magic.len()];
    file.read_exact(&mut buf).is_ok() && buf == magic
}

/// Collects the immediate children of `dir` from an index's path set.
///
/// `paths` yields every normalized file path in the index; with
/// `want_dirs` the result holds subdirectory names instead of file names.
pub(crate) fn list_children<'a>(
    paths: impl Iterator<Item = &'a str>,
    dir: &VfsPath,
    want_dirs: bool,
) -> BTreeSet<String> {
    let prefix = if dir.is_root() {
        String::new()
    } else {
        format!("{}/", dir.as_str())
    };

    let mut children = BTreeSet::new();
    for path in paths {
        let Some(rest) = path.strip_prefix(prefix.as_str()) else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        match rest.find('/') {
            Some(idx) => {
                if want_dirs {
                    children.insert(rest[..idx].to_string());
                }
            }
            None => {
                if !want_dirs {
                    children.insert(rest.to_string());
                }
            }
        }
    }
    children
}

/// Sequential reader for archive directory tables.
///
/// Maps a short read to [`Error::InvalidFormat`] (truncated table) and any
/// other I/O failure to [`Error::CannotOpenFile`] against the archive's
/// origin path.
pub(crate) struct TableReader<R> {
    inner: R,
    origin: String,
}

impl<R: Read> TableReader<R> {
    pub(crate) fn new(inner: R, origin: impl Into<String>) -> Self {
        Self {
            inner,
            origin: origin.into(),
        }
    }

    pub(crate) fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::InvalidFormat("truncated directory table".into())
            } else {
                Error::cannot_open(self.origin.clone(), e)
            }
        })
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        let mut b = [0u8; 1];
        self.fill(&mut b)?;
        Ok(b[0])
    }

    pub(crate) fn read_u32_le(&mut self) -> Result<u32> {
        let mut b = [0u8; 4];
        self.fill(&mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| Error::OutOfMemory { requested: len })?;
        buf.resize(len, 0);
        self.fill(&mut buf)?;
        Ok(buf)
    }

    pub(crate) fn read_string(&mut self, len: usize) -> Result<String> {
        String::from_utf8(self.read_bytes(len)?)
            .map_err(|_| Error::InvalidFormat("entry name is not valid UTF-8".into()))
    }
}
