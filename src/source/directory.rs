//! Host-directory backing store.
//!
//! The subtree under the mount point is walked once at mount time; the
//! resulting index maps logical paths 1:1 onto real files. Opens go
//! straight to a whole-file window over the file, read on demand.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};
use walkdir::WalkDir;

use super::{VfsSource, VfsSourceProvider, list_children};
use crate::raw::{ArchiveHandle, RawData, StoredEntrySource};
use crate::{Error, Result, VfsPath};

/// A mounted host directory tree.
pub struct DirectorySource {
    origin: String,
    root: PathBuf,
    // Normalized logical paths of every regular file under the root.
    index: BTreeSet<String>,
}

impl DirectorySource {
    /// Walks the subtree at `root` and builds the index.
    ///
    /// Entries whose names are not valid UTF-8 are skipped with a warning;
    /// a failure to read the directory itself aborts the mount with
    /// [`Error::CannotOpenFile`].
    pub fn open(root: &Path) -> Result<Self> {
        let origin = root.display().to_string();
        let mut index = BTreeSet::new();
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|e| {
                let io = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("walk failed"));
                Error::cannot_open(origin.clone(), io)
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            // Relative path below the mount root, in logical form.
            let Ok(rel) = entry.path().strip_prefix(root) else {
                continue;
            };
            let Some(rel) = rel.to_str() else {
                warn!("skipping non-UTF-8 name under '{}'", origin);
                continue;
            };
            let logical = rel.replace(std::path::MAIN_SEPARATOR, "/");
            match VfsPath::new(&logical) {
                Ok(path) if !path.is_root() => {
                    index.insert(path.as_str().to_string());
                }
                _ => warn!("skipping unrepresentable path '{}' under '{}'", rel, origin),
            }
        }

        debug!("mounted directory '{}': {} files", origin, index.len());
        Ok(Self {
            origin,
            root: root.to_path_buf(),
            index,
        })
    }
}

impl VfsSource for DirectorySource {
    fn origin(&self) -> &str {
        &self.origin
    }

    fn file_exists(&self, path: &VfsPath) -> bool {
        self.index.contains(path.as_str())
    }

    fn open(&self, path: &VfsPath) -> Result<RawData> {
        if !self.index.contains(path.as_str()) {
            return Err(Error::not_found(path.as_str()));
        }
        let host_path = self.root.join(path.as_str());
        let handle = Arc::new(ArchiveHandle::open(&host_path)?);
        let len = handle.len();
        Ok(RawData::new(Box::new(StoredEntrySource::new(
            handle, 0, len,
        ))))
    }

    fn list_files(&self, dir: &VfsPath) -> BTreeSet<String> {
        list_children(self.index.iter().map(String::as_str), dir, false)
    }

    fn list_directories(&self, dir: &VfsPath) -> BTreeSet<String> {
        list_children(self.index.iter().map(String::as_str), dir, true)
    }
}

/// Detector and factory for host directories.
pub struct DirectoryProvider;

impl VfsSourceProvider for DirectoryProvider {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn is_readable(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_source(&self, path: &Path) -> Result<Arc<dyn VfsSource>> {
        Ok(Arc::new(DirectorySource::open(path)?))
    }
}
