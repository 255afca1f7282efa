//! The virtual file system façade.
//!
//! A [`Vfs`] owns an ordered list of format providers and a stack of
//! mounted sources. Mounting probes the providers in registration order
//! and the first positive probe constructs the source; lookups scan the
//! mount stack most-recent-first, so a later mount shadows earlier ones
//! path by path. Listings are the union across all mounts.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info};

use crate::raw::RawData;
use crate::source::{Dat1Provider, Dat2Provider, DirectoryProvider, VfsSource, VfsSourceProvider};
#[cfg(feature = "zip")]
use crate::source::ZipProvider;
use crate::{Error, Result, VfsPath};

/// Identifies one mounted source for later unmounting.
///
/// Ids are never reused within a single `Vfs`, so a stale id after an
/// unmount fails cleanly instead of hitting an unrelated mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MountId(u64);

struct Mount {
    id: MountId,
    source: Arc<dyn VfsSource>,
}

/// The virtual file system.
///
/// ```no_run
/// use assetfs::Vfs;
///
/// # fn main() -> assetfs::Result<()> {
/// let mut vfs = Vfs::with_default_providers();
/// vfs.mount("assets/")?;
/// let patch = vfs.mount("patch.dat")?;
/// let mut data = vfs.open("maps/city.map")?;
/// let bytes = data.read_all()?;
/// vfs.unmount(patch)?;
/// # Ok(())
/// # }
/// ```
pub struct Vfs {
    providers: Vec<Box<dyn VfsSourceProvider>>,
    mounts: Vec<Mount>,
    next_id: u64,
}

impl Vfs {
    /// Creates a `Vfs` with no providers registered.
    ///
    /// Every [`mount`](Self::mount) will fail with [`Error::NotSupported`]
    /// until at least one provider is registered.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            mounts: Vec::new(),
            next_id: 0,
        }
    }

    /// Creates a `Vfs` with the built-in providers registered.
    ///
    /// Registration order fixes probe order: directories, then Zip, then
    /// the legacy v2 and v1 archive formats.
    pub fn with_default_providers() -> Self {
        let mut vfs = Self::new();
        vfs.register_provider(Box::new(DirectoryProvider));
        #[cfg(feature = "zip")]
        vfs.register_provider(Box::new(ZipProvider));
        vfs.register_provider(Box::new(Dat2Provider));
        vfs.register_provider(Box::new(Dat1Provider));
        vfs
    }

    /// Appends `provider` to the probe order.
    pub fn register_provider(&mut self, provider: Box<dyn VfsSourceProvider>) {
        debug!("registered provider '{}'", provider.name());
        self.providers.push(provider);
    }

    /// Mounts the store at `path`, pushing it on top of the mount stack.
    ///
    /// Providers are probed in registration order and the first positive
    /// probe constructs the source. Fails with [`Error::NotSupported`] when
    /// no provider recognizes `path`; a failed construction propagates the
    /// provider's error. Either way a failure leaves the mount stack
    /// untouched.
    pub fn mount(&mut self, path: impl AsRef<Path>) -> Result<MountId> {
        let path = path.as_ref();
        for provider in &self.providers {
            if !provider.is_readable(path) {
                continue;
            }
            let source = provider.create_source(path)?;
            let id = MountId(self.next_id);
            self.next_id += 1;
            info!(
                "mounted '{}' via provider '{}'",
                source.origin(),
                provider.name()
            );
            self.mounts.push(Mount { id, source });
            return Ok(id);
        }
        Err(Error::NotSupported(format!(
            "no provider recognizes '{}'",
            path.display()
        )))
    }

    /// Removes the mount identified by `id`.
    ///
    /// Fails with [`Error::NotFound`] if `id` does not name a current
    /// mount. `RawData` handles opened from the source stay readable; the
    /// backing file is kept alive until the last one is dropped.
    pub fn unmount(&mut self, id: MountId) -> Result<()> {
        let idx = self
            .mounts
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| Error::not_found(format!("mount #{}", id.0)))?;
        let mount = self.mounts.remove(idx);
        info!("unmounted '{}'", mount.source.origin());
        Ok(())
    }

    /// Number of current mounts.
    pub fn mount_count(&self) -> usize {
        self.mounts.len()
    }

    /// Returns `true` if some mount holds a file at `path`.
    ///
    /// A malformed path reads as absent rather than failing.
    pub fn exists(&self, path: &str) -> bool {
        let Ok(path) = VfsPath::new(path) else {
            return false;
        };
        self.mounts.iter().any(|m| m.source.file_exists(&path))
    }

    /// Opens `path` from the most recently mounted source that holds it.
    pub fn open(&self, path: &str) -> Result<RawData> {
        let parsed = VfsPath::new(path)?;
        for mount in self.mounts.iter().rev() {
            if mount.source.file_exists(&parsed) {
                return mount.source.open(&parsed);
            }
        }
        Err(Error::not_found(path))
    }

    /// The immediate file children of `dir`, unioned across all mounts.
    pub fn list_files(&self, dir: &str) -> Result<BTreeSet<String>> {
        let dir = VfsPath::new(dir)?;
        let mut all = BTreeSet::new();
        for mount in &self.mounts {
            all.append(&mut mount.source.list_files(&dir));
        }
        Ok(all)
    }

    /// The immediate subdirectory children of `dir`, unioned across all
    /// mounts.
    pub fn list_directories(&self, dir: &str) -> Result<BTreeSet<String>> {
        let dir = VfsPath::new(dir)?;
        let mut all = BTreeSet::new();
        for mount in &self.mounts {
            all.append(&mut mount.source.list_directories(&dir));
        }
        Ok(all)
    }

    /// Like [`list_files`](Self::list_files), keeping only names that
    /// match `pattern`.
    #[cfg(feature = "regex")]
    pub fn list_files_matching(&self, dir: &str, pattern: &regex::Regex) -> Result<BTreeSet<String>> {
        let mut files = self.list_files(dir)?;
        files.retain(|name| pattern.is_match(name));
        Ok(files)
    }

    /// Like [`list_directories`](Self::list_directories), keeping only
    /// names that match `pattern`.
    #[cfg(feature = "regex")]
    pub fn list_directories_matching(
        &self,
        dir: &str,
        pattern: &regex::Regex,
    ) -> Result<BTreeSet<String>> {
        let mut dirs = self.list_directories(dir)?;
        dirs.retain(|name| pattern.is_match(name));
        Ok(dirs)
    }
}

impl Default for Vfs {
    fn default() -> Self {
        Self::with_default_providers()
    }
}
