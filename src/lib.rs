//! A virtual file system for game assets.
//!
//! `assetfs` unifies host directories, Zip archives, and two generations of
//! legacy DAT archives behind one read-only API. Stores are mounted into a
//! stack; lookups resolve against the most recent mount holding the path,
//! so patch archives shadow base data file by file. Every open yields a
//! [`RawData`] handle, a bounded cursor with the endian helpers asset
//! loaders need, regardless of which store the bytes came from or whether
//! they were compressed on disk.
//!
//! # Quick start
//!
//! ```no_run
//! use assetfs::Vfs;
//!
//! # fn main() -> assetfs::Result<()> {
//! let mut vfs = Vfs::with_default_providers();
//! vfs.mount("data/base.dat")?;
//! vfs.mount("mods/patch/")?;
//!
//! let mut map = vfs.open("maps/city.map")?;
//! let magic = map.read_u32_le()?;
//! let bytes = map.read_all()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Backing stores
//!
//! | Provider    | Detects                       | Compression        |
//! |-------------|-------------------------------|--------------------|
//! | `directory` | any host directory            | none               |
//! | `zip`       | `PK` local header or EOCD     | store, deflate     |
//! | `dat2`      | `DAT2` signature              | store, legacy LZSS |
//! | `dat1`      | `DAT1` signature              | none               |
//!
//! Custom formats plug in by implementing [`VfsSource`] and
//! [`VfsSourceProvider`] and registering the provider with
//! [`Vfs::register_provider`].
//!
//! # Feature flags
//!
//! - `zip` (default): Zip archive support via `flate2` and `crc32fast`.
//! - `regex`: pattern-filtered listing methods on [`Vfs`].

pub mod codec;
mod error;
mod path;
pub mod raw;
pub mod source;
mod vfs;

pub use codec::CompressionMethod;
pub use error::{Error, Result};
pub use path::VfsPath;
pub use raw::{MemorySource, RawData, RawDataSource};
pub use source::{VfsSource, VfsSourceProvider};
pub use vfs::{MountId, Vfs};
