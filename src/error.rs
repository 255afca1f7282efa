//! Error types for VFS operations.
//!
//! This module provides the [`Error`] enum which represents all possible
//! failure modes when mounting backing stores and reading assets through
//! the VFS, along with a convenient [`Result<T>`] type alias.
//!
//! # Error Handling
//!
//! All fallible operations in this crate return `Result<T, Error>`. You can
//! handle errors using pattern matching or the `?` operator:
//!
//! ```rust,no_run
//! use assetfs::{Vfs, Result};
//!
//! fn load_palette(vfs: &Vfs) -> Result<Vec<u8>> {
//!     let mut data = vfs.open("color.pal")?;
//!     data.read_all()
//! }
//! ```
//!
//! # Propagation Policy
//!
//! Parse errors during [`Vfs::mount`] abort the mount attempt entirely; a
//! partially built source is never registered. Read errors are returned to
//! the immediate caller and never mask as empty data: a truncated or
//! corrupt entry fails loudly rather than returning zero-filled bytes.
//! No automatic retry exists anywhere in this crate.
//!
//! [`Vfs::mount`]: crate::Vfs::mount

use std::io;

/// The main error type for VFS operations.
///
/// Each variant includes relevant context to help diagnose the issue.
///
/// # Error Categories
///
/// | Category | Variant | Typical Cause |
/// |----------|---------|---------------|
/// | Resolution | [`NotFound`][Self::NotFound] | Path absent from every mounted source |
/// | I/O | [`CannotOpenFile`][Self::CannotOpenFile] | Backing store unreadable despite passing detection |
/// | Format | [`InvalidFormat`][Self::InvalidFormat] | Bad signature, truncated table, corrupt stream, malformed path |
/// | Bounds | [`OutOfRange`][Self::OutOfRange] | Read request exceeds a source's size |
/// | Detection | [`NotSupported`][Self::NotSupported] | No registered provider claims a candidate file |
/// | Resources | [`OutOfMemory`][Self::OutOfMemory] | Allocation failure while materializing a buffer |
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The path is absent from every mounted source, or from one source's
    /// index when querying a source directly.
    #[error("not found: {path}")]
    NotFound {
        /// The logical path that could not be resolved.
        path: String,
    },

    /// The backing store could not be opened or read.
    ///
    /// Returned when an open or read against the underlying storage fails
    /// despite the provider's probe having passed, e.g. permissions, or
    /// truncation discovered only during the full parse.
    #[error("cannot open '{path}': {source}")]
    CannotOpenFile {
        /// The file or directory that failed to open.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The archive format is invalid or corrupt.
    ///
    /// Covers header signature mismatches, truncated directory tables,
    /// truncated or over-length LZSS streams, CRC mismatches, and malformed
    /// logical paths (`.`/`..` segments).
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// A read request exceeds the source's size.
    ///
    /// Reads never silently truncate: `offset + len > size` fails with this
    /// error instead of returning partial bytes.
    #[error("read out of range: offset {offset} + len {len} exceeds size {size}")]
    OutOfRange {
        /// Requested start offset in source coordinates.
        offset: u64,
        /// Requested length in bytes.
        len: u64,
        /// Total size of the source.
        size: u64,
    },

    /// The operation is not supported.
    ///
    /// Returned when no registered provider claims a candidate file during
    /// [`Vfs::mount`], or when an archive entry uses a compression method
    /// this build cannot decode.
    ///
    /// [`Vfs::mount`]: crate::Vfs::mount
    #[error("not supported: {0}")]
    NotSupported(String),

    /// An allocation failed while materializing a decompressed buffer or
    /// directory index.
    #[error("out of memory: failed to allocate {requested} bytes")]
    OutOfMemory {
        /// The number of bytes that could not be allocated.
        requested: usize,
    },
}

impl Error {
    /// Creates a `NotFound` error for the given logical path.
    pub fn not_found(path: impl Into<String>) -> Self {
        Error::NotFound { path: path.into() }
    }

    /// Creates a `CannotOpenFile` error wrapping an I/O failure.
    pub fn cannot_open(path: impl Into<String>, source: io::Error) -> Self {
        Error::CannotOpenFile {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this error indicates the archive data itself is
    /// invalid or corrupt, as opposed to a resolution or I/O failure.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::InvalidFormat(_))
    }

    /// Returns `true` if this is a resolution failure (path not found).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// A specialized Result type for VFS operations.
pub type Result<T> = std::result::Result<T, Error>;
