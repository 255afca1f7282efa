//! Logical path type with validation and normalization.
//!
//! Every path handed to the VFS is validated once, up front, before any
//! source resolution happens. This keeps `.`/`..` traversal segments out of
//! archive indexes and prevents a logical path from escaping a mount's
//! subtree.

use crate::{Error, Result};
use std::fmt;

/// Maximum length for logical paths (in bytes).
///
/// A limit well above any reasonable file system path keeps a malicious
/// archive from forcing huge allocations through its name table.
const MAX_PATH_LENGTH: usize = 32768;

/// A validated, normalized logical path inside the VFS.
///
/// Paths are case-sensitive and use `/` as the separator. During
/// construction the following normalization is applied:
///
/// - a leading `/` is stripped (so `"/a.bin"` and `"a.bin"` are the same
///   logical path),
/// - a leading `./` is stripped,
/// - a single trailing `/` is stripped (directory listings accept either
///   form).
///
/// Validation rejects, with [`Error::InvalidFormat`]:
///
/// - NUL bytes,
/// - empty segments (`a//b`),
/// - `.` or `..` segments (path traversal).
///
/// The empty path denotes the root directory; it is valid for listing
/// operations and simply never matches a file on `open`.
///
/// # Examples
///
/// ```
/// use assetfs::VfsPath;
///
/// let p = VfsPath::new("/maps/arcaves.map").unwrap();
/// assert_eq!(p.as_str(), "maps/arcaves.map");
///
/// assert!(VfsPath::new("../escape").is_err());
/// assert!(VfsPath::new("a//b").is_err());
///
/// let root = VfsPath::new("/").unwrap();
/// assert!(root.is_root());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VfsPath(String);

impl VfsPath {
    /// Creates a new `VfsPath`, normalizing and validating the input.
    pub fn new(s: &str) -> Result<Self> {
        let normalized = Self::normalize(s);
        Self::validate(normalized)?;
        Ok(Self(normalized.to_string()))
    }

    /// The root directory path.
    pub fn root() -> Self {
        Self(String::new())
    }

    fn normalize(s: &str) -> &str {
        let mut s = s.strip_prefix("./").unwrap_or(s);
        s = s.strip_prefix('/').unwrap_or(s);
        s.strip_suffix('/').unwrap_or(s)
    }

    fn validate(s: &str) -> Result<()> {
        if s.contains('\0') {
            return Err(Error::InvalidFormat("path contains NUL byte".into()));
        }
        if s.len() > MAX_PATH_LENGTH {
            return Err(Error::InvalidFormat(format!(
                "path exceeds maximum length of {} bytes",
                MAX_PATH_LENGTH
            )));
        }
        if s.is_empty() {
            // Root: valid for listing.
            return Ok(());
        }
        for segment in s.split('/') {
            if segment.is_empty() {
                return Err(Error::InvalidFormat(
                    "empty path segment (consecutive slashes)".into(),
                ));
            }
            if segment == "." || segment == ".." {
                return Err(Error::InvalidFormat(format!(
                    "'{}' segment not allowed (path traversal)",
                    segment
                )));
            }
        }
        Ok(())
    }

    /// Returns the path as a string slice (empty string for the root).
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this path denotes the root directory.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the parent directory of this path.
    ///
    /// Returns `None` for the root; a single-segment path's parent is the
    /// root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => Some(Self::root()),
        }
    }

    /// Returns the file name (last segment) of this path, or `None` for the
    /// root.
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        Some(self.0.rsplit('/').next().unwrap_or(&self.0))
    }
}

impl fmt::Display for VfsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl AsRef<str> for VfsPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
