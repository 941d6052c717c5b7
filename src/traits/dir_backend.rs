//! Directory primitives a backend provides.

use crate::{BackendResult, DirEntry, Handle};

/// Directory primitives of a mounted backend.
///
/// Enumeration is one entry per call: backends are not required to report
/// an entry count up front.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`.
pub trait DirBackend: Send + Sync {
    /// Open a directory stream.
    fn open_dir(&self, path: &str) -> BackendResult<Handle>;

    /// Read the next entry. `Ok(None)` marks the end of the stream.
    fn read_dir_entry(&self, handle: Handle) -> BackendResult<Option<DirEntry>>;

    /// Release a directory stream.
    fn close_dir(&self, handle: Handle) -> BackendResult<()>;

    /// Create a directory. The parent must exist.
    fn create_dir(&self, path: &str) -> BackendResult<()>;

    /// Remove an empty directory.
    fn remove_dir(&self, path: &str) -> BackendResult<()>;

    /// Remove a directory and everything below it.
    fn remove_dir_all(&self, path: &str) -> BackendResult<()>;

    /// Rename a directory within this backend.
    fn rename_dir(&self, from: &str, to: &str) -> BackendResult<()>;

    /// Returns `true` if a directory exists at `path`.
    fn dir_exists(&self, path: &str) -> bool;
}
