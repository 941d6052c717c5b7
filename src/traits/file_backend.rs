//! Named file primitives a backend provides.

use crate::{BackendResult, Handle, OpenMode};

/// File primitives of a mounted backend.
///
/// Paths are backend-relative sub-paths (`/a/b.txt`), never logical
/// `device:/` paths; routing happens before the backend is called.
///
/// Reads and writes are offset-addressed. The backend keeps no cursor; the
/// [`File`](crate::File) handle supplies the offset on every call.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// a backend to be shared by many handles.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FileBackend`.
pub trait FileBackend: Send + Sync {
    /// Open an existing file.
    fn open_file(&self, path: &str, mode: OpenMode) -> BackendResult<Handle>;

    /// Release a file handle.
    fn close_file(&self, handle: Handle) -> BackendResult<()>;

    /// Read up to `buf.len()` bytes at `offset`, returning the count read.
    fn read_at(&self, handle: Handle, offset: u64, buf: &mut [u8]) -> BackendResult<usize>;

    /// Write `data` at `offset`, returning the count written.
    ///
    /// The file must already be large enough; backends are not required to
    /// grow files on write.
    fn write_at(&self, handle: Handle, offset: u64, data: &[u8]) -> BackendResult<usize>;

    /// Current size of the file in bytes.
    fn file_size(&self, handle: Handle) -> BackendResult<u64>;

    /// Grow or shrink the file to exactly `size` bytes.
    fn set_file_size(&self, handle: Handle, size: u64) -> BackendResult<()>;

    /// Commit buffered writes.
    fn flush(&self, handle: Handle) -> BackendResult<()>;

    /// Create a zero-filled file of `size` bytes.
    fn create_file(&self, path: &str, size: u64) -> BackendResult<()>;

    /// Delete a file.
    fn remove_file(&self, path: &str) -> BackendResult<()>;

    /// Rename a file within this backend.
    fn rename_file(&self, from: &str, to: &str) -> BackendResult<()>;

    /// Returns `true` if a file exists at `path`.
    fn file_exists(&self, path: &str) -> bool;
}
