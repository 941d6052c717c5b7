//! # Backend Traits
//!
//! The boundary between this layer and the storage it routes to.
//!
//! ## Backend Kinds
//!
//! ```text
//! Named backends:  FileBackend + DirBackend = Backend   (mounted by device name)
//! Raw partitions:  StorageBackend                       (opened by PartitionId)
//! ```
//!
//! | Trait | Primitives | Used by |
//! |-------|------------|---------|
//! | [`FileBackend`] | open/close, `read_at`/`write_at`, size, flush, create/remove | [`File`](crate::File), file tree operations |
//! | [`DirBackend`] | entry-at-a-time enumeration, create/remove/rename | [`Directory`](crate::Directory), directory tree operations |
//! | [`StorageBackend`] | open by id, size, read | [`Storage`](crate::Storage) |
//!
//! Every primitive reports failure as a native [`ResultCode`](crate::ResultCode);
//! the handles add path and operation context.
//!
//! ## Blanket Implementation
//!
//! [`Backend`] is implemented for anything implementing both named traits.
//! Implement [`FileBackend`] and [`DirBackend`] and the type can be mounted.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync` and take `&self`, so one backend can be
//! shared by every handle routed to it.

mod dir_backend;
mod file_backend;
mod storage_backend;

pub use dir_backend::DirBackend;
pub use file_backend::FileBackend;
pub use storage_backend::StorageBackend;

/// A mountable named backend.
///
/// Automatically implemented for any type implementing [`FileBackend`] and
/// [`DirBackend`]; never implement it directly.
pub trait Backend: FileBackend + DirBackend {}

impl<T: FileBackend + DirBackend> Backend for T {}
