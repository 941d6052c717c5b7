//! # devfs
//!
//! A device-routed virtual filesystem layer.
//!
//! Application code names every file as `device:/sub/path`. The device token
//! selects a mounted backend (removable media, a packaged asset store, a save
//! container) and the rest of the path is handed to that backend unchanged.
//! On top of the backends' raw offset-addressed primitives this crate adds
//! uniform handle semantics: cursors, mode checks, writes that grow the file,
//! line reads, sorted directory listings and recursive directory creation.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use devfs::{DevicePath, DeviceRegistry, Directory, File, MemoryBackend, OpenMode};
//! use std::sync::Arc;
//!
//! let registry = DeviceRegistry::new();
//! registry.mount("sdmc", Arc::new(MemoryBackend::new())).unwrap();
//!
//! registry.create_dir_all(&DevicePath::new("sdmc:/JKSV/Game")).unwrap();
//!
//! let mut file = File::open(&registry, "sdmc:/JKSV/Game/info.txt", OpenMode::WRITE, 0).unwrap();
//! file.writef(format_args!("slots: {}\n", 2)).unwrap();
//! file.close().unwrap();
//!
//! let dir = Directory::open(&registry, "sdmc:/JKSV/Game").unwrap();
//! assert_eq!(dir.name(0), "info.txt");
//! assert_eq!(dir.entry_path(0).as_str(), "sdmc:/JKSV/Game/info.txt");
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`DevicePath`] | Logical `device:/path` string with separator search helpers |
//! | [`DeviceRegistry`] | Device name to backend routing, plus path-based tree operations |
//! | [`File`] | Cursor-tracking file handle with mode-gated, auto-growing I/O |
//! | [`Directory`] | Sorted snapshot of a directory's entries |
//! | [`Storage`] | Clamped reader over a raw partition |
//! | [`FsError`] | Error type with path, operation and native result code |
//! | [`MemoryBackend`] | In-memory backend with failure injection |
//!
//! ---
//!
//! ## Backends
//!
//! ```text
//! Named:  FileBackend + DirBackend = Backend   -> DeviceRegistry::mount
//! Raw:    StorageBackend                       -> Storage::open
//! ```
//!
//! [`Backend`] has a blanket implementation. Implement the two component
//! traits and the type can be mounted.
//!
//! ---
//!
//! ## Error Handling
//!
//! Every fallible operation returns `Result<T, FsError>`. Errors carry their
//! own context, so there is no shared "last error" state to race on:
//!
//! ```rust
//! use devfs::{DeviceRegistry, File, OpenMode};
//!
//! let registry = DeviceRegistry::new();
//! let err = File::open(&registry, "save:/a.bin", OpenMode::READ, 0).unwrap_err();
//! assert_eq!(err.to_string(), "device not found: save");
//! ```
//!
//! ---
//!
//! ## Thread Safety
//!
//! Backend traits require `Send + Sync` and take `&self`. The registry guards
//! its table with an `RwLock`, so mounting and routing are safe from any
//! thread. Handles themselves are single-owner values.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for [`Config`], [`DirEntry`] and friends, plus `read_json` / `write_json` |

// Private modules
mod config;
mod directory;
mod error;
mod file;
mod memory;
mod path;
mod registry;
mod storage;
mod stream;
mod traits;
mod tree;
mod types;

#[cfg(feature = "serde")]
mod json;

// Public re-exports - error types
pub use error::{BackendResult, ErrorKind, FsError, ResultCode};

// Public re-exports - core types
pub use config::{Config, DEFAULT_FORMAT_BUFFER_SIZE};
pub use path::{DEVICE_SEPARATOR, DevicePath, PATH_SEPARATOR};
pub use types::{DirEntry, FileType, Handle, OpenMode, PartitionId, SeekOrigin};

// Public re-exports - backend traits
pub use traits::{Backend, DirBackend, FileBackend, StorageBackend};

// Public re-exports - routing and handles
pub use directory::Directory;
pub use file::File;
pub use registry::DeviceRegistry;
pub use storage::Storage;

// Public re-exports - reference backend
pub use memory::MemoryBackend;

// Conditional re-exports
#[cfg(feature = "serde")]
pub use json::{read_json, write_json};
