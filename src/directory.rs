//! # Directory Listings
//!
//! [`Directory`] is a snapshot: [`open`](Directory::open) drains the
//! backend's directory stream one entry at a time, closes the stream, and
//! sorts what it read. Later changes on the backend are not reflected; open
//! the directory again to see them.
//!
//! ## Ordering
//!
//! Directories come before files. Within each group names compare code unit
//! by code unit with ASCII case folded, and a name sorts before any longer
//! name it is a prefix of. Names that compare equal keep their backend
//! order.
//!
//! ```rust
//! use devfs::{DeviceRegistry, Directory, MemoryBackend};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(MemoryBackend::new());
//! backend.insert_file("/b.txt", vec![]);
//! backend.insert_file("/A.txt", vec![]);
//! backend.insert_file("/saves/slot0", vec![]);
//!
//! let registry = DeviceRegistry::new();
//! registry.mount("sdmc", backend).unwrap();
//!
//! let dir = Directory::open(&registry, "sdmc:/").unwrap();
//! let names: Vec<String> = (0..dir.len()).map(|i| dir.name(i)).collect();
//! assert_eq!(names, ["saves", "A.txt", "b.txt"]);
//! ```

use std::cmp::Ordering;
use std::ops::Index;

use tracing::{debug, warn};

use crate::{Backend, DevicePath, DeviceRegistry, DirEntry, FsError, Handle};

/// Open backend directory stream, closed on drop.
struct DirStream<'a> {
    backend: &'a dyn Backend,
    handle: Handle,
    path: &'a DevicePath,
}

impl Drop for DirStream<'_> {
    fn drop(&mut self) {
        if let Err(code) = self.backend.close_dir(self.handle) {
            warn!(path = %self.path, %code, "failed to close directory stream");
        }
    }
}

fn fold_ascii(unit: u16) -> u16 {
    match u8::try_from(unit) {
        Ok(byte) => u16::from(byte.to_ascii_lowercase()),
        Err(_) => unit,
    }
}

/// Directories first, then names by (optionally case-folded) code units.
pub(crate) fn compare_entries(a: &DirEntry, b: &DirEntry, fold_case: bool) -> Ordering {
    b.is_directory.cmp(&a.is_directory).then_with(|| {
        if fold_case {
            a.name
                .iter()
                .map(|&unit| fold_ascii(unit))
                .cmp(b.name.iter().map(|&unit| fold_ascii(unit)))
        } else {
            a.name.cmp(&b.name)
        }
    })
}

/// A sorted snapshot of one directory's entries.
#[derive(Debug, Clone)]
pub struct Directory {
    path: DevicePath,
    entries: Vec<DirEntry>,
}

impl Directory {
    /// Enumerate the directory at `path`.
    ///
    /// A backend failure while reading entries ends the enumeration early;
    /// the entries read so far are kept.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `path` has no device prefix
    /// - [`FsError::DeviceNotFound`] if the device is not mounted
    /// - [`FsError::Backend`] if the directory cannot be opened
    pub fn open(registry: &DeviceRegistry, path: impl Into<DevicePath>) -> Result<Directory, FsError> {
        let path = path.into();
        let (backend, sub_path) = registry.route(&path)?;

        let handle = backend
            .open_dir(sub_path)
            .map_err(|code| FsError::backend("open_dir", &path, code))?;

        let mut entries = Vec::new();
        {
            let stream = DirStream {
                backend: backend.as_ref(),
                handle,
                path: &path,
            };
            loop {
                match stream.backend.read_dir_entry(stream.handle) {
                    Ok(Some(entry)) => entries.push(entry),
                    Ok(None) => break,
                    Err(code) => {
                        warn!(%path, %code, read = entries.len(), "directory enumeration stopped early");
                        break;
                    }
                }
            }
        }

        let fold_case = registry.config().fold_case_in_sort;
        entries.sort_by(|a, b| compare_entries(a, b, fold_case));
        debug!(%path, entries = entries.len(), "enumerated directory");

        Ok(Directory { path, entries })
    }

    /// The directory's logical path.
    #[inline]
    pub fn path(&self) -> &DevicePath {
        &self.path
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the directory had no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in sorted order.
    #[inline]
    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    /// Entry at `index`, or `None` if out of range.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&DirEntry> {
        self.entries.get(index)
    }

    /// Iterate over entries in sorted order.
    pub fn iter(&self) -> std::slice::Iter<'_, DirEntry> {
        self.entries.iter()
    }

    /// Whether the entry at `index` is a directory.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`, as do the other index accessors.
    pub fn is_directory(&self, index: usize) -> bool {
        self.entries[index].is_directory
    }

    /// Entry name in native UTF-16.
    pub fn name_utf16(&self, index: usize) -> &[u16] {
        &self.entries[index].name
    }

    /// Entry name in UTF-8.
    pub fn name(&self, index: usize) -> String {
        self.entries[index].name_utf8()
    }

    /// Full logical path of the entry in UTF-16.
    pub fn entry_path_utf16(&self, index: usize) -> Vec<u16> {
        let mut path: Vec<u16> = self.path.as_str().encode_utf16().collect();
        if !self.path.as_str().ends_with(crate::path::PATH_SEPARATOR) {
            path.push(u16::from(b'/'));
        }
        path.extend_from_slice(&self.entries[index].name);
        path
    }

    /// Full logical path of the entry.
    pub fn entry_path(&self, index: usize) -> DevicePath {
        self.path.join(&self.name(index))
    }
}

impl Index<usize> for Directory {
    type Output = DirEntry;

    fn index(&self, index: usize) -> &DirEntry {
        &self.entries[index]
    }
}

impl<'a> IntoIterator for &'a Directory {
    type Item = &'a DirEntry;
    type IntoIter = std::slice::Iter<'a, DirEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
