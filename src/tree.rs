//! # Tree Operations
//!
//! Path-based create/remove/rename for directories and files.
//!
//! Each operation validates the path, resolves its device, then issues a
//! single backend call. [`DeviceRegistry::create_dir_all`] is the exception:
//! it walks the path's separators left to right and creates each missing
//! prefix, stopping at the first failure.
//!
//! ```rust
//! use devfs::{DevicePath, DeviceRegistry, MemoryBackend};
//! use std::sync::Arc;
//!
//! let registry = DeviceRegistry::new();
//! registry.mount("sdmc", Arc::new(MemoryBackend::new())).unwrap();
//!
//! let saves = DevicePath::new("sdmc:/JKSV/Game/Slot 1");
//! registry.create_dir_all(&saves).unwrap();
//! assert!(registry.dir_exists(&saves));
//! ```

use std::sync::Arc;

use tracing::trace;

use crate::path::PATH_SEPARATOR;
use crate::{Backend, DevicePath, DeviceRegistry, FsError};

impl DeviceRegistry {
    /// Both paths' sub-paths, provided they route to the same device.
    fn same_device<'p>(
        &self,
        operation: &'static str,
        from: &'p DevicePath,
        to: &'p DevicePath,
    ) -> Result<(Arc<dyn Backend>, &'p str, &'p str), FsError> {
        let (from_device, from_sub) = from.split()?;
        let (to_device, to_sub) = to.split()?;
        if from_device != to_device {
            return Err(FsError::CrossDevice {
                operation,
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        Ok((self.resolve(from_device)?, from_sub, to_sub))
    }

    // Directories

    /// Create one directory. The parent must exist.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] / [`FsError::DeviceNotFound`] on routing failure
    /// - [`FsError::Backend`] if the backend refuses
    pub fn create_dir(&self, path: &DevicePath) -> Result<(), FsError> {
        let (backend, sub_path) = self.route(path)?;
        backend
            .create_dir(sub_path)
            .map_err(|code| FsError::backend("create_dir", path, code))
    }

    /// Create `path` and every missing directory above it.
    ///
    /// Prefixes are visited left to right; existing ones are skipped. The
    /// first failed creation is returned and no deeper directory is
    /// attempted. Succeeds without backend writes if everything exists.
    pub fn create_dir_all(&self, path: &DevicePath) -> Result<(), FsError> {
        self.route(path)?;
        let Some(root) = path.find_first_of(PATH_SEPARATOR) else {
            return Err(FsError::InvalidPath {
                path: path.to_string(),
            });
        };

        let mut segment_start = root + 1;
        loop {
            let separator = path.find_next_of(segment_start, PATH_SEPARATOR);
            let prefix_end = separator.unwrap_or(path.len());
            if prefix_end > segment_start {
                let prefix = path.sub_range(0, prefix_end);
                if !self.dir_exists(&prefix) {
                    trace!(%prefix, "creating directory");
                    self.create_dir(&prefix)?;
                }
            }
            match separator {
                Some(position) => segment_start = position + 1,
                None => return Ok(()),
            }
        }
    }

    /// Remove an empty directory.
    pub fn remove_dir(&self, path: &DevicePath) -> Result<(), FsError> {
        let (backend, sub_path) = self.route(path)?;
        backend
            .remove_dir(sub_path)
            .map_err(|code| FsError::backend("remove_dir", path, code))
    }

    /// Remove a directory and everything below it.
    pub fn remove_dir_all(&self, path: &DevicePath) -> Result<(), FsError> {
        let (backend, sub_path) = self.route(path)?;
        backend
            .remove_dir_all(sub_path)
            .map_err(|code| FsError::backend("remove_dir_all", path, code))
    }

    /// Rename a directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::CrossDevice`] if the paths name different devices; no
    ///   backend is called
    pub fn rename_dir(&self, from: &DevicePath, to: &DevicePath) -> Result<(), FsError> {
        let (backend, from_sub, to_sub) = self.same_device("rename_dir", from, to)?;
        backend
            .rename_dir(from_sub, to_sub)
            .map_err(|code| FsError::backend("rename_dir", from, code))
    }

    /// Returns `true` if `path` names an existing directory.
    ///
    /// Invalid paths and unmounted devices report `false`.
    pub fn dir_exists(&self, path: &DevicePath) -> bool {
        self.route(path)
            .is_ok_and(|(backend, sub_path)| backend.dir_exists(sub_path))
    }

    // Files

    /// Create a zero-filled file of `size` bytes.
    pub fn create_file(&self, path: &DevicePath, size: u64) -> Result<(), FsError> {
        let (backend, sub_path) = self.route(path)?;
        backend
            .create_file(sub_path, size)
            .map_err(|code| FsError::backend("create_file", path, code))
    }

    /// Delete a file.
    pub fn remove_file(&self, path: &DevicePath) -> Result<(), FsError> {
        let (backend, sub_path) = self.route(path)?;
        backend
            .remove_file(sub_path)
            .map_err(|code| FsError::backend("remove_file", path, code))
    }

    /// Rename a file. Both paths must be on the same device.
    pub fn rename_file(&self, from: &DevicePath, to: &DevicePath) -> Result<(), FsError> {
        let (backend, from_sub, to_sub) = self.same_device("rename_file", from, to)?;
        backend
            .rename_file(from_sub, to_sub)
            .map_err(|code| FsError::backend("rename_file", from, code))
    }

    /// Returns `true` if `path` names an existing file.
    pub fn file_exists(&self, path: &DevicePath) -> bool {
        self.route(path)
            .is_ok_and(|(backend, sub_path)| backend.file_exists(sub_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DirBackend, ErrorKind, MemoryBackend, ResultCode};

    fn setup() -> (DeviceRegistry, Arc<MemoryBackend>) {
        let registry = DeviceRegistry::new();
        let backend = Arc::new(MemoryBackend::new());
        registry.mount("sdmc", backend.clone()).unwrap();
        (registry, backend)
    }

    fn path(s: &str) -> DevicePath {
        DevicePath::new(s)
    }

    #[test]
    fn create_dir_all_creates_each_level_in_order() {
        let (registry, backend) = setup();
        registry.create_dir_all(&path("sdmc:/a/b/c")).unwrap();
        assert_eq!(
            backend.journal(),
            vec!["create_dir /a", "create_dir /a/b", "create_dir /a/b/c"]
        );

        registry.create_dir_all(&path("sdmc:/a/b/c")).unwrap();
        assert_eq!(backend.journal().len(), 3);
    }

    #[test]
    fn create_dir_all_skips_existing_prefixes() {
        let (registry, backend) = setup();
        backend.create_dir("/a").unwrap();
        registry.create_dir_all(&path("sdmc:/a/b/")).unwrap();
        assert_eq!(backend.journal(), vec!["create_dir /a", "create_dir /a/b"]);
    }

    #[test]
    fn create_dir_all_tolerates_doubled_separators() {
        let (registry, backend) = setup();
        registry.create_dir_all(&path("sdmc:/a//b")).unwrap();
        assert!(backend.dir_exists("/a/b"));
    }

    #[test]
    fn create_dir_all_root_is_noop() {
        let (registry, backend) = setup();
        registry.create_dir_all(&path("sdmc:/")).unwrap();
        assert!(backend.journal().is_empty());
    }

    #[test]
    fn create_dir_all_stops_at_first_failure() {
        let (registry, backend) = setup();
        backend.insert_file("/a", vec![]);
        let err = registry.create_dir_all(&path("sdmc:/a/b/c")).unwrap_err();
        assert_eq!(err.code(), Some(MemoryBackend::ALREADY_EXISTS));
        assert!(!backend.dir_exists("/a/b"));
        assert!(backend.journal().is_empty());
    }

    #[test]
    fn create_dir_all_rejects_bad_routes() {
        let (registry, _) = setup();
        assert!(matches!(
            registry.create_dir_all(&path("a/b")),
            Err(FsError::InvalidPath { .. })
        ));
        assert!(matches!(
            registry.create_dir_all(&path("save:/a")),
            Err(FsError::DeviceNotFound { .. })
        ));
    }

    #[test]
    fn create_dir_reports_backend_code() {
        let (registry, backend) = setup();
        backend.fail("create_dir", ResultCode(0xABC));
        let err = registry.create_dir(&path("sdmc:/x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backend);
        assert_eq!(err.to_string(), "create_dir failed for sdmc:/x: 0x00000ABC");
    }

    #[test]
    fn remove_dir_and_remove_dir_all() {
        let (registry, backend) = setup();
        backend.insert_file("/full/file", vec![]);
        backend.create_dir("/empty").unwrap();

        registry.remove_dir(&path("sdmc:/empty")).unwrap();
        assert!(!registry.dir_exists(&path("sdmc:/empty")));

        let err = registry.remove_dir(&path("sdmc:/full")).unwrap_err();
        assert_eq!(err.code(), Some(MemoryBackend::NOT_EMPTY));

        registry.remove_dir_all(&path("sdmc:/full")).unwrap();
        assert!(!registry.dir_exists(&path("sdmc:/full")));
    }

    #[test]
    fn rename_dir_same_device() {
        let (registry, backend) = setup();
        backend.create_dir("/old").unwrap();
        registry
            .rename_dir(&path("sdmc:/old"), &path("sdmc:/new"))
            .unwrap();
        assert!(backend.dir_exists("/new"));
    }

    #[test]
    fn rename_across_devices_rejected_before_backend() {
        let (registry, backend) = setup();
        registry.mount("save", Arc::new(MemoryBackend::new())).unwrap();
        backend.create_dir("/old").unwrap();
        backend.fail("rename_dir", ResultCode(0x1));

        let err = registry
            .rename_dir(&path("sdmc:/old"), &path("save:/old"))
            .unwrap_err();
        assert!(matches!(err, FsError::CrossDevice { .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn rename_with_invalid_path_rejected() {
        let (registry, _) = setup();
        let err = registry
            .rename_dir(&path("sdmc:/a"), &path("bogus"))
            .unwrap_err();
        assert!(matches!(err, FsError::InvalidPath { .. }));
    }

    #[test]
    fn dir_exists_is_false_for_unroutable_paths() {
        let (registry, _) = setup();
        assert!(registry.dir_exists(&path("sdmc:/")));
        assert!(!registry.dir_exists(&path("sdmc")));
        assert!(!registry.dir_exists(&path("save:/")));
    }

    #[test]
    fn file_operations() {
        let (registry, backend) = setup();
        registry.create_file(&path("sdmc:/f.bin"), 4).unwrap();
        assert!(registry.file_exists(&path("sdmc:/f.bin")));
        assert_eq!(backend.contents("/f.bin").unwrap(), vec![0; 4]);

        registry
            .rename_file(&path("sdmc:/f.bin"), &path("sdmc:/g.bin"))
            .unwrap();
        assert!(!registry.file_exists(&path("sdmc:/f.bin")));

        registry.remove_file(&path("sdmc:/g.bin")).unwrap();
        assert!(!registry.file_exists(&path("sdmc:/g.bin")));

        let err = registry.remove_file(&path("sdmc:/g.bin")).unwrap_err();
        assert_eq!(err.code(), Some(MemoryBackend::NOT_FOUND));
    }
}
