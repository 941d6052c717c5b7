//! # In-Memory Backend
//!
//! A complete [`Backend`](crate::Backend) and [`StorageBackend`] kept in
//! process memory.
//!
//! It behaves like a strict native backend: files never grow on write,
//! directories need an existing parent, raw partition reads past the end
//! fail. Any primitive can be told to fail with a chosen [`ResultCode`],
//! which makes it the backend of choice for exercising error paths.
//!
//! ```rust
//! use devfs::{DirBackend, FileBackend, MemoryBackend};
//!
//! let backend = MemoryBackend::new();
//! backend.create_dir("/saves").unwrap();
//! backend.insert_file("/saves/slot0.bin", b"data".to_vec());
//! assert!(backend.file_exists("/saves/slot0.bin"));
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use crate::{
    BackendResult, DirBackend, DirEntry, FileBackend, Handle, OpenMode, PartitionId,
    ResultCode, StorageBackend,
};

enum OpenHandle {
    File { path: String, mode: OpenMode },
    Dir { pending: VecDeque<DirEntry> },
    Partition { id: PartitionId },
}

/// An injected failure, armed once `successes` more calls have passed.
#[derive(Clone, Copy)]
struct Failure {
    successes: usize,
    code: ResultCode,
}

#[derive(Default)]
struct State {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
    partitions: HashMap<PartitionId, Vec<u8>>,
    handles: HashMap<u64, OpenHandle>,
    next_handle: u64,
    journal: Vec<String>,
}

/// In-memory backend with failure injection.
pub struct MemoryBackend {
    state: RwLock<State>,
    failures: RwLock<HashMap<&'static str, Failure>>,
    write_limit: AtomicUsize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        normalized.push('/');
        normalized.push_str(segment);
    }
    if normalized.is_empty() {
        normalized.push('/');
    }
    normalized
}

fn parent_of(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(position) => Some(&path[..position]),
        None => None,
    }
}

fn name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn is_below(path: &str, dir: &str) -> bool {
    if dir == "/" {
        path != "/"
    } else {
        path.len() > dir.len() && path.starts_with(dir) && path.as_bytes()[dir.len()] == b'/'
    }
}

impl State {
    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path) || self.dirs.contains(path)
    }

    fn parent_exists(&self, path: &str) -> bool {
        parent_of(path).is_some_and(|parent| self.dirs.contains(parent))
    }

    fn allocate(&mut self, handle: OpenHandle) -> Handle {
        self.next_handle += 1;
        self.handles.insert(self.next_handle, handle);
        Handle(self.next_handle)
    }

    fn file_path(&self, handle: Handle) -> BackendResult<(&String, OpenMode)> {
        match self.handles.get(&handle.0) {
            Some(OpenHandle::File { path, mode }) => Ok((path, *mode)),
            _ => Err(MemoryBackend::INVALID_HANDLE),
        }
    }

    fn file_data(&mut self, handle: Handle) -> BackendResult<(&mut Vec<u8>, OpenMode)> {
        let (path, mode) = self.file_path(handle)?;
        let path = path.clone();
        self.files
            .get_mut(&path)
            .map(|data| (data, mode))
            .ok_or(MemoryBackend::NOT_FOUND)
    }
}

impl MemoryBackend {
    /// Path or partition does not exist.
    pub const NOT_FOUND: ResultCode = ResultCode(0x0000_0202);
    /// Path already exists.
    pub const ALREADY_EXISTS: ResultCode = ResultCode(0x0000_0402);
    /// Directory is not empty.
    pub const NOT_EMPTY: ResultCode = ResultCode(0x0000_0602);
    /// Handle is unknown or of the wrong kind.
    pub const INVALID_HANDLE: ResultCode = ResultCode(0x0000_0E02);
    /// Handle lacks the access the primitive needs.
    pub const ACCESS_DENIED: ResultCode = ResultCode(0x0000_1402);
    /// Offset or length falls outside the file or partition.
    pub const OUT_OF_RANGE: ResultCode = ResultCode(0x0000_1602);

    /// Empty backend containing only the root directory.
    pub fn new() -> Self {
        let mut state = State::default();
        state.dirs.insert("/".to_owned());
        Self {
            state: RwLock::new(state),
            failures: RwLock::new(HashMap::new()),
            write_limit: AtomicUsize::new(usize::MAX),
        }
    }

    /// Make every call to the primitive named `operation` fail with `code`.
    ///
    /// Names match the trait method names, e.g. `"read_at"` or
    /// `"create_dir"`.
    pub fn fail(&self, operation: &'static str, code: ResultCode) {
        self.fail_after(operation, 0, code);
    }

    /// Let `successes` calls to `operation` through, then fail every later
    /// call with `code`.
    pub fn fail_after(&self, operation: &'static str, successes: usize, code: ResultCode) {
        self.failures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation, Failure { successes, code });
    }

    /// Cap every `write_at` at `max` bytes, reporting a short write for
    /// anything longer.
    pub fn limit_writes(&self, max: usize) {
        self.write_limit.store(max, Ordering::Relaxed);
    }

    /// Stop injecting failures.
    pub fn clear_failures(&self) {
        self.failures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Store a file directly, creating missing parent directories.
    pub fn insert_file(&self, path: &str, data: Vec<u8>) {
        let path = normalize(path);
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut parent = parent_of(&path);
        while let Some(dir) = parent {
            state.dirs.insert(dir.to_owned());
            parent = parent_of(dir);
        }
        state.files.insert(path, data);
    }

    /// Store a raw partition image.
    pub fn insert_partition(&self, id: PartitionId, data: Vec<u8>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .partitions
            .insert(id, data);
    }

    /// Contents of the file at `path`.
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .files
            .get(&normalize(path))
            .cloned()
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .handles
            .len()
    }

    /// Successful mutating calls so far, as `"<operation> <path>"` lines.
    pub fn journal(&self) -> Vec<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .journal
            .clone()
    }

    fn check(&self, operation: &'static str) -> BackendResult<()> {
        let mut failures = self.failures.write().unwrap_or_else(PoisonError::into_inner);
        match failures.get_mut(operation) {
            Some(failure) if failure.successes > 0 => {
                failure.successes -= 1;
                Ok(())
            }
            Some(failure) => Err(failure.code),
            None => Ok(()),
        }
    }

    fn state(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FileBackend for MemoryBackend {
    fn open_file(&self, path: &str, mode: OpenMode) -> BackendResult<Handle> {
        self.check("open_file")?;
        let path = normalize(path);
        let mut state = self.state();
        if !state.files.contains_key(&path) {
            return Err(Self::NOT_FOUND);
        }
        Ok(state.allocate(OpenHandle::File { path, mode }))
    }

    fn close_file(&self, handle: Handle) -> BackendResult<()> {
        self.check("close_file")?;
        let mut state = self.state();
        state.file_path(handle)?;
        state.handles.remove(&handle.0);
        Ok(())
    }

    fn read_at(&self, handle: Handle, offset: u64, buf: &mut [u8]) -> BackendResult<usize> {
        self.check("read_at")?;
        let mut state = self.state();
        let (data, mode) = state.file_data(handle)?;
        if !mode.read {
            return Err(Self::ACCESS_DENIED);
        }
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= data.len() {
            return Ok(0);
        }
        let count = buf.len().min(data.len() - start);
        buf[..count].copy_from_slice(&data[start..start + count]);
        Ok(count)
    }

    fn write_at(&self, handle: Handle, offset: u64, data: &[u8]) -> BackendResult<usize> {
        self.check("write_at")?;
        let mut state = self.state();
        let (file, mode) = state.file_data(handle)?;
        if !mode.write {
            return Err(Self::ACCESS_DENIED);
        }
        let data = &data[..data.len().min(self.write_limit.load(Ordering::Relaxed))];
        let start = usize::try_from(offset).map_err(|_| Self::OUT_OF_RANGE)?;
        let end = start.checked_add(data.len()).ok_or(Self::OUT_OF_RANGE)?;
        if end > file.len() {
            return Err(Self::OUT_OF_RANGE);
        }
        file[start..end].copy_from_slice(data);
        Ok(data.len())
    }

    fn file_size(&self, handle: Handle) -> BackendResult<u64> {
        self.check("file_size")?;
        let mut state = self.state();
        let (data, _) = state.file_data(handle)?;
        Ok(data.len() as u64)
    }

    fn set_file_size(&self, handle: Handle, size: u64) -> BackendResult<()> {
        self.check("set_file_size")?;
        let size = usize::try_from(size).map_err(|_| Self::OUT_OF_RANGE)?;
        let mut state = self.state();
        let (data, mode) = state.file_data(handle)?;
        if !mode.write {
            return Err(Self::ACCESS_DENIED);
        }
        data.resize(size, 0);
        Ok(())
    }

    fn flush(&self, handle: Handle) -> BackendResult<()> {
        self.check("flush")?;
        self.state().file_path(handle).map(|_| ())
    }

    fn create_file(&self, path: &str, size: u64) -> BackendResult<()> {
        self.check("create_file")?;
        let size = usize::try_from(size).map_err(|_| Self::OUT_OF_RANGE)?;
        let path = normalize(path);
        let mut state = self.state();
        if state.exists(&path) {
            return Err(Self::ALREADY_EXISTS);
        }
        if !state.parent_exists(&path) {
            return Err(Self::NOT_FOUND);
        }
        state.journal.push(format!("create_file {path}"));
        state.files.insert(path, vec![0; size]);
        Ok(())
    }

    fn remove_file(&self, path: &str) -> BackendResult<()> {
        self.check("remove_file")?;
        let path = normalize(path);
        let mut state = self.state();
        if state.files.remove(&path).is_none() {
            return Err(Self::NOT_FOUND);
        }
        state.journal.push(format!("remove_file {path}"));
        Ok(())
    }

    fn rename_file(&self, from: &str, to: &str) -> BackendResult<()> {
        self.check("rename_file")?;
        let (from, to) = (normalize(from), normalize(to));
        let mut state = self.state();
        if state.exists(&to) {
            return Err(Self::ALREADY_EXISTS);
        }
        if !state.parent_exists(&to) {
            return Err(Self::NOT_FOUND);
        }
        let data = state.files.remove(&from).ok_or(Self::NOT_FOUND)?;
        state.journal.push(format!("rename_file {from} {to}"));
        for handle in state.handles.values_mut() {
            if let OpenHandle::File { path, .. } = handle {
                if *path == from {
                    path.clone_from(&to);
                }
            }
        }
        state.files.insert(to, data);
        Ok(())
    }

    fn file_exists(&self, path: &str) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .files
            .contains_key(&normalize(path))
    }
}

impl DirBackend for MemoryBackend {
    fn open_dir(&self, path: &str) -> BackendResult<Handle> {
        self.check("open_dir")?;
        let path = normalize(path);
        let mut state = self.state();
        if !state.dirs.contains(&path) {
            return Err(Self::NOT_FOUND);
        }
        let is_child = |candidate: &String| parent_of(candidate) == Some(path.as_str());
        let dirs = state
            .dirs
            .iter()
            .filter(|dir| is_child(*dir))
            .map(|dir| DirEntry::new(name_of(dir), true));
        let files = state
            .files
            .keys()
            .filter(|file| is_child(*file))
            .map(|file| DirEntry::new(name_of(file), false));
        // Files first, so callers cannot rely on backend order for grouping.
        let pending: VecDeque<DirEntry> = files.chain(dirs).collect();
        Ok(state.allocate(OpenHandle::Dir { pending }))
    }

    fn read_dir_entry(&self, handle: Handle) -> BackendResult<Option<DirEntry>> {
        self.check("read_dir_entry")?;
        match self.state().handles.get_mut(&handle.0) {
            Some(OpenHandle::Dir { pending }) => Ok(pending.pop_front()),
            _ => Err(Self::INVALID_HANDLE),
        }
    }

    fn close_dir(&self, handle: Handle) -> BackendResult<()> {
        self.check("close_dir")?;
        let mut state = self.state();
        match state.handles.get(&handle.0) {
            Some(OpenHandle::Dir { .. }) => {
                state.handles.remove(&handle.0);
                Ok(())
            }
            _ => Err(Self::INVALID_HANDLE),
        }
    }

    fn create_dir(&self, path: &str) -> BackendResult<()> {
        self.check("create_dir")?;
        let path = normalize(path);
        let mut state = self.state();
        if state.exists(&path) {
            return Err(Self::ALREADY_EXISTS);
        }
        if !state.parent_exists(&path) {
            return Err(Self::NOT_FOUND);
        }
        state.journal.push(format!("create_dir {path}"));
        state.dirs.insert(path);
        Ok(())
    }

    fn remove_dir(&self, path: &str) -> BackendResult<()> {
        self.check("remove_dir")?;
        let path = normalize(path);
        let mut state = self.state();
        if path == "/" || !state.dirs.contains(&path) {
            return Err(Self::NOT_FOUND);
        }
        let occupied = state.dirs.iter().any(|dir| is_below(dir, &path))
            || state.files.keys().any(|file| is_below(file, &path));
        if occupied {
            return Err(Self::NOT_EMPTY);
        }
        state.dirs.remove(&path);
        state.journal.push(format!("remove_dir {path}"));
        Ok(())
    }

    fn remove_dir_all(&self, path: &str) -> BackendResult<()> {
        self.check("remove_dir_all")?;
        let path = normalize(path);
        let mut state = self.state();
        if path == "/" || !state.dirs.contains(&path) {
            return Err(Self::NOT_FOUND);
        }
        state.dirs.retain(|dir| *dir != path && !is_below(dir, &path));
        state.files.retain(|file, _| !is_below(file, &path));
        state.journal.push(format!("remove_dir_all {path}"));
        Ok(())
    }

    fn rename_dir(&self, from: &str, to: &str) -> BackendResult<()> {
        self.check("rename_dir")?;
        let (from, to) = (normalize(from), normalize(to));
        let mut state = self.state();
        if from == "/" || !state.dirs.contains(&from) {
            return Err(Self::NOT_FOUND);
        }
        if state.exists(&to) {
            return Err(Self::ALREADY_EXISTS);
        }
        if !state.parent_exists(&to) || is_below(&to, &from) {
            return Err(Self::NOT_FOUND);
        }
        let moved = |path: &str| format!("{to}{}", &path[from.len()..]);

        let dirs: Vec<String> = state
            .dirs
            .iter()
            .filter(|dir| **dir == from || is_below(dir, &from))
            .cloned()
            .collect();
        for dir in dirs {
            state.dirs.remove(&dir);
            state.dirs.insert(moved(&dir));
        }

        let files: Vec<String> = state
            .files
            .keys()
            .filter(|file| is_below(file, &from))
            .cloned()
            .collect();
        for file in files {
            if let Some(data) = state.files.remove(&file) {
                state.files.insert(moved(&file), data);
            }
        }
        state.journal.push(format!("rename_dir {from} {to}"));
        Ok(())
    }

    fn dir_exists(&self, path: &str) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .dirs
            .contains(&normalize(path))
    }
}

impl StorageBackend for MemoryBackend {
    fn open_partition(&self, id: PartitionId) -> BackendResult<Handle> {
        self.check("open_partition")?;
        let mut state = self.state();
        if !state.partitions.contains_key(&id) {
            return Err(Self::NOT_FOUND);
        }
        Ok(state.allocate(OpenHandle::Partition { id }))
    }

    fn partition_size(&self, handle: Handle) -> BackendResult<u64> {
        self.check("partition_size")?;
        let state = self.state();
        match state.handles.get(&handle.0) {
            Some(OpenHandle::Partition { id }) => state
                .partitions
                .get(id)
                .map(|data| data.len() as u64)
                .ok_or(Self::NOT_FOUND),
            _ => Err(Self::INVALID_HANDLE),
        }
    }

    fn read_partition(&self, handle: Handle, offset: u64, buf: &mut [u8]) -> BackendResult<()> {
        self.check("read_partition")?;
        let state = self.state();
        let data = match state.handles.get(&handle.0) {
            Some(OpenHandle::Partition { id }) => {
                state.partitions.get(id).ok_or(Self::NOT_FOUND)?
            }
            _ => return Err(Self::INVALID_HANDLE),
        };
        let start = usize::try_from(offset).map_err(|_| Self::OUT_OF_RANGE)?;
        let end = start.checked_add(buf.len()).ok_or(Self::OUT_OF_RANGE)?;
        if end > data.len() {
            return Err(Self::OUT_OF_RANGE);
        }
        buf.copy_from_slice(&data[start..end]);
        Ok(())
    }

    fn close_partition(&self, handle: Handle) {
        let mut state = self.state();
        if let Some(OpenHandle::Partition { .. }) = state.handles.get(&handle.0) {
            state.handles.remove(&handle.0);
        }
    }
}
