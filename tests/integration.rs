//! Integration tests exercising the public API end to end.
//!
//! These tests verify that:
//! 1. A third-party backend becomes mountable through the blanket `Backend` impl
//! 2. Paths, routing, handles and listings compose across devices
//! 3. The documented cursor, size and ordering guarantees hold
//! 4. Errors carry enough context to act on

use devfs::*;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};

// =============================================================================
// Read-Only Asset Backend
// =============================================================================

const ACCESS_DENIED: ResultCode = ResultCode(0x0000_5A02);
const NOT_FOUND: ResultCode = ResultCode(0x0000_0202);
const BAD_HANDLE: ResultCode = ResultCode(0x0000_0E02);

/// A packaged asset store: flat, read-only, listed in hash order.
struct AssetStore {
    files: BTreeMap<String, Vec<u8>>,
    open_files: RwLock<HashMap<u64, String>>,
    open_dirs: RwLock<HashMap<u64, VecDeque<DirEntry>>>,
    next_handle: AtomicU64,
}

impl AssetStore {
    fn new(files: &[(&str, &[u8])]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(path, data)| ((*path).to_owned(), data.to_vec()))
                .collect(),
            open_files: RwLock::new(HashMap::new()),
            open_dirs: RwLock::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    fn handle(&self) -> Handle {
        Handle(self.next_handle.fetch_add(1, AtomicOrdering::SeqCst))
    }

    fn data(&self, handle: Handle) -> Result<&Vec<u8>, ResultCode> {
        let files = self.open_files.read().unwrap();
        let path = files.get(&handle.0).ok_or(BAD_HANDLE)?;
        self.files.get(path).ok_or(NOT_FOUND)
    }
}

impl FileBackend for AssetStore {
    fn open_file(&self, path: &str, mode: OpenMode) -> BackendResult<Handle> {
        if mode.write {
            return Err(ACCESS_DENIED);
        }
        if !self.files.contains_key(path) {
            return Err(NOT_FOUND);
        }
        let handle = self.handle();
        self.open_files.write().unwrap().insert(handle.0, path.to_owned());
        Ok(handle)
    }

    fn close_file(&self, handle: Handle) -> BackendResult<()> {
        self.open_files.write().unwrap().remove(&handle.0);
        Ok(())
    }

    fn read_at(&self, handle: Handle, offset: u64, buf: &mut [u8]) -> BackendResult<usize> {
        let data = self.data(handle)?;
        let start = (offset as usize).min(data.len());
        let count = buf.len().min(data.len() - start);
        buf[..count].copy_from_slice(&data[start..start + count]);
        Ok(count)
    }

    fn write_at(&self, _: Handle, _: u64, _: &[u8]) -> BackendResult<usize> {
        Err(ACCESS_DENIED)
    }

    fn file_size(&self, handle: Handle) -> BackendResult<u64> {
        Ok(self.data(handle)?.len() as u64)
    }

    fn set_file_size(&self, _: Handle, _: u64) -> BackendResult<()> {
        Err(ACCESS_DENIED)
    }

    fn flush(&self, _: Handle) -> BackendResult<()> {
        Ok(())
    }

    fn create_file(&self, _: &str, _: u64) -> BackendResult<()> {
        Err(ACCESS_DENIED)
    }

    fn remove_file(&self, _: &str) -> BackendResult<()> {
        Err(ACCESS_DENIED)
    }

    fn rename_file(&self, _: &str, _: &str) -> BackendResult<()> {
        Err(ACCESS_DENIED)
    }

    fn file_exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }
}

impl DirBackend for AssetStore {
    fn open_dir(&self, path: &str) -> BackendResult<Handle> {
        if path != "/" {
            return Err(NOT_FOUND);
        }
        // Hash order: the listing must not depend on backend order.
        let unordered: HashSet<&String> = self.files.keys().collect();
        let entries = unordered
            .iter()
            .map(|name| DirEntry::new(name.trim_start_matches('/'), false))
            .collect();
        let handle = self.handle();
        self.open_dirs.write().unwrap().insert(handle.0, entries);
        Ok(handle)
    }

    fn read_dir_entry(&self, handle: Handle) -> BackendResult<Option<DirEntry>> {
        let mut dirs = self.open_dirs.write().unwrap();
        let entries = dirs.get_mut(&handle.0).ok_or(BAD_HANDLE)?;
        Ok(entries.pop_front())
    }

    fn close_dir(&self, handle: Handle) -> BackendResult<()> {
        self.open_dirs.write().unwrap().remove(&handle.0);
        Ok(())
    }

    fn create_dir(&self, _: &str) -> BackendResult<()> {
        Err(ACCESS_DENIED)
    }

    fn remove_dir(&self, _: &str) -> BackendResult<()> {
        Err(ACCESS_DENIED)
    }

    fn remove_dir_all(&self, _: &str) -> BackendResult<()> {
        Err(ACCESS_DENIED)
    }

    fn rename_dir(&self, _: &str, _: &str) -> BackendResult<()> {
        Err(ACCESS_DENIED)
    }

    fn dir_exists(&self, path: &str) -> bool {
        path == "/"
    }
}

fn mounted() -> (DeviceRegistry, Arc<MemoryBackend>) {
    let registry = DeviceRegistry::new();
    let sdmc = Arc::new(MemoryBackend::new());
    registry.mount("sdmc", sdmc.clone()).unwrap();
    registry
        .mount(
            "romfs",
            Arc::new(AssetStore::new(&[
                ("/Banner.png", b"\x89PNG".as_slice()),
                ("/about.txt", b"JKSV\nversion 2\n".as_slice()),
                ("/Zfont.bin", b"\0\0".as_slice()),
            ])),
        )
        .unwrap();
    (registry, sdmc)
}

// =============================================================================
// Tests: Backend Composition
// =============================================================================

/// Verify a foreign backend is usable as `Arc<dyn Backend>`.
#[test]
fn foreign_backend_mounts_through_blanket_impl() {
    let (registry, _) = mounted();
    assert_eq!(registry.devices(), ["romfs", "sdmc"]);

    let mut file = File::open(&registry, "romfs:/about.txt", OpenMode::READ, 0).unwrap();
    let mut line = String::new();
    assert!(file.read_line(&mut line).unwrap());
    assert_eq!(line, "JKSV");
}

/// Read-only backends refuse the destructive recreate, and nothing is created.
#[test]
fn write_on_read_only_backend_fails_with_native_code() {
    let (registry, _) = mounted();
    let err = File::open(&registry, "romfs:/about.txt", OpenMode::WRITE, 0).unwrap_err();
    assert_eq!(err.code(), Some(ACCESS_DENIED));
    assert!(err.to_string().contains("romfs:/about.txt"));
    assert!(registry.file_exists(&DevicePath::new("romfs:/about.txt")));
}

/// Listing order is independent of the backend's own order.
#[test]
fn listing_of_foreign_backend_is_sorted() {
    let (registry, _) = mounted();
    let dir = Directory::open(&registry, "romfs:/").unwrap();
    let names: Vec<String> = dir.iter().map(DirEntry::name_utf8).collect();
    assert_eq!(names, ["about.txt", "Banner.png", "Zfont.bin"]);
}

// =============================================================================
// Tests: Paths
// =============================================================================

/// `is_valid` holds exactly for device-prefixed paths, including sub-ranges.
#[test]
fn path_validity() {
    for valid in ["sdmc:/", "sdmc:/a", "save:/a/b.bin", "x:/ゲーム"] {
        assert!(DevicePath::new(valid).is_valid(), "{valid}");
    }
    for invalid in ["", "sdmc", ":/a", "sdmc:", "sdmc:a", "/a:/b"] {
        assert!(!DevicePath::new(invalid).is_valid(), "{invalid}");
    }

    let path = DevicePath::new("sdmc:/a/b/c");
    let mut position = path.find_first_of(PATH_SEPARATOR);
    while let Some(separator) = position {
        assert!(path.sub_range(0, separator + 1).is_valid());
        position = path.find_next_of(separator + 1, PATH_SEPARATOR);
    }
    assert!(!path.sub_range(0, 4).is_valid());
    assert_eq!(DevicePath::new("bogus").find_first_of(PATH_SEPARATOR), None);
}

/// Paths parse and print through the std conversion traits.
#[test]
fn path_conversions() {
    let parsed: DevicePath = "save:/slot".parse().unwrap();
    assert_eq!(parsed.device_name(), Some("save"));
    assert_eq!(parsed.sub_path(), Some("/slot"));
    assert_eq!(parsed.to_string(), "save:/slot");
    assert!("nope".parse::<DevicePath>().is_err());
}

// =============================================================================
// Tests: File Handle
// =============================================================================

/// Create+write on an existing file yields the requested size, not the old one.
#[test]
fn create_write_is_destructive() {
    let (registry, sdmc) = mounted();
    sdmc.insert_file("/save.bin", vec![0xEE; 4096]);

    let file = File::open(&registry, "sdmc:/save.bin", OpenMode::WRITE, 32).unwrap();
    assert_eq!(file.size(), 32);
    assert_eq!(file.tell(), 0);
    drop(file);
    assert_eq!(sdmc.contents("/save.bin").unwrap(), vec![0; 32]);
}

/// Writes past the end grow the file to exactly the farthest write.
#[test]
fn cumulative_writes_track_offset() {
    let (registry, sdmc) = mounted();
    let mut file = File::open(&registry, "sdmc:/log.txt", OpenMode::WRITE, 0).unwrap();
    let chunks: [&[u8]; 4] = [b"a", b"bcdef", b"", b"ghij"];
    for chunk in chunks {
        file.write(chunk).unwrap();
        assert_eq!(file.size(), file.tell());
    }
    assert_eq!(file.size(), 10);

    file.seek(2, SeekOrigin::Start);
    file.write(b"XY").unwrap();
    assert_eq!(file.size(), 10);
    file.close().unwrap();
    assert_eq!(sdmc.contents("/log.txt").unwrap(), b"abXYefghij");
}

/// Seeks clamp into `[0, size]` for every origin.
#[test]
fn seek_clamping() {
    let (registry, sdmc) = mounted();
    sdmc.insert_file("/f.bin", vec![0; 50]);
    let mut file = File::open(&registry, "sdmc:/f.bin", OpenMode::READ, 0).unwrap();

    assert_eq!(file.seek(-100, SeekOrigin::Start), 0);
    assert_eq!(file.seek(1000, SeekOrigin::End), 50);
    assert!(file.end_of_file());
    for (offset, origin) in [
        (i64::MIN, SeekOrigin::Current),
        (i64::MAX, SeekOrigin::Start),
        (-51, SeekOrigin::End),
        (25, SeekOrigin::Current),
    ] {
        let position = file.seek(offset, origin);
        assert!(position <= file.size());
        assert_eq!(position, file.tell());
    }
}

/// A final line without terminator is still reported.
#[test]
fn read_line_on_unterminated_tail() {
    let (registry, sdmc) = mounted();
    sdmc.insert_file("/lines.txt", b"ab\ncd".to_vec());
    let mut file = File::open(&registry, "sdmc:/lines.txt", OpenMode::READ, 0).unwrap();

    let mut line = String::new();
    assert!(file.read_line(&mut line).unwrap());
    assert_eq!(line, "ab");
    assert!(file.read_line(&mut line).unwrap());
    assert_eq!(line, "cd");
    assert!(!file.read_line(&mut line).unwrap());
}

/// Files plug into std I/O adapters.
#[test]
fn std_io_copy_between_devices() {
    let (registry, sdmc) = mounted();
    let mut src = File::open(&registry, "romfs:/about.txt", OpenMode::READ, 0).unwrap();
    let mut dst = File::open(&registry, "sdmc:/about.txt", OpenMode::WRITE, 0).unwrap();

    let copied = std::io::copy(&mut src, &mut dst).unwrap();
    assert_eq!(copied, 15);
    dst.flush().unwrap();
    dst.close().unwrap();
    assert_eq!(sdmc.contents("/about.txt").unwrap(), b"JKSV\nversion 2\n");

    let mut text = String::new();
    File::open(&registry, "sdmc:/about.txt", OpenMode::READ, 0)
        .unwrap()
        .read_to_string(&mut text)
        .unwrap();
    assert!(text.ends_with("version 2\n"));
}

// =============================================================================
// Tests: Directories
// =============================================================================

fn fold(name: &[u16]) -> Vec<u16> {
    name.iter()
        .map(|&unit| match u8::try_from(unit) {
            Ok(byte) => u16::from(byte.to_ascii_lowercase()),
            Err(_) => unit,
        })
        .collect()
}

/// Directories precede files; names ascend case-insensitively in each group.
#[test]
fn directory_sort_invariant() {
    let (registry, sdmc) = mounted();
    for name in ["b", "A", "c10", "C1", "_x", "zz", "Zz", "é"] {
        sdmc.insert_file(&format!("/root/{name}"), vec![]);
        sdmc.insert_file(&format!("/root/Dir{name}/keep"), vec![]);
    }

    let dir = Directory::open(&registry, "sdmc:/root").unwrap();
    assert_eq!(dir.len(), 16);
    let first_file = dir.iter().position(|e| !e.is_directory).unwrap();
    assert!(dir.iter().skip(first_file).all(|e| !e.is_directory));

    for pair in dir.entries().windows(2) {
        if pair[0].is_directory == pair[1].is_directory {
            assert_ne!(fold(&pair[0].name).cmp(&fold(&pair[1].name)), Ordering::Greater);
        }
    }
}

/// Entry paths join the directory path and the name.
#[test]
fn entry_paths() {
    let (registry, sdmc) = mounted();
    sdmc.insert_file("/JKSV/Game/slot.bin", vec![]);
    let dir = Directory::open(&registry, DevicePath::new("sdmc:/JKSV/Game")).unwrap();
    let entry = dir.entry_path(0);
    assert_eq!(entry.as_str(), "sdmc:/JKSV/Game/slot.bin");
    assert!(registry.file_exists(&entry));
}

/// `create_dir_all` creates each missing level once, in order.
#[test]
fn create_dir_all_creates_three_levels() {
    let (registry, sdmc) = mounted();
    let path = DevicePath::new("sdmc:/a/b/c");

    registry.create_dir_all(&path).unwrap();
    assert_eq!(
        sdmc.journal(),
        ["create_dir /a", "create_dir /a/b", "create_dir /a/b/c"]
    );

    registry.create_dir_all(&path).unwrap();
    assert_eq!(sdmc.journal().len(), 3);
}

/// Renames never cross devices.
#[test]
fn cross_device_rename_rejected() {
    let (registry, sdmc) = mounted();
    sdmc.insert_file("/a.txt", vec![1]);
    let err = registry
        .rename_file(&DevicePath::new("sdmc:/a.txt"), &DevicePath::new("romfs:/a.txt"))
        .unwrap_err();
    assert!(matches!(err, FsError::CrossDevice { .. }));
    assert!(sdmc.journal().is_empty());
}

// =============================================================================
// Tests: Raw Storage
// =============================================================================

/// Reads near the end return at most the remaining bytes.
#[test]
fn storage_read_is_clamped() {
    let backend = Arc::new(MemoryBackend::new());
    backend.insert_partition(PartitionId(0x1F), vec![0x5A; 1024]);

    let mut storage = Storage::open(backend, PartitionId(0x1F)).unwrap();
    storage.seek(-10, SeekOrigin::End);
    let mut buf = vec![0u8; 100];
    let count = storage.read(&mut buf).unwrap();
    assert_eq!(count, 10);
    assert_eq!(storage.tell(), storage.size());
    assert!(buf[count..].iter().all(|&b| b == 0));
}

// =============================================================================
// Tests: Registry and Errors
// =============================================================================

/// The process-wide registry routes like any other.
#[test]
fn global_registry() {
    let registry = DeviceRegistry::global();
    registry
        .mount("itest-global", Arc::new(MemoryBackend::new()))
        .unwrap();
    registry
        .create_file(&DevicePath::new("itest-global:/x"), 3)
        .unwrap();
    assert!(registry.file_exists(&DevicePath::new("itest-global:/x")));
    assert!(registry.unmount("itest-global"));
    assert!(!registry.file_exists(&DevicePath::new("itest-global:/x")));
}

/// Errors classify themselves and convert into `std::io::Error`.
#[test]
fn errors_carry_context() {
    let (registry, _) = mounted();

    let err = File::open(&registry, "save:/a", OpenMode::READ, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolution);
    assert_eq!(std::io::Error::from(err).kind(), std::io::ErrorKind::NotFound);

    let err = Directory::open(&registry, "romfs:/sub").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert_eq!(err.to_string(), "open_dir failed for romfs:/sub: 0x00000202");

    let err = registry.create_dir(&DevicePath::new("sdmc")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

// =============================================================================
// Tests: Real Workflows
// =============================================================================

/// Back up a save folder into a fresh dated directory and list the result.
#[test]
fn workflow_backup_save_folder() {
    let (registry, sdmc) = mounted();
    let save = Arc::new(MemoryBackend::new());
    save.insert_file("/progress.dat", vec![1, 2, 3, 4]);
    save.insert_file("/system/options.ini", b"lang=en".to_vec());
    registry.mount("save", save).unwrap();

    let target = DevicePath::new("sdmc:/JKSV/Game/2024-01-01");
    registry.create_dir_all(&target).unwrap();

    let source = Directory::open(&registry, "save:/").unwrap();
    for (index, entry) in source.iter().enumerate() {
        if entry.is_directory {
            registry.create_dir(&target.join(&entry.name_utf8())).unwrap();
            continue;
        }
        let mut input = File::open(&registry, source.entry_path(index), OpenMode::READ, 0).unwrap();
        let data = input.read_to_vec().unwrap();
        let mut output = File::open(&registry, target.join(&entry.name_utf8()), OpenMode::WRITE, 0).unwrap();
        output.write_all(&data).unwrap();
    }

    let backup = Directory::open(&registry, target.clone()).unwrap();
    let names: Vec<String> = backup.iter().map(DirEntry::name_utf8).collect();
    assert_eq!(names, ["system", "progress.dat"]);
    assert_eq!(
        sdmc.contents("/JKSV/Game/2024-01-01/progress.dat").unwrap(),
        [1, 2, 3, 4]
    );
}
