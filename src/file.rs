//! # File Handle
//!
//! [`File`] opens a backend file through a logical path and layers a cursor,
//! mode checks and auto-growing writes over the backend's offset-addressed
//! primitives.
//!
//! ## Size Bookkeeping
//!
//! The file size is queried once, at open. Afterwards the handle's own
//! record is authoritative: a write that runs past the end first grows the
//! backend file to exactly the new end of the write, then records the new
//! size. Files never shrink through this handle.
//!
//! ## Failed Reads
//!
//! A backend read failure leaves the cursor where it was, for both files
//! and raw [`Storage`](crate::Storage).
//!
//! ## Example
//!
//! ```rust
//! use devfs::{DeviceRegistry, File, MemoryBackend, OpenMode};
//! use std::sync::Arc;
//!
//! let registry = DeviceRegistry::new();
//! registry.mount("sdmc", Arc::new(MemoryBackend::new())).unwrap();
//!
//! let mut file = File::open(&registry, "sdmc:/log.txt", OpenMode::WRITE, 0).unwrap();
//! file.write_str("first\nsecond").unwrap();
//! assert_eq!(file.size(), 12);
//! file.close().unwrap();
//!
//! let mut file = File::open(&registry, "sdmc:/log.txt", OpenMode::READ, 0).unwrap();
//! let mut line = String::new();
//! assert!(file.read_line(&mut line).unwrap());
//! assert_eq!(line, "first");
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::stream::StreamCursor;
use crate::{Backend, Config, DevicePath, DeviceRegistry, FsError, Handle, OpenMode, SeekOrigin};

/// Formatting sink that keeps at most `limit` bytes, cut on a char boundary.
///
/// Reports an error once full so formatting stops early.
struct BoundedBuffer {
    text: String,
    limit: usize,
    full: bool,
}

impl BoundedBuffer {
    fn new(limit: usize) -> Self {
        Self {
            text: String::new(),
            limit,
            full: false,
        }
    }
}

impl fmt::Write for BoundedBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.limit - self.text.len();
        if s.len() <= room {
            self.text.push_str(s);
            return Ok(());
        }
        let mut cut = room;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        self.text.push_str(&s[..cut]);
        self.full = true;
        Err(fmt::Error)
    }
}

/// An open file on a mounted device.
///
/// The backend handle is released exactly once: by [`close`](Self::close)
/// or, failing that, on drop.
pub struct File {
    backend: Arc<dyn Backend>,
    handle: Option<Handle>,
    path: DevicePath,
    mode: OpenMode,
    cursor: StreamCursor,
    config: Config,
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("path", &self.path)
            .field("handle", &self.handle)
            .field("mode", &self.mode)
            .field("offset", &self.cursor.offset())
            .field("size", &self.cursor.size())
            .finish()
    }
}

impl File {
    /// Open the file at `path`.
    ///
    /// With [`OpenMode::create`] set and `append` unset, an existing file is
    /// deleted and recreated with `initial_size` zeroed bytes. With both set,
    /// the file is created only if missing. `initial_size` is ignored when
    /// no file is created.
    ///
    /// The cursor starts at 0, or at the end of the file in append mode.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `path` has no device prefix
    /// - [`FsError::DeviceNotFound`] if the device is not mounted
    /// - [`FsError::Backend`] if removing, creating, opening or sizing fails
    pub fn open(
        registry: &DeviceRegistry,
        path: impl Into<DevicePath>,
        mode: OpenMode,
        initial_size: u64,
    ) -> Result<File, FsError> {
        let path = path.into();
        let (backend, sub_path) = registry.route(&path)?;

        if mode.replaces_existing() && backend.file_exists(sub_path) {
            backend
                .remove_file(sub_path)
                .map_err(|code| FsError::backend("remove_file", &path, code))?;
        }
        if mode.create && !backend.file_exists(sub_path) {
            backend
                .create_file(sub_path, initial_size)
                .map_err(|code| FsError::backend("create_file", &path, code))?;
        }

        let handle = backend
            .open_file(sub_path, mode)
            .map_err(|code| FsError::backend("open_file", &path, code))?;

        let size = match backend.file_size(handle) {
            Ok(size) => size,
            Err(code) => {
                if let Err(close_code) = backend.close_file(handle) {
                    warn!(%path, code = %close_code, "failed to release file after size query error");
                }
                return Err(FsError::backend("file_size", &path, code));
            }
        };

        let cursor = if mode.append {
            StreamCursor::at_end_of(size)
        } else {
            StreamCursor::new(size)
        };
        debug!(%path, ?mode, size, "opened file");

        Ok(File {
            backend,
            handle: Some(handle),
            path,
            mode,
            cursor,
            config: *registry.config(),
        })
    }

    /// The logical path this file was opened with.
    #[inline]
    pub fn path(&self) -> &DevicePath {
        &self.path
    }

    /// Modes the file was opened with.
    #[inline]
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Returns `true` until the file is closed.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Current cursor position.
    #[inline]
    pub fn tell(&self) -> u64 {
        self.cursor.offset()
    }

    /// File size as tracked by this handle.
    #[inline]
    pub fn size(&self) -> u64 {
        self.cursor.size()
    }

    /// Returns `true` if the cursor is at or past the end.
    #[inline]
    pub fn end_of_file(&self) -> bool {
        self.cursor.is_at_end()
    }

    /// Move the cursor and return the new position.
    ///
    /// The result is clamped into `[0, size]`; seeking never fails and never
    /// reaches the backend.
    pub fn seek(&mut self, offset: i64, origin: SeekOrigin) -> u64 {
        self.cursor.seek(offset, origin)
    }

    fn open_handle(&self, operation: &'static str) -> Result<Handle, FsError> {
        self.handle.ok_or(FsError::Closed { operation })
    }

    fn readable(&self, operation: &'static str) -> Result<Handle, FsError> {
        let handle = self.open_handle(operation)?;
        if !self.mode.read {
            return Err(FsError::NotReadable {
                operation,
                path: self.path.to_string(),
            });
        }
        Ok(handle)
    }

    fn writable(&self, operation: &'static str) -> Result<Handle, FsError> {
        let handle = self.open_handle(operation)?;
        if !self.mode.write {
            return Err(FsError::NotWritable {
                operation,
                path: self.path.to_string(),
            });
        }
        Ok(handle)
    }

    /// Read into `buf` at the cursor, returning the number of bytes read.
    ///
    /// # Errors
    ///
    /// - [`FsError::Closed`] / [`FsError::NotReadable`] on misuse
    /// - [`FsError::Backend`] if the read fails; the cursor does not move
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        let handle = self.readable("read")?;
        if buf.is_empty() {
            return Ok(0);
        }
        let count = self
            .backend
            .read_at(handle, self.cursor.offset(), buf)
            .map_err(|code| FsError::backend("read", &self.path, code))?;
        self.cursor.advance(count);
        Ok(count)
    }

    /// Read everything from the cursor to the end of the file.
    pub fn read_to_vec(&mut self) -> Result<Vec<u8>, FsError> {
        self.readable("read_to_vec")?;
        let mut data = vec![0u8; self.cursor.clamp(usize::MAX)];
        let mut filled = 0;
        while filled < data.len() {
            match self.read(&mut data[filled..])? {
                0 => break,
                count => filled += count,
            }
        }
        data.truncate(filled);
        Ok(data)
    }

    /// Read one byte. `Ok(None)` means there is no more data.
    pub fn get_char(&mut self) -> Result<Option<u8>, FsError> {
        let handle = self.readable("get_char")?;
        if self.cursor.is_at_end() {
            return Ok(None);
        }
        let mut byte = [0u8; 1];
        let count = self
            .backend
            .read_at(handle, self.cursor.offset(), &mut byte)
            .map_err(|code| FsError::backend("get_char", &self.path, code))?;
        if count == 0 {
            return Ok(None);
        }
        self.cursor.advance(1);
        Ok(Some(byte[0]))
    }

    /// Read up to the next `'\n'` or `'\r'` into `line`, without the
    /// terminator.
    ///
    /// Returns `Ok(true)` when a line was read, including a final line with
    /// no terminator, and `Ok(false)` once no bytes remain.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidData`] if the line is not UTF-8
    /// - any error from [`get_char`](Self::get_char)
    pub fn read_line(&mut self, line: &mut String) -> Result<bool, FsError> {
        self.readable("read_line")?;
        line.clear();

        let mut bytes = Vec::new();
        let mut terminated = false;
        while let Some(byte) = self.get_char()? {
            if byte == b'\n' || byte == b'\r' {
                terminated = true;
                break;
            }
            bytes.push(byte);
        }
        if !terminated && bytes.is_empty() {
            return Ok(false);
        }

        *line = String::from_utf8(bytes).map_err(|e| FsError::InvalidData {
            path: self.path.to_string(),
            details: e.to_string(),
        })?;
        Ok(true)
    }

    /// Grow the backend file so `count` bytes fit at the cursor.
    fn reserve(&mut self, handle: Handle, count: usize) -> Result<(), FsError> {
        if count as u64 <= self.cursor.remaining() {
            return Ok(());
        }
        let new_size = self.cursor.offset() + count as u64;
        self.backend
            .set_file_size(handle, new_size)
            .map_err(|code| FsError::backend("set_file_size", &self.path, code))?;
        trace!(path = %self.path, from = self.cursor.size(), to = new_size, "grew file");
        self.cursor.grow_to(new_size);
        Ok(())
    }

    /// Write `data` at the cursor, growing the file if needed.
    ///
    /// Returns the number of bytes the backend reports written.
    ///
    /// # Errors
    ///
    /// - [`FsError::Closed`] / [`FsError::NotWritable`] on misuse
    /// - [`FsError::Backend`] if growing or writing fails; a failed resize
    ///   writes nothing
    pub fn write(&mut self, data: &[u8]) -> Result<usize, FsError> {
        let handle = self.writable("write")?;
        if data.is_empty() {
            return Ok(0);
        }
        self.reserve(handle, data.len())?;
        let count = self
            .backend
            .write_at(handle, self.cursor.offset(), data)
            .map_err(|code| FsError::backend("write", &self.path, code))?;
        self.cursor.advance(count);
        Ok(count)
    }

    /// Write all of `data`, retrying while the backend reports short writes.
    ///
    /// # Errors
    ///
    /// - [`FsError::ShortWrite`] if the backend accepts zero bytes before
    ///   `data` is exhausted
    /// - any error from [`write`](Self::write)
    pub fn write_all(&mut self, mut data: &[u8]) -> Result<(), FsError> {
        self.writable("write_all")?;
        let expected = data.len();
        while !data.is_empty() {
            match self.write(data)? {
                0 => {
                    return Err(FsError::ShortWrite {
                        path: self.path.to_string(),
                        written: (expected - data.len()) as u64,
                        expected: expected as u64,
                    });
                }
                count => data = &data[count.min(data.len())..],
            }
        }
        Ok(())
    }

    /// Write a string's bytes in full. Returns the byte length.
    pub fn write_str(&mut self, text: &str) -> Result<usize, FsError> {
        self.write_all(text.as_bytes())?;
        Ok(text.len())
    }

    /// Write a single byte.
    pub fn put_char(&mut self, byte: u8) -> Result<(), FsError> {
        self.write_all(&[byte])
    }

    /// Format `args` and write the result.
    ///
    /// Output longer than [`Config::format_limit`] bytes is silently cut at
    /// the last character boundary that fits.
    ///
    /// ```rust
    /// # use devfs::{DeviceRegistry, File, MemoryBackend, OpenMode};
    /// # use std::sync::Arc;
    /// # let registry = DeviceRegistry::new();
    /// # registry.mount("sdmc", Arc::new(MemoryBackend::new())).unwrap();
    /// let mut file = File::open(&registry, "sdmc:/stats.txt", OpenMode::WRITE, 0).unwrap();
    /// file.writef(format_args!("{} saves, {} bytes\n", 3, 4096)).unwrap();
    /// assert_eq!(file.size(), 20);
    /// ```
    pub fn writef(&mut self, args: fmt::Arguments<'_>) -> Result<usize, FsError> {
        let mut buffer = BoundedBuffer::new(self.config.format_limit());
        if fmt::write(&mut buffer, args).is_err() && !buffer.full {
            return Err(FsError::InvalidData {
                path: self.path.to_string(),
                details: "formatting trait returned an error".into(),
            });
        }
        self.write_str(&buffer.text)
    }

    /// Ask the backend to commit buffered writes.
    pub fn flush(&mut self) -> Result<(), FsError> {
        let handle = self.writable("flush")?;
        self.backend
            .flush(handle)
            .map_err(|code| FsError::backend("flush", &self.path, code))
    }

    /// Release the backend handle. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<(), FsError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        debug!(path = %self.path, "closing file");
        self.backend
            .close_file(handle)
            .map_err(|code| FsError::backend("close_file", &self.path, code))
    }
}

impl Drop for File {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close file on drop");
        }
    }
}

impl io::Read for File {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        File::read(self, buf).map_err(Into::into)
    }
}

impl io::Write for File {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        File::write(self, buf).map_err(Into::into)
    }

    fn flush(&mut self) -> io::Result<()> {
        File::flush(self).map_err(Into::into)
    }
}

/// Seeks clamp like [`File::seek`] instead of failing before the start.
impl io::Seek for File {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        Ok(match pos {
            io::SeekFrom::Start(offset) => {
                File::seek(self, i64::try_from(offset).unwrap_or(i64::MAX), SeekOrigin::Start)
            }
            io::SeekFrom::Current(offset) => File::seek(self, offset, SeekOrigin::Current),
            io::SeekFrom::End(offset) => File::seek(self, offset, SeekOrigin::End),
        })
    }
}
