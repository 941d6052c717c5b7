//! # Raw Storage
//!
//! [`Storage`] reads a whole partition by [`PartitionId`]. The backend
//! reports only success or failure, so every read is clamped to the bytes
//! left before the end of the partition before it is issued, and the cursor
//! advances by exactly the clamped length on success.
//!
//! ```rust
//! use devfs::{MemoryBackend, PartitionId, SeekOrigin, Storage};
//! use std::sync::Arc;
//!
//! let backend = Arc::new(MemoryBackend::new());
//! backend.insert_partition(PartitionId(0x20), vec![0xAA; 64]);
//!
//! let mut storage = Storage::open(backend, PartitionId(0x20)).unwrap();
//! storage.seek(-10, SeekOrigin::End);
//! let mut buf = [0u8; 100];
//! assert_eq!(storage.read(&mut buf).unwrap(), 10);
//! assert!(storage.end_of_stream());
//! ```

use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::debug;

use crate::stream::StreamCursor;
use crate::{FsError, Handle, PartitionId, SeekOrigin, StorageBackend};

/// An open raw partition.
pub struct Storage {
    backend: Arc<dyn StorageBackend>,
    handle: Option<Handle>,
    partition: PartitionId,
    cursor: StreamCursor,
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("partition", &self.partition)
            .field("handle", &self.handle)
            .field("offset", &self.cursor.offset())
            .field("size", &self.cursor.size())
            .finish()
    }
}

impl Storage {
    /// Open `partition` and query its size.
    ///
    /// # Errors
    ///
    /// - [`FsError::Backend`] if the partition cannot be opened or sized. A
    ///   handle opened before a failed size query is released first.
    pub fn open(backend: Arc<dyn StorageBackend>, partition: PartitionId) -> Result<Storage, FsError> {
        let handle = backend
            .open_partition(partition)
            .map_err(|code| FsError::backend("open_partition", partition, code))?;

        let size = match backend.partition_size(handle) {
            Ok(size) => size,
            Err(code) => {
                backend.close_partition(handle);
                return Err(FsError::backend("partition_size", partition, code));
            }
        };
        debug!(%partition, size, "opened partition");

        Ok(Storage {
            backend,
            handle: Some(handle),
            partition,
            cursor: StreamCursor::new(size),
        })
    }

    /// The partition this handle reads.
    #[inline]
    pub fn partition(&self) -> PartitionId {
        self.partition
    }

    /// Returns `true` until the partition is closed.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Current cursor position.
    #[inline]
    pub fn tell(&self) -> u64 {
        self.cursor.offset()
    }

    /// Partition size, queried at open.
    #[inline]
    pub fn size(&self) -> u64 {
        self.cursor.size()
    }

    /// Returns `true` if the cursor is at the end of the partition.
    #[inline]
    pub fn end_of_stream(&self) -> bool {
        self.cursor.is_at_end()
    }

    /// Move the cursor, clamped into `[0, size]`.
    pub fn seek(&mut self, offset: i64, origin: SeekOrigin) -> u64 {
        self.cursor.seek(offset, origin)
    }

    /// Read up to `buf.len()` bytes at the cursor.
    ///
    /// Returns the clamped length, which is 0 at the end of the partition.
    ///
    /// # Errors
    ///
    /// - [`FsError::Closed`] after [`close`](Self::close)
    /// - [`FsError::Backend`] if the read fails; the cursor does not move
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        let handle = self.handle.ok_or(FsError::Closed { operation: "read" })?;
        let count = self.cursor.clamp(buf.len());
        if count == 0 {
            return Ok(0);
        }
        self.backend
            .read_partition(handle, self.cursor.offset(), &mut buf[..count])
            .map_err(|code| FsError::backend("read_partition", self.partition, code))?;
        self.cursor.advance(count);
        Ok(count)
    }

    /// Release the partition. Calling it again is a no-op.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!(partition = %self.partition, "closing partition");
            self.backend.close_partition(handle);
        }
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        self.close();
    }
}

impl io::Read for Storage {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Storage::read(self, buf).map_err(Into::into)
    }
}

impl io::Seek for Storage {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        Ok(match pos {
            io::SeekFrom::Start(offset) => Storage::seek(
                self,
                i64::try_from(offset).unwrap_or(i64::MAX),
                SeekOrigin::Start,
            ),
            io::SeekFrom::Current(offset) => Storage::seek(self, offset, SeekOrigin::Current),
            io::SeekFrom::End(offset) => Storage::seek(self, offset, SeekOrigin::End),
        })
    }
}
