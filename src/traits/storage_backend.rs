//! Whole-partition block access.

use crate::{BackendResult, Handle, PartitionId};

/// Raw partition primitives.
///
/// Partitions are addressed by a fixed [`PartitionId`], not by path, and
/// reads report success or failure only: there is no transferred-byte
/// count, so callers must never request bytes past the partition end.
pub trait StorageBackend: Send + Sync {
    /// Open a partition for reading.
    fn open_partition(&self, id: PartitionId) -> BackendResult<Handle>;

    /// Total size of the partition in bytes.
    fn partition_size(&self, handle: Handle) -> BackendResult<u64>;

    /// Fill `buf` with bytes starting at `offset`.
    fn read_partition(&self, handle: Handle, offset: u64, buf: &mut [u8]) -> BackendResult<()>;

    /// Release a partition handle.
    fn close_partition(&self, handle: Handle);
}
