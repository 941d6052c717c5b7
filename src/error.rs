//! Error types for the device-routed filesystem layer.

use std::fmt;

/// Native result code reported by a backend primitive.
///
/// Backends report failure as an opaque 32-bit code. The code is carried
/// through to [`FsError::Backend`] untouched so callers can match on the
/// values their platform documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultCode(pub u32);

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Result of a raw backend primitive.
pub type BackendResult<T> = Result<T, ResultCode>;

/// Broad classification of an [`FsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input detected before any backend call.
    InvalidInput,
    /// The device name is not registered.
    Resolution,
    /// The backend primitive itself reported failure.
    Backend,
    /// The operation is not allowed in the handle's current mode or state.
    Usage,
    /// Data could not be decoded or encoded.
    Data,
}

/// Filesystem error type with contextual variants.
///
/// Every variant carries the path, device or operation involved so the
/// message is useful without any shared diagnostic state.
///
/// # Examples
///
/// ```rust
/// use devfs::{ErrorKind, FsError};
///
/// let err = FsError::DeviceNotFound { device: "sdmc".into() };
/// assert_eq!(err.to_string(), "device not found: sdmc");
/// assert_eq!(err.kind(), ErrorKind::Resolution);
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    // Input Errors
    /// The path is empty or lacks a `device:/` prefix.
    #[error("invalid path: {path:?}")]
    InvalidPath {
        /// The rejected path.
        path: String,
    },

    /// Both paths of a rename must live on the same device.
    #[error("{operation}: paths are on different devices: {from} -> {to}")]
    CrossDevice {
        /// The operation that was rejected.
        operation: &'static str,
        /// Source path.
        from: String,
        /// Destination path.
        to: String,
    },

    // Resolution Errors
    /// No backend is mounted under the device name.
    #[error("device not found: {device}")]
    DeviceNotFound {
        /// The device name that failed to resolve.
        device: String,
    },

    /// A backend is already mounted under the device name.
    #[error("device already mounted: {device}")]
    DeviceAlreadyMounted {
        /// The device name.
        device: String,
    },

    // Backend Errors
    /// A backend primitive failed.
    #[error("{operation} failed for {path}: {code}")]
    Backend {
        /// The operation that failed.
        operation: &'static str,
        /// The logical path or partition involved.
        path: String,
        /// The backend's native result code.
        code: ResultCode,
    },

    /// The backend stopped accepting bytes before a write completed.
    #[error("write stalled for {path}: {written} of {expected} bytes written")]
    ShortWrite {
        /// The file's logical path.
        path: String,
        /// Bytes the backend accepted.
        written: u64,
        /// Bytes the caller asked to write.
        expected: u64,
    },

    // Usage Errors
    /// The handle was not opened with read access.
    #[error("{operation}: not opened for reading: {path}")]
    NotReadable {
        /// The operation that was attempted.
        operation: &'static str,
        /// The file's logical path.
        path: String,
    },

    /// The handle was not opened with write access.
    #[error("{operation}: not opened for writing: {path}")]
    NotWritable {
        /// The operation that was attempted.
        operation: &'static str,
        /// The file's logical path.
        path: String,
    },

    /// The handle has already been closed.
    #[error("{operation}: handle is closed")]
    Closed {
        /// The operation that was attempted.
        operation: &'static str,
    },

    // Data Errors
    /// Data read from a backend was not in the expected format.
    #[error("invalid data: {path} ({details})")]
    InvalidData {
        /// The path with invalid data.
        path: String,
        /// Details about the invalid data.
        details: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl FsError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::InvalidPath { .. } | FsError::CrossDevice { .. } => ErrorKind::InvalidInput,
            FsError::DeviceNotFound { .. } | FsError::DeviceAlreadyMounted { .. } => {
                ErrorKind::Resolution
            }
            FsError::Backend { .. } | FsError::ShortWrite { .. } => ErrorKind::Backend,
            FsError::NotReadable { .. } | FsError::NotWritable { .. } | FsError::Closed { .. } => {
                ErrorKind::Usage
            }
            FsError::InvalidData { .. }
            | FsError::Serialization(_)
            | FsError::Deserialization(_) => ErrorKind::Data,
        }
    }

    /// The backend's native result code, if the failure came from a backend.
    pub fn code(&self) -> Option<ResultCode> {
        match self {
            FsError::Backend { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn backend(operation: &'static str, path: impl fmt::Display, code: ResultCode) -> Self {
        tracing::debug!(operation, %path, %code, "backend call failed");
        FsError::Backend {
            operation,
            path: path.to_string(),
            code,
        }
    }
}

impl From<FsError> for std::io::Error {
    fn from(error: FsError) -> Self {
        let kind = match error.kind() {
            _ if matches!(error, FsError::ShortWrite { .. }) => std::io::ErrorKind::WriteZero,
            ErrorKind::InvalidInput => std::io::ErrorKind::InvalidInput,
            ErrorKind::Resolution => std::io::ErrorKind::NotFound,
            ErrorKind::Usage => std::io::ErrorKind::PermissionDenied,
            ErrorKind::Data => std::io::ErrorKind::InvalidData,
            ErrorKind::Backend => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, error)
    }
}
