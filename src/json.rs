//! JSON load/store over [`File`]. Available with the `serde` feature.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{DevicePath, DeviceRegistry, File, FsError, OpenMode};

/// Read the file at `path` and deserialize it as JSON.
///
/// # Errors
///
/// - Any error from [`File::open`] or reading
/// - [`FsError::InvalidData`] if the file isn't valid UTF-8
/// - [`FsError::Deserialization`] if JSON parsing failed
///
/// ```rust
/// use devfs::{read_json, write_json, DeviceRegistry, MemoryBackend};
/// use std::sync::Arc;
///
/// let registry = DeviceRegistry::new();
/// registry.mount("save", Arc::new(MemoryBackend::new())).unwrap();
///
/// write_json(&registry, "save:/slots.json", &vec![1, 2, 3]).unwrap();
/// let slots: Vec<u32> = read_json(&registry, "save:/slots.json").unwrap();
/// assert_eq!(slots, [1, 2, 3]);
/// ```
pub fn read_json<T: DeserializeOwned>(
    registry: &DeviceRegistry,
    path: impl Into<DevicePath>,
) -> Result<T, FsError> {
    let mut file = File::open(registry, path, OpenMode::READ, 0)?;
    let data = file.read_to_vec()?;
    file.close()?;

    let text = String::from_utf8(data).map_err(|e| FsError::InvalidData {
        path: file.path().to_string(),
        details: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| FsError::Deserialization(e.to_string()))
}

/// Serialize `value` as pretty-printed JSON, replacing the file at `path`.
///
/// # Errors
///
/// - [`FsError::Serialization`] if serialization failed; the file is left
///   untouched
/// - [`FsError::ShortWrite`] if the backend stops accepting bytes
/// - Any error from [`File::open`] or writing
pub fn write_json<T: Serialize>(
    registry: &DeviceRegistry,
    path: impl Into<DevicePath>,
    value: &T,
) -> Result<(), FsError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| FsError::Serialization(e.to_string()))?;
    let mut file = File::open(registry, path, OpenMode::WRITE, 0)?;
    file.write_all(json.as_bytes())?;
    file.close()
}
