//! # Device Registry
//!
//! Maps device names to mounted backends.
//!
//! Every path-based operation resolves its device here first. The table is
//! guarded by an [`RwLock`]: resolution takes a read lock for the duration
//! of the lookup only and clones the backend's [`Arc`], so a handle keeps
//! its backend alive even if the device is unmounted while it is open.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::debug;

use crate::path::{DEVICE_SEPARATOR, PATH_SEPARATOR};
use crate::{Backend, Config, DevicePath, FsError};

/// Device name to backend table.
///
/// # Example
///
/// ```rust
/// use devfs::{DeviceRegistry, MemoryBackend};
/// use std::sync::Arc;
///
/// let registry = DeviceRegistry::new();
/// registry.mount("sdmc", Arc::new(MemoryBackend::new())).unwrap();
/// assert!(registry.is_mounted("sdmc"));
/// assert!(registry.resolve("save").is_err());
/// ```
pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, Arc<dyn Backend>>>,
    config: Config,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &self.devices())
            .field("config", &self.config)
            .finish()
    }
}

fn is_valid_device_name(device: &str) -> bool {
    !device.is_empty() && !device.contains([DEVICE_SEPARATOR, PATH_SEPARATOR])
}

impl DeviceRegistry {
    /// Empty registry with the default [`Config`].
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Empty registry with `config`.
    pub fn with_config(config: Config) -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static DeviceRegistry {
        static GLOBAL: OnceLock<DeviceRegistry> = OnceLock::new();
        GLOBAL.get_or_init(DeviceRegistry::new)
    }

    /// Configuration handed to handles opened through this registry.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mount `backend` under `device`.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] if `device` is empty or contains `:` or `/`
    /// - [`FsError::DeviceAlreadyMounted`] if the name is taken
    pub fn mount(&self, device: &str, backend: Arc<dyn Backend>) -> Result<(), FsError> {
        if !is_valid_device_name(device) {
            return Err(FsError::InvalidPath {
                path: device.to_owned(),
            });
        }

        let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        if devices.contains_key(device) {
            return Err(FsError::DeviceAlreadyMounted {
                device: device.to_owned(),
            });
        }
        devices.insert(device.to_owned(), backend);
        debug!(device, "mounted device");
        Ok(())
    }

    /// Remove `device`. Returns `false` if it was not mounted.
    ///
    /// Handles already open on the device keep working until closed.
    pub fn unmount(&self, device: &str) -> bool {
        let removed = self
            .devices
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(device)
            .is_some();
        if removed {
            debug!(device, "unmounted device");
        }
        removed
    }

    /// Returns `true` if `device` is mounted.
    pub fn is_mounted(&self, device: &str) -> bool {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(device)
    }

    /// Names of all mounted devices, sorted.
    pub fn devices(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Look up the backend mounted under `device`.
    ///
    /// # Errors
    ///
    /// - [`FsError::DeviceNotFound`] if nothing is mounted under the name
    pub fn resolve(&self, device: &str) -> Result<Arc<dyn Backend>, FsError> {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(device)
            .cloned()
            .ok_or_else(|| FsError::DeviceNotFound {
                device: device.to_owned(),
            })
    }

    /// Resolve the device of `path`, returning its backend and sub-path.
    pub(crate) fn route<'p>(
        &self,
        path: &'p DevicePath,
    ) -> Result<(Arc<dyn Backend>, &'p str), FsError> {
        let (device, sub_path) = path.split()?;
        Ok((self.resolve(device)?, sub_path))
    }
}
