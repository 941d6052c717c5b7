//! Tunables shared by every handle opened through a registry.

/// Default capacity of the bounded [`File::writef`](crate::File::writef)
/// buffer, terminator included.
pub const DEFAULT_FORMAT_BUFFER_SIZE: usize = 0x1000;

/// Layer configuration.
///
/// A [`DeviceRegistry`](crate::DeviceRegistry) owns one `Config`; files and
/// directories copy it when they are opened.
///
/// # Example
///
/// ```rust
/// use devfs::{Config, DeviceRegistry};
///
/// let registry = DeviceRegistry::with_config(Config {
///     format_buffer_size: 256,
///     ..Config::default()
/// });
/// assert_eq!(registry.config().format_buffer_size, 256);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Capacity of the formatting buffer used by `writef`. Output longer than
    /// `format_buffer_size - 1` bytes is truncated.
    pub format_buffer_size: usize,
    /// Fold ASCII case when sorting directory listings.
    pub fold_case_in_sort: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format_buffer_size: DEFAULT_FORMAT_BUFFER_SIZE,
            fold_case_in_sort: true,
        }
    }
}

impl Config {
    /// Longest formatted output `writef` will emit, in bytes.
    #[inline]
    pub fn format_limit(&self) -> usize {
        self.format_buffer_size.saturating_sub(1)
    }
}
